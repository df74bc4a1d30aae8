// apps/th_cli/src/commands/info.rs

//! DEM 信息命令
//!
//! 加载 DEM 并输出维度、高程范围、无数据统计与出水口预览。

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use th_physics::select_by_percentile;
use th_terrain::{FlowRouter, TerrainGrid};
use tracing::info;

/// DEM 信息参数
#[derive(Args)]
pub struct InfoArgs {
    /// DEM 文件路径
    #[arg(short, long)]
    pub dem: PathBuf,

    /// 像元边长 [m]（栅格未声明像元尺寸时使用）
    #[arg(long, default_value = "0.25")]
    pub resolution: f64,

    /// 出水口预览百分位
    #[arg(long, default_value = "0.1")]
    pub outlet_percentile: f64,

    /// 是否运行汇流预处理
    #[arg(long)]
    pub route: bool,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    let raster = th_io::load_dem(&args.dem)
        .with_context(|| format!("加载 DEM 失败: {}", args.dem.display()))?;
    let grid = TerrainGrid::from_raster(&raster, args.resolution).context("网格构建失败")?;

    info!("文件: {}", args.dem.display());
    info!("维度: {} 行 x {} 列 ({} 单元)", grid.nx(), grid.ny(), grid.n_cells());
    info!("分辨率: {} m", grid.resolution());

    let mut z_min = f64::MAX;
    let mut z_max = f64::MIN;
    let mut nodata_count = 0usize;
    for k in 0..grid.n_cells() {
        if grid.is_nodata(k) {
            nodata_count += 1;
        } else {
            z_min = z_min.min(grid.z()[k]);
            z_max = z_max.max(grid.z()[k]);
        }
    }

    if nodata_count == grid.n_cells() {
        info!("全部单元为无数据");
        return Ok(());
    }
    info!("高程范围: {:.3} .. {:.3} m", z_min, z_max);
    info!(
        "无数据单元: {} ({:.1}%)",
        nodata_count,
        100.0 * nodata_count as f64 / grid.n_cells() as f64
    );

    // 出水口预览
    let outlets = select_by_percentile(&grid, args.outlet_percentile);
    info!("百分位 {} 出水口: {} 个", args.outlet_percentile, outlets.len());
    for &k in outlets.cells().iter().take(10) {
        let (i, j) = grid.coords(k);
        info!("  ({}, {}) 高程 {:.3} m", i, j, grid.z()[k]);
    }

    // 汇流预处理
    if args.route {
        let field = FlowRouter::new().route(&grid);
        let max_acc = field.accumulation.iter().cloned().fold(0.0f64, f64::max);
        let routed = field.flow_dir.iter().filter(|&&d| d >= 0).count();
        info!("汇流预处理: 最大累积 {:.0}, 有流向单元 {}", max_acc, routed);
    }

    Ok(())
}
