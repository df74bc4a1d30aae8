// apps/th_cli/src/commands/run.rs

//! 运行模拟命令
//!
//! 从场景配置文件或直接参数构建驱动器，运行至完成并按需导出
//! 分节结果报告。

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use th_engine::{ParamKind, RunOutcome, ScenarioConfig, SimulationDriver, SimulationEvent};
use th_io::{RainfallMode, SimulationReport};
use tracing::info;

/// 运行模拟参数
#[derive(Args)]
pub struct RunArgs {
    /// 场景配置文件 (JSON)，给定时覆盖以下直接参数
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// DEM 文件路径 (.csv/.txt 文本或 .tif GeoTIFF)
    #[arg(short, long)]
    pub dem: Option<PathBuf>,

    /// 像元边长 [m]（栅格未声明像元尺寸时使用）
    #[arg(long, default_value = "0.25")]
    pub resolution: f64,

    /// Manning 糙率系数
    #[arg(long, default_value = "0.03")]
    pub manning: f64,

    /// 入渗速率 [m/s]
    #[arg(long, default_value = "1e-6")]
    pub infiltration: f64,

    /// 干湿阈值水深 [m]
    #[arg(long, default_value = "1e-5")]
    pub min_depth: f64,

    /// 时间步长 [s]
    #[arg(long, default_value = "1.0")]
    pub dt: f64,

    /// 模拟总时长 [s]
    #[arg(short = 't', long, default_value = "1800.0")]
    pub total_time: f64,

    /// 常量降雨强度 [m/s]
    #[arg(short = 'r', long, default_value = "0.0")]
    pub rainfall: f64,

    /// 出水口百分位 (0, 1)
    #[arg(long, default_value = "0.1")]
    pub outlet_percentile: f64,

    /// 结果输出路径（.csv 逗号分隔，其余制表符）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 进度报告间隔 [模拟秒]
    #[arg(long, default_value = "60.0")]
    pub progress_interval: f64,
}

/// 执行运行命令
pub fn execute(args: RunArgs) -> Result<()> {
    info!("=== TerraHydro 模拟启动 ===");

    let mut driver = SimulationDriver::new();

    let output = if let Some(path) = &args.scenario {
        let scenario = ScenarioConfig::load(path)
            .with_context(|| format!("加载场景失败: {}", path.display()))?;
        scenario.validate().context("场景校验失败")?;
        driver.apply_scenario(&scenario).context("应用场景失败")?;
        scenario.output.or_else(|| args.output.clone())
    } else {
        let Some(dem) = &args.dem else {
            bail!("必须给定 --scenario 或 --dem");
        };
        driver.set_param(ParamKind::Resolution, args.resolution)?;
        driver.set_param(ParamKind::Manning, args.manning)?;
        driver.set_param(ParamKind::Ks, args.infiltration)?;
        driver.set_param(ParamKind::MinDepth, args.min_depth)?;
        driver.set_param(ParamKind::Dt, args.dt)?;
        driver.set_param(ParamKind::TotalTime, args.total_time)?;
        driver.set_param(ParamKind::ConstantRainfall, args.rainfall)?;
        driver
            .load_grid(dem)
            .with_context(|| format!("加载 DEM 失败: {}", dem.display()))?;
        driver.configure_outlets_by_percentile(args.outlet_percentile)?;
        args.output.clone()
    };

    // 进度监听：约每 progress_interval 模拟秒输出一次
    let interval = args.progress_interval.max(1e-9);
    let last_reported = Arc::new(AtomicU64::new(0.0f64.to_bits()));
    driver.events().add_fn_listener("progress", move |event| {
        if let SimulationEvent::TimeAdvanced { time, total_time } = event {
            let last = f64::from_bits(last_reported.load(Ordering::Relaxed));
            if *time - last >= interval {
                last_reported.store(time.to_bits(), Ordering::Relaxed);
                info!("进度: t={:.0} / {:.0} s", time, total_time);
            }
        }
    });

    driver.initialize().context("初始化失败")?;
    info!(
        "网格 {} x {}, 出水口 {} 个",
        driver.grid().map(|g| g.nx()).unwrap_or(0),
        driver.grid().map(|g| g.ny()).unwrap_or(0),
        driver.outlets().len()
    );

    let start = Instant::now();
    let outcome = driver.run().context("模拟运行失败")?;
    let elapsed = start.elapsed();

    match outcome {
        RunOutcome::Completed => info!("=== 模拟完成 ==="),
        RunOutcome::Cancelled => info!("=== 模拟被取消 ==="),
    }
    info!("总步数: {}", driver.step_count());
    info!("计算时间: {:.2} s", elapsed.as_secs_f64());
    info!("累计排水: {:.4e} m³", driver.total_drainage());

    let per_outlet = driver.get_per_outlet_volumes();
    for ((i, j), v) in per_outlet.iter().take(5) {
        info!("  出水口 ({}, {}): {:.4e} m³", i, j, v);
    }

    // 导出报告
    if let Some(path) = output {
        let grid = driver
            .grid()
            .context("网格缺失，无法导出")?;
        let schedule = driver.rainfall().schedule();
        let rainfall = if driver.rainfall().is_time_varying() {
            RainfallMode::TimeVarying(schedule)
        } else {
            RainfallMode::Constant(driver.params().rainfall_rate)
        };
        let report = SimulationReport {
            total_time: driver.params().total_time,
            resolution: grid.resolution(),
            n_manning: driver.params().n_manning,
            infiltration: driver.params().infiltration,
            min_depth: driver.params().min_depth,
            rainfall,
            total_drainage: driver.total_drainage(),
            time_series: driver.get_time_series(),
            per_outlet: &per_outlet,
        };
        th_io::save_report(&path, &report)
            .with_context(|| format!("导出结果失败: {}", path.display()))?;
        info!("结果已写入 {}", path.display());
    }

    Ok(())
}
