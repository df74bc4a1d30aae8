// apps/th_cli/src/commands/validate.rs

//! 场景校验命令
//!
//! 静态校验场景配置，并可选地做一次加载 + 初始化的干跑。

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use th_engine::{ScenarioConfig, SimulationDriver};
use tracing::{info, warn};

/// 场景校验参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 场景配置文件 (JSON)
    #[arg(short, long)]
    pub scenario: PathBuf,

    /// 仅静态校验，不加载 DEM
    #[arg(long)]
    pub static_only: bool,
}

/// 执行校验命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    let scenario = ScenarioConfig::load(&args.scenario)
        .with_context(|| format!("加载场景失败: {}", args.scenario.display()))?;

    scenario.validate().context("静态校验失败")?;
    info!("静态校验通过: {}", args.scenario.display());
    info!("  DEM: {}", scenario.dem.display());
    info!("  dt={} s, 总时长={} s", scenario.params.dt, scenario.params.total_time);

    if args.static_only {
        return Ok(());
    }

    // 干跑：加载 + 初始化（不步进）
    let mut driver = SimulationDriver::new();
    driver.apply_scenario(&scenario).context("应用场景失败")?;
    driver.initialize().context("初始化失败")?;

    let grid = driver.grid().context("网格缺失")?;
    info!(
        "干跑通过: 网格 {} x {}, 出水口 {} 个",
        grid.nx(),
        grid.ny(),
        driver.outlets().len()
    );
    if driver.outlets().len() == 1 {
        warn!("仅 1 个出水口，排水可能偏慢");
    }
    Ok(())
}
