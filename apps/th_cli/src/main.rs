// apps/th_cli/src/main.rs

//! TerraHydro 命令行界面
//!
//! 提供坡面流（降雨-径流）模拟的命令行工具。引擎以无界面方式
//! 运行，本层仅做参数解析、日志初始化与结果导出。

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// TerraHydro 坡面流模拟命令行工具
#[derive(Parser)]
#[command(name = "th_cli")]
#[command(author = "TerraHydro Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "TerraHydro overland flow simulator", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行模拟
    Run(commands::run::RunArgs),
    /// 查看 DEM 信息
    Info(commands::info::InfoArgs),
    /// 校验场景配置
    Validate(commands::validate::ValidateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日志
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // 执行命令
    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
    }
}
