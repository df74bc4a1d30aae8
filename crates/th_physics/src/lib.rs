// crates/th_physics/src/lib.rs

//! TerraHydro 物理层
//!
//! 坡面流（降雨-径流）模拟的核心计算：
//! - [`types`]：模拟参数 [`SimulationParams`] 与校验
//! - [`forcing`]：降雨源 [`RainfallSource`]（常量 / 分段常量日程）
//! - [`outlets`]：出水口选择（边界低程百分位 / 手动指定）
//! - [`active`]：活跃单元集合（位图 + 有序列表，双缓冲交换）
//! - [`solver`]：坡面流求解器 [`OverlandFlowSolver`]（Manning 通量 +
//!   质量守恒缩放 + 活跃集扫掠）
//! - [`drainage`]：出水口排水记账 [`DrainageAccountant`]

pub mod active;
pub mod drainage;
pub mod forcing;
pub mod outlets;
pub mod solver;
pub mod types;

pub use active::ActiveSet;
pub use drainage::{DrainageAccountant, DrainageConfig};
pub use forcing::RainfallSource;
pub use outlets::{select_by_percentile, select_manual, OutletSet, DEFAULT_PERCENTILE};
pub use solver::{OverlandFlowSolver, ParallelStrategy, SolverConfig, StepDiagnostics};
pub use types::{ParamsValidationError, SimulationParams};
