// crates/th_engine/src/lib.rs

//! TerraHydro 引擎层
//!
//! 组合地形、物理与 IO 各层，向外暴露无界面（headless）的窄 API：
//! - [`driver`]：模拟驱动器 [`SimulationDriver`]（加载 → 配置 →
//!   初始化 → 步进/运行 → 查询）
//! - [`events`]：单向事件流（监听器注册与分发）
//! - [`scenario`]：serde 场景配置 [`ScenarioConfig`]
//!
//! 界面壳（CLI、GUI）作为纯消费者订阅事件并轮询快照，
//! 通过显式命令修改引擎状态；引擎不反向依赖任何界面。

pub mod driver;
pub mod error;
pub mod events;
pub mod scenario;

pub use driver::{ParamKind, RunOutcome, RunState, SimulationDriver};
pub use error::{EngineError, EngineResult};
pub use events::{EventDispatcher, EventListener, FnListener, LoggingListener, SimulationEvent};
pub use scenario::{OutletSpec, ScenarioConfig};
