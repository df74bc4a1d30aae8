// crates/th_engine/src/error.rs

//! 引擎错误类型

use th_foundation::ThError;
use th_io::IoError;
use th_physics::ParamsValidationError;
use thiserror::Error;

/// 引擎结果类型别名
pub type EngineResult<T> = Result<T, EngineError>;

/// 引擎错误
#[derive(Debug, Error)]
pub enum EngineError {
    /// 网格尚未加载
    #[error("网格尚未加载")]
    GridNotLoaded,

    /// initialize() 尚未成功调用（或运行已被取消）
    #[error("模拟尚未初始化")]
    NotInitialized,

    /// 无效参数
    #[error("无效参数 {field}: {value}")]
    InvalidParameter { field: &'static str, value: f64 },

    /// 回退后出水口集合仍为空
    #[error("出水口集合为空")]
    NoOutlets,

    /// 模拟运行中，禁止修改配置
    #[error("模拟运行中，禁止修改配置")]
    SimulationRunning,

    /// 参数校验失败
    #[error("参数校验失败: {0}")]
    Params(#[from] ParamsValidationError),

    /// IO 层错误
    #[error("IO 错误: {0}")]
    Io(#[from] IoError),

    /// 基础层错误
    #[error("基础层错误: {0}")]
    Foundation(#[from] ThError),
}
