// crates/th_foundation/src/lib.rs

//! TerraHydro 基础层
//!
//! 提供整个项目共用的最底层构件：
//! - [`error`]：统一错误类型 [`ThError`] 与结果别名 [`ThResult`]
//! - [`scalar`]：标量类型与容差比较
//!
//! 本层不依赖项目内其他 crate，也不引入任何第三方依赖（零依赖原则）。
//! 高层 crate（th_terrain、th_physics、th_io、th_engine）的错误最终
//! 均可转换为 [`ThError`]。

pub mod error;
pub mod scalar;

pub use error::{ThError, ThResult};
pub use scalar::{approx_eq, Scalar};
