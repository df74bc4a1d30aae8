// crates/th_foundation/src/scalar.rs

//! 标量类型与容差比较
//!
//! 求解器全程使用 f64；别名便于日后切换精度。

/// 计算标量类型
pub type Scalar = f64;

/// 默认绝对容差
pub const DEFAULT_ABS_TOL: Scalar = 1e-10;

/// 容差比较（绝对容差）
///
/// # 参数
///
/// - `a`, `b`: 待比较的两个值
/// - `tol`: 绝对容差
#[inline]
pub fn approx_eq_tol(a: Scalar, b: Scalar, tol: Scalar) -> bool {
    (a - b).abs() <= tol
}

/// 容差比较（默认绝对容差 [`DEFAULT_ABS_TOL`]）
#[inline]
pub fn approx_eq(a: Scalar, b: Scalar) -> bool {
    approx_eq_tol(a, b, DEFAULT_ABS_TOL)
}
