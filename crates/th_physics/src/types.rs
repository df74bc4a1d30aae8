// crates/th_physics/src/types.rs

//! 模拟参数
//!
//! 单次模拟运行内恒定的标量参数及其校验。分辨率归网格所有
//! （由 DEM 加载决定，可被用户覆盖），不在此结构中。

use serde::{Deserialize, Serialize};

/// 模拟参数
///
/// 所有字段在一次运行内保持不变；驱动器在 `initialize` 时校验。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationParams {
    /// Manning 糙率系数（典型范围 0.01–0.1）
    pub n_manning: f64,
    /// 入渗速率 Ks [m/s]
    pub infiltration: f64,
    /// 干湿阈值水深 [m]
    pub min_depth: f64,
    /// 固定时间步长 [s]
    pub dt: f64,
    /// 模拟总时长 [s]
    pub total_time: f64,
    /// 常量降雨强度 [m/s]（时变日程禁用时生效）
    pub rainfall_rate: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            n_manning: 0.03,
            infiltration: 1e-6,
            min_depth: 1e-5,
            dt: 1.0,
            total_time: 1800.0,
            rainfall_rate: 0.0,
        }
    }
}

impl SimulationParams {
    /// 校验参数有效性
    ///
    /// # 错误
    ///
    /// - `n_manning`、`dt`、`total_time` 必须为正
    /// - `infiltration`、`min_depth`、`rainfall_rate` 不得为负
    pub fn validate(&self) -> Result<(), ParamsValidationError> {
        let positive: [(&'static str, f64); 3] = [
            ("n_manning", self.n_manning),
            ("dt", self.dt),
            ("total_time", self.total_time),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(ParamsValidationError::NotPositive { field, value });
            }
        }

        let non_negative: [(&'static str, f64); 3] = [
            ("infiltration", self.infiltration),
            ("min_depth", self.min_depth),
            ("rainfall_rate", self.rainfall_rate),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ParamsValidationError::Negative { field, value });
            }
        }

        Ok(())
    }
}

/// 参数校验错误
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParamsValidationError {
    /// 必须为正的参数非正
    #[error("参数 {field} 必须为正, 实际 {value}")]
    NotPositive { field: &'static str, value: f64 },
    /// 不得为负的参数为负
    #[error("参数 {field} 不得为负, 实际 {value}")]
    Negative { field: &'static str, value: f64 },
}
