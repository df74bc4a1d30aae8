// crates/th_engine/src/scenario.rs

//! 场景配置
//!
//! serde 序列化的运行描述：DEM 路径、标量参数、降雨模式、出水口
//! 规格与输出位置。CLI 的 `run` / `validate` 子命令消费此结构。
//!
//! # 示例（JSON）
//!
//! ```json
//! {
//!   "dem": "basin.csv",
//!   "resolution": 1.0,
//!   "params": { "n_manning": 0.03, "infiltration": 1e-6,
//!               "min_depth": 1e-5, "dt": 1.0,
//!               "total_time": 600.0, "rainfall_rate": 1e-5 },
//!   "time_varying_rainfall": true,
//!   "rainfall_schedule": [[0.0, 0.0], [60.0, 1e-5]],
//!   "outlets": { "mode": "percentile", "percentile": 0.1 },
//!   "output": "results.csv"
//! }
//! ```

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use th_foundation::ThError;
use th_physics::SimulationParams;

/// 出水口规格
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutletSpec {
    /// 边界低程百分位选择
    Percentile {
        /// 百分位 (0, 1)
        percentile: f64,
    },
    /// 手动指定 (行, 列) 坐标
    Manual {
        /// 出水口坐标列表
        cells: Vec<(usize, usize)>,
    },
}

impl Default for OutletSpec {
    fn default() -> Self {
        Self::Percentile {
            percentile: th_physics::DEFAULT_PERCENTILE,
        }
    }
}

/// 场景配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// DEM 文件路径
    pub dem: PathBuf,
    /// 分辨率覆盖 [m]（栅格未声明像元尺寸时使用）
    #[serde(default)]
    pub resolution: Option<f64>,
    /// 标量参数
    #[serde(default)]
    pub params: SimulationParams,
    /// 是否启用时变降雨
    #[serde(default)]
    pub time_varying_rainfall: bool,
    /// 降雨日程 (时间 [s], 强度 [m/s])
    #[serde(default)]
    pub rainfall_schedule: Option<Vec<(f64, f64)>>,
    /// 出水口规格
    #[serde(default)]
    pub outlets: OutletSpec,
    /// 快照降采样间隔（步）
    #[serde(default)]
    pub snapshot_interval: Option<u64>,
    /// 结果输出路径
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl ScenarioConfig {
    /// 从 JSON 文件加载场景
    ///
    /// 读取失败经基础层 IO 错误上抛；解析失败带文件路径上下文。
    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(ThError::from)?;
        Self::from_json(&content).map_err(|e| {
            EngineError::Io(th_io::IoError::ParseError {
                file: path.display().to_string(),
                line: 0,
                message: e,
            })
        })
    }

    /// 从 JSON 字符串解析场景
    pub fn from_json(content: &str) -> Result<Self, String> {
        serde_json::from_str(content).map_err(|e| e.to_string())
    }

    /// 静态校验（不访问文件系统）
    pub fn validate(&self) -> EngineResult<()> {
        self.params.validate()?;
        if let Some(res) = self.resolution {
            if !(res > 0.0) {
                return Err(EngineError::InvalidParameter {
                    field: "resolution",
                    value: res,
                });
            }
        }
        if let OutletSpec::Manual { cells } = &self.outlets {
            if cells.is_empty() {
                return Err(EngineError::NoOutlets);
            }
        }
        Ok(())
    }
}

// ============================================================
// 测试
// ============================================================
