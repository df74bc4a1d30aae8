// crates/th_io/src/lib.rs

//! TerraHydro IO 层
//!
//! - [`error`]：IO 错误枚举 [`IoError`]，可向下转换为基础错误
//! - [`dem`]：DEM 加载（分隔文本；`gdal` 特性启用 GeoTIFF 驱动）
//! - [`results`]：分节结果报告导出

pub mod dem;
pub mod error;
pub mod results;

pub use dem::{load_dem, parse_dem_text};
pub use error::{IoError, IoResult};
pub use results::{save_report, write_report, RainfallMode, SimulationReport};
