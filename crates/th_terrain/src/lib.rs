// crates/th_terrain/src/lib.rs

//! TerraHydro 地形层
//!
//! 提供地形数据的存储与预处理：
//! - [`grid`]：DEM 网格 [`TerrainGrid`]，含水深场与 4-邻居索引表
//! - [`raster`]：栅格传输结构 [`DemRaster`]（IO 层产出，网格层消费）
//! - [`router`]：汇流预处理 [`FlowRouter`]（洼地填充 + D8 流向 + 汇流累积）

pub mod grid;
pub mod raster;
pub mod router;

pub use grid::{Direction, TerrainGrid, NODATA, NODATA_THRESHOLD};
pub use raster::DemRaster;
pub use router::{FlowField, FlowRouter};
