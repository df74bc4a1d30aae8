// crates/th_terrain/src/grid.rs

//! DEM 网格
//!
//! [`TerrainGrid`] 独占地形高程 `z[]`、水深 `h[]` 与 4-邻居索引表，
//! 并提供 2-D ↔ 1-D 索引约定：
//!
//! - `idx(i, j) = i * ny + j`，`i ∈ [0, nx)` 为行，`j ∈ [0, ny)` 为列
//! - 第 0 行对应栅格顶部
//! - 邻居方向序为 N, E, S, W，方向 `d` 的反方向为 `(d + 2) % 4`
//!
//! # 不变量
//!
//! - `z`、`h`、`neighbors` 长度均为 `nx * ny`
//! - `h[k] >= 0`；无数据单元恒有 `h[k] = 0`
//! - 邻居表在网格创建时构建一次，越界方向存哨兵 `-1`

use crate::raster::DemRaster;
use th_foundation::{ThError, ThResult};

/// 内部无数据哨兵值
pub const NODATA: f64 = -999_999.0;

/// 无数据判定阈值：高程 `<= NODATA_THRESHOLD` 视为无数据
pub const NODATA_THRESHOLD: f64 = -999_998.0;

/// 分辨率采纳下界 [m]
pub const RESOLUTION_MIN: f64 = 0.001;

/// 分辨率采纳上界 [m]
pub const RESOLUTION_MAX: f64 = 1000.0;

/// 4-邻居方向
///
/// 枚举值即邻居表下标；反方向满足 `(d + 2) % 4`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Direction {
    /// 北 (i-1, j)
    North = 0,
    /// 东 (i, j+1)
    East = 1,
    /// 南 (i+1, j)
    South = 2,
    /// 西 (i, j-1)
    West = 3,
}

/// 行偏移（按 N, E, S, W 顺序）
pub const DI: [isize; 4] = [-1, 0, 1, 0];
/// 列偏移（按 N, E, S, W 顺序）
pub const DJ: [isize; 4] = [0, 1, 0, -1];

impl Direction {
    /// 全部方向
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// 反方向
    #[inline]
    pub fn opposite(self) -> Direction {
        Self::ALL[(self as usize + 2) % 4]
    }
}

/// 分配全零缓冲区，失败时返回 [`ThError::AllocationFailed`]
fn alloc_zeroed(what: &'static str, len: usize) -> ThResult<Vec<f64>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| ThError::allocation_failed(what, len))?;
    v.resize(len, 0.0);
    Ok(v)
}

/// DEM 网格
///
/// 拥有高程、水深与邻居表的唯一所有者。求解器在单步内可变借用水深，
/// 出水口选择与汇流预处理只读借用高程。重新加载将替换全部状态。
#[derive(Debug, Clone)]
pub struct TerrainGrid {
    /// 行数
    nx: usize,
    /// 列数
    ny: usize,
    /// 像元边长 [m]
    resolution: f64,
    /// 地形高程 [m]（无数据单元存 [`NODATA`]）
    z: Vec<f64>,
    /// 水深 [m]
    h: Vec<f64>,
    /// 4-邻居索引表，越界方向为 -1
    neighbors: Vec<[i32; 4]>,
}

impl TerrainGrid {
    /// 从栅格数据创建网格
    ///
    /// 栅格声明的无数据值按绝对容差 1e-6 映射为内部哨兵 [`NODATA`]。
    /// 像元宽度满足采纳条件（两轴均为正、相对容差 1e-6 内近似正方形、
    /// 落在 [0.001, 1000] m 区间）时作为分辨率，否则保留
    /// `fallback_resolution`。
    ///
    /// # 参数
    ///
    /// - `raster`: IO 层产出的栅格数据
    /// - `fallback_resolution`: 采纳条件不满足时使用的分辨率 [m]
    pub fn from_raster(raster: &DemRaster, fallback_resolution: f64) -> ThResult<Self> {
        if raster.nx == 0 || raster.ny == 0 {
            return Err(ThError::invalid_input(format!(
                "网格尺寸非法: {} x {}",
                raster.nx, raster.ny
            )));
        }
        ThError::check_size("raster data", raster.nx * raster.ny, raster.data.len())?;

        let z: Vec<f64> = raster
            .data
            .iter()
            .map(|&v| if raster.is_nodata(v) { NODATA } else { v })
            .collect();

        let resolution = adopt_resolution(raster.pixel_size, fallback_resolution);
        Self::build(z, raster.nx, raster.ny, resolution)
    }

    /// 从文本行数据创建网格
    ///
    /// `nx` 为行数，`ny` 为首行列数；各行列数必须一致。
    /// 分辨率取调用方给定值。
    pub fn from_rows(rows: &[Vec<f64>], resolution: f64) -> ThResult<Self> {
        if rows.is_empty() || rows[0].is_empty() {
            return Err(ThError::invalid_input("文本 DEM 为空"));
        }
        let nx = rows.len();
        let ny = rows[0].len();
        let mut z = Vec::new();
        z.try_reserve_exact(nx * ny)
            .map_err(|_| ThError::allocation_failed("z", nx * ny))?;
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ny {
                return Err(ThError::invalid_input(format!(
                    "第 {} 行列数不一致: 期望 {}, 实际 {}",
                    i,
                    ny,
                    row.len()
                )));
            }
            z.extend_from_slice(row);
        }
        Self::build(z, nx, ny, resolution)
    }

    /// 由高程数组构建网格（分配水深并建立邻居表）
    fn build(z: Vec<f64>, nx: usize, ny: usize, resolution: f64) -> ThResult<Self> {
        let n = nx * ny;
        let h = alloc_zeroed("h", n)?;

        let mut neighbors = Vec::new();
        neighbors
            .try_reserve_exact(n)
            .map_err(|_| ThError::allocation_failed("neighbors", n))?;
        for i in 0..nx {
            for j in 0..ny {
                let mut entry = [-1i32; 4];
                for d in 0..4 {
                    let ni = i as isize + DI[d];
                    let nj = j as isize + DJ[d];
                    if ni >= 0 && ni < nx as isize && nj >= 0 && nj < ny as isize {
                        entry[d] = (ni as usize * ny + nj as usize) as i32;
                    }
                }
                neighbors.push(entry);
            }
        }

        tracing::debug!("网格创建: {} x {}, 分辨率 {} m", nx, ny, resolution);

        Ok(Self {
            nx,
            ny,
            resolution,
            z,
            h,
            neighbors,
        })
    }

    // =========================================================================
    // 索引与谓词
    // =========================================================================

    /// 2-D 转 1-D 索引
    #[inline]
    pub fn idx(&self, i: usize, j: usize) -> usize {
        i * self.ny + j
    }

    /// 1-D 转 2-D 坐标 (行, 列)
    #[inline]
    pub fn coords(&self, k: usize) -> (usize, usize) {
        (k / self.ny, k % self.ny)
    }

    /// 判断某个高程值是否为无数据
    ///
    /// 哨兵语义集中在此谓词内，调用方不得自行比较哨兵值。
    #[inline]
    pub fn is_nodata_value(z: f64) -> bool {
        z <= NODATA_THRESHOLD
    }

    /// 判断单元是否为无数据
    #[inline]
    pub fn is_nodata(&self, k: usize) -> bool {
        Self::is_nodata_value(self.z[k])
    }

    /// 判断单元是否在网格边界上
    #[inline]
    pub fn is_boundary(&self, k: usize) -> bool {
        let (i, j) = self.coords(k);
        i == 0 || i == self.nx - 1 || j == 0 || j == self.ny - 1
    }

    /// 获取指定方向的邻居索引
    ///
    /// # 返回
    ///
    /// 越界方向返回 None；无数据邻居正常返回（由调用方判定）。
    #[inline]
    pub fn neighbor(&self, k: usize, d: usize) -> Option<usize> {
        let nb = self.neighbors[k][d];
        if nb >= 0 {
            Some(nb as usize)
        } else {
            None
        }
    }

    /// 获取单元的 4-邻居表项
    #[inline]
    pub fn neighbor_entry(&self, k: usize) -> &[i32; 4] {
        &self.neighbors[k]
    }

    // =========================================================================
    // 访问器
    // =========================================================================

    /// 行数
    #[inline]
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// 列数
    #[inline]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// 单元总数
    #[inline]
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny
    }

    /// 像元边长 [m]
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// 设置像元边长 [m]（用户覆盖）
    pub fn set_resolution(&mut self, resolution: f64) {
        self.resolution = resolution;
    }

    /// 单元面积 [m²]
    #[inline]
    pub fn cell_area(&self) -> f64 {
        self.resolution * self.resolution
    }

    /// 高程数组
    #[inline]
    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// 水深数组
    #[inline]
    pub fn h(&self) -> &[f64] {
        &self.h
    }

    /// 水深数组（可变）
    ///
    /// 仅求解器与出水口排水在单步内使用；调用方必须维持
    /// `h[k] >= 0` 且无数据单元 `h[k] = 0` 的不变量。
    #[inline]
    pub fn h_mut(&mut self) -> &mut [f64] {
        &mut self.h
    }

    /// 高程与水深数组（同时借用）
    #[inline]
    pub fn z_and_h_mut(&mut self) -> (&[f64], &mut [f64]) {
        (&self.z, &mut self.h)
    }

    /// 拆分借用：邻居表、高程（只读）与水深（可变）
    ///
    /// 供活跃集维护等需要同时读拓扑、写水深的路径使用。
    #[inline]
    pub fn split_mut(&mut self) -> (&[[i32; 4]], &[f64], &mut [f64]) {
        (&self.neighbors, &self.z, &mut self.h)
    }

    /// 将全部水深清零
    pub fn reset_depths(&mut self) {
        self.h.fill(0.0);
    }

    /// 自由水面高程 H = z + h
    #[inline]
    pub fn head(&self, k: usize) -> f64 {
        self.z[k] + self.h[k]
    }
}

/// 分辨率采纳规则
///
/// 两轴均为正（> 1e-6）、相对容差 1e-6 内近似正方形且落在
/// [[`RESOLUTION_MIN`], [`RESOLUTION_MAX`]] 区间时采纳像元宽度，
/// 否则保留调用方分辨率。
fn adopt_resolution(pixel_size: Option<(f64, f64)>, fallback: f64) -> f64 {
    let Some((w, h)) = pixel_size else {
        return fallback;
    };
    let (w, h) = (w.abs(), h.abs());
    if w < 1e-6 || h < 1e-6 {
        tracing::warn!("像元尺寸非法 ({}, {})，保留分辨率 {} m", w, h, fallback);
        return fallback;
    }
    if (w - h).abs() > 1e-6 * w.max(h) {
        tracing::warn!("像元非正方形 ({}, {})，保留分辨率 {} m", w, h, fallback);
        return fallback;
    }
    if !(RESOLUTION_MIN..=RESOLUTION_MAX).contains(&w) {
        tracing::warn!("像元宽度 {} m 超出采纳区间，保留分辨率 {} m", w, fallback);
        return fallback;
    }
    w
}

// ============================================================
// 测试
// ============================================================
