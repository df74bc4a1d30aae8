// crates/th_physics/src/outlets.rs

//! 出水口选择
//!
//! 两种选择方式：
//! - 百分位选择：在网格边界上按高程取最低的一部分单元
//! - 手动指定：调用方给出 (行, 列) 坐标列表
//!
//! 百分位选择对出水口数量施加三重上限（用户百分位、边界数的 10%、
//! 绝对上限 50）：任意 DEM 的周长可能很大，放任上千个出水口会破坏
//! 排水记账的稳定性。

use th_terrain::TerrainGrid;

/// 自动选择的出水口绝对上限
pub const MAX_AUTO_OUTLETS: usize = 50;

/// 出水口数量占边界单元数的比例上限
pub const BOUNDARY_FRACTION_CAP: f64 = 0.1;

/// 默认百分位
pub const DEFAULT_PERCENTILE: f64 = 0.1;

/// 出水口集合
///
/// 有序的单元索引列表，元素互不重复且均指向非无数据单元。
/// 求解器与排水记账只读消费。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutletSet {
    cells: Vec<usize>,
}

impl OutletSet {
    /// 出水口单元索引
    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    /// 出水口数量
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// 是否包含指定单元
    pub fn contains(&self, k: usize) -> bool {
        self.cells.contains(&k)
    }
}

/// 百分位边界选择
///
/// 1. 枚举所有非无数据的边界单元
/// 2. 为空时回退到全网格最低的非无数据单元；仍为空则返回空集
/// 3. 按高程升序排序（同高程按 1-D 索引）
/// 4. 取前 `clamp(1, min(⌊p·B⌋, ⌊0.1·B⌋, 50))` 个
///
/// # 参数
///
/// - `percentile`: 期望比例，`(0, 1)` 之外的输入回退为
///   [`DEFAULT_PERCENTILE`]
pub fn select_by_percentile(grid: &TerrainGrid, percentile: f64) -> OutletSet {
    let percentile = if percentile > 0.0 && percentile < 1.0 {
        percentile
    } else {
        DEFAULT_PERCENTILE
    };

    let mut boundary: Vec<(f64, usize)> = Vec::new();
    for k in 0..grid.n_cells() {
        if grid.is_boundary(k) && !grid.is_nodata(k) {
            boundary.push((grid.z()[k], k));
        }
    }

    if boundary.is_empty() {
        tracing::warn!("无有效边界单元，回退到全网格最低单元");
        let lowest = (0..grid.n_cells())
            .filter(|&k| !grid.is_nodata(k))
            .min_by(|&a, &b| {
                grid.z()[a]
                    .partial_cmp(&grid.z()[b])
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            });
        return OutletSet {
            cells: lowest.into_iter().collect(),
        };
    }

    boundary.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.1.cmp(&b.1))
    });

    let count = boundary.len();
    let mut n = ((percentile * count as f64) as usize).max(1);
    n = n
        .min((count as f64 * BOUNDARY_FRACTION_CAP) as usize)
        .min(MAX_AUTO_OUTLETS)
        .max(1);

    let cells: Vec<usize> = boundary.iter().take(n).map(|&(_, k)| k).collect();
    tracing::debug!("百分位选择: 边界 {} 单元, 出水口 {} 个", count, cells.len());
    OutletSet { cells }
}

/// 手动出水口选择
///
/// 保留坐标在界内且非无数据的候选，转为 1-D 索引并按首次出现
/// 去重。若全部候选被拒绝，回退到默认百分位的自动选择。
///
/// # 参数
///
/// - `points`: (行, 列) 坐标列表
pub fn select_manual(grid: &TerrainGrid, points: &[(usize, usize)]) -> OutletSet {
    let mut seen = vec![false; grid.n_cells()];
    let mut cells = Vec::new();

    for &(i, j) in points {
        if i >= grid.nx() || j >= grid.ny() {
            continue;
        }
        let k = grid.idx(i, j);
        if grid.is_nodata(k) || seen[k] {
            continue;
        }
        seen[k] = true;
        cells.push(k);
    }

    if cells.is_empty() {
        tracing::warn!("手动出水口全部无效，回退到百分位选择");
        return select_by_percentile(grid, DEFAULT_PERCENTILE);
    }

    OutletSet { cells }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use th_terrain::grid::NODATA;

    /// z[i][j] = i + j 的 10x10 网格
    fn ramp_grid() -> TerrainGrid {
        let rows: Vec<Vec<f64>> = (0..10)
            .map(|i| (0..10).map(|j| (i + j) as f64).collect())
            .collect();
        TerrainGrid::from_rows(&rows, 1.0).unwrap()
    }

    #[test]
    fn test_percentile_selection_caps() {
        // 36 个边界单元，p=0.1 → 3 个出水口
        let grid = ramp_grid();
        let outlets = select_by_percentile(&grid, 0.1);
        assert_eq!(outlets.len(), 3);
        // 最低三个：(0,0) z=0，(0,1) z=1，(1,0) z=1（同高程按索引）
        assert_eq!(outlets.cells(), &[0, 1, 10]);
    }

    #[test]
    fn test_percentile_absolute_cap() {
        // 大比例被 10% 上限约束
        let grid = ramp_grid();
        let outlets = select_by_percentile(&grid, 0.9);
        // ⌊0.9·36⌋=32 → min(32, ⌊3.6⌋=3, 50) = 3
        assert_eq!(outlets.len(), 3);
    }

    #[test]
    fn test_percentile_at_least_one() {
        // 3x3 网格边界 8 个单元，⌊0.1·8⌋=0，仍须至少 1 个
        let rows: Vec<Vec<f64>> = (0..3)
            .map(|i| (0..3).map(|j| (i * 3 + j) as f64).collect())
            .collect();
        let grid = TerrainGrid::from_rows(&rows, 1.0).unwrap();
        let outlets = select_by_percentile(&grid, 0.05);
        assert_eq!(outlets.len(), 1);
        assert_eq!(outlets.cells(), &[0]);
    }

    #[test]
    fn test_percentile_invalid_falls_back_to_default() {
        let grid = ramp_grid();
        let a = select_by_percentile(&grid, -1.0);
        let b = select_by_percentile(&grid, DEFAULT_PERCENTILE);
        assert_eq!(a, b);
    }

    #[test]
    fn test_percentile_idempotent() {
        let grid = ramp_grid();
        let a = select_by_percentile(&grid, 0.2);
        let b = select_by_percentile(&grid, 0.2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_boundary_nodata_excluded() {
        // 边界全为无数据：回退到内部最低单元
        let rows = vec![
            vec![NODATA, NODATA, NODATA],
            vec![NODATA, 3.0, NODATA],
            vec![NODATA, NODATA, NODATA],
        ];
        let grid = TerrainGrid::from_rows(&rows, 1.0).unwrap();
        let outlets = select_by_percentile(&grid, 0.1);
        assert_eq!(outlets.cells(), &[4]);
    }

    #[test]
    fn test_all_nodata_yields_empty() {
        let rows = vec![vec![NODATA; 3]; 3];
        let grid = TerrainGrid::from_rows(&rows, 1.0).unwrap();
        let outlets = select_by_percentile(&grid, 0.1);
        assert!(outlets.is_empty());
    }

    #[test]
    fn test_manual_selection() {
        let grid = ramp_grid();
        let outlets = select_manual(&grid, &[(9, 9), (0, 0), (9, 9), (20, 0)]);
        // 去重保留首次出现，越界拒绝
        assert_eq!(outlets.cells(), &[grid.idx(9, 9), 0]);
    }

    #[test]
    fn test_manual_all_rejected_falls_back() {
        let grid = ramp_grid();
        let outlets = select_manual(&grid, &[(100, 100), (50, 0)]);
        let auto = select_by_percentile(&grid, DEFAULT_PERCENTILE);
        assert_eq!(outlets, auto);
    }
}
