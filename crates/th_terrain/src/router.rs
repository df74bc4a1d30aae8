// crates/th_terrain/src/router.rs

//! 汇流预处理
//!
//! 一次性预处理流程：洼地填充 → D8 最陡下降流向 → 汇流累积。
//! 产出的 [`FlowField`] 用于排水网络可视化与诊断；累积值是相对权重，
//! 不是守恒量（单遍行主序扫掠的近似，见模块内注释）。

use crate::grid::TerrainGrid;

/// 洼地填充最大迭代次数
pub const MAX_FILL_ITERATIONS: usize = 3;

/// 填充后低于最低邻居的下压量 [m]
///
/// 刻意使填充单元略低于最低邻居，以便后续扫掠向外排水。
pub const FILL_DROP: f64 = 0.01;

/// D8 行偏移（从北起顺时针）
const D8_DI: [isize; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];
/// D8 列偏移（从北起顺时针）
const D8_DJ: [isize; 8] = [0, 1, 1, 1, 0, -1, -1, -1];

/// 汇流场
#[derive(Debug, Clone)]
pub struct FlowField {
    /// D8 流向（0..8，无下坡方向为 -1）
    pub flow_dir: Vec<i8>,
    /// 汇流累积（相对权重）
    pub accumulation: Vec<f64>,
}

/// 汇流预处理器
#[derive(Debug, Clone)]
pub struct FlowRouter {
    /// 洼地填充最大迭代次数
    max_fill_iterations: usize,
}

impl Default for FlowRouter {
    fn default() -> Self {
        Self {
            max_fill_iterations: MAX_FILL_ITERATIONS,
        }
    }
}

impl FlowRouter {
    /// 创建预处理器
    pub fn new() -> Self {
        Self::default()
    }

    /// 执行完整预处理：洼地填充 + D8 流向 + 汇流累积
    pub fn route(&self, grid: &TerrainGrid) -> FlowField {
        let (filled, iterations) = self.fill_depressions(grid);
        tracing::debug!("洼地填充完成，迭代 {} 次", iterations);
        self.accumulate(grid, &filled)
    }

    /// 洼地填充
    ///
    /// 对每个非无数据的内部单元检查 8 邻居：若所有非无数据邻居的
    /// 高程均严格大于该单元（局部洼地），将其抬升至最低邻居高程减
    /// [`FILL_DROP`]。重复至无单元被抬升或达到迭代上限。
    ///
    /// # 返回
    ///
    /// (填充后的高程数组, 实际迭代次数)
    pub fn fill_depressions(&self, grid: &TerrainGrid) -> (Vec<f64>, usize) {
        let mut filled = grid.z().to_vec();
        let (nx, ny) = (grid.nx(), grid.ny());
        let mut iterations = 0;

        while iterations < self.max_fill_iterations {
            iterations += 1;
            let mut raised = false;

            for i in 1..nx.saturating_sub(1) {
                for j in 1..ny.saturating_sub(1) {
                    let k = i * ny + j;
                    if TerrainGrid::is_nodata_value(filled[k]) {
                        continue;
                    }

                    let mut is_pit = true;
                    let mut lowest = f64::MAX;
                    for d in 0..8 {
                        let ni = i as isize + D8_DI[d];
                        let nj = j as isize + D8_DJ[d];
                        if ni < 0 || ni >= nx as isize || nj < 0 || nj >= ny as isize {
                            continue;
                        }
                        let nk = ni as usize * ny + nj as usize;
                        if TerrainGrid::is_nodata_value(filled[nk]) {
                            continue;
                        }
                        if filled[nk] <= filled[k] {
                            is_pit = false;
                            break;
                        }
                        lowest = lowest.min(filled[nk]);
                    }

                    if is_pit && lowest < f64::MAX {
                        let target = lowest - FILL_DROP;
                        if target > filled[k] {
                            filled[k] = target;
                            raised = true;
                        }
                    }
                }
            }

            if !raised {
                break;
            }
        }

        (filled, iterations)
    }

    /// D8 流向与汇流累积
    ///
    /// 对每个非无数据单元在 8 邻居中寻找坡度最大的下坡方向
    /// （对角距离为 `resolution * sqrt(2)`），存在严格正坡度时记录
    /// 流向，并在单遍行主序扫掠中把 `1 + accumulation[k]` 累加给
    /// 下游单元。该扫掠假设上游单元先于下游被处理，对任意流向图
    /// 并不严格成立；累积场仅作相对权重使用。
    fn accumulate(&self, grid: &TerrainGrid, filled: &[f64]) -> FlowField {
        let (nx, ny) = (grid.nx(), grid.ny());
        let n = nx * ny;
        let resolution = grid.resolution();
        let diag = resolution * std::f64::consts::SQRT_2;

        let mut flow_dir = vec![-1i8; n];
        let mut accumulation = vec![0.0f64; n];

        for i in 0..nx {
            for j in 0..ny {
                let k = i * ny + j;
                if TerrainGrid::is_nodata_value(filled[k]) {
                    continue;
                }

                let mut max_slope = 0.0;
                let mut best: i8 = -1;
                for d in 0..8 {
                    let ni = i as isize + D8_DI[d];
                    let nj = j as isize + D8_DJ[d];
                    if ni < 0 || ni >= nx as isize || nj < 0 || nj >= ny as isize {
                        continue;
                    }
                    let nk = ni as usize * ny + nj as usize;
                    if TerrainGrid::is_nodata_value(filled[nk]) {
                        continue;
                    }
                    let dist = if d % 2 == 0 { resolution } else { diag };
                    let slope = (filled[k] - filled[nk]) / dist;
                    if slope > max_slope {
                        max_slope = slope;
                        best = d as i8;
                    }
                }

                if best >= 0 {
                    flow_dir[k] = best;
                    let d = best as usize;
                    let nk = (i as isize + D8_DI[d]) as usize * ny
                        + (j as isize + D8_DJ[d]) as usize;
                    accumulation[nk] += 1.0 + accumulation[k];
                }
            }
        }

        FlowField {
            flow_dir,
            accumulation,
        }
    }
}

// ============================================================
// 测试
// ============================================================
