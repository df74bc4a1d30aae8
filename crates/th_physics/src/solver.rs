// crates/th_physics/src/solver.rs

//! 坡面流求解器
//!
//! 单步序列：
//! 1. 降雨与入渗：全网格并行施加 `(r - Ks)·dt`，新湿润单元激活
//! 2. 通量计算：对活跃单元按 Manning 公式计算向 4 邻居的出流
//! 3. 质量守恒缩放：单步出流体积不得超过单元存水量
//! 4. 净深度更新：入流按邻居自身的缩放因子计入
//! 5. 活跃集维护：湿润单元连同邻居进入下一步，双缓冲交换
//!
//! 并行采用先并行计算、后串行累加的模式：各阶段并行映射为
//! 逐单元结果向量，随后串行回填稠密暂存数组。规模低于阈值时
//! 自动转为串行执行。
//!
//! # 数值边界
//!
//! - `h < min_depth` 的单元出流恒为零
//! - 通量只取 4-连通；对角方向仅用于汇流预处理
//! - 缩放因子保证步后 `h >= 0`，不依赖全局小步长

use crate::active::ActiveSet;
use crate::types::SimulationParams;
use rayon::prelude::*;
use th_foundation::{ThError, ThResult};
use th_terrain::TerrainGrid;

// ============================================================
// 配置
// ============================================================

/// 并行策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParallelStrategy {
    /// 完全串行
    Sequential,
    /// 收集后累加：并行计算逐单元结果 → 串行回填
    CollectThenAccumulate,
    /// 按活跃单元数自动选择
    #[default]
    Auto,
}

/// 求解器配置
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// 并行策略
    pub strategy: ParallelStrategy,
    /// 最小并行活跃单元数（低于此值使用串行）
    pub min_parallel_size: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            strategy: ParallelStrategy::Auto,
            min_parallel_size: 1024,
        }
    }
}

impl SolverConfig {
    /// 设置并行策略
    pub fn with_strategy(mut self, strategy: ParallelStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// 设置最小并行规模
    pub fn with_min_parallel_size(mut self, size: usize) -> Self {
        self.min_parallel_size = size;
        self
    }
}

/// 单步诊断信息
#[derive(Debug, Clone, Copy)]
pub struct StepDiagnostics {
    /// 本步使用的降雨强度 [m/s]
    pub rainfall_rate: f64,
    /// 降雨入渗后的系统总水量 [m³]
    pub total_water: f64,
    /// 活跃单元数
    pub n_active: usize,
}

// ============================================================
// 求解器
// ============================================================

/// 坡面流求解器
///
/// 持有逐单元通量暂存与活跃集；网格在单步内可变借用。
pub struct OverlandFlowSolver {
    params: SimulationParams,
    config: SolverConfig,
    /// 各方向出流 [m³/s]（仅活跃单元条目有效）
    q_out: Vec<[f64; 4]>,
    /// 出流合计 [m³/s]
    q_total: Vec<f64>,
    /// 质量守恒缩放因子
    scale: Vec<f64>,
    /// 活跃单元集合
    active: ActiveSet,
}

impl OverlandFlowSolver {
    /// 创建求解器并分配暂存
    ///
    /// # 错误
    ///
    /// 暂存分配失败时返回 [`ThError::AllocationFailed`]。
    pub fn new(n_cells: usize, params: SimulationParams, config: SolverConfig) -> ThResult<Self> {
        let mut q_out = Vec::new();
        q_out
            .try_reserve_exact(n_cells)
            .map_err(|_| ThError::allocation_failed("q_out", n_cells))?;
        q_out.resize(n_cells, [0.0; 4]);

        let mut q_total = Vec::new();
        q_total
            .try_reserve_exact(n_cells)
            .map_err(|_| ThError::allocation_failed("q_total", n_cells))?;
        q_total.resize(n_cells, 0.0);

        let mut scale = Vec::new();
        scale
            .try_reserve_exact(n_cells)
            .map_err(|_| ThError::allocation_failed("scale", n_cells))?;
        scale.resize(n_cells, 1.0);

        Ok(Self {
            params,
            config,
            q_out,
            q_total,
            scale,
            active: ActiveSet::new(n_cells),
        })
    }

    /// 模拟参数
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// 活跃单元索引（升序）
    pub fn active_cells(&self) -> &[usize] {
        self.active.cells()
    }

    /// 清空活跃集（重新初始化时调用）
    pub fn reset(&mut self) {
        self.active.clear();
    }

    /// 扫描全网格，激活超过干湿阈值的单元及其邻居晕圈
    ///
    /// 初始化、或外部直接修改水深后调用。
    pub fn seed_active(&mut self, grid: &TerrainGrid) {
        let min_depth = self.params.min_depth;
        let h = grid.h();
        let active = &self.active;
        let newly: Vec<usize> = (0..grid.n_cells())
            .into_par_iter()
            .filter(|&k| h[k] > min_depth && !active.contains(k))
            .collect();

        for k in newly {
            self.active.activate(k);
            for d in 0..4 {
                if let Some(nb) = grid.neighbor(k, d) {
                    if !grid.is_nodata(nb) {
                        self.active.activate(nb);
                    }
                }
            }
        }
        self.active.commit();
    }

    /// 推进一个时间步
    ///
    /// # 参数
    ///
    /// - `grid`: 地形网格（本步内独占水深）
    /// - `rate`: 本步降雨强度 [m/s]
    ///
    /// # 返回
    ///
    /// 单步诊断信息（总水量供排水记账的自适应因子使用）。
    pub fn step(&mut self, grid: &mut TerrainGrid, rate: f64) -> StepDiagnostics {
        let dt = self.params.dt;
        let min_depth = self.params.min_depth;
        let cell_area = grid.cell_area();

        // (a) 降雨与入渗
        let forcing = (rate - self.params.infiltration) * dt;
        if forcing != 0.0 {
            let (z, h) = grid.z_and_h_mut();
            h.par_iter_mut().zip(z.par_iter()).for_each(|(hk, zk)| {
                if !TerrainGrid::is_nodata_value(*zk) {
                    *hk = (*hk + forcing).max(0.0);
                }
            });
            self.seed_active(grid);
        }

        // 系统总水量（无数据单元水深恒为 0，直接求和）
        let total_water: f64 = grid.h().par_iter().sum::<f64>() * cell_area;

        let n_active = self.active.len();
        let parallel = match self.config.strategy {
            ParallelStrategy::Sequential => false,
            ParallelStrategy::CollectThenAccumulate => true,
            ParallelStrategy::Auto => n_active >= self.config.min_parallel_size,
        };

        let resolution = grid.resolution();
        let n_manning = self.params.n_manning;

        // (b) 通量计算（并行映射，逐单元独立）
        let grid_ref: &TerrainGrid = grid;
        let outflow = |&k: &usize| cell_outflow(grid_ref, k, min_depth, resolution, n_manning);
        let fluxes: Vec<(usize, [f64; 4], f64)> = if parallel {
            self.active.cells().par_iter().map(outflow).collect()
        } else {
            self.active.cells().iter().map(outflow).collect()
        };

        // (c) 串行回填 + 质量守恒缩放因子
        for &(k, q, q_tot) in &fluxes {
            self.q_out[k] = q;
            self.q_total[k] = q_tot;
            let stored = grid_ref.h()[k] * cell_area;
            self.scale[k] = if q_tot > 0.0 && q_tot * dt > stored {
                stored / (q_tot * dt)
            } else {
                1.0
            };
        }

        // (d) 净深度变化：出流按自身因子，入流按邻居因子
        let q_out = &self.q_out;
        let q_total = &self.q_total;
        let scale = &self.scale;
        let active = &self.active;
        let net_change = |&k: &usize| -> (usize, f64) {
            let mut net = -scale[k] * q_total[k];
            for d in 0..4 {
                if let Some(nb) = grid_ref.neighbor(k, d) {
                    // 只有活跃邻居持有本步计算的有效通量
                    if active.contains(nb) {
                        net += scale[nb] * q_out[nb][(d + 2) % 4];
                    }
                }
            }
            (k, net * dt / cell_area)
        };
        let deltas: Vec<(usize, f64)> = if parallel {
            active.cells().par_iter().map(net_change).collect()
        } else {
            active.cells().iter().map(net_change).collect()
        };

        // 深度更新
        {
            let h = grid.h_mut();
            for &(k, dh) in &deltas {
                h[k] = (h[k] + dh).max(0.0);
            }
        }

        // (e) 活跃集维护（双缓冲交换）
        let (neighbors, z, h) = grid.split_mut();
        self.active.retire_and_propagate(neighbors, z, h, min_depth);

        StepDiagnostics {
            rainfall_rate: rate,
            total_water,
            n_active,
        }
    }
}

/// 单个单元向 4 邻居的 Manning 出流
///
/// 自由水面高程差为正的方向按
/// `Q = A · R^(2/3) · √S / n`（A = h·res，R = h，S = ΔH/res）计算。
fn cell_outflow(
    grid: &TerrainGrid,
    k: usize,
    min_depth: f64,
    resolution: f64,
    n_manning: f64,
) -> (usize, [f64; 4], f64) {
    let mut q = [0.0f64; 4];
    let mut q_tot = 0.0f64;

    let h_k = grid.h()[k];
    if grid.is_nodata(k) || h_k < min_depth {
        return (k, q, q_tot);
    }

    let head_k = grid.z()[k] + h_k;
    for d in 0..4 {
        let Some(nb) = grid.neighbor(k, d) else {
            continue;
        };
        if grid.is_nodata(nb) {
            continue;
        }
        let delta_head = head_k - (grid.z()[nb] + grid.h()[nb]);
        if delta_head > 0.0 {
            let slope = delta_head / resolution;
            let area = h_k * resolution;
            let radius = h_k;
            let flow = area * radius.powf(2.0 / 3.0) * slope.sqrt() / n_manning;
            q[d] = flow;
            q_tot += flow;
        }
    }

    (k, q, q_tot)
}

// ============================================================
// 测试
// ============================================================
