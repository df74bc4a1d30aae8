// crates/th_physics/src/drainage.rs

//! 出水口排水记账
//!
//! 通量更新之后，出水口按更激进的排水律移除水量，模拟"水在此离开
//! 计算域"的边界条件。排水律不是物理边界而是面向交互探索的启发式
//! 汇项，常数全部暴露为可标定配置 [`DrainageConfig`]；任何配置下
//! 维持三条契约：
//!
//! 1. 出水口水深保持非负（单步最多排出存水的 `max_drain_fraction`）
//! 2. 逐出水口与全局累计体积单调不减
//! 3. 每步考察全部出水口

use crate::types::SimulationParams;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use th_terrain::TerrainGrid;

/// 排水律配置
///
/// 默认值按交互响应性标定；`base_factor` 与坡度假设无物理推导，
/// 属交互响应性调参。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainageConfig {
    /// 基础排水倍率
    pub base_factor: f64,
    /// 出水口处的假定水力坡度
    pub assumed_slope: f64,
    /// 时间爬升时长 [s]（爬升因子 0.7 → 1.0）
    pub ramp_duration: f64,
    /// 水量增益阈值 [m³]
    pub water_threshold: f64,
    /// 水量增益尺度 [m³]
    pub water_boost_scale: f64,
    /// 水量增益上限
    pub max_water_boost: f64,
    /// 单步最大排出比例（防止出水口瞬间完全干涸而脱离活跃集）
    pub max_drain_fraction: f64,
}

impl Default for DrainageConfig {
    fn default() -> Self {
        Self {
            base_factor: 2.5,
            assumed_slope: 0.2,
            ramp_duration: 120.0,
            water_threshold: 1.0,
            water_boost_scale: 10.0,
            max_water_boost: 2.0,
            max_drain_fraction: 0.95,
        }
    }
}

/// 出水口排水记账器
///
/// 维护逐出水口与全局的累计排水体积，以及 `(t, V_累计)` 时间序列。
/// 序列每步追加一条，时间严格递增。
#[derive(Debug, Clone)]
pub struct DrainageAccountant {
    config: DrainageConfig,
    /// 逐出水口累计体积 [m³]，键恰为当前出水口集合
    per_outlet: HashMap<usize, f64>,
    /// 全局累计体积 [m³]
    total_volume: f64,
    /// 时间序列 (t [s], V_累计 [m³])
    series: Vec<(f64, f64)>,
}

impl DrainageAccountant {
    /// 创建记账器
    pub fn new(config: DrainageConfig) -> Self {
        Self {
            config,
            per_outlet: HashMap::new(),
            total_volume: 0.0,
            series: Vec::new(),
        }
    }

    /// 排水律配置
    pub fn config(&self) -> &DrainageConfig {
        &self.config
    }

    /// 重置并为当前出水口集合建立零值条目，序列以 (0, 0) 起始
    pub fn reset(&mut self, outlets: &[usize]) {
        self.per_outlet.clear();
        for &k in outlets {
            self.per_outlet.insert(k, 0.0);
        }
        self.total_volume = 0.0;
        self.series.clear();
        self.series.push((0.0, 0.0));
    }

    /// 自适应排水因子
    ///
    /// 系统水量超过阈值时增益（封顶），并叠加前
    /// `ramp_duration` 秒内从 0.7 到 1.0 的时间爬升。
    fn drain_factor(&self, total_water: f64, time: f64) -> f64 {
        let mut factor = 1.0;
        if total_water > self.config.water_threshold {
            factor += ((total_water - self.config.water_threshold) / self.config.water_boost_scale)
                .min(self.config.max_water_boost);
        }
        let progress = (time / self.config.ramp_duration).min(1.0);
        factor * (0.7 + 0.3 * progress)
    }

    /// 对全部出水口执行一步排水并记账
    ///
    /// 对每个水深超过阈值的出水口：
    ///
    /// ```text
    /// Q     = base_factor · factor · A · h^(2/3) · √S / n    (A = h·res)
    /// V_out = min(max_drain_fraction · h · A_cell, Q · dt)
    /// ```
    ///
    /// # 参数
    ///
    /// - `total_water`: 降雨入渗后的系统总水量 [m³]
    /// - `time`: 当前模拟时间（步首）[s]
    ///
    /// # 返回
    ///
    /// 本步排出的总体积 [m³]。
    pub fn drain_step(
        &mut self,
        grid: &mut TerrainGrid,
        outlets: &[usize],
        params: &SimulationParams,
        total_water: f64,
        time: f64,
    ) -> f64 {
        let dt = params.dt;
        let cell_area = grid.cell_area();
        let resolution = grid.resolution();
        let factor = self.drain_factor(total_water, time);
        let sqrt_slope = self.config.assumed_slope.sqrt();

        let mut outflow = 0.0;
        for &k in outlets {
            if grid.is_nodata(k) {
                continue;
            }
            let h_k = grid.h()[k];
            if h_k <= params.min_depth {
                continue;
            }

            let area = h_k * resolution;
            let q = self.config.base_factor * factor * area * h_k.powf(2.0 / 3.0) * sqrt_slope
                / params.n_manning;
            let cap = self.config.max_drain_fraction * h_k * cell_area;
            let vol = (q * dt).min(cap);

            grid.h_mut()[k] -= vol / cell_area;
            outflow += vol;
            *self.per_outlet.entry(k).or_insert(0.0) += vol;
        }

        self.total_volume += outflow;
        self.series.push((time + dt, self.total_volume));
        outflow
    }

    /// 全局累计排水体积 [m³]
    pub fn total_volume(&self) -> f64 {
        self.total_volume
    }

    /// 时间序列 (t, V_累计)
    pub fn series(&self) -> &[(f64, f64)] {
        &self.series
    }

    /// 逐出水口累计体积
    pub fn per_outlet(&self) -> &HashMap<usize, f64> {
        &self.per_outlet
    }

    /// 逐出水口累计体积，按体积降序
    pub fn per_outlet_sorted(&self) -> Vec<(usize, f64)> {
        let mut entries: Vec<(usize, f64)> = self.per_outlet.iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        entries
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn wet_grid() -> TerrainGrid {
        let mut grid = TerrainGrid::from_rows(&vec![vec![0.0; 4]; 4], 1.0).unwrap();
        grid.h_mut().fill(0.1);
        grid
    }

    fn params() -> SimulationParams {
        SimulationParams::default()
    }

    #[test]
    fn test_drain_keeps_depth_nonnegative() {
        let mut grid = wet_grid();
        let mut acc = DrainageAccountant::new(DrainageConfig::default());
        let outlets = vec![0, 1];
        acc.reset(&outlets);

        for step in 0..50 {
            let t = step as f64;
            acc.drain_step(&mut grid, &outlets, &params(), 1.6, t);
            for &k in &outlets {
                assert!(grid.h()[k] >= 0.0, "出水口 {} 负水深", k);
            }
        }
    }

    #[test]
    fn test_drain_cap_leaves_residual_water() {
        // 大倍率下单步排出不超过 95%
        let mut grid = wet_grid();
        let config = DrainageConfig {
            base_factor: 1e6,
            ..Default::default()
        };
        let mut acc = DrainageAccountant::new(config);
        let outlets = vec![0];
        acc.reset(&outlets);
        acc.drain_step(&mut grid, &outlets, &params(), 1.6, 0.0);
        assert!(grid.h()[0] > 0.0);
        assert!((grid.h()[0] - 0.1 * 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_volumes_monotonic_and_consistent() {
        let mut grid = wet_grid();
        let mut acc = DrainageAccountant::new(DrainageConfig::default());
        let outlets = vec![0, 3, 12];
        acc.reset(&outlets);

        let mut prev_total = 0.0;
        let mut prev_outlet: HashMap<usize, f64> = acc.per_outlet().clone();
        for step in 0..30 {
            let t = step as f64;
            acc.drain_step(&mut grid, &outlets, &params(), 1.6, t);

            // 全局单调
            assert!(acc.total_volume() >= prev_total);
            prev_total = acc.total_volume();

            // 逐出水口单调
            for (&k, &v) in acc.per_outlet() {
                assert!(v >= prev_outlet[&k], "出水口 {} 体积回退", k);
            }
            prev_outlet = acc.per_outlet().clone();

            // 全局 = 逐出水口之和
            let sum: f64 = acc.per_outlet().values().sum();
            assert!((sum - acc.total_volume()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_series_appended_each_step() {
        let mut grid = wet_grid();
        let mut acc = DrainageAccountant::new(DrainageConfig::default());
        let outlets = vec![0];
        acc.reset(&outlets);
        assert_eq!(acc.series(), &[(0.0, 0.0)]);

        let p = params();
        for step in 0..5 {
            acc.drain_step(&mut grid, &outlets, &p, 0.5, step as f64 * p.dt);
        }
        assert_eq!(acc.series().len(), 6);
        // 时间严格递增
        for w in acc.series().windows(2) {
            assert!(w[1].0 > w[0].0);
        }
    }

    #[test]
    fn test_drain_factor_ramp_and_boost() {
        let acc = DrainageAccountant::new(DrainageConfig::default());
        // t=0：爬升因子 0.7；水量低于阈值无增益
        assert!((acc.drain_factor(0.5, 0.0) - 0.7).abs() < 1e-12);
        // t >= 120：爬升完成
        assert!((acc.drain_factor(0.5, 120.0) - 1.0).abs() < 1e-12);
        // 高水量：增益封顶于 1 + 2 = 3
        assert!((acc.drain_factor(1e6, 120.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_dry_outlet_skipped() {
        let mut grid = TerrainGrid::from_rows(&vec![vec![0.0; 2]; 2], 1.0).unwrap();
        let mut acc = DrainageAccountant::new(DrainageConfig::default());
        let outlets = vec![0];
        acc.reset(&outlets);
        let out = acc.drain_step(&mut grid, &outlets, &params(), 0.0, 0.0);
        assert_eq!(out, 0.0);
        assert_eq!(acc.per_outlet()[&0], 0.0);
    }

    #[test]
    fn test_per_outlet_sorted_descending() {
        let mut grid = wet_grid();
        grid.h_mut()[5] = 0.3;
        let mut acc = DrainageAccountant::new(DrainageConfig::default());
        let outlets = vec![0, 5];
        acc.reset(&outlets);
        acc.drain_step(&mut grid, &outlets, &params(), 1.6, 0.0);

        let sorted = acc.per_outlet_sorted();
        assert_eq!(sorted[0].0, 5, "更深的出水口应排在前面");
        assert!(sorted[0].1 >= sorted[1].1);
    }
}
