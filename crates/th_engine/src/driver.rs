// crates/th_engine/src/driver.rs

//! 模拟驱动器
//!
//! 持有网格、求解器、降雨源、出水口集合、排水记账器与汇流预处理
//! 结果，按 降雨 → 求解 → 排水 的顺序组合每个时间步，推进模拟
//! 时间并发布事件。
//!
//! # 生命周期
//!
//! ```text
//! Idle --load_grid--> Ready --initialize--> Running --时间走完--> Finished
//!                       ^                      |
//!                       |                   cancel()
//!                       +---- initialize ---- Cancelled
//! ```
//!
//! Running 状态下拒绝修改参数与出水口配置。取消只发生在步边界；
//! 被取消的运行保留部分推进的网格状态，须重新 `initialize()` 从
//! t=0 开始。

use crate::error::{EngineError, EngineResult};
use crate::events::{EventDispatcher, SimulationEvent};
use crate::scenario::{OutletSpec, ScenarioConfig};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use th_physics::{
    select_by_percentile, select_manual, DrainageAccountant, DrainageConfig, OutletSet,
    OverlandFlowSolver, RainfallSource, SimulationParams, SolverConfig, DEFAULT_PERCENTILE,
};
use th_terrain::{FlowField, FlowRouter, TerrainGrid};

/// 默认像元边长 [m]（无地理变换时的兜底值，可被覆盖）
pub const DEFAULT_RESOLUTION: f64 = 0.25;

/// 默认快照降采样间隔（步）
pub const DEFAULT_SNAPSHOT_INTERVAL: u64 = 5;

/// 可调参数种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Manning 糙率系数
    Manning,
    /// 入渗速率 [m/s]
    Ks,
    /// 干湿阈值水深 [m]
    MinDepth,
    /// 时间步长 [s]
    Dt,
    /// 模拟总时长 [s]
    TotalTime,
    /// 像元边长 [m]
    Resolution,
    /// 常量降雨强度 [m/s]
    ConstantRainfall,
}

/// 驱动器运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// 尚未加载网格
    Idle,
    /// 网格已加载，等待初始化
    Ready,
    /// 初始化完成，可步进
    Running,
    /// 时间走完
    Finished,
    /// 运行被取消（须重新初始化）
    Cancelled,
}

/// 运行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// 正常走完
    Completed,
    /// 在步边界被取消
    Cancelled,
}

/// 模拟驱动器
pub struct SimulationDriver {
    grid: Option<TerrainGrid>,
    params: SimulationParams,
    /// 网格未采纳栅格像元尺寸时使用的分辨率 [m]
    fallback_resolution: f64,
    rainfall: RainfallSource,
    outlets: OutletSet,
    outlet_percentile: f64,
    solver: Option<OverlandFlowSolver>,
    solver_config: SolverConfig,
    drainage_config: DrainageConfig,
    accountant: DrainageAccountant,
    flow_field: Option<FlowField>,
    time: f64,
    step_count: u64,
    snapshot_interval: u64,
    state: RunState,
    events: EventDispatcher,
    cancelled: Arc<AtomicBool>,
}

impl Default for SimulationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationDriver {
    /// 创建驱动器（默认参数）
    pub fn new() -> Self {
        let drainage_config = DrainageConfig::default();
        Self {
            grid: None,
            params: SimulationParams::default(),
            fallback_resolution: DEFAULT_RESOLUTION,
            rainfall: RainfallSource::default(),
            outlets: OutletSet::default(),
            outlet_percentile: DEFAULT_PERCENTILE,
            solver: None,
            solver_config: SolverConfig::default(),
            accountant: DrainageAccountant::new(drainage_config.clone()),
            drainage_config,
            flow_field: None,
            time: 0.0,
            step_count: 0,
            snapshot_interval: DEFAULT_SNAPSHOT_INTERVAL,
            state: RunState::Idle,
            events: EventDispatcher::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    // =========================================================================
    // 配置
    // =========================================================================

    /// 事件分发器（注册监听器用）
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// 取消标志（供其他线程在步边界请求停止）
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// 请求取消当前运行
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// 设置排水律配置（下次 initialize 生效）
    pub fn set_drainage_config(&mut self, config: DrainageConfig) -> EngineResult<()> {
        self.guard_not_running()?;
        self.drainage_config = config;
        Ok(())
    }

    /// 设置求解器并行配置（下次 initialize 生效）
    pub fn set_solver_config(&mut self, config: SolverConfig) -> EngineResult<()> {
        self.guard_not_running()?;
        self.solver_config = config;
        Ok(())
    }

    /// 设置快照降采样间隔（步）
    pub fn set_snapshot_interval(&mut self, interval: u64) {
        self.snapshot_interval = interval.max(1);
    }

    /// 修改标量参数
    ///
    /// Running 状态下拒绝修改。
    pub fn set_param(&mut self, kind: ParamKind, value: f64) -> EngineResult<()> {
        self.guard_not_running()?;
        match kind {
            ParamKind::Manning => self.params.n_manning = value,
            ParamKind::Ks => self.params.infiltration = value,
            ParamKind::MinDepth => self.params.min_depth = value,
            ParamKind::Dt => self.params.dt = value,
            ParamKind::TotalTime => self.params.total_time = value,
            ParamKind::Resolution => {
                self.fallback_resolution = value;
                if let Some(grid) = self.grid.as_mut() {
                    grid.set_resolution(value);
                }
            }
            ParamKind::ConstantRainfall => {
                self.params.rainfall_rate = value;
                self.rainfall.set_constant_rate(value);
            }
        }
        Ok(())
    }

    /// 设置降雨日程（写入时规范化）
    pub fn set_rainfall_schedule(&mut self, entries: Vec<(f64, f64)>) -> EngineResult<()> {
        self.guard_not_running()?;
        self.rainfall.set_schedule(entries);
        Ok(())
    }

    /// 启用或禁用时变降雨
    pub fn set_time_varying_rainfall(&mut self, enabled: bool) -> EngineResult<()> {
        self.guard_not_running()?;
        self.rainfall.set_time_varying(enabled);
        Ok(())
    }

    /// 按百分位重建出水口集合
    pub fn configure_outlets_by_percentile(&mut self, percentile: f64) -> EngineResult<()> {
        self.guard_not_running()?;
        let grid = self.grid.as_ref().ok_or(EngineError::GridNotLoaded)?;
        if percentile > 0.0 && percentile < 1.0 {
            self.outlet_percentile = percentile;
        } else {
            self.outlet_percentile = DEFAULT_PERCENTILE;
        }
        self.outlets = select_by_percentile(grid, self.outlet_percentile);
        Ok(())
    }

    /// 手动指定出水口（无效候选被剔除，全部无效时回退自动选择）
    pub fn set_manual_outlets(&mut self, points: &[(usize, usize)]) -> EngineResult<()> {
        self.guard_not_running()?;
        let grid = self.grid.as_ref().ok_or(EngineError::GridNotLoaded)?;
        self.outlets = select_manual(grid, points);
        Ok(())
    }

    // =========================================================================
    // 加载与初始化
    // =========================================================================

    /// 加载 DEM 并重置出水口与汇流预处理
    ///
    /// 成功后状态转为 Ready；失败时保持原网格不变。
    pub fn load_grid(&mut self, path: &Path) -> EngineResult<()> {
        self.guard_not_running()?;

        let raster = th_io::load_dem(path)?;
        let grid = TerrainGrid::from_raster(&raster, self.fallback_resolution)?;

        // 出水口重置为当前百分位的默认选择
        self.outlets = select_by_percentile(&grid, self.outlet_percentile);
        // 汇流预处理
        self.flow_field = Some(FlowRouter::new().route(&grid));

        self.events.emit(SimulationEvent::GridLoaded {
            nx: grid.nx(),
            ny: grid.ny(),
            resolution: grid.resolution(),
        });
        tracing::info!(
            "DEM 加载成功: {} x {}, 分辨率 {} m, 出水口 {} 个",
            grid.nx(),
            grid.ny(),
            grid.resolution(),
            self.outlets.len()
        );

        self.grid = Some(grid);
        self.solver = None;
        self.time = 0.0;
        self.step_count = 0;
        self.state = RunState::Ready;
        Ok(())
    }

    /// 初始化模拟
    ///
    /// 校验参数与前置条件，重置时间、水深、活跃集、时间序列与
    /// 逐出水口体积，时间序列以 (0, 0) 起始。成功后状态转为 Running。
    pub fn initialize(&mut self) -> EngineResult<()> {
        let grid = self.grid.as_mut().ok_or(EngineError::GridNotLoaded)?;

        self.params.validate()?;
        if grid.resolution() <= 0.0 {
            return Err(EngineError::InvalidParameter {
                field: "resolution",
                value: grid.resolution(),
            });
        }

        // 出水口为空时重算默认选择，仍为空即失败
        if self.outlets.is_empty() {
            self.outlets = select_by_percentile(grid, self.outlet_percentile);
        }
        if self.outlets.is_empty() {
            return Err(EngineError::NoOutlets);
        }

        grid.reset_depths();
        self.rainfall.set_constant_rate(self.params.rainfall_rate);
        self.rainfall.ensure_schedule();

        let solver =
            OverlandFlowSolver::new(grid.n_cells(), self.params.clone(), self.solver_config.clone())?;
        self.solver = Some(solver);

        self.accountant = DrainageAccountant::new(self.drainage_config.clone());
        self.accountant.reset(self.outlets.cells());

        self.time = 0.0;
        self.step_count = 0;
        self.cancelled.store(false, Ordering::SeqCst);
        self.state = RunState::Running;

        tracing::info!(
            "初始化完成: dt={} s, 总时长={} s, 出水口 {} 个",
            self.params.dt,
            self.params.total_time,
            self.outlets.len()
        );
        Ok(())
    }

    // =========================================================================
    // 步进与运行
    // =========================================================================

    /// 推进一个时间步
    ///
    /// 依次执行降雨查询、求解器单步、出水口排水，推进时间并发布
    /// 事件。时间走完后状态转为 Finished，再次调用为空操作。
    pub fn step(&mut self) -> EngineResult<()> {
        if self.state != RunState::Running {
            return Err(EngineError::NotInitialized);
        }
        if self.time >= self.params.total_time {
            self.state = RunState::Finished;
            return Ok(());
        }

        let grid = self.grid.as_mut().ok_or(EngineError::GridNotLoaded)?;
        let solver = self.solver.as_mut().ok_or(EngineError::NotInitialized)?;

        let rate = self.rainfall.rate_at(self.time);
        let diag = solver.step(grid, rate);
        self.accountant.drain_step(
            grid,
            self.outlets.cells(),
            solver.params(),
            diag.total_water,
            self.time,
        );

        self.time += self.params.dt;
        self.step_count += 1;

        self.events.emit(SimulationEvent::TimeAdvanced {
            time: self.time,
            total_time: self.params.total_time,
        });
        if self.step_count % self.snapshot_interval == 0 {
            self.events.emit(SimulationEvent::StepCompleted {
                time: self.time,
                depths: Arc::new(grid.h().to_vec()),
            });
        }
        if self.step_count % 10 == 0 {
            tracing::debug!(
                "t={:.1} s, 活跃 {} 单元, 系统水量 {:.3e} m³, 累计排水 {:.3e} m³",
                self.time,
                diag.n_active,
                diag.total_water,
                self.accountant.total_volume()
            );
        }

        if self.time >= self.params.total_time {
            self.state = RunState::Finished;
        }
        Ok(())
    }

    /// 运行到时间走完或被取消
    ///
    /// 取消标志只在步边界检查；被取消的运行须重新 `initialize()`。
    pub fn run(&mut self) -> EngineResult<RunOutcome> {
        if self.state != RunState::Running {
            return Err(EngineError::NotInitialized);
        }
        let start = Instant::now();

        while !self.is_finished() {
            if self.cancelled.load(Ordering::SeqCst) {
                self.state = RunState::Cancelled;
                self.events
                    .emit(SimulationEvent::RunCancelled { time: self.time });
                tracing::warn!("运行在 t={:.1} s 被取消", self.time);
                return Ok(RunOutcome::Cancelled);
            }
            self.step()?;
        }

        self.events.emit(SimulationEvent::RunCompleted {
            total_steps: self.step_count,
            duration_secs: start.elapsed().as_secs_f64(),
        });
        Ok(RunOutcome::Completed)
    }

    /// 时间是否走完
    pub fn is_finished(&self) -> bool {
        self.time >= self.params.total_time
    }

    // =========================================================================
    // 查询
    // =========================================================================

    /// 当前模拟时间 [s]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// 已完成步数
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// 当前状态
    pub fn state(&self) -> RunState {
        self.state
    }

    /// 模拟参数
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// 降雨源
    pub fn rainfall(&self) -> &RainfallSource {
        &self.rainfall
    }

    /// 网格（加载后可用）
    pub fn grid(&self) -> Option<&TerrainGrid> {
        self.grid.as_ref()
    }

    /// 出水口集合
    pub fn outlets(&self) -> &OutletSet {
        &self.outlets
    }

    /// 水深场只读视图
    pub fn snapshot_depths(&self) -> EngineResult<&[f64]> {
        Ok(self.grid.as_ref().ok_or(EngineError::GridNotLoaded)?.h())
    }

    /// 累计排水时间序列 (t, V)
    pub fn get_time_series(&self) -> &[(f64, f64)] {
        self.accountant.series()
    }

    /// 全局累计排水体积 [m³]
    pub fn total_drainage(&self) -> f64 {
        self.accountant.total_volume()
    }

    /// 逐出水口体积 ((行, 列), V)，按体积降序
    pub fn get_per_outlet_volumes(&self) -> Vec<((usize, usize), f64)> {
        let Some(grid) = self.grid.as_ref() else {
            return Vec::new();
        };
        self.accountant
            .per_outlet_sorted()
            .into_iter()
            .map(|(k, v)| (grid.coords(k), v))
            .collect()
    }

    /// 汇流累积栅格（加载时预计算，缺失时按需重算）
    pub fn get_flow_accumulation(&mut self) -> EngineResult<&[f64]> {
        if self.flow_field.is_none() {
            let grid = self.grid.as_ref().ok_or(EngineError::GridNotLoaded)?;
            self.flow_field = Some(FlowRouter::new().route(grid));
        }
        match self.flow_field.as_ref() {
            Some(field) => Ok(&field.accumulation),
            None => Err(EngineError::GridNotLoaded),
        }
    }

    // =========================================================================
    // 场景
    // =========================================================================

    /// 应用场景配置（加载 DEM 并设置参数、降雨与出水口）
    pub fn apply_scenario(&mut self, scenario: &ScenarioConfig) -> EngineResult<()> {
        self.guard_not_running()?;

        self.params = scenario.params.clone();
        if let Some(res) = scenario.resolution {
            self.fallback_resolution = res;
        }
        self.load_grid(&scenario.dem)?;

        self.rainfall.set_constant_rate(self.params.rainfall_rate);
        if let Some(schedule) = &scenario.rainfall_schedule {
            self.rainfall.set_schedule(schedule.clone());
        }
        self.rainfall.set_time_varying(scenario.time_varying_rainfall);

        match &scenario.outlets {
            OutletSpec::Percentile { percentile } => {
                self.configure_outlets_by_percentile(*percentile)?;
            }
            OutletSpec::Manual { cells } => {
                self.set_manual_outlets(cells)?;
            }
        }

        if let Some(interval) = scenario.snapshot_interval {
            self.set_snapshot_interval(interval);
        }
        Ok(())
    }

    fn guard_not_running(&self) -> EngineResult<()> {
        if self.state == RunState::Running {
            Err(EngineError::SimulationRunning)
        } else {
            Ok(())
        }
    }
}
