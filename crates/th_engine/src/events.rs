// crates/th_engine/src/events.rs

//! 事件系统模块
//!
//! 引擎向观察者发布单向事件流：每步完成后的时间推进事件、
//! 降采样的水深快照事件，以及运行生命周期事件。观察者不得
//! 通过事件回调修改引擎状态。

use parking_lot::RwLock;
use std::sync::Arc;

/// 模拟事件
#[derive(Debug, Clone)]
pub enum SimulationEvent {
    /// 网格加载完成
    GridLoaded {
        /// 行数
        nx: usize,
        /// 列数
        ny: usize,
        /// 像元边长 [m]
        resolution: f64,
    },
    /// 时间推进（每步一次）
    TimeAdvanced {
        /// 当前模拟时间 [s]
        time: f64,
        /// 总时长 [s]
        total_time: f64,
    },
    /// 步完成快照（按驱动器降采样间隔发布）
    StepCompleted {
        /// 当前模拟时间 [s]
        time: f64,
        /// 水深场快照 [m]
        depths: Arc<Vec<f64>>,
    },
    /// 运行完成
    RunCompleted {
        /// 总步数
        total_steps: u64,
        /// 墙钟耗时 [s]
        duration_secs: f64,
    },
    /// 运行被取消
    RunCancelled {
        /// 取消时刻的模拟时间 [s]
        time: f64,
    },
}

impl SimulationEvent {
    /// 获取事件名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::GridLoaded { .. } => "GridLoaded",
            Self::TimeAdvanced { .. } => "TimeAdvanced",
            Self::StepCompleted { .. } => "StepCompleted",
            Self::RunCompleted { .. } => "RunCompleted",
            Self::RunCancelled { .. } => "RunCancelled",
        }
    }
}

/// 事件监听器 trait
pub trait EventListener: Send + Sync {
    /// 处理事件
    fn on_event(&self, event: &SimulationEvent);

    /// 获取监听器名称（用于调试）
    fn name(&self) -> &str {
        "anonymous"
    }
}

/// 函数式事件监听器
pub struct FnListener<F>
where
    F: Fn(&SimulationEvent) + Send + Sync,
{
    name: String,
    handler: F,
}

impl<F> FnListener<F>
where
    F: Fn(&SimulationEvent) + Send + Sync,
{
    /// 创建函数式监听器
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> EventListener for FnListener<F>
where
    F: Fn(&SimulationEvent) + Send + Sync,
{
    fn on_event(&self, event: &SimulationEvent) {
        (self.handler)(event);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// 日志事件监听器
///
/// 通过 tracing 输出生命周期事件；逐步事件仅在详细模式下输出。
pub struct LoggingListener {
    /// 日志前缀
    prefix: String,
    /// 是否输出逐步事件
    verbose: bool,
}

impl LoggingListener {
    /// 创建日志监听器
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            verbose: false,
        }
    }

    /// 设置详细模式
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }
}

impl EventListener for LoggingListener {
    fn on_event(&self, event: &SimulationEvent) {
        let msg = match event {
            SimulationEvent::GridLoaded { nx, ny, resolution } => {
                format!("网格加载: {} x {}, 分辨率 {} m", nx, ny, resolution)
            }
            SimulationEvent::RunCompleted {
                total_steps,
                duration_secs,
            } => {
                format!("运行完成: {} 步, 耗时 {:.2} s", total_steps, duration_secs)
            }
            SimulationEvent::RunCancelled { time } => {
                format!("运行取消于 t={:.1} s", time)
            }
            SimulationEvent::TimeAdvanced { time, total_time } if self.verbose => {
                format!("t = {:.1} / {:.1} s", time, total_time)
            }
            _ => return,
        };

        tracing::info!("{}: {}", self.prefix, msg);
    }

    fn name(&self) -> &str {
        "LoggingListener"
    }
}

/// 事件分发器
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn EventListener>>>,
}

impl EventDispatcher {
    /// 创建新的事件分发器
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// 添加监听器
    pub fn add_listener(&self, listener: Arc<dyn EventListener>) {
        let name = listener.name().to_string();
        self.listeners.write().push(listener);
        tracing::debug!("添加事件监听器: {}", name);
    }

    /// 添加函数式监听器
    pub fn add_fn_listener<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&SimulationEvent) + Send + Sync + 'static,
    {
        self.add_listener(Arc::new(FnListener::new(name, handler)));
    }

    /// 清除所有监听器
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// 分发事件
    pub fn emit(&self, event: SimulationEvent) {
        let listeners = self.listeners.read();
        tracing::trace!("发布事件: {}", event.name());
        for listener in listeners.iter() {
            listener.on_event(&event);
        }
    }

    /// 获取监听器数量
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

// ============================================================
// 测试
// ============================================================
