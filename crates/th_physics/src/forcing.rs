// crates/th_physics/src/forcing.rs

//! 降雨源
//!
//! 返回当前模拟时刻的瞬时降雨强度，支持两种模式：
//! - 常量强度
//! - 分段常量日程（右连续：时刻 `t` 的强度取最后一个 `time <= t`
//!   的日程项）
//!
//! 日程在写入时规范化：按时间升序排序，若最早项时间大于 0 则在
//! 前面补一条 `(0, 首项强度)`。

use serde::{Deserialize, Serialize};
use th_foundation::Scalar;

/// 降雨源
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RainfallSource {
    /// 常量降雨强度 [m/s]
    constant_rate: Scalar,
    /// 是否启用时变日程
    time_varying: bool,
    /// 日程 (时间 [s], 强度 [m/s])，按时间升序且首项时间为 0
    schedule: Vec<(Scalar, Scalar)>,
}

impl RainfallSource {
    /// 创建常量降雨源
    pub fn new(constant_rate: Scalar) -> Self {
        Self {
            constant_rate,
            time_varying: false,
            schedule: Vec::new(),
        }
    }

    /// 设置常量降雨强度 [m/s]
    pub fn set_constant_rate(&mut self, rate: Scalar) {
        self.constant_rate = rate;
    }

    /// 常量降雨强度 [m/s]
    pub fn constant_rate(&self) -> Scalar {
        self.constant_rate
    }

    /// 启用或禁用时变日程
    pub fn set_time_varying(&mut self, enabled: bool) {
        self.time_varying = enabled;
    }

    /// 是否启用时变日程
    pub fn is_time_varying(&self) -> bool {
        self.time_varying
    }

    /// 日程（已规范化）
    pub fn schedule(&self) -> &[(Scalar, Scalar)] {
        &self.schedule
    }

    /// 设置日程（任意顺序），写入时规范化
    ///
    /// 空输入退化为单条 `(0, 常量强度)` 项。
    pub fn set_schedule(&mut self, mut entries: Vec<(Scalar, Scalar)>) {
        entries.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        if let Some(&(first_time, first_rate)) = entries.first() {
            if first_time > 0.0 {
                entries.insert(0, (0.0, first_rate));
            }
        } else {
            entries.push((0.0, self.constant_rate));
        }

        self.schedule = entries;
    }

    /// 初始化兜底：启用时变但日程为空时补一条常量项
    pub fn ensure_schedule(&mut self) {
        if self.time_varying && self.schedule.is_empty() {
            self.schedule.push((0.0, self.constant_rate));
        }
    }

    /// 获取时刻 `t` 的降雨强度 [m/s]
    ///
    /// 时变禁用或日程为空时返回常量强度；否则返回最后一个
    /// `time <= t` 项的强度，若全部在未来则返回首项强度。
    pub fn rate_at(&self, t: Scalar) -> Scalar {
        if !self.time_varying || self.schedule.is_empty() {
            return self.constant_rate;
        }

        let mut rate = self.schedule[0].1;
        for &(time, r) in &self.schedule {
            if time > t {
                break;
            }
            rate = r;
        }
        rate
    }
}

impl Default for RainfallSource {
    fn default() -> Self {
        Self::new(0.0)
    }
}

// ============================================================
// 测试
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_mode() {
        let source = RainfallSource::new(1e-5);
        assert_eq!(source.rate_at(0.0), 1e-5);
        assert_eq!(source.rate_at(1e6), 1e-5);
    }

    #[test]
    fn test_schedule_canonicalization() {
        // 乱序输入 + 首项时间 > 0
        let mut source = RainfallSource::new(0.0);
        source.set_schedule(vec![(120.0, 0.0), (30.0, 2e-5), (60.0, 1e-5)]);

        let schedule = source.schedule();
        // 排序升序且从 t=0 开始
        assert_eq!(schedule[0], (0.0, 2e-5));
        assert_eq!(schedule[1], (30.0, 2e-5));
        assert_eq!(schedule[2], (60.0, 1e-5));
        assert_eq!(schedule[3], (120.0, 0.0));
        for w in schedule.windows(2) {
            assert!(w[0].0 <= w[1].0);
        }
    }

    #[test]
    fn test_schedule_lookup() {
        // 分段常量查询：阶跃时刻取新值（右连续）
        let mut source = RainfallSource::new(0.0);
        source.set_time_varying(true);
        source.set_schedule(vec![(0.0, 0.0), (60.0, 1e-5), (120.0, 0.0)]);

        assert_eq!(source.rate_at(0.0), 0.0);
        assert_eq!(source.rate_at(30.0), 0.0);
        assert_eq!(source.rate_at(60.0), 1e-5);
        assert_eq!(source.rate_at(119.0), 1e-5);
        assert_eq!(source.rate_at(120.0), 0.0);
        assert_eq!(source.rate_at(200.0), 0.0);
    }

    #[test]
    fn test_empty_schedule_falls_back_to_constant() {
        let mut source = RainfallSource::new(3e-6);
        source.set_time_varying(true);
        assert_eq!(source.rate_at(10.0), 3e-6);

        source.ensure_schedule();
        assert_eq!(source.schedule(), &[(0.0, 3e-6)]);
    }

    #[test]
    fn test_disabled_schedule_uses_constant() {
        let mut source = RainfallSource::new(5e-6);
        source.set_schedule(vec![(0.0, 9e-5)]);
        // 未启用时变：仍返回常量
        assert_eq!(source.rate_at(100.0), 5e-6);
    }

    #[test]
    fn test_set_empty_schedule_synthesizes_entry() {
        let mut source = RainfallSource::new(7e-6);
        source.set_schedule(Vec::new());
        assert_eq!(source.schedule(), &[(0.0, 7e-6)]);
    }
}
