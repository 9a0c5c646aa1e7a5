//! 控制器配置

use std::time::Duration;

use kobuki_protocol::MIN_UPDATE_PERIOD_MS;

/// 控制周期（毫秒）：协议最小更新周期的两倍
pub const CONTROL_PERIOD_MS: u64 = 2 * MIN_UPDATE_PERIOD_MS;

/// 每米编码器计数
pub const TICKS_PER_METER: f64 = 11724.4;

/// 靠近并保持行为的参数
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ApproachConfig {
    /// 目标保持距离（毫米）
    pub target_range_mm: f64,
    /// 误差 ≥ 0 时的增益
    pub gain_far: f64,
    /// 误差 < 0 时的增益
    pub gain_near: f64,
    /// 速度上限（mm/s），下限为 0
    pub max_speed: f64,
    /// 零速持续超过该周期数即认为到位
    pub settle_periods: u32,
    /// 本行为使用的候选面积比例
    pub area_ratio: f64,
}

impl Default for ApproachConfig {
    fn default() -> Self {
        Self {
            target_range_mm: 500.0,
            gain_far: 0.1,
            gain_near: 0.2,
            max_speed: 400.0,
            settle_periods: 75,
            area_ratio: 0.7,
        }
    }
}

/// 搜索重获行为的参数
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SearchConfig {
    /// 盲行速度（mm/s）
    pub creep_speed: i16,
    /// 盲行距离 = 最后一次估计距离 - margin（米）
    pub margin_m: f64,
    /// 扫描转速（rad/s）
    pub scan_angular_speed: f64,
    /// 第一次扫描的周期数，第二次反向扫描为其两倍
    pub scan_periods: u32,
    /// 每次停顿的周期数
    pub pause_periods: u32,
    /// 本行为使用的候选面积比例
    pub area_ratio: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            creep_speed: 100,
            margin_m: 0.3,
            scan_angular_speed: 0.5,
            scan_periods: 24,
            pause_periods: 12,
            area_ratio: 1.0,
        }
    }
}

/// 控制器配置
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// 控制周期（毫秒）
    pub period_ms: u64,
    /// 每米编码器计数
    pub ticks_per_meter: f64,
    pub approach: ApproachConfig,
    pub search: SearchConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            period_ms: CONTROL_PERIOD_MS,
            ticks_per_meter: TICKS_PER_METER,
            approach: ApproachConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    /// 距离（米）对应的目标计数，向下取整；负距离按 0 处理
    pub fn target_ticks(&self, distance_m: f64) -> u64 {
        (self.ticks_per_meter * distance_m.max(0.0)).floor() as u64
    }
}
