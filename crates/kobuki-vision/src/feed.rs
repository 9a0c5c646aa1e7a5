//! 目标观测发布
//!
//! 相机线程是唯一写者，控制器按自己的周期轮询最新值。
//! 读写都是无锁的（`ArcSwap`），读者最多看到一个相机周期之前的观测。

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::calibration::CalibrationResult;
use crate::types::TargetObservation;

/// 观测读取接口（控制器只依赖这个 trait，测试可以注入脚本化来源）
pub trait TargetSource: Send + Sync {
    fn observation(&self) -> TargetObservation;
}

/// 观测发布槽
#[derive(Debug)]
pub struct TargetFeed {
    observation: ArcSwap<TargetObservation>,
    calibration: ArcSwap<Option<CalibrationResult>>,
}

impl Default for TargetFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetFeed {
    pub fn new() -> Self {
        Self {
            observation: ArcSwap::from_pointee(TargetObservation::default()),
            calibration: ArcSwap::from_pointee(None),
        }
    }

    pub fn publish(&self, observation: TargetObservation) {
        self.observation.store(Arc::new(observation));
    }

    pub fn latest(&self) -> TargetObservation {
        **self.observation.load()
    }

    pub fn publish_calibration(&self, result: CalibrationResult) {
        self.calibration.store(Arc::new(Some(result)));
    }

    /// 最近一次完成的标定结果
    pub fn last_calibration(&self) -> Option<CalibrationResult> {
        **self.calibration.load()
    }
}

impl TargetSource for TargetFeed {
    fn observation(&self) -> TargetObservation {
        self.latest()
    }
}

impl<T: TargetSource + ?Sized> TargetSource for Arc<T> {
    fn observation(&self) -> TargetObservation {
        (**self).observation()
    }
}
