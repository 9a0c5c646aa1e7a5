//! 距离估计器
//!
//! 每帧：分割 → 候选筛选 → 距离模型 → 可见性迟滞。
//!
//! # 候选筛选
//!
//! 对每个轮廓以周长的 `approx_epsilon_ratio` 倍为容差做多边形逼近，
//! 接受同时满足以下条件的第一个轮廓（不再排序）：
//! - 逼近后恰好 4 个顶点
//! - 逼近多边形为凸
//! - 原始轮廓面积不小于本帧最大轮廓面积的 `area_ratio` 倍

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::VisionBackend;
use crate::error::VisionError;
use crate::types::{ColorRange, Contour, Point, TargetObservation};

/// 幂律距离模型：`distance = a · (area / 1000)^b`
///
/// 常数针对固定尺寸的标定方块拟合，更换目标尺寸时需要重新拟合。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceModel {
    pub a: f64,
    pub b: f64,
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self {
            a: 1.6275,
            b: -0.517,
        }
    }
}

impl DistanceModel {
    /// 由像素面积估计距离（米）
    pub fn distance(&self, area: f64) -> f64 {
        self.a * (area / 1000.0).powf(self.b)
    }
}

/// 可见性迟滞
///
/// 未命中计数封顶于 `threshold + 1`；只有计数超过阈值才把去抖标志置为不可见，
/// 任意一次命中立即清零并置为可见。初始状态为不可见。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityTracker {
    threshold: u32,
    misses: u32,
    visible: bool,
}

impl VisibilityTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            misses: threshold.saturating_add(1),
            visible: false,
        }
    }

    /// 记录一帧结果，返回去抖后的可见性
    pub fn record(&mut self, hit: bool) -> bool {
        if hit {
            self.misses = 0;
            self.visible = true;
        } else {
            self.misses = (self.misses + 1).min(self.threshold.saturating_add(1));
            if self.misses > self.threshold {
                self.visible = false;
            }
        }
        self.visible
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.threshold);
    }
}

/// 估计器配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeEstimatorConfig {
    /// 候选面积下限（相对本帧最大轮廓面积）
    pub area_ratio: f64,
    /// 多边形逼近容差（相对轮廓周长）
    pub approx_epsilon_ratio: f64,
    /// 去抖阈值（连续未命中帧数）
    pub miss_threshold: u32,
    /// 目标颜色区间
    pub color_range: ColorRange,
    pub distance_model: DistanceModel,
}

impl Default for RangeEstimatorConfig {
    fn default() -> Self {
        Self {
            area_ratio: 0.7,
            approx_epsilon_ratio: 0.01,
            miss_threshold: 90,
            color_range: ColorRange::default(),
            distance_model: DistanceModel::default(),
        }
    }
}

/// 本帧检测到的方形目标
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTarget {
    /// 逼近后的四边形顶点
    pub polygon: Vec<Point>,
    /// 四边形面积（用于距离模型）
    pub area: f64,
}

/// 从轮廓集合中挑出第一个合格的方形候选
///
/// 面积比较以本集合的最大轮廓面积为基准；最大面积为 0 时没有候选。
pub fn select_candidate<B: VisionBackend + ?Sized>(
    backend: &B,
    contours: &[Contour],
    area_ratio: f64,
    approx_epsilon_ratio: f64,
) -> Option<DetectedTarget> {
    let areas: Vec<f64> = contours.iter().map(|c| backend.contour_area(c)).collect();
    let max_area = areas.iter().copied().fold(0.0, f64::max);
    if max_area <= 0.0 {
        return None;
    }

    contours.iter().zip(&areas).find_map(|(contour, &area)| {
        if area <= 0.0 || area < max_area * area_ratio {
            return None;
        }
        let epsilon = backend.arc_length(contour) * approx_epsilon_ratio;
        let polygon = backend.approx_polygon(contour, epsilon);
        if polygon.len() != 4 || !backend.is_convex(&polygon) {
            return None;
        }
        let area = backend.contour_area(&polygon);
        Some(DetectedTarget { polygon, area })
    })
}

/// 距离估计器
///
/// 持有视觉后端与迟滞状态，每帧调用一次 [`RangeEstimator::process`]。
pub struct RangeEstimator<B: VisionBackend> {
    backend: B,
    config: RangeEstimatorConfig,
    tracker: VisibilityTracker,
    observation: TargetObservation,
}

impl<B: VisionBackend> RangeEstimator<B> {
    pub fn new(backend: B, config: RangeEstimatorConfig) -> Self {
        Self {
            backend,
            tracker: VisibilityTracker::new(config.miss_threshold),
            config,
            observation: TargetObservation::default(),
        }
    }

    /// 只做检测，不更新迟滞状态
    ///
    /// # 错误
    /// 后端失败时返回 `VisionError`
    pub fn find_target(&mut self, frame: &B::Frame) -> Result<Option<DetectedTarget>, VisionError> {
        let contours = self.backend.segment(frame, &self.config.color_range)?;
        Ok(select_candidate(
            &self.backend,
            &contours,
            self.config.area_ratio,
            self.config.approx_epsilon_ratio,
        ))
    }

    /// 处理一帧并返回最新观测
    ///
    /// 后端错误按未命中处理。未命中时距离保持上一次的估计值。
    pub fn process(&mut self, frame: &B::Frame) -> TargetObservation {
        let target = match self.find_target(frame) {
            Ok(target) => target,
            Err(e) => {
                warn!("Vision backend failed, treating frame as miss: {}", e);
                None
            },
        };

        let hit = target.is_some();
        if let Some(target) = target {
            self.observation.distance = self.config.distance_model.distance(target.area);
            debug!(
                "Target area {:.0}px, distance {:.3}m",
                target.area, self.observation.distance
            );
        }
        self.observation.visible_this_frame = hit;
        self.observation.visible = self.tracker.record(hit);
        self.observation
    }

    pub fn observation(&self) -> TargetObservation {
        self.observation
    }

    /// 清除迟滞状态与距离（回到从未检测到的状态）
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.observation = TargetObservation::default();
    }

    pub fn config(&self) -> &RangeEstimatorConfig {
        &self.config
    }

    /// 更新颜色区间（下一帧生效）
    pub fn set_color_range(&mut self, range: ColorRange) {
        self.config.color_range = range;
    }

    /// 调整候选面积比例（不同行为使用不同严格度）
    pub fn set_area_ratio(&mut self, ratio: f64) {
        self.config.area_ratio = ratio;
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// 按脚本返回轮廓的后端（每帧弹出一项）
    #[derive(Default)]
    pub(crate) struct ScriptedBackend {
        pub frames: VecDeque<Result<Vec<Contour>, VisionError>>,
        pub means: [f64; 3],
    }

    impl VisionBackend for ScriptedBackend {
        type Frame = ();

        fn segment(&mut self, _: &(), _: &ColorRange) -> Result<Vec<Contour>, VisionError> {
            self.frames.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }

        fn channel_means(&mut self, _: &()) -> Result<[f64; 3], VisionError> {
            Ok(self.means)
        }
    }

    pub(crate) fn rect(x: f64, y: f64, w: f64, h: f64) -> Contour {
        vec![
            Point::new(x, y),
            Point::new(x + w, y),
            Point::new(x + w, y + h),
            Point::new(x, y + h),
        ]
    }

    fn triangle(size: f64) -> Contour {
        vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size / 2.0, size),
        ]
    }

    #[test]
    fn test_distance_model() {
        let model = DistanceModel::default();
        assert!((model.distance(1000.0) - 1.6275).abs() < 1e-12);
        let expected = 1.6275 * 4.0f64.powf(-0.517);
        assert!((model.distance(4000.0) - expected).abs() < 1e-12);
        assert!(model.distance(8000.0) < model.distance(2000.0));
    }

    #[test]
    fn test_tracker_starts_invisible() {
        let tracker = VisibilityTracker::new(90);
        assert!(!tracker.is_visible());
        assert_eq!(tracker.misses(), 91);
    }

    #[test]
    fn test_tracker_hysteresis() {
        let mut tracker = VisibilityTracker::new(90);
        assert!(tracker.record(true));

        // 90 次未命中仍可见，第 91 次翻转
        for _ in 0..90 {
            assert!(tracker.record(false));
        }
        assert!(!tracker.record(false));
        assert_eq!(tracker.misses(), 91);

        // 计数封顶
        for _ in 0..10 {
            tracker.record(false);
        }
        assert_eq!(tracker.misses(), 91);

        // 任意命中立即恢复
        assert!(tracker.record(true));
        assert_eq!(tracker.misses(), 0);
    }

    #[test]
    fn test_tracker_zero_threshold() {
        let mut tracker = VisibilityTracker::new(0);
        assert!(tracker.record(true));
        assert!(!tracker.record(false));
    }

    #[test]
    fn test_select_candidate_filters() {
        let backend = ScriptedBackend::default();
        let big = rect(0.0, 0.0, 100.0, 100.0);
        let small = rect(200.0, 0.0, 50.0, 50.0);

        // 三角形面积最大但不是四边形；小方块不足 0.7 倍
        let contours = vec![triangle(200.0), small.clone(), big.clone()];
        assert!(select_candidate(&backend, &contours, 0.7, 0.01).is_none());

        // 降低面积要求后小方块成为第一个候选
        let found = select_candidate(&backend, &contours, 0.1, 0.01).unwrap();
        assert_eq!(found.polygon, small);
        assert_eq!(found.area, 2500.0);
    }

    #[test]
    fn test_select_candidate_first_wins() {
        let backend = ScriptedBackend::default();
        let a = rect(0.0, 0.0, 90.0, 90.0);
        let b = rect(200.0, 0.0, 100.0, 100.0);
        let found = select_candidate(&backend, &[a.clone(), b], 0.7, 0.01).unwrap();
        assert_eq!(found.polygon, a);
    }

    #[test]
    fn test_select_candidate_rejects_concave_and_empty() {
        let backend = ScriptedBackend::default();
        let concave = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 50.0),
            Point::new(0.0, 100.0),
            Point::new(30.0, 50.0),
        ];
        assert!(select_candidate(&backend, &[concave], 0.7, 0.01).is_none());
        assert!(select_candidate(&backend, &[], 0.7, 0.01).is_none());
        let degenerate = vec![Point::new(1.0, 1.0)];
        assert!(select_candidate(&backend, &[degenerate], 0.7, 0.01).is_none());
    }

    #[test]
    fn test_process_updates_observation() {
        let mut backend = ScriptedBackend::default();
        backend.frames.push_back(Ok(vec![rect(0.0, 0.0, 100.0, 40.0)]));
        backend.frames.push_back(Ok(Vec::new()));
        backend
            .frames
            .push_back(Err(VisionError::Backend("boom".into())));

        let config = RangeEstimatorConfig {
            miss_threshold: 1,
            ..Default::default()
        };
        let mut estimator = RangeEstimator::new(backend, config);
        assert_eq!(estimator.observation(), TargetObservation::default());

        let obs = estimator.process(&());
        assert!(obs.visible && obs.visible_this_frame);
        let expected = DistanceModel::default().distance(4000.0);
        assert!((obs.distance - expected).abs() < 1e-12);

        // 未命中：距离保持，去抖标志仍为 true
        let obs = estimator.process(&());
        assert!(obs.visible);
        assert!(!obs.visible_this_frame);
        assert!((obs.distance - expected).abs() < 1e-12);

        // 后端错误按未命中处理，超过阈值后翻转
        let obs = estimator.process(&());
        assert!(!obs.visible);
        assert!(!obs.visible_this_frame);

        estimator.reset();
        assert_eq!(estimator.observation(), TargetObservation::default());
    }

    #[test]
    fn test_config_setters() {
        let mut estimator =
            RangeEstimator::new(ScriptedBackend::default(), RangeEstimatorConfig::default());
        let range = ColorRange::new([1.0, 2.0, 3.0], [4.0, 5.0, 6.0]);
        estimator.set_color_range(range);
        estimator.set_area_ratio(0.5);
        assert_eq!(estimator.config().color_range, range);
        assert_eq!(estimator.config().area_ratio, 0.5);
    }
}
