//! 相机采样服务
//!
//! 独占一个周期线程（默认 33ms），按当前模式处理每一帧：
//! - `Track`: 运行距离估计器并发布观测
//! - `Calibrate`: 采样颜色均值，完成后发布结果并自动切回 `Preview`
//! - `Preview`: 只读帧并推送给显示
//! - `Idle`: 不读帧
//!
//! 模式切换和阈值更新通过通道发给采样线程，在下一个 tick 开始时生效。
//! 停止时相机设备在采样线程退出时释放，观测恢复为初始值。

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender};
use kobuki_tools::{PeriodicTask, TickControl};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{FrameSink, FrameSource, VisionBackend};
use crate::calibration::{Calibration, CalibrationConfig};
use crate::error::VisionError;
use crate::estimator::RangeEstimator;
use crate::feed::TargetFeed;
use crate::types::{ColorRange, TargetObservation};

/// 相机工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CameraMode {
    Idle,
    Preview,
    Track,
    Calibrate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// 采样周期（毫秒）
    pub period_ms: u64,
    /// 相机设备编号
    pub device_index: i32,
    pub calibration: CalibrationConfig,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            period_ms: 33,
            device_index: 0,
            calibration: CalibrationConfig::default(),
        }
    }
}

impl CameraConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Debug, Clone, Copy)]
enum CameraRequest {
    Mode(CameraMode),
    ColorRange(ColorRange),
    AreaRatio(f64),
}

/// 采样线程私有状态
struct CameraWorker<S: FrameSource, B: VisionBackend<Frame = S::Frame>> {
    source: S,
    estimator: RangeEstimator<B>,
    sink: Option<Box<dyn FrameSink<S::Frame>>>,
    calibration: Calibration,
    feed: Arc<TargetFeed>,
    mode: Arc<ArcSwap<CameraMode>>,
    requests: Receiver<CameraRequest>,
}

impl<S, B> CameraWorker<S, B>
where
    S: FrameSource,
    B: VisionBackend<Frame = S::Frame>,
{
    fn apply_requests(&mut self) {
        while let Ok(request) = self.requests.try_recv() {
            match request {
                CameraRequest::Mode(mode) => {
                    if mode == CameraMode::Calibrate {
                        self.calibration.reset();
                    }
                    info!("Camera mode: {:?}", mode);
                    self.mode.store(Arc::new(mode));
                },
                CameraRequest::ColorRange(range) => {
                    debug!("Camera color range: {:?}", range);
                    self.estimator.set_color_range(range);
                },
                CameraRequest::AreaRatio(ratio) => self.estimator.set_area_ratio(ratio),
            }
        }
    }

    fn tick(&mut self) -> TickControl {
        self.apply_requests();

        let mode = **self.mode.load();
        if mode == CameraMode::Idle {
            return TickControl::Continue;
        }

        let frame = match self.source.read_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return TickControl::Continue,
            Err(e) => {
                warn!("Camera read failed: {}", e);
                return TickControl::Continue;
            },
        };

        match mode {
            CameraMode::Track => {
                let observation = self.estimator.process(&frame);
                self.feed.publish(observation);
            },
            CameraMode::Calibrate => {
                if let Some(result) = self
                    .calibration
                    .sample(self.estimator.backend_mut(), &frame)
                {
                    self.feed.publish_calibration(result);
                    self.mode.store(Arc::new(CameraMode::Preview));
                }
            },
            CameraMode::Preview | CameraMode::Idle => {},
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.show(&frame, &self.feed.latest());
        }
        TickControl::Continue
    }
}

impl<S: FrameSource, B: VisionBackend<Frame = S::Frame>> Drop for CameraWorker<S, B> {
    fn drop(&mut self) {
        self.source.release();
        if let Some(sink) = self.sink.as_mut() {
            sink.clear();
        }
    }
}

/// 相机服务句柄
///
/// Drop 时自动停止。
pub struct CameraService {
    task: Option<PeriodicTask>,
    requests: Sender<CameraRequest>,
    feed: Arc<TargetFeed>,
    mode: Arc<ArcSwap<CameraMode>>,
}

impl CameraService {
    /// 启动采样线程
    ///
    /// # 参数
    /// - `source`: 已打开的帧来源
    /// - `estimator`: 距离估计器（后端帧类型须与来源一致）
    /// - `sink`: 可选的帧显示
    /// - `feed`: 观测发布槽（与控制器共享）
    /// - `mode`: 初始模式
    ///
    /// # 错误
    /// 线程创建失败时返回 `VisionError::Io`
    pub fn spawn<S, B>(
        source: S,
        estimator: RangeEstimator<B>,
        sink: Option<Box<dyn FrameSink<S::Frame>>>,
        feed: Arc<TargetFeed>,
        config: CameraConfig,
        mode: CameraMode,
    ) -> Result<Self, VisionError>
    where
        S: FrameSource + 'static,
        B: VisionBackend<Frame = S::Frame> + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mode = Arc::new(ArcSwap::from_pointee(mode));

        let mut worker = CameraWorker {
            source,
            estimator,
            sink,
            calibration: Calibration::new(config.calibration),
            feed: feed.clone(),
            mode: mode.clone(),
            requests: rx,
        };
        let task = PeriodicTask::spawn("kobuki-camera", config.period(), move |_| worker.tick())?;
        info!("Camera service started ({}ms period)", config.period_ms);

        Ok(Self {
            task: Some(task),
            requests: tx,
            feed,
            mode,
        })
    }

    fn request(&self, request: CameraRequest) -> Result<(), VisionError> {
        if !self.is_running() {
            return Err(VisionError::Stopped);
        }
        self.requests
            .send(request)
            .map_err(|_| VisionError::Stopped)
    }

    /// 切换模式（进入 `Calibrate` 会重新开始采样）
    pub fn set_mode(&self, mode: CameraMode) -> Result<(), VisionError> {
        self.request(CameraRequest::Mode(mode))
    }

    pub fn set_color_range(&self, range: ColorRange) -> Result<(), VisionError> {
        self.request(CameraRequest::ColorRange(range))
    }

    pub fn set_area_ratio(&self, ratio: f64) -> Result<(), VisionError> {
        self.request(CameraRequest::AreaRatio(ratio))
    }

    /// 当前模式（标定完成后会自动变为 `Preview`）
    pub fn mode(&self) -> CameraMode {
        **self.mode.load()
    }

    pub fn feed(&self) -> Arc<TargetFeed> {
        self.feed.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// 停止采样线程并释放相机
    ///
    /// 返回时线程已退出；观测恢复为初始值。重复调用是安全的。
    pub fn stop(&mut self) {
        if let Some(mut task) = self.task.take() {
            task.cancel();
            self.feed.publish(TargetObservation::default());
            self.mode.store(Arc::new(CameraMode::Idle));
            info!("Camera service stopped");
        }
    }
}

impl Drop for CameraService {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::RangeEstimatorConfig;
    use crate::estimator::tests::{ScriptedBackend, rect};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Instant;

    struct UnitSource {
        released: Arc<AtomicBool>,
    }

    impl FrameSource for UnitSource {
        type Frame = ();

        fn read_frame(&mut self) -> Result<Option<()>, VisionError> {
            Ok(Some(()))
        }

        fn release(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    struct CountingSink {
        shown: Arc<AtomicUsize>,
        cleared: Arc<AtomicBool>,
    }

    impl FrameSink<()> for CountingSink {
        fn show(&mut self, _: &(), _: &TargetObservation) {
            self.shown.fetch_add(1, Ordering::SeqCst);
        }

        fn clear(&mut self) {
            self.cleared.store(true, Ordering::SeqCst);
        }
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    fn fast_config(frames: u32) -> CameraConfig {
        CameraConfig {
            period_ms: 1,
            device_index: 0,
            calibration: CalibrationConfig { frames },
        }
    }

    #[test]
    fn test_tracking_publishes_and_stop_resets() {
        let mut backend = ScriptedBackend::default();
        for _ in 0..5 {
            backend.frames.push_back(Ok(vec![rect(0.0, 0.0, 50.0, 20.0)]));
        }
        let released = Arc::new(AtomicBool::new(false));
        let shown = Arc::new(AtomicUsize::new(0));
        let cleared = Arc::new(AtomicBool::new(false));
        let feed = Arc::new(TargetFeed::new());

        let mut service = CameraService::spawn(
            UnitSource {
                released: released.clone(),
            },
            RangeEstimator::new(
                backend,
                RangeEstimatorConfig {
                    miss_threshold: 1_000_000,
                    ..Default::default()
                },
            ),
            Some(Box::new(CountingSink {
                shown: shown.clone(),
                cleared: cleared.clone(),
            })),
            feed.clone(),
            fast_config(50),
            CameraMode::Track,
        )
        .unwrap();

        assert!(wait_until(|| feed.latest().visible));
        assert!(feed.latest().has_distance());
        assert!(wait_until(|| shown.load(Ordering::SeqCst) > 0));

        // 脚本耗尽后连续未命中，但去抖标志保持
        assert!(wait_until(|| !feed.latest().visible_this_frame));
        assert!(feed.latest().visible);

        service.stop();
        assert!(!service.is_running());
        assert!(released.load(Ordering::SeqCst));
        assert!(cleared.load(Ordering::SeqCst));
        assert_eq!(feed.latest(), TargetObservation::default());
        assert!(matches!(
            service.set_mode(CameraMode::Track),
            Err(VisionError::Stopped)
        ));
    }

    #[test]
    fn test_calibration_reverts_to_preview() {
        let backend = ScriptedBackend {
            means: [35.0, 90.0, 180.0],
            ..Default::default()
        };
        let feed = Arc::new(TargetFeed::new());
        let service = CameraService::spawn(
            UnitSource {
                released: Arc::new(AtomicBool::new(false)),
            },
            RangeEstimator::new(backend, RangeEstimatorConfig::default()),
            None,
            feed.clone(),
            fast_config(5),
            CameraMode::Idle,
        )
        .unwrap();

        assert_eq!(service.mode(), CameraMode::Idle);
        service.set_mode(CameraMode::Calibrate).unwrap();
        assert!(wait_until(|| feed.last_calibration().is_some()));

        let result = feed.last_calibration().unwrap();
        assert_eq!(result.frames, 5);
        assert_eq!(result.means, [35.0, 90.0, 180.0]);
        assert!(wait_until(|| service.mode() == CameraMode::Preview));
        // 标定不会改动估计器阈值或观测
        assert_eq!(feed.latest(), TargetObservation::default());
    }
}
