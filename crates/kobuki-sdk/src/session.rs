//! 会话：界面协作方使用的命令面
//!
//! 一个 `Session` 持有底盘、观测发布槽、运动控制器和（可选的）相机服务，
//! 对应一次完整的使用过程。所有方法都可以从任意线程调用。

use std::sync::Arc;

use kobuki_client::{ClientError, ControllerStatus, MotionController};
use kobuki_driver::{DriveBase, DriverError, Kobuki, KobukiBuilder, MetricsSnapshot, SensorFrame};
use kobuki_serial::SplittableAdapter;
use kobuki_vision::{
    CalibrationResult, CameraMode, CameraService, ColorRange, FrameSink, FrameSource,
    RangeEstimator, TargetFeed, TargetObservation, VisionBackend, VisionError,
};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, KobukiConfig};

/// 会话错误
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Controller error: {0}")]
    Client(#[from] ClientError),

    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// 需要相机的操作在相机未启动时调用
    #[error("Camera is not running")]
    NoCamera,
}

/// 会话
pub struct Session<B: DriveBase + 'static> {
    base: Arc<B>,
    feed: Arc<TargetFeed>,
    controller: MotionController<B>,
    camera: Mutex<Option<CameraService>>,
    config: KobukiConfig,
}

impl<B: DriveBase + 'static> Session<B> {
    /// 以已有的底盘创建会话
    pub fn new(base: Arc<B>, config: KobukiConfig) -> Self {
        let feed = Arc::new(TargetFeed::new());
        let controller = MotionController::new(base.clone(), feed.clone(), config.controller);
        Self {
            base,
            feed,
            controller,
            camera: Mutex::new(None),
            config,
        }
    }

    pub fn base(&self) -> &Arc<B> {
        &self.base
    }

    pub fn config(&self) -> &KobukiConfig {
        &self.config
    }

    pub fn controller(&self) -> &MotionController<B> {
        &self.controller
    }

    /// 观测发布槽（与相机服务和控制器共享）
    pub fn feed(&self) -> Arc<TargetFeed> {
        self.feed.clone()
    }

    // ==================== 相机 ====================

    /// 启动相机（预览模式）
    ///
    /// 已有相机时先停止旧相机。
    ///
    /// # 参数
    /// - `source`: 帧来源
    /// - `backend`: 视觉后端，帧类型须与来源一致
    /// - `sink`: 可选的帧显示
    pub fn start_camera<S, V>(
        &self,
        source: S,
        backend: V,
        sink: Option<Box<dyn FrameSink<S::Frame>>>,
    ) -> Result<(), SessionError>
    where
        S: FrameSource + 'static,
        V: VisionBackend<Frame = S::Frame> + Send + 'static,
    {
        let mut camera = self.camera.lock();
        if let Some(mut previous) = camera.take() {
            previous.stop();
        }

        let estimator = RangeEstimator::new(backend, self.config.estimator);
        let service = CameraService::spawn(
            source,
            estimator,
            sink,
            self.feed.clone(),
            self.config.camera,
            CameraMode::Preview,
        )?;
        *camera = Some(service);
        Ok(())
    }

    /// 停止相机并释放设备；观测恢复为初始值
    pub fn stop_camera(&self) {
        if let Some(mut camera) = self.camera.lock().take() {
            camera.stop();
        }
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.camera
            .lock()
            .as_ref()
            .map(CameraService::mode)
            .unwrap_or(CameraMode::Idle)
    }

    fn with_camera<T>(
        &self,
        f: impl FnOnce(&CameraService) -> Result<T, VisionError>,
    ) -> Result<T, SessionError> {
        let camera = self.camera.lock();
        let camera = camera.as_ref().ok_or(SessionError::NoCamera)?;
        Ok(f(camera)?)
    }

    /// 切回预览（不再估计距离）
    pub fn preview(&self) -> Result<(), SessionError> {
        self.with_camera(|c| c.set_mode(CameraMode::Preview))
    }

    /// 开始跟踪目标
    pub fn track(&self) -> Result<(), SessionError> {
        self.with_camera(|c| c.set_mode(CameraMode::Track))
    }

    /// 开始颜色标定；完成后相机自动回到预览，结果见 [`Self::last_calibration`]
    pub fn calibrate(&self) -> Result<(), SessionError> {
        self.with_camera(|c| c.set_mode(CameraMode::Calibrate))
    }

    /// 取消标定
    pub fn stop_calibration(&self) -> Result<(), SessionError> {
        self.preview()
    }

    pub fn last_calibration(&self) -> Option<CalibrationResult> {
        self.feed.last_calibration()
    }

    /// 更新目标颜色阈值
    pub fn set_color_range(&self, range: ColorRange) -> Result<(), SessionError> {
        self.with_camera(|c| c.set_color_range(range))
    }

    /// 以界面文本（如 `"30,60,85"`）更新颜色阈值，无法解析的分量回退为 0
    pub fn set_color_range_text(&self, min: &str, max: &str) -> Result<(), SessionError> {
        self.set_color_range(ColorRange::from_text(min, max))
    }

    /// 最新目标观测
    pub fn observation(&self) -> TargetObservation {
        self.feed.latest()
    }

    // ==================== 运动 ====================

    /// 持续行驶
    pub fn drive(&self, velocity: i16, radius: i16) -> Result<(), SessionError> {
        Ok(self.controller.drive(velocity, radius)?)
    }

    /// 以 (线速度 mm/s, 角速度 rad/s) 持续行驶
    pub fn drive_unicycle(&self, linear: f64, angular: f64) -> Result<(), SessionError> {
        Ok(self.controller.drive_unicycle(linear, angular)?)
    }

    /// 定距行驶（米）
    pub fn move_distance(
        &self,
        velocity: i16,
        radius: i16,
        distance_m: f64,
    ) -> Result<(), SessionError> {
        Ok(self.controller.move_distance(velocity, radius, distance_m)?)
    }

    /// 定时旋转
    pub fn rotate(&self, angular: f64, duration_ms: u64) -> Result<(), SessionError> {
        Ok(self.controller.rotate(angular, duration_ms)?)
    }

    /// 启动自主行为（`1` 靠近并保持，`2` 搜索重获）
    ///
    /// 相机在运行时切到跟踪模式，并换成该行为使用的候选面积比例。
    /// 没有相机时行为照常启动，但目标始终不可见。
    ///
    /// # 错误
    /// - `SessionError::Client`: 未知编号
    /// - `SessionError::Vision`: 相机线程已退出
    pub fn start_task(&self, id: u8) -> Result<(), SessionError> {
        let area_ratio = match id {
            1 => self.config.controller.approach.area_ratio,
            2 => self.config.controller.search.area_ratio,
            other => return Err(ClientError::UnknownTask(other).into()),
        };

        if let Some(camera) = self.camera.lock().as_ref() {
            camera.set_area_ratio(area_ratio)?;
            camera.set_mode(CameraMode::Track)?;
        } else {
            warn!("Task {} started without a camera, target will never be visible", id);
        }

        Ok(self.controller.start_task(id)?)
    }

    /// 停止当前运动或行为并下发零速
    pub fn stop(&self) {
        self.controller.stop();
    }

    pub fn status(&self) -> ControllerStatus {
        self.controller.status()
    }

    pub fn is_moving(&self) -> bool {
        self.controller.is_active()
    }

    /// 结束会话：停止行为和相机
    ///
    /// 底盘驱动在最后一个引用释放时关闭。
    pub fn close(self) {
        self.controller.stop();
        self.stop_camera();
        info!("Session closed");
    }
}

impl Session<Kobuki> {
    /// 按配置打开串口并创建会话
    ///
    /// # 错误
    /// `SessionError::Driver`: 串口打开或驱动线程启动失败
    #[cfg(feature = "serialport")]
    pub fn connect(config: KobukiConfig) -> Result<Self, SessionError> {
        let kobuki = Self::builder(&config).build()?;
        Ok(Self::new(Arc::new(kobuki), config))
    }

    /// 使用已打开的适配器创建会话（Mock 或自定义后端）
    pub fn with_adapter<A>(adapter: A, config: KobukiConfig) -> Result<Self, SessionError>
    where
        A: SplittableAdapter,
    {
        let kobuki = Self::builder(&config).build_with_adapter(adapter)?;
        Ok(Self::new(Arc::new(kobuki), config))
    }

    fn builder(config: &KobukiConfig) -> KobukiBuilder {
        KobukiBuilder::new()
            .port(config.port.clone())
            .baud_rate(config.baud_rate)
            .pipeline_config(config.pipeline.clone())
            .wheelbase_mm(config.wheelbase_mm)
    }

    pub fn set_led(&self, id: u8) {
        self.base.set_led(id);
    }

    pub fn play_sound(&self, id: u8) {
        self.base.play_sound(id);
    }

    /// 最新传感器快照
    pub fn sensors(&self) -> SensorFrame {
        self.base.sensors()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.base.metrics()
    }

    pub fn is_connected(&self) -> bool {
        self.base.is_connected()
    }
}
