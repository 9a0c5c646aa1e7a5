//! 运动控制器
//!
//! 同一时刻最多一个活动行为。启动新行为时先取消并等待旧行为的周期线程退出，
//! 再启动新线程，因此同一个周期内不会有两个行为下发命令。

use std::sync::Arc;

use arc_swap::ArcSwap;
use kobuki_driver::DriveBase;
use kobuki_tools::{PeriodicTask, TickControl};
use kobuki_vision::TargetSource;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::behavior::{
    ApproachAndHold, Behavior, BoundedDrive, Completion, ContinuousDrive, DriveCommand,
    SearchApproach, Step, TickInput, TimedRotate,
};
use crate::config::ControllerConfig;
use crate::error::ClientError;

/// 控制器状态（供界面显示）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    Idle,
    Running(&'static str),
    Completed(&'static str),
    TargetLost,
}

/// 运动控制器
pub struct MotionController<B: DriveBase + 'static> {
    base: Arc<B>,
    target: Arc<dyn TargetSource>,
    config: ControllerConfig,
    active: Mutex<Option<PeriodicTask>>,
    status: Arc<ArcSwap<ControllerStatus>>,
}

impl<B: DriveBase + 'static> MotionController<B> {
    pub fn new(base: Arc<B>, target: Arc<dyn TargetSource>, config: ControllerConfig) -> Self {
        Self {
            base,
            target,
            config,
            active: Mutex::new(None),
            status: Arc::new(ArcSwap::from_pointee(ControllerStatus::Idle)),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn base(&self) -> &Arc<B> {
        &self.base
    }

    pub fn status(&self) -> ControllerStatus {
        **self.status.load()
    }

    /// 是否有行为仍在运行
    pub fn is_active(&self) -> bool {
        self.active.lock().as_ref().is_some_and(|t| !t.is_finished())
    }

    /// 以 (速度, 半径) 持续行驶，直到 `stop` 或被新操作取代
    pub fn drive(&self, velocity: i16, radius: i16) -> Result<(), ClientError> {
        self.start(ContinuousDrive::new(DriveCommand::Raw { velocity, radius }))
    }

    /// 以 (线速度, 角速度) 持续行驶
    ///
    /// # 错误
    /// 参数不是有限数时返回 `ClientError::InvalidArgument`
    pub fn drive_unicycle(&self, linear: f64, angular: f64) -> Result<(), ClientError> {
        ensure_finite("linear", linear)?;
        ensure_finite("angular", angular)?;
        self.start(ContinuousDrive::new(DriveCommand::Unicycle { linear, angular }))
    }

    /// 定距行驶，累计 `floor(ticks_per_meter · distance)` 个编码器计数后自动停止
    pub fn move_distance(
        &self,
        velocity: i16,
        radius: i16,
        distance_m: f64,
    ) -> Result<(), ClientError> {
        ensure_finite("distance", distance_m)?;
        let ticks = self.config.target_ticks(distance_m);
        self.start(BoundedDrive::new(velocity, radius, ticks))
    }

    /// 以角速度 `angular`（rad/s）原地旋转 `duration_ms`
    pub fn rotate(&self, angular: f64, duration_ms: u64) -> Result<(), ClientError> {
        ensure_finite("angular", angular)?;
        self.start(TimedRotate::new(angular, duration_ms, self.config.period_ms))
    }

    /// 启动自主行为
    ///
    /// - `1`: 靠近并保持
    /// - `2`: 搜索、重获、靠近
    ///
    /// # 错误
    /// 未知编号返回 `ClientError::UnknownTask`，当前行为不受影响
    pub fn start_task(&self, id: u8) -> Result<(), ClientError> {
        match id {
            1 => self.start(ApproachAndHold::new(self.config.approach)),
            2 => self.start(SearchApproach::new(
                self.config.approach,
                self.config.search,
                self.config.ticks_per_meter,
            )),
            other => Err(ClientError::UnknownTask(other)),
        }
    }

    /// 启动任意行为（取代当前行为）
    pub fn start<T: Behavior + 'static>(&self, mut behavior: T) -> Result<(), ClientError> {
        let mut active = self.active.lock();
        if let Some(mut previous) = active.take() {
            debug!("Superseding {}", previous.name());
            previous.cancel();
        }

        let name = behavior.name();
        let base = self.base.clone();
        let target = self.target.clone();
        let status = self.status.clone();
        status.store(Arc::new(ControllerStatus::Running(name)));

        let spawned = PeriodicTask::spawn(
            format!("kobuki-{}", name),
            self.config.period(),
            move |period| {
                let input = TickInput {
                    period,
                    encoders: base.encoders(),
                    target: target.observation(),
                };
                match behavior.tick(&input) {
                    Step::Continue(command) => {
                        apply(base.as_ref(), command);
                        TickControl::Continue
                    },
                    Step::Done(completion) => {
                        base.stop();
                        let next = match completion {
                            Completion::Finished => ControllerStatus::Completed(name),
                            Completion::TargetLost => ControllerStatus::TargetLost,
                        };
                        info!("{} finished after {} periods: {:?}", name, period, completion);
                        status.store(Arc::new(next));
                        TickControl::Stop
                    },
                }
            },
        );

        match spawned {
            Ok(task) => {
                info!("Started {}", name);
                *active = Some(task);
                Ok(())
            },
            Err(e) => {
                self.status.store(Arc::new(ControllerStatus::Idle));
                self.base.stop();
                Err(e.into())
            },
        }
    }

    /// 停止当前行为并下发零速
    ///
    /// 返回时行为线程已退出。没有活动行为时也会下发零速。
    pub fn stop(&self) {
        let mut active = self.active.lock();
        if let Some(mut task) = active.take() {
            task.cancel();
            info!("Stopped {}", task.name());
        }
        self.base.stop();
        self.status.store(Arc::new(ControllerStatus::Idle));
    }
}

impl<B: DriveBase + 'static> Drop for MotionController<B> {
    fn drop(&mut self) {
        if let Some(mut task) = self.active.get_mut().take() {
            task.cancel();
            self.base.stop();
        }
    }
}

fn apply<B: DriveBase + ?Sized>(base: &B, command: DriveCommand) {
    match command {
        DriveCommand::Raw { velocity, radius } => base.drive(velocity, radius),
        DriveCommand::Unicycle { linear, angular } => base.unicycle_drive(linear, angular),
        DriveCommand::Stop => base.stop(),
    }
}

fn ensure_finite(name: &str, value: f64) -> Result<(), ClientError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ClientError::InvalidArgument(format!("{} must be finite, got {}", name, value)))
    }
}
