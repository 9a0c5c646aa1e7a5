//! 靠近并保持（任务 1）

use super::{Behavior, Completion, DriveCommand, Step, TickInput};
use crate::config::ApproachConfig;

/// 双增益比例速度律
///
/// `error = 估计距离(mm) - 目标距离(mm)`，每周期 `speed += gain · error`，
/// 误差为负（冲过头）时使用较大的增益。速度钳位到 `[0, max_speed]`。
#[derive(Debug, Clone, PartialEq)]
pub struct ApproachLaw {
    config: ApproachConfig,
    speed: f64,
    stopped: u32,
}

impl ApproachLaw {
    pub fn new(config: ApproachConfig) -> Self {
        Self {
            config,
            speed: 0.0,
            stopped: 0,
        }
    }

    /// 用本周期的距离估计（米）更新速度
    ///
    /// 返回 (速度 mm/s, 是否到位)。零速连续超过 `settle_periods` 个周期即到位。
    pub fn update(&mut self, distance_m: f64) -> (f64, bool) {
        let error = distance_m * 1000.0 - self.config.target_range_mm;
        let gain = if error >= 0.0 {
            self.config.gain_far
        } else {
            self.config.gain_near
        };
        self.speed = (self.speed + gain * error).clamp(0.0, self.config.max_speed);

        if self.speed == 0.0 {
            self.stopped += 1;
        } else {
            self.stopped = 0;
        }
        (self.speed, self.stopped > self.config.settle_periods)
    }

    /// 目标不可见：速度清零，不计入到位计数
    pub fn hold(&mut self) {
        self.speed = 0.0;
        self.stopped = 0;
    }

    pub fn reset(&mut self) {
        self.hold();
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn stopped_periods(&self) -> u32 {
        self.stopped
    }

    pub(crate) fn command(&self) -> DriveCommand {
        if self.speed == 0.0 {
            DriveCommand::Stop
        } else {
            DriveCommand::Raw {
                velocity: self.speed.round() as i16,
                radius: 0,
            }
        }
    }
}

/// 靠近目标并停在目标距离处
#[derive(Debug, Clone, PartialEq)]
pub struct ApproachAndHold {
    law: ApproachLaw,
}

impl ApproachAndHold {
    pub fn new(config: ApproachConfig) -> Self {
        Self {
            law: ApproachLaw::new(config),
        }
    }

    pub fn law(&self) -> &ApproachLaw {
        &self.law
    }
}

impl Behavior for ApproachAndHold {
    fn name(&self) -> &'static str {
        "approach"
    }

    fn tick(&mut self, input: &TickInput) -> Step {
        if !input.target.visible {
            self.law.hold();
            return Step::Continue(DriveCommand::Stop);
        }

        let (_, settled) = self.law.update(input.target.distance);
        if settled {
            return Step::Done(Completion::Finished);
        }
        Step::Continue(self.law.command())
    }
}
