//! 运动原语：持续行驶、定距行驶、定时旋转

use kobuki_driver::signed_encoder_delta;

use super::{Behavior, Completion, DriveCommand, Step, TickInput};

/// 每个周期重复下发同一条命令，直到被取消
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuousDrive {
    command: DriveCommand,
}

impl ContinuousDrive {
    pub fn new(command: DriveCommand) -> Self {
        Self { command }
    }
}

impl Behavior for ContinuousDrive {
    fn name(&self) -> &'static str {
        "drive"
    }

    fn tick(&mut self, _input: &TickInput) -> Step {
        Step::Continue(self.command)
    }
}

/// 定距行驶
///
/// 首个周期记录左编码器起点，之后逐周期累加有符号增量（处理 16 位回绕），
/// 累计绝对值达到 `target_ticks` 时结束。
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedDrive {
    velocity: i16,
    radius: i16,
    target_ticks: u64,
    previous: Option<u16>,
    travelled: i64,
}

impl BoundedDrive {
    pub fn new(velocity: i16, radius: i16, target_ticks: u64) -> Self {
        Self {
            velocity,
            radius,
            target_ticks,
            previous: None,
            travelled: 0,
        }
    }

    /// 已行驶计数
    pub fn travelled(&self) -> u64 {
        self.travelled.unsigned_abs()
    }

    pub fn target_ticks(&self) -> u64 {
        self.target_ticks
    }
}

impl Behavior for BoundedDrive {
    fn name(&self) -> &'static str {
        "distance"
    }

    fn tick(&mut self, input: &TickInput) -> Step {
        let current = input.encoders.0;
        if let Some(previous) = self.previous {
            self.travelled += i64::from(signed_encoder_delta(previous, current));
        }
        self.previous = Some(current);

        if self.travelled() >= self.target_ticks {
            return Step::Done(Completion::Finished);
        }
        Step::Continue(DriveCommand::Raw {
            velocity: self.velocity,
            radius: self.radius,
        })
    }
}

/// 定时原地旋转
///
/// 按周期计数：`已执行周期数 × 周期 ≥ 时长` 时结束，调度抖动会累积为角度误差。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedRotate {
    angular: f64,
    periods: u64,
    elapsed: u64,
}

impl TimedRotate {
    /// # 参数
    /// - `angular`: 角速度（rad/s），正值逆时针
    /// - `duration_ms`: 旋转时长
    /// - `period_ms`: 控制周期
    pub fn new(angular: f64, duration_ms: u64, period_ms: u64) -> Self {
        Self {
            angular,
            periods: duration_ms.div_ceil(period_ms.max(1)),
            elapsed: 0,
        }
    }

    /// 以周期数构造（搜索行为内部使用）
    pub fn with_periods(angular: f64, periods: u64) -> Self {
        Self {
            angular,
            periods,
            elapsed: 0,
        }
    }

    pub fn periods(&self) -> u64 {
        self.periods
    }
}

impl Behavior for TimedRotate {
    fn name(&self) -> &'static str {
        "rotate"
    }

    fn tick(&mut self, _input: &TickInput) -> Step {
        if self.elapsed >= self.periods {
            return Step::Done(Completion::Finished);
        }
        self.elapsed += 1;
        Step::Continue(DriveCommand::Unicycle {
            linear: 0.0,
            angular: self.angular,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::testing::input;
    use crate::config::ControllerConfig;
    use proptest::prelude::*;

    #[test]
    fn test_continuous_drive_repeats() {
        let command = DriveCommand::Raw {
            velocity: 200,
            radius: 0,
        };
        let mut drive = ContinuousDrive::new(command);
        for i in 0..100 {
            assert_eq!(drive.tick(&input(i, 0)), Step::Continue(command));
        }
    }

    #[test]
    fn test_bounded_drive_stops_exactly_at_target() {
        let target = ControllerConfig::default().target_ticks(1.0);
        assert_eq!(target, 11724);

        let mut drive = BoundedDrive::new(100, 0, target);
        assert!(matches!(drive.tick(&input(0, 1000)), Step::Continue(_)));

        // 差一个计数不停
        let almost = 1000 + 11723;
        assert!(matches!(drive.tick(&input(1, almost)), Step::Continue(_)));
        assert_eq!(drive.travelled(), 11723);

        assert_eq!(
            drive.tick(&input(2, almost + 1)),
            Step::Done(Completion::Finished)
        );
    }

    #[test]
    fn test_bounded_drive_handles_wraparound() {
        let mut drive = BoundedDrive::new(100, 0, 86);
        assert!(matches!(drive.tick(&input(0, 65500)), Step::Continue(_)));
        assert_eq!(drive.tick(&input(1, 50)), Step::Done(Completion::Finished));
        assert_eq!(drive.travelled(), 86);
    }

    #[test]
    fn test_bounded_drive_reverse() {
        let mut drive = BoundedDrive::new(-100, 0, 500);
        drive.tick(&input(0, 100));
        // 后退：65136 = 100 - 500 (mod 65536)
        assert_eq!(drive.tick(&input(1, 65136)), Step::Done(Completion::Finished));
    }

    #[test]
    fn test_bounded_drive_zero_distance() {
        let mut drive = BoundedDrive::new(100, 0, 0);
        assert_eq!(drive.tick(&input(0, 7)), Step::Done(Completion::Finished));
    }

    #[test]
    fn test_timed_rotate_counts_periods() {
        // 1000ms / 42ms → 24 个周期
        let mut rotate = TimedRotate::new(0.8, 1000, 42);
        assert_eq!(rotate.periods(), 24);
        for i in 0..24 {
            assert_eq!(
                rotate.tick(&input(i, 0)),
                Step::Continue(DriveCommand::Unicycle {
                    linear: 0.0,
                    angular: 0.8
                })
            );
        }
        assert_eq!(rotate.tick(&input(24, 0)), Step::Done(Completion::Finished));
    }

    proptest! {
        #[test]
        fn prop_bounded_drive_matches_travel(start in any::<u16>(), steps in prop::collection::vec(0u16..200, 1..100)) {
            let total: u64 = steps.iter().map(|&s| u64::from(s)).sum();
            let mut drive = BoundedDrive::new(100, 0, total + 1);
            let mut position = start;
            drive.tick(&input(0, position));
            for (i, step) in steps.iter().enumerate() {
                position = position.wrapping_add(*step);
                prop_assert!(matches!(drive.tick(&input(i as u64 + 1, position)), Step::Continue(_)));
            }
            prop_assert_eq!(drive.travelled(), total);
        }
    }
}
