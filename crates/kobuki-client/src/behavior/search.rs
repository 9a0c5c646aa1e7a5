//! 搜索、重获、靠近（任务 2）
//!
//! ```text
//! Approach ──本帧丢失──▶ Creep ──盲行到位──▶ Settle ──▶ Rotate(First) ──▶ Verify(First)
//!    ▲                                                                      │ 未发现
//!    │                                 发现                                 ▼
//!    └──────────────────────────────────────────── Verify(Second) ◀── Rotate(Second)
//!                                                         │ 未发现
//!                                                         ▼
//!                                                        Lost
//! ```

use kobuki_driver::signed_encoder_delta;

use super::approach::ApproachLaw;
use super::{Behavior, Completion, DriveCommand, Step, TickInput};
use crate::config::{ApproachConfig, SearchConfig};

/// 扫描次序
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanAttempt {
    /// 正向扫描 `scan_periods`
    First,
    /// 反向扫描 `2 × scan_periods`
    Second,
}

/// 搜索行为的状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchPhase {
    /// 跟随目标靠近
    Approach,
    /// 目标丢失后沿原方向盲行
    Creep {
        previous: u16,
        travelled: i64,
        goal: u64,
    },
    /// 扫描前停顿
    Settle { remaining: u32 },
    /// 原地旋转扫描
    Rotate { remaining: u32, attempt: ScanAttempt },
    /// 扫描后停顿，最后一个周期检查目标
    Verify { remaining: u32, attempt: ScanAttempt },
    /// 两次扫描都未发现（终止）
    Lost,
}

/// 搜索重获行为
#[derive(Debug, Clone, PartialEq)]
pub struct SearchApproach {
    law: ApproachLaw,
    search: SearchConfig,
    ticks_per_meter: f64,
    phase: SearchPhase,
    last_distance: f64,
}

impl SearchApproach {
    pub fn new(approach: ApproachConfig, search: SearchConfig, ticks_per_meter: f64) -> Self {
        Self {
            law: ApproachLaw::new(approach),
            search,
            ticks_per_meter,
            phase: SearchPhase::Approach,
            last_distance: 0.0,
        }
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    fn scan_command(&self, attempt: ScanAttempt) -> DriveCommand {
        let angular = match attempt {
            ScanAttempt::First => self.search.scan_angular_speed,
            ScanAttempt::Second => -self.search.scan_angular_speed,
        };
        DriveCommand::Unicycle {
            linear: 0.0,
            angular,
        }
    }

    fn scan_periods(&self, attempt: ScanAttempt) -> u32 {
        let base = self.search.scan_periods.max(1);
        match attempt {
            ScanAttempt::First => base,
            ScanAttempt::Second => base * 2,
        }
    }

    fn approach(&mut self, input: &TickInput) -> Step {
        if !input.target.visible_this_frame {
            let goal_m = (self.last_distance - self.search.margin_m).max(0.0);
            let goal = (self.ticks_per_meter * goal_m).floor() as u64;
            tracing::info!(
                "Target lost, creeping {} ticks before scanning",
                goal
            );
            self.law.reset();
            self.phase = SearchPhase::Creep {
                previous: input.encoders.0,
                travelled: 0,
                goal,
            };
            return self.creep(input);
        }

        if input.target.has_distance() {
            self.last_distance = input.target.distance;
        }
        let (_, settled) = self.law.update(input.target.distance);
        if settled {
            return Step::Done(Completion::Finished);
        }
        Step::Continue(self.law.command())
    }

    fn creep(&mut self, input: &TickInput) -> Step {
        let SearchPhase::Creep {
            previous,
            travelled,
            goal,
        } = self.phase
        else {
            return Step::Continue(DriveCommand::Stop);
        };

        let current = input.encoders.0;
        let travelled = travelled + i64::from(signed_encoder_delta(previous, current));
        if travelled.unsigned_abs() >= goal {
            self.phase = SearchPhase::Settle {
                remaining: self.search.pause_periods,
            };
            return Step::Continue(DriveCommand::Stop);
        }

        self.phase = SearchPhase::Creep {
            previous: current,
            travelled,
            goal,
        };
        Step::Continue(DriveCommand::Raw {
            velocity: self.search.creep_speed,
            radius: 0,
        })
    }
}

impl Behavior for SearchApproach {
    fn name(&self) -> &'static str {
        "search"
    }

    fn tick(&mut self, input: &TickInput) -> Step {
        match self.phase {
            SearchPhase::Approach => self.approach(input),
            SearchPhase::Creep { .. } => self.creep(input),
            SearchPhase::Settle { remaining } => {
                self.phase = if remaining <= 1 {
                    SearchPhase::Rotate {
                        remaining: self.scan_periods(ScanAttempt::First),
                        attempt: ScanAttempt::First,
                    }
                } else {
                    SearchPhase::Settle {
                        remaining: remaining - 1,
                    }
                };
                Step::Continue(DriveCommand::Stop)
            },
            SearchPhase::Rotate { remaining, attempt } => {
                self.phase = if remaining <= 1 {
                    SearchPhase::Verify {
                        remaining: self.search.pause_periods.max(1),
                        attempt,
                    }
                } else {
                    SearchPhase::Rotate {
                        remaining: remaining - 1,
                        attempt,
                    }
                };
                Step::Continue(self.scan_command(attempt))
            },
            SearchPhase::Verify { remaining, attempt } => {
                if remaining > 1 {
                    self.phase = SearchPhase::Verify {
                        remaining: remaining - 1,
                        attempt,
                    };
                    return Step::Continue(DriveCommand::Stop);
                }

                if input.target.visible_this_frame {
                    tracing::info!("Target reacquired on {:?} scan", attempt);
                    self.law.reset();
                    self.phase = SearchPhase::Approach;
                    return Step::Continue(DriveCommand::Stop);
                }
                match attempt {
                    ScanAttempt::First => {
                        self.phase = SearchPhase::Rotate {
                            remaining: self.scan_periods(ScanAttempt::Second),
                            attempt: ScanAttempt::Second,
                        };
                        Step::Continue(DriveCommand::Stop)
                    },
                    ScanAttempt::Second => {
                        tracing::warn!("Target not found after both scans");
                        self.phase = SearchPhase::Lost;
                        Step::Done(Completion::TargetLost)
                    },
                }
            },
            SearchPhase::Lost => Step::Done(Completion::TargetLost),
        }
    }
}
