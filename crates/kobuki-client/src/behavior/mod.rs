//! 行为接口
//!
//! 每个运动原语和自主行为都是一个状态机，由控制器按固定周期调用 `tick`。
//!
//! # 设计理念
//!
//! - **Tick 模式**: 控制器负责调度和下发命令，行为只负责计算
//! - **周期计数**: 时间相关的判断一律按周期数计算，不读取墙钟
//! - **无阻塞**: 停顿也是状态，取消在下一个周期之前就能生效

mod approach;
mod primitive;
mod search;

pub use approach::{ApproachAndHold, ApproachLaw};
pub use primitive::{BoundedDrive, ContinuousDrive, TimedRotate};
pub use search::{ScanAttempt, SearchApproach, SearchPhase};

use kobuki_vision::TargetObservation;

/// 单个周期的输入快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickInput {
    /// 从 0 开始的周期序号
    pub period: u64,
    /// (左, 右) 编码器计数
    pub encoders: (u16, u16),
    /// 最新目标观测
    pub target: TargetObservation,
}

/// 驱动命令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriveCommand {
    /// 原生 (速度 mm/s, 半径 mm)
    Raw { velocity: i16, radius: i16 },
    /// (线速度 mm/s, 角速度 rad/s)
    Unicycle { linear: f64, angular: f64 },
    /// 零速
    Stop,
}

/// 行为结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// 正常完成（到达距离、旋转结束、靠近到位）
    Finished,
    /// 两次扫描都没有重新发现目标
    TargetLost,
}

/// 一个周期的输出
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// 下发命令并继续
    Continue(DriveCommand),
    /// 行为结束，控制器负责下发零速
    Done(Completion),
}

/// 行为状态机
pub trait Behavior: Send {
    /// 名称（线程名与日志）
    fn name(&self) -> &'static str;

    /// 计算一个周期的输出
    fn tick(&mut self, input: &TickInput) -> Step;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub(crate) fn input(period: u64, left: u16) -> TickInput {
        TickInput {
            period,
            encoders: (left, left),
            target: TargetObservation::default(),
        }
    }

    pub(crate) fn seen(period: u64, left: u16, distance: f64) -> TickInput {
        TickInput {
            period,
            encoders: (left, left),
            target: TargetObservation {
                visible: true,
                visible_this_frame: true,
                distance,
            },
        }
    }

    /// 去抖标志仍为 true，但本帧未检测到
    pub(crate) fn just_lost(period: u64, left: u16, distance: f64) -> TickInput {
        TickInput {
            period,
            encoders: (left, left),
            target: TargetObservation {
                visible: true,
                visible_this_frame: false,
                distance,
            },
        }
    }
}
