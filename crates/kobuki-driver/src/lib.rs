//! 驱动层模块
//!
//! 本模块提供 Kobuki 底盘的设备驱动功能，包括：
//! - IO 线程管理（发送线程、接收线程、监管线程）
//! - 状态同步（ArcSwap 无锁读取传感器快照）
//! - 命令 FIFO 队列
//! - 差速运动学换算（线速度/角速度 → 速度/转弯半径）
//!
//! # 使用场景
//!
//! 适用于需要直接发送底盘命令、读取编码器等原始传感器的场景。
//! 闭环运动与行为控制见 `kobuki-client`。

mod builder;
pub mod command;
mod error;
pub mod heartbeat;
pub mod kinematics;
mod kobuki;
pub mod metrics;
pub mod pipeline;
pub mod state;

pub use builder::{DEFAULT_PORT, KobukiBuilder};
pub use command::{CommandSender, command_queue};
pub use error::DriverError;
pub use heartbeat::ConnectionMonitor;
pub use kinematics::{encoder_delta, signed_encoder_delta, unicycle_to_drive};
pub use kobuki::{DriveBase, Kobuki};
pub use metrics::{LinkMetrics, MetricsSnapshot};
pub use pipeline::{PipelineConfig, rx_loop, supervisor_loop, tx_loop};
pub use state::*;

pub use kobuki_protocol::{Command, Led, SoundSequence};
