//! # Kobuki Client
//!
//! 运动原语与视觉引导行为。
//!
//! ## 模块
//!
//! - `behavior`: 行为状态机（持续行驶、定距行驶、定时旋转、靠近并保持、搜索重获）
//! - `controller`: 周期调度与行为切换
//! - `config`: 控制周期、编码器标定与行为参数
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kobuki_client::{ControllerConfig, MotionController};
//! use kobuki_driver::KobukiBuilder;
//! use kobuki_vision::TargetFeed;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let kobuki = Arc::new(KobukiBuilder::new().port("/dev/ttyUSB0").build()?);
//! let feed = Arc::new(TargetFeed::new());
//! let controller = MotionController::new(kobuki, feed, ControllerConfig::default());
//!
//! controller.move_distance(150, 0, 1.0)?;
//! # Ok(())
//! # }
//! ```

pub mod behavior;
pub mod config;
mod controller;
mod error;

pub use behavior::{Behavior, Completion, DriveCommand, Step, TickInput};
pub use config::{ApproachConfig, CONTROL_PERIOD_MS, ControllerConfig, SearchConfig, TICKS_PER_METER};
pub use controller::{ControllerStatus, MotionController};
pub use error::ClientError;
