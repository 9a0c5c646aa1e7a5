//! # Kobuki SDK
//!
//! Kobuki 差速底盘的串口协议、驱动、视觉测距与行为控制。
//!
//! ## 分层
//!
//! - `protocol`: 帧编码与逐字节解析
//! - `serial`: 字节传输边界（真实串口 / Mock）
//! - `driver`: 发送、接收与监管线程，传感器快照
//! - `vision`: 颜色分割测距、可见性去抖、标定、相机服务
//! - `client`: 运动原语与自主行为
//!
//! 大多数使用者只需要 [`Session`]。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use kobuki_sdk::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     kobuki_sdk::init_logger();
//!     let config = KobukiConfig::load_from_file("kobuki.toml")?;
//!     let session = Session::connect(config)?;
//!
//!     session.move_distance(150, 0, 1.0)?;
//!     while session.is_moving() {
//!         std::thread::sleep(std::time::Duration::from_millis(50));
//!     }
//!     println!("encoders: {:?}", session.sensors());
//!     Ok(())
//! }
//! ```

mod config;
mod logging;
mod session;

pub use kobuki_client as client;
pub use kobuki_driver as driver;
pub use kobuki_protocol as protocol;
pub use kobuki_serial as serial;
pub use kobuki_tools as tools;
pub use kobuki_vision as vision;

pub use config::{ConfigError, KobukiConfig};
pub use logging::{DEFAULT_FILTER, init_logger, init_logger_with};
pub use session::{Session, SessionError};

pub use kobuki_client::{ClientError, ControllerConfig, ControllerStatus, MotionController};
pub use kobuki_driver::{DriveBase, DriverError, Kobuki, KobukiBuilder, PipelineConfig, SensorFrame};
pub use kobuki_protocol::{Command, ProtocolError};
pub use kobuki_vision::{
    CameraMode, ColorRange, RangeEstimatorConfig, TargetFeed, TargetObservation, VisionError,
};

/// 常用类型
pub mod prelude {
    pub use crate::{
        CameraMode, ColorRange, ControllerStatus, DriveBase, Kobuki, KobukiBuilder, KobukiConfig,
        SensorFrame, Session, SessionError, TargetObservation,
    };
}
