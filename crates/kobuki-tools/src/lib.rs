//! # Kobuki Tools - 共享调度与输入工具
//!
//! **依赖原则**: 不依赖协议层和驱动层，可被任意上层 crate 复用
//!
//! ## 包含模块
//!
//! - `periodic` - 固定频率周期任务（协作式取消）
//! - `input` - 界面文本输入的宽松解析（失败回退到安全默认值）

pub mod input;
pub mod periodic;

// 重新导出常用类型
pub use input::{InputError, parse_color_triplet, parse_number_or, try_parse_color_triplet};
pub use periodic::{PeriodicTask, TickControl};
