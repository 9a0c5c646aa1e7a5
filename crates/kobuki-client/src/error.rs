//! 控制层错误类型定义

use thiserror::Error;

/// 控制层错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 未知的行为编号
    #[error("Unknown task id: {0}")]
    UnknownTask(u8),

    /// 参数非法（NaN、无穷大等）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 控制线程创建失败
    #[error("Failed to spawn control task: {0}")]
    Spawn(#[from] std::io::Error),
}
