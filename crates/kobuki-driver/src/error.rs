//! 驱动层错误类型定义

use kobuki_protocol::ProtocolError;
use kobuki_serial::SerialError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口错误
    #[error("Serial error: {0}")]
    Serial(#[from] SerialError),

    /// 协议错误（命令标签非法、负载过短等）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 命令通道已关闭（发送线程退出）
    #[error("Command channel closed")]
    ChannelClosed,

    /// 驱动正在关闭或已关闭
    #[error("Driver is shut down")]
    ShutDown,

    /// IO 线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,
}
