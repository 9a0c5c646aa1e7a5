//! # Kobuki Serial Adapter Layer
//!
//! 串口硬件抽象层，提供统一的字节流收发接口。
//!
//! 上层只依赖 [`RxAdapter`] / [`TxAdapter`] 两个最小接口：
//! 接收线程和发送线程各持有一半，互不阻塞。

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "serialport")]
pub mod port;

#[cfg(feature = "serialport")]
pub use port::{SerialPortAdapter, SerialPortRxAdapter, SerialPortTxAdapter};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockSerialAdapter, MockSerialHandle};

/// 串口适配层统一错误类型
#[derive(Error, Debug)]
pub enum SerialError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] SerialDeviceError),
    #[error("Read timeout")]
    Timeout,
    #[error("Port closed")]
    Closed,
}

impl SerialError {
    /// 是否为致命错误（设备丢失、端口已关闭）
    ///
    /// 致命错误会让 IO 线程退出；其余错误记录日志后继续循环。
    pub fn is_fatal(&self) -> bool {
        match self {
            SerialError::Device(e) => e.is_fatal(),
            SerialError::Closed => true,
            SerialError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected
            ),
            SerialError::Timeout => false,
        }
    }
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialDeviceErrorKind {
    Unknown,
    NotFound,
    NoDevice,
    AccessDenied,
    InvalidConfig,
    Backend,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct SerialDeviceError {
    pub kind: SerialDeviceErrorKind,
    pub message: String,
}

impl SerialDeviceError {
    pub fn new(kind: SerialDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SerialDeviceErrorKind::NoDevice
                | SerialDeviceErrorKind::AccessDenied
                | SerialDeviceErrorKind::NotFound
        )
    }
}

impl From<String> for SerialDeviceError {
    fn from(message: String) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

impl From<&str> for SerialDeviceError {
    fn from(message: &str) -> Self {
        Self::new(SerialDeviceErrorKind::Unknown, message)
    }
}

/// 完整的串口适配器（收发合一）
pub trait SerialAdapter {
    /// 写出全部字节
    fn send(&mut self, bytes: &[u8]) -> Result<(), SerialError>;

    /// 读取可用字节到 `buf`，返回读取的字节数
    ///
    /// 在超时时间内没有数据时返回 `Err(SerialError::Timeout)`，不会返回 `Ok(0)`。
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;

    fn set_receive_timeout(&mut self, _timeout: Duration) {}

    /// 非阻塞读取：无数据时返回 `Ok(0)`
    fn try_receive(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        self.set_receive_timeout(Duration::ZERO);
        match self.receive(buf) {
            Ok(n) => Ok(n),
            Err(SerialError::Timeout) => Ok(0),
            Err(e) => Err(e),
        }
    }
}

/// 接收半部
pub trait RxAdapter {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, SerialError>;
}

/// 发送半部
pub trait TxAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SerialError>;
}

/// 可拆分为独立收发半部的适配器
pub trait SplittableAdapter: SerialAdapter {
    type RxAdapter: RxAdapter + Send + 'static;
    type TxAdapter: TxAdapter + Send + 'static;
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), SerialError>;
}
