//! 基于 `serialport` crate 的真实串口后端

use crate::{
    RxAdapter, SerialAdapter, SerialDeviceError, SerialDeviceErrorKind, SerialError,
    SplittableAdapter, TxAdapter,
};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// 默认读写超时
///
/// 接收线程每次读取最多阻塞这么久，然后回到循环顶部检查运行标志。
pub const DEFAULT_PORT_TIMEOUT: Duration = Duration::from_millis(50);

impl From<serialport::Error> for SerialError {
    fn from(e: serialport::Error) -> Self {
        let kind = match e.kind() {
            serialport::ErrorKind::NoDevice => SerialDeviceErrorKind::NoDevice,
            serialport::ErrorKind::InvalidInput => SerialDeviceErrorKind::InvalidConfig,
            serialport::ErrorKind::Io(ErrorKind::NotFound) => SerialDeviceErrorKind::NotFound,
            serialport::ErrorKind::Io(ErrorKind::PermissionDenied) => {
                SerialDeviceErrorKind::AccessDenied
            },
            serialport::ErrorKind::Io(_) => SerialDeviceErrorKind::Backend,
            _ => SerialDeviceErrorKind::Unknown,
        };
        SerialError::Device(SerialDeviceError::new(kind, e.description))
    }
}

fn map_read(result: std::io::Result<usize>) -> Result<usize, SerialError> {
    match result {
        Ok(0) => Err(SerialError::Timeout),
        Ok(n) => Ok(n),
        Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
            Err(SerialError::Timeout)
        },
        Err(e) => Err(e.into()),
    }
}

fn write_all(port: &mut dyn SerialPort, bytes: &[u8]) -> Result<(), SerialError> {
    match port.write_all(bytes).and_then(|_| port.flush()) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::TimedOut => Err(SerialError::Timeout),
        Err(e) => Err(e.into()),
    }
}

/// 串口适配器（8N1，无流控）
pub struct SerialPortAdapter {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialPortAdapter {
    /// 打开串口
    ///
    /// # 参数
    /// - `name`: 设备路径（如 `/dev/kobuki`、`/dev/ttyUSB0`）
    /// - `baud_rate`: 波特率（Kobuki 为 115200）
    ///
    /// # 错误
    /// 设备不存在或无权限时返回 `SerialError::Device`
    pub fn open(name: &str, baud_rate: u32) -> Result<Self, SerialError> {
        Self::open_with_timeout(name, baud_rate, DEFAULT_PORT_TIMEOUT)
    }

    pub fn open_with_timeout(
        name: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self, SerialError> {
        let port = serialport::new(name, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(timeout)
            .open()?;

        info!("Opened serial port: {} at {} baud", name, baud_rate);

        Ok(Self {
            port,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SerialAdapter for SerialPortAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        write_all(self.port.as_mut(), bytes)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        map_read(self.port.read(buf))
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self.port.set_timeout(timeout) {
            debug!("Failed to set serial timeout on {}: {}", self.name, e);
        }
    }
}

/// 接收半部
pub struct SerialPortRxAdapter {
    port: Box<dyn SerialPort>,
}

impl RxAdapter for SerialPortRxAdapter {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        map_read(self.port.read(buf))
    }
}

/// 发送半部
pub struct SerialPortTxAdapter {
    port: Box<dyn SerialPort>,
}

impl TxAdapter for SerialPortTxAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        write_all(self.port.as_mut(), bytes)
    }
}

impl SplittableAdapter for SerialPortAdapter {
    type RxAdapter = SerialPortRxAdapter;
    type TxAdapter = SerialPortTxAdapter;

    /// 通过 `try_clone` 复制底层文件描述符，收发两半各自持有
    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), SerialError> {
        let tx_port = self.port.try_clone()?;
        debug!("Split serial port {} into RX/TX halves", self.name);
        Ok((
            SerialPortRxAdapter { port: self.port },
            SerialPortTxAdapter { port: tx_port },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_read_timeout() {
        assert!(matches!(map_read(Ok(0)), Err(SerialError::Timeout)));
        assert!(matches!(
            map_read(Err(std::io::Error::from(ErrorKind::TimedOut))),
            Err(SerialError::Timeout)
        ));
        assert_eq!(map_read(Ok(5)).unwrap(), 5);
        assert!(matches!(
            map_read(Err(std::io::Error::from(ErrorKind::BrokenPipe))),
            Err(SerialError::Io(_))
        ));
    }

    #[test]
    fn test_open_missing_device() {
        let result = SerialPortAdapter::open("/dev/kobuki-does-not-exist", 115_200);
        assert!(matches!(result, Err(SerialError::Device(_))));
    }
}
