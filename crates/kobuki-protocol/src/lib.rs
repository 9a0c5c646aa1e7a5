//! # Kobuki Protocol
//!
//! Kobuki 底盘串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `constants`: 协议常量定义（帧头、子负载 ID、反馈字段偏移）
//! - `control`: 控制命令构建（驱动、LED、声音）
//! - `frame`: 帧封装与校验和
//! - `parser`: 逐字节解码状态机
//!
//! ## 帧格式
//!
//! ```text
//! 0xAA 0xAA <LEN> <PAYLOAD[LEN]> <CHECKSUM>
//! ```
//!
//! `CHECKSUM` 为 `LEN` 与全部负载字节的异或。
//!
//! ## 字节序
//!
//! 协议使用小端字节序（低位在前）。
//! 本模块提供了字节序转换工具函数。

pub mod constants;
pub mod control;
pub mod frame;
pub mod parser;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use frame::*;
pub use parser::*;

use thiserror::Error;

/// 协议解析错误类型
///
/// 解码路径上的错误（校验和、帧头失配）由 [`FrameParser`] 内部消化并重新同步，
/// 不会以此类型向上传播；此类型只用于编码与字段提取。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid payload length: expected at least {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Payload too long: {len} bytes (max {max})")]
    PayloadTooLong { len: usize, max: usize },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: i64 },
}

/// 字节序转换工具函数
///
/// 协议使用小端字节序，
/// 这些函数用于在协议层进行字节序转换。
///
/// 小端字节序转 u16
pub fn bytes_to_u16_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// 小端字节序转 i16
pub fn bytes_to_i16_le(bytes: [u8; 2]) -> i16 {
    i16::from_le_bytes(bytes)
}

/// i16 转小端字节序
pub fn i16_to_bytes_le(value: i16) -> [u8; 2] {
    value.to_le_bytes()
}

/// u16 转小端字节序
pub fn u16_to_bytes_le(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_to_u16_le() {
        assert_eq!(bytes_to_u16_le([0x34, 0x12]), 0x1234);
        assert_eq!(bytes_to_u16_le([0xFF, 0xFF]), u16::MAX);
    }

    #[test]
    fn test_bytes_to_i16_le_negative() {
        assert_eq!(bytes_to_i16_le([0xFF, 0xFF]), -1);
        assert_eq!(bytes_to_i16_le([0x00, 0x80]), i16::MIN);
    }

    #[test]
    fn test_i16_to_bytes_le() {
        assert_eq!(i16_to_bytes_le(-100), [0x9C, 0xFF]);
        assert_eq!(i16_to_bytes_le(300), [0x2C, 0x01]);
    }

    #[test]
    fn test_roundtrip_i16() {
        for value in [i16::MIN, -1, 0, 1, 1234, i16::MAX] {
            assert_eq!(bytes_to_i16_le(i16_to_bytes_le(value)), value);
        }
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidLength {
            expected: 19,
            actual: 4,
        };
        assert_eq!(
            err.to_string(),
            "Invalid payload length: expected at least 19, got 4"
        );

        let err = ProtocolError::InvalidValue {
            field: "led".to_string(),
            value: 9,
        };
        assert!(err.to_string().contains("led"));
    }
}
