//! 控制帧构建
//!
//! 每条命令序列化为 `[id, size, data...]` 子负载，再由 [`crate::frame::encode_frame`]
//! 封装为完整帧。

use crate::constants::*;
use crate::{ProtocolError, i16_to_bytes_le, u16_to_bytes_le};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// LED 指示灯模式
///
/// 整数标签 0-4 与上层 UI 使用的编号一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Led {
    Off = 0,
    Led1Red = 1,
    Led1Green = 2,
    Led2Red = 3,
    Led2Green = 4,
}

impl Led {
    /// 通用输出寄存器中对应的位
    pub fn output_flags(self) -> u16 {
        match self {
            Led::Off => 0x0000,
            Led::Led1Red => 0x0100,
            Led::Led1Green => 0x0200,
            Led::Led2Red => 0x0400,
            Led::Led2Green => 0x0800,
        }
    }
}

/// 内置声音序列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum SoundSequence {
    On = 0,
    Off = 1,
    Recharge = 2,
    Button = 3,
    Error = 4,
    CleaningStart = 5,
    CleaningEnd = 6,
}

/// 发往底盘的命令
///
/// 由调用方创建，经命令队列按 FIFO 顺序被发送线程消费一次。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 底盘运动：线速度（mm/s）与转弯半径（mm）
    ///
    /// `radius = 0` 表示直行，`radius = ±1` 表示原地旋转。
    Drive { velocity: i16, radius: i16 },
    /// 设置 LED
    SetLed { led: Led },
    /// 播放声音序列
    PlaySound { sequence: SoundSequence },
}

impl Command {
    /// 零速命令（停车）
    pub const STOP: Command = Command::Drive {
        velocity: 0,
        radius: 0,
    };

    /// 由整数标签构建 LED 命令
    ///
    /// # 错误
    /// 标签超出 0-4 时返回 `ProtocolError::InvalidValue`
    pub fn set_led(id: u8) -> Result<Self, ProtocolError> {
        let led = Led::try_from(id).map_err(|_| ProtocolError::InvalidValue {
            field: "led".to_string(),
            value: id as i64,
        })?;
        Ok(Command::SetLed { led })
    }

    /// 由整数标签构建声音命令
    ///
    /// # 错误
    /// 标签超出 0-6 时返回 `ProtocolError::InvalidValue`
    pub fn play_sound(id: u8) -> Result<Self, ProtocolError> {
        let sequence = SoundSequence::try_from(id).map_err(|_| ProtocolError::InvalidValue {
            field: "sound".to_string(),
            value: id as i64,
        })?;
        Ok(Command::PlaySound { sequence })
    }

    /// 是否为零速驱动命令
    pub fn is_stop(&self) -> bool {
        matches!(
            self,
            Command::Drive {
                velocity: 0,
                radius: 0
            }
        )
    }

    /// 序列化为子负载字节
    pub fn payload(&self) -> Vec<u8> {
        match *self {
            Command::Drive { velocity, radius } => {
                let mut out = Vec::with_capacity(2 + BASE_CONTROL_SIZE as usize);
                out.push(CMD_BASE_CONTROL);
                out.push(BASE_CONTROL_SIZE);
                out.extend_from_slice(&i16_to_bytes_le(velocity));
                out.extend_from_slice(&i16_to_bytes_le(radius));
                out
            },
            Command::SetLed { led } => {
                let mut out = Vec::with_capacity(2 + GENERAL_PURPOSE_OUTPUT_SIZE as usize);
                out.push(CMD_GENERAL_PURPOSE_OUTPUT);
                out.push(GENERAL_PURPOSE_OUTPUT_SIZE);
                out.extend_from_slice(&u16_to_bytes_le(led.output_flags()));
                out
            },
            Command::PlaySound { sequence } => {
                vec![CMD_SOUND_SEQUENCE, SOUND_SEQUENCE_SIZE, sequence.into()]
            },
        }
    }

    /// 序列化为完整的线上帧
    pub fn encode(&self) -> Vec<u8> {
        // 子负载长度固定且远小于 255，封装不会失败
        let payload = self.payload();
        let mut out = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
        crate::frame::write_frame(&payload, &mut out);
        out
    }
}
