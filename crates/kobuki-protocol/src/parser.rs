//! 逐字节解码状态机
//!
//! ```text
//! SeekHeader1 → SeekHeader2 → ReadLength → ReadPayload(n) → ReadChecksum → {Valid | Invalid}
//! ```
//!
//! 解码器不假设帧与底层读取边界对齐：调用方可以按任意分块喂入字节。
//! 校验失败或帧头失配时丢弃已缓存的部分帧，回到 `SeekHeader1`。

use crate::constants::*;
use crate::frame::checksum;

/// 解码器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// 等待第一个帧头字节
    SeekHeader1,
    /// 等待第二个帧头字节
    SeekHeader2,
    /// 读取负载长度
    ReadLength,
    /// 读取负载，`remaining` 为尚未收到的字节数
    ReadPayload { remaining: usize },
    /// 读取校验和
    ReadChecksum,
}

/// 单字节推进的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseEvent {
    /// 帧尚未结束
    Incomplete,
    /// 收到完整且校验通过的帧，负载可通过 [`FrameParser::payload`] 读取
    Valid,
    /// 帧头失配或校验和错误，已丢弃部分帧
    Invalid,
}

/// 帧解码器
///
/// 每个底盘连接一个实例，仅由接收线程持有和修改。
#[derive(Debug, Clone)]
pub struct FrameParser {
    state: ParserState,
    buffer: Vec<u8>,
    length: u8,
    complete: bool,
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::SeekHeader1,
            buffer: Vec::with_capacity(MAX_PAYLOAD_LEN),
            length: 0,
            complete: false,
        }
    }

    /// 当前状态
    pub fn state(&self) -> ParserState {
        self.state
    }

    /// 丢弃部分帧，回到初始状态
    pub fn reset(&mut self) {
        self.state = ParserState::SeekHeader1;
        self.buffer.clear();
        self.length = 0;
        self.complete = false;
    }

    /// 推进一个字节
    pub fn advance(&mut self, byte: u8) -> ParseEvent {
        self.complete = false;
        match self.state {
            ParserState::SeekHeader1 => {
                if byte == HEADER_0 {
                    self.state = ParserState::SeekHeader2;
                }
                ParseEvent::Incomplete
            },
            ParserState::SeekHeader2 => {
                if byte == HEADER_1 {
                    self.state = ParserState::ReadLength;
                    ParseEvent::Incomplete
                } else {
                    self.reset();
                    ParseEvent::Invalid
                }
            },
            ParserState::ReadLength => {
                self.length = byte;
                self.buffer.clear();
                self.state = if byte == 0 {
                    ParserState::ReadChecksum
                } else {
                    ParserState::ReadPayload {
                        remaining: byte as usize,
                    }
                };
                ParseEvent::Incomplete
            },
            ParserState::ReadPayload { remaining } => {
                self.buffer.push(byte);
                self.state = if remaining > 1 {
                    ParserState::ReadPayload {
                        remaining: remaining - 1,
                    }
                } else {
                    ParserState::ReadChecksum
                };
                ParseEvent::Incomplete
            },
            ParserState::ReadChecksum => {
                let expected = checksum(self.length, &self.buffer);
                self.state = ParserState::SeekHeader1;
                if byte == expected {
                    self.complete = true;
                    ParseEvent::Valid
                } else {
                    self.buffer.clear();
                    ParseEvent::Invalid
                }
            },
        }
    }

    /// 最近一次 `Valid` 事件对应的负载
    ///
    /// 仅在 `advance` 返回 `Valid` 之后、下一次 `advance` 之前有效；其余时刻返回 `None`。
    pub fn payload(&self) -> Option<&[u8]> {
        if self.complete {
            Some(&self.buffer)
        } else {
            None
        }
    }

    /// 喂入一段字节，对每个有效帧回调 `on_frame`
    ///
    /// 返回 `(有效帧数, 无效帧数)`。
    pub fn feed(&mut self, bytes: &[u8], mut on_frame: impl FnMut(&[u8])) -> (usize, usize) {
        let mut valid = 0;
        let mut invalid = 0;
        for &byte in bytes {
            match self.advance(byte) {
                ParseEvent::Valid => {
                    valid += 1;
                    on_frame(&self.buffer);
                },
                ParseEvent::Invalid => invalid += 1,
                ParseEvent::Incomplete => {},
            }
        }
        (valid, invalid)
    }
}
