//! 协议常量定义

/// 帧头第一个字节
pub const HEADER_0: u8 = 0xAA;

/// 帧头第二个字节
pub const HEADER_1: u8 = 0xAA;

/// 单帧负载最大长度（LEN 字段为 1 字节）
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize;

/// 帧开销：两字节帧头 + LEN + CHECKSUM
pub const FRAME_OVERHEAD: usize = 4;

/// 默认串口波特率
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// 底盘接受命令的最小刷新周期（毫秒）
///
/// 底盘以约 50Hz 推送反馈帧，长时间收不到驱动命令会自行停车。
pub const MIN_UPDATE_PERIOD_MS: u64 = 21;

/// 两驱动轮间距（毫米）
pub const WHEELBASE_MM: f64 = 230.0;

// ============================================================================
// 子负载 ID（上行命令）
// ============================================================================

/// 底盘运动控制：`velocity: i16`, `radius: i16`
pub const CMD_BASE_CONTROL: u8 = 0x01;
/// 声音序列：`sequence: u8`
pub const CMD_SOUND_SEQUENCE: u8 = 0x04;
/// 通用输出（LED 位于高字节）：`flags: u16`
pub const CMD_GENERAL_PURPOSE_OUTPUT: u8 = 0x0C;

/// 各命令子负载的数据长度（不含 id/size 两字节）
pub const BASE_CONTROL_SIZE: u8 = 4;
pub const SOUND_SEQUENCE_SIZE: u8 = 1;
pub const GENERAL_PURPOSE_OUTPUT_SIZE: u8 = 2;

// ============================================================================
// 反馈负载字段偏移（负载内 0 起始）
// ============================================================================

pub const OFFSET_BUMPER: usize = 7;
pub const OFFSET_CLIFF: usize = 9;
/// 左轮编码器（小端 u16，占 10-11）
pub const OFFSET_LEFT_ENCODER: usize = 10;
/// 右轮编码器（小端 u16，占 12-13）
pub const OFFSET_RIGHT_ENCODER: usize = 12;
pub const OFFSET_BUTTON: usize = 16;
pub const OFFSET_BATTERY: usize = 18;

/// 能提取全部传感器字段的最小负载长度
pub const SENSOR_PAYLOAD_MIN_LEN: usize = OFFSET_BATTERY + 1;

/// 编码器计数模数（16 位回绕）
pub const ENCODER_MODULUS: u32 = 1 << 16;
