//! 状态结构定义
//!
//! 传感器快照只由接收线程写入（`ArcSwap::store`），其他线程通过 `load` 无锁读取。

use crate::heartbeat::ConnectionMonitor;
use arc_swap::ArcSwap;
use kobuki_protocol::*;
use std::sync::Arc;
use std::time::Duration;

/// 传感器快照（不可变）
///
/// 编码器为 16 位计数器，按 65536 回绕；差值计算请使用 [`crate::encoder_delta`]。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SensorFrame {
    pub left_encoder: u16,
    pub right_encoder: u16,
    pub bumper: u8,
    pub cliff: u8,
    pub button: u8,
    pub battery: u8,
    /// 接收线程为每个有效帧分配的序号，0 表示尚未收到任何反馈
    pub sequence: u64,
}

impl SensorFrame {
    /// 从校验通过的负载中提取固定偏移字段
    ///
    /// # 错误
    /// 负载短于 19 字节时返回 `ProtocolError::InvalidLength`
    pub fn from_payload(payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() < SENSOR_PAYLOAD_MIN_LEN {
            return Err(ProtocolError::InvalidLength {
                expected: SENSOR_PAYLOAD_MIN_LEN,
                actual: payload.len(),
            });
        }

        Ok(Self {
            left_encoder: bytes_to_u16_le([
                payload[OFFSET_LEFT_ENCODER],
                payload[OFFSET_LEFT_ENCODER + 1],
            ]),
            right_encoder: bytes_to_u16_le([
                payload[OFFSET_RIGHT_ENCODER],
                payload[OFFSET_RIGHT_ENCODER + 1],
            ]),
            bumper: payload[OFFSET_BUMPER],
            cliff: payload[OFFSET_CLIFF],
            button: payload[OFFSET_BUTTON],
            battery: payload[OFFSET_BATTERY],
            sequence: 0,
        })
    }

    /// 构造一个反馈负载（用于测试和仿真）
    pub fn to_payload(&self) -> [u8; SENSOR_PAYLOAD_MIN_LEN] {
        let mut payload = [0u8; SENSOR_PAYLOAD_MIN_LEN];
        payload[OFFSET_BUMPER] = self.bumper;
        payload[OFFSET_CLIFF] = self.cliff;
        payload[OFFSET_LEFT_ENCODER..OFFSET_LEFT_ENCODER + 2]
            .copy_from_slice(&u16_to_bytes_le(self.left_encoder));
        payload[OFFSET_RIGHT_ENCODER..OFFSET_RIGHT_ENCODER + 2]
            .copy_from_slice(&u16_to_bytes_le(self.right_encoder));
        payload[OFFSET_BUTTON] = self.button;
        payload[OFFSET_BATTERY] = self.battery;
        payload
    }

    /// 是否已收到过反馈
    pub fn is_valid(&self) -> bool {
        self.sequence > 0
    }
}

/// 共享状态上下文
pub struct KobukiContext {
    /// 最新传感器快照（单写者：接收线程）
    pub sensors: ArcSwap<SensorFrame>,
    /// 反馈流健康监测
    pub connection_monitor: ConnectionMonitor,
}

impl KobukiContext {
    pub fn new(connection_timeout: Duration) -> Self {
        Self {
            sensors: ArcSwap::from_pointee(SensorFrame::default()),
            connection_monitor: ConnectionMonitor::new(connection_timeout),
        }
    }

    /// 发布新快照
    pub fn publish(&self, frame: SensorFrame) {
        self.sensors.store(Arc::new(frame));
        self.connection_monitor.register_frame();
    }

    /// 读取最新快照
    pub fn latest(&self) -> SensorFrame {
        **self.sensors.load()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload() -> Vec<u8> {
        let mut payload = vec![0u8; 20];
        payload[7] = 0x02;
        payload[9] = 0x04;
        payload[10] = 0x34;
        payload[11] = 0x12;
        payload[12] = 0xCD;
        payload[13] = 0xAB;
        payload[16] = 0x01;
        payload[18] = 160;
        payload
    }

    #[test]
    fn test_from_payload_offsets() {
        let frame = SensorFrame::from_payload(&sample_payload()).unwrap();
        assert_eq!(frame.bumper, 0x02);
        assert_eq!(frame.cliff, 0x04);
        assert_eq!(frame.left_encoder, 0x1234);
        assert_eq!(frame.right_encoder, 0xABCD);
        assert_eq!(frame.button, 0x01);
        assert_eq!(frame.battery, 160);
        assert!(!frame.is_valid());
    }

    #[test]
    fn test_from_payload_too_short() {
        assert_eq!(
            SensorFrame::from_payload(&[0u8; 18]),
            Err(ProtocolError::InvalidLength {
                expected: 19,
                actual: 18
            })
        );
    }

    #[test]
    fn test_to_payload_inverse() {
        let frame = SensorFrame {
            left_encoder: 65500,
            right_encoder: 50,
            bumper: 1,
            cliff: 2,
            button: 4,
            battery: 155,
            sequence: 0,
        };
        assert_eq!(SensorFrame::from_payload(&frame.to_payload()), Ok(frame));
    }

    #[test]
    fn test_context_publish() {
        let ctx = KobukiContext::new(Duration::from_secs(1));
        assert!(!ctx.latest().is_valid());
        assert!(!ctx.connection_monitor.check_connection());

        ctx.publish(SensorFrame {
            left_encoder: 10,
            sequence: 1,
            ..Default::default()
        });
        assert_eq!(ctx.latest().left_encoder, 10);
        assert!(ctx.connection_monitor.check_connection());
    }
}
