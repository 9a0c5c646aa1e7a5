//! 帧封装与校验和

use crate::ProtocolError;
use crate::constants::*;

/// 计算校验和：`LEN` 与全部负载字节的异或
pub fn checksum(len: u8, payload: &[u8]) -> u8 {
    payload.iter().fold(len, |acc, b| acc ^ b)
}

/// 将负载封装为完整帧
///
/// # 错误
/// 负载超过 255 字节时返回 `ProtocolError::PayloadTooLong`
pub fn encode_frame(payload: &[u8]) -> Result<Vec<u8>, ProtocolError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLong {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }
    let mut out = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    write_frame(payload, &mut out);
    Ok(out)
}

/// 追加帧字节到 `out`（调用方保证负载长度不超过 255）
pub(crate) fn write_frame(payload: &[u8], out: &mut Vec<u8>) {
    debug_assert!(payload.len() <= MAX_PAYLOAD_LEN);
    let len = payload.len() as u8;
    out.push(HEADER_0);
    out.push(HEADER_1);
    out.push(len);
    out.extend_from_slice(payload);
    out.push(checksum(len, payload));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_xor() {
        assert_eq!(checksum(0, &[]), 0);
        assert_eq!(checksum(3, &[1, 2, 3]), 3 ^ 1 ^ 2 ^ 3);
        assert_eq!(checksum(0xFF, &[0xFF]), 0);
    }

    #[test]
    fn test_encode_frame_layout() {
        let frame = encode_frame(&[0x10, 0x20]).unwrap();
        assert_eq!(frame, vec![0xAA, 0xAA, 0x02, 0x10, 0x20, 0x02 ^ 0x10 ^ 0x20]);
    }

    #[test]
    fn test_encode_empty_payload() {
        assert_eq!(encode_frame(&[]).unwrap(), vec![0xAA, 0xAA, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_frame_too_long() {
        let payload = vec![0u8; 256];
        assert_eq!(
            encode_frame(&payload),
            Err(ProtocolError::PayloadTooLong { len: 256, max: 255 })
        );
        assert!(encode_frame(&payload[..255]).is_ok());
    }
}
