//! 串口链路指标模块
//!
//! 原子计数器，IO 线程写入，任意线程读取快照，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 链路实时指标
///
/// # 使用示例
///
/// ```rust
/// use kobuki_driver::LinkMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = LinkMetrics::new();
/// metrics.rx_frames_valid.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(metrics.snapshot().rx_frames_valid, 1);
/// ```
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// RX 读取的总字节数
    pub rx_bytes_total: AtomicU64,

    /// 校验通过并成功解析为传感器快照的帧数
    pub rx_frames_valid: AtomicU64,

    /// 校验失败或帧头失配而被丢弃的帧数
    pub rx_frames_invalid: AtomicU64,

    /// 校验通过但负载过短、无法提取传感器字段的帧数
    pub rx_payload_rejected: AtomicU64,

    /// RX 超时次数（正常现象，无数据时会超时）
    pub rx_timeouts: AtomicU64,

    /// TX 成功写出的命令数
    pub tx_commands_total: AtomicU64,

    /// TX 写入失败而丢弃的命令数（不会自动重发）
    pub tx_dropped: AtomicU64,

    /// 串口设备错误次数
    pub device_errors: AtomicU64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 各计数器分别原子读取，彼此之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_bytes_total: self.rx_bytes_total.load(Ordering::Relaxed),
            rx_frames_valid: self.rx_frames_valid.load(Ordering::Relaxed),
            rx_frames_invalid: self.rx_frames_invalid.load(Ordering::Relaxed),
            rx_payload_rejected: self.rx_payload_rejected.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            tx_commands_total: self.tx_commands_total.load(Ordering::Relaxed),
            tx_dropped: self.tx_dropped.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.rx_bytes_total.store(0, Ordering::Relaxed);
        self.rx_frames_valid.store(0, Ordering::Relaxed);
        self.rx_frames_invalid.store(0, Ordering::Relaxed);
        self.rx_payload_rejected.store(0, Ordering::Relaxed);
        self.rx_timeouts.store(0, Ordering::Relaxed);
        self.tx_commands_total.store(0, Ordering::Relaxed);
        self.tx_dropped.store(0, Ordering::Relaxed);
        self.device_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub rx_bytes_total: u64,
    pub rx_frames_valid: u64,
    pub rx_frames_invalid: u64,
    pub rx_payload_rejected: u64,
    pub rx_timeouts: u64,
    pub tx_commands_total: u64,
    pub tx_dropped: u64,
    pub device_errors: u64,
}

impl MetricsSnapshot {
    /// 帧校验失败率（无帧时为 0）
    pub fn invalid_frame_ratio(&self) -> f64 {
        let total = self.rx_frames_valid + self.rx_frames_invalid + self.rx_payload_rejected;
        if total == 0 {
            0.0
        } else {
            (self.rx_frames_invalid + self.rx_payload_rejected) as f64 / total as f64
        }
    }
}
