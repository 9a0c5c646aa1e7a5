//! Pipeline IO 循环模块
//!
//! 三个长期运行的线程：
//! - TX：阻塞等待命令队列，编码后写串口
//! - RX：读取串口字节，逐字节喂给解码状态机，有效帧发布为传感器快照
//! - 监管：按最小刷新周期运行；收到停止请求时发出最后一条零速命令，
//!   等待若干周期让其发出，然后取消 TX/RX
//!
//! 所有循环在顶部检查 `is_running`，不会打断正在进行的串口调用。
//! 串口读写本身带超时（见 `kobuki-serial`），因此取消最多延迟一个超时周期。

use crate::command::CommandSender;
use crate::metrics::LinkMetrics;
use crate::state::*;
use crossbeam_channel::{Receiver, RecvTimeoutError};
use kobuki_protocol::{Command, FrameParser, MIN_UPDATE_PERIOD_MS, ParseEvent};
use kobuki_serial::{RxAdapter, SerialError, TxAdapter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, trace, warn};

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use kobuki_driver::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.min_update_period_ms, 21);
///
/// let config = PipelineConfig {
///     shutdown_flush_periods: 5,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// 底盘最小刷新周期（毫秒），监管线程按此周期运行
    pub min_update_period_ms: u64,
    /// 停止时发出零速命令后等待的周期数
    pub shutdown_flush_periods: u32,
    /// TX 线程等待命令的超时（毫秒），超时后回到循环顶部检查运行标志
    pub command_poll_timeout_ms: u64,
    /// RX 单次读取的缓冲区大小
    pub read_buffer_size: usize,
    /// 超过此时长未收到有效帧视为断连（毫秒）
    pub connection_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_update_period_ms: MIN_UPDATE_PERIOD_MS,
            shutdown_flush_periods: 3,
            command_poll_timeout_ms: 10,
            read_buffer_size: 256,
            connection_timeout_ms: 200,
        }
    }
}

impl PipelineConfig {
    pub fn update_period(&self) -> Duration {
        Duration::from_millis(self.min_update_period_ms)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }
}

/// RX 线程主循环
///
/// # 参数
/// - `rx`: RX 适配器（只读）
/// - `ctx`: 共享状态上下文
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志（用于生命周期联动）
/// - `metrics`: 链路指标
pub fn rx_loop(
    mut rx: impl RxAdapter,
    ctx: Arc<KobukiContext>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<LinkMetrics>,
) {
    // 解码器只属于本线程
    let mut parser = FrameParser::new();
    let mut buf = vec![0u8; config.read_buffer_size.max(1)];
    let mut sequence: u64 = 0;

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        let n = match rx.receive(&mut buf) {
            Ok(n) => n,
            Err(SerialError::Timeout) => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) => {
                error!("RX thread: serial receive error: {}", e);
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);

                if e.is_fatal() {
                    error!("RX thread: Fatal error detected, setting is_running = false");
                    // Release: All writes before this are visible to threads that see the false value
                    is_running.store(false, Ordering::Release);
                    break;
                }
                continue;
            },
        };

        metrics.rx_bytes_total.fetch_add(n as u64, Ordering::Relaxed);

        for &byte in &buf[..n] {
            match parser.advance(byte) {
                ParseEvent::Incomplete => {},
                ParseEvent::Invalid => {
                    // 校验失败：状态机已回到 SeekHeader1，静默重新同步
                    metrics.rx_frames_invalid.fetch_add(1, Ordering::Relaxed);
                    trace!("RX thread: discarded invalid frame");
                },
                ParseEvent::Valid => {
                    let Some(payload) = parser.payload() else {
                        continue;
                    };
                    match SensorFrame::from_payload(payload) {
                        Ok(mut frame) => {
                            sequence += 1;
                            frame.sequence = sequence;
                            ctx.publish(frame);
                            metrics.rx_frames_valid.fetch_add(1, Ordering::Relaxed);
                        },
                        Err(e) => {
                            metrics.rx_payload_rejected.fetch_add(1, Ordering::Relaxed);
                            trace!("RX thread: ignoring non-sensor payload: {}", e);
                        },
                    }
                },
            }
        }
    }

    trace!("RX thread: loop exited");
}

/// TX 线程主循环
///
/// 严格按队列顺序逐条写出；写失败的命令被丢弃，不会自动重发。
///
/// # 参数
/// - `tx`: TX 适配器（只写）
/// - `cmd_rx`: 命令队列接收端
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志（用于生命周期联动）
/// - `metrics`: 链路指标
pub fn tx_loop(
    mut tx: impl TxAdapter,
    cmd_rx: Receiver<Command>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<LinkMetrics>,
) {
    let poll_timeout = Duration::from_millis(config.command_poll_timeout_ms);

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("TX thread: is_running flag is false, exiting");
            break;
        }

        let command = match cmd_rx.recv_timeout(poll_timeout) {
            Ok(command) => command,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                trace!("TX thread: command channel disconnected");
                break;
            },
        };

        match tx.send(&command.encode()) {
            Ok(()) => {
                metrics.tx_commands_total.fetch_add(1, Ordering::Relaxed);
                trace!("TX thread: sent {:?}", command);
            },
            Err(e) => {
                error!("TX thread: failed to send {:?}: {}", command, e);
                metrics.tx_dropped.fetch_add(1, Ordering::Relaxed);
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);

                if e.is_fatal() {
                    error!("TX thread: Fatal error detected, setting is_running = false");
                    // Release: All writes before this are visible to threads that see the false value
                    is_running.store(false, Ordering::Release);
                    break;
                }
            },
        }
    }

    trace!("TX thread: loop exited");
}

/// 监管线程主循环
///
/// 正常周期只跟踪反馈流的连接状态变化并记录日志。
///
/// # 参数
/// - `commands`: 命令队列发送端（用于最后一条零速命令）
/// - `ctx`: 共享状态上下文
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志，停止流程结束时置为 false
/// - `stop_requested`: 停止请求标志
pub fn supervisor_loop(
    commands: CommandSender,
    ctx: Arc<KobukiContext>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    stop_requested: Arc<AtomicBool>,
) {
    let period = config.update_period();
    let mut was_connected = false;

    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("Supervisor: is_running flag is false, exiting");
            break;
        }

        if stop_requested.load(Ordering::Acquire) {
            info!("Supervisor: stop requested, sending final zero-velocity command");
            if let Err(e) = commands.send(Command::STOP) {
                // 底盘收不到刷新包会自行停车
                warn!("Supervisor: failed to enqueue final stop: {}", e);
            }
            spin_sleep::sleep(period * config.shutdown_flush_periods);

            is_running.store(false, Ordering::Release);
            info!("Supervisor: IO loops cancelled");
            break;
        }

        let connected = ctx.connection_monitor.check_connection();
        if connected != was_connected {
            if connected {
                info!("Kobuki feedback stream established");
            } else if ctx.connection_monitor.has_seen_frame() {
                warn!(
                    "Kobuki feedback lost ({:?} since last frame)",
                    ctx.connection_monitor.time_since_last_frame()
                );
            }
            was_connected = connected;
        }

        spin_sleep::sleep(period);
    }

    trace!("Supervisor: loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::command_queue;
    use kobuki_protocol::encode_frame;
    use kobuki_serial::{MockSerialAdapter, SplittableAdapter};
    use std::thread;
    use std::time::Instant;

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        cond()
    }

    fn sensor_frame_bytes(left: u16, right: u16) -> Vec<u8> {
        let frame = SensorFrame {
            left_encoder: left,
            right_encoder: right,
            battery: 160,
            ..Default::default()
        };
        encode_frame(&frame.to_payload()).unwrap()
    }

    #[test]
    fn test_pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.min_update_period_ms, 21);
        assert_eq!(config.shutdown_flush_periods, 3);
        assert_eq!(config.update_period(), Duration::from_millis(21));
    }

    #[test]
    fn test_rx_loop_publishes_sensor_frames() {
        let (adapter, handle) = MockSerialAdapter::new();
        let (rx, _tx) = adapter.split().unwrap();
        let ctx = Arc::new(KobukiContext::new(Duration::from_secs(1)));
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(LinkMetrics::new());

        // 噪声 + 损坏帧 + 有效帧，且切成任意块
        let mut stream = vec![0x00, 0x42];
        let mut corrupted = sensor_frame_bytes(1, 1);
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0x80;
        stream.extend(corrupted);
        stream.extend(sensor_frame_bytes(65500, 50));
        for chunk in stream.chunks(5) {
            handle.push_inbound(chunk);
        }

        let ctx_clone = ctx.clone();
        let running_clone = is_running.clone();
        let metrics_clone = metrics.clone();
        let rx_thread = thread::spawn(move || {
            rx_loop(
                rx,
                ctx_clone,
                PipelineConfig::default(),
                running_clone,
                metrics_clone,
            )
        });

        assert!(wait_until(Duration::from_secs(2), || ctx.latest().is_valid()));
        let frame = ctx.latest();
        assert_eq!(frame.left_encoder, 65500);
        assert_eq!(frame.right_encoder, 50);
        assert_eq!(frame.sequence, 1);

        is_running.store(false, Ordering::Release);
        rx_thread.join().unwrap();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rx_frames_valid, 1);
        assert_eq!(snapshot.rx_frames_invalid, 1);
    }

    #[test]
    fn test_rx_loop_exits_on_fatal_error() {
        let (adapter, handle) = MockSerialAdapter::new();
        let (rx, _tx) = adapter.split().unwrap();
        let is_running = Arc::new(AtomicBool::new(true));
        handle.close();

        rx_loop(
            rx,
            Arc::new(KobukiContext::new(Duration::from_secs(1))),
            PipelineConfig::default(),
            is_running.clone(),
            Arc::new(LinkMetrics::new()),
        );
        assert!(!is_running.load(Ordering::Acquire));
    }

    #[test]
    fn test_tx_loop_writes_in_order_and_drops_failures() {
        let (adapter, handle) = MockSerialAdapter::new();
        let (_rx, tx) = adapter.split().unwrap();
        let (sender, cmd_rx) = command_queue();
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(LinkMetrics::new());

        handle.fail_next_writes(1);
        let dropped = Command::Drive {
            velocity: 9,
            radius: 9,
        };
        let a = Command::Drive {
            velocity: 100,
            radius: 0,
        };
        let b = Command::set_led(1).unwrap();
        let c = Command::play_sound(0).unwrap();
        for cmd in [dropped, a, b, c] {
            sender.send(cmd).unwrap();
        }

        let running_clone = is_running.clone();
        let metrics_clone = metrics.clone();
        let tx_thread = thread::spawn(move || {
            tx_loop(
                tx,
                cmd_rx,
                PipelineConfig::default(),
                running_clone,
                metrics_clone,
            )
        });

        assert!(wait_until(Duration::from_secs(2), || handle.sent().len() == 3));
        assert_eq!(handle.sent(), vec![a.encode(), b.encode(), c.encode()]);

        is_running.store(false, Ordering::Release);
        tx_thread.join().unwrap();
        assert_eq!(metrics.snapshot().tx_dropped, 1);
        assert_eq!(metrics.snapshot().tx_commands_total, 3);
    }

    #[test]
    fn test_supervisor_sends_stop_then_cancels() {
        let (sender, cmd_rx) = command_queue();
        let ctx = Arc::new(KobukiContext::new(Duration::from_secs(1)));
        let is_running = Arc::new(AtomicBool::new(true));
        let stop_requested = Arc::new(AtomicBool::new(false));
        let config = PipelineConfig {
            min_update_period_ms: 2,
            ..Default::default()
        };

        let running_clone = is_running.clone();
        let stop_clone = stop_requested.clone();
        let supervisor = thread::spawn(move || {
            supervisor_loop(sender, ctx, config, running_clone, stop_clone)
        });

        thread::sleep(Duration::from_millis(10));
        assert!(is_running.load(Ordering::Acquire));
        assert!(cmd_rx.is_empty());

        stop_requested.store(true, Ordering::Release);
        supervisor.join().unwrap();

        assert!(!is_running.load(Ordering::Acquire));
        assert_eq!(cmd_rx.try_iter().collect::<Vec<_>>(), vec![Command::STOP]);
    }
}
