//! Robot API 模块
//!
//! 提供对外的 `Kobuki` 结构体，封装 IO 线程、命令队列和传感器状态。
//!
//! 所有执行类接口（驱动、LED、声音）都是"发出即忘"：入队失败只记录日志，
//! 不向调用方传播错误。需要错误信息时使用 `try_*` 变体。

use crate::command::{CommandSender, command_queue};
use crate::error::DriverError;
use crate::kinematics::unicycle_to_drive;
use crate::metrics::{LinkMetrics, MetricsSnapshot};
use crate::pipeline::*;
use crate::state::*;
use kobuki_protocol::{Command, WHEELBASE_MM};
use kobuki_serial::SplittableAdapter;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Extension trait for timeout-capable thread joins
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> bool;
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    /// Returns true when the thread finished cleanly within `timeout`
    fn join_timeout(self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.is_finished() {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
        self.join().is_ok()
    }
}

/// 控制器依赖的底盘接口
///
/// `Kobuki` 是唯一的生产实现；测试中可以用记录命令的替身代替。
pub trait DriveBase: Send + Sync {
    /// 以 (线速度 mm/s, 角速度 rad/s) 驱动
    fn unicycle_drive(&self, linear: f64, angular: f64);

    /// 以原生 (速度, 半径) 驱动
    fn drive(&self, velocity: i16, radius: i16);

    /// 零速
    fn stop(&self) {
        self.drive(0, 0);
    }

    /// 最新 (左, 右) 编码器计数
    fn encoders(&self) -> (u16, u16);
}

/// Kobuki 底盘驱动（对外 API）
pub struct Kobuki {
    /// 命令队列发送端
    commands: CommandSender,
    /// 共享状态上下文
    ctx: Arc<KobukiContext>,
    rx_thread: Option<JoinHandle<()>>,
    tx_thread: Option<JoinHandle<()>>,
    supervisor_thread: Option<JoinHandle<()>>,
    /// 运行标志（用于线程生命周期联动）
    is_running: Arc<AtomicBool>,
    /// 停止请求（由监管线程执行停止流程）
    stop_requested: Arc<AtomicBool>,
    metrics: Arc<LinkMetrics>,
    config: PipelineConfig,
    wheelbase_mm: f64,
    port_name: String,
}

impl Kobuki {
    /// 分离串口并启动 RX / TX / 监管三个线程
    ///
    /// # 参数
    /// - `adapter`: 串口适配器（会被拆分并移动到 IO 线程）
    /// - `config`: Pipeline 配置（可选）
    ///
    /// # 错误
    /// - `DriverError::Serial`: 拆分串口失败
    /// - `DriverError::IoThread`: 线程创建失败
    pub fn new<A>(adapter: A, config: Option<PipelineConfig>) -> Result<Self, DriverError>
    where
        A: SplittableAdapter,
    {
        let config = config.unwrap_or_default();
        let (rx_adapter, tx_adapter) = adapter.split()?;

        let (commands, cmd_rx) = command_queue();
        let ctx = Arc::new(KobukiContext::new(config.connection_timeout()));
        let is_running = Arc::new(AtomicBool::new(true));
        let stop_requested = Arc::new(AtomicBool::new(false));
        let metrics = Arc::new(LinkMetrics::new());

        // 已启动的线程在 is_running 清除或命令通道断开后自行退出
        let spawn_error = {
            let is_running = is_running.clone();
            move |e: std::io::Error| {
                is_running.store(false, Ordering::Release);
                DriverError::IoThread(e.to_string())
            }
        };

        let rx_thread = {
            let ctx = ctx.clone();
            let config = config.clone();
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            thread::Builder::new()
                .name("kobuki-rx".into())
                .spawn(move || rx_loop(rx_adapter, ctx, config, is_running, metrics))
                .map_err(&spawn_error)?
        };

        let tx_thread = {
            let config = config.clone();
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            thread::Builder::new()
                .name("kobuki-tx".into())
                .spawn(move || tx_loop(tx_adapter, cmd_rx, config, is_running, metrics))
                .map_err(&spawn_error)?
        };

        let supervisor_thread = {
            let commands = commands.clone();
            let ctx = ctx.clone();
            let config = config.clone();
            let is_running = is_running.clone();
            let stop_requested = stop_requested.clone();
            thread::Builder::new()
                .name("kobuki-supervisor".into())
                .spawn(move || supervisor_loop(commands, ctx, config, is_running, stop_requested))
                .map_err(&spawn_error)?
        };

        info!("Kobuki driver started");

        Ok(Self {
            commands,
            ctx,
            rx_thread: Some(rx_thread),
            tx_thread: Some(tx_thread),
            supervisor_thread: Some(supervisor_thread),
            is_running,
            stop_requested,
            metrics,
            config,
            wheelbase_mm: WHEELBASE_MM,
            port_name: "unknown".to_string(),
        })
    }

    /// 设置元数据（内部方法，由 Builder 调用）
    pub(crate) fn with_metadata(mut self, port_name: String, wheelbase_mm: f64) -> Self {
        self.port_name = port_name;
        self.wheelbase_mm = wheelbase_mm;
        self
    }

    // ============================================================
    // 执行器
    // ============================================================

    /// 入队任意命令
    ///
    /// # 错误
    /// - `DriverError::ShutDown`: 已请求停止
    /// - `DriverError::ChannelClosed`: 发送线程已退出
    pub fn send_command(&self, command: Command) -> Result<(), DriverError> {
        if self.stop_requested.load(Ordering::Acquire) || !self.is_running.load(Ordering::Acquire)
        {
            return Err(DriverError::ShutDown);
        }
        self.commands.send(command)
    }

    fn send_logged(&self, command: Command) {
        if let Err(e) = self.send_command(command) {
            warn!("Dropping {:?}: {}", command, e);
        }
    }

    /// 以原生 (速度 mm/s, 半径 mm) 驱动（失败只记录日志）
    pub fn drive(&self, velocity: i16, radius: i16) {
        self.send_logged(Command::Drive { velocity, radius });
    }

    /// 以 (线速度 mm/s, 角速度 rad/s) 驱动
    pub fn unicycle_drive(&self, linear: f64, angular: f64) {
        let (velocity, radius) = unicycle_to_drive(linear, angular, self.wheelbase_mm);
        self.drive(velocity, radius);
    }

    /// 设置 LED（标签 0-4，非法标签记录警告后忽略）
    pub fn set_led(&self, id: u8) {
        match Command::set_led(id) {
            Ok(command) => self.send_logged(command),
            Err(e) => warn!("Ignoring LED request: {}", e),
        }
    }

    /// 播放声音序列（标签 0-6，非法标签记录警告后忽略）
    pub fn play_sound(&self, id: u8) {
        match Command::play_sound(id) {
            Ok(command) => self.send_logged(command),
            Err(e) => warn!("Ignoring sound request: {}", e),
        }
    }

    /// 获取可克隆的命令发送端（多生产者场景）
    pub fn command_sender(&self) -> CommandSender {
        self.commands.clone()
    }

    // ============================================================
    // 传感器（可能滞后一个控制周期）
    // ============================================================

    /// 最新传感器快照（无锁）
    pub fn sensors(&self) -> SensorFrame {
        self.ctx.latest()
    }

    /// (左, 右) 编码器计数
    pub fn encoders(&self) -> (u16, u16) {
        let frame = self.ctx.latest();
        (frame.left_encoder, frame.right_encoder)
    }

    pub fn bumper(&self) -> u8 {
        self.ctx.latest().bumper
    }

    pub fn cliff(&self) -> u8 {
        self.ctx.latest().cliff
    }

    pub fn button(&self) -> u8 {
        self.ctx.latest().button
    }

    pub fn battery(&self) -> u8 {
        self.ctx.latest().battery
    }

    /// 等待接收到第一个有效反馈
    ///
    /// # 错误
    /// - `DriverError::Timeout`: 超时未收到反馈
    pub fn wait_for_feedback(&self, timeout: Duration) -> Result<(), DriverError> {
        let start = Instant::now();
        loop {
            if self.ctx.latest().is_valid() {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(DriverError::Timeout);
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    // ============================================================
    // 健康状态
    // ============================================================

    /// 反馈流是否在超时窗口内
    pub fn is_connected(&self) -> bool {
        self.ctx.connection_monitor.check_connection()
    }

    /// 距上一个有效帧的时间
    pub fn connection_age(&self) -> Duration {
        self.ctx.connection_monitor.time_since_last_frame()
    }

    /// (rx_alive, tx_alive, supervisor_alive)
    pub fn check_health(&self) -> (bool, bool, bool) {
        let alive = |h: &Option<JoinHandle<()>>| h.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
        (
            alive(&self.rx_thread),
            alive(&self.tx_thread),
            alive(&self.supervisor_thread),
        )
    }

    pub fn is_healthy(&self) -> bool {
        let (rx, tx, supervisor) = self.check_health();
        rx && tx && supervisor
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn wheelbase_mm(&self) -> f64 {
        self.wheelbase_mm
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // ============================================================
    // 关闭
    // ============================================================

    /// 优雅关闭
    ///
    /// 由监管线程发出最后一条零速命令，等待其发出后取消 RX/TX，
    /// 线程退出时释放串口。重复调用是安全的。
    pub fn shutdown(&mut self) {
        if self.supervisor_thread.is_none() && self.rx_thread.is_none() && self.tx_thread.is_none()
        {
            return;
        }

        debug!("Kobuki shutdown requested on {}", self.port_name);
        self.stop_requested.store(true, Ordering::Release);

        let flush = self.config.update_period() * (self.config.shutdown_flush_periods + 2);
        let join_timeout = flush + Duration::from_secs(2);

        if let Some(handle) = self.supervisor_thread.take()
            && !handle.join_timeout(join_timeout)
        {
            error!(
                "Supervisor thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }

        // 监管线程异常退出时兜底
        self.is_running.store(false, Ordering::Release);

        if let Some(handle) = self.tx_thread.take()
            && !handle.join_timeout(join_timeout)
        {
            error!(
                "TX thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }

        if let Some(handle) = self.rx_thread.take()
            && !handle.join_timeout(join_timeout)
        {
            error!(
                "RX thread panicked or failed to shut down within {:?}",
                join_timeout
            );
        }

        info!("Kobuki driver stopped, serial port released");
    }
}

impl DriveBase for Kobuki {
    fn unicycle_drive(&self, linear: f64, angular: f64) {
        Kobuki::unicycle_drive(self, linear, angular);
    }

    fn drive(&self, velocity: i16, radius: i16) {
        Kobuki::drive(self, velocity, radius);
    }

    fn encoders(&self) -> (u16, u16) {
        Kobuki::encoders(self)
    }
}

impl Drop for Kobuki {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kobuki_protocol::encode_frame;
    use kobuki_serial::MockSerialAdapter;

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

    #[test]
    fn test_drive_and_unicycle_reach_transport() {
        let (adapter, handle) = MockSerialAdapter::new();
        let mut kobuki = Kobuki::new(adapter, None).unwrap();

        kobuki.drive(100, 0);
        kobuki.unicycle_drive(0.0, 1.0);

        assert!(wait_until(Duration::from_secs(2), || handle.sent().len() >= 2));
        let sent = handle.sent();
        assert_eq!(
            sent[0],
            Command::Drive {
                velocity: 100,
                radius: 0
            }
            .encode()
        );
        assert_eq!(
            sent[1],
            Command::Drive {
                velocity: 115,
                radius: 1
            }
            .encode()
        );
        kobuki.shutdown();
    }

    #[test]
    fn test_invalid_led_is_ignored() {
        let (adapter, handle) = MockSerialAdapter::new();
        let mut kobuki = Kobuki::new(adapter, None).unwrap();
        kobuki.set_led(42);
        kobuki.set_led(1);
        assert!(wait_until(Duration::from_secs(2), || !handle.sent().is_empty()));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.sent(), vec![Command::set_led(1).unwrap().encode()]);
        kobuki.shutdown();
    }

    #[test]
    fn test_sensor_getters() {
        let (adapter, handle) = MockSerialAdapter::new();
        let kobuki = Kobuki::new(adapter, None).unwrap();
        assert!(kobuki.wait_for_feedback(Duration::from_millis(20)).is_err());

        let frame = SensorFrame {
            left_encoder: 1234,
            right_encoder: 4321,
            bumper: 1,
            cliff: 2,
            button: 3,
            battery: 150,
            sequence: 0,
        };
        handle.push_inbound(&encode_frame(&frame.to_payload()).unwrap());

        kobuki.wait_for_feedback(Duration::from_secs(2)).unwrap();
        assert_eq!(kobuki.encoders(), (1234, 4321));
        assert_eq!(kobuki.bumper(), 1);
        assert_eq!(kobuki.cliff(), 2);
        assert_eq!(kobuki.button(), 3);
        assert_eq!(kobuki.battery(), 150);
        assert!(kobuki.is_connected());
        assert_eq!(kobuki.metrics().rx_frames_valid, 1);
    }

    #[test]
    fn test_shutdown_sends_final_stop_and_rejects_commands() {
        let (adapter, handle) = MockSerialAdapter::new();
        let mut kobuki = Kobuki::new(adapter, None).unwrap();
        kobuki.drive(200, 0);
        assert!(kobuki.is_healthy());

        kobuki.shutdown();

        let sent = handle.sent();
        assert_eq!(sent.last(), Some(&Command::STOP.encode()));
        assert!(!kobuki.is_running());
        assert_eq!(kobuki.check_health(), (false, false, false));
        assert!(matches!(
            kobuki.send_command(Command::STOP),
            Err(DriverError::ShutDown)
        ));

        // 第二次调用无副作用
        kobuki.shutdown();
        assert_eq!(handle.sent().len(), sent.len());
    }

    #[test]
    fn test_fatal_transport_error_stops_threads() {
        let (adapter, handle) = MockSerialAdapter::new();
        let kobuki = Kobuki::new(adapter, None).unwrap();
        handle.close();
        assert!(wait_until(Duration::from_secs(2), || !kobuki.is_running()));
        // 关闭后执行器调用只记录日志
        kobuki.drive(1, 0);
    }
}
