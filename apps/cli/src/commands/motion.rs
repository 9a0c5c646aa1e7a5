//! 运动命令：持续行驶、定距行驶、定时旋转、自主行为
//!
//! 每个命令启动后阻塞等待：行为自行结束、达到时限或按下 Ctrl+C。

use anyhow::Result;
use clap::Args;
use kobuki_sdk::{ControllerStatus, Kobuki, Session};
use std::thread;
use std::time::{Duration, Instant};

use super::Interrupt;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 持续行驶参数
#[derive(Args, Debug)]
pub struct DriveCommand {
    /// 速度（mm/s）
    #[arg(allow_negative_numbers = true)]
    pub velocity: i16,

    /// 转弯半径（mm），0 为直行
    #[arg(short, long, default_value_t = 0, allow_negative_numbers = true)]
    pub radius: i16,

    /// 行驶时长（秒），缺省时直到 Ctrl+C
    #[arg(short, long)]
    pub seconds: Option<f64>,
}

impl DriveCommand {
    pub fn execute(&self, session: &Session<Kobuki>, interrupt: &Interrupt) -> Result<()> {
        println!("🚗 行驶 {} mm/s，半径 {} mm", self.velocity, self.radius);
        session.drive(self.velocity, self.radius)?;
        let limit = self
            .seconds
            .filter(|s| s.is_finite() && *s > 0.0)
            .map(Duration::from_secs_f64);
        report(wait_for_motion(session, interrupt, limit, false));
        Ok(())
    }
}

/// 定距行驶参数
#[derive(Args, Debug)]
pub struct DistanceCommand {
    /// 距离（米）
    pub meters: f64,

    /// 速度（mm/s），负值后退
    #[arg(short, long, default_value_t = 150, allow_negative_numbers = true)]
    pub velocity: i16,
}

impl DistanceCommand {
    pub fn execute(&self, session: &Session<Kobuki>, interrupt: &Interrupt) -> Result<()> {
        println!("📏 行驶 {:.3} m（{} mm/s）", self.meters, self.velocity);
        session.move_distance(self.velocity, 0, self.meters)?;
        report(wait_for_motion(session, interrupt, None, false));
        Ok(())
    }
}

/// 定时旋转参数
#[derive(Args, Debug)]
pub struct RotateCommand {
    /// 角速度（rad/s），正值逆时针
    #[arg(allow_negative_numbers = true)]
    pub angular: f64,

    /// 时长（毫秒）
    #[arg(short = 't', long, default_value_t = 1000)]
    pub duration_ms: u64,
}

impl RotateCommand {
    pub fn execute(&self, session: &Session<Kobuki>, interrupt: &Interrupt) -> Result<()> {
        println!("🔄 旋转 {} rad/s，{} ms", self.angular, self.duration_ms);
        session.rotate(self.angular, self.duration_ms)?;
        report(wait_for_motion(session, interrupt, None, false));
        Ok(())
    }
}

/// 自主行为参数
#[derive(Args, Debug)]
pub struct TaskCommand {
    /// 行为编号：1 靠近并保持，2 搜索重获
    pub id: u8,
}

impl TaskCommand {
    pub fn execute(&self, session: &Session<Kobuki>, interrupt: &Interrupt) -> Result<()> {
        super::camera::attach(session)?;
        println!("🎯 启动任务 {}", self.id);
        session.start_task(self.id)?;
        report(wait_for_motion(session, interrupt, None, true));
        Ok(())
    }
}

/// 等待当前行为结束
///
/// Ctrl+C 或超过 `limit` 时主动停止。`verbose` 为真时周期打印目标观测。
pub fn wait_for_motion(
    session: &Session<Kobuki>,
    interrupt: &Interrupt,
    limit: Option<Duration>,
    verbose: bool,
) -> ControllerStatus {
    let start = Instant::now();
    let mut last_print = Instant::now();

    while session.is_moving() {
        if interrupt.triggered() {
            println!("\n🛑 收到 Ctrl+C，停止");
            session.stop();
            break;
        }
        if limit.is_some_and(|limit| start.elapsed() >= limit) {
            session.stop();
            break;
        }
        if verbose && last_print.elapsed() >= Duration::from_secs(1) {
            let observation = session.observation();
            println!(
                "  visible={} distance={:.3} m",
                observation.visible, observation.distance
            );
            last_print = Instant::now();
        }
        thread::sleep(POLL_INTERVAL);
    }

    session.status()
}

fn report(status: ControllerStatus) {
    match status {
        ControllerStatus::Completed(name) => println!("✅ {} 完成", name),
        ControllerStatus::TargetLost => println!("⚠️  目标丢失，搜索结束"),
        ControllerStatus::Idle => println!("✅ 已停止"),
        ControllerStatus::Running(name) => println!("… {} 仍在运行", name),
    }
}
