//! 传感器监控

use anyhow::Result;
use clap::Args;
use kobuki_sdk::{Kobuki, Session};
use std::thread;
use std::time::Duration;

use super::Interrupt;

/// 监控参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 更新频率（Hz）
    #[arg(short, long, default_value_t = 10)]
    pub frequency: u32,
}

impl MonitorCommand {
    pub fn execute(&self, session: &Session<Kobuki>, interrupt: &Interrupt) -> Result<()> {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.frequency.clamp(1, 100)));
        println!("📡 监控中（Ctrl+C 退出）");

        while !interrupt.triggered() {
            let frame = session.sensors();
            let link = if session.is_connected() { "ok" } else { "--" };
            println!(
                "[{}] enc=({:5},{:5}) bumper={} cliff={} button={} battery={}",
                link,
                frame.left_encoder,
                frame.right_encoder,
                frame.bumper,
                frame.cliff,
                frame.button,
                frame.battery
            );
            thread::sleep(period);
        }

        let metrics = session.metrics();
        println!(
            "\n帧: {} 有效 / {} 无效，命令: {} 已发送",
            metrics.rx_frames_valid, metrics.rx_frames_invalid, metrics.tx_commands_total
        );
        Ok(())
    }
}
