//! CLI 命令实现

pub mod camera;
pub mod config;
pub mod monitor;
pub mod motion;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub use config::ConfigCommand;
pub use monitor::MonitorCommand;
pub use motion::{DistanceCommand, DriveCommand, RotateCommand, TaskCommand};

/// Ctrl+C 标志
#[derive(Clone)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// 安装 Ctrl+C 处理器
    pub fn install() -> Result<Self> {
        let flag = Arc::new(AtomicBool::new(false));
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            handler_flag.store(true, Ordering::SeqCst);
        })
        .context("安装 Ctrl+C 处理器失败")?;
        Ok(Self(flag))
    }

    pub fn triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
