//! 命令队列
//!
//! 单一无界 FIFO：任意线程都可以入队，发送线程阻塞出队并按入队顺序写出。
//! 队列不合并也不丢弃命令；积压时过期的驱动命令仍会依次发出。

use crate::error::DriverError;
use crossbeam_channel::{Receiver, Sender};
use kobuki_protocol::Command;

/// 命令发送端（可克隆，供多个生产者共享）
#[derive(Debug, Clone)]
pub struct CommandSender {
    tx: Sender<Command>,
}

impl CommandSender {
    /// 入队一条命令（不阻塞）
    ///
    /// # 错误
    /// - `DriverError::ChannelClosed`: 发送线程已退出
    pub fn send(&self, command: Command) -> Result<(), DriverError> {
        self.tx.send(command).map_err(|_| DriverError::ChannelClosed)
    }

    /// 队列中尚未发出的命令数
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}

/// 创建命令队列
pub fn command_queue() -> (CommandSender, Receiver<Command>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (CommandSender { tx }, rx)
}
