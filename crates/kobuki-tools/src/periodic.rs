//! 固定频率周期任务
//!
//! 每个任务独占一个线程，按固定周期调用 tick 闭包。
//!
//! # 取消语义
//!
//! - 取消标志在每次 tick 之前检查
//! - 正在执行的 tick 总会完成，取消不会打断它
//! - 周期等待期间收到取消会被立即唤醒（`park_timeout` + `unpark`）
//! - [`PeriodicTask::cancel`] 返回时线程已经退出，之后不会再有 tick

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// tick 闭包的返回值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// 继续下一个周期
    Continue,
    /// 任务自行结束（如到达目标距离）
    Stop,
}

/// 周期任务句柄
///
/// Drop 时自动取消并等待线程退出。
pub struct PeriodicTask {
    name: String,
    cancel: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// 启动周期任务
    ///
    /// # 参数
    /// - `name`: 线程名（用于日志）
    /// - `period`: 调用周期
    /// - `tick`: 每周期调用一次，参数为从 0 开始的周期序号
    ///
    /// 首次 tick 立即执行。某次 tick 超时后，下一次从当前时刻重新计时，不补发。
    ///
    /// # 错误
    /// 线程创建失败时返回 IO 错误
    pub fn spawn<F>(name: impl Into<String>, period: Duration, mut tick: F) -> std::io::Result<Self>
    where
        F: FnMut(u64) -> TickControl + Send + 'static,
    {
        let name = name.into();
        let cancel = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));

        let cancel_clone = cancel.clone();
        let finished_clone = finished.clone();
        let thread_name = name.clone();

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            let mut count: u64 = 0;
            let mut next_deadline = Instant::now();

            loop {
                // Acquire: 看到 true 时必须同时看到取消方之前的全部写入
                if cancel_clone.load(Ordering::Acquire) {
                    trace!("{}: cancelled before tick {}", thread_name, count);
                    break;
                }

                if tick(count) == TickControl::Stop {
                    trace!("{}: finished itself at tick {}", thread_name, count);
                    break;
                }
                count += 1;

                next_deadline += period;
                let now = Instant::now();
                if next_deadline <= now {
                    next_deadline = now;
                    continue;
                }

                while !cancel_clone.load(Ordering::Acquire) {
                    let now = Instant::now();
                    if now >= next_deadline {
                        break;
                    }
                    thread::park_timeout(next_deadline - now);
                }
            }

            finished_clone.store(true, Ordering::Release);
        })?;

        Ok(Self {
            name,
            cancel,
            finished,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 任务线程是否已退出（自行结束或被取消）
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// 取消任务并等待线程退出
    ///
    /// 重复调用是安全的。
    pub fn cancel(&mut self) {
        // Release: 取消之前的写入对任务线程可见
        self.cancel.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.thread().id() == thread::current().id() {
                // 在任务自身的 tick 中取消：不能 join 自己，线程会在 tick 返回后退出
                return;
            }
            if handle.join().is_err() {
                warn!("{}: task thread panicked", self.name);
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
