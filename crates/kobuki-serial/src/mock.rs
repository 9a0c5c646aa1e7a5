//! Mock 串口（测试用，无硬件依赖）
//!
//! [`MockSerialAdapter`] 是交给驱动层的一端，[`MockSerialHandle`] 留在测试代码中，
//! 用于注入入站字节和检查已写出的帧。两者共享同一份状态。

use crate::{RxAdapter, SerialAdapter, SerialError, SplittableAdapter, TxAdapter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// 无数据时单次读取模拟的阻塞时长
const MOCK_READ_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Default)]
struct MockState {
    inbound: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
    closed: bool,
    fail_writes: usize,
}

/// 测试侧句柄
#[derive(Clone)]
pub struct MockSerialHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockSerialHandle {
    /// 注入入站字节（接收线程将读到）
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.state.lock().inbound.extend(bytes.iter().copied());
    }

    /// 已写出的全部数据块（每次 `send` 一块）
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().sent.clone()
    }

    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.state.lock().sent)
    }

    pub fn pending_inbound(&self) -> usize {
        self.state.lock().inbound.len()
    }

    /// 模拟拔线：之后的读写返回 `SerialError::Closed`
    pub fn close(&self) {
        self.state.lock().closed = true;
    }

    /// 让接下来的 `count` 次写入返回可恢复的 IO 错误
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().fail_writes = count;
    }
}

/// 驱动侧 Mock 适配器
pub struct MockSerialAdapter {
    state: Arc<Mutex<MockState>>,
}

impl MockSerialAdapter {
    pub fn new() -> (Self, MockSerialHandle) {
        let state = Arc::new(Mutex::new(MockState::default()));
        (
            Self {
                state: state.clone(),
            },
            MockSerialHandle { state },
        )
    }
}

fn mock_send(state: &Mutex<MockState>, bytes: &[u8]) -> Result<(), SerialError> {
    let mut state = state.lock();
    if state.closed {
        return Err(SerialError::Closed);
    }
    if state.fail_writes > 0 {
        state.fail_writes -= 1;
        return Err(SerialError::Io(std::io::Error::other("injected write failure")));
    }
    state.sent.push(bytes.to_vec());
    Ok(())
}

fn mock_receive(state: &Mutex<MockState>, buf: &mut [u8]) -> Result<usize, SerialError> {
    {
        let mut state = state.lock();
        if state.closed {
            return Err(SerialError::Closed);
        }
        if !state.inbound.is_empty() {
            let n = buf.len().min(state.inbound.len());
            for (slot, byte) in buf.iter_mut().zip(state.inbound.drain(..n)) {
                *slot = byte;
            }
            return Ok(n);
        }
    }
    std::thread::sleep(MOCK_READ_TIMEOUT);
    Err(SerialError::Timeout)
}

impl SerialAdapter for MockSerialAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        mock_send(&self.state, bytes)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        mock_receive(&self.state, buf)
    }
}

pub struct MockRxAdapter {
    state: Arc<Mutex<MockState>>,
}

impl RxAdapter for MockRxAdapter {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        mock_receive(&self.state, buf)
    }
}

pub struct MockTxAdapter {
    state: Arc<Mutex<MockState>>,
}

impl TxAdapter for MockTxAdapter {
    fn send(&mut self, bytes: &[u8]) -> Result<(), SerialError> {
        mock_send(&self.state, bytes)
    }
}

impl SplittableAdapter for MockSerialAdapter {
    type RxAdapter = MockRxAdapter;
    type TxAdapter = MockTxAdapter;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), SerialError> {
        Ok((
            MockRxAdapter {
                state: self.state.clone(),
            },
            MockTxAdapter { state: self.state },
        ))
    }
}
