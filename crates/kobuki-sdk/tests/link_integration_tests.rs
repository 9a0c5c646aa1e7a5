//! 串口链路集成测试（Mock 传输）
//!
//! 覆盖命令顺序、传感器帧更新、损坏帧的重同步与关闭时的零速命令。

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kobuki_sdk::protocol::encode_frame;
use kobuki_sdk::serial::MockSerialAdapter;
use kobuki_sdk::{Command, Kobuki, SensorFrame};

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

fn sensor_bytes(left: u16, right: u16) -> Vec<u8> {
    let frame = SensorFrame {
        left_encoder: left,
        right_encoder: right,
        battery: 160,
        ..Default::default()
    };
    encode_frame(&frame.to_payload()).unwrap()
}

#[test]
fn test_commands_sent_in_fifo_order() {
    let (adapter, handle) = MockSerialAdapter::new();
    let mut kobuki = Kobuki::new(adapter, None).unwrap();

    let a = Command::Drive {
        velocity: 100,
        radius: 0,
    };
    let b = Command::set_led(1).unwrap();
    let c = Command::play_sound(2).unwrap();
    for command in [a, b, c] {
        kobuki.send_command(command).unwrap();
    }

    assert!(wait_until(Duration::from_secs(2), || handle.sent().len() >= 3));
    assert_eq!(handle.sent()[..3], [a.encode(), b.encode(), c.encode()]);
    kobuki.shutdown();
}

#[test]
fn test_concurrent_producers_keep_per_producer_order() {
    const PRODUCERS: i16 = 4;
    const PER_PRODUCER: i16 = 50;

    let (adapter, handle) = MockSerialAdapter::new();
    let kobuki = Arc::new(Kobuki::new(adapter, None).unwrap());

    let workers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let kobuki = kobuki.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    kobuki.drive(producer * 1000 + i, producer);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let total = (PRODUCERS * PER_PRODUCER) as usize;
    assert!(wait_until(Duration::from_secs(3), || handle.sent().len() >= total));

    let sent = handle.sent();
    assert_eq!(sent.len(), total);
    for producer in 0..PRODUCERS {
        let expected: Vec<Vec<u8>> = (0..PER_PRODUCER)
            .map(|i| {
                Command::Drive {
                    velocity: producer * 1000 + i,
                    radius: producer,
                }
                .encode()
            })
            .collect();
        let observed: Vec<Vec<u8>> = sent
            .iter()
            .filter(|bytes| expected.contains(bytes))
            .cloned()
            .collect();
        assert_eq!(observed, expected, "producer {} reordered", producer);
    }
}

#[test]
fn test_receiver_tracks_latest_frame_across_chunks() {
    let (adapter, handle) = MockSerialAdapter::new();
    let kobuki = Kobuki::new(adapter, None).unwrap();

    // 两帧拆成任意边界推入
    let mut stream = sensor_bytes(10, 20);
    stream.extend(sensor_bytes(65535, 3));
    for chunk in stream.chunks(5) {
        handle.push_inbound(chunk);
    }

    assert!(wait_until(Duration::from_secs(2), || kobuki.encoders() == (65535, 3)));
    assert_eq!(kobuki.battery(), 160);
    assert_eq!(kobuki.metrics().rx_frames_valid, 2);
}

#[test]
fn test_corrupted_frame_is_dropped_and_stream_resyncs() {
    let (adapter, handle) = MockSerialAdapter::new();
    let kobuki = Kobuki::new(adapter, None).unwrap();

    let mut corrupted = sensor_bytes(111, 222);
    let last = corrupted.len() - 1;
    corrupted[last] ^= 0x01;
    handle.push_inbound(&corrupted);
    handle.push_inbound(&[0x00, 0xAA, 0x13]);
    handle.push_inbound(&sensor_bytes(333, 444));

    assert!(wait_until(Duration::from_secs(2), || kobuki.encoders() == (333, 444)));
    let metrics = kobuki.metrics();
    assert_eq!(metrics.rx_frames_valid, 1);
    assert!(metrics.rx_frames_invalid >= 1);
}

#[test]
fn test_shutdown_flushes_zero_drive_last() {
    let (adapter, handle) = MockSerialAdapter::new();
    let mut kobuki = Kobuki::new(adapter, None).unwrap();
    kobuki.drive(250, 0);
    kobuki.drive(250, 0);

    kobuki.shutdown();

    let sent = handle.sent();
    assert!(sent.len() >= 3);
    assert_eq!(sent.last(), Some(&Command::STOP.encode()));
    assert!(!kobuki.is_running());
}
