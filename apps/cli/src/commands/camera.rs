//! 相机接入与颜色标定
//!
//! 相机后端需要 `opencv` feature；未启用时任务照常运行，但看不到目标。

use anyhow::Result;
use kobuki_sdk::{Kobuki, Session};
use std::thread;
use std::time::Duration;

use super::Interrupt;

/// 按配置打开相机并接入会话（预览模式）
///
/// 返回是否成功接入。
#[cfg(feature = "opencv")]
pub fn attach(session: &Session<Kobuki>) -> Result<bool> {
    use kobuki_sdk::vision::{OpenCvBackend, OpenCvCamera};

    let camera = OpenCvCamera::open(session.config().camera.device_index)?;
    let backend = OpenCvBackend::new()?;
    session.start_camera(camera, backend, None)?;
    println!("📷 相机 {} 已打开", session.config().camera.device_index);
    Ok(true)
}

#[cfg(not(feature = "opencv"))]
pub fn attach(_session: &Session<Kobuki>) -> Result<bool> {
    tracing::warn!("Built without the opencv feature, no camera attached");
    Ok(false)
}

/// 采样颜色均值并打印，用于手动调整阈值
pub fn calibrate(session: &Session<Kobuki>, interrupt: &Interrupt) -> Result<()> {
    if !attach(session)? {
        anyhow::bail!("标定需要相机（使用 --features opencv 构建）");
    }

    let frames = session.config().camera.calibration.frames;
    println!("🎨 标定中（{} 帧）...", frames);
    session.calibrate()?;

    loop {
        if interrupt.triggered() {
            session.stop_calibration()?;
            println!("\n🛑 标定已取消");
            return Ok(());
        }
        if let Some(result) = session.last_calibration() {
            let [h, s, v] = result.means;
            println!("✅ 平均值（{} 帧）: {:.1},{:.1},{:.1}", result.frames, h, s, v);
            return Ok(());
        }
        thread::sleep(Duration::from_millis(50));
    }
}
