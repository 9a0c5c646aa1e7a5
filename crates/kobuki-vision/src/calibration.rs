//! 环境颜色标定
//!
//! 连续采样若干帧的三通道均值并取平均，结果仅用于人工调整阈值，
//! 不会自动写回估计器的颜色区间。

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::VisionBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// 采样帧数
    pub frames: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { frames: 50 }
    }
}

/// 标定结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationResult {
    /// 三通道均值（标定颜色空间）
    pub means: [f64; 3],
    /// 实际参与平均的帧数
    pub frames: u32,
}

/// 标定采样器
#[derive(Debug, Clone)]
pub struct Calibration {
    config: CalibrationConfig,
    sums: [f64; 3],
    sampled: u32,
}

impl Calibration {
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            sums: [0.0; 3],
            sampled: 0,
        }
    }

    /// 采样一帧；采满后返回结果并清零，可以开始下一轮
    ///
    /// 后端失败的帧不计入。
    pub fn sample<B: VisionBackend>(
        &mut self,
        backend: &mut B,
        frame: &B::Frame,
    ) -> Option<CalibrationResult> {
        match backend.channel_means(frame) {
            Ok(means) => {
                for (sum, mean) in self.sums.iter_mut().zip(means) {
                    *sum += mean;
                }
                self.sampled += 1;
            },
            Err(e) => {
                warn!("Calibration frame skipped: {}", e);
                return None;
            },
        }

        if self.sampled < self.config.frames.max(1) {
            return None;
        }

        let frames = self.sampled;
        let means = self.sums.map(|s| s / f64::from(frames));
        info!(
            "Calibration complete over {} frames: average color [{:.1}, {:.1}, {:.1}]",
            frames, means[0], means[1], means[2]
        );
        self.reset();
        Some(CalibrationResult { means, frames })
    }

    pub fn sampled(&self) -> u32 {
        self.sampled
    }

    pub fn reset(&mut self) {
        self.sums = [0.0; 3];
        self.sampled = 0;
    }
}
