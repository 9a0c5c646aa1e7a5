//! # Kobuki Vision
//!
//! 在颜色分割后的画面中寻找已标定颜色的方形目标，输出可见性与距离估计。
//!
//! ## 模块
//!
//! - `backend`: 视觉原语能力接口（颜色空间转换、阈值、形态学、轮廓提取）
//! - `geometry`: 轮廓几何（面积、周长、多边形逼近、凸性）的纯 Rust 实现
//! - `raster`: 纯 Rust 视觉后端（内存图像）
//! - `estimator`: 候选筛选、距离模型、可见性迟滞
//! - `calibration`: 环境颜色统计采样
//! - `feed`: 目标观测的单写者发布
//! - `camera`: 固定频率的相机采样线程
//! - `opencv_backend`: OpenCV 实现（`opencv` feature）

pub mod backend;
pub mod calibration;
pub mod camera;
mod error;
pub mod estimator;
pub mod feed;
pub mod geometry;
#[cfg(feature = "opencv")]
pub mod opencv_backend;
pub mod raster;
mod types;

pub use backend::{FrameSink, FrameSource, VisionBackend};
pub use calibration::{Calibration, CalibrationConfig, CalibrationResult};
pub use camera::{CameraConfig, CameraMode, CameraService};
pub use error::VisionError;
pub use estimator::{
    DetectedTarget, DistanceModel, RangeEstimator, RangeEstimatorConfig, VisibilityTracker,
};
pub use feed::{TargetFeed, TargetSource};
pub use raster::{RasterBackend, RasterImage};
pub use types::{ColorRange, Contour, Point, TargetObservation};

#[cfg(feature = "opencv")]
pub use opencv_backend::{OpenCvBackend, OpenCvCamera};
