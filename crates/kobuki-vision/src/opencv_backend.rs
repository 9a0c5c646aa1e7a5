//! OpenCV 后端
//!
//! 相机帧按 RGB 解释转换到 HSV，与默认颜色区间的标定方式一致。

use opencv::{
    core::{self, Mat, Scalar, Size, Vector},
    imgproc,
    prelude::*,
    videoio::{CAP_ANY, VideoCapture},
};
use tracing::{info, warn};

use crate::backend::{FrameSource, VisionBackend};
use crate::error::VisionError;
use crate::raster::DEFAULT_KERNEL_SIZE;
use crate::types::{ColorRange, Contour, Point};

/// OpenCV 视觉后端
pub struct OpenCvBackend {
    kernel: Mat,
}

impl OpenCvBackend {
    /// # 错误
    /// 结构元素创建失败时返回 `VisionError::Backend`
    pub fn new() -> Result<Self, VisionError> {
        Self::with_kernel_size(DEFAULT_KERNEL_SIZE as i32)
    }

    pub fn with_kernel_size(size: i32) -> Result<Self, VisionError> {
        let kernel = imgproc::get_structuring_element_def(imgproc::MORPH_RECT, Size::new(size, size))?;
        Ok(Self { kernel })
    }

    fn to_hsv(frame: &Mat) -> Result<Mat, VisionError> {
        if frame.empty() {
            return Err(VisionError::EmptyFrame);
        }
        let mut hsv = Mat::default();
        imgproc::cvt_color_def(frame, &mut hsv, imgproc::COLOR_RGB2HSV)?;
        Ok(hsv)
    }
}

impl VisionBackend for OpenCvBackend {
    type Frame = Mat;

    fn segment(&mut self, frame: &Mat, range: &ColorRange) -> Result<Vec<Contour>, VisionError> {
        let hsv = Self::to_hsv(frame)?;

        let lower = Scalar::new(range.min[0], range.min[1], range.min[2], 0.0);
        let upper = Scalar::new(range.max[0], range.max[1], range.max[2], 0.0);
        let mut mask = Mat::default();
        core::in_range(&hsv, &lower, &upper, &mut mask)?;

        let mut closed = Mat::default();
        imgproc::morphology_ex_def(&mask, &mut closed, imgproc::MORPH_CLOSE, &self.kernel)?;
        let mut opened = Mat::default();
        imgproc::morphology_ex_def(&closed, &mut opened, imgproc::MORPH_OPEN, &self.kernel)?;

        let mut contours = Vector::<Vector<core::Point>>::new();
        imgproc::find_contours_def(
            &opened,
            &mut contours,
            imgproc::RETR_TREE,
            imgproc::CHAIN_APPROX_SIMPLE,
        )?;

        Ok(contours
            .iter()
            .map(|c| {
                c.iter()
                    .map(|p| Point::new(f64::from(p.x), f64::from(p.y)))
                    .collect()
            })
            .collect())
    }

    fn channel_means(&mut self, frame: &Mat) -> Result<[f64; 3], VisionError> {
        let hsv = Self::to_hsv(frame)?;
        let mean = core::mean_def(&hsv)?;
        Ok([mean[0], mean[1], mean[2]])
    }
}

/// OpenCV 相机
pub struct OpenCvCamera {
    capture: VideoCapture,
    index: i32,
}

impl OpenCvCamera {
    /// 打开相机
    ///
    /// # 错误
    /// 设备不存在或无法打开时返回 `VisionError::Source`
    pub fn open(index: i32) -> Result<Self, VisionError> {
        let capture = VideoCapture::new(index, CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(VisionError::Source(format!("camera {} not available", index)));
        }
        info!("Camera {} opened", index);
        Ok(Self { capture, index })
    }
}

impl FrameSource for OpenCvCamera {
    type Frame = Mat;

    fn read_frame(&mut self) -> Result<Option<Mat>, VisionError> {
        let mut frame = Mat::default();
        if self.capture.read(&mut frame)? && !frame.empty() {
            Ok(Some(frame))
        } else {
            Ok(None)
        }
    }

    fn release(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!("Failed to release camera {}: {}", self.index, e);
        }
    }
}
