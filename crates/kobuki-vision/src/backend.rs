//! 视觉原语能力接口
//!
//! 估计器只依赖这里的 trait，具体的颜色空间转换、形态学和轮廓提取由后端提供：
//! - [`crate::raster::RasterBackend`]: 纯 Rust 实现，无系统依赖
//! - `OpenCvBackend`: OpenCV 实现（`opencv` feature）

use crate::error::VisionError;
use crate::geometry;
use crate::types::{ColorRange, Contour, Point, TargetObservation};

/// 视觉后端
///
/// `segment` 完成"颜色空间转换 → 阈值 → 闭运算 → 开运算 → 轮廓提取"整条流水线；
/// 几何原语默认使用 [`crate::geometry`] 的实现，后端可以覆盖为原生版本。
pub trait VisionBackend {
    /// 帧类型
    type Frame;

    /// 分割出落在颜色区间内的区域轮廓
    ///
    /// # 错误
    /// 后端内部失败时返回 `VisionError::Backend`，调用方按"本帧未命中"处理
    fn segment(
        &mut self,
        frame: &Self::Frame,
        range: &ColorRange,
    ) -> Result<Vec<Contour>, VisionError>;

    /// 整帧在标定颜色空间下的三通道均值
    fn channel_means(&mut self, frame: &Self::Frame) -> Result<[f64; 3], VisionError>;

    fn contour_area(&self, contour: &[Point]) -> f64 {
        geometry::contour_area(contour)
    }

    fn arc_length(&self, contour: &[Point]) -> f64 {
        geometry::arc_length(contour, true)
    }

    fn approx_polygon(&self, contour: &[Point], epsilon: f64) -> Vec<Point> {
        geometry::approx_polygon(contour, epsilon)
    }

    fn is_convex(&self, polygon: &[Point]) -> bool {
        geometry::is_convex(polygon)
    }
}

/// 帧来源（相机）
pub trait FrameSource: Send {
    type Frame;

    /// 读取下一帧；没有新帧时返回 `Ok(None)`
    fn read_frame(&mut self) -> Result<Option<Self::Frame>, VisionError>;

    /// 释放设备
    fn release(&mut self) {}
}

/// 帧输出（预览窗口等）
///
/// 相机线程每采到一帧调用一次，停止时调用 [`FrameSink::clear`]。
pub trait FrameSink<F>: Send {
    fn show(&mut self, frame: &F, observation: &TargetObservation);

    fn clear(&mut self) {}
}
