//! 视觉层错误类型定义

use thiserror::Error;

/// 视觉层错误类型
///
/// 视觉线程内部的错误一律降级为"本帧未检测到目标"，不会中断采样循环。
#[derive(Error, Debug)]
pub enum VisionError {
    /// 视觉后端（颜色转换、形态学、轮廓提取）失败
    #[error("Vision backend error: {0}")]
    Backend(String),

    /// 相机打开或读取失败
    #[error("Frame source error: {0}")]
    Source(String),

    /// 空帧
    #[error("Empty frame")]
    EmptyFrame,

    /// 相机服务已停止
    #[error("Camera service stopped")]
    Stopped,

    /// 线程创建等 IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(feature = "opencv")]
impl From<opencv::Error> for VisionError {
    fn from(e: opencv::Error) -> Self {
        VisionError::Backend(e.to_string())
    }
}
