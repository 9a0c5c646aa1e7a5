//! 视觉层基础类型

use kobuki_tools::parse_color_triplet;
use serde::{Deserialize, Serialize};

/// 图像坐标点（像素）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 闭合轮廓（按顺序排列的边界点）
pub type Contour = Vec<Point>;

/// 三通道颜色阈值区间（HSV，OpenCV 取值范围：H 0-180，S/V 0-255）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRange {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for ColorRange {
    /// 绿色标定板的默认区间
    fn default() -> Self {
        Self {
            min: [30.0, 60.0, 85.0],
            max: [50.0, 200.0, 255.0],
        }
    }
}

impl ColorRange {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// 由界面文本构建（如 `"30,60,85"`），非法输入回退为全零
    pub fn from_text(min: &str, max: &str) -> Self {
        Self {
            min: parse_color_triplet(min),
            max: parse_color_triplet(max),
        }
    }

    /// 像素是否落在区间内（含边界）
    pub fn contains(&self, pixel: [f64; 3]) -> bool {
        (0..3).all(|i| pixel[i] >= self.min[i] && pixel[i] <= self.max[i])
    }
}

/// 目标观测
///
/// 由视觉线程单独写入，控制器轮询读取。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetObservation {
    /// 去抖后的可见性
    pub visible: bool,
    /// 当前帧的原始检测结果（用于"刚刚丢失"之类的边沿判断）
    pub visible_this_frame: bool,
    /// 最近一次检测到目标时的距离估计（米）；从未检测到时为 [`Self::NO_DISTANCE`]
    pub distance: f64,
}

impl TargetObservation {
    /// 初始距离哨兵值
    pub const NO_DISTANCE: f64 = -1.0;

    pub fn has_distance(&self) -> bool {
        self.distance >= 0.0
    }
}

impl Default for TargetObservation {
    fn default() -> Self {
        Self {
            visible: false,
            visible_this_frame: false,
            distance: Self::NO_DISTANCE,
        }
    }
}
