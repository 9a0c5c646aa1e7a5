//! 纯 Rust 视觉后端
//!
//! 在内存中的 8 位三通道图像上完成颜色分割与外轮廓提取。
//! 只提取每个连通区域的外边界（Moore 邻域跟踪），不输出孔洞轮廓。

use std::collections::VecDeque;

use crate::backend::VisionBackend;
use crate::error::VisionError;
use crate::types::{ColorRange, Contour, Point};

/// 顺时针 8 邻域（图像坐标，y 向下）
const NEIGHBORS: [(i64, i64); 8] = [
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

/// 默认形态学核边长
pub const DEFAULT_KERNEL_SIZE: usize = 15;

/// 8 位三通道图像（采集顺序，按 RGB 解释）
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    pixels: Vec<[u8; 3]>,
}

impl RasterImage {
    /// # 错误
    /// 像素数与尺寸不符时返回 `VisionError::Source`
    pub fn new(width: usize, height: usize, pixels: Vec<[u8; 3]>) -> Result<Self, VisionError> {
        if pixels.len() != width * height {
            return Err(VisionError::Source(format!(
                "expected {} pixels for {}x{}, got {}",
                width * height,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// 纯色图像
    pub fn filled(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        Self {
            width,
            height,
            pixels: vec![rgb; width * height],
        }
    }

    /// 填充矩形（超出边界的部分被裁剪）
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, rgb: [u8; 3]) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.pixels[row * self.width + col] = rgb;
            }
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 3]> {
        (x < self.width && y < self.height).then(|| self.pixels[y * self.width + x])
    }
}

/// RGB → HSV（OpenCV 8 位约定：H ∈ [0, 180)，S、V ∈ [0, 255]）
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [f64; 3] {
    let [r, g, b] = rgb.map(f64::from);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = v - min;

    let s = if v > 0.0 { delta / v * 255.0 } else { 0.0 };
    let mut h = if delta == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / delta
    } else if v == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    if h < 0.0 {
        h += 360.0;
    }
    [(h / 2.0).round(), s.round(), v]
}

/// 二值掩码
#[derive(Debug, Clone, PartialEq)]
struct Mask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl Mask {
    fn get(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && self.bits[y as usize * self.width + x as usize]
    }

    /// 矩形核膨胀/腐蚀（行列可分离）；越界像素不参与
    fn morph(&self, radius: usize, dilate: bool) -> Mask {
        let pass = |src: &[bool], horizontal: bool| -> Vec<bool> {
            let mut out = vec![false; src.len()];
            for y in 0..self.height {
                for x in 0..self.width {
                    let (pos, len) = if horizontal { (x, self.width) } else { (y, self.height) };
                    let lo = pos.saturating_sub(radius);
                    let hi = (pos + radius).min(len - 1);
                    let mut window = (lo..=hi).map(|p| {
                        if horizontal {
                            src[y * self.width + p]
                        } else {
                            src[p * self.width + x]
                        }
                    });
                    out[y * self.width + x] = if dilate {
                        window.any(|b| b)
                    } else {
                        window.all(|b| b)
                    };
                }
            }
            out
        };
        let rows = pass(&self.bits, true);
        Mask {
            width: self.width,
            height: self.height,
            bits: pass(&rows, false),
        }
    }

    fn close(&self, radius: usize) -> Mask {
        self.morph(radius, true).morph(radius, false)
    }

    fn open(&self, radius: usize) -> Mask {
        self.morph(radius, false).morph(radius, true)
    }

    /// 每个 8 连通区域的外轮廓
    fn outer_contours(&self) -> Vec<Contour> {
        let mut visited = vec![false; self.bits.len()];
        let mut contours = Vec::new();

        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                if !self.bits[idx] || visited[idx] {
                    continue;
                }
                // 光栅顺序遇到的第一个像素即区域最上最左点
                self.flood(x, y, &mut visited);
                contours.push(self.trace(x as i64, y as i64));
            }
        }
        contours
    }

    fn flood(&self, x: usize, y: usize, visited: &mut [bool]) {
        let mut queue = VecDeque::new();
        visited[y * self.width + x] = true;
        queue.push_back((x as i64, y as i64));

        while let Some((cx, cy)) = queue.pop_front() {
            for (dx, dy) in NEIGHBORS {
                let (nx, ny) = (cx + dx, cy + dy);
                if self.get(nx, ny) {
                    let idx = ny as usize * self.width + nx as usize;
                    if !visited[idx] {
                        visited[idx] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }
        }
    }

    /// Moore 邻域跟踪，以回到起点且回溯点相同为终止条件
    fn trace(&self, sx: i64, sy: i64) -> Contour {
        let start = (sx, sy);
        let start_back = (sx - 1, sy);
        let mut current = start;
        let mut back = start_back;
        let mut contour = vec![Point::new(sx as f64, sy as f64)];
        let limit = 4 * self.bits.len() + 8;

        for _ in 0..limit {
            let Some(from) = direction(current, back) else {
                break;
            };
            let mut next = None;
            for i in 1..=8 {
                let k = (from + i) % 8;
                let candidate = (current.0 + NEIGHBORS[k].0, current.1 + NEIGHBORS[k].1);
                if self.get(candidate.0, candidate.1) {
                    let prev = (from + i - 1) % 8;
                    next = Some((
                        candidate,
                        (current.0 + NEIGHBORS[prev].0, current.1 + NEIGHBORS[prev].1),
                    ));
                    break;
                }
            }
            // 孤立像素
            let Some((pixel, new_back)) = next else {
                break;
            };
            if pixel == start && new_back == start_back {
                break;
            }
            current = pixel;
            back = new_back;
            contour.push(Point::new(pixel.0 as f64, pixel.1 as f64));
        }
        if contour.len() > 1 && contour.last() == contour.first() {
            contour.pop();
        }
        contour
    }
}

fn direction(from: (i64, i64), to: (i64, i64)) -> Option<usize> {
    let delta = (to.0 - from.0, to.1 - from.1);
    NEIGHBORS.iter().position(|&d| d == delta)
}

/// 纯 Rust 后端
#[derive(Debug, Clone)]
pub struct RasterBackend {
    kernel_size: usize,
}

impl Default for RasterBackend {
    fn default() -> Self {
        Self::new(DEFAULT_KERNEL_SIZE)
    }
}

impl RasterBackend {
    /// `kernel_size` 为形态学矩形核边长（奇数，0 表示不做形态学处理）
    pub fn new(kernel_size: usize) -> Self {
        Self { kernel_size }
    }

    fn threshold(&self, frame: &RasterImage, range: &ColorRange) -> Mask {
        Mask {
            width: frame.width,
            height: frame.height,
            bits: frame
                .pixels
                .iter()
                .map(|&px| range.contains(rgb_to_hsv(px)))
                .collect(),
        }
    }
}

impl VisionBackend for RasterBackend {
    type Frame = RasterImage;

    fn segment(
        &mut self,
        frame: &RasterImage,
        range: &ColorRange,
    ) -> Result<Vec<Contour>, VisionError> {
        if frame.is_empty() {
            return Err(VisionError::EmptyFrame);
        }
        let mut mask = self.threshold(frame, range);
        if self.kernel_size > 1 {
            let radius = self.kernel_size / 2;
            mask = mask.close(radius).open(radius);
        }
        Ok(mask.outer_contours())
    }

    fn channel_means(&mut self, frame: &RasterImage) -> Result<[f64; 3], VisionError> {
        if frame.is_empty() {
            return Err(VisionError::EmptyFrame);
        }
        let mut sums = [0.0; 3];
        for &px in &frame.pixels {
            let hsv = rgb_to_hsv(px);
            for (sum, value) in sums.iter_mut().zip(hsv) {
                *sum += value;
            }
        }
        let n = frame.pixels.len() as f64;
        Ok(sums.map(|s| s / n))
    }
}
