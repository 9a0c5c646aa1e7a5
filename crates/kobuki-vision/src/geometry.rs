//! 轮廓几何
//!
//! 纯 Rust 实现，行为与 OpenCV 的 `contourArea` / `arcLength` /
//! `approxPolyDP` / `isContourConvex` 对闭合轮廓的处理一致。
//! 没有 OpenCV 的构建与测试都走这里。

use crate::types::Point;

/// 闭合多边形面积（鞋带公式，取绝对值）
pub fn contour_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        twice += p.x * q.y - q.x * p.y;
    }
    twice.abs() / 2.0
}

/// 折线长度
///
/// `closed` 为 true 时包含最后一点回到第一点的边。
pub fn arc_length(points: &[Point], closed: bool) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let mut length: f64 = points.windows(2).map(|w| distance(w[0], w[1])).sum();
    if closed {
        length += distance(points[points.len() - 1], points[0]);
    }
    length
}

/// 闭合轮廓的 Douglas-Peucker 多边形逼近
///
/// 以离第 0 点最远的点为分割点，把闭合轮廓拆成两条开放折线分别简化后拼接。
/// 结果中不重复首点。
pub fn approx_polygon(points: &[Point], epsilon: f64) -> Vec<Point> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let anchor = points[0];
    let split = (1..n)
        .max_by(|&a, &b| {
            distance(anchor, points[a]).total_cmp(&distance(anchor, points[b]))
        })
        .unwrap_or(n - 1);

    // 第一段 [0, split]，第二段 [split, n) 再回到 0
    let first: Vec<Point> = points[..=split].to_vec();
    let mut second: Vec<Point> = points[split..].to_vec();
    second.push(anchor);

    let mut keep_first = vec![false; first.len()];
    simplify_open(&first, epsilon, 0, first.len() - 1, &mut keep_first);
    let mut keep_second = vec![false; second.len()];
    simplify_open(&second, epsilon, 0, second.len() - 1, &mut keep_second);

    let mut result: Vec<Point> = first
        .iter()
        .zip(&keep_first)
        .filter(|(_, k)| **k)
        .map(|(p, _)| *p)
        .collect();
    // 第二段的首点（split）和尾点（anchor）已经在第一段里
    let inner = second.len() - 1;
    result.extend(
        second
            .iter()
            .zip(&keep_second)
            .take(inner)
            .skip(1)
            .filter(|(_, k)| **k)
            .map(|(p, _)| *p),
    );
    result
}

/// 多边形是否为凸（所有非零叉积同号）
///
/// 少于 3 个顶点或全部共线时返回 false。
pub fn is_convex(points: &[Point]) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut sign = 0.0_f64;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        let c = points[(i + 2) % n];
        let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
        if cross == 0.0 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    sign != 0.0
}

fn distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// 点到线段所在直线的距离；线段退化为点时返回点距
fn perpendicular_distance(p: Point, start: Point, end: Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return distance(p, start);
    }
    ((p.x - start.x) * dy - (p.y - start.y) * dx).abs() / len
}

fn simplify_open(points: &[Point], epsilon: f64, first: usize, last: usize, keep: &mut [bool]) {
    keep[first] = true;
    keep[last] = true;
    if last <= first + 1 {
        return;
    }

    let mut max_dist = 0.0;
    let mut index = first;
    for i in (first + 1)..last {
        let d = perpendicular_distance(points[i], points[first], points[last]);
        if d > max_dist {
            max_dist = d;
            index = i;
        }
    }

    if max_dist > epsilon {
        simplify_open(points, epsilon, first, index, keep);
        simplify_open(points, epsilon, index, last, keep);
    }
}
