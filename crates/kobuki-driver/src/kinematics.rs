//! 差速底盘运动学
//!
//! 底盘原生命令为"线速度 + 转弯半径"。上层控制器输出的是 (v, ω)，
//! 这里完成二者之间的换算，以及 16 位编码器的回绕差值。

/// (v, ω) 换算时判定为零的阈值
pub const UNICYCLE_EPSILON: f64 = 0.0001;

/// 原地旋转使用的半径值
pub const PIVOT_RADIUS: i16 = 1;

/// 将 (线速度, 角速度) 换算为底盘的 (速度, 转弯半径)
///
/// # 参数
/// - `linear`: 线速度（mm/s）
/// - `angular`: 角速度（rad/s，逆时针为正）
/// - `wheelbase_mm`: 轮距（mm）
///
/// # 规则
/// - `|ω| < ε`：直行，`radius = 0`
/// - 否则 `r = v / ω`；若 `|v| < ε` 或 `|r| ≤ 1`：原地旋转，
///   `radius = 1`，`velocity = wheelbase · ω / 2`
/// - 否则 `velocity = (r ± wheelbase/2) · ω`，符号与 `r` 相同
///
/// 结果按 `as` 语义截断并饱和到 `i16`。
pub fn unicycle_to_drive(linear: f64, angular: f64, wheelbase_mm: f64) -> (i16, i16) {
    if angular.abs() < UNICYCLE_EPSILON {
        return (linear as i16, 0);
    }

    let radius = linear / angular;
    if linear.abs() < UNICYCLE_EPSILON || radius.abs() <= 1.0 {
        let velocity = wheelbase_mm * angular / 2.0;
        return (velocity as i16, PIVOT_RADIUS);
    }

    let half_wheelbase = wheelbase_mm / 2.0;
    let velocity = if radius > 0.0 {
        (radius + half_wheelbase) * angular
    } else {
        (radius - half_wheelbase) * angular
    };
    (velocity as i16, radius as i16)
}

/// 编码器前进的计数（模 65536）
///
/// ```
/// # use kobuki_driver::encoder_delta;
/// assert_eq!(encoder_delta(65500, 50), 86);
/// ```
pub fn encoder_delta(start: u16, current: u16) -> u16 {
    current.wrapping_sub(start)
}

/// 有符号的编码器差值，适用于相邻两次采样之间（|Δ| < 32768）
pub fn signed_encoder_delta(previous: u16, current: u16) -> i16 {
    current.wrapping_sub(previous) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const WB: f64 = 230.0;

    #[test]
    fn test_straight() {
        assert_eq!(unicycle_to_drive(200.0, 0.0, WB), (200, 0));
        assert_eq!(unicycle_to_drive(-150.0, 0.00005, WB), (-150, 0));
    }

    #[test]
    fn test_pivot_when_linear_zero() {
        // 230 * 1.0 / 2 = 115
        assert_eq!(unicycle_to_drive(0.0, 1.0, WB), (115, 1));
        assert_eq!(unicycle_to_drive(0.0, -1.0, WB), (-115, 1));
    }

    #[test]
    fn test_pivot_when_radius_small() {
        // r = 0.5 / 1.0 = 0.5 ≤ 1
        assert_eq!(unicycle_to_drive(0.5, 1.0, WB), (115, 1));
        // r = 1.0 exactly is still a pivot
        assert_eq!(unicycle_to_drive(2.0, 2.0, WB), (230, 1));
    }

    #[test]
    fn test_arc_positive_radius() {
        // r = 200 / 0.5 = 400; v = (400 + 115) * 0.5 = 257.5
        assert_eq!(unicycle_to_drive(200.0, 0.5, WB), (257, 400));
    }

    #[test]
    fn test_arc_negative_radius() {
        // r = 200 / -0.5 = -400; v = (-400 - 115) * -0.5 = 257.5
        assert_eq!(unicycle_to_drive(200.0, -0.5, WB), (257, -400));
        // r = -200 / 0.5 = -400; v = (-515) * 0.5 = -257.5
        assert_eq!(unicycle_to_drive(-200.0, 0.5, WB), (-257, -400));
    }

    #[test]
    fn test_encoder_delta_wraparound() {
        assert_eq!(encoder_delta(65500, 50), 86);
        assert_eq!(encoder_delta(100, 100), 0);
        assert_eq!(encoder_delta(0, 65535), 65535);
    }

    #[test]
    fn test_signed_delta() {
        assert_eq!(signed_encoder_delta(65500, 50), 86);
        assert_eq!(signed_encoder_delta(50, 65500), -86);
    }

    proptest! {
        #[test]
        fn prop_encoder_delta_inverts_addition(start in any::<u16>(), step in any::<u16>()) {
            prop_assert_eq!(encoder_delta(start, start.wrapping_add(step)), step);
        }

        #[test]
        fn prop_arc_velocity_has_sign_of_linear(
            linear in 10.0f64..500.0,
            angular in 0.01f64..3.0,
            sign_v in prop::bool::ANY,
            sign_w in prop::bool::ANY,
        ) {
            let v = if sign_v { linear } else { -linear };
            let w = if sign_w { angular } else { -angular };
            prop_assume!((v / w).abs() > 1.0);
            let (velocity, radius) = unicycle_to_drive(v, w, WB);
            prop_assert!(radius != 0);
            if velocity != 0 {
                prop_assert_eq!(velocity > 0, v > 0.0);
            }
        }
    }
}
