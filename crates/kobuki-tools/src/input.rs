//! 界面文本输入解析
//!
//! 操作界面以文本框形式提供颜色阈值（如 `"30,60,85"`）和速度。
//! 解析失败时回退到安全默认值并记录警告，不会中断控制循环。

use thiserror::Error;
use tracing::warn;

/// 输入解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("Expected {expected} comma-separated values, got {actual}")]
    WrongArity { expected: usize, actual: usize },

    #[error("Invalid number at position {index}: {text:?}")]
    InvalidNumber { index: usize, text: String },
}

/// 严格解析三通道颜色值
///
/// 允许各项两侧有空白。
///
/// # 错误
/// 项数不为 3 或任一项不是有限数值时返回 `InputError`
pub fn try_parse_color_triplet(text: &str) -> Result<[f64; 3], InputError> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(InputError::WrongArity {
            expected: 3,
            actual: parts.len(),
        });
    }

    let mut out = [0.0; 3];
    for (index, part) in parts.iter().enumerate() {
        out[index] = part
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| InputError::InvalidNumber {
                index,
                text: part.to_string(),
            })?;
    }
    Ok(out)
}

/// 宽松解析三通道颜色值，失败时返回全零
pub fn parse_color_triplet(text: &str) -> [f64; 3] {
    match try_parse_color_triplet(text) {
        Ok(values) => values,
        Err(e) => {
            warn!("Malformed color range {:?} ({}), falling back to 0,0,0", text, e);
            [0.0; 3]
        },
    }
}

/// 宽松解析单个数值，失败时返回 `default`
pub fn parse_number_or(text: &str, default: f64) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            warn!("Malformed number {:?}, falling back to {}", text, default);
            default
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_triplet() {
        assert_eq!(try_parse_color_triplet("30,60,85"), Ok([30.0, 60.0, 85.0]));
        assert_eq!(
            try_parse_color_triplet(" 50 , 200,255 "),
            Ok([50.0, 200.0, 255.0])
        );
    }

    #[test]
    fn test_parse_triplet_errors() {
        assert_eq!(
            try_parse_color_triplet("1,2"),
            Err(InputError::WrongArity {
                expected: 3,
                actual: 2
            })
        );
        assert!(matches!(
            try_parse_color_triplet("1,x,3"),
            Err(InputError::InvalidNumber { index: 1, .. })
        ));
        assert!(try_parse_color_triplet("1,NaN,3").is_err());
    }

    #[test]
    fn test_lenient_fallbacks() {
        assert_eq!(parse_color_triplet("garbage"), [0.0; 3]);
        assert_eq!(parse_color_triplet(""), [0.0; 3]);
        assert_eq!(parse_number_or("120", 0.0), 120.0);
        assert_eq!(parse_number_or(" -0.5 ", 0.0), -0.5);
        assert_eq!(parse_number_or("fast", 0.0), 0.0);
        assert_eq!(parse_number_or("inf", 7.0), 7.0);
    }

    proptest! {
        #[test]
        fn prop_formatted_triplet_parses_back(
            values in prop::array::uniform3(-1.0e6f64..1.0e6),
        ) {
            let text = format!("{},{},{}", values[0], values[1], values[2]);
            prop_assert_eq!(try_parse_color_triplet(&text), Ok(values));
        }

        #[test]
        fn prop_lenient_parse_never_panics(text in ".*") {
            let triplet = parse_color_triplet(&text);
            prop_assert!(triplet.iter().all(|v| v.is_finite()));
        }
    }
}
