//! 会话配置（TOML）
//!
//! 所有字段都有默认值，配置文件只需写出要覆盖的部分：
//!
//! ```toml
//! port = "/dev/ttyUSB0"
//!
//! [controller.approach]
//! target_range_mm = 600.0
//!
//! [estimator.color_range]
//! min = [35.0, 100.0, 0.0]
//! max = [65.0, 170.0, 255.0]
//! ```

use std::fs;
use std::path::Path;

use kobuki_client::ControllerConfig;
use kobuki_driver::PipelineConfig;
use kobuki_protocol::{DEFAULT_BAUD_RATE, WHEELBASE_MM};
use kobuki_vision::{CameraConfig, RangeEstimatorConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// 会话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KobukiConfig {
    /// 串口设备
    pub port: String,
    pub baud_rate: u32,
    /// 轮距（毫米）
    pub wheelbase_mm: f64,
    pub pipeline: PipelineConfig,
    pub estimator: RangeEstimatorConfig,
    pub camera: CameraConfig,
    pub controller: ControllerConfig,
}

impl Default for KobukiConfig {
    fn default() -> Self {
        Self {
            port: kobuki_driver::DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            wheelbase_mm: WHEELBASE_MM,
            pipeline: PipelineConfig::default(),
            estimator: RangeEstimatorConfig::default(),
            camera: CameraConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

impl KobukiConfig {
    /// 从 TOML 文本解析
    ///
    /// # 错误
    /// 语法错误或字段类型不符时返回 `ConfigError::Parse`
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// 从文件加载
    ///
    /// # 错误
    /// - `ConfigError::Io`: 文件不存在或不可读
    /// - `ConfigError::Parse`: 内容不是合法配置
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
