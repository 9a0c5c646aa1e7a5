//! Builder 模式实现
//!
//! 提供链式构造 `Kobuki` 实例的便捷方式。

use crate::error::DriverError;
use crate::kobuki::Kobuki;
use crate::pipeline::PipelineConfig;
#[cfg(feature = "serialport")]
use kobuki_protocol::DEFAULT_BAUD_RATE;
use kobuki_protocol::WHEELBASE_MM;
use kobuki_serial::SplittableAdapter;

/// 默认串口设备（Kobuki 的 udev 规则创建的符号链接）
pub const DEFAULT_PORT: &str = "/dev/kobuki";

/// Kobuki Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use kobuki_driver::{KobukiBuilder, PipelineConfig};
///
/// let kobuki = KobukiBuilder::new()
///     .port("/dev/ttyUSB0")
///     .pipeline_config(PipelineConfig::default())
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct KobukiBuilder {
    /// 串口设备路径
    port: Option<String>,
    /// 波特率（默认 115200）
    baud_rate: Option<u32>,
    /// Pipeline 配置
    pipeline_config: Option<PipelineConfig>,
    /// 轮距（毫米）
    wheelbase_mm: Option<f64>,
}

impl Default for KobukiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KobukiBuilder {
    pub fn new() -> Self {
        Self {
            port: None,
            baud_rate: None,
            pipeline_config: None,
            wheelbase_mm: None,
        }
    }

    /// 设置串口设备（可选，默认 `/dev/kobuki`）
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 设置波特率（可选，默认 115200）
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    /// 设置 Pipeline 配置（可选）
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = Some(config);
        self
    }

    /// 设置轮距（可选，默认 230mm）
    pub fn wheelbase_mm(mut self, wheelbase_mm: f64) -> Self {
        self.wheelbase_mm = Some(wheelbase_mm);
        self
    }

    /// 打开串口并启动驱动
    ///
    /// # 错误
    /// - `DriverError::Serial`: 串口不存在、无权限或配置失败
    #[cfg(feature = "serialport")]
    pub fn build(self) -> Result<Kobuki, DriverError> {
        let port = self.port.clone().unwrap_or_else(|| DEFAULT_PORT.to_string());
        let baud_rate = self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
        let adapter = kobuki_serial::SerialPortAdapter::open(&port, baud_rate)?;
        tracing::info!("Kobuki connected on {} ({} baud)", port, baud_rate);
        self.build_with_adapter(adapter)
    }

    /// 使用已打开的适配器启动驱动（Mock 或自定义后端）
    pub fn build_with_adapter<A>(self, adapter: A) -> Result<Kobuki, DriverError>
    where
        A: SplittableAdapter,
    {
        let port = self.port.unwrap_or_else(|| DEFAULT_PORT.to_string());
        let wheelbase_mm = self.wheelbase_mm.unwrap_or(WHEELBASE_MM);
        let kobuki = Kobuki::new(adapter, self.pipeline_config)?;
        Ok(kobuki.with_metadata(port, wheelbase_mm))
    }
}
