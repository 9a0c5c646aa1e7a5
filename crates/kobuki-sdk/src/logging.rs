//! 日志初始化
//!
//! 使用 `tracing-subscriber` 输出，`RUST_LOG` 控制过滤；
//! 依赖中通过 `log` 宏产生的记录经 `tracing-log` 转发到同一个订阅者。

use tracing_subscriber::EnvFilter;

/// 默认过滤规则（`RUST_LOG` 未设置时）
pub const DEFAULT_FILTER: &str = "info";

/// 初始化全局日志
///
/// 重复调用是安全的：已经初始化时直接返回。
pub fn init_logger() {
    init_logger_with(DEFAULT_FILTER);
}

/// 以指定默认过滤规则初始化全局日志
pub fn init_logger_with(default_filter: &str) {
    // 已有 log 转发器时忽略
    let _ = tracing_log::LogTracer::init();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_init_twice() {
        init_logger();
        init_logger_with("debug");
        tracing::info!("logger ready");
    }

    #[test]
    #[serial]
    fn test_log_records_after_init() {
        init_logger();
        assert!(log::max_level() >= log::LevelFilter::Error);
        log::info!("bridged from log");
    }
}
