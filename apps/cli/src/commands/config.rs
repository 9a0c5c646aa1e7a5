//! 配置管理命令
//!
//! 配置文件默认位于 `<config_dir>/kobuki/config.toml`，命令行 `--config` 可覆盖。

use anyhow::{Context, Result};
use clap::Subcommand;
use kobuki_sdk::KobukiConfig;
use std::fs;
use std::path::{Path, PathBuf};

/// 配置目录
fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| anyhow::anyhow!("无法确定配置目录"))?;

    path.push("kobuki");
    Ok(path)
}

/// 默认配置文件路径
pub fn default_config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    path.push("config.toml");
    Ok(path)
}

/// 加载配置：文件不存在时使用默认值
pub fn load(path: Option<&Path>) -> Result<KobukiConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_file()?,
    };

    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(KobukiConfig::default());
    }

    KobukiConfig::load_from_file(&path)
        .with_context(|| format!("读取配置文件失败: {}", path.display()))
}

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 显示生效的配置
    Show,

    /// 显示配置文件路径
    Path,

    /// 写入默认配置文件
    Init {
        /// 覆盖已有文件
        #[arg(short, long)]
        force: bool,
    },
}

impl ConfigCommand {
    pub fn execute(&self, path: Option<&Path>) -> Result<()> {
        match self {
            ConfigCommand::Show => {
                let config = load(path)?;
                print!("{}", config.to_toml_string()?);
                Ok(())
            },
            ConfigCommand::Path => {
                let path = match path {
                    Some(path) => path.to_path_buf(),
                    None => default_config_file()?,
                };
                println!("{}", path.display());
                Ok(())
            },
            ConfigCommand::Init { force } => {
                let path = match path {
                    Some(path) => path.to_path_buf(),
                    None => default_config_file()?,
                };
                init(&path, *force)?;
                println!("✅ 已写入 {}", path.display());
                Ok(())
            },
        }
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} 已存在（使用 --force 覆盖）", path.display());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("创建配置目录失败")?;
    }
    KobukiConfig::default()
        .save_to_file(path)
        .context("写入配置文件失败")?;
    Ok(())
}
