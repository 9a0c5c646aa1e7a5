//! # Kobuki CLI
//!
//! Command-line interface for Kobuki base control.
//!
//! ```bash
//! # 写入默认配置（~/.config/kobuki/config.toml）
//! kobuki-cli config init
//!
//! # 直行 1 米
//! kobuki-cli --port /dev/ttyUSB0 distance 1.0
//!
//! # 原地旋转 2 秒
//! kobuki-cli rotate 0.8 -t 2000
//!
//! # 视觉靠近（需要 --features opencv）
//! kobuki-cli task 1
//! ```
//!
//! 所有运动命令都可以用 Ctrl+C 停止，停止时下发零速。

use anyhow::Result;
use clap::{Parser, Subcommand};
use kobuki_sdk::Session;
use std::path::PathBuf;

mod commands;

use commands::{
    ConfigCommand, DistanceCommand, DriveCommand, Interrupt, MonitorCommand, RotateCommand,
    TaskCommand,
};

/// Kobuki CLI - 底盘命令行工具
#[derive(Parser, Debug)]
#[command(name = "kobuki-cli")]
#[command(about = "Command-line interface for Kobuki base control", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（默认 <config_dir>/kobuki/config.toml）
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 串口设备（覆盖配置）
    #[arg(short, long, global = true)]
    port: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 持续行驶
    Drive {
        #[command(flatten)]
        args: DriveCommand,
    },

    /// 定距行驶
    Distance {
        #[command(flatten)]
        args: DistanceCommand,
    },

    /// 定时原地旋转
    Rotate {
        #[command(flatten)]
        args: RotateCommand,
    },

    /// 运行自主行为
    Task {
        #[command(flatten)]
        args: TaskCommand,
    },

    /// 颜色标定
    Calibrate,

    /// 监控传感器
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 设置 LED（0 关闭，1-4 LED1/LED2 红绿）
    Led { id: u8 },

    /// 播放提示音（0-6）
    Sound { id: u8 },
}

fn main() -> Result<()> {
    kobuki_sdk::init_logger();

    let cli = Cli::parse();

    if let Commands::Config(cmd) = &cli.command {
        return cmd.execute(cli.config.as_deref());
    }

    let mut config = commands::config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    println!("🔌 连接 {} ...", config.port);
    let session = Session::connect(config)?;
    let interrupt = Interrupt::install()?;

    let result = match &cli.command {
        Commands::Drive { args } => args.execute(&session, &interrupt),
        Commands::Distance { args } => args.execute(&session, &interrupt),
        Commands::Rotate { args } => args.execute(&session, &interrupt),
        Commands::Task { args } => args.execute(&session, &interrupt),
        Commands::Calibrate => commands::camera::calibrate(&session, &interrupt),
        Commands::Monitor { args } => args.execute(&session, &interrupt),
        Commands::Led { id } => {
            session.set_led(*id);
            Ok(())
        },
        Commands::Sound { id } => {
            session.play_sound(*id);
            Ok(())
        },
        Commands::Config(_) => Ok(()),
    };

    session.close();
    result
}
