//! # Pano CLI
//!
//! 在内存模拟查看器上运行导览脚本，输出查看器收到的调用序列。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p pano-cli -- run tour.json
//! cargo run -p pano-cli -- run tour.json --json
//! cargo run -p pano-cli -- check tour.json
//! cargo run -p pano-cli -- --config host.json -vv run tour.json
//! ```

mod config;
mod driver;
mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing::level_filters::LevelFilter;

use pano_runtime::sim::ViewerCall;

use crate::config::{HostConfig, OutputFormat};
use crate::driver::{Driver, Report};
use crate::scenario::Scenario;

#[derive(Parser)]
#[command(name = "pano")]
#[command(about = "全景查看器脚本运行工具")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：config.json）
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    /// 提高日志级别（可重复）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行脚本
    Run {
        /// 脚本路径
        scenario: PathBuf,

        /// 以 JSON 输出完整报告
        #[arg(long)]
        json: bool,
    },

    /// 只检查脚本，不运行
    Check {
        /// 脚本路径
        scenario: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let loaded = match HostConfig::load(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ 读取配置失败: {}", e);
            std::process::exit(1);
        }
    };
    let config_missing = loaded.is_none();
    let config = loaded.unwrap_or_default();

    let level = config.log_level.raised(cli.verbose);
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(level))
        .with_writer(std::io::stderr)
        .init();
    if config_missing {
        warn!(path = %cli.config.display(), "配置文件不存在，使用默认配置");
    }

    match cli.command {
        Commands::Run { scenario, json } => {
            let format = if json { OutputFormat::Json } else { config.output };
            if let Err(e) = run(&scenario, &config, format) {
                eprintln!("❌ 运行失败: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Check { scenario } => {
            if let Err(e) = check(&scenario) {
                eprintln!("❌ 检查失败: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn load_checked(path: &Path) -> anyhow::Result<Scenario> {
    let scenario = Scenario::load(path)?;
    let issues = scenario.check();
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("  {}", issue);
        }
        bail!("脚本有 {} 个问题", issues.len());
    }
    Ok(scenario)
}

fn check(path: &Path) -> anyhow::Result<()> {
    let scenario = load_checked(path)?;
    println!(
        "✅ {}: {} 个场景，{} 个步骤",
        path.display(),
        scenario.scenes.len(),
        scenario.steps.len()
    );
    Ok(())
}

fn run(path: &Path, config: &HostConfig, format: OutputFormat) -> anyhow::Result<()> {
    let scenario = load_checked(path)?;
    info!(scenes = scenario.scenes.len(), steps = scenario.steps.len(), "开始运行脚本");

    let report = Driver::new(&scenario, config)
        .run(&scenario.steps)
        .context("脚本未能结束")?;

    match format {
        OutputFormat::Json => {
            let text = serde_json::to_string_pretty(&report).context("序列化报告失败")?;
            println!("{}", text);
        }
        OutputFormat::Text => print_text(&report),
    }

    let failed = report.failed_steps();
    if failed > 0 {
        bail!("{} 个步骤失败", failed);
    }
    Ok(())
}

fn print_text(report: &Report) {
    for call in &report.calls {
        println!("{}", describe(call));
    }
    for step in &report.steps {
        if let Some(error) = &step.error {
            println!("! 步骤 {} ({}) @{}ms: {}", step.index + 1, step.action, step.at_ms, error);
        }
    }
    for error in &report.dispatch_errors {
        println!("! 通知处理失败: {}", error);
    }
    println!(
        "= 场景 {}，用时 {}ms，{} 条调用",
        report.final_scene,
        report.elapsed_ms,
        report.calls.len()
    );
}

fn describe(call: &ViewerCall) -> String {
    match call {
        ViewerCall::StylesheetAppended { id, css } => format!("+style {id} {css}"),
        ViewerCall::StylesheetRemoved { id } => format!("-style {id}"),
        ViewerCall::ClassAdded { name } => format!("+class {name}"),
        ViewerCall::ClassRemoved { name } => format!("-class {name}"),
        ViewerCall::LookAt(look) => {
            let angle = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.1}"));
            format!(
                "lookAt yaw={} pitch={} fov={:.1} {}ms {}",
                angle(look.yaw),
                angle(look.pitch),
                look.fov,
                look.duration_ms,
                look.easing
            )
        }
        ViewerCall::LoadScene { uid } => format!("load {uid}"),
        ViewerCall::SetVolume { target, value } => format!("volume {target} {value:.3}"),
        ViewerCall::SetLocale { locale } => format!("locale {locale}"),
        ViewerCall::SetProjection { projection } => format!("projection {projection}"),
        other => format!("{other:?}"),
    }
}
