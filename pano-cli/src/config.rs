//! # Config 模块
//!
//! 宿主配置管理。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (config.json)
//! 3. 默认值（最低）

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

/// 日志级别
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// 按 `-v` 次数提升级别
    pub fn raised(self, verbosity: u8) -> Self {
        const ORDER: [LogLevel; 5] = [
            LogLevel::Error,
            LogLevel::Warn,
            LogLevel::Info,
            LogLevel::Debug,
            LogLevel::Trace,
        ];
        let index = ORDER.iter().position(|l| *l == self).unwrap_or(2);
        ORDER[(index + verbosity as usize).min(ORDER.len() - 1)]
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// 输出格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 每行一条调用
    #[default]
    Text,
    /// 完整报告（JSON）
    Json,
}

/// 宿主配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    /// 帧步长（毫秒）
    #[serde(default = "default_frame_ms")]
    pub frame_ms: u64,

    /// 模拟引擎配置
    #[serde(default)]
    pub viewer: ViewerConfig,

    /// 等待效果结束的最长模拟时间（毫秒）
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,

    /// 日志级别
    #[serde(default)]
    pub log_level: LogLevel,

    /// 输出格式
    #[serde(default)]
    pub output: OutputFormat,
}

/// 模拟引擎配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ViewerConfig {
    /// 查看器容器元素 id
    #[serde(default = "default_container_id")]
    pub container_id: String,

    /// 场景加载延迟（毫秒）
    #[serde(default = "default_load_latency_ms")]
    pub load_latency_ms: u64,

    /// 初始 FOV
    #[serde(default = "default_fov")]
    pub fov: f64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            container_id: default_container_id(),
            load_latency_ms: default_load_latency_ms(),
            fov: default_fov(),
        }
    }
}

// 默认值函数
fn default_frame_ms() -> u64 {
    16
}

fn default_settle_timeout_ms() -> u64 {
    10 * 60 * 1000
}

fn default_container_id() -> String {
    pano_runtime::sim::DEFAULT_CONTAINER_ID.to_string()
}

fn default_load_latency_ms() -> u64 {
    200
}

fn default_fov() -> f64 {
    pano_runtime::sim::DEFAULT_FOV
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            frame_ms: default_frame_ms(),
            viewer: ViewerConfig::default(),
            settle_timeout_ms: default_settle_timeout_ms(),
            log_level: LogLevel::default(),
            output: OutputFormat::default(),
        }
    }
}

impl HostConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回 `Ok(None)`，由调用方决定使用默认配置。
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(Some(config))
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_ms == 0 {
            return Err(ConfigError::Validation("frame_ms 必须大于 0".to_string()));
        }

        if self.settle_timeout_ms < self.frame_ms {
            return Err(ConfigError::Validation(
                "settle_timeout_ms 不能小于 frame_ms".to_string(),
            ));
        }

        if !self.viewer.fov.is_finite() || self.viewer.fov <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "viewer.fov 必须为正数，实际为 {}",
                self.viewer.fov
            )));
        }

        pano_runtime::css::validate_identifier("viewer.container_id", &self.viewer.container_id)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        Ok(())
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn load_latency(&self) -> Duration {
        Duration::from_millis(self.viewer.load_latency_ms)
    }
}

/// 配置错误
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(String),
    /// 解析失败
    #[error("配置解析失败: {0}")]
    Parse(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    Validation(String),
}
