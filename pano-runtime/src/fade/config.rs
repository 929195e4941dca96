//! 音量渐变参数

use serde::{Deserialize, Serialize};

use crate::callback::Callback;
use crate::error::{ApiError, ApiResult};
use crate::facade::VolumeTarget;

/// 默认渐变时长（毫秒）
pub const DEFAULT_FADE_DURATION_MS: f64 = 1000.0;

/// 音量渐变参数
#[derive(Debug)]
pub struct FadeConfig {
    /// 渐变时长（毫秒）
    pub duration_ms: f64,
    /// 渐变目标
    pub target: VolumeTarget,
    pub on_start: Callback,
    pub on_end: Callback,
}

impl Default for FadeConfig {
    fn default() -> Self {
        Self {
            duration_ms: DEFAULT_FADE_DURATION_MS,
            target: VolumeTarget::Master,
            on_start: Callback::noop(),
            on_end: Callback::noop(),
        }
    }
}

impl FadeConfig {
    pub fn from_options(options: FadeOptions) -> Self {
        let mut config = Self::default();
        config.merge(options);
        config
    }

    /// 逐字段覆盖，只处理已知字段
    pub fn merge(&mut self, options: FadeOptions) {
        let FadeOptions {
            duration_ms,
            target,
        } = options;

        if let Some(v) = duration_ms {
            self.duration_ms = v;
        }
        if let Some(v) = target {
            self.target = v;
        }
    }

    pub fn with_duration(mut self, duration_ms: f64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_target(mut self, target: VolumeTarget) -> Self {
        self.target = target;
        self
    }

    pub fn on_start(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_start = Callback::new(f);
        self
    }

    pub fn on_end(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_end = Callback::new(f);
        self
    }

    /// 时长必须是非负有限值
    pub fn validate(&self) -> ApiResult<()> {
        if !self.duration_ms.is_finite() || self.duration_ms < 0.0 {
            return Err(ApiError::invalid_argument(format!(
                "渐变时长必须是非负有限值，实际为 {}",
                self.duration_ms
            )));
        }
        Ok(())
    }
}

/// 音量渐变参数的部分覆盖（JSON 形式）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FadeOptions {
    #[serde(default, alias = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<VolumeTarget>,
}

impl From<FadeOptions> for FadeConfig {
    fn from(options: FadeOptions) -> Self {
        Self::from_options(options)
    }
}

/// 检查音量是否在 0.0 - 1.0 之间
pub fn check_volume(value: f64) -> ApiResult<f64> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::OutOfRange { value })
    }
}

/// 解析文本形式的音量（`"0.5"`）
pub fn parse_volume(text: &str) -> ApiResult<f64> {
    let value: f64 = text.trim().parse().map_err(|_| {
        ApiError::invalid_argument(format!("无效的音量 '{text}'：必须是数字"))
    })?;
    check_volume(value)
}
