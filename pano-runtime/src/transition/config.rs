//! 过渡参数：默认值与部分覆盖

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::callback::Callback;
use crate::css::{CssDuration, validate_identifier};
use crate::error::{ApiError, ApiResult};

/// 过渡参数
///
/// 所有字段都有默认值，调用方通过 [`TransitionOptions`] 只覆盖需要的字段。
#[derive(Debug)]
pub struct TransitionConfig {
    /// 过渡期间添加到容器上的 class 名
    pub css_class_name: String,
    /// 临时样式表元素 id
    pub css_stylesheet_id: String,
    /// transition-in 时长
    pub duration_in: CssDuration,
    /// transition-out 时长
    pub duration_out: CssDuration,
    /// 场景加载完成到 transition-out 开始之间的延迟
    pub delay_between_in_out: Duration,
    pub on_transition_in_start: Callback,
    pub on_transition_in_end: Callback,
    pub on_transition_out_start: Callback,
    pub on_transition_out_end: Callback,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            css_class_name: "transition".to_string(),
            css_stylesheet_id: "transitionStylesheet".to_string(),
            duration_in: CssDuration::from_millis(800),
            duration_out: CssDuration::from_millis(1500),
            delay_between_in_out: Duration::ZERO,
            on_transition_in_start: Callback::noop(),
            on_transition_in_end: Callback::noop(),
            on_transition_out_start: Callback::noop(),
            on_transition_out_end: Callback::noop(),
        }
    }
}

impl TransitionConfig {
    /// 以默认值为基础应用部分覆盖
    pub fn from_options(options: TransitionOptions) -> Self {
        let mut config = Self::default();
        config.merge(options);
        config
    }

    /// 逐字段覆盖，只处理已知字段
    pub fn merge(&mut self, options: TransitionOptions) {
        let TransitionOptions {
            css_class_name,
            css_stylesheet_id,
            duration_in,
            duration_out,
            delay_between_in_out,
        } = options;

        if let Some(v) = css_class_name {
            self.css_class_name = v;
        }
        if let Some(v) = css_stylesheet_id {
            self.css_stylesheet_id = v;
        }
        if let Some(v) = duration_in {
            self.duration_in = v;
        }
        if let Some(v) = duration_out {
            self.duration_out = v;
        }
        if let Some(ms) = delay_between_in_out {
            self.delay_between_in_out = Duration::from_millis(ms);
        }
    }

    pub fn on_transition_in_start(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_transition_in_start = Callback::new(f);
        self
    }

    pub fn on_transition_in_end(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_transition_in_end = Callback::new(f);
        self
    }

    pub fn on_transition_out_start(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_transition_out_start = Callback::new(f);
        self
    }

    pub fn on_transition_out_end(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_transition_out_end = Callback::new(f);
        self
    }

    /// 检查 class 名与样式表 id
    pub fn validate(&self) -> ApiResult<()> {
        validate_identifier("cssClassName", &self.css_class_name)?;
        validate_identifier("cssStylesheetId", &self.css_stylesheet_id)?;
        if self.css_class_name == self.css_stylesheet_id {
            return Err(ApiError::invalid_argument(
                "cssClassName 与 cssStylesheetId 不能相同",
            ));
        }
        Ok(())
    }
}

/// 过渡参数的部分覆盖
///
/// 从 JSON 反序列化时使用 camelCase 键名，未知键被忽略。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css_stylesheet_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_in: Option<CssDuration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_out: Option<CssDuration>,
    /// 毫秒
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_between_in_out: Option<u64>,
}

impl From<TransitionOptions> for TransitionConfig {
    fn from(options: TransitionOptions) -> Self {
        Self::from_options(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransitionConfig::default();
        assert_eq!(config.css_class_name, "transition");
        assert_eq!(config.css_stylesheet_id, "transitionStylesheet");
        assert_eq!(config.duration_in.to_string(), "800ms");
        assert_eq!(config.duration_out.to_string(), "1500ms");
        assert_eq!(config.delay_between_in_out, Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_merge_from_json() {
        let options: TransitionOptions =
            serde_json::from_str(r#"{"durationIn": "200ms", "colour": "red"}"#).unwrap();
        let config = TransitionConfig::from_options(options);
        let defaults = TransitionConfig::default();

        assert_eq!(config.duration_in, CssDuration::from_millis(200));
        assert_eq!(config.duration_out, defaults.duration_out);
        assert_eq!(config.css_class_name, defaults.css_class_name);
        assert_eq!(config.css_stylesheet_id, defaults.css_stylesheet_id);
        assert_eq!(config.delay_between_in_out, defaults.delay_between_in_out);
    }

    #[test]
    fn test_merge_all_fields() {
        let mut config = TransitionConfig::default();
        config.merge(TransitionOptions {
            css_class_name: Some("fade".to_string()),
            css_stylesheet_id: Some("fadeSheet".to_string()),
            duration_in: Some(CssDuration::from_millis(100)),
            duration_out: Some(CssDuration::from_millis(300)),
            delay_between_in_out: Some(250),
        });

        assert_eq!(config.css_class_name, "fade");
        assert_eq!(config.css_stylesheet_id, "fadeSheet");
        assert_eq!(config.duration_out, CssDuration::from_millis(300));
        assert_eq!(config.delay_between_in_out, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        let result = serde_json::from_str::<TransitionOptions>(r#"{"durationOut": "slow"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_identifiers() {
        let config = TransitionConfig::from_options(TransitionOptions {
            css_class_name: Some("has space".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            config.validate(),
            Err(ApiError::InvalidArgument { .. })
        ));

        let config = TransitionConfig::from_options(TransitionOptions {
            css_class_name: Some("same".to_string()),
            css_stylesheet_id: Some("same".to_string()),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }
}
