//! # CSS 模块
//!
//! 过渡效果使用的 CSS 时长与临时样式表。
//!
//! 样式表在过渡开始前注入文档，过渡结束后移除：
//!
//! ```text
//! #container { opacity: 1; transition: opacity <out>; }
//! #container.<class> { opacity: 0; transition: opacity <in>; }
//! ```
//!
//! 给容器加上 class 触发淡入黑场（transition-in），移除 class 触发恢复（transition-out）。

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

/// CSS 时长（`800ms`、`1.5s`）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawCssDuration", into = "String")]
pub struct CssDuration(Duration);

/// 反序列化用的原始形式：CSS 字符串或毫秒数
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCssDuration {
    Text(String),
    Millis(f64),
}

impl CssDuration {
    /// 从毫秒数创建
    pub const fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    /// 转换为 `Duration`
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// 毫秒数
    pub fn as_millis_f64(&self) -> f64 {
        self.0.as_nanos() as f64 / 1_000_000.0
    }

    fn from_millis_f64(ms: f64) -> ApiResult<Self> {
        if !ms.is_finite() || ms < 0.0 {
            return Err(ApiError::invalid_argument(format!(
                "CSS 时长必须是非负有限值，实际为 {ms}"
            )));
        }
        Ok(Self(Duration::from_nanos((ms * 1_000_000.0).round() as u64)))
    }
}

impl fmt::Display for CssDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.as_millis_f64())
    }
}

impl FromStr for CssDuration {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || ApiError::invalid_argument(format!("无效的 CSS 时长 '{s}'"));

        if text == "0" {
            return Ok(Self(Duration::ZERO));
        }

        let (number, scale) = if let Some(ms) = text.strip_suffix("ms") {
            (ms, 1.0)
        } else if let Some(secs) = text.strip_suffix('s') {
            (secs, 1000.0)
        } else {
            return Err(invalid());
        };

        let value: f64 = number.trim().parse().map_err(|_| invalid())?;
        Self::from_millis_f64(value * scale).map_err(|_| invalid())
    }
}

impl TryFrom<RawCssDuration> for CssDuration {
    type Error = ApiError;

    fn try_from(raw: RawCssDuration) -> Result<Self, Self::Error> {
        match raw {
            RawCssDuration::Text(text) => text.parse(),
            RawCssDuration::Millis(ms) => Self::from_millis_f64(ms),
        }
    }
}

impl From<CssDuration> for String {
    fn from(value: CssDuration) -> Self {
        value.to_string()
    }
}

/// 检查 CSS 标识符（class 名、元素 id）
///
/// 只接受字母、数字、`-`、`_`，且不能以数字开头。
pub fn validate_identifier(kind: &str, value: &str) -> ApiResult<()> {
    let mut chars = value.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '-' || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(ApiError::invalid_argument(format!(
            "{kind} '{value}' 不是有效的 CSS 标识符"
        )))
    }
}

/// 过渡期间注入文档的临时样式表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionStylesheet {
    /// 样式表元素 id
    pub id: String,
    /// 查看器容器元素 id
    pub container_id: String,
    /// 触发 transition-in 的 class 名
    pub class_name: String,
    /// transition-in 时长
    pub duration_in: CssDuration,
    /// transition-out 时长
    pub duration_out: CssDuration,
}

impl TransitionStylesheet {
    /// 生成 CSS 声明
    pub fn to_css(&self) -> String {
        format!(
            "#{c} {{opacity: 1;transition: opacity {out};}}#{c}.{class} {{opacity: 0;transition: opacity {inn};}}",
            c = self.container_id,
            class = self.class_name,
            out = self.duration_out,
            inn = self.duration_in,
        )
    }
}
