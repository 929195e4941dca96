//! # Scenario 模块
//!
//! JSON 形式的导览脚本：场景列表、热点与按顺序执行的步骤。
//!
//! ```json
//! {
//!   "scenes": ["lobby", "hall"],
//!   "hotspots": [{ "uid": "door", "yaw": 120, "pitch": -5 }],
//!   "steps": [
//!     { "action": "goToScene", "uid": "hall", "transition": { "durationIn": "400ms" } },
//!     { "action": "fade", "value": 0.2, "options": { "duration": 500 } },
//!     { "action": "settle" }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use pano_runtime::fade::{FadeConfig, FadeOptions, check_volume, parse_volume};
use pano_runtime::{ApiResult, LookAtConfig, LookAtOptions, TransitionConfig, TransitionOptions};

/// 导览脚本
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// 故事中的场景（按顺序，第一个为初始场景）
    pub scenes: Vec<String>,
    #[serde(default)]
    pub hotspots: Vec<HotspotSpec>,
    /// 设置后初始场景为视频，值为时长（秒）
    #[serde(default)]
    pub video_duration: Option<f64>,
    pub steps: Vec<Step>,
}

/// 3D 热点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotSpec {
    pub uid: String,
    pub yaw: f64,
    pub pitch: f64,
}

/// 过渡参数：`true` 使用默认过渡，对象为部分覆盖
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransitionArg {
    Enabled(bool),
    Custom(TransitionOptions),
}

impl Default for TransitionArg {
    fn default() -> Self {
        Self::Enabled(false)
    }
}

impl TransitionArg {
    pub fn to_config(&self) -> Option<TransitionConfig> {
        match self {
            TransitionArg::Enabled(false) => None,
            TransitionArg::Enabled(true) => Some(TransitionConfig::default()),
            TransitionArg::Custom(options) => Some(TransitionConfig::from(options.clone())),
        }
    }
}

/// 音量：数字或文本
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VolumeValue {
    Number(f64),
    Text(String),
}

impl VolumeValue {
    /// 解析并检查范围
    pub fn resolve(&self) -> ApiResult<f64> {
        match self {
            VolumeValue::Number(v) => check_volume(*v),
            VolumeValue::Text(text) => parse_volume(text),
        }
    }
}

/// 脚本步骤
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Step {
    GoToScene {
        uid: String,
        #[serde(default)]
        transition: TransitionArg,
    },
    Next {
        #[serde(default)]
        transition: TransitionArg,
    },
    Previous {
        #[serde(default)]
        transition: TransitionArg,
    },
    First {
        #[serde(default)]
        transition: TransitionArg,
    },
    Last {
        #[serde(default)]
        transition: TransitionArg,
    },
    Fade {
        value: f64,
        #[serde(default)]
        options: FadeOptions,
    },
    SetVolume {
        value: VolumeValue,
        /// 设置后改为渐变
        #[serde(default)]
        fade: Option<FadeOptions>,
    },
    SetVideoVolume {
        value: f64,
        #[serde(default)]
        fade: Option<FadeOptions>,
    },
    GoToView {
        #[serde(default)]
        view: LookAtOptions,
    },
    /// 推进指定的模拟时间
    Wait { ms: u64 },
    /// 等待所有效果结束
    Settle,
}

impl Step {
    /// 步骤名称（日志用）
    pub fn name(&self) -> &'static str {
        match self {
            Step::GoToScene { .. } => "goToScene",
            Step::Next { .. } => "next",
            Step::Previous { .. } => "previous",
            Step::First { .. } => "first",
            Step::Last { .. } => "last",
            Step::Fade { .. } => "fade",
            Step::SetVolume { .. } => "setVolume",
            Step::SetVideoVolume { .. } => "setVideoVolume",
            Step::GoToView { .. } => "goToView",
            Step::Wait { .. } => "wait",
            Step::Settle => "settle",
        }
    }
}

/// 脚本检查发现的问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    /// 步骤序号；`None` 表示脚本级问题
    pub step: Option<usize>,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.step {
            Some(index) => write!(f, "步骤 {}: {}", index + 1, self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl Scenario {
    /// 从文件加载
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取脚本失败: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("解析脚本失败: {}", path.display()))
    }

    /// 静态检查，不执行任何步骤
    pub fn check(&self) -> Vec<Issue> {
        let mut issues = Vec::new();
        let mut global = |message: String| issues.push(Issue { step: None, message });

        if self.scenes.is_empty() {
            global("场景列表不能为空".to_string());
        }
        let mut seen = HashSet::new();
        for uid in &self.scenes {
            if !seen.insert(uid.as_str()) {
                global(format!("场景 '{uid}' 重复"));
            }
        }
        for hotspot in &self.hotspots {
            if seen.contains(hotspot.uid.as_str()) {
                global(format!("热点 '{}' 与场景同名", hotspot.uid));
            }
        }
        if let Some(duration) = self.video_duration
            && (!duration.is_finite() || duration < 0.0)
        {
            global(format!("视频时长无效: {duration}"));
        }

        for (index, step) in self.steps.iter().enumerate() {
            if let Err(message) = self.check_step(step) {
                issues.push(Issue {
                    step: Some(index),
                    message,
                });
            }
        }
        issues
    }

    fn check_step(&self, step: &Step) -> Result<(), String> {
        match step {
            Step::GoToScene { uid, transition } => {
                if !self.scenes.contains(uid) {
                    return Err(format!("未知场景 '{uid}'"));
                }
                check_transition(transition)
            }
            Step::Next { transition }
            | Step::Previous { transition }
            | Step::First { transition }
            | Step::Last { transition } => check_transition(transition),
            Step::Fade { value, options } => {
                check_volume(*value).map_err(|e| e.to_string())?;
                FadeConfig::from(options.clone())
                    .validate()
                    .map_err(|e| e.to_string())
            }
            Step::SetVolume { value, fade } => {
                value.resolve().map_err(|e| e.to_string())?;
                check_fade(fade.as_ref())
            }
            Step::SetVideoVolume { value, fade } => {
                if self.video_duration.is_none() {
                    return Err("初始场景不是视频".to_string());
                }
                check_volume(*value).map_err(|e| e.to_string())?;
                check_fade(fade.as_ref())
            }
            Step::GoToView { view } => {
                if let Some(uid) = &view.uid
                    && !self.hotspots.iter().any(|h| &h.uid == uid)
                {
                    return Err(format!("未知热点 '{uid}'"));
                }
                let config = LookAtConfig::from(view.clone());
                if !config.duration_ms.is_finite() || config.duration_ms < 0.0 {
                    return Err(format!("补间时长无效: {}", config.duration_ms));
                }
                Ok(())
            }
            Step::Wait { .. } | Step::Settle => Ok(()),
        }
    }
}

fn check_transition(transition: &TransitionArg) -> Result<(), String> {
    match transition.to_config() {
        Some(config) => config.validate().map_err(|e| e.to_string()),
        None => Ok(()),
    }
}

fn check_fade(fade: Option<&FadeOptions>) -> Result<(), String> {
    match fade {
        Some(options) => FadeConfig::from(options.clone())
            .validate()
            .map_err(|e| e.to_string()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "scenes": ["lobby", "hall", "roof"],
        "hotspots": [{ "uid": "door", "yaw": 120, "pitch": -5 }],
        "steps": [
            { "action": "goToScene", "uid": "hall", "transition": true },
            { "action": "settle" },
            { "action": "next", "transition": { "durationIn": "200ms", "delayBetweenInOut": 100 } },
            { "action": "fade", "value": 0.2, "options": { "duration": 500 } },
            { "action": "setVolume", "value": "0.5" },
            { "action": "goToView", "view": { "uid": "door", "durationMS": 300 } },
            { "action": "wait", "ms": 250 },
            { "action": "previous" }
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let scenario: Scenario = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(scenario.scenes.len(), 3);
        assert_eq!(scenario.steps.len(), 8);
        assert!(scenario.check().is_empty(), "{:?}", scenario.check());

        match &scenario.steps[0] {
            Step::GoToScene { uid, transition } => {
                assert_eq!(uid, "hall");
                assert_eq!(transition, &TransitionArg::Enabled(true));
            }
            other => panic!("unexpected step {other:?}"),
        }
        match &scenario.steps[2] {
            Step::Next { transition } => {
                let config = transition.to_config().unwrap();
                assert_eq!(config.duration_in.to_string(), "200ms");
                assert_eq!(config.duration_out.to_string(), "1500ms");
            }
            other => panic!("unexpected step {other:?}"),
        }
        match &scenario.steps[7] {
            Step::Previous { transition } => assert!(transition.to_config().is_none()),
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_invalid_duration_rejected_at_parse() {
        let text = r#"{
            "scenes": ["a", "b"],
            "steps": [{ "action": "goToScene", "uid": "b", "transition": { "durationIn": "fast" } }]
        }"#;
        assert!(serde_json::from_str::<Scenario>(text).is_err());
    }

    #[test]
    fn test_check_reports_issues() {
        let text = r#"{
            "scenes": ["a", "a"],
            "steps": [
                { "action": "goToScene", "uid": "zzz" },
                { "action": "fade", "value": 1.5 },
                { "action": "setVolume", "value": "loud" },
                { "action": "setVideoVolume", "value": 0.5 },
                { "action": "goToView", "view": { "uid": "nope" } },
                { "action": "next", "transition": { "cssClassName": "1x" } },
                { "action": "settle" }
            ]
        }"#;
        let scenario: Scenario = serde_json::from_str(text).unwrap();
        let issues = scenario.check();

        let steps: Vec<Option<usize>> = issues.iter().map(|i| i.step).collect();
        assert_eq!(
            steps,
            vec![None, Some(0), Some(1), Some(2), Some(3), Some(4), Some(5)]
        );
        assert_eq!(issues[1].to_string(), "步骤 1: 未知场景 'zzz'");
    }
}
