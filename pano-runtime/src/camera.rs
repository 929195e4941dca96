//! # Camera 模块
//!
//! 相机补间请求（`go_to_view`）的参数合并与 FOV 缓动。

use serde::{Deserialize, Serialize};

use crate::callback::Callback;
use crate::easing::Easing;
use crate::error::{ApiError, ApiResult};
use crate::facade::{Camera, LookAt, ReferenceKind, SceneGraph};

/// 默认补间时长（毫秒）
pub const DEFAULT_LOOK_AT_DURATION_MS: f64 = 2000.0;

/// `go_to_view` 参数
#[derive(Debug)]
pub struct LookAtConfig {
    pub yaw: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    /// `None` 表示保持当前 FOV
    pub fov: Option<f64>,
    pub duration_ms: f64,
    pub cancel_roll: bool,
    pub easing: Easing,
    /// 3D 热点 uid，有效时用热点位置覆盖 yaw / pitch
    pub uid: Option<String>,
    pub on_start: Callback,
    pub on_end: Callback,
}

impl Default for LookAtConfig {
    fn default() -> Self {
        Self {
            yaw: None,
            pitch: None,
            roll: None,
            fov: None,
            duration_ms: DEFAULT_LOOK_AT_DURATION_MS,
            cancel_roll: false,
            easing: Easing::default(),
            uid: None,
            on_start: Callback::noop(),
            on_end: Callback::noop(),
        }
    }
}

impl LookAtConfig {
    pub fn from_options(options: LookAtOptions) -> Self {
        let mut config = Self::default();
        config.merge(options);
        config
    }

    /// 逐字段覆盖，只处理已知字段
    pub fn merge(&mut self, options: LookAtOptions) {
        let LookAtOptions {
            yaw,
            pitch,
            roll,
            fov,
            duration_ms,
            cancel_roll,
            easing,
            uid,
        } = options;

        if yaw.is_some() {
            self.yaw = yaw;
        }
        if pitch.is_some() {
            self.pitch = pitch;
        }
        if roll.is_some() {
            self.roll = roll;
        }
        if fov.is_some() {
            self.fov = fov;
        }
        if let Some(v) = duration_ms {
            self.duration_ms = v;
        }
        if let Some(v) = cancel_roll {
            self.cancel_roll = v;
        }
        if let Some(v) = easing {
            self.easing = v;
        }
        if uid.is_some() {
            self.uid = uid;
        }
    }

    pub fn on_start(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_start = Callback::new(f);
        self
    }

    pub fn on_end(mut self, f: impl FnMut() + 'static) -> Self {
        self.on_end = Callback::new(f);
        self
    }

    /// 解析为引擎补间请求
    ///
    /// 不修改任何状态；参数非法时返回 `InvalidArgument`。
    pub fn resolve<F: SceneGraph + Camera>(&self, facade: &F) -> ApiResult<LookAt> {
        if !self.duration_ms.is_finite() || self.duration_ms < 0.0 {
            return Err(ApiError::invalid_argument(format!(
                "补间时长必须是非负有限值，实际为 {}",
                self.duration_ms
            )));
        }

        let fov = self.fov.unwrap_or_else(|| facade.fov());
        if !fov.is_finite() || fov <= 0.0 {
            return Err(ApiError::invalid_argument(format!("无效的 FOV {fov}")));
        }

        let (mut yaw, mut pitch) = (self.yaw, self.pitch);
        if let Some(uid) = &self.uid
            && facade.reference_kind(uid) == Some(ReferenceKind::Hotspot3D)
            && let Some(position) = facade.hotspot_position(uid)
        {
            yaw = Some(position.yaw);
            pitch = Some(position.pitch);
        }

        Ok(LookAt {
            yaw,
            pitch,
            roll: self.roll,
            fov,
            duration_ms: self.duration_ms,
            cancel_roll: self.cancel_roll,
            easing: self.easing,
        })
    }
}

/// `go_to_view` 参数的部分覆盖（JSON 形式）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookAtOptions {
    #[serde(default)]
    pub yaw: Option<f64>,
    #[serde(default)]
    pub pitch: Option<f64>,
    #[serde(default)]
    pub roll: Option<f64>,
    #[serde(default)]
    pub fov: Option<f64>,
    #[serde(default, alias = "durationMS")]
    pub duration_ms: Option<f64>,
    #[serde(default)]
    pub cancel_roll: Option<bool>,
    #[serde(default)]
    pub easing: Option<Easing>,
    #[serde(default)]
    pub uid: Option<String>,
}

impl From<LookAtOptions> for LookAtConfig {
    fn from(options: LookAtOptions) -> Self {
        Self::from_options(options)
    }
}

/// 只改变 FOV 的补间
pub(crate) fn ease_fov<F: Camera>(facade: &mut F, fov: f64, duration_ms: f64, easing: Easing) {
    let request = LookAt {
        yaw: None,
        pitch: None,
        roll: None,
        fov,
        duration_ms,
        cancel_roll: false,
        easing,
    };
    facade.look_at(&request);
}
