//! # Facade 模块
//!
//! 查看器引擎的能力接口。
//!
//! 核心不持有任何全局查看器句柄：宿主实现这些 trait，并把实现对象交给 [`ShortApi`]。
//! 场景图、相机、媒体、文档（DOM）四组能力分开定义，[`Facade`] 是它们的组合。
//!
//! 引擎通知（CSS 过渡结束、场景加载完成、相机动画完成）不通过 trait 回调，
//! 而是由宿主以 [`ViewerEvent`] 的形式交给 [`ShortApi::dispatch`]。
//!
//! [`ShortApi`]: crate::ShortApi
//! [`ShortApi::dispatch`]: crate::ShortApi::dispatch
//! [`ViewerEvent`]: crate::ViewerEvent

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::css::TransitionStylesheet;
use crate::easing::Easing;
use crate::error::{ApiError, ApiResult};

/// 元素引用类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// 场景
    Scene,
    /// 3D 热点
    Hotspot3D,
    /// DOM 热点
    HotspotDom,
    /// 其它（Story、Playlist、Action 等）
    Other(String),
}

impl ReferenceKind {
    /// 引擎中的类名
    pub fn class_name(&self) -> &str {
        match self {
            ReferenceKind::Scene => "Scene",
            ReferenceKind::Hotspot3D => "Hotspot3D",
            ReferenceKind::HotspotDom => "HotspotDOM",
            ReferenceKind::Other(name) => name,
        }
    }
}

/// 元素描述信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    /// 标题（名称）
    pub name: String,
    /// 描述
    #[serde(default)]
    pub description: String,
}

/// 球面坐标（角度）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SphericalPosition {
    pub yaw: f64,
    pub pitch: f64,
}

/// 场景媒体类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Image,
    Video,
    Grid,
}

/// 音量目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeTarget {
    /// 主音量
    #[default]
    Master,
    /// 当前场景的视频
    Scene,
    /// 当前播放列表
    Playlist,
}

impl VolumeTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeTarget::Master => "master",
            VolumeTarget::Scene => "scene",
            VolumeTarget::Playlist => "playlist",
        }
    }
}

impl fmt::Display for VolumeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VolumeTarget {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(Self::Master),
            "scene" => Ok(Self::Scene),
            "playlist" => Ok(Self::Playlist),
            _ => Err(ApiError::invalid_argument(format!(
                "音量目标必须是 \"master\"、\"playlist\" 或 \"scene\"，实际为 '{s}'"
            ))),
        }
    }
}

/// 相机补间请求
///
/// `None` 的角度分量保持当前值不变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookAt {
    pub yaw: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub fov: f64,
    pub duration_ms: f64,
    pub cancel_roll: bool,
    pub easing: Easing,
}

/// 场景图能力
pub trait SceneGraph {
    /// 当前场景 uid
    fn current_scene_id(&self) -> String;

    /// 故事中的场景 uid（按故事顺序）
    fn scenes(&self) -> Vec<String>;

    /// 查询 uid 对应的元素类型，未知 uid 返回 `None`
    fn reference_kind(&self, uid: &str) -> Option<ReferenceKind>;

    /// 加载场景，完成后引擎发出 `SceneLoadComplete`
    fn load_scene(&mut self, uid: &str) -> ApiResult<()>;

    /// 元素名称与描述
    fn element_info(&self, uid: &str) -> Option<ElementInfo>;

    /// 3D 热点位置
    fn hotspot_position(&self, uid: &str) -> Option<SphericalPosition>;

    fn locale(&self) -> String;

    fn set_locale(&mut self, locale: &str);

    fn projection(&self) -> String;

    fn set_projection(&mut self, projection: &str);

    /// uid 是否有效
    fn is_valid_reference(&self, uid: &str) -> bool {
        self.reference_kind(uid).is_some()
    }

    /// uid 是否为场景
    fn is_scene(&self, uid: &str) -> bool {
        self.reference_kind(uid) == Some(ReferenceKind::Scene)
    }
}

/// 相机能力
pub trait Camera {
    fn fov(&self) -> f64;

    fn yaw(&self) -> f64;

    fn pitch(&self) -> f64;

    /// 启动相机补间，结束时引擎发出 `CameraAnimationComplete`
    fn look_at(&mut self, request: &LookAt);
}

/// 媒体能力
pub trait Media {
    /// 当前场景的媒体类型
    fn media_type(&self) -> MediaType;

    /// 读取音量；目标不存在时返回 `None`
    fn volume(&self, target: VolumeTarget) -> Option<f64>;

    /// 写入音量
    fn set_volume(&mut self, target: VolumeTarget, value: f64);

    fn play_video(&mut self);

    fn pause_video(&mut self);

    fn stop_video(&mut self);

    /// 视频总时长（秒）
    fn video_duration(&self) -> Option<f64>;

    /// 视频当前播放位置（秒）
    fn video_current_time(&self) -> Option<f64>;

    fn play_playlist(&mut self);

    fn stop_playlist(&mut self);

    fn pause_playlist(&mut self);

    fn resume_playlist(&mut self);
}

/// 文档（DOM）能力
pub trait Document {
    /// 查看器容器元素 id
    fn container_id(&self) -> String;

    fn has_stylesheet(&self, id: &str) -> bool;

    fn append_stylesheet(&mut self, sheet: &TransitionStylesheet);

    /// 移除样式表，不存在时返回 `false`
    fn remove_stylesheet(&mut self, id: &str) -> bool;

    /// 给容器添加 class，CSS 过渡结束时引擎发出 `TransitionEnd`
    fn add_class(&mut self, class_name: &str);

    fn remove_class(&mut self, class_name: &str);
}

/// 查看器引擎的完整能力接口
pub trait Facade: SceneGraph + Camera + Media + Document {}

impl<T: SceneGraph + Camera + Media + Document> Facade for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_target_parse() {
        assert_eq!("scene".parse::<VolumeTarget>(), Ok(VolumeTarget::Scene));
        assert_eq!(VolumeTarget::Playlist.to_string(), "playlist");
        assert!(matches!(
            "music".parse::<VolumeTarget>(),
            Err(ApiError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_reference_kind_class_name() {
        assert_eq!(ReferenceKind::HotspotDom.class_name(), "HotspotDOM");
        assert_eq!(
            ReferenceKind::Other("Playlist".to_string()).class_name(),
            "Playlist"
        );
    }
}
