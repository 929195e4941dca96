//! # Sim 模块
//!
//! 内存中的模拟查看器，实现全部 facade trait。
//!
//! 每次可观察的调用都记录为一条 [`ViewerCall`]；`advance(dt)` 推进模拟时间，
//! 并返回这段时间内引擎会发出的通知（CSS 过渡结束、场景加载完成、相机补间完成）。
//! 宿主（或测试）把这些通知交给 `ShortApi::dispatch`。

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::css::TransitionStylesheet;
use crate::easing::Easing;
use crate::error::{ApiError, ApiResult};
use crate::events::ViewerEvent;
use crate::facade::{
    Camera, Document, ElementInfo, LookAt, Media, MediaType, ReferenceKind, SceneGraph,
    SphericalPosition, VolumeTarget,
};

/// 默认容器 id
pub const DEFAULT_CONTAINER_ID: &str = "viewer";
/// 默认 FOV
pub const DEFAULT_FOV: f64 = 90.0;

/// 模拟查看器记录的调用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum ViewerCall {
    StylesheetAppended { id: String, css: String },
    StylesheetRemoved { id: String },
    ClassAdded { name: String },
    ClassRemoved { name: String },
    LookAt(LookAt),
    LoadScene { uid: String },
    SetVolume { target: VolumeTarget, value: f64 },
    SetLocale { locale: String },
    SetProjection { projection: String },
    PlayVideo,
    PauseVideo,
    StopVideo,
    PlayPlaylist,
    StopPlaylist,
    PausePlaylist,
    ResumePlaylist,
}

/// 播放列表状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone)]
struct Element {
    kind: ReferenceKind,
    info: ElementInfo,
    position: Option<SphericalPosition>,
}

#[derive(Debug, Clone, Default)]
struct VideoState {
    /// 秒
    duration: f64,
    /// 秒
    position: f64,
    playing: bool,
}

#[derive(Debug, Clone, Copy)]
struct CameraTween {
    from: (f64, f64, f64),
    to: (f64, f64, f64),
    start: Duration,
    duration: Duration,
    easing: Easing,
}

#[derive(Debug, Clone, Copy)]
struct PendingEvent {
    at: Duration,
    seq: u64,
    event: ViewerEvent,
}

/// 内存中的模拟查看器
#[derive(Debug)]
pub struct MemoryViewer {
    scenes: Vec<String>,
    current: String,
    elements: HashMap<String, Element>,
    locale: String,
    projection: String,
    media_type: MediaType,
    volumes: HashMap<VolumeTarget, f64>,
    video: VideoState,
    playlist: PlaylistState,
    container_id: String,
    stylesheets: BTreeMap<String, TransitionStylesheet>,
    classes: Vec<String>,
    fov: f64,
    yaw: f64,
    pitch: f64,
    tween: Option<CameraTween>,
    now: Duration,
    pending: Vec<PendingEvent>,
    next_seq: u64,
    load_latency: Duration,
    fail_next_load: bool,
    log: Vec<ViewerCall>,
}

impl MemoryViewer {
    /// 按故事顺序创建场景，第一个场景为当前场景
    pub fn new<I, S>(scenes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scenes: Vec<String> = scenes.into_iter().map(Into::into).collect();
        let elements = scenes
            .iter()
            .map(|uid| {
                let element = Element {
                    kind: ReferenceKind::Scene,
                    info: ElementInfo {
                        name: uid.clone(),
                        description: String::new(),
                    },
                    position: None,
                };
                (uid.clone(), element)
            })
            .collect();

        Self {
            current: scenes.first().cloned().unwrap_or_default(),
            scenes,
            elements,
            locale: "en".to_string(),
            projection: "rectilinear".to_string(),
            media_type: MediaType::Image,
            volumes: HashMap::from([(VolumeTarget::Master, 1.0), (VolumeTarget::Playlist, 1.0)]),
            video: VideoState::default(),
            playlist: PlaylistState::Stopped,
            container_id: DEFAULT_CONTAINER_ID.to_string(),
            stylesheets: BTreeMap::new(),
            classes: Vec::new(),
            fov: DEFAULT_FOV,
            yaw: 0.0,
            pitch: 0.0,
            tween: None,
            now: Duration::ZERO,
            pending: Vec::new(),
            next_seq: 0,
            load_latency: Duration::ZERO,
            fail_next_load: false,
            log: Vec::new(),
        }
    }

    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = id.into();
        self
    }

    /// 场景加载到发出 `SceneLoadComplete` 之间的模拟延迟
    pub fn with_load_latency(mut self, latency: Duration) -> Self {
        self.load_latency = latency;
        self
    }

    pub fn with_fov(mut self, fov: f64) -> Self {
        self.fov = fov;
        self
    }

    pub fn add_hotspot_3d(&mut self, uid: impl Into<String>, yaw: f64, pitch: f64) {
        self.add_element(
            uid,
            ReferenceKind::Hotspot3D,
            Some(SphericalPosition { yaw, pitch }),
        );
    }

    pub fn add_hotspot_dom(&mut self, uid: impl Into<String>) {
        self.add_element(uid, ReferenceKind::HotspotDom, None);
    }

    /// 添加任意类型的元素
    pub fn add_element(
        &mut self,
        uid: impl Into<String>,
        kind: ReferenceKind,
        position: Option<SphericalPosition>,
    ) {
        let uid = uid.into();
        let element = Element {
            kind,
            info: ElementInfo {
                name: uid.clone(),
                description: String::new(),
            },
            position,
        };
        self.elements.insert(uid, element);
    }

    /// 设置元素的名称与描述；未知 uid 时返回 `false`
    pub fn set_info(&mut self, uid: &str, name: &str, description: &str) -> bool {
        let Some(element) = self.elements.get_mut(uid) else {
            return false;
        };
        element.info = ElementInfo {
            name: name.to_string(),
            description: description.to_string(),
        };
        true
    }

    /// 切换当前场景的媒体类型；视频场景带有独立的音量
    pub fn set_media_type(&mut self, media_type: MediaType) {
        self.media_type = media_type;
        if media_type == MediaType::Video {
            self.volumes.entry(VolumeTarget::Scene).or_insert(1.0);
        } else {
            self.volumes.remove(&VolumeTarget::Scene);
            self.video = VideoState::default();
        }
    }

    /// 设置视频时长（秒），同时把媒体类型切换为视频
    pub fn set_video_duration(&mut self, seconds: f64) {
        self.set_media_type(MediaType::Video);
        self.video.duration = seconds;
    }

    /// 下一次 `load_scene` 失败
    pub fn fail_next_load(&mut self) {
        self.fail_next_load = true;
    }

    /// 调用记录
    pub fn calls(&self) -> &[ViewerCall] {
        &self.log
    }

    /// 取出并清空调用记录
    pub fn take_calls(&mut self) -> Vec<ViewerCall> {
        std::mem::take(&mut self.log)
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes.iter().any(|c| c == class_name)
    }

    pub fn stylesheet(&self, id: &str) -> Option<&TransitionStylesheet> {
        self.stylesheets.get(id)
    }

    pub fn stylesheet_count(&self) -> usize {
        self.stylesheets.len()
    }

    pub fn playlist_state(&self) -> PlaylistState {
        self.playlist
    }

    pub fn is_video_playing(&self) -> bool {
        self.video.playing
    }

    /// 相机补间是否进行中
    pub fn is_camera_moving(&self) -> bool {
        self.tween.is_some()
    }

    /// 尚未发出的通知数
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// 模拟时间
    pub fn now(&self) -> Duration {
        self.now
    }

    /// 推进模拟时间，返回到期的通知（按到期时间与产生顺序）
    pub fn advance(&mut self, dt: Duration) -> Vec<ViewerEvent> {
        self.now += dt;
        self.update_camera();

        if self.video.playing {
            self.video.position = (self.video.position + dt.as_secs_f64()).min(self.video.duration);
            if self.video.position >= self.video.duration {
                self.video.playing = false;
            }
        }

        let now = self.now;
        let (mut due, rest): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|p| p.at <= now);
        self.pending = rest;
        due.sort_by_key(|p| (p.at, p.seq));
        due.into_iter().map(|p| p.event).collect()
    }

    fn schedule(&mut self, delay: Duration, event: ViewerEvent) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(PendingEvent {
            at: self.now + delay,
            seq,
            event,
        });
    }

    fn update_camera(&mut self) {
        let Some(tween) = self.tween else {
            return;
        };

        let elapsed = self.now.saturating_sub(tween.start);
        let t = if tween.duration.is_zero() {
            1.0
        } else {
            (elapsed.as_secs_f64() / tween.duration.as_secs_f64()).min(1.0)
        };
        let k = tween.easing.apply(t);
        let lerp = |a: f64, b: f64| a + (b - a) * k;

        self.fov = lerp(tween.from.0, tween.to.0);
        self.yaw = lerp(tween.from.1, tween.to.1);
        self.pitch = lerp(tween.from.2, tween.to.2);

        if t >= 1.0 {
            self.fov = tween.to.0;
            self.yaw = tween.to.1;
            self.pitch = tween.to.2;
            self.tween = None;
        }
    }

    /// 样式表中与 class 对应的过渡时长
    fn transition_duration(&self, class_name: &str, entering: bool) -> Option<Duration> {
        self.stylesheets
            .values()
            .find(|s| s.class_name == class_name && s.container_id == self.container_id)
            .map(|s| {
                if entering {
                    s.duration_in.as_duration()
                } else {
                    s.duration_out.as_duration()
                }
            })
    }
}

impl SceneGraph for MemoryViewer {
    fn current_scene_id(&self) -> String {
        self.current.clone()
    }

    fn scenes(&self) -> Vec<String> {
        self.scenes.clone()
    }

    fn reference_kind(&self, uid: &str) -> Option<ReferenceKind> {
        self.elements.get(uid).map(|e| e.kind.clone())
    }

    fn load_scene(&mut self, uid: &str) -> ApiResult<()> {
        if std::mem::take(&mut self.fail_next_load) {
            return Err(ApiError::unsupported(format!("场景 '{uid}' 加载失败")));
        }
        if !self.is_scene(uid) {
            return Err(ApiError::invalid_reference(uid));
        }

        self.current = uid.to_string();
        self.log.push(ViewerCall::LoadScene {
            uid: uid.to_string(),
        });
        self.schedule(self.load_latency, ViewerEvent::SceneLoadComplete);
        Ok(())
    }

    fn element_info(&self, uid: &str) -> Option<ElementInfo> {
        self.elements.get(uid).map(|e| e.info.clone())
    }

    fn hotspot_position(&self, uid: &str) -> Option<SphericalPosition> {
        self.elements.get(uid).and_then(|e| e.position)
    }

    fn locale(&self) -> String {
        self.locale.clone()
    }

    fn set_locale(&mut self, locale: &str) {
        self.locale = locale.to_string();
        self.log.push(ViewerCall::SetLocale {
            locale: locale.to_string(),
        });
    }

    fn projection(&self) -> String {
        self.projection.clone()
    }

    fn set_projection(&mut self, projection: &str) {
        self.projection = projection.to_string();
        self.log.push(ViewerCall::SetProjection {
            projection: projection.to_string(),
        });
    }
}

impl Camera for MemoryViewer {
    fn fov(&self) -> f64 {
        self.fov
    }

    fn yaw(&self) -> f64 {
        self.yaw
    }

    fn pitch(&self) -> f64 {
        self.pitch
    }

    fn look_at(&mut self, request: &LookAt) {
        self.log.push(ViewerCall::LookAt(request.clone()));

        // 新补间取代旧补间，旧补间不再发出完成通知
        self.pending
            .retain(|p| p.event != ViewerEvent::CameraAnimationComplete);

        let from = (self.fov, self.yaw, self.pitch);
        let to = (
            request.fov,
            request.yaw.unwrap_or(self.yaw),
            request.pitch.unwrap_or(self.pitch),
        );
        let millis = if request.duration_ms.is_finite() {
            request.duration_ms.max(0.0)
        } else {
            0.0
        };
        let duration = Duration::from_secs_f64(millis / 1000.0);
        self.tween = Some(CameraTween {
            from,
            to,
            start: self.now,
            duration,
            easing: request.easing,
        });
        if duration.is_zero() {
            self.update_camera();
        }
        self.schedule(duration, ViewerEvent::CameraAnimationComplete);
    }
}

impl Media for MemoryViewer {
    fn media_type(&self) -> MediaType {
        self.media_type
    }

    fn volume(&self, target: VolumeTarget) -> Option<f64> {
        self.volumes.get(&target).copied()
    }

    fn set_volume(&mut self, target: VolumeTarget, value: f64) {
        let Some(volume) = self.volumes.get_mut(&target) else {
            return;
        };
        *volume = value;
        self.log.push(ViewerCall::SetVolume { target, value });
    }

    fn play_video(&mut self) {
        if self.media_type == MediaType::Video {
            self.video.playing = true;
        }
        self.log.push(ViewerCall::PlayVideo);
    }

    fn pause_video(&mut self) {
        self.video.playing = false;
        self.log.push(ViewerCall::PauseVideo);
    }

    fn stop_video(&mut self) {
        self.video.playing = false;
        self.video.position = 0.0;
        self.log.push(ViewerCall::StopVideo);
    }

    fn video_duration(&self) -> Option<f64> {
        (self.media_type == MediaType::Video).then_some(self.video.duration)
    }

    fn video_current_time(&self) -> Option<f64> {
        (self.media_type == MediaType::Video).then_some(self.video.position)
    }

    fn play_playlist(&mut self) {
        self.playlist = PlaylistState::Playing;
        self.log.push(ViewerCall::PlayPlaylist);
    }

    fn stop_playlist(&mut self) {
        self.playlist = PlaylistState::Stopped;
        self.log.push(ViewerCall::StopPlaylist);
    }

    fn pause_playlist(&mut self) {
        if self.playlist == PlaylistState::Playing {
            self.playlist = PlaylistState::Paused;
        }
        self.log.push(ViewerCall::PausePlaylist);
    }

    fn resume_playlist(&mut self) {
        if self.playlist == PlaylistState::Paused {
            self.playlist = PlaylistState::Playing;
        }
        self.log.push(ViewerCall::ResumePlaylist);
    }
}

impl Document for MemoryViewer {
    fn container_id(&self) -> String {
        self.container_id.clone()
    }

    fn has_stylesheet(&self, id: &str) -> bool {
        self.stylesheets.contains_key(id)
    }

    fn append_stylesheet(&mut self, sheet: &TransitionStylesheet) {
        self.log.push(ViewerCall::StylesheetAppended {
            id: sheet.id.clone(),
            css: sheet.to_css(),
        });
        self.stylesheets.insert(sheet.id.clone(), sheet.clone());
    }

    fn remove_stylesheet(&mut self, id: &str) -> bool {
        if self.stylesheets.remove(id).is_none() {
            return false;
        }
        self.log.push(ViewerCall::StylesheetRemoved { id: id.to_string() });
        true
    }

    fn add_class(&mut self, class_name: &str) {
        self.log.push(ViewerCall::ClassAdded {
            name: class_name.to_string(),
        });
        if self.has_class(class_name) {
            return;
        }
        self.classes.push(class_name.to_string());
        if let Some(duration) = self.transition_duration(class_name, true) {
            self.schedule(duration, ViewerEvent::TransitionEnd);
        }
    }

    fn remove_class(&mut self, class_name: &str) {
        self.log.push(ViewerCall::ClassRemoved {
            name: class_name.to_string(),
        });
        let before = self.classes.len();
        self.classes.retain(|c| c != class_name);
        if self.classes.len() != before
            && let Some(duration) = self.transition_duration(class_name, false)
        {
            self.schedule(duration, ViewerEvent::TransitionEnd);
        }
    }
}
