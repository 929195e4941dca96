//! # Api 模块
//!
//! [`ShortApi`]：查看器便捷 API 的入口。
//!
//! 持有宿主提供的 facade、监听者与定时器，以及两个编排器（场景过渡、音量渐变）。
//! 宿主需要把引擎通知交给 [`ShortApi::dispatch`]，把经过的时间交给 [`ShortApi::advance`]。
//!
//! 所有公开操作先完成参数检查，再修改 facade；失败时通过 `warn!` 记录并返回错误。

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::camera::LookAtConfig;
use crate::error::{ApiError, ApiResult};
use crate::events::ViewerEvent;
use crate::facade::{ElementInfo, Facade, MediaType, ReferenceKind, SphericalPosition, VolumeTarget};
use crate::fade::{self, FadeConfig, FadeOutcome, VolumeFader, check_volume, parse_volume};
use crate::scheduler::{Listener, Scheduler, Task};
use crate::transition::{SceneChange, TransitionConfig, TransitionOrchestrator, TransitionPhase};

/// 当前场景在故事中的前后场景
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousNext {
    /// 第一个场景时为 `None`
    pub previous: Option<String>,
    pub current: String,
    /// 最后一个场景时为 `None`
    pub next: Option<String>,
}

/// 查看器便捷 API
#[derive(Debug)]
pub struct ShortApi<F: Facade> {
    facade: F,
    scheduler: Scheduler,
    transitions: TransitionOrchestrator,
    fader: VolumeFader,
}

impl<F: Facade> ShortApi<F> {
    pub fn new(facade: F) -> Self {
        Self {
            facade,
            scheduler: Scheduler::new(),
            transitions: TransitionOrchestrator::new(),
            fader: VolumeFader::new(),
        }
    }

    pub fn facade(&self) -> &F {
        &self.facade
    }

    pub fn facade_mut(&mut self) -> &mut F {
        &mut self.facade
    }

    pub fn into_facade(self) -> F {
        self.facade
    }

    // =========================================================================
    // 通知与时间
    // =========================================================================

    /// 投递一条引擎通知
    ///
    /// 取出该类通知的全部监听者（自动注销）并按登记顺序处理。
    /// 处理过程中新登记的监听者不会被本次投递触发。
    pub fn dispatch(&mut self, event: ViewerEvent) -> ApiResult<()> {
        let listeners = self.scheduler.take_listeners(event);
        if listeners.is_empty() {
            debug!(event = ?event, "没有等待该通知的监听者");
            return Ok(());
        }

        let mut result = Ok(());
        for (id, listener) in listeners {
            match listener {
                Listener::CameraEnd(mut on_end) => on_end.call(),
                listener => {
                    let outcome = self.transitions.on_listener(
                        &mut self.facade,
                        &mut self.scheduler,
                        id,
                        &listener,
                    );
                    if let Err(e) = outcome {
                        warn!(event = ?event, error = %e, "处理引擎通知失败");
                        if result.is_ok() {
                            result = Err(e);
                        }
                    }
                }
            }
        }
        result
    }

    /// 推进虚拟时钟，依次执行到期的定时任务
    pub fn advance(&mut self, dt: Duration) {
        let deadline = self.scheduler.now() + dt;
        while let Some((id, task)) = self.scheduler.pop_due(deadline) {
            match task {
                Task::TransitionOutStart => {
                    self.transitions
                        .on_delay_elapsed(&mut self.facade, &mut self.scheduler, id);
                }
                Task::FadeTick(target) => {
                    self.fader
                        .on_tick(&mut self.facade, &mut self.scheduler, target);
                }
            }
        }
    }

    /// 虚拟时钟当前时间
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// 是否有进行中的场景过渡
    pub fn is_transitioning(&self) -> bool {
        self.transitions.is_active()
    }

    pub fn transition_phase(&self) -> TransitionPhase {
        self.transitions.phase()
    }

    /// 目标上是否有进行中的音量渐变
    pub fn is_fading(&self, target: VolumeTarget) -> bool {
        self.fader.is_fading(target)
    }

    /// 活跃的定时器数
    pub fn pending_timers(&self) -> usize {
        self.scheduler.active_timers()
    }

    /// 等待某类通知的监听者数
    pub fn pending_listeners(&self, event: ViewerEvent) -> usize {
        self.scheduler.pending_listeners(event)
    }

    /// 没有进行中的过渡、渐变、监听者或定时器
    pub fn is_idle(&self) -> bool {
        !self.transitions.is_active()
            && self.scheduler.active_timers() == 0
            && [
                ViewerEvent::TransitionEnd,
                ViewerEvent::SceneLoadComplete,
                ViewerEvent::CameraAnimationComplete,
            ]
            .into_iter()
            .all(|e| self.scheduler.pending_listeners(e) == 0)
    }

    // =========================================================================
    // 场景切换
    // =========================================================================

    /// 切换到指定场景
    ///
    /// `transition` 为 `None` 时直接加载；否则执行带 CSS 过渡的切换。
    pub fn go_to_scene(
        &mut self,
        uid: &str,
        transition: Option<TransitionConfig>,
    ) -> ApiResult<SceneChange> {
        self.transitions
            .request_scene_change(&mut self.facade, &mut self.scheduler, uid, transition)
            .inspect_err(|e| warn!(uid = %uid, error = %e, "场景切换失败"))
    }

    /// 切换到下一个场景；已是最后一个场景时返回 `Ok(None)`
    pub fn go_to_next_scene(
        &mut self,
        transition: Option<TransitionConfig>,
    ) -> ApiResult<Option<SceneChange>> {
        match self.next_scene_id()? {
            Some(uid) => self.go_to_scene(&uid, transition).map(Some),
            None => Ok(None),
        }
    }

    /// 切换到上一个场景；已是第一个场景时返回 `Ok(None)`
    pub fn go_to_previous_scene(
        &mut self,
        transition: Option<TransitionConfig>,
    ) -> ApiResult<Option<SceneChange>> {
        match self.previous_scene_id()? {
            Some(uid) => self.go_to_scene(&uid, transition).map(Some),
            None => Ok(None),
        }
    }

    /// 切换到故事的第一个场景；已在第一个场景时返回 `Ok(None)`
    pub fn go_to_first_scene(
        &mut self,
        transition: Option<TransitionConfig>,
    ) -> ApiResult<Option<SceneChange>> {
        let Some(first) = self.facade.scenes().into_iter().next() else {
            return Ok(None);
        };
        if first == self.facade.current_scene_id() {
            return Ok(None);
        }
        self.go_to_scene(&first, transition).map(Some)
    }

    /// 切换到故事的最后一个场景；已在最后一个场景时返回 `Ok(None)`
    pub fn go_to_last_scene(
        &mut self,
        transition: Option<TransitionConfig>,
    ) -> ApiResult<Option<SceneChange>> {
        let Some(last) = self.facade.scenes().pop() else {
            return Ok(None);
        };
        if last == self.facade.current_scene_id() {
            return Ok(None);
        }
        self.go_to_scene(&last, transition).map(Some)
    }

    /// 当前场景的前后场景
    pub fn previous_next(&self) -> ApiResult<PreviousNext> {
        let current = self.facade.current_scene_id();
        let scenes = self.facade.scenes();
        let Some(index) = scenes.iter().position(|s| *s == current) else {
            return Err(ApiError::invalid_reference(current));
        };

        Ok(PreviousNext {
            previous: index.checked_sub(1).map(|i| scenes[i].clone()),
            next: scenes.get(index + 1).cloned(),
            current,
        })
    }

    pub fn next_scene_id(&self) -> ApiResult<Option<String>> {
        self.previous_next().map(|p| p.next)
    }

    pub fn previous_scene_id(&self) -> ApiResult<Option<String>> {
        self.previous_next().map(|p| p.previous)
    }

    /// 场景是否为故事的第一个场景；`uid` 为 `None` 时使用当前场景
    pub fn is_first_story_scene(&self, uid: Option<&str>) -> ApiResult<bool> {
        let uid = self.scene_or_current(uid)?;
        Ok(self.facade.scenes().first() == Some(&uid))
    }

    /// 场景是否为故事的最后一个场景；`uid` 为 `None` 时使用当前场景
    pub fn is_last_story_scene(&self, uid: Option<&str>) -> ApiResult<bool> {
        let uid = self.scene_or_current(uid)?;
        Ok(self.facade.scenes().last() == Some(&uid))
    }

    fn scene_or_current(&self, uid: Option<&str>) -> ApiResult<String> {
        let uid = uid.map_or_else(|| self.facade.current_scene_id(), str::to_string);
        if !self.facade.is_scene(&uid) {
            return Err(ApiError::invalid_reference(uid));
        }
        Ok(uid)
    }

    // =========================================================================
    // 相机
    // =========================================================================

    /// 相机补间到指定视角
    ///
    /// `on_start` 立即触发；`on_end` 在下一次 `CameraAnimationComplete` 时触发。
    pub fn go_to_view(&mut self, config: LookAtConfig) -> ApiResult<()> {
        let request = config
            .resolve(&self.facade)
            .inspect_err(|e| warn!(error = %e, "相机补间参数无效"))?;

        let LookAtConfig {
            mut on_start,
            on_end,
            ..
        } = config;
        on_start.call();
        self.scheduler
            .subscribe_once(ViewerEvent::CameraAnimationComplete, Listener::CameraEnd(on_end));
        self.facade.look_at(&request);
        debug!(fov = request.fov, duration_ms = request.duration_ms, "开始相机补间");
        Ok(())
    }

    pub fn fov(&self) -> f64 {
        self.facade.fov()
    }

    pub fn yaw(&self) -> f64 {
        self.facade.yaw()
    }

    pub fn pitch(&self) -> f64 {
        self.facade.pitch()
    }

    // =========================================================================
    // 音量
    // =========================================================================

    /// 从目标当前音量渐变到 `target_value`
    pub fn fade(&mut self, target_value: f64, config: FadeConfig) -> ApiResult<FadeOutcome> {
        let result = check_volume(target_value)
            .and_then(|_| config.validate())
            .and_then(|_| fade::resolve_target(&self.facade, config.target));
        let current = match result {
            Ok(current) => current,
            Err(e) => {
                warn!(target = %config.target, value = target_value, error = %e, "音量渐变失败");
                return Err(e);
            }
        };

        self.fader
            .fade(&mut self.facade, &mut self.scheduler, current, target_value, config)
    }

    /// 设置主音量；带渐变参数时改为渐变
    ///
    /// 直接设置会取消主音量上进行中的渐变。
    pub fn set_volume(&mut self, value: f64, fading: Option<FadeConfig>) -> ApiResult<FadeOutcome> {
        if let Some(config) = fading {
            return self.fade(value, config);
        }

        check_volume(value).inspect_err(|e| warn!(error = %e, "设置音量失败"))?;
        self.fader.cancel(&mut self.scheduler, VolumeTarget::Master);
        self.facade.set_volume(VolumeTarget::Master, value);
        Ok(FadeOutcome::Immediate)
    }

    /// 以文本形式设置主音量（`"0.5"`）
    pub fn set_volume_text(
        &mut self,
        text: &str,
        fading: Option<FadeConfig>,
    ) -> ApiResult<FadeOutcome> {
        let value = parse_volume(text).inspect_err(|e| warn!(error = %e, "设置音量失败"))?;
        self.set_volume(value, fading)
    }

    /// 设置当前视频场景的音量；带渐变参数时改为渐变（目标强制为视频）
    pub fn set_video_volume(
        &mut self,
        value: f64,
        fading: Option<FadeConfig>,
    ) -> ApiResult<FadeOutcome> {
        match fading {
            Some(config) => self.fade(value, config.with_target(VolumeTarget::Scene)),
            None => {
                check_volume(value)
                    .and_then(|_| fade::resolve_target(&self.facade, VolumeTarget::Scene))
                    .inspect_err(|e| warn!(error = %e, "设置视频音量失败"))?;
                self.fader.cancel(&mut self.scheduler, VolumeTarget::Scene);
                self.facade.set_volume(VolumeTarget::Scene, value);
                Ok(FadeOutcome::Immediate)
            }
        }
    }

    /// 读取音量
    pub fn volume(&self, target: VolumeTarget) -> ApiResult<f64> {
        fade::resolve_target(&self.facade, target)
    }

    /// 读取当前视频场景的音量
    pub fn video_volume(&self) -> ApiResult<f64> {
        self.volume(VolumeTarget::Scene)
    }

    // =========================================================================
    // 元素查询
    // =========================================================================

    pub fn current_scene_id(&self) -> String {
        self.facade.current_scene_id()
    }

    pub fn projection(&self) -> String {
        self.facade.projection()
    }

    pub fn set_projection(&mut self, projection: &str) {
        self.facade.set_projection(projection);
    }

    pub fn locale(&self) -> String {
        self.facade.locale()
    }

    pub fn set_locale(&mut self, locale: &str) {
        self.facade.set_locale(locale);
    }

    /// 元素在引擎中的类名
    pub fn class_name(&self, uid: &str) -> ApiResult<String> {
        self.reference(uid).map(|k| k.class_name().to_string())
    }

    /// 热点类型；不是热点时返回 `InvalidReference`
    pub fn hotspot_type(&self, uid: &str) -> ApiResult<ReferenceKind> {
        match self.reference(uid)? {
            kind @ (ReferenceKind::Hotspot3D | ReferenceKind::HotspotDom) => Ok(kind),
            _ => Err(ApiError::invalid_reference(uid)),
        }
    }

    pub fn is_hotspot_3d(&self, uid: &str) -> bool {
        self.facade.reference_kind(uid) == Some(ReferenceKind::Hotspot3D)
    }

    pub fn is_hotspot_dom(&self, uid: &str) -> bool {
        self.facade.reference_kind(uid) == Some(ReferenceKind::HotspotDom)
    }

    pub fn is_scene(&self, uid: &str) -> bool {
        self.facade.is_scene(uid)
    }

    /// 3D 热点的球面位置
    pub fn hotspot_3d_world(&self, uid: &str) -> ApiResult<SphericalPosition> {
        if !self.is_hotspot_3d(uid) {
            return Err(ApiError::invalid_reference(uid));
        }
        self.facade
            .hotspot_position(uid)
            .ok_or_else(|| ApiError::invalid_reference(uid))
    }

    /// 元素标题；`uid` 为 `None` 时使用当前场景
    pub fn title(&self, uid: Option<&str>) -> ApiResult<String> {
        self.info(uid).map(|i| i.name)
    }

    /// 元素描述；`uid` 为 `None` 时使用当前场景
    pub fn description(&self, uid: Option<&str>) -> ApiResult<String> {
        self.info(uid).map(|i| i.description)
    }

    fn info(&self, uid: Option<&str>) -> ApiResult<ElementInfo> {
        let uid = uid.map_or_else(|| self.facade.current_scene_id(), str::to_string);
        self.facade
            .element_info(&uid)
            .ok_or_else(|| ApiError::invalid_reference(uid))
    }

    fn reference(&self, uid: &str) -> ApiResult<ReferenceKind> {
        self.facade
            .reference_kind(uid)
            .ok_or_else(|| ApiError::invalid_reference(uid))
    }

    // =========================================================================
    // 媒体
    // =========================================================================

    pub fn media_type(&self) -> MediaType {
        self.facade.media_type()
    }

    pub fn play_video(&mut self) -> ApiResult<()> {
        self.require_video()?;
        self.facade.play_video();
        Ok(())
    }

    pub fn pause_video(&mut self) -> ApiResult<()> {
        self.require_video()?;
        self.facade.pause_video();
        Ok(())
    }

    pub fn stop_video(&mut self) -> ApiResult<()> {
        self.require_video()?;
        self.facade.stop_video();
        Ok(())
    }

    /// 视频总时长（秒）
    pub fn video_duration(&self) -> ApiResult<f64> {
        self.require_video()?;
        self.facade
            .video_duration()
            .ok_or_else(|| ApiError::unsupported("视频时长不可用"))
    }

    /// 视频当前播放位置（秒）
    pub fn video_current_time(&self) -> ApiResult<f64> {
        self.require_video()?;
        self.facade
            .video_current_time()
            .ok_or_else(|| ApiError::unsupported("视频播放位置不可用"))
    }

    pub fn play_playlist(&mut self) {
        self.facade.play_playlist();
    }

    pub fn stop_playlist(&mut self) {
        self.facade.stop_playlist();
    }

    pub fn pause_playlist(&mut self) {
        self.facade.pause_playlist();
    }

    pub fn resume_playlist(&mut self) {
        self.facade.resume_playlist();
    }

    fn require_video(&self) -> ApiResult<()> {
        if self.facade.media_type() != MediaType::Video {
            return Err(ApiError::unsupported("当前场景不是视频"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::MemoryViewer;

    fn api() -> ShortApi<MemoryViewer> {
        ShortApi::new(MemoryViewer::new(["a", "b", "c"]))
    }

    #[test]
    fn test_previous_next() {
        let mut api = api();
        assert_eq!(
            api.previous_next().unwrap(),
            PreviousNext {
                previous: None,
                current: "a".to_string(),
                next: Some("b".to_string()),
            }
        );

        api.go_to_last_scene(None).unwrap();
        assert_eq!(api.next_scene_id().unwrap(), None);
        assert_eq!(api.previous_scene_id().unwrap(), Some("b".to_string()));
        assert!(api.is_last_story_scene(None).unwrap());
        assert!(!api.is_first_story_scene(None).unwrap());
        assert!(api.is_first_story_scene(Some("a")).unwrap());
    }

    #[test]
    fn test_navigation_boundaries() {
        let mut api = api();
        assert_eq!(api.go_to_previous_scene(None), Ok(None));
        assert_eq!(api.go_to_first_scene(None), Ok(None));
        assert_eq!(api.go_to_next_scene(None), Ok(Some(SceneChange::Immediate)));
        assert_eq!(api.current_scene_id(), "b");
        assert_eq!(api.go_to_last_scene(None), Ok(Some(SceneChange::Immediate)));
        assert_eq!(api.go_to_next_scene(None), Ok(None));
        assert_eq!(api.go_to_last_scene(None), Ok(None));
    }

    #[test]
    fn test_story_queries_reject_non_scene() {
        let mut api = api();
        api.facade_mut().add_hotspot_dom("info");
        assert_eq!(
            api.is_first_story_scene(Some("info")),
            Err(ApiError::invalid_reference("info"))
        );
    }

    #[test]
    fn test_element_queries() {
        let mut api = api();
        api.facade_mut().add_hotspot_3d("door", 45.0, 5.0);
        api.facade_mut().add_hotspot_dom("label");
        api.facade_mut().set_info("a", "Lobby", "Main entrance");

        assert_eq!(api.class_name("a").unwrap(), "Scene");
        assert_eq!(api.class_name("door").unwrap(), "Hotspot3D");
        assert_eq!(api.hotspot_type("label").unwrap(), ReferenceKind::HotspotDom);
        assert!(api.hotspot_type("a").is_err());
        assert!(api.is_hotspot_3d("door"));
        assert!(!api.is_hotspot_dom("door"));
        assert_eq!(
            api.hotspot_3d_world("door").unwrap(),
            SphericalPosition {
                yaw: 45.0,
                pitch: 5.0
            }
        );
        assert!(api.hotspot_3d_world("label").is_err());
        assert_eq!(api.title(None).unwrap(), "Lobby");
        assert_eq!(api.description(Some("a")).unwrap(), "Main entrance");
        assert_eq!(api.title(Some("nope")), Err(ApiError::invalid_reference("nope")));
    }

    #[test]
    fn test_set_volume_immediate() {
        let mut api = api();
        assert_eq!(api.set_volume(0.3, None), Ok(FadeOutcome::Immediate));
        assert_eq!(api.volume(VolumeTarget::Master), Ok(0.3));

        assert_eq!(
            api.set_volume(1.5, None),
            Err(ApiError::OutOfRange { value: 1.5 })
        );
        assert_eq!(api.volume(VolumeTarget::Master), Ok(0.3));

        assert_eq!(api.set_volume_text("0.7", None), Ok(FadeOutcome::Immediate));
        assert_eq!(api.volume(VolumeTarget::Master), Ok(0.7));
        assert!(matches!(
            api.set_volume_text("abc", None),
            Err(ApiError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_video_controls_require_video() {
        let mut api = api();
        assert!(matches!(
            api.play_video(),
            Err(ApiError::UnsupportedOperation { .. })
        ));
        assert!(api.video_volume().is_err());

        api.facade_mut().set_video_duration(30.0);
        api.play_video().unwrap();
        assert_eq!(api.video_duration(), Ok(30.0));
        assert_eq!(api.set_video_volume(0.4, None), Ok(FadeOutcome::Immediate));
        assert_eq!(api.video_volume(), Ok(0.4));
    }

    #[test]
    fn test_go_to_view_callbacks() {
        use std::cell::Cell;
        use std::rc::Rc;

        let mut api = api();
        let started = Rc::new(Cell::new(0));
        let ended = Rc::new(Cell::new(0));
        let (s, e) = (started.clone(), ended.clone());

        let config = LookAtConfig {
            yaw: Some(90.0),
            duration_ms: 500.0,
            ..Default::default()
        }
        .on_start(move || s.set(s.get() + 1))
        .on_end(move || e.set(e.get() + 1));
        api.go_to_view(config).unwrap();

        assert_eq!(started.get(), 1);
        assert_eq!(ended.get(), 0);
        assert_eq!(api.pending_listeners(ViewerEvent::CameraAnimationComplete), 1);

        for event in api.facade_mut().advance(Duration::from_millis(500)) {
            api.dispatch(event).unwrap();
        }
        assert_eq!(ended.get(), 1);
        assert_eq!(api.yaw(), 90.0);
        assert!(api.is_idle());
    }

    #[test]
    fn test_go_to_view_invalid_duration_has_no_effect() {
        let mut api = api();
        let config = LookAtConfig {
            duration_ms: f64::INFINITY,
            ..Default::default()
        };
        assert!(api.go_to_view(config).is_err());
        assert!(api.facade().calls().is_empty());
        assert!(api.is_idle());
    }
}
