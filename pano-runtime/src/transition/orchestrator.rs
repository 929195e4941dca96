//! 场景切换状态机

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::camera::ease_fov;
use crate::css::TransitionStylesheet;
use crate::easing::Easing;
use crate::error::{ApiError, ApiResult};
use crate::events::{ListenerId, ViewerEvent};
use crate::facade::Facade;
use crate::scheduler::{Listener, Scheduler, Task};
use crate::timer::TimerId;

use super::config::TransitionConfig;

/// transition-in 开始时 FOV 压缩比例（拉近）
pub const FOV_ZOOM_IN_FACTOR: f64 = 1.2;
/// transition-in 压缩时长（毫秒）
pub const FOV_ZOOM_IN_MS: f64 = 800.0;
/// transition-in 结束时 FOV 回弹比例（瞬时）
pub const FOV_SNAP_FACTOR: f64 = 1.1;
/// transition-out 开始时 FOV 收缩比例
pub const FOV_SETTLE_FACTOR: f64 = 1.1;
/// transition-out 收缩时长（毫秒）
pub const FOV_SETTLE_MS: f64 = 1200.0;

/// 场景切换请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneChange {
    /// 目标就是当前场景，未做任何操作
    AlreadyCurrent,
    /// 无过渡，已直接加载
    Immediate,
    /// 过渡会话已开始
    Transitioning,
}

/// 过渡阶段
///
/// ```text
/// Idle → InStarted → Loading → (Delay) → OutStarted → Idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhase {
    /// 空闲状态
    Idle,
    /// 已添加 class，等待 transition-in 结束
    InStarted,
    /// 已发出加载，等待场景加载完成
    Loading,
    /// 场景已加载，等待 in/out 之间的延迟
    Delay,
    /// 已移除 class，等待 transition-out 结束
    OutStarted,
}

/// 一次场景切换的会话状态
#[derive(Debug)]
struct TransitionSession {
    target: String,
    config: TransitionConfig,
    phase: TransitionPhase,
    /// 已注入的样式表 id；移除后置空
    stylesheet: Option<String>,
    /// 容器上的 `transitionend` 监听者
    transition_listener: Option<ListenerId>,
    /// 场景加载完成监听者
    load_listener: Option<ListenerId>,
    delay_timer: Option<TimerId>,
}

impl TransitionSession {
    /// 移除注入的样式表（幂等）；已被外部移除时仍视为完成，`on_transition_out_end` 照常触发
    fn release_stylesheet<F: Facade>(&mut self, facade: &mut F) {
        let Some(id) = self.stylesheet.take() else {
            return;
        };
        if !facade.remove_stylesheet(&id) {
            debug!(id = %id, "样式表已被移除，跳过");
        }
    }
}

/// 场景切换编排器
///
/// 同一时间只允许一个过渡会话；会话进行中的新请求返回 `Busy`。
#[derive(Debug, Default)]
pub struct TransitionOrchestrator {
    session: Option<TransitionSession>,
}

impl TransitionOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前阶段
    pub fn phase(&self) -> TransitionPhase {
        self.session
            .as_ref()
            .map_or(TransitionPhase::Idle, |s| s.phase)
    }

    /// 是否有进行中的过渡
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// 进行中过渡的目标场景
    pub fn target(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.target.as_str())
    }

    /// 请求切换场景
    ///
    /// 所有检查都在任何文档 / 场景修改之前完成。
    pub(crate) fn request_scene_change<F: Facade>(
        &mut self,
        facade: &mut F,
        scheduler: &mut Scheduler,
        target: &str,
        transition: Option<TransitionConfig>,
    ) -> ApiResult<SceneChange> {
        if target.is_empty() {
            return Err(ApiError::invalid_argument("场景 uid 不能为空"));
        }
        if !facade.is_scene(target) {
            return Err(ApiError::invalid_reference(target));
        }
        if let Some(session) = &self.session {
            return Err(ApiError::busy(format!("transition -> {}", session.target)));
        }
        if facade.current_scene_id() == target {
            info!(uid = %target, "目标就是当前场景");
            return Ok(SceneChange::AlreadyCurrent);
        }

        let Some(config) = transition else {
            facade.load_scene(target)?;
            debug!(uid = %target, "直接加载场景");
            return Ok(SceneChange::Immediate);
        };

        config.validate()?;
        if facade.has_stylesheet(&config.css_stylesheet_id) {
            return Err(ApiError::busy(format!(
                "stylesheet #{}",
                config.css_stylesheet_id
            )));
        }

        let sheet = TransitionStylesheet {
            id: config.css_stylesheet_id.clone(),
            container_id: facade.container_id(),
            class_name: config.css_class_name.clone(),
            duration_in: config.duration_in,
            duration_out: config.duration_out,
        };
        facade.append_stylesheet(&sheet);

        let listener =
            scheduler.subscribe_once(ViewerEvent::TransitionEnd, Listener::TransitionInEnd);
        facade.add_class(&config.css_class_name);

        let mut session = TransitionSession {
            target: target.to_string(),
            config,
            phase: TransitionPhase::InStarted,
            stylesheet: Some(sheet.id),
            transition_listener: Some(listener),
            load_listener: None,
            delay_timer: None,
        };
        session.config.on_transition_in_start.call();

        let fov = facade.fov() / FOV_ZOOM_IN_FACTOR;
        ease_fov(facade, fov, FOV_ZOOM_IN_MS, Easing::Linear);

        info!(
            uid = %target,
            duration_in = %session.config.duration_in,
            duration_out = %session.config.duration_out,
            "开始场景过渡"
        );
        self.session = Some(session);
        Ok(SceneChange::Transitioning)
    }

    /// 处理已投递的监听者
    pub(crate) fn on_listener<F: Facade>(
        &mut self,
        facade: &mut F,
        scheduler: &mut Scheduler,
        id: ListenerId,
        listener: &Listener,
    ) -> ApiResult<()> {
        let Some(session) = self.session.as_mut() else {
            warn!(listener = ?listener, "没有进行中的过渡，忽略通知");
            return Ok(());
        };

        match listener {
            Listener::TransitionInEnd if session.transition_listener == Some(id) => {
                session.transition_listener = None;
                self.on_transition_in_end(facade, scheduler)
            }
            Listener::SceneLoaded if session.load_listener == Some(id) => {
                session.load_listener = None;
                self.on_scene_loaded(facade, scheduler);
                Ok(())
            }
            Listener::TransitionOutEnd if session.transition_listener == Some(id) => {
                session.transition_listener = None;
                self.on_transition_out_end(facade);
                Ok(())
            }
            _ => {
                warn!(listener = ?listener, "监听者不属于当前过渡会话");
                Ok(())
            }
        }
    }

    /// 定时任务：延迟结束
    pub(crate) fn on_delay_elapsed<F: Facade>(
        &mut self,
        facade: &mut F,
        scheduler: &mut Scheduler,
        timer: TimerId,
    ) {
        let Some(session) = self
            .session
            .as_mut()
            .filter(|s| s.delay_timer == Some(timer))
        else {
            warn!(timer = timer.value(), "延迟定时器不属于当前过渡会话");
            return;
        };

        session.delay_timer = None;
        self.start_transition_out(facade, scheduler);
    }

    fn on_transition_in_end<F: Facade>(
        &mut self,
        facade: &mut F,
        scheduler: &mut Scheduler,
    ) -> ApiResult<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let listener =
            scheduler.subscribe_once(ViewerEvent::SceneLoadComplete, Listener::SceneLoaded);
        session.load_listener = Some(listener);

        let target = session.target.clone();
        if let Err(e) = facade.load_scene(&target) {
            warn!(uid = %target, error = %e, "场景加载失败，中止过渡");
            self.abort(facade, scheduler);
            return Err(e);
        }

        session.phase = TransitionPhase::Loading;
        session.config.on_transition_in_end.call();

        let fov = facade.fov() * FOV_SNAP_FACTOR;
        ease_fov(facade, fov, 0.0, Easing::default());

        debug!(uid = %target, "transition-in 结束，加载目标场景");
        Ok(())
    }

    fn on_scene_loaded<F: Facade>(&mut self, facade: &mut F, scheduler: &mut Scheduler) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let delay = session.config.delay_between_in_out;
        if delay == Duration::ZERO {
            self.start_transition_out(facade, scheduler);
        } else {
            session.phase = TransitionPhase::Delay;
            session.delay_timer = Some(scheduler.set_timeout(delay, Task::TransitionOutStart));
            debug!(delay_ms = delay.as_millis() as u64, "场景已加载，等待延迟");
        }
    }

    fn start_transition_out<F: Facade>(&mut self, facade: &mut F, scheduler: &mut Scheduler) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        facade.remove_class(&session.config.css_class_name);
        session.phase = TransitionPhase::OutStarted;
        session.config.on_transition_out_start.call();

        let fov = facade.fov() / FOV_SETTLE_FACTOR;
        ease_fov(facade, fov, FOV_SETTLE_MS, Easing::Linear);

        let listener =
            scheduler.subscribe_once(ViewerEvent::TransitionEnd, Listener::TransitionOutEnd);
        session.transition_listener = Some(listener);
        debug!("开始 transition-out");
    }

    fn on_transition_out_end<F: Facade>(&mut self, facade: &mut F) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        session.release_stylesheet(facade);
        session.config.on_transition_out_end.call();
        info!(uid = %session.target, "场景过渡完成");
    }

    /// 释放会话已创建的全部资源
    fn abort<F: Facade>(&mut self, facade: &mut F, scheduler: &mut Scheduler) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        for id in [session.transition_listener, session.load_listener]
            .into_iter()
            .flatten()
        {
            scheduler.unsubscribe(id);
        }
        if let Some(timer) = session.delay_timer {
            scheduler.cancel(timer);
        }
        facade.remove_class(&session.config.css_class_name);
        session.release_stylesheet(facade);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::css::CssDuration;
    use crate::facade::{Document, SceneGraph};
    use crate::sim::{MemoryViewer, ViewerCall};

    fn setup() -> (MemoryViewer, Scheduler, TransitionOrchestrator) {
        (
            MemoryViewer::new(["a", "b"]),
            Scheduler::new(),
            TransitionOrchestrator::new(),
        )
    }

    /// 投递一类通知给编排器
    fn deliver(
        orchestrator: &mut TransitionOrchestrator,
        viewer: &mut MemoryViewer,
        scheduler: &mut Scheduler,
        event: ViewerEvent,
    ) -> ApiResult<()> {
        for (id, listener) in scheduler.take_listeners(event) {
            orchestrator.on_listener(viewer, scheduler, id, &listener)?;
        }
        Ok(())
    }

    #[test]
    fn test_rejects_before_mutation() {
        let (mut viewer, mut scheduler, mut orchestrator) = setup();

        let err = orchestrator
            .request_scene_change(&mut viewer, &mut scheduler, "", None)
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidArgument { .. }));

        let err = orchestrator
            .request_scene_change(&mut viewer, &mut scheduler, "zzz", Some(TransitionConfig::default()))
            .unwrap_err();
        assert_eq!(err, ApiError::invalid_reference("zzz"));

        let bad = TransitionConfig {
            css_class_name: "1bad".to_string(),
            ..Default::default()
        };
        assert!(
            orchestrator
                .request_scene_change(&mut viewer, &mut scheduler, "b", Some(bad))
                .is_err()
        );

        assert!(viewer.calls().is_empty());
        assert_eq!(orchestrator.phase(), TransitionPhase::Idle);
    }

    #[test]
    fn test_second_request_is_busy() {
        let (mut viewer, mut scheduler, mut orchestrator) = setup();
        let change = orchestrator
            .request_scene_change(&mut viewer, &mut scheduler, "b", Some(TransitionConfig::default()))
            .unwrap();
        assert_eq!(change, SceneChange::Transitioning);
        assert_eq!(orchestrator.target(), Some("b"));

        let calls = viewer.calls().len();
        let err = orchestrator
            .request_scene_change(&mut viewer, &mut scheduler, "b", None)
            .unwrap_err();
        assert!(matches!(err, ApiError::Busy { .. }));
        assert_eq!(viewer.calls().len(), calls);
    }

    #[test]
    fn test_existing_stylesheet_is_busy() {
        let (mut viewer, mut scheduler, mut orchestrator) = setup();
        let container_id = viewer.container_id();
        viewer.append_stylesheet(&TransitionStylesheet {
            id: "transitionStylesheet".to_string(),
            container_id,
            class_name: "other".to_string(),
            duration_in: CssDuration::from_millis(1),
            duration_out: CssDuration::from_millis(1),
        });

        let err = orchestrator
            .request_scene_change(&mut viewer, &mut scheduler, "b", Some(TransitionConfig::default()))
            .unwrap_err();
        assert!(matches!(err, ApiError::Busy { .. }));
        assert!(!viewer.has_class("transition"));
        assert_eq!(scheduler.pending_listeners(ViewerEvent::TransitionEnd), 0);
    }

    #[test]
    fn test_load_failure_aborts_session() {
        let (mut viewer, mut scheduler, mut orchestrator) = setup();
        orchestrator
            .request_scene_change(&mut viewer, &mut scheduler, "b", Some(TransitionConfig::default()))
            .unwrap();
        viewer.fail_next_load();

        let result = deliver(
            &mut orchestrator,
            &mut viewer,
            &mut scheduler,
            ViewerEvent::TransitionEnd,
        );
        assert!(matches!(result, Err(ApiError::UnsupportedOperation { .. })));

        assert!(!orchestrator.is_active());
        assert!(!viewer.has_class("transition"));
        assert_eq!(viewer.stylesheet_count(), 0);
        assert_eq!(viewer.current_scene_id(), "a");
        assert_eq!(scheduler.pending_listeners(ViewerEvent::SceneLoadComplete), 0);
        assert_eq!(scheduler.pending_listeners(ViewerEvent::TransitionEnd), 0);
    }

    #[test]
    fn test_foreign_listener_is_ignored() {
        let (mut viewer, mut scheduler, mut orchestrator) = setup();
        orchestrator
            .request_scene_change(&mut viewer, &mut scheduler, "b", Some(TransitionConfig::default()))
            .unwrap();

        let stray = scheduler.subscribe_once(ViewerEvent::SceneLoadComplete, Listener::SceneLoaded);
        let listeners = scheduler.take_listeners(ViewerEvent::SceneLoadComplete);
        assert_eq!(listeners.len(), 1);
        orchestrator
            .on_listener(&mut viewer, &mut scheduler, stray, &listeners[0].1)
            .unwrap();

        assert_eq!(orchestrator.phase(), TransitionPhase::InStarted);
        assert!(!viewer.calls().iter().any(|c| matches!(c, ViewerCall::LoadScene { .. })));
    }

    #[test]
    fn test_stylesheet_removed_externally() {
        let (mut viewer, mut scheduler, mut orchestrator) = setup();
        let ended = std::rc::Rc::new(std::cell::Cell::new(false));
        let flag = ended.clone();
        let config = TransitionConfig::default().on_transition_out_end(move || flag.set(true));
        orchestrator
            .request_scene_change(&mut viewer, &mut scheduler, "b", Some(config))
            .unwrap();

        deliver(&mut orchestrator, &mut viewer, &mut scheduler, ViewerEvent::TransitionEnd).unwrap();
        deliver(&mut orchestrator, &mut viewer, &mut scheduler, ViewerEvent::SceneLoadComplete)
            .unwrap();
        assert_eq!(orchestrator.phase(), TransitionPhase::OutStarted);

        assert!(viewer.remove_stylesheet("transitionStylesheet"));
        deliver(&mut orchestrator, &mut viewer, &mut scheduler, ViewerEvent::TransitionEnd).unwrap();

        assert!(ended.get());
        assert!(!orchestrator.is_active());
        let removals = viewer
            .calls()
            .iter()
            .filter(|c| matches!(c, ViewerCall::StylesheetRemoved { .. }))
            .count();
        assert_eq!(removals, 1);
    }

    #[test]
    fn test_delay_timer_mismatch_is_ignored() {
        let (mut viewer, mut scheduler, mut orchestrator) = setup();
        let config = TransitionConfig {
            delay_between_in_out: Duration::from_millis(300),
            ..Default::default()
        };
        orchestrator
            .request_scene_change(&mut viewer, &mut scheduler, "b", Some(config))
            .unwrap();
        deliver(&mut orchestrator, &mut viewer, &mut scheduler, ViewerEvent::TransitionEnd).unwrap();
        deliver(&mut orchestrator, &mut viewer, &mut scheduler, ViewerEvent::SceneLoadComplete)
            .unwrap();
        assert_eq!(orchestrator.phase(), TransitionPhase::Delay);

        let other = scheduler.set_timeout(Duration::ZERO, Task::TransitionOutStart);
        orchestrator.on_delay_elapsed(&mut viewer, &mut scheduler, other);
        assert_eq!(orchestrator.phase(), TransitionPhase::Delay);

        let (id, task) = scheduler.pop_due(Duration::from_millis(300)).unwrap();
        assert_eq!(id, other);
        assert_eq!(task, Task::TransitionOutStart);
        let (id, _) = scheduler.pop_due(Duration::from_millis(300)).unwrap();
        orchestrator.on_delay_elapsed(&mut viewer, &mut scheduler, id);
        assert_eq!(orchestrator.phase(), TransitionPhase::OutStarted);
    }
}
