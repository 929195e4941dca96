//! 定时步进的音量渐变

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info};

use crate::callback::Callback;
use crate::error::{ApiError, ApiResult};
use crate::facade::{Media, MediaType, VolumeTarget};
use crate::scheduler::{Scheduler, Task};
use crate::timer::TimerId;

use super::config::{FadeConfig, check_volume};

/// 步进间隔（毫秒），也是最短的渐变时长
pub const FADE_TICK_MS: f64 = 10.0;

/// 渐变请求的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeOutcome {
    /// 时长不足一个步进，已直接设置
    Immediate,
    /// 定时渐变已开始
    Started,
}

/// 一次渐变的数值状态
///
/// 每个步进前进 `increment * FADE_TICK_MS`，当前值落入目标值
/// `±|increment|` 的容差带时结束。步进不保证恰好落在目标值上，
/// 所以终止条件是容差带而不是相等。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeSession {
    start: f64,
    target: f64,
    /// 每毫秒的变化量（带方向）
    increment: f64,
    current: f64,
}

impl FadeSession {
    /// # 参数
    /// - `current`: 起始音量
    /// - `target`: 目标音量
    /// - `duration_ms`: 渐变时长，必须为正
    pub fn new(current: f64, target: f64, duration_ms: f64) -> Self {
        let sign = if target < current { -1.0 } else { 1.0 };
        let diff = (target - current).abs();
        Self {
            start: current,
            target,
            increment: diff * sign / duration_ms,
            current,
        }
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    /// 下一个步进要写入的值
    ///
    /// 限制在 0.0 - 1.0 之间，且不越过目标值。
    pub fn next_value(&self) -> f64 {
        let next = self.current + self.increment * FADE_TICK_MS;
        let next = if self.increment >= 0.0 {
            next.min(self.target)
        } else {
            next.max(self.target)
        };
        next.clamp(0.0, 1.0)
    }

    /// 记录写入后实际读回的值，返回是否进入容差带
    pub fn settle(&mut self, observed: f64) -> bool {
        self.current = observed;
        self.is_settled()
    }

    pub fn is_settled(&self) -> bool {
        (self.current - self.target).abs() <= self.increment.abs()
    }
}

/// 进行中的渐变
#[derive(Debug)]
struct ActiveFade {
    session: FadeSession,
    timer: TimerId,
    on_end: Callback,
}

/// 音量渐变器
///
/// 每个目标最多一个进行中的渐变；同一目标上的新请求先取消旧的定时器。
#[derive(Debug, Default)]
pub struct VolumeFader {
    active: HashMap<VolumeTarget, ActiveFade>,
}

impl VolumeFader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 目标上是否有进行中的渐变
    pub fn is_fading(&self, target: VolumeTarget) -> bool {
        self.active.contains_key(&target)
    }

    /// 进行中渐变的数值状态
    pub fn session(&self, target: VolumeTarget) -> Option<&FadeSession> {
        self.active.get(&target).map(|a| &a.session)
    }

    /// 取消目标上进行中的渐变，不触发它的 `on_end`
    pub(crate) fn cancel(&mut self, scheduler: &mut Scheduler, target: VolumeTarget) -> bool {
        let Some(previous) = self.active.remove(&target) else {
            return false;
        };
        scheduler.cancel(previous.timer);
        debug!(target = %target, "取消进行中的渐变");
        true
    }

    /// 从 `current` 渐变到 `target_value`
    pub(crate) fn fade<F: Media>(
        &mut self,
        facade: &mut F,
        scheduler: &mut Scheduler,
        current: f64,
        target_value: f64,
        mut config: FadeConfig,
    ) -> ApiResult<FadeOutcome> {
        check_volume(target_value)?;
        config.validate()?;
        let target = config.target;
        resolve_target(facade, target)?;

        self.cancel(scheduler, target);
        config.on_start.call();

        if config.duration_ms < FADE_TICK_MS {
            facade.set_volume(target, target_value);
            config.on_end.call();
            debug!(target = %target, volume = target_value, "时长过短，直接设置音量");
            return Ok(FadeOutcome::Immediate);
        }

        let session = FadeSession::new(current, target_value, config.duration_ms);
        let timer = scheduler.set_interval(
            Duration::from_millis(FADE_TICK_MS as u64),
            Task::FadeTick(target),
        );
        self.active.insert(
            target,
            ActiveFade {
                session,
                timer,
                on_end: config.on_end,
            },
        );

        info!(
            target = %target,
            from = current,
            to = target_value,
            duration_ms = config.duration_ms,
            "开始音量渐变"
        );
        Ok(FadeOutcome::Started)
    }

    /// 定时任务：一次步进
    pub(crate) fn on_tick<F: Media>(
        &mut self,
        facade: &mut F,
        scheduler: &mut Scheduler,
        target: VolumeTarget,
    ) {
        let Some(active) = self.active.get_mut(&target) else {
            return;
        };

        let next = active.session.next_value();
        facade.set_volume(target, next);
        let observed = facade.volume(target).unwrap_or(next);

        if active.session.settle(observed)
            && let Some(mut finished) = self.active.remove(&target)
        {
            scheduler.cancel(finished.timer);
            finished.on_end.call();
            info!(target = %target, volume = observed, "音量渐变完成");
        }
    }
}

/// 检查目标是否可调音量
pub(crate) fn resolve_target<F: Media>(facade: &F, target: VolumeTarget) -> ApiResult<f64> {
    if target == VolumeTarget::Scene && facade.media_type() != MediaType::Video {
        return Err(ApiError::unsupported("当前场景不支持音量"));
    }
    facade
        .volume(target)
        .ok_or_else(|| ApiError::unsupported(format!("音量目标 {target} 不可用")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::MemoryViewer;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_increment_direction() {
        let up = FadeSession::new(0.2, 0.8, 1000.0);
        assert!((up.increment() - 0.0006).abs() < 1e-12);

        let down = FadeSession::new(0.8, 0.2, 1000.0);
        assert!((down.increment() + 0.0006).abs() < 1e-12);
    }

    #[test]
    fn test_steps_until_band() {
        let mut session = FadeSession::new(0.2, 0.8, 1000.0);
        let mut ticks = 0;
        loop {
            ticks += 1;
            let next = session.next_value();
            assert!(next >= session.current());
            if session.settle(next) {
                break;
            }
            assert!(ticks < 1000, "渐变未终止");
        }
        assert_eq!(ticks, 100);
        assert!((session.current() - 0.8).abs() <= session.increment().abs());
    }

    #[test]
    fn test_never_overshoots() {
        // 1005ms 不是步进的整数倍，最后一步会被限制在目标值
        let mut session = FadeSession::new(0.2, 0.8, 1005.0);
        let mut ticks = 0;
        while !session.settle(session.next_value()) {
            ticks += 1;
            assert!(session.current() <= 0.8);
            assert!(ticks < 1000, "渐变未终止");
        }
        assert_eq!(session.current(), 0.8);
    }

    #[test]
    fn test_equal_start_and_target() {
        let mut session = FadeSession::new(0.5, 0.5, 500.0);
        assert_eq!(session.increment(), 0.0);
        assert!(session.settle(session.next_value()));
    }

    #[test]
    fn test_clamped_to_unit_range() {
        let session = FadeSession::new(0.999, 1.0, 10.0);
        assert!(session.next_value() <= 1.0);
    }

    #[test]
    fn test_restart_cancels_previous() {
        let mut viewer = MemoryViewer::new(["a"]);
        let mut scheduler = Scheduler::new();
        let mut fader = VolumeFader::new();
        let first_end = Rc::new(Cell::new(0));
        let counter = first_end.clone();

        let config = FadeConfig::default().on_end(move || counter.set(counter.get() + 1));
        let outcome = fader.fade(&mut viewer, &mut scheduler, 1.0, 0.0, config);
        assert_eq!(outcome, Ok(FadeOutcome::Started));
        assert!(fader.is_fading(VolumeTarget::Master));

        let outcome = fader.fade(&mut viewer, &mut scheduler, 1.0, 0.5, FadeConfig::default());
        assert_eq!(outcome, Ok(FadeOutcome::Started));
        assert_eq!(scheduler.active_timers(), 1);
        assert_eq!(fader.session(VolumeTarget::Master).map(|s| s.target()), Some(0.5));

        while let Some((_, Task::FadeTick(target))) = scheduler.pop_due(Duration::from_secs(2)) {
            fader.on_tick(&mut viewer, &mut scheduler, target);
        }
        assert_eq!(first_end.get(), 0);
        assert!(!fader.is_fading(VolumeTarget::Master));
        let volume = viewer.volume(VolumeTarget::Master).unwrap();
        assert!((volume - 0.5).abs() <= 0.0005);
    }

    #[test]
    fn test_scene_target_requires_video() {
        let mut viewer = MemoryViewer::new(["a"]);
        let mut scheduler = Scheduler::new();
        let mut fader = VolumeFader::new();

        let config = FadeConfig::default().with_target(VolumeTarget::Scene);
        let result = fader.fade(&mut viewer, &mut scheduler, 1.0, 0.2, config);
        assert!(matches!(result, Err(ApiError::UnsupportedOperation { .. })));
        assert_eq!(scheduler.active_timers(), 0);
        assert!(viewer.calls().is_empty());
    }
}
