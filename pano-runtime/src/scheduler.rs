//! # Scheduler 模块
//!
//! 核心内部的等待点登记：一次性通知监听者 + 虚拟时钟定时器。
//!
//! ```text
//! Host                               ShortApi
//!   │── dispatch(ViewerEvent) ──────►│ listeners.take(kind) → 逐个处理
//!   │── advance(dt) ────────────────►│ timers.pop_due(now + dt) → 逐个处理
//! ```

use std::fmt;
use std::time::Duration;

use crate::callback::Callback;
use crate::events::{EventKind, ListenerId, OnceListeners};
use crate::facade::VolumeTarget;
use crate::timer::{TimerId, Timers};

/// 等待中的一次性监听者
pub(crate) enum Listener {
    /// 过渡会话：transition-in 结束
    TransitionInEnd,
    /// 过渡会话：目标场景加载完成
    SceneLoaded,
    /// 过渡会话：transition-out 结束
    TransitionOutEnd,
    /// `go_to_view` 的结束回调
    CameraEnd(Callback),
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listener::TransitionInEnd => f.write_str("TransitionInEnd"),
            Listener::SceneLoaded => f.write_str("SceneLoaded"),
            Listener::TransitionOutEnd => f.write_str("TransitionOutEnd"),
            Listener::CameraEnd(_) => f.write_str("CameraEnd"),
        }
    }
}

/// 定时任务
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Task {
    /// 过渡会话：延迟结束，开始 transition-out
    TransitionOutStart,
    /// 音量渐变的一次步进
    FadeTick(VolumeTarget),
}

/// 监听者与定时器
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    listeners: OnceListeners<Listener>,
    timers: Timers<Task>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe_once(&mut self, kind: EventKind, listener: Listener) -> ListenerId {
        self.listeners.subscribe_once(kind, listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn take_listeners(&mut self, kind: EventKind) -> Vec<(ListenerId, Listener)> {
        self.listeners.take(kind)
    }

    pub fn pending_listeners(&self, kind: EventKind) -> usize {
        self.listeners.count(kind)
    }

    pub fn set_timeout(&mut self, delay: Duration, task: Task) -> TimerId {
        self.timers.set_timeout(delay, task)
    }

    pub fn set_interval(&mut self, period: Duration, task: Task) -> TimerId {
        self.timers.set_interval(period, task)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.cancel(id)
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn now(&self) -> Duration {
        self.timers.now()
    }

    pub fn pop_due(&mut self, deadline: Duration) -> Option<(TimerId, Task)> {
        self.timers.pop_due(deadline)
    }
}
