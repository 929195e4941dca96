//! # Events 模块
//!
//! 引擎通知与一次性订阅。
//!
//! ## 设计说明
//!
//! - `ViewerEvent` 是宿主采集到的引擎通知，通过 `ShortApi::dispatch` 交给核心
//! - 核心不注册闭包到引擎；每个等待点在 `OnceListeners` 中登记一个监听者
//! - 监听者在第一次投递后自动注销，重复请求需要重新登记

use serde::{Deserialize, Serialize};

/// 引擎通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewerEvent {
    /// 容器上的 CSS `transitionend`
    TransitionEnd,
    /// 场景加载完成
    SceneLoadComplete,
    /// 相机补间完成
    CameraAnimationComplete,
}

/// 通知类型（订阅键）
pub type EventKind = ViewerEvent;

/// 监听者标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// 获取内部 ID 值
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// 一次性订阅表
///
/// 按登记顺序投递；`take` 取出某类通知的全部监听者并将其注销。
#[derive(Debug)]
pub struct OnceListeners<L> {
    entries: Vec<(EventKind, ListenerId, L)>,
    next_id: u64,
}

impl<L> Default for OnceListeners<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> OnceListeners<L> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 1,
        }
    }

    /// 登记一次性监听者
    pub fn subscribe_once(&mut self, kind: EventKind, listener: L) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((kind, id, listener));
        id
    }

    /// 注销监听者，已投递或不存在时返回 `false`
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(_, entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    /// 取出并注销某类通知的全部监听者
    pub fn take(&mut self, kind: EventKind) -> Vec<(ListenerId, L)> {
        let (taken, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(entry_kind, _, _)| *entry_kind == kind);
        self.entries = kept;
        taken.into_iter().map(|(_, id, l)| (id, l)).collect()
    }

    /// 监听者是否仍在等待
    pub fn is_subscribed(&self, id: ListenerId) -> bool {
        self.entries.iter().any(|(_, entry_id, _)| *entry_id == id)
    }

    /// 某类通知的等待中监听者数量
    pub fn count(&self, kind: EventKind) -> usize {
        self.entries.iter().filter(|(k, _, _)| *k == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_delivers_once() {
        let mut listeners = OnceListeners::new();
        let a = listeners.subscribe_once(ViewerEvent::TransitionEnd, "a");
        let b = listeners.subscribe_once(ViewerEvent::SceneLoadComplete, "b");
        let c = listeners.subscribe_once(ViewerEvent::TransitionEnd, "c");

        let taken = listeners.take(ViewerEvent::TransitionEnd);
        assert_eq!(taken, vec![(a, "a"), (c, "c")]);
        assert!(listeners.take(ViewerEvent::TransitionEnd).is_empty());

        assert!(listeners.is_subscribed(b));
        assert_eq!(listeners.count(ViewerEvent::SceneLoadComplete), 1);
    }

    #[test]
    fn test_unsubscribe() {
        let mut listeners = OnceListeners::new();
        let a = listeners.subscribe_once(ViewerEvent::CameraAnimationComplete, 1);

        assert!(listeners.unsubscribe(a));
        assert!(!listeners.unsubscribe(a));
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_string(&ViewerEvent::SceneLoadComplete).unwrap();
        assert_eq!(json, "\"sceneLoadComplete\"");
    }
}
