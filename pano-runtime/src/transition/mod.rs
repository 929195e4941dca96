//! # Transition 模块
//!
//! 带 CSS 过渡效果的场景切换。
//!
//! ## 流程
//!
//! ```text
//! request_scene_change
//!   ├─ 注入样式表，容器添加 class，onTransitionInStart，FOV / 1.2（800ms linear）
//!   ├─ [TransitionEnd]     加载目标场景，onTransitionInEnd，FOV * 1.1（瞬时）
//!   ├─ [SceneLoadComplete] （延迟后）移除 class，onTransitionOutStart，FOV / 1.1（1200ms linear）
//!   └─ [TransitionEnd]     移除样式表，onTransitionOutEnd
//! ```
//!
//! 每个等待点都是一次性订阅，会话结束后不留下任何监听者。

mod config;
mod orchestrator;

pub use config::{TransitionConfig, TransitionOptions};
pub use orchestrator::{
    FOV_SETTLE_FACTOR, FOV_SETTLE_MS, FOV_SNAP_FACTOR, FOV_ZOOM_IN_FACTOR, FOV_ZOOM_IN_MS,
    SceneChange, TransitionOrchestrator, TransitionPhase,
};
