//! # Pano Runtime
//!
//! 全景查看器便捷 API 的核心编排库。
//!
//! ## 架构概述
//!
//! `pano-runtime` 是纯逻辑核心，不依赖任何 IO 或渲染引擎。
//! 查看器引擎的能力由宿主通过 [`facade`] 中的 trait 注入；
//! 引擎通知与时间流逝由宿主推送：
//!
//! ```text
//! Host                              ShortApi
//!   │                                  │
//!   │──── go_to_scene / fade / ... ──►│ 参数检查 → 修改 facade → 登记等待点
//!   │──── dispatch(ViewerEvent) ─────►│ 一次性监听者
//!   │──── advance(dt) ───────────────►│ 定时任务（过渡延迟、渐变步进）
//!   │◄─── Facade 调用 ─────────────────│
//! ```
//!
//! ## 使用示例
//!
//! ```ignore
//! use pano_runtime::{ShortApi, TransitionConfig, sim::MemoryViewer};
//!
//! let mut api = ShortApi::new(MemoryViewer::new(["lobby", "hall"]));
//! api.go_to_scene("hall", Some(TransitionConfig::default()))?;
//!
//! // 主循环
//! loop {
//!     for event in api.facade_mut().advance(frame) {
//!         api.dispatch(event)?;
//!     }
//!     api.advance(frame);
//!     if api.is_idle() {
//!         break;
//!     }
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`facade`]：查看器引擎能力接口
//! - [`events`]：引擎通知与一次性订阅
//! - [`timer`]：虚拟时钟定时器
//! - [`transition`]：带 CSS 过渡的场景切换
//! - [`fade`]：音量渐变
//! - [`camera`]：相机补间参数
//! - [`api`]：[`ShortApi`] 入口
//! - [`sim`]：内存中的模拟查看器

pub mod api;
pub mod callback;
pub mod camera;
pub mod css;
pub mod easing;
pub mod error;
pub mod events;
pub mod facade;
pub mod fade;
mod scheduler;
pub mod sim;
pub mod timer;
pub mod transition;

// 重导出核心类型
pub use api::{PreviousNext, ShortApi};
pub use callback::Callback;
pub use camera::{LookAtConfig, LookAtOptions};
pub use css::{CssDuration, TransitionStylesheet};
pub use easing::Easing;
pub use error::{ApiError, ApiResult};
pub use events::{ListenerId, OnceListeners, ViewerEvent};
pub use facade::{
    Camera, Document, ElementInfo, Facade, LookAt, Media, MediaType, ReferenceKind, SceneGraph,
    SphericalPosition, VolumeTarget,
};
pub use fade::{FadeConfig, FadeOptions, FadeOutcome, VolumeFader};
pub use timer::{TimerId, Timers};
pub use transition::{
    SceneChange, TransitionConfig, TransitionOptions, TransitionOrchestrator, TransitionPhase,
};
