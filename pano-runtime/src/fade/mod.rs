//! # Fade 模块
//!
//! 音量渐变：以 10ms 为步进，把某个音量目标线性地推向目标值。
//!
//! ```text
//! fade(current, target, config)
//!   ├─ duration < 10ms: 直接设置，onStart + onEnd
//!   └─ 否则: onStart，每 10ms 一次 FadeTick
//!        └─ 进入容差带: 取消定时器，onEnd
//! ```

mod config;
mod fader;

pub use config::{DEFAULT_FADE_DURATION_MS, FadeConfig, FadeOptions, check_volume, parse_volume};
pub use fader::{FADE_TICK_MS, FadeOutcome, FadeSession, VolumeFader};

pub(crate) use fader::resolve_target;
