//! # Driver 模块
//!
//! 以固定帧步长驱动 ShortApi 与模拟查看器。
//!
//! 每一帧：
//! 1. 模拟查看器推进时间，产生引擎通知
//! 2. 通知逐条交给 `ShortApi::dispatch`
//! 3. `ShortApi::advance` 执行到期的定时任务

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use pano_runtime::sim::{MemoryViewer, ViewerCall};
use pano_runtime::{ApiError, ApiResult, FadeConfig, LookAtConfig, ShortApi};

use crate::config::HostConfig;
use crate::scenario::{Scenario, Step};

/// 驱动错误
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DriverError {
    /// 效果在限定时间内没有结束
    #[error("等待 {0:?} 后效果仍未结束")]
    Timeout(Duration),
}

/// 单个步骤的执行结果
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StepOutcome {
    pub index: usize,
    pub action: &'static str,
    /// 步骤开始时的模拟时间（毫秒）
    pub at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 运行报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub steps: Vec<StepOutcome>,
    /// 引擎通知处理中出现的错误
    pub dispatch_errors: Vec<String>,
    pub calls: Vec<ViewerCall>,
    pub final_scene: String,
    pub elapsed_ms: u64,
}

impl Report {
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.error.is_some()).count()
    }
}

/// 场景驱动器
pub struct Driver {
    api: ShortApi<MemoryViewer>,
    frame: Duration,
    settle_timeout: Duration,
    elapsed: Duration,
    dispatch_errors: Vec<String>,
}

impl Driver {
    pub fn new(scenario: &Scenario, config: &HostConfig) -> Self {
        let mut viewer = MemoryViewer::new(scenario.scenes.iter().cloned())
            .with_container_id(config.viewer.container_id.clone())
            .with_load_latency(config.load_latency())
            .with_fov(config.viewer.fov);
        for hotspot in &scenario.hotspots {
            viewer.add_hotspot_3d(hotspot.uid.clone(), hotspot.yaw, hotspot.pitch);
        }
        if let Some(duration) = scenario.video_duration {
            viewer.set_video_duration(duration);
        }

        Self {
            api: ShortApi::new(viewer),
            frame: config.frame(),
            settle_timeout: config.settle_timeout(),
            elapsed: Duration::ZERO,
            dispatch_errors: Vec::new(),
        }
    }

    pub fn api(&self) -> &ShortApi<MemoryViewer> {
        &self.api
    }

    /// 依次执行全部步骤，最后等待所有效果结束
    pub fn run(mut self, steps: &[Step]) -> Result<Report, DriverError> {
        let mut outcomes = Vec::with_capacity(steps.len());

        for (index, step) in steps.iter().enumerate() {
            let at_ms = self.elapsed.as_millis() as u64;
            info!(index, action = step.name(), at_ms, "执行步骤");

            let error = match self.execute(step)? {
                Ok(()) => None,
                Err(e) => {
                    warn!(index, action = step.name(), error = %e, "步骤失败");
                    Some(e.to_string())
                }
            };
            outcomes.push(StepOutcome {
                index,
                action: step.name(),
                at_ms,
                error,
            });
        }
        self.settle()?;

        let final_scene = self.api.current_scene_id();
        let elapsed_ms = self.elapsed.as_millis() as u64;
        Ok(Report {
            steps: outcomes,
            dispatch_errors: self.dispatch_errors,
            calls: self.api.into_facade().take_calls(),
            final_scene,
            elapsed_ms,
        })
    }

    /// 执行一个步骤
    ///
    /// 外层错误是驱动错误（超时），内层是 API 返回的错误。
    fn execute(&mut self, step: &Step) -> Result<ApiResult<()>, DriverError> {
        let result = match step {
            Step::GoToScene { uid, transition } => {
                self.api.go_to_scene(uid, transition.to_config()).map(drop)
            }
            Step::Next { transition } => self.api.go_to_next_scene(transition.to_config()).map(drop),
            Step::Previous { transition } => {
                self.api.go_to_previous_scene(transition.to_config()).map(drop)
            }
            Step::First { transition } => self.api.go_to_first_scene(transition.to_config()).map(drop),
            Step::Last { transition } => self.api.go_to_last_scene(transition.to_config()).map(drop),
            Step::Fade { value, options } => self
                .api
                .fade(*value, FadeConfig::from(options.clone()))
                .map(drop),
            Step::SetVolume { value, fade } => match value.resolve() {
                Ok(v) => self
                    .api
                    .set_volume(v, fade.clone().map(FadeConfig::from))
                    .map(drop),
                Err(e) => Err(e),
            },
            Step::SetVideoVolume { value, fade } => self
                .api
                .set_video_volume(*value, fade.clone().map(FadeConfig::from))
                .map(drop),
            Step::GoToView { view } => self.api.go_to_view(LookAtConfig::from(view.clone())),
            Step::Wait { ms } => {
                self.wait(Duration::from_millis(*ms));
                Ok(())
            }
            Step::Settle => {
                self.settle()?;
                Ok(())
            }
        };
        Ok(result)
    }

    /// 推进一帧
    fn frame(&mut self) {
        let events = self.api.facade_mut().advance(self.frame);
        for event in events {
            if let Err(e) = self.api.dispatch(event) {
                self.record_dispatch_error(&e);
            }
        }
        self.api.advance(self.frame);
        self.elapsed += self.frame;
    }

    fn record_dispatch_error(&mut self, error: &ApiError) {
        self.dispatch_errors.push(error.to_string());
    }

    /// 推进至少 `duration` 的模拟时间
    fn wait(&mut self, duration: Duration) {
        let target = self.elapsed + duration;
        while self.elapsed < target {
            self.frame();
        }
    }

    /// 推进直到没有进行中的效果
    fn settle(&mut self) -> Result<(), DriverError> {
        let start = self.elapsed;
        while !self.is_settled() {
            if self.elapsed - start >= self.settle_timeout {
                return Err(DriverError::Timeout(self.settle_timeout));
            }
            self.frame();
        }
        debug!(waited_ms = (self.elapsed - start).as_millis() as u64, "效果已结束");
        Ok(())
    }

    fn is_settled(&self) -> bool {
        self.api.is_idle() && self.api.facade().pending_events() == 0
    }
}
