//! # Timer 模块
//!
//! 单线程虚拟时钟上的一次性 / 重复定时器。
//!
//! 核心不读取真实时间：宿主每帧调用 `ShortApi::advance(dt)`，
//! 由 `pop_due` 按到期顺序逐个取出定时任务，取出的任务执行完毕后才取下一个。

use std::time::Duration;

/// 定时器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// 获取内部 ID 值
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Timer<T> {
    id: TimerId,
    due: Duration,
    /// 重复周期，`None` 表示一次性
    period: Option<Duration>,
    task: T,
}

/// 定时器表
#[derive(Debug)]
pub struct Timers<T> {
    timers: Vec<Timer<T>>,
    now: Duration,
    next_id: u64,
}

impl<T: Clone> Default for Timers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Timers<T> {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            now: Duration::ZERO,
            next_id: 1,
        }
    }

    /// 当前虚拟时间
    pub fn now(&self) -> Duration {
        self.now
    }

    fn insert(&mut self, delay: Duration, period: Option<Duration>, task: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due: self.now + delay,
            period,
            task,
        });
        id
    }

    /// 一次性定时器
    pub fn set_timeout(&mut self, delay: Duration, task: T) -> TimerId {
        self.insert(delay, None, task)
    }

    /// 重复定时器
    ///
    /// 周期为零时按 1ms 处理，避免同一时刻无限触发。
    pub fn set_interval(&mut self, period: Duration, task: T) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        self.insert(period, Some(period), task)
    }

    /// 取消定时器，不存在时返回 `false`
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    /// 活动定时器数量
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// 取出 `deadline` 之前最早到期的任务
    ///
    /// 同时到期的按创建顺序；重复定时器重新排期后保留。
    /// 没有到期任务时把时钟推进到 `deadline` 并返回 `None`。
    pub fn pop_due(&mut self, deadline: Duration) -> Option<(TimerId, T)> {
        let index = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= deadline)
            .min_by_key(|(_, t)| (t.due, t.id))
            .map(|(i, _)| i);

        let Some(index) = index else {
            self.now = self.now.max(deadline);
            return None;
        };

        let timer = &mut self.timers[index];
        self.now = self.now.max(timer.due);
        let id = timer.id;
        let period = timer.period;

        match period {
            Some(period) => {
                timer.due += period;
                Some((id, timer.task.clone()))
            }
            None => {
                let timer = self.timers.remove(index);
                Some((id, timer.task))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_timeout_fires_once() {
        let mut timers = Timers::new();
        let id = timers.set_timeout(ms(50), "once");

        assert_eq!(timers.pop_due(ms(40)), None);
        assert_eq!(timers.now(), ms(40));
        assert_eq!(timers.pop_due(ms(60)), Some((id, "once")));
        assert_eq!(timers.now(), ms(50));
        assert_eq!(timers.pop_due(ms(100)), None);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_interval_rearms() {
        let mut timers = Timers::new();
        let id = timers.set_interval(ms(10), "tick");

        let mut fired = 0;
        while let Some((fired_id, _)) = timers.pop_due(ms(35)) {
            assert_eq!(fired_id, id);
            fired += 1;
        }
        assert_eq!(fired, 3);
        assert_eq!(timers.now(), ms(35));

        assert!(timers.cancel(id));
        assert!(!timers.is_active(id));
        assert_eq!(timers.pop_due(ms(100)), None);
    }

    #[test]
    fn test_order_by_due_then_creation() {
        let mut timers = Timers::new();
        let late = timers.set_timeout(ms(20), "late");
        let a = timers.set_timeout(ms(10), "a");
        let b = timers.set_timeout(ms(10), "b");

        assert_eq!(timers.pop_due(ms(30)), Some((a, "a")));
        assert_eq!(timers.pop_due(ms(30)), Some((b, "b")));
        assert_eq!(timers.pop_due(ms(30)), Some((late, "late")));
    }

    #[test]
    fn test_timeout_relative_to_now() {
        let mut timers: Timers<&str> = Timers::new();
        assert_eq!(timers.pop_due(ms(100)), None);

        let id = timers.set_timeout(ms(0), "now");
        assert_eq!(timers.pop_due(ms(100)), Some((id, "now")));
        assert_eq!(timers.now(), ms(100));
    }
}
