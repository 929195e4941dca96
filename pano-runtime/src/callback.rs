//! # Callback 模块
//!
//! 用户传入的零参数回调。

use std::fmt;

/// 零参数回调
///
/// 包装 `Box<dyn FnMut()>`，提供 `Debug` 实现，便于嵌入配置结构体。
pub struct Callback(Box<dyn FnMut()>);

impl Callback {
    /// 从闭包创建回调
    pub fn new(f: impl FnMut() + 'static) -> Self {
        Self(Box::new(f))
    }

    /// 空回调
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// 调用回调
    pub fn call(&mut self) {
        (self.0)()
    }
}

impl Default for Callback {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callback")
    }
}

impl<F: FnMut() + 'static> From<F> for Callback {
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_callback_call() {
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let mut cb = Callback::new(move || c.set(c.get() + 1));

        cb.call();
        cb.call();
        assert_eq!(count.get(), 2);
        assert_eq!(format!("{:?}", cb), "Callback");
    }
}
