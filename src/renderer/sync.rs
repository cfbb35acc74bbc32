//! 栅栏记账
//!
//! 渲染器只使用一个栅栏：每提交一帧，CPU 侧的值加一并在队列上 signal。
//! 本模块只记录 CPU 已经 signal 到哪里、最近一次看到 GPU 完成到哪里，
//! 真正的 signal 与等待由后端完成。
//!
//! 等待发生在两处：
//!
//! 1. 开始一帧之前，目标交换链缓冲区的上一帧尚未完成
//! 2. resize 与销毁之前，等待 GPU 完成全部工作

use std::cell::Cell;

/// 栅栏上的一个值，单调递增
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FenceValue(u64);

impl FenceValue {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl From<FenceValue> for u64 {
    fn from(value: FenceValue) -> Self {
        value.0
    }
}

/// 单线程的栅栏记账
///
/// `signaled` 是 CPU 最后一次 signal 的值，`completed` 是最近一次从栅栏读到
/// （或等待到）的完成值。两者都只增不减。
#[derive(Debug, Default)]
pub struct FenceManager {
    signaled: Cell<FenceValue>,
    completed: Cell<FenceValue>,
}

impl FenceManager {
    /// 以栅栏的初始值创建
    pub fn new(initial: u64) -> Self {
        Self {
            signaled: Cell::new(FenceValue::new(initial)),
            completed: Cell::new(FenceValue::new(initial)),
        }
    }

    pub fn current_value(&self) -> FenceValue {
        self.signaled.get()
    }

    pub fn completed_value(&self) -> FenceValue {
        self.completed.get()
    }

    /// 分配下一个要 signal 的值
    pub fn next_value(&self) -> FenceValue {
        let value = self.signaled.get().next();
        self.signaled.set(value);
        value
    }

    /// 记录读到的完成值；比已知值小的读数被忽略
    pub fn update_completed_value(&self, value: FenceValue) {
        if value > self.completed.get() {
            self.completed.set(value);
        }
    }

    pub fn is_completed(&self, value: FenceValue) -> bool {
        self.completed_value() >= value
    }

    /// 是否还有已 signal 但未确认完成的工作
    pub fn has_pending_work(&self) -> bool {
        self.completed_value() < self.current_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_value_is_copy_and_ordered() {
        let first = FenceValue::new(1);
        let second = first.next();

        assert_eq!(second.value(), 2);
        assert_eq!(first.value(), 1);
        assert!(first < second);
        assert_eq!(u64::from(second), 2);
    }

    #[test]
    fn test_signal_then_complete() {
        let fences = FenceManager::default();
        assert!(!fences.has_pending_work());

        let frame_one = fences.next_value();
        let frame_two = fences.next_value();
        assert_eq!((frame_one.value(), frame_two.value()), (1, 2));
        assert_eq!(fences.current_value(), frame_two);
        assert!(fences.has_pending_work());

        fences.update_completed_value(frame_one);
        assert!(fences.is_completed(frame_one));
        assert!(!fences.is_completed(frame_two));

        fences.update_completed_value(frame_two);
        assert!(!fences.has_pending_work());
    }

    #[test]
    fn test_completed_value_never_goes_back() {
        let fences = FenceManager::new(5);
        fences.update_completed_value(FenceValue::new(3));
        assert_eq!(fences.completed_value().value(), 5);
        assert_eq!(fences.next_value().value(), 6);
    }
}
