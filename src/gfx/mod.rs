//! 图形后端模块
//!
//! 本模块封装了底层图形 API 的实现：
//! - DirectX 12：Windows 平台上的真实后端
//! - Headless：不访问 GPU 的记录型后端，用于测试与无窗口运行
//!
//! 两者都实现了统一的 `GraphicsBackend` trait，
//! 渲染器代码只依赖该 trait。

pub mod backend;
pub mod headless;
#[cfg(target_os = "windows")]
pub mod dx12;

use raw_window_handle::{RawWindowHandle, WebWindowHandle};

pub use backend::{GfxResult, GraphicsBackend, SwapChainDesc};
pub use headless::{ApiEvent, HeadlessBackend, ObjectKind};
#[cfg(target_os = "windows")]
pub use dx12::Dx12Backend;

/// 无窗口运行时使用的占位窗口句柄
///
/// 只有 [`HeadlessBackend`] 接受它；真实后端会以交换链错误拒绝。
pub fn headless_window_handle() -> RawWindowHandle {
    RawWindowHandle::Web(WebWindowHandle::new(1))
}
