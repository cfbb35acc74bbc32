//! DirectX 12 图形 API 实现模块
//!
//! - Backend: [`GraphicsBackend`](crate::gfx::GraphicsBackend) 的 D3D12 / DXGI 实现
//! - Descriptor: DX12 描述符堆

pub mod backend;
pub mod descriptor;

// 重新导出常用类型
pub use backend::{Dx12Backend, Dx12FenceEvent};
pub use descriptor::Dx12DescriptorHeap;
