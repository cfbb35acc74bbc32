//! DirectX 12 描述符堆实现
//!
//! 封装 `ID3D12DescriptorHeap`，按槽位索引计算 CPU / GPU 句柄。

use windows::Win32::Graphics::Direct3D12::*;

use crate::core::error::GraphicsError;
use crate::renderer::descriptor::{DescriptorHeapDescriptor, DescriptorType};

fn native_heap_type(kind: DescriptorType) -> D3D12_DESCRIPTOR_HEAP_TYPE {
    match kind {
        DescriptorType::RenderTargetView => D3D12_DESCRIPTOR_HEAP_TYPE_RTV,
        DescriptorType::DepthStencilView => D3D12_DESCRIPTOR_HEAP_TYPE_DSV,
        DescriptorType::ShaderResourceView => D3D12_DESCRIPTOR_HEAP_TYPE_CBV_SRV_UAV,
    }
}

/// `ID3D12DescriptorHeap` 加上按槽位寻址所需的基址与步长
pub struct Dx12DescriptorHeap {
    heap: ID3D12DescriptorHeap,
    descriptor_type: DescriptorType,
    stride: usize,
    cpu_base: usize,
    /// 只有着色器可见的堆才有 GPU 基址
    gpu_base: Option<u64>,
    capacity: u32,
}

impl Dx12DescriptorHeap {
    pub fn new(device: &ID3D12Device, desc: &DescriptorHeapDescriptor) -> Result<Self, GraphicsError> {
        let heap_type = native_heap_type(desc.descriptor_type);
        let heap_desc = D3D12_DESCRIPTOR_HEAP_DESC {
            Type: heap_type,
            NumDescriptors: desc.num_descriptors,
            Flags: if desc.shader_visible {
                D3D12_DESCRIPTOR_HEAP_FLAG_SHADER_VISIBLE
            } else {
                D3D12_DESCRIPTOR_HEAP_FLAG_NONE
            },
            NodeMask: 0,
        };

        let heap: ID3D12DescriptorHeap = unsafe { device.CreateDescriptorHeap(&heap_desc) }.map_err(|e| {
            GraphicsError::DescriptorHeapCreation(format!(
                "{} heap ({} slots): {}",
                desc.descriptor_type.name(),
                desc.num_descriptors,
                e
            ))
        })?;

        if let Some(name) = desc.name.as_deref() {
            let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
            unsafe {
                let _ = heap.SetName(windows::core::PCWSTR(wide.as_ptr()));
            }
        }

        let (stride, cpu_base, gpu_base) = unsafe {
            (
                device.GetDescriptorHandleIncrementSize(heap_type) as usize,
                heap.GetCPUDescriptorHandleForHeapStart().ptr,
                desc.shader_visible.then(|| heap.GetGPUDescriptorHandleForHeapStart().ptr),
            )
        };

        Ok(Self {
            heap,
            descriptor_type: desc.descriptor_type,
            stride,
            cpu_base,
            gpu_base,
            capacity: desc.num_descriptors,
        })
    }

    pub fn heap(&self) -> &ID3D12DescriptorHeap {
        &self.heap
    }

    pub fn descriptor_type(&self) -> DescriptorType {
        self.descriptor_type
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn cpu_handle(&self, slot: u32) -> D3D12_CPU_DESCRIPTOR_HANDLE {
        D3D12_CPU_DESCRIPTOR_HANDLE { ptr: self.cpu_base + slot as usize * self.stride }
    }

    /// 非着色器可见的堆返回空句柄
    pub fn gpu_handle(&self, slot: u32) -> D3D12_GPU_DESCRIPTOR_HANDLE {
        D3D12_GPU_DESCRIPTOR_HANDLE {
            ptr: self.gpu_base.map_or(0, |base| base + slot as u64 * self.stride as u64),
        }
    }
}
