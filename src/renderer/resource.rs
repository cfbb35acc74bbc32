//! 资源管理模块
//!
//! - [`UploadBuffer`]：上传堆中的类型化缓冲区，常量缓冲区自动按 256 字节对齐
//! - [`ObjectConstants`] / [`CameraConstants`]：着色器 b0 / b1 的数据布局
//! - [`FrameResourcePool`]：每个交换链缓冲区最后一次提交时的栅栏值

use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

use crate::gfx::backend::{GfxResult, GraphicsBackend};
use crate::math::{matrix, Matrix4};

/// DirectX 12 要求常量缓冲区视图按 256 字节对齐
pub const CONSTANT_BUFFER_ALIGNMENT: u64 = 256;

/// 计算常量缓冲区对齐后的字节数
pub fn constant_buffer_byte_size(size: u64) -> u64 {
    (size + CONSTANT_BUFFER_ALIGNMENT - 1) & !(CONSTANT_BUFFER_ALIGNMENT - 1)
}

/// 物体常量（HLSL `cbuffer cbPerObject : register(b0)`）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    /// 已转置的世界矩阵
    pub world: [[f32; 4]; 4],
}

impl ObjectConstants {
    pub fn from_world(world: &Matrix4) -> Self {
        Self { world: matrix::to_gpu_layout(world) }
    }
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self::from_world(&Matrix4::identity())
    }
}

/// 相机常量（HLSL `cbuffer cbPass : register(b1)`）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraConstants {
    /// 已转置的视图投影矩阵
    pub view_proj: [[f32; 4]; 4],
}

impl CameraConstants {
    pub fn from_view_projection(view_proj: &Matrix4) -> Self {
        Self { view_proj: matrix::to_gpu_layout(view_proj) }
    }
}

impl Default for CameraConstants {
    fn default() -> Self {
        Self::from_view_projection(&Matrix4::identity())
    }
}

/// 上传缓冲区（CPU -> GPU）
///
/// 用于频繁更新的数据。缓冲区常驻映射语义由后端保证：
/// 每次 [`copy_data`](Self::copy_data) 都直接写入 GPU 可见的内存。
///
/// # 类型参数
///
/// * `B` - 图形后端
/// * `T` - 缓冲区中存储的数据类型
///
/// # 示例
///
/// ```ignore
/// let buffer = UploadBuffer::<_, ObjectConstants>::new(backend, device, 1, true)?;
/// buffer.copy_data(backend, 0, &ObjectConstants::default())?;
/// ```
pub struct UploadBuffer<B: GraphicsBackend, T: Pod> {
    resource: B::Resource,
    /// 元素数量
    element_count: usize,
    /// 每个元素的大小（对齐后）
    element_size: u64,
    is_constant_buffer: bool,
    _phantom: PhantomData<T>,
}

impl<B: GraphicsBackend, T: Pod> UploadBuffer<B, T> {
    /// 创建新的上传缓冲区
    ///
    /// # 参数
    ///
    /// * `element_count` - 元素数量
    /// * `is_constant_buffer` - 是否作为常量缓冲区使用（决定对齐）
    pub fn new(backend: &B, device: &B::Device, element_count: usize, is_constant_buffer: bool) -> GfxResult<Self> {
        let raw_size = std::mem::size_of::<T>() as u64;
        let element_size = if is_constant_buffer {
            constant_buffer_byte_size(raw_size)
        } else {
            raw_size
        };

        let resource = backend.create_upload_buffer(device, element_size * element_count as u64)?;

        Ok(Self {
            resource,
            element_count,
            element_size,
            is_constant_buffer,
            _phantom: PhantomData,
        })
    }

    /// 写入第 `index` 个元素
    pub fn copy_data(&self, backend: &B, index: usize, data: &T) -> GfxResult<()> {
        if index >= self.element_count {
            return Err(crate::core::error::GraphicsError::ResourceCreation(format!(
                "upload buffer index {} out of range (count {})",
                index, self.element_count
            )));
        }
        backend.write_buffer(&self.resource, self.element_offset(index), bytemuck::bytes_of(data))
    }

    /// 从第 0 个元素开始连续写入；只用于未对齐的缓冲区（顶点、索引）
    pub fn copy_slice(&self, backend: &B, data: &[T]) -> GfxResult<()> {
        if self.is_constant_buffer || data.len() > self.element_count {
            return Err(crate::core::error::GraphicsError::ResourceCreation(format!(
                "cannot copy {} elements into a buffer of {} (constant: {})",
                data.len(),
                self.element_count,
                self.is_constant_buffer
            )));
        }
        backend.write_buffer(&self.resource, 0, bytemuck::cast_slice(data))
    }

    /// 设置调试名称
    pub fn set_name(&self, backend: &B, name: &str) {
        backend.set_debug_name(&self.resource, name);
    }

    pub fn resource(&self) -> &B::Resource {
        &self.resource
    }

    /// 获取元素数量
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// 获取每个元素的大小（对齐后）
    pub fn element_size(&self) -> u64 {
        self.element_size
    }

    /// 获取总大小
    pub fn total_size(&self) -> u64 {
        self.element_size * self.element_count as u64
    }

    pub fn is_constant_buffer(&self) -> bool {
        self.is_constant_buffer
    }

    /// 计算元素在缓冲区中的偏移量
    pub fn element_offset(&self, index: usize) -> u64 {
        self.element_size * index as u64
    }
}

/// 帧资源
///
/// 每个交换链缓冲区一份，记录该缓冲区最后一次提交时 signal 的栅栏值。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameResource {
    /// 帧索引（即交换链缓冲区索引）
    pub frame_index: usize,
    /// Fence值，用于同步
    pub fence_value: u64,
    /// 资源是否可用
    pub available: bool,
}

impl FrameResource {
    pub fn new(frame_index: usize) -> Self {
        Self {
            frame_index,
            fence_value: 0,
            available: true,
        }
    }

    /// 标记为不可用（GPU正在使用）
    pub fn mark_in_use(&mut self, fence_value: u64) {
        self.available = false;
        self.fence_value = fence_value;
    }

    /// 标记为可用
    pub fn mark_available(&mut self) {
        self.available = true;
    }
}

/// 帧资源池
///
/// 帧资源的数量等于交换链缓冲区数量，也就是在途帧数的上限。
#[derive(Debug)]
pub struct FrameResourcePool {
    resources: Vec<FrameResource>,
}

impl FrameResourcePool {
    /// 创建新的帧资源池
    pub fn new(count: usize) -> Self {
        Self {
            resources: (0..count).map(FrameResource::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// 根据索引获取帧资源
    pub fn get(&self, index: usize) -> Option<&FrameResource> {
        self.resources.get(index)
    }

    /// 根据索引获取帧资源的可变引用
    pub fn get_mut(&mut self, index: usize) -> Option<&mut FrameResource> {
        self.resources.get_mut(index)
    }

    /// 根据Fence值更新帧资源可用性
    pub fn update_availability(&mut self, completed_fence_value: u64) {
        for resource in &mut self.resources {
            if !resource.available && resource.fence_value <= completed_fence_value {
                resource.mark_available();
            }
        }
    }

    /// 仍在 GPU 上的帧数
    pub fn in_flight(&self) -> usize {
        self.resources.iter().filter(|r| !r.available).count()
    }

    /// 全部标记为可用（GPU 空闲之后调用）
    pub fn reset(&mut self) {
        for resource in &mut self.resources {
            resource.fence_value = 0;
            resource.mark_available();
        }
    }
}
