//! 描述符管理模块
//!
//! 描述符堆的创建参数，以及着色器可见 SRV 堆中槽位的分配。
//!
//! # 使用的描述符堆
//!
//! - **RTV** (Render Target View)：每个交换链缓冲区一个
//! - **DSV** (Depth Stencil View)：一个深度缓冲区
//! - **SRV** (Shader Resource View)：着色器可见，存放纹理视图；
//!   槽位 0 固定为内置的 1×1 白色纹理

use crate::core::error::TextureError;

/// 描述符类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    /// 渲染目标视图 (RTV)
    RenderTargetView,
    /// 深度模板视图 (DSV)
    DepthStencilView,
    /// 着色资源视图 (SRV)
    ShaderResourceView,
}

impl DescriptorType {
    /// 描述符类型是否需要着色器可见
    pub fn is_shader_visible(&self) -> bool {
        matches!(self, DescriptorType::ShaderResourceView)
    }

    /// 获取描述符类型名称
    pub fn name(&self) -> &'static str {
        match self {
            DescriptorType::RenderTargetView => "RTV",
            DescriptorType::DepthStencilView => "DSV",
            DescriptorType::ShaderResourceView => "SRV",
        }
    }
}

/// 描述符堆描述信息
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptorHeapDescriptor {
    /// 描述符类型
    pub descriptor_type: DescriptorType,
    /// 描述符数量
    pub num_descriptors: u32,
    /// 是否着色器可见
    pub shader_visible: bool,
    /// 调试名称
    pub name: Option<String>,
}

impl DescriptorHeapDescriptor {
    /// 创建新的描述符堆描述符
    pub fn new(descriptor_type: DescriptorType, num_descriptors: u32) -> Self {
        Self {
            descriptor_type,
            num_descriptors,
            shader_visible: descriptor_type.is_shader_visible(),
            name: None,
        }
    }

    /// 设置调试名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 创建 RTV 堆描述符
    pub fn rtv(num_descriptors: u32) -> Self {
        Self::new(DescriptorType::RenderTargetView, num_descriptors)
            .with_name("RTV Heap")
    }

    /// 创建 DSV 堆描述符
    pub fn dsv(num_descriptors: u32) -> Self {
        Self::new(DescriptorType::DepthStencilView, num_descriptors)
            .with_name("DSV Heap")
    }

    /// 创建着色器可见的 SRV 堆描述符
    pub fn srv(num_descriptors: u32) -> Self {
        Self::new(DescriptorType::ShaderResourceView, num_descriptors)
            .with_name("SRV Heap")
    }
}

/// SRV 槽位分配器
///
/// 先复用已释放的槽位，再线性增长。纹理在析构时归还槽位。
#[derive(Debug)]
pub struct DescriptorSlotAllocator {
    capacity: u32,
    next: u32,
    free: Vec<u32>,
}

impl DescriptorSlotAllocator {
    pub fn new(capacity: u32) -> Self {
        Self { capacity, next: 0, free: Vec::new() }
    }

    /// 分配一个槽位
    pub fn allocate(&mut self) -> Result<u32, TextureError> {
        if let Some(slot) = self.free.pop() {
            return Ok(slot);
        }
        if self.next >= self.capacity {
            return Err(TextureError::SlotsExhausted(self.capacity));
        }
        let slot = self.next;
        self.next += 1;
        Ok(slot)
    }

    /// 归还槽位；重复归还或越界的槽位被忽略
    pub fn free(&mut self, slot: u32) {
        if slot < self.next && !self.free.contains(&slot) {
            self.free.push(slot);
        }
    }

    /// 当前已分配数量
    pub fn allocated_count(&self) -> u32 {
        self.next - self.free.len() as u32
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty() && self.next >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_descriptors() {
        let rtv = DescriptorHeapDescriptor::rtv(2);
        assert_eq!(rtv.descriptor_type, DescriptorType::RenderTargetView);
        assert!(!rtv.shader_visible);

        let srv = DescriptorHeapDescriptor::srv(64);
        assert!(srv.shader_visible);
        assert_eq!(srv.name.as_deref(), Some("SRV Heap"));
    }

    #[test]
    fn test_slot_reuse() {
        let mut allocator = DescriptorSlotAllocator::new(3);
        assert_eq!(allocator.allocate().unwrap(), 0);
        assert_eq!(allocator.allocate().unwrap(), 1);
        assert_eq!(allocator.allocate().unwrap(), 2);
        assert!(allocator.is_full());
        assert!(matches!(allocator.allocate(), Err(TextureError::SlotsExhausted(3))));

        allocator.free(1);
        allocator.free(1);
        assert_eq!(allocator.allocated_count(), 2);
        assert_eq!(allocator.allocate().unwrap(), 1);
    }
}
