//! 图形后端的统一抽象接口
//!
//! 本模块定义了所有图形后端必须实现的接口。接口刻意保持"薄"：
//! 每个关联类型对应一种原生对象，每个方法对应一次原生调用，
//! 调用顺序完全由上层的 [`RenderResources`](crate::renderer::RenderResources) 决定。
//!
//! 所有句柄在 `Drop` 时释放其原生对象，因此释放顺序等同于句柄的析构顺序。

use raw_window_handle::RawWindowHandle;

use crate::core::error::GraphicsError;
use crate::renderer::descriptor::DescriptorHeapDescriptor;
use crate::renderer::pipeline::{Format, PipelineStateDesc, ResourceState, RootSignatureDesc};
use crate::renderer::shaders::{ShaderCompileFlags, ShaderSource, ShaderStage};

/// 后端调用的结果类型
pub type GfxResult<T> = std::result::Result<T, GraphicsError>;

/// 交换链参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapChainDesc {
    pub width: u32,
    pub height: u32,
    pub buffer_count: u32,
    pub format: Format,
}

/// 图形后端的统一接口
///
/// # 约定
///
/// - 创建类方法失败时返回对应的 [`GraphicsError`] 变体，不做重试
/// - 命令录制类方法没有返回值，与原生 API 一致
/// - 后端本身不持有任何由它创建的对象
pub trait GraphicsBackend {
    type Factory;
    type Adapter;
    type Device;
    type CommandQueue;
    type SwapChain;
    type DescriptorHeap;
    /// 缓冲区、纹理、交换链缓冲区与深度缓冲区
    type Resource;
    type CommandAllocator;
    type ShaderBlob;
    type RootSignature;
    type PipelineState;
    type CommandList;
    type Fence;
    type FenceEvent;

    /// 后端名称，用于日志输出
    fn name(&self) -> &'static str;

    // ---------------------------------------------------------------
    // 设备与交换链
    // ---------------------------------------------------------------

    /// 启用调试层（必须在创建设备之前调用）
    fn enable_debug_layer(&self) -> GfxResult<()>;

    fn create_factory(&self, debug: bool) -> GfxResult<Self::Factory>;

    /// 选择一个硬件适配器（优先高性能 GPU）
    fn enumerate_adapter(&self, factory: &Self::Factory) -> GfxResult<Self::Adapter>;

    /// 适配器的可读描述
    fn adapter_description(&self, adapter: &Self::Adapter) -> String;

    fn create_device(&self, adapter: &Self::Adapter) -> GfxResult<Self::Device>;

    fn create_command_queue(&self, device: &Self::Device) -> GfxResult<Self::CommandQueue>;

    fn create_descriptor_heap(
        &self,
        device: &Self::Device,
        desc: &DescriptorHeapDescriptor,
    ) -> GfxResult<Self::DescriptorHeap>;

    fn create_swap_chain(
        &self,
        factory: &Self::Factory,
        queue: &Self::CommandQueue,
        window: RawWindowHandle,
        desc: &SwapChainDesc,
    ) -> GfxResult<Self::SwapChain>;

    /// 获取交换链的第 `index` 个缓冲区
    fn back_buffer(&self, swap_chain: &Self::SwapChain, index: u32) -> GfxResult<Self::Resource>;

    fn current_back_buffer_index(&self, swap_chain: &Self::SwapChain) -> u32;

    /// 调整交换链缓冲区尺寸。调用前必须释放所有缓冲区引用。
    fn resize_swap_chain(&self, swap_chain: &Self::SwapChain, desc: &SwapChainDesc) -> GfxResult<()>;

    fn create_render_target_view(
        &self,
        device: &Self::Device,
        resource: &Self::Resource,
        heap: &Self::DescriptorHeap,
        index: u32,
    );

    fn create_depth_buffer(&self, device: &Self::Device, width: u32, height: u32) -> GfxResult<Self::Resource>;

    fn create_depth_stencil_view(
        &self,
        device: &Self::Device,
        resource: &Self::Resource,
        heap: &Self::DescriptorHeap,
        index: u32,
    );

    fn create_command_allocator(&self, device: &Self::Device) -> GfxResult<Self::CommandAllocator>;

    // ---------------------------------------------------------------
    // 管线
    // ---------------------------------------------------------------

    fn compile_shader(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
        flags: ShaderCompileFlags,
    ) -> GfxResult<Self::ShaderBlob>;

    /// 序列化并创建根签名
    fn create_root_signature(
        &self,
        device: &Self::Device,
        desc: &RootSignatureDesc,
    ) -> GfxResult<Self::RootSignature>;

    fn create_pipeline_state(
        &self,
        device: &Self::Device,
        desc: &PipelineStateDesc<'_, Self>,
    ) -> GfxResult<Self::PipelineState>
    where
        Self: Sized;

    /// 创建命令列表；返回时列表处于关闭状态
    fn create_command_list(
        &self,
        device: &Self::Device,
        allocator: &Self::CommandAllocator,
        pipeline_state: &Self::PipelineState,
    ) -> GfxResult<Self::CommandList>;

    // ---------------------------------------------------------------
    // 同步
    // ---------------------------------------------------------------

    fn create_fence(&self, device: &Self::Device, initial_value: u64) -> GfxResult<Self::Fence>;

    fn create_fence_event(&self) -> GfxResult<Self::FenceEvent>;

    fn signal(&self, queue: &Self::CommandQueue, fence: &Self::Fence, value: u64) -> GfxResult<()>;

    fn completed_value(&self, fence: &Self::Fence) -> u64;

    fn set_event_on_completion(
        &self,
        fence: &Self::Fence,
        value: u64,
        event: &Self::FenceEvent,
    ) -> GfxResult<()>;

    /// 阻塞直到事件被触发
    fn wait_for_event(&self, event: &Self::FenceEvent) -> GfxResult<()>;

    // ---------------------------------------------------------------
    // 资源
    // ---------------------------------------------------------------

    /// 在上传堆中创建缓冲区（CPU 可写，GPU 可读）
    fn create_upload_buffer(&self, device: &Self::Device, size: u64) -> GfxResult<Self::Resource>;

    /// 写入上传缓冲区
    fn write_buffer(&self, resource: &Self::Resource, offset: u64, data: &[u8]) -> GfxResult<()>;

    fn gpu_virtual_address(&self, resource: &Self::Resource) -> u64;

    /// 创建 RGBA8 纹理并写入像素（行紧密排列）
    fn create_texture(
        &self,
        device: &Self::Device,
        width: u32,
        height: u32,
        pixels: &[u8],
    ) -> GfxResult<Self::Resource>;

    fn create_shader_resource_view(
        &self,
        device: &Self::Device,
        resource: &Self::Resource,
        heap: &Self::DescriptorHeap,
        index: u32,
    );

    fn set_debug_name(&self, resource: &Self::Resource, name: &str);

    // ---------------------------------------------------------------
    // 命令录制与提交
    // ---------------------------------------------------------------

    fn reset_command_allocator(&self, allocator: &Self::CommandAllocator) -> GfxResult<()>;

    fn reset_command_list(
        &self,
        list: &Self::CommandList,
        allocator: &Self::CommandAllocator,
        pipeline_state: &Self::PipelineState,
    ) -> GfxResult<()>;

    fn close_command_list(&self, list: &Self::CommandList) -> GfxResult<()>;

    fn resource_barrier(
        &self,
        list: &Self::CommandList,
        resource: &Self::Resource,
        before: ResourceState,
        after: ResourceState,
    );

    fn set_render_targets(
        &self,
        list: &Self::CommandList,
        rtv_heap: &Self::DescriptorHeap,
        rtv_index: u32,
        dsv_heap: &Self::DescriptorHeap,
        dsv_index: u32,
    );

    fn clear_render_target_view(
        &self,
        list: &Self::CommandList,
        heap: &Self::DescriptorHeap,
        index: u32,
        color: [f32; 4],
    );

    fn clear_depth_stencil_view(
        &self,
        list: &Self::CommandList,
        heap: &Self::DescriptorHeap,
        index: u32,
        depth: f32,
    );

    fn set_viewport_and_scissor(&self, list: &Self::CommandList, width: u32, height: u32);

    fn set_graphics_root_signature(&self, list: &Self::CommandList, root_signature: &Self::RootSignature);

    fn set_descriptor_heap(&self, list: &Self::CommandList, heap: &Self::DescriptorHeap);

    /// 把 `resource` 中从 `offset` 字节开始的常量缓冲区绑定到根参数
    fn set_root_constant_buffer_view(
        &self,
        list: &Self::CommandList,
        root_index: u32,
        resource: &Self::Resource,
        offset: u64,
    );

    fn set_root_descriptor_table(
        &self,
        list: &Self::CommandList,
        root_index: u32,
        heap: &Self::DescriptorHeap,
        slot: u32,
    );

    fn set_vertex_buffer(&self, list: &Self::CommandList, resource: &Self::Resource, size: u32, stride: u32);

    /// 32 位索引
    fn set_index_buffer(&self, list: &Self::CommandList, resource: &Self::Resource, size: u32);

    /// 以三角形列表拓扑绘制
    fn draw_indexed(&self, list: &Self::CommandList, index_count: u32);

    fn execute_command_list(&self, queue: &Self::CommandQueue, list: &Self::CommandList) -> GfxResult<()>;

    fn present(&self, swap_chain: &Self::SwapChain, sync_interval: u32) -> GfxResult<()>;

    // ---------------------------------------------------------------
    // 调试
    // ---------------------------------------------------------------

    /// 报告仍然存活的原生对象。返回 `None` 表示后端只能把报告输出到调试器。
    fn report_live_objects(&self) -> Option<usize>;
}
