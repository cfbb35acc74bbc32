//! 无 GPU 的记录后端
//!
//! `HeadlessBackend` 实现了 [`GraphicsBackend`]，但不调用任何原生 API：
//! 每一次对象创建、释放、命令录制、提交、呈现和栅栏操作都被追加到一个
//! 事件日志（journal）中。它用于测试和在没有 GPU 的平台上运行帧循环。
//!
//! # GPU 时间线
//!
//! - [`GpuTimeline::Immediate`]：每次 `signal` 立即完成
//! - [`GpuTimeline::Lagging`]：GPU 只在 CPU 阻塞等待时才追赶到等待的值，
//!   用来验证 CPU 只在必要时等待
//!
//! # 故障注入
//!
//! [`HeadlessBackend::fail_on`] 让某种对象的创建失败，
//! [`HeadlessBackend::fail_shader`] 让某个阶段的着色器编译失败。
//!
//! 句柄与后端共享内部状态（`Rc<RefCell<_>>`），因此该后端只能在单线程中使用。

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use raw_window_handle::RawWindowHandle;
use tracing::{debug, trace};

use crate::core::error::GraphicsError;
use crate::gfx::backend::{GfxResult, GraphicsBackend, SwapChainDesc};
use crate::renderer::descriptor::{DescriptorHeapDescriptor, DescriptorType};
use crate::renderer::pipeline::{PipelineStateDesc, ResourceState, RootSignatureDesc};
use crate::renderer::shaders::{ShaderCompileFlags, ShaderSource, ShaderStage};

/// 原生对象种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Factory,
    Adapter,
    Device,
    CommandQueue,
    SwapChain,
    DescriptorHeap(DescriptorType),
    /// 交换链的第 N 个缓冲区
    RenderTarget(u32),
    DepthBuffer,
    CommandAllocator,
    ShaderBlob(ShaderStage),
    RootSignature,
    PipelineState,
    CommandList,
    Fence,
    FenceEvent,
    Buffer,
    Texture,
}

impl ObjectKind {
    /// 该种类对象创建失败时对应的错误
    pub fn creation_error(&self, message: impl Into<String>) -> GraphicsError {
        let message = message.into();
        match *self {
            ObjectKind::Factory => GraphicsError::FactoryCreation(message),
            ObjectKind::Adapter => GraphicsError::AdapterNotFound(message),
            ObjectKind::Device => GraphicsError::DeviceCreation(message),
            ObjectKind::CommandQueue => GraphicsError::CommandQueueCreation(message),
            ObjectKind::SwapChain => GraphicsError::SwapchainError(message),
            ObjectKind::DescriptorHeap(_) => GraphicsError::DescriptorHeapCreation(message),
            ObjectKind::RenderTarget(index) => GraphicsError::RenderTargetCreation { index, reason: message },
            ObjectKind::CommandAllocator => GraphicsError::CommandAllocatorCreation(message),
            ObjectKind::ShaderBlob(stage) => GraphicsError::ShaderCompilation { stage, message },
            ObjectKind::RootSignature => GraphicsError::RootSignatureCreation(message),
            ObjectKind::PipelineState => GraphicsError::PipelineStateCreation(message),
            ObjectKind::CommandList => GraphicsError::CommandListCreation(message),
            ObjectKind::Fence | ObjectKind::FenceEvent => GraphicsError::Fence(message),
            ObjectKind::DepthBuffer | ObjectKind::Buffer | ObjectKind::Texture => {
                GraphicsError::ResourceCreation(message)
            }
        }
    }
}

/// 录制到命令列表中的命令
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    ResetAllocator,
    Reset,
    Close,
    Barrier { before: ResourceState, after: ResourceState },
    SetRenderTargets { rtv_index: u32, dsv_index: u32 },
    ClearRenderTarget { index: u32, color: [f32; 4] },
    ClearDepth { depth: f32 },
    SetViewport { width: u32, height: u32 },
    SetRootSignature,
    SetDescriptorHeap,
    SetConstantBuffer { root_index: u32, address: u64 },
    SetDescriptorTable { root_index: u32, slot: u32 },
    SetVertexBuffer { size: u32, stride: u32 },
    SetIndexBuffer { size: u32 },
    DrawIndexed { index_count: u32 },
}

/// 事件日志中的一条记录
#[derive(Debug, Clone, PartialEq)]
pub enum ApiEvent {
    DebugLayerEnabled,
    Created(ObjectKind),
    Released(ObjectKind),
    /// 在描述符堆中写入视图
    ViewCreated { heap: DescriptorType, index: u32 },
    Command(Command),
    Execute,
    Present { sync_interval: u32 },
    Signal(u64),
    SetEventOnCompletion(u64),
    /// CPU 在事件上阻塞，直到栅栏达到该值
    Wait(u64),
    ResizeSwapChain { width: u32, height: u32 },
    ReportLiveObjects(usize),
}

/// GPU 完成工作的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuTimeline {
    /// 每次 signal 立即完成
    Immediate,
    /// 只有在 CPU 等待时才完成
    #[default]
    Lagging,
}

#[derive(Debug, Default)]
struct FenceState {
    completed: u64,
    last_signaled: u64,
}

#[derive(Debug, Default)]
struct State {
    events: Vec<ApiEvent>,
    next_id: u64,
    live: HashMap<u64, ObjectKind>,
    fail_on: HashSet<ObjectKind>,
    fail_shader: HashSet<ShaderStage>,
    fail_writes: HashSet<u64>,
    timeline: GpuTimeline,
    fences: HashMap<u64, FenceState>,
    /// 事件 id -> (栅栏 id, 等待值)
    armed_events: HashMap<u64, (u64, u64)>,
    open_lists: HashSet<u64>,
    buffers: HashMap<u64, Vec<u8>>,
    back_buffer_index: u32,
    buffer_count: u32,
}

impl State {
    fn record(&mut self, event: ApiEvent) {
        trace!(?event, "headless");
        self.events.push(event);
    }

    fn live_count_of(&self, predicate: impl Fn(&ObjectKind) -> bool) -> usize {
        self.live.values().filter(|k| predicate(k)).count()
    }
}

/// 无 GPU 后端创建的所有对象共用的句柄
pub struct HeadlessObject {
    id: u64,
    kind: ObjectKind,
    state: Rc<RefCell<State>>,
}

impl HeadlessObject {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }
}

impl std::fmt::Debug for HeadlessObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeadlessObject")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl Drop for HeadlessObject {
    fn drop(&mut self) {
        let mut state = self.state.borrow_mut();
        state.live.remove(&self.id);
        state.buffers.remove(&self.id);
        state.fences.remove(&self.id);
        state.open_lists.remove(&self.id);
        state.record(ApiEvent::Released(self.kind));
    }
}

/// 记录型后端
///
/// 克隆得到的实例共享同一个事件日志，测试可以保留一个克隆，
/// 在渲染器销毁后检查日志。
#[derive(Clone, Default)]
pub struct HeadlessBackend {
    state: Rc<RefCell<State>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定 GPU 时间线
    pub fn with_timeline(timeline: GpuTimeline) -> Self {
        let backend = Self::new();
        backend.state.borrow_mut().timeline = timeline;
        backend
    }

    /// 让指定种类对象的创建失败
    pub fn fail_on(&self, kind: ObjectKind) -> &Self {
        self.state.borrow_mut().fail_on.insert(kind);
        self
    }

    /// 让指定阶段的着色器编译失败
    pub fn fail_shader(&self, stage: ShaderStage) -> &Self {
        self.state.borrow_mut().fail_shader.insert(stage);
        self
    }

    /// 让之后写入 `resource` 的操作失败
    pub fn fail_writes_to(&self, resource: &HeadlessObject) -> &Self {
        self.state.borrow_mut().fail_writes.insert(resource.id);
        self
    }

    /// 事件日志的快照
    pub fn events(&self) -> Vec<ApiEvent> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    /// 日志中按顺序出现的命令
    pub fn commands(&self) -> Vec<Command> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                ApiEvent::Command(c) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    /// 当前存活的对象数量
    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// GPU 追赶到所有已 signal 的值
    pub fn advance_gpu(&self) {
        for fence in self.state.borrow_mut().fences.values_mut() {
            fence.completed = fence.last_signaled;
        }
    }

    /// 读取上传缓冲区的内容
    pub fn buffer_contents(&self, resource: &HeadlessObject) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&resource.id).cloned()
    }

    fn create(&self, kind: ObjectKind) -> GfxResult<HeadlessObject> {
        let mut state = self.state.borrow_mut();
        if state.fail_on.contains(&kind) {
            debug!(?kind, "Injected creation failure");
            return Err(kind.creation_error("E_FAIL (injected)"));
        }

        state.next_id += 1;
        let id = state.next_id;
        state.live.insert(id, kind);
        state.record(ApiEvent::Created(kind));

        Ok(HeadlessObject { id, kind, state: Rc::clone(&self.state) })
    }

    fn command(&self, list: &HeadlessObject, command: Command) {
        let mut state = self.state.borrow_mut();
        if !state.open_lists.contains(&list.id) {
            debug!(?command, "Command recorded on a closed command list");
        }
        state.record(ApiEvent::Command(command));
    }
}

impl GraphicsBackend for HeadlessBackend {
    type Factory = HeadlessObject;
    type Adapter = HeadlessObject;
    type Device = HeadlessObject;
    type CommandQueue = HeadlessObject;
    type SwapChain = HeadlessObject;
    type DescriptorHeap = HeadlessObject;
    type Resource = HeadlessObject;
    type CommandAllocator = HeadlessObject;
    type ShaderBlob = HeadlessObject;
    type RootSignature = HeadlessObject;
    type PipelineState = HeadlessObject;
    type CommandList = HeadlessObject;
    type Fence = HeadlessObject;
    type FenceEvent = HeadlessObject;

    fn name(&self) -> &'static str {
        "Headless"
    }

    fn enable_debug_layer(&self) -> GfxResult<()> {
        self.state.borrow_mut().record(ApiEvent::DebugLayerEnabled);
        Ok(())
    }

    fn create_factory(&self, _debug: bool) -> GfxResult<HeadlessObject> {
        self.create(ObjectKind::Factory)
    }

    fn enumerate_adapter(&self, _factory: &HeadlessObject) -> GfxResult<HeadlessObject> {
        self.create(ObjectKind::Adapter)
    }

    fn adapter_description(&self, _adapter: &HeadlessObject) -> String {
        "Headless Adapter".to_string()
    }

    fn create_device(&self, _adapter: &HeadlessObject) -> GfxResult<HeadlessObject> {
        self.create(ObjectKind::Device)
    }

    fn create_command_queue(&self, _device: &HeadlessObject) -> GfxResult<HeadlessObject> {
        self.create(ObjectKind::CommandQueue)
    }

    fn create_descriptor_heap(
        &self,
        _device: &HeadlessObject,
        desc: &DescriptorHeapDescriptor,
    ) -> GfxResult<HeadlessObject> {
        let kind = ObjectKind::DescriptorHeap(desc.descriptor_type);
        if desc.num_descriptors == 0 {
            return Err(kind.creation_error("NumDescriptors must be non-zero"));
        }
        self.create(kind)
    }

    fn create_swap_chain(
        &self,
        _factory: &HeadlessObject,
        _queue: &HeadlessObject,
        _window: RawWindowHandle,
        desc: &SwapChainDesc,
    ) -> GfxResult<HeadlessObject> {
        if desc.width == 0 || desc.height == 0 || desc.buffer_count < 2 {
            return Err(GraphicsError::SwapchainError(format!("invalid swap chain description {:?}", desc)));
        }
        let swap_chain = self.create(ObjectKind::SwapChain)?;
        let mut state = self.state.borrow_mut();
        state.buffer_count = desc.buffer_count;
        state.back_buffer_index = 0;
        Ok(swap_chain)
    }

    fn back_buffer(&self, _swap_chain: &HeadlessObject, index: u32) -> GfxResult<HeadlessObject> {
        if index >= self.state.borrow().buffer_count {
            return Err(GraphicsError::RenderTargetCreation {
                index,
                reason: "DXGI_ERROR_INVALID_CALL".to_string(),
            });
        }
        self.create(ObjectKind::RenderTarget(index))
    }

    fn current_back_buffer_index(&self, _swap_chain: &HeadlessObject) -> u32 {
        self.state.borrow().back_buffer_index
    }

    fn resize_swap_chain(&self, _swap_chain: &HeadlessObject, desc: &SwapChainDesc) -> GfxResult<()> {
        let mut state = self.state.borrow_mut();
        let outstanding = state.live_count_of(|k| matches!(k, ObjectKind::RenderTarget(_)));
        if outstanding > 0 {
            return Err(GraphicsError::SwapchainError(format!(
                "{} back buffer reference(s) still alive during resize",
                outstanding
            )));
        }
        state.buffer_count = desc.buffer_count;
        state.back_buffer_index = 0;
        state.record(ApiEvent::ResizeSwapChain { width: desc.width, height: desc.height });
        Ok(())
    }

    fn create_render_target_view(
        &self,
        _device: &HeadlessObject,
        _resource: &HeadlessObject,
        _heap: &HeadlessObject,
        index: u32,
    ) {
        self.state
            .borrow_mut()
            .record(ApiEvent::ViewCreated { heap: DescriptorType::RenderTargetView, index });
    }

    fn create_depth_buffer(&self, _device: &HeadlessObject, _width: u32, _height: u32) -> GfxResult<HeadlessObject> {
        self.create(ObjectKind::DepthBuffer)
    }

    fn create_depth_stencil_view(
        &self,
        _device: &HeadlessObject,
        _resource: &HeadlessObject,
        _heap: &HeadlessObject,
        index: u32,
    ) {
        self.state
            .borrow_mut()
            .record(ApiEvent::ViewCreated { heap: DescriptorType::DepthStencilView, index });
    }

    fn create_command_allocator(&self, _device: &HeadlessObject) -> GfxResult<HeadlessObject> {
        self.create(ObjectKind::CommandAllocator)
    }

    fn compile_shader(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
        _flags: ShaderCompileFlags,
    ) -> GfxResult<HeadlessObject> {
        if self.state.borrow().fail_shader.contains(&stage) {
            return Err(GraphicsError::ShaderCompilation {
                stage,
                message: format!("{}(1,1): error X3000: syntax error: unexpected token", source.path.display()),
            });
        }
        if !source.code.contains(stage.entry_point()) {
            return Err(GraphicsError::ShaderCompilation {
                stage,
                message: format!("error X3501: '{}': entrypoint not found", stage.entry_point()),
            });
        }
        self.create(ObjectKind::ShaderBlob(stage))
    }

    fn create_root_signature(&self, _device: &HeadlessObject, desc: &RootSignatureDesc) -> GfxResult<HeadlessObject> {
        if desc.parameters.is_empty() {
            return Err(GraphicsError::RootSignatureCreation("no root parameters".to_string()));
        }
        self.create(ObjectKind::RootSignature)
    }

    fn create_pipeline_state(
        &self,
        _device: &HeadlessObject,
        desc: &PipelineStateDesc<'_, Self>,
    ) -> GfxResult<HeadlessObject> {
        if desc.input_layout.is_empty() {
            return Err(GraphicsError::PipelineStateCreation("empty input layout".to_string()));
        }
        self.create(ObjectKind::PipelineState)
    }

    fn create_command_list(
        &self,
        _device: &HeadlessObject,
        _allocator: &HeadlessObject,
        _pipeline_state: &HeadlessObject,
    ) -> GfxResult<HeadlessObject> {
        self.create(ObjectKind::CommandList)
    }

    fn create_fence(&self, _device: &HeadlessObject, initial_value: u64) -> GfxResult<HeadlessObject> {
        let fence = self.create(ObjectKind::Fence)?;
        self.state.borrow_mut().fences.insert(
            fence.id,
            FenceState { completed: initial_value, last_signaled: initial_value },
        );
        Ok(fence)
    }

    fn create_fence_event(&self) -> GfxResult<HeadlessObject> {
        self.create(ObjectKind::FenceEvent)
    }

    fn signal(&self, _queue: &HeadlessObject, fence: &HeadlessObject, value: u64) -> GfxResult<()> {
        let mut state = self.state.borrow_mut();
        let immediate = state.timeline == GpuTimeline::Immediate;
        let fence_state = state
            .fences
            .get_mut(&fence.id)
            .ok_or_else(|| GraphicsError::Fence("signal on an unknown fence".to_string()))?;
        fence_state.last_signaled = fence_state.last_signaled.max(value);
        if immediate {
            fence_state.completed = fence_state.completed.max(value);
        }
        state.record(ApiEvent::Signal(value));
        Ok(())
    }

    fn completed_value(&self, fence: &HeadlessObject) -> u64 {
        self.state.borrow().fences.get(&fence.id).map_or(0, |f| f.completed)
    }

    fn set_event_on_completion(&self, fence: &HeadlessObject, value: u64, event: &HeadlessObject) -> GfxResult<()> {
        let mut state = self.state.borrow_mut();
        state.armed_events.insert(event.id, (fence.id, value));
        state.record(ApiEvent::SetEventOnCompletion(value));
        Ok(())
    }

    fn wait_for_event(&self, event: &HeadlessObject) -> GfxResult<()> {
        let mut state = self.state.borrow_mut();
        let (fence_id, value) = state
            .armed_events
            .remove(&event.id)
            .ok_or_else(|| GraphicsError::Fence("waiting on an event that was never armed".to_string()))?;
        let fence = state
            .fences
            .get_mut(&fence_id)
            .ok_or_else(|| GraphicsError::Fence("armed fence no longer exists".to_string()))?;
        if fence.last_signaled < value {
            return Err(GraphicsError::Fence(format!(
                "fence value {} was never signaled, wait would block forever",
                value
            )));
        }
        fence.completed = fence.completed.max(value);
        state.record(ApiEvent::Wait(value));
        Ok(())
    }

    fn create_upload_buffer(&self, _device: &HeadlessObject, size: u64) -> GfxResult<HeadlessObject> {
        if size == 0 {
            return Err(GraphicsError::ResourceCreation("zero sized buffer".to_string()));
        }
        let buffer = self.create(ObjectKind::Buffer)?;
        self.state.borrow_mut().buffers.insert(buffer.id, vec![0; size as usize]);
        Ok(buffer)
    }

    fn write_buffer(&self, resource: &HeadlessObject, offset: u64, data: &[u8]) -> GfxResult<()> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes.contains(&resource.id) {
            debug!(id = resource.id, "Injected buffer write failure");
            return Err(GraphicsError::CommandExecution("buffer write failed (injected)".to_string()));
        }
        let buffer = state
            .buffers
            .get_mut(&resource.id)
            .ok_or_else(|| GraphicsError::ResourceCreation("resource is not a mapped buffer".to_string()))?;
        let start = offset as usize;
        let end = start + data.len();
        if end > buffer.len() {
            return Err(GraphicsError::ResourceCreation(format!(
                "write of {} bytes at offset {} exceeds buffer size {}",
                data.len(),
                offset,
                buffer.len()
            )));
        }
        buffer[start..end].copy_from_slice(data);
        Ok(())
    }

    fn gpu_virtual_address(&self, resource: &HeadlessObject) -> u64 {
        0x1_0000_0000 + (resource.id << 16)
    }

    fn create_texture(&self, _device: &HeadlessObject, width: u32, height: u32, pixels: &[u8]) -> GfxResult<HeadlessObject> {
        if pixels.len() != (width as usize) * (height as usize) * 4 {
            return Err(GraphicsError::ResourceCreation(format!(
                "{} bytes of pixel data for a {}x{} RGBA8 texture",
                pixels.len(),
                width,
                height
            )));
        }
        self.create(ObjectKind::Texture)
    }

    fn create_shader_resource_view(
        &self,
        _device: &HeadlessObject,
        _resource: &HeadlessObject,
        _heap: &HeadlessObject,
        index: u32,
    ) {
        self.state
            .borrow_mut()
            .record(ApiEvent::ViewCreated { heap: DescriptorType::ShaderResourceView, index });
    }

    fn set_debug_name(&self, _resource: &HeadlessObject, _name: &str) {}

    fn reset_command_allocator(&self, _allocator: &HeadlessObject) -> GfxResult<()> {
        self.state.borrow_mut().record(ApiEvent::Command(Command::ResetAllocator));
        Ok(())
    }

    fn reset_command_list(
        &self,
        list: &HeadlessObject,
        _allocator: &HeadlessObject,
        _pipeline_state: &HeadlessObject,
    ) -> GfxResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.open_lists.insert(list.id) {
            return Err(GraphicsError::CommandExecution("command list is already recording".to_string()));
        }
        state.record(ApiEvent::Command(Command::Reset));
        Ok(())
    }

    fn close_command_list(&self, list: &HeadlessObject) -> GfxResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.open_lists.remove(&list.id) {
            return Err(GraphicsError::CommandExecution("command list is not recording".to_string()));
        }
        state.record(ApiEvent::Command(Command::Close));
        Ok(())
    }

    fn resource_barrier(&self, list: &HeadlessObject, _resource: &HeadlessObject, before: ResourceState, after: ResourceState) {
        self.command(list, Command::Barrier { before, after });
    }

    fn set_render_targets(
        &self,
        list: &HeadlessObject,
        _rtv_heap: &HeadlessObject,
        rtv_index: u32,
        _dsv_heap: &HeadlessObject,
        dsv_index: u32,
    ) {
        self.command(list, Command::SetRenderTargets { rtv_index, dsv_index });
    }

    fn clear_render_target_view(&self, list: &HeadlessObject, _heap: &HeadlessObject, index: u32, color: [f32; 4]) {
        self.command(list, Command::ClearRenderTarget { index, color });
    }

    fn clear_depth_stencil_view(&self, list: &HeadlessObject, _heap: &HeadlessObject, _index: u32, depth: f32) {
        self.command(list, Command::ClearDepth { depth });
    }

    fn set_viewport_and_scissor(&self, list: &HeadlessObject, width: u32, height: u32) {
        self.command(list, Command::SetViewport { width, height });
    }

    fn set_graphics_root_signature(&self, list: &HeadlessObject, _root_signature: &HeadlessObject) {
        self.command(list, Command::SetRootSignature);
    }

    fn set_descriptor_heap(&self, list: &HeadlessObject, _heap: &HeadlessObject) {
        self.command(list, Command::SetDescriptorHeap);
    }

    fn set_root_constant_buffer_view(&self, list: &HeadlessObject, root_index: u32, resource: &HeadlessObject, offset: u64) {
        let address = self.gpu_virtual_address(resource) + offset;
        self.command(list, Command::SetConstantBuffer { root_index, address });
    }

    fn set_root_descriptor_table(&self, list: &HeadlessObject, root_index: u32, _heap: &HeadlessObject, slot: u32) {
        self.command(list, Command::SetDescriptorTable { root_index, slot });
    }

    fn set_vertex_buffer(&self, list: &HeadlessObject, _resource: &HeadlessObject, size: u32, stride: u32) {
        self.command(list, Command::SetVertexBuffer { size, stride });
    }

    fn set_index_buffer(&self, list: &HeadlessObject, _resource: &HeadlessObject, size: u32) {
        self.command(list, Command::SetIndexBuffer { size });
    }

    fn draw_indexed(&self, list: &HeadlessObject, index_count: u32) {
        self.command(list, Command::DrawIndexed { index_count });
    }

    fn execute_command_list(&self, _queue: &HeadlessObject, list: &HeadlessObject) -> GfxResult<()> {
        let mut state = self.state.borrow_mut();
        if state.open_lists.contains(&list.id) {
            return Err(GraphicsError::CommandExecution("executing a command list that is still open".to_string()));
        }
        state.record(ApiEvent::Execute);
        Ok(())
    }

    fn present(&self, _swap_chain: &HeadlessObject, sync_interval: u32) -> GfxResult<()> {
        let mut state = self.state.borrow_mut();
        state.back_buffer_index = (state.back_buffer_index + 1) % state.buffer_count.max(1);
        state.record(ApiEvent::Present { sync_interval });
        Ok(())
    }

    fn report_live_objects(&self) -> Option<usize> {
        let mut state = self.state.borrow_mut();
        let live = state.live.len();
        state.record(ApiEvent::ReportLiveObjects(live));
        Some(live)
    }
}
