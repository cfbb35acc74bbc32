//! 设备级渲染资源
//!
//! [`RenderResources`] 为每个原生对象持有一个句柄，按图形 API 规定的顺序创建：
//!
//! ```text
//! factory → adapter → device → queue → swapchain → descriptor heaps
//!         → render targets (+ depth buffer) → command allocator
//!         → root signature → shaders → pipeline state → command list
//!         → fence → fence event
//! ```
//!
//! 任何一步失败都会记录错误并立即返回，后续依赖它的步骤不会执行。
//! 已经创建的对象由部分填充的结构体在 `Drop` 中按固定顺序释放。

use std::cell::RefCell;
use std::rc::Rc;

use raw_window_handle::RawWindowHandle;
use tracing::{debug, error, info, warn};

use crate::core::config::GraphicsConfig;
use crate::core::error::GraphicsError;
use crate::gfx::backend::{GfxResult, GraphicsBackend, SwapChainDesc};
use crate::renderer::descriptor::{DescriptorHeapDescriptor, DescriptorSlotAllocator};
use crate::renderer::pipeline::{
    vertex_input_layout, DepthStencilState, PipelineStateDesc, RasterizerState, RootSignatureDesc,
    BACK_BUFFER_FORMAT, DEPTH_FORMAT,
};
use crate::renderer::resource::FrameResourcePool;
use crate::renderer::shaders::{ShaderCompileFlags, ShaderSource, ShaderStage};
use crate::renderer::sync::{FenceManager, FenceValue};

/// 记录一次创建步骤的结果
fn created<T>(what: &str, result: GfxResult<T>) -> GfxResult<T> {
    match result {
        Ok(value) => {
            info!("{} has been created", what);
            Ok(value)
        }
        Err(e) => {
            error!("Error while creating {}: {}", what, e);
            Err(e)
        }
    }
}

/// 取出一个必须已经创建的对象
fn require<'a, T>(slot: &'a Option<T>, what: &str) -> GfxResult<&'a T> {
    slot.as_ref()
        .ok_or_else(|| GraphicsError::CommandExecution(format!("{} is not available", what)))
}

/// 设备、交换链、管线与同步对象
pub struct RenderResources<B: GraphicsBackend> {
    backend: B,
    settings: GraphicsConfig,
    width: u32,
    height: u32,

    factory: Option<B::Factory>,
    adapter: Option<B::Adapter>,
    device: Option<B::Device>,
    command_queue: Option<B::CommandQueue>,
    swap_chain: Option<B::SwapChain>,
    rtv_heap: Option<B::DescriptorHeap>,
    dsv_heap: Option<B::DescriptorHeap>,
    srv_heap: Option<B::DescriptorHeap>,
    render_targets: Vec<B::Resource>,
    depth_buffer: Option<B::Resource>,
    command_allocator: Option<B::CommandAllocator>,
    root_signature: Option<B::RootSignature>,
    pipeline_state: Option<B::PipelineState>,
    command_list: Option<B::CommandList>,
    fence: Option<B::Fence>,
    fence_event: Option<B::FenceEvent>,

    fence_manager: FenceManager,
    frames: FrameResourcePool,
    /// 当前交换链缓冲区索引
    frame_index: u32,
    srv_slots: Rc<RefCell<DescriptorSlotAllocator>>,
}

impl<B: GraphicsBackend> RenderResources<B> {
    /// 按顺序创建全部设备级对象
    ///
    /// `settings` 在调用前应已通过 [`Config::validate`](crate::core::Config::validate)。
    pub fn new(
        backend: B,
        window: RawWindowHandle,
        width: u32,
        height: u32,
        settings: &GraphicsConfig,
    ) -> GfxResult<Self> {
        info!(
            backend = backend.name(),
            width,
            height,
            frame_count = settings.frame_count,
            "Creating render resources"
        );

        let mut resources = Self {
            backend,
            settings: settings.clone(),
            width,
            height,
            factory: None,
            adapter: None,
            device: None,
            command_queue: None,
            swap_chain: None,
            rtv_heap: None,
            dsv_heap: None,
            srv_heap: None,
            render_targets: Vec::with_capacity(settings.frame_count as usize),
            depth_buffer: None,
            command_allocator: None,
            root_signature: None,
            pipeline_state: None,
            command_list: None,
            fence: None,
            fence_event: None,
            fence_manager: FenceManager::default(),
            frames: FrameResourcePool::new(settings.frame_count as usize),
            frame_index: 0,
            srv_slots: Rc::new(RefCell::new(DescriptorSlotAllocator::new(settings.max_textures))),
        };

        // 失败时 `resources` 在这里被丢弃，Drop 释放已经创建的部分
        resources.create_device_objects(window)?;
        resources.create_pipeline()?;
        resources.create_sync_objects()?;

        info!(backend = resources.backend.name(), "Render resources are ready");
        Ok(resources)
    }

    fn create_device_objects(&mut self, window: RawWindowHandle) -> GfxResult<()> {
        let backend = &self.backend;
        let debug = self.settings.debug_layer;
        let swap_chain_desc = self.swap_chain_desc();

        if debug {
            match backend.enable_debug_layer() {
                Ok(()) => info!("Debug layer has been enabled"),
                Err(e) => warn!("Debug layer is unavailable: {}", e),
            }
        }

        let factory = self.factory.insert(created("DXGI factory", backend.create_factory(debug))?);

        let adapter = self.adapter.insert(created("adapter", backend.enumerate_adapter(factory))?);
        info!(adapter = %backend.adapter_description(adapter), "Using adapter");

        let device = self.device.insert(created("device", backend.create_device(adapter))?);

        let queue = self.command_queue.insert(created("command queue", backend.create_command_queue(device))?);

        self.swap_chain = Some(created(
            "swap chain",
            backend.create_swap_chain(factory, queue, window, &swap_chain_desc),
        )?);

        let frame_count = self.settings.frame_count;
        self.rtv_heap = Some(created(
            "RTV descriptor heap",
            backend.create_descriptor_heap(device, &DescriptorHeapDescriptor::rtv(frame_count).with_name("RtvHeap")),
        )?);
        self.dsv_heap = Some(created(
            "DSV descriptor heap",
            backend.create_descriptor_heap(device, &DescriptorHeapDescriptor::dsv(1).with_name("DsvHeap")),
        )?);
        self.srv_heap = Some(created(
            "SRV descriptor heap",
            backend.create_descriptor_heap(
                device,
                &DescriptorHeapDescriptor::srv(self.settings.max_textures).with_name("SrvHeap"),
            ),
        )?);

        self.create_render_targets()?;
        self.create_depth_stencil()?;

        let device = require(&self.device, "device")?;
        self.command_allocator = Some(created(
            "command allocator",
            self.backend.create_command_allocator(device),
        )?);

        Ok(())
    }

    fn create_render_targets(&mut self) -> GfxResult<()> {
        let backend = &self.backend;
        let device = require(&self.device, "device")?;
        let swap_chain = require(&self.swap_chain, "swap chain")?;
        let rtv_heap = require(&self.rtv_heap, "RTV descriptor heap")?;

        for index in 0..self.settings.frame_count {
            let target = backend.back_buffer(swap_chain, index).map_err(|e| {
                error!("Error while creating render target number: {}: {}", index, e);
                e
            })?;
            backend.create_render_target_view(device, &target, rtv_heap, index);
            self.render_targets.push(target);
        }

        info!(count = self.render_targets.len(), "Render targets have been created");
        Ok(())
    }

    fn create_depth_stencil(&mut self) -> GfxResult<()> {
        let backend = &self.backend;
        let device = require(&self.device, "device")?;
        let dsv_heap = require(&self.dsv_heap, "DSV descriptor heap")?;

        let depth = self
            .depth_buffer
            .insert(created("depth buffer", backend.create_depth_buffer(device, self.width, self.height))?);
        backend.set_debug_name(depth, "DepthBuffer");
        backend.create_depth_stencil_view(device, depth, dsv_heap, 0);
        Ok(())
    }

    fn create_pipeline(&mut self) -> GfxResult<()> {
        let backend = &self.backend;
        let device = require(&self.device, "device")?;

        let root_signature = self.root_signature.insert(created(
            "root signature",
            backend.create_root_signature(device, &RootSignatureDesc::standard()),
        )?);

        let source = ShaderSource::load(&self.settings.shader_path, ShaderStage::Vertex).map_err(|e| {
            error!("Shader loading error: {}", e);
            e
        })?;
        let flags = ShaderCompileFlags::default();
        let vertex_shader = compile(backend, &source, ShaderStage::Vertex, flags)?;
        let pixel_shader = compile(backend, &source, ShaderStage::Pixel, flags)?;

        let input_layout = vertex_input_layout();
        let desc = PipelineStateDesc::<B> {
            root_signature: &*root_signature,
            vertex_shader: &vertex_shader,
            pixel_shader: &pixel_shader,
            input_layout: &input_layout,
            rasterizer: RasterizerState::default(),
            depth_stencil: DepthStencilState::default(),
            render_target_format: BACK_BUFFER_FORMAT,
            depth_format: DEPTH_FORMAT,
        };
        let pipeline_state = self
            .pipeline_state
            .insert(created("pipeline state", backend.create_pipeline_state(device, &desc))?);

        let allocator = require(&self.command_allocator, "command allocator")?;
        self.command_list = Some(created(
            "command list",
            backend.create_command_list(device, allocator, pipeline_state),
        )?);

        Ok(())
    }

    fn create_sync_objects(&mut self) -> GfxResult<()> {
        let device = require(&self.device, "device")?;
        let initial = self.fence_manager.current_value().value();
        self.fence = Some(created("fence", self.backend.create_fence(device, initial))?);
        self.fence_event = Some(created("fence event", self.backend.create_fence_event())?);

        let swap_chain = require(&self.swap_chain, "swap chain")?;
        self.frame_index = self.backend.current_back_buffer_index(swap_chain);
        Ok(())
    }

    fn swap_chain_desc(&self) -> SwapChainDesc {
        SwapChainDesc {
            width: self.width,
            height: self.height,
            buffer_count: self.settings.frame_count,
            format: BACK_BUFFER_FORMAT,
        }
    }

    /// 等待 GPU 完成已提交的全部工作
    ///
    /// signal `fence_value + 1`，完成值未到达时在事件上阻塞。
    /// 队列或栅栏不存在时什么也不做。
    pub fn wait_for_gpu(&mut self) -> GfxResult<()> {
        let (Some(queue), Some(fence)) = (&self.command_queue, &self.fence) else {
            debug!("Skipping GPU wait, queue or fence was never created");
            return Ok(());
        };

        let value = self.fence_manager.next_value();
        self.backend.signal(queue, fence, value.value())?;
        self.block_until(value)?;
        self.frames.update_availability(self.fence_manager.completed_value().value());
        Ok(())
    }

    /// 等待某个交换链缓冲区上一次提交的帧完成
    ///
    /// 返回是否真正阻塞过。
    pub fn wait_for_frame(&mut self, index: u32) -> GfxResult<bool> {
        let frame = *self.frames.get(index as usize).ok_or_else(|| {
            GraphicsError::CommandExecution(format!(
                "frame index {} out of range ({} frames)",
                index,
                self.frames.len()
            ))
        })?;

        let waited = if frame.available {
            false
        } else {
            self.block_until(FenceValue::new(frame.fence_value))?
        };
        self.frames.update_availability(self.fence_manager.completed_value().value());
        Ok(waited)
    }

    /// 在栅栏完成值到达 `value` 之前阻塞
    fn block_until(&self, value: FenceValue) -> GfxResult<bool> {
        let fence = require(&self.fence, "fence")?;
        self.fence_manager
            .update_completed_value(FenceValue::new(self.backend.completed_value(fence)));
        if self.fence_manager.is_completed(value) {
            return Ok(false);
        }

        let event = require(&self.fence_event, "fence event")?;
        debug!(fence_value = value.value(), "Waiting for the GPU");
        self.backend.set_event_on_completion(fence, value.value(), event)?;
        self.backend.wait_for_event(event)?;

        self.fence_manager.update_completed_value(value);
        self.fence_manager
            .update_completed_value(FenceValue::new(self.backend.completed_value(fence)));
        Ok(true)
    }

    /// 当前帧提交之后调用：signal 栅栏，记下该缓冲区的栅栏值，前进到下一个缓冲区
    pub fn end_frame(&mut self) -> GfxResult<FenceValue> {
        let queue = require(&self.command_queue, "command queue")?;
        let fence = require(&self.fence, "fence")?;
        let swap_chain = require(&self.swap_chain, "swap chain")?;

        let value = self.fence_manager.next_value();
        self.backend.signal(queue, fence, value.value())?;
        if let Some(frame) = self.frames.get_mut(self.frame_index as usize) {
            frame.mark_in_use(value.value());
        }

        self.frame_index = self.backend.current_back_buffer_index(swap_chain);
        Ok(value)
    }

    /// 调整交换链尺寸；宽或高为 0（窗口最小化）时忽略
    pub fn resize(&mut self, width: u32, height: u32) -> GfxResult<()> {
        if width == 0 || height == 0 {
            debug!(width, height, "Ignoring resize to an empty area");
            return Ok(());
        }
        if width == self.width && height == self.height {
            return Ok(());
        }

        info!(width, height, "Resizing swap chain");
        self.wait_for_gpu()?;

        // 交换链缓冲区的所有引用必须在 ResizeBuffers 之前释放
        self.render_targets.clear();
        self.depth_buffer = None;

        self.width = width;
        self.height = height;
        let desc = self.swap_chain_desc();
        let swap_chain = require(&self.swap_chain, "swap chain")?;
        self.backend.resize_swap_chain(swap_chain, &desc).map_err(|e| {
            error!("Error while resizing the swap chain: {}", e);
            e
        })?;

        self.create_render_targets()?;
        self.create_depth_stencil()?;

        self.frames.reset();
        let swap_chain = require(&self.swap_chain, "swap chain")?;
        self.frame_index = self.backend.current_back_buffer_index(swap_chain);
        Ok(())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &GraphicsConfig {
        &self.settings
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn frame_count(&self) -> u32 {
        self.settings.frame_count
    }

    /// 已 signal 的最大栅栏值
    pub fn fence_value(&self) -> u64 {
        self.fence_manager.current_value().value()
    }

    /// 尚未确认完成的帧数
    pub fn frames_in_flight(&self) -> usize {
        self.frames.in_flight()
    }

    pub fn device(&self) -> GfxResult<&B::Device> {
        require(&self.device, "device")
    }

    pub fn command_queue(&self) -> GfxResult<&B::CommandQueue> {
        require(&self.command_queue, "command queue")
    }

    pub fn swap_chain(&self) -> GfxResult<&B::SwapChain> {
        require(&self.swap_chain, "swap chain")
    }

    pub fn rtv_heap(&self) -> GfxResult<&B::DescriptorHeap> {
        require(&self.rtv_heap, "RTV descriptor heap")
    }

    pub fn dsv_heap(&self) -> GfxResult<&B::DescriptorHeap> {
        require(&self.dsv_heap, "DSV descriptor heap")
    }

    pub fn srv_heap(&self) -> GfxResult<&B::DescriptorHeap> {
        require(&self.srv_heap, "SRV descriptor heap")
    }

    /// 当前帧的渲染目标
    pub fn current_render_target(&self) -> GfxResult<&B::Resource> {
        self.render_targets.get(self.frame_index as usize).ok_or_else(|| {
            GraphicsError::CommandExecution(format!("render target {} is not available", self.frame_index))
        })
    }

    pub fn command_allocator(&self) -> GfxResult<&B::CommandAllocator> {
        require(&self.command_allocator, "command allocator")
    }

    pub fn root_signature(&self) -> GfxResult<&B::RootSignature> {
        require(&self.root_signature, "root signature")
    }

    pub fn pipeline_state(&self) -> GfxResult<&B::PipelineState> {
        require(&self.pipeline_state, "pipeline state")
    }

    pub fn command_list(&self) -> GfxResult<&B::CommandList> {
        require(&self.command_list, "command list")
    }

    /// 着色器可见 SRV 堆的槽位分配器，纹理析构时归还槽位
    pub fn srv_slots(&self) -> &Rc<RefCell<DescriptorSlotAllocator>> {
        &self.srv_slots
    }
}

fn compile<B: GraphicsBackend>(
    backend: &B,
    source: &ShaderSource,
    stage: ShaderStage,
    flags: ShaderCompileFlags,
) -> GfxResult<B::ShaderBlob> {
    match backend.compile_shader(source, stage, flags) {
        Ok(blob) => {
            info!(%stage, entry = stage.entry_point(), "Shader has been compiled");
            Ok(blob)
        }
        Err(e) => {
            error!("Shader compilation error for {}: {}", source.path.display(), e);
            Err(e)
        }
    }
}

impl<B: GraphicsBackend> Drop for RenderResources<B> {
    fn drop(&mut self) {
        if let Err(e) = self.wait_for_gpu() {
            error!("Error while waiting for the GPU before teardown: {}", e);
        }

        self.command_list = None;
        self.pipeline_state = None;
        self.root_signature = None;
        self.command_allocator = None;
        self.depth_buffer = None;
        // Vec 按索引顺序析构元素
        self.render_targets.clear();
        self.dsv_heap = None;
        self.srv_heap = None;
        self.rtv_heap = None;
        self.swap_chain = None;
        self.command_queue = None;
        self.fence = None;
        self.fence_event = None;
        self.device = None;
        self.adapter = None;
        self.factory = None;

        match self.backend.report_live_objects() {
            Some(0) => info!("No live graphics objects after teardown"),
            Some(count) => warn!(count, "Live graphics objects remain after teardown"),
            None => debug!("Live object report was sent to the debug output"),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    use super::*;
    use crate::core::config::BackendKind;
    use crate::core::log::capture::with_captured_logs;
    use crate::gfx::headless::{ApiEvent, GpuTimeline, HeadlessBackend, ObjectKind};
    use crate::gfx::headless_window_handle;
    use crate::renderer::descriptor::DescriptorType;

    pub(crate) fn test_settings() -> GraphicsConfig {
        GraphicsConfig {
            backend: BackendKind::Headless,
            shader_path: Path::new(env!("CARGO_MANIFEST_DIR")).join("res/shaders/shader.hlsl"),
            debug_layer: false,
            ..GraphicsConfig::default()
        }
    }

    fn create(backend: &HeadlessBackend) -> GfxResult<RenderResources<HeadlessBackend>> {
        RenderResources::new(backend.clone(), headless_window_handle(), 320, 240, &test_settings())
    }

    /// 呈现并结束当前帧
    fn submit_frame(backend: &HeadlessBackend, resources: &mut RenderResources<HeadlessBackend>) -> u64 {
        backend.present(resources.swap_chain().unwrap(), 1).unwrap();
        resources.end_frame().unwrap().value()
    }

    fn created_kinds(events: &[ApiEvent]) -> Vec<ObjectKind> {
        events
            .iter()
            .filter_map(|e| match e {
                ApiEvent::Created(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_creation_order() {
        let backend = HeadlessBackend::new();
        let _resources = create(&backend).unwrap();

        assert_eq!(
            created_kinds(&backend.events()),
            vec![
                ObjectKind::Factory,
                ObjectKind::Adapter,
                ObjectKind::Device,
                ObjectKind::CommandQueue,
                ObjectKind::SwapChain,
                ObjectKind::DescriptorHeap(DescriptorType::RenderTargetView),
                ObjectKind::DescriptorHeap(DescriptorType::DepthStencilView),
                ObjectKind::DescriptorHeap(DescriptorType::ShaderResourceView),
                ObjectKind::RenderTarget(0),
                ObjectKind::RenderTarget(1),
                ObjectKind::DepthBuffer,
                ObjectKind::CommandAllocator,
                ObjectKind::RootSignature,
                ObjectKind::ShaderBlob(ShaderStage::Vertex),
                ObjectKind::ShaderBlob(ShaderStage::Pixel),
                ObjectKind::PipelineState,
                ObjectKind::CommandList,
                ObjectKind::Fence,
                ObjectKind::FenceEvent,
            ]
        );
        assert!(backend.events().contains(&ApiEvent::ViewCreated {
            heap: DescriptorType::RenderTargetView,
            index: 1
        }));
    }

    #[test]
    fn test_debug_layer_enabled_before_factory() {
        let backend = HeadlessBackend::new();
        let settings = GraphicsConfig { debug_layer: true, ..test_settings() };
        let _resources =
            RenderResources::new(backend.clone(), headless_window_handle(), 320, 240, &settings).unwrap();
        let events = backend.events();
        assert_eq!(events[0], ApiEvent::DebugLayerEnabled);
        assert_eq!(events[1], ApiEvent::Created(ObjectKind::Factory));
    }

    #[test]
    fn test_teardown_order() {
        let backend = HeadlessBackend::new();
        let resources = create(&backend).unwrap();
        backend.clear_events();

        drop(resources);

        assert_eq!(
            backend.events(),
            vec![
                ApiEvent::Signal(1),
                ApiEvent::SetEventOnCompletion(1),
                ApiEvent::Wait(1),
                ApiEvent::Released(ObjectKind::CommandList),
                ApiEvent::Released(ObjectKind::PipelineState),
                ApiEvent::Released(ObjectKind::RootSignature),
                ApiEvent::Released(ObjectKind::CommandAllocator),
                ApiEvent::Released(ObjectKind::DepthBuffer),
                ApiEvent::Released(ObjectKind::RenderTarget(0)),
                ApiEvent::Released(ObjectKind::RenderTarget(1)),
                ApiEvent::Released(ObjectKind::DescriptorHeap(DescriptorType::DepthStencilView)),
                ApiEvent::Released(ObjectKind::DescriptorHeap(DescriptorType::ShaderResourceView)),
                ApiEvent::Released(ObjectKind::DescriptorHeap(DescriptorType::RenderTargetView)),
                ApiEvent::Released(ObjectKind::SwapChain),
                ApiEvent::Released(ObjectKind::CommandQueue),
                ApiEvent::Released(ObjectKind::Fence),
                ApiEvent::Released(ObjectKind::FenceEvent),
                ApiEvent::Released(ObjectKind::Device),
                ApiEvent::Released(ObjectKind::Adapter),
                ApiEvent::Released(ObjectKind::Factory),
                ApiEvent::ReportLiveObjects(0),
            ]
        );
    }

    #[test]
    fn test_failed_step_stops_dependent_steps() {
        let backend = HeadlessBackend::new();
        backend.fail_on(ObjectKind::CommandQueue);

        let (result, logs) = with_captured_logs(|| create(&backend).map(|_| ()));

        assert!(matches!(result, Err(GraphicsError::CommandQueueCreation(_))));
        assert!(logs.contains("Error while creating command queue"));
        assert!(logs.contains("device has been created"));

        let events = backend.events();
        let kinds = created_kinds(&events);
        assert_eq!(kinds, vec![ObjectKind::Factory, ObjectKind::Adapter, ObjectKind::Device]);
        // 没有队列和栅栏时不等待 GPU，已创建的对象依然逆序释放
        assert!(!events.iter().any(|e| matches!(e, ApiEvent::Signal(_))));
        let tail: Vec<_> = events.iter().skip(3).cloned().collect();
        assert_eq!(
            tail,
            vec![
                ApiEvent::Released(ObjectKind::Device),
                ApiEvent::Released(ObjectKind::Adapter),
                ApiEvent::Released(ObjectKind::Factory),
                ApiEvent::ReportLiveObjects(0),
            ]
        );
    }

    #[test]
    fn test_render_target_failure_is_logged() {
        let backend = HeadlessBackend::new();
        backend.fail_on(ObjectKind::RenderTarget(1));

        let (result, logs) = with_captured_logs(|| create(&backend).map(|_| ()));

        assert!(matches!(result, Err(GraphicsError::RenderTargetCreation { index: 1, .. })));
        assert!(logs.contains("Error while creating render target number: 1"));
        let kinds = created_kinds(&backend.events());
        assert!(!kinds.contains(&ObjectKind::DepthBuffer));
        assert!(!kinds.contains(&ObjectKind::CommandAllocator));
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    fn test_shader_failure_prevents_pipeline_and_command_list() {
        let backend = HeadlessBackend::new();
        backend.fail_shader(ShaderStage::Pixel);

        let (result, logs) = with_captured_logs(|| create(&backend).map(|_| ()));

        assert!(matches!(
            result,
            Err(GraphicsError::ShaderCompilation { stage: ShaderStage::Pixel, .. })
        ));
        assert!(logs.contains("Shader compilation error"));
        assert!(logs.contains("X3000"));

        let kinds = created_kinds(&backend.events());
        assert!(kinds.contains(&ObjectKind::ShaderBlob(ShaderStage::Vertex)));
        assert!(!kinds.contains(&ObjectKind::PipelineState));
        assert!(!kinds.contains(&ObjectKind::CommandList));
        assert!(!kinds.contains(&ObjectKind::Fence));
        assert_eq!(backend.live_objects(), 0);
    }

    #[test]
    fn test_missing_shader_file_prevents_pipeline() {
        let backend = HeadlessBackend::new();
        let settings = GraphicsConfig {
            shader_path: std::env::temp_dir().join("graphic_engine_no_such_shader.hlsl"),
            ..test_settings()
        };

        let result = RenderResources::new(backend.clone(), headless_window_handle(), 320, 240, &settings);

        assert!(matches!(result, Err(GraphicsError::ShaderCompilation { .. })));
        assert!(!created_kinds(&backend.events()).contains(&ObjectKind::PipelineState));
    }

    #[test]
    fn test_root_signature_failure_prevents_pipeline() {
        let backend = HeadlessBackend::new();
        backend.fail_on(ObjectKind::RootSignature);

        let result = create(&backend);

        assert!(matches!(result, Err(GraphicsError::RootSignatureCreation(_))));
        let kinds = created_kinds(&backend.events());
        assert!(!kinds.iter().any(|k| matches!(k, ObjectKind::ShaderBlob(_))));
        assert!(!kinds.contains(&ObjectKind::PipelineState));
    }

    #[test]
    fn test_frame_wait_only_when_pending() {
        let backend = HeadlessBackend::with_timeline(GpuTimeline::Lagging);
        let mut resources = create(&backend).unwrap();

        // 两个缓冲区都还没有提交过
        assert!(!resources.wait_for_frame(0).unwrap());
        assert_eq!(submit_frame(&backend, &mut resources), 1);
        assert_eq!(resources.frame_index(), 1);
        assert!(!resources.wait_for_frame(1).unwrap());
        assert_eq!(submit_frame(&backend, &mut resources), 2);
        assert_eq!(resources.frame_index(), 0);
        assert_eq!(resources.frames_in_flight(), 2);

        // 第一帧仍在 GPU 上
        backend.clear_events();
        assert!(resources.wait_for_frame(0).unwrap());
        assert_eq!(
            backend.events(),
            vec![ApiEvent::SetEventOnCompletion(1), ApiEvent::Wait(1)]
        );
        assert_eq!(resources.frames_in_flight(), 1);

        // GPU 追上之后不再阻塞
        backend.advance_gpu();
        backend.clear_events();
        assert!(!resources.wait_for_frame(1).unwrap());
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_immediate_gpu_never_blocks() {
        let backend = HeadlessBackend::with_timeline(GpuTimeline::Immediate);
        let mut resources = create(&backend).unwrap();

        for _ in 0..6 {
            let index = resources.frame_index();
            assert!(!resources.wait_for_frame(index).unwrap());
            submit_frame(&backend, &mut resources);
        }
        assert!(!backend.events().iter().any(|e| matches!(e, ApiEvent::Wait(_))));
    }

    #[test]
    fn test_wait_for_gpu_signals_next_value() {
        let backend = HeadlessBackend::new();
        let mut resources = create(&backend).unwrap();
        submit_frame(&backend, &mut resources);
        backend.clear_events();

        resources.wait_for_gpu().unwrap();

        assert_eq!(resources.fence_value(), 2);
        assert_eq!(
            backend.events(),
            vec![ApiEvent::Signal(2), ApiEvent::SetEventOnCompletion(2), ApiEvent::Wait(2)]
        );
        assert_eq!(resources.frames_in_flight(), 0);
    }

    #[test]
    fn test_resize_recreates_render_targets() {
        let backend = HeadlessBackend::new();
        let mut resources = create(&backend).unwrap();
        backend.clear_events();

        resources.resize(640, 480).unwrap();

        let events = backend.events();
        let resize_at = events
            .iter()
            .position(|e| *e == ApiEvent::ResizeSwapChain { width: 640, height: 480 })
            .unwrap();
        // 旧的缓冲区在 ResizeBuffers 之前释放，新的在之后创建
        let released_at = events
            .iter()
            .position(|e| *e == ApiEvent::Released(ObjectKind::RenderTarget(1)))
            .unwrap();
        let created_at = events
            .iter()
            .position(|e| *e == ApiEvent::Created(ObjectKind::RenderTarget(0)))
            .unwrap();
        assert!(released_at < resize_at && resize_at < created_at);
        assert!(events.contains(&ApiEvent::Created(ObjectKind::DepthBuffer)));
        assert_eq!((resources.width(), resources.height()), (640, 480));
        assert_eq!(resources.frame_index(), 0);
    }

    #[test]
    fn test_zero_sized_resize_is_ignored() {
        let backend = HeadlessBackend::new();
        let mut resources = create(&backend).unwrap();
        backend.clear_events();

        resources.resize(0, 480).unwrap();
        resources.resize(320, 240).unwrap();

        assert!(backend.events().is_empty());
        assert_eq!(resources.width(), 320);
    }
}
