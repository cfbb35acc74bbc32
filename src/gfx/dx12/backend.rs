//! DirectX 12 图形后端实现
//!
//! 把 [`GraphicsBackend`] 的每个方法直接转发到对应的 D3D12 / DXGI 调用。
//! 这里不决定调用顺序，也不持有任何对象；COM 句柄在析构时自动 Release。
//!
//! # 主要调用
//!
//! - 工厂：`CreateDXGIFactory2`（启用调试层时带 DEBUG 标志）
//! - 适配器：`EnumAdapterByGpuPreference`（高性能优先，跳过软件适配器）
//! - 设备：`D3D12CreateDevice`（特性级别 11_1）
//! - 交换链：`CreateSwapChainForHwnd`（R8G8B8A8_UNORM，FLIP_DISCARD）
//! - 着色器：`D3DCompile`
//! - 根签名：`D3D12SerializeRootSignature` + `CreateRootSignature`

use std::ffi::CString;
use std::mem::ManuallyDrop;

use raw_window_handle::RawWindowHandle;
use tracing::{debug, warn};
use windows::core::{Interface, PCSTR, PCWSTR};
use windows::Win32::Foundation::{CloseHandle, HANDLE, HWND, RECT, WAIT_OBJECT_0};
use windows::Win32::Graphics::Direct3D::Fxc::*;
use windows::Win32::Graphics::Direct3D::*;
use windows::Win32::Graphics::Direct3D12::*;
use windows::Win32::Graphics::Dxgi::Common::*;
use windows::Win32::Graphics::Dxgi::*;
use windows::Win32::System::Threading::{CreateEventA, WaitForSingleObject, INFINITE};

use super::descriptor::Dx12DescriptorHeap;
use crate::core::error::GraphicsError;
use crate::gfx::backend::{GfxResult, GraphicsBackend, SwapChainDesc};
use crate::renderer::descriptor::DescriptorHeapDescriptor;
use crate::renderer::pipeline::{
    ComparisonFunc, CullMode, Format, PipelineStateDesc, ResourceState, RootParameter,
    RootSignatureDesc, ShaderVisibility,
};
use crate::renderer::shaders::{ShaderCompileFlags, ShaderSource, ShaderStage};

/// 栅栏事件句柄，析构时关闭
pub struct Dx12FenceEvent(HANDLE);

impl Drop for Dx12FenceEvent {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = CloseHandle(self.0) {
                warn!("CloseHandle on fence event failed: {}", e);
            }
        }
    }
}

/// DirectX 12 图形后端
#[derive(Debug, Default, Clone, Copy)]
pub struct Dx12Backend;

impl Dx12Backend {
    pub fn new() -> Self {
        Self
    }
}

fn dxgi_format(format: Format) -> DXGI_FORMAT {
    match format {
        Format::R32G32Float => DXGI_FORMAT_R32G32_FLOAT,
        Format::R32G32B32Float => DXGI_FORMAT_R32G32B32_FLOAT,
        Format::R32G32B32A32Float => DXGI_FORMAT_R32G32B32A32_FLOAT,
        Format::R8G8B8A8Unorm => DXGI_FORMAT_R8G8B8A8_UNORM,
        Format::D32Float => DXGI_FORMAT_D32_FLOAT,
    }
}

fn resource_state(state: ResourceState) -> D3D12_RESOURCE_STATES {
    match state {
        ResourceState::Present => D3D12_RESOURCE_STATE_PRESENT,
        ResourceState::RenderTarget => D3D12_RESOURCE_STATE_RENDER_TARGET,
    }
}

fn shader_visibility(visibility: ShaderVisibility) -> D3D12_SHADER_VISIBILITY {
    match visibility {
        ShaderVisibility::All => D3D12_SHADER_VISIBILITY_ALL,
        ShaderVisibility::Pixel => D3D12_SHADER_VISIBILITY_PIXEL,
    }
}

fn comparison_func(func: ComparisonFunc) -> D3D12_COMPARISON_FUNC {
    match func {
        ComparisonFunc::Less => D3D12_COMPARISON_FUNC_LESS,
    }
}

/// 读取 ID3DBlob 中的文本（编译器 / 序列化错误信息）
fn blob_text(blob: &ID3DBlob) -> String {
    unsafe {
        let bytes = std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize());
        String::from_utf8_lossy(bytes).trim_end_matches('\0').trim().to_string()
    }
}

fn buffer_desc(size: u64) -> D3D12_RESOURCE_DESC {
    D3D12_RESOURCE_DESC {
        Dimension: D3D12_RESOURCE_DIMENSION_BUFFER,
        Width: size,
        Height: 1,
        DepthOrArraySize: 1,
        MipLevels: 1,
        SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
        Layout: D3D12_TEXTURE_LAYOUT_ROW_MAJOR,
        ..Default::default()
    }
}

impl GraphicsBackend for Dx12Backend {
    type Factory = IDXGIFactory6;
    type Adapter = IDXGIAdapter1;
    type Device = ID3D12Device;
    type CommandQueue = ID3D12CommandQueue;
    type SwapChain = IDXGISwapChain3;
    type DescriptorHeap = Dx12DescriptorHeap;
    type Resource = ID3D12Resource;
    type CommandAllocator = ID3D12CommandAllocator;
    type ShaderBlob = ID3DBlob;
    type RootSignature = ID3D12RootSignature;
    type PipelineState = ID3D12PipelineState;
    type CommandList = ID3D12GraphicsCommandList;
    type Fence = ID3D12Fence;
    type FenceEvent = Dx12FenceEvent;

    fn name(&self) -> &'static str {
        "DirectX 12"
    }

    fn enable_debug_layer(&self) -> GfxResult<()> {
        unsafe {
            let mut debug: Option<ID3D12Debug> = None;
            D3D12GetDebugInterface(&mut debug)
                .map_err(|e| GraphicsError::DeviceCreation(format!("D3D12GetDebugInterface: {}", e)))?;
            if let Some(debug) = debug {
                debug.EnableDebugLayer();
            }
        }
        Ok(())
    }

    fn create_factory(&self, debug: bool) -> GfxResult<IDXGIFactory6> {
        let flags = if debug { DXGI_CREATE_FACTORY_DEBUG } else { DXGI_CREATE_FACTORY_FLAGS(0) };
        unsafe { CreateDXGIFactory2(flags) }.map_err(|e| GraphicsError::FactoryCreation(e.to_string()))
    }

    fn enumerate_adapter(&self, factory: &IDXGIFactory6) -> GfxResult<IDXGIAdapter1> {
        unsafe {
            let mut index = 0;
            while let Ok(adapter) =
                factory.EnumAdapterByGpuPreference::<IDXGIAdapter1>(index, DXGI_GPU_PREFERENCE_HIGH_PERFORMANCE)
            {
                index += 1;
                let desc = adapter
                    .GetDesc1()
                    .map_err(|e| GraphicsError::AdapterNotFound(e.to_string()))?;
                if desc.Flags & (DXGI_ADAPTER_FLAG_SOFTWARE.0 as u32) != 0 {
                    continue;
                }
                return Ok(adapter);
            }

            warn!("No hardware adapter found, falling back to WARP");
            factory
                .EnumWarpAdapter()
                .map_err(|e| GraphicsError::AdapterNotFound(e.to_string()))
        }
    }

    fn adapter_description(&self, adapter: &IDXGIAdapter1) -> String {
        match unsafe { adapter.GetDesc1() } {
            Ok(desc) => {
                let len = desc.Description.iter().position(|&c| c == 0).unwrap_or(desc.Description.len());
                format!(
                    "{} ({} MB dedicated)",
                    String::from_utf16_lossy(&desc.Description[..len]),
                    desc.DedicatedVideoMemory / (1024 * 1024)
                )
            }
            Err(e) => format!("<unknown adapter: {}>", e),
        }
    }

    fn create_device(&self, adapter: &IDXGIAdapter1) -> GfxResult<ID3D12Device> {
        let mut device: Option<ID3D12Device> = None;
        unsafe { D3D12CreateDevice(adapter, D3D_FEATURE_LEVEL_11_1, &mut device) }
            .map_err(|e| GraphicsError::DeviceCreation(e.to_string()))?;
        device.ok_or_else(|| GraphicsError::DeviceCreation("D3D12CreateDevice returned no device".to_string()))
    }

    fn create_command_queue(&self, device: &ID3D12Device) -> GfxResult<ID3D12CommandQueue> {
        let desc = D3D12_COMMAND_QUEUE_DESC {
            Type: D3D12_COMMAND_LIST_TYPE_DIRECT,
            Priority: D3D12_COMMAND_QUEUE_PRIORITY_NORMAL.0,
            Flags: D3D12_COMMAND_QUEUE_FLAG_NONE,
            NodeMask: 0,
        };
        unsafe { device.CreateCommandQueue(&desc) }
            .map_err(|e| GraphicsError::CommandQueueCreation(e.to_string()))
    }

    fn create_descriptor_heap(
        &self,
        device: &ID3D12Device,
        desc: &DescriptorHeapDescriptor,
    ) -> GfxResult<Dx12DescriptorHeap> {
        Dx12DescriptorHeap::new(device, desc)
    }

    fn create_swap_chain(
        &self,
        factory: &IDXGIFactory6,
        queue: &ID3D12CommandQueue,
        window: RawWindowHandle,
        desc: &SwapChainDesc,
    ) -> GfxResult<IDXGISwapChain3> {
        let hwnd = match window {
            RawWindowHandle::Win32(handle) => HWND(handle.hwnd.get() as *mut core::ffi::c_void),
            other => {
                return Err(GraphicsError::SwapchainError(format!(
                    "expected a Win32 window handle, got {:?}",
                    other
                )))
            }
        };

        let swap_chain_desc = DXGI_SWAP_CHAIN_DESC1 {
            Width: desc.width,
            Height: desc.height,
            Format: dxgi_format(desc.format),
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            BufferUsage: DXGI_USAGE_RENDER_TARGET_OUTPUT,
            BufferCount: desc.buffer_count,
            SwapEffect: DXGI_SWAP_EFFECT_FLIP_DISCARD,
            ..Default::default()
        };

        unsafe {
            let swap_chain: IDXGISwapChain1 = factory
                .CreateSwapChainForHwnd(queue, hwnd, &swap_chain_desc, None, None)
                .map_err(|e| GraphicsError::SwapchainError(e.to_string()))?;
            swap_chain
                .cast::<IDXGISwapChain3>()
                .map_err(|e| GraphicsError::SwapchainError(format!("IDXGISwapChain3 not supported: {}", e)))
        }
    }

    fn back_buffer(&self, swap_chain: &IDXGISwapChain3, index: u32) -> GfxResult<ID3D12Resource> {
        unsafe { swap_chain.GetBuffer(index) }
            .map_err(|e| GraphicsError::RenderTargetCreation { index, reason: e.to_string() })
    }

    fn current_back_buffer_index(&self, swap_chain: &IDXGISwapChain3) -> u32 {
        unsafe { swap_chain.GetCurrentBackBufferIndex() }
    }

    fn resize_swap_chain(&self, swap_chain: &IDXGISwapChain3, desc: &SwapChainDesc) -> GfxResult<()> {
        unsafe {
            swap_chain.ResizeBuffers(
                desc.buffer_count,
                desc.width,
                desc.height,
                dxgi_format(desc.format),
                DXGI_SWAP_CHAIN_FLAG(0),
            )
        }
        .map_err(|e| GraphicsError::SwapchainError(format!("ResizeBuffers: {}", e)))
    }

    fn create_render_target_view(
        &self,
        device: &ID3D12Device,
        resource: &ID3D12Resource,
        heap: &Dx12DescriptorHeap,
        index: u32,
    ) {
        unsafe { device.CreateRenderTargetView(resource, None, heap.cpu_handle(index)) };
    }

    fn create_depth_buffer(&self, device: &ID3D12Device, width: u32, height: u32) -> GfxResult<ID3D12Resource> {
        let heap_props = D3D12_HEAP_PROPERTIES {
            Type: D3D12_HEAP_TYPE_DEFAULT,
            ..Default::default()
        };
        let desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
            Width: width as u64,
            Height: height,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: DXGI_FORMAT_D32_FLOAT,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: D3D12_RESOURCE_FLAG_ALLOW_DEPTH_STENCIL,
            ..Default::default()
        };
        let clear_value = D3D12_CLEAR_VALUE {
            Format: DXGI_FORMAT_D32_FLOAT,
            Anonymous: D3D12_CLEAR_VALUE_0 {
                DepthStencil: D3D12_DEPTH_STENCIL_VALUE { Depth: 1.0, Stencil: 0 },
            },
        };

        let mut resource: Option<ID3D12Resource> = None;
        unsafe {
            device.CreateCommittedResource(
                &heap_props,
                D3D12_HEAP_FLAG_NONE,
                &desc,
                D3D12_RESOURCE_STATE_DEPTH_WRITE,
                Some(&clear_value),
                &mut resource,
            )
        }
        .map_err(|e| GraphicsError::ResourceCreation(format!("depth buffer {}x{}: {}", width, height, e)))?;
        resource.ok_or_else(|| GraphicsError::ResourceCreation("depth buffer was not returned".to_string()))
    }

    fn create_depth_stencil_view(
        &self,
        device: &ID3D12Device,
        resource: &ID3D12Resource,
        heap: &Dx12DescriptorHeap,
        index: u32,
    ) {
        unsafe { device.CreateDepthStencilView(resource, None, heap.cpu_handle(index)) };
    }

    fn create_command_allocator(&self, device: &ID3D12Device) -> GfxResult<ID3D12CommandAllocator> {
        unsafe { device.CreateCommandAllocator(D3D12_COMMAND_LIST_TYPE_DIRECT) }
            .map_err(|e| GraphicsError::CommandAllocatorCreation(e.to_string()))
    }

    fn compile_shader(
        &self,
        source: &ShaderSource,
        stage: ShaderStage,
        flags: ShaderCompileFlags,
    ) -> GfxResult<ID3DBlob> {
        let compile_error = |message: String| GraphicsError::ShaderCompilation { stage, message };

        let entry = CString::new(stage.entry_point()).map_err(|e| compile_error(e.to_string()))?;
        let target = CString::new(stage.target()).map_err(|e| compile_error(e.to_string()))?;
        let source_name = CString::new(source.path.to_string_lossy().into_owned())
            .map_err(|e| compile_error(e.to_string()))?;

        let mut compile_flags = 0u32;
        if flags.debug {
            compile_flags |= D3DCOMPILE_DEBUG;
        }
        if flags.skip_optimization {
            compile_flags |= D3DCOMPILE_SKIP_OPTIMIZATION;
        }
        if flags.warnings_as_errors {
            compile_flags |= D3DCOMPILE_WARNINGS_ARE_ERRORS;
        }
        if flags.all_resources_bound {
            compile_flags |= D3DCOMPILE_ALL_RESOURCES_BOUND;
        }

        let mut code: Option<ID3DBlob> = None;
        let mut errors: Option<ID3DBlob> = None;
        let result = unsafe {
            D3DCompile(
                source.code.as_ptr() as _,
                source.code.len(),
                PCSTR(source_name.as_ptr() as *const u8),
                None,
                None,
                PCSTR(entry.as_ptr() as *const u8),
                PCSTR(target.as_ptr() as *const u8),
                compile_flags,
                0,
                &mut code,
                Some(&mut errors as *mut _),
            )
        };

        if let Err(e) = result {
            let message = errors.as_ref().map(blob_text).unwrap_or_else(|| e.to_string());
            return Err(compile_error(message));
        }
        if let Some(warnings) = errors.as_ref() {
            debug!(%stage, "Shader compiler output: {}", blob_text(warnings));
        }
        code.ok_or_else(|| compile_error("D3DCompile returned no bytecode".to_string()))
    }

    fn create_root_signature(&self, device: &ID3D12Device, desc: &RootSignatureDesc) -> GfxResult<ID3D12RootSignature> {
        // 描述符范围必须在序列化期间保持有效，先全部建好再引用
        let ranges: Vec<D3D12_DESCRIPTOR_RANGE> = desc
            .parameters
            .iter()
            .map(|p| match *p {
                RootParameter::ShaderResourceTable { base_register, count, .. } => D3D12_DESCRIPTOR_RANGE {
                    RangeType: D3D12_DESCRIPTOR_RANGE_TYPE_SRV,
                    NumDescriptors: count,
                    BaseShaderRegister: base_register,
                    RegisterSpace: 0,
                    OffsetInDescriptorsFromTableStart: D3D12_DESCRIPTOR_RANGE_OFFSET_APPEND,
                },
                RootParameter::ConstantBuffer { .. } => D3D12_DESCRIPTOR_RANGE::default(),
            })
            .collect();

        let parameters: Vec<D3D12_ROOT_PARAMETER> = desc
            .parameters
            .iter()
            .zip(ranges.iter())
            .map(|(p, range)| match *p {
                RootParameter::ConstantBuffer { register, visibility } => D3D12_ROOT_PARAMETER {
                    ParameterType: D3D12_ROOT_PARAMETER_TYPE_CBV,
                    Anonymous: D3D12_ROOT_PARAMETER_0 {
                        Descriptor: D3D12_ROOT_DESCRIPTOR { ShaderRegister: register, RegisterSpace: 0 },
                    },
                    ShaderVisibility: shader_visibility(visibility),
                },
                RootParameter::ShaderResourceTable { visibility, .. } => D3D12_ROOT_PARAMETER {
                    ParameterType: D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE,
                    Anonymous: D3D12_ROOT_PARAMETER_0 {
                        DescriptorTable: D3D12_ROOT_DESCRIPTOR_TABLE {
                            NumDescriptorRanges: 1,
                            pDescriptorRanges: range,
                        },
                    },
                    ShaderVisibility: shader_visibility(visibility),
                },
            })
            .collect();

        let samplers: Vec<D3D12_STATIC_SAMPLER_DESC> = desc
            .static_samplers
            .iter()
            .map(|s| D3D12_STATIC_SAMPLER_DESC {
                Filter: D3D12_FILTER_MIN_MAG_MIP_LINEAR,
                AddressU: D3D12_TEXTURE_ADDRESS_MODE_WRAP,
                AddressV: D3D12_TEXTURE_ADDRESS_MODE_WRAP,
                AddressW: D3D12_TEXTURE_ADDRESS_MODE_WRAP,
                MipLODBias: 0.0,
                MaxAnisotropy: 1,
                ComparisonFunc: D3D12_COMPARISON_FUNC_ALWAYS,
                BorderColor: D3D12_STATIC_BORDER_COLOR_OPAQUE_BLACK,
                MinLOD: 0.0,
                MaxLOD: D3D12_FLOAT32_MAX,
                ShaderRegister: s.register,
                RegisterSpace: 0,
                ShaderVisibility: shader_visibility(s.visibility),
            })
            .collect();

        let root_desc = D3D12_ROOT_SIGNATURE_DESC {
            NumParameters: parameters.len() as u32,
            pParameters: parameters.as_ptr(),
            NumStaticSamplers: samplers.len() as u32,
            pStaticSamplers: samplers.as_ptr(),
            Flags: if desc.allow_input_layout {
                D3D12_ROOT_SIGNATURE_FLAG_ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT
            } else {
                D3D12_ROOT_SIGNATURE_FLAG_NONE
            },
        };

        unsafe {
            let mut signature: Option<ID3DBlob> = None;
            let mut errors: Option<ID3DBlob> = None;
            if let Err(e) = D3D12SerializeRootSignature(
                &root_desc,
                D3D_ROOT_SIGNATURE_VERSION_1,
                &mut signature,
                Some(&mut errors as *mut _),
            ) {
                let message = errors.as_ref().map(blob_text).unwrap_or_else(|| e.to_string());
                return Err(GraphicsError::RootSignatureCreation(format!("serialization failed: {}", message)));
            }

            let signature = signature.ok_or_else(|| {
                GraphicsError::RootSignatureCreation("serialization returned no blob".to_string())
            })?;
            let bytes = std::slice::from_raw_parts(
                signature.GetBufferPointer() as *const u8,
                signature.GetBufferSize(),
            );
            device
                .CreateRootSignature(0, bytes)
                .map_err(|e| GraphicsError::RootSignatureCreation(e.to_string()))
        }
    }

    fn create_pipeline_state(
        &self,
        device: &ID3D12Device,
        desc: &PipelineStateDesc<'_, Self>,
    ) -> GfxResult<ID3D12PipelineState> {
        let input_elements: Vec<D3D12_INPUT_ELEMENT_DESC> = desc
            .input_layout
            .iter()
            .map(|e| D3D12_INPUT_ELEMENT_DESC {
                SemanticName: PCSTR(e.semantic.as_ptr() as *const u8),
                SemanticIndex: 0,
                Format: dxgi_format(e.format),
                InputSlot: 0,
                AlignedByteOffset: e.offset,
                InputSlotClass: D3D12_INPUT_CLASSIFICATION_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            })
            .collect();

        let mut render_targets = [D3D12_RENDER_TARGET_BLEND_DESC::default(); 8];
        render_targets[0] = D3D12_RENDER_TARGET_BLEND_DESC {
            BlendEnable: false.into(),
            LogicOpEnable: false.into(),
            SrcBlend: D3D12_BLEND_ONE,
            DestBlend: D3D12_BLEND_ZERO,
            BlendOp: D3D12_BLEND_OP_ADD,
            SrcBlendAlpha: D3D12_BLEND_ONE,
            DestBlendAlpha: D3D12_BLEND_ZERO,
            BlendOpAlpha: D3D12_BLEND_OP_ADD,
            LogicOp: D3D12_LOGIC_OP_NOOP,
            RenderTargetWriteMask: D3D12_COLOR_WRITE_ENABLE_ALL.0 as u8,
        };

        let mut rtv_formats = [DXGI_FORMAT_UNKNOWN; 8];
        rtv_formats[0] = dxgi_format(desc.render_target_format);

        let pso_desc = D3D12_GRAPHICS_PIPELINE_STATE_DESC {
            // 借用根签名而不增加引用计数
            pRootSignature: unsafe { std::mem::transmute_copy(desc.root_signature) },
            VS: D3D12_SHADER_BYTECODE {
                pShaderBytecode: unsafe { desc.vertex_shader.GetBufferPointer() },
                BytecodeLength: unsafe { desc.vertex_shader.GetBufferSize() },
            },
            PS: D3D12_SHADER_BYTECODE {
                pShaderBytecode: unsafe { desc.pixel_shader.GetBufferPointer() },
                BytecodeLength: unsafe { desc.pixel_shader.GetBufferSize() },
            },
            BlendState: D3D12_BLEND_DESC {
                AlphaToCoverageEnable: false.into(),
                IndependentBlendEnable: false.into(),
                RenderTarget: render_targets,
            },
            SampleMask: u32::MAX,
            RasterizerState: D3D12_RASTERIZER_DESC {
                FillMode: D3D12_FILL_MODE_SOLID,
                CullMode: match desc.rasterizer.cull_mode {
                    CullMode::None => D3D12_CULL_MODE_NONE,
                    CullMode::Back => D3D12_CULL_MODE_BACK,
                },
                FrontCounterClockwise: desc.rasterizer.front_counter_clockwise.into(),
                DepthClipEnable: desc.rasterizer.depth_clip.into(),
                ..Default::default()
            },
            DepthStencilState: D3D12_DEPTH_STENCIL_DESC {
                DepthEnable: desc.depth_stencil.depth_enable.into(),
                DepthWriteMask: if desc.depth_stencil.depth_write {
                    D3D12_DEPTH_WRITE_MASK_ALL
                } else {
                    D3D12_DEPTH_WRITE_MASK_ZERO
                },
                DepthFunc: comparison_func(desc.depth_stencil.depth_func),
                StencilEnable: false.into(),
                StencilReadMask: 0xFF,
                StencilWriteMask: 0xFF,
                FrontFace: D3D12_DEPTH_STENCILOP_DESC::default(),
                BackFace: D3D12_DEPTH_STENCILOP_DESC::default(),
            },
            InputLayout: D3D12_INPUT_LAYOUT_DESC {
                pInputElementDescs: input_elements.as_ptr(),
                NumElements: input_elements.len() as u32,
            },
            PrimitiveTopologyType: D3D12_PRIMITIVE_TOPOLOGY_TYPE_TRIANGLE,
            NumRenderTargets: 1,
            RTVFormats: rtv_formats,
            DSVFormat: dxgi_format(desc.depth_format),
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            ..Default::default()
        };

        unsafe { device.CreateGraphicsPipelineState(&pso_desc) }
            .map_err(|e| GraphicsError::PipelineStateCreation(e.to_string()))
    }

    fn create_command_list(
        &self,
        device: &ID3D12Device,
        allocator: &ID3D12CommandAllocator,
        pipeline_state: &ID3D12PipelineState,
    ) -> GfxResult<ID3D12GraphicsCommandList> {
        unsafe {
            let list: ID3D12GraphicsCommandList = device
                .CreateCommandList(0, D3D12_COMMAND_LIST_TYPE_DIRECT, allocator, pipeline_state)
                .map_err(|e| GraphicsError::CommandListCreation(e.to_string()))?;
            list.Close()
                .map_err(|e| GraphicsError::CommandListCreation(format!("initial Close: {}", e)))?;
            Ok(list)
        }
    }

    fn create_fence(&self, device: &ID3D12Device, initial_value: u64) -> GfxResult<ID3D12Fence> {
        unsafe { device.CreateFence(initial_value, D3D12_FENCE_FLAG_NONE) }
            .map_err(|e| GraphicsError::Fence(format!("CreateFence: {}", e)))
    }

    fn create_fence_event(&self) -> GfxResult<Dx12FenceEvent> {
        unsafe { CreateEventA(None, false, false, None) }
            .map(Dx12FenceEvent)
            .map_err(|e| GraphicsError::Fence(format!("CreateEvent: {}", e)))
    }

    fn signal(&self, queue: &ID3D12CommandQueue, fence: &ID3D12Fence, value: u64) -> GfxResult<()> {
        unsafe { queue.Signal(fence, value) }.map_err(|e| GraphicsError::Fence(format!("Signal({}): {}", value, e)))
    }

    fn completed_value(&self, fence: &ID3D12Fence) -> u64 {
        unsafe { fence.GetCompletedValue() }
    }

    fn set_event_on_completion(&self, fence: &ID3D12Fence, value: u64, event: &Dx12FenceEvent) -> GfxResult<()> {
        unsafe { fence.SetEventOnCompletion(value, event.0) }
            .map_err(|e| GraphicsError::Fence(format!("SetEventOnCompletion({}): {}", value, e)))
    }

    fn wait_for_event(&self, event: &Dx12FenceEvent) -> GfxResult<()> {
        let result = unsafe { WaitForSingleObject(event.0, INFINITE) };
        if result == WAIT_OBJECT_0 {
            Ok(())
        } else {
            Err(GraphicsError::Fence(format!("WaitForSingleObject returned {:?}", result)))
        }
    }

    fn create_upload_buffer(&self, device: &ID3D12Device, size: u64) -> GfxResult<ID3D12Resource> {
        let heap_props = D3D12_HEAP_PROPERTIES {
            Type: D3D12_HEAP_TYPE_UPLOAD,
            ..Default::default()
        };
        let desc = buffer_desc(size);

        let mut resource: Option<ID3D12Resource> = None;
        unsafe {
            device.CreateCommittedResource(
                &heap_props,
                D3D12_HEAP_FLAG_NONE,
                &desc,
                D3D12_RESOURCE_STATE_GENERIC_READ,
                None,
                &mut resource,
            )
        }
        .map_err(|e| GraphicsError::ResourceCreation(format!("upload buffer of {} bytes: {}", size, e)))?;
        resource.ok_or_else(|| GraphicsError::ResourceCreation("upload buffer was not returned".to_string()))
    }

    fn write_buffer(&self, resource: &ID3D12Resource, offset: u64, data: &[u8]) -> GfxResult<()> {
        unsafe {
            let size = resource.GetDesc().Width;
            if offset + data.len() as u64 > size {
                return Err(GraphicsError::ResourceCreation(format!(
                    "write of {} bytes at offset {} exceeds buffer size {}",
                    data.len(),
                    offset,
                    size
                )));
            }

            // CPU 不读取，读取范围为空
            let read_range = D3D12_RANGE { Begin: 0, End: 0 };
            let mut mapped = std::ptr::null_mut();
            resource
                .Map(0, Some(&read_range), Some(&mut mapped))
                .map_err(|e| GraphicsError::ResourceCreation(format!("Map: {}", e)))?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), (mapped as *mut u8).add(offset as usize), data.len());
            resource.Unmap(0, None);
        }
        Ok(())
    }

    fn gpu_virtual_address(&self, resource: &ID3D12Resource) -> u64 {
        unsafe { resource.GetGPUVirtualAddress() }
    }

    fn create_texture(&self, device: &ID3D12Device, width: u32, height: u32, pixels: &[u8]) -> GfxResult<ID3D12Resource> {
        let row_pitch = width * 4;
        if pixels.len() != (row_pitch as usize) * (height as usize) {
            return Err(GraphicsError::ResourceCreation(format!(
                "{} bytes of pixel data for a {}x{} RGBA8 texture",
                pixels.len(),
                width,
                height
            )));
        }

        // CPU 可写的自定义堆，可以直接用 WriteToSubresource 写入，无需拷贝队列
        let heap_props = D3D12_HEAP_PROPERTIES {
            Type: D3D12_HEAP_TYPE_CUSTOM,
            CPUPageProperty: D3D12_CPU_PAGE_PROPERTY_WRITE_BACK,
            MemoryPoolPreference: D3D12_MEMORY_POOL_L0,
            CreationNodeMask: 1,
            VisibleNodeMask: 1,
        };
        let desc = D3D12_RESOURCE_DESC {
            Dimension: D3D12_RESOURCE_DIMENSION_TEXTURE2D,
            Width: width as u64,
            Height: height,
            DepthOrArraySize: 1,
            MipLevels: 1,
            Format: DXGI_FORMAT_R8G8B8A8_UNORM,
            SampleDesc: DXGI_SAMPLE_DESC { Count: 1, Quality: 0 },
            Layout: D3D12_TEXTURE_LAYOUT_UNKNOWN,
            Flags: D3D12_RESOURCE_FLAG_NONE,
            ..Default::default()
        };

        unsafe {
            let mut texture: Option<ID3D12Resource> = None;
            device
                .CreateCommittedResource(
                    &heap_props,
                    D3D12_HEAP_FLAG_NONE,
                    &desc,
                    D3D12_RESOURCE_STATE_COMMON,
                    None,
                    &mut texture,
                )
                .map_err(|e| GraphicsError::ResourceCreation(format!("texture {}x{}: {}", width, height, e)))?;
            let texture = texture
                .ok_or_else(|| GraphicsError::ResourceCreation("texture was not returned".to_string()))?;

            texture
                .Map(0, None, None)
                .map_err(|e| GraphicsError::ResourceCreation(format!("texture Map: {}", e)))?;
            let written = texture.WriteToSubresource(
                0,
                None,
                pixels.as_ptr() as *const _,
                row_pitch,
                row_pitch * height,
            );
            texture.Unmap(0, None);
            written.map_err(|e| GraphicsError::ResourceCreation(format!("WriteToSubresource: {}", e)))?;

            Ok(texture)
        }
    }

    fn create_shader_resource_view(
        &self,
        device: &ID3D12Device,
        resource: &ID3D12Resource,
        heap: &Dx12DescriptorHeap,
        index: u32,
    ) {
        unsafe { device.CreateShaderResourceView(resource, None, heap.cpu_handle(index)) };
    }

    fn set_debug_name(&self, resource: &ID3D12Resource, name: &str) {
        let wide_name: Vec<u16> = name.encode_utf16().chain(Some(0)).collect();
        if let Err(e) = unsafe { resource.SetName(PCWSTR(wide_name.as_ptr())) } {
            debug!(name, "SetName failed: {}", e);
        }
    }

    fn reset_command_allocator(&self, allocator: &ID3D12CommandAllocator) -> GfxResult<()> {
        unsafe { allocator.Reset() }
            .map_err(|e| GraphicsError::CommandExecution(format!("CommandAllocator::Reset: {}", e)))
    }

    fn reset_command_list(
        &self,
        list: &ID3D12GraphicsCommandList,
        allocator: &ID3D12CommandAllocator,
        pipeline_state: &ID3D12PipelineState,
    ) -> GfxResult<()> {
        unsafe { list.Reset(allocator, pipeline_state) }
            .map_err(|e| GraphicsError::CommandExecution(format!("CommandList::Reset: {}", e)))
    }

    fn close_command_list(&self, list: &ID3D12GraphicsCommandList) -> GfxResult<()> {
        unsafe { list.Close() }.map_err(|e| GraphicsError::CommandExecution(format!("CommandList::Close: {}", e)))
    }

    fn resource_barrier(
        &self,
        list: &ID3D12GraphicsCommandList,
        resource: &ID3D12Resource,
        before: ResourceState,
        after: ResourceState,
    ) {
        let barrier = D3D12_RESOURCE_BARRIER {
            Type: D3D12_RESOURCE_BARRIER_TYPE_TRANSITION,
            Flags: D3D12_RESOURCE_BARRIER_FLAG_NONE,
            Anonymous: D3D12_RESOURCE_BARRIER_0 {
                Transition: ManuallyDrop::new(D3D12_RESOURCE_TRANSITION_BARRIER {
                    // 借用资源而不增加引用计数
                    pResource: unsafe { std::mem::transmute_copy(resource) },
                    Subresource: D3D12_RESOURCE_BARRIER_ALL_SUBRESOURCES,
                    StateBefore: resource_state(before),
                    StateAfter: resource_state(after),
                }),
            },
        };
        unsafe { list.ResourceBarrier(&[barrier]) };
    }

    fn set_render_targets(
        &self,
        list: &ID3D12GraphicsCommandList,
        rtv_heap: &Dx12DescriptorHeap,
        rtv_index: u32,
        dsv_heap: &Dx12DescriptorHeap,
        dsv_index: u32,
    ) {
        let rtv = rtv_heap.cpu_handle(rtv_index);
        let dsv = dsv_heap.cpu_handle(dsv_index);
        unsafe { list.OMSetRenderTargets(1, Some(&rtv), false, Some(&dsv)) };
    }

    fn clear_render_target_view(
        &self,
        list: &ID3D12GraphicsCommandList,
        heap: &Dx12DescriptorHeap,
        index: u32,
        color: [f32; 4],
    ) {
        unsafe { list.ClearRenderTargetView(heap.cpu_handle(index), &color, None) };
    }

    fn clear_depth_stencil_view(&self, list: &ID3D12GraphicsCommandList, heap: &Dx12DescriptorHeap, index: u32, depth: f32) {
        unsafe { list.ClearDepthStencilView(heap.cpu_handle(index), D3D12_CLEAR_FLAG_DEPTH, depth, 0, None) };
    }

    fn set_viewport_and_scissor(&self, list: &ID3D12GraphicsCommandList, width: u32, height: u32) {
        let viewport = D3D12_VIEWPORT {
            TopLeftX: 0.0,
            TopLeftY: 0.0,
            Width: width as f32,
            Height: height as f32,
            MinDepth: 0.0,
            MaxDepth: 1.0,
        };
        let scissor_rect = RECT { left: 0, top: 0, right: width as i32, bottom: height as i32 };
        unsafe {
            list.RSSetViewports(&[viewport]);
            list.RSSetScissorRects(&[scissor_rect]);
        }
    }

    fn set_graphics_root_signature(&self, list: &ID3D12GraphicsCommandList, root_signature: &ID3D12RootSignature) {
        unsafe { list.SetGraphicsRootSignature(root_signature) };
    }

    fn set_descriptor_heap(&self, list: &ID3D12GraphicsCommandList, heap: &Dx12DescriptorHeap) {
        unsafe { list.SetDescriptorHeaps(&[Some(heap.heap().clone())]) };
    }

    fn set_root_constant_buffer_view(
        &self,
        list: &ID3D12GraphicsCommandList,
        root_index: u32,
        resource: &ID3D12Resource,
        offset: u64,
    ) {
        unsafe { list.SetGraphicsRootConstantBufferView(root_index, resource.GetGPUVirtualAddress() + offset) };
    }

    fn set_root_descriptor_table(
        &self,
        list: &ID3D12GraphicsCommandList,
        root_index: u32,
        heap: &Dx12DescriptorHeap,
        slot: u32,
    ) {
        unsafe { list.SetGraphicsRootDescriptorTable(root_index, heap.gpu_handle(slot)) };
    }

    fn set_vertex_buffer(&self, list: &ID3D12GraphicsCommandList, resource: &ID3D12Resource, size: u32, stride: u32) {
        let view = D3D12_VERTEX_BUFFER_VIEW {
            BufferLocation: unsafe { resource.GetGPUVirtualAddress() },
            SizeInBytes: size,
            StrideInBytes: stride,
        };
        unsafe { list.IASetVertexBuffers(0, Some(&[view])) };
    }

    fn set_index_buffer(&self, list: &ID3D12GraphicsCommandList, resource: &ID3D12Resource, size: u32) {
        let view = D3D12_INDEX_BUFFER_VIEW {
            BufferLocation: unsafe { resource.GetGPUVirtualAddress() },
            SizeInBytes: size,
            Format: DXGI_FORMAT_R32_UINT,
        };
        unsafe { list.IASetIndexBuffer(Some(&view)) };
    }

    fn draw_indexed(&self, list: &ID3D12GraphicsCommandList, index_count: u32) {
        unsafe {
            list.IASetPrimitiveTopology(D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
            list.DrawIndexedInstanced(index_count, 1, 0, 0, 0);
        }
    }

    fn execute_command_list(&self, queue: &ID3D12CommandQueue, list: &ID3D12GraphicsCommandList) -> GfxResult<()> {
        let list: ID3D12CommandList = list
            .cast()
            .map_err(|e| GraphicsError::CommandExecution(format!("ID3D12CommandList cast: {}", e)))?;
        unsafe { queue.ExecuteCommandLists(&[Some(list)]) };
        Ok(())
    }

    fn present(&self, swap_chain: &IDXGISwapChain3, sync_interval: u32) -> GfxResult<()> {
        unsafe { swap_chain.Present(sync_interval, DXGI_PRESENT(0)) }
            .ok()
            .map_err(|e| GraphicsError::Present(e.to_string()))
    }

    fn report_live_objects(&self) -> Option<usize> {
        unsafe {
            match DXGIGetDebugInterface1::<IDXGIDebug1>(0) {
                Ok(debug) => {
                    let flags = DXGI_DEBUG_RLO_FLAGS(DXGI_DEBUG_RLO_DETAIL.0 | DXGI_DEBUG_RLO_IGNORE_INTERNAL.0);
                    if let Err(e) = debug.ReportLiveObjects(DXGI_DEBUG_ALL, flags) {
                        warn!("ReportLiveObjects failed: {}", e);
                    }
                }
                Err(e) => debug!("DXGI debug interface unavailable: {}", e),
            }
        }
        None
    }
}
