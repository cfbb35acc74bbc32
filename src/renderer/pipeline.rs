//! 管线描述
//!
//! 根签名与管线状态对象（PSO）的 API 无关描述。后端把这些结构翻译成
//! 原生描述结构体；无 GPU 后端则直接记录它们。

use std::ffi::CStr;

use crate::geometry::Vertex;
use crate::gfx::backend::GraphicsBackend;

/// 纹理 / 顶点属性格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    R32G32Float,
    R32G32B32Float,
    R32G32B32A32Float,
    R8G8B8A8Unorm,
    D32Float,
}

impl Format {
    /// 单个元素的字节数
    pub fn size(&self) -> u32 {
        match self {
            Format::R32G32Float => 8,
            Format::R32G32B32Float => 12,
            Format::R32G32B32A32Float => 16,
            Format::R8G8B8A8Unorm | Format::D32Float => 4,
        }
    }
}

/// 交换链与渲染目标格式
pub const BACK_BUFFER_FORMAT: Format = Format::R8G8B8A8Unorm;
/// 深度缓冲区格式
pub const DEPTH_FORMAT: Format = Format::D32Float;

/// 输入装配阶段的一个顶点属性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputElement {
    /// HLSL 语义名
    pub semantic: &'static CStr,
    pub format: Format,
    /// 在顶点中的字节偏移
    pub offset: u32,
}

/// [`Vertex`] 对应的输入布局
pub fn vertex_input_layout() -> [InputElement; 3] {
    [
        InputElement { semantic: c"POSITION", format: Format::R32G32B32Float, offset: Vertex::POSITION_OFFSET },
        InputElement { semantic: c"COLOR", format: Format::R32G32B32A32Float, offset: Vertex::COLOR_OFFSET },
        InputElement { semantic: c"TEXCOORD", format: Format::R32G32Float, offset: Vertex::TEXCOORD_OFFSET },
    ]
}

/// 资源状态，用于转换屏障
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    Present,
    RenderTarget,
}

/// 着色器可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderVisibility {
    All,
    Pixel,
}

/// 根参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootParameter {
    /// 根常量缓冲区视图，`register` 对应 HLSL 的 `bN`
    ConstantBuffer { register: u32, visibility: ShaderVisibility },
    /// 只包含一段 SRV 范围的描述符表，`base_register` 对应 `tN`
    ShaderResourceTable { base_register: u32, count: u32, visibility: ShaderVisibility },
}

/// 静态采样器（线性过滤、Wrap 寻址）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticSampler {
    /// `sN`
    pub register: u32,
    pub visibility: ShaderVisibility,
}

/// 根签名描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootSignatureDesc {
    pub parameters: Vec<RootParameter>,
    pub static_samplers: Vec<StaticSampler>,
    /// 允许输入装配阶段的输入布局
    pub allow_input_layout: bool,
}

/// 渲染器使用的根参数索引
pub mod root_index {
    /// 物体常量（世界矩阵），b0
    pub const OBJECT: u32 = 0;
    /// 相机常量（视图投影矩阵），b1
    pub const CAMERA: u32 = 1;
    /// 纹理描述符表，t0
    pub const TEXTURE: u32 = 2;
}

impl RootSignatureDesc {
    /// 渲染器的根签名：b0、b1、t0 描述符表以及静态采样器 s0
    pub fn standard() -> Self {
        Self {
            parameters: vec![
                RootParameter::ConstantBuffer { register: 0, visibility: ShaderVisibility::All },
                RootParameter::ConstantBuffer { register: 1, visibility: ShaderVisibility::All },
                RootParameter::ShaderResourceTable { base_register: 0, count: 1, visibility: ShaderVisibility::Pixel },
            ],
            static_samplers: vec![StaticSampler { register: 0, visibility: ShaderVisibility::Pixel }],
            allow_input_layout: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    None,
    Back,
}

/// 光栅化状态；填充模式固定为实心
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterizerState {
    pub cull_mode: CullMode,
    /// false 表示顺时针为正面
    pub front_counter_clockwise: bool,
    pub depth_clip: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self { cull_mode: CullMode::Back, front_counter_clockwise: false, depth_clip: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonFunc {
    Less,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilState {
    pub depth_enable: bool,
    pub depth_write: bool,
    pub depth_func: ComparisonFunc,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self { depth_enable: true, depth_write: true, depth_func: ComparisonFunc::Less }
    }
}

/// 图形管线状态描述
///
/// 混合固定为关闭、写入全部通道；图元拓扑为三角形；采样数为 1，采样掩码全 1。
pub struct PipelineStateDesc<'a, B: GraphicsBackend> {
    pub root_signature: &'a B::RootSignature,
    pub vertex_shader: &'a B::ShaderBlob,
    pub pixel_shader: &'a B::ShaderBlob,
    pub input_layout: &'a [InputElement],
    pub rasterizer: RasterizerState,
    pub depth_stencil: DepthStencilState,
    pub render_target_format: Format,
    pub depth_format: Format,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_layout_matches_vertex() {
        let layout = vertex_input_layout();
        let end = layout.last().map(|e| e.offset + e.format.size()).unwrap();
        assert_eq!(end, Vertex::STRIDE);
        assert_eq!(layout[1].semantic.to_str().unwrap(), "COLOR");
    }

    #[test]
    fn test_standard_root_signature() {
        let desc = RootSignatureDesc::standard();
        assert_eq!(
            desc.parameters[root_index::CAMERA as usize],
            RootParameter::ConstantBuffer { register: 1, visibility: ShaderVisibility::All }
        );
        assert!(matches!(
            desc.parameters[root_index::TEXTURE as usize],
            RootParameter::ShaderResourceTable { base_register: 0, count: 1, .. }
        ));
        assert_eq!(desc.static_samplers.len(), 1);
        assert!(desc.allow_input_layout);
    }

    #[test]
    fn test_default_states() {
        let raster = RasterizerState::default();
        assert_eq!(raster.cull_mode, CullMode::Back);
        assert!(!raster.front_counter_clockwise);
        assert_eq!(DepthStencilState::default().depth_func, ComparisonFunc::Less);
    }
}
