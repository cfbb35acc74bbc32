//! 错误处理模块
//!
//! 定义了引擎中使用的统一错误类型，使用 `thiserror` 派生友好的错误消息。
//!
//! # 设计原则
//!
//! - 每一次原生图形 API 调用失败都对应一个具体的 `GraphicsError` 变体
//! - 错误在包装层记录日志后通过 `?` 向上传播
//! - 支持错误链（error source）

use std::path::PathBuf;
use thiserror::Error;

use crate::renderer::shaders::ShaderStage;

/// 引擎统一的 Result 类型
pub type Result<T> = std::result::Result<T, GraphicEngineError>;

/// GraphicEngine 的顶层错误类型
#[derive(Debug, Error)]
pub enum GraphicEngineError {
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// 图形 API 错误
    #[error("Graphics error: {0}")]
    Graphics(#[from] GraphicsError),

    /// 纹理加载错误
    #[error("Texture error: {0}")]
    Texture(#[from] TextureError),

    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 渲染层索引越界
    #[error("Render layer {layer} out of range (0..{count})")]
    InvalidLayer { layer: usize, count: usize },
}

/// 配置相关的错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件未找到
    #[error("Config file not found: {0}")]
    FileNotFound(String),

    /// 配置文件解析失败
    #[error("Failed to parse config: {0}")]
    ParseError(String),

    /// 配置值无效
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 图形 API 相关的错误
///
/// 变体顺序与设备初始化顺序一致。
#[derive(Debug, Error)]
pub enum GraphicsError {
    /// DXGI 工厂创建失败
    #[error("Factory creation failed: {0}")]
    FactoryCreation(String),

    /// 没有找到可用的适配器
    #[error("Adapter enumeration failed: {0}")]
    AdapterNotFound(String),

    /// 设备创建失败
    #[error("Device creation failed: {0}")]
    DeviceCreation(String),

    /// 命令队列创建失败
    #[error("Command queue creation failed: {0}")]
    CommandQueueCreation(String),

    /// 描述符堆创建失败
    #[error("Descriptor heap creation failed: {0}")]
    DescriptorHeapCreation(String),

    /// 交换链错误
    #[error("Swapchain error: {0}")]
    SwapchainError(String),

    /// 渲染目标创建失败
    #[error("Render target {index} creation failed: {reason}")]
    RenderTargetCreation { index: u32, reason: String },

    /// 命令分配器创建失败
    #[error("Command allocator creation failed: {0}")]
    CommandAllocatorCreation(String),

    /// 着色器编译失败
    #[error("{stage} shader compilation failed: {message}")]
    ShaderCompilation { stage: ShaderStage, message: String },

    /// 根签名序列化或创建失败
    #[error("Root signature creation failed: {0}")]
    RootSignatureCreation(String),

    /// 管线状态对象创建失败
    #[error("Pipeline state creation failed: {0}")]
    PipelineStateCreation(String),

    /// 命令列表创建失败
    #[error("Command list creation failed: {0}")]
    CommandListCreation(String),

    /// 同步对象创建或等待失败
    #[error("Fence error: {0}")]
    Fence(String),

    /// 资源创建失败
    #[error("Resource creation failed: {0}")]
    ResourceCreation(String),

    /// 渲染命令执行失败
    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    /// 交换链呈现失败
    #[error("Present failed: {0}")]
    Present(String),
}

/// 纹理加载相关的错误
#[derive(Debug, Error)]
pub enum TextureError {
    /// 文件不存在
    #[error("Texture file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// 解码失败
    #[error("Failed to decode texture: {0}")]
    Decode(String),

    /// 像素数据与尺寸不匹配
    #[error("Invalid texture data: {0}")]
    InvalidData(String),

    /// SRV 描述符堆已满
    #[error("No free shader resource slot (capacity {0})")]
    SlotsExhausted(u32),
}

impl From<image::ImageError> for TextureError {
    fn from(err: image::ImageError) -> Self {
        TextureError::Decode(err.to_string())
    }
}
