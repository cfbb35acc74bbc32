//! 着色器定义
//!
//! 渲染管线只使用一个 HLSL 源文件（默认 `res/shaders/shader.hlsl`），
//! 在运行时分别以顶点和像素阶段编译。
//!
//! # 渲染管线
//!
//! ```text
//! 顶点数据 -> vsmain (vs_5_0) -> 光栅化 -> psmain (ps_5_0) -> 渲染目标
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::error::GraphicsError;

/// 着色器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// 顶点着色器
    Vertex,
    /// 像素着色器
    Pixel,
}

impl ShaderStage {
    /// 入口函数名
    pub fn entry_point(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vsmain",
            ShaderStage::Pixel => "psmain",
        }
    }

    /// 编译目标（Shader Model 5.0）
    pub fn target(&self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_5_0",
            ShaderStage::Pixel => "ps_5_0",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Pixel => write!(f, "pixel"),
        }
    }
}

/// 编译选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderCompileFlags {
    /// 嵌入调试信息
    pub debug: bool,
    /// 跳过优化
    pub skip_optimization: bool,
    /// 警告视为错误
    pub warnings_as_errors: bool,
    /// 假定所有绑定的资源都有效
    pub all_resources_bound: bool,
}

impl Default for ShaderCompileFlags {
    fn default() -> Self {
        Self {
            debug: true,
            skip_optimization: true,
            warnings_as_errors: true,
            all_resources_bound: true,
        }
    }
}

/// 从磁盘读取的 HLSL 源码
#[derive(Debug, Clone)]
pub struct ShaderSource {
    /// 源文件路径，仅用于诊断信息
    pub path: PathBuf,
    /// 源码文本
    pub code: String,
}

impl ShaderSource {
    /// 读取着色器源文件
    ///
    /// 读取失败时返回对应阶段的编译错误，使得后续的管线创建不会执行。
    pub fn load(path: &Path, stage: ShaderStage) -> Result<Self, GraphicsError> {
        let code = std::fs::read_to_string(path).map_err(|e| GraphicsError::ShaderCompilation {
            stage,
            message: format!("failed to read {}: {}", path.display(), e),
        })?;

        Ok(Self { path: path.to_path_buf(), code })
    }

    pub fn new(path: impl Into<PathBuf>, code: impl Into<String>) -> Self {
        Self { path: path.into(), code: code.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_entry_points() {
        assert_eq!(ShaderStage::Vertex.entry_point(), "vsmain");
        assert_eq!(ShaderStage::Vertex.target(), "vs_5_0");
        assert_eq!(ShaderStage::Pixel.entry_point(), "psmain");
        assert_eq!(ShaderStage::Pixel.target(), "ps_5_0");
        assert_eq!(ShaderStage::Pixel.to_string(), "pixel");
    }

    #[test]
    fn test_missing_source_is_compile_error() {
        let path = std::env::temp_dir().join("graphic_engine_missing_shader.hlsl");
        let err = ShaderSource::load(&path, ShaderStage::Vertex).unwrap_err();
        assert!(matches!(err, GraphicsError::ShaderCompilation { stage: ShaderStage::Vertex, .. }));
    }

    #[test]
    fn test_bundled_shader_has_entry_points() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("res/shaders/shader.hlsl");
        let source = ShaderSource::load(&path, ShaderStage::Vertex).unwrap();
        assert!(source.code.contains("vsmain"));
        assert!(source.code.contains("psmain"));
    }
}
