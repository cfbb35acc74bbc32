//! 配置管理模块
//!
//! 提供引擎配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (config.toml)
//!
//! ```toml
//! [window]
//! width = 1280
//! height = 720
//! title = "GraphicEngine"
//! resizable = true
//!
//! [graphics]
//! backend = "dx12"    # 或 "headless"
//! vsync = true
//! frame_count = 2
//! debug_layer = true
//! shader_path = "res/shaders/shader.hlsl"
//! clear_color = [0.1, 0.1, 0.15, 1.0]
//! max_textures = 64
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::error::{ConfigError, Result};

/// 交换链缓冲数的合法范围
pub const MIN_FRAME_COUNT: u32 = 2;
pub const MAX_FRAME_COUNT: u32 = 3;

/// 引擎配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 窗口配置
    #[serde(default)]
    pub window: WindowConfig,

    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 窗口配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// 窗口宽度
    #[serde(default = "default_width")]
    pub width: u32,

    /// 窗口高度
    #[serde(default = "default_height")]
    pub height: u32,

    /// 窗口标题
    #[serde(default = "default_title")]
    pub title: String,

    /// 是否可调整大小
    #[serde(default = "default_resizable")]
    pub resizable: bool,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端选择
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// 垂直同步
    #[serde(default = "default_vsync")]
    pub vsync: bool,

    /// 交换链缓冲数量（同时也是最大在途帧数）
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,

    /// 是否启用调试层
    #[serde(default = "default_debug_layer")]
    pub debug_layer: bool,

    /// HLSL 着色器文件路径
    #[serde(default = "default_shader_path")]
    pub shader_path: PathBuf,

    /// 渲染目标清屏颜色
    #[serde(default = "default_clear_color")]
    pub clear_color: [f32; 4],

    /// 着色器可见 SRV 堆的容量（含内置白色纹理）
    #[serde(default = "default_max_textures")]
    pub max_textures: u32,
}

/// 图形后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// DirectX 12 后端（仅 Windows）
    Dx12,
    /// 无 GPU 的记录后端
    Headless,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
fn default_width() -> u32 { 1280 }
fn default_height() -> u32 { 720 }
fn default_title() -> String { "GraphicEngine".to_string() }
fn default_resizable() -> bool { true }
fn default_backend() -> BackendKind {
    if cfg!(target_os = "windows") { BackendKind::Dx12 } else { BackendKind::Headless }
}
fn default_vsync() -> bool { true }
fn default_frame_count() -> u32 { 2 }
fn default_debug_layer() -> bool { cfg!(debug_assertions) }
fn default_shader_path() -> PathBuf { PathBuf::from("res/shaders/shader.hlsl") }
fn default_clear_color() -> [f32; 4] { [0.1, 0.1, 0.15, 1.0] }
fn default_max_textures() -> u32 { 64 }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "graphic_engine.log".to_string() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            title: default_title(),
            resizable: default_resizable(),
        }
    }
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            vsync: default_vsync(),
            frame_count: default_frame_count(),
            debug_layer: default_debug_layer(),
            shader_path: default_shader_path(),
            clear_color: default_clear_color(),
            max_textures: default_max_textures(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或无法解析则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--dx12` / `--headless`: 选择图形后端
    /// - `--width <value>` / `--height <value>`: 设置窗口尺寸
    /// - `--no-vsync`: 关闭垂直同步
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if args.iter().any(|a| a == "--dx12") {
            self.graphics.backend = BackendKind::Dx12;
        }

        if args.iter().any(|a| a == "--headless") {
            self.graphics.backend = BackendKind::Headless;
        }

        if args.iter().any(|a| a == "--no-vsync") {
            self.graphics.vsync = false;
        }

        if let Some(idx) = args.iter().position(|a| a == "--width") {
            if let Some(width) = args.get(idx + 1).and_then(|s| s.parse().ok()) {
                self.window.width = width;
            }
        }

        if let Some(idx) = args.iter().position(|a| a == "--height") {
            if let Some(height) = args.get(idx + 1).and_then(|s| s.parse().ok()) {
                self.window.height = height;
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::InvalidValue {
                field: "window.width/height".to_string(),
                reason: "Window dimensions must be greater than 0".to_string(),
            }.into());
        }

        if !(MIN_FRAME_COUNT..=MAX_FRAME_COUNT).contains(&self.graphics.frame_count) {
            return Err(ConfigError::InvalidValue {
                field: "graphics.frame_count".to_string(),
                reason: format!(
                    "Frame count must be between {} and {}",
                    MIN_FRAME_COUNT, MAX_FRAME_COUNT
                ),
            }.into());
        }

        // 槽位 0 固定留给内置白色纹理
        if self.graphics.max_textures < 2 {
            return Err(ConfigError::InvalidValue {
                field: "graphics.max_textures".to_string(),
                reason: "At least 2 shader resource slots are required".to_string(),
            }.into());
        }

        if cfg!(not(target_os = "windows")) && self.graphics.backend == BackendKind::Dx12 {
            return Err(ConfigError::InvalidValue {
                field: "graphics.backend".to_string(),
                reason: "DirectX 12 backend is only available on Windows".to_string(),
            }.into());
        }

        Ok(())
    }
}

impl BackendKind {
    /// 获取后端名称
    pub fn name(&self) -> &'static str {
        match self {
            BackendKind::Dx12 => "DirectX 12",
            BackendKind::Headless => "Headless",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.window.width, 1280);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.graphics.frame_count, 2);
        assert!(config.graphics.vsync);
        assert_eq!(config.graphics.shader_path, PathBuf::from("res/shaders/shader.hlsl"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.graphics.backend = BackendKind::Headless;
        assert!(config.validate().is_ok());

        config.window.width = 0;
        assert!(config.validate().is_err());

        config.window.width = 800;
        config.graphics.frame_count = 4;
        assert!(config.validate().is_err());

        config.graphics.frame_count = 3;
        config.graphics.max_textures = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [window]
            width = 640

            [graphics]
            backend = "headless"
            vsync = false
            "#,
        )
        .unwrap();

        assert_eq!(config.window.width, 640);
        assert_eq!(config.window.height, 720);
        assert_eq!(config.graphics.backend, BackendKind::Headless);
        assert!(!config.graphics.vsync);
        assert_eq!(config.graphics.max_textures, 64);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml_str("[window]\nwidth = \"wide\"").is_err());
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args(["app", "--headless", "--width", "1024", "--height", "oops", "--no-vsync"]);

        assert_eq!(config.graphics.backend, BackendKind::Headless);
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 720);
        assert!(!config.graphics.vsync);
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!("graphic_engine_config_{}.toml", std::process::id()));
        let mut config = Config::default();
        config.window.title = "Saved".to_string();
        config.graphics.clear_color = [1.0, 0.0, 0.0, 1.0];
        config.save_to_file(&path).unwrap();

        let loaded = Config::from_file(&path).unwrap();
        assert_eq!(loaded.window.title, "Saved");
        assert_eq!(loaded.graphics.clear_color, [1.0, 0.0, 0.0, 1.0]);

        let _ = std::fs::remove_file(&path);
        assert!(Config::from_file(&path).is_err());
    }
}
