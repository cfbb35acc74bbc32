//! GraphicEngine - Direct3D 12 渲染器
//!
//! 一层很薄的 Direct3D 12 封装：按图形 API 规定的顺序创建设备、交换链、
//! 管线与同步对象，每帧录制并提交命令，销毁时等待 GPU 空闲后按固定顺序释放。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（日志、配置、错误处理）
//! - `math` / `component`: 矩阵工具与相机
//! - `geometry`: CPU 侧顶点与基本几何体
//! - `gfx`: 图形后端抽象层（DirectX 12 与 headless）
//! - `renderer`: 渲染资源、帧录制、网格 / 材质 / 纹理
//! - `engine`: `GraphicEngine` 门面与 `RenderSystem`
//!
//! # 使用示例
//!
//! ```no_run
//! use graphic_engine::core::Config;
//! use graphic_engine::engine::GraphicEngine;
//! use graphic_engine::geometry::PrimitiveGeometryType;
//! use graphic_engine::gfx::{headless_window_handle, HeadlessBackend};
//! use graphic_engine::math::{Color, Matrix4};
//!
//! let mut config = Config::default();
//! config.graphics.backend = graphic_engine::core::BackendKind::Headless;
//!
//! let mut engine = GraphicEngine::new(HeadlessBackend::new(), headless_window_handle(), &config)?;
//! let geometry = engine.create_primitive_geometry(PrimitiveGeometryType::Cube, Color::RED);
//! let mesh = engine.create_mesh(&geometry)?;
//! let material = engine.create_material()?;
//!
//! engine.begin_draw()?;
//! engine.render_frame(&mesh, &material, &Matrix4::identity())?;
//! engine.display()?;
//! # Ok::<(), graphic_engine::core::GraphicEngineError>(())
//! ```

pub mod core;
pub mod math;
pub mod component;
pub mod geometry;
pub mod gfx;
pub mod renderer;
pub mod engine;
