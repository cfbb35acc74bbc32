//! 渲染器模块
//!
//! 本模块在 [`GraphicsBackend`](crate::gfx::GraphicsBackend) 之上组织出一条组件链：
//!
//! ```text
//! Render ──owns──► RenderResources ──creates──► Material / Texture / Mesh
//! ```
//!
//! # 架构设计
//!
//! - `render_resources`：按顺序创建与释放全部原生对象，管理栅栏
//! - `render`：每帧的 clear / draw / display
//! - `material` / `texture` / `mesh`：绘制一个物体所需的 GPU 数据
//! - `pipeline` / `shaders` / `descriptor`：后端无关的管线描述
//! - `resource` / `sync`：上传缓冲区、帧资源与栅栏记账

// 通用渲染器组件（与具体 API 无关）
pub mod descriptor;
pub mod pipeline;
pub mod resource;
pub mod shaders;
pub mod sync;

pub mod render_resources;
pub mod render;
pub mod material;
pub mod texture;
pub mod mesh;

pub use material::Material;
pub use mesh::Mesh;
pub use render::Render;
pub use render_resources::RenderResources;
pub use texture::Texture;
