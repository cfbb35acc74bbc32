//! 引擎层
//!
//! - [`GraphicEngine`]：渲染器门面
//! - [`RenderSystem`]：按层组织 [`MeshRenderer`] 并驱动每一帧

pub mod graphic_engine;
pub mod render_system;

pub use graphic_engine::GraphicEngine;
pub use render_system::{MeshRenderer, RenderSystem, LAYER_COUNT};
