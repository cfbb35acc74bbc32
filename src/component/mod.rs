//! 组件模块
//!
//! 渲染器直接使用的组件。目前只有相机：场景图和游戏对象不在本库范围内。

pub mod camera;

pub use camera::{Camera, CameraMatrices, Lens};
