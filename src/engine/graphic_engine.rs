//! 图形引擎门面
//!
//! [`GraphicEngine`] 是应用程序使用渲染器的唯一入口：
//! 创建几何体、网格、材质与纹理，更新相机，驱动每一帧。

use std::path::Path;

use raw_window_handle::RawWindowHandle;

use crate::component::{Camera, CameraMatrices, Lens};
use crate::core::config::Config;
use crate::core::error::Result;
use crate::geometry::{create_primitive_geometry, Geometry, PrimitiveGeometryType};
use crate::gfx::backend::{GfxResult, GraphicsBackend};
use crate::math::{Color, Matrix4, Vector3};
use crate::renderer::{Material, Mesh, Render, Texture};
use crate::{engine_info, engine_warn};

pub struct GraphicEngine<B: GraphicsBackend> {
    render: Render<B>,
    camera: Camera,
}

impl<B: GraphicsBackend> GraphicEngine<B> {
    /// 校验配置并创建全部渲染资源
    pub fn new(backend: B, window: RawWindowHandle, config: &Config) -> Result<Self> {
        config.validate()?;

        let (width, height) = (config.window.width, config.window.height);
        let render = Render::new(backend, window, width, height, &config.graphics)?;

        let engine = Self { render, camera: Camera::new(width as f32, height as f32) };
        let matrices = engine.camera.matrices();
        engine.render.update_camera(&matrices.view, &matrices.projection)?;

        engine_info!(
            backend = engine.render.resources().backend().name(),
            width,
            height,
            "Graphic engine initialized"
        );
        Ok(engine)
    }

    pub fn begin_draw(&mut self) -> GfxResult<()> {
        self.render.clear()
    }

    pub fn render_frame(&self, mesh: &Mesh<B>, material: &Material<B>, world: &Matrix4) -> GfxResult<()> {
        self.render.draw(mesh, material, world)
    }

    pub fn display(&mut self) -> GfxResult<()> {
        self.render.display()
    }

    pub fn create_primitive_geometry(&self, kind: PrimitiveGeometryType, color: Color) -> Geometry {
        create_primitive_geometry(kind, color)
    }

    pub fn create_mesh(&self, geometry: &Geometry) -> GfxResult<Mesh<B>> {
        Mesh::new(self.render.resources(), geometry)
    }

    pub fn create_material(&self) -> GfxResult<Material<B>> {
        Material::new(self.render.resources())
    }

    pub fn create_texture(&self, path: impl AsRef<Path>) -> Result<Texture<B>> {
        Texture::from_file(self.render.resources(), path)
    }

    /// 相机注视 `target`，并写入相机常量缓冲区
    pub fn update_camera_at(
        &mut self,
        position: Vector3,
        target: Vector3,
        up: Vector3,
        lens: Lens,
    ) -> GfxResult<CameraMatrices> {
        let matrices = self.camera.update_at(position, target, up, lens);
        self.render.update_camera(&matrices.view, &matrices.projection)?;
        Ok(matrices)
    }

    /// 相机沿 `direction` 观察，并写入相机常量缓冲区
    pub fn update_camera_to(
        &mut self,
        position: Vector3,
        direction: Vector3,
        up: Vector3,
        lens: Lens,
    ) -> GfxResult<CameraMatrices> {
        let matrices = self.camera.update_to(position, direction, up, lens);
        self.render.update_camera(&matrices.view, &matrices.projection)?;
        Ok(matrices)
    }

    /// 调整交换链与相机视口；最小化（宽或高为 0）时忽略
    pub fn resize(&mut self, width: u32, height: u32) -> GfxResult<()> {
        if width == 0 || height == 0 {
            engine_warn!(width, height, "Ignoring resize to an empty area");
            return Ok(());
        }
        self.render.resize(width, height)?;
        let matrices = self.camera.set_viewport(width as f32, height as f32);
        self.render.update_camera(&matrices.view, &matrices.projection)
    }

    pub fn render(&self) -> &Render<B> {
        &self.render
    }

    pub fn render_mut(&mut self) -> &mut Render<B> {
        &mut self.render
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }
}
