//! 帧录制与提交
//!
//! [`Render`] 在 [`RenderResources`] 之上实现每帧的三个阶段：
//!
//! 1. [`clear`](Render::clear)：等待当前缓冲区的上一帧，重置命令列表，清屏并绑定公共状态
//! 2. [`draw`](Render::draw)：每个网格一次，写入世界矩阵并发出索引绘制
//! 3. [`display`](Render::display)：关闭并执行命令列表，呈现，signal 栅栏
//!
//! 相机与材质的常量缓冲区按交换链缓冲区分槽。第 N 帧只写入 `frame_index`
//! 槽位，而该槽位在 `clear` 等待过上一次使用它的帧之后才会被改写。

use std::cell::Cell;

use raw_window_handle::RawWindowHandle;
use tracing::{error, trace};

use crate::core::config::GraphicsConfig;
use crate::core::error::{GraphicsError, Result};
use crate::gfx::backend::{GfxResult, GraphicsBackend};
use crate::math::Matrix4;
use crate::renderer::material::Material;
use crate::renderer::mesh::Mesh;
use crate::renderer::pipeline::{root_index, ResourceState};
use crate::renderer::render_resources::RenderResources;
use crate::renderer::resource::{CameraConstants, UploadBuffer};
use crate::renderer::texture::Texture;

/// 记录一次失败的命令并原样返回错误
fn logged<T>(what: &str, result: GfxResult<T>) -> GfxResult<T> {
    result.map_err(|e| {
        error!("Error while {}: {}", what, e);
        e
    })
}

pub struct Render<B: GraphicsBackend> {
    // 字段按析构顺序排列：缓冲区和纹理先于设备释放
    camera_buffer: UploadBuffer<B, CameraConstants>,
    white_texture: Texture<B>,
    resources: RenderResources<B>,
    /// 下一次写入相机缓冲区的内容
    camera: Cell<CameraConstants>,
    recording: bool,
}

impl<B: GraphicsBackend> Render<B> {
    pub fn new(
        backend: B,
        window: RawWindowHandle,
        width: u32,
        height: u32,
        settings: &GraphicsConfig,
    ) -> Result<Self> {
        let resources = RenderResources::new(backend, window, width, height, settings)?;

        // 白色纹理占用 SRV 堆的 0 号槽位
        let white_texture = Texture::white(&resources)?;

        let backend = resources.backend();
        let frame_count = resources.frame_count() as usize;
        let camera_buffer = UploadBuffer::new(backend, resources.device()?, frame_count, true)?;
        camera_buffer.set_name(backend, "CameraUBuffer");

        Ok(Self {
            camera_buffer,
            white_texture,
            resources,
            camera: Cell::new(CameraConstants::default()),
            recording: false,
        })
    }

    /// 开始一帧
    pub fn clear(&mut self) -> GfxResult<()> {
        if self.recording {
            return Err(GraphicsError::CommandExecution(
                "clear called while a frame is already being recorded".to_string(),
            ));
        }

        let frame_index = self.resources.frame_index();
        self.resources.wait_for_frame(frame_index)?;
        self.write_camera(frame_index)?;

        let resources = &self.resources;
        let backend = resources.backend();
        let allocator = resources.command_allocator()?;
        let list = resources.command_list()?;
        let rtv_heap = resources.rtv_heap()?;
        let dsv_heap = resources.dsv_heap()?;
        let srv_heap = resources.srv_heap()?;
        let render_target = resources.current_render_target()?;
        let root_signature = resources.root_signature()?;
        let pipeline_state = resources.pipeline_state()?;

        logged("resetting the command allocator", backend.reset_command_allocator(allocator))?;
        logged("resetting the command list", backend.reset_command_list(list, allocator, pipeline_state))?;
        self.recording = true;

        backend.resource_barrier(list, render_target, ResourceState::Present, ResourceState::RenderTarget);
        backend.set_render_targets(list, rtv_heap, frame_index, dsv_heap, 0);
        backend.clear_render_target_view(list, rtv_heap, frame_index, resources.settings().clear_color);
        backend.clear_depth_stencil_view(list, dsv_heap, 0, 1.0);
        backend.set_viewport_and_scissor(list, resources.width(), resources.height());

        backend.set_graphics_root_signature(list, root_signature);
        backend.set_descriptor_heap(list, srv_heap);
        backend.set_root_constant_buffer_view(
            list,
            root_index::CAMERA,
            self.camera_buffer.resource(),
            self.camera_buffer.element_offset(frame_index as usize),
        );

        trace!(frame_index, "Frame recording started");
        Ok(())
    }

    /// 以 `world` 绘制一个网格
    ///
    /// 材质没有纹理时采样内置的白色纹理。
    pub fn draw(&self, mesh: &Mesh<B>, material: &Material<B>, world: &Matrix4) -> GfxResult<()> {
        self.ensure_recording("draw")?;

        let resources = &self.resources;
        let backend = resources.backend();
        let list = resources.command_list()?;
        let frame_index = resources.frame_index();

        material.update_world_constant_buffer(backend, frame_index, world)?;
        backend.set_root_constant_buffer_view(
            list,
            root_index::OBJECT,
            material.constant_buffer().resource(),
            material.constant_buffer_offset(frame_index),
        );
        if !material.update_texture(resources, root_index::TEXTURE)? {
            backend.set_root_descriptor_table(
                list,
                root_index::TEXTURE,
                resources.srv_heap()?,
                self.white_texture.slot(),
            );
        }

        mesh.bind(backend, list);
        backend.draw_indexed(list, mesh.index_count());
        Ok(())
    }

    /// 提交并呈现当前帧
    pub fn display(&mut self) -> GfxResult<()> {
        self.ensure_recording("display")?;
        self.recording = false;

        let resources = &self.resources;
        let backend = resources.backend();
        let list = resources.command_list()?;

        backend.resource_barrier(
            list,
            resources.current_render_target()?,
            ResourceState::RenderTarget,
            ResourceState::Present,
        );
        logged("closing the command list", backend.close_command_list(list))?;
        logged(
            "executing the command list",
            backend.execute_command_list(resources.command_queue()?, list),
        )?;

        let sync_interval = if resources.settings().vsync { 1 } else { 0 };
        logged("presenting", backend.present(resources.swap_chain()?, sync_interval))?;

        let fence_value = self.resources.end_frame()?;
        trace!(fence_value = fence_value.value(), "Frame submitted");
        Ok(())
    }

    /// 更新视图投影矩阵（projection × view，以转置形式存放）
    ///
    /// 录制中的帧立即生效，否则在下一次 `clear` 时写入该帧的槽位。
    pub fn update_camera(&self, view: &Matrix4, projection: &Matrix4) -> GfxResult<()> {
        self.camera.set(CameraConstants::from_view_projection(&(projection * view)));
        if self.recording {
            self.write_camera(self.resources.frame_index())?;
        }
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) -> GfxResult<()> {
        if self.recording {
            return Err(GraphicsError::CommandExecution(
                "cannot resize while a frame is being recorded".to_string(),
            ));
        }
        self.resources.resize(width, height)
    }

    pub fn resources(&self) -> &RenderResources<B> {
        &self.resources
    }

    pub fn resources_mut(&mut self) -> &mut RenderResources<B> {
        &mut self.resources
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn white_texture(&self) -> &Texture<B> {
        &self.white_texture
    }

    fn write_camera(&self, frame_index: u32) -> GfxResult<()> {
        self.camera_buffer
            .copy_data(self.resources.backend(), frame_index as usize, &self.camera.get())
    }

    fn ensure_recording(&self, what: &str) -> GfxResult<()> {
        if self.recording {
            Ok(())
        } else {
            Err(GraphicsError::CommandExecution(format!("{} called before clear", what)))
        }
    }
}

impl<B: GraphicsBackend> Drop for Render<B> {
    fn drop(&mut self) {
        // 相机缓冲区和白色纹理可能仍被 GPU 引用
        if let Err(e) = self.resources.wait_for_gpu() {
            error!("Error while waiting for the GPU before teardown: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{create_primitive_geometry, PrimitiveGeometryType};
    use crate::gfx::headless::{ApiEvent, Command, GpuTimeline, HeadlessBackend, ObjectKind};
    use crate::gfx::headless_window_handle;
    use crate::math::{matrix, Color};
    use crate::renderer::render_resources::tests::test_settings;

    fn render(backend: &HeadlessBackend) -> Render<HeadlessBackend> {
        Render::new(backend.clone(), headless_window_handle(), 320, 240, &test_settings()).unwrap()
    }

    #[test]
    fn test_clear_records_frame_setup() {
        let backend = HeadlessBackend::new();
        let mut render = render(&backend);
        let camera_address = backend.gpu_virtual_address(render.camera_buffer.resource());
        backend.clear_events();

        render.clear().unwrap();

        assert_eq!(
            backend.commands(),
            vec![
                Command::ResetAllocator,
                Command::Reset,
                Command::Barrier { before: ResourceState::Present, after: ResourceState::RenderTarget },
                Command::SetRenderTargets { rtv_index: 0, dsv_index: 0 },
                Command::ClearRenderTarget { index: 0, color: test_settings().clear_color },
                Command::ClearDepth { depth: 1.0 },
                Command::SetViewport { width: 320, height: 240 },
                Command::SetRootSignature,
                Command::SetDescriptorHeap,
                Command::SetConstantBuffer { root_index: root_index::CAMERA, address: camera_address },
            ]
        );
        assert!(render.is_recording());
    }

    #[test]
    fn test_draw_falls_back_to_white_texture() {
        let backend = HeadlessBackend::new();
        let mut render = render(&backend);
        let geometry = create_primitive_geometry(PrimitiveGeometryType::Square, Color::WHITE);
        let mesh = Mesh::new(render.resources(), &geometry).unwrap();
        let material = Material::new(render.resources()).unwrap();
        let material_address = backend.gpu_virtual_address(material.constant_buffer().resource());

        render.clear().unwrap();
        backend.clear_events();
        render.draw(&mesh, &material, &matrix::translation(0.0, 1.0, 0.0)).unwrap();

        assert_eq!(
            backend.commands(),
            vec![
                Command::SetConstantBuffer { root_index: root_index::OBJECT, address: material_address },
                Command::SetDescriptorTable { root_index: root_index::TEXTURE, slot: 0 },
                Command::SetVertexBuffer { size: 4 * 36, stride: 36 },
                Command::SetIndexBuffer { size: 6 * 4 },
                Command::DrawIndexed { index_count: 6 },
            ]
        );
    }

    #[test]
    fn test_draw_binds_material_texture() {
        let backend = HeadlessBackend::new();
        let mut render = render(&backend);
        let geometry = create_primitive_geometry(PrimitiveGeometryType::Triangle, Color::WHITE);
        let mesh = Mesh::new(render.resources(), &geometry).unwrap();
        let mut material = Material::new(render.resources()).unwrap();
        material.set_texture(Texture::from_rgba8(render.resources(), 1, 1, &[0, 0, 0, 255]).unwrap());

        render.clear().unwrap();
        backend.clear_events();
        render.draw(&mesh, &material, &Matrix4::identity()).unwrap();

        assert!(backend
            .commands()
            .contains(&Command::SetDescriptorTable { root_index: root_index::TEXTURE, slot: 1 }));
    }

    #[test]
    fn test_display_submits_and_presents() {
        let backend = HeadlessBackend::new();
        let mut render = render(&backend);
        render.clear().unwrap();
        backend.clear_events();

        render.display().unwrap();

        assert_eq!(
            backend.events(),
            vec![
                ApiEvent::Command(Command::Barrier {
                    before: ResourceState::RenderTarget,
                    after: ResourceState::Present
                }),
                ApiEvent::Command(Command::Close),
                ApiEvent::Execute,
                ApiEvent::Present { sync_interval: 1 },
                ApiEvent::Signal(1),
            ]
        );
        assert!(!render.is_recording());
        assert_eq!(render.resources().frame_index(), 1);
    }

    #[test]
    fn test_present_without_vsync() {
        let backend = HeadlessBackend::new();
        let settings = GraphicsConfig { vsync: false, ..test_settings() };
        let mut render = Render::new(backend.clone(), headless_window_handle(), 320, 240, &settings).unwrap();

        render.clear().unwrap();
        render.display().unwrap();

        assert!(backend.events().contains(&ApiEvent::Present { sync_interval: 0 }));
    }

    #[test]
    fn test_draw_and_display_require_clear() {
        let backend = HeadlessBackend::new();
        let mut render = render(&backend);
        let geometry = create_primitive_geometry(PrimitiveGeometryType::Triangle, Color::WHITE);
        let mesh = Mesh::new(render.resources(), &geometry).unwrap();
        let material = Material::new(render.resources()).unwrap();

        assert!(matches!(
            render.draw(&mesh, &material, &Matrix4::identity()),
            Err(GraphicsError::CommandExecution(_))
        ));
        assert!(matches!(render.display(), Err(GraphicsError::CommandExecution(_))));

        render.clear().unwrap();
        assert!(matches!(render.clear(), Err(GraphicsError::CommandExecution(_))));
    }

    #[test]
    fn test_in_flight_frames_bounded_by_buffer_count() {
        let backend = HeadlessBackend::with_timeline(GpuTimeline::Lagging);
        let mut render = render(&backend);

        for _ in 0..2 {
            render.clear().unwrap();
            render.display().unwrap();
        }
        assert_eq!(render.resources().frames_in_flight(), 2);
        backend.clear_events();

        // 第三帧复用 0 号缓冲区，必须等第一帧完成
        render.clear().unwrap();
        let events = backend.events();
        assert_eq!(&events[..2], &[ApiEvent::SetEventOnCompletion(1), ApiEvent::Wait(1)]);
        assert!(render.resources().frames_in_flight() < 2);
    }

    #[test]
    fn test_update_camera_writes_transposed_view_projection() {
        let backend = HeadlessBackend::new();
        let mut render = render(&backend);
        let view = matrix::translation(0.0, 0.0, 5.0);
        let projection = matrix::scaling(2.0, 2.0, 1.0);

        render.update_camera(&view, &projection).unwrap();
        render.clear().unwrap();

        let contents = backend.buffer_contents(render.camera_buffer.resource()).unwrap();
        let stored: [[f32; 4]; 4] = bytemuck::pod_read_unaligned(&contents[..64]);
        assert_eq!(stored, matrix::to_gpu_layout(&(projection * view)));
        assert_eq!(stored[3], [0.0, 0.0, 5.0, 1.0]);

        // 录制中的更新立即写入当前帧的槽位
        render.update_camera(&matrix::translation(0.0, 0.0, 3.0), &Matrix4::identity()).unwrap();
        let contents = backend.buffer_contents(render.camera_buffer.resource()).unwrap();
        let stored: [[f32; 4]; 4] = bytemuck::pod_read_unaligned(&contents[..64]);
        assert_eq!(stored[3], [0.0, 0.0, 3.0, 1.0]);
    }

    #[test]
    fn test_pending_frame_world_matrix_is_not_overwritten() {
        let backend = HeadlessBackend::with_timeline(GpuTimeline::Lagging);
        let mut render = render(&backend);
        let geometry = create_primitive_geometry(PrimitiveGeometryType::Triangle, Color::WHITE);
        let mesh = Mesh::new(render.resources(), &geometry).unwrap();
        let material = Material::new(render.resources()).unwrap();
        let base = backend.gpu_virtual_address(material.constant_buffer().resource());

        render.clear().unwrap();
        render.draw(&mesh, &material, &matrix::translation(1.0, 0.0, 0.0)).unwrap();
        render.display().unwrap();

        backend.clear_events();
        render.clear().unwrap();
        render.draw(&mesh, &material, &matrix::translation(9.0, 0.0, 0.0)).unwrap();

        // 第一帧尚未完成，第二帧不需要等待它
        assert!(!backend.events().contains(&ApiEvent::Wait(1)));
        let contents = backend.buffer_contents(material.constant_buffer().resource()).unwrap();
        let first: [[f32; 4]; 4] = bytemuck::pod_read_unaligned(&contents[..64]);
        let second: [[f32; 4]; 4] = bytemuck::pod_read_unaligned(&contents[256..320]);
        assert_eq!(first[3], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(second[3], [9.0, 0.0, 0.0, 1.0]);
        assert!(backend
            .commands()
            .contains(&Command::SetConstantBuffer { root_index: root_index::OBJECT, address: base + 256 }));
    }

    #[test]
    fn test_camera_update_between_frames_waits_for_next_clear() {
        let backend = HeadlessBackend::with_timeline(GpuTimeline::Lagging);
        let mut render = render(&backend);
        let base = backend.gpu_virtual_address(render.camera_buffer.resource());

        render.update_camera(&matrix::translation(0.0, 0.0, 1.0), &Matrix4::identity()).unwrap();
        render.clear().unwrap();
        render.display().unwrap();

        render.update_camera(&matrix::translation(0.0, 0.0, 7.0), &Matrix4::identity()).unwrap();
        let contents = backend.buffer_contents(render.camera_buffer.resource()).unwrap();
        let first: [[f32; 4]; 4] = bytemuck::pod_read_unaligned(&contents[..64]);
        assert_eq!(first[3], [0.0, 0.0, 1.0, 1.0]);

        backend.clear_events();
        render.clear().unwrap();

        let contents = backend.buffer_contents(render.camera_buffer.resource()).unwrap();
        let first: [[f32; 4]; 4] = bytemuck::pod_read_unaligned(&contents[..64]);
        let second: [[f32; 4]; 4] = bytemuck::pod_read_unaligned(&contents[256..320]);
        assert_eq!(first[3], [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(second[3], [0.0, 0.0, 7.0, 1.0]);
        assert!(backend
            .commands()
            .contains(&Command::SetConstantBuffer { root_index: root_index::CAMERA, address: base + 256 }));
    }

    #[test]
    fn test_failed_clear_does_not_start_recording() {
        let backend = HeadlessBackend::new();
        let mut render = render(&backend);
        backend.fail_on(ObjectKind::RenderTarget(0));
        assert!(render.resize(640, 480).is_err());
        backend.clear_events();

        let err = render.clear().unwrap_err();
        assert!(err.to_string().contains("render target"));
        assert!(!render.is_recording());
        assert!(!backend.commands().contains(&Command::Reset));

        // 再次调用得到相同的错误，而不是“正在录制”
        let err = render.clear().unwrap_err();
        assert!(err.to_string().contains("render target"));
    }

    #[test]
    fn test_drop_waits_then_releases_everything() {
        let backend = HeadlessBackend::new();
        let mut render = render(&backend);
        render.clear().unwrap();
        render.display().unwrap();
        backend.clear_events();

        drop(render);

        let events = backend.events();
        assert_eq!(&events[..3], &[ApiEvent::Signal(2), ApiEvent::SetEventOnCompletion(2), ApiEvent::Wait(2)]);
        let buffer_released = events
            .iter()
            .position(|e| *e == ApiEvent::Released(ObjectKind::Buffer))
            .unwrap();
        let device_released = events
            .iter()
            .position(|e| *e == ApiEvent::Released(ObjectKind::Device))
            .unwrap();
        assert!(buffer_released < device_released);
        assert_eq!(events.last(), Some(&ApiEvent::ReportLiveObjects(0)));
        assert_eq!(backend.live_objects(), 0);
    }
}
