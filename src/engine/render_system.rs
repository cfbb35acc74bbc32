//! 渲染系统
//!
//! 按层收集 [`MeshRenderer`]，每帧从第 0 层开始逐层绘制。

use std::cell::Cell;
use std::rc::Rc;

use tracing::trace;

use crate::core::error::{GraphicEngineError, Result};
use crate::engine::graphic_engine::GraphicEngine;
use crate::gfx::backend::{GfxResult, GraphicsBackend};
use crate::math::Matrix4;
use crate::engine_error;
use crate::renderer::{Material, Mesh};

/// 渲染层数量
pub const LAYER_COUNT: usize = 16;

/// 一个可绘制的物体：网格、材质与世界矩阵
///
/// 网格和材质可以在多个渲染器之间共享。共享同一材质的渲染器在同一帧内
/// 会互相覆盖世界矩阵，因此需要不同世界矩阵的物体应当使用各自的材质。
pub struct MeshRenderer<B: GraphicsBackend> {
    mesh: Rc<Mesh<B>>,
    material: Rc<Material<B>>,
    world: Cell<Matrix4>,
}

impl<B: GraphicsBackend> MeshRenderer<B> {
    pub fn new(mesh: Rc<Mesh<B>>, material: Rc<Material<B>>, world: Matrix4) -> Self {
        Self { mesh, material, world: Cell::new(world) }
    }

    pub fn mesh(&self) -> &Mesh<B> {
        &self.mesh
    }

    pub fn material(&self) -> &Material<B> {
        &self.material
    }

    pub fn world(&self) -> Matrix4 {
        self.world.get()
    }

    /// 更新世界矩阵，下一帧生效
    pub fn set_world(&self, world: Matrix4) {
        self.world.set(world);
    }
}

pub struct RenderSystem<B: GraphicsBackend> {
    layers: [Vec<Rc<MeshRenderer<B>>>; LAYER_COUNT],
}

impl<B: GraphicsBackend> RenderSystem<B> {
    pub fn new() -> Self {
        Self { layers: std::array::from_fn(|_| Vec::new()) }
    }

    /// 把渲染器加入第 `layer` 层的末尾
    pub fn register(&mut self, layer: usize, renderer: Rc<MeshRenderer<B>>) -> Result<()> {
        let slot = self
            .layers
            .get_mut(layer)
            .ok_or(GraphicEngineError::InvalidLayer { layer, count: LAYER_COUNT })?;
        slot.push(renderer);
        Ok(())
    }

    /// 移除渲染器；返回是否找到
    pub fn unregister(&mut self, layer: usize, renderer: &Rc<MeshRenderer<B>>) -> bool {
        let Some(slot) = self.layers.get_mut(layer) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|r| !Rc::ptr_eq(r, renderer));
        slot.len() != before
    }

    /// 已注册的渲染器总数
    pub fn len(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.layers.iter_mut().for_each(Vec::clear);
    }

    /// 绘制一帧：begin_draw，逐层绘制，display
    ///
    /// 某个物体绘制失败时仍然提交这一帧，然后返回该错误。
    /// 成功时返回绘制的物体数量。
    pub fn rendering(&self, engine: &mut GraphicEngine<B>) -> GfxResult<usize> {
        engine.begin_draw()?;

        let drawn = self.draw_layers(engine);
        if let Err(e) = &drawn {
            engine_error!("Error while drawing frame: {}", e);
        }
        engine.display()?;

        let count = drawn?;
        trace!(count, "Frame rendered");
        Ok(count)
    }

    fn draw_layers(&self, engine: &GraphicEngine<B>) -> GfxResult<usize> {
        let mut count = 0;
        for renderer in self.layers.iter().flatten() {
            engine.render_frame(renderer.mesh(), renderer.material(), &renderer.world())?;
            count += 1;
        }
        Ok(count)
    }
}

impl<B: GraphicsBackend> Default for RenderSystem<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graphic_engine::tests::test_config;
    use crate::geometry::PrimitiveGeometryType;
    use crate::gfx::headless::{ApiEvent, Command, HeadlessBackend};
    use crate::gfx::headless_window_handle;
    use crate::core::error::GraphicsError;
    use crate::math::{matrix, Color};

    fn engine(backend: &HeadlessBackend) -> GraphicEngine<HeadlessBackend> {
        GraphicEngine::new(backend.clone(), headless_window_handle(), &test_config()).unwrap()
    }

    fn renderer(
        engine: &GraphicEngine<HeadlessBackend>,
        kind: PrimitiveGeometryType,
    ) -> Rc<MeshRenderer<HeadlessBackend>> {
        let geometry = engine.create_primitive_geometry(kind, Color::GREEN);
        let mesh = Rc::new(engine.create_mesh(&geometry).unwrap());
        let material = Rc::new(engine.create_material().unwrap());
        Rc::new(MeshRenderer::new(mesh, material, Matrix4::identity()))
    }

    fn draw_counts(backend: &HeadlessBackend) -> Vec<u32> {
        backend
            .commands()
            .into_iter()
            .filter_map(|c| match c {
                Command::DrawIndexed { index_count } => Some(index_count),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_layers_draw_in_order() {
        let backend = HeadlessBackend::new();
        let mut engine = engine(&backend);
        let cube = renderer(&engine, PrimitiveGeometryType::Cube);
        let triangle = renderer(&engine, PrimitiveGeometryType::Triangle);

        let mut system = RenderSystem::new();
        system.register(3, Rc::clone(&cube)).unwrap();
        system.register(0, Rc::clone(&triangle)).unwrap();
        backend.clear_events();

        assert_eq!(system.rendering(&mut engine).unwrap(), 2);
        assert_eq!(draw_counts(&backend), vec![3, 36]);
    }

    #[test]
    fn test_layer_out_of_range() {
        let backend = HeadlessBackend::new();
        let engine = engine(&backend);
        let square = renderer(&engine, PrimitiveGeometryType::Square);

        let mut system = RenderSystem::new();
        let err = system.register(LAYER_COUNT, square).err().unwrap();
        assert!(matches!(err, GraphicEngineError::InvalidLayer { layer: 16, count: 16 }));
        assert!(system.is_empty());
    }

    #[test]
    fn test_unregister() {
        let backend = HeadlessBackend::new();
        let mut engine = engine(&backend);
        let square = renderer(&engine, PrimitiveGeometryType::Square);

        let mut system = RenderSystem::new();
        system.register(1, Rc::clone(&square)).unwrap();
        assert!(!system.unregister(0, &square));
        assert!(system.unregister(1, &square));
        assert!(!system.unregister(LAYER_COUNT, &square));

        backend.clear_events();
        assert_eq!(system.rendering(&mut engine).unwrap(), 0);
        assert!(draw_counts(&backend).is_empty());
    }

    #[test]
    fn test_world_matrix_follows_renderer() {
        let backend = HeadlessBackend::new();
        let mut engine = engine(&backend);
        let square = renderer(&engine, PrimitiveGeometryType::Square);
        square.set_world(matrix::translation(2.0, 0.0, 0.0));

        let mut system = RenderSystem::new();
        system.register(0, Rc::clone(&square)).unwrap();
        system.rendering(&mut engine).unwrap();

        let contents = backend.buffer_contents(square.material().constant_buffer().resource()).unwrap();
        let stored: [[f32; 4]; 4] = bytemuck::pod_read_unaligned(&contents[..64]);
        assert_eq!(stored[3], [2.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_failed_draw_still_submits_frame() {
        let backend = HeadlessBackend::new();
        let mut engine = engine(&backend);
        let square = renderer(&engine, PrimitiveGeometryType::Square);
        let broken = renderer(&engine, PrimitiveGeometryType::Triangle);
        backend.fail_writes_to(broken.material().constant_buffer().resource());

        let mut system = RenderSystem::new();
        system.register(0, Rc::clone(&square)).unwrap();
        system.register(1, Rc::clone(&broken)).unwrap();
        backend.clear_events();

        let result = system.rendering(&mut engine);

        assert!(matches!(result, Err(GraphicsError::CommandExecution(_))));
        assert_eq!(draw_counts(&backend), vec![6]);
        let events = backend.events();
        assert!(events.contains(&ApiEvent::Execute));
        assert!(events.contains(&ApiEvent::Present { sync_interval: 1 }));
        assert!(!engine.render().is_recording());
        assert_eq!(engine.render().resources().fence_value(), 1);
    }
}
