//! GPU 网格
//!
//! 把 [`Geometry`] 的顶点和索引写入上传堆中的两个缓冲区。

use tracing::{debug, error};

use crate::core::error::GraphicsError;
use crate::geometry::{Geometry, Vertex};
use crate::gfx::backend::{GfxResult, GraphicsBackend};
use crate::renderer::render_resources::RenderResources;
use crate::renderer::resource::UploadBuffer;

/// 顶点缓冲区 + 32 位索引缓冲区
pub struct Mesh<B: GraphicsBackend> {
    vertex_buffer: UploadBuffer<B, Vertex>,
    index_buffer: UploadBuffer<B, u32>,
}

impl<B: GraphicsBackend> Mesh<B> {
    /// 上传几何数据；空几何体或索引越界的几何体会被拒绝
    pub fn new(resources: &RenderResources<B>, geometry: &Geometry) -> GfxResult<Self> {
        if geometry.is_empty() {
            error!("Error while creating mesh: geometry is empty");
            return Err(GraphicsError::ResourceCreation("cannot create a mesh from empty geometry".to_string()));
        }
        geometry.validate().map_err(|reason| {
            error!("Error while creating mesh: {}", reason);
            GraphicsError::ResourceCreation(reason)
        })?;

        let backend = resources.backend();
        let device = resources.device()?;

        let vertex_buffer = UploadBuffer::new(backend, device, geometry.vertex_count(), false)?;
        vertex_buffer.copy_slice(backend, &geometry.vertices)?;
        vertex_buffer.set_name(backend, "VertexBuffer");

        let index_buffer = UploadBuffer::new(backend, device, geometry.index_count(), false)?;
        index_buffer.copy_slice(backend, &geometry.indices)?;
        index_buffer.set_name(backend, "IndexBuffer");

        debug!(
            vertices = geometry.vertex_count(),
            indices = geometry.index_count(),
            "Mesh uploaded"
        );
        Ok(Self { vertex_buffer, index_buffer })
    }

    /// 在命令列表上绑定顶点和索引缓冲区
    pub fn bind(&self, backend: &B, list: &B::CommandList) {
        backend.set_vertex_buffer(
            list,
            self.vertex_buffer.resource(),
            self.vertex_buffer.total_size() as u32,
            Vertex::STRIDE,
        );
        backend.set_index_buffer(list, self.index_buffer.resource(), self.index_buffer.total_size() as u32);
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_buffer.element_count() as u32
    }

    pub fn index_count(&self) -> u32 {
        self.index_buffer.element_count() as u32
    }

    pub fn vertex_buffer(&self) -> &UploadBuffer<B, Vertex> {
        &self.vertex_buffer
    }

    pub fn index_buffer(&self) -> &UploadBuffer<B, u32> {
        &self.index_buffer
    }
}
