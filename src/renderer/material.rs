//! 材质
//!
//! 每个材质持有一个物体常量缓冲区（b0）和一张可选的纹理（t0）。
//! 常量缓冲区为每个交换链缓冲区保留一个槽位，GPU 仍在读取上一帧的槽位时
//! CPU 写入的是另一个槽位。

use tracing::debug;

use crate::gfx::backend::{GfxResult, GraphicsBackend};
use crate::math::Matrix4;
use crate::renderer::render_resources::RenderResources;
use crate::renderer::resource::{ObjectConstants, UploadBuffer};
use crate::renderer::texture::Texture;

pub struct Material<B: GraphicsBackend> {
    constant_buffer: UploadBuffer<B, ObjectConstants>,
    texture: Option<Texture<B>>,
}

impl<B: GraphicsBackend> Material<B> {
    pub fn new(resources: &RenderResources<B>) -> GfxResult<Self> {
        let backend = resources.backend();
        let frame_count = resources.frame_count() as usize;
        let constant_buffer = UploadBuffer::new(backend, resources.device()?, frame_count, true)?;
        constant_buffer.set_name(backend, "MaterialUBuffer");
        for slot in 0..frame_count {
            constant_buffer.copy_data(backend, slot, &ObjectConstants::default())?;
        }

        Ok(Self { constant_buffer, texture: None })
    }

    /// 把世界矩阵写入 `frame_index` 对应的槽位（以转置形式存放）
    pub fn update_world_constant_buffer(&self, backend: &B, frame_index: u32, world: &Matrix4) -> GfxResult<()> {
        self.constant_buffer
            .copy_data(backend, frame_index as usize, &ObjectConstants::from_world(world))
    }

    /// `frame_index` 槽位在常量缓冲区中的字节偏移
    pub fn constant_buffer_offset(&self, frame_index: u32) -> u64 {
        self.constant_buffer.element_offset(frame_index as usize)
    }

    /// 替换纹理，旧纹理的 SRV 槽位随之归还
    pub fn set_texture(&mut self, texture: Texture<B>) {
        debug!(slot = texture.slot(), "Material texture set");
        self.texture = Some(texture);
    }

    pub fn texture(&self) -> Option<&Texture<B>> {
        self.texture.as_ref()
    }

    /// 绑定纹理的描述符表
    ///
    /// 没有纹理时什么也不录制并返回 `false`，由调用方绑定默认纹理。
    pub fn update_texture(&self, resources: &RenderResources<B>, root_index: u32) -> GfxResult<bool> {
        let Some(texture) = &self.texture else {
            return Ok(false);
        };
        resources.backend().set_root_descriptor_table(
            resources.command_list()?,
            root_index,
            resources.srv_heap()?,
            texture.slot(),
        );
        Ok(true)
    }

    pub fn constant_buffer(&self) -> &UploadBuffer<B, ObjectConstants> {
        &self.constant_buffer
    }
}
