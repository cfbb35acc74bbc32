//! 纹理
//!
//! 一张 RGBA8 二维纹理加上它在着色器可见 SRV 堆中的槽位。
//! 纹理析构时把槽位归还给 [`RenderResources`] 的分配器。

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use tracing::{debug, info};

use crate::core::error::{Result, TextureError};
use crate::gfx::backend::GraphicsBackend;
use crate::renderer::descriptor::DescriptorSlotAllocator;
use crate::renderer::render_resources::RenderResources;

pub struct Texture<B: GraphicsBackend> {
    resource: B::Resource,
    slot: u32,
    width: u32,
    height: u32,
    slots: Rc<RefCell<DescriptorSlotAllocator>>,
}

impl<B: GraphicsBackend> Texture<B> {
    /// 从图片文件加载（任何 `image` 支持的格式），解码为 RGBA8
    pub fn from_file(resources: &RenderResources<B>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(TextureError::FileNotFound(path.to_path_buf()).into());
        }

        let image = image::open(path).map_err(TextureError::from)?.to_rgba8();
        let (width, height) = image.dimensions();
        info!(path = %path.display(), width, height, "Texture decoded");

        Self::from_rgba8(resources, width, height, image.as_raw())
    }

    /// 从紧密排列的 RGBA8 像素创建
    pub fn from_rgba8(resources: &RenderResources<B>, width: u32, height: u32, pixels: &[u8]) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(TextureError::InvalidData(format!("empty texture {}x{}", width, height)).into());
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(TextureError::InvalidData(format!(
                "expected {} bytes for {}x{} RGBA8, got {}",
                expected,
                width,
                height,
                pixels.len()
            ))
            .into());
        }

        let backend = resources.backend();
        let device = resources.device()?;
        let resource = backend.create_texture(device, width, height, pixels)?;
        backend.set_debug_name(&resource, "Texture");

        let slots = Rc::clone(resources.srv_slots());
        let slot = slots.borrow_mut().allocate()?;
        backend.create_shader_resource_view(device, &resource, resources.srv_heap()?, slot);
        debug!(slot, width, height, "Texture bound to SRV slot");

        Ok(Self { resource, slot, width, height, slots })
    }

    /// 1×1 白色纹理，没有纹理的材质用它采样
    pub fn white(resources: &RenderResources<B>) -> Result<Self> {
        Self::from_rgba8(resources, 1, 1, &[0xFF; 4])
    }

    /// 在 SRV 堆中的槽位
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resource(&self) -> &B::Resource {
        &self.resource
    }
}

impl<B: GraphicsBackend> Drop for Texture<B> {
    fn drop(&mut self) {
        self.slots.borrow_mut().free(self.slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GraphicsConfig;
    use crate::core::error::GraphicEngineError;
    use crate::gfx::headless::{ApiEvent, HeadlessBackend, ObjectKind};
    use crate::gfx::headless_window_handle;
    use crate::renderer::descriptor::DescriptorType;
    use crate::renderer::render_resources::tests::test_settings;

    fn resources(backend: &HeadlessBackend) -> RenderResources<HeadlessBackend> {
        RenderResources::new(backend.clone(), headless_window_handle(), 64, 64, &test_settings()).unwrap()
    }

    #[test]
    fn test_slots_are_allocated_and_returned() {
        let backend = HeadlessBackend::new();
        let resources = resources(&backend);

        let white = Texture::white(&resources).unwrap();
        let second = Texture::from_rgba8(&resources, 2, 1, &[0; 8]).unwrap();
        assert_eq!(white.slot(), 0);
        assert_eq!(second.slot(), 1);
        assert!(backend.events().contains(&ApiEvent::ViewCreated {
            heap: DescriptorType::ShaderResourceView,
            index: 1
        }));

        drop(second);
        assert_eq!(resources.srv_slots().borrow().allocated_count(), 1);
        let third = Texture::white(&resources).unwrap();
        assert_eq!(third.slot(), 1);
    }

    #[test]
    fn test_rejects_mismatched_pixels() {
        let backend = HeadlessBackend::new();
        let resources = resources(&backend);

        let err = Texture::from_rgba8(&resources, 2, 2, &[0; 4]).err().unwrap();
        assert!(matches!(err, GraphicEngineError::Texture(TextureError::InvalidData(_))));
        assert!(!backend.events().contains(&ApiEvent::Created(ObjectKind::Texture)));
    }

    #[test]
    fn test_missing_file() {
        let backend = HeadlessBackend::new();
        let resources = resources(&backend);

        let path = std::env::temp_dir().join("graphic_engine_missing_texture.png");
        let err = Texture::from_file(&resources, &path).err().unwrap();
        assert!(matches!(err, GraphicEngineError::Texture(TextureError::FileNotFound(_))));
    }

    #[test]
    fn test_from_file_decodes_rgba() {
        let backend = HeadlessBackend::new();
        let resources = resources(&backend);

        let path = std::env::temp_dir().join(format!("graphic_engine_texture_{}.png", std::process::id()));
        image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255])).save(&path).unwrap();

        let texture = Texture::from_file(&resources, &path).unwrap();
        assert_eq!((texture.width(), texture.height()), (4, 2));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_slots_exhausted() {
        let backend = HeadlessBackend::new();
        let settings = GraphicsConfig { max_textures: 2, ..test_settings() };
        let resources =
            RenderResources::new(backend.clone(), headless_window_handle(), 64, 64, &settings).unwrap();

        let _a = Texture::white(&resources).unwrap();
        let _b = Texture::white(&resources).unwrap();
        let err = Texture::white(&resources).err().unwrap();
        assert!(matches!(err, GraphicEngineError::Texture(TextureError::SlotsExhausted(2))));
        // 分配失败的纹理资源随即释放
        assert_eq!(
            backend.events().iter().filter(|e| **e == ApiEvent::Released(ObjectKind::Texture)).count(),
            1
        );
    }
}
