//! GraphicEngine 演示程序
//!
//! 打开一个窗口，绘制一个旋转的彩色立方体和一个带纹理的正方形。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件
//! cargo run
//!
//! # 不访问 GPU，只驱动帧循环
//! cargo run -- --headless
//! ```
//!
//! # 命令行参数
//!
//! - `--dx12` / `--headless`: 选择图形后端
//! - `--width <value>` / `--height <value>`: 设置窗口尺寸
//! - `--no-vsync`: 关闭垂直同步

use std::rc::Rc;

use anyhow::{Context, Result};
use raw_window_handle::RawWindowHandle;
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use graphic_engine::component::Lens;
use graphic_engine::core::{log, BackendKind, Config};
use graphic_engine::engine::{GraphicEngine, MeshRenderer, RenderSystem};
use graphic_engine::geometry::PrimitiveGeometryType;
use graphic_engine::gfx::headless::GpuTimeline;
use graphic_engine::gfx::{headless_window_handle, GraphicsBackend, HeadlessBackend};
use graphic_engine::math::{matrix, Color, Matrix4, Vector3};

const DEMO_TEXTURE: &str = "res/textures/checker.png";

/// 演示场景
///
/// 字段按析构顺序排列：渲染器持有的网格与材质先于引擎释放。
struct Demo<B: GraphicsBackend> {
    system: RenderSystem<B>,
    cube: Rc<MeshRenderer<B>>,
    angle: f32,
    engine: GraphicEngine<B>,
}

impl<B: GraphicsBackend> Demo<B> {
    fn new(mut engine: GraphicEngine<B>, width: u32, height: u32) -> graphic_engine::core::Result<Self> {
        let cube_geometry = engine.create_primitive_geometry(PrimitiveGeometryType::Cube, Color::rgb(0.9, 0.4, 0.2));
        let cube = Rc::new(MeshRenderer::new(
            Rc::new(engine.create_mesh(&cube_geometry)?),
            Rc::new(engine.create_material()?),
            matrix::translation(-1.2, 0.0, 0.0),
        ));

        let square_geometry = engine.create_primitive_geometry(PrimitiveGeometryType::Square, Color::WHITE);
        let mut square_material = engine.create_material()?;
        match engine.create_texture(DEMO_TEXTURE) {
            Ok(texture) => square_material.set_texture(texture),
            Err(e) => warn!("Drawing the square without a texture: {}", e),
        }
        let square = Rc::new(MeshRenderer::new(
            Rc::new(engine.create_mesh(&square_geometry)?),
            Rc::new(square_material),
            matrix::translation(1.2, 0.0, 0.0),
        ));

        engine.update_camera_at(
            Vector3::new(0.0, 1.5, -5.0),
            Vector3::zeros(),
            Vector3::y(),
            Lens {
                view_width: width as f32,
                view_height: height as f32,
                fov_y: std::f32::consts::FRAC_PI_4,
                near: 0.1,
                far: 100.0,
            },
        )?;

        let mut system = RenderSystem::new();
        system.register(0, Rc::clone(&cube))?;
        system.register(1, square)?;

        Ok(Self { system, cube, angle: 0.0, engine })
    }

    fn frame(&mut self) -> graphic_engine::core::Result<()> {
        self.angle = (self.angle + 0.01) % std::f32::consts::TAU;
        let world: Matrix4 = matrix::translation(-1.2, 0.0, 0.0) * matrix::rotation_y(self.angle);
        self.cube.set_world(world);

        self.system.rendering(&mut self.engine)?;
        Ok(())
    }
}

fn run<B: GraphicsBackend>(
    event_loop: EventLoop<()>,
    window: Window,
    backend: B,
    handle: RawWindowHandle,
    config: &Config,
) -> Result<()> {
    info!(backend = backend.name(), "Initializing graphic engine");
    let engine = GraphicEngine::new(backend, handle, config).context("Failed to initialize the graphic engine")?;
    let mut demo = Some(
        Demo::new(engine, config.window.width, config.window.height).context("Failed to build the demo scene")?,
    );

    info!("Entering main loop...");
    event_loop.set_control_flow(ControlFlow::Poll);
    event_loop.run(move |event, elwt| match event {
        // 窗口关闭事件：先销毁渲染器，再退出事件循环
        Event::WindowEvent { event: WindowEvent::CloseRequested, .. } => {
            info!("Close requested, shutting down...");
            demo.take();
            elwt.exit();
        }
        Event::WindowEvent { event: WindowEvent::Resized(size), .. } => {
            debug!(width = size.width, height = size.height, "Window resized");
            let result = demo.as_mut().map(|demo| demo.engine.resize(size.width, size.height));
            if let Some(Err(e)) = result {
                error!("Resize failed: {}", e);
                demo.take();
                elwt.exit();
            }
        }
        Event::WindowEvent { event: WindowEvent::RedrawRequested, .. } => {
            if let Some(Err(e)) = demo.as_mut().map(Demo::frame) {
                error!("Draw failed: {}", e);
                demo.take();
                elwt.exit();
            }
        }
        Event::AboutToWait => window.request_redraw(),
        _ => (),
    })?;

    Ok(())
}

fn main() -> Result<()> {
    // 配置在日志之前加载
    let mut config = Config::from_file_or_default("config.toml");
    config.apply_args(std::env::args());
    config.validate().context("Invalid configuration")?;

    let log_file = config.logging.file_output.then_some(config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file);
    info!(version = env!("CARGO_PKG_VERSION"), "GraphicEngine starting...");
    info!(
        backend = config.graphics.backend.name(),
        width = config.window.width,
        height = config.window.height,
        vsync = config.graphics.vsync,
        "Graphics configuration"
    );

    let event_loop = EventLoop::new().context("Failed to create the event loop")?;
    let window = WindowBuilder::new()
        .with_title(config.window.title.as_str())
        .with_inner_size(PhysicalSize::new(config.window.width, config.window.height))
        .with_resizable(config.window.resizable)
        .build(&event_loop)
        .context("Failed to create the window")?;

    match config.graphics.backend {
        #[cfg(target_os = "windows")]
        BackendKind::Dx12 => {
            use raw_window_handle::HasWindowHandle;

            let handle = window.window_handle().context("Window has no native handle")?.as_raw();
            run(event_loop, window, graphic_engine::gfx::Dx12Backend::new(), handle, &config)
        }
        #[cfg(not(target_os = "windows"))]
        BackendKind::Dx12 => anyhow::bail!("DirectX 12 backend is only available on Windows"),
        BackendKind::Headless => {
            let backend = HeadlessBackend::with_timeline(GpuTimeline::Immediate);
            run(event_loop, window, backend, headless_window_handle(), &config)
        }
    }
}
