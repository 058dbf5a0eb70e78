//! Flow control and application event loop.
//!
//! A "flow" is a self-contained animated scene: it reacts to window events,
//! updates its simulation every frame and on a fixed tick, and says what to
//! draw. [`run`] owns the window, the GPU [`Context`] and the winit loop and
//! drives every flow through its hooks.
//!
//! # Lifecycle
//!
//! 1. flow constructors run asynchronously once the GPU context exists
//! 2. `on_init` is called once with mutable access to the context
//! 3. per frame: window events, `on_tick` when due, camera update, `on_update`,
//!    then `on_render` and presentation
//! 4. `on_exit` is called once when the event loop shuts down

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    context::{Context, InitContext, render_size},
    data_structures::{model::DrawMesh, texture::Texture},
    render::{Instanced, Sprites},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Output of every lifecycle hook.
///
/// `Out::Configure` modifies the [`Context`] at runtime, for instance to change
/// the tick speed, the clear colour or the camera.
///
/// `Empty` is the default output used when nothing has to change.
pub enum Out {
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl Default for Out {
    fn default() -> Self {
        Self::Empty
    }
}

/// Trait for implementing an animated scene.
///
/// 1. `on_init()` is called once when the flow is created; configure the context here
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_tick()` is called every `tick_duration_millis`
/// 4. `on_update()` is called every frame
/// 5. `on_render()` is called each frame and specifies how to render `self`
/// 6. `on_exit()` is called once before the context is dropped
pub trait GraphicsFlow {
    fn on_init(&mut self, ctx: &mut Context) -> Out;

    /// Called every frame with the elapsed time `dt`.
    fn on_update(&mut self, ctx: &Context, dt: Duration) -> Out;

    /// Called every `tick_duration_millis` milliseconds (configurable via context).
    fn on_tick(&mut self, ctx: &Context) -> Out;

    fn on_window_events(&mut self, ctx: &Context, event: &WindowEvent) -> Out;

    /// Collect what to draw this frame. Sprites must already be in draw order.
    fn on_render(&self) -> crate::render::Render<'_>;

    /// Release GPU resources owned by the flow.
    fn on_exit(&mut self, ctx: &Context);
}

impl Debug for dyn GraphicsFlow + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// A flow factory: takes an [`InitContext`] and asynchronously builds the flow.
pub type FlowConstructor = Box<
    dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = anyhow::Result<Box<dyn GraphicsFlow>>>>>,
>;

/// Fixed-period timer driven by frame times.
///
/// Remainders carry over to the next period, so ticks keep their average rate
/// whatever the frame rate. After a stall at most one extra tick is owed.
#[derive(Debug, Default)]
pub struct TickTimer {
    elapsed: Duration,
}

impl TickTimer {
    /// Account for a frame of length `dt`; returns whether a tick is due.
    pub fn advance(&mut self, dt: Duration, interval: Duration) -> bool {
        self.elapsed += dt;
        if interval.is_zero() || self.elapsed < interval {
            return false;
        }
        self.elapsed = (self.elapsed - interval).min(interval);
        true
    }
}

/// GPU context plus surface status.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        Ok(Self {
            ctx,
            is_surface_configured: false,
        })
    }

    /// Reconfigure the surface for a window of `physical` pixels.
    fn resize(&mut self, physical: PhysicalSize<u32>) {
        if physical.width == 0 || physical.height == 0 {
            return;
        }
        let size = render_size(physical, self.ctx.window.scale_factor(), self.ctx.max_pixel_ratio);
        self.ctx.config.width = size.width;
        self.ctx.config.height = size.height;
        self.is_surface_configured = true;
        self.ctx.projection.resize(size.width, size.height);
        self.ctx.camera.controller.set_viewport_height(physical.height);
        self.ctx.surface.configure(&self.ctx.device, &self.ctx.config);
        self.ctx.depth_texture.destroy();
        self.ctx.depth_texture =
            Texture::create_depth_texture(&self.ctx.device, [size.width, size.height], "depth_texture");
        log::debug!("surface resized to {}x{}", size.width, size.height);
    }

    fn update_camera(&mut self) {
        let camera = &mut self.ctx.camera;
        camera.controller.update(&mut camera.camera);
        camera.uniform.update_view_proj(&camera.camera, &self.ctx.projection);
        self.ctx
            .queue
            .write_buffer(&camera.buffer, 0, bytemuck::cast_slice(&[camera.uniform]));
    }

    fn render(&mut self, graphics_flows: &[Box<dyn GraphicsFlow>]) -> Result<(), wgpu::SurfaceError> {
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            let mut basics: Vec<Instanced> = Vec::new();
            let mut trans: Vec<Sprites> = Vec::new();
            graphics_flows
                .iter()
                .for_each(|flow| flow.on_render().set_pipelines(&mut basics, &mut trans));

            render_pass.set_pipeline(&self.ctx.pipelines.basic);
            for instanced in basics {
                if instanced.amount == 0 {
                    continue;
                }
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_mesh_instanced(
                    instanced.mesh,
                    instanced.material,
                    0..instanced.amount,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }

            render_pass.set_pipeline(&self.ctx.pipelines.transparent);
            render_pass.set_vertex_buffer(0, self.ctx.quad.vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.ctx.quad.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.set_bind_group(0, &self.ctx.camera.bind_group, &[]);
            for sprites in trans {
                render_pass.set_vertex_buffer(1, sprites.instance.slice(..));
                render_pass.set_bind_group(1, sprites.tint, &[]);
                for (texture, instances) in sprites.runs {
                    render_pass.set_bind_group(2, texture, &[]);
                    render_pass.draw_indexed(0..self.ctx.quad.num_indices(), 0, instances);
                }
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    state: Option<AppState>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow>>,
    // We use Option to `take()` the constructors after use.
    constructors: Option<Vec<FlowConstructor>>,
    last_time: Instant,
    tick_timer: TickTimer,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>, constructors: Vec<FlowConstructor>) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
            tick_timer: TickTimer::default(),
        })
    }

    fn start(&mut self, mut app_state: AppState, flows: Vec<Box<dyn GraphicsFlow>>) {
        self.graphics_flows = flows;
        let size = app_state.ctx.window.inner_size();
        app_state.resize(size);
        self.graphics_flows.iter_mut().for_each(|flow| {
            let out = flow.on_init(&mut app_state.ctx);
            handle_flow_output(&mut app_state.ctx, out);
        });
        // on_init may have changed the pixel ratio cap
        app_state.resize(size);
        app_state.ctx.window.request_redraw();
        self.last_time = Instant::now();
        self.state = Some(app_state);
        log::info!("{} flow(s) running", self.graphics_flows.len());
    }
}

pub(crate) enum FlowEvent {
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    Initialized {
        state: AppState,
        flows: Vec<Box<dyn GraphicsFlow>>,
    },
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    Failed(String),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            // already initialised; mobile platforms resume more than once
            return;
        };
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("heart-fall");
        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;
            const CANVAS_ID: &str = "canvas";
            let window = web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document.get_element_by_id(CANVAS_ID).unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the main window: {e}");
                event_loop.exit();
                return;
            }
        };
        let init_future = async move {
            let app_state = AppState::new(window).await?;
            let flow_futures: Vec<_> = constructors
                .into_iter()
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows = futures::future::join_all(flow_futures)
                .await
                .into_iter()
                .collect::<anyhow::Result<Vec<_>>>()?;
            anyhow::Ok((app_state, flows))
        };
        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => self.start(app_state, flows),
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }
        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => FlowEvent::Failed(format!("{e:#}")),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop closed before initialization finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized { state, flows } => self.start(state, flows),
            FlowEvent::Failed(e) => {
                log::error!("App initialization failed: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        state.ctx.camera.controller.handle_window_events(&event);
        self.graphics_flows.iter_mut().for_each(|f| {
            let out = f.on_window_events(&state.ctx, &event);
            handle_flow_output(&mut state.ctx, out);
        });
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                let interval = Duration::from_millis(state.ctx.tick_duration_millis);
                if self.tick_timer.advance(dt, interval) {
                    self.graphics_flows.iter_mut().for_each(|f| {
                        let out = f.on_tick(&state.ctx);
                        handle_flow_output(&mut state.ctx, out);
                    });
                }

                state.update_camera();
                self.graphics_flows.iter_mut().for_each(|f| {
                    let out = f.on_update(&state.ctx, dt);
                    handle_flow_output(&mut state.ctx, out);
                });

                match state.render(&self.graphics_flows) {
                    Ok(()) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        log::warn!("surface lost, reconfiguring");
                        let size = state.ctx.window.inner_size();
                        state.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("out of GPU memory, exiting");
                        event_loop.exit();
                    }
                    Err(e) => log::warn!("skipping frame: {e}"),
                }
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            self.graphics_flows
                .iter_mut()
                .for_each(|flow| flow.on_exit(&state.ctx));
            state.ctx.depth_texture.destroy();
        }
        self.graphics_flows.clear();
        self.state = None;
        log::info!("torn down");
    }
}

fn handle_flow_output(ctx: &mut Context, out: Out) {
    match out {
        Out::Configure(f) => f(ctx),
        Out::Empty => (),
    }
}

pub fn run(constructors: Vec<FlowConstructor>) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }
    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, constructors)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}
