use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::{CameraResources, CameraUniform, OrbitCamera, OrbitController, Projection},
    config::Config,
    data_structures::texture::{self, create_default_sampler},
    pipelines::{
        Layouts, Pipelines,
        light::{LightResources, LightUniform},
        transparent::Quad,
    },
};

/// Surface size after capping the device pixel ratio at `max_ratio`.
pub fn render_size(physical: PhysicalSize<u32>, scale_factor: f64, max_ratio: f64) -> PhysicalSize<u32> {
    let scale_factor = if scale_factor > 0.0 { scale_factor } else { 1.0 };
    let ratio = scale_factor.min(max_ratio) / scale_factor;
    PhysicalSize::new(
        ((physical.width as f64 * ratio).round() as u32).max(1),
        ((physical.height as f64 * ratio).round() as u32).max(1),
    )
}

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub layouts: Layouts,
    pub pipelines: Pipelines,
    pub quad: Quad,
    pub sampler: wgpu::Sampler,
    pub clear_colour: wgpu::Color,
    pub tick_duration_millis: u64,
    pub max_pixel_ratio: f64,
}

impl Context {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let defaults = Config::default();
        let size = render_size(window.inner_size(), window.scale_factor(), defaults.max_pixel_ratio);

        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;
        log::debug!("adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Colours are computed in linear space and rely on an sRGB surface.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let layouts = Layouts::new(&device);

        let camera = OrbitCamera::new(defaults.camera_z_position);
        let projection = Projection::new(
            config.width,
            config.height,
            cgmath::Deg(defaults.camera_fov),
            defaults.camera_near,
            defaults.camera_far,
        );
        let mut controller = OrbitController::new(
            defaults.controls_damping_factor,
            defaults.controls_min_distance,
            defaults.controls_max_distance,
        );
        controller.set_viewport_height(window.inner_size().height);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.camera,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let camera = CameraResources {
            camera,
            controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
        };

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let light = LightResources::new(LightUniform::from_config(&defaults), &device, &layouts.light);
        let pipelines = Pipelines::new(&device, &config, &layouts);
        let quad = Quad::new(&device);
        let sampler = create_default_sampler(&device);

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            layouts,
            pipelines,
            quad,
            sampler,
            clear_colour: defaults.background_color.to_wgpu(),
            tick_duration_millis: defaults.spawn_interval_millis,
            max_pixel_ratio: defaults.max_pixel_ratio,
        })
    }

    /// Width of the window in logical (CSS) pixels.
    pub fn logical_width(&self) -> f32 {
        let size = self.window.inner_size();
        (size.width as f64 / self.window.scale_factor()) as f32
    }

    /// Push renderer, camera and control settings from `config` into the context.
    pub fn apply_config(&mut self, config: &Config) {
        self.clear_colour = config.background_color.to_wgpu();
        self.tick_duration_millis = config.spawn_interval_millis;
        self.max_pixel_ratio = config.max_pixel_ratio;

        self.projection.set_clip(config.camera_near, config.camera_far);

        let controller = &mut self.camera.controller;
        controller.damping_factor = config.controls_damping_factor;
        controller.rotate_speed = config.controls_rotate_speed;
        controller.zoom_speed = config.controls_zoom_speed;
        controller.min_distance = config.controls_min_distance;
        controller.max_distance = config.controls_max_distance;

        self.apply_camera(config);
        self.light.write(&self.queue, LightUniform::from_config(config));
    }

    /// Reset the field of view and the orbit distance.
    pub fn apply_camera(&mut self, config: &Config) {
        self.projection.set_fovy(cgmath::Deg(config.camera_fov));
        self.camera.camera.radius = config
            .camera_z_position
            .clamp(config.controls_min_distance, config.controls_max_distance);
    }
}

/// What a flow constructor may use before the first frame.
#[derive(Debug, Clone)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub layouts: Layouts,
    pub logical_width: f32,
}

impl From<&Context> for InitContext {
    fn from(ctx: &Context) -> Self {
        Self {
            // wgpu handles are reference counted, cloning only clones the ref
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            layouts: ctx.layouts.clone(),
            logical_width: ctx.logical_width(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped() {
        // a 2x display rendering a 400x300 logical window
        let size = render_size(PhysicalSize::new(800, 600), 2.0, 1.0);
        assert_eq!(size, PhysicalSize::new(400, 300));
    }

    #[test]
    fn low_density_displays_are_untouched() {
        let size = render_size(PhysicalSize::new(1280, 720), 1.0, 1.0);
        assert_eq!(size, PhysicalSize::new(1280, 720));
        let size = render_size(PhysicalSize::new(1280, 720), 0.75, 1.0);
        assert_eq!(size, PhysicalSize::new(1280, 720));
    }

    #[test]
    fn zero_sizes_are_clamped() {
        assert_eq!(render_size(PhysicalSize::new(0, 0), 1.0, 1.0), PhysicalSize::new(1, 1));
    }
}
