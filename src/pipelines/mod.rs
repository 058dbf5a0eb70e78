//! Render pipelines and the bind group layouts they share.
//!
//! - `basic`: the opaque lit pipeline for hearts and the pipeline builder
//! - `light`: ambient and directional light uniforms
//! - `transparent`: alpha-blended billboards for text sprites

pub mod basic;
pub mod light;
pub mod transparent;

/// Bind group layouts, created once per device.
#[derive(Debug, Clone)]
pub struct Layouts {
    pub camera: wgpu::BindGroupLayout,
    pub light: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub tint: wgpu::BindGroupLayout,
    pub sprite_texture: wgpu::BindGroupLayout,
}

impl Layouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let vertex_fragment = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        Self {
            camera: basic::mk_uniform_layout(device, vertex_fragment, "camera_bind_group_layout"),
            light: basic::mk_uniform_layout(device, vertex_fragment, "light_bind_group_layout"),
            material: basic::mk_uniform_layout(
                device,
                wgpu::ShaderStages::FRAGMENT,
                "material_bind_group_layout",
            ),
            tint: basic::mk_uniform_layout(device, wgpu::ShaderStages::FRAGMENT, "tint_bind_group_layout"),
            sprite_texture: transparent::mk_texture_bind_group_layout(device),
        }
    }
}

#[derive(Debug)]
pub struct Pipelines {
    pub basic: wgpu::RenderPipeline,
    pub transparent: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration, layouts: &Layouts) -> Self {
        Self {
            basic: basic::mk_basic_pipeline(
                device,
                config,
                &layouts.camera,
                &layouts.light,
                &layouts.material,
            ),
            transparent: transparent::mk_transparent_pipeline(
                device,
                config,
                &layouts.camera,
                &layouts.tint,
                &layouts.sprite_texture,
            ),
        }
    }
}
