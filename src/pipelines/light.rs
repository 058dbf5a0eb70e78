use wgpu::util::DeviceExt;

use crate::config::{Config, Rgb};

/// Scene lighting: one white ambient term and one directional light.
#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    // Uniforms require 16 byte (4 float) alignment, hence the vec4 fields
    ambient: [f32; 4],
    position: [f32; 4],
    color: [f32; 4],
}

impl LightUniform {
    pub fn new(ambient: Rgb, ambient_intensity: f32, position: [f32; 3], color: Rgb, intensity: f32) -> Self {
        let [ar, ag, ab] = ambient.to_linear();
        let [r, g, b] = color.to_linear();
        let [x, y, z] = position;
        Self {
            ambient: [ar * ambient_intensity, ag * ambient_intensity, ab * ambient_intensity, 1.0],
            position: [x, y, z, 1.0],
            color: [r * intensity, g * intensity, b * intensity, 1.0],
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Rgb::WHITE,
            config.ambient_light_intensity,
            config.directional_light_position,
            Rgb::WHITE,
            config.directional_light_intensity,
        )
    }

    pub fn position(&self) -> [f32; 3] {
        [self.position[0], self.position[1], self.position[2]]
    }
}

impl Default for LightUniform {
    fn default() -> Self {
        Self::from_config(&Config::base())
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: light_buffer.as_entire_binding(),
        }],
        label: Some("light_bind_group"),
    })
}

impl LightResources {
    pub fn new(uniform: LightUniform, device: &wgpu::Device, layout: &wgpu::BindGroupLayout) -> Self {
        let buffer = mk_buffer(device, uniform);
        let bind_group = mk_bind_group(device, layout, &buffer);
        Self {
            uniform,
            buffer,
            bind_group,
        }
    }

    pub fn write(&mut self, queue: &wgpu::Queue, uniform: LightUniform) {
        self.uniform = uniform;
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intensities_scale_white() {
        let light = LightUniform::from_config(&Config::base());
        assert_eq!(light.ambient, [0.3, 0.3, 0.3, 1.0]);
        assert_eq!(light.color, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(light.position(), [0.0, 10.0, 10.0]);
    }

    #[test]
    fn uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<LightUniform>() % 16, 0);
    }
}
