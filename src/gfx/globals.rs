//! Per-frame uniforms shared by every draw: camera and a single
//! directional light.

use wgpu::util::DeviceExt;

use crate::gfx::camera::camera_utils::CameraUniform;

/// Mirrors `Globals` in [`SCENE_SHADER`](crate::gfx::shader::SCENE_SHADER).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniform {
    view_proj: [[f32; 4]; 4],
    view_position: [f32; 4],
    // xyz direction the light travels, w ambient strength
    light_direction: [f32; 4],
    // rgb colour, a intensity
    light_color: [f32; 4],
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LightConfig {
    pub direction: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    pub ambient: f32,
}

impl Default for LightConfig {
    fn default() -> Self {
        // Warm key light from above and in front of the tree.
        Self {
            direction: [-0.3, -1.0, -0.5],
            color: [1.0, 0.95, 0.85],
            intensity: 1.2,
            ambient: 0.3,
        }
    }
}

impl GlobalUniform {
    pub fn new(camera: &CameraUniform, light: &LightConfig) -> Self {
        let [dx, dy, dz] = light.direction;
        let [r, g, b] = light.color;
        Self {
            view_proj: camera.view_proj,
            view_position: camera.view_position,
            light_direction: [dx, dy, dz, light.ambient],
            light_color: [r, g, b, light.intensity],
        }
    }
}

/// The uniform buffer and the group-0 bind group that exposes it.
pub struct GlobalBindings {
    pub layout: wgpu::BindGroupLayout,
    pub bind_group: wgpu::BindGroup,
    buffer: wgpu::Buffer,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let initial = GlobalUniform::new(&CameraUniform::default(), &LightConfig::default());
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Global Uniform Buffer"),
            contents: bytemuck::bytes_of(&initial),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        Self {
            layout,
            bind_group,
            buffer,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, camera: &CameraUniform, light: &LightConfig) {
        let content = GlobalUniform::new(camera, light);
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(&content));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_is_16_byte_aligned() {
        assert_eq!(std::mem::size_of::<GlobalUniform>() % 16, 0);
    }

    #[test]
    fn test_light_packs_ambient_and_intensity() {
        let light = LightConfig {
            direction: [0.0, -1.0, 0.0],
            color: [1.0, 0.5, 0.25],
            intensity: 2.0,
            ambient: 0.4,
        };
        let uniform = GlobalUniform::new(&CameraUniform::default(), &light);
        assert_eq!(uniform.light_direction, [0.0, -1.0, 0.0, 0.4]);
        assert_eq!(uniform.light_color, [1.0, 0.5, 0.25, 2.0]);
    }
}
