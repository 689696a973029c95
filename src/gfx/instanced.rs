//! Instanced batches: one mesh per [`Shape`] or one quad per image, and one
//! instance per pose.

use cgmath::Matrix4;
use wgpu::util::DeviceExt;
use wgpu::{Buffer, Device, Queue, RenderPass};

use crate::blend::Pose;
use crate::gfx::geometry::{
    generate_cone, generate_cube, generate_cuboid, generate_icosahedron, generate_sphere,
    generate_star, GeometryData,
};
use crate::gfx::texture::ImageTexture;
use crate::scene::Shape;

/// Per-instance transform and colour.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    pub transform: [[f32; 4]; 4],
    pub color: [f32; 4],
}

impl InstanceData {
    pub fn from_pose(pose: &Pose, color: [f32; 4]) -> Self {
        Self::from_transform(pose.to_matrix(), color)
    }

    pub fn from_transform(transform: Matrix4<f32>, color: [f32; 4]) -> Self {
        Self {
            transform: transform.into(),
            color,
        }
    }

    /// Instance layout, placed after position(0) and normal(1).
    pub fn vertex_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        const VEC4: wgpu::BufferAddress = std::mem::size_of::<[f32; 4]>() as wgpu::BufferAddress;
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // Transform columns
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: VEC4,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: VEC4 * 2,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: VEC4 * 3,
                    shader_location: 5,
                    format: wgpu::VertexFormat::Float32x4,
                },
                wgpu::VertexAttribute {
                    offset: VEC4 * 4,
                    shader_location: 6,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Procedural geometry each shape is drawn with.
pub fn shape_geometry(shape: Shape) -> GeometryData {
    match shape {
        Shape::Sphere => generate_sphere(16, 16),
        Shape::Cube => generate_cube(),
        Shape::Star => generate_star(0.2),
        Shape::Rod => generate_cuboid(0.1, 1.0, 0.1),
        Shape::Crystal | Shape::Particle => generate_icosahedron(),
        Shape::Cone => generate_cone(0.5, 1.2, 16),
    }
}

pub struct ShapeMesh {
    pub vertex_buffer: Buffer,
    pub index_buffer: Buffer,
    pub index_count: u32,
}

impl ShapeMesh {
    pub fn new(device: &Device, geometry: &GeometryData, label: &str) -> Self {
        let vertices = geometry.to_vertices();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Vertex Buffer")),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} Index Buffer")),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
        }
    }
}

/// Growable GPU copy of one frame's instances.
pub struct InstanceBuffer {
    label: String,
    pending: Vec<InstanceData>,
    buffer: Buffer,
    capacity: usize,
    count: u32,
}

impl InstanceBuffer {
    const INITIAL_CAPACITY: usize = 64;

    pub fn new(device: &Device, label: &str) -> Self {
        let capacity = Self::INITIAL_CAPACITY;
        Self {
            label: label.to_owned(),
            pending: Vec::with_capacity(capacity),
            buffer: Self::create_buffer(device, label, capacity),
            capacity,
            count: 0,
        }
    }

    fn create_buffer(device: &Device, label: &str, capacity: usize) -> Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} Instance Buffer")),
            size: (capacity * std::mem::size_of::<InstanceData>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn push(&mut self, instance: InstanceData) {
        self.pending.push(instance);
    }

    /// Uploads the pending instances, growing the buffer when needed.
    pub fn upload(&mut self, device: &Device, queue: &Queue) {
        if self.pending.len() > self.capacity {
            self.capacity = self.pending.len().next_power_of_two();
            self.buffer = Self::create_buffer(device, &self.label, self.capacity);
            log::debug!("Grew {} instance buffer to {}", self.label, self.capacity);
        }

        self.count = self.pending.len() as u32;
        if self.count > 0 {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&self.pending));
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Binds the instances at slot 1 and draws `mesh` once per instance.
    pub fn draw<'a>(&'a self, render_pass: &mut RenderPass<'a>, mesh: &'a ShapeMesh) {
        if self.count == 0 {
            return;
        }

        render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        render_pass.set_vertex_buffer(1, self.buffer.slice(..));
        render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        render_pass.draw_indexed(0..mesh.index_count, 0, 0..self.count);
    }
}

/// All instances of one shape, drawn in a single call.
pub struct InstanceBatch {
    mesh: ShapeMesh,
    instances: InstanceBuffer,
}

impl InstanceBatch {
    pub fn new(device: &Device, shape: Shape) -> Self {
        let label = format!("{shape:?}");
        Self {
            mesh: ShapeMesh::new(device, &shape_geometry(shape), &label),
            instances: InstanceBuffer::new(device, &label),
        }
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn push(&mut self, instance: InstanceData) {
        self.instances.push(instance);
    }

    pub fn update_instances(&mut self, device: &Device, queue: &Queue) {
        self.instances.upload(device, queue);
    }

    pub fn render<'a>(&'a self, render_pass: &mut RenderPass<'a>) {
        self.instances.draw(render_pass, &self.mesh);
    }
}

/// Every quad showing one image. The quad mesh is shared and passed in.
pub struct TexturedBatch {
    texture: ImageTexture,
    instances: InstanceBuffer,
}

impl TexturedBatch {
    pub fn new(device: &Device, texture: ImageTexture, label: &str) -> Self {
        Self {
            texture,
            instances: InstanceBuffer::new(device, label),
        }
    }

    /// Swaps the image while keeping the instances.
    pub fn set_texture(&mut self, texture: ImageTexture) {
        self.texture = texture;
    }

    pub fn clear(&mut self) {
        self.instances.clear();
    }

    pub fn push(&mut self, instance: InstanceData) {
        self.instances.push(instance);
    }

    pub fn update_instances(&mut self, device: &Device, queue: &Queue) {
        self.instances.upload(device, queue);
    }

    pub fn is_empty(&self) -> bool {
        self.instances.count() == 0
    }

    pub fn render<'a>(&'a self, render_pass: &mut RenderPass<'a>, quad: &'a ShapeMesh) {
        if self.is_empty() {
            return;
        }
        render_pass.set_bind_group(1, &self.texture.bind_group, &[]);
        self.instances.draw(render_pass, quad);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Quaternion, Vector3};

    #[test]
    fn test_every_shape_has_geometry() {
        for shape in Shape::ALL {
            let geometry = shape_geometry(shape);
            assert!(geometry.triangle_count() > 0, "{shape:?} is empty");
            assert_eq!(geometry.vertices.len(), geometry.normals.len());
        }
    }

    #[test]
    fn test_shape_discriminants_follow_all() {
        for (index, shape) in Shape::ALL.iter().enumerate() {
            assert_eq!(*shape as usize, index);
        }
    }

    #[test]
    fn test_instance_from_pose_carries_translation() {
        let pose = Pose::new(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(2.0, 2.0, 2.0),
            Quaternion::new(1.0, 0.0, 0.0, 0.0),
        );
        let instance = InstanceData::from_pose(&pose, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(instance.transform[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(instance.transform[0][0], 2.0);
        assert_eq!(instance.color, [0.5, 0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_instance_layout_stride() {
        let layout = InstanceData::vertex_buffer_layout();
        assert_eq!(layout.array_stride, 80);
        assert_eq!(layout.attributes.last().map(|a| a.shader_location), Some(6));
    }
}
