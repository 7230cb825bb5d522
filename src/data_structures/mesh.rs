//! Mesh geometry: CPU-side vertex/index data and the GPU buffers built from it.
//!
//! The corridor only ever needs two shapes, both generated procedurally at
//! start-up: a subdivided plane for the terrain tiles and a cone for the
//! obstacles. Texture coordinates follow the wgpu convention (v grows
//! downwards in the image).

use std::{f32::consts::TAU, ops::Range};

use wgpu::util::DeviceExt;

use crate::data_structures::material::Material;

/// Anything with a fixed vertex buffer layout.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for MeshVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Triangle-list geometry kept on the CPU so it can be shared by many entities.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /**
     * A `width` x `height` plane in the XY plane facing +Z, centred on the origin and
     * split into `width_segments` x `height_segments` quads.
     *
     * Rows run from the top edge (+y) to the bottom edge (-y) so the top row samples
     * the top of a texture.
     */
    pub fn plane(width: f32, height: f32, width_segments: u32, height_segments: u32) -> Self {
        let grid_x = width_segments.max(1);
        let grid_y = height_segments.max(1);
        let segment_width = width / grid_x as f32;
        let segment_height = height / grid_y as f32;

        let mut vertices = Vec::with_capacity(((grid_x + 1) * (grid_y + 1)) as usize);
        for iy in 0..=grid_y {
            let y = height * 0.5 - iy as f32 * segment_height;
            for ix in 0..=grid_x {
                let x = ix as f32 * segment_width - width * 0.5;
                vertices.push(MeshVertex {
                    position: [x, y, 0.0],
                    tex_coords: [ix as f32 / grid_x as f32, iy as f32 / grid_y as f32],
                    normal: [0.0, 0.0, 1.0],
                });
            }
        }

        let row = grid_x + 1;
        let mut indices = Vec::with_capacity((grid_x * grid_y * 6) as usize);
        for iy in 0..grid_y {
            for ix in 0..grid_x {
                let a = ix + row * iy;
                let b = ix + row * (iy + 1);
                let c = (ix + 1) + row * (iy + 1);
                let d = (ix + 1) + row * iy;
                indices.extend_from_slice(&[a, b, d, b, c, d]);
            }
        }

        Self {
            name: "plane".to_string(),
            vertices,
            indices,
        }
    }

    /// An upright cone with its apex at `+height / 2` and a closed base at `-height / 2`.
    pub fn cone(radius: f32, height: f32, radial_segments: u32) -> Self {
        let segments = radial_segments.max(3);
        let half = height * 0.5;
        let slope = radius / height;
        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        let side_normal = |theta: f32| {
            let n = cgmath::Vector3::new(theta.sin(), slope, theta.cos());
            let n = cgmath::InnerSpace::normalize(n);
            [n.x, n.y, n.z]
        };

        // Side: one apex per segment so every face gets its own averaged normal.
        for i in 0..segments {
            let u0 = i as f32 / segments as f32;
            let u1 = (i + 1) as f32 / segments as f32;
            let (t0, t1) = (u0 * TAU, u1 * TAU);
            let base = vertices.len() as u32;
            vertices.push(MeshVertex {
                position: [0.0, half, 0.0],
                tex_coords: [(u0 + u1) * 0.5, 0.0],
                normal: side_normal((t0 + t1) * 0.5),
            });
            vertices.push(MeshVertex {
                position: [radius * t0.sin(), -half, radius * t0.cos()],
                tex_coords: [u0, 1.0],
                normal: side_normal(t0),
            });
            vertices.push(MeshVertex {
                position: [radius * t1.sin(), -half, radius * t1.cos()],
                tex_coords: [u1, 1.0],
                normal: side_normal(t1),
            });
            indices.extend_from_slice(&[base, base + 1, base + 2]);
        }

        // Base cap, facing down.
        let centre = vertices.len() as u32;
        vertices.push(MeshVertex {
            position: [0.0, -half, 0.0],
            tex_coords: [0.5, 0.5],
            normal: [0.0, -1.0, 0.0],
        });
        for i in 0..=segments {
            let theta = i as f32 / segments as f32 * TAU;
            vertices.push(MeshVertex {
                position: [radius * theta.sin(), -half, radius * theta.cos()],
                tex_coords: [0.5 + 0.5 * theta.sin(), 0.5 + 0.5 * theta.cos()],
                normal: [0.0, -1.0, 0.0],
            });
        }
        for i in 0..segments {
            let current = centre + 1 + i;
            indices.extend_from_slice(&[centre, current + 1, current]);
        }

        Self {
            name: "cone".to_string(),
            vertices,
            indices,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// GPU buffers for one [`Geometry`].
#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_elements: u32,
}

impl Mesh {
    pub fn from_geometry(device: &wgpu::Device, geometry: &Geometry) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", geometry.name)),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", geometry.name)),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: geometry.name.clone(),
            vertex_buffer,
            index_buffer,
            num_elements: geometry.indices.len() as u32,
        }
    }
}

pub trait DrawMesh {
    /// Expects the instance buffer in vertex slot 1 and camera/light bind groups in
    /// groups 1 and 2.
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, material: &Material, instances: Range<u32>);
}

impl DrawMesh for wgpu::RenderPass<'_> {
    fn draw_mesh_instanced(&mut self, mesh: &Mesh, material: &Material, instances: Range<u32>) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, instances);
    }
}
