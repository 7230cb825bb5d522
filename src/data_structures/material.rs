//! Materials: the CPU description kept in the scene graph and the GPU bind
//! group built from it.
//!
//! A material has two texture slots. Each slot starts with a solid fallback
//! texture and is swapped for the decoded image once its asset resolves, so a
//! missing or broken file only ever costs visual fidelity.

use crate::{
    config::Rgb,
    data_structures::texture::{Texture, create_default_sampler},
};

/// Which texture slot of a material an asset belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKind {
    Color,
    Displacement,
}

impl MapKind {
    /// Colour maps are sampled as sRGB, displacement maps as raw data.
    pub fn is_srgb(self) -> bool {
        matches!(self, MapKind::Color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapState {
    /// No texture configured for this slot.
    Absent,
    Pending,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSlot {
    pub path: Option<String>,
    pub state: MapState,
}

impl MapSlot {
    pub fn new(path: Option<String>) -> Self {
        let state = if path.is_some() {
            MapState::Pending
        } else {
            MapState::Absent
        };
        Self { path, state }
    }
}

/// Appearance shared by every entity referencing the same material id.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDescriptor {
    pub name: String,
    pub base_color: Rgb,
    pub displacement_scale: f32,
    pub color_map: MapSlot,
    pub displacement_map: MapSlot,
}

impl MaterialDescriptor {
    /// An untextured material.
    pub fn flat(name: impl Into<String>, base_color: Rgb) -> Self {
        Self {
            name: name.into(),
            base_color,
            displacement_scale: 0.0,
            color_map: MapSlot::new(None),
            displacement_map: MapSlot::new(None),
        }
    }

    pub fn with_color_map(mut self, path: Option<String>) -> Self {
        self.color_map = MapSlot::new(path);
        self
    }

    pub fn with_displacement_map(mut self, path: Option<String>, scale: f32) -> Self {
        self.displacement_map = MapSlot::new(path);
        self.displacement_scale = scale;
        self
    }

    pub fn slot(&self, kind: MapKind) -> &MapSlot {
        match kind {
            MapKind::Color => &self.color_map,
            MapKind::Displacement => &self.displacement_map,
        }
    }

    pub fn slot_mut(&mut self, kind: MapKind) -> &mut MapSlot {
        match kind {
            MapKind::Color => &mut self.color_map,
            MapKind::Displacement => &mut self.displacement_map,
        }
    }

    /// The scale the shader should apply. Zero until the displacement map has
    /// actually arrived so a missing map renders flat.
    pub fn effective_displacement_scale(&self) -> f32 {
        match self.displacement_map.state {
            MapState::Loaded => self.displacement_scale,
            _ => 0.0,
        }
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        let [r, g, b] = self.base_color.to_linear();
        MaterialUniform {
            base_color: [r, g, b, 1.0],
            params: [self.effective_displacement_scale(), 0.0, 0.0, 0.0],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// x: displacement scale, yzw: padding.
    pub params: [f32; 4],
}

pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture = |binding, visibility| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    let sampler = |binding, visibility| wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            texture(1, wgpu::ShaderStages::FRAGMENT),
            sampler(2, wgpu::ShaderStages::FRAGMENT),
            texture(3, wgpu::ShaderStages::VERTEX),
            sampler(4, wgpu::ShaderStages::VERTEX),
        ],
        label: Some("material_bind_group_layout"),
    })
}

/// GPU side of a [`MaterialDescriptor`].
#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub color_map: Texture,
    pub displacement_map: Texture,
    uniform: MaterialUniform,
    buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    /// Creates the material with fallback textures in both slots.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        descriptor: &MaterialDescriptor,
    ) -> Self {
        use wgpu::util::DeviceExt;

        let color_map = Texture::create_solid(
            device,
            queue,
            [255, 255, 255, 255],
            &format!("{} fallback colour map", descriptor.name),
            true,
        );
        let displacement_map = Texture::create_solid(
            device,
            queue,
            [0, 0, 0, 255],
            &format!("{} fallback displacement map", descriptor.name),
            false,
        );
        let uniform = descriptor.to_uniform();
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Material Buffer", descriptor.name)),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let sampler = create_default_sampler(device);
        let bind_group = Self::create_bind_group(
            device,
            layout,
            &descriptor.name,
            &buffer,
            &sampler,
            &color_map,
            &displacement_map,
        );

        Self {
            name: descriptor.name.clone(),
            color_map,
            displacement_map,
            uniform,
            buffer,
            sampler,
            bind_group,
        }
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        name: &str,
        buffer: &wgpu::Buffer,
        sampler: &wgpu::Sampler,
        color_map: &Texture,
        displacement_map: &Texture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&color_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(&displacement_map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
            label: Some(&format!("{name} Material Bind Group")),
        })
    }

    /// Swap a slot's texture for a freshly loaded one and rebuild the bind group.
    pub fn replace_map(
        &mut self,
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        kind: MapKind,
        texture: Texture,
    ) {
        match kind {
            MapKind::Color => self.color_map = texture,
            MapKind::Displacement => self.displacement_map = texture,
        }
        self.bind_group = Self::create_bind_group(
            device,
            layout,
            &self.name,
            &self.buffer,
            &self.sampler,
            &self.color_map,
            &self.displacement_map,
        );
    }

    /// Upload the descriptor's uniform values if they changed since the last sync.
    pub fn sync(&mut self, queue: &wgpu::Queue, descriptor: &MaterialDescriptor) {
        let uniform = descriptor.to_uniform();
        if uniform != self.uniform {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
            self.uniform = uniform;
        }
    }
}
