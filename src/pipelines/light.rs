use wgpu::util::DeviceExt;

use crate::data_structures::light::{SceneLights, SpotLight};

/// GPU layout of one spotlight. Every field is a vec4 to satisfy uniform alignment.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpotLightUniform {
    /// xyz: world position, w: cut-off distance (0 = unbounded)
    position_distance: [f32; 4],
    /// xyz: normalised direction, w: cos of the outer cone angle
    direction_cone_cos: [f32; 4],
    /// rgb: linear colour premultiplied by intensity, w: cos of the inner (penumbra) angle
    color_penumbra_cos: [f32; 4],
}

impl From<&SpotLight> for SpotLightUniform {
    fn from(spot: &SpotLight) -> Self {
        let [r, g, b] = spot.color.to_linear();
        let dir = spot.direction();
        let (outer, inner) = spot.cone_cosines();
        Self {
            position_distance: [spot.position.x, spot.position.y, spot.position.z, spot.distance],
            direction_cone_cos: [dir.x, dir.y, dir.z, outer],
            color_penumbra_cos: [
                r * spot.intensity,
                g * spot.intensity,
                b * spot.intensity,
                inner,
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    /// rgb: linear ambient colour premultiplied by intensity
    ambient: [f32; 4],
    fog_color: [f32; 4],
    /// x: fog near, y: fog far
    fog_range: [f32; 4],
    spots: [SpotLightUniform; 2],
}

impl LightingUniform {
    pub fn from_lights(lights: &SceneLights) -> Self {
        let [ar, ag, ab] = lights.ambient.color.to_linear();
        let ambient = lights.ambient.intensity;
        let [fr, fg, fb] = lights.fog.color.to_linear();
        Self {
            ambient: [ar * ambient, ag * ambient, ab * ambient, 1.0],
            fog_color: [fr, fg, fb, 1.0],
            fog_range: [lights.fog.near, lights.fog.far, 0.0, 0.0],
            spots: [(&lights.spots[0]).into(), (&lights.spots[1]).into()],
        }
    }
}

#[derive(Debug)]
pub struct LightResources {
    pub uniform: LightingUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl LightResources {
    pub fn new(device: &wgpu::Device, lights: &SceneLights) -> Self {
        let uniform = LightingUniform::from_lights(lights);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Lighting Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("lighting_bind_group"),
        });
        Self {
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Re-upload the lights if they changed since the last frame.
    pub fn sync(&mut self, queue: &wgpu::Queue, lights: &SceneLights) {
        let uniform = LightingUniform::from_lights(lights);
        if uniform != self.uniform {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
            self.uniform = uniform;
        }
    }
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
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
        label: Some("lighting_bind_group_layout"),
    })
}
