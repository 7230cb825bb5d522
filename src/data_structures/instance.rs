//! Per-entity transforms and their GPU layout.
//!
//! Entities that share a mesh and material are drawn with one instanced call;
//! each contributes an [`InstanceRaw`] to the batch's instance buffer.

use cgmath::{Matrix3, Matrix4, One, Quaternion, Vector3};

use crate::data_structures::mesh::Vertex;

/// Position, rotation and scale of one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Instance {
    /// Identity transform.
    pub fn new() -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_rotation(mut self, rotation: Quaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    /// Translation * rotation * scale.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    /// Only rotation enters the normal matrix; corridor entities are never
    /// scaled non-uniformly.
    pub fn to_raw(&self) -> InstanceRaw {
        InstanceRaw {
            model: self.to_matrix().into(),
            normal: Matrix3::from(self.rotation).into(),
        }
    }
}

impl From<Vector3<f32>> for Instance {
    fn from(position: Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/// What the vertex shader sees per instance: the model matrix as four
/// columns followed by the normal matrix as three.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    model: [[f32; 4]; 4],
    normal: [[f32; 3]; 3],
}

impl InstanceRaw {
    // Locations 0..=2 belong to MeshVertex.
    const ATTRIBUTES: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x3,
        10 => Float32x3,
        11 => Float32x3,
    ];

    /// World-space translation encoded in the model matrix.
    pub fn translation(&self) -> [f32; 3] {
        let [x, y, z, _] = self.model[3];
        [x, y, z]
    }
}

impl Vertex for InstanceRaw {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Rotation3;

    use super::*;

    #[test]
    fn raw_instance_carries_translation() {
        let instance = Instance::from(Vector3::new(0.0, 0.5, -1.5));
        assert_eq!(instance.to_raw().translation(), [0.0, 0.5, -1.5]);
    }

    #[test]
    fn layout_covers_both_matrices() {
        let layout = InstanceRaw::desc();
        assert_eq!(layout.array_stride, (16 + 9) * 4);
        assert_eq!(layout.attributes.len(), 7);
        assert_eq!(layout.attributes[4].offset, 16 * 4);
        assert_eq!(layout.attributes[6].shader_location, 11);
    }

    #[test]
    fn rotation_does_not_move_the_origin() {
        let instance = Instance::from(Vector3::new(1.0, 2.0, 3.0))
            .with_rotation(Quaternion::from_angle_y(cgmath::Deg(90.0)));
        assert_eq!(instance.to_raw().translation(), [1.0, 2.0, 3.0]);
    }
}
