//! Scene lighting: one ambient term, linear fog and the two spotlights that
//! flank the corridor.

use cgmath::{InnerSpace, Point3};

use crate::config::{AmbientConfig, CorridorConfig, FogConfig, Rgb, SpotLightConfig};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    pub color: Rgb,
    pub intensity: f32,
}

impl From<&AmbientConfig> for AmbientLight {
    fn from(config: &AmbientConfig) -> Self {
        Self {
            color: config.color,
            intensity: config.intensity,
        }
    }
}

/// Linear fog between `near` and `far` (distance from the camera).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: Rgb,
    pub near: f32,
    pub far: f32,
}

impl From<&FogConfig> for Fog {
    fn from(config: &FogConfig) -> Self {
        Self {
            color: config.color,
            near: config.near,
            far: config.far,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub color: Rgb,
    pub intensity: f32,
    /// 0 means the light never cuts off.
    pub distance: f32,
    /// Half-angle of the cone in radians.
    pub angle: f32,
    pub penumbra: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl SpotLight {
    pub fn direction(&self) -> cgmath::Vector3<f32> {
        let dir = self.target - self.position;
        if dir.magnitude2() > 0.0 {
            dir.normalize()
        } else {
            -cgmath::Vector3::unit_y()
        }
    }

    /// Cosines bounding the penumbra: fully dark outside `outer`, full
    /// intensity inside `inner`.
    pub fn cone_cosines(&self) -> (f32, f32) {
        let outer = self.angle.cos();
        let inner = (self.angle * (1.0 - self.penumbra)).cos();
        (outer, inner)
    }
}

impl From<&SpotLightConfig> for SpotLight {
    fn from(config: &SpotLightConfig) -> Self {
        Self {
            color: config.color,
            intensity: config.intensity,
            distance: config.distance,
            angle: config.angle,
            penumbra: config.penumbra,
            position: Point3::from(config.position),
            target: Point3::from(config.target),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneLights {
    pub ambient: AmbientLight,
    pub fog: Fog,
    pub spots: [SpotLight; 2],
}

impl From<&CorridorConfig> for SceneLights {
    fn from(config: &CorridorConfig) -> Self {
        Self {
            ambient: (&config.ambient).into(),
            fog: (&config.fog).into(),
            spots: [(&config.spotlights[0]).into(), (&config.spotlights[1]).into()],
        }
    }
}
