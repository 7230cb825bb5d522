//! Start-up configuration.
//!
//! Every tunable constant of the corridor lives here: scroll speed and tile
//! length, terrain and obstacle appearance, fog, ambient and spot lights,
//! camera projection and damping, and the pixel-ratio clamp. All sections fall
//! back to their defaults when omitted, so a TOML file only needs to name what
//! it overrides:
//!
//! ```toml
//! [scroll]
//! speed = 0.3
//!
//! [fog]
//! color = "#101010"
//! far = 3.0
//! ```
//!
//! [`CorridorConfig::validate`] runs before the frame loop exists. Anything it
//! rejects is a [`CorridorError::Configuration`].

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::CorridorError;

/// An sRGB colour written as `"#rrggbb"` in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);
    pub const BLACK: Rgb = Rgb::new(0x00, 0x00, 0x00);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear-space components for shader uniforms (the surface is sRGB).
    pub fn to_linear(self) -> [f32; 3] {
        fn channel(c: u8) -> f32 {
            let c = c as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        [channel(self.r), channel(self.g), channel(self.b)]
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        let [r, g, b] = self.to_linear();
        wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        }
    }
}

impl FromStr for Rgb {
    type Err = CorridorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(CorridorError::config(format!(
                "colour `{s}` is not of the form #rrggbb"
            )));
        }
        let parse = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| CorridorError::config(format!("colour `{s}`: {e}")))
        };
        Ok(Rgb::new(parse(0..2)?, parse(2..4)?, parse(4..6)?))
    }
}

impl TryFrom<String> for Rgb {
    type Error = CorridorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "corridor".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Units per second along the scroll axis.
    pub speed: f64,
    /// Length of one terrain tile along the scroll axis.
    pub tile_length: f64,
    /// Rest position of tile A.
    pub base_z: f32,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            speed: 0.15,
            tile_length: 2.0,
            base_z: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub width: f32,
    pub segments_x: u32,
    pub segments_z: u32,
    pub base_color: Rgb,
    pub color_map: Option<String>,
    pub displacement_map: Option<String>,
    pub displacement_scale: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            width: 1.0,
            segments_x: 24,
            segments_z: 24,
            base_color: Rgb::WHITE,
            color_map: Some("textures/grid.png".to_string()),
            displacement_map: Some("textures/gutter_displacement.png".to_string()),
            displacement_scale: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleConfig {
    /// Size of the obstacle pool.
    pub count: usize,
    /// Recycling distance; the tile length when unset.
    pub spacing: Option<f64>,
    pub radius: f32,
    pub height: f32,
    pub radial_segments: u32,
    /// Height of the cone's centre above the ground plane.
    pub elevation: f32,
    /// Lateral distance from the corridor centre; alternates sides per obstacle.
    pub lateral_offset: f32,
    pub color: Rgb,
}

impl Default for ObstacleConfig {
    fn default() -> Self {
        Self {
            count: 1,
            spacing: None,
            radius: 0.04,
            height: 0.12,
            radial_segments: 16,
            elevation: 0.06,
            lateral_offset: 0.0,
            color: Rgb::new(0xd5, 0x3c, 0x3d),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    pub color: Rgb,
    pub near: f32,
    pub far: f32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            color: Rgb::BLACK,
            near: 1.0,
            far: 2.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub color: Rgb,
    pub intensity: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            color: Rgb::WHITE,
            intensity: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotLightConfig {
    pub color: Rgb,
    pub intensity: f32,
    /// Cut-off distance of the light; 0 means unbounded.
    pub distance: f32,
    /// Half-angle of the cone in radians.
    pub angle: f32,
    /// Fraction of the cone that fades out, 0..=1.
    pub penumbra: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl SpotLightConfig {
    fn corridor_side(side: f32) -> Self {
        Self {
            color: Rgb::new(0xd5, 0x3c, 0x3d),
            intensity: 20.0,
            distance: 25.0,
            angle: std::f32::consts::PI * 0.1,
            penumbra: 0.25,
            position: [0.5 * side, 0.75, 2.2],
            target: [-0.25 * side, 0.25, 0.25],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 75.0,
            near: 0.01,
            far: 20.0,
            position: [0.0, 0.06, 1.1],
            target: [0.0, 0.0, 0.0],
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            min_distance: 0.05,
            max_distance: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    /// Upper bound for the device pixel ratio used to size the drawing surface.
    pub max_pixel_ratio: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            max_pixel_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorridorConfig {
    pub window: WindowConfig,
    pub scroll: ScrollConfig,
    pub terrain: TerrainConfig,
    pub obstacles: ObstacleConfig,
    pub fog: FogConfig,
    pub ambient: AmbientConfig,
    pub spotlights: [SpotLightConfig; 2],
    pub camera: CameraConfig,
    pub viewport: ViewportConfig,
}

impl Default for CorridorConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            scroll: ScrollConfig::default(),
            terrain: TerrainConfig::default(),
            obstacles: ObstacleConfig::default(),
            fog: FogConfig::default(),
            ambient: AmbientConfig::default(),
            spotlights: [
                SpotLightConfig::corridor_side(1.0),
                SpotLightConfig::corridor_side(-1.0),
            ],
            camera: CameraConfig::default(),
            viewport: ViewportConfig::default(),
        }
    }
}

fn ensure(condition: bool, reason: impl FnOnce() -> String) -> Result<(), CorridorError> {
    if condition {
        Ok(())
    } else {
        Err(CorridorError::config(reason()))
    }
}

impl CorridorConfig {
    /// Parse a (possibly partial) TOML document and validate the result.
    pub fn from_toml_str(text: &str) -> Result<Self, CorridorError> {
        let config: Self = toml::from_str(text).map_err(|e| CorridorError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read `path` if it exists, otherwise use the defaults.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default(path: impl AsRef<std::path::Path>) -> Result<Self, CorridorError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::info!("Loading configuration from {}", path.display());
                Self::from_toml_str(&text)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No configuration at {}, using defaults", path.display());
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(e) => Err(CorridorError::config(format!("{}: {e}", path.display()))),
        }
    }

    /// Distance after which an obstacle recycles to the front of its lane.
    pub fn obstacle_spacing(&self) -> f64 {
        self.obstacles.spacing.unwrap_or(self.scroll.tile_length)
    }

    pub fn validate(&self) -> Result<(), CorridorError> {
        let scroll = &self.scroll;
        ensure(scroll.tile_length.is_finite() && scroll.tile_length > 0.0, || {
            format!("scroll.tile_length must be positive, got {}", scroll.tile_length)
        })?;
        ensure(scroll.speed.is_finite() && scroll.speed >= 0.0, || {
            format!("scroll.speed must be finite and non-negative, got {}", scroll.speed)
        })?;

        let terrain = &self.terrain;
        ensure(terrain.segments_x > 0 && terrain.segments_z > 0, || {
            "terrain segments must be at least 1".to_string()
        })?;
        ensure(terrain.width > 0.0, || {
            format!("terrain.width must be positive, got {}", terrain.width)
        })?;

        let obstacles = &self.obstacles;
        let spacing = self.obstacle_spacing();
        ensure(spacing.is_finite() && spacing > 0.0, || {
            format!("obstacles.spacing must be positive, got {spacing}")
        })?;
        ensure(obstacles.radial_segments >= 3, || {
            format!(
                "obstacles.radial_segments must be at least 3, got {}",
                obstacles.radial_segments
            )
        })?;

        ensure(self.fog.far > self.fog.near, || {
            format!("fog.far ({}) must exceed fog.near ({})", self.fog.far, self.fog.near)
        })?;

        for (i, spot) in self.spotlights.iter().enumerate() {
            ensure((0.0..=1.0).contains(&spot.penumbra), || {
                format!("spotlights[{i}].penumbra must be within 0..=1, got {}", spot.penumbra)
            })?;
            ensure(spot.angle > 0.0 && spot.angle < std::f32::consts::FRAC_PI_2, || {
                format!("spotlights[{i}].angle must be within (0, pi/2), got {}", spot.angle)
            })?;
        }

        let camera = &self.camera;
        ensure(camera.fov_deg > 0.0 && camera.fov_deg < 180.0, || {
            format!("camera.fov_deg must be within (0, 180), got {}", camera.fov_deg)
        })?;
        ensure(camera.near > 0.0, || {
            format!("camera.near must be positive, got {}", camera.near)
        })?;
        ensure(camera.far > camera.near, || {
            format!("camera.far ({}) must exceed camera.near ({})", camera.far, camera.near)
        })?;
        ensure(camera.damping_factor > 0.0 && camera.damping_factor <= 1.0, || {
            format!(
                "camera.damping_factor must be within (0, 1], got {}",
                camera.damping_factor
            )
        })?;
        ensure(camera.max_distance >= camera.min_distance, || {
            "camera.max_distance must not be below camera.min_distance".to_string()
        })?;

        ensure(self.viewport.max_pixel_ratio > 0.0, || {
            format!(
                "viewport.max_pixel_ratio must be positive, got {}",
                self.viewport.max_pixel_ratio
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CorridorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scroll.tile_length, 2.0);
        assert_eq!(config.scroll.speed, 0.15);
        assert_eq!(config.camera.fov_deg, 75.0);
        assert_eq!(config.viewport.max_pixel_ratio, 2.0);
        assert_eq!(config.obstacle_spacing(), 2.0);
    }

    #[test]
    fn zero_tile_length_is_rejected() {
        let mut config = CorridorConfig::default();
        config.scroll.tile_length = 0.0;
        assert!(matches!(
            config.validate(),
            Err(CorridorError::Configuration(_))
        ));
    }

    #[test]
    fn inverted_clip_planes_are_rejected() {
        let mut config = CorridorConfig::default();
        config.camera.far = 0.001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config = CorridorConfig::from_toml_str(
            r##"
            [scroll]
            speed = 0.3

            [fog]
            color = "#101010"
            "##,
        )
        .unwrap();
        assert_eq!(config.scroll.speed, 0.3);
        assert_eq!(config.scroll.tile_length, 2.0);
        assert_eq!(config.fog.color, Rgb::new(0x10, 0x10, 0x10));
        assert_eq!(config.fog.far, 2.5);
        assert_eq!(config.terrain, TerrainConfig::default());
    }

    #[test]
    fn invalid_toml_values_surface_as_configuration_errors() {
        let err = CorridorConfig::from_toml_str("[scroll]\ntile_length = 0.0\n").unwrap_err();
        assert!(matches!(err, CorridorError::Configuration(_)));

        let err = CorridorConfig::from_toml_str("[fog]\ncolor = \"red\"\n").unwrap_err();
        assert!(matches!(err, CorridorError::Configuration(_)));
    }

    #[test]
    fn hex_colours_parse_and_print() {
        let colour: Rgb = "#d53c3d".parse().unwrap();
        assert_eq!(colour, Rgb::new(0xd5, 0x3c, 0x3d));
        assert_eq!(colour.to_string(), "#d53c3d");
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
    }

    #[test]
    fn linear_conversion_keeps_extremes() {
        assert_eq!(Rgb::BLACK.to_linear(), [0.0, 0.0, 0.0]);
        let [r, g, b] = Rgb::WHITE.to_linear();
        approx::assert_relative_eq!(r, 1.0);
        approx::assert_relative_eq!(g, 1.0);
        approx::assert_relative_eq!(b, 1.0);
    }
}
