//! The corridor scene and everything that drives it, owned in one place.
//!
//! [`Corridor`] is built once from a [`CorridorConfig`] and handed to the
//! frame loop by reference. It holds no GPU state; see `context` for that.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Rad, Rotation3};

use crate::{
    camera::CameraRig,
    config::CorridorConfig,
    data_structures::{
        instance::Instance,
        light::SceneLights,
        material::{MapKind, MapState, MaterialDescriptor},
        mesh::Geometry,
        scene_graph::{EntityId, MaterialId, SceneGraph},
    },
    error::CorridorError,
    frame::{EventQueue, HostEvent},
    resources::{AssetLoader, AssetSlot},
    scroll::{InfiniteScrollController, ObstacleLane},
    viewport::{SurfaceTarget, ViewportController},
};

#[derive(Debug)]
pub struct Corridor {
    pub scene: SceneGraph,
    pub scroll: InfiniteScrollController,
    pub rig: CameraRig,
    pub viewport: ViewportController,
    pub events: EventQueue,
    pub assets: AssetLoader,
    tiles: [EntityId; 2],
    obstacles: Vec<EntityId>,
    terrain_material: MaterialId,
}

impl Corridor {
    /// Validate `config` and build the scene at its rest position.
    pub fn new(config: &CorridorConfig) -> Result<Self, CorridorError> {
        config.validate()?;

        let mut scene = SceneGraph::new(SceneLights::from(config));

        let terrain = &config.terrain;
        let tile_length = config.scroll.tile_length as f32;
        let plane = scene.add_mesh(
            Geometry::plane(terrain.width, tile_length, terrain.segments_x, terrain.segments_z)
                .named("terrain"),
        );
        let terrain_material = scene.add_material(
            MaterialDescriptor::flat("terrain", terrain.base_color)
                .with_color_map(terrain.color_map.clone())
                .with_displacement_map(terrain.displacement_map.clone(), terrain.displacement_scale),
        );

        // The plane is built facing +Z; lay it flat so it faces up.
        let flat = cgmath::Quaternion::from_angle_x(Rad(-FRAC_PI_2));
        let base_z = config.scroll.base_z;
        let tiles = [
            scene.spawn(
                "tile a",
                plane,
                terrain_material,
                Instance::from(cgmath::Vector3::new(0.0, 0.0, base_z)).with_rotation(flat),
            ),
            scene.spawn(
                "tile b",
                plane,
                terrain_material,
                Instance::from(cgmath::Vector3::new(0.0, 0.0, base_z - tile_length))
                    .with_rotation(flat),
            ),
        ];

        let obstacle_config = &config.obstacles;
        let cone = scene.add_mesh(
            Geometry::cone(
                obstacle_config.radius,
                obstacle_config.height,
                obstacle_config.radial_segments,
            )
            .named("obstacle"),
        );
        let obstacle_material =
            scene.add_material(MaterialDescriptor::flat("obstacle", obstacle_config.color));
        let obstacles: Vec<EntityId> = (0..obstacle_config.count)
            .map(|i| {
                let side = if i % 2 == 0 { 1.0 } else { -1.0 };
                let position = cgmath::Vector3::new(
                    side * obstacle_config.lateral_offset,
                    obstacle_config.elevation,
                    base_z,
                );
                scene.spawn(format!("obstacle {i}"), cone, obstacle_material, position.into())
            })
            .collect();

        let lanes = ObstacleLane::evenly_spaced(&obstacles, config.obstacle_spacing());
        let scroll = InfiniteScrollController::new(&config.scroll, tiles, lanes)?;
        scroll.update(0.0, &mut scene);

        let aspect = config.window.width.max(1) as f32 / config.window.height.max(1) as f32;
        let rig = CameraRig::new(&config.camera, aspect);

        log::info!(
            "Corridor ready: {} entities, tile length {}, {} obstacle(s)",
            scene.entities().len(),
            config.scroll.tile_length,
            obstacles.len()
        );

        Ok(Self {
            scene,
            scroll,
            rig,
            viewport: ViewportController::new(config.viewport.max_pixel_ratio, 1.0),
            events: EventQueue::new(),
            assets: AssetLoader::new(),
            tiles,
            obstacles,
            terrain_material,
        })
    }

    pub fn tiles(&self) -> [EntityId; 2] {
        self.tiles
    }

    pub fn obstacles(&self) -> &[EntityId] {
        &self.obstacles
    }

    pub fn terrain_material(&self) -> MaterialId {
        self.terrain_material
    }

    /// Kick off background loads for every texture slot still pending.
    pub fn request_assets(
        &mut self,
        #[cfg(not(target_arch = "wasm32"))] runtime: &tokio::runtime::Handle,
    ) {
        let pending: Vec<(AssetSlot, String)> = self
            .scene
            .materials()
            .iter()
            .enumerate()
            .flat_map(|(i, material)| {
                [MapKind::Color, MapKind::Displacement]
                    .into_iter()
                    .filter_map(move |kind| {
                        let slot = material.slot(kind);
                        match (&slot.path, slot.state) {
                            (Some(path), MapState::Pending) => Some((
                                AssetSlot {
                                    material: MaterialId(i),
                                    kind,
                                },
                                path.clone(),
                            )),
                            _ => None,
                        }
                    })
            })
            .collect();

        for (slot, path) in pending {
            #[cfg(not(target_arch = "wasm32"))]
            self.assets.request(runtime, slot, path);
            #[cfg(target_arch = "wasm32")]
            self.assets.request(slot, path);
        }
    }

    /// Apply every queued host event.
    pub fn apply_events<T: SurfaceTarget + ?Sized>(&mut self, target: &mut T) {
        for event in self.events.drain() {
            match event {
                HostEvent::Resized { width, height } => {
                    self.viewport
                        .resize(width, height, self.rig.projection_mut(), target);
                }
                HostEvent::PixelDensity(ratio) => {
                    self.viewport
                        .set_device_pixel_ratio(ratio, self.rig.projection_mut(), target);
                }
                HostEvent::Rotate { dx, dy } => {
                    self.rig
                        .rotate(dx, dy, self.viewport.logical_height() as f32);
                }
                HostEvent::Pan { dx, dy } => {
                    self.rig.pan(dx, dy, self.viewport.logical_height() as f32);
                }
                HostEvent::Zoom(steps) => self.rig.zoom(steps),
            }
        }
    }
}
