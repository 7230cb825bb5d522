//! Infinite scrolling.
//!
//! Two terrain tiles and a small pool of obstacles are all that ever exist.
//! Every frame their positions along the scroll axis are recomputed from the
//! elapsed time alone:
//!
//! ```text
//! c      = (elapsed * speed) mod tile_length        in [0, tile_length)
//! tile_a = base_z + c
//! tile_b = base_z + c - tile_length
//! ```
//!
//! Tile B always sits exactly one tile behind tile A, so the two centred tiles
//! cover `[base_z + c - 1.5 * tile_length, base_z + c + 0.5 * tile_length]`
//! without a gap, which always contains the rest window around `base_z`. At the
//! wrap instant both tiles jump back by exactly one tile length, which the
//! repeating ground texture hides. Nothing is accumulated between frames, so
//! the positions cannot drift.

use crate::{
    config::ScrollConfig,
    data_structures::scene_graph::{EntityId, SceneGraph},
    error::CorridorError,
};

/// Monotonic source of elapsed seconds.
pub trait ScrollClock {
    /// Seconds since the clock started. Never decreases.
    fn elapsed(&mut self) -> f64;
}

/// Wall clock that starts on its first sample.
#[derive(Debug, Default)]
pub struct SystemClock {
    start: Option<instant::Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScrollClock for SystemClock {
    fn elapsed(&mut self) -> f64 {
        let start = *self.start.get_or_insert_with(instant::Instant::now);
        start.elapsed().as_secs_f64()
    }
}

/// Clock driven by hand, for tests and deterministic playback.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ManualClock {
    now: f64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: start.max(0.0),
        }
    }

    pub fn advance(&mut self, seconds: f64) {
        if seconds > 0.0 {
            self.now += seconds;
        }
    }

    /// Jump to `seconds`; earlier times are ignored to keep the clock monotonic.
    pub fn set(&mut self, seconds: f64) {
        if seconds > self.now {
            self.now = seconds;
        }
    }
}

impl ScrollClock for ManualClock {
    fn elapsed(&mut self) -> f64 {
        self.now
    }
}

/// `(distance) mod period`, narrowed to f32 and guaranteed to stay in `[0, period)`.
fn wrap(distance: f64, period: f64) -> f32 {
    let c = distance.rem_euclid(period) as f32;
    if c >= period as f32 { 0.0 } else { c }
}

/// One recycled obstacle: it travels `[base_z, base_z + spacing)` and then
/// jumps back to the start, offset from its siblings by `phase`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleLane {
    pub entity: EntityId,
    pub phase: f64,
    pub spacing: f64,
}

impl ObstacleLane {
    /// `count` lanes sharing one spacing with evenly distributed phases.
    pub fn evenly_spaced(entities: &[EntityId], spacing: f64) -> Vec<Self> {
        let count = entities.len().max(1) as f64;
        entities
            .iter()
            .enumerate()
            .map(|(i, &entity)| Self {
                entity,
                phase: i as f64 * spacing / count,
                spacing,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InfiniteScrollController {
    speed: f64,
    tile_length: f64,
    base_z: f32,
    tiles: [EntityId; 2],
    obstacles: Vec<ObstacleLane>,
}

impl InfiniteScrollController {
    pub fn new(
        config: &ScrollConfig,
        tiles: [EntityId; 2],
        obstacles: Vec<ObstacleLane>,
    ) -> Result<Self, CorridorError> {
        if !(config.tile_length.is_finite() && config.tile_length > 0.0) {
            return Err(CorridorError::config(format!(
                "tile length must be positive and finite, got {}",
                config.tile_length
            )));
        }
        if !(config.speed.is_finite() && config.speed >= 0.0) {
            return Err(CorridorError::config(format!(
                "scroll speed must be finite and non-negative, got {}",
                config.speed
            )));
        }
        if let Some(lane) = obstacles
            .iter()
            .find(|lane| !(lane.spacing.is_finite() && lane.spacing > 0.0 && lane.phase.is_finite()))
        {
            return Err(CorridorError::config(format!(
                "obstacle lane needs a positive spacing and finite phase, got spacing {} phase {}",
                lane.spacing, lane.phase
            )));
        }
        Ok(Self {
            speed: config.speed,
            tile_length: config.tile_length,
            base_z: config.base_z,
            tiles,
            obstacles,
        })
    }

    pub fn tile_length(&self) -> f64 {
        self.tile_length
    }

    pub fn period(&self) -> f64 {
        if self.speed > 0.0 {
            self.tile_length / self.speed
        } else {
            f64::INFINITY
        }
    }

    pub fn obstacles(&self) -> &[ObstacleLane] {
        &self.obstacles
    }

    /// Scroll offset within the current tile, in `[0, tile_length)`.
    pub fn cycle_position(&self, elapsed: f64) -> f32 {
        wrap(elapsed * self.speed, self.tile_length)
    }

    /// Positions along the scroll axis for tile A and tile B.
    ///
    /// B is always derived from A so `b == a - tile_length` holds bit for bit.
    pub fn tile_positions(&self, elapsed: f64) -> (f32, f32) {
        let a = self.base_z + self.cycle_position(elapsed);
        (a, a - self.tile_length as f32)
    }

    pub fn obstacle_position(&self, lane: &ObstacleLane, elapsed: f64) -> f32 {
        self.base_z + wrap(elapsed * self.speed + lane.phase, lane.spacing)
    }

    /// Write the scroll-axis positions for `elapsed` into the scene.
    pub fn update(&self, elapsed: f64, scene: &mut SceneGraph) {
        let (a, b) = self.tile_positions(elapsed);
        for (id, z) in self.tiles.into_iter().zip([a, b]) {
            if let Some(tile) = scene.entity_mut(id) {
                tile.instance.position.z = z;
            }
        }
        for lane in &self.obstacles {
            let z = self.obstacle_position(lane, elapsed);
            if let Some(obstacle) = scene.entity_mut(lane.entity) {
                obstacle.instance.position.z = z;
            }
        }
        log::trace!("scroll t={elapsed:.3} tile_a={a:.4} tile_b={b:.4}");
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        config::{CorridorConfig, Rgb},
        data_structures::{
            instance::Instance, light::SceneLights, material::MaterialDescriptor, mesh::Geometry,
        },
    };

    struct Fixture {
        scene: SceneGraph,
        tiles: [EntityId; 2],
        obstacles: Vec<EntityId>,
    }

    fn fixture(obstacles: usize) -> Fixture {
        let mut scene = SceneGraph::new(SceneLights::from(&CorridorConfig::default()));
        let mesh = scene.add_mesh(Geometry::plane(1.0, 2.0, 1, 1));
        let material = scene.add_material(MaterialDescriptor::flat("flat", Rgb::WHITE));
        let tiles = [
            scene.spawn("tile a", mesh, material, Instance::new()),
            scene.spawn("tile b", mesh, material, Instance::new()),
        ];
        let obstacles = (0..obstacles)
            .map(|i| scene.spawn(format!("obstacle {i}"), mesh, material, Instance::new()))
            .collect();
        Fixture {
            scene,
            tiles,
            obstacles,
        }
    }

    fn z(scene: &SceneGraph, id: EntityId) -> f32 {
        scene.entity(id).unwrap().instance.position.z
    }

    fn controller(fixture: &Fixture) -> InfiniteScrollController {
        InfiniteScrollController::new(
            &ScrollConfig::default(),
            fixture.tiles,
            ObstacleLane::evenly_spaced(&fixture.obstacles, 2.0),
        )
        .unwrap()
    }

    #[test]
    fn ten_seconds_in() {
        let mut fixture = fixture(1);
        let scroll = controller(&fixture);
        scroll.update(10.0, &mut fixture.scene);

        assert_abs_diff_eq!(z(&fixture.scene, fixture.tiles[0]), 1.5, epsilon = 1e-6);
        assert_abs_diff_eq!(z(&fixture.scene, fixture.tiles[1]), -0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(z(&fixture.scene, fixture.obstacles[0]), 1.5, epsilon = 1e-6);
    }

    #[test]
    fn exact_wrap_point() {
        let mut fixture = fixture(1);
        let scroll = controller(&fixture);
        scroll.update(2.0 / 0.15, &mut fixture.scene);

        assert_eq!(z(&fixture.scene, fixture.tiles[0]), 0.0);
        assert_eq!(z(&fixture.scene, fixture.tiles[1]), -2.0);

        let (a, b) = scroll.tile_positions(13.333333333333333);
        assert_eq!((a, b), (0.0, -2.0));
    }

    #[test]
    fn shifted_base_keeps_tiles_exactly_one_length_apart() {
        let fixture = fixture(0);
        let config = ScrollConfig {
            speed: 0.5,
            base_z: -0.25,
            ..ScrollConfig::default()
        };
        let scroll = InfiniteScrollController::new(&config, fixture.tiles, Vec::new()).unwrap();
        for frame in 0..3600 {
            let t = frame as f64 / 60.0;
            let (a, b) = scroll.tile_positions(t);
            assert_eq!(b, a - 2.0, "gap at t={t}");
            assert!((-0.25..=1.75).contains(&a), "tile a at {a}");
        }
    }

    #[test]
    fn zero_elapsed_is_rest_position() {
        let mut fixture = fixture(1);
        let scroll = controller(&fixture);
        scroll.update(0.0, &mut fixture.scene);
        assert_eq!(z(&fixture.scene, fixture.tiles[0]), 0.0);
        assert_eq!(z(&fixture.scene, fixture.tiles[1]), -2.0);
    }

    #[test]
    fn tiles_stay_contiguous_and_in_range() {
        let fixture = fixture(0);
        let scroll = controller(&fixture);
        for step in 0..20_000 {
            let t = step as f64 * 0.0137;
            let (a, b) = scroll.tile_positions(t);
            assert_eq!(a - b, 2.0, "gap at t={t}");
            let c = scroll.cycle_position(t);
            assert!((0.0..2.0).contains(&c), "cycle {c} out of range at t={t}");
        }
    }

    #[test]
    fn cycle_is_periodic() {
        let fixture = fixture(0);
        let scroll = controller(&fixture);
        let period = scroll.period();
        for t in [0.0, 0.5, 3.2, 7.77, 12.9, 101.3] {
            assert_abs_diff_eq!(
                scroll.cycle_position(t),
                scroll.cycle_position(t + period),
                epsilon = 1e-4
            );
        }
    }

    #[test]
    fn coverage_survives_the_wrap() {
        let fixture = fixture(0);
        let scroll = controller(&fixture);
        let period = scroll.period();

        let before = scroll.tile_positions(period - 1e-5);
        let after = scroll.tile_positions(period);
        // Tile A is about to leave [0, L) and tile B has just taken its place.
        assert_abs_diff_eq!(before.0, 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(before.1, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(after.0, 0.0, epsilon = 1e-4);
        assert_abs_diff_eq!(after.1, -2.0, epsilon = 1e-4);

        // Each tile spans [z - L/2, z + L/2]. The union moves back by exactly one
        // tile length, which the repeating ground texture makes invisible.
        let span = |(a, b): (f32, f32)| (b - 1.0, a + 1.0);
        let (lo_before, hi_before) = span(before);
        let (lo_after, hi_after) = span(after);
        assert_abs_diff_eq!(hi_before - lo_before, 4.0, epsilon = 1e-4);
        assert_abs_diff_eq!(hi_after - lo_after, 4.0, epsilon = 1e-4);
        assert_abs_diff_eq!(lo_after, lo_before - 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(hi_after, hi_before - 2.0, epsilon = 1e-4);
    }

    #[test]
    fn rest_window_is_always_covered() {
        let fixture = fixture(0);
        let scroll = controller(&fixture);
        for step in 0..5_000 {
            let t = step as f64 * 0.0421;
            let (a, b) = scroll.tile_positions(t);
            assert!(b - 1.0 <= -1.0 && a + 1.0 >= 1.0, "hole near the origin at t={t}");
        }
    }

    #[test]
    fn obstacle_lanes_keep_their_phases() {
        let mut fixture = fixture(4);
        let scroll = controller(&fixture);
        for step in 0..500 {
            let t = step as f64 * 0.1;
            scroll.update(t, &mut fixture.scene);
            let zs: Vec<f32> = fixture
                .obstacles
                .iter()
                .map(|&id| z(&fixture.scene, id))
                .collect();
            for &z in &zs {
                assert!((0.0..2.0).contains(&z), "obstacle at {z} (t={t})");
            }
            // Lane i leads lane 0 by i * spacing / 4 modulo the spacing.
            for (i, &z) in zs.iter().enumerate() {
                let expected = (zs[0] as f64 + i as f64 * 0.5).rem_euclid(2.0) as f32;
                let diff = (z - expected).abs();
                assert!(diff < 1e-4 || (diff - 2.0).abs() < 1e-4, "lane {i} drifted at t={t}");
            }
        }
    }

    #[test]
    fn single_obstacle_rides_tile_a() {
        let mut fixture = fixture(1);
        let scroll = controller(&fixture);
        for step in 0..1000 {
            let t = step as f64 * 0.071;
            scroll.update(t, &mut fixture.scene);
            assert_eq!(
                z(&fixture.scene, fixture.obstacles[0]),
                z(&fixture.scene, fixture.tiles[0])
            );
        }
    }

    #[test]
    fn rejects_degenerate_configuration() {
        let fixture = fixture(1);
        let zero = ScrollConfig {
            tile_length: 0.0,
            ..ScrollConfig::default()
        };
        assert!(matches!(
            InfiniteScrollController::new(&zero, fixture.tiles, vec![]),
            Err(CorridorError::Configuration(_))
        ));

        let backwards = ScrollConfig {
            speed: -1.0,
            ..ScrollConfig::default()
        };
        assert!(InfiniteScrollController::new(&backwards, fixture.tiles, vec![]).is_err());

        let lane = ObstacleLane {
            entity: fixture.obstacles[0],
            phase: 0.0,
            spacing: 0.0,
        };
        assert!(
            InfiniteScrollController::new(&ScrollConfig::default(), fixture.tiles, vec![lane])
                .is_err()
        );
    }

    #[test]
    fn manual_clock_never_runs_backwards() {
        let mut clock = ManualClock::new(1.0);
        clock.advance(0.5);
        clock.set(0.2);
        clock.advance(-3.0);
        assert_eq!(clock.elapsed(), 1.5);
        clock.set(4.0);
        assert_eq!(clock.elapsed(), 4.0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let mut clock = SystemClock::new();
        let first = clock.elapsed();
        let second = clock.elapsed();
        assert!(first >= 0.0);
        assert!(second >= first);
    }
}
