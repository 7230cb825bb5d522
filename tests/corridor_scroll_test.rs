use corridor_ngin::{
    Corridor, CorridorConfig, CorridorError, FrameLoop, FrameScheduler, HostEvent, ManualClock,
    Renderer,
    camera::CameraRig,
    data_structures::scene_graph::SceneGraph,
    resources::AssetSlot,
    viewport::{SurfaceSize, SurfaceTarget},
};
use image::DynamicImage;

const FRAME: f64 = 1.0 / 60.0;

/// Records what would have been drawn: tile A, tile B, then every obstacle.
#[derive(Default)]
struct RecordingRenderer {
    frames: Vec<Vec<f32>>,
    surfaces: Vec<SurfaceSize>,
}

impl SurfaceTarget for RecordingRenderer {
    fn resize_surface(&mut self, size: SurfaceSize) {
        self.surfaces.push(size);
    }
}

impl Renderer for RecordingRenderer {
    fn upload_texture(&mut self, _slot: AssetSlot, _image: &DynamicImage) -> Result<(), CorridorError> {
        Ok(())
    }

    fn draw(&mut self, scene: &SceneGraph, _rig: &CameraRig) -> Result<(), CorridorError> {
        self.frames.push(
            scene
                .entities()
                .iter()
                .map(|e| e.instance.position.z)
                .collect(),
        );
        Ok(())
    }
}

struct Countdown(usize);

impl FrameScheduler for Countdown {
    fn next_frame(&mut self) -> bool {
        self.0 = self.0.saturating_sub(1);
        self.0 > 0
    }
}

fn corridor_from(toml: &str) -> (CorridorConfig, Corridor) {
    let config = CorridorConfig::from_toml_str(toml).unwrap();
    let corridor = Corridor::new(&config).unwrap();
    (config, corridor)
}

#[test]
fn ground_is_covered_for_a_simulated_minute() {
    let (config, mut corridor) = corridor_from(
        r#"
        [scroll]
        speed = 0.5
        tile_length = 2.0
        base_z = -0.25

        [obstacles]
        count = 3
        "#,
    );
    let base = config.scroll.base_z;
    let length = config.scroll.tile_length as f32;
    let spacing = config.obstacle_spacing() as f32;

    let mut renderer = RecordingRenderer::default();
    let mut frame_loop = FrameLoop::new(ManualClock::default());
    for _ in 0..3600 {
        frame_loop.tick(&mut corridor, &mut renderer).unwrap();
        frame_loop.clock_mut().advance(FRAME);
    }

    let mut wraps = 0;
    let mut previous_a = None;
    for frame in &renderer.frames {
        let (a, b) = (frame[0], frame[1]);
        assert!(a >= base && a <= base + length, "tile a at {a}");
        assert_eq!(b, a - length);
        // The two tiles together span the rest window around base_z.
        assert!(b - length / 2.0 <= base - length / 2.0);
        assert!(a + length / 2.0 >= base + length / 2.0);

        for &z in &frame[2..] {
            assert!(z >= base && z <= base + spacing, "obstacle at {z}");
        }

        if let Some(previous) = previous_a {
            if a < previous {
                wraps += 1;
            }
        }
        previous_a = Some(a);
    }
    // 60 s at 0.5 units/s over 2-unit tiles.
    assert!((14..=15).contains(&wraps), "{wraps} wraps");
}

#[test]
fn identical_clocks_produce_identical_frames() {
    let toml = "[scroll]\nspeed = 0.3\n";
    let (_, mut first) = corridor_from(toml);
    let (_, mut second) = corridor_from(toml);
    let mut r1 = RecordingRenderer::default();
    let mut r2 = RecordingRenderer::default();
    let mut l1 = FrameLoop::new(ManualClock::new(123.456));
    let mut l2 = FrameLoop::new(ManualClock::new(123.456));

    l1.run(&mut first, &mut r1, &mut Countdown(10)).unwrap();
    l2.run(&mut second, &mut r2, &mut Countdown(10)).unwrap();
    assert_eq!(r1.frames, r2.frames);
    assert_eq!(r1.frames.len(), 10);
}

#[test]
fn paused_scroll_stays_at_rest() {
    let (_, mut corridor) = corridor_from("[scroll]\nspeed = 0.0\n");
    let mut renderer = RecordingRenderer::default();
    let mut frame_loop = FrameLoop::new(ManualClock::new(1e6));

    frame_loop
        .run(&mut corridor, &mut renderer, &mut Countdown(3))
        .unwrap();
    for frame in &renderer.frames {
        assert_eq!(frame[0], 0.0);
        assert_eq!(frame[1], -2.0);
    }
}

#[test]
fn resize_reaches_the_surface_once_per_change() {
    let (_, mut corridor) = corridor_from("");
    let mut renderer = RecordingRenderer::default();
    let mut frame_loop = FrameLoop::new(ManualClock::default());

    corridor.events.push(HostEvent::Resized {
        width: 800.0,
        height: 600.0,
    });
    frame_loop.tick(&mut corridor, &mut renderer).unwrap();
    corridor.events.push(HostEvent::Resized {
        width: 800.0,
        height: 600.0,
    });
    frame_loop.tick(&mut corridor, &mut renderer).unwrap();
    corridor.events.push(HostEvent::Resized {
        width: 0.0,
        height: 0.0,
    });
    frame_loop.tick(&mut corridor, &mut renderer).unwrap();

    assert_eq!(renderer.surfaces.len(), 1);
    assert_eq!((renderer.surfaces[0].width, renderer.surfaces[0].height), (800, 600));
    assert_eq!(renderer.frames.len(), 3);
}

#[test]
fn invalid_configuration_is_rejected_before_the_first_frame() {
    let err = CorridorConfig::from_toml_str("[scroll]\ntile_length = -1.0\n").unwrap_err();
    assert!(matches!(err, CorridorError::Configuration(_)));
    assert!(!err.is_fatal());
}
