//! The frame loop.
//!
//! One [`FrameLoop::tick`] per display refresh, in a fixed order:
//!
//! 1. apply queued host events (resize, pixel density, pointer input)
//! 2. apply finished asset loads
//! 3. sample the scroll clock
//! 4. reposition terrain and obstacles
//! 5. advance camera damping
//! 6. draw
//!
//! Whoever owns the loop asks a [`FrameScheduler`] for the next frame. In the
//! application that is a winit redraw request; in tests it is a counter, so
//! the whole loop can run synchronously against a fake renderer.

use std::collections::VecDeque;

use image::DynamicImage;

use crate::{
    camera::CameraRig,
    corridor::Corridor,
    data_structures::{material::MapState, scene_graph::SceneGraph},
    error::CorridorError,
    resources::{AssetEvent, AssetSlot},
    scroll::ScrollClock,
    viewport::SurfaceTarget,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// Input from the host environment, sizes in logical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    Resized { width: f64, height: f64 },
    PixelDensity(f64),
    Rotate { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
    /// Positive zooms in.
    Zoom(f32),
}

#[derive(Debug, Default, Clone)]
pub struct EventQueue {
    events: VecDeque<HostEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: HostEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = HostEvent> + '_ {
        self.events.drain(..)
    }
}

/// Decides whether another frame follows.
pub trait FrameScheduler {
    /// Request the next frame. `false` stops the loop.
    fn next_frame(&mut self) -> bool;
}

/// Draws a scene through a camera. Implemented by the GPU context.
pub trait Renderer: SurfaceTarget {
    /// Hand a decoded texture to the GPU material behind `slot`.
    fn upload_texture(&mut self, slot: AssetSlot, image: &DynamicImage)
    -> Result<(), CorridorError>;

    fn draw(&mut self, scene: &SceneGraph, rig: &CameraRig) -> Result<(), CorridorError>;
}

#[derive(Debug)]
pub struct FrameLoop<C: ScrollClock> {
    state: LoopState,
    clock: C,
    frames: u64,
}

impl<C: ScrollClock> FrameLoop<C> {
    pub fn new(clock: C) -> Self {
        Self {
            state: LoopState::Idle,
            clock,
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Run one frame. Only a draw failure is returned; it is fatal to the loop.
    pub fn tick<R: Renderer + ?Sized>(
        &mut self,
        corridor: &mut Corridor,
        renderer: &mut R,
    ) -> Result<(), CorridorError> {
        if self.state == LoopState::Idle {
            log::info!("Frame loop running");
            self.state = LoopState::Running;
        }

        corridor.apply_events(renderer);
        while let Some(event) = corridor.assets.poll() {
            apply_asset(corridor, renderer, event);
        }

        let elapsed = self.clock.elapsed();
        corridor.scroll.update(elapsed, &mut corridor.scene);
        corridor.rig.update();

        renderer.draw(&corridor.scene, &corridor.rig)?;
        self.frames += 1;
        Ok(())
    }

    /// Tick until the scheduler declines another frame or drawing fails.
    pub fn run<R: Renderer + ?Sized, S: FrameScheduler + ?Sized>(
        &mut self,
        corridor: &mut Corridor,
        renderer: &mut R,
        scheduler: &mut S,
    ) -> Result<(), CorridorError> {
        loop {
            self.tick(corridor, renderer)?;
            if !scheduler.next_frame() {
                return Ok(());
            }
        }
    }
}

fn apply_asset<R: Renderer + ?Sized>(corridor: &mut Corridor, renderer: &mut R, event: AssetEvent) {
    let AssetEvent { slot, path, result } = event;
    let state = match result.and_then(|image| renderer.upload_texture(slot, &image)) {
        Ok(()) => {
            log::info!("Loaded {path}");
            MapState::Loaded
        }
        Err(e) => {
            log::warn!("{e}; keeping the fallback appearance");
            MapState::Failed
        }
    };
    corridor.scene.mark_map(slot.material, slot.kind, state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::CorridorConfig,
        data_structures::material::MapKind,
        scroll::ManualClock,
        viewport::SurfaceSize,
    };

    #[derive(Default)]
    struct FakeRenderer {
        draws: Vec<f32>,
        uploads: Vec<AssetSlot>,
        surfaces: Vec<SurfaceSize>,
        fail_after: Option<usize>,
    }

    impl SurfaceTarget for FakeRenderer {
        fn resize_surface(&mut self, size: SurfaceSize) {
            self.surfaces.push(size);
        }
    }

    impl Renderer for FakeRenderer {
        fn upload_texture(
            &mut self,
            slot: AssetSlot,
            _image: &DynamicImage,
        ) -> Result<(), CorridorError> {
            self.uploads.push(slot);
            Ok(())
        }

        fn draw(&mut self, scene: &SceneGraph, _rig: &CameraRig) -> Result<(), CorridorError> {
            if self.fail_after.is_some_and(|n| self.draws.len() >= n) {
                return Err(CorridorError::SurfaceUnavailable("lost".to_string()));
            }
            self.draws.push(scene.entities()[0].instance.position.z);
            Ok(())
        }
    }

    struct Frames(usize);

    impl FrameScheduler for Frames {
        fn next_frame(&mut self) -> bool {
            self.0 = self.0.saturating_sub(1);
            self.0 > 0
        }
    }

    fn corridor() -> Corridor {
        Corridor::new(&CorridorConfig::default()).unwrap()
    }

    #[test]
    fn first_tick_starts_the_loop() {
        let mut corridor = corridor();
        let mut renderer = FakeRenderer::default();
        let mut frame_loop = FrameLoop::new(ManualClock::new(10.0));
        assert_eq!(frame_loop.state(), LoopState::Idle);

        frame_loop.tick(&mut corridor, &mut renderer).unwrap();
        assert_eq!(frame_loop.state(), LoopState::Running);
        assert_eq!(frame_loop.frames(), 1);
        approx::assert_abs_diff_eq!(renderer.draws[0], 1.5, epsilon = 1e-6);
    }

    #[test]
    fn run_stops_when_the_scheduler_declines() {
        let mut corridor = corridor();
        let mut renderer = FakeRenderer::default();
        let mut frame_loop = FrameLoop::new(ManualClock::default());

        frame_loop
            .run(&mut corridor, &mut renderer, &mut Frames(5))
            .unwrap();
        assert_eq!(renderer.draws.len(), 5);
    }

    #[test]
    fn host_events_are_applied_before_drawing() {
        let mut corridor = corridor();
        let mut renderer = FakeRenderer::default();
        let mut frame_loop = FrameLoop::new(ManualClock::default());

        corridor.events.push(HostEvent::PixelDensity(3.0));
        corridor.events.push(HostEvent::Resized {
            width: 640.0,
            height: 480.0,
        });
        frame_loop.tick(&mut corridor, &mut renderer).unwrap();

        assert!(corridor.events.is_empty());
        assert_eq!(renderer.surfaces.len(), 1);
        assert_eq!(
            (renderer.surfaces[0].width, renderer.surfaces[0].height),
            (1280, 960)
        );
        approx::assert_abs_diff_eq!(
            corridor.rig.projection().aspect(),
            640.0 / 480.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn failed_displacement_keeps_the_loop_running_flat() {
        let mut corridor = corridor();
        let mut renderer = FakeRenderer::default();
        let mut frame_loop = FrameLoop::new(ManualClock::default());
        let material = corridor.terrain_material();

        let sender = corridor.assets.sender();
        sender
            .unbounded_send(AssetEvent {
                slot: AssetSlot {
                    material,
                    kind: MapKind::Displacement,
                },
                path: "textures/gutter_displacement.png".to_string(),
                result: Err(CorridorError::asset("textures/gutter_displacement.png", "rejected")),
            })
            .unwrap();
        sender
            .unbounded_send(AssetEvent {
                slot: AssetSlot {
                    material,
                    kind: MapKind::Color,
                },
                path: "textures/grid.png".to_string(),
                result: Ok(DynamicImage::new_rgba8(2, 2)),
            })
            .unwrap();

        frame_loop
            .run(&mut corridor, &mut renderer, &mut Frames(3))
            .unwrap();

        let terrain = corridor.scene.material(material).unwrap();
        assert_eq!(terrain.displacement_map.state, MapState::Failed);
        assert_eq!(terrain.color_map.state, MapState::Loaded);
        assert_eq!(terrain.effective_displacement_scale(), 0.0);
        assert_eq!(renderer.uploads.len(), 1);
        assert_eq!(renderer.draws.len(), 3);
    }

    #[test]
    fn draw_failure_stops_the_loop() {
        let mut corridor = corridor();
        let mut renderer = FakeRenderer {
            fail_after: Some(2),
            ..Default::default()
        };
        let mut frame_loop = FrameLoop::new(ManualClock::default());

        let err = frame_loop
            .run(&mut corridor, &mut renderer, &mut Frames(100))
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(renderer.draws.len(), 2);
        assert_eq!(frame_loop.frames(), 2);
    }

    #[test]
    fn event_queue_drains_in_order() {
        let mut queue = EventQueue::new();
        queue.push(HostEvent::Zoom(1.0));
        queue.push(HostEvent::Zoom(-1.0));
        assert_eq!(queue.len(), 2);
        let drained: Vec<_> = queue.drain().collect();
        assert_eq!(drained, vec![HostEvent::Zoom(1.0), HostEvent::Zoom(-1.0)]);
        assert!(queue.is_empty());
    }
}
