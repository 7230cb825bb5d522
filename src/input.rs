//! Translates winit pointer input into [`HostEvent`]s for the orbit camera.
//!
//! Left drag rotates, right drag pans, the wheel zooms. Cursor positions are
//! converted to logical pixels so the camera speed does not depend on the
//! display density.

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use crate::frame::HostEvent;

/// Pixel deltas per wheel "line" on touchpads and high-resolution wheels.
const PIXELS_PER_LINE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Drag {
    #[default]
    None,
    Rotate,
    Pan,
}

#[derive(Debug, Clone, Default)]
pub struct PointerTracker {
    drag: Drag,
    last: Option<(f64, f64)>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn button(&mut self, button: MouseButton, pressed: bool) {
        self.drag = match (button, pressed, self.drag) {
            (MouseButton::Left, true, _) => Drag::Rotate,
            (MouseButton::Right, true, _) => Drag::Pan,
            // Only the button that started the drag ends it.
            (MouseButton::Left, false, Drag::Rotate) | (MouseButton::Right, false, Drag::Pan) => {
                Drag::None
            }
            _ => self.drag,
        };
    }

    /// Record a cursor position in logical pixels.
    pub fn moved(&mut self, x: f64, y: f64) -> Option<HostEvent> {
        let previous = self.last.replace((x, y));
        let (px, py) = previous?;
        let (dx, dy) = ((x - px) as f32, (y - py) as f32);
        match self.drag {
            Drag::None => None,
            Drag::Rotate => Some(HostEvent::Rotate { dx, dy }),
            Drag::Pan => Some(HostEvent::Pan { dx, dy }),
        }
    }

    pub fn left(&mut self) {
        self.last = None;
        self.drag = Drag::None;
    }

    pub fn wheel(&self, delta: MouseScrollDelta) -> Option<HostEvent> {
        let steps = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_LINE) as f32,
        };
        (steps != 0.0).then_some(HostEvent::Zoom(steps))
    }

    /// Feed a window event; `scale_factor` converts physical cursor positions.
    pub fn handle(&mut self, event: &WindowEvent, scale_factor: f64) -> Option<HostEvent> {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.button(*button, *state == ElementState::Pressed);
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                let logical = position.to_logical::<f64>(scale_factor);
                self.moved(logical.x, logical.y)
            }
            WindowEvent::CursorLeft { .. } => {
                self.left();
                None
            }
            WindowEvent::MouseWheel { delta, .. } => self.wheel(*delta),
            _ => None,
        }
    }
}
