//! corridor-ngin
//!
//! An endlessly scrolling 3D corridor rendered with wgpu, on native targets
//! and in the browser. Two terrain tiles and a small pool of obstacles are
//! allocated once; every frame their positions are re-derived from elapsed
//! time with modular arithmetic, so the ground appears to run forever.
//!
//! High-level modules
//! - `scroll`: the infinite-scroll controller and its clocks
//! - `corridor`: builds the scene from a [`config::CorridorConfig`] and owns the controllers
//! - `frame`: the per-frame loop and the [`frame::Renderer`] seam
//! - `camera`: orbit camera with damping, projection and camera uniforms
//! - `viewport`: keeps projection aspect and surface size in step with the window
//! - `data_structures`: meshes, materials, lights, instances and the scene graph
//! - `pipelines`: the corridor render pipeline and its lighting uniforms
//! - `resources`: background texture loading
//! - `context` / `render`: the wgpu implementation of [`frame::Renderer`]
//! - `flow`: the winit application that ties everything to a window
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod corridor;
pub mod data_structures;
pub mod error;
pub mod flow;
pub mod frame;
pub mod input;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scroll;
pub mod viewport;

pub use config::CorridorConfig;
pub use corridor::Corridor;
pub use error::CorridorError;
pub use frame::{FrameLoop, FrameScheduler, HostEvent, Renderer};
pub use scroll::{InfiniteScrollController, ManualClock, ScrollClock, SystemClock};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point; renders into the `#canvas` element with the default configuration.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    flow::run(CorridorConfig::default()).map_err(|e| JsValue::from_str(&e.to_string()))
}
