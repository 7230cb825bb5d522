//! Scene data structures: geometry, materials, lights, instances and the
//! scene graph that ties them together.
//!
//! - `mesh` holds procedural geometry and its GPU buffers
//! - `material` describes surface appearance and its texture slots
//! - `texture` wraps GPU textures and their creation
//! - `light` holds ambient, fog and spotlight parameters
//! - `instance` holds per-instance transformation data
//! - `scene_graph` owns all of the above for one corridor

pub mod instance;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene_graph;
pub mod texture;
