//! Render pipelines and the GPU-side uniforms they consume.
//!
//! - `scene` builds the one pipeline used for terrain and obstacles
//! - `light` packs ambient, fog and spotlight parameters into a uniform

pub mod light;
pub mod scene;
