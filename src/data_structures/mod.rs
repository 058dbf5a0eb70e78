//! Data structures shared by the GPU side of the scene.
//!
//! - `model` contains the vertex format, mesh buffers and surface materials
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-instance transformation data and growable instance buffers

pub mod instance;
pub mod model;
pub mod texture;
