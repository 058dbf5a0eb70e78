//! heart-fall
//!
//! A decorative, full-window 3D background: extruded hearts and glowing text
//! sprites fall under gravity while the viewer orbits the scene. Runs natively
//! and on the web through WebGL.
//!
//! High-level modules
//! - `camera`: orbit camera, damped controller and view/projection uniforms
//! - `config`: every tunable constant plus the mobile/desktop overrides
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, instances and textures on the GPU
//! - `flow`: the event loop and the [`flow::GraphicsFlow`] lifecycle hooks
//! - `pipelines`: the opaque heart pipeline and the transparent sprite pipeline
//! - `resources`: heart geometry, neon text rasterization and asset loading
//! - `render`: render composition for efficient pipeline reuse
//! - `scene`: the falling-object simulation, independent of the GPU
//! - `shower`: the flow that puts the scene on screen
//! - `stage`: the scene bound to its configuration and sprite textures

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;
pub mod shower;
pub mod stage;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Open a window and run the heart shower until it is closed.
pub fn run() -> anyhow::Result<()> {
    flow::run(vec![shower::heart_shower()])
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), wasm_bindgen::JsValue> {
    run().map_err(|e| wasm_bindgen::JsValue::from_str(&format!("{e:#}")))
}
