//! Render composition and pipeline batching.
//!
//! Flows describe what they want drawn with a [`Render`]. The engine sorts the
//! parts into pipeline batches: every opaque [`Instanced`] batch is drawn
//! first, then every [`Sprites`] batch in submission order, so sprites can rely
//! on the depth-sorted order they were built in.

use std::ops::Range;

use crate::data_structures::model::Mesh;

/// An opaque mesh drawn once per instance in `instance`.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub mesh: &'a Mesh,
    pub material: &'a wgpu::BindGroup,
    pub amount: u32,
}

/// Billboards sharing one instance buffer and tint.
///
/// `runs` maps consecutive instance ranges to the texture they sample.
pub struct Sprites<'a> {
    pub instance: &'a wgpu::Buffer,
    pub tint: &'a wgpu::BindGroup,
    pub runs: Vec<(&'a wgpu::BindGroup, Range<u32>)>,
}

/// Specifies how a flow should be rendered.
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders an opaque instanced mesh
/// - `Transparent(Sprites)` renders alpha-blended billboards
/// - `Composed(Vec<Render>)` recursively renders a composition
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Transparent(Sprites<'a>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    pub(crate) fn set_pipelines(self, basics: &mut Vec<Instanced<'a>>, trans: &mut Vec<Sprites<'a>>) {
        match self {
            Render::Default(instanced) => basics.push(instanced),
            Render::Transparent(sprites) => trans.push(sprites),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.set_pipelines(basics, trans)),
            Render::None => (),
        }
    }
}
