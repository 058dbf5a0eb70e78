//! The heart mesh: a hand-authored Bézier outline extruded into a slab.
//!
//! The outline is sampled at a fixed number of steps per curve so the cap
//! tessellation and the side walls share exactly the same boundary.

use anyhow::anyhow;
use lyon::{
    geom::{CubicBezierSegment, QuadraticBezierSegment, point},
    math::Point,
    path::{Path, PathEvent},
    tessellation::{BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers},
};

use crate::data_structures::model::{MeshData, MeshVertex};

/// Points closer than this are treated as the same outline vertex.
const WELD_EPSILON: f32 = 1e-6;

/// The heart outline as a closed path of six cubic curves.
///
/// In path space the heart is upside down (the cleft is at the bottom); the
/// scene flips every instance about X.
pub fn heart_path() -> Path {
    let mut builder = Path::builder();
    builder.begin(point(0.25, 0.25));
    builder.cubic_bezier_to(point(0.25, 0.25), point(0.2, 0.0), point(0.0, 0.0));
    builder.cubic_bezier_to(point(-0.3, 0.0), point(-0.3, 0.35), point(-0.3, 0.35));
    builder.cubic_bezier_to(point(-0.3, 0.55), point(-0.1, 0.77), point(0.25, 0.95));
    builder.cubic_bezier_to(point(0.6, 0.77), point(0.8, 0.55), point(0.8, 0.35));
    builder.cubic_bezier_to(point(0.8, 0.35), point(0.8, 0.0), point(0.5, 0.0));
    builder.cubic_bezier_to(point(0.35, 0.0), point(0.25, 0.25), point(0.25, 0.25));
    builder.close();
    builder.build()
}

/// Sample `path` into a closed, counter-clockwise polygon.
///
/// Every curve contributes `segments` uniform parameter steps. Consecutive
/// duplicates and the closing duplicate are dropped.
pub fn outline(path: &Path, segments: usize) -> Vec<[f32; 2]> {
    let segments = segments.max(1);
    let steps = |i: usize| i as f32 / segments as f32;
    let mut points: Vec<Point> = Vec::new();
    let mut push = |p: Point| {
        if points.last().is_none_or(|last| (*last - p).length() > WELD_EPSILON) {
            points.push(p);
        }
    };
    for event in path.iter() {
        match event {
            PathEvent::Begin { at } => push(at),
            PathEvent::Line { from, to } => {
                push(from);
                push(to);
            }
            PathEvent::Quadratic { from, ctrl, to } => {
                let curve = QuadraticBezierSegment { from, ctrl, to };
                (0..=segments).for_each(|i| push(curve.sample(steps(i))));
            }
            PathEvent::Cubic {
                from,
                ctrl1,
                ctrl2,
                to,
            } => {
                let curve = CubicBezierSegment {
                    from,
                    ctrl1,
                    ctrl2,
                    to,
                };
                (0..=segments).for_each(|i| push(curve.sample(steps(i))));
            }
            PathEvent::End { .. } => (),
        }
    }
    if points.len() > 1 && (points[0] - points[points.len() - 1]).length() <= WELD_EPSILON {
        points.pop();
    }

    let mut polygon: Vec<[f32; 2]> = points.into_iter().map(|p| p.to_array()).collect();
    if signed_area(&polygon) < 0.0 {
        polygon.reverse();
    }
    polygon
}

/// Shoelace area; positive for counter-clockwise polygons.
pub fn signed_area(polygon: &[[f32; 2]]) -> f32 {
    let n = polygon.len();
    (0..n)
        .map(|i| {
            let [x0, y0] = polygon[i];
            let [x1, y1] = polygon[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum::<f32>()
        * 0.5
}

fn cross(o: [f32; 2], a: [f32; 2], b: [f32; 2]) -> f32 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

/// A flat cap: tessellated vertices and counter-clockwise triangles over them.
#[derive(Clone, Debug, Default)]
pub struct Cap {
    pub vertices: Vec<[f32; 2]>,
    pub triangles: Vec<[u32; 3]>,
}

impl Cap {
    pub fn area(&self) -> f32 {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                cross(
                    self.vertices[a as usize],
                    self.vertices[b as usize],
                    self.vertices[c as usize],
                ) * 0.5
            })
            .sum()
    }
}

/// Fill-tessellate a closed polygon into a cap.
pub fn tessellate(polygon: &[[f32; 2]]) -> anyhow::Result<Cap> {
    let Some((first, rest)) = polygon.split_first() else {
        return Ok(Cap::default());
    };
    let mut builder = Path::builder();
    builder.begin(Point::from(*first));
    for &p in rest {
        builder.line_to(Point::from(p));
    }
    builder.close();
    let path = builder.build();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    FillTessellator::new()
        .tessellate_path(
            &path,
            &FillOptions::non_zero(),
            &mut BuffersBuilder::new(&mut buffers, |vertex: FillVertex| {
                vertex.position().to_array()
            }),
        )
        .map_err(|e| anyhow!("failed to tessellate the heart outline: {e:?}"))?;

    let vertices = buffers.vertices;
    let triangles = buffers
        .indices
        .chunks_exact(3)
        .map(|t| {
            let [a, b, c] = [t[0], t[1], t[2]];
            let area = cross(vertices[a as usize], vertices[b as usize], vertices[c as usize]);
            if area < 0.0 { [a, c, b] } else { [a, b, c] }
        })
        .collect();
    Ok(Cap {
        vertices,
        triangles,
    })
}

/// Extrude a counter-clockwise polygon from `z = 0` to `z = depth`.
///
/// Both caps come from the fill tessellation of `polygon`; every side quad
/// gets its own four vertices so the sides are flat shaded.
pub fn extrude(polygon: &[[f32; 2]], depth: f32) -> anyhow::Result<MeshData> {
    let cap = tessellate(polygon)?;
    let mut mesh = MeshData::default();
    let n = cap.vertices.len() as u32;

    // back cap, facing -Z
    for &[x, y] in &cap.vertices {
        mesh.vertices.push(MeshVertex {
            position: [x, y, 0.0],
            normal: [0.0, 0.0, -1.0],
        });
    }
    for &[a, b, c] in &cap.triangles {
        mesh.indices.extend_from_slice(&[a, c, b]);
    }

    // front cap, facing +Z
    for &[x, y] in &cap.vertices {
        mesh.vertices.push(MeshVertex {
            position: [x, y, depth],
            normal: [0.0, 0.0, 1.0],
        });
    }
    for &[a, b, c] in &cap.triangles {
        mesh.indices.extend_from_slice(&[n + a, n + b, n + c]);
    }

    for i in 0..polygon.len() {
        let [x0, y0] = polygon[i];
        let [x1, y1] = polygon[(i + 1) % polygon.len()];
        let (dx, dy) = (x1 - x0, y1 - y0);
        let len = (dx * dx + dy * dy).sqrt();
        if len <= f32::EPSILON {
            continue;
        }
        let normal = [dy / len, -dx / len, 0.0];
        let base = mesh.vertices.len() as u32;
        for position in [[x0, y0, 0.0], [x1, y1, 0.0], [x1, y1, depth], [x0, y0, depth]] {
            mesh.vertices.push(MeshVertex { position, normal });
        }
        mesh.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Ok(mesh)
}

/// The extruded heart for the given depth and curve resolution.
pub fn heart_mesh(depth: f32, curve_segments: usize) -> anyhow::Result<MeshData> {
    extrude(&outline(&heart_path(), curve_segments), depth)
}
