/// Colored NDC vertices and screen-space tessellation of primitive entities
use crate::entity::{Entity, EntityKind, Rgb};
use crate::projection::Viewport;

/// Segments used to approximate a circle
pub const CIRCLE_SEGMENTS: usize = 32;

/// A vertex ready for presentation: NDC position plus color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredVertex {
    pub ndc: [f32; 2],
    pub color: Rgb,
}

impl ColoredVertex {
    pub fn new(x: f32, y: f32, color: Rgb) -> Self {
        Self { ndc: [x, y], color }
    }

    /// `(x, y, r, g, b)` with color channels in `[0, 1]`
    pub fn to_floats(&self) -> [f32; 5] {
        let [r, g, b] = self.color.to_unit();
        [self.ndc[0], self.ndc[1], r, g, b]
    }
}

/// Triangle-list vertices for a primitive entity.
///
/// Primitives are anchored in screen pixels (`position.x`, `position.y`) and
/// sized in pixels; they are not projected through the camera. Generic and
/// vertex entities produce nothing.
pub fn tessellate(entity: &Entity, viewport: Viewport) -> Vec<ColoredVertex> {
    let color = entity.color;
    let [x, y] = viewport.pixel_to_ndc(entity.position.x, entity.position.y);
    let sx = 2.0 / viewport.width as f32;
    let sy = 2.0 / viewport.height as f32;
    let v = |x: f32, y: f32| ColoredVertex::new(x, y, color);

    match entity.kind {
        EntityKind::Rectangle { width, height } => {
            let (w, h) = (width * sx, height * sy);
            vec![
                v(x, y),
                v(x + w, y),
                v(x, y - h),
                v(x + w, y),
                v(x + w, y - h),
                v(x, y - h),
            ]
        }
        EntityKind::Circle { radius } => {
            let (rx, ry) = (radius * sx, radius * sy);
            let step = std::f32::consts::TAU / CIRCLE_SEGMENTS as f32;
            let mut out = Vec::with_capacity(CIRCLE_SEGMENTS * 3);
            for i in 0..CIRCLE_SEGMENTS {
                let (a, b) = (step * i as f32, step * (i + 1) as f32);
                out.push(v(x, y));
                out.push(v(x + rx * a.cos(), y + ry * a.sin()));
                out.push(v(x + rx * b.cos(), y + ry * b.sin()));
            }
            out
        }
        EntityKind::Triangle { size } => {
            let (w, h) = (size * sx, size * sy);
            vec![v(x, y), v(x + w, y), v(x + w / 2.0, y - h)]
        }
        EntityKind::Generic | EntityKind::Vertex => Vec::new(),
    }
}
