/// Per-frame pipeline: flatten, flag visibility, project, rasterize
use nalgebra::Vector3;

use crate::entity::{EntityKind, Rgb};
use crate::geometry::{tessellate, ColoredVertex};
use crate::projection::{in_frame, project, Viewport};
use crate::raster::FrameBuffer;
use crate::scene::{Scene, SceneError};

/// One frame's geometry in NDC, as consumed by a presenter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameData {
    /// Triangle list, three vertices per triangle
    pub triangles: Vec<ColoredVertex>,
    pub points: Vec<ColoredVertex>,
}

impl FrameData {
    pub fn triangle_count(&self) -> usize {
        self.triangles.len() / 3
    }

    /// Interleaved `(x, y, r, g, b)` triangle vertices
    pub fn triangle_floats(&self) -> Vec<f32> {
        self.triangles.iter().flat_map(|v| v.to_floats()).collect()
    }

    /// Interleaved `(x, y, r, g, b)` point vertices
    pub fn point_floats(&self) -> Vec<f32> {
        self.points.iter().flat_map(|v| v.to_floats()).collect()
    }
}

/// Camera state captured once per frame
struct View {
    orientation: Vector3<f32>,
    position: Vector3<f32>,
    fov: (f32, f32),
    viewport: Viewport,
}

impl View {
    fn project(&self, point: &Vector3<f32>) -> [f32; 2] {
        project(point, &self.orientation, &self.position, self.fov, self.viewport)
    }
}

pub struct Renderer {
    pub background: Rgb,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            background: Rgb::BLACK,
        }
    }

    /// Build the frame's triangle and point lists, refreshing every attached
    /// entity's `in_frame` flag.
    ///
    /// Fails on the first index triple that names a missing entity.
    pub fn build_frame(&self, scene: &mut Scene, viewport: Viewport) -> Result<FrameData, SceneError> {
        let camera = scene.camera();
        let view = View {
            orientation: camera.effective_orientation(),
            position: camera.position,
            fov: (camera.fov_width_deg(), camera.fov_height_deg()),
            viewport,
        };
        let mut frame = FrameData::default();

        for id in scene.flatten() {
            let Some(entity) = scene.entity_mut(id) else {
                continue;
            };
            match entity.kind {
                kind if kind.is_screen_space() => {
                    entity.in_frame = viewport.contains_pixel(entity.position.x, entity.position.y);
                    frame.triangles.extend(tessellate(entity, viewport));
                }
                EntityKind::Vertex => {
                    let ndc = view.project(&entity.position);
                    entity.in_frame = in_frame(ndc);
                    if entity.in_frame {
                        frame.points.push(ColoredVertex { ndc, color: entity.color });
                    }
                }
                _ => {
                    entity.in_frame = in_frame(view.project(&entity.position));
                }
            }
        }

        for triple in scene.index_buffer() {
            for &id in triple {
                let entity = scene.entity(id).ok_or(SceneError::DanglingEntity(id))?;
                frame.triangles.push(ColoredVertex {
                    ndc: view.project(&entity.position),
                    color: entity.color,
                });
            }
        }

        Ok(frame)
    }

    /// Draw triangles first, then points on top
    pub fn rasterize(&self, frame: &FrameData, target: &mut FrameBuffer) {
        let viewport = viewport_of(target);
        for triangle in frame.triangles.chunks_exact(3) {
            target.draw_triangle_color(
                viewport.ndc_to_pixel(triangle[0].ndc),
                viewport.ndc_to_pixel(triangle[1].ndc),
                viewport.ndc_to_pixel(triangle[2].ndc),
                triangle[0].color,
                triangle[1].color,
                triangle[2].color,
            );
        }
        for point in &frame.points {
            target.draw_point(viewport.ndc_to_pixel(point.ndc), point.color);
        }
    }

    /// Clear `target`, then build and rasterize a frame sized to it
    pub fn render(&self, scene: &mut Scene, target: &mut FrameBuffer) -> Result<FrameData, SceneError> {
        target.clear(self.background);
        let frame = self.build_frame(scene, viewport_of(target))?;
        self.rasterize(&frame, target);
        Ok(frame)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn viewport_of(target: &FrameBuffer) -> Viewport {
    Viewport::new(target.width() as u32, target.height() as u32)
}
