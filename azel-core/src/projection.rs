/// Billboard-spherical projection from world space to NDC
///
/// A point's azimuth/elevation as seen from the camera is added to the
/// camera's own heading and scaled by the field of view. This is not a
/// perspective matrix and is kept that way to preserve the look of the
/// renderer.
use nalgebra::Vector3;

use crate::camera::Camera;
use crate::math::{azimuth_elevation, wrap_degrees};

/// Output surface dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Project a world point through `camera`
    pub fn project(&self, camera: &Camera, point: &Vector3<f32>) -> [f32; 2] {
        project(
            point,
            &camera.effective_orientation(),
            &camera.position,
            (camera.fov_width_deg(), camera.fov_height_deg()),
            *self,
        )
    }

    /// Pixel coordinates to NDC
    pub fn pixel_to_ndc(&self, x: f32, y: f32) -> [f32; 2] {
        [
            (x / self.width as f32) * 2.0 - 1.0,
            1.0 - (y / self.height as f32) * 2.0,
        ]
    }

    /// NDC to pixel coordinates
    pub fn ndc_to_pixel(&self, ndc: [f32; 2]) -> (f32, f32) {
        (
            (ndc[0] + 1.0) * 0.5 * self.width as f32,
            (1.0 - ndc[1]) * 0.5 * self.height as f32,
        )
    }

    pub fn contains_pixel(&self, x: f32, y: f32) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f32 && y < self.height as f32
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

/// Project `point` for a camera at `camera_position` facing
/// `camera_orientation`, with `fov` given as (width, height) in degrees.
///
/// Combined angles are wrapped into `[-180, 180)` so the image stays
/// continuous when the heading crosses the rear of the camera.
pub fn project(
    point: &Vector3<f32>,
    camera_orientation: &Vector3<f32>,
    camera_position: &Vector3<f32>,
    fov: (f32, f32),
    viewport: Viewport,
) -> [f32; 2] {
    let (camera_azimuth, camera_elevation) = azimuth_elevation(camera_orientation);
    let (relative_azimuth, relative_elevation) = azimuth_elevation(&(point - camera_position));

    let azimuth = wrap_degrees(relative_azimuth + camera_azimuth);
    let elevation = wrap_degrees(relative_elevation + camera_elevation);

    let width = viewport.width as f32;
    let height = viewport.height as f32;

    // 1000 pixels per sensor unit
    let screen_x = width / 2.0 + azimuth / fov.0 * width / 1000.0;
    let screen_y = height / 2.0 + elevation / fov.1 * height / 1000.0;

    viewport.pixel_to_ndc(screen_x, screen_y)
}

/// Whether an NDC coordinate lands on screen
pub fn in_frame(ndc: [f32; 2]) -> bool {
    ndc[0].abs() <= 1.0 && ndc[1].abs() <= 1.0
}
