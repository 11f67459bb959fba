/// Azimuth/elevation camera with a fixed virtual sensor
use nalgebra::Vector3;
use thiserror::Error;

/// Sensor width in conceptual units (1000 pixels = 1 unit)
pub const SENSOR_WIDTH: f32 = 36.0;
/// Sensor height in conceptual units
pub const SENSOR_HEIGHT: f32 = 24.0;

/// Heading used when the orientation has no direction
pub const DEFAULT_FORWARD: Vector3<f32> = Vector3::new(0.0, 1.0, 0.0);

#[derive(Debug, Error, PartialEq)]
pub enum CameraError {
    #[error("camera orientation must be non-zero")]
    ZeroOrientation,
    #[error("camera zoom must be positive and finite, got {0}")]
    InvalidZoom(f32),
}

/// Camera state. Position and orientation are overwritten freely by drivers
/// between frames; the field of view is fixed at construction.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vector3<f32>,
    /// Viewing direction, not necessarily unit length
    pub orientation: Vector3<f32>,
    /// Driver-owned motion state, not read by the renderer
    pub velocity: Vector3<f32>,
    zoom: f32,
    fov_width_deg: f32,
    fov_height_deg: f32,
}

impl Camera {
    pub fn new(
        position: Vector3<f32>,
        orientation: Vector3<f32>,
        zoom: f32,
    ) -> Result<Self, CameraError> {
        if orientation.norm_squared() == 0.0 {
            return Err(CameraError::ZeroOrientation);
        }
        if !zoom.is_finite() || zoom <= 0.0 {
            return Err(CameraError::InvalidZoom(zoom));
        }

        Ok(Self {
            position,
            orientation,
            velocity: Vector3::zeros(),
            zoom,
            fov_width_deg: fov_degrees(SENSOR_WIDTH, zoom),
            fov_height_deg: fov_degrees(SENSOR_HEIGHT, zoom),
        })
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.position = position;
    }

    /// No validation; a zero orientation is clamped at projection time
    pub fn set_orientation(&mut self, orientation: Vector3<f32>) {
        if orientation.norm_squared() == 0.0 && self.orientation.norm_squared() != 0.0 {
            log::warn!("camera orientation set to zero, projecting along default forward");
        }
        self.orientation = orientation;
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn fov_width_deg(&self) -> f32 {
        self.fov_width_deg
    }

    pub fn fov_height_deg(&self) -> f32 {
        self.fov_height_deg
    }

    /// Orientation to project with, falling back to `DEFAULT_FORWARD`
    pub fn effective_orientation(&self) -> Vector3<f32> {
        if self.orientation.norm_squared() == 0.0 {
            DEFAULT_FORWARD
        } else {
            self.orientation
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            orientation: Vector3::new(0.0, 100.0, 0.0),
            velocity: Vector3::zeros(),
            zoom: 40.0,
            fov_width_deg: fov_degrees(SENSOR_WIDTH, 40.0),
            fov_height_deg: fov_degrees(SENSOR_HEIGHT, 40.0),
        }
    }
}

fn fov_degrees(sensor: f32, zoom: f32) -> f32 {
    2.0 * (sensor / (2.0 * zoom * 1000.0)).atan() * 180.0 / std::f32::consts::PI
}
