/// AZEL Core Library - scene graph, azimuth/elevation projection and software rasterizer
///
/// This library owns the rendering pipeline: an arena-backed scene graph,
/// an OBJ/MTL subset importer with vertex welding, the billboard-spherical
/// camera projection and a color-interpolating triangle rasterizer.

pub mod camera;
pub mod entity;
pub mod geometry;
pub mod math;
pub mod mesh;
pub mod projection;
pub mod raster;
pub mod render;
pub mod scene;

// Re-export commonly used types
pub use camera::{Camera, CameraError};
pub use entity::{Entity, EntityDesc, EntityId, EntityKind, Rgb};
pub use geometry::ColoredVertex;
pub use mesh::{Mesh, MeshError, MeshVertex};
pub use projection::Viewport;
pub use raster::FrameBuffer;
pub use render::{FrameData, Renderer};
pub use scene::{FsSource, Scene, SceneError, TextSource};
