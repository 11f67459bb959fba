/// AZEL Web - WASM bindings feeding a JavaScript/WebGL presenter
///
/// The scene is built and projected here; the host page uploads the
/// interleaved `(x, y, r, g, b)` buffers and draws them as a triangle list
/// and a point list.
use azel_core::{Camera, EntityId, Renderer, Scene, Viewport};
use nalgebra::Vector3;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct WebRenderer {
    scene: Scene,
    renderer: Renderer,
    viewport: Viewport,
    triangles: Vec<f32>,
    points: Vec<f32>,
}

#[wasm_bindgen]
impl WebRenderer {
    #[wasm_bindgen(constructor)]
    pub fn new(width: u32, height: u32) -> Result<WebRenderer, JsValue> {
        Ok(WebRenderer {
            scene: Scene::default(),
            renderer: Renderer::new(),
            viewport: Viewport::new(width, height),
            triangles: Vec::new(),
            points: Vec::new(),
        })
    }

    /// Replace the camera; the field of view is derived from `zoom`
    pub fn init_camera(&mut self, position: &[f32], orientation: &[f32], zoom: f32) -> Result<(), JsValue> {
        let camera = Camera::new(vec3(position)?, vec3(orientation)?, zoom).map_err(to_js)?;
        *self.scene.camera_mut() = camera;
        Ok(())
    }

    pub fn populate_demo(&mut self, floor_step: f32) -> Result<(), JsValue> {
        self.scene.populate_demo(floor_step).map_err(to_js)
    }

    /// Import mesh text; returns the id of the mesh root
    pub fn load_mesh(&mut self, name: &str, obj_text: &str, mtl_text: &str, scale: f32) -> Result<u32, JsValue> {
        match self.scene.import_mesh(name, obj_text, mtl_text, scale) {
            Ok(root) => Ok(root.0),
            Err(e) => {
                log::warn!("mesh '{}' not loaded: {}", name, e);
                Err(to_js(e))
            }
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height);
    }

    /// Update camera position and heading between frames
    pub fn set_camera(&mut self, px: f32, py: f32, pz: f32, ox: f32, oy: f32, oz: f32) {
        let camera = self.scene.camera_mut();
        camera.set_position(Vector3::new(px, py, pz));
        camera.set_orientation(Vector3::new(ox, oy, oz));
    }

    /// Move an entity to an absolute position
    pub fn move_entity(&mut self, id: u32, x: f32, y: f32, z: f32) -> bool {
        match self.scene.entity_mut(EntityId(id)) {
            Some(entity) => {
                entity.move_to(x, y, z);
                true
            }
            None => false,
        }
    }

    /// Build a frame
    pub fn render(&mut self) -> Result<(), JsValue> {
        let frame = self
            .renderer
            .build_frame(&mut self.scene, self.viewport)
            .map_err(to_js)?;
        self.triangles = frame.triangle_floats();
        self.points = frame.point_floats();
        Ok(())
    }

    /// Interleaved triangle-list vertices of the last frame
    pub fn triangle_data(&self) -> Vec<f32> {
        self.triangles.clone()
    }

    /// Interleaved point vertices of the last frame
    pub fn point_data(&self) -> Vec<f32> {
        self.points.clone()
    }
}

fn vec3(values: &[f32]) -> Result<Vector3<f32>, JsValue> {
    match values {
        [x, y, z] => Ok(Vector3::new(*x, *y, *z)),
        _ => Err(JsValue::from_str("expected three components")),
    }
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_frame_fills_buffers() {
        let mut web = WebRenderer::new(800, 600).unwrap();
        web.populate_demo(2.0).unwrap();
        web.render().unwrap();

        let triangles = web.triangle_data();
        assert!(!triangles.is_empty());
        assert_eq!(triangles.len() % 15, 0);
        assert_eq!(web.point_data().len() % 5, 0);
    }

    #[test]
    fn test_move_entity_reports_unknown_ids() {
        let mut web = WebRenderer::new(320, 240).unwrap();
        web.populate_demo(2.0).unwrap();
        assert!(web.move_entity(0, 1.0, 2.0, 3.0));
        assert!(!web.move_entity(u32::MAX, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_set_camera_updates_scene_camera() {
        let mut web = WebRenderer::new(320, 240).unwrap();
        web.set_camera(1.0, 2.0, 3.0, 0.0, 1.0, 0.0);
        assert_eq!(web.scene.camera().position, Vector3::new(1.0, 2.0, 3.0));
    }
}
