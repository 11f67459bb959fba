/// Terminal front end: frame loop, keyboard driver and presentation
use azel_core::math::{build_basis, rotation_matrix};
use azel_core::{
    Camera, CameraError, FrameBuffer, Renderer, Scene, SceneError, TextSource,
};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self},
};
use nalgebra::{Rotation3, Unit, Vector3};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};
use thiserror::Error;

pub mod config;
pub mod renderer;

pub use config::{AppConfig, ConfigError, MovementConfig};
pub use renderer::TerminalPresenter;

/// Name given to entities that drift towards the camera
pub const DRIFT_TAG: &str = "moving_over";

/// Unit cube imported when `show_cube` is set
pub const CUBE_OBJ: &str = "\
o cube
v -1 -1 -1
v 1 -1 -1
v 1 1 -1
v -1 1 -1
v -1 -1 1
v 1 -1 1
v 1 1 1
v -1 1 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 2/2 3/3 4/4
f 5/1 8/4 7/3 6/2
f 1/1 5/2 6/3 2/4
f 2/1 6/2 7/3 3/4
f 3/1 7/2 8/3 4/4
f 5/1 1/2 4/3 8/4
";

/// How far ahead of the origin the cube is placed
const CUBE_DISTANCE: f32 = 12.0;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),
}

/// Build the scene described by `config`. Meshes that fail to load are
/// logged and skipped.
pub fn build_scene(config: &AppConfig, source: &dyn TextSource) -> Result<Scene, AppError> {
    let camera = Camera::new(
        Vector3::from(config.camera.position),
        Vector3::from(config.camera.orientation),
        config.camera.zoom,
    )?;
    let mut scene = Scene::new(camera);

    if config.demo_scene {
        scene.populate_demo(config.floor_step)?;
    }

    if config.show_cube {
        let cube = scene.import_mesh("cube", CUBE_OBJ, "", 1.0)?;
        for id in scene.flatten_from(cube) {
            if let Some(entity) = scene.entity_mut(id) {
                entity.move_by(0.0, CUBE_DISTANCE, 0.0);
            }
        }
    }

    for mesh in &config.meshes {
        match scene.import_mesh_from(source, &mesh.name, &mesh.obj, mesh.mtl.as_deref(), mesh.scale) {
            Ok(_) => log::info!("loaded mesh '{}' from {}", mesh.name, mesh.obj),
            Err(e) => log::warn!("skipping mesh '{}': {}", mesh.name, e),
        }
    }

    Ok(scene)
}

/// Main application struct for terminal rendering
pub struct TerminalApp {
    scene: Scene,
    config: AppConfig,
    renderer: Renderer,
    presenter: TerminalPresenter,
    framebuffer: FrameBuffer,
    running: bool,
    last_update: Instant,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(scene: Scene, config: AppConfig) -> io::Result<Self> {
        let (columns, rows) = terminal::size()?;
        let presenter = TerminalPresenter::new(columns, rows);
        let (width, height) = presenter.framebuffer_size();

        Ok(Self {
            scene,
            config,
            renderer: Renderer::new(),
            presenter,
            framebuffer: FrameBuffer::new(width, height),
            running: true,
            last_update: Instant::now(),
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> Result<(), AppError> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> Result<(), AppError> {
        let target_frame_time = Duration::from_millis(1000 / self.config.target_fps.max(1) as u64);

        while self.running {
            let frame_start = Instant::now();

            // Handle input
            while event::poll(Duration::from_millis(0))? {
                self.handle_event(event::read()?);
            }

            // Update
            let now = Instant::now();
            let dt = (now - self.last_update).as_secs_f32();
            self.last_update = now;
            self.update(dt);

            // Render
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, .. }) => self.handle_key(code),
            Event::Resize(columns, rows) => {
                self.presenter.resize(columns, rows);
                let (width, height) = self.presenter.framebuffer_size();
                self.framebuffer.resize(width, height);
                log::debug!("resized to {}x{} pixels", width, height);
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.running = false,
            _ => apply_key(self.scene.camera_mut(), &self.config.movement, code),
        }
    }

    fn update(&mut self, dt: f32) {
        step_world(&mut self.scene, &self.config.movement, dt);
    }

    fn render(&mut self) -> Result<(), AppError> {
        // A dangling index triple ends the session with an error
        let frame = self.renderer.render(&mut self.scene, &mut self.framebuffer)?;

        // Output to terminal
        let mut stdout = stdout();
        self.presenter.draw(&self.framebuffer, &mut stdout)?;

        // Draw UI overlay
        let camera = self.scene.camera();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetBackgroundColor(Color::Black),
            SetForegroundColor(Color::Yellow),
            Print(format!(
                "AZEL | FPS: {:.1} | tris: {} pts: {} | cam ({:.1}, {:.1}, {:.1}) | WASD/E/R=Move Arrows=Look Q=Quit",
                self.fps,
                frame.triangle_count(),
                frame.points.len(),
                camera.position.x,
                camera.position.y,
                camera.position.z,
            )),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}

/// Apply one key press to the camera. Movement keys add velocity along the
/// camera basis; arrows turn (about world Z) and pitch (about the camera's
/// right axis) by `turn_speed_deg`.
pub fn apply_key(camera: &mut Camera, movement: &MovementConfig, code: KeyCode) {
    let basis = build_basis(&camera.orientation, &camera.orientation);
    let turn = movement.turn_speed_deg.to_radians();

    match code {
        KeyCode::Char('w') => camera.velocity += basis.forward * movement.move_speed,
        KeyCode::Char('s') => camera.velocity -= basis.forward * movement.move_speed,
        KeyCode::Char('d') => camera.velocity += basis.right * movement.move_speed,
        KeyCode::Char('a') => camera.velocity -= basis.right * movement.move_speed,
        KeyCode::Char('e') => camera.velocity += basis.up * movement.move_speed,
        KeyCode::Char('r') => camera.velocity -= basis.up * movement.move_speed,
        KeyCode::Left => {
            let turned = rotation_matrix(0.0, 0.0, turn) * camera.orientation;
            camera.set_orientation(turned);
        }
        KeyCode::Right => {
            let turned = rotation_matrix(0.0, 0.0, -turn) * camera.orientation;
            camera.set_orientation(turned);
        }
        KeyCode::Up | KeyCode::Down => {
            let angle = if code == KeyCode::Up { turn } else { -turn };
            let pitch = Rotation3::from_axis_angle(&Unit::new_normalize(basis.right), angle);
            camera.set_orientation(pitch * camera.orientation);
        }
        _ => {}
    }
}

/// Advance driver-owned motion by `dt` seconds: integrate and damp the
/// camera velocity, and drift tagged entities towards the camera plane,
/// wrapping them back to their start distance.
pub fn step_world(scene: &mut Scene, movement: &MovementConfig, dt: f32) {
    let camera = scene.camera_mut();
    let velocity = camera.velocity;
    camera.set_position(camera.position + velocity * dt);
    camera.velocity *= movement.damping.powf(dt);

    for entity in scene.entities_mut().filter(|e| e.name == DRIFT_TAG) {
        entity.move_by(0.0, -movement.drift_speed * dt, 0.0);
        if entity.position.y < 1.0 {
            let p = entity.position;
            entity.move_to(p.x, 80.0, p.z);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azel_core::EntityKind;
    use std::collections::HashMap;

    struct MapSource(HashMap<&'static str, &'static str>);

    impl TextSource for MapSource {
        fn read_text(&self, path: &str) -> io::Result<String> {
            self.0
                .get(path)
                .map(|s| s.to_string())
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
        }
    }

    fn empty_source() -> MapSource {
        MapSource(HashMap::new())
    }

    #[test]
    fn test_build_default_scene() {
        let scene = build_scene(&AppConfig::default(), &empty_source()).unwrap();
        assert!(scene.entities().any(|e| e.name == DRIFT_TAG));
        // demo triangle plus 12 cube triangles
        assert_eq!(scene.index_buffer().len(), 13);

        let cube_vertex = scene.entities().find(|e| e.name == "cube_vertex").unwrap();
        assert!(cube_vertex.position.y > CUBE_DISTANCE - 1.5);
    }

    #[test]
    fn test_missing_mesh_is_skipped() {
        let mut config = AppConfig::default();
        config.demo_scene = false;
        config.show_cube = false;
        config.meshes.push(config::MeshConfig {
            name: "ghost".to_string(),
            obj: "ghost.obj".to_string(),
            mtl: None,
            scale: 1.0,
        });
        config.meshes.push(config::MeshConfig {
            name: "tri".to_string(),
            obj: "tri.obj".to_string(),
            mtl: None,
            scale: 1.0,
        });
        let source = MapSource(HashMap::from([("tri.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n")]));

        let scene = build_scene(&config, &source).unwrap();
        assert_eq!(scene.roots().len(), 1);
        assert_eq!(scene.entity(scene.roots()[0]).unwrap().kind, EntityKind::Generic);
        assert_eq!(scene.index_buffer().len(), 1);
    }

    #[test]
    fn test_zero_camera_orientation_rejected() {
        let mut config = AppConfig::default();
        config.camera.orientation = [0.0, 0.0, 0.0];
        assert!(matches!(
            build_scene(&config, &empty_source()),
            Err(AppError::Camera(CameraError::ZeroOrientation))
        ));
    }

    #[test]
    fn test_step_world_drifts_and_wraps() {
        let mut config = AppConfig::default();
        config.show_cube = false;
        config.floor_step = 5.0;
        let mut scene = build_scene(&config, &empty_source()).unwrap();
        let movement = config.movement.clone();

        step_world(&mut scene, &movement, 1.0);
        let drifting = scene.entities().find(|e| e.name == DRIFT_TAG).unwrap();
        assert!((drifting.position.y - 60.0).abs() < 1e-4);

        step_world(&mut scene, &movement, 3.5);
        let drifting = scene.entities().find(|e| e.name == DRIFT_TAG).unwrap();
        assert_eq!(drifting.position.y, 80.0);

        let floor = scene.entities().find(|e| e.name == "floor").unwrap();
        assert_eq!(floor.position.z, -2.0);
    }

    #[test]
    fn test_camera_velocity_integrates_and_damps() {
        let mut scene = Scene::default();
        scene.camera_mut().velocity = Vector3::new(0.0, 2.0, 0.0);
        let movement = config::MovementConfig::default();

        step_world(&mut scene, &movement, 0.5);
        assert!((scene.camera().position.y - 1.0).abs() < 1e-6);
        assert!(scene.camera().velocity.y < 2.0);
    }

    fn pressed(code: KeyCode) -> Camera {
        let mut camera = Camera::default();
        apply_key(&mut camera, &MovementConfig::default(), code);
        camera
    }

    #[test]
    fn test_movement_keys_follow_camera_basis() {
        let speed = MovementConfig::default().move_speed;
        assert_eq!(pressed(KeyCode::Char('w')).velocity, Vector3::new(0.0, speed, 0.0));
        assert_eq!(pressed(KeyCode::Char('s')).velocity, Vector3::new(0.0, -speed, 0.0));
        assert_eq!(pressed(KeyCode::Char('d')).velocity, Vector3::new(speed, 0.0, 0.0));
        assert_eq!(pressed(KeyCode::Char('a')).velocity, Vector3::new(-speed, 0.0, 0.0));
        assert_eq!(pressed(KeyCode::Char('e')).velocity, Vector3::new(0.0, 0.0, speed));
        assert_eq!(pressed(KeyCode::Char('r')).velocity, Vector3::new(0.0, 0.0, -speed));
        assert_eq!(pressed(KeyCode::Char('q')).velocity, Vector3::zeros());
    }

    #[test]
    fn test_turning_moves_the_image_visibly() {
        let viewport = azel_core::Viewport::new(80, 48);
        let ahead = Vector3::new(0.0, 80.0, 0.0);
        let screen_x = |camera: &Camera| viewport.ndc_to_pixel(viewport.project(camera, &ahead)).0;

        let still = screen_x(&Camera::default());
        assert!(screen_x(&pressed(KeyCode::Left)) < still - 1.0);
        assert!(screen_x(&pressed(KeyCode::Right)) > still + 1.0);
    }

    #[test]
    fn test_pitch_keys_tilt_orientation() {
        let up = pressed(KeyCode::Up).orientation;
        let down = pressed(KeyCode::Down).orientation;
        assert!(up.z > 0.0);
        assert!(down.z < 0.0);
        assert!((up.norm() - 100.0).abs() < 1e-3);
        assert_eq!(pressed(KeyCode::Up).velocity, Vector3::zeros());
    }
}
