/// Entity arena, scene-graph hierarchy and the global index buffer
use std::collections::HashMap;
use std::io;
use thiserror::Error;

use crate::camera::Camera;
use crate::entity::{Entity, EntityDesc, EntityId, EntityKind, IdAllocator, Rgb};
use crate::mesh::{build_vertices_and_indices, MeshError};

/// Half-width of the demo floor grid
const FLOOR_EXTENT: f32 = 10.0;
/// Slack for step counts that land just under a whole number
const FLOOR_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("index triple references missing entity {0}")]
    DanglingEntity(EntityId),
    #[error("no entity with id {0}")]
    UnknownEntity(EntityId),
    #[error("entity {0} is already attached to the scene graph")]
    AlreadyAttached(EntityId),
    #[error("attaching {child} under {parent} would create a cycle")]
    Cycle { parent: EntityId, child: EntityId },
    #[error("mesh import failed: {0}")]
    Mesh(#[from] MeshError),
    #[error("could not read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("{path} is empty")]
    EmptySource { path: String },
    #[error("floor step must be positive and finite, got {0}")]
    InvalidFloorStep(f32),
}

/// Where mesh and material text comes from
pub trait TextSource {
    fn read_text(&self, path: &str) -> io::Result<String>;
}

/// Reads from the local file system
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSource;

impl TextSource for FsSource {
    fn read_text(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Owns every entity. The hierarchy and the index buffer refer to entities
/// only by id.
pub struct Scene {
    ids: IdAllocator,
    entities: Vec<Entity>,
    slots: HashMap<EntityId, usize>,
    parents: HashMap<EntityId, EntityId>,
    roots: Vec<EntityId>,
    index_buffer: Vec<[EntityId; 3]>,
    camera: Camera,
}

impl Scene {
    pub fn new(camera: Camera) -> Self {
        Self {
            ids: IdAllocator::new(),
            entities: Vec::new(),
            slots: HashMap::new(),
            parents: HashMap::new(),
            roots: Vec::new(),
            index_buffer: Vec::new(),
            camera,
        }
    }

    /// Create a detached entity; attach it with `add_root` or `add_child`
    pub fn create(&mut self, desc: EntityDesc) -> EntityId {
        let id = self.ids.allocate();
        self.slots.insert(id, self.entities.len());
        self.entities.push(Entity::from_desc(id, desc));
        id
    }

    /// Create an entity and attach it as a root
    pub fn spawn(&mut self, desc: EntityDesc) -> EntityId {
        let id = self.create(desc);
        self.roots.push(id);
        id
    }

    pub fn add_root(&mut self, id: EntityId) -> Result<(), SceneError> {
        self.ensure_detached(id)?;
        self.roots.push(id);
        Ok(())
    }

    /// Move a detached entity into `parent`'s child list
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<(), SceneError> {
        if !self.slots.contains_key(&parent) {
            return Err(SceneError::UnknownEntity(parent));
        }
        self.ensure_detached(child)?;

        let mut ancestor = Some(parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(SceneError::Cycle { parent, child });
            }
            ancestor = self.parents.get(&id).copied();
        }

        self.parents.insert(child, parent);
        if let Some(entity) = self.entity_mut(parent) {
            entity.children.push(child);
        }
        Ok(())
    }

    fn ensure_detached(&self, id: EntityId) -> Result<(), SceneError> {
        if !self.slots.contains_key(&id) {
            return Err(SceneError::UnknownEntity(id));
        }
        if self.parents.contains_key(&id) || self.roots.contains(&id) {
            return Err(SceneError::AlreadyAttached(id));
        }
        Ok(())
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.slots.get(&id).map(|&slot| &self.entities[slot])
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        match self.slots.get(&id) {
            Some(&slot) => Some(&mut self.entities[slot]),
            None => None,
        }
    }

    pub fn parent(&self, id: EntityId) -> Option<EntityId> {
        self.parents.get(&id).copied()
    }

    /// Every entity, attached or not, in creation order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn roots(&self) -> &[EntityId] {
        &self.roots
    }

    pub fn index_buffer(&self) -> &[[EntityId; 3]] {
        &self.index_buffer
    }

    /// Queue a triangle between three entities. Ids are checked at render
    /// time, not here.
    pub fn push_triangle(&mut self, ids: [EntityId; 3]) {
        self.index_buffer.push(ids);
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// All attached entities, roots in order, each subtree depth-first
    /// pre-order
    pub fn flatten(&self) -> Vec<EntityId> {
        let mut out = Vec::with_capacity(self.entities.len());
        for &root in &self.roots {
            self.collect_subtree(root, &mut out);
        }
        out
    }

    /// `id` followed by all of its descendants, depth-first pre-order
    pub fn flatten_from(&self, id: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        self.collect_subtree(id, &mut out);
        out
    }

    fn collect_subtree(&self, id: EntityId, out: &mut Vec<EntityId>) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(entity) = self.entity(id) else {
                continue;
            };
            out.push(id);
            stack.extend(entity.children.iter().rev());
        }
    }

    /// Import mesh text as a `Generic` root named `name` with one `Vertex`
    /// child per welded vertex, and append its triangles to the index
    /// buffer. The scene is unchanged if parsing fails.
    pub fn import_mesh(
        &mut self,
        name: &str,
        obj_text: &str,
        mtl_text: &str,
        scale: f32,
    ) -> Result<EntityId, SceneError> {
        let (vertices, indices) = build_vertices_and_indices(obj_text, mtl_text, scale)?;

        let root = self.spawn(EntityDesc::new(EntityKind::Generic, name));
        let vertex_name = format!("{name}_vertex");
        let first = self.ids.peek();

        for vertex in &vertices {
            // placeholder coloring from texture coordinates and normal
            let color = Rgb::new(
                (vertex.u * 255.0) as u8,
                (vertex.v * 255.0) as u8,
                (vertex.normal.x * 255.0) as u8,
            );
            let desc = EntityDesc::new(EntityKind::Vertex, vertex_name.as_str())
                .at(vertex.position.x, vertex.position.y, vertex.position.z)
                .colored(color);
            let child = self.create(desc);
            self.add_child(root, child)?;
        }

        for triangle in indices.chunks_exact(3) {
            self.index_buffer.push([
                first.offset(triangle[0]),
                first.offset(triangle[1]),
                first.offset(triangle[2]),
            ]);
        }

        log::debug!(
            "imported mesh '{}': {} vertices, {} triangles, ids from {}",
            name,
            vertices.len(),
            indices.len() / 3,
            first
        );
        Ok(root)
    }

    /// Read mesh (and optionally material) text through `source` and import
    /// it
    pub fn import_mesh_from(
        &mut self,
        source: &dyn TextSource,
        name: &str,
        obj_path: &str,
        mtl_path: Option<&str>,
        scale: f32,
    ) -> Result<EntityId, SceneError> {
        let obj_text = read_non_empty(source, obj_path)?;
        let mtl_text = match mtl_path {
            Some(path) => read_non_empty(source, path)?,
            None => String::new(),
        };
        self.import_mesh(name, &obj_text, &mtl_text, scale)
    }

    /// Populate the built-in demo: screen-space primitives, a drifting
    /// vertex grid ahead of the camera and a tiled floor below it.
    ///
    /// Floor tiles start at -10 and advance by `floor_step` up to 10 on both
    /// axes.
    pub fn populate_demo(&mut self, floor_step: f32) -> Result<(), SceneError> {
        if !floor_step.is_finite() || floor_step <= 0.0 {
            return Err(SceneError::InvalidFloorStep(floor_step));
        }

        self.spawn(
            EntityDesc::new(EntityKind::Circle { radius: 50.0 }, "Circle")
                .at(400.0, 300.0, 0.0)
                .colored(Rgb::GREEN),
        );
        self.spawn(
            EntityDesc::new(EntityKind::Rectangle { width: 50.0, height: 50.0 }, "Rectangle")
                .at(100.0, 100.0, 0.0)
                .colored(Rgb::RED),
        );

        let mut corners = Vec::new();
        for i in -5..=5 {
            for j in -5..=5 {
                let (x, z) = (i as f32, j as f32);
                let id = self.spawn(
                    EntityDesc::new(EntityKind::Vertex, "moving_over")
                        .at(x, 80.0, z)
                        .colored(grid_color(x, z)),
                );
                if (i, j) == (-5, -5) || (i, j) == (5, -5) || (i, j) == (0, 5) {
                    corners.push(id);
                }
            }
        }
        if let [a, b, c] = corners.as_slice() {
            self.push_triangle([*a, *b, *c]);
        }

        let floor = self.spawn(
            EntityDesc::new(EntityKind::Generic, "floor")
                .at(0.0, 0.0, -2.0)
                .colored(Rgb::new(255, 255, 0)),
        );
        let steps = (FLOOR_EXTENT * 2.0 / floor_step + FLOOR_TOLERANCE).floor() as i32;
        for a in 0..=steps {
            for b in 0..=steps {
                let x = -FLOOR_EXTENT + a as f32 * floor_step;
                let y = -FLOOR_EXTENT + b as f32 * floor_step;
                let tile = self.create(
                    EntityDesc::new(EntityKind::Vertex, "floor")
                        .at(x, y, -2.0)
                        .colored(grid_color(x, y)),
                );
                self.add_child(floor, tile)?;
            }
        }

        log::debug!("demo scene populated with {} entities", self.len());
        Ok(())
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Camera::default())
    }
}

fn read_non_empty(source: &dyn TextSource, path: &str) -> Result<String, SceneError> {
    let text = source.read_text(path).map_err(|source| SceneError::Unreadable {
        path: path.to_string(),
        source,
    })?;
    if text.trim().is_empty() {
        return Err(SceneError::EmptySource {
            path: path.to_string(),
        });
    }
    Ok(text)
}

/// Position-derived debug coloring for grid vertices
fn grid_color(i: f32, j: f32) -> Rgb {
    let channel = |v: f32| (v as i32).rem_euclid(255) as u8;
    Rgb::new(channel(255.0 - i), channel(255.0 + j), channel(255.0 + i - j))
}
