/// Scene-graph nodes and their identity
use nalgebra::Vector3;
use std::fmt;

/// Stable entity identifier, never reused within a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The id `offset` slots after this one
    pub fn offset(self, offset: u32) -> Self {
        Self(self.0 + offset)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out monotonically increasing ids
#[derive(Debug, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next += 1;
        id
    }

    /// The id the next call to `allocate` will return
    pub fn peek(&self) -> EntityId {
        EntityId(self.next)
    }
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels scaled into `[0, 1]`
    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

/// What an entity is, with its kind-specific payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntityKind {
    /// Grouping node with no geometry of its own
    Generic,
    Circle { radius: f32 },
    Rectangle { width: f32, height: f32 },
    Triangle { size: f32 },
    /// Single point, also used for imported mesh vertices
    Vertex,
}

impl EntityKind {
    /// Primitives are laid out in screen pixels rather than projected
    pub fn is_screen_space(&self) -> bool {
        matches!(
            self,
            EntityKind::Circle { .. } | EntityKind::Rectangle { .. } | EntityKind::Triangle { .. }
        )
    }
}

/// Everything needed to create an entity except its id
#[derive(Debug, Clone)]
pub struct EntityDesc {
    pub kind: EntityKind,
    pub name: String,
    pub position: Vector3<f32>,
    pub orientation: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub color: Rgb,
}

impl EntityDesc {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            position: Vector3::zeros(),
            orientation: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            color: Rgb::WHITE,
        }
    }

    pub fn at(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vector3::new(x, y, z);
        self
    }

    pub fn oriented(mut self, orientation: Vector3<f32>) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn scaled(mut self, scale: Vector3<f32>) -> Self {
        self.scale = scale;
        self
    }

    pub fn colored(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }
}

/// A scene-graph node. Children are referenced by id and owned by the scene
/// arena.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    pub kind: EntityKind,
    pub name: String,
    pub position: Vector3<f32>,
    pub orientation: Vector3<f32>,
    pub scale: Vector3<f32>,
    pub color: Rgb,
    pub(crate) children: Vec<EntityId>,
    /// Recomputed on every render
    pub in_frame: bool,
}

impl Entity {
    pub(crate) fn from_desc(id: EntityId, desc: EntityDesc) -> Self {
        Self {
            id,
            kind: desc.kind,
            name: desc.name,
            position: desc.position,
            orientation: desc.orientation,
            scale: desc.scale,
            color: desc.color,
            children: Vec::new(),
            in_frame: true,
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Translate by a delta
    pub fn move_by(&mut self, dx: f32, dy: f32, dz: f32) {
        self.position += Vector3::new(dx, dy, dz);
    }

    pub fn move_to(&mut self, x: f32, y: f32, z: f32) {
        self.position = Vector3::new(x, y, z);
    }
}
