/// Wavefront OBJ/MTL subset parser with vertex welding
use nalgebra::Vector3;
use nom::{
    bytes::complete::take_till1,
    character::complete::{char, i64 as int, space0, space1},
    combinator::opt,
    multi::separated_list1,
    number::complete::float,
    sequence::{preceded, terminated},
    IResult,
};
use std::collections::HashMap;
use thiserror::Error;

use crate::math::{cross, normalize_or};

/// Normals whose absolute components sum below this count as missing
const MISSING_NORMAL_EPSILON: f32 = 1e-7;

#[derive(Debug, Error, PartialEq)]
pub enum MeshError {
    #[error("line {line}: face index 0 is invalid")]
    ZeroIndex { line: usize },
    #[error("line {line}: malformed `{directive}` directive")]
    Malformed { line: usize, directive: String },
}

/// An output vertex after welding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: Vector3<f32>,
    pub normal: Vector3<f32>,
    pub u: f32,
    pub v: f32,
}

impl Default for MeshVertex {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            normal: Vector3::zeros(),
            u: 0.0,
            v: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: Vector3<f32>,
    pub diffuse: Vector3<f32>,
    pub specular: Vector3<f32>,
}

impl Material {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ambient: Vector3::zeros(),
            diffuse: Vector3::new(1.0, 1.0, 1.0),
            specular: Vector3::zeros(),
        }
    }
}

/// A contiguous run of indices drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submesh {
    /// Index into `Mesh::materials`, `None` when unknown or unset
    pub material: Option<usize>,
    pub index_offset: u32,
    pub index_count: u32,
}

/// Resolved (position, uv, normal) reference of a face corner. Resolved
/// indices may point outside the source lists, in which case the attribute
/// falls back to its default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeldKey {
    pub position: Option<isize>,
    pub uv: Option<isize>,
    pub normal: Option<isize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<MeshVertex>,
    /// Triangle list
    pub indices: Vec<u32>,
    pub materials: Vec<Material>,
    /// In draw order
    pub submeshes: Vec<Submesh>,
}

impl Mesh {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Parse material text. Only `newmtl`, `Ka`, `Kd` and `Ks` are understood.
pub fn parse_materials(text: &str) -> Result<Vec<Material>, MeshError> {
    let mut materials = Vec::new();
    let mut current: Option<Material> = None;

    for (line, directive, rest) in directives(text) {
        match directive {
            "newmtl" => {
                if let Some(done) = current.take() {
                    materials.push(done);
                }
                let name = rest.split_whitespace().next().unwrap_or("(unnamed)");
                current = Some(Material::named(name));
            }
            "Ka" | "Kd" | "Ks" => {
                let color = parse_all(vec3, rest, line, directive)?;
                // colors before any newmtl have nowhere to go
                if let Some(material) = current.as_mut() {
                    match directive {
                        "Ka" => material.ambient = color,
                        "Kd" => material.diffuse = color,
                        _ => material.specular = color,
                    }
                }
            }
            _ => {}
        }
    }

    if let Some(done) = current {
        materials.push(done);
    }
    Ok(materials)
}

/// Parse mesh text into welded, fan-triangulated buffers.
///
/// `mtl_text` supplies the materials referenced by `usemtl`; `mtllib` lines
/// are not followed. Positions are multiplied by `scale`.
pub fn parse_mesh(obj_text: &str, mtl_text: &str, scale: f32) -> Result<Mesh, MeshError> {
    let mut builder = MeshBuilder::new(parse_materials(mtl_text)?, scale);

    for (line, directive, rest) in directives(obj_text) {
        match directive {
            "v" => {
                let position = parse_all(vec3, rest, line, directive)?;
                builder.positions.push(position);
            }
            "vt" => {
                let uv = parse_all(vec2, rest, line, directive)?;
                builder.uvs.push(uv);
            }
            "vn" => {
                let normal = parse_all(vec3, rest, line, directive)?;
                builder.normals.push(normal);
            }
            "usemtl" => {
                let name = rest.split_whitespace().next().unwrap_or("");
                builder.use_material(name);
            }
            "f" => {
                let corners = parse_all(face, rest, line, directive)?;
                builder.add_face(&corners, line)?;
            }
            // mtllib, g, o, s and anything else
            _ => {}
        }
    }

    Ok(builder.finish())
}

/// Parse and return just the welded vertices and triangle indices
pub fn build_vertices_and_indices(
    obj_text: &str,
    mtl_text: &str,
    scale: f32,
) -> Result<(Vec<MeshVertex>, Vec<u32>), MeshError> {
    let mesh = parse_mesh(obj_text, mtl_text, scale)?;
    Ok((mesh.vertices, mesh.indices))
}

/// Convert a 1-based or negative-relative index to 0-based
pub fn resolve_index(index: i64, count: usize, line: usize) -> Result<isize, MeshError> {
    match index {
        0 => Err(MeshError::ZeroIndex { line }),
        i if i > 0 => Ok((i - 1) as isize),
        i => Ok(count as isize + i as isize),
    }
}

/// Raw face-corner reference as written in the file
#[derive(Debug, Clone, Copy, PartialEq)]
struct Corner {
    position: i64,
    uv: Option<i64>,
    normal: Option<i64>,
}

struct MeshBuilder {
    positions: Vec<Vector3<f32>>,
    uvs: Vec<(f32, f32)>,
    normals: Vec<Vector3<f32>>,
    material_index: HashMap<String, usize>,
    current_material: Option<usize>,
    cache: HashMap<WeldKey, u32>,
    scale: f32,
    mesh: Mesh,
}

impl MeshBuilder {
    fn new(materials: Vec<Material>, scale: f32) -> Self {
        let material_index = materials
            .iter()
            .enumerate()
            .map(|(i, m)| (m.name.clone(), i))
            .collect();

        Self {
            positions: Vec::new(),
            uvs: Vec::new(),
            normals: Vec::new(),
            material_index,
            current_material: None,
            cache: HashMap::new(),
            scale,
            mesh: Mesh {
                materials,
                ..Mesh::default()
            },
        }
    }

    fn use_material(&mut self, name: &str) {
        self.current_material = self.material_index.get(name).copied();
        self.begin_submesh();
    }

    /// Start a new run unless the last one already uses the current material
    fn begin_submesh(&mut self) {
        if let Some(last) = self.mesh.submeshes.last() {
            if last.material == self.current_material {
                return;
            }
        }
        self.mesh.submeshes.push(Submesh {
            material: self.current_material,
            index_offset: self.mesh.indices.len() as u32,
            index_count: 0,
        });
    }

    fn resolve(&self, corner: &Corner, line: usize) -> Result<WeldKey, MeshError> {
        Ok(WeldKey {
            position: Some(resolve_index(corner.position, self.positions.len(), line)?),
            uv: corner
                .uv
                .map(|i| resolve_index(i, self.uvs.len(), line))
                .transpose()?,
            normal: corner
                .normal
                .map(|i| resolve_index(i, self.normals.len(), line))
                .transpose()?,
        })
    }

    fn add_face(&mut self, corners: &[Corner], line: usize) -> Result<(), MeshError> {
        let keys = corners
            .iter()
            .map(|c| self.resolve(c, line))
            .collect::<Result<Vec<_>, _>>()?;
        if keys.len() < 3 {
            return Ok(());
        }

        self.begin_submesh();
        for i in 1..keys.len() - 1 {
            let a = self.emit_vertex(keys[0]);
            let b = self.emit_vertex(keys[i]);
            let c = self.emit_vertex(keys[i + 1]);
            self.mesh.indices.extend_from_slice(&[a, b, c]);
            if let Some(submesh) = self.mesh.submeshes.last_mut() {
                submesh.index_count += 3;
            }
        }
        Ok(())
    }

    fn emit_vertex(&mut self, key: WeldKey) -> u32 {
        if let Some(&index) = self.cache.get(&key) {
            return index;
        }

        let mut vertex = MeshVertex::default();
        if let Some(position) = lookup(&self.positions, key.position) {
            vertex.position = position * self.scale;
        }
        if let Some(&(u, v)) = lookup(&self.uvs, key.uv) {
            vertex.u = u;
            vertex.v = v;
        }
        if let Some(normal) = lookup(&self.normals, key.normal) {
            vertex.normal = *normal;
        }

        let index = self.mesh.vertices.len() as u32;
        self.mesh.vertices.push(vertex);
        self.cache.insert(key, index);
        index
    }

    fn finish(mut self) -> Mesh {
        generate_missing_normals(&mut self.mesh);
        log::debug!(
            "parsed mesh: {} vertices, {} triangles, {} submeshes",
            self.mesh.vertices.len(),
            self.mesh.triangle_count(),
            self.mesh.submeshes.len()
        );
        self.mesh
    }
}

fn lookup<T>(items: &[T], index: Option<isize>) -> Option<&T> {
    index
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| items.get(i))
}

/// If any vertex lacks a normal, replace every normal with the normalized
/// sum of its adjacent triangles' cross products.
pub fn generate_missing_normals(mesh: &mut Mesh) {
    let missing = mesh
        .vertices
        .iter()
        .any(|v| v.normal.x.abs() + v.normal.y.abs() + v.normal.z.abs() < MISSING_NORMAL_EPSILON);
    if !missing {
        return;
    }

    let mut accumulated = vec![Vector3::<f32>::zeros(); mesh.vertices.len()];
    for triangle in mesh.indices.chunks_exact(3) {
        let [i0, i1, i2] = [triangle[0] as usize, triangle[1] as usize, triangle[2] as usize];
        let p0 = mesh.vertices[i0].position;
        let p1 = mesh.vertices[i1].position;
        let p2 = mesh.vertices[i2].position;
        let n = cross(&(p1 - p0), &(p2 - p0));
        accumulated[i0] += n;
        accumulated[i1] += n;
        accumulated[i2] += n;
    }

    for (vertex, sum) in mesh.vertices.iter_mut().zip(&accumulated) {
        vertex.normal = normalize_or(sum, Vector3::y());
    }
}

/// Non-empty, non-comment lines split into (1-based line number, directive,
/// remainder)
fn directives(text: &str) -> impl Iterator<Item = (usize, &str, &str)> {
    text.lines().enumerate().filter_map(|(i, raw)| {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (rest, name) = directive_name(line).ok()?;
        Some((i + 1, name, rest.trim()))
    })
}

fn directive_name(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

/// Run `parser` on a directive's arguments, mapping failure to `Malformed`
fn parse_all<'a, O>(
    parser: impl Fn(&'a str) -> IResult<&'a str, O>,
    input: &'a str,
    line: usize,
    directive: &str,
) -> Result<O, MeshError> {
    parser(input)
        .map(|(_, out)| out)
        .map_err(|_| MeshError::Malformed {
            line,
            directive: directive.to_string(),
        })
}

/// Three floats; trailing components (e.g. a `w`) are ignored
fn vec3(input: &str) -> IResult<&str, Vector3<f32>> {
    let (input, x) = preceded(space0, float)(input)?;
    let (input, y) = preceded(space1, float)(input)?;
    let (input, z) = preceded(space1, float)(input)?;
    Ok((input, Vector3::new(x, y, z)))
}

/// `u [v]`, with v defaulting to zero
fn vec2(input: &str) -> IResult<&str, (f32, f32)> {
    let (input, u) = preceded(space0, float)(input)?;
    let (input, v) = opt(preceded(space1, float))(input)?;
    Ok((input, (u, v.unwrap_or(0.0))))
}

/// `v`, `v/t`, `v//n` or `v/t/n`
fn corner(input: &str) -> IResult<&str, Corner> {
    let (input, position) = int(input)?;
    let (input, uv) = opt(preceded(char('/'), opt(int)))(input)?;
    let (input, normal) = opt(preceded(char('/'), opt(int)))(input)?;
    Ok((
        input,
        Corner {
            position,
            uv: uv.flatten(),
            normal: normal.flatten(),
        },
    ))
}

fn face(input: &str) -> IResult<&str, Vec<Corner>> {
    let (rest, corners) = terminated(separated_list1(space1, corner), space0)(input)?;
    if !rest.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            rest,
            nom::error::ErrorKind::Eof,
        )));
    }
    Ok((rest, corners))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const QUAD: &str = "\
# a unit quad
mtllib quad.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl red
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    const MTL: &str = "\
newmtl red
Ka 0.1 0 0
Kd 1 0 0
illum 2
newmtl blue
Kd 0 0 1
Ks 0.5 0.5 0.5
";

    #[test]
    fn test_parse_materials() {
        let materials = parse_materials(MTL).unwrap();
        assert_eq!(materials.len(), 2);
        assert_eq!(materials[0].name, "red");
        assert_eq!(materials[0].ambient, Vector3::new(0.1, 0.0, 0.0));
        assert_eq!(materials[0].diffuse, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(materials[0].specular, Vector3::zeros());
        assert_eq!(materials[1].name, "blue");
        assert_eq!(materials[1].ambient, Vector3::zeros());
        assert_eq!(materials[1].specular, Vector3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_unnamed_material() {
        let materials = parse_materials("newmtl\nKd 0.5 0.5 0.5\n").unwrap();
        assert_eq!(materials[0].name, "(unnamed)");
        assert_eq!(materials[0].diffuse, Vector3::new(0.5, 0.5, 0.5));
    }

    #[test]
    fn test_single_triangle() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = parse_mesh(obj, "", 1.0).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.submeshes.len(), 1);
        assert_eq!(mesh.submeshes[0].material, None);
        // no vn: normals are generated
        for vertex in &mesh.vertices {
            assert_relative_eq!(vertex.normal, Vector3::z(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_missing_normals_before_generation() {
        let mut builder = MeshBuilder::new(Vec::new(), 1.0);
        builder.positions = vec![Vector3::zeros(), Vector3::x(), Vector3::y()];
        let corners: Vec<Corner> = (1..=3)
            .map(|i| Corner { position: i, uv: None, normal: None })
            .collect();
        builder.add_face(&corners, 1).unwrap();
        assert!(builder.mesh.vertices.iter().all(|v| v.normal == Vector3::zeros()));

        let mesh = builder.finish();
        assert!(mesh.vertices.iter().all(|v| v.normal.norm() > 0.99));
    }

    #[test]
    fn test_fan_triangulation_and_welding() {
        let mesh = parse_mesh(QUAD, MTL, 1.0).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.vertices[2].u, 1.0);
        assert_eq!(mesh.vertices[2].v, 1.0);
        // authored normals are kept when every vertex has one
        assert!(mesh.vertices.iter().all(|v| v.normal == Vector3::z()));
        assert_eq!(
            mesh.submeshes,
            vec![Submesh { material: Some(0), index_offset: 0, index_count: 6 }]
        );
    }

    #[test]
    fn test_pentagon_fan() {
        let obj = "v 0 0 0\nv 1 0 0\nv 2 1 0\nv 1 2 0\nv 0 1 0\nf 1 2 3 4 5\n";
        let mesh = parse_mesh(obj, "", 1.0).unwrap();
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3, 0, 3, 4]);
    }

    #[test]
    fn test_vertex_count_matches_distinct_keys() {
        let obj = "\
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 1
vn 0 0 1
vn 0 0 -1
f 1/1/1 2/1/1 3/1/1
f 1/1/1 3/1/1 4/1/1
f 1/2/2 3/2/2 4//2
";
        let mesh = parse_mesh(obj, "", 1.0).unwrap();
        // 1/1/1 2/1/1 3/1/1 4/1/1 1/2/2 3/2/2 4//2
        assert_eq!(mesh.vertices.len(), 7);
        assert_eq!(mesh.indices.len(), 9);
    }

    #[test]
    fn test_negative_indices() {
        let obj = "v 0 0 0\nv 1 0 0\nv 2 0 0\nv 3 0 0\nv 4 0 0\nf -1 -2 -3\n";
        let mesh = parse_mesh(obj, "", 1.0).unwrap();
        let xs: Vec<f32> = mesh.vertices.iter().map(|v| v.position.x).collect();
        assert_eq!(xs, vec![4.0, 3.0, 2.0]);

        assert_eq!(resolve_index(-1, 5, 1), Ok(4));
        assert_eq!(resolve_index(-3, 5, 1), Ok(2));
        assert_eq!(resolve_index(2, 5, 1), Ok(1));
    }

    #[test]
    fn test_zero_index_fails() {
        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\n\nf 0 1 2\n";
        assert_eq!(parse_mesh(obj, "", 1.0), Err(MeshError::ZeroIndex { line: 5 }));

        let obj = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nf 1/0 2/1 3/1\n";
        assert!(matches!(parse_mesh(obj, "", 1.0), Err(MeshError::ZeroIndex { .. })));
    }

    #[test]
    fn test_malformed_lines() {
        let err = parse_mesh("v 0 zero 0\n", "", 1.0).unwrap_err();
        assert_eq!(err, MeshError::Malformed { line: 1, directive: "v".to_string() });

        assert!(parse_mesh("v 0 0 0\nf 1 x 2\n", "", 1.0).is_err());
        assert!(parse_materials("newmtl a\nKd 1 1\n").is_err());
    }

    #[test]
    fn test_scale_applied() {
        let obj = "v 1 2 3\nv 0 0 0\nv 0 1 0\nf 1 2 3\n";
        let mesh = parse_mesh(obj, "", 2.5).unwrap();
        assert_eq!(mesh.vertices[0].position, Vector3::new(2.5, 5.0, 7.5));
    }

    #[test]
    fn test_submesh_runs() {
        let obj = "\
v 0 0 0
v 1 0 0
v 0 1 0
usemtl red
f 1 2 3
usemtl red
f 1 2 3
usemtl blue
f 3 2 1
usemtl missing
f 1 3 2
";
        let mesh = parse_mesh(obj, MTL, 1.0).unwrap();
        assert_eq!(
            mesh.submeshes,
            vec![
                Submesh { material: Some(0), index_offset: 0, index_count: 6 },
                Submesh { material: Some(1), index_offset: 6, index_count: 3 },
                Submesh { material: None, index_offset: 9, index_count: 3 },
            ]
        );
    }

    #[test]
    fn test_out_of_range_reference_uses_defaults() {
        let obj = "v 1 1 1\nv 1 0 0\nv 0 1 0\nf 1 2 3/9\n";
        let mesh = parse_mesh(obj, "", 1.0).unwrap();
        assert_eq!(mesh.vertices[2].u, 0.0);
        assert_eq!(mesh.vertices.len(), 3);
    }

    #[test]
    fn test_short_faces_skipped() {
        let mesh = parse_mesh("v 0 0 0\nv 1 0 0\nf 1 2\n", "", 1.0).unwrap();
        assert!(mesh.indices.is_empty());
        assert!(mesh.submeshes.is_empty());
    }

    #[test]
    fn test_import_is_deterministic() {
        let a = build_vertices_and_indices(QUAD, MTL, 1.0).unwrap();
        let b = build_vertices_and_indices(QUAD, MTL, 1.0).unwrap();
        assert_eq!(a, b);
    }
}
