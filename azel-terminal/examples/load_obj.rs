/// Example: Import an OBJ (and optional MTL) file and print what was welded
///
/// Usage: cargo run --example load_obj -- path/to/file.obj [path/to/file.mtl]
use azel_core::mesh::parse_mesh;
use azel_core::{FsSource, Scene, TextSource};
use azel_terminal::AppError;
use std::env;

fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <obj-file> [mtl-file]", args[0]);
        return Ok(());
    }
    let obj_path = &args[1];
    let mtl_path = args.get(2).map(String::as_str);

    println!("Loading OBJ file: {}", obj_path);
    let obj_text = FsSource.read_text(obj_path)?;
    let mtl_text = match mtl_path {
        Some(path) => FsSource.read_text(path)?,
        None => String::new(),
    };

    let mesh = parse_mesh(&obj_text, &mtl_text, 1.0).map_err(azel_core::SceneError::from)?;
    println!(
        "Welded {} vertices into {} triangles across {} submeshes ({} materials)",
        mesh.vertices.len(),
        mesh.triangle_count(),
        mesh.submeshes.len(),
        mesh.materials.len()
    );

    let mut scene = Scene::default();
    let root = scene.import_mesh_from(&FsSource, "mesh", obj_path, mtl_path, 1.0)?;
    println!(
        "Scene holds {} entities under root {} and {} index triples",
        scene.flatten_from(root).len(),
        root,
        scene.index_buffer().len()
    );
    Ok(())
}
