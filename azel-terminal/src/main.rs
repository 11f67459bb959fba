/// AZEL Terminal Demo - scene graph rendered through the azimuth/elevation camera
///
/// Controls:
///   - W/S, A/D, E/R: Move the camera
///   - Arrow Keys: Turn and pitch the camera
///   - Q/ESC: Quit
use azel_core::FsSource;
use azel_terminal::{build_scene, AppConfig, AppError, TerminalApp};
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "azel-terminal", about = "Render an AZEL scene in the terminal")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mesh (.obj) to import in addition to the configured ones
    #[arg(long)]
    obj: Option<String>,

    /// Material (.mtl) file for --obj
    #[arg(long, requires = "obj")]
    mtl: Option<String>,

    /// Uniform scale applied to --obj positions
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// Skip the built-in demo scene
    #[arg(long)]
    no_demo: bool,

    /// Target frames per second
    #[arg(long)]
    fps: Option<u32>,
}

fn main() -> Result<(), AppError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    if args.no_demo {
        config.demo_scene = false;
    }
    if let Some(fps) = args.fps {
        config.target_fps = fps;
    }
    if let Some(obj) = args.obj {
        config.meshes.push(azel_terminal::config::MeshConfig {
            name: "mesh".to_string(),
            obj,
            mtl: args.mtl,
            scale: args.scale,
        });
    }

    println!("AZEL Terminal Renderer - Loading...");
    let scene = build_scene(&config, &FsSource)?;
    log::info!("scene ready: {} entities", scene.len());

    println!("Starting terminal renderer (press Q to quit)...");
    std::thread::sleep(std::time::Duration::from_secs(1));

    // Run the terminal app
    let mut app = TerminalApp::new(scene, config)?;
    app.run()?;

    println!("Thank you for using AZEL Terminal Renderer!");
    Ok(())
}
