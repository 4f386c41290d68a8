use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use meshscene_assets::{MeshCache, MeshLoader, MeshSummary};
use meshscene_ecs::{RenderComponent, TransformComponent, World};
use meshscene_render::{FrameRenderer, HeadlessBackend, RendererConfig};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshscene-cli", about = "CLI tool for meshscene operations")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Load meshes and print their statistics
    Inspect {
        /// OBJ files to load
        #[arg(required = true)]
        meshes: Vec<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Render a scene with the headless backend and print each frame
    Render {
        /// OBJ file drawn by the scene's renderable entity
        mesh: String,
        /// Number of frames to render
        #[arg(short, long, default_value = "3")]
        frames: u32,
        /// Directory holding vert.spv and frag.spv
        #[arg(long, default_value = "shaders")]
        shader_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Info => {
            println!("meshscene-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("assets: {}", meshscene_assets::crate_info());
            println!("ecs: {}", meshscene_ecs::crate_info());
            println!("render: {}", meshscene_render::crate_info());
        }
        Commands::Inspect { meshes, json } => {
            let mut cache = MeshCache::new();
            let summaries = inspect(&mut cache, &meshes)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                print!("{}", summary_table(&summaries));
            }
        }
        Commands::Render {
            mesh,
            frames,
            shader_dir,
        } => {
            let mut cache = MeshCache::new();
            let mut world = build_scene(&mut cache, &mesh)?;
            let mut renderer =
                FrameRenderer::new(HeadlessBackend::new(), RendererConfig::from_shader_dir(&shader_dir));
            renderer
                .init_resources()
                .with_context(|| format!("initializing renderer from {}", shader_dir.display()))?;
            renderer.init_swap_chain_resources(1280, 720)?;

            for frame in 0..frames {
                spin(&mut world, 0.25);
                let stats = renderer.start_next_frame(&world, &())?;
                println!(
                    "frame {frame}: drawn={} skipped={} uploaded={}",
                    stats.drawn, stats.skipped, stats.uploaded
                );
                if let Some(recorded) = renderer.backend().last_frame() {
                    print!("{recorded}");
                }
            }

            renderer.release_resources();
            let counters = renderer.backend().counters();
            println!(
                "buffers: created={} staging={} destroyed={} copies={}",
                counters.buffers_created,
                counters.staging_created,
                counters.buffers_destroyed,
                counters.copies
            );
        }
    }

    Ok(())
}

fn inspect<L: MeshLoader>(
    cache: &mut MeshCache<L>,
    meshes: &[String],
) -> anyhow::Result<Vec<MeshSummary>> {
    meshes
        .iter()
        .map(|source| {
            cache
                .try_get_mesh(source)
                .map(|mesh| mesh.summary())
                .with_context(|| format!("loading {source}"))
        })
        .collect()
}

fn summary_table(summaries: &[MeshSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:<40} {:>9} {:>9} {:>9}", "source", "vertices", "indices", "triangles");
    for s in summaries {
        let _ = writeln!(
            out,
            "{:<40} {:>9} {:>9} {:>9}",
            s.source, s.vertex_count, s.index_count, s.triangle_count
        );
    }
    out
}

/// Two entities: one renderable and placed, one with a transform only.
/// The mesh is requested twice to exercise the cache.
fn build_scene<L: MeshLoader>(cache: &mut MeshCache<L>, mesh: &str) -> anyhow::Result<World> {
    let first = cache
        .try_get_mesh(mesh)
        .with_context(|| format!("loading {mesh}"))?;
    let again = cache.get_mesh(mesh);
    tracing::debug!(
        shared = again.as_ref().is_some_and(|m| std::rc::Rc::ptr_eq(m, &first)),
        "mesh requested twice"
    );

    let mut world = World::new();
    let cube = world.spawn(RenderComponent::new(first));
    world.add_component(
        cube,
        TransformComponent {
            position: Vec3::new(0.0, 0.0, 0.5),
            rotation: Vec3::new(0.4, 0.0, 0.0),
            scale: Vec3::splat(0.5),
        },
    );
    world.spawn(TransformComponent::from_position(Vec3::new(2.0, 0.0, 0.0)));
    Ok(world)
}

/// Rotate every transform around Y by `radians`.
fn spin(world: &mut World, radians: f32) {
    let entities: Vec<_> = world.get_all_entities().iter().copied().collect();
    for entity in entities {
        if let Ok(record) = world.get_component_mut(entity) {
            if let Some(transform) = record.transform.as_mut() {
                transform.rotation.y += radians;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshscene_render::SPIRV_MAGIC;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n";

    fn write_obj(dir: &tempfile::TempDir, name: &str, text: &str) -> String {
        let path = dir.path().join(name);
        std::fs::write(&path, text).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn inspect_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_obj(&dir, "tri.obj", TRIANGLE);
        let mut cache = MeshCache::new();

        let summaries = inspect(&mut cache, &[path.clone(), path]).unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].vertex_count, 3);
        assert_eq!(summaries[0].triangle_count, 1);
        assert_eq!(cache.len(), 1);

        let table = summary_table(&summaries);
        assert!(table.starts_with("source"));
        assert_eq!(table.lines().count(), 3);
    }

    #[test]
    fn inspect_fails_on_missing_file() {
        let mut cache = MeshCache::new();
        let err = inspect(&mut cache, &["/no/such/mesh.obj".to_string()]).unwrap_err();
        assert!(err.to_string().contains("/no/such/mesh.obj"));
    }

    #[test]
    fn headless_scene_draws_one_entity() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_obj(&dir, "tri.obj", TRIANGLE);
        let mut module = SPIRV_MAGIC.to_le_bytes().to_vec();
        module.extend_from_slice(&[0; 16]);
        std::fs::write(dir.path().join("vert.spv"), &module).unwrap();
        std::fs::write(dir.path().join("frag.spv"), &module).unwrap();

        let mut cache = MeshCache::new();
        let mut world = build_scene(&mut cache, &path).unwrap();
        assert_eq!(world.entity_count(), 2);

        let mut renderer =
            FrameRenderer::new(HeadlessBackend::new(), RendererConfig::from_shader_dir(dir.path()));
        renderer.init_resources().unwrap();
        renderer.init_swap_chain_resources(64, 64).unwrap();
        for _ in 0..2 {
            spin(&mut world, 0.1);
            let stats = renderer.start_next_frame(&world, &()).unwrap();
            assert_eq!(stats.drawn, 1);
            assert_eq!(stats.skipped, 1);
        }
        assert_eq!(renderer.backend().counters().copies, 2);
    }
}
