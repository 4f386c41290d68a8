use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::Command;

/// (WGSL source, SPIR-V output) pairs, relative to the workspace root.
const SHADERS: &[(&str, &str)] = &[
    ("shaders/mesh.vert.wgsl", "shaders/vert.spv"),
    ("shaders/mesh.frag.wgsl", "shaders/frag.spv"),
];

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for meshscene")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: shaders, fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace
    Build,
    /// Compile the WGSL shaders to the SPIR-V files the renderer loads
    Shaders,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            compile_shaders()?;
            cargo("fmt", &["fmt", "--all", "--", "--check"])?;
            cargo("clippy", &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])?;
            cargo("test", &["test", "--workspace"])?;
            cargo("doc", &["doc", "--workspace", "--no-deps"])?;
        }
        Commands::Fmt => cargo("fmt", &["fmt", "--all", "--", "--check"])?,
        Commands::Clippy => {
            cargo("clippy", &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])?
        }
        Commands::Test => cargo("test", &["test", "--workspace"])?,
        Commands::Doc => cargo("doc", &["doc", "--workspace", "--no-deps"])?,
        Commands::Build => {
            compile_shaders()?;
            cargo("build", &["build", "--workspace"])?;
        }
        Commands::Shaders => compile_shaders()?,
    }

    Ok(())
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn cargo(what: &str, args: &[&str]) -> Result<()> {
    println!("==> Running cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(args)
        .current_dir(workspace_root())
        .status()?;
    if !status.success() {
        anyhow::bail!("cargo {what} failed");
    }
    Ok(())
}

fn compile_shaders() -> Result<()> {
    let root = workspace_root();
    for (source, output) in SHADERS {
        println!("==> Compiling {source} -> {output}");
        let wgsl = std::fs::read_to_string(root.join(source))
            .with_context(|| format!("reading {source}"))?;
        let words = wgsl_to_spirv(&wgsl).with_context(|| format!("compiling {source}"))?;
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        std::fs::write(root.join(output), bytes).with_context(|| format!("writing {output}"))?;
    }
    Ok(())
}

/// Parse, validate and emit one WGSL module as SPIR-V words.
fn wgsl_to_spirv(wgsl: &str) -> Result<Vec<u32>> {
    let module = naga::front::wgsl::parse_str(wgsl)
        .map_err(|e| anyhow::anyhow!(e.emit_to_string(wgsl)))?;
    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| anyhow::anyhow!(e.emit_to_string(wgsl)))?;
    let words = naga::back::spv::write_vec(&module, &info, &naga::back::spv::Options::default(), None)?;
    Ok(words)
}
