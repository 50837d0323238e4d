// SPDX-License-Identifier: MIT OR Apache-2.0
//! `materialc` - validates `OrdoPlay` material graphs and writes their shaders.

mod commands;
mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use config::{MaterialcConfig, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser, Debug)]
#[command(name = "materialc", version, about)]
struct Cli {
    /// Configuration file (defaults to ./materialc.ron when present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check material graphs without generating code.
    Validate(MaterialArgs),
    /// Generate vertex and fragment programs for material graphs.
    Generate(GenerateArgs),
    /// List the known material families.
    Families(FamiliesArgs),
    /// Write a default configuration file.
    Init(InitArgs),
}

#[derive(Parser, Debug)]
struct MaterialArgs {
    /// Material graph documents; the configured list when empty.
    materials: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    materials: MaterialArgs,

    /// Output directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Override compile worker threads.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Parser, Debug)]
struct FamiliesArgs {
    /// Write every family as a definition file into this directory.
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InitArgs {
    /// Destination of the configuration file.
    #[arg(default_value = CONFIG_FILE_NAME)]
    path: PathBuf,

    /// Replace an existing file.
    #[arg(long, default_value_t = false)]
    force: bool,
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive("ordoplay_materialc=info".parse()?)
        .add_directive("ordoplay_shader_assembly=info".parse()?)
        .add_directive("ordoplay_material_graph=warn".parse()?);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<MaterialcConfig> {
    match path {
        Some(path) => MaterialcConfig::load(path),
        None if Path::new(CONFIG_FILE_NAME).exists() => MaterialcConfig::load(Path::new(CONFIG_FILE_NAME)),
        None => Ok(MaterialcConfig::default()),
    }
}

fn materials(args: MaterialArgs, config: &MaterialcConfig) -> anyhow::Result<Vec<PathBuf>> {
    let materials = if args.materials.is_empty() {
        config.materials.clone()
    } else {
        args.materials
    };
    if materials.is_empty() {
        anyhow::bail!("No material graphs given on the command line or in the configuration");
    }
    Ok(materials)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    match cli.cmd {
        Command::Validate(args) => {
            let materials = materials(args, &config)?;
            commands::validate(&config, &materials)
        }
        Command::Generate(args) => {
            if let Some(out) = args.out {
                config.output_dir = out;
            }
            if args.threads.is_some() {
                config.threads = args.threads;
            }
            let materials = materials(args.materials, &config)?;
            let written = commands::generate(&config, &materials)?;
            for path in written {
                eprintln!("wrote {}", path.display());
            }
            Ok(())
        }
        Command::Families(args) => commands::families(&config, args.export.as_deref()),
        Command::Init(args) => {
            if args.path.exists() && !args.force {
                anyhow::bail!("{} already exists; pass --force to replace it", args.path.display());
            }
            std::fs::write(&args.path, MaterialcConfig::default().to_ron()?)
                .with_context(|| format!("Failed to write {}", args.path.display()))?;
            eprintln!("wrote {}", args.path.display());
            Ok(())
        }
    }
}
