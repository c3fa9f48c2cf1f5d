use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rtypes::Value;
use scripting::{dump, HostConfig, World};
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rbxhost")]
#[command(about = "Lua scripting host for Roblox data files", long_about = None)]
struct Cli {
    /// Raise the log level; repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// KDL host configuration
    #[arg(long, env = "RBXHOST_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Descriptor file installed as the global descriptor; overrides the configuration
    #[arg(long, global = true)]
    desc: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Lua script
    Run {
        /// Script file
        file: PathBuf,

        /// Arguments passed to the script as strings
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Print the types, formats and libraries of the host as JSON
    Dump {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let world = load_world(&cli)?;

    match cli.command {
        Commands::Run { file, args } => {
            let args = args.into_iter().map(Value::String).collect();
            let results = world
                .do_file(&file, args)
                .with_context(|| format!("Failed to run {}", file.display()))?;
            tracing::info!(script = %file.display(), results = results.len(), "script finished");
        }
        Commands::Dump { output } => {
            let json = serde_json::to_string_pretty(&dump::dump(&world))?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    tracing::info!(path = %path.display(), "wrote dump");
                }
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}

fn load_world(cli: &Cli) -> Result<World> {
    let mut config = match &cli.config {
        Some(path) => HostConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HostConfig::default(),
    };
    if let Some(desc) = &cli.desc {
        config.desc = Some(desc.clone());
    }

    let world = World::new();
    world
        .apply_config(&config)
        .context("Failed to apply host configuration")?;
    tracing::info!(
        libraries = world.opened_libraries().len(),
        desc = world.global_desc().is_some(),
        "host ready"
    );
    Ok(world)
}
