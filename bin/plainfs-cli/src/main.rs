//! PlainFS CLI - Directory metadata admin tool
//!
//! Opens a filesystem-backed object store, rebuilds its directory index from
//! the `prefix.path` markers and runs one command against it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use plainfs_common::{Config, LocalPath};
use plainfs_metadata::{LocalObjectStorage, ObjectStorage, PlainRewritableMetadata};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "plainfs-cli")]
#[command(about = "PlainFS directory metadata CLI")]
#[command(version)]
struct Args {
    /// Root directory of the object store
    #[arg(short, long, env = "PLAINFS_ROOT")]
    root: PathBuf,

    /// Common key prefix of all objects in the store
    #[arg(short, long, default_value = "")]
    prefix: String,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of markers read in parallel while loading
    #[arg(long)]
    load_concurrency: Option<usize>,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the direct children of a directory
    Ls {
        /// Local directory path
        #[arg(default_value = "/")]
        path: String,
        /// Print as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Create a directory
    Mkdir {
        /// Local directory path
        path: String,
    },
    /// Show every local path to remote prefix mapping
    Mappings {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the directory tree below a path
    Tree {
        /// Local directory path
        #[arg(default_value = "/")]
        path: String,
    },
}

#[derive(Serialize)]
struct MappingRow {
    local_path: String,
    remote_prefix: String,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config file {}", path.display()))
}

async fn sorted_children(metadata: &PlainRewritableMetadata, dir: &LocalPath) -> Result<Vec<String>> {
    let mut names: Vec<String> = metadata.direct_children(dir).await?.into_iter().collect();
    names.sort();
    Ok(names)
}

async fn print_subtree(
    metadata: &PlainRewritableMetadata,
    dir: &LocalPath,
    depth: usize,
) -> Result<()> {
    let indent = "  ".repeat(depth);
    for name in sorted_children(metadata, dir).await? {
        let child = dir.child(&name)?;
        // Unmapped subdirectories are only recognizable by their content
        let is_dir = metadata.directory_exists(&child)
            || !metadata.direct_children(&child).await?.is_empty();
        if is_dir {
            println!("{indent}{name}/");
            Box::pin(print_subtree(metadata, &child, depth + 1)).await?;
        } else {
            println!("{indent}{name}");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_ref())?;

    // CLI takes precedence over the config file
    if let Some(load_concurrency) = args.load_concurrency {
        config.metadata.load_concurrency = load_concurrency;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let store: Arc<dyn ObjectStorage> =
        Arc::new(LocalObjectStorage::open(&args.root, args.prefix).await?);
    let metadata = PlainRewritableMetadata::open(store, &config.metadata)
        .await
        .with_context(|| format!("failed to load metadata from {}", args.root.display()))?;
    debug!("Load stats: {:?}", metadata.load_stats());

    match args.command {
        Commands::Ls { path, json } => {
            let dir = LocalPath::directory(&path)?;
            let names = sorted_children(&metadata, &dir).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&names)?);
            } else {
                for name in names {
                    println!("{name}");
                }
            }
        }
        Commands::Mkdir { path } => {
            let dir = LocalPath::directory(&path)?;
            let prefix = metadata.create_directory(&dir).await?;
            println!("{dir} -> {prefix}");
        }
        Commands::Mappings { json } => {
            let rows: Vec<MappingRow> = metadata
                .mappings()
                .into_iter()
                .map(|(local, remote)| MappingRow {
                    local_path: local.to_string(),
                    remote_prefix: remote.to_string(),
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in rows {
                    println!("{} -> {}", row.local_path, row.remote_prefix);
                }
            }
        }
        Commands::Tree { path } => {
            let dir = LocalPath::directory(&path)?;
            println!("{}", if dir.is_root() { "/" } else { dir.as_str() });
            print_subtree(&metadata, &dir, 1).await?;
        }
    }

    Ok(())
}
