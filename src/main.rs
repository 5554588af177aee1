// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::EnvFilter;
use unistore::config::{load_config_with_env, LoggingConfig};
use unistore::storage::{BackendKind, StorageContext};

/// unistore - Operate on the configured object storage backend
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Backend identifier (overrides config file)
    #[arg(short, long)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a local file
    Put {
        key: String,
        file: PathBuf,
        #[arg(long, default_value = "application/octet-stream")]
        content_type: String,
    },
    /// Download an object to a file or stdout
    Get {
        key: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show whether an object exists and its size
    Stat { key: String },
    /// Delete an object
    Rm { key: String },
    /// Copy an object
    Cp { src: String, dest: String },
    /// Rename an object (copy, then delete the source)
    Mv { src: String, dest: String },
    /// Print a signed retrieval URL
    Url {
        key: String,
        #[arg(long)]
        ttl_secs: Option<u64>,
    },
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format.as_str() {
        "json" => builder.json().try_init(),
        _ => builder.try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration from file
    let mut config = load_config_with_env(&args.config)?;

    // Apply CLI overrides
    if let Some(backend) = args.backend {
        config.storage.backend = backend;
    }

    init_tracing(&config.logging)?;

    info!("Loaded configuration from: {:?}", args.config);
    info!("Storage backend: {}", config.storage.backend);

    let context = StorageContext::new();
    let backend = context
        .init(&config.storage)
        .await
        .context("Failed to initialize storage backend")?;

    match args.command {
        Command::Put {
            key,
            file,
            content_type,
        } => {
            backend
                .put_file(&key, &file, &content_type)
                .await
                .with_context(|| format!("Failed to upload {}", file.display()))?;
            info!("Uploaded {} to '{}'", file.display(), key);
        }

        Command::Get { key, output } => {
            let mut reader = backend.get(&key).await?;
            match output {
                Some(path) => {
                    let mut file = tokio::fs::File::create(&path)
                        .await
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    let copied = tokio::io::copy(&mut reader, &mut file).await?;
                    file.flush().await?;
                    info!("Wrote {} bytes to {}", copied, path.display());
                }
                None => {
                    let mut stdout = tokio::io::stdout();
                    tokio::io::copy(&mut reader, &mut stdout).await?;
                    stdout.flush().await?;
                }
            }
        }

        Command::Stat { key } => {
            if !backend.exists(&key).await {
                bail!("'{}' is not retrievable", key);
            }
            let size = backend.size(&key).await?;
            println!("{}\t{}", key, size);
        }

        Command::Rm { key } => {
            backend.delete(&key).await?;
            info!("Deleted '{}'", key);
        }

        Command::Cp { src, dest } => {
            backend.copy(&src, &dest).await?;
            info!("Copied '{}' to '{}'", src, dest);
        }

        Command::Mv { src, dest } => {
            if let Err(e) = backend.rename(&src, &dest).await {
                if e.is_partial() {
                    bail!("'{}' was copied to '{}' but is still present: {}", src, dest, e);
                }
                return Err(e.into());
            }
            info!("Renamed '{}' to '{}'", src, dest);
        }

        Command::Url { key, ttl_secs } => {
            let url = backend
                .signed_url(&key, ttl_secs.map(Duration::from_secs))
                .await?;
            println!("{}", url);
        }
    }

    Ok(())
}
