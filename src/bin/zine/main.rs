//! CLI tool to inspect and convert zine blobs.
//!
//! Usage:
//!   zine inspect story.zine [--stats]
//!   zine to-json story.zine [-o story.json]
//!   zine from-json story.json [-o story.zine] [--validate]

mod inspect;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use zinedoc::{
    codec, CompressionConfig, Document, FieldCompressor, StoryboardOptions, ZineStoryboard,
};

#[derive(Parser, Debug)]
#[command(name = "zine", about = "Inspect and convert zine documents", version)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Compression settings (JSON)
    #[arg(long, global = true, env = "ZINE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print panels, layers and fields of a blob
    Inspect {
        file: PathBuf,

        /// Print blob and document sizes
        #[arg(long, default_value = "false")]
        stats: bool,
    },

    /// Write the decompressed document as JSON
    ToJson {
        file: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build a compressed blob from JSON
    FromJson {
        file: PathBuf,

        /// Output file (defaults to input path with .zine extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reload the written blob and compare counts
        #[arg(long, default_value = "false")]
        validate: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let options = load_options(args.config.as_deref())?;

    match args.command {
        Command::Inspect { file, stats } => {
            let bytes = read_file(&file)?;
            let storyboard = load_blob(&bytes, options).await?;
            inspect::print_tree(&storyboard);
            if stats {
                inspect::print_stats(&storyboard, bytes.len())?;
            }
        }
        Command::ToJson { file, output } => {
            let bytes = read_file(&file)?;
            let storyboard = load_blob(&bytes, options).await?;
            let json = serde_json::to_string_pretty(&storyboard.store().snapshot())
                .context("Failed to serialize document")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).context("Failed to write output file")?;
                    println!("Wrote {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        Command::FromJson {
            file,
            output,
            validate,
        } => {
            let json = std::fs::read_to_string(&file).context("Failed to read input file")?;
            let document: Document =
                serde_json::from_str(&json).context("Failed to parse JSON")?;

            let storyboard = ZineStoryboard::with_options(options.clone());
            storyboard
                .load_uncompressed(&codec::encode(&document)?)
                .context("Failed to build storyboard")?;
            let binary = storyboard.export().await.context("Failed to export")?;

            let output_path = output.unwrap_or_else(|| {
                let mut path = file.clone();
                path.set_extension("zine");
                path
            });
            std::fs::write(&output_path, &binary).context("Failed to write output file")?;
            info!(bytes = binary.len(), "blob written");

            if validate {
                let reloaded = load_blob(&binary, options).await?;
                inspect::compare_counts(&storyboard, &reloaded)?;
                println!("✓ Validation passed!");
            }

            println!(
                "Successfully converted {} → {}",
                file.display(),
                output_path.display()
            );
        }
    }

    Ok(())
}

fn load_options(config: Option<&Path>) -> Result<StoryboardOptions> {
    let config = match config {
        Some(path) => CompressionConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CompressionConfig::default(),
    };
    debug!(?config, "compression config");
    let compressor = FieldCompressor::from_config(config).context("Invalid compression config")?;
    Ok(StoryboardOptions::new().with_compressor(compressor))
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    if !path.exists() {
        anyhow::bail!("Input file does not exist: {}", path.display());
    }
    std::fs::read(path).context("Failed to read input file")
}

async fn load_blob(bytes: &[u8], options: StoryboardOptions) -> Result<ZineStoryboard> {
    let storyboard = ZineStoryboard::with_options(options);
    storyboard.load(bytes).await.context("Failed to load zine")?;
    Ok(storyboard)
}
