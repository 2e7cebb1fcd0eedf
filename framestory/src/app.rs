use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use framestory_ml::vision::VisionModel;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::Config;
use crate::folder::process_images_in_folder;
use crate::output::{build_output_format, write_output};

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "TOML file overriding the built-in configuration"
    )]
    config: Option<PathBuf>,
    #[arg(
        long,
        help = "Force using CPU even if GPU is available",
        default_value_t = false
    )]
    cpu: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .init();
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::resolve(cli.config.as_deref())?;
    config.cpu |= cli.cpu;

    let path = run_pipeline(&config).await?;
    println!("Output saved to {}", path.display());
    Ok(())
}

/// Frames → metadata → story → `story_output.json`. Returns the written path.
pub async fn run_pipeline(config: &Config) -> Result<PathBuf> {
    if let Some(dir) = &config.cache_dir {
        framestory_ml::set_cache_dir(dir.clone())?;
    }
    std::fs::create_dir_all(&config.output_folder).with_context(|| {
        format!(
            "failed to create output folder {}",
            config.output_folder.display()
        )
    })?;

    let mut vision = VisionModel::load(&config.metadata_model, config.cpu).await?;
    let metadata = process_images_in_folder(&config.image_folder, &mut vision)?;
    tracing::info!("Extracted metadata for {} frames", metadata.len());

    let output = build_output_format(
        &metadata,
        &config.story_model,
        &config.story_prompt,
        config.story_options(),
        config.cpu,
    )
    .await?;

    write_output(&config.output_folder, &output)
}
