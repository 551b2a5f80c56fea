//! mediaflow: ingest images into remote storage from the command line.
//!
//! Configuration comes from MEDIAFLOW_* variables (a `.env` file is read
//! too). Results are printed as JSON on stdout; logs go to stderr.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use mediaflow_cli::{
    build_destination, build_options, init_tracing, load_library, parse_crop, read_raw_file,
};
use mediaflow_core::{
    library, normalize, share_provider, AspectRatio, IngestProfile, PipelineConfig,
};
use mediaflow_processing::{resolve, HttpImageProbe, IngestPipeline};
use mediaflow_storage::{AssetCatalog, HttpUploader};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "mediaflow", about = "Media ingestion and optimization pipeline")]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate, optimize and upload one or more image files
    Ingest {
        /// Files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Processing profile: featured, library or avatar
        #[arg(long, default_value = "featured")]
        profile: IngestProfile,
        /// Storage folder (overrides MEDIAFLOW_UPLOAD_FOLDER)
        #[arg(long)]
        folder: Option<String>,
        /// Comma separated tags (overrides MEDIAFLOW_UPLOAD_TAGS)
        #[arg(long)]
        tags: Option<String>,
        /// Crop rectangle in source pixels: x,y,width,height
        #[arg(long, value_name = "X,Y,W,H")]
        crop: Option<String>,
        /// Aspect ratio for the crop, e.g. 16:9
        #[arg(long, value_name = "W:H")]
        aspect: Option<AspectRatio>,
    },
    /// Normalize a share link and check that it loads as an image
    Url {
        /// Share link or direct image URL
        url: String,
    },
    /// Rewrite a share link into its direct-download form without loading it
    Normalize {
        /// Share link
        url: String,
    },
    /// Search the media library by public id, file name or tag
    Search {
        /// Search query; empty lists everything
        #[arg(default_value = "")]
        query: String,
        /// Search a JSON export instead of the remote browse endpoint
        #[arg(long, value_name = "FILE")]
        library: Option<PathBuf>,
        /// Restrict the remote listing to one folder
        #[arg(long)]
        folder: Option<String>,
    },
}

#[derive(Serialize)]
struct NormalizedUrl {
    input: String,
    normalized: String,
    provider: Option<String>,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = PipelineConfig::from_env().context("Invalid MEDIAFLOW_* configuration")?;

    match cli.command {
        Commands::Ingest {
            files,
            profile,
            folder,
            tags,
            crop,
            aspect,
        } => {
            let crop = crop.as_deref().map(parse_crop).transpose()?;
            let options = build_options(profile, crop, aspect)?;
            let destination =
                build_destination(config.storage.destination(), folder, tags.as_deref());
            let policy = config.validation.clone();

            let uploader = HttpUploader::new(&config.storage)
                .context("Set MEDIAFLOW_UPLOAD_URL to the storage upload endpoint")?;
            let probe = HttpImageProbe::from_config(&config)?;
            let pipeline = IngestPipeline::new(config, Arc::new(uploader), Arc::new(probe));

            let mut raw_files = Vec::with_capacity(files.len());
            for path in &files {
                raw_files.push(read_raw_file(path).await?);
            }

            if raw_files.len() == 1 {
                let file = raw_files.remove(0);
                let report = pipeline
                    .ingest_file_with(file, &policy, &destination, options)
                    .await?;
                print_json(&report)?;
            } else {
                let total = raw_files.len();
                let results = pipeline
                    .ingest_batch_with(raw_files, &policy, &destination, options)
                    .await;
                print_json(&results)?;

                let failed = results.iter().filter(|r| !r.is_success()).count();
                if failed > 0 {
                    bail!("{} of {} files failed", failed, total);
                }
            }
        }
        Commands::Url { url } => {
            let probe = HttpImageProbe::from_config(&config)?;
            let resolved = resolve(&probe, &url).await?;
            print_json(&resolved)?;
        }
        Commands::Normalize { url } => {
            let provider = share_provider(url.trim()).map(|p| p.to_string());
            print_json(&NormalizedUrl {
                normalized: normalize(&url),
                input: url,
                provider,
            })?;
        }
        Commands::Search {
            query,
            library: library_path,
            folder,
        } => {
            let assets = match library_path {
                Some(path) => load_library(&path).await?,
                None => {
                    let catalog = HttpUploader::new(&config.storage)
                        .context("Set MEDIAFLOW_UPLOAD_URL or pass --library")?;
                    catalog.list_assets(folder.as_deref()).await?
                }
            };
            let matches = library::search(&assets, &query);
            print_json(&matches)?;
        }
    }

    Ok(())
}
