use clap::{Parser, Subcommand};
use darkroom::catalog::{JsonCatalog, PhotoRepository};
use darkroom::config::{self, Config};
use darkroom::heic::CommandConverter;
use darkroom::imaging::RustBackend;
use darkroom::ingest::IngestionCoordinator;
use darkroom::metadata::NominatimGeocoder;
use darkroom::reoptimize::{self, Overrides, ReoptimizationEngine};
use darkroom::storage::StorageGateway;
use darkroom::{dedupe, output};
use std::path::PathBuf;
use tracing::warn;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "darkroom")]
#[command(about = "Photo ingestion pipeline for portfolio sites")]
#[command(long_about = "\
Photo ingestion pipeline for portfolio sites

Every upload becomes three renditions under the public root:

  public/
  ├── display/{slug}-{id}.avif       # long edge ≤ images.max_resolution
  ├── thumbnails/{slug}-{id}.webp    # long edge ≤ images.thumbnail_size
  └── watermarked/{slug}-{id}.webp   # display size, watermark composited

Originals go to the remote bucket when [storage] is configured, otherwise
to private/originals/. Records are kept in the catalog file.

Run 'darkroom gen-config' to generate a documented darkroom.toml.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = config::CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Log at debug level (overrides RUST_LOG)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process uploads into renditions and catalog records
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Category to file the photos under
        #[arg(long)]
        category: Option<String>,
    },
    /// Queue uploads for deferred processing
    QuickUpload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Process queued uploads (all of them, or one by id)
    ProcessPending { id: Option<Uuid> },
    /// Check files against the catalog for duplicates without ingesting
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Regenerate renditions under new settings
    Reoptimize {
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        id: Option<Uuid>,
        #[arg(long)]
        all: bool,
        /// Long-edge limit for the display rendition
        #[arg(long)]
        max_resolution: Option<u32>,
        /// WebP-equivalent quality (1-100)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
        quality: Option<u32>,
    },
    /// Delete a photo's files and record
    Delete {
        id: Uuid,
        #[arg(long)]
        keep_original: bool,
    },
    /// List catalogued photos
    List,
    /// Print a stock darkroom.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let config = config::load_config(&cli.config)?;
    let mut catalog = JsonCatalog::open(&config.paths.catalog)?;
    let backend = RustBackend::new();
    let gateway = StorageGateway::from_config(&config);
    let heic = CommandConverter::from_config(&config.heic);
    let public_root = config.paths.public_root.clone();

    match cli.command {
        Command::Ingest { files, category } => {
            let geocoder = build_geocoder(&config);
            let mut coordinator =
                IngestionCoordinator::new(&config, &backend, &gateway, &mut catalog, &heic);
            if let Some(geocoder) = &geocoder {
                coordinator = coordinator.with_geocoder(geocoder);
            }
            let report = coordinator.ingest_batch(&files, category.as_deref());
            output::print_batch_report(&report);
        }
        Command::QuickUpload { files, category } => {
            let mut coordinator =
                IngestionCoordinator::new(&config, &backend, &gateway, &mut catalog, &heic);
            let report = coordinator.quick_upload_batch(&files, category.as_deref());
            output::print_batch_report(&report);
        }
        Command::ProcessPending { id } => {
            let geocoder = build_geocoder(&config);
            let mut coordinator =
                IngestionCoordinator::new(&config, &backend, &gateway, &mut catalog, &heic);
            if let Some(geocoder) = &geocoder {
                coordinator = coordinator.with_geocoder(geocoder);
            }
            match id {
                Some(id) => {
                    let photo = coordinator.process_pending(id)?;
                    output::print_photo_list(std::slice::from_ref(&photo));
                }
                None => output::print_batch_report(&coordinator.process_all_pending()),
            }
        }
        Command::Check { files } => {
            let check = dedupe::check_batch(
                &backend,
                &heic,
                &catalog,
                &files,
                config.images.duplicate_threshold,
            );
            output::print_duplicate_check(&check);
        }
        Command::Reoptimize {
            id,
            all,
            max_resolution,
            quality,
        } => {
            let overrides = Overrides {
                max_resolution,
                quality,
            };
            let mut engine =
                ReoptimizationEngine::new(&config, &backend, &gateway, &mut catalog, &heic);
            match id {
                Some(id) if !all => {
                    let photo = engine.reoptimize(id, overrides)?;
                    output::print_photo_list(std::slice::from_ref(&photo));
                }
                _ => output::print_batch_report(&engine.reoptimize_all(overrides)),
            }
        }
        Command::Delete { id, keep_original } => {
            let photo = reoptimize::delete_photo(
                &mut catalog,
                &gateway,
                &public_root,
                id,
                keep_original,
            )?;
            println!("Deleted {} ({})", photo.title, photo.id);
        }
        Command::List => {
            output::print_photo_list(&catalog.all());
        }
        // Handled before the config is loaded.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Install the global subscriber: `RUST_LOG` filtering (default `info`),
/// or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_geocoder(config: &Config) -> Option<NominatimGeocoder> {
    if !config.geocoding.enabled {
        return None;
    }
    match NominatimGeocoder::new(config.geocoding.endpoint.clone(), &config.geocoding.user_agent) {
        Ok(geocoder) => Some(geocoder),
        Err(e) => {
            warn!(error = %e, "Reverse geocoding unavailable");
            None
        }
    }
}
