use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, Registry, reload};

use panoramax2osm::api::{Element, HttpTransport, ImageryService, PoiService};
use panoramax2osm::config::FileConfig;
use panoramax2osm::domain::{BoundingBox, CategoryFilter, ImageRecord};

/// Query OpenStreetMap points of interest and nearby Panoramax pictures
///
/// Examples:
///   # Bike parkings and repair stations in central Paris
///   panoramax2osm pois bike 48.8,2.3,48.9,2.4
///
///   # Cafes, bakeries and shops within 500m of a point
///   panoramax2osm pois commerce --lat 48.8566 --lon 2.3522 --radius 500
///
///   # Street-level pictures looking at a point
///   panoramax2osm images-near 48.85 2.35
///
///   # One picture by identifier, as a short summary
///   panoramax2osm --format summary image 0a1b2c3d-...
#[derive(Parser, Debug)]
#[command(name = "panoramax2osm")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches panoramax2osm.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Points of interest of one category inside a bounding box
    Pois {
        /// Category: bike, commerce or publicSpace
        filter: CategoryFilter,

        /// Bounding box as south,west,north,east (or use --lat/--lon)
        #[arg(allow_hyphen_values = true)]
        bbox: Option<BoundingBox>,

        /// Latitude of the search center (use with --lon)
        #[arg(long, requires = "lon", conflicts_with = "bbox", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude of the search center (use with --lat)
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// Search radius in meters around --lat/--lon
        #[arg(short = 'r', long, default_value = "1000")]
        radius: u32,
    },

    /// Pictures around a point
    ImagesNear {
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },

    /// A single picture by identifier
    Image { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Summary,
}

fn main() -> Result<()> {
    let args = Args::parse();
    // Logging comes up first so warnings about skipped config files are shown
    let log_filter = init_tracing(args.verbose);
    let file_config = FileConfig::resolve(args.config.as_deref())?;
    if file_config.verbose && !args.verbose {
        log_filter
            .reload(env_filter(true))
            .context("Failed to apply verbose logging from config")?;
    }

    let transport = HttpTransport::new(&file_config.http)?;

    match args.command {
        Command::Pois {
            filter,
            bbox,
            lat,
            lon,
            radius,
        } => {
            let bbox = match (bbox, lat, lon) {
                (Some(bbox), _, _) => bbox,
                (None, Some(lat), Some(lon)) => BoundingBox::around((lat, lon), radius),
                _ => bail!("Must provide either a bounding box or --lat and --lon"),
            };

            let service = PoiService::new(transport, &file_config.overpass);
            let step = Step::start(format!("Fetching {filter} POIs from Overpass..."));
            let pois = service
                .try_fetch_pois(&bbox, filter)
                .with_context(|| format!("Failed to fetch {filter} POIs in {bbox}"))?;
            step.finish(&format!("Fetched {} elements", pois.len()));

            match args.format {
                OutputFormat::Json => print_json(&**pois)?,
                OutputFormat::Summary => pois.iter().for_each(print_poi),
            }
        }
        Command::ImagesNear { lat, lon } => {
            let service = ImageryService::new(transport, &file_config.panoramax);
            let step = Step::start("Searching Panoramax pictures...".to_string());
            let images = service
                .try_fetch_images_near(lat, lon)
                .with_context(|| format!("Failed to fetch pictures near ({lat}, {lon})"))?;
            step.finish(&format!("Found {} pictures", images.len()));

            print_images(&images, args.format)?;
        }
        Command::Image { id } => {
            let service = ImageryService::new(transport, &file_config.panoramax);
            let step = Step::start(format!("Fetching Panoramax picture {id}..."));
            let images = service
                .try_fetch_image_by_id(&id)
                .with_context(|| format!("Failed to fetch picture {id}"))?;
            step.finish(&format!("Fetched picture {id}"));

            if images.is_empty() {
                tracing::warn!("Picture {id} has no thumbnail");
            }
            print_images(&images, args.format)?;
        }
    }

    Ok(())
}

/// `RUST_LOG` if set, else `debug` when verbose and `info` otherwise
fn env_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
}

/// Log to stderr, keeping stdout for results. The returned handle swaps the
/// filter once the config file has been read.
fn init_tracing(verbose: bool) -> reload::Handle<EnvFilter, Registry> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let (filter, handle) = reload::Layer::new(env_filter(verbose));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    handle
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn print_poi(element: &Element) {
    let position = element
        .position()
        .map(|(lat, lon)| format!("{lat:.5},{lon:.5}"))
        .unwrap_or_else(|| "-".to_string());
    let label = element
        .tag("name")
        .or_else(|| element.tag("amenity"))
        .unwrap_or("");
    println!("{}/{}\t{}\t{}", element.type_, element.id, position, label);
}

fn print_images(images: &[ImageRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(images)?,
        OutputFormat::Summary => {
            for image in images {
                println!(
                    "{}\t{:.5},{:.5}\t{} via {}\t{}",
                    image.id,
                    image.lat,
                    image.lng,
                    image.provider_name,
                    image.instance_name,
                    image.viewer_url
                );
            }
        }
    }
    Ok(())
}

/// One network round-trip shown as a spinner, then logged with its duration
struct Step {
    spinner: ProgressBar,
    started: Instant,
}

impl Step {
    fn start(message: String) -> Self {
        let spinner = ProgressBar::new_spinner().with_message(message);
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg} {elapsed}") {
            spinner.set_style(style);
        }
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            spinner,
            started: Instant::now(),
        }
    }

    fn finish(self, summary: &str) {
        self.spinner.finish_and_clear();
        tracing::info!("{summary} [{:.1}s]", self.started.elapsed().as_secs_f32());
    }
}
