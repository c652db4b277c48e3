//! meshrf - radio link and viewshed analysis over terrain tiles.

mod config;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use config::AppConfig;
use image::GrayImage;
use meshrf_kernel::{Kernel, NativeKernel};
use meshrf_link::{
    analyze_link, presets, LinkAnalysis, LinkConfig, PropagationModel, TerrainSample,
};
use meshrf_tiles::{
    ground_sample_distance, required_tile_radius, sample_profile, GeoPoint, HttpTileSource,
    TileAddress,
};
use meshrf_viewshed::{AnalysisOutcome, ViewshedLayer, ViewshedOrchestrator, ViewshedRequest};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "meshrf")]
#[command(version, about = "Radio link and viewshed analysis over terrain tiles", long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze a point-to-point link over sampled terrain
    Link(LinkArgs),
    /// Compute the area visible from one point
    Viewshed(ViewshedArgs),
    /// Show tile addressing for a coordinate
    Tile(TileArgs),
}

#[derive(Args)]
struct LinkArgs {
    /// Transmitter as "lat,lon"
    #[arg(long, allow_hyphen_values = true)]
    from: LatLon,

    /// Receiver as "lat,lon"
    #[arg(long, allow_hyphen_values = true)]
    to: LatLon,

    /// Frequency in MHz
    #[arg(long)]
    freq: Option<f64>,

    /// Transmitter antenna height above ground in meters
    #[arg(long)]
    tx_height: Option<f64>,

    /// Receiver antenna height above ground in meters
    #[arg(long)]
    rx_height: Option<f64>,

    /// Transmit power in dBm
    #[arg(long)]
    tx_power: Option<f64>,

    /// Radio preset id (e.g. MESHCORE_US)
    #[arg(long)]
    radio: Option<String>,

    /// Transmitting device id (e.g. HELTEC_V3)
    #[arg(long)]
    tx_device: Option<String>,

    /// Transmitting antenna id (e.g. OMNI_HIGH)
    #[arg(long)]
    tx_antenna: Option<String>,

    /// Receiving device id
    #[arg(long)]
    rx_device: Option<String>,

    /// Receiving antenna id
    #[arg(long)]
    rx_antenna: Option<String>,

    /// Path loss model
    #[arg(long, value_enum)]
    model: Option<ModelArg>,

    /// Number of terrain samples along the path
    #[arg(long, default_value = "256")]
    samples: usize,

    /// Tile zoom level for terrain sampling
    #[arg(long, default_value = "12")]
    zoom: u8,

    /// Engine library for the terrain model
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Print the full analysis as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ViewshedArgs {
    /// Observer as "lat,lon"
    #[arg(long, allow_hyphen_values = true)]
    at: LatLon,

    /// Observer height above ground in meters
    #[arg(long)]
    height: Option<f64>,

    /// Analysis radius in meters
    #[arg(long)]
    distance: Option<f64>,

    /// Engine library
    #[arg(long)]
    engine: Option<PathBuf>,

    /// Write the visibility mask as a grayscale PNG
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct TileArgs {
    /// Coordinate as "lat,lon"
    #[arg(long, allow_hyphen_values = true)]
    at: LatLon,

    /// Zoom level
    #[arg(long, default_value = "12")]
    zoom: u8,

    /// Also report the tile radius needed to cover this many meters
    #[arg(long)]
    radius: Option<f64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModelArg {
    /// Free-space path loss
    FreeSpace,
    /// Terrain-aware path loss from the engine
    Terrain,
}

impl From<ModelArg> for PropagationModel {
    fn from(model: ModelArg) -> Self {
        match model {
            ModelArg::FreeSpace => PropagationModel::FreeSpace,
            ModelArg::Terrain => PropagationModel::Terrain,
        }
    }
}

/// A `lat,lon` pair from the command line.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl FromStr for LatLon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected 'lat,lon', got '{}'", s))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|e| format!("bad latitude '{}': {}", lat.trim(), e))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|e| format!("bad longitude '{}': {}", lon.trim(), e))?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {} out of range", lat));
        }
        if !lon.is_finite() {
            return Err(format!("longitude {} is not finite", lon));
        }
        Ok(Self { lat, lon })
    }
}

impl From<LatLon> for GeoPoint {
    fn from(p: LatLon) -> Self {
        GeoPoint::new(p.lat, p.lon)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    }
    .with_env_token();

    match cli.command {
        Command::Link(args) => run_link(args, &config).await,
        Command::Viewshed(args) => run_viewshed(args, &config).await,
        Command::Tile(args) => run_tile(args, &config),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_kernel(library: Option<&Path>) -> Result<NativeKernel> {
    let kernel = match library {
        Some(path) => NativeKernel::load(path),
        None => NativeKernel::load_default(),
    };
    kernel.context("loading engine library")
}

/// Apply presets and command-line overrides on top of the configured link.
fn link_config(args: &LinkArgs, base: &LinkConfig) -> Result<LinkConfig> {
    let mut link = base.clone();

    if let Some(id) = &args.radio {
        let radio = presets::radio_preset(id).ok_or_else(|| anyhow!("unknown radio preset '{}'", id))?;
        link = link.with_radio(radio);
    }
    if args.tx_device.is_some() || args.tx_antenna.is_some() {
        let (device, antenna) = hardware(args.tx_device.as_deref(), args.tx_antenna.as_deref())?;
        link = link.with_transmitter(device, antenna);
    }
    if args.rx_device.is_some() || args.rx_antenna.is_some() {
        let (device, antenna) = hardware(args.rx_device.as_deref(), args.rx_antenna.as_deref())?;
        link = link.with_receiver(device, antenna);
    }

    if let Some(freq) = args.freq {
        link.frequency_mhz = freq;
    }
    if let Some(h) = args.tx_height {
        link.tx_antenna_height_m = h;
    }
    if let Some(h) = args.rx_height {
        link.rx_antenna_height_m = h;
    }
    if let Some(p) = args.tx_power {
        link.tx_power_dbm = p;
    }
    Ok(link)
}

fn hardware(
    device: Option<&str>,
    antenna: Option<&str>,
) -> Result<(&'static presets::DeviceProfile, &'static presets::AntennaProfile)> {
    let device = match device {
        Some(id) => presets::device_profile(id).ok_or_else(|| anyhow!("unknown device '{}'", id))?,
        None => &presets::CUSTOM_DEVICE,
    };
    let antenna = match antenna {
        Some(id) => presets::antenna_profile(id).ok_or_else(|| anyhow!("unknown antenna '{}'", id))?,
        None => &presets::STUBBY,
    };
    Ok((device, antenna))
}

async fn run_link(args: LinkArgs, config: &AppConfig) -> Result<()> {
    let link = link_config(&args, &config.link)?;
    let mut params = config.analysis.clone();
    if let Some(model) = args.model {
        params.propagation_model = model.into();
    }

    let kernel = match params.propagation_model {
        PropagationModel::Terrain => Some(load_kernel(
            args.engine.as_deref().or(config.engine.library.as_deref()),
        )?),
        PropagationModel::FreeSpace => None,
    };

    let source = HttpTileSource::new(&config.tiles)?;
    let points = sample_profile(&source, args.from.into(), args.to.into(), args.samples, args.zoom)
        .await
        .context("sampling terrain profile")?;
    let stats = source.download_stats();
    debug!(
        tiles = stats.tiles_downloaded,
        bytes = stats.bytes_downloaded,
        failures = stats.failures,
        "Tile downloads"
    );

    let profile: Vec<TerrainSample> = points.into_iter().map(TerrainSample::from).collect();
    let analysis = analyze_link(
        &profile,
        &link,
        &params,
        kernel.as_ref().map(|k| k as &dyn Kernel),
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_link(&args, &link, &analysis);
    }
    Ok(())
}

fn print_link(args: &LinkArgs, link: &LinkConfig, analysis: &LinkAnalysis) {
    let terrain = &analysis.profile.terrain;
    let budget = &analysis.budget;

    println!("Link {:.5},{:.5} -> {:.5},{:.5}", args.from.lat, args.from.lon, args.to.lat, args.to.lon);
    println!("  Distance:        {:.2} km", analysis.profile.distance_m / 1000.0);
    println!("  Frequency:       {:.3} MHz", link.frequency_mhz);
    println!(
        "  Terrain:         {:.0}-{:.0} m (mean {:.0} m, {} samples @ {:.0} m)",
        terrain.min_elevation,
        terrain.max_elevation,
        terrain.mean_elevation,
        terrain.sample_count,
        terrain.resolution_m
    );
    println!("  Min clearance:   {:.1} m", analysis.profile.min_clearance_m);
    println!("  Obstructed:      {}", if analysis.profile.is_obstructed { "yes" } else { "no" });
    println!("  Path loss:       {:.1} dB ({})", budget.path_loss_db, budget.method);
    println!("  RSSI:            {:.1} dBm", budget.rssi_dbm);
    println!("  Sensitivity:     {:.1} dBm", budget.sensitivity_dbm);
    println!("  Margin:          {:.1} dB", budget.margin_db);
    println!("  Quality:         {}", analysis.quality);
}

async fn run_viewshed(args: ViewshedArgs, config: &AppConfig) -> Result<()> {
    let library = args.engine.clone().or_else(|| config.engine.library.clone());
    let source = HttpTileSource::new(&config.tiles)?;
    let orchestrator = ViewshedOrchestrator::start(
        source,
        move || {
            let kernel = match &library {
                Some(path) => NativeKernel::load(path)?,
                None => NativeKernel::load_default()?,
            };
            Ok(Box::new(kernel) as Box<dyn Kernel>)
        },
        config.viewshed.clone(),
    )?;

    let mut progress = orchestrator.subscribe();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = *progress.borrow_and_update();
            debug!(status = ?p.status, percent = p.percent, "Viewshed progress");
        }
    });

    let request = ViewshedRequest::new(
        args.at.into(),
        args.height.unwrap_or(config.viewshed.default_observer_height_m),
        args.distance.unwrap_or(config.viewshed.default_max_distance_m),
    );
    let outcome = orchestrator.run(request).await;
    reporter.abort();
    orchestrator.shutdown();

    match outcome? {
        AnalysisOutcome::Completed(layer) => {
            print_viewshed(&layer);
            if let Some(path) = &args.output {
                write_mask(&layer, path)?;
                info!(path = %path.display(), "Wrote visibility mask");
            }
            Ok(())
        }
        AnalysisOutcome::Superseded => bail!("analysis was superseded"),
    }
}

fn print_viewshed(layer: &ViewshedLayer) {
    let b = &layer.bounds;
    println!("Viewshed {}", layer.job_id);
    println!("  Center tile:     {}", layer.center);
    println!("  Grid:            {} x {} px @ {:.1} m", layer.width, layer.height, layer.gsd_m);
    println!("  Bounds:          N {:.5} S {:.5} W {:.5} E {:.5}", b.north, b.south, b.west, b.east);
    println!("  Observer pixel:  ({:.1}, {:.1})", layer.observer.x, layer.observer.y);
    println!("  Radius:          {} px", layer.radius_px);
    println!(
        "  Visible:         {} cells (~{:.1} km²)",
        layer.visible_count(),
        layer.visible_area_km2()
    );
}

fn write_mask(layer: &ViewshedLayer, path: &Path) -> Result<()> {
    let pixels: Vec<u8> = layer
        .mask
        .as_bytes()
        .iter()
        .map(|&v| if v != 0 { 255 } else { 0 })
        .collect();
    let image = GrayImage::from_raw(layer.width as u32, layer.height as u32, pixels)
        .ok_or_else(|| anyhow!("mask does not match {}x{} grid", layer.width, layer.height))?;
    image
        .save(path)
        .with_context(|| format!("writing {}", path.display()))
}

fn run_tile(args: TileArgs, config: &AppConfig) -> Result<()> {
    print!("{}", describe_tile(&args, config.tiles.tile_size)?);
    Ok(())
}

fn describe_tile(args: &TileArgs, tile_size: u32) -> Result<String> {
    use std::fmt::Write;

    let address = TileAddress::from_lat_lon(args.at.lat, args.at.lon, args.zoom)?;
    let b = address.bounds();

    let mut out = String::new();
    writeln!(out, "Tile {}", address)?;
    writeln!(out, "  Bounds:          N {:.5} S {:.5} W {:.5} E {:.5}", b.north, b.south, b.west, b.east)?;
    writeln!(
        out,
        "  GSD:             {:.2} m/px ({} px tiles)",
        ground_sample_distance(args.at.lat, args.zoom, tile_size),
        tile_size
    )?;
    if let Some(radius) = args.radius {
        let r = required_tile_radius(args.at.lat, args.zoom, radius);
        writeln!(out, "  Tile radius:     {} ({}x{} tiles for {:.0} m)", r, 2 * r + 1, 2 * r + 1, radius)?;
    }
    Ok(out)
}
