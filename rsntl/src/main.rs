use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;

use rsntl::config::{Decorations, PipelineConfig, TileTheme};

/// Map centre given as "lat,lon"
#[derive(Clone, Copy, Debug)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl std::str::FromStr for LatLon {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<_> = s.split(',').map(|p| p.trim()).collect();
        if parts.len() != 2 {
            return Err("Expected 'lat,lon'".into());
        }
        let lat: f64 = parts[0].parse().map_err(|e| format!("lat parse error: {e}"))?;
        let lon: f64 = parts[1].parse().map_err(|e| format!("lon parse error: {e}"))?;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(format!("{lat},{lon} is not a valid latitude/longitude"));
        }
        Ok(LatLon { lat, lon })
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Ward-level nighttime-light choropleth from a VIIRS raster",
    long_about = None
)]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Nighttime-light GeoTIFF
    #[arg(long)]
    raster: Option<PathBuf>,

    /// Ward boundaries (GeoJSON)
    #[arg(long)]
    wards: Option<PathBuf>,

    /// Output HTML file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Cell value excluded from the means
    #[arg(long, allow_negative_numbers = true)]
    nodata: Option<f64>,

    /// Count every cell a ward touches, not only cells centred inside it
    #[arg(long)]
    all_touched: bool,

    /// Render the map without title banner and legend
    #[arg(long)]
    no_decorations: bool,

    /// Title banner text
    #[arg(long)]
    title: Option<String>,

    /// Initial zoom level
    #[arg(long)]
    zoom: Option<u8>,

    /// Initial map centre, e.g. "18.55,73.97"
    #[arg(long, allow_hyphen_values = true)]
    center: Option<LatLon>,

    /// Base map theme (OpenStreetMap, CartoDB positron, CartoDB dark_matter)
    #[arg(long)]
    tiles: Option<String>,
}

impl Cli {
    /// Defaults, then the config file, then flags
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load config {:?}", path))?,
            None => PipelineConfig::default(),
        };

        if let Some(raster) = &self.raster {
            config.raster_path = raster.clone();
        }
        if let Some(wards) = &self.wards {
            config.wards_path = wards.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(nodata) = self.nodata {
            config.nodata = nodata;
        }
        if self.all_touched {
            config.all_touched = true;
        }
        if let Some(zoom) = self.zoom {
            config.map.zoom = zoom;
        }
        if let Some(center) = self.center {
            config.map.center = [center.lat, center.lon];
        }
        if let Some(tiles) = &self.tiles {
            config.map.tiles = TileTheme::Named(tiles.clone());
        }
        if let Some(title) = &self.title {
            config
                .map
                .decorations
                .get_or_insert_with(Decorations::default)
                .title = title.clone();
        }
        if self.no_decorations {
            config.map.decorations = None;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    debug!("Parsed CLI args: {:?}", cli);

    let config = cli.pipeline_config()?;
    info!(
        "Raster {:?}, wards {:?} -> {:?}",
        config.raster_path, config.wards_path, config.output_path
    );

    let report = rsntl::run(&config).with_context(|| {
        format!(
            "Failed to build the nightlight map from {:?} and {:?}",
            config.raster_path, config.wards_path
        )
    })?;

    println!("{}", report);
    Ok(())
}
