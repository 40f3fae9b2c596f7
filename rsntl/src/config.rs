use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::collect::global_variables::{
    get_default_output_path, CLASS_FIELD, DEFAULT_CENTER, DEFAULT_LEGEND_TITLE,
    DEFAULT_MEAN_ALIAS, DEFAULT_NAME_FIELD, DEFAULT_NODATA, DEFAULT_RASTER_PATH, DEFAULT_TILES,
    DEFAULT_TITLE, DEFAULT_WARDS_PATH, DEFAULT_ZOOM, MEAN_FIELD,
};
use crate::commons::NtlError;
use crate::geo_core::WGS84_EPSG;
use crate::geometric::classify::NtlClass;

/// Everything one pipeline run needs
///
/// Missing keys in a JSON config file fall back to the defaults in
/// `collect::global_variables`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Single-band nighttime-light GeoTIFF
    pub raster_path: PathBuf,
    /// Ward boundaries (GeoJSON)
    pub wards_path: PathBuf,
    /// Destination of the HTML map
    pub output_path: PathBuf,
    /// Cell value excluded from zonal means
    pub nodata: f64,
    /// Select every cell touched by a ward instead of cells whose centre is inside
    pub all_touched: bool,
    /// EPSG code written onto the raster after loading
    pub raster_epsg: u32,
    /// Fail when the ward file declares a CRS other than `raster_epsg`
    pub validate_crs: bool,
    pub map: MapConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            raster_path: PathBuf::from(DEFAULT_RASTER_PATH),
            wards_path: PathBuf::from(DEFAULT_WARDS_PATH),
            output_path: get_default_output_path(),
            nodata: DEFAULT_NODATA,
            all_touched: false,
            raster_epsg: WGS84_EPSG,
            validate_crs: true,
            map: MapConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, NtlError> {
        serde_json::from_str(json).map_err(|e| NtlError::Config(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, NtlError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NtlError::Config(format!("cannot read {:?}: {}", path, e)))?;
        Self::from_json_str(&content)
    }
}

/// Leaflet map settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// `[lat, lon]` of the initial view
    pub center: [f64; 2],
    pub zoom: u8,
    pub tiles: TileTheme,
    pub palette: ClassPalette,
    pub stroke: StrokeStyle,
    pub tooltip: TooltipConfig,
    /// Title banner and legend; `None` renders the bare map
    pub decorations: Option<Decorations>,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            tiles: TileTheme::default(),
            palette: ClassPalette::default(),
            stroke: StrokeStyle::default(),
            tooltip: TooltipConfig::default(),
            decorations: Some(Decorations::default()),
        }
    }
}

/// Base tile layer: a built-in theme name or a custom URL template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TileTheme {
    Named(String),
    Custom {
        url: String,
        attribution: String,
        #[serde(default = "default_max_zoom")]
        max_zoom: u8,
    },
}

fn default_max_zoom() -> u8 {
    18
}

impl Default for TileTheme {
    fn default() -> Self {
        TileTheme::Named(DEFAULT_TILES.to_string())
    }
}

/// Resolved Leaflet tile layer parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub url: String,
    pub attribution: String,
    pub subdomains: &'static str,
    pub max_zoom: u8,
}

const CARTO_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors &copy; <a href=\"https://carto.com/attributions\">CARTO</a>";
const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

impl TileTheme {
    /// Resolve a theme name (case and separator insensitive) or pass a custom layer through
    pub fn resolve(&self) -> Result<TileLayer, NtlError> {
        match self {
            TileTheme::Custom {
                url,
                attribution,
                max_zoom,
            } => Ok(TileLayer {
                url: url.clone(),
                attribution: attribution.clone(),
                subdomains: "abc",
                max_zoom: *max_zoom,
            }),
            TileTheme::Named(name) => {
                let key: String = name
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_ascii_lowercase();
                match key.as_str() {
                    "openstreetmap" | "osm" => Ok(TileLayer {
                        url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                        attribution: OSM_ATTRIBUTION.to_string(),
                        subdomains: "abc",
                        max_zoom: 19,
                    }),
                    "cartodbpositron" => Ok(TileLayer {
                        url: "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png"
                            .to_string(),
                        attribution: CARTO_ATTRIBUTION.to_string(),
                        subdomains: "abcd",
                        max_zoom: 20,
                    }),
                    "cartodbdarkmatter" => Ok(TileLayer {
                        url: "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png"
                            .to_string(),
                        attribution: CARTO_ATTRIBUTION.to_string(),
                        subdomains: "abcd",
                        max_zoom: 20,
                    }),
                    _ => Err(NtlError::Config(format!("unknown tile theme '{}'", name))),
                }
            }
        }
    }
}

/// Fill colour per class plus the fallback for wards without data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassPalette {
    pub low: String,
    pub medium: String,
    pub high: String,
    pub very_high: String,
    pub no_data: String,
}

impl Default for ClassPalette {
    fn default() -> Self {
        ClassPalette {
            low: "#2c7bb6".to_string(),
            medium: "#abd9e9".to_string(),
            high: "#fdae61".to_string(),
            very_high: "#d7191c".to_string(),
            no_data: "#cccccc".to_string(),
        }
    }
}

impl ClassPalette {
    pub fn color_for(&self, class: Option<NtlClass>) -> &str {
        match class {
            Some(NtlClass::Low) => &self.low,
            Some(NtlClass::Medium) => &self.medium,
            Some(NtlClass::High) => &self.high,
            Some(NtlClass::VeryHigh) => &self.very_high,
            None => &self.no_data,
        }
    }
}

/// Ward outline style
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeStyle {
    pub color: String,
    pub weight: f64,
    pub fill_opacity: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        StrokeStyle {
            color: "black".to_string(),
            weight: 0.4,
            fill_opacity: 0.7,
        }
    }
}

/// One tooltip row: a feature property and the label shown for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TooltipField {
    pub field: String,
    pub alias: String,
}

impl TooltipField {
    pub fn new(field: &str, alias: &str) -> Self {
        TooltipField {
            field: field.to_string(),
            alias: alias.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TooltipConfig {
    pub fields: Vec<TooltipField>,
    /// Decimal places for non-integer numbers; `None` prints them unrounded
    pub precision: Option<usize>,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        TooltipConfig {
            fields: vec![
                TooltipField::new(DEFAULT_NAME_FIELD, "Ward"),
                TooltipField::new(MEAN_FIELD, DEFAULT_MEAN_ALIAS),
            ],
            precision: None,
        }
    }
}

impl TooltipConfig {
    /// Property used as the ward name (first configured field that is not a computed one)
    pub fn name_field(&self) -> Option<&str> {
        self.fields
            .iter()
            .map(|f| f.field.as_str())
            .find(|f| *f != MEAN_FIELD && *f != CLASS_FIELD)
    }
}

/// Fixed-position title banner and colour-key legend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Decorations {
    pub title: String,
    pub legend_title: String,
    pub show_legend: bool,
}

impl Default for Decorations {
    fn default() -> Self {
        Decorations {
            title: DEFAULT_TITLE.to_string(),
            legend_title: DEFAULT_LEGEND_TITLE.to_string(),
            show_legend: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.raster_path, PathBuf::from("data/viirs.tif"));
        assert_eq!(config.wards_path, PathBuf::from("data/Pune.geojson"));
        assert_eq!(config.output_path, PathBuf::from("index.html"));
        assert_eq!(config.nodata, 0.0);
        assert_eq!(config.raster_epsg, 4326);
        assert_eq!(config.map.center, [18.55, 73.97]);
        assert_eq!(config.map.zoom, 10);
        assert!(config.map.decorations.is_some());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "raster_path": "in/ntl.tif",
                "nodata": -1.0,
                "map": { "zoom": 12, "decorations": null, "tiles": "OpenStreetMap" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.raster_path, PathBuf::from("in/ntl.tif"));
        assert_eq!(config.wards_path, PathBuf::from("data/Pune.geojson"));
        assert_eq!(config.nodata, -1.0);
        assert_eq!(config.map.zoom, 12);
        assert_eq!(config.map.center, [18.55, 73.97]);
        assert!(config.map.decorations.is_none());
        assert_eq!(config.map.tiles, TileTheme::Named("OpenStreetMap".to_string()));
    }

    #[test]
    fn test_custom_tiles_from_json() {
        let config = PipelineConfig::from_json_str(
            r#"{ "map": { "tiles": { "url": "https://t/{z}/{x}/{y}.png", "attribution": "me" } } }"#,
        )
        .unwrap();
        let layer = config.map.tiles.resolve().unwrap();
        assert_eq!(layer.url, "https://t/{z}/{x}/{y}.png");
        assert_eq!(layer.max_zoom, 18);
    }

    #[test]
    fn test_malformed_json() {
        let err = PipelineConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, NtlError::Config(_)));
    }

    #[test]
    fn test_tile_theme_names() {
        let dark = TileTheme::Named("CartoDB dark_matter".to_string()).resolve().unwrap();
        assert!(dark.url.contains("dark_all"));
        let positron = TileTheme::Named("cartodb-positron".to_string()).resolve().unwrap();
        assert!(positron.url.contains("light_all"));
        assert!(TileTheme::Named("Stamen Toner".to_string()).resolve().is_err());
    }

    #[test]
    fn test_palette_fallback() {
        let palette = ClassPalette::default();
        assert_eq!(palette.color_for(Some(NtlClass::VeryHigh)), "#d7191c");
        assert_eq!(palette.color_for(None), "#cccccc");
    }

    #[test]
    fn test_name_field() {
        assert_eq!(TooltipConfig::default().name_field(), Some("NAME_3"));
        let only_mean = TooltipConfig {
            fields: vec![TooltipField::new(MEAN_FIELD, "Mean")],
            precision: None,
        };
        assert_eq!(only_mean.name_field(), None);
    }
}
