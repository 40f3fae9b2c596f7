use std::path::PathBuf;

pub const DEFAULT_RASTER_PATH: &str = "data/viirs.tif";
pub const DEFAULT_WARDS_PATH: &str = "data/Pune.geojson";
pub const DEFAULT_OUTPUT_PATH: &str = "index.html";

/// Cells holding this value are excluded from zonal means
pub const DEFAULT_NODATA: f64 = 0.0;

/// Map view over Pune
pub const DEFAULT_CENTER: [f64; 2] = [18.55, 73.97];
pub const DEFAULT_ZOOM: u8 = 10;
pub const DEFAULT_TILES: &str = "CartoDB dark_matter";

/// Ward name attribute in the boundary file
pub const DEFAULT_NAME_FIELD: &str = "NAME_3";

/// Properties added to every rendered ward feature
pub const MEAN_FIELD: &str = "ntl_mean";
pub const CLASS_FIELD: &str = "ntl_class";

pub const DEFAULT_TITLE: &str = "Pune Nightlight Intensity (Dec 2025)";
pub const DEFAULT_LEGEND_TITLE: &str = "NTL Class";
pub const DEFAULT_MEAN_ALIAS: &str = "Mean NTL (Dec 2025)";

pub fn get_default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT_PATH)
}
