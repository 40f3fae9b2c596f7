use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::collect::raster::RasterLoader;
use crate::collect::wards::WardCollection;
use crate::commons::NtlError;
use crate::config::PipelineConfig;
use crate::geometric::classify::{classify, NtlClass, CLASS_COUNT};
use crate::geometric::zonal::{ZonalOptions, ZonalStats};
use crate::render::render;

/// Summary of one successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub ward_count: usize,
    pub wards_with_data: usize,
    /// Valid raster cells averaged over all wards
    pub cells_used: usize,
    pub edges: [f64; CLASS_COUNT + 1],
    /// Wards per class, Low to Very High
    pub class_counts: [usize; CLASS_COUNT],
    pub output_path: PathBuf,
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} wards, {} with data ({} cells)",
            self.ward_count, self.wards_with_data, self.cells_used
        )?;
        let edges: Vec<String> = self.edges.iter().map(|e| format!("{:.3}", e)).collect();
        writeln!(f, "quartile edges: [{}]", edges.join(", "))?;
        for (class, count) in NtlClass::ALL.iter().zip(self.class_counts) {
            writeln!(f, "  {:<10} {}", class.label(), count)?;
        }
        write!(f, "map: {}", self.output_path.display())
    }
}

/// Load, aggregate, classify and render, writing the map as the last step.
///
/// Any failure aborts the run before the output file is touched.
pub fn run(config: &PipelineConfig) -> Result<PipelineReport, NtlError> {
    let mut loader = RasterLoader::new(&config.raster_path);
    loader.set_crs(config.raster_epsg);
    let raster = loader.run()?;

    let wards = WardCollection::from_path(&config.wards_path)?;

    if let Some(declared) = wards.declared_epsg() {
        if declared != raster.epsg() {
            let msg = format!(
                "wards declare EPSG:{} but the raster is EPSG:{}",
                declared,
                raster.epsg()
            );
            if config.validate_crs {
                return Err(NtlError::GeometryMismatch(msg));
            }
            warn!("{}, continuing without reprojection", msg);
        }
    }

    if let Some(field) = config.map.tooltip.name_field() {
        let missing = wards.count_missing(field);
        if missing > 0 {
            warn!("{} of {} wards have no '{}' attribute", missing, wards.len(), field);
        }
    }

    let options = ZonalOptions {
        nodata: config.nodata,
        all_touched: config.all_touched,
    };
    let stats = ZonalStats::compute(&wards, &raster, &options);
    let means: Vec<Option<f64>> = stats.iter().map(|s| s.mean).collect();
    let wards_with_data = means.iter().filter(|m| m.is_some()).count();
    if !wards.is_empty() && wards_with_data == 0 {
        return Err(NtlError::GeometryMismatch(format!(
            "none of the {} wards overlaps a valid raster cell (raster extent {:?})",
            wards.len(),
            raster.extent()
        )));
    }
    info!("Zonal means: {} of {} wards have data", wards_with_data, wards.len());

    let classification = classify(&means)?;

    let document = render(&wards, &classification, &means, &config.map)?;
    document.save(&config.output_path)?;

    let report = PipelineReport {
        ward_count: wards.len(),
        wards_with_data,
        cells_used: stats.iter().map(|s| s.count).sum(),
        edges: *classification.edges.edges(),
        class_counts: classification.counts(),
        output_path: config.output_path.clone(),
    };
    info!("{}", report);
    Ok(report)
}
