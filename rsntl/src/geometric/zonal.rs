use geo::{BoundingRect, Contains, Coord, Intersects, MultiPolygon, Point};
use log::debug;
use serde::{Deserialize, Serialize};

#[cfg(feature = "indicatif")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::collect::global_variables::DEFAULT_NODATA;
use crate::collect::raster::Raster;
use crate::collect::wards::WardCollection;

#[cfg(feature = "indicatif")]
fn progress_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {percent} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

/// How cells are selected and filtered for a zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZonalOptions {
    /// Cells holding this value are skipped
    pub nodata: f64,
    /// Select every cell whose footprint touches the polygon, not only
    /// cells whose centre lies inside it
    pub all_touched: bool,
}

impl Default for ZonalOptions {
    fn default() -> Self {
        ZonalOptions {
            nodata: DEFAULT_NODATA,
            all_touched: false,
        }
    }
}

impl ZonalOptions {
    pub fn with_nodata(nodata: f64) -> Self {
        ZonalOptions {
            nodata,
            ..ZonalOptions::default()
        }
    }

    fn is_valid(&self, value: f64) -> bool {
        !value.is_nan() && value != self.nodata
    }
}

/// Mean of the valid cells under one ward
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZonalStat {
    /// `None` when no valid cell overlaps the ward
    pub mean: Option<f64>,
    /// Number of valid cells averaged
    pub count: usize,
}

impl ZonalStat {
    pub const EMPTY: ZonalStat = ZonalStat {
        mean: None,
        count: 0,
    };
}

/// Per-ward zonal means over a raster
pub struct ZonalStats;

impl ZonalStats {
    /// One statistic per ward, in ward order
    pub fn compute(
        wards: &WardCollection,
        raster: &Raster,
        options: &ZonalOptions,
    ) -> Vec<ZonalStat> {
        #[cfg(feature = "indicatif")]
        let pb = {
            let pb = ProgressBar::new(wards.len() as u64);
            pb.set_style(progress_style());
            pb.set_message("Zonal means");
            pb
        };

        let stats: Vec<ZonalStat> = wards
            .iter()
            .map(|ward| {
                let stat = zonal_stat(&ward.geometry, raster, options);
                #[cfg(feature = "indicatif")]
                pb.inc(1);
                stat
            })
            .collect();

        #[cfg(feature = "indicatif")]
        pb.finish_and_clear();

        debug!(
            "{} of {} wards have valid cells",
            stats.iter().filter(|s| s.mean.is_some()).count(),
            stats.len()
        );
        stats
    }
}

/// Zonal means only, one entry per ward in input order
pub fn compute_means(wards: &WardCollection, raster: &Raster, nodata: f64) -> Vec<Option<f64>> {
    ZonalStats::compute(wards, raster, &ZonalOptions::with_nodata(nodata))
        .into_iter()
        .map(|s| s.mean)
        .collect()
}

/// Mean of the valid cells selected by `geometry`
pub fn zonal_stat(geometry: &MultiPolygon<f64>, raster: &Raster, options: &ZonalOptions) -> ZonalStat {
    let Some(window) = cell_window(geometry, raster, options.all_touched) else {
        return ZonalStat::EMPTY;
    };
    let transform = raster.transform();
    let nudge = Coord {
        x: (transform.pixel_width.abs() + transform.row_rotation.abs()) * BOUNDARY_NUDGE,
        y: -(transform.pixel_height.abs() + transform.col_rotation.abs()) * BOUNDARY_NUDGE,
    };

    let mut sum = 0.0f64;
    let mut count = 0usize;
    for row in window.rows.clone() {
        for col in window.cols.clone() {
            let Some(value) = raster.value(col, row) else {
                continue;
            };
            if !options.is_valid(value) {
                continue;
            }
            let selected = if options.all_touched {
                let cell = transform.cell_polygon(col, row);
                geometry.0.iter().any(|polygon| polygon.intersects(&cell))
            } else {
                centre_selected(geometry, transform.cell_center(col, row), nudge)
            };
            if selected {
                sum += value;
                count += 1;
            }
        }
    }

    ZonalStat {
        mean: (count > 0).then(|| sum / count as f64),
        count,
    }
}

/// Fraction of a cell a boundary centre is shifted by to pick its side
const BOUNDARY_NUDGE: f64 = 1e-6;

/// Half-open centre rule: a centre strictly inside a polygon is selected; a
/// centre on its boundary only when the polygon continues east and south of
/// it. A centre on an edge shared by two wards lands in exactly one of them.
fn centre_selected(geometry: &MultiPolygon<f64>, centre: Coord<f64>, nudge: Coord<f64>) -> bool {
    let point = Point::from(centre);
    geometry.0.iter().any(|polygon| {
        if polygon.contains(&point) {
            return true;
        }
        polygon.intersects(&point) && polygon.contains(&Point::from(centre + nudge))
    })
}

/// Column and row ranges of the cells covering a geometry's bounding box
#[derive(Debug, Clone, PartialEq)]
struct CellWindow {
    cols: std::ops::Range<usize>,
    rows: std::ops::Range<usize>,
}

/// Cells covering the bounding box of `geometry`, clamped to the grid.
///
/// With `pad` the window grows by one cell on every side so cells that only
/// share an edge with the bounding box are still tested.
fn cell_window(geometry: &MultiPolygon<f64>, raster: &Raster, pad: bool) -> Option<CellWindow> {
    let rect = geometry.bounding_rect()?;
    let transform = raster.transform();
    let corners = [
        (rect.min().x, rect.min().y),
        (rect.max().x, rect.min().y),
        (rect.min().x, rect.max().y),
        (rect.max().x, rect.max().y),
    ];

    let (mut col_min, mut col_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut row_min, mut row_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for (x, y) in corners {
        let (col, row) = transform.geo_to_pixel(x, y)?;
        col_min = col_min.min(col);
        col_max = col_max.max(col);
        row_min = row_min.min(row);
        row_max = row_max.max(row);
    }

    let pad = if pad { 1.0 } else { 0.0 };
    let clamp = |v: f64, upper: usize| v.max(0.0).min(upper as f64) as usize;
    let cols = clamp(col_min.floor() - pad, raster.width())..clamp(col_max.ceil() + pad, raster.width());
    let rows = clamp(row_min.floor() - pad, raster.height())..clamp(row_max.ceil() + pad, raster.height());
    if cols.is_empty() || rows.is_empty() {
        return None;
    }
    Some(CellWindow { cols, rows })
}
