pub mod collect;
pub mod commons;
pub mod config;
pub mod geo_core;
pub mod geometric;
pub mod pipeline;
pub mod render;

// Re-export commonly used types
pub use collect::raster::{Raster, RasterLoader};
pub use collect::wards::{Ward, WardCollection};
pub use commons::NtlError;
pub use config::{MapConfig, PipelineConfig};
pub use geometric::classify::{classify, Classification, NtlClass, QuantileEdges};
pub use geometric::zonal::{compute_means, ZonalOptions, ZonalStat, ZonalStats};
pub use pipeline::{run, PipelineReport};
pub use render::{render, MapDocument};
