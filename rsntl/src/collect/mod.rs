pub mod global_variables;
pub mod raster;
pub mod wards;
