pub mod classify;
pub mod zonal;
