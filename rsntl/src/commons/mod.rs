pub mod basic_functions;
pub mod error;

pub use error::NtlError;
