pub mod convert;
pub mod health;

pub use convert::{convert_file, preflight};
pub use health::{health_check, index, metrics_endpoint};
