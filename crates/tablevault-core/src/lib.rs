pub mod clock;
pub mod config;
pub mod error;
pub mod estimate;
pub mod types;

pub use config::AccountConfig;
pub use error::{ConfigError, EstimateError};
pub use types::*;
