pub mod analytics;
pub mod config;
pub mod correlation;
pub mod error;
pub mod metrics;
pub mod models;
pub mod processing;
pub mod provider;
pub mod state;

pub use config::Config;
pub use error::{AppError, Result};
