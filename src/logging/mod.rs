//! # Logging
//!
//! All crate logging goes through the `log` facade with feature-specific targets,
//! so a single `RUST_LOG=order_vault::loader=debug` narrows output to one component.
//! The binary installs `env_logger` through [`init`].

pub mod features;

pub use features::LogFeature;

/// Logging system errors
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Logging system already initialized")]
    AlreadyInitialized,
}

/// Install `env_logger` with `default_level`; `RUST_LOG` overrides it.
pub fn init(default_level: log::LevelFilter) -> Result<(), LoggingError> {
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_secs()
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)
}
