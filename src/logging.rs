//! # Logging module
//!
//! This module provides logging facilities and helpers

use tracing::Level;

use crate::svc::cfg::{Configuration, Format};

// -----------------------------------------------------------------------------
// Error enumeration

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("failed to set global default subscriber, {0}")]
    GlobalDefaultSubscriber(tracing::subscriber::SetGlobalDefaultError),
}

// -----------------------------------------------------------------------------
// helpers

pub const fn level(verbosity: usize) -> Level {
    match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn initialize(config: &Configuration, verbosity: usize) -> Result<(), Error> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level(verbosity))
        .with_thread_names(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true);

    match config.logging.format {
        Format::Json => {
            tracing::subscriber::set_global_default(builder.json().flatten_event(true).finish())
        }
        Format::Text => tracing::subscriber::set_global_default(builder.finish()),
    }
    .map_err(Error::GlobalDefaultSubscriber)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_increasing_levels() {
        assert_eq!(level(0), Level::ERROR);
        assert_eq!(level(2), Level::INFO);
        assert_eq!(level(3), Level::DEBUG);
        assert_eq!(level(12), Level::TRACE);
    }
}
