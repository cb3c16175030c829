//! Logger setup plus module-gated logging macros.
//!
//! A module opts into the macros by declaring its own switch:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_debug, log_info};
//!
//! log_info!("channel connected to {}", endpoint);
//! ```
//! Flipping the const to `false` silences that module without touching `RUST_LOG`.

/// Installs `env_logger`, honouring `RUST_LOG` on top of an `Info` default.
/// `verbose` lowers the default to `Debug` for this crate.
pub fn init(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log::LevelFilter::Info);
    if verbose {
        builder.filter_module("milkdash_lib", log::LevelFilter::Debug);
    }
    builder.parse_default_env();
    // A second init (tests, embedding) keeps the first logger.
    let _ = builder.try_init();
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Warnings for recoverable faults (dropped frames, failed redraws).
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
