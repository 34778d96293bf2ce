// blackout/src/logger.rs
//! Logging setup for the blackout binary.
//!
//! Messages go to stderr so that stdout stays reserved for command output
//! (redacted text, report JSON, the output file name).

use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Crates whose level `--debug` raises.
const WORKSPACE_CRATES: [&str; 2] = ["blackout", "blackout_core"];

/// Initializes `env_logger`.
///
/// `RUST_LOG` is honored unless a level is forced. `LevelFilter::Off` silences
/// every target; any other level applies to the workspace crates only.
/// Calling this more than once is harmless.
pub fn init_logger(level_override: Option<LevelFilter>) {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));
    match level_override {
        Some(LevelFilter::Off) => {
            builder.filter_level(LevelFilter::Off);
        }
        Some(level) => {
            for krate in WORKSPACE_CRATES {
                builder.filter_module(krate, level);
            }
        }
        None => {}
    }
    builder.target(Target::Stderr).format_timestamp(None);
    let _ = builder.try_init();
}
