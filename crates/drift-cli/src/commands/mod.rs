pub mod activity;
pub mod config;
pub mod log;
pub mod state;

use drift_core::{Config, CoreError, DriftEngine, State};
use tracing::warn;

/// Open the engine described by the on-disk configuration.
///
/// A missing data directory is not an error: the engine then runs in memory.
pub fn open_engine() -> Result<DriftEngine, Box<dyn std::error::Error>> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(CoreError::Storage(e)) => {
            warn!(error = %e, "data directory unavailable, using default config");
            Config::default()
        }
        Err(e) => return Err(e.into()),
    };
    Ok(DriftEngine::open(&config)?)
}

pub fn print_state(state: &State) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(state)?);
    Ok(())
}
