//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

pub use info::run_info;
pub use run::run_session;
pub use validate::run_validate;

use config_loader::ConfigLoader;
use contracts::BridgeConfig;
use tracing::info;

use crate::error::{CliError, Result};

/// Load configuration from `path`, or fall back to built-in defaults
fn load_config(path: Option<&Path>) -> Result<BridgeConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(BridgeConfig::default());
    };

    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }

    info!(config = %path.display(), "Loading configuration");
    Ok(ConfigLoader::load_from_path(path)?)
}
