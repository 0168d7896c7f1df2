//! Configuration file resolution and loading

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Application directory name under the platform config dir
pub const APP_DIR: &str = "dreamcast";

/// Config file resolution in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. `<config_dir>/dreamcast/<file_name>` if it exists
///
/// Returns `None` when nothing is found; callers fall back to built-in
/// defaults.
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: platform config directory
    let user_config = dirs::config_dir().map(|d| d.join(APP_DIR).join(file_name))?;
    if user_config.exists() {
        Some(user_config)
    } else {
        debug!("No config file at {}", user_config.display());
        None
    }
}

/// Load a TOML config file, or built-in defaults when `path` is `None`
///
/// An explicitly named file that does not exist is an error; a missing
/// default-location file is not (it never resolves).
pub fn load_toml<T>(path: Option<&Path>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(path) = path else {
        info!("No config file found, using built-in defaults");
        return Ok(T::default());
    };

    if !path.exists() {
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let parsed = toml::from_str::<T>(&content)?;
    info!("Loaded config from {}", path.display());
    Ok(parsed)
}
