use std::{fs, path::Path};

use tracing::info;

use super::RawOccConfig;
use crate::lib::errors::ConfigError;

/// Serialize `config` as YAML to `path`, creating its parent directory.
pub fn write_config(path: &Path, config: &RawOccConfig) -> Result<(), ConfigError> {
    let document = serde_yaml::to_string(config).map_err(|source| ConfigError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, document).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        target: "occ::config",
        path = %path.display(),
        "Configuration file written"
    );
    Ok(())
}
