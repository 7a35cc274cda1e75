//! LaunchProfile and config path resolution.
use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};

use crate::lib::paths::resolve_home_dir;

/// Location of the config file relative to the home directory.
pub const DEFAULT_CONFIG_RELATIVE: &str = ".config/occ/config.yaml";

/// Resolved launch profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchProfile {
    pub config_path: PathBuf,
}

/// Resolve config path in the order: CLI override → `~/.config/occ/config.yaml`.
pub fn resolve_config_path(override_path: Option<PathBuf>) -> Result<PathBuf> {
    let cwd = env::current_dir().context("failed to obtain current directory")?;
    resolve_config_path_from(override_path, resolve_home_dir().as_deref(), &cwd)
}

fn resolve_config_path_from(
    override_path: Option<PathBuf>,
    home: Option<&Path>,
    cwd: &Path,
) -> Result<PathBuf> {
    let path = match override_path {
        Some(path) => path,
        None => home
            .map(|home| home.join(DEFAULT_CONFIG_RELATIVE))
            .ok_or_else(|| anyhow!("HOME is not set; pass --config to locate the config file"))?,
    };

    if path.is_absolute() {
        return Ok(path);
    }
    Ok(cwd.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lives_under_home() {
        let path = resolve_config_path_from(None, Some(Path::new("/home/alice")), Path::new("/"))
            .unwrap();
        assert_eq!(path, PathBuf::from("/home/alice/.config/occ/config.yaml"));
    }

    #[test]
    fn relative_override_is_joined_with_cwd() {
        let path = resolve_config_path_from(
            Some(PathBuf::from("occ.yaml")),
            None,
            Path::new("/work"),
        )
        .unwrap();
        assert_eq!(path, PathBuf::from("/work/occ.yaml"));
    }

    #[test]
    fn missing_home_without_override_is_an_error() {
        assert!(resolve_config_path_from(None, None, Path::new("/")).is_err());
    }
}
