//! Load and validate the occ configuration file.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{lib::errors::ConfigError, runtime::DEFAULT_PODMAN_PROGRAM};

pub mod telemetry;
pub mod writer;

pub use writer::write_config;

/// Prefix of environment variables overriding file values (`OCC_OCM_USER`, ...).
pub const ENV_PREFIX: &str = "OCC";
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Resolved configuration for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccConfig {
    pub ocm_user: String,
    pub offline_access_token: String,
    pub ocm_url: String,
    /// Host directory mounted at `/root/sop-utils`; empty disables the mount.
    pub ops_utils_dir: String,
    pub ops_utils_dir_rw: bool,
    pub podman_path: PathBuf,
    pub podman_socket: Option<String>,
    pub image_tag: String,
    pub source_path: PathBuf,
}

impl Default for OccConfig {
    fn default() -> Self {
        Self {
            ocm_user: String::new(),
            offline_access_token: String::new(),
            ocm_url: String::new(),
            ops_utils_dir: String::new(),
            ops_utils_dir_rw: false,
            podman_path: PathBuf::from(DEFAULT_PODMAN_PROGRAM),
            podman_socket: None,
            image_tag: DEFAULT_IMAGE_TAG.to_string(),
            source_path: PathBuf::new(),
        }
    }
}

/// On-disk shape of the configuration file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RawOccConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocm_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ocm_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ops_utils_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ops_utils_dir_rw: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub podman_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub podman_socket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_tag: Option<String>,
}

impl OccConfig {
    /// Load `path` (if present) layered under `OCC_*` environment variables.
    ///
    /// A missing file yields defaults; callers that need the file check for it themselves.
    pub fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        info!(
            target: "occ::config",
            path = %path.display(),
            "Starting configuration load"
        );

        let builder = config::Config::builder()
            .add_source(
                config::File::from(path.clone())
                    .format(config::FileFormat::Yaml)
                    .required(false),
            )
            .add_source(config::Environment::with_prefix(ENV_PREFIX));
        let document = builder.build().map_err(|err| {
            let error = ConfigError::from_read_error(path.clone(), err);
            error!(
                target: "occ::config",
                path = %path.display(),
                reason = %error,
                "Failed to read configuration file"
            );
            error
        })?;

        let raw: RawOccConfig = document.try_deserialize().map_err(|err| {
            let error = ConfigError::from_parse_error(path.clone(), err);
            error!(
                target: "occ::config",
                path = %path.display(),
                reason = %error,
                "Failed to parse configuration file"
            );
            error
        })?;

        let config = Self::from_raw(raw, path.clone()).map_err(|err| {
            error!(
                target: "occ::config",
                path = %path.display(),
                reason = %err,
                "Failed to validate configuration file"
            );
            err
        })?;

        telemetry::log_loaded(&config);
        Ok(config)
    }

    pub fn from_raw(raw: RawOccConfig, path: PathBuf) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let ops_utils_dir = parse_ops_utils_dir(raw.ops_utils_dir, &path)?;
        let image_tag = match raw.image_tag.map(|tag| tag.trim().to_string()) {
            Some(tag) if tag.is_empty() => {
                return Err(ConfigError::InvalidField {
                    path,
                    field: "image_tag",
                    message: "Use a non-empty image tag such as `latest`".into(),
                })
            }
            Some(tag) => tag,
            None => defaults.image_tag,
        };

        Ok(Self {
            ocm_user: raw.ocm_user.unwrap_or_default(),
            offline_access_token: raw.offline_access_token.unwrap_or_default(),
            ocm_url: raw.ocm_url.unwrap_or_default(),
            ops_utils_dir,
            ops_utils_dir_rw: raw.ops_utils_dir_rw.unwrap_or(false),
            podman_path: raw
                .podman_path
                .filter(|path| !path.as_os_str().is_empty())
                .unwrap_or(defaults.podman_path),
            podman_socket: raw.podman_socket.filter(|socket| !socket.is_empty()),
            image_tag,
            source_path: path,
        })
    }

    pub fn has_ops_utils_dir(&self) -> bool {
        !self.ops_utils_dir.is_empty()
    }
}

fn parse_ops_utils_dir(raw: Option<String>, path: &Path) -> Result<String, ConfigError> {
    let dir = raw.unwrap_or_default();
    if dir.is_empty() || Path::new(&dir).is_absolute() {
        return Ok(dir);
    }

    Err(ConfigError::InvalidField {
        path: path.to_path_buf(),
        field: "ops_utils_dir",
        message: format!("Use an absolute path (got `{dir}`)"),
    })
}
