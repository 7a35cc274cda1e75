//! Mount policy: which host paths are exposed inside the session container.
//!
//! The first four mounts are unconditional. The rest depend on what exists in
//! the user's home directory and on the ops-utils configuration.

use std::path::{Path, PathBuf};

use crate::{
    config::OccConfig,
    lib::{errors::MountError, fs::FileSystemRead, platform::Platform},
    runtime::{MountOption, MountSpec},
};

use super::agent::locate_agent;

/// Directory scanned for the launchd SSH agent on macOS.
pub const MAC_PRIVATE_TEMP_DIR: &str = "/private/tmp";

const GCLOUD_MOUNTS: [(&str, &str); 4] = [
    ("active_config", "active_config_readonly"),
    (
        "configurations/config_default",
        "configurations/config_default_readonly",
    ),
    ("credentials.db", "credentials_readonly.db"),
    ("access_tokens.db", "access_tokens_readonly.db"),
];
const AWS_FILES: [&str; 2] = ["credentials", "config"];
const PAGERDUTY_CONFIG: &str = ".config/pagerduty-cli/config.json";

/// Host facts the mount policy depends on besides the configuration.
#[derive(Debug, Clone, Copy)]
pub struct MountInputs<'a> {
    pub config_path: &'a Path,
    pub home_dir: &'a Path,
    pub platform_temp_dir: &'a Path,
    pub platform: Platform,
    /// Value of `SSH_AUTH_SOCK`; mounted as-is, even when empty.
    pub ssh_auth_sock: &'a Path,
}

/// Build the ordered mount list for one launch.
pub fn build_mounts<F: FileSystemRead + ?Sized>(
    fs: &F,
    config: &OccConfig,
    inputs: &MountInputs<'_>,
) -> Result<Vec<MountSpec>, MountError> {
    let home = inputs.home_dir;
    let mut mounts = vec![
        MountSpec::tmpfs("/root/.ssh/sockets"),
        MountSpec::read_only(inputs.config_path, "/root/.config/occ"),
        MountSpec::read_only(home.join(".ssh"), "/root/.ssh"),
    ];

    let agent = match inputs.platform {
        Platform::Mac => {
            let agent_dir = locate_agent(fs, inputs.platform_temp_dir)?;
            MountSpec::read_only(inputs.platform_temp_dir.join(agent_dir), "/tmp/ssh")
        }
        Platform::Other => MountSpec::read_only(inputs.ssh_auth_sock, "/tmp/ssh.sock"),
    };
    mounts.push(agent);

    let gcloud = home.join(".config/gcloud");
    if probe(fs, &gcloud)? {
        mounts.extend(GCLOUD_MOUNTS.iter().map(|(source, destination)| {
            MountSpec::read_only(
                gcloud.join(source),
                format!("/root/.config/gcloud/{destination}"),
            )
        }));
    }

    let aws = home.join(".aws");
    if probe(fs, &aws)? {
        mounts.extend(
            AWS_FILES
                .iter()
                .map(|file| MountSpec::read_only(aws.join(file), format!("/root/.aws/{file}"))),
        );
    }

    if config.has_ops_utils_dir() {
        let option = if config.ops_utils_dir_rw {
            MountOption::ReadWrite
        } else {
            MountOption::ReadOnly
        };
        mounts.push(MountSpec::bind(
            PathBuf::from(&config.ops_utils_dir),
            "/root/sop-utils",
            option,
        ));
    }

    let pagerduty = home.join(PAGERDUTY_CONFIG);
    if probe(fs, &pagerduty)? {
        mounts.push(MountSpec::read_only(
            pagerduty,
            format!("/root/{PAGERDUTY_CONFIG}"),
        ));
    }

    Ok(mounts)
}

fn probe<F: FileSystemRead + ?Sized>(fs: &F, path: &Path) -> Result<bool, MountError> {
    fs.exists(path).map_err(|source| MountError::Probe {
        path: path.to_path_buf(),
        source,
    })
}
