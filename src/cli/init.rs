//! Interactive `occ init`.
use std::{
    fs,
    io::{BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use tracing::warn;

use crate::{
    config::{write_config, RawOccConfig},
    lib::paths::is_nonempty_absolute,
};

pub const OCM_USER_PROMPT: &str = "Provide your ocm user name";
pub const OFFLINE_ACCESS_TOKEN_PROMPT: &str =
    "Provide your OCM Offline Access Token from https://cloud.redhat.com/openshift/token";
pub const OPS_UTILS_DIR_PROMPT: &str = "(Optional) Provide your ops-sop/v4/utils directory.
This is an absolute path to any necessary scripts you wish to have automatically mounted into your container.
This is mounted in the \"/root/sop-utils\" directory in the container.";
pub const OPS_UTILS_DIR_READONLY_PROMPT: &str =
    "Would you like the ops-sop directory to be mounted as readonly? [y/N]";
const WAITING_FOR_INPUT: &str = ": ";

/// How `occ init` ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Written(PathBuf),
    /// The user declined to overwrite an existing file.
    Kept(PathBuf),
}

impl InitOutcome {
    pub fn message(&self) -> String {
        match self {
            InitOutcome::Written(path) => {
                format!("Config file has been written to {}", path.display())
            }
            InitOutcome::Kept(path) => {
                format!("Keeping the existing config file at {}", path.display())
            }
        }
    }
}

/// Prompt for the configuration on `output`, read answers from `input` and write `config_path`.
///
/// Keys that are not prompted for (`ocm_url`, `podman_*`, `image_tag`) are kept
/// from an existing file when it is overwritten.
pub fn run_init<R: BufRead, W: Write>(
    config_path: &Path,
    input: &mut R,
    output: &mut W,
) -> Result<InitOutcome> {
    let mut config = RawOccConfig::default();
    if config_path.exists() {
        let question = format!(
            "A config file already exists at {}, would you like to overwrite it? [y/N]",
            config_path.display()
        );
        if !prompt(&question, input, output)?.eq_ignore_ascii_case("y") {
            return Ok(InitOutcome::Kept(config_path.to_path_buf()));
        }
        writeln!(output, "The configuration file will be overwritten.\n")?;
        config = existing_settings(config_path);
    }

    let ocm_user = prompt(OCM_USER_PROMPT, input, output)?;
    writeln!(output)?;
    let token = prompt(OFFLINE_ACCESS_TOKEN_PROMPT, input, output)?;
    writeln!(output)?;
    let ops_utils_dir = prompt(OPS_UTILS_DIR_PROMPT, input, output)?;

    config.ocm_user = Some(ocm_user);
    config.offline_access_token = Some(token);
    config.ops_utils_dir = None;
    config.ops_utils_dir_rw = None;
    if !ops_utils_dir.is_empty() {
        if !is_nonempty_absolute(Path::new(&ops_utils_dir)) {
            return Err(anyhow!(
                "the ops-utils directory must be an absolute path (got `{ops_utils_dir}`)"
            ));
        }
        writeln!(output)?;
        let readonly = prompt(OPS_UTILS_DIR_READONLY_PROMPT, input, output)?;
        config.ops_utils_dir_rw = Some(readonly.eq_ignore_ascii_case("n"));
        config.ops_utils_dir = Some(ops_utils_dir);
    }

    write_config(config_path, &config)
        .with_context(|| format!("Writing the config to {} failed", config_path.display()))?;
    Ok(InitOutcome::Written(config_path.to_path_buf()))
}

fn prompt<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> Result<String> {
    writeln!(output, "{question}")?;
    write!(output, "{WAITING_FOR_INPUT}")?;
    output.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("failed to read answer from stdin")?;
    Ok(answer.trim_end_matches(&['\n', '\r'][..]).to_string())
}

/// Settings of the file being overwritten; an unreadable file contributes nothing.
fn existing_settings(path: &Path) -> RawOccConfig {
    let parsed = fs::read_to_string(path)
        .map_err(|err| err.to_string())
        .and_then(|document| {
            serde_yaml::from_str::<Option<RawOccConfig>>(&document).map_err(|err| err.to_string())
        });
    match parsed {
        Ok(config) => config.unwrap_or_default(),
        Err(reason) => {
            warn!(
                target: "occ::config",
                path = %path.display(),
                reason = %reason,
                "Ignoring unreadable existing configuration"
            );
            RawOccConfig::default()
        }
    }
}
