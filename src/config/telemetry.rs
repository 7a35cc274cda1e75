use tracing::info;

use super::OccConfig;

/// Log which keys were resolved. Secret values are never logged.
pub fn log_loaded(config: &OccConfig) {
    info!(
        target: "occ::config",
        path = %config.source_path.display(),
        ocm_user_set = !config.ocm_user.is_empty(),
        offline_access_token_set = !config.offline_access_token.is_empty(),
        ocm_url = %config.ocm_url,
        ops_utils_dir = %config.ops_utils_dir,
        ops_utils_dir_rw = config.ops_utils_dir_rw,
        podman_path = %config.podman_path.display(),
        podman_socket = ?config.podman_socket,
        image_tag = %config.image_tag,
        "Configuration loaded"
    );
}
