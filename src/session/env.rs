use crate::{config::OccConfig, lib::platform::Platform, runtime::EnvMap};

/// `SSH_AUTH_SOCK` inside the container when the agent directory is mounted (macOS).
pub const MAC_SSH_AUTH_SOCK: &str = "/tmp/ssh/Listeners";
/// `SSH_AUTH_SOCK` inside the container when the agent socket is mounted directly.
pub const SSH_AUTH_SOCK: &str = "/tmp/ssh.sock";

/// Container environment for one launch. Empty values are never emitted.
pub fn build_env(config: &OccConfig, args: &[String], platform: Platform) -> EnvMap {
    let mut env = EnvMap::new();
    let optional = [
        ("USER", config.ocm_user.as_str()),
        ("OFFLINE_ACCESS_TOKEN", config.offline_access_token.as_str()),
        ("OCM_URL", config.ocm_url.as_str()),
        (
            "INITIAL_CLUSTER_LOGIN",
            args.first().map(String::as_str).unwrap_or_default(),
        ),
    ];
    for (key, value) in optional {
        if !value.is_empty() {
            env.insert(key.to_string(), value.to_string());
        }
    }

    let sock = match platform {
        Platform::Mac => MAC_SSH_AUTH_SOCK,
        Platform::Other => SSH_AUTH_SOCK,
    };
    env.insert("SSH_AUTH_SOCK".to_string(), sock.to_string());
    env
}
