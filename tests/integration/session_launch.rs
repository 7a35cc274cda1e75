use std::path::Path;

use occ::{
    config::OccConfig,
    lib::errors::LaunchError,
    runtime::{InMemoryRuntime, MountOption, RuntimeOperation},
    session::relay::CONSOLE_CONTAINER_PORT,
};

use crate::common::{tar_entries, HomeFixture};

#[tokio::test]
async fn launch_mirrors_home_credentials_and_relays_console_port() {
    let home = HomeFixture::new()
        .with_config("ocm_user: alice\noffline_access_token: token-123\n")
        .with_file(".aws/credentials", "[default]\n")
        .with_file(".aws/config", "[default]\n")
        .with_file(".config/pagerduty-cli/config.json", "{}");
    let config = OccConfig::load_from_path(home.config_path()).expect("config should load");
    let runtime = InMemoryRuntime::new().with_published_ports(CONSOLE_CONTAINER_PORT, ["40001"]);

    let id = home
        .launcher(runtime.clone())
        .launch(&home.request(false), &config)
        .await
        .expect("launch should succeed");

    let created = runtime.created();
    assert_eq!(created.len(), 1);
    let spec = &created[0];
    assert_eq!(spec.image, "localhost/ocm-container:latest");
    assert_eq!(spec.env["USER"], "alice");
    assert_eq!(spec.env["OFFLINE_ACCESS_TOKEN"], "token-123");
    assert_eq!(spec.env["INITIAL_CLUSTER_LOGIN"], "cluster-a");
    assert_eq!(spec.env["SSH_AUTH_SOCK"], "/tmp/ssh.sock");
    assert_eq!(spec.mounts.len(), 4 + 2 + 1);
    assert_eq!(
        spec.mount_at("/root/.aws/credentials")
            .and_then(|mount| mount.source_path()),
        Some(home.path().join(".aws/credentials").as_path())
    );

    assert_eq!(runtime.attached(), vec![id.clone()]);
    let copies = runtime.copies();
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].container_id, id);
    assert_eq!(
        tar_entries(&copies[0].bytes),
        vec![("portmap".to_string(), "40001\n".to_string())]
    );
}

#[tokio::test]
async fn ops_utils_directory_is_mounted_with_configured_access() {
    let home = HomeFixture::new()
        .with_config("ocm_user: alice\nops_utils_dir: /opt/sop-utils\nops_utils_dir_rw: true\n");
    let config = OccConfig::load_from_path(home.config_path()).expect("config should load");
    let runtime = InMemoryRuntime::new();

    home.launcher(runtime.clone())
        .launch(&home.request(true), &config)
        .await
        .expect("launch should succeed");

    let spec = &runtime.created()[0];
    let ops = spec
        .mount_at("/root/sop-utils")
        .expect("ops-utils mount present");
    assert_eq!(ops.options, vec![MountOption::ReadWrite]);
    assert_eq!(ops.source_path(), Some(Path::new("/opt/sop-utils")));
    assert!(runtime.copies().is_empty());
}

#[tokio::test]
async fn missing_config_file_stops_before_the_runtime() {
    let home = HomeFixture::new();
    let runtime = InMemoryRuntime::new();

    let err = home
        .launcher(runtime.clone())
        .launch(&home.request(false), &OccConfig::default())
        .await
        .expect_err("launch should fail without a config file");

    assert!(matches!(err, LaunchError::MissingConfig { .. }));
    assert!(runtime.calls().is_empty());
}

#[tokio::test]
async fn create_failure_is_fatal() {
    let home = HomeFixture::new().with_config("ocm_user: alice\n");
    let runtime = InMemoryRuntime::new().with_failure(RuntimeOperation::Create);

    let err = home
        .launcher(runtime.clone())
        .launch(&home.request(false), &OccConfig::default())
        .await
        .expect_err("launch should fail");

    assert!(err.to_string().starts_with("Failed to create container"));
    assert_eq!(runtime.calls(), vec![RuntimeOperation::Create]);
}

#[tokio::test]
async fn attach_failure_is_reported_after_the_relay() {
    let home = HomeFixture::new().with_config("ocm_user: alice\n");
    let runtime = InMemoryRuntime::new().with_failure(RuntimeOperation::Attach);

    let err = home
        .launcher(runtime.clone())
        .launch(&home.request(false), &OccConfig::default())
        .await
        .expect_err("launch should fail");

    assert!(matches!(err, LaunchError::Attach { .. }));
    assert_eq!(
        runtime.calls(),
        vec![
            RuntimeOperation::Create,
            RuntimeOperation::Start,
            RuntimeOperation::Inspect,
            RuntimeOperation::CopyRequest,
            RuntimeOperation::CopyStream,
            RuntimeOperation::Attach,
        ]
    );
}
