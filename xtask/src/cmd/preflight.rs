use crate::repo;
use anyhow::Result;
use std::{
    path::Path,
    process::{Command, Stdio},
};

/// Quality gate steps in execution order: (label, cargo arguments).
const STEPS: [(&str, &[&str]); 5] = [
    ("cargo fetch", &["fetch"]),
    ("cargo check --workspace", &["check", "--workspace"]),
    ("cargo test --workspace", &["test", "--workspace"]),
    ("cargo fmt --all -- --check", &["fmt", "--all", "--", "--check"]),
    (
        "cargo clippy --workspace --all-targets -- -D warnings",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    ),
];
const RELEASE_BUILD: (&str, &[&str]) = ("cargo build --release", &["build", "--release"]);

pub fn run(skip_build: bool) -> Result<()> {
    let root = repo::repo_root()?;
    for (label, args) in STEPS {
        run_step(&root, label, args)?;
    }
    if skip_build {
        eprintln!("==> skipping {}", RELEASE_BUILD.0);
        return Ok(());
    }
    run_step(&root, RELEASE_BUILD.0, RELEASE_BUILD.1)
}

fn run_step(root: &Path, label: &str, args: &[&str]) -> Result<()> {
    eprintln!("==> {label}");
    let status = Command::new("cargo")
        .args(args)
        .current_dir(root)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()?;

    if !status.success() {
        anyhow::bail!("{label} failed (status {status})");
    }
    Ok(())
}
