//! Telemetry initialization, verbosity parsing and session span helpers.

use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, info_span, level_filters::LevelFilter, Span};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

use crate::lib::errors::VerbosityError;

/// Level names accepted by `--verbosity`, indexable by position.
const VERBOSITY_LEVELS: [(&str, LevelFilter); 7] = [
    ("panic", LevelFilter::ERROR),
    ("fatal", LevelFilter::ERROR),
    ("error", LevelFilter::ERROR),
    ("warn", LevelFilter::WARN),
    ("info", LevelFilter::INFO),
    ("debug", LevelFilter::DEBUG),
    ("trace", LevelFilter::TRACE),
];

/// Level used when `--verbosity` is not given.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::WARN;

/// Initialize `tracing` on stderr. `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(level: LevelFilter) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.into()));
    fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to initialize tracing: {err}"))
}

/// Parse a `--verbosity` value.
///
/// Accepts a level name or its index in `panic, fatal, error, warn, info, debug, trace`.
/// Negative indexes use their absolute value and indexes past the end clamp to `trace`.
/// An empty value (bare `-v`) selects `debug`.
pub fn parse_verbosity(raw: &str) -> Result<LevelFilter, VerbosityError> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(LevelFilter::DEBUG);
    }

    if let Ok(index) = value.parse::<i64>() {
        let last = VERBOSITY_LEVELS.len() - 1;
        let index = usize::try_from(index.unsigned_abs()).map_or(last, |index| index.min(last));
        return Ok(VERBOSITY_LEVELS[index].1);
    }

    let lowered = value.to_ascii_lowercase();
    let lowered = if lowered == "warning" { "warn".to_string() } else { lowered };
    VERBOSITY_LEVELS
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, level)| *level)
        .ok_or_else(|| VerbosityError {
            value: value.to_string(),
        })
}

/// Span helper recording the start and end of one container session.
pub struct SessionSpan {
    span: Span,
    started_at: Instant,
    session_id: Uuid,
}

impl SessionSpan {
    pub fn start(image: &str) -> Self {
        let session_id = Uuid::new_v4();
        let span = info_span!(target: "occ::session", "session", %session_id, image);
        Self {
            span,
            started_at: Instant::now(),
            session_id,
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Close the span while recording how the session ended.
    pub fn finish(self, status: &'static str) {
        let elapsed_ms = self.started_at.elapsed().as_millis();
        let _entered = self.span.enter();
        info!(
            target: "occ::session",
            session_id = %self.session_id,
            status = status,
            elapsed_ms = elapsed_ms,
            "Container session ended"
        );
    }
}

/// Summary of a container session about to be created.
#[derive(Debug, Serialize)]
pub struct SessionLaunchTelemetry<'a> {
    pub image: &'a str,
    pub platform: &'a str,
    pub mount_count: usize,
    pub env_keys: Vec<&'a str>,
    pub publish_console_port: bool,
}

/// Emit the session summary to `tracing`.
pub fn emit_session_launch(telemetry: &SessionLaunchTelemetry<'_>) {
    info!(
        target: "occ::session",
        image = telemetry.image,
        platform = telemetry.platform,
        mount_count = telemetry.mount_count,
        env_keys = ?telemetry.env_keys,
        publish_console_port = telemetry.publish_console_port,
        "Creating container session"
    );
}
