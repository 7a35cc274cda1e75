//! Shared library modules providing error types, host filesystem access, archiving and telemetry.

pub mod archive;
pub mod errors;
pub mod fs;
pub mod paths;
pub mod platform;
pub mod telemetry;
