//! Backend worker: owns the tokio runtime, the mirror and the gateway.

pub mod commands;
pub mod runtime;
