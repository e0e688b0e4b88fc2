//! Logger handle.
//!
//! A client accepts a logger handle at construction instead of relying on
//! process-wide logging configuration, defaulting to a no-op. `tracing`
//! remains the instrumentation layer used throughout lspkit (see the
//! `prelude`); this trait is the seam a collaborator can use to also
//! receive structured server-originated messages (`window/logMessage`,
//! `window/showMessage`) as plain values rather than `tracing` events.

use std::fmt;

/// Severity of a message forwarded from the server, mirroring
/// `lsp_types::MessageType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Log,
}

/// A sink for log/show-message traffic originating from the language server.
///
/// Implementations must be cheap to call and non-blocking; they are invoked
/// from the dispatcher task on the client's single event loop.
pub trait Logger: fmt::Debug + Send + Sync {
    fn log(&self, level: LogLevel, message: &str);
}

/// The default logger: forwards everything to `tracing` and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Error => tracing::error!(target: "lspkit::server", "{message}"),
            LogLevel::Warning => tracing::warn!(target: "lspkit::server", "{message}"),
            LogLevel::Info => tracing::info!(target: "lspkit::server", "{message}"),
            LogLevel::Log => tracing::debug!(target: "lspkit::server", "{message}"),
        }
    }
}
