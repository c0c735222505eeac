//! Logging capability handed to the provider at construction.
//!
//! Embedders that route diagnostics elsewhere implement [`Logger`]; the
//! server binary uses [`TracingLogger`].

use tracing::Level;

pub trait Logger: Send + Sync {
    fn log(&self, level: Level, message: &str);

    fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }

    fn error(&self, message: &str) {
        self.log(Level::ERROR, message);
    }
}

/// Forwards to `tracing` events, inheriting the current request span.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: Level, message: &str) {
        if level == Level::ERROR {
            tracing::error!("{message}");
        } else if level == Level::WARN {
            tracing::warn!("{message}");
        } else if level == Level::INFO {
            tracing::info!("{message}");
        } else if level == Level::DEBUG {
            tracing::debug!("{message}");
        } else {
            tracing::trace!("{message}");
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: Level, _message: &str) {}
}
