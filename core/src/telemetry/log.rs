use log::{debug, info, warn};
use std::fmt;

/// Component-tagged front end over the `log` facade.
#[derive(Debug, Clone, Copy)]
pub struct LogManager {
    component: &'static str,
}

impl LogManager {
    pub fn new(component: &'static str) -> Self {
        Self { component }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
    }

    /// Debug-level detail; formatting is deferred until the record is emitted.
    pub fn detail(&self, args: fmt::Arguments<'_>) {
        debug!("[{}] {}", self.component, args);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.component, message);
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("bistaticcore")
    }
}
