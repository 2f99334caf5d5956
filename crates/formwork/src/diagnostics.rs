use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Warning,
    Severe,
}

/// A message meant for the user of the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

/// User-visible messages raised by the engine.
///
/// Every message is also emitted as a `tracing` event at the matching
/// level.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }

    pub fn push(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();

        match severity {
            Severity::Info => tracing::info!(%message, "diagnostic"),
            Severity::Warning => tracing::warn!(%message, "diagnostic"),
            Severity::Severe => tracing::error!(%message, "diagnostic"),
        }

        self.entries().push(Diagnostic { severity, message });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    pub fn severe(&self, message: impl Into<String>) {
        self.push(Severity::Severe, message);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Copy of every message raised so far.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.entries().clone()
    }

    /// Remove and return every message raised so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.entries())
    }

    pub fn any(&self, f: impl Fn(&Diagnostic) -> bool) -> bool {
        self.entries().iter().any(f)
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
