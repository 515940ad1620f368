//! Non-fatal diagnostics raised while scanning.

use crate::search_path::SearchPath;
use std::sync::Mutex;

/// An include reference that matched no file.  Expected now and then, since
/// scanners don't evaluate preprocessor conditionals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// The reference text as written in the includer.
    pub include: String,
    /// Canonical path of the including file.
    pub includer: String,
    /// The includer's directory, searched before `search_path` for quoted
    /// references.  None when only `search_path` was searched.
    pub origin: Option<String>,
    /// The configured directories that were searched.
    pub search_path: SearchPath,
}

impl std::fmt::Display for Unresolved {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No dependency generated for file: {} (included from: {}) -- file not found",
            self.include, self.includer
        )
    }
}

/// Receiver for scan warnings.  Called from scanning worker threads.
pub trait Warnings: Sync {
    fn unresolved(&self, warning: Unresolved);
}

/// Reports warnings through `tracing`.
#[derive(Default)]
pub struct LogWarnings {}

impl Warnings for LogWarnings {
    fn unresolved(&self, warning: Unresolved) {
        tracing::warn!(
            origin = warning.origin.as_deref(),
            search_path = %warning.search_path,
            "{}",
            warning
        );
    }
}

/// Discards warnings.
#[derive(Default)]
pub struct IgnoreWarnings {}

impl Warnings for IgnoreWarnings {
    fn unresolved(&self, _warning: Unresolved) {}
}

/// Accumulates warnings for later inspection.
#[derive(Default)]
pub struct CollectWarnings {
    warnings: Mutex<Vec<Unresolved>>,
}

impl CollectWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes all accumulated warnings, leaving the collector empty.
    pub fn take(&self) -> Vec<Unresolved> {
        std::mem::take(&mut *self.warnings.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.warnings.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Warnings for CollectWarnings {
    fn unresolved(&self, warning: Unresolved) {
        self.warnings.lock().unwrap().push(warning);
    }
}
