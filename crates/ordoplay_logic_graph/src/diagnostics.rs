// SPDX-License-Identifier: MIT OR Apache-2.0
//! Validation diagnostics.
//!
//! Validation passes never stop at the first problem; they push every
//! finding into a [`Diagnostics`] sink so the author can fix the whole graph
//! in one go.

use crate::node::NodeKey;
use std::fmt;

/// How bad a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Informational, does not fail validation
    Warning,
    /// Fails validation
    Error,
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Node the finding is about, if any
    pub node: Option<NodeKey>,
    /// Human-readable message
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        match self.node {
            Some(key) => write!(f, "{severity}: node {key}: {}", self.message),
            None => write!(f, "{severity}: {}", self.message),
        }
    }
}

/// Collected diagnostics of one or more validation passes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    pub fn error(&mut self, node: Option<NodeKey>, message: impl Into<String>) {
        self.push(Severity::Error, node, message.into());
    }

    /// Record a warning
    pub fn warning(&mut self, node: Option<NodeKey>, message: impl Into<String>) {
        self.push(Severity::Warning, node, message.into());
    }

    fn push(&mut self, severity: Severity, node: Option<NodeKey>, message: String) {
        tracing::debug!(?severity, ?node, "{}", message);
        self.entries.push(Diagnostic {
            severity,
            node,
            message,
        });
    }

    /// Whether any error was recorded
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|d| d.severity == Severity::Error)
    }

    /// Number of errors
    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// All entries in the order they were recorded
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any entry's message contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.entries.iter().any(|d| d.message.contains(needle))
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}
