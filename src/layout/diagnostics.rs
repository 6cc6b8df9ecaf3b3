//! Non-fatal findings collected during a run.
//!
//! Each diagnostic is logged through the `log` facade when it is recorded
//! and kept for the caller in the [`LayoutOutput`](super::LayoutOutput).

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// Content did not fit and was placed anyway.
    Overflow,
    /// A citation's id was never declared.
    UnresolvedReference,
    /// An id was declared more than once.
    DuplicateId,
    /// Content not allowed where it appears.
    Structural,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{:?} at {}: {}", self.kind, loc, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn warn(&mut self, kind: DiagnosticKind, location: Option<String>, message: impl Into<String>) {
        self.push(Severity::Warning, kind, location, message.into());
    }

    pub fn error(&mut self, kind: DiagnosticKind, location: Option<String>, message: impl Into<String>) {
        self.push(Severity::Error, kind, location, message.into());
    }

    fn push(&mut self, severity: Severity, kind: DiagnosticKind, location: Option<String>, message: String) {
        let diagnostic = Diagnostic {
            severity,
            kind,
            location,
            message,
        };
        match severity {
            Severity::Warning => log::warn!("{}", diagnostic),
            Severity::Error => log::error!("{}", diagnostic),
        }
        self.items.push(diagnostic);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
