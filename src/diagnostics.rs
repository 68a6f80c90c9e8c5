//! Diagnostic records accumulated while resolving a build pass.

use std::path::{Path, PathBuf};

/// Severity attached to a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
  /// Non-fatal finding; the build continues.
  Warning,
  /// Fatal finding; the current build output must not be used.
  Error,
}

/// A single finding produced while resolving or patching a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
  /// Severity of the finding.
  pub severity: Severity,
  /// Human readable description of the finding.
  pub message: String,
  /// Offending file path, when one is known.
  pub path: Option<PathBuf>,
}

impl Diagnostic {
  /// Create a warning diagnostic without an associated path.
  pub fn warning(message: impl Into<String>) -> Self {
    Self {
      severity: Severity::Warning,
      message: message.into(),
      path: None,
    }
  }

  /// Create an error diagnostic without an associated path.
  pub fn error(message: impl Into<String>) -> Self {
    Self {
      severity: Severity::Error,
      message: message.into(),
      path: None,
    }
  }

  /// Attach the offending file path to the diagnostic.
  pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
    self.path = Some(path.as_ref().to_path_buf());
    self
  }
}

impl std::fmt::Display for Diagnostic {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let label = match self.severity {
      Severity::Warning => "warning",
      Severity::Error => "error",
    };
    match &self.path {
      Some(path) => write!(f, "{}: {} ({})", label, self.message, path.display()),
      None => write!(f, "{}: {}", label, self.message),
    }
  }
}

/// Sink receiving diagnostics from resolution components.
///
/// Components never log findings ambiently; the host build tool injects a sink
/// per pass and decides how findings are surfaced.
pub trait DiagnosticSink {
  /// Record a single diagnostic.
  fn report(&mut self, diagnostic: Diagnostic);
}

/// Vector-backed sink collecting every diagnostic of one pass.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
  items: Vec<Diagnostic>,
}

impl DiagnosticLog {
  /// All diagnostics recorded so far, in report order.
  pub fn items(&self) -> &[Diagnostic] {
    &self.items
  }

  /// Returns `true` when at least one error-severity diagnostic was recorded.
  pub fn has_errors(&self) -> bool {
    self
      .items
      .iter()
      .any(|item| item.severity == Severity::Error)
  }

  /// Drain the recorded diagnostics, leaving the log empty for the next pass.
  pub fn drain(&mut self) -> Vec<Diagnostic> {
    std::mem::take(&mut self.items)
  }
}

impl DiagnosticSink for DiagnosticLog {
  fn report(&mut self, diagnostic: Diagnostic) {
    self.items.push(diagnostic);
  }
}
