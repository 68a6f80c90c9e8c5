//! Loading and interpreting browser-extension manifest documents.

mod fields;
mod resources;

pub use fields::resolve_manifest_fields;
pub use resources::validate_json_resources;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

/// A manifest document freshly read from disk.
///
/// Documents are immutable per read and never cached across passes: every
/// pass that needs the manifest re-reads it so that watch cycles always see
/// current on-disk state.
#[derive(Debug, Clone)]
pub struct ManifestDocument {
  /// Parsed JSON tree of the manifest.
  pub tree: Value,
  /// Path the document was read from.
  pub source_path: PathBuf,
  /// Directory containing the manifest; the context for path resolution.
  pub dir: PathBuf,
}

/// Errors that abort a resolution pass outright.
///
/// Everything else surfaces through the diagnostics sink; an unreadable or
/// syntactically invalid manifest leaves nothing to resolve against.
#[derive(Debug)]
pub enum ManifestLoadError {
  /// Failed to read the manifest from disk.
  Io {
    /// Path that caused the error.
    path: PathBuf,
    /// Source I/O error.
    source: std::io::Error,
  },
  /// The top-level document is not valid JSON.
  Parse {
    /// Path that caused the error.
    path: PathBuf,
    /// Source parse error.
    source: serde_json::Error,
  },
}

impl std::fmt::Display for ManifestLoadError {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Io { path, source } => {
        write!(f, "failed to read {}: {}", path.display(), source)
      }
      Self::Parse { path, source } => {
        write!(f, "failed to parse {}: {}", path.display(), source)
      }
    }
  }
}

impl std::error::Error for ManifestLoadError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::Io { source, .. } => Some(source),
      Self::Parse { source, .. } => Some(source),
    }
  }
}

impl ManifestDocument {
  /// Read and parse the manifest at the given path.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestLoadError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|err| ManifestLoadError::Io {
      path: path.to_path_buf(),
      source: err,
    })?;
    let tree: Value = serde_json::from_str(&content).map_err(|err| ManifestLoadError::Parse {
      path: path.to_path_buf(),
      source: err,
    })?;

    let dir = path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from("."));

    Ok(Self {
      tree,
      source_path: path.to_path_buf(),
      dir,
    })
  }

  /// Wrap an already-parsed tree, e.g. a browser-filtered clone.
  pub fn from_tree(tree: Value, source_path: impl Into<PathBuf>) -> Self {
    let source_path = source_path.into();
    let dir = source_path
      .parent()
      .map(Path::to_path_buf)
      .unwrap_or_else(|| PathBuf::from("."));
    Self {
      tree,
      source_path,
      dir,
    }
  }

  /// Declared `manifest_version`, defaulting to 2 when absent or malformed.
  pub fn manifest_version(&self) -> u64 {
    self
      .tree
      .get("manifest_version")
      .and_then(Value::as_u64)
      .unwrap_or(2)
  }

  /// Returns `true` for manifest v3 documents.
  pub fn is_v3(&self) -> bool {
    self.manifest_version() >= 3
  }
}
