//! Data structures produced while resolving a build description.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Build mode the host tool is running in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
  /// Watch-session build; emitted assets keep their plain names.
  Development,
  /// Packaged build; emitted assets are content addressed.
  Production,
}

/// Resolved value of one logical manifest field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
  /// Field resolving to a single file.
  Single(PathBuf),
  /// Field resolving to an ordered list of files.
  Many(Vec<PathBuf>),
}

impl FieldValue {
  /// View the value as an ordered list of paths.
  pub fn paths(&self) -> Vec<&Path> {
    match self {
      Self::Single(path) => vec![path.as_path()],
      Self::Many(paths) => paths.iter().map(PathBuf::as_path).collect(),
    }
  }

  /// Flatten the value into sorted string form for snapshot comparison.
  pub fn flattened(&self) -> Vec<String> {
    let mut values: Vec<String> = self
      .paths()
      .into_iter()
      .map(|path| path.to_string_lossy().into_owned())
      .collect();
    values.sort();
    values
  }
}

/// Ordered map of logical field key to resolved value.
///
/// A key that is absent is uniformly "undefined": downstream consumers cannot
/// tell whether the field was never declared or was filtered out for the
/// current browser, and they must not need to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldGroup {
  entries: BTreeMap<String, FieldValue>,
}

impl FieldGroup {
  /// Record a single-file field.
  pub fn insert_single(&mut self, key: impl Into<String>, path: PathBuf) {
    self.entries.insert(key.into(), FieldValue::Single(path));
  }

  /// Record a list-valued field.
  pub fn insert_many(&mut self, key: impl Into<String>, paths: Vec<PathBuf>) {
    self.entries.insert(key.into(), FieldValue::Many(paths));
  }

  /// Look up a field; `None` uniformly means undefined.
  pub fn get(&self, key: &str) -> Option<&FieldValue> {
    self.entries.get(key)
  }

  /// Iterate the fields in key order.
  pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
    self.entries.iter()
  }

  /// Returns `true` when no field resolved.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Number of resolved fields.
  pub fn len(&self) -> usize {
    self.entries.len()
  }
}

/// The five resolved field groups of one (manifest, browser) pair.
///
/// Recomputed fully on each invocation; nothing in here survives a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFieldMap {
  /// HTML-bearing fields (popups, pages, panels).
  pub html: FieldGroup,
  /// Icon-bearing fields.
  pub icons: FieldGroup,
  /// JSON-resource fields (rulesets, managed schema).
  pub json: FieldGroup,
  /// Script-bearing fields (background, content scripts, user scripts).
  pub scripts: FieldGroup,
  /// Flattened `_locales` files.
  pub locales: FieldGroup,
}

/// Classification of one HTML asset reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
  /// A `<script src>` reference.
  Script,
  /// A stylesheet `<link href>` reference.
  Style,
  /// Any other file reference (images, media, documents, icon links).
  Static,
}

/// A raw reference discovered in an HTML document, before path joining.
///
/// Produced transiently per parse and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetReference {
  /// Classification of the reference.
  pub kind: AssetKind,
  /// Attribute value exactly as written.
  pub raw_path: String,
  /// Reference with query and fragment stripped.
  pub clean_path: String,
  /// Query portion including the leading `?`, or empty.
  pub search: String,
  /// Fragment portion including the leading `#`, or empty.
  pub hash: String,
}

/// Script, style and static file references of one HTML entry.
///
/// Each list is deduplicated preserving first occurrence. Entries beginning
/// with `/` are public-root-relative; everything else has been joined to the
/// document directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HtmlAssetGraph {
  /// Script references in document order.
  pub js: Vec<String>,
  /// Stylesheet references in document order.
  pub css: Vec<String>,
  /// Static file references in document order.
  #[serde(rename = "static")]
  pub static_files: Vec<String>,
}

impl HtmlAssetGraph {
  /// Returns `true` when the document referenced no local assets.
  pub fn is_empty(&self) -> bool {
    self.js.is_empty() && self.css.is_empty() && self.static_files.is_empty()
  }
}

/// One `web_accessible_resources` group keyed by its exact match set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchPatternGroup {
  /// Sorted URL match patterns scoping the group.
  pub matches: Vec<String>,
  /// Deduplicated resources exposed to pages matching the group.
  pub resources: BTreeSet<String>,
}

impl MatchPatternGroup {
  /// Grouping key: exact sorted-match-array equality.
  pub fn key(&self) -> String {
    self.matches.join(",")
  }
}

/// Auxiliary resources discovered per content script by the asset-collection
/// stage, keyed by content script index.
///
/// Passed explicitly from the collection stage into the patch stage; the
/// engine holds no ambient side-table across passes.
pub type DiscoveredAssets = BTreeMap<usize, Vec<String>>;
