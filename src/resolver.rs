//! Pass orchestrator tying resolution, extraction and patching together.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::browser::filter_manifest_for_browser;
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::html::extract_asset_graph_from_file;
use crate::manifest::{
  ManifestDocument, ManifestLoadError, resolve_manifest_fields, validate_json_resources,
};
use crate::models::{BuildMode, DiscoveredAssets, HtmlAssetGraph, ResolvedFieldMap};
use crate::project::ResolveContext;
use crate::war::patch_web_accessible_resources;

/// Fallback CSP baseline inserted when a development manifest declares none.
const DEFAULT_DEV_CSP: &str = "script-src 'self'; object-src 'self'";

/// High-level entry point the host build tool drives once per pass.
///
/// Every operation re-reads the manifest from disk and recomputes its answer,
/// so the same resolver serves the whole watch session without ever holding
/// stale state.
pub struct ManifestResolver<'a> {
  context: &'a ResolveContext,
}

impl<'a> ManifestResolver<'a> {
  /// Create a resolver for the provided context.
  pub fn new(context: &'a ResolveContext) -> Self {
    Self { context }
  }

  /// Read the manifest and filter it for the context's target browser.
  pub fn load_filtered_manifest(&self) -> Result<ManifestDocument, ManifestLoadError> {
    let document = ManifestDocument::load(self.context.manifest_path())?;
    let filtered = filter_manifest_for_browser(&document.tree, &self.context.target);
    Ok(ManifestDocument::from_tree(filtered, document.source_path))
  }

  /// Resolve the manifest's field map and validate its JSON resources.
  ///
  /// Non-critical declared references that are absent on disk warn; only the
  /// JSON resources are critical enough to error.
  pub fn resolve_entrypoints(
    &self,
    sink: &mut dyn DiagnosticSink,
  ) -> Result<ResolvedFieldMap, ManifestLoadError> {
    let document = self.load_filtered_manifest()?;
    let fields = resolve_manifest_fields(&document);
    validate_json_resources(&fields.json, sink);
    warn_missing_references(&fields, sink);
    Ok(fields)
  }

  /// Extract the asset graph of every resolved HTML entry.
  ///
  /// Unreadable entries warn and contribute an empty graph slot; the missing
  /// file itself surfaces when the bundler tries to emit the entry.
  pub fn collect_html_graphs(
    &self,
    fields: &ResolvedFieldMap,
    sink: &mut dyn DiagnosticSink,
  ) -> BTreeMap<String, HtmlAssetGraph> {
    let mut graphs = BTreeMap::new();

    for (key, value) in fields.html.iter() {
      for path in value.paths() {
        match extract_asset_graph_from_file(path) {
          Ok(graph) => {
            graphs.insert(key.clone(), graph);
          }
          Err(err) => {
            sink.report(Diagnostic::warning(format!("{err:#}")).with_path(path));
          }
        }
      }
    }

    graphs
  }

  /// Produce the patched manifest document for this pass.
  ///
  /// Applies the web-accessible-resources merge and, during development, the
  /// dev-server CSP allowance. The returned tree is ready to be written to
  /// the output directory.
  pub fn patch_manifest(
    &self,
    discovered: &DiscoveredAssets,
    sink: &mut dyn DiagnosticSink,
  ) -> Result<Value, ManifestLoadError> {
    let document = self.load_filtered_manifest()?;
    let mut tree = document.tree.clone();

    if let Some(war) = patch_web_accessible_resources(&document, self.context, discovered, sink) {
      if let Some(object) = tree.as_object_mut() {
        object.insert("web_accessible_resources".to_string(), war);
      }
    }

    if self.context.mode == BuildMode::Development {
      patch_content_security_policy(&mut tree, document.is_v3(), self.context);
    }

    Ok(tree)
  }

  /// Write a patched manifest as prettified JSON.
  pub fn write_patched_manifest(&self, path: &Path, tree: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(tree).context("failed to render manifest JSON")?;
    fs::write(path, rendered)
      .with_context(|| format!("failed to write manifest to {}", path.display()))?;
    Ok(())
  }
}

/// Warn for declared files that are absent on disk.
///
/// Covers the html, icon and script groups; JSON resources error separately
/// and locale lists are harvested from disk, so they always exist.
fn warn_missing_references(fields: &ResolvedFieldMap, sink: &mut dyn DiagnosticSink) {
  for group in [&fields.html, &fields.icons, &fields.scripts] {
    for (key, value) in group.iter() {
      for path in value.paths() {
        if !path.exists() {
          sink.report(
            Diagnostic::warning(format!("file declared by {key} not found")).with_path(path),
          );
        }
      }
    }
  }
}

/// Allow the development server origin in the manifest's script-src.
fn patch_content_security_policy(tree: &mut Value, is_v3: bool, context: &ResolveContext) {
  let origin = context.config.dev_server_origin.as_str();
  let Some(root) = tree.as_object_mut() else {
    return;
  };

  if is_v3 {
    let container = root
      .entry("content_security_policy".to_string())
      .or_insert_with(|| Value::Object(Default::default()));
    if let Some(object) = container.as_object_mut() {
      let current = object
        .get("extension_pages")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_DEV_CSP);
      let patched = allow_origin_in_script_src(current, origin);
      object.insert("extension_pages".to_string(), Value::String(patched));
    }
  } else {
    let current = root
      .get("content_security_policy")
      .and_then(Value::as_str)
      .unwrap_or(DEFAULT_DEV_CSP);
    let patched = allow_origin_in_script_src(current, origin);
    root.insert(
      "content_security_policy".to_string(),
      Value::String(patched),
    );
  }
}

/// Append an origin to the script-src directive, inserting one if absent.
fn allow_origin_in_script_src(csp: &str, origin: &str) -> String {
  let mut directives: Vec<String> = csp
    .split(';')
    .map(|directive| directive.trim().to_string())
    .filter(|directive| !directive.is_empty())
    .collect();

  let mut found = false;
  for directive in &mut directives {
    if directive.starts_with("script-src") {
      found = true;
      if !directive.split_whitespace().any(|token| token == origin) {
        directive.push(' ');
        directive.push_str(origin);
      }
    }
  }
  if !found {
    directives.insert(0, format!("script-src 'self' {origin}"));
  }

  directives.join("; ")
}
