//! Merging of declared and discovered web-accessible resources.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::manifest::ManifestDocument;
use crate::models::{BuildMode, DiscoveredAssets, MatchPatternGroup};
use crate::paths::{public_root_remainder, resolve_declared_path};
use crate::project::ResolveContext;
use crate::war::patterns::{
    clean_match_pattern, glob_covers, is_glob_pattern, validate_match_pattern,
};

/// Compute the patched `web_accessible_resources` value for one pass.
///
/// The document must already be browser-filtered. Discovered assets are the
/// explicit output of the asset-collection stage, keyed by content script
/// index; the engine holds no state of its own, so each pass rebuilds every
/// group from the manifest and the map it is handed.
///
/// Returns `None` when neither the author nor the build declared anything.
pub fn patch_web_accessible_resources(
    document: &ManifestDocument,
    context: &ResolveContext,
    discovered: &DiscoveredAssets,
    sink: &mut dyn DiagnosticSink,
) -> Option<Value> {
    if document.is_v3() {
        patch_v3(document, context, discovered, sink)
    } else {
        patch_v2(document, context, discovered, sink)
    }
}

/// Manifest v2: one flat, deduplicated resource list.
fn patch_v2(
    document: &ManifestDocument,
    context: &ResolveContext,
    discovered: &DiscoveredAssets,
    sink: &mut dyn DiagnosticSink,
) -> Option<Value> {
    let mut resources: Vec<String> = Vec::new();

    if let Some(declared) = document
        .tree
        .get("web_accessible_resources")
        .and_then(Value::as_array)
    {
        for entry in declared {
            let Some(entry) = entry.as_str() else {
                continue;
            };
            if let Some(resolved) = resolve_user_entry(entry, document, context, sink) {
                if !resources.contains(&resolved) {
                    resources.push(resolved);
                }
            }
        }
    }

    for assets in discovered.values() {
        for asset in assets {
            if !resources.contains(asset) {
                resources.push(asset.clone());
            }
        }
    }

    if resources.is_empty() {
        return None;
    }
    Some(json!(resources))
}

/// Manifest v3: groups keyed by exact sorted match sets.
fn patch_v3(
    document: &ManifestDocument,
    context: &ResolveContext,
    discovered: &DiscoveredAssets,
    sink: &mut dyn DiagnosticSink,
) -> Option<Value> {
    let mut groups: BTreeMap<String, MatchPatternGroup> = BTreeMap::new();

    if let Some(declared) = document
        .tree
        .get("web_accessible_resources")
        .and_then(Value::as_array)
    {
        for entry in declared {
            let matches = sorted_string_list(entry.get("matches"));
            let group = group_for_matches(&mut groups, matches);
            let resources = entry
                .get("resources")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for resource in resources {
                let Some(resource) = resource.as_str() else {
                    continue;
                };
                if let Some(resolved) = resolve_user_entry(resource, document, context, sink) {
                    group.resources.insert(resolved);
                }
            }
        }
    }

    let content_script_matches = collect_content_script_matches(document);
    for (index, assets) in discovered {
        let Some(matches) = content_script_matches.get(index) else {
            log::debug!("discovered assets for content script {index} with no match set");
            continue;
        };
        let group = group_for_matches(&mut groups, matches.clone());
        for asset in assets {
            let covered = group.resources.contains(asset)
                || group
                    .resources
                    .iter()
                    .any(|existing| glob_covers(existing, asset));
            if !covered {
                group.resources.insert(asset.clone());
            }
        }
    }

    groups.retain(|_, group| !group.resources.is_empty());
    if groups.is_empty() {
        return None;
    }

    // Firefox parses these patterns under different rules; only the
    // Chromium family rejects the forms validated here.
    if !context.target.is_gecko() {
        for group in groups.values() {
            for pattern in &group.matches {
                if !validate_match_pattern(pattern) {
                    sink.report(
                        Diagnostic::error(format!(
                            "invalid match pattern {pattern:?} in web_accessible_resources"
                        ))
                        .with_path(&document.source_path),
                    );
                }
            }
        }
    }

    let rendered: Vec<Value> = groups
        .values()
        .map(|group| {
            json!({
                "resources": group.resources.iter().collect::<Vec<_>>(),
                "matches": group.matches,
            })
        })
        .collect();
    Some(json!(rendered))
}

/// Sorted, cleaned match sets of every content script, keyed by index.
fn collect_content_script_matches(document: &ManifestDocument) -> BTreeMap<usize, Vec<String>> {
    let mut result = BTreeMap::new();
    let Some(content_scripts) = document.tree.get("content_scripts").and_then(Value::as_array)
    else {
        return result;
    };

    for (index, content_script) in content_scripts.iter().enumerate() {
        let mut matches: Vec<String> = sorted_string_list(content_script.get("matches"))
            .into_iter()
            .map(|pattern| clean_match_pattern(&pattern))
            .collect();
        matches.sort();
        matches.dedup();
        result.insert(index, matches);
    }
    result
}

fn group_for_matches<'a>(
    groups: &'a mut BTreeMap<String, MatchPatternGroup>,
    matches: Vec<String>,
) -> &'a mut MatchPatternGroup {
    let group = MatchPatternGroup {
        matches,
        resources: Default::default(),
    };
    groups.entry(group.key()).or_insert(group)
}

fn sorted_string_list(value: Option<&Value>) -> Vec<String> {
    let mut list: Vec<String> = value
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    list.sort();
    list
}

/// Resolve one author-declared resource entry.
///
/// Globs pass through without touching the filesystem. Public-root entries
/// contribute their root-relative path and warn when the file is absent.
/// Everything else must exist to be emitted; present files contribute their
/// emitted name, absent ones warn and contribute nothing.
fn resolve_user_entry(
    entry: &str,
    document: &ManifestDocument,
    context: &ResolveContext,
    sink: &mut dyn DiagnosticSink,
) -> Option<String> {
    if entry.is_empty() {
        return None;
    }
    if is_glob_pattern(entry) {
        return Some(entry.to_string());
    }

    if let Some(rest) = public_root_remainder(entry) {
        let on_disk = context.public_dir().join(&rest);
        if !on_disk.is_file() {
            sink.report(
                Diagnostic::warning(format!(
                    "web accessible resource {entry:?} not found under the public root"
                ))
                .with_path(on_disk),
            );
        }
        return Some(rest);
    }

    let on_disk = resolve_declared_path(&document.dir, entry);
    if !on_disk.is_file() {
        sink.report(
            Diagnostic::warning(format!("web accessible resource {entry:?} not found"))
                .with_path(on_disk),
        );
        return None;
    }
    Some(emitted_asset_name(entry, &on_disk, context.mode))
}

/// Name under which the bundler emits a non-public resource file.
fn emitted_asset_name(entry: &str, on_disk: &Path, mode: BuildMode) -> String {
    match mode {
        BuildMode::Development => entry.trim_start_matches("./").to_string(),
        BuildMode::Production => {
            let stem = on_disk
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "asset".to_string());
            let extension = on_disk
                .extension()
                .map(|ext| format!(".{}", ext.to_string_lossy()))
                .unwrap_or_default();
            let digest = content_digest_prefix(on_disk);
            format!("assets/{stem}-{digest}{extension}")
        }
    }
}

/// First eight hex characters of the file's SHA-256 digest.
fn content_digest_prefix(path: &Path) -> String {
    let bytes = fs::read(path).unwrap_or_default();
    Sha256::digest(&bytes)
        .iter()
        .take(4)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
