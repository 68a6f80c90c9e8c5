//! Extraction of an HTML document's asset graph.

pub mod scanner;

use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use url::Url;

use crate::models::{AssetKind, AssetReference, HtmlAssetGraph};
use scanner::{RawTag, scan_tags};

/// `link[rel]` values that reference static files rather than stylesheets.
const STATIC_LINK_RELS: &[&str] = &[
    "dns-prefetch",
    "icon",
    "manifest",
    "modulepreload",
    "preconnect",
    "prefetch",
    "preload",
    "prerender",
];

/// Elements whose `src` attribute references a static file.
const STATIC_SRC_TAGS: &[&str] = &[
    "audio", "embed", "iframe", "img", "input", "source", "track", "video",
];

/// A raw reference split into its path, query and fragment parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedAssetUrl {
    /// Reference with query and fragment stripped.
    pub clean_path: String,
    /// Query portion including the leading `?`, or empty.
    pub search: String,
    /// Fragment portion including the leading `#`, or empty.
    pub hash: String,
}

/// Split a raw reference at the first of `?` or `#`.
///
/// A `#` occurring before any `?` swallows the remainder into the fragment;
/// query parameters inside a fragment are not query parameters.
pub fn clean_asset_url(raw: &str) -> CleanedAssetUrl {
    let query = raw.find('?');
    let fragment = raw.find('#');

    let (clean_end, search, hash) = match (query, fragment) {
        (None, None) => (raw.len(), "", ""),
        (Some(q), None) => (q, &raw[q..], ""),
        (None, Some(h)) => (h, "", &raw[h..]),
        (Some(q), Some(h)) if h < q => (h, "", &raw[h..]),
        (Some(q), Some(h)) => (q, &raw[q..h], &raw[h..]),
    };

    CleanedAssetUrl {
        clean_path: raw[..clean_end].to_string(),
        search: search.to_string(),
        hash: hash.to_string(),
    }
}

/// Returns `true` when a reference parses as an absolute URL.
///
/// Absolute URLs (including `data:` and `mailto:` schemes) are never resolved
/// to filesystem paths.
pub fn is_absolute_url(value: &str) -> bool {
    Url::parse(value).is_ok()
}

/// Classify the asset references of a scanned document.
///
/// The returned references are transient: they carry the raw attribute value
/// and its cleaned parts, before any joining against the document directory.
pub fn classify_references(tags: &[RawTag]) -> Vec<AssetReference> {
    let mut references = Vec::new();

    for tag in tags {
        match tag.name.as_str() {
            "script" => {
                push_reference(&mut references, AssetKind::Script, tag.attribute("src"));
            }
            "link" => {
                let rel = tag
                    .attribute("rel")
                    .map(|rel| rel.trim().to_ascii_lowercase())
                    .unwrap_or_default();
                let kind = if STATIC_LINK_RELS.contains(&rel.as_str()) {
                    AssetKind::Static
                } else {
                    AssetKind::Style
                };
                push_reference(&mut references, kind, tag.attribute("href"));
            }
            "a" | "area" => {
                push_reference(&mut references, AssetKind::Static, tag.attribute("href"));
            }
            name if STATIC_SRC_TAGS.contains(&name) => {
                let src = tag.attribute("src");
                // A fragment-only src can never name a file.
                if src.is_some_and(|src| src.starts_with('#')) {
                    continue;
                }
                push_reference(&mut references, AssetKind::Static, src);
            }
            _ => {}
        }
    }

    references
}

fn push_reference(references: &mut Vec<AssetReference>, kind: AssetKind, value: Option<&str>) {
    let Some(raw) = value else {
        return;
    };
    if raw.is_empty() || is_absolute_url(raw) {
        return;
    }

    let cleaned = clean_asset_url(raw);
    if cleaned.clean_path.is_empty() {
        return;
    }

    references.push(AssetReference {
        kind,
        raw_path: raw.to_string(),
        clean_path: cleaned.clean_path,
        search: cleaned.search,
        hash: cleaned.hash,
    });
}

/// Extract the asset graph of one HTML document.
///
/// References beginning with `/` stay public-root-relative; the consumer owns
/// the public-root join. Everything else resolves against the first
/// non-absolute `<base href>` (when present) joined with the document's
/// directory, else against the document's directory alone. Each output list
/// is deduplicated preserving first occurrence.
pub fn extract_asset_graph(source: &str, document_dir: &Path) -> HtmlAssetGraph {
    let tags = scan_tags(source);
    let base = document_base(&tags);
    let references = classify_references(&tags);

    let mut graph = HtmlAssetGraph::default();
    for reference in references {
        let resolved = if reference.clean_path.starts_with('/') {
            reference.clean_path.clone()
        } else {
            join_document_path(document_dir, base.as_deref(), &reference.clean_path)
        };

        let list = match reference.kind {
            AssetKind::Script => &mut graph.js,
            AssetKind::Style => &mut graph.css,
            AssetKind::Static => &mut graph.static_files,
        };
        if !list.contains(&resolved) {
            list.push(resolved);
        }
    }

    graph
}

/// Read an HTML document from disk and extract its asset graph.
pub fn extract_asset_graph_from_file(path: &Path) -> Result<HtmlAssetGraph> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read HTML entry {}", path.display()))?;
    let document_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(extract_asset_graph(&source, document_dir))
}

/// First `<base href>` of the document, unless it is an absolute URL.
fn document_base(tags: &[RawTag]) -> Option<String> {
    tags.iter()
        .find(|tag| tag.name == "base")
        .and_then(|tag| tag.attribute("href"))
        .filter(|href| !href.is_empty() && !is_absolute_url(href))
        .map(str::to_string)
}

/// Join a document-relative reference to the document directory.
fn join_document_path(document_dir: &Path, base: Option<&str>, reference: &str) -> String {
    let mut path = document_dir.to_path_buf();

    if let Some(base) = base {
        let trimmed = base.trim_start_matches('/');
        // A base without a trailing slash names a file; its directory applies.
        let base_dir = if trimmed.ends_with('/') {
            Some(Path::new(trimmed))
        } else {
            Path::new(trimmed).parent()
        };
        if let Some(base_dir) = base_dir {
            path.push(base_dir);
        }
    }

    path.push(reference);
    normalize_lexically(&path).to_string_lossy().replace('\\', "/")
}

/// Resolve `.` and `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}
