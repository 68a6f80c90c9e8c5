//! Project context describing where a build pass reads its inputs from.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::browser::TargetBrowser;
use crate::models::BuildMode;

const DEFAULT_CONFIG_FILE: &str = "webext.config.json";

/// File extensions treated as script sources inside the `scripts/` folder.
const SOURCE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "jsx", "ts", "mts", "cts", "tsx"];

/// Discoverable project configuration describing filesystem layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Manifest file name inside the project root.
    pub manifest_file: String,
    /// Folder copied verbatim to the output root.
    pub public_dir: String,
    /// Folder holding HTML entry pages.
    pub pages_dir: String,
    /// Folder holding standalone script entry points.
    pub scripts_dir: String,
    /// Origin of the development server injected into the CSP during watch
    /// sessions.
    pub dev_server_origin: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            manifest_file: "manifest.json".into(),
            public_dir: "public".into(),
            pages_dir: "pages".into(),
            scripts_dir: "scripts".into(),
            dev_server_origin: "http://localhost:5173".into(),
        }
    }
}

impl ProjectConfig {
    /// Attempt to load configuration from the provided directory.
    ///
    /// When the configuration file does not exist or fails to parse we fall
    /// back to default values so downstream callers can continue operating
    /// with sensible assumptions.
    pub fn discover(root_dir: &Path) -> Self {
        let candidate = root_dir.join(DEFAULT_CONFIG_FILE);
        Self::from_path(&candidate).unwrap_or_default()
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Option<Self> {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }
}

/// Everything a resolution pass needs to know about its surroundings.
///
/// The context is cheap to keep alive for a whole watch session: it holds no
/// file contents, only locations, so every pass re-derives its answers from
/// current on-disk state.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    /// Project root directory; every resolved path lies under it.
    pub root_dir: PathBuf,
    /// Browser the pass targets.
    pub target: TargetBrowser,
    /// Development or production semantics for emitted assets.
    pub mode: BuildMode,
    /// Filesystem layout configuration.
    pub config: ProjectConfig,
}

impl ResolveContext {
    /// Create a context with explicit configuration.
    pub fn new(
        root_dir: impl Into<PathBuf>,
        target: TargetBrowser,
        mode: BuildMode,
        config: ProjectConfig,
    ) -> Self {
        Self {
            root_dir: root_dir.into(),
            target,
            mode,
            config,
        }
    }

    /// Create a development-mode context, discovering configuration from the
    /// project root.
    pub fn discover(root_dir: impl Into<PathBuf>, browser: impl Into<String>) -> Self {
        let root_dir = root_dir.into();
        let config = ProjectConfig::discover(&root_dir);
        Self::new(
            root_dir,
            TargetBrowser::new(browser.into()),
            BuildMode::Development,
            config,
        )
    }

    /// Absolute path of the manifest document.
    pub fn manifest_path(&self) -> PathBuf {
        self.root_dir.join(&self.config.manifest_file)
    }

    /// Absolute path of the public root.
    pub fn public_dir(&self) -> PathBuf {
        self.root_dir.join(&self.config.public_dir)
    }

    /// Absolute path of the HTML pages folder.
    pub fn pages_dir(&self) -> PathBuf {
        self.root_dir.join(&self.config.pages_dir)
    }

    /// Absolute path of the standalone scripts folder.
    pub fn scripts_dir(&self) -> PathBuf {
        self.root_dir.join(&self.config.scripts_dir)
    }

    /// Every file under the public root, recursively, in path order.
    pub fn collect_public_files(&self) -> Vec<PathBuf> {
        let root = self.public_dir();
        if !root.is_dir() {
            return Vec::new();
        }

        let mut files: Vec<PathBuf> = WalkDir::new(&root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }

    /// HTML entry pages keyed by entry name.
    ///
    /// Names are the path relative to the pages folder without the `.html`
    /// extension; an `index.html` collapses to its folder name, so
    /// `pages/popup/index.html` and `pages/popup.html` both yield `popup`.
    pub fn collect_page_entries(&self) -> BTreeMap<String, PathBuf> {
        let root = self.pages_dir();
        if !root.is_dir() {
            return BTreeMap::new();
        }

        let mut entries = BTreeMap::new();
        for entry in WalkDir::new(&root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("html") {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&root) else {
                continue;
            };
            if let Some(name) = page_entry_name(relative) {
                log::debug!("discovered page entry {name} at {}", path.display());
                entries.insert(name, path);
            }
        }
        entries
    }

    /// Standalone script entry points keyed by entry name.
    pub fn collect_script_entries(&self) -> BTreeMap<String, PathBuf> {
        let root = self.scripts_dir();
        if !root.is_dir() {
            return BTreeMap::new();
        }

        let mut entries = BTreeMap::new();
        for entry in WalkDir::new(&root).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.into_path();
            let is_source = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext));
            if !is_source {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&root) else {
                continue;
            };
            let name = relative
                .with_extension("")
                .to_string_lossy()
                .replace('\\', "/");
            entries.insert(name, path);
        }
        entries
    }
}

/// Compute the entry name of one page file relative to the pages folder.
fn page_entry_name(relative: &Path) -> Option<String> {
    let stem = relative.file_stem()?.to_string_lossy();
    let parent = relative
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty());

    let name = if stem == "index" {
        match parent {
            Some(parent) => parent.to_string_lossy().replace('\\', "/"),
            None => "index".to_string(),
        }
    } else {
        match parent {
            Some(parent) => format!("{}/{}", parent.to_string_lossy().replace('\\', "/"), stem),
            None => stem.into_owned(),
        }
    };

    Some(name)
}
