#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod browser;
pub mod diagnostics;
pub mod guard;
pub mod html;
pub mod manifest;
pub mod models;
pub mod paths;
pub mod project;
pub mod resolver;
pub mod war;

pub use browser::{TargetBrowser, filter_manifest_for_browser};
pub use diagnostics::{Diagnostic, DiagnosticLog, DiagnosticSink, Severity};
pub use guard::{EntrypointChange, EntrypointChangeGuard};
pub use manifest::{ManifestDocument, ManifestLoadError};
pub use models::{BuildMode, DiscoveredAssets, HtmlAssetGraph, ResolvedFieldMap};
pub use project::{ProjectConfig, ResolveContext};
pub use resolver::ManifestResolver;
