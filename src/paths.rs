//! Resolution of declared manifest paths under the public-root convention.

use std::path::{Path, PathBuf};

use regex::Regex;

/// Regex recognising public-root declarations such as `/public/a`, `public/a`
/// and `./public/a`, independent of casing.
fn public_root_pattern() -> &'static Regex {
    use std::sync::OnceLock;

    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(?:\./|/)?public(?:[/\\](?P<rest>.*))?$").expect("invalid public regex")
    })
}

/// Resolve a path declared in a manifest or HTML document to an absolute
/// location under the context directory.
///
/// Declarations follow the public-root convention: `/`-prefixed and
/// `public/`-style paths belong to the project's `public/` directory, which is
/// copied verbatim to the output root. A leading slash therefore never refers
/// to the OS root; `/x`, `public/x`, `./public/x` and `/public/x` are four
/// spellings of the same file. Empty declarations are returned unchanged so
/// callers can treat absent and blank fields alike.
pub fn resolve_declared_path(context: &Path, declared: &str) -> PathBuf {
    if declared.is_empty() {
        return PathBuf::from(declared);
    }

    if let Some(captures) = public_root_pattern().captures(declared) {
        let mut resolved = context.join("public");
        if let Some(rest) = captures.name("rest") {
            if !rest.as_str().is_empty() {
                resolved.push(rest.as_str());
            }
        }
        return resolved;
    }

    if let Some(rest) = declared.strip_prefix('/') {
        let mut resolved = context.join("public");
        let rest = rest.trim_start_matches('/');
        if !rest.is_empty() {
            resolved.push(rest);
        }
        return resolved;
    }

    context.join(declared)
}

/// Split a declared reference into its public-root remainder, if it is one.
///
/// `"/favicon.png"` and `"public/favicon.png"` both yield `"favicon.png"`;
/// plain relative paths yield `None`.
pub fn public_root_remainder(declared: &str) -> Option<String> {
    if declared.is_empty() {
        return None;
    }

    if let Some(captures) = public_root_pattern().captures(declared) {
        return Some(
            captures
                .name("rest")
                .map(|rest| rest.as_str().to_string())
                .unwrap_or_default(),
        );
    }

    declared
        .strip_prefix('/')
        .map(|rest| rest.trim_start_matches('/').to_string())
}
