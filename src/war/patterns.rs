//! URL match-pattern primitives for web-accessible-resource groups.

use regex::Regex;
use url::Url;

/// Returns `true` when a resource entry uses glob syntax.
pub fn is_glob_pattern(value: &str) -> bool {
    value.chars().any(|c| matches!(c, '*' | '?' | '[' | ']'))
}

/// Compile a resource glob into an anchored regex.
///
/// Literal segments are escaped and each `*` matches any run of characters;
/// the remaining glob metacharacters are rare in resource lists and are
/// treated literally.
pub fn glob_to_regex(pattern: &str) -> Regex {
    let escaped: Vec<String> = pattern.split('*').map(|s| regex::escape(s)).collect();
    Regex::new(&format!("^{}$", escaped.join(".*"))).expect("invalid resource glob regex")
}

/// Returns `true` when an existing glob entry already covers a candidate.
pub fn glob_covers(pattern: &str, candidate: &str) -> bool {
    is_glob_pattern(pattern) && glob_to_regex(pattern).is_match(candidate)
}

/// Validate one URL match pattern as the Chromium family accepts it.
///
/// Valid patterns are the literal `<all_urls>`, or patterns that carry no
/// query or fragment, end with `/*`, and parse as a URL rooted at `/` once
/// the wildcard scheme and host forms are substituted with parseable stand-ins.
pub fn validate_match_pattern(pattern: &str) -> bool {
    if pattern == "<all_urls>" {
        return true;
    }
    if pattern.contains('?') || pattern.contains('#') {
        return false;
    }
    if !pattern.ends_with("/*") {
        return false;
    }

    let substituted = substitute_wildcards(pattern);
    // Drop the trailing `*`; the remaining URL must sit at the host root.
    let candidate = &substituted[..substituted.len() - 1];
    match Url::parse(candidate) {
        Ok(url) => url.path() == "/",
        Err(_) => false,
    }
}

/// Rewrite a match pattern so its URL path is exactly `/*`.
///
/// Deeper paths are rejected by the browser for resource groups, so
/// `https://example.com/app/*` becomes `https://example.com/*`. Patterns
/// without a scheme separator (such as `<all_urls>`) pass through unchanged.
pub fn clean_match_pattern(pattern: &str) -> String {
    let Some((scheme, rest)) = pattern.split_once("://") else {
        return pattern.to_string();
    };

    match rest.find('/') {
        Some(index) if &rest[index..] == "/*" => pattern.to_string(),
        Some(index) => format!("{scheme}://{}/*", &rest[..index]),
        None => format!("{pattern}/*"),
    }
}

/// Replace the wildcard scheme and host forms with parseable stand-ins.
///
/// `*://` means http-or-https and parses fine as `https://`; a `*.` host
/// prefix or a bare `*` host has no URL representation at all, so both are
/// neutralized before handing the pattern to the URL parser.
fn substitute_wildcards(pattern: &str) -> String {
    let with_scheme = match pattern.strip_prefix("*://") {
        Some(rest) => format!("https://{rest}"),
        None => pattern.to_string(),
    };

    let Some((scheme, rest)) = with_scheme.split_once("://") else {
        return with_scheme;
    };
    let rest = if let Some(stripped) = rest.strip_prefix("*.") {
        stripped.to_string()
    } else if let Some(stripped) = rest.strip_prefix('*') {
        format!("wildcard{stripped}")
    } else {
        rest.to_string()
    };
    format!("{scheme}://{rest}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_all_urls_literal() {
        assert!(validate_match_pattern("<all_urls>"));
    }

    #[test]
    fn accepts_host_root_patterns() {
        assert!(validate_match_pattern("https://example.com/*"));
        assert!(validate_match_pattern("http://example.com/*"));
        assert!(validate_match_pattern("*://example.com/*"));
    }

    #[test]
    fn accepts_wildcard_hosts() {
        assert!(validate_match_pattern("https://*.example.com/*"));
        assert!(validate_match_pattern("*://*/*"));
    }

    #[test]
    fn rejects_deep_paths() {
        assert!(!validate_match_pattern("https://example.com/path/*"));
    }

    #[test]
    fn rejects_patterns_without_trailing_wildcard() {
        assert!(!validate_match_pattern("https://example.com"));
        assert!(!validate_match_pattern("https://example.com/"));
    }

    #[test]
    fn rejects_queries_and_fragments() {
        assert!(!validate_match_pattern("https://example.com/*?q=1"));
        assert!(!validate_match_pattern("https://example.com/#frag/*"));
    }

    #[test]
    fn rejects_unparseable_hosts() {
        assert!(!validate_match_pattern("notaurl/*"));
        assert!(!validate_match_pattern("https:///*"));
    }

    #[test]
    fn cleans_deep_paths_to_the_host_root() {
        assert_eq!(
            clean_match_pattern("https://example.com/app/*"),
            "https://example.com/*"
        );
        assert_eq!(
            clean_match_pattern("https://example.com/deep/path"),
            "https://example.com/*"
        );
    }

    #[test]
    fn clean_keeps_host_root_patterns_and_appends_missing_paths() {
        assert_eq!(
            clean_match_pattern("https://example.com/*"),
            "https://example.com/*"
        );
        assert_eq!(
            clean_match_pattern("https://example.com"),
            "https://example.com/*"
        );
    }

    #[test]
    fn clean_passes_schemeless_patterns_through() {
        assert_eq!(clean_match_pattern("<all_urls>"), "<all_urls>");
    }

    #[test]
    fn glob_detection_and_coverage() {
        assert!(is_glob_pattern("assets/*.png"));
        assert!(!is_glob_pattern("assets/logo.png"));

        assert!(glob_covers("assets/*.png", "assets/logo.png"));
        assert!(glob_covers("assets/*", "assets/nested/logo.png"));
        assert!(!glob_covers("assets/*.png", "assets/logo.svg"));
        assert!(!glob_covers("assets/logo.png", "assets/logo.png"));
    }

    #[test]
    fn glob_regex_escapes_literal_segments() {
        let regex = glob_to_regex("img/a+b/*.png");
        assert!(regex.is_match("img/a+b/x.png"));
        assert!(!regex.is_match("img/aab/x.png"));
    }
}
