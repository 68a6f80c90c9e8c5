//! Resolution of manifest fields into the five logical field groups.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::manifest::ManifestDocument;
use crate::models::{FieldGroup, ResolvedFieldMap};
use crate::paths::resolve_declared_path;

/// Containers whose `default_popup` and `default_icon` fields are resolved.
const ACTION_CONTAINERS: &[&str] = &["action", "browser_action", "page_action"];

/// `chrome_url_overrides` keys competing for the single override slot.
const URL_OVERRIDE_KEYS: &[&str] = &["history", "newtab", "bookmarks"];

/// Resolve every known manifest field of a browser-filtered document.
///
/// The document must already be filtered for the target browser; at this
/// point a conditional key that was dropped and a key that was never declared
/// look identical, which is exactly the contract: absence uniformly means
/// undefined. The whole map is recomputed from the document and the
/// filesystem on every call.
pub fn resolve_manifest_fields(document: &ManifestDocument) -> ResolvedFieldMap {
    let mut map = ResolvedFieldMap::default();

    resolve_html_fields(document, &mut map.html);
    resolve_icon_fields(document, &mut map.icons);
    resolve_json_fields(document, &mut map.json);
    resolve_script_fields(document, &mut map.scripts);
    resolve_locale_files(&document.dir, &mut map.locales);

    log::debug!(
        "resolved manifest fields: {} html, {} icons, {} json, {} scripts, {} locale lists",
        map.html.len(),
        map.icons.len(),
        map.json.len(),
        map.scripts.len(),
        map.locales.len()
    );
    map
}

fn resolve_html_fields(document: &ManifestDocument, group: &mut FieldGroup) {
    let tree = &document.tree;
    let dir = &document.dir;

    for container in ACTION_CONTAINERS.iter().copied() {
        if let Some(popup) = nested_str(tree, &[container, "default_popup"]) {
            group.insert_single(
                format!("{container}/default_popup"),
                resolve_declared_path(dir, popup),
            );
        }
    }

    // MV3 replaced background pages with service workers.
    if !document.is_v3() {
        if let Some(page) = nested_str(tree, &["background", "page"]) {
            group.insert_single("background/page", resolve_declared_path(dir, page));
        }
    }

    // Only the last declared override key survives; they are not merged.
    if let Some(overrides) = tree.get("chrome_url_overrides").and_then(Value::as_object) {
        let mut last = None;
        for (key, value) in overrides {
            if URL_OVERRIDE_KEYS.contains(&key.as_str()) {
                if let Some(page) = non_empty_str(value) {
                    last = Some(page);
                }
            }
        }
        if let Some(page) = last {
            group.insert_single("chrome_url_overrides", resolve_declared_path(dir, page));
        }
    }

    if let Some(page) = tree.get("devtools_page").and_then(non_empty_str) {
        group.insert_single("devtools_page", resolve_declared_path(dir, page));
    }

    let options = tree
        .get("options_page")
        .and_then(non_empty_str)
        .or_else(|| nested_str(tree, &["options_ui", "page"]));
    if let Some(page) = options {
        group.insert_single("options_page", resolve_declared_path(dir, page));
    }

    if let Some(pages) = nested_value(tree, &["sandbox", "pages"]).and_then(Value::as_array) {
        for (index, page) in pages.iter().enumerate() {
            if let Some(page) = non_empty_str(page) {
                group.insert_single(
                    format!("sandbox/page-{index}"),
                    resolve_declared_path(dir, page),
                );
            }
        }
    }

    if let Some(path) = nested_str(tree, &["side_panel", "default_path"]) {
        group.insert_single("side_panel/default_path", resolve_declared_path(dir, path));
    }

    if let Some(panel) = nested_str(tree, &["sidebar_action", "default_panel"]) {
        group.insert_single(
            "sidebar_action/default_panel",
            resolve_declared_path(dir, panel),
        );
    }
}

fn resolve_icon_fields(document: &ManifestDocument, group: &mut FieldGroup) {
    let tree = &document.tree;
    let dir = &document.dir;

    let mut icon_containers = ACTION_CONTAINERS.to_vec();
    icon_containers.push("sidebar_action");
    for container in icon_containers {
        let Some(icon) = nested_value(tree, &[container, "default_icon"]) else {
            continue;
        };
        let key = format!("{container}/default_icon");
        match icon {
            Value::String(path) if !path.is_empty() => {
                group.insert_single(key, resolve_declared_path(dir, path));
            }
            // Size-keyed map; declaration order is the author's order.
            Value::Object(sizes) => {
                let paths: Vec<PathBuf> = sizes
                    .values()
                    .filter_map(non_empty_str)
                    .map(|path| resolve_declared_path(dir, path))
                    .collect();
                if !paths.is_empty() {
                    group.insert_many(key, paths);
                }
            }
            _ => {}
        }
    }

    if let Some(themes) = nested_value(tree, &["browser_action", "theme_icons"])
        .and_then(Value::as_array)
    {
        let mut paths = Vec::new();
        for theme in themes {
            // The size field only disambiguates variants; it is not a file.
            for variant in ["light", "dark"] {
                if let Some(path) = theme.get(variant).and_then(non_empty_str) {
                    paths.push(resolve_declared_path(dir, path));
                }
            }
        }
        if !paths.is_empty() {
            group.insert_many("browser_action/theme_icons", paths);
        }
    }

    if let Some(icons) = tree.get("icons").and_then(Value::as_object) {
        let paths: Vec<PathBuf> = icons
            .values()
            .filter_map(non_empty_str)
            .map(|path| resolve_declared_path(dir, path))
            .collect();
        if !paths.is_empty() {
            group.insert_many("icons", paths);
        }
    }
}

fn resolve_json_fields(document: &ManifestDocument, group: &mut FieldGroup) {
    let tree = &document.tree;
    let dir = &document.dir;

    if let Some(rulesets) = nested_value(tree, &["declarative_net_request", "rule_resources"])
        .and_then(Value::as_array)
    {
        for ruleset in rulesets {
            let id = ruleset.get("id").and_then(non_empty_str);
            let path = ruleset.get("path").and_then(non_empty_str);
            if let (Some(id), Some(path)) = (id, path) {
                group.insert_single(
                    format!("declarative_net_request/{id}"),
                    resolve_declared_path(dir, path),
                );
            }
        }
    }

    if let Some(schema) = nested_str(tree, &["storage", "managed_schema"]) {
        group.insert_single("storage/managed_schema", resolve_declared_path(dir, schema));
    }
}

fn resolve_script_fields(document: &ManifestDocument, group: &mut FieldGroup) {
    let tree = &document.tree;
    let dir = &document.dir;

    if let Some(background) = tree.get("background").and_then(Value::as_object) {
        let service_worker = background.get("service_worker").and_then(non_empty_str);
        let scripts = background.get("scripts").and_then(Value::as_array);

        // Exactly one of the two forms is populated; a manifest declaring
        // both resolves to the form its manifest_version prescribes.
        match (service_worker, scripts) {
            (Some(worker), None) => {
                group.insert_single("background/service_worker", resolve_declared_path(dir, worker));
            }
            (None, Some(scripts)) => {
                insert_script_list(group, "background/scripts", dir, scripts, &[]);
            }
            (Some(worker), Some(scripts)) => {
                if document.is_v3() {
                    group.insert_single(
                        "background/service_worker",
                        resolve_declared_path(dir, worker),
                    );
                } else {
                    insert_script_list(group, "background/scripts", dir, scripts, &[]);
                }
            }
            (None, None) => {}
        }
    }

    if let Some(content_scripts) = tree.get("content_scripts").and_then(Value::as_array) {
        for (index, content_script) in content_scripts.iter().enumerate() {
            let js = content_script.get("js").and_then(Value::as_array);
            let css = content_script.get("css").and_then(Value::as_array);
            let empty = Vec::new();
            insert_script_list(
                group,
                format!("content_scripts/content-{index}"),
                dir,
                js.unwrap_or(&empty),
                css.unwrap_or(&empty),
            );
        }
    }

    if let Some(api_script) = nested_str(tree, &["user_scripts", "api_script"]) {
        group.insert_single(
            "user_scripts/api_script",
            resolve_declared_path(dir, api_script),
        );
    }
}

/// Combine js and css declarations into one resolved list.
///
/// Author-declared duplicates are preserved: injection order and repetition
/// are the author's to control, unlike the deduplicated HTML asset lists.
fn insert_script_list(
    group: &mut FieldGroup,
    key: impl Into<String>,
    dir: &Path,
    js: &[Value],
    css: &[Value],
) {
    let paths: Vec<PathBuf> = js
        .iter()
        .chain(css.iter())
        .filter_map(non_empty_str)
        .map(|path| resolve_declared_path(dir, path))
        .collect();
    if !paths.is_empty() {
        group.insert_many(key, paths);
    }
}

/// Flatten every immediate `_locales/<locale>/` directory into one list.
fn resolve_locale_files(dir: &Path, group: &mut FieldGroup) {
    let locales_dir = dir.join("_locales");
    let Ok(entries) = fs::read_dir(&locales_dir) else {
        return;
    };

    let mut locale_dirs: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_dir()))
        .map(|entry| entry.path())
        .collect();
    locale_dirs.sort();

    let mut files = Vec::new();
    for locale_dir in locale_dirs {
        let Ok(entries) = fs::read_dir(&locale_dir) else {
            continue;
        };
        let mut locale_files: Vec<PathBuf> = entries
            .flatten()
            .filter(|entry| entry.file_type().is_ok_and(|ft| ft.is_file()))
            .map(|entry| entry.path())
            .collect();
        locale_files.sort();
        files.append(&mut locale_files);
    }

    if !files.is_empty() {
        group.insert_many("_locales", files);
    }
}

fn nested_value<'a>(tree: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let mut current = tree;
    for key in keys {
        current = current.get(key)?;
    }
    Some(current)
}

fn nested_str<'a>(tree: &'a Value, keys: &[&str]) -> Option<&'a str> {
    nested_value(tree, keys).and_then(non_empty_str)
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use serde_json::json;
    use tempfile::tempdir;

    fn document(tree: Value) -> ManifestDocument {
        ManifestDocument::from_tree(tree, "/project/manifest.json")
    }

    fn paths_of(value: &FieldValue) -> Vec<String> {
        value
            .paths()
            .into_iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn mv2_background_scripts_resolve_and_worker_stays_undefined() {
        let map = resolve_manifest_fields(&document(json!({
            "manifest_version": 2,
            "background": { "scripts": ["bg.js", "bg2.js"] }
        })));

        let scripts = map.scripts.get("background/scripts").unwrap();
        assert_eq!(
            paths_of(scripts),
            vec!["/project/bg.js".to_string(), "/project/bg2.js".to_string()]
        );
        assert!(map.scripts.get("background/service_worker").is_none());
    }

    #[test]
    fn mv3_service_worker_resolves_and_scripts_stay_undefined() {
        let map = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "background": { "service_worker": "sw.js" }
        })));

        let worker = map.scripts.get("background/service_worker").unwrap();
        assert_eq!(paths_of(worker), vec!["/project/sw.js".to_string()]);
        assert!(map.scripts.get("background/scripts").is_none());
    }

    #[test]
    fn manifest_version_breaks_background_declaration_ties() {
        let both = json!({
            "manifest_version": 3,
            "background": { "service_worker": "sw.js", "scripts": ["bg.js"] }
        });
        let map = resolve_manifest_fields(&document(both));
        assert!(map.scripts.get("background/service_worker").is_some());
        assert!(map.scripts.get("background/scripts").is_none());
    }

    #[test]
    fn content_scripts_combine_js_and_css_preserving_duplicates() {
        let map = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "content_scripts": [
                { "js": ["content.js", "content.js"], "css": ["content.css"] },
                { "js": ["other.js"] }
            ]
        })));

        let first = map.scripts.get("content_scripts/content-0").unwrap();
        assert_eq!(
            paths_of(first),
            vec![
                "/project/content.js".to_string(),
                "/project/content.js".to_string(),
                "/project/content.css".to_string()
            ]
        );
        assert!(map.scripts.get("content_scripts/content-1").is_some());
    }

    #[test]
    fn last_present_url_override_key_wins() {
        let map = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "chrome_url_overrides": {
                "history": "history.html",
                "newtab": "newtab.html"
            }
        })));

        let value = map.html.get("chrome_url_overrides").unwrap();
        assert_eq!(paths_of(value), vec!["/project/newtab.html".to_string()]);
    }

    #[test]
    fn options_page_overrides_options_ui() {
        let map = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "options_page": "options-full.html",
            "options_ui": { "page": "options-embedded.html" }
        })));
        let value = map.html.get("options_page").unwrap();
        assert_eq!(
            paths_of(value),
            vec!["/project/options-full.html".to_string()]
        );

        let fallback = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "options_ui": { "page": "options-embedded.html" }
        })));
        let value = fallback.html.get("options_page").unwrap();
        assert_eq!(
            paths_of(value),
            vec!["/project/options-embedded.html".to_string()]
        );
    }

    #[test]
    fn sandbox_pages_and_panels_resolve_into_html_group() {
        let map = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "sandbox": { "pages": ["sandbox/one.html", "sandbox/two.html"] },
            "side_panel": { "default_path": "panel.html" },
            "sidebar_action": { "default_panel": "sidebar.html" },
            "devtools_page": "devtools.html"
        })));

        assert!(map.html.get("sandbox/page-0").is_some());
        assert!(map.html.get("sandbox/page-1").is_some());
        assert!(map.html.get("side_panel/default_path").is_some());
        assert!(map.html.get("sidebar_action/default_panel").is_some());
        assert!(map.html.get("devtools_page").is_some());
    }

    #[test]
    fn background_page_is_mv2_only() {
        let mv2 = resolve_manifest_fields(&document(json!({
            "manifest_version": 2,
            "background": { "page": "background.html" }
        })));
        assert!(mv2.html.get("background/page").is_some());

        let mv3 = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "background": { "page": "background.html" }
        })));
        assert!(mv3.html.get("background/page").is_none());
    }

    #[test]
    fn icon_maps_preserve_declaration_order() {
        let map = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "action": {
                "default_icon": { "48": "icon-48.png", "16": "icon-16.png", "128": "icon-128.png" }
            }
        })));

        let icons = map.icons.get("action/default_icon").unwrap();
        assert_eq!(
            paths_of(icons),
            vec![
                "/project/icon-48.png".to_string(),
                "/project/icon-16.png".to_string(),
                "/project/icon-128.png".to_string()
            ]
        );
    }

    #[test]
    fn theme_icons_resolve_light_and_dark_and_drop_size() {
        let map = resolve_manifest_fields(&document(json!({
            "manifest_version": 2,
            "browser_action": {
                "theme_icons": [
                    { "light": "light-16.png", "dark": "dark-16.png", "size": 16 },
                    { "light": "light-32.png", "dark": "dark-32.png", "size": 32 }
                ]
            }
        })));

        let icons = map.icons.get("browser_action/theme_icons").unwrap();
        assert_eq!(
            paths_of(icons),
            vec![
                "/project/light-16.png".to_string(),
                "/project/dark-16.png".to_string(),
                "/project/light-32.png".to_string(),
                "/project/dark-32.png".to_string()
            ]
        );
    }

    #[test]
    fn rulesets_key_by_ruleset_id() {
        let map = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "declarative_net_request": {
                "rule_resources": [
                    { "id": "ads", "enabled": true, "path": "rules/ads.json" },
                    { "id": "tracking", "enabled": false, "path": "rules/tracking.json" }
                ]
            },
            "storage": { "managed_schema": "schema.json" }
        })));

        assert!(map.json.get("declarative_net_request/ads").is_some());
        assert!(map.json.get("declarative_net_request/tracking").is_some());
        assert!(map.json.get("storage/managed_schema").is_some());
    }

    #[test]
    fn popup_paths_follow_the_public_root_convention() {
        let map = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "action": { "default_popup": "/popup.html" }
        })));

        let popup = map.html.get("action/default_popup").unwrap();
        assert_eq!(
            paths_of(popup),
            vec!["/project/public/popup.html".to_string()]
        );
    }

    #[test]
    fn locale_files_flatten_across_locales() {
        let temp = tempdir().unwrap();
        let locales = temp.path().join("_locales");
        fs::create_dir_all(locales.join("en")).unwrap();
        fs::create_dir_all(locales.join("de")).unwrap();
        fs::write(locales.join("en/messages.json"), "{}").unwrap();
        fs::write(locales.join("de/messages.json"), "{}").unwrap();

        let document = ManifestDocument::from_tree(
            json!({ "manifest_version": 3 }),
            temp.path().join("manifest.json"),
        );
        let map = resolve_manifest_fields(&document);

        let files = map.locales.get("_locales").unwrap();
        assert_eq!(files.paths().len(), 2);
    }

    #[test]
    fn undeclared_and_filtered_out_fields_are_indistinguishable() {
        let undeclared = resolve_manifest_fields(&document(json!({
            "manifest_version": 3,
            "name": "demo"
        })));
        let filtered = resolve_manifest_fields(&document(
            crate::browser::filter_manifest_for_browser(
                &json!({
                    "manifest_version": 3,
                    "name": "demo",
                    "firefox:devtools_page": "devtools.html"
                }),
                &crate::browser::TargetBrowser::new("chrome"),
            ),
        ));

        assert_eq!(undeclared, filtered);
    }
}
