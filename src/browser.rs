//! Target browser identity and browser-conditional manifest filtering.

use serde_json::{Map, Value};

/// Browser names belonging to the Chromium family.
const CHROMIUM_FAMILY: &[&str] = &["chrome", "chromium", "edge", "opera"];

/// Browser names belonging to the Gecko family.
const GECKO_FAMILY: &[&str] = &["firefox", "gecko"];

/// Family alias used in conditional manifest keys for Chromium browsers.
const CHROMIUM_ALIAS: &str = "chromium";

/// Family alias used in conditional manifest keys for Gecko browsers.
const GECKO_ALIAS: &str = "gecko";

/// Identity of the browser a build pass targets.
///
/// The target can be an exact browser name (`chrome`, `firefox`, …) or a
/// family alias (`chromium`, `gecko`); conditional manifest keys are matched
/// against both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetBrowser {
    name: String,
}

impl TargetBrowser {
    /// Create a target from a browser or family name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_ascii_lowercase(),
        }
    }

    /// The normalized target name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` for Firefox-family targets, which follow different
    /// manifest rules (match-pattern validation does not apply to them).
    pub fn is_gecko(&self) -> bool {
        self.name == GECKO_ALIAS || GECKO_FAMILY.contains(&self.name.as_str())
    }

    /// Decide whether a conditional-key prefix selects this target.
    ///
    /// A prefix matches when it names the target exactly, or when it is a
    /// family alias whose member set contains the target.
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix == self.name {
            return true;
        }
        match prefix.as_str() {
            CHROMIUM_ALIAS => CHROMIUM_FAMILY.contains(&self.name.as_str()),
            GECKO_ALIAS => GECKO_FAMILY.contains(&self.name.as_str()),
            _ => false,
        }
    }
}

/// Strip browser-conditional keys from a manifest tree for one target.
///
/// The walk operates on a clone of the input, depth first over objects,
/// arrays and scalars. Keys of the form `prefix:rest` are rewritten to `rest`
/// when the prefix selects the target and dropped otherwise; keys without a
/// `:` pass through unchanged. The output carries no conditional keys, so
/// applying the filter twice with the same target is idempotent.
pub fn filter_manifest_for_browser(tree: &Value, target: &TargetBrowser) -> Value {
    match tree {
        Value::Object(object) => {
            let mut filtered = Map::new();
            for (key, value) in object {
                match key.split_once(':') {
                    Some((prefix, rest)) => {
                        if target.matches_prefix(prefix) {
                            filtered.insert(
                                rest.to_string(),
                                filter_manifest_for_browser(value, target),
                            );
                        }
                    }
                    None => {
                        filtered.insert(key.clone(), filter_manifest_for_browser(value, target));
                    }
                }
            }
            Value::Object(filtered)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| filter_manifest_for_browser(item, target))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}
