//! Validation of JSON resources declared by the manifest.

use std::fs;
use std::path::Path;

use serde_json::Value;

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::models::FieldGroup;

/// Validate every file of the json-bearing field group.
///
/// These resources are critical: the browser refuses to load an extension
/// whose declared ruleset or managed-storage schema is missing or malformed,
/// so every failure here is an error rather than a warning.
pub fn validate_json_resources(group: &FieldGroup, sink: &mut dyn DiagnosticSink) {
    for (key, value) in group.iter() {
        for path in value.paths() {
            validate_one(key, path, sink);
        }
    }
}

fn validate_one(key: &str, path: &Path, sink: &mut dyn DiagnosticSink) {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => {
            sink.report(
                Diagnostic::error(format!("missing JSON resource for {key}")).with_path(path),
            );
            return;
        }
    };

    let parsed: Value = match serde_json::from_str(&content) {
        Ok(parsed) => parsed,
        Err(err) => {
            sink.report(
                Diagnostic::error(format!("invalid JSON resource for {key}: {err}"))
                    .with_path(path),
            );
            return;
        }
    };

    let shape_ok = if key.starts_with("declarative_net_request/") {
        parsed.is_array()
    } else if key == "storage/managed_schema" {
        parsed.is_object()
    } else {
        true
    };

    if !shape_ok {
        let expected = if key.starts_with("declarative_net_request/") {
            "an array of rules"
        } else {
            "a schema object"
        };
        sink.report(
            Diagnostic::error(format!("JSON resource for {key} must be {expected}"))
                .with_path(path),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticLog, Severity};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn group_with(key: &str, path: PathBuf) -> FieldGroup {
        let mut group = FieldGroup::default();
        group.insert_single(key, path);
        group
    }

    #[test]
    fn missing_ruleset_is_an_error() {
        let temp = tempdir().unwrap();
        let group = group_with(
            "declarative_net_request/ads",
            temp.path().join("rules/ads.json"),
        );

        let mut log = DiagnosticLog::default();
        validate_json_resources(&group, &mut log);

        assert_eq!(log.items().len(), 1);
        assert_eq!(log.items()[0].severity, Severity::Error);
    }

    #[test]
    fn ruleset_must_parse_to_an_array() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("rules.json");
        fs::write(&path, r#"{ "not": "an array" }"#).unwrap();
        let group = group_with("declarative_net_request/ads", path);

        let mut log = DiagnosticLog::default();
        validate_json_resources(&group, &mut log);
        assert!(log.has_errors());
    }

    #[test]
    fn managed_schema_must_parse_to_an_object() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("schema.json");
        fs::write(&path, "[]").unwrap();
        let group = group_with("storage/managed_schema", path);

        let mut log = DiagnosticLog::default();
        validate_json_resources(&group, &mut log);
        assert!(log.has_errors());
    }

    #[test]
    fn unparsable_resource_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("rules.json");
        fs::write(&path, "[ broken").unwrap();
        let group = group_with("declarative_net_request/ads", path);

        let mut log = DiagnosticLog::default();
        validate_json_resources(&group, &mut log);
        assert!(log.has_errors());
    }

    #[test]
    fn well_formed_resources_produce_no_diagnostics() {
        let temp = tempdir().unwrap();
        let rules = temp.path().join("rules.json");
        let schema = temp.path().join("schema.json");
        fs::write(&rules, "[]").unwrap();
        fs::write(&schema, "{}").unwrap();

        let mut group = FieldGroup::default();
        group.insert_single("declarative_net_request/ads", rules);
        group.insert_single("storage/managed_schema", schema);

        let mut log = DiagnosticLog::default();
        validate_json_resources(&group, &mut log);
        assert!(log.items().is_empty());
    }
}
