//! Detection of manifest edits that invalidate the current entry set.

use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::Diagnostic;
use crate::models::ResolvedFieldMap;

/// The first differing entrypoint between two observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrypointChange {
    /// Logical field key that changed.
    pub key: String,
    /// Previous flattened value, or `"undefined"`.
    pub before: String,
    /// New flattened value, or `"undefined"`.
    pub after: String,
}

/// Watches successive field resolutions for restart-required differences.
///
/// The underlying build cannot add or remove top-level entries incrementally,
/// so a changed entry set must stop the session rather than continue against
/// a stale or broken package. The guard starts uninitialized, arms itself on
/// the first observation without raising anything, and from then on flags any
/// difference against its one-cycle-stale snapshot. Callers invoke
/// [`observe`](Self::observe) only on cycles where the manifest file itself
/// changed.
#[derive(Debug, Default)]
pub struct EntrypointChangeGuard {
    snapshot: Option<BTreeMap<String, String>>,
    pending: Option<EntrypointChange>,
}

impl EntrypointChangeGuard {
    /// Create an uninitialized guard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare a fresh resolution against the snapshot and advance it.
    ///
    /// The first observation never raises a diagnostic. On later observations
    /// any difference is recorded as pending; the snapshot advances to the new
    /// values either way, so one edit is reported exactly once.
    pub fn observe(&mut self, fields: &ResolvedFieldMap) {
        let current = flatten_entrypoints(fields);

        if let Some(previous) = &self.snapshot {
            if let Some(change) = first_difference(previous, &current) {
                log::debug!(
                    "entrypoint {} changed from {} to {}",
                    change.key,
                    change.before,
                    change.after
                );
                self.pending = Some(change);
            }
        }

        self.snapshot = Some(current);
    }

    /// The difference waiting to be reported, if any.
    pub fn pending_change(&self) -> Option<&EntrypointChange> {
        self.pending.as_ref()
    }

    /// Drain the pending difference into a build error, re-arming the guard.
    pub fn take_error(&mut self) -> Option<Diagnostic> {
        self.pending.take().map(|change| {
            Diagnostic::error(format!(
                "Entrypoint references changed: {} was {} and is now {}; \
                 the session must be restarted",
                change.key, change.before, change.after
            ))
        })
    }
}

/// Flatten the entry-set groups into sorted, stringified form.
///
/// Only the html and scripts groups form the entry set; icons, JSON resources
/// and locales can change without forcing a restart.
fn flatten_entrypoints(fields: &ResolvedFieldMap) -> BTreeMap<String, String> {
    let mut flattened = BTreeMap::new();
    for (prefix, group) in [("html", &fields.html), ("scripts", &fields.scripts)] {
        for (key, value) in group.iter() {
            flattened.insert(format!("{prefix}/{key}"), value.flattened().join(","));
        }
    }
    flattened
}

fn first_difference(
    previous: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
) -> Option<EntrypointChange> {
    let keys: BTreeSet<&String> = previous.keys().chain(current.keys()).collect();

    for key in keys {
        let before = previous.get(key);
        let after = current.get(key);
        if before != after {
            return Some(EntrypointChange {
                key: key.clone(),
                before: stringify(before),
                after: stringify(after),
            });
        }
    }
    None
}

fn stringify(value: Option<&String>) -> String {
    match value {
        Some(value) => value.clone(),
        None => "undefined".to_string(),
    }
}
