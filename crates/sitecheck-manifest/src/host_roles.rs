// crates/sitecheck-manifest/src/host_roles.rs
// ============================================================================
// Module: Host-Role Index
// Description: Host profile to role tag index built from baremetal nodes.
// Purpose: Drive the per-role fan-out of host-scoped mapping rules.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Baremetal node documents declare a host profile (`data.host_profile`) and
//! role tags (`data.metadata.tags`). The index records, per host profile, the
//! roles of every node using it.
//! Invariants:
//! - Host profiles and their roles keep first-appearance order.
//! - Duplicate roles for a host profile are suppressed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::diagnostics::DiagnosticEvent;
use crate::diagnostics::DiagnosticSink;
use crate::document::DocumentFile;

// ============================================================================
// SECTION: Index
// ============================================================================

/// Ordered mapping from host profile name to role tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostRoleIndex {
    /// Host profiles with their roles, in first-appearance order.
    entries: Vec<(String, Vec<String>)>,
}

impl HostRoleIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index from parsed baremetal node files.
    ///
    /// Fragments without a string `data.host_profile` are skipped.
    #[must_use]
    pub fn from_files(files: &[DocumentFile], diagnostics: &dyn DiagnosticSink) -> Self {
        let mut index = Self::new();
        for file in files {
            for fragment in &file.fragments {
                let data = fragment.get("data");
                let Some(host_profile) =
                    data.and_then(|data| data.get("host_profile")).and_then(Value::as_str)
                else {
                    diagnostics.record(&DiagnosticEvent::debug(
                        "documents.baremetal_skipped",
                        format!(
                            "skipping fragment without host_profile in {}",
                            file.path.display()
                        ),
                    ));
                    continue;
                };
                let tags = data
                    .and_then(|data| data.get("metadata"))
                    .and_then(|metadata| metadata.get("tags"))
                    .and_then(Value::as_array)
                    .map(|tags| tags.iter().filter_map(Value::as_str).collect::<Vec<_>>())
                    .unwrap_or_default();
                index.insert(host_profile, tags);
            }
        }
        index
    }

    /// Registers a host profile and appends any roles not yet present.
    pub fn insert<I, S>(&mut self, host_profile: &str, roles: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let position = match self.entries.iter().position(|(name, _)| name == host_profile) {
            Some(position) => position,
            None => {
                self.entries.push((host_profile.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        let assigned = &mut self.entries[position].1;
        for role in roles {
            let role = role.as_ref();
            if !assigned.iter().any(|existing| existing == role) {
                assigned.push(role.to_string());
            }
        }
    }

    /// Returns the roles for a host profile (empty when unknown).
    #[must_use]
    pub fn roles_for(&self, host_profile: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(name, _)| name == host_profile)
            .map(|(_, roles)| roles.as_slice())
            .unwrap_or_default()
    }

    /// Returns true when the host profile is known.
    #[must_use]
    pub fn contains(&self, host_profile: &str) -> bool {
        self.entries.iter().any(|(name, _)| name == host_profile)
    }

    /// Iterates host profiles with their roles in first-appearance order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(name, roles)| (name.as_str(), roles.as_slice()))
    }

    /// Returns the number of host profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no host profile is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use serde_json::json;

    use super::*;
    use crate::diagnostics::NoopDiagnostics;

    fn node(host_profile: &str, tags: &[&str]) -> Value {
        json!({
            "schema": "drydock/BaremetalNode/v1",
            "metadata": {"name": format!("node-{host_profile}")},
            "data": {"host_profile": host_profile, "metadata": {"tags": tags}},
        })
    }

    #[test]
    fn roles_accumulate_across_nodes_without_duplicates() {
        let files = vec![DocumentFile {
            path: PathBuf::from("nodes.yaml"),
            fragments: vec![
                node("cp", &["controller"]),
                node("dp", &["compute"]),
                node("cp", &["controller", "storage"]),
            ],
        }];
        let index = HostRoleIndex::from_files(&files, &NoopDiagnostics);
        assert_eq!(index.roles_for("cp"), ["controller", "storage"]);
        assert_eq!(index.roles_for("dp"), ["compute"]);
        let order: Vec<&str> = index.iter().map(|(name, _)| name).collect();
        assert_eq!(order, ["cp", "dp"]);
    }

    #[test]
    fn untagged_node_registers_empty_roles() {
        let files = vec![DocumentFile {
            path: PathBuf::from("nodes.yaml"),
            fragments: vec![json!({"data": {"host_profile": "bare"}})],
        }];
        let index = HostRoleIndex::from_files(&files, &NoopDiagnostics);
        assert!(index.contains("bare"));
        assert!(index.roles_for("bare").is_empty());
    }

    #[test]
    fn fragments_without_host_profile_are_skipped() {
        let files = vec![DocumentFile {
            path: PathBuf::from("nodes.yaml"),
            fragments: vec![json!({"schema": "deckhand/Certificate/v1", "data": "pem"})],
        }];
        let index = HostRoleIndex::from_files(&files, &NoopDiagnostics);
        assert!(index.is_empty());
        assert!(index.roles_for("anything").is_empty());
    }
}
