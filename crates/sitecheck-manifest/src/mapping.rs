// crates/sitecheck-manifest/src/mapping.rs
// ============================================================================
// Module: Mapping Generator
// Description: Runtime table from "{context}-{key}" to manifest locations.
// Purpose: Fan rule tables out across hardware, host roles and networks.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The mapping table is built once from the five rule tables, the loaded
//! documents and the host-role index:
//! - hardware rules map under `global`, once per hardware document;
//! - platform, storage and info rules map under every role of every host
//!   profile document;
//! - network rules map under each physical network's own name.
//!
//! Later entries for an existing key overwrite earlier ones unless the
//! [`CollisionPolicy::Reject`] policy is selected.
//! Invariants:
//! - Every non-empty `manifest_context` names a document in the store.
//! - A host profile that carries roles must have a host profile document.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::diagnostics::DiagnosticEvent;
use crate::diagnostics::DiagnosticSink;
use crate::document::DocumentStore;
use crate::document::LoadedManifests;
use crate::error::ManifestError;
use crate::rules::FanOut;
use crate::rules::GLOBAL_CONTEXT;
use crate::rules::MappingRuleSet;
use crate::rules::MappingRules;
use crate::rules::ProfileDomain;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Where a semantic key resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMappingEntry {
    /// Field name to search for.
    pub manifest_key: String,
    /// Document to search; empty marks the key intentionally unmapped.
    pub manifest_context: String,
}

impl ResolvedMappingEntry {
    /// Creates a mapping entry.
    #[must_use]
    pub fn new(manifest_key: impl Into<String>, manifest_context: impl Into<String>) -> Self {
        Self {
            manifest_key: manifest_key.into(),
            manifest_context: manifest_context.into(),
        }
    }

    /// Returns true when the entry is an explicit "no document" marker.
    #[must_use]
    pub fn is_unmapped(&self) -> bool {
        self.manifest_context.is_empty()
    }
}

/// Treatment of a second, different entry for an existing key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The later entry wins.
    #[default]
    Overwrite,
    /// Construction fails on the first conflicting entry.
    Reject,
}

/// Builds the composite mapping key for a context and semantic key.
#[must_use]
pub fn mapping_key(context: &str, key: &str) -> String {
    format!("{context}-{key}")
}

/// Immutable mapping table produced by [`generate_mapping`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTable {
    /// Entries keyed by composite mapping key.
    entries: BTreeMap<String, ResolvedMappingEntry>,
    /// Domain whose rule produced each entry.
    domains: BTreeMap<String, ProfileDomain>,
    /// Number of conflicting overwrites performed while building.
    collisions: usize,
}

impl MappingTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry produced by a rule of `domain` under the policy.
    ///
    /// Re-inserting an identical entry from the same domain is not a
    /// collision.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::MappingCollision`] when the policy rejects a
    /// conflicting entry.
    pub fn insert(
        &mut self,
        domain: ProfileDomain,
        key: String,
        entry: ResolvedMappingEntry,
        policy: CollisionPolicy,
    ) -> Result<(), ManifestError> {
        if let Some(existing) = self.entries.get(&key) {
            if *existing == entry && self.domains.get(&key) == Some(&domain) {
                return Ok(());
            }
            if policy == CollisionPolicy::Reject {
                return Err(ManifestError::MappingCollision {
                    key,
                    existing: describe(existing),
                    incoming: describe(&entry),
                });
            }
            self.collisions += 1;
        }
        self.domains.insert(key.clone(), domain);
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Returns the entry for a composite key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ResolvedMappingEntry> {
        self.entries.get(key)
    }

    /// Returns the domain whose rule produced the entry for a composite key.
    #[must_use]
    pub fn domain(&self, key: &str) -> Option<ProfileDomain> {
        self.domains.get(key).copied()
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedMappingEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }

    /// Returns the number of conflicting overwrites.
    #[must_use]
    pub const fn collisions(&self) -> usize {
        self.collisions
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Formats an entry for collision messages.
fn describe(entry: &ResolvedMappingEntry) -> String {
    format!("{}:{}", entry.manifest_context, entry.manifest_key)
}

// ============================================================================
// SECTION: Generation
// ============================================================================

/// Builds the mapping table for every domain.
///
/// # Errors
///
/// Returns [`ManifestError`] when a domain has no rules, a role-bearing host
/// profile has no document, a pinned context names an unknown document, or
/// a collision is rejected.
pub fn generate_mapping(
    rules: &MappingRuleSet,
    manifests: &LoadedManifests,
    policy: CollisionPolicy,
    diagnostics: &dyn DiagnosticSink,
) -> Result<MappingTable, ManifestError> {
    for (host_profile, roles) in manifests.host_roles.iter() {
        if !roles.is_empty() && !manifests.host_profiles.iter().any(|name| name == host_profile) {
            return Err(ManifestError::MissingHostProfileDocument {
                host_profile: host_profile.to_string(),
            });
        }
    }

    let mut table = MappingTable::new();
    for domain in ProfileDomain::ALL {
        let domain_rules = rules.get(domain)?;
        let before = table.len();
        match domain.fan_out() {
            FanOut::Global => {
                for document in &manifests.hardware {
                    insert_rules(
                        &mut table,
                        domain_rules,
                        GLOBAL_CONTEXT,
                        document,
                        &manifests.store,
                        policy,
                    )?;
                }
            }
            FanOut::HostRoles => {
                for document in &manifests.host_profiles {
                    for role in manifests.host_roles.roles_for(document) {
                        insert_rules(
                            &mut table,
                            domain_rules,
                            role,
                            document,
                            &manifests.store,
                            policy,
                        )?;
                    }
                }
            }
            FanOut::NetworkName => {
                for network in &manifests.networks {
                    insert_rules(
                        &mut table,
                        domain_rules,
                        network,
                        network,
                        &manifests.store,
                        policy,
                    )?;
                }
            }
        }
        diagnostics.record(&DiagnosticEvent::debug(
            "mapping.domain",
            format!("{domain} rules added {} mapping keys", table.len() - before),
        ));
    }

    if table.collisions() > 0 {
        diagnostics.record(&DiagnosticEvent::info(
            "mapping.collision",
            format!("{} mapping entries were overwritten by later rules", table.collisions()),
        ));
    }
    diagnostics.record(&DiagnosticEvent::info(
        "mapping.generated",
        format!("generated {} mapping entries", table.len()),
    ));
    Ok(table)
}

/// Inserts one domain's rules under a context, pointing at a document.
fn insert_rules(
    table: &mut MappingTable,
    rules: &MappingRules,
    context: &str,
    document: &str,
    store: &DocumentStore,
    policy: CollisionPolicy,
) -> Result<(), ManifestError> {
    for rule in rules.rules() {
        let manifest_context = match rule.manifest_context.as_deref() {
            None => document,
            Some("") => "",
            Some(pinned) => {
                if !store.contains(pinned) {
                    return Err(ManifestError::UnknownDocument {
                        key: rule.key.clone(),
                        document: pinned.to_string(),
                    });
                }
                pinned
            }
        };
        table.insert(
            rules.domain(),
            mapping_key(context, &rule.key),
            ResolvedMappingEntry::new(rule.manifest_key.clone(), manifest_context),
            policy,
        )?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
