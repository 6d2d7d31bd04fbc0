// crates/sitecheck-manifest/src/engine.rs
// ============================================================================
// Module: Resolution Engine
// Description: Value resolver over the document store and mapping table.
// Purpose: Answer (role, profile, key) queries with memoized manifest values.
// Dependencies: crate::{document, mapping, rules, search, validation}
// ============================================================================

//! ## Overview
//! [`ResolutionEngine`] owns the documents, the mapping table and a
//! resolution cache. Construction loads everything up front and fails closed;
//! [`ResolutionEngine::find_val`] never fails and memoizes every outcome,
//! including empty ones, under `role-profile-key`.
//! Invariants:
//! - Documents and the mapping table are read-only after construction.
//! - Cache entries are never invalidated.
//! - A cache hit performs no mapping lookup and no document search.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::diagnostics::DiagnosticEvent;
use crate::diagnostics::DiagnosticSink;
use crate::document::DocumentStore;
use crate::document::ReadOptions;
use crate::document::load_manifests;
use crate::error::ManifestError;
use crate::mapping::CollisionPolicy;
use crate::mapping::MappingTable;
use crate::mapping::ResolvedMappingEntry;
use crate::mapping::generate_mapping;
use crate::mapping::mapping_key;
use crate::rules::MappingRuleSet;
use crate::search::SearchMode;
use crate::search::search_fragments;
use crate::validation::ExpectationSet;
use crate::validation::ValidationReport;

// ============================================================================
// SECTION: Layout and Options
// ============================================================================

/// Locations of the profile directories inside an installer tree.
///
/// # Invariants
/// - Sub-directories are joined onto `root`; absolute values replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerLayout {
    /// Installer site root.
    pub root: PathBuf,
    /// Baremetal node documents.
    pub baremetal_dir: PathBuf,
    /// Hardware profile documents.
    pub hardware_dir: PathBuf,
    /// Host profile documents.
    pub host_dir: PathBuf,
    /// Physical network documents.
    pub network_dir: PathBuf,
}

impl InstallerLayout {
    /// Creates a layout with the conventional sub-directories.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            baremetal_dir: PathBuf::from("baremetal"),
            hardware_dir: Path::new("profiles").join("hardware"),
            host_dir: Path::new("profiles").join("host"),
            network_dir: Path::new("networks").join("physical"),
        }
    }

    /// Returns the baremetal directory path.
    #[must_use]
    pub fn baremetal_path(&self) -> PathBuf {
        self.root.join(&self.baremetal_dir)
    }

    /// Returns the hardware profile directory path.
    #[must_use]
    pub fn hardware_path(&self) -> PathBuf {
        self.root.join(&self.hardware_dir)
    }

    /// Returns the host profile directory path.
    #[must_use]
    pub fn host_path(&self) -> PathBuf {
        self.root.join(&self.host_dir)
    }

    /// Returns the physical network directory path.
    #[must_use]
    pub fn network_path(&self) -> PathBuf {
        self.root.join(&self.network_dir)
    }
}

/// Tunables for engine construction and search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    /// File reading options.
    pub read: ReadOptions,
    /// Recursive search policy.
    pub search_mode: SearchMode,
    /// Mapping collision policy.
    pub collisions: CollisionPolicy,
}

// ============================================================================
// SECTION: Statistics
// ============================================================================

/// Snapshot of resolver counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionStats {
    /// Queries answered from the cache.
    pub cache_hits: u64,
    /// Queries that missed the cache.
    pub cache_misses: u64,
    /// Document searches performed.
    pub searches: u64,
}

/// Live resolver counters.
#[derive(Debug, Default)]
struct StatsCounters {
    /// Cache hit counter.
    cache_hits: AtomicU64,
    /// Cache miss counter.
    cache_misses: AtomicU64,
    /// Document search counter.
    searches: AtomicU64,
}

impl StatsCounters {
    /// Returns a snapshot of the counters.
    fn snapshot(&self) -> ResolutionStats {
        ResolutionStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            searches: self.searches.load(Ordering::Relaxed),
        }
    }
}

/// Builds the resolution cache key for a query.
#[must_use]
pub fn cache_key(role: &str, profile: &str, key: &str) -> String {
    format!("{role}-{profile}-{key}")
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Manifest resolution engine.
pub struct ResolutionEngine {
    /// Indexed profile documents.
    documents: DocumentStore,
    /// Mapping from composite keys to manifest locations.
    mapping: MappingTable,
    /// Memoized query results keyed by `role-profile-key`.
    cache: Mutex<BTreeMap<String, Vec<String>>>,
    /// Recursive search policy.
    search_mode: SearchMode,
    /// Resolver counters.
    stats: StatsCounters,
    /// Diagnostic sink.
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl ResolutionEngine {
    /// Loads an installer tree and rule directory and generates the mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when any rule file or required document
    /// directory is missing, unreadable or empty, or mapping generation fails.
    pub fn load(
        layout: &InstallerLayout,
        mapping_dir: &Path,
        options: &EngineOptions,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, ManifestError> {
        let rules = MappingRuleSet::load(mapping_dir)?;
        Self::load_with_rules(layout, &rules, options, diagnostics)
    }

    /// Loads an installer tree with prepared rule tables.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when a required document directory is
    /// missing, unreadable or empty, or mapping generation fails.
    pub fn load_with_rules(
        layout: &InstallerLayout,
        rules: &MappingRuleSet,
        options: &EngineOptions,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, ManifestError> {
        let manifests = load_manifests(layout, &options.read, diagnostics.as_ref())?;
        let mapping =
            generate_mapping(rules, &manifests, options.collisions, diagnostics.as_ref())?;
        Ok(Self::from_parts(manifests.store, mapping, options.search_mode, diagnostics))
    }

    /// Assembles an engine from prepared parts.
    #[must_use]
    pub fn from_parts(
        documents: DocumentStore,
        mapping: MappingTable,
        search_mode: SearchMode,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Self {
        Self {
            documents,
            mapping,
            cache: Mutex::new(BTreeMap::new()),
            search_mode,
            stats: StatsCounters::default(),
            diagnostics,
        }
    }

    /// Resolves a query into the values found in the mapped document.
    ///
    /// The mapping is looked up as `role-profile-key` first, then as
    /// `role-key` when `profile` names the domain whose rule produced that
    /// entry. Missing mappings, unmapped keys and empty searches all yield an
    /// empty list, which is cached like any other result.
    ///
    /// Non-string values use their JSON spelling, so booleans read `true` /
    /// `false` and null reads `null` rather than `True` / `None`.
    pub fn find_val(&self, role: &str, profile: &str, key: &str) -> Vec<String> {
        let cache_key = cache_key(role, profile, key);
        if let Some(values) = self.cached(&cache_key) {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return values;
        }
        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        self.diagnostics.record(&DiagnosticEvent::debug(
            "resolve.cache_miss",
            format!("key {cache_key} not cached, searching manifests"),
        ));
        let values = self.resolve(&cache_key, role, profile, key);
        self.store(cache_key, values)
    }

    /// Returns the cached values for a `role-profile-key` cache key.
    #[must_use]
    pub fn cached(&self, cache_key: &str) -> Option<Vec<String>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).get(cache_key).cloned()
    }

    /// Resolves an uncached query.
    fn resolve(&self, cache_key: &str, role: &str, profile: &str, key: &str) -> Vec<String> {
        let Some(entry) = self.lookup(cache_key, role, profile, key) else {
            self.diagnostics.record(&DiagnosticEvent::error(
                "resolve.mapping_missing",
                format!("could not find corresponding mapping for key {cache_key}"),
            ));
            return Vec::new();
        };
        if entry.is_unmapped() {
            self.diagnostics.record(&DiagnosticEvent::debug(
                "resolve.unmapped",
                format!("key {cache_key} is intentionally unmapped"),
            ));
            return Vec::new();
        }
        let Some(document) = self.documents.get(&entry.manifest_context) else {
            self.diagnostics.record(&DiagnosticEvent::error(
                "resolve.document_missing",
                format!(
                    "mapping for key {cache_key} names unknown document {}",
                    entry.manifest_context
                ),
            ));
            return Vec::new();
        };
        self.stats.searches.fetch_add(1, Ordering::Relaxed);
        let values = search_fragments(&entry.manifest_key, document.fragments(), self.search_mode);
        if values.is_empty() {
            self.diagnostics.record(&DiagnosticEvent::debug(
                "resolve.empty",
                format!(
                    "found nothing for manifest_context {} and manifest_key {} and key {cache_key}",
                    entry.manifest_context, entry.manifest_key
                ),
            ));
        }
        values
    }

    /// Looks up the mapping entry for a query.
    ///
    /// A `role-key` entry only answers queries for its own domain.
    fn lookup(
        &self,
        cache_key: &str,
        role: &str,
        profile: &str,
        key: &str,
    ) -> Option<&ResolvedMappingEntry> {
        if let Some(entry) = self.mapping.get(cache_key) {
            return Some(entry);
        }
        let scoped = mapping_key(role, key);
        let domain = self.mapping.domain(&scoped)?;
        if domain.as_str() != profile {
            return None;
        }
        self.mapping.get(&scoped)
    }

    /// Caches a result; an entry stored concurrently by another caller wins.
    fn store(&self, cache_key: String, values: Vec<String>) -> Vec<String> {
        let mut guard = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        guard.entry(cache_key).or_insert(values).clone()
    }

    /// Resolves every expectation and tallies the comparisons.
    #[must_use]
    pub fn check(&self, expectations: &ExpectationSet) -> ValidationReport {
        let mut report = ValidationReport::default();
        for expectation in &expectations.expectations {
            let values = self.find_val(&expectation.role, &expectation.profile, &expectation.key);
            report.record(expectation, values);
        }
        self.diagnostics.record(&DiagnosticEvent::info(
            "check.completed",
            format!(
                "validation complete: correct {} wrong {} total {}",
                report.correct, report.wrong, report.total
            ),
        ));
        report
    }

    /// Returns a snapshot of the resolver counters.
    #[must_use]
    pub fn stats(&self) -> ResolutionStats {
        self.stats.snapshot()
    }

    /// Returns the mapping table.
    #[must_use]
    pub const fn mapping(&self) -> &MappingTable {
        &self.mapping
    }

    /// Iterates mapping entries in key order.
    pub fn mapping_entries(&self) -> impl Iterator<Item = (&str, &ResolvedMappingEntry)> {
        self.mapping.iter()
    }

    /// Returns the mapping entry for a composite key.
    #[must_use]
    pub fn mapping_entry(&self, key: &str) -> Option<&ResolvedMappingEntry> {
        self.mapping.get(key)
    }

    /// Returns the document store.
    #[must_use]
    pub const fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Returns the search policy.
    #[must_use]
    pub const fn search_mode(&self) -> SearchMode {
        self.search_mode
    }
}
