// crates/sitecheck-manifest/src/lib.rs
// ============================================================================
// Module: sitecheck Manifest Library
// Description: Manifest resolution engine for installer profile documents.
// Purpose: Resolve (role, profile, key) queries into literal manifest values.
// Dependencies: serde, serde_json, serde_yaml, thiserror
// ============================================================================

//! ## Overview
//! `sitecheck-manifest` ingests the multi-document YAML profiles an installer
//! produces (hardware, host, physical network and baremetal node documents),
//! generates a role-aware mapping from semantic keys to document fields, and
//! resolves `(role, profile, key)` queries into the stringified values found
//! by searching the mapped document.
//! Invariants:
//! - Construction fails closed: missing directories, empty document sets and
//!   unreadable rule files abort [`ResolutionEngine::load`].
//! - Queries never fail: absent mappings and empty searches yield an empty list.
//! - Documents and the mapping table are immutable after construction; only the
//!   resolution cache grows.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod error;
pub mod host_roles;
pub mod mapping;
pub mod rules;
pub mod search;
pub mod validation;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use diagnostics::DiagnosticEvent;
pub use diagnostics::DiagnosticLevel;
pub use diagnostics::DiagnosticSink;
pub use diagnostics::JsonLinesDiagnostics;
pub use diagnostics::NoopDiagnostics;
pub use document::DocumentFile;
pub use document::DocumentStore;
pub use document::InsertPolicy;
pub use document::LoadedManifests;
pub use document::ProfileDocument;
pub use document::ReadOptions;
pub use document::load_manifests;
pub use document::read_documents;
pub use engine::EngineOptions;
pub use engine::InstallerLayout;
pub use engine::ResolutionEngine;
pub use engine::ResolutionStats;
pub use engine::cache_key;
pub use error::ManifestError;
pub use host_roles::HostRoleIndex;
pub use mapping::CollisionPolicy;
pub use mapping::MappingTable;
pub use mapping::ResolvedMappingEntry;
pub use mapping::generate_mapping;
pub use mapping::mapping_key;
pub use rules::FanOut;
pub use rules::MappingRule;
pub use rules::MappingRuleSet;
pub use rules::MappingRules;
pub use rules::ProfileDomain;
pub use search::SearchMode;
pub use search::search_fragments;
pub use search::stringify_value;
pub use validation::ComparisonOutcome;
pub use validation::ComparisonRecord;
pub use validation::Expectation;
pub use validation::ExpectationSet;
pub use validation::ValidationReport;
pub use validation::compare;
