// crates/sitecheck-manifest/src/error.rs
// ============================================================================
// Module: Manifest Errors
// Description: Construction-time failures for the manifest resolution engine.
// Purpose: Report fatal input problems with the offending path or rule file.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every variant here is fatal and surfaces while building a
//! [`crate::ResolutionEngine`] or loading an expectation file. Query-time
//! outcomes are never errors; they are empty result lists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

use crate::rules::ProfileDomain;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading installer manifests or mapping rules.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
/// - Path-bearing variants name the file or directory that failed.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A required installer directory is absent.
    #[error("required directory does not exist: {}", path.display())]
    MissingDirectory {
        /// Directory that was expected.
        path: PathBuf,
    },
    /// A document file or directory listing could not be read.
    #[error("failed to read document {}: {reason}", path.display())]
    DocumentRead {
        /// File or directory that failed.
        path: PathBuf,
        /// Underlying failure description.
        reason: String,
    },
    /// A document file is not valid YAML.
    #[error("failed to parse document {}: {reason}", path.display())]
    DocumentParse {
        /// File that failed to parse.
        path: PathBuf,
        /// Parser failure description.
        reason: String,
    },
    /// A required directory holds no parseable documents.
    #[error("no documents found in {}", path.display())]
    NoDocumentsFound {
        /// Directory that was scanned.
        path: PathBuf,
    },
    /// A document fragment lacks a string `metadata.name`.
    #[error("document in {} is missing metadata.name", path.display())]
    MissingDocumentName {
        /// File holding the unnamed fragment.
        path: PathBuf,
    },
    /// A mapping rule file could not be read.
    #[error("failed to read mapping rule file {}: {reason}", path.display())]
    RuleFileRead {
        /// Rule file path.
        path: PathBuf,
        /// Underlying failure description.
        reason: String,
    },
    /// A mapping rule file is malformed or empty.
    #[error("invalid mapping rule file {}: {reason}", path.display())]
    RuleFileInvalid {
        /// Rule file path.
        path: PathBuf,
        /// Validation failure description.
        reason: String,
    },
    /// No rules were supplied for a domain.
    #[error("missing mapping rules for {domain} domain")]
    MissingRules {
        /// Domain without rules.
        domain: ProfileDomain,
    },
    /// A role-bearing host profile has no host profile document.
    #[error("host profile {host_profile} is assigned roles but has no host profile document")]
    MissingHostProfileDocument {
        /// Host profile named by baremetal nodes.
        host_profile: String,
    },
    /// A mapping rule names a document that was never loaded.
    #[error("mapping rule {key} references unknown document {document}")]
    UnknownDocument {
        /// Semantic rule key.
        key: String,
        /// Document name referenced by the rule.
        document: String,
    },
    /// Two mapping entries disagree for the same key under the reject policy.
    #[error("mapping key {key} maps to both {existing} and {incoming}")]
    MappingCollision {
        /// Composite mapping key.
        key: String,
        /// Entry already in the table.
        existing: String,
        /// Entry that attempted to replace it.
        incoming: String,
    },
    /// An expectation file could not be read or parsed.
    #[error("invalid expectation file {}: {reason}", path.display())]
    ExpectationFile {
        /// Expectation file path.
        path: PathBuf,
        /// Failure description.
        reason: String,
    },
}
