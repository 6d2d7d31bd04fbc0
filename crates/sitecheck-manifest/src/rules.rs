// crates/sitecheck-manifest/src/rules.rs
// ============================================================================
// Module: Mapping Rules
// Description: Per-domain static tables from semantic keys to manifest keys.
// Purpose: Load the five installer rule files that drive mapping generation.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Each profile domain ships one JSON rule file, a flat object from semantic
//! key to `{"manifest_key": "<field>"}`. A rule may also pin
//! `"manifest_context"`: an empty string marks the key as intentionally
//! unmapped, any other value names the document to search instead of the one
//! chosen by the domain's fan-out.
//! Invariants:
//! - Rule order follows the file's declaration order.
//! - A missing, malformed or empty rule file is fatal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::error::ManifestError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of a rule file, in bytes.
pub const MAX_RULE_FILE_BYTES: usize = 1024 * 1024;
/// Mapping context used by the hardware domain.
pub const GLOBAL_CONTEXT: &str = "global";

// ============================================================================
// SECTION: Domains
// ============================================================================

/// Profile domain a rule file belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProfileDomain {
    /// Hardware profiles, mapped once under the global context.
    Hardware,
    /// Platform settings of host profiles.
    Platform,
    /// Storage settings of host profiles.
    Storage,
    /// Physical networks, mapped under each network's name.
    Network,
    /// Descriptive information of host profiles.
    Info,
}

/// How a domain's rules are replicated into mapping entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanOut {
    /// One entry per rule under [`GLOBAL_CONTEXT`], per hardware document.
    Global,
    /// One entry per rule for every role of every host profile document.
    HostRoles,
    /// One entry per rule under each physical network's own name.
    NetworkName,
}

impl ProfileDomain {
    /// Domains in mapping generation order.
    pub const ALL: [Self; 5] =
        [Self::Hardware, Self::Platform, Self::Storage, Self::Network, Self::Info];

    /// Returns a stable label for the domain.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hardware => "hardware",
            Self::Platform => "platform",
            Self::Storage => "storage",
            Self::Network => "network",
            Self::Info => "info",
        }
    }

    /// Returns the rule file name for the domain.
    #[must_use]
    pub const fn rule_file_name(self) -> &'static str {
        match self {
            Self::Hardware => "hardware-mapping.json",
            Self::Platform => "platform-mapping.json",
            Self::Storage => "storage-mapping.json",
            Self::Network => "network-mapping.json",
            Self::Info => "info-mapping.json",
        }
    }

    /// Returns the fan-out policy for the domain.
    #[must_use]
    pub const fn fan_out(self) -> FanOut {
        match self {
            Self::Hardware => FanOut::Global,
            Self::Platform | Self::Storage | Self::Info => FanOut::HostRoles,
            Self::Network => FanOut::NetworkName,
        }
    }
}

impl fmt::Display for ProfileDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Rules
// ============================================================================

/// Single semantic key declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    /// Semantic key used by callers.
    pub key: String,
    /// Field name searched for inside the mapped document.
    pub manifest_key: String,
    /// Optional pinned document name; empty marks the key unmapped.
    pub manifest_context: Option<String>,
}

impl MappingRule {
    /// Creates a rule searched in the document chosen by fan-out.
    #[must_use]
    pub fn new(key: impl Into<String>, manifest_key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            manifest_key: manifest_key.into(),
            manifest_context: None,
        }
    }
}

/// Raw rule body as declared in a rule file.
#[derive(Debug, Deserialize)]
struct RuleSpec {
    /// Field name to search for.
    manifest_key: String,
    /// Optional pinned document name.
    #[serde(default)]
    manifest_context: Option<String>,
}

/// Rules declared for one domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRules {
    /// Owning domain.
    domain: ProfileDomain,
    /// Rules in declaration order.
    rules: Vec<MappingRule>,
}

impl MappingRules {
    /// Creates a rule table from prepared rules.
    #[must_use]
    pub const fn new(domain: ProfileDomain, rules: Vec<MappingRule>) -> Self {
        Self {
            domain,
            rules,
        }
    }

    /// Loads the domain's rule file from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when the file is missing, oversized, not
    /// UTF-8, malformed or declares no keys.
    pub fn load(domain: ProfileDomain, dir: &Path) -> Result<Self, ManifestError> {
        let path = dir.join(domain.rule_file_name());
        let read_error = |reason: String| ManifestError::RuleFileRead {
            path: path.clone(),
            reason,
        };
        let file = File::open(&path).map_err(|err| read_error(err.to_string()))?;
        let limit = u64::try_from(MAX_RULE_FILE_BYTES.saturating_add(1))
            .map_err(|_| read_error("size limit exceeds u64".to_string()))?;
        let mut buf = Vec::new();
        file.take(limit).read_to_end(&mut buf).map_err(|err| read_error(err.to_string()))?;
        if buf.len() > MAX_RULE_FILE_BYTES {
            return Err(read_error("rule file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&buf)
            .map_err(|_| read_error("rule file must be utf-8".to_string()))?;
        Self::parse(domain, &path, content)
    }

    /// Parses rule file content; `path` is used for error reporting only.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::RuleFileInvalid`] when the content is not a
    /// non-empty object of rule bodies.
    pub fn parse(domain: ProfileDomain, path: &Path, content: &str) -> Result<Self, ManifestError> {
        let invalid = |reason: String| ManifestError::RuleFileInvalid {
            path: path.to_path_buf(),
            reason,
        };
        let raw: Map<String, Value> =
            serde_json::from_str(content).map_err(|err| invalid(err.to_string()))?;
        if raw.is_empty() {
            return Err(invalid("rule file declares no keys".to_string()));
        }
        let mut rules = Vec::with_capacity(raw.len());
        for (key, body) in raw {
            let spec: RuleSpec =
                serde_json::from_value(body).map_err(|err| invalid(format!("rule {key}: {err}")))?;
            rules.push(MappingRule {
                key,
                manifest_key: spec.manifest_key,
                manifest_context: spec.manifest_context,
            });
        }
        Ok(Self::new(domain, rules))
    }

    /// Returns the owning domain.
    #[must_use]
    pub const fn domain(&self) -> ProfileDomain {
        self.domain
    }

    /// Returns the rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when no rule is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Rule tables for every domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingRuleSet {
    /// Rule tables keyed by domain.
    rules: BTreeMap<ProfileDomain, MappingRules>,
}

impl MappingRuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads all five rule files from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] when any rule file fails to load.
    pub fn load(dir: &Path) -> Result<Self, ManifestError> {
        let mut set = Self::new();
        for domain in ProfileDomain::ALL {
            set.insert(MappingRules::load(domain, dir)?);
        }
        Ok(set)
    }

    /// Adds or replaces a domain's rule table.
    pub fn insert(&mut self, rules: MappingRules) {
        self.rules.insert(rules.domain(), rules);
    }

    /// Returns the rule table for a domain.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::MissingRules`] when the domain has no table.
    pub fn get(&self, domain: ProfileDomain) -> Result<&MappingRules, ManifestError> {
        self.rules.get(&domain).ok_or(ManifestError::MissingRules {
            domain,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
