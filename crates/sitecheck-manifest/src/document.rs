// crates/sitecheck-manifest/src/document.rs
// ============================================================================
// Module: Profile Document Store
// Description: Loading and indexing of installer profile documents.
// Purpose: Map document names to the YAML fragments that define them.
// Dependencies: serde, serde_json, serde_yaml
// ============================================================================

//! ## Overview
//! Installer directories hold YAML files, each a stream of one or more
//! documents ("fragments"). This module reads those files with size limits,
//! parses every fragment into an order-preserving [`serde_json::Value`], and
//! indexes them by `metadata.name` in a [`DocumentStore`].
//! Invariants:
//! - Files are read in lexicographic name order so indexing is deterministic.
//! - Null fragments (empty YAML documents) are dropped at parse time.
//! - A required directory that is absent or yields no fragments is fatal.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde_json::Value;

use crate::diagnostics::DiagnosticEvent;
use crate::diagnostics::DiagnosticSink;
use crate::engine::InstallerLayout;
use crate::error::ManifestError;
use crate::host_roles::HostRoleIndex;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum size of a single profile file, in bytes.
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 4 * 1024 * 1024;
/// Default recognized profile file extension.
pub const DEFAULT_DOCUMENT_EXTENSION: &str = "yaml";

// ============================================================================
// SECTION: Read Options
// ============================================================================

/// Options controlling how profile directories are read.
///
/// # Invariants
/// - `extensions` are compared case-insensitively and without a leading dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// File extensions recognized as profile documents.
    pub extensions: Vec<String>,
    /// Maximum bytes accepted for a single file.
    pub max_file_bytes: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            extensions: vec![DEFAULT_DOCUMENT_EXTENSION.to_string()],
            max_file_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}

impl ReadOptions {
    /// Returns true when the path carries a recognized extension.
    fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(ext))
    }
}

// ============================================================================
// SECTION: Document Files
// ============================================================================

/// Parsed contents of one profile file.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentFile {
    /// Source path, used in error messages.
    pub path: PathBuf,
    /// Non-null fragments in stream order.
    pub fragments: Vec<Value>,
}

impl DocumentFile {
    /// Returns the `metadata.name` of the first fragment.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::MissingDocumentName`] when the first fragment
    /// has no string name.
    pub fn owner_name(&self) -> Result<&str, ManifestError> {
        self.fragments.first().and_then(fragment_name).ok_or_else(|| {
            ManifestError::MissingDocumentName {
                path: self.path.clone(),
            }
        })
    }
}

/// Returns the `metadata.name` of a fragment, when present.
#[must_use]
pub fn fragment_name(fragment: &Value) -> Option<&str> {
    fragment.get("metadata")?.get("name")?.as_str()
}

/// Reads and parses every recognized profile file in `dir`.
///
/// # Errors
///
/// Returns [`ManifestError`] when the directory is absent, a file cannot be
/// read or parsed, or no file yields a fragment.
pub fn read_documents(
    dir: &Path,
    options: &ReadOptions,
) -> Result<Vec<DocumentFile>, ManifestError> {
    if !dir.is_dir() {
        return Err(ManifestError::MissingDirectory {
            path: dir.to_path_buf(),
        });
    }
    let listing = fs::read_dir(dir).map_err(|err| ManifestError::DocumentRead {
        path: dir.to_path_buf(),
        reason: err.to_string(),
    })?;
    let mut paths = Vec::new();
    for entry in listing {
        let entry = entry.map_err(|err| ManifestError::DocumentRead {
            path: dir.to_path_buf(),
            reason: err.to_string(),
        })?;
        let path = entry.path();
        if path.is_file() && options.accepts(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = read_file_limited(&path, options.max_file_bytes)?;
        let fragments = parse_fragments(&path, &content)?;
        if fragments.is_empty() {
            continue;
        }
        files.push(DocumentFile {
            path,
            fragments,
        });
    }
    if files.is_empty() {
        return Err(ManifestError::NoDocumentsFound {
            path: dir.to_path_buf(),
        });
    }
    Ok(files)
}

/// Reads a UTF-8 file while enforcing a maximum byte limit.
fn read_file_limited(path: &Path, max_bytes: usize) -> Result<String, ManifestError> {
    let read_error = |reason: String| ManifestError::DocumentRead {
        path: path.to_path_buf(),
        reason,
    };
    let file = File::open(path).map_err(|err| read_error(err.to_string()))?;
    let limit = u64::try_from(max_bytes.saturating_add(1))
        .map_err(|_| read_error("size limit exceeds u64".to_string()))?;
    let mut buf = Vec::new();
    file.take(limit).read_to_end(&mut buf).map_err(|err| read_error(err.to_string()))?;
    if buf.len() > max_bytes {
        return Err(read_error("file exceeds size limit".to_string()));
    }
    String::from_utf8(buf).map_err(|_| read_error("file must be utf-8".to_string()))
}

/// Parses a multi-document YAML stream, dropping null fragments.
fn parse_fragments(path: &Path, content: &str) -> Result<Vec<Value>, ManifestError> {
    let mut fragments = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document).map_err(|err| ManifestError::DocumentParse {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        if !value.is_null() {
            fragments.push(value);
        }
    }
    Ok(fragments)
}

// ============================================================================
// SECTION: Document Store
// ============================================================================

/// Named, ordered list of fragments.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileDocument {
    /// Document name (`metadata.name`).
    name: String,
    /// Fragments contributed under this name.
    fragments: Vec<Value>,
}

impl ProfileDocument {
    /// Creates a document from its fragments.
    #[must_use]
    pub fn new(name: impl Into<String>, fragments: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            fragments,
        }
    }

    /// Returns the document name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fragments in insertion order.
    #[must_use]
    pub fn fragments(&self) -> &[Value] {
        &self.fragments
    }
}

/// How a whole-file insert treats an existing document of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPolicy {
    /// The incoming file replaces the existing document.
    Replace,
    /// The existing document is kept and the incoming file ignored.
    KeepExisting,
}

/// Documents indexed by name across all profile domains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentStore {
    /// Documents keyed by `metadata.name`.
    documents: BTreeMap<String, ProfileDocument>,
}

impl DocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a whole file under its first fragment's name.
    ///
    /// Returns the document name the file was indexed under.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::MissingDocumentName`] when the file has no
    /// owner name.
    pub fn insert_file(
        &mut self,
        file: DocumentFile,
        policy: InsertPolicy,
    ) -> Result<String, ManifestError> {
        let name = file.owner_name()?.to_string();
        if policy == InsertPolicy::KeepExisting && self.documents.contains_key(&name) {
            return Ok(name);
        }
        self.documents.insert(name.clone(), ProfileDocument::new(name.clone(), file.fragments));
        Ok(name)
    }

    /// Appends each fragment to the document named by its own `metadata.name`.
    ///
    /// Returns the fragment names in stream order.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::MissingDocumentName`] when a fragment is
    /// unnamed.
    pub fn append_fragments(&mut self, file: DocumentFile) -> Result<Vec<String>, ManifestError> {
        let mut names = Vec::with_capacity(file.fragments.len());
        for fragment in file.fragments {
            let name = fragment_name(&fragment)
                .ok_or_else(|| ManifestError::MissingDocumentName {
                    path: file.path.clone(),
                })?
                .to_string();
            self.documents
                .entry(name.clone())
                .or_insert_with(|| ProfileDocument::new(name.clone(), Vec::new()))
                .fragments
                .push(fragment);
            names.push(name);
        }
        Ok(names)
    }

    /// Returns the document with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ProfileDocument> {
        self.documents.get(name)
    }

    /// Returns true when a document with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.documents.contains_key(name)
    }

    /// Returns document names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Returns the number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Returns true when the store holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

// ============================================================================
// SECTION: Installer Loading
// ============================================================================

/// Everything the mapping generator needs from an installer tree.
#[derive(Debug, Clone, Default)]
pub struct LoadedManifests {
    /// All indexed documents.
    pub store: DocumentStore,
    /// Hardware document names in file order.
    pub hardware: Vec<String>,
    /// Host profile document names in file order.
    pub host_profiles: Vec<String>,
    /// Physical network names in first-appearance order.
    pub networks: Vec<String>,
    /// Host profile to role tags, from baremetal nodes.
    pub host_roles: HostRoleIndex,
}

/// Loads and indexes every profile directory of an installer tree.
///
/// Hardware files replace same-named documents, host profile files keep an
/// existing document, and physical network fragments append under their own
/// names.
///
/// # Errors
///
/// Returns [`ManifestError`] when any required directory is missing, empty,
/// unreadable or holds unnamed documents.
pub fn load_manifests(
    layout: &InstallerLayout,
    options: &ReadOptions,
    diagnostics: &dyn DiagnosticSink,
) -> Result<LoadedManifests, ManifestError> {
    let baremetal = read_documents(&layout.baremetal_path(), options)?;
    let host_roles = HostRoleIndex::from_files(&baremetal, diagnostics);
    diagnostics.record(&DiagnosticEvent::info(
        "documents.host_roles",
        format!("indexed {} host profiles from baremetal nodes", host_roles.len()),
    ));

    let mut loaded = LoadedManifests {
        host_roles,
        ..LoadedManifests::default()
    };

    for file in read_documents(&layout.hardware_path(), options)? {
        let name = loaded.store.insert_file(file, InsertPolicy::Replace)?;
        loaded.hardware.push(name);
    }
    for file in read_documents(&layout.host_path(), options)? {
        let name = loaded.store.insert_file(file, InsertPolicy::KeepExisting)?;
        loaded.host_profiles.push(name);
    }
    for file in read_documents(&layout.network_path(), options)? {
        for name in loaded.store.append_fragments(file)? {
            if !loaded.networks.contains(&name) {
                loaded.networks.push(name);
            }
        }
    }

    diagnostics.record(&DiagnosticEvent::info(
        "documents.loaded",
        format!(
            "loaded {} documents ({} hardware, {} host profiles, {} networks)",
            loaded.store.len(),
            loaded.hardware.len(),
            loaded.host_profiles.len(),
            loaded.networks.len()
        ),
    ));
    Ok(loaded)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
