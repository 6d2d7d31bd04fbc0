// crates/sitecheck-manifest/src/search.rs
// ============================================================================
// Module: Recursive Key Search
// Description: Schema-less field search over order-preserving JSON values.
// Purpose: Collect every value stored under a field name inside a document.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Documents have no fixed schema, so a manifest key is located by walking
//! the fragment tree. Objects are visited in field order; arrays contribute
//! only their object elements.
//!
//! In [`SearchMode::FirstMatch`] a node reports a match when one of its own
//! fields carries the key or a nested object/array reported a match, and the
//! first match ends iteration of that node: later sibling subtrees are never
//! visited. Results therefore depend on field order.
//! [`SearchMode::Exhaustive`] visits every subtree.
//!
//! Matched arrays are flattened one level: each element is stringified and
//! appended on its own.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

// ============================================================================
// SECTION: Search Mode
// ============================================================================

/// Traversal policy for the recursive key search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Stop iterating a node at its first direct or nested match.
    #[default]
    FirstMatch,
    /// Collect matches from every subtree.
    Exhaustive,
}

// ============================================================================
// SECTION: Search
// ============================================================================

/// Searches a document's fragments for `target_key`.
///
/// Fragments are treated as one array node: in first-match mode the first
/// fragment reporting a match ends the search.
#[must_use]
pub fn search_fragments(target_key: &str, fragments: &[Value], mode: SearchMode) -> Vec<String> {
    let mut found = Vec::new();
    search_array(target_key, fragments, mode, &mut found);
    found
}

/// Searches a single node, appending matches to `found`.
///
/// Returns true when something matched in the sense of the mode.
pub fn search_node(
    target_key: &str,
    node: &Value,
    mode: SearchMode,
    found: &mut Vec<String>,
) -> bool {
    match node {
        Value::Object(fields) => search_object(target_key, fields, mode, found),
        Value::Array(items) => search_array(target_key, items, mode, found),
        _ => false,
    }
}

/// Visits object fields in order.
fn search_object(
    target_key: &str,
    fields: &Map<String, Value>,
    mode: SearchMode,
    found: &mut Vec<String>,
) -> bool {
    let mut matched = false;
    for (name, value) in fields {
        if name == target_key {
            append_match(value, found);
            if mode == SearchMode::FirstMatch {
                return true;
            }
            matched = true;
        }
        let nested = match value {
            Value::Object(_) | Value::Array(_) => search_node(target_key, value, mode, found),
            _ => false,
        };
        if nested {
            if mode == SearchMode::FirstMatch {
                return true;
            }
            matched = true;
        }
    }
    matched
}

/// Visits the object elements of an array; scalars and nested arrays are skipped.
fn search_array(
    target_key: &str,
    items: &[Value],
    mode: SearchMode,
    found: &mut Vec<String>,
) -> bool {
    let mut matched = false;
    for item in items {
        let Value::Object(fields) = item else {
            continue;
        };
        if search_object(target_key, fields, mode, found) {
            if mode == SearchMode::FirstMatch {
                return true;
            }
            matched = true;
        }
    }
    matched
}

/// Appends a matched value, flattening one array level.
fn append_match(value: &Value, found: &mut Vec<String>) {
    match value {
        Value::Array(items) => found.extend(items.iter().map(stringify_value)),
        other => found.push(stringify_value(other)),
    }
}

/// Renders a value as the string used in results and comparisons.
///
/// Strings are verbatim, numbers use their shortest decimal form, booleans
/// and null use their JSON spelling, containers render as compact JSON.
#[must_use]
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
