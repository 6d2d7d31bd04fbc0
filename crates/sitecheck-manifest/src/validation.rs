// crates/sitecheck-manifest/src/validation.rs
// ============================================================================
// Module: Comparison Tally
// Description: Expected-versus-manifest value comparison and reporting.
// Purpose: Tally design-document expectations against resolved values.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! An [`Expectation`] names a query and the value the design document
//! declares for it. [`compare`] classifies one expectation against the
//! resolved manifest values and [`ValidationReport`] accumulates the results.
//! Invariants:
//! - Every comparison counts towards `total`, including missing values.
//! - Only matches count as correct and only mismatches count as wrong.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ManifestError;
use crate::search::stringify_value;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum size of an expectation file, in bytes.
pub const MAX_EXPECTATION_FILE_BYTES: usize = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Expectations
// ============================================================================

/// Value a design document declares for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expectation {
    /// Host role, network name or `global`.
    pub role: String,
    /// Profile the key belongs to.
    pub profile: String,
    /// Semantic key.
    pub key: String,
    /// Declared value; absent, null or empty string means not declared.
    #[serde(default)]
    pub expected: Option<Value>,
}

impl Expectation {
    /// Returns the declared value in comparison form, if any.
    #[must_use]
    pub fn expected_text(&self) -> Option<String> {
        match &self.expected {
            None | Some(Value::Null) => None,
            Some(value) => Some(stringify_value(value)).filter(|text| !text.is_empty()),
        }
    }
}

/// Ordered list of expectations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSet {
    /// Expectations in file order.
    pub expectations: Vec<Expectation>,
}

impl ExpectationSet {
    /// Loads an expectation file.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::ExpectationFile`] when the file is missing,
    /// oversized, not UTF-8 or malformed.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let invalid = |reason: String| ManifestError::ExpectationFile {
            path: path.to_path_buf(),
            reason,
        };
        let file = File::open(path).map_err(|err| invalid(err.to_string()))?;
        let limit = u64::try_from(MAX_EXPECTATION_FILE_BYTES.saturating_add(1))
            .map_err(|_| invalid("size limit exceeds u64".to_string()))?;
        let mut buf = Vec::new();
        file.take(limit).read_to_end(&mut buf).map_err(|err| invalid(err.to_string()))?;
        if buf.len() > MAX_EXPECTATION_FILE_BYTES {
            return Err(invalid("expectation file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&buf)
            .map_err(|_| invalid("expectation file must be utf-8".to_string()))?;
        Self::parse(path, content)
    }

    /// Parses expectation JSON; `path` is used for error reporting only.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::ExpectationFile`] when the content is malformed.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
        serde_json::from_str(content).map_err(|err| ManifestError::ExpectationFile {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })
    }
}

// ============================================================================
// SECTION: Comparison
// ============================================================================

/// Result of comparing one expectation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonOutcome {
    /// The design document declares no value.
    MissingExpected,
    /// The manifests resolved no value.
    MissingManifestValue,
    /// The declared value is not among the resolved values.
    Mismatch,
    /// The declared value is among the resolved values.
    Match,
}

/// Classifies an expectation against resolved manifest values.
#[must_use]
pub fn compare(expectation: &Expectation, values: &[String]) -> ComparisonOutcome {
    let Some(expected) = expectation.expected_text() else {
        return ComparisonOutcome::MissingExpected;
    };
    if values.is_empty() {
        ComparisonOutcome::MissingManifestValue
    } else if values.contains(&expected) {
        ComparisonOutcome::Match
    } else {
        ComparisonOutcome::Mismatch
    }
}

/// One tallied comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRecord {
    /// Compared expectation.
    pub expectation: Expectation,
    /// Resolved manifest values.
    pub values: Vec<String>,
    /// Classification.
    pub outcome: ComparisonOutcome,
}

/// Accumulated comparison results.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Matching comparisons.
    pub correct: usize,
    /// Mismatching comparisons.
    pub wrong: usize,
    /// All comparisons.
    pub total: usize,
    /// Per-expectation records in comparison order.
    pub records: Vec<ComparisonRecord>,
}

impl ValidationReport {
    /// Compares an expectation and records the outcome.
    pub fn record(&mut self, expectation: &Expectation, values: Vec<String>) -> ComparisonOutcome {
        let outcome = compare(expectation, &values);
        self.total += 1;
        match outcome {
            ComparisonOutcome::Match => self.correct += 1,
            ComparisonOutcome::Mismatch => self.wrong += 1,
            ComparisonOutcome::MissingExpected | ComparisonOutcome::MissingManifestValue => {}
        }
        self.records.push(ComparisonRecord {
            expectation: expectation.clone(),
            values,
            outcome,
        });
        outcome
    }

    /// Returns true when any comparison mismatched.
    #[must_use]
    pub const fn has_mismatches(&self) -> bool {
        self.wrong > 0
    }

    /// Renders the line-oriented text report.
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            let Expectation {
                role,
                profile,
                key,
                ..
            } = &record.expectation;
            let _ = match record.outcome {
                ComparisonOutcome::MissingExpected => writeln!(
                    out,
                    "No value exists for pdf-key:{key} of profile:{profile} and role:{role}"
                ),
                ComparisonOutcome::MissingManifestValue => writeln!(
                    out,
                    "No value exists for manifest-key:{key} of profile:{profile} and role:{role}"
                ),
                ComparisonOutcome::Mismatch => writeln!(
                    out,
                    "The pdf and manifest values do not match for key:{key} profile:{profile} \
                     role:{role}\nthe pdf val:{} and manifest val:{}",
                    record.expectation.expected_text().unwrap_or_default(),
                    render_values(&record.values)
                ),
                ComparisonOutcome::Match => writeln!(
                    out,
                    "The pdf and manifest values do match for key:{key} profile:{profile} \
                     role:{role}"
                ),
            };
        }
        let _ = writeln!(
            out,
            "The number of correct :{} wrong:{} and total:{}",
            self.correct, self.wrong, self.total
        );
        out
    }
}

/// Renders resolved values as a bracketed list.
fn render_values(values: &[String]) -> String {
    format!("[{}]", values.join(", "))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use serde_json::json;

    use super::*;

    fn expectation(expected: Option<Value>) -> Expectation {
        Expectation {
            role: "compute".to_string(),
            profile: "platform".to_string(),
            key: "cpu_count".to_string(),
            expected,
        }
    }

    fn values(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn compare_classifies_each_outcome() {
        assert_eq!(
            compare(&expectation(None), &values(&["8"])),
            ComparisonOutcome::MissingExpected
        );
        assert_eq!(
            compare(&expectation(Some(json!(""))), &values(&["8"])),
            ComparisonOutcome::MissingExpected
        );
        assert_eq!(
            compare(&expectation(Some(json!(8))), &[]),
            ComparisonOutcome::MissingManifestValue
        );
        assert_eq!(
            compare(&expectation(Some(json!(8))), &values(&["4"])),
            ComparisonOutcome::Mismatch
        );
        assert_eq!(
            compare(&expectation(Some(json!(8))), &values(&["4", "8"])),
            ComparisonOutcome::Match
        );
    }

    #[test]
    fn report_counts_missing_values_in_total_only() {
        let mut report = ValidationReport::default();
        report.record(&expectation(Some(json!("8"))), values(&["8"]));
        report.record(&expectation(Some(json!("8"))), values(&["4"]));
        report.record(&expectation(Some(json!("8"))), Vec::new());
        report.record(&expectation(None), values(&["8"]));
        assert_eq!((report.correct, report.wrong, report.total), (1, 1, 4));
        assert!(report.has_mismatches());
    }

    #[test]
    fn render_text_uses_report_lines() {
        let mut report = ValidationReport::default();
        report.record(&expectation(Some(json!(8))), values(&["4", "2"]));
        report.record(&expectation(Some(json!(8))), values(&["8"]));
        let text = report.render_text();
        assert_eq!(
            text,
            "The pdf and manifest values do not match for key:cpu_count profile:platform \
             role:compute\nthe pdf val:8 and manifest val:[4, 2]\nThe pdf and manifest values do \
             match for key:cpu_count profile:platform role:compute\nThe number of correct :1 \
             wrong:1 and total:2\n"
        );
    }

    #[test]
    fn expectation_set_parses_optional_expected() {
        let set = ExpectationSet::parse(
            Path::new("e.json"),
            r#"{"expectations": [
                {"role": "global", "profile": "hardware", "key": "cpu", "expected": 8},
                {"role": "oam", "profile": "network", "key": "vlan"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(set.expectations.len(), 2);
        assert_eq!(set.expectations[0].expected_text().as_deref(), Some("8"));
        assert_eq!(set.expectations[1].expected, None);
    }

    #[test]
    fn expectation_set_rejects_malformed_json() {
        let err = ExpectationSet::parse(Path::new("bad.json"), "[1, 2]").unwrap_err();
        assert!(err.to_string().starts_with("invalid expectation file bad.json"));
    }
}
