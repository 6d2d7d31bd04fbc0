//! Value resolution tests for sitecheck-manifest.
// crates/sitecheck-manifest/tests/resolution.rs
// ============================================================================
// Module: Value Resolution Tests
// Description: End-to-end queries against an on-disk installer tree.
// Purpose: Pin lookup order, flattening, caching and non-fatal misses.
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::sync::Arc;

use serde_json::json;
use sitecheck_manifest::ComparisonOutcome;
use sitecheck_manifest::DiagnosticLevel;
use sitecheck_manifest::EngineOptions;
use sitecheck_manifest::Expectation;
use sitecheck_manifest::ExpectationSet;
use sitecheck_manifest::SearchMode;
use sitecheck_manifest::cache_key;

mod common;
use crate::common::CollectingDiagnostics;
use crate::common::InstallerFixture;

#[test]
fn role_scoped_rule_resolves_scalar() {
    let engine = InstallerFixture::standard().load().expect("engine");
    assert_eq!(engine.find_val("compute", "platform", "cpu_count"), ["8"]);
}

#[test]
fn split_sockets_are_flattened() {
    let engine = InstallerFixture::standard().load().expect("engine");
    assert_eq!(engine.find_val("controller", "platform", "cpu_count"), ["4", "4"]);
}

#[test]
fn profile_embedded_rule_key_resolves_first() {
    let engine = InstallerFixture::standard().load().expect("engine");
    assert!(engine.mapping_entry("global-hardware_profiles-vendor").is_some());
    assert_eq!(engine.find_val("global", "hardware_profiles", "vendor"), ["Dell"]);
    assert_eq!(engine.find_val("global", "hardware_profiles", "bios_version"), ["2.2.11"]);
}

#[test]
fn network_queries_search_every_fragment_of_the_network() {
    let engine = InstallerFixture::standard().load().expect("engine");
    assert_eq!(engine.find_val("oam", "network", "vlan"), ["41"]);
    assert_eq!(engine.find_val("oam", "network", "mtu"), ["9000"]);
    assert_eq!(engine.find_val("pxe", "network", "mtu"), ["1500"]);
}

#[test]
fn nested_storage_key_is_found() {
    let engine = InstallerFixture::standard().load().expect("engine");
    assert_eq!(engine.find_val("compute", "storage", "root_label"), ["root"]);
    assert!(engine.find_val("controller", "storage", "root_label").is_empty());
}

#[test]
fn unmapped_key_returns_empty_without_search() {
    let engine = InstallerFixture::standard().load().expect("engine");
    assert!(engine.find_val("compute", "info", "owner").is_empty());
    assert_eq!(engine.stats().searches, 0);
    assert_eq!(engine.cached(&cache_key("compute", "info", "owner")), Some(Vec::new()));
}

#[test]
fn missing_mapping_returns_empty_and_logs_error() {
    let fixture = InstallerFixture::standard();
    let sink = Arc::new(CollectingDiagnostics::default());
    let engine = fixture.load_with(&EngineOptions::default(), sink.clone()).expect("engine");

    assert!(engine.find_val("storage", "platform", "cpu_count").is_empty());
    assert!(engine.find_val("compute", "platform", "no_such_key").is_empty());

    let errors = sink.at_level(DiagnosticLevel::Error);
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|event| event.code == "resolve.mapping_missing"));
    assert!(errors[0].message.contains("storage-platform-cpu_count"));
    assert_eq!(engine.stats().searches, 0);
}

#[test]
fn role_scoped_rule_only_answers_its_own_profile() {
    let fixture = InstallerFixture::standard();
    let sink = Arc::new(CollectingDiagnostics::default());
    let engine = fixture.load_with(&EngineOptions::default(), sink.clone()).expect("engine");

    assert!(engine.find_val("compute", "storage", "cpu_count").is_empty());
    assert!(engine.find_val("compute", "no_such_profile", "cpu_count").is_empty());
    assert!(engine.find_val("compute", "network", "kernel").is_empty());
    assert_eq!(engine.find_val("compute", "platform", "cpu_count"), ["8"]);
    assert_eq!(engine.find_val("compute", "platform", "kernel"), ["hwe-18.04"]);

    assert_eq!(sink.with_code("resolve.mapping_missing").len(), 3);
    assert_eq!(engine.stats().searches, 2);
}

#[test]
fn boolean_and_null_values_use_json_spelling() {
    let fixture = InstallerFixture::standard();
    fixture.write_site(
        "profiles/host/profileA.yaml",
        "metadata:\n  name: profileA\ndata:\n  cpus: null\n  kernel: true\n",
    );
    let engine = fixture.load().expect("engine");
    assert_eq!(engine.find_val("compute", "platform", "cpu_count"), ["null"]);
    assert_eq!(engine.find_val("compute", "platform", "kernel"), ["true"]);
}

#[test]
fn repeated_queries_are_served_from_cache() {
    let engine = InstallerFixture::standard().load().expect("engine");
    let first = engine.find_val("controller", "platform", "cpu_count");
    let after_first = engine.stats();
    let second = engine.find_val("controller", "platform", "cpu_count");
    let after_second = engine.stats();

    assert_eq!(first, second);
    assert_eq!(after_first.cache_misses, 1);
    assert_eq!(after_first.searches, 1);
    assert_eq!(after_second.cache_hits, 1);
    assert_eq!(after_second.searches, 1);
    assert_eq!(after_second.cache_misses, 1);
}

#[test]
fn cache_is_keyed_by_role_profile_key() {
    let engine = InstallerFixture::standard().load().expect("engine");
    assert_eq!(engine.cached("compute-platform-kernel"), None);
    let values = engine.find_val("compute", "platform", "kernel");
    assert_eq!(values, ["hwe-18.04"]);
    assert_eq!(engine.cached("compute-platform-kernel"), Some(values));
    assert_eq!(engine.cached("compute-kernel"), None);
}

#[test]
fn empty_search_is_cached_and_logged_at_debug() {
    let fixture = InstallerFixture::standard();
    let sink = Arc::new(CollectingDiagnostics::default());
    let engine = fixture.load_with(&EngineOptions::default(), sink.clone()).expect("engine");
    assert!(engine.find_val("controller", "storage", "root_label").is_empty());
    assert!(engine.find_val("controller", "storage", "root_label").is_empty());
    assert_eq!(sink.with_code("resolve.empty").len(), 1);
    assert_eq!(engine.stats().searches, 1);
}

#[test]
fn exhaustive_mode_collects_every_subtree() {
    let fixture = InstallerFixture::standard();
    fixture.write_site(
        "profiles/host/profileA.yaml",
        "metadata:\n  name: profileA\ndata:\n  a:\n    cpus: 2\n  b:\n    cpus: 6\n",
    );
    let first = fixture.load().expect("engine");
    assert_eq!(first.search_mode(), SearchMode::FirstMatch);
    assert_eq!(first.find_val("compute", "platform", "cpu_count"), ["2"]);

    let options = EngineOptions {
        search_mode: SearchMode::Exhaustive,
        ..EngineOptions::default()
    };
    let exhaustive =
        fixture.load_with(&options, Arc::new(CollectingDiagnostics::default())).expect("engine");
    assert_eq!(exhaustive.search_mode(), SearchMode::Exhaustive);
    assert_eq!(exhaustive.find_val("compute", "platform", "cpu_count"), ["2", "6"]);
}

#[test]
fn concurrent_queries_agree() {
    let engine = InstallerFixture::standard().load().expect("engine");
    let results: Vec<Vec<String>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0 .. 4)
            .map(|_| scope.spawn(|| engine.find_val("compute", "platform", "cpu_count")))
            .collect();
        handles.into_iter().map(|handle| handle.join().expect("join")).collect()
    });
    assert!(results.iter().all(|values| values == &["8"]));
    let stats = engine.stats();
    assert_eq!(stats.cache_hits + stats.cache_misses, 4);
}

#[test]
fn check_tallies_expectations() {
    let engine = InstallerFixture::standard().load().expect("engine");
    let expectations = ExpectationSet {
        expectations: vec![
            Expectation {
                role: "compute".to_string(),
                profile: "platform".to_string(),
                key: "cpu_count".to_string(),
                expected: Some(json!(8)),
            },
            Expectation {
                role: "controller".to_string(),
                profile: "platform".to_string(),
                key: "kernel".to_string(),
                expected: Some(json!("hwe-18.04")),
            },
            Expectation {
                role: "oam".to_string(),
                profile: "network".to_string(),
                key: "vlan".to_string(),
                expected: None,
            },
            Expectation {
                role: "compute".to_string(),
                profile: "info".to_string(),
                key: "owner".to_string(),
                expected: Some(json!("ops")),
            },
        ],
    };
    let report = engine.check(&expectations);
    let outcomes: Vec<ComparisonOutcome> =
        report.records.iter().map(|record| record.outcome).collect();
    assert_eq!(
        outcomes,
        [
            ComparisonOutcome::Match,
            ComparisonOutcome::Mismatch,
            ComparisonOutcome::MissingExpected,
            ComparisonOutcome::MissingManifestValue,
        ]
    );
    assert_eq!((report.correct, report.wrong, report.total), (1, 1, 4));
    assert!(report.render_text().ends_with("The number of correct :1 wrong:1 and total:4\n"));
}
