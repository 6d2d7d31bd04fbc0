// crates/sitecheck-config/src/lib.rs
// ============================================================================
// Module: sitecheck Config Library
// Description: Canonical config model and validation for sitecheck.toml.
// Purpose: Single source of truth for sitecheck.toml semantics.
// Dependencies: sitecheck-manifest, serde, toml
// ============================================================================

//! ## Overview
//! `sitecheck-config` defines the configuration model for the sitecheck
//! tools: where the installer tree and rule files live, how documents are
//! read, which search policy applies and where diagnostics go. Validation is
//! strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
