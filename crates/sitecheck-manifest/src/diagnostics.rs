// crates/sitecheck-manifest/src/diagnostics.rs
// ============================================================================
// Module: Manifest Diagnostics
// Description: Diagnostic sink trait and reference implementations.
// Purpose: Record construction and query diagnostics without affecting results.
// Dependencies: serde, serde_json, std
// ============================================================================

//! ## Overview
//! The resolution engine reports what it loads and what each query finds to a
//! [`DiagnosticSink`]. Sinks are observers only: a failing sink never changes
//! a construction outcome or a query result.
//! Invariants:
//! - Event `code` labels are stable for log filtering.
//! - [`JsonLinesDiagnostics`] writes exactly one JSON object per line.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;

// ============================================================================
// SECTION: Events
// ============================================================================

/// Severity attached to a diagnostic event.
///
/// # Invariants
/// - Ordering is `Debug < Info < Error` and drives level filtering.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    /// Verbose tracing of individual lookups.
    Debug,
    /// Lifecycle milestones.
    #[default]
    Info,
    /// Query-time problems that produce empty results.
    Error,
}

impl DiagnosticLevel {
    /// Returns a stable label for the level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Error => "error",
        }
    }
}

/// Single diagnostic record emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEvent {
    /// Event severity.
    pub level: DiagnosticLevel,
    /// Stable event code (for example `resolve.mapping_missing`).
    pub code: &'static str,
    /// Human-readable detail.
    pub message: String,
}

impl DiagnosticEvent {
    /// Creates a debug-level event.
    #[must_use]
    pub fn debug(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Debug,
            code,
            message: message.into(),
        }
    }

    /// Creates an info-level event.
    #[must_use]
    pub fn info(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            code,
            message: message.into(),
        }
    }

    /// Creates an error-level event.
    #[must_use]
    pub fn error(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            code,
            message: message.into(),
        }
    }
}

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Receives diagnostic events from the engine.
pub trait DiagnosticSink: Send + Sync {
    /// Records a single event.
    fn record(&self, event: &DiagnosticEvent);
}

/// No-op diagnostic sink.
///
/// # Invariants
/// - Events are intentionally discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDiagnostics;

impl DiagnosticSink for NoopDiagnostics {
    fn record(&self, _event: &DiagnosticEvent) {}
}

// ============================================================================
// SECTION: JSON Lines Sink
// ============================================================================

/// Diagnostic sink writing one JSON record per event.
pub struct JsonLinesDiagnostics<W: Write + Send> {
    /// Output writer for log records.
    writer: Mutex<W>,
    /// Events below this level are dropped.
    min_level: DiagnosticLevel,
}

impl<W: Write + Send> JsonLinesDiagnostics<W> {
    /// Creates a sink that records info-level events and above.
    pub fn new(writer: W) -> Self {
        Self::with_min_level(writer, DiagnosticLevel::Info)
    }

    /// Creates a sink with an explicit minimum level.
    pub fn with_min_level(writer: W, min_level: DiagnosticLevel) -> Self {
        Self {
            writer: Mutex::new(writer),
            min_level,
        }
    }

    /// Returns the minimum recorded level.
    pub const fn min_level(&self) -> DiagnosticLevel {
        self.min_level
    }
}

impl<W: Write + Send> DiagnosticSink for JsonLinesDiagnostics<W> {
    fn record(&self, event: &DiagnosticEvent) {
        if event.level < self.min_level {
            return;
        }
        let record = json!({
            "level": event.level.as_str(),
            "code": event.code,
            "message": event.message,
        });
        let Ok(mut guard) = self.writer.lock() else {
            return;
        };
        if serde_json::to_writer(&mut *guard, &record).is_ok() {
            let _ = guard.write_all(b"\n");
            let _ = guard.flush();
        }
        drop(guard);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
