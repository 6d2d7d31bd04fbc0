// crates/sitecheck-manifest/tests/common/mod.rs
// ============================================================================
// Module: Manifest Test Helpers
// Description: On-disk installer trees and diagnostic capture for tests.
// Purpose: Reduce duplication across sitecheck-manifest integration suites.
// ============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only panic-based assertions are permitted."
)]

use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use sitecheck_manifest::DiagnosticEvent;
use sitecheck_manifest::DiagnosticLevel;
use sitecheck_manifest::DiagnosticSink;
use sitecheck_manifest::EngineOptions;
use sitecheck_manifest::InstallerLayout;
use sitecheck_manifest::ManifestError;
use sitecheck_manifest::NoopDiagnostics;
use sitecheck_manifest::ProfileDomain;
use sitecheck_manifest::ResolutionEngine;
use tempfile::TempDir;

/// Baremetal nodes: profileA carries compute, profileB carries controller.
pub const NODES: &str = "\
---
schema: drydock/BaremetalNode/v1
metadata:
  name: node-1
data:
  host_profile: profileA
  metadata:
    tags:
      - compute
---
schema: drydock/BaremetalNode/v1
metadata:
  name: node-2
data:
  host_profile: profileB
  metadata:
    tags:
      - controller
---
schema: deckhand/Certificate/v1
metadata:
  name: ca
data: pem
";

/// Hardware profile document.
pub const HARDWARE: &str = "\
schema: drydock/HardwareProfile/v1
metadata:
  name: dell_r740
data:
  vendor: Dell
  bios_version: '2.2.11'
  cpu_sets:
    kvm: '4-43'
";

/// Host profile with a single CPU count.
pub const PROFILE_A: &str = "\
schema: drydock/HostProfile/v1
metadata:
  name: profileA
data:
  cpus: 8
  platform:
    kernel: hwe-18.04
  storage:
    physical_devices:
      sda:
        labels:
          role: root
";

/// Host profile with split sockets.
pub const PROFILE_B: &str = "\
schema: drydock/HostProfile/v1
metadata:
  name: profileB
data:
  cpus:
    - 4
    - 4
  platform:
    kernel: ga-18.04
";

/// Physical networks, two fragments of oam plus pxe.
pub const NETWORKS: &str = "\
---
schema: drydock/NetworkLink/v1
metadata:
  name: oam
data:
  mtu: 9000
---
schema: drydock/Network/v1
metadata:
  name: oam
data:
  vlan: '41'
---
schema: drydock/Network/v1
metadata:
  name: pxe
data:
  vlan: '40'
  mtu: 1500
";

/// Temporary installer tree plus rule directory.
pub struct InstallerFixture {
    /// Owning temporary directory.
    dir: TempDir,
}

impl InstallerFixture {
    /// Creates an empty fixture.
    pub fn empty() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    /// Creates a fixture with the standard documents and rule files.
    pub fn standard() -> Self {
        let fixture = Self::empty();
        fixture.write_site("baremetal/nodes.yaml", NODES);
        fixture.write_site("profiles/hardware/dell_r740.yaml", HARDWARE);
        fixture.write_site("profiles/host/profileA.yaml", PROFILE_A);
        fixture.write_site("profiles/host/profileB.yaml", PROFILE_B);
        fixture.write_site("networks/physical/networks.yaml", NETWORKS);
        fixture.write_rules(
            ProfileDomain::Hardware,
            r#"{
                "hardware_profiles-vendor": {"manifest_key": "vendor"},
                "hardware_profiles-bios_version": {"manifest_key": "bios_version"}
            }"#,
        );
        fixture.write_rules(
            ProfileDomain::Platform,
            r#"{
                "cpu_count": {"manifest_key": "cpus"},
                "kernel": {"manifest_key": "kernel"}
            }"#,
        );
        fixture.write_rules(ProfileDomain::Storage, r#"{"root_label": {"manifest_key": "role"}}"#);
        fixture.write_rules(
            ProfileDomain::Network,
            r#"{"vlan": {"manifest_key": "vlan"}, "mtu": {"manifest_key": "mtu"}}"#,
        );
        fixture.write_rules(
            ProfileDomain::Info,
            r#"{"owner": {"manifest_key": "owner", "manifest_context": ""}}"#,
        );
        fixture
    }

    /// Returns the installer site root.
    pub fn site_root(&self) -> PathBuf {
        self.dir.path().join("site")
    }

    /// Returns the rule directory.
    pub fn mapping_dir(&self) -> PathBuf {
        self.dir.path().join("mapping")
    }

    /// Returns the layout for the site root.
    pub fn layout(&self) -> InstallerLayout {
        InstallerLayout::new(self.site_root())
    }

    /// Writes a file below the site root.
    pub fn write_site(&self, relative: &str, content: &str) {
        write_file(&self.site_root().join(relative), content);
    }

    /// Writes a domain's rule file.
    pub fn write_rules(&self, domain: ProfileDomain, content: &str) {
        write_file(&self.mapping_dir().join(domain.rule_file_name()), content);
    }

    /// Removes a file or directory below the site root.
    pub fn remove_site(&self, relative: &str) {
        let path = self.site_root().join(relative);
        if path.is_dir() {
            fs::remove_dir_all(path).expect("remove dir");
        } else {
            fs::remove_file(path).expect("remove file");
        }
    }

    /// Loads an engine with default options and discarded diagnostics.
    pub fn load(&self) -> Result<ResolutionEngine, ManifestError> {
        self.load_with(&EngineOptions::default(), Arc::new(NoopDiagnostics))
    }

    /// Loads an engine with explicit options and sink.
    pub fn load_with(
        &self,
        options: &EngineOptions,
        diagnostics: Arc<dyn DiagnosticSink>,
    ) -> Result<ResolutionEngine, ManifestError> {
        ResolutionEngine::load(&self.layout(), &self.mapping_dir(), options, diagnostics)
    }
}

/// Writes a file, creating parent directories.
pub fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create dirs");
    }
    fs::write(path, content).expect("write file");
}

/// Diagnostic sink that keeps every event.
#[derive(Default)]
pub struct CollectingDiagnostics {
    /// Recorded events.
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl CollectingDiagnostics {
    /// Returns a copy of the recorded events.
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().expect("events lock").clone()
    }

    /// Returns the events carrying `code`.
    pub fn with_code(&self, code: &str) -> Vec<DiagnosticEvent> {
        self.events().into_iter().filter(|event| event.code == code).collect()
    }

    /// Returns the events at `level`.
    pub fn at_level(&self, level: DiagnosticLevel) -> Vec<DiagnosticEvent> {
        self.events().into_iter().filter(|event| event.level == level).collect()
    }
}

impl DiagnosticSink for CollectingDiagnostics {
    fn record(&self, event: &DiagnosticEvent) {
        self.events.lock().expect("events lock").push(event.clone());
    }
}
