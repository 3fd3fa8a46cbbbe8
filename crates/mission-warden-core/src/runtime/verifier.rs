// crates/mission-warden-core/src/runtime/verifier.rs
// ============================================================================
// Module: Mission Warden Bundle Verifier
// Description: Offline integrity replay over saved evidence bundles.
// Purpose: Prove a recorded bundle still matches what the recorder attested.
// Dependencies: crate::core, crate::interfaces, crate::runtime::recorder
// ============================================================================

//! ## Overview
//! The verifier replays every integrity check a reader would otherwise have
//! to trust: the manifest version, the terminal-status invariants, sequence
//! uniqueness, and a re-hash of every attested artifact. All findings are
//! collected into one report instead of stopping at the first problem, so a
//! tampered bundle yields the full damage list in a single pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::core::evidence::BundleStatus;
use crate::core::evidence::EvidenceBundleManifest;
use crate::core::evidence::EvidenceIoError;
use crate::core::evidence::MANIFEST_VERSION;
use crate::core::identifiers::BundleId;
use crate::interfaces::BundleStore;
use crate::runtime::recorder::validate_manifest_artifacts;

// ============================================================================
// SECTION: Verification Types
// ============================================================================

/// Verification status for bundle reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Every check passed.
    Pass,
    /// At least one check failed.
    Fail,
}

/// Offline verification report for one evidence bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Verification status.
    pub status: VerificationStatus,
    /// Count of artifacts re-hashed.
    pub checked_artifacts: usize,
    /// Error messages, if any.
    pub errors: Vec<String>,
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

/// Bundle verifier for offline validation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleVerifier;

impl BundleVerifier {
    /// Creates a new verifier.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Verifies a manifest against the directory its artifacts live under.
    #[must_use]
    pub fn verify_manifest(
        &self,
        manifest: &EvidenceBundleManifest,
        artifact_root: &Path,
    ) -> VerificationReport {
        let mut errors = Vec::new();

        if manifest.manifest_version != MANIFEST_VERSION {
            errors.push(format!(
                "unsupported manifest version {} (expected {MANIFEST_VERSION})",
                manifest.manifest_version
            ));
        }

        check_terminal_invariants(manifest, &mut errors);
        check_sequence_uniqueness(manifest, &mut errors);

        let checked = manifest.artifacts.len();
        for failure in validate_manifest_artifacts(manifest, artifact_root) {
            errors.push(format!("artifact {}: {}", failure.path, failure.detail));
        }

        let status =
            if errors.is_empty() { VerificationStatus::Pass } else { VerificationStatus::Fail };

        VerificationReport {
            status,
            checked_artifacts: checked,
            errors,
        }
    }

    /// Loads a bundle through a store and verifies it.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError`] when the bundle cannot be loaded; a bundle
    /// that loads but fails checks is reported, not an error.
    pub fn verify_stored(
        &self,
        store: &impl BundleStore,
        bundle_id: &BundleId,
        artifact_root: &Path,
    ) -> Result<VerificationReport, EvidenceIoError> {
        let manifest = store.load(bundle_id)?;
        Ok(self.verify_manifest(&manifest, artifact_root))
    }
}

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

/// Checks the terminal-status invariants on a manifest.
fn check_terminal_invariants(manifest: &EvidenceBundleManifest, errors: &mut Vec<String>) {
    let status = manifest.status;
    if !status.is_terminal() {
        return;
    }
    if matches!(status, BundleStatus::Failed | BundleStatus::Aborted)
        && manifest.error_message.as_deref().is_none_or(|message| message.trim().is_empty())
    {
        errors.push(format!("terminal status {status} without an error message"));
    }
    if manifest.finalized_at.is_none() {
        errors.push(format!("terminal status {status} without finalized_at"));
    }
}

/// Checks that sequence numbers are unique across every record type.
fn check_sequence_uniqueness(manifest: &EvidenceBundleManifest, errors: &mut Vec<String>) {
    let mut seen = BTreeSet::new();
    let seqs = manifest
        .tasks_skipped
        .iter()
        .map(|record| record.seq)
        .chain(manifest.tool_calls.iter().map(|record| record.seq))
        .chain(manifest.artifacts.iter().map(|record| record.seq))
        .chain(manifest.tests_run.iter().map(|record| record.seq))
        .chain(manifest.checkpoints.iter().map(|record| record.seq));
    for seq in seqs {
        if !seen.insert(seq) {
            errors.push(format!("duplicate sequence number {seq}"));
        }
    }
}
