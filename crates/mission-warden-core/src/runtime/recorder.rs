// crates/mission-warden-core/src/runtime/recorder.rs
// ============================================================================
// Module: Mission Warden Evidence Recorder
// Description: Append-only recording API over the evidence bundle manifest.
// Purpose: Enforce sequence, lifecycle, and integrity rules while recording.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! The recorder owns one manifest for the lifetime of a run. Every append
//! takes the next monotone sequence number; appends after a terminal status
//! and second terminal transitions are rejected. Artifact hashes are computed
//! at recording time and never refreshed, which is exactly what makes later
//! validation meaningful.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::evidence::ArtifactRecord;
use crate::core::evidence::BundleStatus;
use crate::core::evidence::CheckpointKind;
use crate::core::evidence::CheckpointRecord;
use crate::core::evidence::EvidenceBundleManifest;
use crate::core::evidence::EvidenceIoError;
use crate::core::evidence::SkippedTask;
use crate::core::evidence::ToolCallRecord;
use crate::core::evidence::UnitTestRecord;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::hash_bytes;
use crate::core::identifiers::CallId;
use crate::core::identifiers::CanonicalAgentId;
use crate::core::identifiers::TaskId;
use crate::core::identifiers::ToolName;
use crate::core::time::Timestamp;
use crate::interfaces::ReportedTest;

// ============================================================================
// SECTION: Tool Call Events
// ============================================================================

/// One tool-call attempt handed to the recorder.
///
/// The recorder assigns the sequence number; everything else is supplied by
/// the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCallEvent {
    /// Identifier of this call attempt.
    pub call_id: CallId,
    /// Task the call executed for.
    pub task_id: TaskId,
    /// Canonical agent that handled the call.
    pub agent: CanonicalAgentId,
    /// External tool the task declared, when any.
    pub tool: Option<ToolName>,
    /// Attempt number, starting at 1.
    pub attempt: u32,
    /// Canonical hash of the invocation inputs.
    pub input_hash: HashDigest,
    /// Canonical hash of the output payload, absent on failure.
    pub output_hash: Option<HashDigest>,
    /// Whether the call succeeded.
    pub success: bool,
    /// Adapter-reported error message on failure.
    pub error: Option<String>,
    /// Wall-clock duration reported by the adapter.
    pub duration_ms: u64,
    /// When the attempt happened.
    pub at: Timestamp,
}

/// One artifact that failed re-validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactFailure {
    /// Artifact path as recorded.
    pub path: String,
    /// What went wrong: unreadable file or hash mismatch.
    pub detail: String,
}

// ============================================================================
// SECTION: Evidence Recorder
// ============================================================================

/// Append-only recorder over one evidence bundle manifest.
///
/// # Invariants
///
/// - Sequence numbers are unique and strictly increasing across all record
///   types within the bundle.
/// - No append succeeds after the bundle reaches a terminal status.
/// - Exactly one terminal transition is accepted.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceRecorder {
    /// The manifest being recorded.
    manifest: EvidenceBundleManifest,
    /// Next sequence number to assign.
    next_seq: u64,
}

impl EvidenceRecorder {
    /// Wraps a manifest, resuming the sequence after its highest record.
    #[must_use]
    pub fn new(manifest: EvidenceBundleManifest) -> Self {
        let next_seq = highest_seq(&manifest).map_or(0, |seq| seq + 1);
        Self {
            manifest,
            next_seq,
        }
    }

    /// Returns the manifest recorded so far.
    #[must_use]
    pub const fn manifest(&self) -> &EvidenceBundleManifest {
        &self.manifest
    }

    /// Consumes the recorder and returns the manifest.
    #[must_use]
    pub fn into_manifest(self) -> EvidenceBundleManifest {
        self.manifest
    }

    /// Rejects appends once the bundle is sealed.
    fn ensure_open(&self) -> Result<(), EvidenceIoError> {
        if self.manifest.status.is_terminal() {
            return Err(EvidenceIoError::BundleSealed {
                status: self.manifest.status,
            });
        }
        Ok(())
    }

    /// Takes the next sequence number.
    fn take_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Records a planned task id, once, in call order.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::BundleSealed`] after a terminal status.
    pub fn record_task_planned(&mut self, task_id: TaskId) -> Result<(), EvidenceIoError> {
        self.ensure_open()?;
        if !self.manifest.tasks_planned.contains(&task_id) {
            self.manifest.tasks_planned.push(task_id);
        }
        Ok(())
    }

    /// Records a canonical agent as invoked, once, in first-invocation order.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::BundleSealed`] after a terminal status.
    pub fn record_agent_invoked(
        &mut self,
        agent: &CanonicalAgentId,
    ) -> Result<(), EvidenceIoError> {
        self.ensure_open()?;
        if !self.manifest.agents_invoked.contains(agent) {
            self.manifest.agents_invoked.push(agent.clone());
        }
        Ok(())
    }

    /// Records a task as executed, once, in completion order.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::BundleSealed`] after a terminal status.
    pub fn record_task_executed(&mut self, task_id: TaskId) -> Result<(), EvidenceIoError> {
        self.ensure_open()?;
        if !self.manifest.tasks_executed.contains(&task_id) {
            self.manifest.tasks_executed.push(task_id);
        }
        Ok(())
    }

    /// Records a task skipped without execution.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::BundleSealed`] after a terminal status.
    pub fn record_task_skipped(
        &mut self,
        task_id: TaskId,
        reason: impl Into<String>,
    ) -> Result<(), EvidenceIoError> {
        self.ensure_open()?;
        let seq = self.take_seq();
        self.manifest.tasks_skipped.push(SkippedTask {
            seq,
            task_id,
            reason: reason.into(),
        });
        Ok(())
    }

    /// Records one tool-call attempt and returns its sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::BundleSealed`] after a terminal status.
    pub fn record_tool_call(&mut self, event: ToolCallEvent) -> Result<u64, EvidenceIoError> {
        self.ensure_open()?;
        let seq = self.take_seq();
        self.manifest.tool_calls.push(ToolCallRecord {
            seq,
            call_id: event.call_id,
            task_id: event.task_id,
            agent: event.agent,
            tool: event.tool,
            attempt: event.attempt,
            input_hash: event.input_hash,
            output_hash: event.output_hash,
            success: event.success,
            error: event.error,
            duration_ms: event.duration_ms,
            at: event.at,
        });
        Ok(seq)
    }

    /// Records one reported unit test result.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::BundleSealed`] after a terminal status.
    pub fn record_test(
        &mut self,
        task_id: Option<TaskId>,
        test: &ReportedTest,
        at: Timestamp,
    ) -> Result<(), EvidenceIoError> {
        self.ensure_open()?;
        let seq = self.take_seq();
        self.manifest.tests_run.push(UnitTestRecord {
            seq,
            task_id,
            name: test.name.clone(),
            passed: test.passed,
            duration_ms: test.duration_ms,
            at,
        });
        Ok(())
    }

    /// Records a typed checkpoint.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::BundleSealed`] after a terminal status.
    pub fn record_checkpoint(
        &mut self,
        kind: CheckpointKind,
        task_id: Option<TaskId>,
        message: impl Into<String>,
        at: Timestamp,
    ) -> Result<(), EvidenceIoError> {
        self.ensure_open()?;
        let seq = self.take_seq();
        self.manifest.checkpoints.push(CheckpointRecord {
            seq,
            kind,
            task_id,
            message: message.into(),
            at,
        });
        Ok(())
    }

    /// Hashes an artifact file now and records the attestation.
    ///
    /// The recorded path is `relative`, resolved against `root` for reading.
    /// The hash is immutable once recorded even if the file later changes.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::BundleSealed`] after a terminal status and
    /// [`EvidenceIoError::Io`] when the artifact cannot be read.
    pub fn add_artifact_file(
        &mut self,
        task_id: Option<TaskId>,
        root: &Path,
        relative: &str,
        at: Timestamp,
    ) -> Result<HashDigest, EvidenceIoError> {
        self.ensure_open()?;
        let full = root.join(relative);
        let bytes = std::fs::read(&full).map_err(|source| EvidenceIoError::Io {
            path: full.display().to_string(),
            source,
        })?;
        let hash = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes);
        let seq = self.take_seq();
        self.manifest.artifacts.push(ArtifactRecord {
            seq,
            task_id,
            path: relative.to_string(),
            size_bytes: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            hash: hash.clone(),
            at,
        });
        Ok(hash)
    }

    /// Re-hashes every recorded artifact and reports mismatches.
    ///
    /// An unreadable artifact counts as a failure; integrity cannot be shown
    /// for a file that is gone.
    #[must_use]
    pub fn validate_artifacts(&self, root: &Path) -> Vec<ArtifactFailure> {
        validate_manifest_artifacts(&self.manifest, root)
    }

    /// Marks the bundle completed.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::AlreadyFinalized`] on a second terminal
    /// transition.
    pub fn mark_completed(&mut self, at: Timestamp) -> Result<(), EvidenceIoError> {
        self.finalize(BundleStatus::Completed, None, at)
    }

    /// Marks the bundle failed with a non-empty error message.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::AlreadyFinalized`] on a second terminal
    /// transition.
    pub fn mark_failed(
        &mut self,
        error: impl Into<String>,
        at: Timestamp,
    ) -> Result<(), EvidenceIoError> {
        self.finalize(BundleStatus::Failed, Some(non_empty(error.into())), at)
    }

    /// Marks the bundle aborted with a non-empty error message.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::AlreadyFinalized`] on a second terminal
    /// transition.
    pub fn mark_aborted(
        &mut self,
        error: impl Into<String>,
        at: Timestamp,
    ) -> Result<(), EvidenceIoError> {
        self.finalize(BundleStatus::Aborted, Some(non_empty(error.into())), at)
    }

    /// Applies the single permitted terminal transition.
    fn finalize(
        &mut self,
        status: BundleStatus,
        error: Option<String>,
        at: Timestamp,
    ) -> Result<(), EvidenceIoError> {
        if self.manifest.status.is_terminal() {
            return Err(EvidenceIoError::AlreadyFinalized {
                status: self.manifest.status,
            });
        }
        self.manifest.status = status;
        self.manifest.error_message = error;
        self.manifest.finalized_at = Some(at);
        Ok(())
    }
}

// ============================================================================
// SECTION: Shared Recorder
// ============================================================================

/// Single-writer recorder shareable across threads.
///
/// Wraps the recorder in a mutex so append order stays total even when
/// embedders record from multiple threads; poisoning maps to
/// [`EvidenceIoError::Poisoned`].
#[derive(Debug, Clone)]
pub struct SharedRecorder {
    /// Inner recorder protected by a mutex.
    inner: Arc<Mutex<EvidenceRecorder>>,
}

impl SharedRecorder {
    /// Wraps a recorder in a shared, clonable handle.
    #[must_use]
    pub fn from_recorder(recorder: EvidenceRecorder) -> Self {
        Self {
            inner: Arc::new(Mutex::new(recorder)),
        }
    }

    /// Runs a closure against the locked recorder.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::Poisoned`] when the lock is poisoned.
    pub fn with<T>(
        &self,
        f: impl FnOnce(&mut EvidenceRecorder) -> Result<T, EvidenceIoError>,
    ) -> Result<T, EvidenceIoError> {
        let mut guard = self.inner.lock().map_err(|_| EvidenceIoError::Poisoned)?;
        f(&mut guard)
    }

    /// Returns a snapshot of the manifest recorded so far.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::Poisoned`] when the lock is poisoned.
    pub fn manifest_snapshot(&self) -> Result<EvidenceBundleManifest, EvidenceIoError> {
        let guard = self.inner.lock().map_err(|_| EvidenceIoError::Poisoned)?;
        Ok(guard.manifest().clone())
    }
}

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

/// Finds the highest sequence number present in a manifest.
fn highest_seq(manifest: &EvidenceBundleManifest) -> Option<u64> {
    let skipped = manifest.tasks_skipped.iter().map(|record| record.seq);
    let calls = manifest.tool_calls.iter().map(|record| record.seq);
    let artifacts = manifest.artifacts.iter().map(|record| record.seq);
    let tests = manifest.tests_run.iter().map(|record| record.seq);
    let checkpoints = manifest.checkpoints.iter().map(|record| record.seq);
    skipped.chain(calls).chain(artifacts).chain(tests).chain(checkpoints).max()
}

/// Substitutes a placeholder for empty terminal error messages.
fn non_empty(error: String) -> String {
    if error.trim().is_empty() {
        "unspecified failure".to_string()
    } else {
        error
    }
}

/// Re-hashes a manifest's artifacts against a root directory.
pub(crate) fn validate_manifest_artifacts(
    manifest: &EvidenceBundleManifest,
    root: &Path,
) -> Vec<ArtifactFailure> {
    let mut failures = Vec::new();
    for artifact in &manifest.artifacts {
        let full = root.join(&artifact.path);
        match std::fs::read(&full) {
            Ok(bytes) => {
                let rehash = hash_bytes(artifact.hash.algorithm, &bytes);
                if rehash != artifact.hash {
                    failures.push(ArtifactFailure {
                        path: artifact.path.clone(),
                        detail: "content hash mismatch".to_string(),
                    });
                }
            }
            Err(source) => {
                failures.push(ArtifactFailure {
                    path: artifact.path.clone(),
                    detail: format!("unreadable artifact: {source}"),
                });
            }
        }
    }
    failures
}
