// crates/mission-warden-core/src/core/evidence.rs
// ============================================================================
// Module: Mission Warden Evidence Bundles
// Description: Evidence bundle manifest schema and record types.
// Purpose: Define the tamper-checkable audit record of one mission run.
// Dependencies: crate::core::{hashing, identifiers, mandate, time}, serde, thiserror
// ============================================================================

//! ## Overview
//! An evidence bundle is the audit record of one dispatcher run: planned,
//! executed, and skipped tasks, every tool-call attempt with input and output
//! hashes, recorded artifacts, unit test results, and typed checkpoints. Each
//! record carries a monotone `seq` assigned by the recorder, so total event
//! order survives persistence. The manifest is owned by exactly one run and
//! written as canonical JSON; loading fails closed on unknown versions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::identifiers::BundleId;
use crate::core::identifiers::CallId;
use crate::core::identifiers::CanonicalAgentId;
use crate::core::identifiers::MissionId;
use crate::core::identifiers::PipelineRunId;
use crate::core::identifiers::TaskId;
use crate::core::identifiers::ToolName;
use crate::core::mandate::Mandate;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Manifest schema version written by this crate.
pub const MANIFEST_VERSION: &str = "v1";

// ============================================================================
// SECTION: Bundle Status
// ============================================================================

/// Lifecycle status of an evidence bundle.
///
/// # Invariants
///
/// - Transitions are monotone: `InProgress` moves to exactly one terminal
///   state and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    /// The run is still recording.
    InProgress,
    /// The run finished; every non-skipped task succeeded.
    Completed,
    /// The run finished with a failure.
    Failed,
    /// The run was cancelled before finishing.
    Aborted,
}

impl BundleStatus {
    /// Returns the status as its serialized string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Aborted => "aborted",
        }
    }

    /// Returns true for `Completed`, `Failed`, and `Aborted`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl fmt::Display for BundleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Manifest Records
// ============================================================================

/// A task skipped without execution, with the reason recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkippedTask {
    /// Monotone sequence number within the bundle.
    pub seq: u64,
    /// Derived identifier of the skipped task.
    pub task_id: TaskId,
    /// Why the task did not run.
    pub reason: String,
}

/// One external agent invocation attempt.
///
/// Every attempt is recorded, including retries that later succeed; the
/// input and output hashes allow offline integrity checks without replaying
/// the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCallRecord {
    /// Monotone sequence number within the bundle.
    pub seq: u64,
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
    /// When the attempt was recorded.
    pub at: Timestamp,
}

/// A file artifact attested at recording time.
///
/// The hash is computed when the artifact is added and never refreshed;
/// later mutation of the file is exactly what `validate_artifacts` detects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactRecord {
    /// Monotone sequence number within the bundle.
    pub seq: u64,
    /// Task that produced the artifact, when known.
    pub task_id: Option<TaskId>,
    /// Artifact path as recorded.
    pub path: String,
    /// File size at recording time.
    pub size_bytes: u64,
    /// Content hash at recording time.
    pub hash: HashDigest,
    /// When the artifact was recorded.
    pub at: Timestamp,
}

/// One unit test result reported by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitTestRecord {
    /// Monotone sequence number within the bundle.
    pub seq: u64,
    /// Task the test ran under, when known.
    pub task_id: Option<TaskId>,
    /// Test name as reported.
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Test duration as reported.
    pub duration_ms: u64,
    /// When the result was recorded.
    pub at: Timestamp,
}

/// Typed checkpoint kinds recorded during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointKind {
    /// The mission compiled; the message carries the plan hash.
    MissionCompiled,
    /// A task was parked awaiting approval.
    TaskSuspended,
    /// A previously suspended task re-entered evaluation.
    TaskResumed,
    /// A failed attempt is being retried.
    TaskRetried,
    /// A legacy alias was used for an agent reference.
    AliasDeprecated,
    /// The run was asked to cancel.
    CancellationRequested,
    /// Cumulative spend passed the mandate budget.
    BudgetExhausted,
}

/// A typed checkpoint with free-text detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckpointRecord {
    /// Monotone sequence number within the bundle.
    pub seq: u64,
    /// What kind of event this marks.
    pub kind: CheckpointKind,
    /// Task the checkpoint concerns, when any.
    pub task_id: Option<TaskId>,
    /// Free-text detail.
    pub message: String,
    /// When the checkpoint was recorded.
    pub at: Timestamp,
}

// ============================================================================
// SECTION: Manifest
// ============================================================================

/// The persisted audit record of one mission run.
///
/// # Invariants
///
/// - Owned by exactly one dispatcher run while `InProgress`.
/// - Record lists are append-only; `seq` values are unique and increasing
///   across all record types in one bundle.
/// - `mandate_snapshot` is frozen at creation and never tracks later
///   approval-state changes.
/// - `error_message` is non-empty whenever `status` is `Failed` or `Aborted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvidenceBundleManifest {
    /// Manifest schema version; checked fail-closed on load.
    pub manifest_version: String,
    /// Bundle identifier; names the storage directory.
    pub bundle_id: BundleId,
    /// Mission the bundle records, when the run had one.
    pub mission_id: Option<MissionId>,
    /// Pipeline run correlation identifier, when supplied by the host.
    pub pipeline_run_id: Option<PipelineRunId>,
    /// When recording started.
    pub created_at: Timestamp,
    /// When the bundle reached a terminal status.
    pub finalized_at: Option<Timestamp>,
    /// Mandate in force at creation, copied and never mutated after.
    pub mandate_snapshot: Option<Mandate>,
    /// Current lifecycle status.
    pub status: BundleStatus,
    /// Terminal error message for failed or aborted runs.
    pub error_message: Option<String>,
    /// Derived identifiers of every planned task, in plan order.
    pub tasks_planned: Vec<TaskId>,
    /// Tasks that executed successfully, in completion order.
    pub tasks_executed: Vec<TaskId>,
    /// Tasks skipped without execution, with reasons.
    pub tasks_skipped: Vec<SkippedTask>,
    /// Canonical agents invoked, each once, in first-invocation order.
    pub agents_invoked: Vec<CanonicalAgentId>,
    /// Every agent invocation attempt.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Attested file artifacts.
    pub artifacts: Vec<ArtifactRecord>,
    /// Unit test results reported by agents.
    pub tests_run: Vec<UnitTestRecord>,
    /// Typed checkpoints.
    pub checkpoints: Vec<CheckpointRecord>,
}

impl EvidenceBundleManifest {
    /// Creates an empty in-progress manifest.
    #[must_use]
    pub fn new(
        bundle_id: BundleId,
        mission_id: Option<MissionId>,
        pipeline_run_id: Option<PipelineRunId>,
        mandate_snapshot: Option<Mandate>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            manifest_version: MANIFEST_VERSION.to_string(),
            bundle_id,
            mission_id,
            pipeline_run_id,
            created_at,
            finalized_at: None,
            mandate_snapshot,
            status: BundleStatus::InProgress,
            error_message: None,
            tasks_planned: Vec::new(),
            tasks_executed: Vec::new(),
            tasks_skipped: Vec::new(),
            agents_invoked: Vec::new(),
            tool_calls: Vec::new(),
            artifacts: Vec::new(),
            tests_run: Vec::new(),
            checkpoints: Vec::new(),
        }
    }

    /// Returns true once the bundle reached a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Returns the canonical byte form of the manifest (RFC 8785).
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, HashError> {
        crate::core::hashing::canonical_json_bytes(self)
    }

    /// Computes the canonical hash of the manifest.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn content_hash(&self) -> Result<HashDigest, HashError> {
        crate::core::hashing::hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Evidence recording and persistence failures.
///
/// Fatal to the run wherever persistence is involved: an unrecorded run must
/// never be reported successful.
#[derive(Debug, Error)]
pub enum EvidenceIoError {
    /// Reading or writing bundle storage failed.
    #[error("evidence io failure at {path}: {source}")]
    Io {
        /// Path involved in the failure.
        path: String,
        /// Underlying io error.
        #[source]
        source: std::io::Error,
    },
    /// A stored manifest could not be parsed.
    #[error("malformed manifest at {path}: {source}")]
    Parse {
        /// Path of the malformed manifest.
        path: String,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
    /// The manifest could not be rendered as canonical JSON.
    #[error("manifest canonicalization failed: {0}")]
    Canonicalize(String),
    /// A stored manifest declares a version this crate does not read.
    #[error("unsupported manifest version {found}, expected {expected}")]
    VersionMismatch {
        /// Version string found in storage.
        found: String,
        /// Version this crate reads.
        expected: String,
    },
    /// No stored bundle exists under the requested identifier.
    #[error("no stored bundle: {bundle_id}")]
    NotFound {
        /// The missing bundle identifier.
        bundle_id: String,
    },
    /// An append was attempted after the bundle reached a terminal status.
    #[error("bundle is sealed with status {status}")]
    BundleSealed {
        /// Terminal status the bundle already holds.
        status: BundleStatus,
    },
    /// A second terminal transition was attempted.
    #[error("bundle already finalized as {status}")]
    AlreadyFinalized {
        /// Terminal status the bundle already holds.
        status: BundleStatus,
    },
    /// A shared recorder or store lock was poisoned by a panicking writer.
    #[error("evidence lock poisoned")]
    Poisoned,
}
