// crates/mission-warden-core/src/interfaces/mod.rs
// ============================================================================
// Module: Mission Warden Interfaces
// Description: Boundary contracts for agent invocation, approvals, and storage.
// Purpose: Define the seams where external collaborators plug into dispatch.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces define how the dispatcher reaches the outside world: the agent
//! runtime that executes tasks, the approver-owned mandate, and durable bundle
//! storage. Implementations must fail closed; the dispatcher treats every
//! error here as an observable, recordable event rather than a crash.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::RwLock;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::evidence::EvidenceBundleManifest;
use crate::core::evidence::EvidenceIoError;
use crate::core::identifiers::BundleId;
use crate::core::identifiers::CanonicalAgentId;
use crate::core::identifiers::TaskId;
use crate::core::mandate::ApprovalStatus;
use crate::core::mandate::Mandate;

// ============================================================================
// SECTION: Agent Invocation
// ============================================================================

/// Request handed to the external agent collaborator for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Canonical agent the call is routed to.
    pub agent: CanonicalAgentId,
    /// Derived identifier of the task being executed.
    pub task_id: TaskId,
    /// Effective task inputs, upstream outputs substituted in.
    pub inputs: Map<String, Value>,
    /// Timeout budget for the attempt.
    pub timeout_ms: u64,
}

/// One unit test result reported back by an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportedTest {
    /// Test name as the agent reports it.
    pub name: String,
    /// Whether the test passed.
    pub passed: bool,
    /// Test duration as reported.
    pub duration_ms: u64,
}

/// Successful invocation result reported by the agent collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationOutcome {
    /// Output payload, substituted into dependents' inputs.
    pub output: Value,
    /// Wall-clock duration of the call.
    pub duration_ms: u64,
    /// Cost units the call consumed, when the adapter meters them.
    pub cost: Option<u64>,
    /// Unit test results the agent ran, if any.
    pub tests: Vec<ReportedTest>,
    /// Relative paths of artifacts the agent produced, if any.
    pub artifacts: Vec<String>,
}

impl InvocationOutcome {
    /// Creates an outcome with only the output payload and duration set.
    #[must_use]
    pub const fn new(output: Value, duration_ms: u64) -> Self {
        Self {
            output,
            duration_ms,
            cost: None,
            tests: Vec::new(),
            artifacts: Vec::new(),
        }
    }
}

/// Agent invocation failures.
///
/// Every variant is transient from the dispatcher's point of view and
/// eligible for bounded retry.
#[derive(Debug, Error)]
pub enum AgentInvocationError {
    /// The agent reported a failure.
    #[error("agent invocation failed: {0}")]
    Failed(String),
    /// The attempt exceeded its timeout budget.
    #[error("agent invocation timed out after {timeout_ms} ms")]
    Timeout {
        /// The exhausted timeout budget.
        timeout_ms: u64,
    },
}

/// External agent collaborator boundary.
///
/// The single capability interface per adapter; the dispatcher is agnostic
/// to what stands behind it.
pub trait AgentInvoker {
    /// Executes one invocation attempt.
    ///
    /// # Errors
    ///
    /// Returns [`AgentInvocationError`] when the call fails or times out.
    fn invoke(
        &self,
        request: &InvocationRequest,
    ) -> Result<InvocationOutcome, AgentInvocationError>;
}

// ============================================================================
// SECTION: Mandate Source
// ============================================================================

/// Mandate access failures.
#[derive(Debug, Error)]
pub enum MandateError {
    /// The mandate backend reported an error.
    #[error("mandate source error: {0}")]
    Unavailable(String),
    /// The shared mandate lock was poisoned by a panicking writer.
    #[error("mandate lock poisoned")]
    Poisoned,
}

/// Approval boundary: read access to the mandate in force.
///
/// The dispatcher re-reads the mandate at every gate evaluation instead of
/// caching; only the external approver writes.
pub trait MandateSource {
    /// Returns the mandate currently in force, if any.
    ///
    /// # Errors
    ///
    /// Returns [`MandateError`] when the mandate cannot be read.
    fn current(&self) -> Result<Option<Mandate>, MandateError>;
}

/// In-process mandate shared between the dispatcher and an approver.
///
/// The read half backs [`MandateSource`]; the write half belongs to the
/// approver and is the only way `approval_status` changes mid-run.
#[derive(Debug, Clone, Default)]
pub struct SharedMandate {
    /// The mandate protected by a reader-writer lock.
    inner: Arc<RwLock<Option<Mandate>>>,
}

impl SharedMandate {
    /// Creates a shared mandate holding the given value.
    #[must_use]
    pub fn new(mandate: Option<Mandate>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(mandate)),
        }
    }

    /// Replaces the mandate wholesale.
    ///
    /// # Errors
    ///
    /// Returns [`MandateError::Poisoned`] when the lock is poisoned.
    pub fn replace(&self, mandate: Option<Mandate>) -> Result<(), MandateError> {
        let mut guard = self.inner.write().map_err(|_| MandateError::Poisoned)?;
        *guard = mandate;
        Ok(())
    }

    /// Sets the approval status on the mandate in force.
    ///
    /// # Errors
    ///
    /// Returns [`MandateError::Unavailable`] when no mandate is set and
    /// [`MandateError::Poisoned`] when the lock is poisoned.
    pub fn set_approval(&self, status: ApprovalStatus) -> Result<(), MandateError> {
        let mut guard = self.inner.write().map_err(|_| MandateError::Poisoned)?;
        match guard.as_mut() {
            Some(mandate) => {
                mandate.approval_status = status;
                Ok(())
            }
            None => Err(MandateError::Unavailable("no mandate is set".to_string())),
        }
    }
}

impl MandateSource for SharedMandate {
    fn current(&self) -> Result<Option<Mandate>, MandateError> {
        let guard = self.inner.read().map_err(|_| MandateError::Poisoned)?;
        Ok(guard.clone())
    }
}

// ============================================================================
// SECTION: Bundle Store
// ============================================================================

/// Durable storage boundary for evidence bundles.
pub trait BundleStore {
    /// Persists a manifest under its bundle identifier.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError`] when the manifest cannot be written.
    fn save(&self, manifest: &EvidenceBundleManifest) -> Result<(), EvidenceIoError>;

    /// Loads a stored manifest, enforcing the manifest version.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceIoError::NotFound`] when no bundle exists under the
    /// identifier and [`EvidenceIoError::VersionMismatch`] when the stored
    /// version is not one this crate reads.
    fn load(&self, bundle_id: &BundleId) -> Result<EvidenceBundleManifest, EvidenceIoError>;
}
