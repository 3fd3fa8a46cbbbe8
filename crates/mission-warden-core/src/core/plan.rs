// crates/mission-warden-core/src/core/plan.rs
// ============================================================================
// Module: Mission Warden Execution Plans
// Description: Compiled, deterministically ordered task graphs.
// Purpose: Provide the stable plan schema walked by the dispatcher.
// Dependencies: crate::core::{hashing, identifiers, mandate, mission}, serde
// ============================================================================

//! ## Overview
//! An execution plan is the compiler's output: loop-expanded tasks in
//! topological order with the deterministic tie-break applied, each node
//! carrying its resolved agent identity, dependencies, risk tier, and any
//! attached gate. Identical (document, seed) inputs compile to byte-identical
//! plans, so the canonical form is the basis for dry-run diffing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::identifiers::AgentHandle;
use crate::core::identifiers::CanonicalAgentId;
use crate::core::identifiers::GateId;
use crate::core::identifiers::MissionId;
use crate::core::identifiers::TaskId;
use crate::core::identifiers::TemplateTaskId;
use crate::core::identifiers::ToolName;
use crate::core::mandate::RiskTier;
use crate::core::mission::GateAction;
use crate::core::mission::GateCondition;

// ============================================================================
// SECTION: Execution Plan
// ============================================================================

/// Deterministic, ordered task graph produced by compilation.
///
/// # Invariants
/// - `tasks` is in topological order; ties broken by (source order, derived
///   task id), never by unordered iteration.
/// - Every dependency id references an earlier entry in `tasks`.
/// - `document_hash` is the canonical hash of the source mission document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Mission identifier from the source document.
    pub mission_id: MissionId,
    /// Seed the derived task identifiers were generated from.
    pub seed: u64,
    /// Canonical hash of the source mission document.
    pub document_hash: HashDigest,
    /// Planned tasks in execution order.
    pub tasks: Vec<PlannedTask>,
}

impl ExecutionPlan {
    /// Returns the canonical byte form of the plan (RFC 8785).
    ///
    /// Two compilations of identical inputs produce identical bytes; hosts
    /// diff this form between dry-run and execution for audit.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, HashError> {
        crate::core::hashing::canonical_json_bytes(self)
    }

    /// Computes the canonical hash of the plan.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn content_hash(&self) -> Result<HashDigest, HashError> {
        crate::core::hashing::hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }

    /// Computes the canonical hash using a specific algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn content_hash_with(&self, algorithm: HashAlgorithm) -> Result<HashDigest, HashError> {
        crate::core::hashing::hash_canonical_json(algorithm, self)
    }

    /// Looks up a planned task by derived identifier.
    #[must_use]
    pub fn task(&self, task_id: &TaskId) -> Option<&PlannedTask> {
        self.tasks.iter().find(|task| task.task_id == *task_id)
    }

    /// Returns the number of planned tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true when the plan contains no tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

// ============================================================================
// SECTION: Planned Tasks
// ============================================================================

/// One node of an execution plan.
///
/// # Invariants
/// - `depends_on` holds derived identifiers resolved against the expanded
///   graph, not declared template identifiers.
/// - `position` equals the node's index within [`ExecutionPlan::tasks`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTask {
    /// Derived task identifier (declared id for non-loop tasks).
    pub task_id: TaskId,
    /// Declared template identifier this node expanded from.
    pub template_id: TemplateTaskId,
    /// Loop iteration index when the node came from a loop expansion.
    pub iteration: Option<u32>,
    /// Agent handle exactly as declared in the document.
    pub agent_handle: AgentHandle,
    /// Canonical agent identity resolved at compile time.
    pub agent: CanonicalAgentId,
    /// Task inputs with loop bindings applied.
    pub inputs: Map<String, Value>,
    /// Derived identifiers of tasks that must execute first.
    pub depends_on: Vec<TaskId>,
    /// Declared risk tier.
    pub risk_tier: RiskTier,
    /// External tool the task declared, lifted for policy evaluation.
    pub required_tool: Option<ToolName>,
    /// Declared position within the source document.
    pub source_order: usize,
    /// Position within the topological order.
    pub position: usize,
    /// Gate attached to this node, if any.
    pub gate: Option<PlannedGate>,
}

/// Gate recorded on a plan node.
///
/// Execution semantics belong to the dispatcher; the compiler only records
/// the condition and failure action here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedGate {
    /// Declared gate identifier, when the document assigned one.
    pub id: Option<GateId>,
    /// Condition evaluated after the guarded task executes.
    pub condition: GateCondition,
    /// Action applied when the gate fails.
    pub on_failure: GateAction,
}
