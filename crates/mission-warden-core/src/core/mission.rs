// crates/mission-warden-core/src/core/mission.rs
// ============================================================================
// Module: Mission Warden Mission Documents
// Description: Declarative mission, task, loop, and gate specifications.
// Purpose: Define the canonical mission schema consumed by the compiler.
// Dependencies: crate::core::{hashing, identifiers, mandate}, serde
// ============================================================================

//! ## Overview
//! A mission document declares tasks, their dependency edges, loop constructs,
//! and policy gates, plus a seed for deterministic identifier derivation. The
//! document is the source of truth: it is parsed fail-closed, never mutated,
//! and compiled into an execution plan by [`crate::core::compiler`].

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
use crate::core::identifiers::GateId;
use crate::core::identifiers::MissionId;
use crate::core::identifiers::TemplateTaskId;
use crate::core::identifiers::ToolName;
use crate::core::mandate::RiskTier;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Reserved task input key naming the external tool a task drives.
pub const TOOL_INPUT_KEY: &str = "tool";

/// Reserved task input key receiving the loop element for `over` loops.
pub const LOOP_ITEM_KEY: &str = "item";

/// Reserved task input key receiving the loop iteration index.
pub const LOOP_INDEX_KEY: &str = "index";

// ============================================================================
// SECTION: Mission Document
// ============================================================================

/// Canonical mission document.
///
/// # Invariants
/// - Never mutated after parse; the compiler reads it and derives a plan.
/// - `seed` feeds derived task identifiers, so recompiling the identical
///   document yields byte-identical plans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MissionDocument {
    /// Mission identifier.
    pub mission_id: MissionId,
    /// Seed for deterministic identifier derivation.
    pub seed: u64,
    /// Declared tasks in source order.
    pub tasks: Vec<TaskSpec>,
    /// Policy gates attached to declared tasks.
    #[serde(default)]
    pub gates: Vec<GateSpec>,
}

impl MissionDocument {
    /// Computes the canonical hash of the mission document.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn canonical_hash(&self) -> Result<HashDigest, HashError> {
        crate::core::hashing::hash_canonical_json(DEFAULT_HASH_ALGORITHM, self)
    }

    /// Computes the canonical hash using a specific algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Canonicalization`] when serialization fails.
    pub fn canonical_hash_with(&self, algorithm: HashAlgorithm) -> Result<HashDigest, HashError> {
        crate::core::hashing::hash_canonical_json(algorithm, self)
    }

    /// Returns the gate declared for a task, if any.
    #[must_use]
    pub fn gate_for(&self, task_id: &TemplateTaskId) -> Option<&GateSpec> {
        self.gates.iter().find(|gate| gate.applies_to == *task_id)
    }
}

// ============================================================================
// SECTION: Task Specifications
// ============================================================================

/// Declared task within a mission document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSpec {
    /// Declared task identifier.
    pub id: TemplateTaskId,
    /// Agent handle (canonical id or legacy alias).
    pub agent: AgentHandle,
    /// Task inputs passed to the agent, with reserved keys for tool and loop
    /// bindings.
    #[serde(default)]
    pub inputs: Map<String, Value>,
    /// Tasks that must execute before this one.
    #[serde(default)]
    pub depends_on: Vec<TemplateTaskId>,
    /// Declared risk tier; defaults to the unrestricted tier.
    #[serde(default)]
    pub risk_tier: RiskTier,
    /// Optional loop construct expanded by the compiler.
    #[serde(rename = "loop", default)]
    pub loop_spec: Option<LoopSpec>,
}

impl TaskSpec {
    /// Returns the external tool this task declares via the reserved input key.
    #[must_use]
    pub fn required_tool(&self) -> Option<ToolName> {
        self.inputs
            .get(TOOL_INPUT_KEY)
            .and_then(Value::as_str)
            .map(ToolName::new)
    }
}

/// Loop construct on a task.
///
/// # Invariants
/// - Exactly one of `iterations` or `over` is set; the compiler rejects
///   anything else as a malformed loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopSpec {
    /// Fixed iteration count.
    #[serde(default)]
    pub iterations: Option<u32>,
    /// Elements to iterate over, bound into task inputs per iteration.
    #[serde(default)]
    pub over: Option<Vec<Value>>,
}

// ============================================================================
// SECTION: Gate Specifications
// ============================================================================

/// Policy gate attached to a declared task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateSpec {
    /// Optional gate identifier; must be unique among gates when present.
    #[serde(default)]
    pub id: Option<GateId>,
    /// Declared task the gate guards; for looped tasks, every iteration.
    pub applies_to: TemplateTaskId,
    /// Condition evaluated after the guarded task executes.
    #[serde(default)]
    pub condition: GateCondition,
    /// Action the dispatcher applies when the gate fails.
    #[serde(default)]
    pub on_failure: GateAction,
}

/// Gate condition evaluated by the dispatcher over recorded evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateCondition {
    /// Always holds; the gate exists only to set a failure action.
    #[default]
    Always,
    /// Holds when every unit test recorded for the task passed.
    TestsPass,
    /// Holds when the task recorded at least one artifact.
    ArtifactsRecorded,
}

/// Failure action recorded on the plan and executed by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateAction {
    /// Mark every unfinished task skipped and finalize the run as failed.
    #[default]
    AbortMission,
    /// Mark every unfinished task skipped and finalize the run as completed.
    SkipRemaining,
    /// Skip only the unreachable dependent subtree and keep walking.
    Continue,
}
