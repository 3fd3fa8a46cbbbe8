// crates/mission-warden-core/src/core/mod.rs
// ============================================================================
// Module: Mission Warden Core Types
// Description: Canonical mission schema, compiler, policy, and evidence types.
// Purpose: Provide stable, serializable types for mission plans and bundles.
// Dependencies: serde, serde_jcs, sha2, thiserror
// ============================================================================

//! ## Overview
//! Core modules define the mission document schema, the deterministic
//! compiler that turns documents into execution plans, the policy gate over
//! mandates and risk tiers, and the evidence bundle manifest. These types are
//! the canonical source of truth for every derived surface.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod compiler;
pub mod evidence;
pub mod hashing;
pub mod identifiers;
pub mod identity;
pub mod mandate;
pub mod mission;
pub mod plan;
pub mod policy;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use compiler::CompileError;
pub use compiler::CompiledMission;
pub use compiler::MAX_LOOP_ITERATIONS;
pub use compiler::compile;
pub use evidence::ArtifactRecord;
pub use evidence::BundleStatus;
pub use evidence::CheckpointKind;
pub use evidence::CheckpointRecord;
pub use evidence::EvidenceBundleManifest;
pub use evidence::EvidenceIoError;
pub use evidence::MANIFEST_VERSION;
pub use evidence::SkippedTask;
pub use evidence::ToolCallRecord;
pub use evidence::UnitTestRecord;
pub use hashing::DEFAULT_HASH_ALGORITHM;
pub use hashing::HashAlgorithm;
pub use hashing::HashDigest;
pub use hashing::HashError;
pub use hashing::canonical_json_bytes;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use hashing::short_canonical_hash;
pub use identifiers::AgentHandle;
pub use identifiers::BundleId;
pub use identifiers::CallId;
pub use identifiers::CanonicalAgentId;
pub use identifiers::GateId;
pub use identifiers::MissionId;
pub use identifiers::PipelineRunId;
pub use identifiers::TaskId;
pub use identifiers::TemplateTaskId;
pub use identifiers::ToolName;
pub use identity::AliasTable;
pub use identity::AliasTableBuilder;
pub use identity::AliasTableError;
pub use identity::DeprecationNotice;
pub use identity::IdentityResolver;
pub use identity::Resolution;
pub use identity::UnknownAgentError;
pub use mandate::ApprovalStatus;
pub use mandate::Mandate;
pub use mandate::RiskTier;
pub use mission::GateAction;
pub use mission::GateCondition;
pub use mission::GateSpec;
pub use mission::LOOP_INDEX_KEY;
pub use mission::LOOP_ITEM_KEY;
pub use mission::LoopSpec;
pub use mission::MissionDocument;
pub use mission::TOOL_INPUT_KEY;
pub use mission::TaskSpec;
pub use plan::ExecutionPlan;
pub use plan::PlannedGate;
pub use plan::PlannedTask;
pub use policy::GateDecision;
pub use policy::REASON_APPROVAL_REQUIRED;
pub use policy::REASON_BUDGET_EXHAUSTED;
pub use policy::REASON_MANDATE_REJECTED;
pub use policy::REASON_MANDATE_REQUIRED;
pub use policy::REASON_RISK_TIER_EXCEEDS_MANDATE;
pub use policy::REASON_TOOL_NOT_IN_ALLOWLIST;
pub use policy::SpendLedger;
pub use policy::evaluate_gate;
pub use time::Timestamp;
