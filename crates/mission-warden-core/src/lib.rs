// crates/mission-warden-core/src/lib.rs
// ============================================================================
// Module: Mission Warden Core Library
// Description: Public API surface for the Mission Warden core.
// Purpose: Expose core types, interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Mission Warden core provides deterministic mission compilation, mandate
//! policy gating, resumable dispatch, and tamper-evident evidence bundles for
//! multi-agent pipelines. It is adapter-agnostic and integrates through
//! explicit interfaces rather than embedding into agent frameworks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AgentInvocationError;
pub use interfaces::AgentInvoker;
pub use interfaces::BundleStore;
pub use interfaces::InvocationOutcome;
pub use interfaces::InvocationRequest;
pub use interfaces::MandateError;
pub use interfaces::MandateSource;
pub use interfaces::ReportedTest;
pub use interfaces::SharedMandate;
pub use runtime::BundleVerifier;
pub use runtime::DEFAULT_MAX_RETRIES;
pub use runtime::DEFAULT_PARALLELISM;
pub use runtime::DEFAULT_TIMEOUT_MS;
pub use runtime::DispatchError;
pub use runtime::DispatchOutcome;
pub use runtime::Dispatcher;
pub use runtime::DispatcherConfig;
pub use runtime::EvidenceRecorder;
pub use runtime::FsBundleStore;
pub use runtime::InMemoryBundleStore;
pub use runtime::MANIFEST_FILE_NAME;
pub use runtime::SKIP_DEPENDENCY_NOT_SATISFIED;
pub use runtime::SKIP_MISSION_ABORTED;
pub use runtime::SKIP_MISSION_CANCELLED;
pub use runtime::SKIP_REMAINING;
pub use runtime::SharedBundleStore;
pub use runtime::SharedRecorder;
pub use runtime::ToolCallEvent;
pub use runtime::UPSTREAM_INPUT_KEY;
pub use runtime::VerificationReport;
pub use runtime::VerificationStatus;
