// crates/mission-warden-core/src/runtime/mod.rs
// ============================================================================
// Module: Mission Warden Runtime
// Description: Dispatcher, evidence recorder, bundle stores, and verifier.
// Purpose: Execute compiled plans against agents and persist their evidence.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules drive compiled missions through the dispatch loop, record
//! every observable step into evidence bundles, persist bundles behind the
//! store seam, and replay integrity checks over stored bundles. All outer
//! surfaces call into the same dispatcher logic to preserve invariance.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod dispatcher;
pub mod recorder;
pub mod store;
pub mod verifier;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use dispatcher::DEFAULT_MAX_RETRIES;
pub use dispatcher::DEFAULT_PARALLELISM;
pub use dispatcher::DEFAULT_TIMEOUT_MS;
pub use dispatcher::DispatchError;
pub use dispatcher::DispatchOutcome;
pub use dispatcher::Dispatcher;
pub use dispatcher::DispatcherConfig;
pub use dispatcher::SKIP_DEPENDENCY_NOT_SATISFIED;
pub use dispatcher::SKIP_MISSION_ABORTED;
pub use dispatcher::SKIP_MISSION_CANCELLED;
pub use dispatcher::SKIP_REMAINING;
pub use dispatcher::UPSTREAM_INPUT_KEY;
pub use recorder::ArtifactFailure;
pub use recorder::EvidenceRecorder;
pub use recorder::SharedRecorder;
pub use recorder::ToolCallEvent;
pub use store::FsBundleStore;
pub use store::InMemoryBundleStore;
pub use store::MANIFEST_FILE_NAME;
pub use store::SharedBundleStore;
pub use verifier::BundleVerifier;
pub use verifier::VerificationReport;
pub use verifier::VerificationStatus;
