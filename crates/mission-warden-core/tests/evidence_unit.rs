// crates/mission-warden-core/tests/evidence_unit.rs
// ============================================================================
// Module: Evidence Bundle Tests
// Description: Validates the recorder, bundle stores, and offline verifier.
// Purpose: Ensure bundles stay append-only, hashed, and fail closed on load.
// Dependencies: mission-warden-core, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Exercises the evidence layer: sequence numbering, record deduplication,
//! artifact attestation against a tempdir, the single terminal transition,
//! filesystem and in-memory stores, and verifier failure modes.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::fs;

use mission_warden_core::BundleId;
use mission_warden_core::BundleStatus;
use mission_warden_core::BundleStore;
use mission_warden_core::BundleVerifier;
use mission_warden_core::CallId;
use mission_warden_core::CanonicalAgentId;
use mission_warden_core::CheckpointKind;
use mission_warden_core::DEFAULT_HASH_ALGORITHM;
use mission_warden_core::EvidenceBundleManifest;
use mission_warden_core::EvidenceIoError;
use mission_warden_core::EvidenceRecorder;
use mission_warden_core::FsBundleStore;
use mission_warden_core::InMemoryBundleStore;
use mission_warden_core::MANIFEST_FILE_NAME;
use mission_warden_core::MANIFEST_VERSION;
use mission_warden_core::MissionId;
use mission_warden_core::ReportedTest;
use mission_warden_core::SkippedTask;
use mission_warden_core::TaskId;
use mission_warden_core::Timestamp;
use mission_warden_core::ToolCallEvent;
use mission_warden_core::VerificationStatus;
use mission_warden_core::hash_bytes;
use serde_json::Value;
use tempfile::TempDir;

// ============================================================================
// SECTION: Test Fixtures
// ============================================================================

const AT: Timestamp = Timestamp::Logical(7);

fn manifest() -> EvidenceBundleManifest {
    EvidenceBundleManifest::new(
        BundleId::new("bundle-1"),
        Some(MissionId::new("mission-alpha")),
        None,
        None,
        Timestamp::Logical(0),
    )
}

fn recorder() -> EvidenceRecorder {
    EvidenceRecorder::new(manifest())
}

fn call_event(attempt: u32) -> ToolCallEvent {
    ToolCallEvent {
        call_id: CallId::new(format!("call-{attempt}")),
        task_id: TaskId::new("build"),
        agent: CanonicalAgentId::new("iam-dev"),
        tool: None,
        attempt,
        input_hash: hash_bytes(DEFAULT_HASH_ALGORITHM, b"inputs"),
        output_hash: None,
        success: true,
        error: None,
        duration_ms: 4,
        at: AT,
    }
}

fn passing_test(name: &str) -> ReportedTest {
    ReportedTest {
        name: name.to_string(),
        passed: true,
        duration_ms: 2,
    }
}

// ============================================================================
// SECTION: Sequencing and Deduplication
// ============================================================================

#[test]
fn sequence_numbers_are_monotone_across_record_kinds() {
    let mut recorder = recorder();
    recorder.record_task_skipped(TaskId::new("a"), "reason").expect("skip");
    let call_seq = recorder.record_tool_call(call_event(1)).expect("call");
    recorder.record_test(Some(TaskId::new("a")), &passing_test("unit"), AT).expect("test");
    recorder.record_checkpoint(CheckpointKind::MissionCompiled, None, "plan hash x", AT)
        .expect("checkpoint");

    let manifest = recorder.manifest();
    assert_eq!(manifest.tasks_skipped[0].seq, 0);
    assert_eq!(call_seq, 1);
    assert_eq!(manifest.tool_calls[0].seq, 1);
    assert_eq!(manifest.tests_run[0].seq, 2);
    assert_eq!(manifest.checkpoints[0].seq, 3);
}

#[test]
fn planned_executed_and_agent_records_deduplicate() {
    let mut recorder = recorder();
    recorder.record_task_planned(TaskId::new("build")).expect("planned");
    recorder.record_task_planned(TaskId::new("build")).expect("planned again");
    recorder.record_task_executed(TaskId::new("build")).expect("executed");
    recorder.record_task_executed(TaskId::new("build")).expect("executed again");
    recorder.record_agent_invoked(&CanonicalAgentId::new("iam-dev")).expect("agent");
    recorder.record_agent_invoked(&CanonicalAgentId::new("iam-dev")).expect("agent again");

    let manifest = recorder.manifest();
    assert_eq!(manifest.tasks_planned.len(), 1);
    assert_eq!(manifest.tasks_executed.len(), 1);
    assert_eq!(manifest.agents_invoked.len(), 1);
}

#[test]
fn sequence_resumes_after_the_highest_stored_record() {
    let mut first = recorder();
    first.record_task_skipped(TaskId::new("a"), "reason").expect("skip");
    first.record_checkpoint(CheckpointKind::MissionCompiled, None, "plan hash x", AT)
        .expect("checkpoint");

    let mut resumed = EvidenceRecorder::new(first.into_manifest());
    resumed.record_task_skipped(TaskId::new("b"), "later").expect("skip");
    assert_eq!(resumed.manifest().tasks_skipped[1].seq, 2);
}

// ============================================================================
// SECTION: Artifact Integrity
// ============================================================================

#[test]
fn artifact_hashes_are_immutable_once_recorded() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("out.txt"), b"first").expect("write artifact");

    let mut recorder = recorder();
    let digest = recorder
        .add_artifact_file(Some(TaskId::new("build")), dir.path(), "out.txt", AT)
        .expect("record artifact");
    assert_eq!(digest, hash_bytes(DEFAULT_HASH_ALGORITHM, b"first"));

    fs::write(dir.path().join("out.txt"), b"second").expect("mutate artifact");
    assert_eq!(recorder.manifest().artifacts[0].hash, digest);

    let failures = recorder.validate_artifacts(dir.path());
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, "out.txt");
    assert_eq!(failures[0].detail, "content hash mismatch");
}

#[test]
fn untouched_artifacts_validate_cleanly() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("out.txt"), b"stable").expect("write artifact");

    let mut recorder = recorder();
    recorder.add_artifact_file(None, dir.path(), "out.txt", AT).expect("record artifact");
    assert!(recorder.validate_artifacts(dir.path()).is_empty());
}

#[test]
fn missing_artifacts_fail_validation() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("out.txt"), b"going").expect("write artifact");

    let mut recorder = recorder();
    recorder.add_artifact_file(None, dir.path(), "out.txt", AT).expect("record artifact");
    fs::remove_file(dir.path().join("out.txt")).expect("remove artifact");

    let failures = recorder.validate_artifacts(dir.path());
    assert_eq!(failures.len(), 1);
    assert!(failures[0].detail.starts_with("unreadable artifact"));
}

#[test]
fn artifact_records_capture_size_and_task() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("out.txt"), b"12345").expect("write artifact");

    let mut recorder = recorder();
    recorder
        .add_artifact_file(Some(TaskId::new("build")), dir.path(), "out.txt", AT)
        .expect("record artifact");

    let record = &recorder.manifest().artifacts[0];
    assert_eq!(record.size_bytes, 5);
    assert_eq!(record.task_id, Some(TaskId::new("build")));
    assert_eq!(record.path, "out.txt");
}

// ============================================================================
// SECTION: Terminal Transitions
// ============================================================================

#[test]
fn terminal_bundles_reject_further_appends() {
    let mut recorder = recorder();
    recorder.mark_completed(AT).expect("complete");

    let err = recorder.record_task_skipped(TaskId::new("late"), "too late").unwrap_err();
    assert!(matches!(
        err,
        EvidenceIoError::BundleSealed {
            status: BundleStatus::Completed,
        }
    ));
}

#[test]
fn double_finalization_is_rejected() {
    let mut recorder = recorder();
    recorder.mark_completed(AT).expect("complete");

    let err = recorder.mark_failed("later failure", AT).unwrap_err();
    assert!(matches!(
        err,
        EvidenceIoError::AlreadyFinalized {
            status: BundleStatus::Completed,
        }
    ));
}

#[test]
fn failed_bundles_replace_blank_messages() {
    let mut recorder = recorder();
    recorder.mark_failed("   ", AT).expect("fail");

    let manifest = recorder.manifest();
    assert_eq!(manifest.status, BundleStatus::Failed);
    assert_eq!(manifest.error_message.as_deref(), Some("unspecified failure"));
    assert_eq!(manifest.finalized_at, Some(AT));
}

#[test]
fn aborted_bundles_keep_their_message() {
    let mut recorder = recorder();
    recorder.mark_aborted("mission cancelled", AT).expect("abort");

    let manifest = recorder.manifest();
    assert_eq!(manifest.status, BundleStatus::Aborted);
    assert_eq!(manifest.error_message.as_deref(), Some("mission cancelled"));
}

// ============================================================================
// SECTION: Manifest Hashing
// ============================================================================

#[test]
fn identical_manifests_share_a_content_hash() {
    let hash_a = manifest().content_hash().expect("hash a");
    let hash_b = manifest().content_hash().expect("hash b");
    assert_eq!(hash_a, hash_b);

    let mut recorder = recorder();
    recorder.record_task_planned(TaskId::new("build")).expect("planned");
    let hash_c = recorder.manifest().content_hash().expect("hash c");
    assert_ne!(hash_a, hash_c);
}

// ============================================================================
// SECTION: Bundle Stores
// ============================================================================

#[test]
fn fs_store_round_trips_manifests() {
    let dir = TempDir::new().expect("tempdir");
    let store = FsBundleStore::new(dir.path());
    let manifest = manifest();

    store.save(&manifest).expect("save");
    assert!(store.manifest_path(&manifest.bundle_id).is_file());

    let loaded = store.load(&BundleId::new("bundle-1")).expect("load");
    assert_eq!(loaded, manifest);
}

#[test]
fn fs_store_saves_replace_existing_manifests_without_residue() {
    let dir = TempDir::new().expect("tempdir");
    let store = FsBundleStore::new(dir.path());
    let mut manifest = manifest();
    store.save(&manifest).expect("first save");

    manifest.tasks_planned.push(TaskId::new("build"));
    store.save(&manifest).expect("second save");

    let loaded = store.load(&manifest.bundle_id).expect("load");
    assert_eq!(loaded, manifest);

    let entries: Vec<String> = fs::read_dir(store.bundle_dir(&manifest.bundle_id))
        .expect("read dir")
        .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec![MANIFEST_FILE_NAME.to_string()]);
}

#[test]
fn fs_store_round_trips_one_of_every_record_kind() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("out.txt"), b"bytes").expect("write artifact");

    let mut recorder = recorder();
    recorder.record_task_planned(TaskId::new("build")).expect("planned");
    recorder.record_agent_invoked(&CanonicalAgentId::new("iam-dev")).expect("agent");
    recorder.record_tool_call(call_event(1)).expect("call");
    recorder.record_task_executed(TaskId::new("build")).expect("executed");
    recorder.record_task_skipped(TaskId::new("deploy"), "mandate required").expect("skip");
    recorder.record_test(Some(TaskId::new("build")), &passing_test("unit"), AT).expect("test");
    recorder
        .record_checkpoint(CheckpointKind::MissionCompiled, None, "plan hash x", AT)
        .expect("checkpoint");
    recorder
        .add_artifact_file(Some(TaskId::new("build")), dir.path(), "out.txt", AT)
        .expect("artifact");
    recorder.mark_completed(AT).expect("complete");

    let store = FsBundleStore::new(dir.path().join("bundles"));
    let manifest = recorder.into_manifest();
    store.save(&manifest).expect("save");

    let loaded = store.load(&manifest.bundle_id).expect("load");
    assert_eq!(loaded, manifest);
}

#[test]
fn fs_store_rejects_foreign_manifest_versions() {
    let dir = TempDir::new().expect("tempdir");
    let store = FsBundleStore::new(dir.path());
    let manifest = manifest();
    store.save(&manifest).expect("save");

    let path = store.manifest_path(&manifest.bundle_id);
    let mut raw: Value = serde_json::from_slice(&fs::read(&path).expect("read")).expect("parse");
    raw["manifest_version"] = Value::String("v9".to_string());
    fs::write(&path, serde_json::to_vec(&raw).expect("serialize")).expect("rewrite");

    let err = store.load(&manifest.bundle_id).unwrap_err();
    assert!(matches!(
        err,
        EvidenceIoError::VersionMismatch { found, expected }
            if found == "v9" && expected == MANIFEST_VERSION
    ));
}

#[test]
fn fs_store_misses_report_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let store = FsBundleStore::new(dir.path());
    let err = store.load(&BundleId::new("ghost")).unwrap_err();
    assert!(matches!(err, EvidenceIoError::NotFound { bundle_id } if bundle_id == "ghost"));
}

#[test]
fn in_memory_store_round_trips_manifests() {
    let store = InMemoryBundleStore::new();
    let manifest = manifest();
    store.save(&manifest).expect("save");

    let loaded = store.load(&BundleId::new("bundle-1")).expect("load");
    assert_eq!(loaded, manifest);

    let err = store.load(&BundleId::new("ghost")).unwrap_err();
    assert!(matches!(err, EvidenceIoError::NotFound { .. }));
}

// ============================================================================
// SECTION: Verifier
// ============================================================================

#[test]
fn verifier_passes_clean_bundles() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("out.txt"), b"stable").expect("write artifact");

    let mut recorder = recorder();
    recorder.add_artifact_file(None, dir.path(), "out.txt", AT).expect("record artifact");
    recorder.mark_completed(AT).expect("complete");

    let report = BundleVerifier::new().verify_manifest(recorder.manifest(), dir.path());
    assert_eq!(report.status, VerificationStatus::Pass);
    assert_eq!(report.checked_artifacts, 1);
    assert!(report.errors.is_empty());
}

#[test]
fn verifier_flags_tampered_artifacts() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("out.txt"), b"original").expect("write artifact");

    let mut recorder = recorder();
    recorder.add_artifact_file(None, dir.path(), "out.txt", AT).expect("record artifact");
    recorder.mark_completed(AT).expect("complete");
    fs::write(dir.path().join("out.txt"), b"tampered").expect("tamper");

    let report = BundleVerifier::new().verify_manifest(recorder.manifest(), dir.path());
    assert_eq!(report.status, VerificationStatus::Fail);
    assert_eq!(report.errors, vec!["artifact out.txt: content hash mismatch".to_string()]);
}

#[test]
fn verifier_flags_terminal_bundles_missing_finalization_fields() {
    let dir = TempDir::new().expect("tempdir");
    let mut manifest = manifest();
    manifest.status = BundleStatus::Failed;

    let report = BundleVerifier::new().verify_manifest(&manifest, dir.path());
    assert_eq!(report.status, VerificationStatus::Fail);
    assert!(report.errors.iter().any(|error| error.contains("without an error message")));
    assert!(report.errors.iter().any(|error| error.contains("without finalized_at")));
}

#[test]
fn verifier_flags_duplicate_sequence_numbers() {
    let dir = TempDir::new().expect("tempdir");
    let mut manifest = manifest();
    for task in ["a", "b"] {
        manifest.tasks_skipped.push(SkippedTask {
            seq: 9,
            task_id: TaskId::new(task),
            reason: "test".to_string(),
        });
    }

    let report = BundleVerifier::new().verify_manifest(&manifest, dir.path());
    assert_eq!(report.status, VerificationStatus::Fail);
    assert!(report.errors.iter().any(|error| error.contains("duplicate sequence number 9")));
}

#[test]
fn verify_stored_loads_through_the_store() {
    let dir = TempDir::new().expect("tempdir");
    let store = FsBundleStore::new(dir.path());
    let mut recorder = recorder();
    recorder.mark_completed(AT).expect("complete");
    let manifest = recorder.into_manifest();
    store.save(&manifest).expect("save");

    let report = BundleVerifier::new()
        .verify_stored(&store, &manifest.bundle_id, dir.path())
        .expect("verify stored");
    assert_eq!(report.status, VerificationStatus::Pass);

    let err = BundleVerifier::new()
        .verify_stored(&store, &BundleId::new("ghost"), dir.path())
        .unwrap_err();
    assert!(matches!(err, EvidenceIoError::NotFound { .. }));
}
