// crates/mission-warden-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for bounded reads, locale resolution, approval
//              polling, and the scripted invoker in the CLI entry point.
// Purpose: Ensure CLI input handling fails closed and stays deterministic.
// Dependencies: mission-warden-cli main helpers
// ============================================================================

//! ## Overview
//! Validates `read_bytes_with_limit` enforces size limits, locale and
//! timestamp resolution reject bad inputs, the mandate approval poll honors
//! its window, and the scripted invoker replays outcomes deterministically.
//!
//! Security posture: CLI inputs are untrusted; limits must fail closed.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use mission_warden_core::CanonicalAgentId;
use mission_warden_core::MissionId;
use mission_warden_core::hash_bytes;
use serde_json::Map;
use serde_json::json;

use super::AgentInvocationError;
use super::AgentInvoker;
use super::ExecutionPlan;
use super::HashAlgorithm;
use super::HashDigest;
use super::InvocationRequest;
use super::InvocationScript;
use super::LangArg;
use super::Locale;
use super::ReadLimitError;
use super::ScriptEntry;
use super::ScriptedInvoker;
use super::TaskId;
use super::Timestamp;
use super::VerificationReport;
use super::VerificationStatus;
use super::VerifyFormat;
use super::format_hash_digest;
use super::format_task_list;
use super::poll_mandate_approval;
use super::read_bytes_with_limit;
use super::render_verification_report;
use super::resolve_bundle_id;
use super::resolve_executed_at;
use super::resolve_locale;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn temp_file(label: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).expect("clock drift").as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("mission-warden-cli-{label}-{nanos}.bin"));
    path
}

fn cleanup(path: &PathBuf) {
    let _ = fs::remove_file(path);
}

fn empty_plan() -> ExecutionPlan {
    ExecutionPlan {
        mission_id: MissionId::new("mission-alpha"),
        seed: 7,
        document_hash: HashDigest::new(HashAlgorithm::Sha256, b"document"),
        tasks: Vec::new(),
    }
}

fn request_for(task_id: &str) -> InvocationRequest {
    InvocationRequest {
        agent: CanonicalAgentId::new("bob"),
        task_id: TaskId::new(task_id),
        inputs: Map::new(),
        timeout_ms: 1_000,
    }
}

fn write_mandate_file(path: &Path, approval_status: &str) {
    let mandate = json!({
        "intent": "ship release",
        "risk_tier": "R3",
        "approval_status": approval_status,
    });
    let bytes = serde_json::to_vec(&mandate).expect("serialize mandate");
    fs::write(path, bytes).expect("write mandate file");
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let path = temp_file("io-small");
    fs::write(&path, b"ok").expect("write small file");

    let bytes = read_bytes_with_limit(&path, 16).expect("read small file");
    assert_eq!(bytes, b"ok");

    cleanup(&path);
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let path = temp_file("io-large");
    let limit = 8_usize;
    let payload = vec![0_u8; limit + 1];
    fs::write(&path, payload).expect("write large file");

    let err = read_bytes_with_limit(&path, limit).expect_err("expected size limit failure");
    match err {
        ReadLimitError::TooLarge {
            size,
            limit: reported,
        } => {
            let limit_u64 = u64::try_from(limit).expect("limit fits");
            assert!(size > limit_u64);
            assert_eq!(reported, limit);
        }
        ReadLimitError::Io(err) => panic!("unexpected IO error: {err}"),
    }

    cleanup(&path);
}

#[test]
fn resolve_locale_prefers_flag_over_env() {
    let locale = resolve_locale(Some(LangArg::Ca), Some("en")).expect("resolve locale");
    assert_eq!(locale, Locale::Ca);
}

#[test]
fn resolve_locale_parses_env_value() {
    let locale = resolve_locale(None, Some("ca_ES")).expect("resolve locale");
    assert_eq!(locale, Locale::Ca);
}

#[test]
fn resolve_locale_rejects_invalid_env() {
    let err = resolve_locale(None, Some("tlh")).expect_err("expected invalid locale");
    assert!(err.to_string().contains("MISSION_WARDEN_LANG"));
}

#[test]
fn resolve_locale_defaults_to_english() {
    let locale = resolve_locale(None, None).expect("resolve locale");
    assert_eq!(locale, Locale::En);
}

#[test]
fn resolve_executed_at_accepts_override() {
    let at = resolve_executed_at(Some(5)).expect("resolve timestamp");
    assert_eq!(at, Timestamp::UnixMillis(5));
}

#[test]
fn resolve_executed_at_rejects_negative_override() {
    let err = resolve_executed_at(Some(-1)).expect_err("expected negative rejection");
    assert!(err.to_string().contains("non-negative"));
}

#[test]
fn resolve_bundle_id_prefers_override() {
    let plan = empty_plan();
    let bundle_id =
        resolve_bundle_id(Some("bundle-custom".to_string()), &plan).expect("resolve bundle id");
    assert_eq!(bundle_id.as_str(), "bundle-custom");
}

#[test]
fn resolve_bundle_id_derives_deterministic_id() {
    let plan = empty_plan();
    let first = resolve_bundle_id(None, &plan).expect("derive bundle id");
    let second = resolve_bundle_id(None, &plan).expect("derive bundle id");
    assert_eq!(first, second);
    assert!(first.as_str().starts_with("mission-alpha-"));
}

#[test]
fn poll_mandate_approval_requires_a_path_and_window() {
    let path = temp_file("poll-unconfigured");
    write_mandate_file(&path, "approved");

    assert!(!poll_mandate_approval(None, Some(1_000)).expect("no path"));
    assert!(!poll_mandate_approval(Some(path.as_path()), None).expect("no window"));
    assert!(!poll_mandate_approval(Some(path.as_path()), Some(0)).expect("zero window"));

    cleanup(&path);
}

#[test]
fn poll_mandate_approval_detects_an_existing_grant() {
    let path = temp_file("poll-approved");
    write_mandate_file(&path, "approved");

    let start = Instant::now();
    let approved = poll_mandate_approval(Some(path.as_path()), Some(10_000)).expect("poll");
    assert!(approved);
    assert!(start.elapsed() < Duration::from_secs(5), "first poll should grant without waiting");

    cleanup(&path);
}

#[test]
fn poll_mandate_approval_times_out_while_pending() {
    let path = temp_file("poll-pending");
    write_mandate_file(&path, "pending");

    let approved = poll_mandate_approval(Some(path.as_path()), Some(40)).expect("poll");
    assert!(!approved);

    cleanup(&path);
}

#[test]
fn poll_mandate_approval_stops_early_on_rejection() {
    let path = temp_file("poll-rejected");
    write_mandate_file(&path, "rejected");

    let start = Instant::now();
    let approved = poll_mandate_approval(Some(path.as_path()), Some(10_000)).expect("poll");
    assert!(!approved);
    assert!(start.elapsed() < Duration::from_secs(5), "rejection should end the wait early");

    cleanup(&path);
}

#[test]
fn poll_mandate_approval_observes_a_grant_during_the_wait() {
    let path = temp_file("poll-flip");
    write_mandate_file(&path, "pending");

    let approver_path = path.clone();
    let approver = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        write_mandate_file(&approver_path, "approved");
    });

    let approved = poll_mandate_approval(Some(path.as_path()), Some(10_000)).expect("poll");
    assert!(approved);

    approver.join().expect("approver thread");
    cleanup(&path);
}

#[test]
fn poll_mandate_approval_tolerates_unreadable_polls() {
    let path = temp_file("poll-torn");
    fs::write(&path, b"{half a mandate").expect("write torn file");

    let approved = poll_mandate_approval(Some(path.as_path()), Some(40)).expect("poll");
    assert!(!approved);

    cleanup(&path);
}

#[test]
fn scripted_invoker_replays_failures_then_succeeds() {
    let mut responses = BTreeMap::new();
    responses.insert(
        "task-1".to_string(),
        ScriptEntry {
            output: json!({"ok": true}),
            duration_ms: 5,
            cost: Some(2),
            tests: Vec::new(),
            artifacts: Vec::new(),
            fail_attempts: 1,
            error: Some("flaky".to_string()),
        },
    );
    let script = InvocationScript {
        responses,
        approve_on_suspend: false,
    };
    let invoker = ScriptedInvoker::new(&script);
    let request = request_for("task-1");

    let err = invoker.invoke(&request).expect_err("first attempt fails");
    match err {
        AgentInvocationError::Failed(message) => assert_eq!(message, "flaky"),
        AgentInvocationError::Timeout {
            timeout_ms,
        } => panic!("unexpected timeout after {timeout_ms} ms"),
    }

    let outcome = invoker.invoke(&request).expect("second attempt succeeds");
    assert_eq!(outcome.output, json!({"ok": true}));
    assert_eq!(outcome.duration_ms, 5);
    assert_eq!(outcome.cost, Some(2));
}

#[test]
fn scripted_invoker_defaults_unlisted_tasks() {
    let script = InvocationScript::default();
    let invoker = ScriptedInvoker::new(&script);

    let outcome = invoker.invoke(&request_for("task-9")).expect("default outcome");
    assert!(outcome.output.is_null());
    assert_eq!(outcome.duration_ms, 0);
    assert!(outcome.tests.is_empty());
}

#[test]
fn invocation_script_rejects_unknown_fields() {
    let value = json!({"responses": {}, "surprise": 1});
    let result: Result<InvocationScript, _> = serde_json::from_value(value);
    assert!(result.is_err(), "unknown script fields must fail closed");
}

#[test]
fn render_verification_report_markdown_lists_errors() {
    let report = VerificationReport {
        status: VerificationStatus::Fail,
        checked_artifacts: 3,
        errors: vec!["artifact notes.txt hash mismatch".to_string()],
    };

    let output =
        render_verification_report(VerifyFormat::Markdown, &report).expect("render markdown");
    assert!(output.contains("- Status: fail"));
    assert!(output.contains("- Checked artifacts: 3"));
    assert!(output.contains("- artifact notes.txt hash mismatch"));
}

#[test]
fn render_verification_report_json_is_canonical() {
    let report = VerificationReport {
        status: VerificationStatus::Pass,
        checked_artifacts: 0,
        errors: Vec::new(),
    };

    let output = render_verification_report(VerifyFormat::Json, &report).expect("render json");
    assert_eq!(output, r#"{"checked_artifacts":0,"errors":[],"status":"pass"}"#);
}

#[test]
fn format_task_list_joins_ids() {
    let tasks = vec![TaskId::new("a"), TaskId::new("b")];
    assert_eq!(format_task_list(&tasks), "a, b");
}

#[test]
fn format_hash_digest_prefixes_algorithm() {
    let digest = hash_bytes(HashAlgorithm::Sha256, b"payload");
    let formatted = format_hash_digest(&digest);
    assert!(formatted.starts_with("sha256:"));
    assert_eq!(formatted.len(), "sha256:".len() + 64);
}
