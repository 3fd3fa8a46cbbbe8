// crates/mission-warden-core/tests/compiler.rs
// ============================================================================
// Module: Mission Compiler Tests
// Description: Validates mission compilation, loop expansion, and ordering.
// Purpose: Ensure identical documents always compile to identical plans.
// Dependencies: mission-warden-core, serde_json
// ============================================================================

//! ## Overview
//! Exercises the mission compiler end to end: document shape validation,
//! duplicate and dangling reference rejection, cycle reporting, deterministic
//! loop expansion with seed-derived identifiers, and topological ordering
//! with declared-order tie breaks.

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

use mission_warden_core::AgentHandle;
use mission_warden_core::AliasTable;
use mission_warden_core::CompileError;
use mission_warden_core::CompiledMission;
use mission_warden_core::GateAction;
use mission_warden_core::GateCondition;
use mission_warden_core::GateId;
use mission_warden_core::GateSpec;
use mission_warden_core::IdentityResolver;
use mission_warden_core::LOOP_INDEX_KEY;
use mission_warden_core::LOOP_ITEM_KEY;
use mission_warden_core::LoopSpec;
use mission_warden_core::MAX_LOOP_ITERATIONS;
use mission_warden_core::MissionDocument;
use mission_warden_core::MissionId;
use mission_warden_core::RiskTier;
use mission_warden_core::TOOL_INPUT_KEY;
use mission_warden_core::TaskSpec;
use mission_warden_core::TemplateTaskId;
use mission_warden_core::ToolName;
use mission_warden_core::compile;
use serde_json::Map;
use serde_json::json;

// ============================================================================
// SECTION: Test Fixtures
// ============================================================================

fn resolver() -> IdentityResolver {
    IdentityResolver::new(AliasTable::department())
}

fn task(id: &str, agent: &str) -> TaskSpec {
    TaskSpec {
        id: TemplateTaskId::new(id),
        agent: AgentHandle::new(agent),
        inputs: Map::new(),
        depends_on: Vec::new(),
        risk_tier: RiskTier::R0,
        loop_spec: None,
    }
}

fn depends(mut spec: TaskSpec, on: &[&str]) -> TaskSpec {
    spec.depends_on = on.iter().copied().map(TemplateTaskId::new).collect();
    spec
}

fn looped(mut spec: TaskSpec, loop_spec: LoopSpec) -> TaskSpec {
    spec.loop_spec = Some(loop_spec);
    spec
}

fn iterations(count: u32) -> LoopSpec {
    LoopSpec {
        iterations: Some(count),
        over: None,
    }
}

fn document(tasks: Vec<TaskSpec>) -> MissionDocument {
    MissionDocument {
        mission_id: MissionId::new("mission-alpha"),
        seed: 42,
        tasks,
        gates: Vec::new(),
    }
}

fn plan_order(document: &MissionDocument) -> Vec<String> {
    let compiled = compile(document, &resolver()).expect("compile");
    compiled.plan.tasks.iter().map(|node| node.task_id.to_string()).collect()
}

// ============================================================================
// SECTION: Determinism
// ============================================================================

#[test]
fn identical_documents_compile_to_identical_plans() {
    let doc = document(vec![
        task("fetch", "bob"),
        looped(depends(task("scan", "iam-qa"), &["fetch"]), iterations(3)),
        depends(task("report", "iam-doc"), &["scan"]),
    ]);

    let first = compile(&doc, &resolver()).expect("first compile");
    let second = compile(&doc, &resolver()).expect("second compile");

    let bytes_a = first.plan.canonical_bytes().expect("bytes a");
    let bytes_b = second.plan.canonical_bytes().expect("bytes b");
    assert_eq!(bytes_a, bytes_b);
    assert_eq!(
        first.plan.content_hash().expect("hash a"),
        second.plan.content_hash().expect("hash b")
    );
}

#[test]
fn plan_carries_document_hash_and_seed() {
    let doc = document(vec![task("fetch", "bob")]);
    let compiled = compile(&doc, &resolver()).expect("compile");

    assert_eq!(compiled.plan.mission_id, MissionId::new("mission-alpha"));
    assert_eq!(compiled.plan.seed, 42);
    assert_eq!(compiled.plan.document_hash, doc.canonical_hash().expect("document hash"));
}

// ============================================================================
// SECTION: Shape Validation
// ============================================================================

#[test]
fn blank_mission_ids_are_rejected() {
    let mut doc = document(vec![task("fetch", "bob")]);
    doc.mission_id = MissionId::new("   ");
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(err, CompileError::EmptyMissionId));
}

#[test]
fn missions_without_tasks_are_rejected() {
    let doc = document(Vec::new());
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(err, CompileError::EmptyMission));
}

#[test]
fn duplicate_task_ids_are_rejected() {
    let doc = document(vec![task("build", "iam-dev"), task("build", "iam-qa")]);
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateTaskId(id) if id == "build"));
}

#[test]
fn unknown_dependencies_are_rejected() {
    let doc = document(vec![depends(task("build", "iam-dev"), &["ghost"])]);
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::UnknownDependency { task, dependency }
            if task == "build" && dependency == "ghost"
    ));
}

#[test]
fn unknown_agents_are_rejected() {
    let doc = document(vec![task("build", "nobody")]);
    let err = compile(&doc, &resolver()).unwrap_err();
    assert_eq!(err.to_string(), "task build: unknown agent handle: nobody");
}

// ============================================================================
// SECTION: Cycle Reporting
// ============================================================================

#[test]
fn self_dependencies_are_reported_as_cycles() {
    let doc = document(vec![depends(task("spin", "bob"), &["spin"])]);
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(err, CompileError::CyclicDependency { cycle } if cycle.len() == 1));
}

#[test]
fn cycles_name_every_member_in_path_order() {
    let doc = document(vec![
        depends(task("a", "bob"), &["b"]),
        depends(task("b", "bob"), &["c"]),
        depends(task("c", "bob"), &["a"]),
    ]);

    let err = compile(&doc, &resolver()).unwrap_err();
    let CompileError::CyclicDependency {
        cycle,
    } = &err
    else {
        panic!("expected cycle, got {err:?}");
    };
    assert_eq!(cycle.len(), 3);
    for member in ["a", "b", "c"] {
        assert!(cycle.iter().any(|id| id.as_str() == member), "missing {member}");
    }
    assert!(err.to_string().contains(" -> "));
}

// ============================================================================
// SECTION: Topological Ordering
// ============================================================================

#[test]
fn dependencies_order_before_dependents() {
    let doc = document(vec![
        task("fetch", "bob"),
        depends(task("build", "iam-dev"), &["fetch"]),
        depends(task("check", "iam-qa"), &["fetch"]),
        depends(task("report", "iam-doc"), &["build", "check"]),
    ]);

    assert_eq!(plan_order(&doc), ["fetch", "build", "check", "report"]);
}

#[test]
fn ready_ties_break_on_declared_order() {
    let doc = document(vec![task("zeta", "bob"), task("alpha", "iam-dev")]);
    assert_eq!(plan_order(&doc), ["zeta", "alpha"]);
}

// ============================================================================
// SECTION: Loop Expansion
// ============================================================================

#[test]
fn loop_iterations_expand_into_chained_instances() {
    let doc = document(vec![looped(task("scan", "iam-qa"), iterations(3))]);
    let compiled = compile(&doc, &resolver()).expect("compile");
    let tasks = &compiled.plan.tasks;

    assert_eq!(tasks.len(), 3);
    for (index, node) in tasks.iter().enumerate() {
        let prefix = format!("scan.{index}-");
        assert!(node.task_id.as_str().starts_with(&prefix), "bad id {}", node.task_id);
        assert_eq!(node.task_id.as_str().len(), prefix.len() + 12);
        assert_eq!(node.template_id, TemplateTaskId::new("scan"));
        assert_eq!(node.iteration, Some(u32::try_from(index).expect("index fits")));
        assert_eq!(node.inputs.get(LOOP_INDEX_KEY), Some(&json!(index)));
    }
    assert!(tasks[0].depends_on.is_empty());
    assert_eq!(tasks[1].depends_on, vec![tasks[0].task_id.clone()]);
    assert_eq!(tasks[2].depends_on, vec![tasks[1].task_id.clone()]);
}

#[test]
fn loop_over_binds_items_per_iteration() {
    let doc = document(vec![looped(
        task("scan", "iam-qa"),
        LoopSpec {
            iterations: None,
            over: Some(vec![json!("alpha"), json!("beta")]),
        },
    )]);
    let compiled = compile(&doc, &resolver()).expect("compile");
    let tasks = &compiled.plan.tasks;

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].inputs.get(LOOP_ITEM_KEY), Some(&json!("alpha")));
    assert_eq!(tasks[1].inputs.get(LOOP_ITEM_KEY), Some(&json!("beta")));
    assert_eq!(tasks[1].inputs.get(LOOP_INDEX_KEY), Some(&json!(1)));
}

#[test]
fn derived_iteration_ids_are_seed_stable() {
    let doc = document(vec![looped(task("scan", "iam-qa"), iterations(2))]);
    let first = compile(&doc, &resolver()).expect("first");
    let second = compile(&doc, &resolver()).expect("second");
    let ids = |compiled: &CompiledMission| {
        compiled.plan.tasks.iter().map(|node| node.task_id.to_string()).collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));

    let mut reseeded = document(vec![looped(task("scan", "iam-qa"), iterations(2))]);
    reseeded.seed = 43;
    let third = compile(&reseeded, &resolver()).expect("third");
    assert_ne!(ids(&first), ids(&third));
}

#[test]
fn dependents_fan_in_on_every_iteration() {
    let doc = document(vec![
        looped(task("scan", "iam-qa"), iterations(2)),
        depends(task("report", "iam-doc"), &["scan"]),
    ]);
    let compiled = compile(&doc, &resolver()).expect("compile");
    let tasks = &compiled.plan.tasks;

    let report = tasks.iter().find(|node| node.task_id.as_str() == "report").expect("report");
    let scan_ids: Vec<_> = tasks
        .iter()
        .filter(|node| node.template_id.as_str() == "scan")
        .map(|node| node.task_id.clone())
        .collect();
    assert_eq!(scan_ids.len(), 2);
    assert_eq!(report.depends_on, scan_ids);
}

// ============================================================================
// SECTION: Loop Validation
// ============================================================================

#[test]
fn loops_selecting_both_iterations_and_over_are_rejected() {
    let doc = document(vec![looped(
        task("scan", "iam-qa"),
        LoopSpec {
            iterations: Some(2),
            over: Some(vec![json!(1)]),
        },
    )]);
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::MalformedLoop { task, reason }
            if task == "scan" && reason == "exactly one of iterations or over must be set"
    ));
}

#[test]
fn loops_selecting_neither_side_are_rejected() {
    let doc = document(vec![looped(
        task("scan", "iam-qa"),
        LoopSpec {
            iterations: None,
            over: None,
        },
    )]);
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(err, CompileError::MalformedLoop { .. }));
}

#[test]
fn zero_iteration_loops_are_rejected() {
    let doc = document(vec![looped(task("scan", "iam-qa"), iterations(0))]);
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::MalformedLoop { reason, .. }
            if reason == format!("iterations must be between 1 and {MAX_LOOP_ITERATIONS}")
    ));
}

#[test]
fn iteration_counts_above_the_cap_are_rejected() {
    let doc = document(vec![looped(task("scan", "iam-qa"), iterations(MAX_LOOP_ITERATIONS + 1))]);
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(err, CompileError::MalformedLoop { .. }));
}

#[test]
fn empty_over_lists_are_rejected() {
    let doc = document(vec![looped(
        task("scan", "iam-qa"),
        LoopSpec {
            iterations: None,
            over: Some(Vec::new()),
        },
    )]);
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(
        err,
        CompileError::MalformedLoop { reason, .. } if reason == "over must not be empty"
    ));
}

// ============================================================================
// SECTION: Gates
// ============================================================================

#[test]
fn gates_attach_to_every_loop_iteration() {
    let mut doc = document(vec![looped(task("scan", "iam-qa"), iterations(2))]);
    doc.gates = vec![GateSpec {
        id: Some(GateId::new("g-scan")),
        applies_to: TemplateTaskId::new("scan"),
        condition: GateCondition::TestsPass,
        on_failure: GateAction::SkipRemaining,
    }];

    let compiled = compile(&doc, &resolver()).expect("compile");
    for node in &compiled.plan.tasks {
        let gate = node.gate.as_ref().expect("gate present");
        assert_eq!(gate.condition, GateCondition::TestsPass);
        assert_eq!(gate.on_failure, GateAction::SkipRemaining);
    }
}

#[test]
fn gates_on_unknown_tasks_are_rejected() {
    let mut doc = document(vec![task("build", "iam-dev")]);
    doc.gates = vec![GateSpec {
        id: None,
        applies_to: TemplateTaskId::new("ghost"),
        condition: GateCondition::Always,
        on_failure: GateAction::AbortMission,
    }];
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(err, CompileError::UnknownGateTarget(target) if target == "ghost"));
}

#[test]
fn double_guarded_tasks_are_rejected() {
    let mut doc = document(vec![task("build", "iam-dev")]);
    doc.gates = vec![
        GateSpec {
            id: None,
            applies_to: TemplateTaskId::new("build"),
            condition: GateCondition::Always,
            on_failure: GateAction::AbortMission,
        },
        GateSpec {
            id: None,
            applies_to: TemplateTaskId::new("build"),
            condition: GateCondition::TestsPass,
            on_failure: GateAction::Continue,
        },
    ];
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateGate(target) if target == "build"));
}

#[test]
fn duplicate_gate_ids_are_rejected() {
    let mut doc = document(vec![task("build", "iam-dev"), task("check", "iam-qa")]);
    doc.gates = vec![
        GateSpec {
            id: Some(GateId::new("g-1")),
            applies_to: TemplateTaskId::new("build"),
            condition: GateCondition::Always,
            on_failure: GateAction::AbortMission,
        },
        GateSpec {
            id: Some(GateId::new("g-1")),
            applies_to: TemplateTaskId::new("check"),
            condition: GateCondition::Always,
            on_failure: GateAction::AbortMission,
        },
    ];
    let err = compile(&doc, &resolver()).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateGateId(id) if id == "g-1"));
}

// ============================================================================
// SECTION: Identity and Tools
// ============================================================================

#[test]
fn alias_handles_resolve_with_deprecation_notices() {
    let doc = document(vec![task("scan", "qa")]);
    let compiled = compile(&doc, &resolver()).expect("compile");

    let node = &compiled.plan.tasks[0];
    assert_eq!(node.agent_handle, AgentHandle::new("qa"));
    assert_eq!(node.agent.as_str(), "iam-qa");

    assert_eq!(compiled.deprecations.len(), 1);
    let notice = &compiled.deprecations[0];
    assert_eq!(notice.handle, AgentHandle::new("qa"));
    assert_eq!(notice.canonical.as_str(), "iam-qa");
    assert_eq!(notice.site, "scan");
}

#[test]
fn canonical_handles_resolve_without_notices() {
    let doc = document(vec![task("scan", "iam-qa")]);
    let compiled = compile(&doc, &resolver()).expect("compile");
    assert!(compiled.deprecations.is_empty());
}

#[test]
fn tool_inputs_lift_into_required_tool() {
    let mut spec = task("deploy", "iam-ops");
    spec.inputs.insert(TOOL_INPUT_KEY.to_string(), json!("kubectl"));
    let doc = document(vec![spec]);

    let compiled = compile(&doc, &resolver()).expect("compile");
    assert_eq!(compiled.plan.tasks[0].required_tool, Some(ToolName::new("kubectl")));
}
