// crates/mission-warden-core/src/core/compiler.rs
// ============================================================================
// Module: Mission Warden Mission Compiler
// Description: Deterministic compilation of mission documents into execution plans.
// Purpose: Validate the task graph, expand loops, and order tasks reproducibly.
// Dependencies: crate::core::{hashing, identity, identifiers, mission, plan}, serde
// ============================================================================

//! ## Overview
//! Compilation turns a mission document into an execution plan in four passes:
//! shape validation, cycle detection over the declared graph (DFS coloring,
//! reporting the full cycle), loop expansion with seed-derived identifiers,
//! and a Kahn topological sort whose ties break on (source order, derived
//! task id). The whole pipeline is pure; identical inputs produce
//! byte-identical plans.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::BinaryHeap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashError;
use crate::core::hashing::short_canonical_hash;
use crate::core::identifiers::TaskId;
use crate::core::identifiers::TemplateTaskId;
use crate::core::identity::DeprecationNotice;
use crate::core::identity::IdentityResolver;
use crate::core::identity::UnknownAgentError;
use crate::core::mission::GateSpec;
use crate::core::mission::LOOP_INDEX_KEY;
use crate::core::mission::LOOP_ITEM_KEY;
use crate::core::mission::LoopSpec;
use crate::core::mission::MissionDocument;
use crate::core::mission::TaskSpec;
use crate::core::plan::ExecutionPlan;
use crate::core::plan::PlannedGate;
use crate::core::plan::PlannedTask;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum loop iterations a single task may expand into.
pub const MAX_LOOP_ITERATIONS: u32 = 1_000;

/// Hex digits of the derivation hash embedded in loop-expanded task ids.
const DERIVED_ID_HASH_LENGTH: usize = 12;

// ============================================================================
// SECTION: Compilation Output
// ============================================================================

/// Result of a successful compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMission {
    /// The deterministic execution plan.
    pub plan: ExecutionPlan,
    /// Alias deprecation notices encountered while resolving agents.
    pub deprecations: Vec<DeprecationNotice>,
}

// ============================================================================
// SECTION: Compiler Entry Point
// ============================================================================

/// Compiles a mission document into an execution plan.
///
/// # Errors
///
/// Returns [`CompileError`] when the document is malformed, references
/// unknown tasks or agents, declares a malformed loop, or contains a
/// dependency cycle. Compilation is all-or-nothing; no partial plan escapes.
pub fn compile(
    document: &MissionDocument,
    resolver: &IdentityResolver,
) -> Result<CompiledMission, CompileError> {
    ensure_document_shape(document)?;
    ensure_unique_task_ids(&document.tasks)?;
    ensure_dependencies_exist(&document.tasks)?;
    ensure_gates_resolve(document)?;
    ensure_loops_well_formed(&document.tasks)?;
    ensure_acyclic(&document.tasks)?;

    let mut deprecations = Vec::new();
    let expanded = expand_tasks(document, resolver, &mut deprecations)?;
    let ordered = order_tasks(expanded)?;

    let document_hash = document.canonical_hash()?;
    let plan = ExecutionPlan {
        mission_id: document.mission_id.clone(),
        seed: document.seed,
        document_hash,
        tasks: ordered,
    };
    Ok(CompiledMission {
        plan,
        deprecations,
    })
}

// ============================================================================
// SECTION: Shape Validation
// ============================================================================

/// Rejects documents with an empty mission id or no tasks.
fn ensure_document_shape(document: &MissionDocument) -> Result<(), CompileError> {
    if document.mission_id.as_str().trim().is_empty() {
        return Err(CompileError::EmptyMissionId);
    }
    if document.tasks.is_empty() {
        return Err(CompileError::EmptyMission);
    }
    Ok(())
}

/// Rejects duplicate declared task identifiers.
fn ensure_unique_task_ids(tasks: &[TaskSpec]) -> Result<(), CompileError> {
    let mut seen = BTreeSet::new();
    for task in tasks {
        if !seen.insert(task.id.as_str().to_string()) {
            return Err(CompileError::DuplicateTaskId(task.id.to_string()));
        }
    }
    Ok(())
}

/// Rejects dependency references to undeclared tasks, including self-edges.
fn ensure_dependencies_exist(tasks: &[TaskSpec]) -> Result<(), CompileError> {
    let declared: BTreeSet<&str> = tasks.iter().map(|task| task.id.as_str()).collect();
    for task in tasks {
        for dependency in &task.depends_on {
            if !declared.contains(dependency.as_str()) {
                return Err(CompileError::UnknownDependency {
                    task: task.id.to_string(),
                    dependency: dependency.to_string(),
                });
            }
            if dependency == &task.id {
                return Err(CompileError::CyclicDependency {
                    cycle: vec![task.id.clone()],
                });
            }
        }
    }
    Ok(())
}

/// Rejects gates with duplicate ids, unknown targets, or a double-guarded
/// task.
fn ensure_gates_resolve(document: &MissionDocument) -> Result<(), CompileError> {
    let declared: BTreeSet<&str> =
        document.tasks.iter().map(|task| task.id.as_str()).collect();
    let mut gate_ids = BTreeSet::new();
    let mut guarded = BTreeSet::new();
    for gate in &document.gates {
        if let Some(id) = &gate.id
            && !gate_ids.insert(id.as_str().to_string())
        {
            return Err(CompileError::DuplicateGateId(id.to_string()));
        }
        if !declared.contains(gate.applies_to.as_str()) {
            return Err(CompileError::UnknownGateTarget(gate.applies_to.to_string()));
        }
        if !guarded.insert(gate.applies_to.as_str().to_string()) {
            return Err(CompileError::DuplicateGate(gate.applies_to.to_string()));
        }
    }
    Ok(())
}

/// Rejects loops that set neither or both selectors, or exceed limits.
fn ensure_loops_well_formed(tasks: &[TaskSpec]) -> Result<(), CompileError> {
    for task in tasks {
        let Some(loop_spec) = &task.loop_spec else {
            continue;
        };
        match (&loop_spec.iterations, &loop_spec.over) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(CompileError::MalformedLoop {
                    task: task.id.to_string(),
                    reason: "exactly one of iterations or over must be set".to_string(),
                });
            }
            (Some(iterations), None) => {
                if *iterations == 0 || *iterations > MAX_LOOP_ITERATIONS {
                    return Err(CompileError::MalformedLoop {
                        task: task.id.to_string(),
                        reason: format!(
                            "iterations must be between 1 and {MAX_LOOP_ITERATIONS}"
                        ),
                    });
                }
            }
            (None, Some(over)) => {
                if over.is_empty() {
                    return Err(CompileError::MalformedLoop {
                        task: task.id.to_string(),
                        reason: "over must not be empty".to_string(),
                    });
                }
                let count = u32::try_from(over.len()).unwrap_or(u32::MAX);
                if count > MAX_LOOP_ITERATIONS {
                    return Err(CompileError::MalformedLoop {
                        task: task.id.to_string(),
                        reason: format!("over exceeds {MAX_LOOP_ITERATIONS} elements"),
                    });
                }
            }
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Cycle Detection
// ============================================================================

/// Node color for the DFS cycle scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Not visited yet.
    White,
    /// On the current DFS path.
    Gray,
    /// Fully explored.
    Black,
}

/// Detects dependency cycles over the declared graph.
///
/// Reports the full cycle in path order, not merely its existence.
fn ensure_acyclic(tasks: &[TaskSpec]) -> Result<(), CompileError> {
    let index: BTreeMap<&str, usize> = tasks
        .iter()
        .enumerate()
        .map(|(position, task)| (task.id.as_str(), position))
        .collect();
    let mut colors = vec![Color::White; tasks.len()];
    let mut path: Vec<usize> = Vec::new();

    for start in 0..tasks.len() {
        if colors[start] != Color::White {
            continue;
        }
        if let Some(cycle) = scan_from(start, tasks, &index, &mut colors, &mut path) {
            return Err(CompileError::CyclicDependency {
                cycle,
            });
        }
    }
    Ok(())
}

/// Iterative DFS from one root; returns the first cycle found.
fn scan_from(
    start: usize,
    tasks: &[TaskSpec],
    index: &BTreeMap<&str, usize>,
    colors: &mut [Color],
    path: &mut Vec<usize>,
) -> Option<Vec<TemplateTaskId>> {
    // Each frame tracks how many dependency edges were already explored.
    let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
    colors[start] = Color::Gray;
    path.push(start);

    while let Some((node, edge)) = stack.pop() {
        let dependencies = &tasks[node].depends_on;
        if edge >= dependencies.len() {
            colors[node] = Color::Black;
            path.pop();
            continue;
        }
        stack.push((node, edge + 1));
        let Some(&next) = index.get(dependencies[edge].as_str()) else {
            continue;
        };
        match colors[next] {
            Color::White => {
                colors[next] = Color::Gray;
                path.push(next);
                stack.push((next, 0));
            }
            Color::Gray => {
                let from = path.iter().position(|&entry| entry == next).unwrap_or(0);
                return Some(
                    path[from..].iter().map(|&entry| tasks[entry].id.clone()).collect(),
                );
            }
            Color::Black => {}
        }
    }
    None
}

// ============================================================================
// SECTION: Loop Expansion
// ============================================================================

/// Seed material for derived loop-task identifiers.
#[derive(Serialize)]
struct IterationSeed<'a> {
    /// Mission seed from the document.
    seed: u64,
    /// Declared template identifier.
    template: &'a str,
    /// Iteration index.
    index: u32,
}

/// Expands loop constructs into concrete task instances.
///
/// Iterations are chained (each depends on its predecessor) and dependents of
/// a looped template fan in on every iteration. Non-loop tasks pass through
/// with their declared id.
fn expand_tasks(
    document: &MissionDocument,
    resolver: &IdentityResolver,
    deprecations: &mut Vec<DeprecationNotice>,
) -> Result<Vec<PlannedTask>, CompileError> {
    // Declared id to derived instance ids, in iteration order, so dependency
    // edges can be rewritten in one pass afterwards.
    let mut instances: BTreeMap<String, Vec<TaskId>> = BTreeMap::new();
    let mut expanded: Vec<PlannedTask> = Vec::new();

    for (source_order, task) in document.tasks.iter().enumerate() {
        let resolution =
            resolver.resolve(&task.agent, task.id.as_str()).map_err(|source| {
                CompileError::UnknownAgent {
                    task: task.id.to_string(),
                    source,
                }
            })?;
        if let Some(notice) = resolution.deprecation {
            deprecations.push(notice);
        }
        let gate = document.gate_for(&task.id).map(planned_gate);

        let derived = match &task.loop_spec {
            None => {
                expanded.push(PlannedTask {
                    task_id: TaskId::new(task.id.as_str()),
                    template_id: task.id.clone(),
                    iteration: None,
                    agent_handle: task.agent.clone(),
                    agent: resolution.canonical.clone(),
                    inputs: task.inputs.clone(),
                    depends_on: Vec::new(),
                    risk_tier: task.risk_tier,
                    required_tool: task.required_tool(),
                    source_order,
                    position: 0,
                    gate,
                });
                vec![TaskId::new(task.id.as_str())]
            }
            Some(loop_spec) => {
                let mut derived: Vec<TaskId> = Vec::new();
                for (index, item) in loop_elements(loop_spec) {
                    let task_id = derive_iteration_id(document.seed, &task.id, index)?;
                    let mut inputs = task.inputs.clone();
                    inputs.insert(LOOP_INDEX_KEY.to_string(), Value::from(index));
                    if let Some(item) = item {
                        inputs.insert(LOOP_ITEM_KEY.to_string(), item);
                    }
                    expanded.push(PlannedTask {
                        task_id: task_id.clone(),
                        template_id: task.id.clone(),
                        iteration: Some(index),
                        agent_handle: task.agent.clone(),
                        agent: resolution.canonical.clone(),
                        inputs,
                        depends_on: derived.last().cloned().into_iter().collect(),
                        risk_tier: task.risk_tier,
                        required_tool: task.required_tool(),
                        source_order,
                        position: 0,
                        gate: gate.clone(),
                    });
                    derived.push(task_id);
                }
                derived
            }
        };
        instances.insert(task.id.as_str().to_string(), derived);
    }

    let declared_deps: BTreeMap<&str, &[TemplateTaskId]> = document
        .tasks
        .iter()
        .map(|task| (task.id.as_str(), task.depends_on.as_slice()))
        .collect();

    // Rewrite declared dependencies against the expanded graph. Chain edges
    // added during expansion stay behind the declared ones.
    for node in &mut expanded {
        let declared = declared_deps
            .get(node.template_id.as_str())
            .copied()
            .unwrap_or_default();
        let mut resolved = Vec::new();
        for dependency in declared {
            if let Some(ids) = instances.get(dependency.as_str()) {
                resolved.extend(ids.iter().cloned());
            }
        }
        resolved.append(&mut node.depends_on);
        node.depends_on = resolved;
    }

    Ok(expanded)
}

/// Enumerates loop elements as (index, optional bound item).
fn loop_elements(loop_spec: &LoopSpec) -> Vec<(u32, Option<Value>)> {
    match (&loop_spec.iterations, &loop_spec.over) {
        (Some(iterations), None) => (0..*iterations).map(|index| (index, None)).collect(),
        (None, Some(over)) => over
            .iter()
            .enumerate()
            .map(|(index, item)| {
                (u32::try_from(index).unwrap_or(u32::MAX), Some(item.clone()))
            })
            .collect(),
        // Rejected earlier by loop validation.
        _ => Vec::new(),
    }
}

/// Derives the deterministic identifier for one loop iteration.
fn derive_iteration_id(
    seed: u64,
    template: &TemplateTaskId,
    index: u32,
) -> Result<TaskId, HashError> {
    let material = IterationSeed {
        seed,
        template: template.as_str(),
        index,
    };
    let digest = short_canonical_hash(DEFAULT_HASH_ALGORITHM, &material, DERIVED_ID_HASH_LENGTH)?;
    Ok(TaskId::new(format!("{template}.{index}-{digest}")))
}

/// Converts a gate declaration to its plan-node form.
fn planned_gate(gate: &GateSpec) -> PlannedGate {
    PlannedGate {
        id: gate.id.clone(),
        condition: gate.condition,
        on_failure: gate.on_failure,
    }
}

// ============================================================================
// SECTION: Topological Ordering
// ============================================================================

/// Orders expanded tasks with Kahn's algorithm.
///
/// The ready set is a priority queue keyed by (source order, derived id), so
/// simultaneous unblocking never falls back to arbitrary iteration order.
fn order_tasks(expanded: Vec<PlannedTask>) -> Result<Vec<PlannedTask>, CompileError> {
    let index: BTreeMap<String, usize> = expanded
        .iter()
        .enumerate()
        .map(|(position, node)| (node.task_id.as_str().to_string(), position))
        .collect();

    let mut in_degree = vec![0usize; expanded.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); expanded.len()];
    for (position, node) in expanded.iter().enumerate() {
        for dependency in &node.depends_on {
            if let Some(&from) = index.get(dependency.as_str()) {
                in_degree[position] += 1;
                dependents[from].push(position);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<(usize, String, usize)>> = BinaryHeap::new();
    for (position, node) in expanded.iter().enumerate() {
        if in_degree[position] == 0 {
            ready.push(Reverse((
                node.source_order,
                node.task_id.as_str().to_string(),
                position,
            )));
        }
    }

    let mut ordered = Vec::with_capacity(expanded.len());
    let mut nodes: Vec<Option<PlannedTask>> = expanded.into_iter().map(Some).collect();

    while let Some(Reverse((_, _, position))) = ready.pop() {
        let Some(mut node) = nodes[position].take() else {
            continue;
        };
        node.position = ordered.len();
        for &dependent in &dependents[position] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] != 0 {
                continue;
            }
            if let Some(pending) = &nodes[dependent] {
                ready.push(Reverse((
                    pending.source_order,
                    pending.task_id.as_str().to_string(),
                    dependent,
                )));
            }
        }
        ordered.push(node);
    }

    let leftover: Vec<TemplateTaskId> = nodes
        .iter()
        .flatten()
        .map(|node| node.template_id.clone())
        .collect();
    if leftover.is_empty() {
        Ok(ordered)
    } else {
        // The declared graph was already verified acyclic; this guards the
        // expanded graph the same way.
        Err(CompileError::CyclicDependency {
            cycle: leftover,
        })
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Mission compilation failures.
///
/// Always fatal to compilation; no partially compiled plan is ever produced.
#[derive(Debug, Error)]
pub enum CompileError {
    /// The mission id is empty or whitespace.
    #[error("mission_id must be non-empty")]
    EmptyMissionId,
    /// The document declares no tasks.
    #[error("mission declares no tasks")]
    EmptyMission,
    /// A task identifier is declared more than once.
    #[error("duplicate task id: {0}")]
    DuplicateTaskId(String),
    /// Two gates declare the same identifier.
    #[error("duplicate gate id: {0}")]
    DuplicateGateId(String),
    /// Two gates guard the same task.
    #[error("duplicate gate for task: {0}")]
    DuplicateGate(String),
    /// A gate targets a task that is not declared.
    #[error("gate targets unknown task: {0}")]
    UnknownGateTarget(String),
    /// A dependency references a task that is not declared.
    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency {
        /// Task declaring the dependency.
        task: String,
        /// The missing dependency reference.
        dependency: String,
    },
    /// The declared graph contains a dependency cycle.
    #[error("cyclic dependency among tasks: {}", join_cycle(.cycle))]
    CyclicDependency {
        /// Every task on the cycle, in path order.
        cycle: Vec<TemplateTaskId>,
    },
    /// A task references an agent the resolver does not know.
    #[error("task {task}: {source}")]
    UnknownAgent {
        /// Task referencing the agent.
        task: String,
        /// Underlying resolution failure.
        #[source]
        source: UnknownAgentError,
    },
    /// A loop construct is malformed.
    #[error("malformed loop on task {task}: {reason}")]
    MalformedLoop {
        /// Task declaring the loop.
        task: String,
        /// Why the loop was rejected.
        reason: String,
    },
    /// Canonical hashing failed while deriving identifiers or plan hashes.
    #[error(transparent)]
    Hash(#[from] HashError),
}

/// Joins a cycle's task ids for error display.
fn join_cycle(cycle: &[TemplateTaskId]) -> String {
    let names: Vec<&str> = cycle.iter().map(TemplateTaskId::as_str).collect();
    names.join(" -> ")
}
