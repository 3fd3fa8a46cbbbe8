// crates/mission-warden-core/src/runtime/dispatcher.rs
// ============================================================================
// Module: Mission Warden Dispatcher
// Description: Resumable plan execution with policy gates and bounded retry.
// Purpose: Drive a compiled plan through agents while recording evidence.
// Dependencies: crate::core, crate::interfaces, crate::runtime::recorder
// ============================================================================

//! ## Overview
//! The dispatcher walks a compiled execution plan in plan order, evaluates
//! the policy gate for each ready task against the freshest mandate, invokes
//! the task's agent through the [`AgentInvoker`] seam with bounded retry, and
//! records every observable step in the evidence bundle. A run is resumable:
//! when one or more tasks await approval the walk returns
//! [`DispatchOutcome::Suspended`] without finalizing the bundle, and a later
//! `run` call re-reads the mandate and picks up exactly where it stopped.
//! Mandate state is never cached across gate evaluations.
//!
//! The shipped dispatcher drives one invocation at a time. The configured
//! `parallelism` is an upper bound on concurrent invocations, not a demand;
//! serial dispatch keeps evidence ordering identical to plan ordering.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

use crate::core::compiler::CompiledMission;
use crate::core::evidence::CheckpointKind;
use crate::core::evidence::EvidenceBundleManifest;
use crate::core::evidence::EvidenceIoError;
use crate::core::hashing::hash_canonical_json;
use crate::core::hashing::HashError;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::identifiers::CallId;
use crate::core::identifiers::CanonicalAgentId;
use crate::core::identifiers::TaskId;
use crate::core::identity::DeprecationNotice;
use crate::core::identity::IdentityResolver;
use crate::core::mission::GateAction;
use crate::core::mission::GateCondition;
use crate::core::plan::ExecutionPlan;
use crate::core::plan::PlannedTask;
use crate::core::policy::evaluate_gate;
use crate::core::policy::GateDecision;
use crate::core::policy::SpendLedger;
use crate::core::time::Timestamp;
use crate::interfaces::AgentInvocationError;
use crate::interfaces::AgentInvoker;
use crate::interfaces::InvocationRequest;
use crate::interfaces::MandateError;
use crate::interfaces::MandateSource;
use crate::runtime::recorder::EvidenceRecorder;
use crate::runtime::recorder::ToolCallEvent;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Reserved input key under which upstream outputs are injected.
pub const UPSTREAM_INPUT_KEY: &str = "upstream";

/// Skip reason recorded when a dependency did not execute.
pub const SKIP_DEPENDENCY_NOT_SATISFIED: &str = "dependency not satisfied";

/// Skip reason recorded when the mission was cancelled.
pub const SKIP_MISSION_CANCELLED: &str = "mission cancelled";

/// Skip reason recorded when a failure action aborted the mission.
pub const SKIP_MISSION_ABORTED: &str = "mission aborted";

/// Skip reason recorded when a failure action skipped the remaining tasks.
pub const SKIP_REMAINING: &str = "remaining tasks skipped";

/// Default bound on retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default per-invocation timeout handed to adapters, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default upper bound on concurrent invocations.
pub const DEFAULT_PARALLELISM: usize = 1;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Tunable dispatch limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Retries allowed after the first attempt of an invocation.
    pub max_retries: u32,
    /// Timeout handed to the adapter on every invocation, in milliseconds.
    pub timeout_ms: u64,
    /// Upper bound on concurrent invocations.
    pub parallelism: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            parallelism: DEFAULT_PARALLELISM,
        }
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of one `run` or `cancel` call over the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Every task reached a final state and none aborted the mission.
    Completed,
    /// A failure action or exhausted retries marked the mission failed.
    Failed,
    /// Cancellation released the unfinished tasks.
    Aborted,
    /// At least one task awaits approval; the bundle remains open.
    Suspended {
        /// Tasks suspended on approval, in plan order.
        awaiting_approval: Vec<TaskId>,
    },
}

impl DispatchOutcome {
    /// True when the outcome finalized the bundle.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Suspended { .. })
    }
}

// ============================================================================
// SECTION: Task State
// ============================================================================

/// Lifecycle state of one planned task inside a dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskState {
    /// Not yet decided; dependencies may still be outstanding.
    Pending,
    /// Parked on an approval decision.
    Suspended,
    /// Invocation succeeded and the task counts as executed.
    Executed,
    /// Executed, but its gate condition failed under `continue`.
    GateFailed,
    /// Released without execution.
    Skipped,
    /// Invocation failed after exhausting retries.
    Failed,
}

impl TaskState {
    /// True while the task can still run or resume.
    const fn is_unfinished(self) -> bool {
        matches!(self, Self::Pending | Self::Suspended)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Infrastructure failure surfaced by the dispatcher.
///
/// Task-level failures are recorded in the bundle and expressed through
/// [`DispatchOutcome`]; this error covers the machinery around them.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Evidence recording or persistence failed.
    #[error(transparent)]
    Evidence(#[from] EvidenceIoError),
    /// The mandate source could not be read.
    #[error(transparent)]
    Mandate(#[from] MandateError),
    /// Canonical hashing of a payload failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Resumable executor over one compiled mission.
///
/// # Invariants
///
/// - Tasks are visited in plan order; a single forward pass reaches
///   quiescence because the plan is topologically ordered.
/// - The mandate is re-read at every gate evaluation, never cached.
/// - Every invocation attempt leaves a tool call record, successful or not.
/// - Once a terminal outcome is reached, `run` returns it unchanged.
#[derive(Debug)]
pub struct Dispatcher<I, M> {
    /// Compiled plan under execution.
    plan: ExecutionPlan,
    /// Deprecated aliases observed during compilation.
    deprecations: Vec<DeprecationNotice>,
    /// Resolver consulted again at dispatch time for each task.
    resolver: IdentityResolver,
    /// Adapter that performs agent invocations.
    invoker: I,
    /// Source of the current mandate.
    mandate: M,
    /// Recorder over the evidence bundle for this run.
    recorder: EvidenceRecorder,
    /// Root directory against which artifact paths resolve.
    artifact_root: PathBuf,
    /// Dispatch limits.
    config: DispatcherConfig,
    /// Per-task state, indexed by plan position.
    states: Vec<TaskState>,
    /// Outputs of executed tasks, keyed by task id.
    outputs: BTreeMap<String, Value>,
    /// Plan position of each task id.
    index: BTreeMap<String, usize>,
    /// Cumulative spend across invocations.
    ledger: SpendLedger,
    /// First task failure message, used for the terminal error.
    first_failure: Option<String>,
    /// Whether the budget-exhausted checkpoint was already recorded.
    budget_flagged: bool,
    /// Whether the compile checkpoints were already recorded.
    preamble_recorded: bool,
    /// Cached terminal outcome once the bundle is finalized.
    terminal: Option<DispatchOutcome>,
}

impl<I, M> Dispatcher<I, M>
where
    I: AgentInvoker,
    M: MandateSource,
{
    /// Creates a dispatcher over a compiled mission.
    ///
    /// The recorder is taken over for the lifetime of the dispatch so that
    /// sequence numbers stay strictly ordered across all record types.
    #[must_use]
    pub fn new(
        compiled: CompiledMission,
        resolver: IdentityResolver,
        invoker: I,
        mandate: M,
        recorder: EvidenceRecorder,
        artifact_root: impl Into<PathBuf>,
        config: DispatcherConfig,
    ) -> Self {
        let states = vec![TaskState::Pending; compiled.plan.tasks.len()];
        let index = compiled
            .plan
            .tasks
            .iter()
            .enumerate()
            .map(|(position, task)| (task.task_id.to_string(), position))
            .collect();
        Self {
            plan: compiled.plan,
            deprecations: compiled.deprecations,
            resolver,
            invoker,
            mandate,
            recorder,
            artifact_root: artifact_root.into(),
            config,
            states,
            outputs: BTreeMap::new(),
            index,
            ledger: SpendLedger::new(),
            first_failure: None,
            budget_flagged: false,
            preamble_recorded: false,
            terminal: None,
        }
    }

    /// Returns the manifest recorded so far.
    #[must_use]
    pub const fn manifest(&self) -> &EvidenceBundleManifest {
        self.recorder.manifest()
    }

    /// Consumes the dispatcher and returns the recorded manifest.
    #[must_use]
    pub fn into_manifest(self) -> EvidenceBundleManifest {
        self.recorder.into_manifest()
    }

    /// Returns the cumulative spend recorded so far.
    #[must_use]
    pub const fn spent(&self) -> u64 {
        self.ledger.total()
    }

    /// Runs the plan forward until it completes, fails, or suspends.
    ///
    /// A dispatcher whose previous `run` suspended resumes from the exact
    /// task states it left behind; a dispatcher that already reached a
    /// terminal outcome returns that outcome again without touching the
    /// bundle.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when evidence recording, mandate reads, or
    /// canonical hashing fail. Task-level failures never surface here.
    pub fn run(&mut self, at: Timestamp) -> Result<DispatchOutcome, DispatchError> {
        if let Some(outcome) = &self.terminal {
            return Ok(outcome.clone());
        }
        self.ensure_preamble(at)?;
        for position in 0..self.plan.tasks.len() {
            if self.terminal.is_some() {
                break;
            }
            self.advance_task(position, at)?;
        }
        if let Some(outcome) = &self.terminal {
            return Ok(outcome.clone());
        }
        let awaiting = self.awaiting_approval();
        if !awaiting.is_empty() {
            return Ok(DispatchOutcome::Suspended {
                awaiting_approval: awaiting,
            });
        }
        let outcome = match self.first_failure.take() {
            Some(message) => {
                self.recorder.mark_failed(message, at)?;
                DispatchOutcome::Failed
            }
            None => {
                self.recorder.mark_completed(at)?;
                DispatchOutcome::Completed
            }
        };
        self.terminal = Some(outcome.clone());
        Ok(outcome)
    }

    /// Cancels the mission, releasing every unfinished task.
    ///
    /// Suspended and pending tasks are recorded as skipped and the bundle is
    /// finalized as aborted.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Evidence`] when the bundle was already
    /// finalized or recording fails.
    pub fn cancel(&mut self, at: Timestamp) -> Result<DispatchOutcome, DispatchError> {
        self.recorder.record_checkpoint(
            CheckpointKind::CancellationRequested,
            None,
            "cancellation requested",
            at,
        )?;
        self.skip_unfinished(SKIP_MISSION_CANCELLED)?;
        self.recorder.mark_aborted("mission cancelled", at)?;
        let outcome = DispatchOutcome::Aborted;
        self.terminal = Some(outcome.clone());
        Ok(outcome)
    }

    /// Records the compile-time checkpoints once per bundle.
    ///
    /// A dispatcher rebuilt over a reloaded manifest finds the compile
    /// checkpoint already present and records nothing new.
    fn ensure_preamble(&mut self, at: Timestamp) -> Result<(), DispatchError> {
        if self.preamble_recorded {
            return Ok(());
        }
        let already_compiled = self
            .recorder
            .manifest()
            .checkpoints
            .iter()
            .any(|record| record.kind == CheckpointKind::MissionCompiled);
        if already_compiled {
            self.preamble_recorded = true;
            return Ok(());
        }
        for task in &self.plan.tasks {
            self.recorder.record_task_planned(task.task_id.clone())?;
        }
        let plan_hash = self.plan.content_hash()?;
        self.recorder.record_checkpoint(
            CheckpointKind::MissionCompiled,
            None,
            format!("plan hash {}", plan_hash.value),
            at,
        )?;
        for notice in self.deprecations.clone() {
            self.recorder.record_checkpoint(
                CheckpointKind::AliasDeprecated,
                None,
                format!(
                    "deprecated alias {} resolved to {} at {}",
                    notice.handle, notice.canonical, notice.site
                ),
                at,
            )?;
        }
        self.preamble_recorded = true;
        Ok(())
    }

    /// Advances one task as far as the current mandate and its dependencies
    /// allow.
    fn advance_task(&mut self, position: usize, at: Timestamp) -> Result<(), DispatchError> {
        if !self.states[position].is_unfinished() {
            return Ok(());
        }
        let task = self.plan.tasks[position].clone();
        let mut parked = false;
        for dependency in &task.depends_on {
            match self.dependency_state(dependency) {
                Some(TaskState::Executed) => {}
                Some(TaskState::Pending | TaskState::Suspended) => {
                    parked = true;
                }
                Some(TaskState::Skipped | TaskState::Failed | TaskState::GateFailed) | None => {
                    self.recorder
                        .record_task_skipped(task.task_id.clone(), SKIP_DEPENDENCY_NOT_SATISFIED)?;
                    self.states[position] = TaskState::Skipped;
                    return Ok(());
                }
            }
        }
        if parked {
            return Ok(());
        }
        let was_suspended = matches!(self.states[position], TaskState::Suspended);
        let mandate = self.mandate.current()?;
        match evaluate_gate(&task, mandate.as_ref(), &self.ledger) {
            GateDecision::Allow => {
                if was_suspended {
                    self.recorder.record_checkpoint(
                        CheckpointKind::TaskResumed,
                        Some(task.task_id.clone()),
                        "approval granted",
                        at,
                    )?;
                }
                self.dispatch_task(position, &task, at)
            }
            GateDecision::RequiresApproval => {
                if !was_suspended {
                    self.recorder.record_checkpoint(
                        CheckpointKind::TaskSuspended,
                        Some(task.task_id.clone()),
                        "awaiting approval",
                        at,
                    )?;
                    self.states[position] = TaskState::Suspended;
                }
                Ok(())
            }
            GateDecision::Deny { reason } => {
                self.recorder
                    .record_task_skipped(task.task_id.clone(), reason.clone())?;
                self.states[position] = TaskState::Skipped;
                let message = denial_message(&task.task_id, &reason);
                self.apply_failure_action(effective_action(&task), &message, at)
            }
        }
    }

    /// Resolves the task's agent again and invokes it with bounded retry.
    ///
    /// A resolution failure counts as an invocation failure without retry:
    /// the attempt is recorded and the task's failure action applies.
    fn dispatch_task(
        &mut self,
        position: usize,
        task: &PlannedTask,
        at: Timestamp,
    ) -> Result<(), DispatchError> {
        match self.resolver.resolve(&task.agent_handle, task.task_id.as_str()) {
            Ok(resolution) => self.invoke_with_retry(position, task, resolution.canonical, at),
            Err(source) => {
                let inputs = self.effective_inputs(task);
                let input_hash = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &inputs)?;
                let call_id = self.next_call_id();
                self.recorder.record_tool_call(ToolCallEvent {
                    call_id,
                    task_id: task.task_id.clone(),
                    agent: task.agent.clone(),
                    tool: task.required_tool.clone(),
                    attempt: 1,
                    input_hash,
                    output_hash: None,
                    success: false,
                    error: Some(source.to_string()),
                    duration_ms: 0,
                    at,
                })?;
                let message = format!("task {}: {source}", task.task_id);
                self.fail_task(position, task, message, at)
            }
        }
    }

    /// Invokes the task's agent, retrying failed attempts up to the bound.
    ///
    /// Every attempt leaves a tool call record. On success the outputs,
    /// reported tests, and artifacts are recorded before the gate condition
    /// is evaluated; on exhaustion the task's failure action applies.
    #[allow(
        clippy::too_many_lines,
        reason = "Maintain a single linear flow for ordered state updates and auditability."
    )]
    fn invoke_with_retry(
        &mut self,
        position: usize,
        task: &PlannedTask,
        agent: CanonicalAgentId,
        at: Timestamp,
    ) -> Result<(), DispatchError> {
        let inputs = self.effective_inputs(task);
        let input_hash = hash_canonical_json(DEFAULT_HASH_ALGORITHM, &inputs)?;
        let request = InvocationRequest {
            agent: agent.clone(),
            task_id: task.task_id.clone(),
            inputs,
            timeout_ms: self.config.timeout_ms,
        };
        self.recorder.record_agent_invoked(&agent)?;
        let attempts = self.config.max_retries.saturating_add(1);
        let mut attempt = 1_u32;
        loop {
            let call_id = self.next_call_id();
            match self.invoker.invoke(&request) {
                Ok(outcome) => {
                    let output_hash =
                        hash_canonical_json(DEFAULT_HASH_ALGORITHM, &outcome.output)?;
                    self.recorder.record_tool_call(ToolCallEvent {
                        call_id,
                        task_id: task.task_id.clone(),
                        agent: agent.clone(),
                        tool: task.required_tool.clone(),
                        attempt,
                        input_hash,
                        output_hash: Some(output_hash),
                        success: true,
                        error: None,
                        duration_ms: outcome.duration_ms,
                        at,
                    })?;
                    for test in &outcome.tests {
                        self.recorder.record_test(Some(task.task_id.clone()), test, at)?;
                    }
                    for artifact in &outcome.artifacts {
                        self.recorder.add_artifact_file(
                            Some(task.task_id.clone()),
                            &self.artifact_root,
                            artifact,
                            at,
                        )?;
                    }
                    if let Some(cost) = outcome.cost {
                        self.ledger.record(cost);
                        self.flag_budget_if_exhausted(at)?;
                    }
                    self.outputs
                        .insert(task.task_id.to_string(), outcome.output);
                    self.recorder.record_task_executed(task.task_id.clone())?;
                    self.states[position] = TaskState::Executed;
                    return self.check_gate_condition(position, task, at);
                }
                Err(source) => {
                    self.recorder.record_tool_call(ToolCallEvent {
                        call_id,
                        task_id: task.task_id.clone(),
                        agent: agent.clone(),
                        tool: task.required_tool.clone(),
                        attempt,
                        input_hash: input_hash.clone(),
                        output_hash: None,
                        success: false,
                        error: Some(source.to_string()),
                        duration_ms: attempt_duration(&source),
                        at,
                    })?;
                    if attempt >= attempts {
                        let message = exhaustion_message(&task.task_id, attempt, &source);
                        return self.fail_task(position, task, message, at);
                    }
                    self.recorder.record_checkpoint(
                        CheckpointKind::TaskRetried,
                        Some(task.task_id.clone()),
                        format!("attempt {attempt} failed: {source}"),
                        at,
                    )?;
                    attempt = attempt.saturating_add(1);
                }
            }
        }
    }

    /// Marks a task failed and applies its failure action.
    fn fail_task(
        &mut self,
        position: usize,
        task: &PlannedTask,
        message: String,
        at: Timestamp,
    ) -> Result<(), DispatchError> {
        self.states[position] = TaskState::Failed;
        if self.first_failure.is_none() {
            self.first_failure = Some(message.clone());
        }
        self.apply_failure_action(effective_action(task), &message, at)
    }

    /// Evaluates the task's gate condition after a successful execution.
    ///
    /// The task stays executed either way; a failed condition triggers the
    /// gate's failure action, and under `continue` the dependents are
    /// released through the dependency check instead.
    fn check_gate_condition(
        &mut self,
        position: usize,
        task: &PlannedTask,
        at: Timestamp,
    ) -> Result<(), DispatchError> {
        let Some(gate) = task.gate.clone() else {
            return Ok(());
        };
        if self.condition_holds(gate.condition, &task.task_id) {
            return Ok(());
        }
        self.states[position] = TaskState::GateFailed;
        let message = gate_failure_message(&task.task_id, gate.condition);
        self.apply_failure_action(gate.on_failure, &message, at)
    }

    /// True when the given condition holds for the task's recorded evidence.
    fn condition_holds(&self, condition: GateCondition, task_id: &TaskId) -> bool {
        let manifest = self.recorder.manifest();
        match condition {
            GateCondition::Always => true,
            GateCondition::TestsPass => manifest
                .tests_run
                .iter()
                .filter(|record| record.task_id.as_ref() == Some(task_id))
                .all(|record| record.passed),
            GateCondition::ArtifactsRecorded => manifest
                .artifacts
                .iter()
                .any(|record| record.task_id.as_ref() == Some(task_id)),
        }
    }

    /// Applies a failure action, finalizing the bundle when it ends the run.
    fn apply_failure_action(
        &mut self,
        action: GateAction,
        message: &str,
        at: Timestamp,
    ) -> Result<(), DispatchError> {
        match action {
            GateAction::AbortMission => {
                self.skip_unfinished(SKIP_MISSION_ABORTED)?;
                self.recorder.mark_failed(message, at)?;
                self.terminal = Some(DispatchOutcome::Failed);
            }
            GateAction::SkipRemaining => {
                self.skip_unfinished(SKIP_REMAINING)?;
                self.recorder.mark_completed(at)?;
                self.terminal = Some(DispatchOutcome::Completed);
            }
            GateAction::Continue => {}
        }
        Ok(())
    }

    /// Records the budget-exhausted checkpoint once the ledger passes the
    /// mandate's limit.
    fn flag_budget_if_exhausted(&mut self, at: Timestamp) -> Result<(), DispatchError> {
        if self.budget_flagged {
            return Ok(());
        }
        let mandate = self.mandate.current()?;
        let Some(limit) = mandate.and_then(|current| current.budget_limit) else {
            return Ok(());
        };
        if self.ledger.total() > limit {
            self.recorder.record_checkpoint(
                CheckpointKind::BudgetExhausted,
                None,
                format!(
                    "cumulative spend {} exceeds budget {limit}",
                    self.ledger.total()
                ),
                at,
            )?;
            self.budget_flagged = true;
        }
        Ok(())
    }

    /// Skips every unfinished task with the given reason, in plan order.
    fn skip_unfinished(&mut self, reason: &str) -> Result<(), DispatchError> {
        for position in 0..self.plan.tasks.len() {
            if self.states[position].is_unfinished() {
                let task_id = self.plan.tasks[position].task_id.clone();
                self.recorder.record_task_skipped(task_id, reason)?;
                self.states[position] = TaskState::Skipped;
            }
        }
        Ok(())
    }

    /// Tasks currently suspended on approval, in plan order.
    fn awaiting_approval(&self) -> Vec<TaskId> {
        self.plan
            .tasks
            .iter()
            .zip(&self.states)
            .filter(|(_, state)| matches!(state, TaskState::Suspended))
            .map(|(task, _)| task.task_id.clone())
            .collect()
    }

    /// State of the named dependency, when it exists in the plan.
    fn dependency_state(&self, dependency: &TaskId) -> Option<TaskState> {
        self.index
            .get(dependency.as_str())
            .map(|position| self.states[*position])
    }

    /// Declared inputs plus executed upstream outputs keyed by task id.
    ///
    /// The `upstream` object is only injected when at least one dependency
    /// produced an output, so tasks without dependencies see their declared
    /// inputs unchanged.
    fn effective_inputs(&self, task: &PlannedTask) -> Map<String, Value> {
        let mut inputs = task.inputs.clone();
        let mut upstream = Map::new();
        for dependency in &task.depends_on {
            if let Some(output) = self.outputs.get(dependency.as_str()) {
                upstream.insert(dependency.to_string(), output.clone());
            }
        }
        if !upstream.is_empty() {
            inputs.insert(
                UPSTREAM_INPUT_KEY.to_string(),
                Value::Object(upstream),
            );
        }
        inputs
    }

    /// Next call identifier, unique within the bundle.
    fn next_call_id(&self) -> CallId {
        CallId::new(format!(
            "call-{}",
            self.recorder.manifest().tool_calls.len() + 1
        ))
    }
}

// ============================================================================
// SECTION: Helper Functions
// ============================================================================

/// Failure action in effect for a task, defaulting to aborting the mission.
fn effective_action(task: &PlannedTask) -> GateAction {
    task.gate
        .as_ref()
        .map_or(GateAction::AbortMission, |gate| gate.on_failure)
}

/// Terminal message for a task denied by the policy gate.
fn denial_message(task_id: &TaskId, reason: &str) -> String {
    format!("task {task_id} denied: {reason}")
}

/// Terminal message for a task that exhausted its attempts.
fn exhaustion_message(task_id: &TaskId, attempts: u32, source: &AgentInvocationError) -> String {
    format!("task {task_id} failed after {attempts} attempts: {source}")
}

/// Terminal message for a gate condition that did not hold.
fn gate_failure_message(task_id: &TaskId, condition: GateCondition) -> String {
    let condition_name = match condition {
        GateCondition::Always => "always",
        GateCondition::TestsPass => "tests_pass",
        GateCondition::ArtifactsRecorded => "artifacts_recorded",
    };
    format!("gate condition {condition_name} failed on task {task_id}")
}

/// Duration to record for a failed attempt.
const fn attempt_duration(source: &AgentInvocationError) -> u64 {
    match source {
        AgentInvocationError::Failed(_) => 0,
        AgentInvocationError::Timeout { timeout_ms } => *timeout_ms,
    }
}
