// crates/mission-warden-core/src/core/policy.rs
// ============================================================================
// Module: Mission Warden Policy Gate Engine
// Description: Pure risk-tier policy evaluation for planned tasks.
// Purpose: Decide allow, deny, or requires-approval before any dispatch.
// Dependencies: crate::core::{mandate, plan}, serde
// ============================================================================

//! ## Overview
//! The policy gate is a pure function over a planned task, the mandate in
//! force, and the cumulative spend ledger. It never reads a clock, never
//! performs IO, and returns the same decision for the same inputs. Deny
//! reasons are fixed strings published as constants so callers and evidence
//! records stay consistent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::mandate::ApprovalStatus;
use crate::core::mandate::Mandate;
use crate::core::mandate::RiskTier;
use crate::core::plan::PlannedTask;

// ============================================================================
// SECTION: Deny Reasons
// ============================================================================

/// Deny reason when a tier R2+ task runs without any mandate.
pub const REASON_MANDATE_REQUIRED: &str = "mandate required";

/// Deny reason when the mandate was rejected by its approver.
pub const REASON_MANDATE_REJECTED: &str = "mandate rejected";

/// Deny reason when the task's tier exceeds the mandate's ceiling.
pub const REASON_RISK_TIER_EXCEEDS_MANDATE: &str = "risk tier exceeds mandate";

/// Deny reason when the task's tool is outside the mandate allowlist.
pub const REASON_TOOL_NOT_IN_ALLOWLIST: &str = "tool not in mandate allowlist";

/// Deny reason when cumulative spend has passed the mandate budget.
pub const REASON_BUDGET_EXHAUSTED: &str = "budget exhausted";

/// Deny reason when a tier R3+ task has no approval on record.
pub const REASON_APPROVAL_REQUIRED: &str = "approval required";

// ============================================================================
// SECTION: Gate Decision
// ============================================================================

/// Outcome of one policy gate evaluation.
///
/// # Invariants
///
/// - `Deny` always carries a non-empty reason.
/// - Decisions are recorded verbatim in evidence bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateDecision {
    /// The task may be dispatched.
    Allow,
    /// The task must not be dispatched.
    Deny {
        /// Why the gate refused.
        reason: String,
    },
    /// The task must wait for a human approval.
    RequiresApproval,
}

impl GateDecision {
    /// Builds a denial with the given reason.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    /// Returns true when the decision permits dispatch.
    #[must_use]
    pub const fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Returns true when the decision refuses dispatch.
    #[must_use]
    pub const fn is_deny(&self) -> bool {
        matches!(self, Self::Deny { .. })
    }

    /// Returns true when the decision parks the task for approval.
    #[must_use]
    pub const fn is_requires_approval(&self) -> bool {
        matches!(self, Self::RequiresApproval)
    }

    /// Returns the deny reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Deny {
                reason,
            } => Some(reason.as_str()),
            Self::Allow | Self::RequiresApproval => None,
        }
    }
}

// ============================================================================
// SECTION: Spend Ledger
// ============================================================================

/// Cumulative mission spend in invoker-reported cost units.
///
/// # Invariants
///
/// - The total never decreases and saturates instead of overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpendLedger {
    /// Cost units recorded so far.
    spent: u64,
}

impl SpendLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            spent: 0,
        }
    }

    /// Records one task's reported cost.
    pub const fn record(&mut self, cost: u64) {
        self.spent = self.spent.saturating_add(cost);
    }

    /// Returns the cumulative spend.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.spent
    }
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

/// Evaluates the policy gate for one planned task.
///
/// The ladder, first match wins:
///
/// 1. Tier R0 is always allowed, mandate or not.
/// 2. Without a mandate, R1 is allowed and R2+ is denied.
/// 3. A rejected mandate denies every R2+ task.
/// 4. A task tier above the mandate's tier ceiling is denied.
/// 5. A declared tool outside a non-empty allowlist is denied.
/// 6. Spend beyond the mandate budget denies the task.
/// 7. R3 and R4 require an approval on record; a pending approval parks
///    the task, anything short of approved denies it.
/// 8. R2 parks on a pending approval and is otherwise allowed.
#[must_use]
pub fn evaluate_gate(
    task: &PlannedTask,
    mandate: Option<&Mandate>,
    ledger: &SpendLedger,
) -> GateDecision {
    if task.risk_tier == RiskTier::R0 {
        return GateDecision::Allow;
    }
    let Some(mandate) = mandate else {
        if task.risk_tier >= RiskTier::R2 {
            return GateDecision::deny(REASON_MANDATE_REQUIRED);
        }
        return GateDecision::Allow;
    };
    if mandate.approval_status.is_rejected() && task.risk_tier >= RiskTier::R2 {
        return GateDecision::deny(REASON_MANDATE_REJECTED);
    }
    if task.risk_tier > mandate.risk_tier {
        return GateDecision::deny(REASON_RISK_TIER_EXCEEDS_MANDATE);
    }
    if task
        .required_tool
        .as_ref()
        .is_some_and(|tool| !mandate.allows_tool(tool))
    {
        return GateDecision::deny(REASON_TOOL_NOT_IN_ALLOWLIST);
    }
    if mandate.budget_limit.is_some_and(|limit| ledger.total() > limit) {
        return GateDecision::deny(REASON_BUDGET_EXHAUSTED);
    }
    match task.risk_tier {
        RiskTier::R3 | RiskTier::R4 => match mandate.approval_status {
            ApprovalStatus::Approved => GateDecision::Allow,
            ApprovalStatus::Pending => GateDecision::RequiresApproval,
            ApprovalStatus::NotRequired | ApprovalStatus::Rejected => {
                GateDecision::deny(REASON_APPROVAL_REQUIRED)
            }
        },
        RiskTier::R2 => {
            if mandate.approval_status.is_pending() {
                GateDecision::RequiresApproval
            } else {
                GateDecision::Allow
            }
        }
        RiskTier::R0 | RiskTier::R1 => GateDecision::Allow,
    }
}
