// crates/mission-warden-core/src/core/mandate.rs
// ============================================================================
// Module: Mission Warden Mandate Model
// Description: Authorization context and risk tiers governing a mission run.
// Purpose: Provide the stable mandate schema consumed by the policy gate engine.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A mandate is the authorization context for one mission invocation. It is
//! created once, frozen into the evidence bundle as a snapshot, and mutable
//! only through `approval_status` transitions driven by an external approver.
//! Risk tiers order tasks from unrestricted (R0) to highest risk (R4).

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ToolName;

// ============================================================================
// SECTION: Risk Tiers
// ============================================================================

/// Ordinal risk tier declared on tasks and mandates.
///
/// # Invariants
/// - Ordering follows declaration order: `R0 < R1 < R2 < R3 < R4`.
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskTier {
    /// Unrestricted default tier.
    R0,
    /// Low risk; subject to tool allowlisting.
    R1,
    /// Moderate risk; requires a present mandate.
    R2,
    /// High risk; requires an approved mandate.
    R3,
    /// Highest risk; requires an approved mandate.
    R4,
}

impl RiskTier {
    /// Returns the tier as its canonical string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::R0 => "R0",
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
            Self::R4 => "R4",
        }
    }

    /// Returns true when the tier demands explicit approval (R3 and above).
    #[must_use]
    pub const fn requires_approval(&self) -> bool {
        matches!(self, Self::R3 | Self::R4)
    }

    /// Returns true when the tier demands a present mandate (R2 and above).
    #[must_use]
    pub const fn requires_mandate(&self) -> bool {
        matches!(self, Self::R2 | Self::R3 | Self::R4)
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for RiskTier {
    fn default() -> Self {
        Self::R0
    }
}

// ============================================================================
// SECTION: Approval Status
// ============================================================================

/// Approval lifecycle state of a mandate.
///
/// # Invariants
/// - Only an external approver mutates this field after mandate creation.
/// - Variants are stable for serialization and contract matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalStatus {
    /// Approval is not required for this mandate.
    NotRequired,
    /// Approval was requested and is awaiting a decision.
    Pending,
    /// An approver granted the mandate.
    Approved,
    /// An approver rejected the mandate.
    Rejected,
}

impl ApprovalStatus {
    /// Returns true when the status is `pending`.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Returns true when the status is `approved`.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self, Self::Approved)
    }

    /// Returns true when the status is `rejected`.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

// ============================================================================
// SECTION: Mandate
// ============================================================================

/// Authorization context for one mission invocation.
///
/// # Invariants
/// - Immutable after creation except for `approval_status` transitions.
/// - `risk_tier` is the ceiling the mandate authorizes; tasks above it are
///   denied by the policy gate engine.
/// - An empty `tool_allowlist` means unrestricted tool access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Mandate {
    /// Human-readable intent for the mission run.
    pub intent: String,
    /// Highest risk tier this mandate authorizes.
    pub risk_tier: RiskTier,
    /// Permitted external tools; empty means unrestricted.
    #[serde(default)]
    pub tool_allowlist: Vec<ToolName>,
    /// Optional spend ceiling in whole cost units reported by agent adapters.
    #[serde(default)]
    pub budget_limit: Option<u64>,
    /// Approval lifecycle state.
    pub approval_status: ApprovalStatus,
}

impl Mandate {
    /// Returns true when the allowlist permits the given tool.
    ///
    /// An empty allowlist permits every tool.
    #[must_use]
    pub fn allows_tool(&self, tool: &ToolName) -> bool {
        self.tool_allowlist.is_empty() || self.tool_allowlist.contains(tool)
    }
}
