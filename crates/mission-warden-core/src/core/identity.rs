// crates/mission-warden-core/src/core/identity.rs
// ============================================================================
// Module: Mission Warden Identity Resolution
// Description: Static alias table mapping agent handles to canonical identities.
// Purpose: Resolve any handle to exactly one canonical agent id with deprecation signals.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Agent handles in mission documents may be canonical identifiers or legacy
//! aliases kept alive for one release window. The alias table is built once at
//! process start and rejected wholesale if any alias overlaps another agent.
//! Resolution is a pure, side-effect-free lookup; alias hits return a
//! deprecation notice instead of failing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::AgentHandle;
use crate::core::identifiers::CanonicalAgentId;

// ============================================================================
// SECTION: Built-In Roster
// ============================================================================

/// Built-in department agents and their legacy aliases.
///
/// # Invariants
/// - Entries are collision-free: no alias repeats and none shadows a
///   canonical id.
const DEPARTMENT_ROSTER: &[(&str, &[&str])] = &[
    ("bob", &["robert", "lead"]),
    ("iam-qa", &["qa", "quality"]),
    ("iam-doc", &["doc", "docs"]),
    ("iam-dev", &["dev", "builder"]),
    ("iam-sec", &["sec"]),
    ("iam-ops", &["ops"]),
];

// ============================================================================
// SECTION: Alias Table
// ============================================================================

/// Immutable handle-to-canonical mapping for one process lifetime.
///
/// # Invariants
/// - Every canonical id maps to itself.
/// - An alias maps to exactly one canonical id and never shadows another
///   agent's canonical form.
#[derive(Debug, Clone)]
pub struct AliasTable {
    /// Handle string to canonical identity, canonical ids included.
    entries: BTreeMap<String, CanonicalAgentId>,
    /// Canonical id strings, used to distinguish alias hits from exact hits.
    canonical: BTreeSet<String>,
}

impl AliasTable {
    /// Starts an empty alias table builder.
    #[must_use]
    pub fn builder() -> AliasTableBuilder {
        AliasTableBuilder::default()
    }

    /// Returns the built-in department roster.
    ///
    /// Canonical ids follow the fixed namespace: `bob` for the orchestrating
    /// lead plus one `iam-<specialist>` per discipline. Legacy aliases are the
    /// short handles missions used before the namespace was fixed.
    #[must_use]
    pub fn department() -> Self {
        let mut entries = BTreeMap::new();
        let mut canonical = BTreeSet::new();
        for (agent, aliases) in DEPARTMENT_ROSTER {
            canonical.insert((*agent).to_string());
            entries.insert((*agent).to_string(), CanonicalAgentId::new(*agent));
            for alias in *aliases {
                entries.insert((*alias).to_string(), CanonicalAgentId::new(*agent));
            }
        }
        Self {
            entries,
            canonical,
        }
    }

    /// Starts a builder pre-seeded with the department roster.
    ///
    /// Deployments extend the roster through this builder; the roster entries
    /// themselves stay subject to the same build-time invariants.
    #[must_use]
    pub fn department_builder() -> AliasTableBuilder {
        let mut builder = Self::builder();
        for (agent, aliases) in DEPARTMENT_ROSTER {
            builder = builder.agent(*agent);
            for alias in *aliases {
                builder = builder.alias(*alias, *agent);
            }
        }
        builder
    }

    /// Returns the canonical ids registered in this table.
    #[must_use]
    pub fn canonical_ids(&self) -> Vec<CanonicalAgentId> {
        self.canonical.iter().map(CanonicalAgentId::new).collect()
    }

    /// Looks up a handle, distinguishing canonical hits from alias hits.
    #[must_use]
    fn lookup(&self, handle: &str) -> Option<(CanonicalAgentId, bool)> {
        self.entries
            .get(handle)
            .map(|canonical| (canonical.clone(), !self.canonical.contains(handle)))
    }
}

/// Incremental builder validating the alias table invariants.
#[derive(Debug, Default)]
pub struct AliasTableBuilder {
    /// Canonical agent ids registered so far, in insertion order.
    agents: Vec<String>,
    /// Alias to canonical pairs registered so far, in insertion order.
    aliases: Vec<(String, String)>,
}

impl AliasTableBuilder {
    /// Registers a canonical agent id.
    #[must_use]
    pub fn agent(mut self, canonical: impl Into<String>) -> Self {
        self.agents.push(canonical.into());
        self
    }

    /// Registers a legacy alias for a canonical agent id.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.push((alias.into(), canonical.into()));
        self
    }

    /// Builds the immutable table, rejecting overlapping entries.
    ///
    /// # Errors
    ///
    /// Returns [`AliasTableError`] when an agent or alias is duplicated, an
    /// alias shadows a canonical id, or an alias targets an unknown agent.
    pub fn build(self) -> Result<AliasTable, AliasTableError> {
        let mut entries: BTreeMap<String, CanonicalAgentId> = BTreeMap::new();
        let mut canonical: BTreeSet<String> = BTreeSet::new();

        for agent in self.agents {
            if !canonical.insert(agent.clone()) {
                return Err(AliasTableError::DuplicateAgent(agent));
            }
            entries.insert(agent.clone(), CanonicalAgentId::new(agent));
        }
        for (alias, target) in self.aliases {
            if canonical.contains(&alias) {
                return Err(AliasTableError::AliasShadowsAgent(alias));
            }
            if !canonical.contains(&target) {
                return Err(AliasTableError::UnknownTarget {
                    alias,
                    target,
                });
            }
            if entries.insert(alias.clone(), CanonicalAgentId::new(target)).is_some() {
                return Err(AliasTableError::DuplicateAlias(alias));
            }
        }

        Ok(AliasTable {
            entries,
            canonical,
        })
    }
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Pure, thread-safe resolver over a static alias table.
#[derive(Debug, Clone)]
pub struct IdentityResolver {
    /// The immutable table backing every lookup.
    table: AliasTable,
}

impl IdentityResolver {
    /// Creates a resolver over the given table.
    #[must_use]
    pub const fn new(table: AliasTable) -> Self {
        Self {
            table,
        }
    }

    /// Resolves a handle to its canonical agent identity.
    ///
    /// Alias hits succeed and carry a [`DeprecationNotice`] naming the call
    /// site so hosts can report legacy usage without breaking missions.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownAgentError`] when the handle matches neither a
    /// canonical id nor a registered alias.
    pub fn resolve(
        &self,
        handle: &AgentHandle,
        site: impl Into<String>,
    ) -> Result<Resolution, UnknownAgentError> {
        match self.table.lookup(handle.as_str()) {
            Some((canonical, via_alias)) => {
                let deprecation = via_alias.then(|| DeprecationNotice {
                    handle: handle.clone(),
                    canonical: canonical.clone(),
                    site: site.into(),
                });
                Ok(Resolution {
                    canonical,
                    deprecation,
                })
            }
            None => Err(UnknownAgentError {
                handle: handle.clone(),
            }),
        }
    }

    /// Returns the canonical ids known to this resolver.
    #[must_use]
    pub fn canonical_ids(&self) -> Vec<CanonicalAgentId> {
        self.table.canonical_ids()
    }
}

// ============================================================================
// SECTION: Resolution Types
// ============================================================================

/// Successful handle resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Canonical identity the handle resolves to.
    pub canonical: CanonicalAgentId,
    /// Present when resolution went through a legacy alias.
    pub deprecation: Option<DeprecationNotice>,
}

/// Deprecation signal emitted on alias hits.
///
/// # Invariants
/// - `handle` resolved to `canonical`; the alias keeps working for one full
///   release window while hosts surface the notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecationNotice {
    /// The legacy handle as written by the caller.
    pub handle: AgentHandle,
    /// Canonical identity the alias maps to.
    pub canonical: CanonicalAgentId,
    /// Call site the resolution was requested from.
    pub site: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Raised when a handle matches no canonical id and no alias.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown agent handle: {handle}")]
pub struct UnknownAgentError {
    /// The handle that failed to resolve.
    pub handle: AgentHandle,
}

/// Alias table construction failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AliasTableError {
    /// A canonical agent id was registered twice.
    #[error("duplicate canonical agent id: {0}")]
    DuplicateAgent(String),
    /// An alias was registered twice.
    #[error("duplicate alias: {0}")]
    DuplicateAlias(String),
    /// An alias collides with a canonical agent id.
    #[error("alias shadows canonical agent id: {0}")]
    AliasShadowsAgent(String),
    /// An alias targets an agent that was never registered.
    #[error("alias {alias} targets unknown agent {target}")]
    UnknownTarget {
        /// The alias being registered.
        alias: String,
        /// The missing canonical target.
        target: String,
    },
}
