// crates/mission-warden-config/src/lib.rs
// ============================================================================
// Module: Mission Warden Config Library
// Description: Canonical config model and fail-closed validation.
// Purpose: Single source of truth for mission-warden.toml semantics.
// Dependencies: mission-warden-core, serde, toml
// ============================================================================

//! ## Overview
//! `mission-warden-config` defines the canonical configuration model for
//! Mission Warden. Configuration inputs are untrusted: loading enforces path,
//! size, and encoding limits, and every section validates against hard caps
//! before any value reaches the dispatcher.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
