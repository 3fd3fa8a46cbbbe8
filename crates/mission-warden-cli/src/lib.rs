// crates/mission-warden-cli/src/lib.rs
// ============================================================================
// Module: Mission Warden CLI Library
// Description: Shared helpers for the Mission Warden command-line interface.
// Purpose: Provide reusable components (i18n) for the CLI binary and tests.
// Dependencies: Standard library.
// ============================================================================

//! ## Overview
//! This library module houses shared CLI utilities, including the internationalized
//! message catalog. The binary entry point (`src/main.rs`) imports these helpers
//! to keep all user-facing output consistent.
//!
//! Security posture: CLI inputs are untrusted and must be validated before use.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;

#[cfg(test)]
mod tests;
