// crates/mission-warden-cli/src/tests/mod.rs
// ============================================================================
// Module: CLI Library Tests
// Description: Test module wiring for shared CLI components.
// Purpose: Group unit tests for the CLI library crate.
// Dependencies: mission-warden-cli library modules
// ============================================================================

//! ## Overview
//! Unit tests for the shared CLI library components, currently the
//! internationalized message catalog.

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

mod i18n;
