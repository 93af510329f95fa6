// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for API Verify system-tests.
// Purpose: Provide the posts stub, CLI invocation, and artifact utilities.
// Dependencies: system-tests, api-verify-core, axum
// ============================================================================

//! ## Overview
//! Shared helpers for API Verify system-tests.
//! Invariants:
//! - Stub servers bind loopback only and shut down when their handle drops.
//! - Every test writes a summary under its run root, even on panic.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod artifacts;
pub mod cli;
pub mod harness;
pub mod posts_stub;
