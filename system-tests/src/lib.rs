// system-tests/src/lib.rs
// ============================================================================
// Module: API Verify System Tests Library
// Description: Shared configuration and helpers for system test scenarios.
// Purpose: Provide common utilities for API Verify system-test binaries.
// Dependencies: api-verify-core
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the API Verify system-test
//! binaries in `system-tests/tests`. The binaries drive the verification
//! suite over real HTTP against a local stub and, behind the `live-tests`
//! feature, against a public endpoint.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
