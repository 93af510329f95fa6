// crates/api-verify-config/src/lib.rs
// ============================================================================
// Module: API Verify Config Library
// Description: Canonical config model, file loading, and env overrides.
// Purpose: Single source of truth for api-verify.toml semantics.
// Dependencies: api-verify-core, serde, toml, url
// ============================================================================

//! ## Overview
//! `api-verify-config` defines the configuration model for the api-verify
//! harness: which target to exercise, how its backend treats writes, and where
//! reports and run events go. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use env::ConfigEnv;
pub use env::read_env_strict;
