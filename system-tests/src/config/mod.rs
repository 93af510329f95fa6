// system-tests/src/config/mod.rs
// ============================================================================
// Module: System Test Configuration
// Description: Harness settings for the posts system-test binaries.
// Purpose: Give every suite the same artifact root, timeouts, and live target.
// Dependencies: api-verify-core
// ============================================================================

//! ## Overview
//! Harness settings come from environment variables only; see
//! [`SystemTestEnv`] for the knobs and their names.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::DEFAULT_ARTIFACT_ROOT;
pub use env::DEFAULT_LIVE_BASE_URL;
pub use env::LiveTarget;
pub use env::SystemTestConfig;
pub use env::SystemTestEnv;
