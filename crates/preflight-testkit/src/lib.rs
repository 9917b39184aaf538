//! Shared test utilities for the preflight workspace.
//!
//! This crate provides:
//! - **arb**: Proptest strategies for project ids, tokens and image references
//! - **fixtures**: Common test fixtures (sample configs, results)
//! - **schema**: JSON schema validators for DTOs
//!
//! # Example
//!
//! ```rust,ignore
//! use preflight_testkit::arb;
//! use proptest::prelude::*;
//!
//! proptest! {
//!     fn legacy_ids_normalize(id in arb::arb_legacy_project_id()) {
//!         assert!(id.starts_with("ospid-"));
//!     }
//! }
//! ```

pub mod arb;
pub mod fixtures;
pub mod schema;

// Re-export commonly used items
pub use arb::{
    arb_canonical_project_id, arb_image_reference, arb_legacy_project_id,
    arb_malformed_project_id, arb_token,
};
pub use fixtures::{sample_configs, sample_results};
pub use schema::{validate_config_file, validate_user_response_json};
