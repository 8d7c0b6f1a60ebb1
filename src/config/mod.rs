// src/config/mod.rs

//! Build plan loading and validation for wavebuild.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a plan file from disk (`loader.rs`).
//! - Validate invariants like group graph correctness (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigSection, GroupConfig, PlanFile, RawPlanFile};
pub use validate::validate_raw_plan;
