// src/config/loader.rs

use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::Result;

/// Load a build plan from a given path without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawPlanFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading build plan at {:?}", path))?;

    let plan: RawPlanFile = toml::from_str(&contents)?;
    Ok(plan)
}

/// Load a build plan from path and validate it.
///
/// This is the entry point used by the binary:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for unknown `from` references, cycles, empty variant lists and
///   global config sanity.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<PlanFile> {
    let raw = load_from_path(&path)?;
    PlanFile::try_from(raw)
}
