//! File-level jobs built on `handeye-core` and `handeye-linear`.
//!
//! - [`reprocess`]: batch conversion of timestamped quaternion CSV rows into
//!   Euler angles, after conjugation through a reference quaternion.
//! - [`solve`]: hand-eye calibration from JSON motion/pose lists with a
//!   serializable report.
//!
//! Configuration structs are plain `serde` types with `Default` impls and are
//! usually loaded from JSON with [`load_json_file`].

use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

pub mod reprocess;
pub mod solve;

pub use reprocess::{
    reprocess_file, reprocess_reader, MalformedRowPolicy, ReprocessConfig, ReprocessSummary,
};
pub use solve::{
    run_handeye, run_handeye_from_files, HandEyeConfig, HandEyeInput, HandEyeReport, InputKind,
};

/// Read and deserialize a JSON file.
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&data)
        .with_context(|| format!("failed to parse JSON from {}", path.display()))?;
    Ok(value)
}

/// Serialize `value` as pretty JSON into `path`.
pub fn write_json_file<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
