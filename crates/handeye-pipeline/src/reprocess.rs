//! Quaternion CSV reprocessing.
//!
//! Each input row is `timestamp, w, x, y, z` (scalar-first quaternion), with
//! surrounding whitespace trimmed from every field. For every row the sample
//! `q` is conjugated through the reference quaternion `r`,
//!
//! ```text
//! q_out = normalize(r * q * conj(r))
//! ```
//!
//! and written as `timestamp,euler_x,euler_y,euler_z` using the z-y-x
//! convention of [`handeye_core::quaternion_to_euler`].
//!
//! The reference quaternion is always supplied by the caller (config file or
//! command line); it describes a calibration of the sensor mounting and has
//! no meaningful default.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use anyhow::{anyhow, bail, ensure, Context, Result};
use handeye_core::{
    normalize_quaternion, quaternion_to_euler, quaternion_wxyz, EulerZyx, Quat, Real, UnitQuat,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Number of comma-separated fields in an input row.
pub const INPUT_FIELDS: usize = 5;

/// What to do with a row that cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedRowPolicy {
    /// Stop with an error naming the offending line.
    #[default]
    Abort,
    /// Log a warning and continue with the next row.
    Skip,
}

/// Configuration for [`reprocess_reader`] / [`reprocess_file`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReprocessConfig {
    /// Reference quaternion `[w, x, y, z]`; need not be normalized.
    pub reference: Option<[Real; 4]>,
    /// Policy for rows that fail to parse.
    pub on_malformed: MalformedRowPolicy,
    /// Skip the first non-blank line.
    pub has_header: bool,
    /// Fixed number of decimals for the Euler angles; shortest round-trip
    /// representation when `None`.
    pub precision: Option<usize>,
}

impl ReprocessConfig {
    /// The normalized reference quaternion.
    pub fn reference_quaternion(&self) -> Result<UnitQuat> {
        let [w, x, y, z] = self
            .reference
            .ok_or_else(|| anyhow!("no reference quaternion configured"))?;
        normalize_quaternion(&quaternion_wxyz(w, x, y, z))
            .map_err(|e| anyhow!("invalid reference quaternion: {e}"))
    }
}

/// Parsed input row.
#[derive(Debug, Clone, PartialEq)]
pub struct QuaternionSample {
    pub timestamp: String,
    pub quaternion: Quat,
}

/// Output row.
#[derive(Debug, Clone, PartialEq)]
pub struct EulerSample {
    pub timestamp: String,
    pub euler: EulerZyx,
}

/// Counters returned by a reprocessing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReprocessSummary {
    pub rows_written: usize,
    pub rows_skipped: usize,
}

/// Parse `timestamp, w, x, y, z`.
pub fn parse_row(line: &str) -> Result<QuaternionSample> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    ensure!(
        fields.len() == INPUT_FIELDS,
        "expected {} fields, got {}",
        INPUT_FIELDS,
        fields.len()
    );
    ensure!(!fields[0].is_empty(), "empty timestamp");

    let mut wxyz = [0.0; 4];
    for (value, (field, name)) in wxyz
        .iter_mut()
        .zip(fields[1..].iter().zip(["w", "x", "y", "z"]))
    {
        *value = field
            .parse::<Real>()
            .with_context(|| format!("invalid {name} component {field:?}"))?;
        ensure!(value.is_finite(), "non-finite {name} component {field:?}");
    }

    Ok(QuaternionSample {
        timestamp: fields[0].to_string(),
        quaternion: quaternion_wxyz(wxyz[0], wxyz[1], wxyz[2], wxyz[3]),
    })
}

/// `normalize(reference * q * conj(reference))`.
pub fn conjugate_through(reference: &UnitQuat, q: &Quat) -> Result<UnitQuat> {
    let r = reference.quaternion();
    let out = r * q * r.conjugate();
    normalize_quaternion(&out).map_err(|e| anyhow!("cannot normalize conjugated sample: {e}"))
}

/// Conjugate one sample and convert it to z-y-x Euler angles.
pub fn reprocess_sample(reference: &UnitQuat, sample: &QuaternionSample) -> Result<EulerSample> {
    let q = conjugate_through(reference, &sample.quaternion)?;
    let euler = quaternion_to_euler(q.quaternion())
        .map_err(|e| anyhow!("cannot convert sample to Euler angles: {e}"))?;
    Ok(EulerSample {
        timestamp: sample.timestamp.clone(),
        euler,
    })
}

/// `timestamp,x,y,z`.
pub fn format_row(sample: &EulerSample, precision: Option<usize>) -> String {
    let [x, y, z] = sample.euler.to_xyz_array();
    match precision {
        Some(p) => format!("{},{:.p$},{:.p$},{:.p$}", sample.timestamp, x, y, z),
        None => format!("{},{},{},{}", sample.timestamp, x, y, z),
    }
}

/// Reprocess all rows from `reader` into `writer`.
pub fn reprocess_reader<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    config: &ReprocessConfig,
) -> Result<ReprocessSummary> {
    let reference = config.reference_quaternion()?;
    let mut summary = ReprocessSummary::default();
    let mut header_pending = config.has_header;

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("failed to read line {line_no}"))?;
        if line.trim().is_empty() {
            continue;
        }
        if header_pending {
            header_pending = false;
            continue;
        }

        let result = parse_row(&line).and_then(|sample| reprocess_sample(&reference, &sample));
        match result {
            Ok(out) => {
                writeln!(writer, "{}", format_row(&out, config.precision))
                    .with_context(|| format!("failed to write row for line {line_no}"))?;
                summary.rows_written += 1;
            }
            Err(err) => match config.on_malformed {
                MalformedRowPolicy::Abort => {
                    bail!("line {line_no}: {err:#}");
                }
                MalformedRowPolicy::Skip => {
                    warn!("skipping line {line_no}: {err:#}");
                    summary.rows_skipped += 1;
                }
            },
        }
    }

    writer.flush().context("failed to flush output")?;
    Ok(summary)
}

/// Reprocess `input` into `output` (created or truncated).
pub fn reprocess_file(
    input: &Path,
    output: &Path,
    config: &ReprocessConfig,
) -> Result<ReprocessSummary> {
    // check the reference before touching the output file
    config.reference_quaternion()?;

    let reader = BufReader::new(
        File::open(input).with_context(|| format!("failed to open {}", input.display()))?,
    );
    let writer = BufWriter::new(
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?,
    );
    let summary = reprocess_reader(reader, writer, config)
        .with_context(|| format!("while reprocessing {}", input.display()))?;
    info!(
        "reprocessed {}: {} rows written, {} skipped -> {}",
        input.display(),
        summary.rows_written,
        summary.rows_skipped,
        output.display()
    );
    Ok(summary)
}
