//! handeye CLI: rotation conversions, quaternion CSV reprocessing and Tsai
//! hand-eye calibration.

use std::path::PathBuf;

use anyhow::{bail, ensure, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use handeye_core::{
    euler_to_quaternion, euler_to_rotation, mat3_from_rows, quaternion_to_euler,
    quaternion_to_rotation, quaternion_to_wxyz, quaternion_wxyz, rotation_to_euler_xyz,
    rotation_to_quaternion, EulerZyx, Mat3, Real,
};
use handeye_linear::PairStrategy;
use handeye_pipeline::{
    load_json_file, reprocess_file, run_handeye, run_handeye_from_files, write_json_file,
    HandEyeConfig, HandEyeInput, InputKind, MalformedRowPolicy, ReprocessConfig,
};

#[derive(Debug, Parser)]
#[command(name = "handeye")]
#[command(about = "Hand-eye calibration and rotation conversion utilities")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert a single rotation between representations.
    Convert {
        #[arg(value_enum)]
        kind: ConversionKind,

        /// Input values: `w x y z`, `z y x` (radians, not the older tool's
        /// `z x y`) or 9 row-major matrix entries.
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        values: Vec<Real>,
    },

    /// Conjugate timestamped quaternion rows and write Euler angles.
    Reprocess(ReprocessArgs),

    /// Run Tsai hand-eye calibration on a JSON input file.
    Solve(SolveArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConversionKind {
    /// `w x y z` -> z-y-x Euler angles.
    QuatToEuler,
    /// `w x y z` -> rotation matrix.
    QuatToMatrix,
    /// Row-major matrix -> `w x y z`.
    MatrixToQuat,
    /// z-y-x Euler angles given as `z y x` -> `w x y z`.
    ///
    /// Note the argument order: the older transform tool took `z x y`.
    EulerToQuat,
    /// z-y-x Euler angles given as `z y x` -> rotation matrix.
    ///
    /// Note the argument order: the older transform tool took `z x y`.
    EulerToMatrix,
    /// Row-major matrix -> x-y-z Euler angles.
    MatrixToEulerXyz,
}

#[derive(Debug, Clone, Args)]
struct ReprocessArgs {
    /// Input CSV with `timestamp, w, x, y, z` rows.
    #[arg(long)]
    input: PathBuf,

    /// Output CSV (`timestamp,x,y,z`).
    #[arg(long)]
    output: PathBuf,

    /// Optional JSON ReprocessConfig.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reference quaternion as `w,x,y,z`; overrides the config value.
    #[arg(long, allow_hyphen_values = true)]
    reference: Option<String>,

    /// Skip malformed rows instead of aborting.
    #[arg(long)]
    skip_malformed: bool,

    /// Treat the first non-blank line as a header.
    #[arg(long)]
    has_header: bool,

    /// Fixed number of decimals in the output.
    #[arg(long)]
    precision: Option<usize>,
}

#[derive(Debug, Clone, Args)]
struct SolveArgs {
    /// JSON HandEyeInput.
    #[arg(long)]
    input: PathBuf,

    /// Optional JSON HandEyeConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the JSON report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Interpret the input as absolute poses paired with this strategy.
    #[arg(long, value_enum)]
    poses: Option<PairStrategyArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PairStrategyArg {
    Consecutive,
    AllPairs,
}

impl From<PairStrategyArg> for PairStrategy {
    fn from(value: PairStrategyArg) -> Self {
        match value {
            PairStrategyArg::Consecutive => PairStrategy::Consecutive,
            PairStrategyArg::AllPairs => PairStrategy::AllPairs,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Convert { kind, values } => {
            println!("{}", convert(kind, &values)?);
            Ok(())
        }
        Commands::Reprocess(args) => run_reprocess(&args),
        Commands::Solve(args) => {
            if let Some(json) = run_solve(&args)? {
                println!("{json}");
            }
            Ok(())
        }
    }
}

// ── convert ─────────────────────────────────────────────────────────────

fn expect_values(kind: ConversionKind, values: &[Real], n: usize) -> Result<()> {
    ensure!(
        values.len() == n,
        "{kind:?} expects {n} values, got {}",
        values.len()
    );
    Ok(())
}

fn matrix_from_values(values: &[Real]) -> Mat3 {
    mat3_from_rows(&[
        [values[0], values[1], values[2]],
        [values[3], values[4], values[5]],
        [values[6], values[7], values[8]],
    ])
}

fn format_values(values: &[Real]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_matrix(m: &Mat3) -> String {
    (0..3)
        .map(|r| format_values(&[m[(r, 0)], m[(r, 1)], m[(r, 2)]]))
        .collect::<Vec<_>>()
        .join("\n")
}

fn convert(kind: ConversionKind, values: &[Real]) -> Result<String> {
    match kind {
        ConversionKind::QuatToEuler => {
            expect_values(kind, values, 4)?;
            let q = quaternion_wxyz(values[0], values[1], values[2], values[3]);
            let e = quaternion_to_euler(&q)?;
            Ok(format!("z={} y={} x={}", e.z, e.y, e.x))
        }
        ConversionKind::QuatToMatrix => {
            expect_values(kind, values, 4)?;
            let q = quaternion_wxyz(values[0], values[1], values[2], values[3]);
            Ok(format_matrix(&quaternion_to_rotation(&q)?))
        }
        ConversionKind::MatrixToQuat => {
            expect_values(kind, values, 9)?;
            let q = rotation_to_quaternion(&matrix_from_values(values))?;
            Ok(format_values(&quaternion_to_wxyz(q.quaternion())))
        }
        ConversionKind::EulerToQuat => {
            expect_values(kind, values, 3)?;
            let q = euler_to_quaternion(&EulerZyx::new(values[0], values[1], values[2]));
            Ok(format_values(&quaternion_to_wxyz(q.quaternion())))
        }
        ConversionKind::EulerToMatrix => {
            expect_values(kind, values, 3)?;
            let r = euler_to_rotation(&EulerZyx::new(values[0], values[1], values[2]));
            Ok(format_matrix(&r))
        }
        ConversionKind::MatrixToEulerXyz => {
            expect_values(kind, values, 9)?;
            let e = rotation_to_euler_xyz(&matrix_from_values(values));
            Ok(format!("x={} y={} z={}", e.x, e.y, e.z))
        }
    }
}

// ── reprocess ───────────────────────────────────────────────────────────

fn parse_reference(text: &str) -> Result<[Real; 4]> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        bail!("reference must be `w,x,y,z`, got {text:?}");
    }
    let mut out = [0.0; 4];
    for (dst, part) in out.iter_mut().zip(&parts) {
        *dst = part
            .parse()
            .with_context(|| format!("invalid reference component {part:?}"))?;
    }
    Ok(out)
}

fn reprocess_config(args: &ReprocessArgs) -> Result<ReprocessConfig> {
    let mut config = match &args.config {
        Some(path) => load_json_file::<ReprocessConfig>(path)?,
        None => ReprocessConfig::default(),
    };
    if let Some(text) = &args.reference {
        config.reference = Some(parse_reference(text)?);
    }
    if args.skip_malformed {
        config.on_malformed = MalformedRowPolicy::Skip;
    }
    if args.has_header {
        config.has_header = true;
    }
    if args.precision.is_some() {
        config.precision = args.precision;
    }
    Ok(config)
}

fn run_reprocess(args: &ReprocessArgs) -> Result<()> {
    let config = reprocess_config(args)?;
    let summary = reprocess_file(&args.input, &args.output, &config)?;
    tracing::info!(
        "{} rows written, {} skipped",
        summary.rows_written,
        summary.rows_skipped
    );
    Ok(())
}

// ── solve ───────────────────────────────────────────────────────────────

fn solve_config(args: &SolveArgs) -> Result<Option<HandEyeConfig>> {
    let Some(strategy) = args.poses else {
        return Ok(None);
    };
    let mut config = match &args.config {
        Some(path) => load_json_file::<HandEyeConfig>(path)?,
        None => HandEyeConfig::default(),
    };
    config.input_kind = InputKind::Poses;
    config.pair_strategy = strategy.into();
    Ok(Some(config))
}

/// Runs the solve and returns the JSON report unless it was written to a file.
fn run_solve(args: &SolveArgs) -> Result<Option<String>> {
    let report = match solve_config(args)? {
        Some(config) => {
            let input: HandEyeInput = load_json_file(&args.input)?;
            run_handeye(&input, &config)?
        }
        None => run_handeye_from_files(&args.input, args.config.as_deref())?,
    };
    tracing::info!(
        "used {}/{} pairs, rotation rms {:.3e}, translation rms {:.3e}",
        report.used_pairs,
        report.total_pairs,
        report.rotation_rms,
        report.translation_rms
    );

    match &args.output {
        Some(path) => {
            write_json_file(&report, path)?;
            tracing::info!("report written to {}", path.display());
            Ok(None)
        }
        None => Ok(Some(serde_json::to_string_pretty(&report)?)),
    }
}
