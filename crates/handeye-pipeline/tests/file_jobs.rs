//! End-to-end runs of the file-level jobs on temporary files.

use std::fs;

use handeye_core::{synthetic, Vec3};
use handeye_pipeline::{
    reprocess_file, run_handeye_from_files, write_json_file, HandEyeInput, MalformedRowPolicy,
    ReprocessConfig,
};
use tempfile::tempdir;

fn parse_output(text: &str) -> Vec<(String, [f64; 3])> {
    text.lines()
        .map(|line| {
            let fields: Vec<&str> = line.split(',').collect();
            assert_eq!(fields.len(), 4, "bad output row {line:?}");
            let v: Vec<f64> = fields[1..].iter().map(|f| f.parse().unwrap()).collect();
            (fields[0].to_string(), [v[0], v[1], v[2]])
        })
        .collect()
}

#[test]
fn reprocess_csv_file() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("imu.csv");
    let output = dir.path().join("euler.csv");
    fs::write(
        &input,
        "stamp,w,x,y,z\n\
         1.000, 0.70710678, 0.70710678, 0.0, 0.0\n\
         \n\
         2.000, 1.0, 0.0, 0.0, 0.0\n",
    )
    .unwrap();

    let config = ReprocessConfig {
        reference: Some([0.596264, -0.686273, -0.336134, -0.245992]),
        has_header: true,
        ..ReprocessConfig::default()
    };
    let summary = reprocess_file(&input, &output, &config).unwrap();
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.rows_skipped, 0);

    let rows = parse_output(&fs::read_to_string(&output).unwrap());
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].0, "1.000");
    let expected = [0.958855389, -0.319641423, 1.104966139];
    for (got, want) in rows[0].1.iter().zip(expected) {
        assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
    }
    assert_eq!(rows[1].0, "2.000");
}

#[test]
fn reprocess_skips_and_counts_bad_rows() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("imu.csv");
    let output = dir.path().join("euler.csv");
    fs::write(
        &input,
        "1,1,0,0,0\n2,zero,0,0,0\n3,0,0,0,0\n4,1,0,0\n5,0,0,0,1\n",
    )
    .unwrap();

    let config = ReprocessConfig {
        reference: Some([1.0, 0.0, 0.0, 0.0]),
        on_malformed: MalformedRowPolicy::Skip,
        precision: Some(4),
        ..ReprocessConfig::default()
    };
    let summary = reprocess_file(&input, &output, &config).unwrap();
    assert_eq!(summary.rows_written, 2);
    assert_eq!(summary.rows_skipped, 3);

    let text = fs::read_to_string(&output).unwrap();
    let stamps: Vec<&str> = text.lines().map(|l| l.split(',').next().unwrap()).collect();
    assert_eq!(stamps, ["1", "5"]);
    let rows = parse_output(&text);
    // 180 degrees about z
    let [x, y, z] = rows[1].1;
    assert!(x.abs() < 1e-4 && y.abs() < 1e-4);
    assert!((z - std::f64::consts::PI).abs() < 1e-4);
    assert!(text.lines().all(|l| l.split(',').skip(1).all(|f| f.split('.').nth(1).map(str::len) == Some(4))));
}

#[test]
fn reprocess_aborts_on_first_bad_row_by_default() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("imu.csv");
    let output = dir.path().join("euler.csv");
    fs::write(&input, "1,1,0,0,0\n2,1,0,0\n").unwrap();

    let config = ReprocessConfig {
        reference: Some([1.0, 0.0, 0.0, 0.0]),
        ..ReprocessConfig::default()
    };
    let err = reprocess_file(&input, &output, &config).unwrap_err();
    assert!(format!("{err:#}").contains("line 2"), "{err:#}");
}

#[test]
fn missing_input_names_the_path() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("missing.csv");
    let output = dir.path().join("euler.csv");
    let config = ReprocessConfig {
        reference: Some([1.0, 0.0, 0.0, 0.0]),
        ..ReprocessConfig::default()
    };
    let err = reprocess_file(&input, &output, &config).unwrap_err();
    assert!(format!("{err:#}").contains("missing.csv"));
}

#[test]
fn solve_from_json_files() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("motions.json");
    let config_path = dir.path().join("config.json");

    let hcg =
        synthetic::motion(&Vec3::new(-0.3, 0.8, 0.4), 0.9, Vec3::new(0.03, -0.06, 0.12)).unwrap();
    let gripper = synthetic::default_gripper_motions();
    let camera = synthetic::camera_motions(&hcg, &gripper);
    write_json_file(&HandEyeInput::from_transforms(&gripper, &camera), &input_path).unwrap();
    fs::write(&config_path, r#"{ "tsai": { "min_pairs": 4 } }"#).unwrap();

    let report = run_handeye_from_files(&input_path, Some(&config_path)).unwrap();
    assert_eq!(report.used_pairs, 5);
    assert!(report.skipped_pairs.is_empty());
    assert!(report.rotation_rms < 1e-9);
    let est = report.transform().unwrap();
    assert!((est.to_matrix() - hcg.to_matrix()).norm() < 1e-9);

    let defaults = run_handeye_from_files(&input_path, None).unwrap();
    assert_eq!(defaults.used_pairs, 5);
}

#[test]
fn solve_rejects_too_few_pairs_from_config() {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join("motions.json");
    let config_path = dir.path().join("config.json");

    let hcg =
        synthetic::motion(&Vec3::new(0.0, 0.0, 1.0), 0.5, Vec3::new(0.1, 0.0, 0.0)).unwrap();
    let gripper = synthetic::default_gripper_motions();
    let camera = synthetic::camera_motions(&hcg, &gripper);
    write_json_file(&HandEyeInput::from_transforms(&gripper, &camera), &input_path).unwrap();
    fs::write(&config_path, r#"{ "tsai": { "min_pairs": 6 } }"#).unwrap();

    let err = run_handeye_from_files(&input_path, Some(&config_path)).unwrap_err();
    assert!(format!("{err:#}").contains("at least 6"), "{err:#}");
}
