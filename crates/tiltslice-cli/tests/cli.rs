//! Runs the `tiltslice` binary against files in a scratch directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;
use tiltslice_math::Point3;
use tiltslice_mesh::{load_stl, save_stl, Mesh};

fn tiltslice(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tiltslice"))
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap()
}

/// A 10 mm cube away from the origin, written to `cube.stl`.
fn setup() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let stl = dir.path().join("cube.stl");
    let cube = Mesh::cuboid(Point3::new(20.0, 20.0, 5.0), Point3::new(30.0, 30.0, 15.0));
    save_stl(&cube, &stl).unwrap();
    (dir, stl)
}

#[test]
fn test_slice_planar_with_report() {
    let (dir, _) = setup();
    let out = tiltslice(
        dir.path(),
        &[
            "slice",
            "-s",
            "cube.stl",
            "-o",
            "cube.gcode",
            "--slicing-type",
            "3axes",
            "--report",
            "report.json",
        ],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let gcode = fs::read_to_string(dir.path().join("cube.gcode")).unwrap();
    assert!(gcode.contains("; layers 50\n"));
    assert!(gcode.contains(";LAYER:49\n"));
    assert!(!gcode.contains(";LAYER:50\n"));
    assert!(gcode.contains("M104 S200"));
    // The model was centred on the origin in X/Y.
    let xs: Vec<f64> = gcode
        .lines()
        .filter(|l| l.starts_with("G0 X") || l.starts_with("G1 X"))
        .filter_map(|l| l.split_whitespace().nth(1))
        .map(|x| x[1..].parse().unwrap())
        .collect();
    assert!(!xs.is_empty());
    assert!(xs.iter().all(|x| (-5.0 - 1e-3..=5.0 + 1e-3).contains(x)));
    assert!(xs.iter().any(|x| *x < 0.0));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report["strategy"], "3axes");
    assert_eq!(report["layers"], 50);
    assert_eq!(report["rotations"], 0);
    assert!(report["extrusion"].as_f64().unwrap() > 0.0);
}

#[test]
fn test_slice_settings_reach_output() {
    let (dir, _) = setup();
    fs::write(dir.path().join("header.txt"), "; custom {layer_count} {extruder_temperature}\n").unwrap();
    fs::write(dir.path().join("settings.toml"), "extruder_temperature = 215\n").unwrap();

    let out = tiltslice(
        dir.path(),
        &[
            "slice",
            "-s",
            "cube.stl",
            "--slicing-type",
            "3axes",
            "-t",
            "0.5",
            "--config",
            "settings.toml",
            "--header",
            "header.txt",
            "--print-speed-layer1",
            "10",
            "--fan-off-layer1",
        ],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let gcode = fs::read_to_string(dir.path().join("out.gcode")).unwrap();
    assert!(gcode.starts_with("; custom 20 215\n;LAYER:0\nM107\nF600\n"));
}

#[test]
fn test_vip_with_planes_file() {
    let (dir, _) = setup();
    fs::write(dir.path().join("planes_file.txt"), "# candidate tilts\n30\n-15\n").unwrap();

    let out = tiltslice(dir.path(), &["slice", "-s", "cube.stl", "--report", "report.json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
            .unwrap();
    assert_eq!(report["strategy"], "vip");
    assert_eq!(report["layers"], 50);
    assert_eq!(report["incline_brackets"], 0);
}

#[test]
fn test_failed_slice_writes_nothing() {
    let (dir, _) = setup();
    let out = tiltslice(
        dir.path(),
        &["slice", "-s", "cube.stl", "--planes-file", "missing.txt"],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("missing.txt"));
    assert!(!dir.path().join("out.gcode").exists());

    let out = tiltslice(dir.path(), &["slice", "-s", "nope.stl"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("nope.stl"));
}

#[test]
fn test_simplify() {
    let (dir, _) = setup();

    let out = tiltslice(dir.path(), &["simplify", "-s", "cube.stl", "-o", "small.stl"]);
    assert!(!out.status.success());
    assert!(!dir.path().join("small.stl").exists());

    let out = tiltslice(
        dir.path(),
        &["simplify", "-s", "cube.stl", "-o", "small.stl", "-t", "12"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let mesh = load_stl(dir.path().join("small.stl")).unwrap();
    assert_eq!(mesh.len(), 12);
}
