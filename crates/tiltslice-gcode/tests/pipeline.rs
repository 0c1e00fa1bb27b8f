//! Mesh to G-code, end to end.

use approx::assert_abs_diff_eq;
use tiltslice_gcode::{write_program, Template, DEFAULT_FOOTER, DEFAULT_HEADER};
use tiltslice_math::Point3;
use tiltslice_mesh::Mesh;
use tiltslice_slicer::{slice_discretized, slice_planar, Command, Layer, Settings};

fn cube() -> Mesh {
    Mesh::cuboid(Point3::origin(), Point3::new(10.0, 10.0, 10.0))
}

fn extrusion_values(text: &str) -> Vec<f64> {
    text.lines()
        .filter(|l| l.starts_with("G1 "))
        .filter_map(|l| l.split_once(" E"))
        .map(|(_, e)| e.parse().unwrap())
        .collect()
}

#[test]
fn test_cube_to_gcode() {
    let settings = Settings::default();
    let output = slice_planar(&cube(), &settings).unwrap();
    assert_eq!(output.stream.layer_count(), 50);

    let mut out = Vec::new();
    let summary = write_program(
        &output.stream,
        &settings,
        &Template::default_header(),
        &Template::default_footer(),
        &mut out,
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(summary.layers, 50);
    assert!(text.contains("; layers 50\n"));
    assert_eq!(text.matches(";LAYER:").count(), 50);
    assert!(text.contains(";LAYER:0\n"));
    assert!(text.contains(";LAYER:49\n"));
    assert!(!text.contains(";LAYER:50\n"));

    let printed: f64 = output.stream.layers().map(Layer::print_length).sum();
    assert_abs_diff_eq!(summary.extrusion, printed, epsilon = 1e-6);

    let values = extrusion_values(&text);
    assert!(values.windows(2).all(|w| w[1] >= w[0]));
    let last = values.last().copied().unwrap();
    assert_abs_diff_eq!(last, printed, epsilon = 1e-3);
}

#[test]
fn test_first_layer_speed_and_fan() {
    let settings = Settings {
        print_speed_layer1: 900,
        fan_off_layer1: true,
        ..Settings::default()
    };
    let output = slice_planar(&cube(), &settings).unwrap();
    let mut out = Vec::new();
    write_program(
        &output.stream,
        &settings,
        &Template::parse(""),
        &Template::parse(""),
        &mut out,
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with(";LAYER:0\nM107\nF900\n;OUTER_PATHS\n"));
    assert!(text.contains(";LAYER:1\nM106\nF3000\n;OUTER_PATHS\n"));
}

#[test]
fn test_tilted_program_brackets() {
    let center = Point3::new(5.0, 5.0, 5.0);
    let tilt = tiltslice_math::Transform::about_point(
        &center,
        &tiltslice_math::Transform::rotation_x(30f64.to_radians()),
    );
    let mesh = cube()
        .transformed(&tilt)
        .shifted_to(&Point3::new(5.0, 5.0, 0.0));
    let settings = Settings::default();
    let output = slice_discretized(&mesh, &[0.0, 15.0, 30.0], &settings).unwrap();
    assert!(output
        .stream
        .commands()
        .iter()
        .any(|c| matches!(c, Command::InclineOn)));

    let mut out = Vec::new();
    write_program(
        &output.stream,
        &settings,
        &Template::parse(""),
        &Template::parse(""),
        &mut out,
    )
    .unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.starts_with("M43\nG62 X30.000 Z0.000\n;LAYER:0\n"));
    assert!(text.ends_with("G62 X0.000 Z0.000\nM42\n"));
}

#[test]
fn test_program_into_file() {
    let settings = Settings::default();
    let output = slice_planar(&cube(), &settings).unwrap();

    let mut file = tempfile::NamedTempFile::new().unwrap();
    let summary = write_program(
        &output.stream,
        &settings,
        &Template::default_header(),
        &Template::default_footer(),
        std::io::BufWriter::new(file.as_file_mut()),
    )
    .unwrap();

    let text = std::fs::read_to_string(file.path()).unwrap();
    assert_eq!(
        text.lines().count(),
        summary.lines + DEFAULT_HEADER.lines().count() + DEFAULT_FOOTER.lines().count()
    );
    assert!(text.ends_with("M84 ; Disable motors\n"));
}
