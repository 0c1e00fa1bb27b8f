//! Subcommand bodies.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::NamedTempFile;
use tiltslice_gcode::{write_program, EmitSummary, Template};
use tiltslice_mesh::{load_stl, simplify, write_stl};
use tiltslice_slicer::{slice, SliceOutput, Strategy};
use tracing::{info, warn};

use crate::args::{SimplifyArgs, SliceArgs};

/// Machine-readable summary written by `slice --report`.
#[derive(Debug, Serialize)]
pub struct Report {
    pub strategy: String,
    pub layers: usize,
    pub lines: usize,
    pub extrusion: f64,
    pub rotations: usize,
    pub incline_brackets: usize,
    pub degenerate_triangles: usize,
    pub open_contours: usize,
    pub degenerate_contours: usize,
}

impl Report {
    fn new(strategy: Strategy, output: &SliceOutput, summary: &EmitSummary) -> Self {
        let (degenerate_triangles, open_contours, degenerate_contours) =
            output.diagnostics.counts();
        Self {
            strategy: strategy.id().to_string(),
            layers: summary.layers,
            lines: summary.lines,
            extrusion: summary.extrusion,
            rotations: output
                .stream
                .commands()
                .iter()
                .filter(|c| c.is_rotation())
                .count(),
            incline_brackets: output.stream.incline_brackets(),
            degenerate_triangles,
            open_contours,
            degenerate_contours,
        }
    }
}

pub fn run_slice(args: &SliceArgs) -> Result<()> {
    let settings = args.settings()?;
    let strategy = args.slicing_type;

    let mesh = load_stl(&args.stl)
        .with_context(|| format!("Failed to load {}", args.stl.display()))?
        .shifted_to(&args.origin());
    info!(
        file = %args.stl.display(),
        triangles = mesh.len(),
        "Loaded model"
    );

    let header = load_template(args.header.as_deref(), Template::default_header)?;
    let footer = load_template(args.footer.as_deref(), Template::default_footer)?;

    let output = slice(&mesh, strategy, &settings)
        .with_context(|| format!("Slicing {} with {strategy} failed", args.stl.display()))?;
    if output.diagnostics.is_clean() {
        info!("No geometry issues");
    } else {
        warn!(issues = output.diagnostics.len(), "{}", output.diagnostics);
    }

    let summary = write_atomic(&args.gcode, |out| {
        Ok(write_program(&output.stream, &settings, &header, &footer, out)?)
    })
    .with_context(|| format!("Failed to write {}", args.gcode.display()))?;

    let report = Report::new(strategy, &output, &summary);
    if let Some(path) = &args.report {
        let json = serde_json::to_string_pretty(&report)?;
        fs::write(path, json + "\n")
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }

    println!(
        "Sliced {} into {} ({} layers, {} rotations, {:.1} mm extruded)",
        args.stl.display(),
        args.gcode.display(),
        report.layers,
        report.rotations,
        report.extrusion
    );
    Ok(())
}

pub fn run_simplify(args: &SimplifyArgs) -> Result<()> {
    let mesh = load_stl(&args.stl)
        .with_context(|| format!("Failed to load {}", args.stl.display()))?;
    let simplified = simplify(&mesh, args.triangles).with_context(|| {
        format!(
            "Failed to simplify {} to {} triangles",
            args.stl.display(),
            args.triangles
        )
    })?;

    write_atomic(&args.output, |out| Ok(write_stl(&simplified, out)?))
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    println!(
        "Simplified {} from {} to {} triangles into {}",
        args.stl.display(),
        mesh.len(),
        simplified.len(),
        args.output.display()
    );
    Ok(())
}

fn load_template(path: Option<&Path>, default: fn() -> Template) -> Result<Template> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            Ok(Template::parse(&text))
        }
        None => Ok(default()),
    }
}

/// Run `write` against a temporary file next to `dest`, then move it into
/// place. On any error `dest` is left untouched.
pub fn write_atomic<T>(
    dest: &Path,
    write: impl FnOnce(&mut BufWriter<&mut NamedTempFile>) -> Result<T>,
) -> Result<T> {
    let dir = match dest.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;

    let value = {
        let mut out = BufWriter::new(&mut tmp);
        let value = write(&mut out)?;
        out.flush()?;
        value
    };
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(value)
}
