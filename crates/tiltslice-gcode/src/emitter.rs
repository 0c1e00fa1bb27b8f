//! Instruction stream to G-code.
//!
//! The emitter walks the commands once. The extrusion axis `E` is absolute
//! and carried across the whole pass: every printed line adds its length,
//! so the value only ever grows.

use std::io::Write;

use serde::{Deserialize, Serialize};
use tiltslice_math::{Path, Point3};
use tiltslice_slicer::{Command, InstructionStream, Layer, LayerBatch};
use tracing::debug;

use crate::error::Result;

/// Decimal places for every coordinate, angle and extrusion value.
pub const DECIMALS: usize = 3;

/// Format a value with [`DECIMALS`] places; negative zero prints as zero.
pub fn format_coord(value: f64) -> String {
    let s = format!("{:.prec$}", value, prec = DECIMALS);
    if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
        s[1..].to_string()
    } else {
        s
    }
}

fn format_point(p: &Point3) -> String {
    format!(
        "X{} Y{} Z{}",
        format_coord(p.x),
        format_coord(p.y),
        format_coord(p.z)
    )
}

/// Totals after an emission pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmitSummary {
    /// Final value of the extrusion axis (mm of path).
    pub extrusion: f64,
    /// Layers written.
    pub layers: usize,
    /// Output lines written.
    pub lines: usize,
}

/// Writes commands as G-code into any [`Write`].
pub struct Emitter<W: Write> {
    writer: W,
    summary: EmitSummary,
}

impl<W: Write> Emitter<W> {
    /// Start a pass with the extrusion axis at zero.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            summary: EmitSummary::default(),
        }
    }

    /// Totals so far.
    pub fn summary(&self) -> EmitSummary {
        self.summary
    }

    /// The underlying writer, for text outside the command stream.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Give back the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Emit every command of `stream`.
    pub fn emit_stream(&mut self, stream: &InstructionStream) -> Result<EmitSummary> {
        for command in stream.commands() {
            self.emit_command(command)?;
        }
        debug!(
            layers = self.summary.layers,
            lines = self.summary.lines,
            extrusion = self.summary.extrusion,
            "Emitted instruction stream"
        );
        Ok(self.summary)
    }

    /// Emit one command.
    pub fn emit_command(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::InclineOn => self.line("M43"),
            Command::InclineOff => self.line("M42"),
            Command::RotateXZ { angle_x, angle_z } => self.line(&format!(
                "G62 X{} Z{}",
                format_coord(*angle_x),
                format_coord(*angle_z)
            )),
            Command::RotateZ { angle } => self.line(&format!("G0 A{}", format_coord(*angle))),
            Command::Layers(batch) => self.emit_batch(batch),
        }
    }

    fn emit_batch(&mut self, batch: &LayerBatch) -> Result<()> {
        for (i, layer) in batch.layers.iter().enumerate() {
            self.emit_layer(batch.first_index + i, layer)?;
        }
        Ok(())
    }

    fn emit_layer(&mut self, index: usize, layer: &Layer) -> Result<()> {
        self.line(&format!(";LAYER:{index}"))?;
        self.line(if layer.fan_off { "M107" } else { "M106" })?;

        self.line(&format!("F{}", layer.wall_print_speed))?;
        self.emit_paths("OUTER_PATHS", &layer.outer_wall)?;

        self.line(&format!("F{}", layer.print_speed))?;
        self.emit_paths("MIDDLE_PATHS", &layer.middle_paths)?;
        self.emit_paths("INNER_PATHS", &layer.inner_paths)?;
        self.emit_paths("FILL_PATHS", &layer.fill)?;

        self.summary.layers += 1;
        Ok(())
    }

    fn emit_paths(&mut self, role: &str, paths: &[Path]) -> Result<()> {
        self.line(&format!(";{role}"))?;
        for path in paths {
            let Some(start) = path.start() else {
                continue;
            };
            self.line(&format!("G0 {}", format_point(&start)))?;
            for line in &path.lines {
                self.summary.extrusion += line.length();
                self.line(&format!(
                    "G1 {} E{}",
                    format_point(&line.p2),
                    format_coord(self.summary.extrusion)
                ))?;
            }
        }
        Ok(())
    }

    fn line(&mut self, text: &str) -> Result<()> {
        writeln!(self.writer, "{text}")?;
        self.summary.lines += 1;
        Ok(())
    }
}

/// Emit `stream` into a string.
pub fn emit_to_string(stream: &InstructionStream) -> Result<String> {
    let mut emitter = Emitter::new(Vec::new());
    emitter.emit_stream(stream)?;
    Ok(String::from_utf8_lossy(&emitter.into_inner()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn square(z: f64) -> Path {
        Path::closed_from_points(&[
            Point3::new(0.0, 0.0, z),
            Point3::new(10.0, 0.0, z),
            Point3::new(10.0, 10.0, z),
            Point3::new(0.0, 10.0, z),
        ])
    }

    fn layer(z: f64) -> Layer {
        Layer {
            z,
            outer_wall: vec![square(z)],
            fill: vec![Path::from_points(&[
                Point3::new(1.0, 1.0, z),
                Point3::new(4.0, 5.0, z),
            ])],
            fan_off: z < 0.2,
            wall_print_speed: 1200,
            print_speed: 3000,
            ..Layer::default()
        }
    }

    #[test]
    fn test_format_coord() {
        assert_eq!(format_coord(1.0), "1.000");
        assert_eq!(format_coord(-0.5), "-0.500");
        assert_eq!(format_coord(-0.0001), "0.000");
        assert_eq!(format_coord(12.34567), "12.346");
    }

    #[test]
    fn test_machine_commands() {
        let mut stream = InstructionStream::new();
        stream.push(Command::InclineOn);
        stream.push(Command::RotateXZ {
            angle_x: 15.0,
            angle_z: -90.0,
        });
        stream.push(Command::RotateZ { angle: 45.5 });
        stream.push(Command::InclineOff);
        assert_eq!(
            emit_to_string(&stream).unwrap(),
            "M43\nG62 X15.000 Z-90.000\nG0 A45.500\nM42\n"
        );
    }

    #[test]
    fn test_layer_layout() {
        let mut stream = InstructionStream::new();
        stream.push_layers(vec![layer(0.1)]);
        let text = emit_to_string(&stream).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                ";LAYER:0",
                "M107",
                "F1200",
                ";OUTER_PATHS",
                "G0 X0.000 Y0.000 Z0.100",
                "G1 X10.000 Y0.000 Z0.100 E10.000",
                "G1 X10.000 Y10.000 Z0.100 E20.000",
                "G1 X0.000 Y10.000 Z0.100 E30.000",
                "G1 X0.000 Y0.000 Z0.100 E40.000",
                "F3000",
                ";MIDDLE_PATHS",
                ";INNER_PATHS",
                ";FILL_PATHS",
                "G0 X1.000 Y1.000 Z0.100",
                "G1 X4.000 Y5.000 Z0.100 E45.000",
            ]
        );
    }

    #[test]
    fn test_extrusion_carries_across_batches() {
        let mut stream = InstructionStream::new();
        stream.push_layers(vec![layer(0.1), layer(0.3)]);
        stream.push(Command::RotateXZ {
            angle_x: 10.0,
            angle_z: 0.0,
        });
        stream.push_layers(vec![layer(0.5)]);

        let mut emitter = Emitter::new(Vec::new());
        let summary = emitter.emit_stream(&stream).unwrap();
        let expected: f64 = stream.layers().map(Layer::print_length).sum();
        assert_abs_diff_eq!(summary.extrusion, expected, epsilon = 1e-9);
        assert_abs_diff_eq!(summary.extrusion, 135.0, epsilon = 1e-9);
        assert_eq!(summary.layers, 3);

        let text = String::from_utf8(emitter.into_inner()).unwrap();
        assert!(text.contains(";LAYER:2\n"));
        assert_eq!(text.lines().count(), summary.lines);

        let mut last = 0.0;
        for e in text
            .lines()
            .filter_map(|l| l.split(" E").nth(1))
            .map(|e| e.parse::<f64>().unwrap())
        {
            assert!(e >= last);
            last = e;
        }
    }

    #[test]
    fn test_emit_to_string_empty_stream() {
        assert_eq!(emit_to_string(&InstructionStream::new()).unwrap(), "");
    }

    #[test]
    fn test_write_failure() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk full"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut stream = InstructionStream::new();
        stream.push(Command::InclineOn);
        let err = Emitter::new(Broken).emit_stream(&stream).unwrap_err();
        assert!(matches!(err, crate::GcodeError::Io(_)));
    }
}
