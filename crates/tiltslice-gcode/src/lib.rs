#![warn(missing_docs)]

//! G-code output for tiltslice.
//!
//! This crate writes an [`InstructionStream`] as G-code, wrapped in a
//! header and footer rendered from the print settings.
//!
//! # Example
//!
//! ```ignore
//! use tiltslice_gcode::{write_program, Template};
//! use tiltslice_slicer::{slice, Settings, Strategy};
//!
//! let settings = Settings::default();
//! let output = slice(&mesh, Strategy::Planar, &settings)?;
//!
//! let mut file = std::fs::File::create("out.gcode")?;
//! let summary = write_program(
//!     &output.stream,
//!     &settings,
//!     &Template::default_header(),
//!     &Template::default_footer(),
//!     &mut file,
//! )?;
//! println!("Extruded {:.1} mm over {} layers", summary.extrusion, summary.layers);
//! ```

pub mod emitter;
pub mod error;
pub mod template;

use std::io::Write;

use tiltslice_slicer::{InstructionStream, Settings};
use tracing::info;

pub use emitter::{emit_to_string, format_coord, EmitSummary, Emitter, DECIMALS};
pub use error::{GcodeError, Result};
pub use template::{Template, DEFAULT_FOOTER, DEFAULT_HEADER};

/// Write a complete program: header, commands, footer.
///
/// The templates see `settings` with its layer count replaced by the
/// stream's. The count is checked against the batches before anything is
/// written and against the emitted layers afterwards.
pub fn write_program<W: Write>(
    stream: &InstructionStream,
    settings: &Settings,
    header: &Template,
    footer: &Template,
    writer: W,
) -> Result<EmitSummary> {
    let expected = stream.layer_count();
    let batched: usize = stream.batch_sizes().iter().sum();
    if batched != expected {
        return Err(GcodeError::LayerCountMismatch {
            expected,
            emitted: batched,
        });
    }

    let values = settings.with_layer_count(expected).to_map();
    let mut emitter = Emitter::new(writer);
    {
        let out = emitter.writer_mut();
        out.write_all(header.render(&values).as_bytes())?;
    }
    let summary = emitter.emit_stream(stream)?;
    {
        let out = emitter.writer_mut();
        out.write_all(footer.render(&values).as_bytes())?;
        out.flush()?;
    }

    if summary.layers != expected {
        return Err(GcodeError::LayerCountMismatch {
            expected,
            emitted: summary.layers,
        });
    }
    info!(
        layers = summary.layers,
        lines = summary.lines,
        extrusion = summary.extrusion,
        "G-code written"
    );
    Ok(summary)
}
