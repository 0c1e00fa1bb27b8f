#![warn(missing_docs)]

//! Planar and multi-axis slicing for tiltslice.
//!
//! This crate turns a triangle mesh into an [`InstructionStream`]: batches
//! of classified layers (outer, middle and inner walls plus fill)
//! interleaved with the bed rotations of a five-axis printer.
//!
//! # Example
//!
//! ```ignore
//! use tiltslice_slicer::{slice, Settings, Strategy};
//!
//! let mesh = tiltslice_mesh::load_stl("part.stl".as_ref())?;
//! let output = slice(&mesh, Strategy::Planar, &Settings::default())?;
//!
//! println!("Layers: {}", output.stream.layer_count());
//! println!("Issues: {}", output.diagnostics);
//! ```

pub mod command;
pub mod error;
pub mod infill;
pub mod layer;
pub mod path;
pub mod perimeter;
pub mod planes;
pub mod settings;
pub mod simplify;
pub mod slice;
pub mod strategy;

pub use command::{Command, InstructionStream, LayerBatch};
pub use error::{Diagnostics, ErrorKind, GeometryIssue, Result, SlicerError};
pub use infill::generate_infill;
pub use layer::{classify, classify_layers, printable_contours, Layer};
pub use path::{order_nearest, Polygon};
pub use perimeter::{generate_walls, LayerWalls};
pub use planes::{load_planes, parse_planes, PlaneDescriptor};
pub use settings::Settings;
pub use simplify::simplify_path;
pub use slice::{generate_layer_heights, layer_count, slice_mesh, SliceLayer, SliceMesh};
pub use strategy::{
    slice, slice_by_profile, slice_continuous, slice_discretized, slice_planar, SliceOutput,
    Strategy,
};
