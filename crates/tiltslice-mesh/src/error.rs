//! Error types for mesh loading and simplification.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading or writing meshes.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The file could not be opened, read or written.
    #[error("cannot access {path}: {source}")]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Writing to a stream failed.
    #[error("write failed: {0}")]
    Write(#[from] std::io::Error),

    /// The bytes are not a valid STL document.
    #[error("malformed STL: {0}")]
    Malformed(String),

    /// The document parsed but contains no facets.
    #[error("mesh is empty")]
    Empty,
}

/// Errors raised by [`crate::simplify`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimplifyError {
    /// The requested count is not smaller than the mesh.
    #[error("target of {target} triangles exceeds the mesh's {actual}")]
    TargetExceedsInput {
        /// Requested triangle count.
        target: usize,
        /// Triangles in the input.
        actual: usize,
    },

    /// The input mesh is too small to simplify.
    #[error("mesh has {0} triangles, simplification needs at least 4")]
    MeshTooSmall(usize),

    /// Fewer than four triangles cannot enclose a volume.
    #[error("target of {0} triangles is below the minimum of 4")]
    TargetTooSmall(usize),

    /// No sequence of valid collapses reaches the target exactly.
    #[error("could not reach {target} triangles, stopped at {achieved}")]
    Unreachable {
        /// Requested triangle count.
        target: usize,
        /// Triangles left when no valid collapse remained.
        achieved: usize,
    },
}

/// Result type for mesh I/O.
pub type Result<T> = std::result::Result<T, MeshError>;
