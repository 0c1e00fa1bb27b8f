//! Error types for the slicer.
//!
//! Fatal problems are [`SlicerError`]s. Local geometry defects (a degenerate
//! facet, a contour that does not close) are not errors: they are recorded
//! as [`GeometryIssue`]s in a [`Diagnostics`] summary and slicing carries on.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Broad class of a [`SlicerError`], used by callers to pick an exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or unreadable input.
    Input,
    /// Unusable geometry.
    Geometry,
    /// Invalid settings or resources.
    Config,
    /// Output failure.
    Io,
}

/// Errors that abort slicing.
#[derive(Error, Debug)]
pub enum SlicerError {
    /// Mesh has no triangles.
    #[error("mesh is empty")]
    EmptyMesh,

    /// Invalid slice settings.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The strategy identifier is not one of the known ones.
    #[error("unknown slicing type '{0}' (expected 3axes, 5axes_by_profile, 5axes or vip)")]
    UnknownStrategy(String),

    /// The planes-description file could not be read.
    #[error("cannot read planes file {path}: {source}")]
    PlanesUnreadable {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A line of the planes-description file is malformed.
    #[error("{path}:{line}: {message}")]
    PlanesSyntax {
        /// File involved.
        path: PathBuf,
        /// One-based line number.
        line: usize,
        /// What is wrong with it.
        message: String,
    },

    /// Slicing produced nothing printable.
    #[error("slicing failed: {0}")]
    SliceFailed(String),
}

impl SlicerError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SlicerError::PlanesUnreadable { .. } => ErrorKind::Input,
            SlicerError::EmptyMesh | SlicerError::SliceFailed(_) => ErrorKind::Geometry,
            SlicerError::InvalidSettings(_)
            | SlicerError::UnknownStrategy(_)
            | SlicerError::PlanesSyntax { .. } => ErrorKind::Config,
        }
    }
}

/// Result type for slicer operations.
pub type Result<T> = std::result::Result<T, SlicerError>;

/// A recoverable geometry defect.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryIssue {
    /// A facet with no area; it was skipped.
    DegenerateTriangle {
        /// Index of the facet in the input mesh.
        index: usize,
    },
    /// Stitched segments that never returned to their start; dropped.
    OpenContour {
        /// Layer being cut.
        layer: usize,
        /// Number of segments in the chain.
        segments: usize,
    },
    /// A closed contour with too few points or no area; dropped.
    DegenerateContour {
        /// Layer being cut.
        layer: usize,
    },
}

impl fmt::Display for GeometryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryIssue::DegenerateTriangle { index } => {
                write!(f, "degenerate triangle #{index} skipped")
            }
            GeometryIssue::OpenContour { layer, segments } => {
                write!(f, "layer {layer}: open contour of {segments} segments dropped")
            }
            GeometryIssue::DegenerateContour { layer } => {
                write!(f, "layer {layer}: degenerate contour dropped")
            }
        }
    }
}

/// Geometry issues collected over one slicing run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    /// Issues in the order they were found.
    pub issues: Vec<GeometryIssue>,
}

impl Diagnostics {
    /// Record one issue.
    pub fn push(&mut self, issue: GeometryIssue) {
        self.issues.push(issue);
    }

    /// Append all issues from `other`.
    pub fn extend(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    /// True when nothing went wrong.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// Number of recorded issues.
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// True when no issues were recorded.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Counts per issue class: degenerate triangles, open contours,
    /// degenerate contours.
    pub fn counts(&self) -> (usize, usize, usize) {
        self.issues.iter().fold((0, 0, 0), |(t, o, d), issue| match issue {
            GeometryIssue::DegenerateTriangle { .. } => (t + 1, o, d),
            GeometryIssue::OpenContour { .. } => (t, o + 1, d),
            GeometryIssue::DegenerateContour { .. } => (t, o, d + 1),
        })
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (triangles, open, degenerate) = self.counts();
        write!(
            f,
            "{triangles} degenerate triangles, {open} open contours, {degenerate} degenerate contours"
        )
    }
}
