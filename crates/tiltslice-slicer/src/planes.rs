//! Planes-description files.
//!
//! One descriptor per line:
//!
//! ```text
//! # angle_x [angle_z] [at z]
//! 0
//! 15
//! 30 90 at 12.5
//! ```
//!
//! Blank lines and `#` comments are skipped.

use std::path::Path;

use tiltslice_math::Orientation;
use tracing::debug;

use crate::error::{Result, SlicerError};

/// Largest accepted tilt (degrees).
pub const MAX_ANGLE_X: f64 = 90.0;

/// One line of a planes file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneDescriptor {
    /// Requested bed orientation.
    pub orientation: Orientation,
    /// World height where the orientation takes over, if given.
    pub at: Option<f64>,
}

/// Read and parse a planes file.
pub fn load_planes(path: &Path) -> Result<Vec<PlaneDescriptor>> {
    let text = std::fs::read_to_string(path).map_err(|source| SlicerError::PlanesUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    let planes = parse_planes(&text, path)?;
    debug!(path = %path.display(), descriptors = planes.len(), "Loaded planes file");
    Ok(planes)
}

/// Parse planes-file text; `path` is only used in error messages.
pub fn parse_planes(text: &str, path: &Path) -> Result<Vec<PlaneDescriptor>> {
    let mut planes = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let syntax = |message: String| SlicerError::PlanesSyntax {
            path: path.to_path_buf(),
            line: i + 1,
            message,
        };
        planes.push(parse_line(line).map_err(syntax)?);
    }
    Ok(planes)
}

fn parse_line(line: &str) -> std::result::Result<PlaneDescriptor, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (angles, at) = match tokens.iter().position(|t| *t == "at") {
        Some(pos) => {
            if pos + 2 != tokens.len() {
                return Err("expected a single height after 'at'".into());
            }
            (&tokens[..pos], Some(number(tokens[pos + 1])?))
        }
        None => (&tokens[..], None),
    };

    let (angle_x, angle_z) = match angles {
        [x] => (number(x)?, 0.0),
        [x, z] => (number(x)?, number(z)?),
        [] => return Err("missing angle".into()),
        _ => return Err(format!("expected '<angle_x> [<angle_z>] [at <z>]', got '{line}'")),
    };
    if angle_x.abs() > MAX_ANGLE_X {
        return Err(format!("angle {angle_x} exceeds {MAX_ANGLE_X} degrees"));
    }

    Ok(PlaneDescriptor {
        orientation: Orientation::new(angle_x, angle_z),
        at,
    })
}

fn number(token: &str) -> std::result::Result<f64, String> {
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(format!("'{token}' is not finite")),
        Err(_) => Err(format!("'{token}' is not a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(text: &str) -> Result<Vec<PlaneDescriptor>> {
        parse_planes(text, Path::new("planes.txt"))
    }

    #[test]
    fn test_parse_descriptors() {
        let planes = parse("# candidates\n0\n\n15\n30 90 at 12.5  # tilt\n-20 at 3\n").unwrap();
        assert_eq!(planes.len(), 4);
        assert_eq!(planes[1].orientation, Orientation::new(15.0, 0.0));
        assert_eq!(planes[1].at, None);
        assert_eq!(planes[2].orientation, Orientation::new(30.0, 90.0));
        assert_eq!(planes[2].at, Some(12.5));
        assert_eq!(planes[3].orientation, Orientation::new(-20.0, 0.0));
        assert_eq!(planes[3].at, Some(3.0));
    }

    #[test]
    fn test_syntax_errors_carry_line() {
        for (text, line) in [
            ("0\nfoo\n", 2),
            ("0\n1 2 3\n", 2),
            ("95\n", 1),
            ("10 at\n", 1),
            ("\n\nNaN\n", 3),
            ("at 4\n", 1),
        ] {
            match parse(text) {
                Err(SlicerError::PlanesSyntax { line: got, .. }) => assert_eq!(got, line, "{text:?}"),
                other => panic!("{text:?}: unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn test_load_planes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "0\n15\n30").unwrap();
        let planes = load_planes(file.path()).unwrap();
        assert_eq!(planes.len(), 3);
    }

    #[test]
    fn test_missing_file_is_input_error() {
        let err = load_planes(Path::new("/nonexistent/planes.txt")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Input);
    }
}
