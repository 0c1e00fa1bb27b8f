//! Printed moves: lines and the continuous paths built from them.

use crate::{distance, Point3};

/// One move between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    /// Start point.
    pub p1: Point3,
    /// End point.
    pub p2: Point3,
}

impl Line {
    /// Create a line from `p1` to `p2`.
    pub fn new(p1: Point3, p2: Point3) -> Self {
        Self { p1, p2 }
    }

    /// Euclidean length.
    pub fn length(&self) -> f64 {
        distance(&self.p1, &self.p2)
    }

    /// The same line traversed the other way.
    pub fn reversed(&self) -> Self {
        Self {
            p1: self.p2,
            p2: self.p1,
        }
    }
}

/// A connected polyline: every line starts where the previous one ended.
///
/// Paths are only built through [`Path::from_points`] and friends, which
/// guarantees `lines[i].p2 == lines[i + 1].p1`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    /// Lines in travel order.
    pub lines: Vec<Line>,
}

impl Path {
    /// Chain consecutive points into lines. Fewer than two points yield an
    /// empty path.
    pub fn from_points(points: &[Point3]) -> Self {
        let lines = points.windows(2).map(|w| Line::new(w[0], w[1])).collect();
        Self { lines }
    }

    /// Chain points into a closed loop, adding the closing line back to the
    /// first point when the input does not already repeat it.
    pub fn closed_from_points(points: &[Point3]) -> Self {
        let mut pts = points.to_vec();
        if let (Some(first), Some(last)) = (points.first(), points.last()) {
            if points.len() > 1 && first != last {
                pts.push(*first);
            }
        }
        Self::from_points(&pts)
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when the path has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The vertex sequence: the first start point followed by every end point.
    pub fn points(&self) -> Vec<Point3> {
        let mut pts = Vec::with_capacity(self.lines.len() + 1);
        if let Some(first) = self.lines.first() {
            pts.push(first.p1);
        }
        pts.extend(self.lines.iter().map(|l| l.p2));
        pts
    }

    /// First point of the path.
    pub fn start(&self) -> Option<Point3> {
        self.lines.first().map(|l| l.p1)
    }

    /// Last point of the path.
    pub fn end(&self) -> Option<Point3> {
        self.lines.last().map(|l| l.p2)
    }

    /// True when the path ends where it starts.
    pub fn is_closed(&self) -> bool {
        match (self.start(), self.end()) {
            (Some(s), Some(e)) => self.lines.len() > 1 && s == e,
            _ => false,
        }
    }

    /// Check the continuity invariant.
    pub fn is_continuous(&self) -> bool {
        self.lines.windows(2).all(|w| w[0].p2 == w[1].p1)
    }

    /// Total length of all lines.
    pub fn length(&self) -> f64 {
        self.lines.iter().map(Line::length).sum()
    }

    /// The path traversed backwards.
    pub fn reversed(&self) -> Self {
        Self {
            lines: self.lines.iter().rev().map(Line::reversed).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Point3> {
        vec![
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(10.0, 0.0, 1.0),
            Point3::new(10.0, 10.0, 1.0),
            Point3::new(0.0, 10.0, 1.0),
        ]
    }

    #[test]
    fn test_closed_square() {
        let path = Path::closed_from_points(&square());
        assert_eq!(path.len(), 4);
        assert!(path.is_closed());
        assert!(path.is_continuous());
        assert_relative_eq!(path.length(), 40.0);
    }

    #[test]
    fn test_open_path_points_round_trip() {
        let pts = square();
        let path = Path::from_points(&pts);
        assert!(!path.is_closed());
        assert_eq!(path.points(), pts);
    }

    #[test]
    fn test_single_point_is_empty() {
        let path = Path::from_points(&[Point3::origin()]);
        assert!(path.is_empty());
        assert!(path.points().is_empty());
        assert!(!path.is_closed());
    }

    #[test]
    fn test_reversed_stays_continuous() {
        let path = Path::closed_from_points(&square()).reversed();
        assert!(path.is_continuous());
        assert!(path.is_closed());
        assert_eq!(path.start(), Some(Point3::new(0.0, 0.0, 1.0)));
    }
}
