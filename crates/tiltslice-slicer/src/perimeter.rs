//! Wall generation from slice contours.

use crate::path::Polygon;

/// Walls of one layer, split by role.
#[derive(Debug, Clone, Default)]
pub struct LayerWalls {
    /// The contours themselves, printed first.
    pub outer: Vec<Polygon>,
    /// Walls between the outer and the innermost one.
    pub middle: Vec<Polygon>,
    /// The innermost wall of each contour.
    pub inner: Vec<Polygon>,
    /// Region left for fill: the innermost wall offset by one more nozzle.
    pub fill_boundary: Vec<Polygon>,
}

/// Generate `wall_count` walls per contour, each `nozzle` further toward
/// the material than the previous one.
///
/// The first wall is the contour itself. Wall `i` is the contour offset by
/// `i · nozzle`; the last one is the inner wall, any in between are middle
/// walls. A contour too thin for all its walls keeps the ones that fit and
/// gets no fill.
pub fn generate_walls(contours: &[Polygon], wall_count: usize, nozzle: f64) -> LayerWalls {
    let mut walls = LayerWalls::default();
    let wall_count = wall_count.max(1);

    for contour in contours {
        walls.outer.push(contour.clone());

        let mut innermost = contour.clone();
        let mut collapsed = false;
        for i in 1..wall_count {
            match contour.offset(i as f64 * nozzle) {
                Some(wall) => {
                    if i == wall_count - 1 {
                        walls.inner.push(wall.clone());
                    } else {
                        walls.middle.push(wall.clone());
                    }
                    innermost = wall;
                }
                None => {
                    collapsed = true;
                    break;
                }
            }
        }

        if !collapsed {
            if let Some(boundary) = innermost.offset(nozzle) {
                walls.fill_boundary.push(boundary);
            }
        }
    }

    walls
}
