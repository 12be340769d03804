//! Connector waypoints.
//!
//! Connectors leave the right midpoint of the source shape and enter the left
//! midpoint of the target. Vertical runs are kept inside the gaps between
//! columns and horizontal runs on row boundaries, so a connector never passes
//! through a shape.

use super::{Bounds, LayoutConfig, Point};
use crate::mapper::ShapeKind;

/// Column and row geometry shared by all connectors of one layout.
pub(crate) struct Geometry<'a> {
    pub config: &'a LayoutConfig,
}

/// One end of a connector: the shape and its grid cell.
pub(crate) struct Anchor<'a> {
    pub bounds: &'a Bounds,
    pub rank: usize,
    pub row: usize,
    pub lane_top: f64,
}

impl Geometry<'_> {
    fn column_x(&self, rank: usize) -> f64 {
        self.config.origin_x + rank as f64 * self.config.column_width
    }

    fn half_gap(&self) -> f64 {
        (self.config.column_width - ShapeKind::Activity.size().0) / 2.0
    }

    /// Midline of the gap right of column `rank`.
    fn gap_after(&self, rank: usize) -> f64 {
        self.column_x(rank + 1) - self.half_gap()
    }

    /// Midline of the gap left of column `rank`.
    fn gap_before(&self, rank: usize) -> f64 {
        self.column_x(rank) - self.half_gap()
    }
}

/// Waypoints for the `parallel_index`-th connector between the same ordered
/// pair of nodes.
pub(crate) fn route(
    geometry: &Geometry<'_>,
    source: &Anchor<'_>,
    target: &Anchor<'_>,
    parallel_index: usize,
) -> Vec<Point> {
    let start = source.bounds.right_mid();
    let end = target.bounds.left_mid();

    let mut interior = if target.rank == source.rank + 1 {
        if start.y == end.y {
            Vec::new()
        } else {
            let gap = geometry.gap_after(source.rank);
            vec![Point::new(gap, start.y), Point::new(gap, end.y)]
        }
    } else {
        let out = geometry.gap_after(source.rank);
        let into = geometry.gap_before(target.rank);
        let boundary = target.lane_top + target.row as f64 * geometry.config.row_height;
        vec![
            Point::new(out, start.y),
            Point::new(out, boundary),
            Point::new(into, boundary),
            Point::new(into, end.y),
        ]
    };

    if parallel_index > 0 {
        let shift = parallel_index as f64 * geometry.config.parallel_offset;
        if interior.is_empty() {
            let inset = (end.x - start.x) / 4.0;
            interior = vec![
                Point::new(start.x + inset, start.y),
                Point::new(end.x - inset, end.y),
            ];
            for point in &mut interior {
                point.y -= shift;
            }
        } else {
            for point in &mut interior {
                point.x += shift;
                point.y -= shift;
            }
        }
    }

    let mut points = Vec::with_capacity(interior.len() + 2);
    points.push(start);
    points.extend(interior);
    points.push(end);
    points
}
