//! Deterministic diagram placement.
//!
//! Nodes sit on a grid of columns (ranks) and rows. Columns follow the flow
//! left to right, rows separate branches. Anything not reachable from a start
//! over sequence edges is placed in an auxiliary lane under the main grid.
//!
//! ```
//! use flowbridge::layout::{LayoutConfig, LayoutEngine};
//! use flowbridge::model::ModelBuilder;
//! use flowbridge::record::{ComponentRecord, RecordRole};
//!
//! let records = vec![
//!     ComponentRecord::hint("in", "Receive", "listener")
//!         .with_role(RecordRole::Start)
//!         .link_to("out"),
//!     ComponentRecord::hint("out", "Done", "end").with_role(RecordRole::End),
//! ];
//! let model = ModelBuilder::new().build(&records).unwrap();
//! let positions = LayoutEngine::new(LayoutConfig::default()).layout(&model).unwrap();
//! assert!(positions.node("in").unwrap().bounds.x < positions.node("out").unwrap().bounds.x);
//! ```

use crate::error::LayoutError;
use crate::mapper::ShapeKind;
use crate::model::{ComponentModel, EdgeId};
use ahash::AHashMap;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

mod rank;
mod routing;

use routing::{Anchor, Geometry};

/// Grid dimensions in diagram units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub origin_x: f64,
    pub origin_y: f64,
    pub column_width: f64,
    pub row_height: f64,
    /// Vertical space between the main grid and the auxiliary lane.
    pub lane_gap: f64,
    /// Lateral offset between connectors joining the same pair of nodes.
    pub parallel_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: 260.0,
            origin_y: 120.0,
            column_width: 160.0,
            row_height: 100.0,
            lane_gap: 60.0,
            parallel_offset: 6.0,
        }
    }
}

impl LayoutConfig {
    /// Checks that every shape fits its grid cell with room for connectors.
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("origin_x", self.origin_x),
            ("origin_y", self.origin_y),
            ("column_width", self.column_width),
            ("row_height", self.row_height),
            ("lane_gap", self.lane_gap),
            ("parallel_offset", self.parallel_offset),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(format!("{} must be a finite number, got {}", name, value));
        }

        let (width, height) = ShapeKind::Activity.size();
        if self.column_width <= width {
            return Err(format!(
                "column_width must be greater than {}, got {}",
                width, self.column_width
            ));
        }
        if self.row_height <= height {
            return Err(format!(
                "row_height must be greater than {}, got {}",
                height, self.row_height
            ));
        }
        if self.lane_gap < 0.0 || self.parallel_offset <= 0.0 {
            return Err("lane_gap must be non-negative and parallel_offset positive".to_string());
        }
        // Offset connectors must stay inside the gap between columns.
        let half_gap = (self.column_width - width) / 2.0;
        if self.parallel_offset >= half_gap / 2.0 {
            return Err(format!(
                "parallel_offset must be less than {}, got {}",
                half_gap / 2.0,
                self.parallel_offset
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned shape bounds; `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn left_mid(&self) -> Point {
        Point::new(self.x, self.y + self.height / 2.0)
    }

    pub fn right_mid(&self) -> Point {
        Point::new(self.right(), self.y + self.height / 2.0)
    }

    /// True when the interiors intersect; touching edges do not count.
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Which band of the diagram a node is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    Main,
    Auxiliary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub bounds: Bounds,
    pub rank: usize,
    pub row: usize,
    pub lane: Lane,
}

/// Computed positions for one model. Node entries follow model order, edge
/// entries follow edge order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPositions {
    pub nodes: IndexMap<String, NodePosition>,
    pub edges: IndexMap<EdgeId, Vec<Point>>,
}

impl LayoutPositions {
    pub fn node(&self, node_id: &str) -> Option<&NodePosition> {
        self.nodes.get(node_id)
    }

    pub fn waypoints(&self, edge_id: &EdgeId) -> Option<&[Point]> {
        self.edges.get(edge_id).map(Vec::as_slice)
    }

    /// Smallest box enclosing every shape and waypoint, if anything was placed.
    pub fn extent(&self) -> Option<Bounds> {
        let corners = self.nodes.values().flat_map(|p| {
            [
                Point::new(p.bounds.x, p.bounds.y),
                Point::new(p.bounds.right(), p.bounds.bottom()),
            ]
        });
        let points = corners.chain(self.edges.values().flatten().copied());
        let mut acc: Option<(Point, Point)> = None;
        for point in points {
            acc = Some(match acc {
                None => (point, point),
                Some((lo, hi)) => (
                    Point::new(lo.x.min(point.x), lo.y.min(point.y)),
                    Point::new(hi.x.max(point.x), hi.y.max(point.y)),
                ),
            });
        }
        acc.map(|(lo, hi)| Bounds {
            x: lo.x,
            y: lo.y,
            width: hi.x - lo.x,
            height: hi.y - lo.y,
        })
    }
}

/// Places the nodes and routes the edges of a [`ComponentModel`].
#[derive(Debug, Clone, Default)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn layout(&self, model: &ComponentModel) -> Result<LayoutPositions, LayoutError> {
        self.config.validate().map_err(LayoutError::Inconsistency)?;
        let config = &self.config;
        let grid = rank::assign(model);
        let aux_top = config.origin_y + grid.main_rows as f64 * config.row_height + config.lane_gap;
        let lane_top = |lane: Lane| match lane {
            Lane::Main => config.origin_y,
            Lane::Auxiliary => aux_top,
        };

        let mut positions = LayoutPositions::default();
        for (node_id, cell) in grid.cells {
            let node = model.node(&node_id).ok_or_else(|| {
                LayoutError::Inconsistency(format!("ranked node '{}' is not in the model", node_id))
            })?;
            let (width, height) = node.target_type.shape().size();
            let bounds = Bounds {
                x: config.origin_x + cell.rank as f64 * config.column_width,
                y: lane_top(cell.lane)
                    + cell.row as f64 * config.row_height
                    + (config.row_height - height) / 2.0,
                width,
                height,
            };
            positions.nodes.insert(node_id, NodePosition {
                bounds,
                rank: cell.rank,
                row: cell.row,
                lane: cell.lane,
            });
        }
        if positions.nodes.len() != model.node_count() {
            return Err(LayoutError::Inconsistency(format!(
                "placed {} of {} nodes",
                positions.nodes.len(),
                model.node_count()
            )));
        }

        let geometry = Geometry { config };
        let mut parallel: AHashMap<(&str, &str), usize> = AHashMap::new();
        for edge in model.edges() {
            let anchor = |node_id: &str| {
                positions
                    .nodes
                    .get(node_id)
                    .map(|p| Anchor {
                        bounds: &p.bounds,
                        rank: p.rank,
                        row: p.row,
                        lane_top: lane_top(p.lane),
                    })
                    .ok_or_else(|| {
                        LayoutError::Inconsistency(format!(
                            "edge '{}' references unplaced node '{}'",
                            edge.id, node_id
                        ))
                    })
            };
            let source = anchor(&edge.source_node)?;
            let target = anchor(&edge.target_node)?;
            let index = parallel
                .entry((edge.source_node.as_str(), edge.target_node.as_str()))
                .or_insert(0);
            let points = routing::route(&geometry, &source, &target, *index);
            *index += 1;
            positions.edges.insert(edge.id.clone(), points);
        }

        debug!(
            nodes = positions.nodes.len(),
            edges = positions.edges.len(),
            back_edges = grid.back_edges.len(),
            main_rows = grid.main_rows,
            "layout computed"
        );
        Ok(positions)
    }
}
