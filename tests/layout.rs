//! Tests for node placement and connector routing.
mod common;
use common::*;
use flowbridge::error::LayoutError;
use flowbridge::layout::{Lane, Point};
use flowbridge::parser::parse;
use flowbridge::prelude::*;

fn assert_no_overlaps(positions: &LayoutPositions) {
    let placed: Vec<_> = positions.nodes.iter().collect();
    for (i, (a_id, a)) in placed.iter().enumerate() {
        for (b_id, b) in &placed[i + 1..] {
            assert!(
                !a.bounds.overlaps(&b.bounds),
                "{} overlaps {}: {:?} / {:?}",
                a_id,
                b_id,
                a.bounds,
                b.bounds
            );
        }
    }
}

#[cfg(test)]
mod placement_tests {
    use super::*;

    #[test]
    fn test_linear_flow_ranks_left_to_right() {
        let model = mapped(&three_node_records());
        let positions = layout(&model);

        let ranks: Vec<usize> = ["start", "http_call", "end"]
            .iter()
            .map(|id| positions.node(id).unwrap().rank)
            .collect();
        assert_eq!(ranks, vec![0, 1, 2]);

        let start = positions.node("start").unwrap().bounds;
        let call = positions.node("http_call").unwrap().bounds;
        assert_eq!((start.x, start.width, start.height), (260.0, 36.0, 36.0));
        assert_eq!((call.x, call.y), (420.0, 140.0));
        assert_eq!((call.width, call.height), (100.0, 60.0));
    }

    #[test]
    fn test_edges_point_rightwards_on_acyclic_models() {
        let model = mapped(&parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml").records);
        let positions = layout(&model);
        for edge in model.edges() {
            let source = positions.node(&edge.source_node).unwrap();
            let target = positions.node(&edge.target_node).unwrap();
            assert!(source.bounds.x <= target.bounds.x, "{}", edge.id);
            assert!(source.rank < target.rank, "{}", edge.id);
        }
    }

    #[test]
    fn test_branches_get_separate_rows() {
        let model = mapped(&parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml").records);
        let positions = layout(&model);
        let eu = positions.node("orders_3").unwrap();
        let reject = positions.node("orders_4").unwrap();
        assert_eq!(eu.rank, reject.rank);
        assert_ne!(eu.row, reject.row);
        assert_no_overlaps(&positions);
    }

    #[test]
    fn test_unreachable_nodes_use_the_auxiliary_lane() {
        let model = mapped(&parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml").records);
        let positions = layout(&model);

        // The sub-flow is only referenced, never sequenced from a start.
        let audit = positions.node("audit_0").unwrap();
        assert_eq!(audit.lane, Lane::Auxiliary);
        let main_bottom = positions
            .nodes
            .values()
            .filter(|p| p.lane == Lane::Main)
            .map(|p| p.bounds.bottom())
            .fold(f64::MIN, f64::max);
        assert!(audit.bounds.y > main_bottom);
        assert_eq!(positions.node("orders_0").unwrap().lane, Lane::Main);
    }

    #[test]
    fn test_loops_do_not_push_nodes_leftwards() {
        let model = mapped(
            &parse(
                WEBMETHODS_ORDER_XML.as_bytes(),
                DialectId::WebMethods,
                WEBMETHODS_DOCUMENT,
            )
            .records,
        );
        let positions = layout(&model);
        assert_eq!(positions.nodes.len(), 8);
        let repeat = positions.node("step5").unwrap();
        let body = positions.node("step6").unwrap();
        assert!(repeat.rank < body.rank);
        assert_no_overlaps(&positions);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let engine = LayoutEngine::new(LayoutConfig {
            row_height: 40.0,
            ..LayoutConfig::default()
        });
        let model = mapped(&three_node_records());
        assert!(matches!(
            engine.layout(&model),
            Err(LayoutError::Inconsistency(_))
        ));
    }

    #[test]
    fn test_layout_is_deterministic() {
        let records = parse(BOOMI_BILLING_XML.as_bytes(), DialectId::Boomi, "billing.xml").records;
        let first = layout(&mapped(&records));
        let second = layout(&mapped(&records));
        assert_eq!(first, second);
        let order: Vec<&String> = first.nodes.keys().collect();
        assert_eq!(order, vec!["shape1", "shape2", "shape3", "shape4", "shape5"]);
    }
}

#[cfg(test)]
mod routing_tests {
    use super::*;

    #[test]
    fn test_connectors_join_shape_midpoints() {
        let model = mapped(&parse(BOOMI_BILLING_XML.as_bytes(), DialectId::Boomi, "billing.xml").records);
        let positions = layout(&model);
        for edge in model.edges() {
            let points = positions.waypoints(&edge.id).unwrap();
            assert!(points.len() >= 2);
            let source = positions.node(&edge.source_node).unwrap().bounds;
            let target = positions.node(&edge.target_node).unwrap().bounds;
            assert_eq!(points[0], source.right_mid());
            assert_eq!(points[points.len() - 1], target.left_mid());
        }
    }

    #[test]
    fn test_parallel_connectors_are_separated() {
        let model = mapped(&parallel_edge_records());
        let positions = layout(&model);
        assert_eq!(positions.edges.len(), 2);

        let first = positions.waypoints(&EdgeId::from_index(1)).unwrap();
        let second = positions.waypoints(&EdgeId::from_index(2)).unwrap();
        assert_ne!(first, second);
        assert_eq!(first, &[Point::new(296.0, 170.0), Point::new(420.0, 170.0)]);
        assert_eq!(
            second,
            &[
                Point::new(296.0, 170.0),
                Point::new(327.0, 164.0),
                Point::new(389.0, 164.0),
                Point::new(420.0, 170.0),
            ]
        );
    }

    #[test]
    fn test_extent_covers_everything() {
        let model = mapped(&parse(MULE_ORDERS_XML.as_bytes(), DialectId::Mule, "orders.xml").records);
        let positions = layout(&model);
        let extent = positions.extent().unwrap();
        for p in positions.nodes.values() {
            assert!(p.bounds.x >= extent.x && p.bounds.right() <= extent.right());
            assert!(p.bounds.y >= extent.y && p.bounds.bottom() <= extent.bottom());
        }
        assert!(LayoutPositions::default().extent().is_none());
    }
}
