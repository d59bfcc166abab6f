use rayon::prelude::*;
use rrgraph_arch::grid::CellCoord;
use tracing::debug;
use unnamed_entity::{EntityId, EntityVec};

use crate::diag::{Check, Diagnostic, Report, Subject};
use crate::graph::{DeviceContext, RrGraph};
use crate::lookup::SpatialKey;
use crate::node::{Node, NodeId, NodeKind};

fn mismatch(node: NodeId, check: Check, message: String) -> Diagnostic {
    Diagnostic::fatal(Subject::Node(node), check, message)
}

fn check_key(graph: &RrGraph, key: &SpatialKey, node: NodeId, diags: &mut Vec<Diagnostic>) {
    let Some(info) = graph.nodes.get(node) else {
        diags.push(mismatch(
            node,
            Check::LookupNodeRange,
            format!(
                "key {key} resolves to node {node} of a {}-node graph",
                graph.nodes.len()
            ),
        ));
        return;
    };
    if info.kind != key.kind {
        diags.push(mismatch(
            node,
            Check::LookupKind,
            format!("key {key} resolves to {info}"),
        ));
        return;
    }
    if info.ptc != key.ptc {
        diags.push(mismatch(
            node,
            Check::LookupPtc,
            format!("key {key} resolves to {info}"),
        ));
    }
    if let Some(side) = key.side {
        if !info.sides.contains(side) {
            diags.push(mismatch(
                node,
                Check::LookupSide,
                format!("key {key} resolves to {info}, which lacks that side"),
            ));
        }
    }
    let on_node = match info.kind {
        NodeKind::ChanX => key.row == info.y_low && (info.x_low..=info.x_high).contains(&key.col),
        NodeKind::ChanY => key.col == info.x_low && (info.y_low..=info.y_high).contains(&key.row),
        NodeKind::ChanZ => key.col == info.x_low && key.row == info.y_low,
        _ => info.contains(key.col, key.row),
    };
    if !on_node {
        diags.push(mismatch(
            node,
            Check::LookupLocation,
            format!("key {key} lies off {info}"),
        ));
    }
    // inter-layer wires are registered on every layer
    if info.kind != NodeKind::ChanZ && key.layer != info.layer {
        diags.push(mismatch(
            node,
            Check::LookupLayer,
            format!("key {key} is on another layer than {info}"),
        ));
    }
}

/// Number of lookup keys a correctly registered node has.
fn expected_placements(ctx: &DeviceContext, info: &Node) -> Option<usize> {
    if info.x_low > info.x_high || info.y_low > info.y_high {
        return None;
    }
    Some(match info.kind {
        NodeKind::Source | NodeKind::Sink => info.width() * info.height(),
        NodeKind::ChanX | NodeKind::ChanY => info.length() + 1,
        NodeKind::ChanZ => ctx.grid.layers(),
        NodeKind::Ipin | NodeKind::Opin => info.sides.len(),
        NodeKind::Mux => 1,
    })
}

/// Proves that the spatial lookup and the node storage describe the same graph: every key
/// resolves to a node that agrees with it, and every node is registered exactly at the cells
/// it covers.
pub fn verify_lookup(ctx: &DeviceContext, graph: &RrGraph) -> Report {
    let mut report = Report::default();
    let cells: Vec<CellCoord> = ctx.grid.cells().collect();
    let per_cell: Vec<(Vec<NodeId>, Vec<Diagnostic>)> = cells
        .par_iter()
        .map(|&cell| {
            let mut ids = vec![];
            let mut diags = vec![];
            for kind in NodeKind::ALL {
                for (key, node) in graph.lookup.keys_at(cell, kind) {
                    check_key(graph, &key, node, &mut diags);
                    ids.push(node);
                }
            }
            (ids, diags)
        })
        .collect();

    let mut counts: EntityVec<NodeId, u32> = graph.nodes.values().map(|_| 0).collect();
    for (ids, diags) in per_cell {
        for diag in diags {
            let fatal_range = diag.check == Check::LookupNodeRange;
            report.push(diag);
            if fatal_range {
                report.aborted = true;
                return report;
            }
        }
        for node in ids {
            counts[node] += 1;
        }
    }

    let placements: Vec<Option<Diagnostic>> = (0..graph.nodes.len())
        .into_par_iter()
        .map(|idx| {
            let node = NodeId::from_idx(idx);
            let info = &graph.nodes[node];
            let count = counts[node] as usize;
            if count == 0 {
                return Some(mismatch(
                    node,
                    Check::LookupOrphan,
                    format!("{info} is not registered in the lookup"),
                ));
            }
            let expected = expected_placements(ctx, info)?;
            if count != expected {
                return Some(mismatch(
                    node,
                    Check::LookupPlacements,
                    format!("{info} is registered {count} times, expected {expected}"),
                ));
            }
            None
        })
        .collect();
    report.diagnostics.extend(placements.into_iter().flatten());
    debug!(
        cells = cells.len(),
        nodes = graph.nodes.len(),
        mismatches = report.diagnostics.len(),
        "lookup cross-checked"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrgraph_arch::db::{CostIndex, Side};
    use rrgraph_arch::fabric::{Fabric, UniformFabric};
    use rrgraph_arch::grid::LayerId;

    use crate::options::BuildOptions;

    #[test]
    fn detects_tampering() {
        let fabric = UniformFabric {
            width: 3,
            height: 3,
            chan_width: 2,
            empty_corners: false,
            ..Default::default()
        }
        .build()
        .unwrap();
        let ctx = DeviceContext::new(
            &fabric.arch,
            &fabric.grid,
            &fabric.chan_width,
            &fabric.tracks,
            &BuildOptions::default(),
        )
        .unwrap();
        let mut graph = RrGraph::build(&ctx).unwrap();
        assert!(verify_lookup(&ctx, &graph).passed());

        // a stored node nobody registered
        let orphan = graph.add_node(Node::point(
            NodeKind::Ipin,
            CellCoord::new(0, 1, 1),
            0,
            CostIndex::from_idx(3),
        ));
        let report = verify_lookup(&ctx, &graph);
        assert!(!report.passed());
        assert_eq!(report.count(Check::LookupOrphan), 1);
        assert_eq!(report.diagnostics[0].subject, Subject::Node(orphan));

        // a key pointing past the end of node storage
        let key = SpatialKey::new(CellCoord::new(0, 2, 2), NodeKind::ChanX, 0, None);
        graph.lookup.add_node(NodeId::from_idx(1000), key).unwrap();
        let report = verify_lookup(&ctx, &graph);
        assert!(report.aborted);
        assert_eq!(report.fatal_count(), 1);
        assert_eq!(report.count(Check::LookupNodeRange), 1);
    }

    fn context(fabric: &Fabric) -> DeviceContext<'_> {
        DeviceContext::new(
            &fabric.arch,
            &fabric.grid,
            &fabric.chan_width,
            &fabric.tracks,
            &BuildOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn detects_misfiled_keys() {
        let fabric = UniformFabric {
            width: 3,
            height: 3,
            chan_width: 2,
            empty_corners: false,
            ..Default::default()
        }
        .build()
        .unwrap();
        let ctx = context(&fabric);
        let base = RrGraph::build(&ctx).unwrap();
        assert!(verify_lookup(&ctx, &base).diagnostics.is_empty());

        // a CHANX wire filed under CHANY
        let mut graph = base.clone();
        let wire = graph
            .lookup
            .find_channel_nodes(CellCoord::new(0, 1, 1), NodeKind::ChanX)[0];
        let key = SpatialKey::new(CellCoord::new(0, 1, 1), NodeKind::ChanY, 5, None);
        graph.lookup.add_node(wire, key).unwrap();
        let report = verify_lookup(&ctx, &graph);
        assert!(!report.aborted);
        assert_eq!(report.count(Check::LookupKind), 1);
        assert_eq!(report.count(Check::LookupPtc), 0);
        assert_eq!(report.count(Check::LookupPlacements), 1);
        assert_eq!(report.diagnostics.len(), 2);

        // a bottom-row pin only faces up
        let mut graph = base.clone();
        let cell = CellCoord::new(0, 1, 0);
        let opin = graph.lookup.find_nodes_at_all_sides(cell, NodeKind::Opin)[0];
        assert_eq!(graph.nodes[opin].sides.len(), 1);
        let ptc = graph.nodes[opin].ptc;
        let key = SpatialKey::new(cell, NodeKind::Opin, ptc, Some(Side::Bottom));
        graph.lookup.add_node(opin, key).unwrap();
        let report = verify_lookup(&ctx, &graph);
        assert_eq!(report.count(Check::LookupSide), 1);
        assert_eq!(report.count(Check::LookupPlacements), 1);
        assert_eq!(report.diagnostics.len(), 2);
        assert!(report.diagnostics.iter().all(|d| d.subject == Subject::Node(opin)));
    }

    #[test]
    fn detects_wrong_layer() {
        let fabric = UniformFabric {
            layers: 2,
            width: 3,
            height: 3,
            chan_width: 1,
            empty_corners: false,
            ..Default::default()
        }
        .build()
        .unwrap();
        let ctx = context(&fabric);
        let mut graph = RrGraph::build(&ctx).unwrap();
        assert!(verify_lookup(&ctx, &graph).diagnostics.is_empty());
        let cell = CellCoord::new(0, 1, 1);
        let sink = graph
            .lookup
            .find_node(&SpatialKey::new(cell, NodeKind::Sink, 0, None))
            .unwrap();
        graph.nodes[sink].layer = LayerId::from_idx(1);
        let report = verify_lookup(&ctx, &graph);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.count(Check::LookupLayer), 1);
        assert_eq!(report.diagnostics[0].subject, Subject::Node(sink));
    }

    #[test]
    fn detects_wrong_ptc_and_span() {
        let fabric = UniformFabric {
            width: 4,
            height: 4,
            chan_width: 1,
            seg_length: 2,
            empty_corners: false,
            ..Default::default()
        }
        .build()
        .unwrap();
        let ctx = DeviceContext::new(
            &fabric.arch,
            &fabric.grid,
            &fabric.chan_width,
            &fabric.tracks,
            &BuildOptions::default(),
        )
        .unwrap();
        let mut graph = RrGraph::build(&ctx).unwrap();
        let wire = graph
            .lookup
            .find_channel_nodes(CellCoord::new(0, 1, 0), NodeKind::ChanX)[0];
        assert_eq!(graph.nodes[wire].length(), 1);
        graph.nodes[wire].x_high = graph.nodes[wire].x_low;
        graph.nodes[wire].ptc = 1;
        let report = verify_lookup(&ctx, &graph);
        assert!(!report.aborted);
        // both keys carry the old ptc, one of them now lies off the wire
        assert_eq!(report.count(Check::LookupPtc), 2);
        assert_eq!(report.count(Check::LookupLocation), 1);
        assert_eq!(report.count(Check::LookupPlacements), 1);
        assert!(
            report
                .diagnostics
                .iter()
                .all(|d| d.subject == Subject::Node(wire) && d.is_fatal())
        );
    }
}
