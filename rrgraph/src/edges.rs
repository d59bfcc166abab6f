//! A generic edge builder for uniform island-style fabrics: full pin-to-channel connectivity
//! (minus zero-Fc segment types) and a disjoint switch block at every channel crossing.

use rrgraph_arch::db::{ClassId, ClassKind, PinId, Side, SwitchId};
use rrgraph_arch::grid::{CellCoord, ColId, RowId};
use tracing::info;
use unnamed_entity::EntityId;

use crate::graph::{DeviceContext, RrGraph};
use crate::lookup::SpatialKey;
use crate::node::{Node, NodeId, NodeKind};

#[derive(Clone, Copy, Debug)]
pub struct EdgeSwitches {
    /// SOURCE to OPIN and IPIN to SINK.
    pub delayless: SwitchId,
    /// Wire to wire inside switch blocks.
    pub wire: SwitchId,
    pub ipin: SwitchId,
    pub opin: SwitchId,
}

fn find_pin(graph: &RrGraph, cell: CellCoord, kind: NodeKind, ptc: u32) -> Option<NodeId> {
    Side::SIDES
        .into_iter()
        .find_map(|side| graph.lookup.find_node(&SpatialKey::new(cell, kind, ptc, Some(side))))
}

/// The channel cell a pin on `side` of `cell` connects to.
fn adjacent_channel(cell: CellCoord, side: Side) -> Option<(CellCoord, NodeKind)> {
    match side {
        Side::Top => Some((cell, NodeKind::ChanX)),
        Side::Right => Some((cell, NodeKind::ChanY)),
        Side::Bottom => {
            let row = cell.row.to_idx().checked_sub(1)?;
            Some((cell.with_row(RowId::from_idx(row)), NodeKind::ChanX))
        }
        Side::Left => {
            let col = cell.col.to_idx().checked_sub(1)?;
            Some((cell.with_col(ColId::from_idx(col)), NodeKind::ChanY))
        }
    }
}

fn class_edges(
    ctx: &DeviceContext,
    graph: &RrGraph,
    node: NodeId,
    info: &Node,
    sw: &EdgeSwitches,
    res: &mut Vec<(NodeId, NodeId, SwitchId)>,
) {
    let root = info.low();
    let tt = ctx.tile_type(root);
    let Some(class) = tt.classes.get(ClassId::from_idx(info.ptc as usize)) else {
        return;
    };
    for &pin in &class.pins {
        let Some((dx, dy)) = tt.pin_offset(pin) else {
            continue;
        };
        let cell = root.delta(dx, dy);
        let ptc = pin.to_idx() as u32;
        match class.kind {
            ClassKind::Driver => {
                if let Some(opin) = find_pin(graph, cell, NodeKind::Opin, ptc) {
                    res.push((node, opin, sw.delayless));
                }
            }
            ClassKind::Receiver => {
                if let Some(ipin) = find_pin(graph, cell, NodeKind::Ipin, ptc) {
                    res.push((ipin, node, sw.delayless));
                }
            }
        }
    }
}

fn pin_edges(
    ctx: &DeviceContext,
    graph: &RrGraph,
    node: NodeId,
    info: &Node,
    sw: &EdgeSwitches,
    res: &mut Vec<(NodeId, NodeId, SwitchId)>,
) {
    let cell = info.low();
    let tt = ctx.tile_type(cell);
    let pin = PinId::from_idx(info.ptc as usize);
    for side in info.sides.iter() {
        let Some((chan_cell, kind)) = adjacent_channel(cell, side) else {
            continue;
        };
        for wire in graph.lookup.find_channel_nodes(chan_cell, kind) {
            let track = graph.nodes[wire].ptc as usize;
            if tt.fc(pin, ctx.tracks[track].segment) == Some(0.0) {
                continue;
            }
            if info.kind == NodeKind::Opin {
                res.push((node, wire, sw.opin));
            } else {
                res.push((wire, node, sw.ipin));
            }
        }
    }
}

fn switch_block_edges(
    ctx: &DeviceContext,
    graph: &RrGraph,
    sw: &EdgeSwitches,
    res: &mut Vec<(NodeId, NodeId, SwitchId)>,
) {
    let grid = ctx.grid;
    let ntracks = ctx.chan_width.max.max(ctx.chanz_tracks());
    for layer in 0..grid.layers() {
        for y in 0..grid.height().saturating_sub(1) {
            for x in 0..grid.width().saturating_sub(1) {
                let cell = CellCoord::new(layer, x, y);
                let incident = [
                    (cell, NodeKind::ChanX),
                    (cell.delta(1, 0), NodeKind::ChanX),
                    (cell, NodeKind::ChanY),
                    (cell.delta(0, 1), NodeKind::ChanY),
                    (cell, NodeKind::ChanZ),
                ];
                for track in 0..ntracks {
                    let mut wires: Vec<NodeId> = vec![];
                    for (wcell, kind) in incident {
                        let key = SpatialKey::new(wcell, kind, track as u32, None);
                        if let Some(wire) = graph.lookup.find_node(&key) {
                            if !wires.contains(&wire) {
                                wires.push(wire);
                            }
                        }
                    }
                    for &a in &wires {
                        for &b in &wires {
                            if a != b {
                                res.push((a, b, sw.wire));
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Connects every allocated node of a uniform fabric and returns the number of edges added.
pub fn build_uniform_edges(ctx: &DeviceContext, graph: &mut RrGraph, sw: &EdgeSwitches) -> usize {
    let mut res = vec![];
    for (node, info) in &graph.nodes {
        match info.kind {
            NodeKind::Source | NodeKind::Sink => class_edges(ctx, graph, node, info, sw, &mut res),
            NodeKind::Ipin | NodeKind::Opin => pin_edges(ctx, graph, node, info, sw, &mut res),
            NodeKind::ChanX | NodeKind::ChanY | NodeKind::ChanZ | NodeKind::Mux => (),
        }
    }
    switch_block_edges(ctx, graph, sw, &mut res);
    res.sort_unstable();
    res.dedup();
    for &(from, to, switch) in &res {
        graph.add_edge(from, to, switch);
    }
    info!(edges = res.len(), "uniform edges built");
    res.len()
}
