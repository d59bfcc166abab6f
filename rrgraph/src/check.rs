use bitvec::vec::BitVec;
use itertools::Itertools;
use rayon::prelude::*;
use rrgraph_arch::db::{ClassId, ClassKind, PinId, SwitchKind};
use tracing::{debug, warn};
use unnamed_entity::{EntityId, EntityVec};

use crate::diag::{Check, Diagnostic, Report, Subject};
use crate::graph::{DeviceContext, RrGraph};
use crate::node::{EdgeId, Node, NodeId, NodeKind};
use crate::options::CheckOptions;

#[derive(Debug, Default)]
struct NodeOutcome {
    diags: Vec<Diagnostic>,
    undriven_fringe: bool,
}

struct Checker<'a> {
    ctx: &'a DeviceContext<'a>,
    graph: &'a RrGraph,
    opts: &'a CheckOptions,
    fan_in: EntityVec<NodeId, u32>,
    buffer_driven: BitVec,
    out_edges: EntityVec<NodeId, Vec<EdgeId>>,
}

/// Parallel edges between these kinds are a legitimate way of offering several switches.
fn multi_edge_legal(from: NodeKind, to: NodeKind, flat: bool) -> bool {
    match (from, to) {
        (f, t) if f.is_wire() && t.is_wire() => true,
        (f, NodeKind::Ipin) if f.is_wire() => true,
        (NodeKind::Opin, t) if t.is_wire() => true,
        (NodeKind::Ipin, NodeKind::Ipin) | (NodeKind::Opin, NodeKind::Opin) => flat,
        _ => false,
    }
}

impl Checker<'_> {
    fn node_msg(&self, node: NodeId, msg: String) -> String {
        format!("{}: {msg}", self.graph.nodes[node])
    }

    fn fatal(&self, node: NodeId, check: Check, msg: String) -> Diagnostic {
        Diagnostic::fatal(Subject::Node(node), check, self.node_msg(node, msg))
    }

    fn soft(&self, node: NodeId, check: Check, msg: String) -> Diagnostic {
        Diagnostic::soft(Subject::Node(node), check, self.node_msg(node, msg))
    }

    fn is_fringe(&self, info: &Node) -> bool {
        let grid = self.ctx.grid;
        info.x_low.to_idx() <= 1
            || info.y_low.to_idx() <= 1
            || info.x_high.to_idx() + 2 >= grid.width()
            || info.y_high.to_idx() + 2 >= grid.height()
    }

    fn check_node(&self, node: NodeId) -> NodeOutcome {
        let mut res = NodeOutcome::default();
        if self.opts.is_excluded(node) {
            return res;
        }
        let info = &self.graph.nodes[node];
        let grid = self.ctx.grid;
        if info.layer.to_idx() >= grid.layers()
            || info.x_low.to_idx() >= grid.width()
            || info.x_high.to_idx() >= grid.width()
            || info.y_low.to_idx() >= grid.height()
            || info.y_high.to_idx() >= grid.height()
        {
            res.diags.push(self.fatal(
                node,
                Check::Bounds,
                format!(
                    "outside the {}x{}x{} device",
                    grid.layers(),
                    grid.width(),
                    grid.height()
                ),
            ));
            return res;
        }
        if info.x_low > info.x_high || info.y_low > info.y_high {
            res.diags.push(self.soft(
                node,
                Check::BoxOrder,
                "low corner above high corner".to_string(),
            ));
        } else {
            self.check_shape(node, info, &mut res.diags);
        }
        let cost_len = self.ctx.arch.cost_table_len();
        if info.cost_index.to_idx() >= cost_len {
            res.diags.push(self.soft(
                node,
                Check::CostIndex,
                format!(
                    "cost index {} outside the {cost_len}-entry table",
                    info.cost_index
                ),
            ));
        }
        self.check_electrical(node, info, &mut res.diags);
        let fan_in = self.fan_in[node];
        if self.buffer_driven[node.to_idx()] && fan_in != 1 {
            res.diags.push(self.fatal(
                node,
                Check::BufferFanIn,
                format!("driven through a BUFFER switch but has fan-in {fan_in}"),
            ));
        }
        self.check_multi_edges(node, info, &mut res.diags);
        if !self.opts.flat {
            self.check_fan_in(node, info, &mut res);
        }
        res
    }

    fn check_shape(&self, node: NodeId, info: &Node, diags: &mut Vec<Diagnostic>) {
        let ctx = self.ctx;
        let width = ctx.grid.width();
        let height = ctx.grid.height();
        let x = info.x_low.to_idx();
        let y = info.y_low.to_idx();
        let mut expected_capacity = 1;
        match info.kind {
            NodeKind::Source | NodeKind::Sink => {
                let tile = ctx.grid.tile(info.low());
                let tt = ctx.tile_type(info.low());
                if !tile.is_root() || info.width() != tt.width || info.height() != tt.height {
                    diags.push(self.soft(
                        node,
                        Check::Shape,
                        format!(
                            "box does not match the {}x{} footprint of {}",
                            tt.width, tt.height, tt.name
                        ),
                    ));
                }
                if info.ptc as usize >= tt.classes.len() {
                    diags.push(self.soft(
                        node,
                        Check::Ptc,
                        format!("{} has only {} classes", tt.name, tt.classes.len()),
                    ));
                    return;
                }
                let class = &tt.classes[ClassId::from_idx(info.ptc as usize)];
                let want = match info.kind {
                    NodeKind::Source => ClassKind::Driver,
                    _ => ClassKind::Receiver,
                };
                if class.kind != want {
                    diags.push(self.soft(
                        node,
                        Check::Ptc,
                        format!("class {} of {} is a {:?} class", info.ptc, tt.name, class.kind),
                    ));
                }
                expected_capacity = class.pins.len();
            }
            NodeKind::Ipin | NodeKind::Opin => {
                if info.width() != 1 || info.height() != 1 {
                    diags.push(self.soft(node, Check::Shape, "pin node is not 1x1".to_string()));
                }
                let tile = ctx.grid.tile(info.low());
                let tt = ctx.tile_type(info.low());
                if info.ptc as usize >= tt.pins.len() {
                    diags.push(self.soft(
                        node,
                        Check::Ptc,
                        format!("{} has only {} pins", tt.name, tt.pins.len()),
                    ));
                    return;
                }
                let pin = PinId::from_idx(info.ptc as usize);
                let want = match info.kind {
                    NodeKind::Opin => ClassKind::Driver,
                    _ => ClassKind::Receiver,
                };
                if tt.pin_class_kind(pin) != want {
                    diags.push(self.soft(
                        node,
                        Check::Ptc,
                        format!("pin {} of {} has the wrong direction", tt.pins[pin].name, tt.name),
                    ));
                }
                if info.sides.is_empty() {
                    diags.push(self.soft(node, Check::Shape, "pin node has no side".to_string()));
                }
                for side in info.sides.iter() {
                    if !tt.is_pin_on_side(pin, tile.dx, tile.dy, side) {
                        diags.push(self.soft(
                            node,
                            Check::Shape,
                            format!("pin {} is not located on side {side}", tt.pins[pin].name),
                        ));
                    }
                }
            }
            NodeKind::ChanX => {
                if info.y_low != info.y_high || x < 1 || info.x_high.to_idx() + 2 > width {
                    diags.push(self.soft(
                        node,
                        Check::Shape,
                        format!("CHANX must be horizontal within x 1..={}", width as isize - 2),
                    ));
                }
                if y + 2 > height {
                    diags.push(self.soft(
                        node,
                        Check::Shape,
                        "CHANX lies above the last channel".to_string(),
                    ));
                    return;
                }
                self.check_track(node, info, ctx.chanx_tracks(y), diags);
                if ctx.is_global() {
                    expected_capacity = ctx.chan_width.x_list[y];
                }
            }
            NodeKind::ChanY => {
                if info.x_low != info.x_high || y < 1 || info.y_high.to_idx() + 2 > height {
                    diags.push(self.soft(
                        node,
                        Check::Shape,
                        format!("CHANY must be vertical within y 1..={}", height as isize - 2),
                    ));
                }
                if x + 2 > width {
                    diags.push(self.soft(
                        node,
                        Check::Shape,
                        "CHANY lies right of the last channel".to_string(),
                    ));
                    return;
                }
                self.check_track(node, info, ctx.chany_tracks(x), diags);
                if ctx.is_global() {
                    expected_capacity = ctx.chan_width.y_list[x];
                }
            }
            NodeKind::ChanZ => {
                if info.width() != 1 || info.height() != 1 || x + 2 > width || y + 2 > height {
                    diags.push(self.soft(
                        node,
                        Check::Shape,
                        "CHANZ must be 1x1 at a channel crossing".to_string(),
                    ));
                }
                let tracks = ctx.chanz_tracks();
                if info.ptc as usize >= tracks {
                    diags.push(self.soft(
                        node,
                        Check::Ptc,
                        format!("track {} beyond the {tracks} inter-layer tracks", info.ptc),
                    ));
                }
            }
            NodeKind::Mux => {
                if info.width() != 1 || info.height() != 1 {
                    diags.push(self.soft(node, Check::Shape, "MUX node is not 1x1".to_string()));
                }
            }
        }
        if info.capacity as usize != expected_capacity {
            diags.push(self.soft(
                node,
                Check::Capacity,
                format!(
                    "capacity {} where {expected_capacity} is expected",
                    info.capacity
                ),
            ));
        }
    }

    fn check_track(&self, node: NodeId, info: &Node, tracks: usize, diags: &mut Vec<Diagnostic>) {
        if info.ptc as usize >= tracks {
            diags.push(self.soft(
                node,
                Check::Ptc,
                format!("track {} beyond the channel width {tracks}", info.ptc),
            ));
        } else if self.ctx.is_global() && info.length() != 0 {
            diags.push(self.soft(
                node,
                Check::Shape,
                "wire spans more than one segment in global routing".to_string(),
            ));
        }
    }

    fn check_electrical(&self, node: NodeId, info: &Node, diags: &mut Vec<Diagnostic>) {
        let (r, c) = (info.r, info.c);
        let bad = if info.kind.is_wire() {
            !r.is_finite() || !c.is_finite() || r < 0.0 || c < 0.0 || (r == 0.0 && c == 0.0)
        } else {
            r != 0.0 || c != 0.0
        };
        if bad {
            diags.push(self.soft(
                node,
                Check::Electrical,
                format!("unexpected R {r} C {c} for a {} node", info.kind),
            ));
        }
    }

    fn check_multi_edges(&self, node: NodeId, info: &Node, diags: &mut Vec<Diagnostic>) {
        let graph = self.graph;
        let by_target = self.out_edges[node]
            .iter()
            .copied()
            .sorted_by_key(|&edge| graph.edges[edge].to)
            .chunk_by(|&edge| graph.edges[edge].to);
        for (to, group) in &by_target {
            let group: Vec<EdgeId> = group.collect();
            if group.len() < 2 {
                continue;
            }
            let to_kind = graph.nodes[to].kind;
            if !multi_edge_legal(info.kind, to_kind, self.opts.flat) {
                diags.push(self.soft(
                    node,
                    Check::IllegalMultiEdge,
                    format!(
                        "{} parallel edges to {to_kind} node {to}, not allowed from {}",
                        group.len(),
                        info.kind
                    ),
                ));
                continue;
            }
            let by_switch = group
                .into_iter()
                .sorted_by_key(|&edge| graph.edges[edge].switch)
                .chunk_by(|&edge| graph.edges[edge].switch);
            for (switch, same) in &by_switch {
                let same: Vec<EdgeId> = same.collect();
                if same.len() > 1 {
                    diags.push(Diagnostic::soft(
                        Subject::Edge(same[1]),
                        Check::RedundantEdge,
                        format!(
                            "{}: {} edges to node {to} through the same switch {}",
                            info,
                            same.len(),
                            graph.switches[switch].name
                        ),
                    ));
                }
            }
        }
    }

    fn check_fan_in(&self, node: NodeId, info: &Node, res: &mut NodeOutcome) {
        let fan_in = self.fan_in[node];
        if info.kind == NodeKind::Source {
            if fan_in != 0 {
                res.diags.push(self.fatal(
                    node,
                    Check::SourceFanIn,
                    format!("SOURCE has fan-in {fan_in}"),
                ));
            }
            return;
        }
        if fan_in != 0 {
            return;
        }
        if info.kind.is_pin() {
            let tt = self.ctx.tile_type(info.low());
            if (info.ptc as usize) < tt.pins.len() {
                let pin = PinId::from_idx(info.ptc as usize);
                if tt.is_ignored_pin(pin)
                    || (info.kind == NodeKind::Ipin && tt.is_zero_fc_chain_head(pin))
                {
                    return;
                }
            }
        }
        if info.kind.is_wire() && self.is_fringe(info) {
            res.undriven_fringe = true;
            return;
        }
        res.diags.push(self.soft(
            node,
            Check::MissingFanIn,
            "node has no fan-in".to_string(),
        ));
    }
}

/// Checks every node, edge and switch invariant of a finished graph.
///
/// Edges are checked first since everything after indexes through them; an out-of-range
/// node or switch stops the pass. Node checks run in parallel and are reported in node order,
/// cut off after the first fatal diagnostic.
pub fn check_rr_graph(ctx: &DeviceContext, graph: &RrGraph, opts: &CheckOptions) -> Report {
    let mut report = Report::default();
    let num_nodes = graph.nodes.len();
    for (edge, info) in &graph.edges {
        if info.from.to_idx() >= num_nodes || info.to.to_idx() >= num_nodes {
            report.push(Diagnostic::fatal(
                Subject::Edge(edge),
                Check::EdgeNode,
                format!(
                    "edge {} -> {} leaves the {num_nodes}-node graph",
                    info.from, info.to
                ),
            ));
            report.aborted = true;
            return report;
        }
        if graph.switches.get(info.switch).is_none() {
            report.push(Diagnostic::fatal(
                Subject::Edge(edge),
                Check::EdgeSwitch,
                format!(
                    "edge {} -> {} uses switch {} of {}",
                    info.from,
                    info.to,
                    info.switch,
                    graph.switches.len()
                ),
            ));
            report.aborted = true;
            return report;
        }
    }

    let mut buffer_driven = BitVec::repeat(false, num_nodes);
    let mut out_edges: EntityVec<NodeId, Vec<EdgeId>> =
        graph.nodes.values().map(|_| vec![]).collect();
    for (edge, info) in &graph.edges {
        if graph.switches[info.switch].kind == SwitchKind::Buffer {
            buffer_driven.set(info.to.to_idx(), true);
        }
        if !opts.is_excluded(info.from) {
            out_edges[info.from].push(edge);
        }
    }
    let checker = Checker {
        ctx,
        graph,
        opts,
        fan_in: graph.fan_in(),
        buffer_driven,
        out_edges,
    };

    let outcomes: Vec<NodeOutcome> = (0..num_nodes)
        .into_par_iter()
        .map(|idx| checker.check_node(NodeId::from_idx(idx)))
        .collect();
    let mut fringe = None;
    let mut num_fringe = 0;
    'nodes: for (idx, outcome) in outcomes.into_iter().enumerate() {
        for diag in outcome.diags {
            let fatal = diag.is_fatal();
            report.push(diag);
            if fatal {
                report.aborted = true;
                break 'nodes;
            }
        }
        if outcome.undriven_fringe {
            num_fringe += 1;
            if fringe.is_none() {
                fringe = Some(NodeId::from_idx(idx));
            }
        }
    }
    if !report.aborted {
        if let Some(node) = fringe {
            warn!(
                count = num_fringe,
                exemplar = %graph.nodes[node],
                "undriven wires on the device fringe"
            );
            report.push(checker.soft(
                node,
                Check::FringeFanIn,
                format!("one of {num_fringe} undriven wires on the device fringe"),
            ));
        }
    }
    debug!(
        nodes = num_nodes,
        edges = graph.edges.len(),
        diagnostics = report.diagnostics.len(),
        aborted = report.aborted,
        "routing resource graph checked"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_parallel_edges() {
        use NodeKind::*;
        assert!(multi_edge_legal(ChanX, ChanY, false));
        assert!(multi_edge_legal(ChanZ, ChanX, false));
        assert!(multi_edge_legal(ChanY, Ipin, false));
        assert!(multi_edge_legal(Opin, ChanX, false));
        assert!(!multi_edge_legal(Ipin, Ipin, false));
        assert!(multi_edge_legal(Ipin, Ipin, true));
        assert!(multi_edge_legal(Opin, Opin, true));
        assert!(!multi_edge_legal(Source, Opin, true));
        assert!(!multi_edge_legal(Ipin, Sink, false));
        assert!(!multi_edge_legal(ChanX, Opin, false));
    }
}
