use rrgraph_arch::grid::{CellCoord, ColId, LayerId, RowId};
use tracing::debug;
use unnamed_entity::EntityId;

use crate::error::Result;
use crate::graph::{DeviceContext, RrGraph};
use crate::lookup::SpatialKey;
use crate::node::{Node, NodeKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ChanDir {
    X,
    Y,
}

impl ChanDir {
    fn kind(self) -> NodeKind {
        match self {
            ChanDir::X => NodeKind::ChanX,
            ChanDir::Y => NodeKind::ChanY,
        }
    }

    /// Cell of segment `seg` in channel `chan`.
    fn cell(self, layer: usize, chan: usize, seg: usize) -> CellCoord {
        match self {
            ChanDir::X => CellCoord::new(layer, seg, chan),
            ChanDir::Y => CellCoord::new(layer, chan, seg),
        }
    }
}

pub fn alloc_chan_nodes(ctx: &DeviceContext, graph: &mut RrGraph) -> Result<()> {
    let start = graph.nodes.len();
    alloc_chan(ctx, graph, ChanDir::X)?;
    alloc_chan(ctx, graph, ChanDir::Y)?;
    let wires = graph.nodes.len() - start;
    alloc_chanz(ctx, graph)?;
    debug!(
        wires,
        inter_layer = graph.nodes.len() - start - wires,
        "channel nodes allocated"
    );
    Ok(())
}

fn alloc_chan(ctx: &DeviceContext, graph: &mut RrGraph, dir: ChanDir) -> Result<()> {
    let grid = ctx.grid;
    // channels run between rows (columns); segments exclude the perimeter cells
    let (num_chans, num_segs) = match dir {
        ChanDir::X => (grid.height(), grid.width()),
        ChanDir::Y => (grid.width(), grid.height()),
    };
    let kind = dir.kind();
    for layer in 0..grid.layers() {
        for chan in 0..num_chans.saturating_sub(1) {
            let (ntracks, width) = match dir {
                ChanDir::X => (ctx.chanx_tracks(chan), ctx.chan_width.x_list[chan]),
                ChanDir::Y => (ctx.chany_tracks(chan), ctx.chan_width.y_list[chan]),
            };
            for seg in 1..num_segs.saturating_sub(1) {
                graph
                    .lookup
                    .reserve(dir.cell(layer, chan, seg), kind, ntracks, None)?;
                for track in 0..ntracks {
                    let details = &ctx.tracks[track];
                    if details.length <= 0 {
                        continue;
                    }
                    let start = if ctx.is_global() {
                        seg
                    } else {
                        details.seg_start(chan, seg)
                    };
                    let ptc = track as u32;
                    let start_key = SpatialKey::new(dir.cell(layer, chan, start), kind, ptc, None);
                    let node = match graph.lookup.find_node(&start_key) {
                        Some(node) => node,
                        None => {
                            let cost_index = match dir {
                                ChanDir::X => ctx.arch.chanx_cost_index(details.segment),
                                ChanDir::Y => ctx.arch.chany_cost_index(details.segment),
                            };
                            let node = graph.add_node(Node {
                                capacity: if ctx.is_global() { width as u32 } else { 1 },
                                ..Node::point(kind, start_key.cell(), ptc, cost_index)
                            });
                            graph.lookup.add_node(node, start_key)?;
                            node
                        }
                    };
                    if seg != start {
                        let key = SpatialKey::new(dir.cell(layer, chan, seg), kind, ptc, None);
                        graph.lookup.add_node(node, key)?;
                    }
                    let segment = &ctx.arch.segments[details.segment];
                    let wire = &mut graph.nodes[node];
                    match dir {
                        ChanDir::X => {
                            wire.x_low = wire.x_low.min(ColId::from_idx(seg));
                            wire.x_high = wire.x_high.max(ColId::from_idx(seg));
                        }
                        ChanDir::Y => {
                            wire.y_low = wire.y_low.min(RowId::from_idx(seg));
                            wire.y_high = wire.y_high.max(RowId::from_idx(seg));
                        }
                    }
                    let cells = (wire.length() + 1) as f64;
                    wire.r = segment.r_per_tile * cells;
                    wire.c = segment.c_per_tile * cells;
                }
            }
        }
    }
    Ok(())
}

fn alloc_chanz(ctx: &DeviceContext, graph: &mut RrGraph) -> Result<()> {
    let grid = ctx.grid;
    let tracks = ctx.chanz_tracks();
    if tracks == 0 {
        return Ok(());
    }
    let inter = &ctx.arch.inter_layer;
    for layer in 0..grid.layers() {
        for y in 0..grid.height().saturating_sub(1) {
            for x in 0..grid.width().saturating_sub(1) {
                let cell = CellCoord::new(layer, x, y);
                graph.lookup.reserve(cell, NodeKind::ChanZ, tracks, None)?;
                for track in 0..tracks {
                    let ptc = track as u32;
                    let first = SpatialKey::new(
                        cell.with_layer(LayerId::from_idx(0)),
                        NodeKind::ChanZ,
                        ptc,
                        None,
                    );
                    // the first layer claims the id, every other layer reuses it
                    let node = match graph.lookup.find_node(&first) {
                        Some(node) => node,
                        None => graph.add_node(Node {
                            r: inter.r,
                            c: inter.c,
                            ..Node::point(
                                NodeKind::ChanZ,
                                first.cell(),
                                ptc,
                                ctx.arch.chanz_cost_index(),
                            )
                        }),
                    };
                    graph
                        .lookup
                        .add_node(node, SpatialKey::new(cell, NodeKind::ChanZ, ptc, None))?;
                }
            }
        }
    }
    Ok(())
}
