use rrgraph_arch::chan::{ChannelWidth, TrackPlan};
use rrgraph_arch::db::{Arch, SwitchId, SwitchInfo, TileType};
use rrgraph_arch::grid::{CellCoord, DeviceGrid};
use tracing::info;
use unnamed_entity::{EntityId, EntityVec};

use crate::alloc;
use crate::error::Result;
use crate::lookup::SpatialLookup;
use crate::node::{Edge, EdgeId, Node, NodeId, NodeKind};
use crate::options::{BuildOptions, RouteType};

/// Everything about the device that graph construction and checking read but never modify.
#[derive(Clone, Copy, Debug)]
pub struct DeviceContext<'a> {
    pub arch: &'a Arch,
    pub grid: &'a DeviceGrid,
    pub chan_width: &'a ChannelWidth,
    pub tracks: &'a TrackPlan,
    pub route_type: RouteType,
}

impl<'a> DeviceContext<'a> {
    pub fn new(
        arch: &'a Arch,
        grid: &'a DeviceGrid,
        chan_width: &'a ChannelWidth,
        tracks: &'a TrackPlan,
        opts: &BuildOptions,
    ) -> Result<Self> {
        chan_width.validate(grid)?;
        tracks.validate(arch, chan_width)?;
        Ok(DeviceContext {
            arch,
            grid,
            chan_width,
            tracks,
            route_type: opts.route_type,
        })
    }

    pub fn is_global(&self) -> bool {
        self.route_type == RouteType::Global
    }

    pub fn tile_type(&self, cell: CellCoord) -> &'a TileType {
        self.grid.tile_type(self.arch, cell)
    }

    /// Number of track nodes allocated in CHANX channel `row`.
    pub fn chanx_tracks(&self, row: usize) -> usize {
        let width = self.chan_width.x_list[row];
        if self.is_global() { width.min(1) } else { width }
    }

    /// Number of track nodes allocated in CHANY channel `col`.
    pub fn chany_tracks(&self, col: usize) -> usize {
        let width = self.chan_width.y_list[col];
        if self.is_global() { width.min(1) } else { width }
    }

    pub fn chanz_tracks(&self) -> usize {
        if self.grid.layers() > 1 {
            self.arch.inter_layer.tracks
        } else {
            0
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct RrGraph {
    pub nodes: EntityVec<NodeId, Node>,
    pub edges: EntityVec<EdgeId, Edge>,
    pub switches: EntityVec<SwitchId, SwitchInfo>,
    pub lookup: SpatialLookup,
}

impl RrGraph {
    pub fn new(arch: &Arch) -> Self {
        RrGraph {
            nodes: EntityVec::new(),
            edges: EntityVec::new(),
            switches: arch.switches.clone(),
            lookup: SpatialLookup::new(),
        }
    }

    /// Allocates every block and channel node of the device and registers them in the lookup.
    pub fn build(ctx: &DeviceContext) -> Result<Self> {
        let mut graph = RrGraph::new(ctx.arch);
        let grid = ctx.grid;
        graph
            .lookup
            .resize(grid.layers(), grid.width(), grid.height());
        alloc::alloc_block_nodes(ctx, &mut graph)?;
        alloc::alloc_chan_nodes(ctx, &mut graph)?;
        info!(
            nodes = graph.nodes.len(),
            layers = grid.layers(),
            width = grid.width(),
            height = grid.height(),
            "routing resource nodes allocated"
        );
        Ok(graph)
    }

    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node)
    }

    /// Appends an edge; its configurable flag follows the switch kind, unknown switches count
    /// as configurable and are left for the checker to report.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId, switch: SwitchId) -> EdgeId {
        let configurable = self
            .switches
            .get(switch)
            .is_none_or(|sw| sw.kind.is_configurable());
        self.edges.push(Edge {
            from,
            to,
            switch,
            configurable,
        })
    }

    /// Fan-in of every node, counted over all edges with an in-range destination.
    pub fn fan_in(&self) -> EntityVec<NodeId, u32> {
        let mut res: EntityVec<NodeId, u32> = self.nodes.values().map(|_| 0).collect();
        for edge in self.edges.values() {
            if edge.to.to_idx() < res.len() {
                res[edge.to] += 1;
            }
        }
        res
    }

    pub fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.values().filter(|node| node.kind == kind).count()
    }
}
