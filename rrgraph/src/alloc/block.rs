use rrgraph_arch::db::{
    ClassKind, CostIndex, IPIN_COST_INDEX, OPIN_COST_INDEX, SINK_COST_INDEX, SOURCE_COST_INDEX,
    Side, SideSet,
};
use rrgraph_arch::grid::{ColId, RowId};
use tracing::debug;
use unnamed_entity::EntityId;

use crate::error::Result;
use crate::graph::{DeviceContext, RrGraph};
use crate::lookup::SpatialKey;
use crate::node::{Node, NodeId, NodeKind};

/// Sides on which a tile rooted at `(x, y)` exposes its pins: perimeter tiles only face the
/// inside of the array, anything else uses all four sides.
pub fn wanted_sides(x: usize, y: usize, width: usize, height: usize) -> SideSet {
    let mut sides = SideSet::new();
    if y + 1 == height {
        sides.insert(Side::Bottom);
    }
    if x + 1 == width {
        sides.insert(Side::Left);
    }
    if y == 0 {
        sides.insert(Side::Top);
    }
    if x == 0 {
        sides.insert(Side::Right);
    }
    if sides.is_empty() {
        sides = SideSet::ALL;
    }
    sides
}

pub fn alloc_block_nodes(ctx: &DeviceContext, graph: &mut RrGraph) -> Result<()> {
    let grid = ctx.grid;
    let start = graph.nodes.len();
    for root in grid.roots() {
        let tt = ctx.tile_type(root);
        let sides = wanted_sides(
            root.col.to_idx(),
            root.row.to_idx(),
            grid.width(),
            grid.height(),
        );
        for dx in 0..tt.width {
            for dy in 0..tt.height {
                let cell = root.delta(dx, dy);
                // class and pin numbers are shared between the two directions
                for kind in [NodeKind::Source, NodeKind::Sink] {
                    graph.lookup.reserve(cell, kind, tt.classes.len(), None)?;
                }
                for side in sides.iter() {
                    for kind in [NodeKind::Ipin, NodeKind::Opin] {
                        graph.lookup.reserve(cell, kind, tt.pins.len(), Some(side))?;
                    }
                }
            }
        }
        for (class, info) in &tt.classes {
            let (kind, cost) = match info.kind {
                ClassKind::Driver => (NodeKind::Source, SOURCE_COST_INDEX),
                ClassKind::Receiver => (NodeKind::Sink, SINK_COST_INDEX),
            };
            let ptc = class.to_idx() as u32;
            let node = graph.add_node(Node {
                x_high: ColId::from_idx(root.col.to_idx() + tt.width - 1),
                y_high: RowId::from_idx(root.row.to_idx() + tt.height - 1),
                capacity: info.pins.len() as u32,
                ..Node::point(kind, root, ptc, CostIndex::from_idx(cost))
            });
            for dx in 0..tt.width {
                for dy in 0..tt.height {
                    let key = SpatialKey::new(root.delta(dx, dy), kind, ptc, None);
                    graph.lookup.add_node(node, key)?;
                }
            }
        }

        for (pin, _) in &tt.pins {
            let (kind, cost) = match tt.pin_class_kind(pin) {
                ClassKind::Driver => (NodeKind::Opin, OPIN_COST_INDEX),
                ClassKind::Receiver => (NodeKind::Ipin, IPIN_COST_INDEX),
            };
            let ptc = pin.to_idx() as u32;
            let mut node: Option<NodeId> = None;
            for side in sides.iter() {
                for dx in 0..tt.width {
                    for dy in 0..tt.height {
                        if !tt.is_pin_on_side(pin, dx, dy, side) {
                            continue;
                        }
                        let cell = root.delta(dx, dy);
                        let id = match node {
                            Some(id) => id,
                            None => {
                                let id = graph.add_node(Node::point(
                                    kind,
                                    cell,
                                    ptc,
                                    CostIndex::from_idx(cost),
                                ));
                                node = Some(id);
                                id
                            }
                        };
                        graph.nodes[id].sides.insert(side);
                        graph
                            .lookup
                            .add_node(id, SpatialKey::new(cell, kind, ptc, Some(side)))?;
                    }
                }
            }
        }
    }
    debug!(count = graph.nodes.len() - start, "block nodes allocated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sides(list: &[Side]) -> SideSet {
        list.iter().copied().collect()
    }

    #[test]
    fn interior_gets_all_sides() {
        assert_eq!(wanted_sides(2, 2, 5, 5), SideSet::ALL);
        assert_eq!(wanted_sides(0, 0, 1, 1), SideSet::ALL);
    }

    #[test]
    fn perimeter_faces_inward() {
        assert_eq!(wanted_sides(2, 4, 5, 5), sides(&[Side::Bottom]));
        assert_eq!(wanted_sides(2, 0, 5, 5), sides(&[Side::Top]));
        assert_eq!(wanted_sides(0, 2, 5, 5), sides(&[Side::Right]));
        assert_eq!(wanted_sides(4, 2, 5, 5), sides(&[Side::Left]));
        assert_eq!(wanted_sides(0, 0, 5, 5), sides(&[Side::Top, Side::Right]));
        assert_eq!(wanted_sides(4, 4, 5, 5), sides(&[Side::Bottom, Side::Left]));
    }

    #[test]
    fn lookup_presized_per_cell() {
        use rrgraph_arch::fabric::UniformFabric;
        use rrgraph_arch::grid::CellCoord;

        use crate::options::{BuildOptions, RouteType};

        let fabric = UniformFabric {
            width: 4,
            height: 4,
            empty_corners: false,
            ..Default::default()
        }
        .build()
        .unwrap();
        for (route_type, tracks) in [(RouteType::Detailed, 4), (RouteType::Global, 1)] {
            let ctx = DeviceContext::new(
                &fabric.arch,
                &fabric.grid,
                &fabric.chan_width,
                &fabric.tracks,
                &BuildOptions { route_type },
            )
            .unwrap();
            let graph = RrGraph::build(&ctx).unwrap();
            let lookup = &graph.lookup;
            let inner = CellCoord::new(0, 1, 1);
            assert_eq!(lookup.slots(inner, NodeKind::Source, None), 2);
            assert_eq!(lookup.slots(inner, NodeKind::Sink, None), 2);
            for side in Side::SIDES {
                assert_eq!(lookup.slots(inner, NodeKind::Ipin, Some(side)), 3);
                assert_eq!(lookup.slots(inner, NodeKind::Opin, Some(side)), 3);
            }
            let bottom = CellCoord::new(0, 1, 0);
            assert_eq!(lookup.slots(bottom, NodeKind::Ipin, Some(Side::Top)), 3);
            assert_eq!(lookup.slots(bottom, NodeKind::Ipin, Some(Side::Bottom)), 0);
            assert_eq!(lookup.slots(bottom, NodeKind::ChanX, None), tracks);
            assert_eq!(lookup.slots(inner, NodeKind::ChanY, None), tracks);
            assert_eq!(lookup.slots(CellCoord::new(0, 0, 1), NodeKind::ChanX, None), 0);
        }
    }

    #[test]
    fn single_row_device() {
        assert_eq!(
            wanted_sides(1, 0, 3, 1),
            sides(&[Side::Top, Side::Bottom])
        );
        assert_eq!(
            wanted_sides(0, 0, 3, 1),
            sides(&[Side::Top, Side::Bottom, Side::Right])
        );
    }
}
