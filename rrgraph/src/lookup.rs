use enum_map::EnumMap;
use ndarray::Array3;
use rrgraph_arch::db::Side;
use rrgraph_arch::grid::{CellCoord, ColId, LayerId, RowId};
use unnamed_entity::EntityId;

use crate::error::{Error, Result};
use crate::node::{NodeId, NodeKind};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SpatialKey {
    pub layer: LayerId,
    pub col: ColId,
    pub row: RowId,
    pub kind: NodeKind,
    pub ptc: u32,
    pub side: Option<Side>,
}

impl SpatialKey {
    pub fn new(cell: CellCoord, kind: NodeKind, ptc: u32, side: Option<Side>) -> Self {
        SpatialKey {
            layer: cell.layer,
            col: cell.col,
            row: cell.row,
            kind,
            ptc,
            side,
        }
    }

    pub fn cell(&self) -> CellCoord {
        CellCoord {
            layer: self.layer,
            col: self.col,
            row: self.row,
        }
    }

    fn check_side(&self) -> Result<()> {
        if self.kind.is_pin() != self.side.is_some() {
            return Err(Error::SideMismatch(*self));
        }
        Ok(())
    }
}

impl std::fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}:{}", self.cell(), self.kind, self.ptc)?;
        if let Some(side) = self.side {
            write!(f, ":{side}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
struct LookupCell {
    sideless: Vec<Option<NodeId>>,
    sided: EnumMap<Side, Vec<Option<NodeId>>>,
}

impl LookupCell {
    fn slot(&self, side: Option<Side>) -> &Vec<Option<NodeId>> {
        match side {
            None => &self.sideless,
            Some(side) => &self.sided[side],
        }
    }

    fn slot_mut(&mut self, side: Option<Side>) -> &mut Vec<Option<NodeId>> {
        match side {
            None => &mut self.sideless,
            Some(side) => &mut self.sided[side],
        }
    }
}

fn cell_index(cell: CellCoord) -> (usize, usize, usize) {
    (cell.layer.to_idx(), cell.col.to_idx(), cell.row.to_idx())
}

/// Maps `(layer, x, y, kind, ptc, side)` to node ids.
///
/// Many keys may resolve to one node (multi-cell tiles, pins on several sides, wires spanning
/// several cells), but every key resolves to at most one node.
#[derive(Clone, Debug)]
pub struct SpatialLookup {
    cells: EnumMap<NodeKind, Array3<LookupCell>>,
}

impl Default for SpatialLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialLookup {
    pub fn new() -> Self {
        SpatialLookup {
            cells: EnumMap::from_fn(|_| Array3::default((0, 0, 0))),
        }
    }

    /// Sizes the lookup for a device, dropping anything registered so far.
    pub fn resize(&mut self, layers: usize, width: usize, height: usize) {
        self.cells = EnumMap::from_fn(|_| Array3::default((layers, width, height)));
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.cells[NodeKind::Source].dim()
    }

    pub fn reserve(
        &mut self,
        cell: CellCoord,
        kind: NodeKind,
        count: usize,
        side: Option<Side>,
    ) -> Result<()> {
        let key = SpatialKey::new(cell, kind, 0, side);
        key.check_side()?;
        let Some(entry) = self.cells[kind].get_mut(cell_index(cell)) else {
            return Err(Error::KeyOutOfBounds(key));
        };
        let slot = entry.slot_mut(side);
        if slot.len() < count {
            slot.resize(count, None);
        }
        Ok(())
    }

    /// Number of ptc slots currently allocated at `(cell, kind, side)`.
    #[cfg(test)]
    pub(crate) fn slots(&self, cell: CellCoord, kind: NodeKind, side: Option<Side>) -> usize {
        self.cells[kind]
            .get(cell_index(cell))
            .map_or(0, |entry| entry.slot(side).len())
    }

    pub fn add_node(&mut self, node: NodeId, key: SpatialKey) -> Result<()> {
        key.check_side()?;
        let Some(entry) = self.cells[key.kind].get_mut(cell_index(key.cell())) else {
            return Err(Error::KeyOutOfBounds(key));
        };
        let slot = entry.slot_mut(key.side);
        let ptc = key.ptc as usize;
        if slot.len() <= ptc {
            slot.resize(ptc + 1, None);
        }
        if let Some(prev) = slot[ptc] {
            return Err(Error::DuplicateKey { key, node: prev });
        }
        slot[ptc] = Some(node);
        Ok(())
    }

    pub fn find_node(&self, key: &SpatialKey) -> Option<NodeId> {
        if key.check_side().is_err() {
            return None;
        }
        let entry = self.cells[key.kind].get(cell_index(key.cell()))?;
        entry.slot(key.side).get(key.ptc as usize).copied().flatten()
    }

    /// Every distinct node of `kind` registered in the cell, with or without a side, in
    /// first-seen order.
    pub fn find_nodes_at_all_sides(&self, cell: CellCoord, kind: NodeKind) -> Vec<NodeId> {
        let mut res = vec![];
        let Some(entry) = self.cells[kind].get(cell_index(cell)) else {
            return res;
        };
        let slots = std::iter::once(&entry.sideless).chain(entry.sided.values());
        for node in slots.flatten().flatten().copied() {
            if !res.contains(&node) {
                res.push(node);
            }
        }
        res
    }

    /// Wire nodes of `kind` passing through the cell, in track order.
    pub fn find_channel_nodes(&self, cell: CellCoord, kind: NodeKind) -> Vec<NodeId> {
        match self.cells[kind].get(cell_index(cell)) {
            Some(entry) => entry.sideless.iter().flatten().copied().collect(),
            None => vec![],
        }
    }

    /// Every key registered in the cell for `kind`, with the node it resolves to.
    pub fn keys_at(&self, cell: CellCoord, kind: NodeKind) -> Vec<(SpatialKey, NodeId)> {
        let Some(entry) = self.cells[kind].get(cell_index(cell)) else {
            return vec![];
        };
        let sides = std::iter::once(None).chain(Side::SIDES.into_iter().map(Some));
        let mut res = vec![];
        for side in sides {
            for (ptc, node) in entry.slot(side).iter().enumerate() {
                if let Some(node) = *node {
                    res.push((SpatialKey::new(cell, kind, ptc as u32, side), node));
                }
            }
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn nid(idx: usize) -> NodeId {
        NodeId::from_idx(idx)
    }

    fn lookup() -> SpatialLookup {
        let mut lookup = SpatialLookup::new();
        lookup.resize(2, 3, 3);
        lookup
    }

    #[test]
    fn add_and_find() {
        let mut lookup = lookup();
        let cell = CellCoord::new(1, 2, 0);
        let key = SpatialKey::new(cell, NodeKind::ChanX, 3, None);
        lookup.add_node(nid(7), key).unwrap();
        assert_eq!(lookup.find_node(&key), Some(nid(7)));
        assert_eq!(lookup.find_node(&SpatialKey { ptc: 2, ..key }), None);
        assert_eq!(lookup.find_node(&SpatialKey { ptc: 9, ..key }), None);
        assert_eq!(
            lookup.find_node(&SpatialKey {
                kind: NodeKind::ChanY,
                ..key
            }),
            None
        );
        let outside = SpatialKey::new(CellCoord::new(0, 3, 0), NodeKind::ChanX, 0, None);
        assert_eq!(lookup.find_node(&outside), None);
    }

    #[test]
    fn rejects_bad_keys() {
        let mut lookup = lookup();
        let cell = CellCoord::new(0, 1, 1);
        let key = SpatialKey::new(cell, NodeKind::Ipin, 0, Some(Side::Top));
        lookup.add_node(nid(0), key).unwrap();
        assert_matches!(
            lookup.add_node(nid(1), key),
            Err(Error::DuplicateKey { node, .. }) if node == nid(0)
        );
        assert_matches!(
            lookup.add_node(nid(1), SpatialKey { side: None, ..key }),
            Err(Error::SideMismatch(_))
        );
        let sided_wire = SpatialKey::new(cell, NodeKind::ChanY, 0, Some(Side::Left));
        assert_matches!(
            lookup.add_node(nid(1), sided_wire),
            Err(Error::SideMismatch(_))
        );
        let outside = SpatialKey::new(CellCoord::new(2, 0, 0), NodeKind::Source, 0, None);
        assert_matches!(
            lookup.add_node(nid(1), outside),
            Err(Error::KeyOutOfBounds(_))
        );
        assert_matches!(
            lookup.reserve(CellCoord::new(0, 0, 5), NodeKind::Sink, 4, None),
            Err(Error::KeyOutOfBounds(_))
        );
    }

    #[test]
    fn all_sides_distinct_in_order() {
        let mut lookup = lookup();
        let cell = CellCoord::new(0, 0, 0);
        for (node, ptc, side) in [
            (4, 1, Side::Top),
            (3, 0, Side::Right),
            (4, 1, Side::Left),
            (5, 2, Side::Left),
        ] {
            lookup
                .add_node(nid(node), SpatialKey::new(cell, NodeKind::Opin, ptc, Some(side)))
                .unwrap();
        }
        assert_eq!(
            lookup.find_nodes_at_all_sides(cell, NodeKind::Opin),
            [nid(4), nid(3), nid(5)]
        );
        assert_eq!(lookup.keys_at(cell, NodeKind::Opin).len(), 4);
        assert!(lookup.keys_at(cell, NodeKind::Ipin).is_empty());
    }

    #[test]
    fn channel_nodes_in_track_order() {
        let mut lookup = lookup();
        let cell = CellCoord::new(0, 1, 2);
        lookup.reserve(cell, NodeKind::ChanY, 4, None).unwrap();
        lookup
            .add_node(nid(9), SpatialKey::new(cell, NodeKind::ChanY, 3, None))
            .unwrap();
        lookup
            .add_node(nid(2), SpatialKey::new(cell, NodeKind::ChanY, 0, None))
            .unwrap();
        assert_eq!(
            lookup.find_channel_nodes(cell, NodeKind::ChanY),
            [nid(2), nid(9)]
        );
        let keys = lookup.keys_at(cell, NodeKind::ChanY);
        assert_eq!(keys[1].0.ptc, 3);
        assert_eq!(lookup.dim(), (2, 3, 3));
    }
}
