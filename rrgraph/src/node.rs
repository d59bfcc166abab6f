use enum_map::Enum;
use rrgraph_arch::db::{CostIndex, SideSet, SwitchId};
use rrgraph_arch::grid::{CellCoord, ColId, LayerId, RowId};
use serde::{Deserialize, Serialize};
use unnamed_entity::{EntityId, entity_id};

entity_id! {
    pub id NodeId u32, reserve 1;
    pub id EdgeId u32, reserve 1;
}

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Enum, Serialize, Deserialize,
)]
pub enum NodeKind {
    Source,
    Sink,
    Ipin,
    Opin,
    ChanX,
    ChanY,
    ChanZ,
    Mux,
}

impl NodeKind {
    pub const ALL: [NodeKind; 8] = [
        NodeKind::Source,
        NodeKind::Sink,
        NodeKind::Ipin,
        NodeKind::Opin,
        NodeKind::ChanX,
        NodeKind::ChanY,
        NodeKind::ChanZ,
        NodeKind::Mux,
    ];

    pub fn is_pin(self) -> bool {
        matches!(self, NodeKind::Ipin | NodeKind::Opin)
    }

    pub fn is_wire(self) -> bool {
        matches!(self, NodeKind::ChanX | NodeKind::ChanY | NodeKind::ChanZ)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                NodeKind::Source => "SOURCE",
                NodeKind::Sink => "SINK",
                NodeKind::Ipin => "IPIN",
                NodeKind::Opin => "OPIN",
                NodeKind::ChanX => "CHANX",
                NodeKind::ChanY => "CHANY",
                NodeKind::ChanZ => "CHANZ",
                NodeKind::Mux => "MUX",
            }
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub layer: LayerId,
    pub x_low: ColId,
    pub x_high: ColId,
    pub y_low: RowId,
    pub y_high: RowId,
    pub capacity: u32,
    /// Pin, track or class number, scoped to the node kind at its location.
    pub ptc: u32,
    /// Only meaningful for IPIN and OPIN.
    pub sides: SideSet,
    pub r: f64,
    pub c: f64,
    pub cost_index: CostIndex,
}

impl Node {
    /// A 1x1 node at `cell` with unit capacity and no electrical load.
    pub fn point(kind: NodeKind, cell: CellCoord, ptc: u32, cost_index: CostIndex) -> Self {
        Node {
            kind,
            layer: cell.layer,
            x_low: cell.col,
            x_high: cell.col,
            y_low: cell.row,
            y_high: cell.row,
            capacity: 1,
            ptc,
            sides: SideSet::new(),
            r: 0.0,
            c: 0.0,
            cost_index,
        }
    }

    pub fn low(&self) -> CellCoord {
        CellCoord {
            layer: self.layer,
            col: self.x_low,
            row: self.y_low,
        }
    }

    pub fn width(&self) -> usize {
        self.x_high.to_idx() + 1 - self.x_low.to_idx()
    }

    pub fn height(&self) -> usize {
        self.y_high.to_idx() + 1 - self.y_low.to_idx()
    }

    pub fn contains(&self, col: ColId, row: RowId) -> bool {
        (self.x_low..=self.x_high).contains(&col) && (self.y_low..=self.y_high).contains(&row)
    }

    /// Number of channel segments spanned beyond the first, for CHANX and CHANY.
    pub fn length(&self) -> usize {
        match self.kind {
            NodeKind::ChanX => self.x_high.to_idx() - self.x_low.to_idx(),
            NodeKind::ChanY => self.y_high.to_idx() - self.y_low.to_idx(),
            _ => 0,
        }
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{kind} L{l} ({xl},{yl})-({xh},{yh}) ptc {ptc}",
            kind = self.kind,
            l = self.layer,
            xl = self.x_low,
            yl = self.y_low,
            xh = self.x_high,
            yh = self.y_high,
            ptc = self.ptc,
        )?;
        if self.kind.is_pin() {
            write!(f, " {}", self.sides)?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub switch: SwitchId,
    pub configurable: bool,
}
