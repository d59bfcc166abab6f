use enum_map::Enum;
use serde::{Deserialize, Serialize};
use unnamed_entity::{EntityBitVec, EntityId, EntityVec, entity_id};

use crate::error::{ArchError, Result};

#[derive(
    Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Enum, Serialize, Deserialize,
)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

impl Side {
    pub const SIDES: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    fn bit(self) -> u8 {
        match self {
            Side::Top => 1,
            Side::Right => 2,
            Side::Bottom => 4,
            Side::Left => 8,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Side::Top => "TOP",
                Side::Right => "RIGHT",
                Side::Bottom => "BOTTOM",
                Side::Left => "LEFT",
            }
        )
    }
}

/// A subset of the four tile sides.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct SideSet(u8);

impl SideSet {
    pub const ALL: SideSet = SideSet(0xf);

    pub fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, side: Side) -> bool {
        let had = self.contains(side);
        self.0 |= side.bit();
        !had
    }

    pub fn contains(self, side: Side) -> bool {
        self.0 & side.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(self) -> impl Iterator<Item = Side> {
        Side::SIDES.into_iter().filter(move |&s| self.contains(s))
    }
}

impl FromIterator<Side> for SideSet {
    fn from_iter<T: IntoIterator<Item = Side>>(iter: T) -> Self {
        let mut res = SideSet::new();
        for side in iter {
            res.insert(side);
        }
        res
    }
}

impl std::fmt::Display for SideSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, side) in self.iter().enumerate() {
            if i != 0 {
                write!(f, ",")?;
            }
            write!(f, "{side}")?;
        }
        write!(f, "}}")
    }
}

entity_id! {
    pub id TileTypeId u16, reserve 1;
    pub id PinId u16, reserve 1;
    pub id ClassId u16, reserve 1;
    pub id SegmentId u16, reserve 1;
    pub id SwitchId u16, reserve 1;
    pub id CostIndex u16, reserve 1;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ClassKind {
    Driver,
    Receiver,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct PinLoc {
    pub dx: usize,
    pub dy: usize,
    pub side: Side,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PinInfo {
    pub name: String,
    pub class: ClassId,
    pub locs: Vec<PinLoc>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PinClass {
    pub kind: ClassKind,
    pub pins: Vec<PinId>,
}

/// Connectivity density between a set of pins and the tracks of one segment type.
#[derive(Clone, Debug, PartialEq)]
pub struct FcSpec {
    pub pins: Vec<PinId>,
    pub segment: SegmentId,
    pub value: f64,
}

#[derive(Clone, Debug)]
pub struct TileType {
    pub name: String,
    pub width: usize,
    pub height: usize,
    pub pins: EntityVec<PinId, PinInfo>,
    pub classes: EntityVec<ClassId, PinClass>,
    pub fc_specs: Vec<FcSpec>,
    pub ignored_pins: EntityBitVec<PinId>,
}

impl TileType {
    pub fn empty(name: &str) -> Self {
        TileType {
            name: name.to_string(),
            width: 1,
            height: 1,
            pins: EntityVec::new(),
            classes: EntityVec::new(),
            fc_specs: vec![],
            ignored_pins: EntityBitVec::repeat(false, 0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty() && self.classes.is_empty()
    }

    pub fn pin_class_kind(&self, pin: PinId) -> ClassKind {
        self.classes[self.pins[pin].class].kind
    }

    pub fn pin_offset(&self, pin: PinId) -> Option<(usize, usize)> {
        self.pins[pin].locs.first().map(|loc| (loc.dx, loc.dy))
    }

    pub fn is_pin_on_side(&self, pin: PinId, dx: usize, dy: usize, side: Side) -> bool {
        self.pins[pin]
            .locs
            .iter()
            .any(|loc| loc.dx == dx && loc.dy == dy && loc.side == side)
    }

    pub fn is_ignored_pin(&self, pin: PinId) -> bool {
        self.ignored_pins[pin]
    }

    /// Returns the Fc value that applies between the pin and the segment type, if specified.
    pub fn fc(&self, pin: PinId, segment: SegmentId) -> Option<f64> {
        self.fc_specs
            .iter()
            .find(|spec| spec.segment == segment && spec.pins.contains(&pin))
            .map(|spec| spec.value)
    }

    /// A carry-chain head is an input fed only by dedicated wiring, marked with Fc 0 on the
    /// first segment type.
    pub fn is_zero_fc_chain_head(&self, pin: PinId) -> bool {
        self.pin_class_kind(pin) == ClassKind::Receiver
            && self.fc_specs.iter().any(|spec| {
                spec.value == 0.0 && spec.segment.to_idx() == 0 && spec.pins.contains(&pin)
            })
    }
}

pub struct TileTypeBuilder {
    tile: TileType,
    ignored: Vec<PinId>,
}

impl TileTypeBuilder {
    pub fn new(name: &str, width: usize, height: usize) -> Self {
        let mut tile = TileType::empty(name);
        tile.width = width;
        tile.height = height;
        TileTypeBuilder {
            tile,
            ignored: vec![],
        }
    }

    pub fn add_class(&mut self, kind: ClassKind) -> ClassId {
        self.tile.classes.push(PinClass { kind, pins: vec![] })
    }

    pub fn add_pin(&mut self, name: &str, class: ClassId, locs: &[PinLoc]) -> PinId {
        let pin = self.tile.pins.push(PinInfo {
            name: name.to_string(),
            class,
            locs: locs.to_vec(),
        });
        if class.to_idx() < self.tile.classes.len() {
            self.tile.classes[class].pins.push(pin);
        }
        pin
    }

    pub fn add_fc(&mut self, pins: &[PinId], segment: SegmentId, value: f64) {
        self.tile.fc_specs.push(FcSpec {
            pins: pins.to_vec(),
            segment,
            value,
        });
    }

    pub fn ignore_pin(&mut self, pin: PinId) {
        self.ignored.push(pin);
    }

    pub fn finish(self) -> Result<TileType> {
        let mut tile = self.tile;
        if tile.width == 0 || tile.height == 0 {
            return Err(ArchError::EmptyFootprint {
                tile: tile.name,
                width: tile.width,
                height: tile.height,
            });
        }
        for pin in tile.pins.values() {
            if pin.class.to_idx() >= tile.classes.len() {
                return Err(ArchError::PinBadClass {
                    tile: tile.name.clone(),
                    pin: pin.name.clone(),
                    class: pin.class.to_idx(),
                });
            }
            for loc in &pin.locs {
                if loc.dx >= tile.width || loc.dy >= tile.height {
                    return Err(ArchError::PinOutsideFootprint {
                        tile: tile.name.clone(),
                        pin: pin.name.clone(),
                        dx: loc.dx,
                        dy: loc.dy,
                    });
                }
                // pin nodes are 1x1, so every side a pin shows up on must be on the same cell
                if (loc.dx, loc.dy) != (pin.locs[0].dx, pin.locs[0].dy) {
                    return Err(ArchError::PinMultipleOffsets {
                        tile: tile.name.clone(),
                        pin: pin.name.clone(),
                    });
                }
            }
        }
        for spec in &tile.fc_specs {
            for &pin in &spec.pins {
                if pin.to_idx() >= tile.pins.len() {
                    return Err(ArchError::FcBadPin {
                        tile: tile.name.clone(),
                        pin: pin.to_idx(),
                    });
                }
            }
        }
        tile.ignored_pins = EntityBitVec::repeat(false, tile.pins.len());
        for pin in self.ignored {
            if pin.to_idx() < tile.pins.len() {
                tile.ignored_pins.set(pin, true);
            }
        }
        Ok(tile)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum SwitchKind {
    Short,
    PassGate,
    Mux,
    Tristate,
    Buffer,
}

impl SwitchKind {
    pub fn is_configurable(self) -> bool {
        !matches!(self, SwitchKind::Short | SwitchKind::Buffer)
    }

    pub fn is_buffered(self) -> bool {
        matches!(
            self,
            SwitchKind::Mux | SwitchKind::Tristate | SwitchKind::Buffer
        )
    }
}

impl std::fmt::Display for SwitchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SwitchKind::Short => "SHORT",
                SwitchKind::PassGate => "PASS_GATE",
                SwitchKind::Mux => "MUX",
                SwitchKind::Tristate => "TRISTATE",
                SwitchKind::Buffer => "BUFFER",
            }
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwitchInfo {
    pub name: String,
    pub kind: SwitchKind,
    pub buffered: bool,
}

impl SwitchInfo {
    pub fn new(name: &str, kind: SwitchKind) -> Self {
        SwitchInfo {
            name: name.to_string(),
            kind,
            buffered: kind.is_buffered(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SegmentInfo {
    pub name: String,
    /// Tiles spanned by one wire; zero or negative marks a placeholder slot.
    pub length: i32,
    pub longline: bool,
    pub r_per_tile: f64,
    pub c_per_tile: f64,
    pub frequency: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterLayer {
    pub tracks: usize,
    pub r: f64,
    pub c: f64,
}

pub const SOURCE_COST_INDEX: usize = 0;
pub const SINK_COST_INDEX: usize = 1;
pub const OPIN_COST_INDEX: usize = 2;
pub const IPIN_COST_INDEX: usize = 3;
pub const CHANX_COST_INDEX_START: usize = 4;

#[derive(Clone, Debug, Default)]
pub struct Arch {
    pub tile_types: EntityVec<TileTypeId, TileType>,
    pub segments: EntityVec<SegmentId, SegmentInfo>,
    pub switches: EntityVec<SwitchId, SwitchInfo>,
    pub inter_layer: InterLayer,
}

impl Arch {
    #[track_caller]
    pub fn get_tile_type(&self, name: &str) -> TileTypeId {
        self.tile_types
            .iter()
            .find(|(_, tt)| tt.name == name)
            .unwrap_or_else(|| panic!("no tile type {name}"))
            .0
    }

    pub fn chanx_cost_index(&self, segment: SegmentId) -> CostIndex {
        CostIndex::from_idx(CHANX_COST_INDEX_START + segment.to_idx())
    }

    pub fn chany_cost_index(&self, segment: SegmentId) -> CostIndex {
        CostIndex::from_idx(CHANX_COST_INDEX_START + self.segments.len() + segment.to_idx())
    }

    pub fn chanz_cost_index(&self) -> CostIndex {
        CostIndex::from_idx(CHANX_COST_INDEX_START + 2 * self.segments.len())
    }

    pub fn cost_table_len(&self) -> usize {
        CHANX_COST_INDEX_START + 2 * self.segments.len() + 1
    }
}
