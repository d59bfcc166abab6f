//! A parameterized island-style fabric: one logic tile type repeated over the grid,
//! optionally with empty corners, a single wire segment type and uniform channels.

use crate::chan::{ChannelWidth, TrackPlan};
use crate::db::{
    Arch, ClassKind, InterLayer, PinLoc, SegmentInfo, Side, SwitchId, SwitchInfo, SwitchKind,
    TileType, TileTypeBuilder, TileTypeId,
};
use crate::error::Result;
use crate::grid::{CellCoord, DeviceGrid};

#[derive(Clone, Debug)]
pub struct UniformFabric {
    pub layers: usize,
    pub width: usize,
    pub height: usize,
    pub chan_width: usize,
    pub seg_length: i32,
    pub inputs: usize,
    pub outputs: usize,
    pub empty_corners: bool,
    pub inter_layer_tracks: usize,
}

impl Default for UniformFabric {
    fn default() -> Self {
        UniformFabric {
            layers: 1,
            width: 6,
            height: 6,
            chan_width: 4,
            seg_length: 1,
            inputs: 2,
            outputs: 1,
            empty_corners: true,
            inter_layer_tracks: 0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FabricSwitches {
    pub delayless: SwitchId,
    pub wire: SwitchId,
    pub ipin: SwitchId,
    pub opin: SwitchId,
    pub buffer: SwitchId,
}

#[derive(Clone, Debug)]
pub struct Fabric {
    pub arch: Arch,
    pub grid: DeviceGrid,
    pub chan_width: ChannelWidth,
    pub tracks: TrackPlan,
    pub logic: TileTypeId,
    pub empty: TileTypeId,
    pub switches: FabricSwitches,
}

impl UniformFabric {
    pub fn logic_tile(&self) -> Result<TileType> {
        let locs: Vec<_> = Side::SIDES
            .into_iter()
            .map(|side| PinLoc { dx: 0, dy: 0, side })
            .collect();
        let mut builder = TileTypeBuilder::new("LOGIC", 1, 1);
        let class_in = builder.add_class(ClassKind::Receiver);
        let class_out = builder.add_class(ClassKind::Driver);
        for i in 0..self.inputs {
            builder.add_pin(&format!("I{i}"), class_in, &locs);
        }
        for i in 0..self.outputs {
            builder.add_pin(&format!("O{i}"), class_out, &locs);
        }
        builder.finish()
    }

    pub fn build(&self) -> Result<Fabric> {
        let mut arch = Arch::default();
        let empty = arch.tile_types.push(TileType::empty("EMPTY"));
        let logic = arch.tile_types.push(self.logic_tile()?);
        arch.segments.push(SegmentInfo {
            name: format!("L{}", self.seg_length),
            length: self.seg_length,
            longline: false,
            r_per_tile: 100.0,
            c_per_tile: 1e-14,
            frequency: 1,
        });
        let switches = FabricSwitches {
            delayless: arch
                .switches
                .push(SwitchInfo::new("__delayless__", SwitchKind::Mux)),
            wire: arch.switches.push(SwitchInfo::new("wire_mux", SwitchKind::Mux)),
            ipin: arch.switches.push(SwitchInfo::new("ipin_mux", SwitchKind::Mux)),
            opin: arch
                .switches
                .push(SwitchInfo::new("opin_pass", SwitchKind::PassGate)),
            buffer: arch
                .switches
                .push(SwitchInfo::new("buffer", SwitchKind::Buffer)),
        };
        arch.inter_layer = InterLayer {
            tracks: self.inter_layer_tracks,
            r: 50.0,
            c: 5e-15,
        };
        let mut grid = DeviceGrid::new(&arch, self.layers, self.width, self.height, logic)?;
        if self.empty_corners {
            for layer in 0..self.layers {
                for (x, y) in [
                    (0, 0),
                    (self.width - 1, 0),
                    (0, self.height - 1),
                    (self.width - 1, self.height - 1),
                ] {
                    let cell = CellCoord::new(layer, x, y);
                    if grid.tile(cell).kind != empty {
                        grid.place(&arch, cell, empty)?;
                    }
                }
            }
        }
        let chan_width = ChannelWidth::uniform(self.chan_width, &grid);
        let tracks = TrackPlan::distribute(&arch, self.chan_width)?;
        Ok(Fabric {
            arch,
            grid,
            chan_width,
            tracks,
            logic,
            empty,
            switches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_empty() {
        let fabric = UniformFabric::default().build().unwrap();
        let corner = fabric.grid.tile(CellCoord::new(0, 5, 5));
        assert_eq!(corner.kind, fabric.empty);
        assert_eq!(fabric.grid.tile(CellCoord::new(0, 1, 0)).kind, fabric.logic);
        let logic = &fabric.arch.tile_types[fabric.logic];
        assert_eq!(logic.pins.len(), 3);
        assert_eq!(logic.classes.len(), 2);
        assert_eq!(fabric.tracks.len(), 4);
        assert_eq!(fabric.arch.cost_table_len(), 7);
    }

    #[test]
    fn tiny_grid_without_corners() {
        let fabric = UniformFabric {
            width: 1,
            height: 1,
            empty_corners: false,
            ..Default::default()
        }
        .build()
        .unwrap();
        assert_eq!(fabric.grid.tile(CellCoord::new(0, 0, 0)).kind, fabric.logic);
    }
}
