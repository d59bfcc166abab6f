use ndarray::Array3;
use unnamed_entity::{EntityId, entity_id};

use crate::db::{Arch, TileType, TileTypeId};
use crate::error::{ArchError, Result};

entity_id! {
    pub id LayerId u8;
    pub id ColId u16;
    pub id RowId u16;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CellCoord {
    pub layer: LayerId,
    pub col: ColId,
    pub row: RowId,
}

impl CellCoord {
    pub fn new(layer: usize, col: usize, row: usize) -> Self {
        CellCoord {
            layer: LayerId::from_idx(layer),
            col: ColId::from_idx(col),
            row: RowId::from_idx(row),
        }
    }

    pub fn with_col(self, col: ColId) -> Self {
        CellCoord { col, ..self }
    }

    pub fn with_row(self, row: RowId) -> Self {
        CellCoord { row, ..self }
    }

    pub fn with_layer(self, layer: LayerId) -> Self {
        CellCoord { layer, ..self }
    }

    pub fn delta(self, dx: usize, dy: usize) -> Self {
        CellCoord {
            layer: self.layer,
            col: ColId::from_idx(self.col.to_idx() + dx),
            row: RowId::from_idx(self.row.to_idx() + dy),
        }
    }

    fn index(self) -> (usize, usize, usize) {
        (self.layer.to_idx(), self.col.to_idx(), self.row.to_idx())
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "L{}X{}Y{}", self.layer, self.col, self.row)
    }
}

/// One cell of the grid: the tile type covering it and the offset from that tile's root cell.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct GridTile {
    pub kind: TileTypeId,
    pub dx: usize,
    pub dy: usize,
    placed: bool,
}

impl GridTile {
    pub fn is_root(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

#[derive(Clone, Debug)]
pub struct DeviceGrid {
    tiles: Array3<GridTile>,
}

impl DeviceGrid {
    pub fn new(
        arch: &Arch,
        layers: usize,
        width: usize,
        height: usize,
        fill: TileTypeId,
    ) -> Result<Self> {
        if layers == 0 || width == 0 || height == 0 {
            return Err(ArchError::EmptyGrid {
                layers,
                width,
                height,
            });
        }
        let tt = &arch.tile_types[fill];
        if tt.width != 1 || tt.height != 1 {
            return Err(ArchError::FillNotUnit(tt.name.clone()));
        }
        Ok(DeviceGrid {
            tiles: Array3::from_elem(
                (layers, width, height),
                GridTile {
                    kind: fill,
                    dx: 0,
                    dy: 0,
                    placed: false,
                },
            ),
        })
    }

    pub fn layers(&self) -> usize {
        self.tiles.dim().0
    }

    pub fn width(&self) -> usize {
        self.tiles.dim().1
    }

    pub fn height(&self) -> usize {
        self.tiles.dim().2
    }

    pub fn contains(&self, cell: CellCoord) -> bool {
        let (l, x, y) = cell.index();
        l < self.layers() && x < self.width() && y < self.height()
    }

    /// Places a tile with its root at `root`, overwriting the fill tiles under its footprint.
    pub fn place(&mut self, arch: &Arch, root: CellCoord, kind: TileTypeId) -> Result<()> {
        let tt = &arch.tile_types[kind];
        let (l, x, y) = root.index();
        if l >= self.layers() || x + tt.width > self.width() || y + tt.height > self.height() {
            return Err(ArchError::PlacementOutOfBounds {
                tile: tt.name.clone(),
                layer: l,
                x,
                y,
                width: self.width(),
                height: self.height(),
            });
        }
        for dx in 0..tt.width {
            for dy in 0..tt.height {
                if self.tiles[(l, x + dx, y + dy)].placed {
                    return Err(ArchError::PlacementOverlap {
                        tile: tt.name.clone(),
                        layer: l,
                        x,
                        y,
                    });
                }
            }
        }
        for dx in 0..tt.width {
            for dy in 0..tt.height {
                self.tiles[(l, x + dx, y + dy)] = GridTile {
                    kind,
                    dx,
                    dy,
                    placed: true,
                };
            }
        }
        Ok(())
    }

    #[track_caller]
    pub fn tile(&self, cell: CellCoord) -> &GridTile {
        &self.tiles[cell.index()]
    }

    pub fn tile_type<'a>(&self, arch: &'a Arch, cell: CellCoord) -> &'a TileType {
        &arch.tile_types[self.tile(cell).kind]
    }

    #[track_caller]
    pub fn root(&self, cell: CellCoord) -> CellCoord {
        let tile = self.tile(cell);
        CellCoord {
            layer: cell.layer,
            col: ColId::from_idx(cell.col.to_idx() - tile.dx),
            row: RowId::from_idx(cell.row.to_idx() - tile.dy),
        }
    }

    /// Cells in raster order: layer, then row, then column.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + use<> {
        let (layers, width, height) = self.tiles.dim();
        (0..layers).flat_map(move |l| {
            (0..height).flat_map(move |y| (0..width).map(move |x| CellCoord::new(l, x, y)))
        })
    }

    pub fn roots(&self) -> impl Iterator<Item = CellCoord> + '_ {
        self.cells().filter(|&cell| self.tile(cell).is_root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TileTypeBuilder;
    use assert_matches::assert_matches;

    fn arch() -> Arch {
        let mut arch = Arch::default();
        arch.tile_types.push(TileType::empty("EMPTY"));
        arch.tile_types
            .push(TileTypeBuilder::new("BIG", 2, 3).finish().unwrap());
        arch
    }

    #[test]
    fn place_multi_cell() {
        let arch = arch();
        let empty = arch.get_tile_type("EMPTY");
        let big = arch.get_tile_type("BIG");
        let mut grid = DeviceGrid::new(&arch, 1, 5, 5, empty).unwrap();
        grid.place(&arch, CellCoord::new(0, 1, 1), big).unwrap();
        let cell = CellCoord::new(0, 2, 3);
        assert_eq!(grid.tile(cell).kind, big);
        assert_eq!((grid.tile(cell).dx, grid.tile(cell).dy), (1, 2));
        assert_eq!(grid.root(cell), CellCoord::new(0, 1, 1));
        assert_eq!(grid.roots().count(), 25 - 5);
        assert_matches!(
            grid.place(&arch, CellCoord::new(0, 2, 2), big),
            Err(ArchError::PlacementOverlap { x: 2, y: 2, .. })
        );
        assert_matches!(
            grid.place(&arch, CellCoord::new(0, 4, 0), big),
            Err(ArchError::PlacementOutOfBounds { .. })
        );
    }

    #[test]
    fn raster_order() {
        let arch = arch();
        let grid = DeviceGrid::new(&arch, 2, 2, 2, arch.get_tile_type("EMPTY")).unwrap();
        let cells: Vec<_> = grid.cells().collect();
        assert_eq!(cells[0], CellCoord::new(0, 0, 0));
        assert_eq!(cells[1], CellCoord::new(0, 1, 0));
        assert_eq!(cells[2], CellCoord::new(0, 0, 1));
        assert_eq!(cells[4], CellCoord::new(1, 0, 0));
        assert!(!grid.contains(CellCoord::new(2, 0, 0)));
    }
}
