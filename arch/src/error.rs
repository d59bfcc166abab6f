use thiserror::Error;

/// Inconsistent architecture or device inputs.
///
/// These are reported as soon as they are detected and are never corrected
/// automatically.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ArchError {
    #[error("tile type {tile}: footprint {width}x{height} is empty")]
    EmptyFootprint {
        tile: String,
        width: usize,
        height: usize,
    },
    #[error("tile type {tile}: pin {pin} is located at offset ({dx}, {dy}) outside the footprint")]
    PinOutsideFootprint {
        tile: String,
        pin: String,
        dx: usize,
        dy: usize,
    },
    #[error("tile type {tile}: pin {pin} is located at more than one footprint offset")]
    PinMultipleOffsets { tile: String, pin: String },
    #[error("tile type {tile}: pin {pin} refers to nonexistent class {class}")]
    PinBadClass {
        tile: String,
        pin: String,
        class: usize,
    },
    #[error("tile type {tile}: Fc specification refers to nonexistent pin {pin}")]
    FcBadPin { tile: String, pin: usize },
    #[error("grid dimensions {layers}x{width}x{height} are empty")]
    EmptyGrid {
        layers: usize,
        width: usize,
        height: usize,
    },
    #[error("grid fill tile type {0} is not 1x1")]
    FillNotUnit(String),
    #[error("tile {tile} at layer {layer} ({x}, {y}) does not fit in the {width}x{height} grid")]
    PlacementOutOfBounds {
        tile: String,
        layer: usize,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
    #[error("tile {tile} at layer {layer} ({x}, {y}) overlaps a previously placed tile")]
    PlacementOverlap {
        tile: String,
        layer: usize,
        x: usize,
        y: usize,
    },
    #[error("channel width list {axis} has {actual} entries, the grid needs {expected}")]
    ChannelListSize {
        axis: char,
        expected: usize,
        actual: usize,
    },
    #[error("channel width {width} at {axis} list entry {index} exceeds the maximum {max}")]
    ChannelAboveMax {
        axis: char,
        index: usize,
        width: usize,
        max: usize,
    },
    #[error("track plan describes {tracks} tracks, channels need {needed}")]
    TrackPlanTooShort { tracks: usize, needed: usize },
    #[error("track {track} refers to nonexistent segment {segment}")]
    TrackBadSegment { track: usize, segment: usize },
    #[error("no segment type has a nonzero frequency")]
    NoSegments,
}

pub type Result<T> = std::result::Result<T, ArchError>;
