use unnamed_entity::EntityId;

use crate::db::{Arch, SegmentId};
use crate::error::{ArchError, Result};
use crate::grid::DeviceGrid;

/// Channel widths: CHANX channel `y` has `x_list[y]` tracks, CHANY channel `x` has `y_list[x]`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChannelWidth {
    pub max: usize,
    pub x_list: Vec<usize>,
    pub y_list: Vec<usize>,
}

impl ChannelWidth {
    pub fn uniform(width: usize, grid: &DeviceGrid) -> Self {
        ChannelWidth {
            max: width,
            x_list: vec![width; grid.height()],
            y_list: vec![width; grid.width()],
        }
    }

    pub fn validate(&self, grid: &DeviceGrid) -> Result<()> {
        for (axis, list, expected) in [
            ('x', &self.x_list, grid.height()),
            ('y', &self.y_list, grid.width()),
        ] {
            if list.len() != expected {
                return Err(ArchError::ChannelListSize {
                    axis,
                    expected,
                    actual: list.len(),
                });
            }
            for (index, &width) in list.iter().enumerate() {
                if width > self.max {
                    return Err(ArchError::ChannelAboveMax {
                        axis,
                        index,
                        width,
                        max: self.max,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Segment assignment of one track index, shared by every channel of the device.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TrackDetails {
    pub segment: SegmentId,
    pub length: i32,
    /// Phase of the first wire start, in `1..=length`.
    pub start: i32,
    pub longline: bool,
}

impl TrackDetails {
    /// Returns the coordinate at which the wire covering `seg` in channel `chan` starts.
    pub fn seg_start(&self, chan: usize, seg: usize) -> usize {
        if self.longline || self.length <= 0 {
            return 1;
        }
        let length = self.length as i64;
        let seg = seg as i64;
        let start = seg - (seg + length + chan as i64 - self.start as i64).rem_euclid(length);
        start.max(1) as usize
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TrackPlan {
    pub tracks: Vec<TrackDetails>,
}

impl TrackPlan {
    /// Splits `width` tracks among the segment types in proportion to their frequency.
    pub fn distribute(arch: &Arch, width: usize) -> Result<Self> {
        let total: u64 = arch.segments.values().map(|s| s.frequency as u64).sum();
        if total == 0 {
            return Err(ArchError::NoSegments);
        }
        let mut counts: Vec<(SegmentId, usize, u64)> = arch
            .segments
            .iter()
            .map(|(id, seg)| {
                let share = width as u64 * seg.frequency as u64;
                (id, (share / total) as usize, share % total)
            })
            .collect();
        let assigned: usize = counts.iter().map(|c| c.1).sum();
        let mut order: Vec<usize> = (0..counts.len()).collect();
        order.sort_by(|&a, &b| counts[b].2.cmp(&counts[a].2).then(a.cmp(&b)));
        for &idx in order.iter().take(width - assigned) {
            counts[idx].1 += 1;
        }
        let mut tracks = vec![];
        for (segment, count, _) in counts {
            let seg = &arch.segments[segment];
            for j in 0..count {
                let start = if seg.length > 0 {
                    (j % seg.length as usize) as i32 + 1
                } else {
                    1
                };
                tracks.push(TrackDetails {
                    segment,
                    length: seg.length,
                    start,
                    longline: seg.longline,
                });
            }
        }
        Ok(TrackPlan { tracks })
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn validate(&self, arch: &Arch, chan_width: &ChannelWidth) -> Result<()> {
        if self.tracks.len() < chan_width.max {
            return Err(ArchError::TrackPlanTooShort {
                tracks: self.tracks.len(),
                needed: chan_width.max,
            });
        }
        for (track, details) in self.tracks.iter().enumerate() {
            if details.segment.to_idx() >= arch.segments.len() {
                return Err(ArchError::TrackBadSegment {
                    track,
                    segment: details.segment.to_idx(),
                });
            }
        }
        Ok(())
    }
}

impl std::ops::Index<usize> for TrackPlan {
    type Output = TrackDetails;
    fn index(&self, track: usize) -> &TrackDetails {
        &self.tracks[track]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{SegmentInfo, TileType};
    use assert_matches::assert_matches;

    fn segment(name: &str, length: i32, frequency: u32) -> SegmentInfo {
        SegmentInfo {
            name: name.to_string(),
            length,
            longline: false,
            r_per_tile: 1.0,
            c_per_tile: 1.0,
            frequency,
        }
    }

    #[test]
    fn staggered_start() {
        let details = TrackDetails {
            segment: SegmentId::from_idx(0),
            length: 4,
            start: 1,
            longline: false,
        };
        let starts: Vec<_> = (1..10).map(|seg| details.seg_start(0, seg)).collect();
        assert_eq!(starts, [1, 1, 1, 1, 5, 5, 5, 5, 9]);
        // the start point staggers backwards as the channel number grows
        let starts: Vec<_> = (1..6).map(|seg| details.seg_start(1, seg)).collect();
        assert_eq!(starts, [1, 1, 1, 4, 4]);
        let unit = TrackDetails { length: 1, ..details };
        assert!((1..8).all(|seg| unit.seg_start(3, seg) == seg));
        let long = TrackDetails {
            longline: true,
            ..details
        };
        assert_eq!(long.seg_start(0, 17), 1);
    }

    #[test]
    fn distribute_by_frequency() {
        let mut arch = Arch::default();
        arch.segments.push(segment("L1", 1, 1));
        arch.segments.push(segment("L4", 4, 3));
        let plan = TrackPlan::distribute(&arch, 10).unwrap();
        assert_eq!(plan.len(), 10);
        let l1 = plan.tracks.iter().filter(|t| t.length == 1).count();
        assert_eq!(l1, 3);
        let phases: Vec<_> = plan.tracks[3..].iter().map(|t| t.start).collect();
        assert_eq!(phases, [1, 2, 3, 4, 1, 2, 3]);
    }

    #[test]
    fn width_lists_checked() {
        let mut arch = Arch::default();
        let fill = arch.tile_types.push(TileType::empty("EMPTY"));
        let grid = DeviceGrid::new(&arch, 1, 4, 3, fill).unwrap();
        let mut cw = ChannelWidth::uniform(2, &grid);
        assert_eq!(cw.validate(&grid), Ok(()));
        cw.x_list.pop();
        assert_matches!(
            cw.validate(&grid),
            Err(ArchError::ChannelListSize {
                axis: 'x',
                expected: 3,
                actual: 2
            })
        );
        let mut cw = ChannelWidth::uniform(2, &grid);
        cw.y_list[1] = 3;
        assert_matches!(
            cw.validate(&grid),
            Err(ArchError::ChannelAboveMax { index: 1, .. })
        );
        assert_matches!(
            TrackPlan::default().validate(&arch, &ChannelWidth::uniform(2, &grid)),
            Err(ArchError::TrackPlanTooShort { .. })
        );
    }
}
