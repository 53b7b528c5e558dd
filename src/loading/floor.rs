use std::cmp::Reverse;

use crate::config::constant::FLOOR_GRID_STEP;
use crate::domain::geometry::rects_overlap;
use crate::domain::types::Position;

/// Bottom-Left-Fill packer for one vehicle floor. No stacking: every
/// footprint sits directly on the bed, pallet heights are bounded elsewhere.
pub struct FloorPacker {
    width: u32,
    depth: u32,
    committed: Vec<Position>,
}

impl FloorPacker {
    pub fn new(width: u32, depth: u32) -> Self {
        FloorPacker {
            width,
            depth,
            committed: Vec::new(),
        }
    }

    /// Place each (width, depth) footprint, trying both orientations.
    ///
    /// Footprints are considered largest-area first (stable, so equal areas
    /// keep their input order) but the result is aligned with the input:
    /// slot `i` holds the position of footprint `i`, or `None` when no
    /// feasible cell exists in either orientation.
    pub fn pack(&mut self, footprints: &[(u32, u32)]) -> Vec<Option<Position>> {
        let mut by_area: Vec<usize> = (0..footprints.len()).collect();
        by_area.sort_by_key(|&i| Reverse((footprints[i].0 as u64) * (footprints[i].1 as u64)));

        let mut positions: Vec<Option<Position>> = vec![None; footprints.len()];
        for i in by_area {
            let (w, d) = footprints[i];
            if let Some(position) = self.find_position(w, d) {
                self.committed.push(position.clone());
                positions[i] = Some(position);
            }
        }
        positions
    }

    /// First feasible cell scanning y then x on the floor grid, unrotated
    /// orientation first.
    fn find_position(&self, width: u32, depth: u32) -> Option<Position> {
        let step = FLOOR_GRID_STEP;
        for (w, d, rotation) in [(width, depth, 0u16), (depth, width, 90u16)] {
            if w > self.width || d > self.depth {
                continue;
            }
            let mut y = 0;
            while y + d <= self.depth {
                let mut x = 0;
                while x + w <= self.width {
                    if self.fits_at(x, y, w, d) {
                        return Some(Position {
                            x,
                            y,
                            width: w,
                            depth: d,
                            rotation,
                        });
                    }
                    x += step;
                }
                y += step;
            }
        }
        None
    }

    fn fits_at(&self, x: u32, y: u32, w: u32, d: u32) -> bool {
        !self.committed.iter().any(|p| {
            rects_overlap(
                x,
                y,
                x + w,
                y + d,
                p.x,
                p.y,
                p.x + p.width,
                p.y + p.depth,
            )
        })
    }

    /// Share of the floor area covered by committed footprints, in percent.
    pub fn utilization(&self) -> f64 {
        let used: u64 = self
            .committed
            .iter()
            .map(|p| (p.width as u64) * (p.depth as u64))
            .sum();
        let total = (self.width as u64) * (self.depth as u64);
        if total == 0 {
            return 0.0;
        }
        (used as f64) / (total as f64) * 100.0
    }
}
