//! Axis-aligned overlap predicates shared by the pallet builder and the
//! vehicle floor packer. All coordinates are integer centimetres.

/// Strict 3D overlap test between two axis-aligned boxes given as
/// (min, max) corner pairs. Touching faces do not overlap.
#[allow(clippy::too_many_arguments)]
pub fn boxes_overlap_3d(
    ax1: u32,
    ay1: u32,
    az1: u32,
    ax2: u32,
    ay2: u32,
    az2: u32,
    bx1: u32,
    by1: u32,
    bz1: u32,
    bx2: u32,
    by2: u32,
    bz2: u32,
) -> bool {
    !(ax2 <= bx1 || bx2 <= ax1 || ay2 <= by1 || by2 <= ay1 || az2 <= bz1 || bz2 <= az1)
}

/// Strict 2D overlap test between two rectangles given as (min, max) corners.
#[allow(clippy::too_many_arguments)]
pub fn rects_overlap(
    ax1: u32,
    ay1: u32,
    ax2: u32,
    ay2: u32,
    bx1: u32,
    by1: u32,
    bx2: u32,
    by2: u32,
) -> bool {
    !(ax2 <= bx1 || bx2 <= ax1 || ay2 <= by1 || by2 <= ay1)
}

/// Area of the intersection of two rectangles, zero when they are disjoint.
#[allow(clippy::too_many_arguments)]
pub fn overlap_area(
    ax1: u32,
    ay1: u32,
    ax2: u32,
    ay2: u32,
    bx1: u32,
    by1: u32,
    bx2: u32,
    by2: u32,
) -> u64 {
    let w = ax2.min(bx2).saturating_sub(ax1.max(bx1));
    let d = ay2.min(by2).saturating_sub(ay1.max(by1));
    (w as u64) * (d as u64)
}
