use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::constant::{PALLET_GRID_STEP, SUPPORT_RATIO};
use crate::domain::geometry::{boxes_overlap_3d, overlap_area};
use crate::domain::types::{Carton, Pallet, PalletSpec};

/// Output of one palletize pass: the built pallets plus the cartons the
/// builder refused, each tagged with the reason.
#[derive(Debug, Clone)]
pub struct PalletizeResult {
    pub pallets: Vec<Pallet>,
    pub loose: Vec<LooseCarton>,
}

#[derive(Debug, Clone)]
pub struct LooseCarton {
    pub carton: Carton,
    pub reason: LooseReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LooseReason {
    /// Exceeds the pallet footprint in both orientations or the height limit.
    Oversize,
    /// Heavier on its own than the pallet mass limit.
    Overmass,
    /// Admitted by the pre-filter but no feasible position exists even on an
    /// empty pallet (a footprint that only fits rotated; placement does not
    /// rotate).
    NoFit,
}

impl LooseReason {
    pub fn code(&self) -> &'static str {
        match self {
            LooseReason::Oversize => "oversize",
            LooseReason::Overmass => "overmass",
            LooseReason::NoFit => "no_fit",
        }
    }
}

/// Greedy 3D pallet packer: First Fit Decreasing by volume, one shipping
/// order per pallet, positions chosen lowest-first under the non-overlap
/// and bottom-support rules.
pub struct PalletBuilder {
    spec: PalletSpec,
}

impl PalletBuilder {
    pub fn new(spec: PalletSpec) -> Self {
        PalletBuilder { spec }
    }

    /// A carton is admissible when its height fits under the stacking limit
    /// and its footprint fits the pallet in at least one orientation.
    pub fn can_palletize(&self, carton: &Carton) -> bool {
        let fits_normal = carton.width <= self.spec.width && carton.depth <= self.spec.depth;
        let fits_rotated = carton.depth <= self.spec.width && carton.width <= self.spec.depth;
        (fits_normal || fits_rotated) && carton.height <= self.spec.max_height
    }

    /// Pack cartons into pallets, never mixing shipping orders on one pallet.
    pub fn pack(&self, cartons: Vec<Carton>) -> PalletizeResult {
        let mut groups: BTreeMap<i64, Vec<Carton>> = BTreeMap::new();
        for carton in cartons {
            groups.entry(carton.order_id).or_default().push(carton);
        }
        info!("palletizing {} order group(s)", groups.len());

        let mut pallets: Vec<Pallet> = Vec::new();
        let mut loose: Vec<LooseCarton> = Vec::new();

        for (order_id, mut group) in groups {
            // Largest volume first; the sort is stable so equal cartons keep
            // their input order.
            group.sort_by(|a, b| b.volume().cmp(&a.volume()));
            debug!("order {}: {} carton(s)", order_id, group.len());

            for mut carton in group {
                if !self.can_palletize(&carton) {
                    debug!(
                        "order {}: {} {}x{}x{} refused as oversize",
                        order_id, carton.item_code, carton.width, carton.depth, carton.height
                    );
                    loose.push(LooseCarton {
                        carton,
                        reason: LooseReason::Oversize,
                    });
                    continue;
                }
                if carton.mass > self.spec.max_mass {
                    debug!(
                        "order {}: {} at {} kg refused as overmass",
                        order_id, carton.item_code, carton.mass
                    );
                    loose.push(LooseCarton {
                        carton,
                        reason: LooseReason::Overmass,
                    });
                    continue;
                }

                let mut placed = false;
                for pallet in pallets
                    .iter_mut()
                    .filter(|p| p.order_id() == Some(order_id))
                {
                    if let Some((x, y, z)) = self.find_position(pallet, &carton) {
                        carton.x = x;
                        carton.y = y;
                        carton.z = z;
                        pallet.current_height = pallet.current_height.max(z + carton.height);
                        pallet.cartons.push(carton.clone());
                        placed = true;
                        break;
                    }
                }

                if !placed {
                    let mut pallet = Pallet::from_spec(&self.spec);
                    match self.find_position(&pallet, &carton) {
                        Some((x, y, z)) => {
                            carton.x = x;
                            carton.y = y;
                            carton.z = z;
                            pallet.current_height = z + carton.height;
                            pallet.cartons.push(carton);
                            debug!("order {}: opened pallet #{}", order_id, pallets.len() + 1);
                            pallets.push(pallet);
                        }
                        None => {
                            loose.push(LooseCarton {
                                carton,
                                reason: LooseReason::NoFit,
                            });
                        }
                    }
                }
            }
        }

        info!(
            "palletize done: {} pallet(s), {} loose carton(s)",
            pallets.len(),
            loose.len()
        );
        PalletizeResult { pallets, loose }
    }

    /// Lowest feasible position for `carton` on `pallet`, or `None`.
    ///
    /// Floor cells are scanned on the coarse grid; above the floor, every top
    /// plane of an already placed carton is sampled over that carton's extent.
    /// The floor is the global minimum, so the first feasible floor cell wins
    /// outright; shelf candidates only matter when the floor is full.
    fn find_position(&self, pallet: &Pallet, carton: &Carton) -> Option<(u32, u32, u32)> {
        if pallet.total_mass() + carton.mass > self.spec.max_mass {
            return None;
        }
        // Placement keeps the input orientation, so a rotated-only footprint
        // has no candidates at all.
        if carton.width > self.spec.width || carton.depth > self.spec.depth {
            return None;
        }

        let step = PALLET_GRID_STEP as usize;
        for y in (0..=self.spec.depth - carton.depth).step_by(step) {
            for x in (0..=self.spec.width - carton.width).step_by(step) {
                if self.admissible(pallet, x, y, 0, carton) {
                    return Some((x, y, 0));
                }
            }
        }

        let mut best: Option<(u32, u32, u32)> = None;
        for placed in &pallet.cartons {
            let top = placed.z + placed.height;
            if top + carton.height > self.spec.max_height {
                continue;
            }
            if let Some((_, _, z)) = best {
                if top >= z {
                    continue;
                }
            }
            let x_end = (placed.x + placed.width - 1).min(self.spec.width - carton.width);
            let y_end = (placed.y + placed.depth - 1).min(self.spec.depth - carton.depth);
            'plane: for y in placed.y..=y_end {
                for x in placed.x..=x_end {
                    if self.admissible(pallet, x, y, top, carton) {
                        best = Some((x, y, top));
                        break 'plane;
                    }
                }
            }
        }
        best
    }

    /// Bounds, height, collision and bottom-support check for one candidate.
    fn admissible(&self, pallet: &Pallet, x: u32, y: u32, z: u32, carton: &Carton) -> bool {
        if x + carton.width > self.spec.width || y + carton.depth > self.spec.depth {
            return false;
        }
        if z + carton.height > self.spec.max_height {
            return false;
        }

        for placed in &pallet.cartons {
            if boxes_overlap_3d(
                x,
                y,
                z,
                x + carton.width,
                y + carton.depth,
                z + carton.height,
                placed.x,
                placed.y,
                placed.z,
                placed.x + placed.width,
                placed.y + placed.depth,
                placed.z + placed.height,
            ) {
                return false;
            }
        }

        if z > 0 {
            let mut support: u64 = 0;
            for placed in &pallet.cartons {
                if placed.z + placed.height == z {
                    support += overlap_area(
                        x,
                        y,
                        x + carton.width,
                        y + carton.depth,
                        placed.x,
                        placed.y,
                        placed.x + placed.width,
                        placed.y + placed.depth,
                    );
                }
            }
            if (support as f64) < (carton.footprint_area() as f64) * SUPPORT_RATIO {
                return false;
            }
        }

        true
    }
}

/// Dump one pallet's layout at debug level.
pub fn log_pallet_layout(index: usize, pallet: &Pallet) {
    debug!(
        "pallet #{}: {} carton(s), height {} cm, {:.1} kg",
        index,
        pallet.cartons.len(),
        pallet.current_height,
        pallet.total_mass()
    );
    for carton in &pallet.cartons {
        debug!(
            "  {} {}x{}x{} at ({}, {}, {})",
            carton.item_code, carton.width, carton.depth, carton.height, carton.x, carton.y,
            carton.z
        );
    }
}
