use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::domain::types::{Carton, Pallet, PalletSpec};
use crate::palletize::builder::LooseCarton;

/// A uniform handle over everything the truck loader places: a built pallet
/// or a single loose carton travelling as its own footprint.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitLoadKind {
    Real(Pallet),
    Virtual(Carton),
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitLoad {
    /// Run-local identifier, stable for the duration of one planning run.
    pub id: usize,
    pub kind: UnitLoadKind,
    pub width: u32,
    pub depth: u32,
    pub height: u32,
    pub mass: f64,
    pub volume: u64,
    /// Shipping orders contributing cartons to this unit load. Per-order
    /// isolation in the builder keeps this a singleton in practice.
    pub order_ids: BTreeSet<i64>,
}

impl UnitLoad {
    pub fn footprint_area(&self) -> u64 {
        (self.width as u64) * (self.depth as u64)
    }

    pub fn kind_label(&self) -> &'static str {
        match self.kind {
            UnitLoadKind::Real(_) => "REAL",
            UnitLoadKind::Virtual(_) => "VIRTUAL",
        }
    }
}

/// Lift builder output into the uniform unit-load view: a real pallet keeps
/// the configured pallet footprint and its stacked height, a loose carton
/// becomes a virtual pallet with its own footprint.
pub fn build_unit_loads(
    pallets: Vec<Pallet>,
    loose: Vec<LooseCarton>,
    spec: &PalletSpec,
) -> Vec<UnitLoad> {
    let mut unit_loads = Vec::with_capacity(pallets.len() + loose.len());

    for pallet in pallets {
        // A carton standing alone on its pallet travels as the carton
        // itself: its own footprint frees floor space on the vehicle.
        if pallet.cartons.len() == 1 {
            let carton = pallet.cartons.into_iter().next().expect("single carton");
            debug!(
                "single-carton pallet demoted to a virtual pallet ({})",
                carton.item_code
            );
            unit_loads.push(UnitLoad {
                id: unit_loads.len() + 1,
                width: carton.width,
                depth: carton.depth,
                height: carton.height,
                mass: carton.mass,
                volume: carton.volume(),
                order_ids: BTreeSet::from([carton.order_id]),
                kind: UnitLoadKind::Virtual(carton),
            });
            continue;
        }

        let order_ids: BTreeSet<i64> = pallet.cartons.iter().map(|c| c.order_id).collect();
        unit_loads.push(UnitLoad {
            id: unit_loads.len() + 1,
            width: spec.width,
            depth: spec.depth,
            height: pallet.current_height,
            mass: pallet.total_mass(),
            volume: pallet.used_volume(),
            order_ids,
            kind: UnitLoadKind::Real(pallet),
        });
    }

    for entry in loose {
        let carton = entry.carton;
        debug!(
            "loose carton {} ({}) becomes a virtual pallet",
            carton.item_code,
            entry.reason.code()
        );
        unit_loads.push(UnitLoad {
            id: unit_loads.len() + 1,
            width: carton.width,
            depth: carton.depth,
            height: carton.height,
            mass: carton.mass,
            volume: carton.volume(),
            order_ids: BTreeSet::from([carton.order_id]),
            kind: UnitLoadKind::Virtual(carton),
        });
    }

    info!("registered {} unit load(s)", unit_loads.len());
    unit_loads
}
