use std::collections::{BTreeMap, BTreeSet};

use itertools::Itertools;
use tracing::{debug, info, warn};

use crate::config::constant::PAYLOAD_FILL_GUIDELINE;
use crate::domain::types::{Position, Vehicle};
use crate::loading::floor::FloorPacker;
use crate::planning::registry::UnitLoad;

/// One unit load committed to a vehicle floor.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedUnit {
    pub unit: UnitLoad,
    pub position: Position,
    pub load_sequence: u32,
}

/// A vehicle with its committed placements for one plan.
#[derive(Debug, Clone)]
pub struct VehicleLoad {
    pub vehicle: Vehicle,
    pub placements: Vec<PlacedUnit>,
    pub order_ids: BTreeSet<i64>,
    pub total_mass: f64,
    pub utilization: f64,
}

/// An order-group no vehicle can carry, surfaced to the caller instead of
/// failing the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnplaceableOrder {
    pub order_id: i64,
    pub reason: UnplaceableReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnplaceableReason {
    ExceedsPayload,
    ExceedsFloor,
}

impl std::fmt::Display for UnplaceableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnplaceableReason::ExceedsPayload => {
                write!(f, "order-group mass exceeds the largest vehicle payload")
            }
            UnplaceableReason::ExceedsFloor => {
                write!(f, "order-group footprints do not fit the largest vehicle floor")
            }
        }
    }
}

/// Assign a region's unit loads to vehicles.
///
/// An order's unit loads travel together or not at all. Each sweep walks the
/// fleet largest-payload first, stages order-groups (ascending order id) onto
/// the current vehicle by repacking the accumulated footprint set from
/// scratch, flushes the first vehicle that accepted anything, and starts
/// over. A sweep that stages nothing forces the lowest-id remaining group
/// onto the largest vehicle alone; if even that violates a hard payload or
/// floor constraint the order is reported unplaceable.
pub fn assign_vehicles(
    unit_loads: Vec<UnitLoad>,
    fleet: &[Vehicle],
) -> (Vec<VehicleLoad>, Vec<UnplaceableOrder>) {
    if fleet.is_empty() {
        warn!("no vehicles supplied to the loader");
        return (Vec::new(), Vec::new());
    }

    // Largest payload first; ids break ties so the sweep order is total.
    let fleet: Vec<Vehicle> = fleet
        .iter()
        .cloned()
        .sorted_by(|a, b| {
            b.payload
                .total_cmp(&a.payload)
                .then_with(|| a.id.cmp(&b.id))
        })
        .collect();

    let mut remaining: BTreeMap<i64, Vec<UnitLoad>> = BTreeMap::new();
    for unit in unit_loads {
        match unit.order_ids.iter().next().copied() {
            Some(order_id) => remaining.entry(order_id).or_default().push(unit),
            None => warn!("unit load {} has no contributing order, skipped", unit.id),
        }
    }

    let mut loads: Vec<VehicleLoad> = Vec::new();
    let mut unplaceable: Vec<UnplaceableOrder> = Vec::new();

    while !remaining.is_empty() {
        let mut flushed = false;

        for vehicle in &fleet {
            let mut staged_units: Vec<UnitLoad> = Vec::new();
            let mut staged_positions: Vec<Position> = Vec::new();
            let mut staged_orders: BTreeSet<i64> = BTreeSet::new();
            let mut staged_mass = 0.0_f64;

            for (&order_id, group) in remaining.iter() {
                let group_mass: f64 = group.iter().map(|u| u.mass).sum();
                if staged_mass + group_mass > vehicle.payload {
                    debug!(
                        "order {} skipped on vehicle {}: {:.1} kg over payload",
                        order_id,
                        vehicle.id,
                        staged_mass + group_mass - vehicle.payload
                    );
                    continue;
                }

                // Repack the whole accumulated set; the group joins only if
                // every footprint still finds a cell.
                let trial: Vec<(u32, u32)> = staged_units
                    .iter()
                    .chain(group.iter())
                    .map(|u| (u.width, u.depth))
                    .collect();
                let mut packer = FloorPacker::new(vehicle.floor_width, vehicle.floor_depth);
                let positions = packer.pack(&trial);
                if positions.iter().any(Option::is_none) {
                    debug!(
                        "order {} skipped on vehicle {}: no floor placement",
                        order_id, vehicle.id
                    );
                    continue;
                }

                staged_units.extend(group.iter().cloned());
                staged_positions = positions.into_iter().flatten().collect();
                staged_orders.insert(order_id);
                staged_mass += group_mass;

                if staged_mass > vehicle.payload * PAYLOAD_FILL_GUIDELINE {
                    break;
                }
            }

            if staged_orders.is_empty() {
                continue;
            }

            for order_id in &staged_orders {
                remaining.remove(order_id);
            }
            info!(
                "vehicle {} takes {} order(s), {:.1} kg",
                vehicle.id,
                staged_orders.len(),
                staged_mass
            );
            loads.push(commit_load(
                vehicle.clone(),
                staged_units,
                staged_positions,
                staged_orders,
                staged_mass,
            ));
            flushed = true;
            break;
        }

        if flushed {
            continue;
        }

        // Nothing moved this sweep: force the lowest-id group alone onto the
        // largest vehicle, or report it.
        let Some((&order_id, _)) = remaining.iter().next() else {
            break;
        };
        let group = remaining.remove(&order_id).unwrap_or_default();
        let vehicle = &fleet[0];
        let group_mass: f64 = group.iter().map(|u| u.mass).sum();

        if group_mass > vehicle.payload {
            warn!(
                "order {} unplaceable: {:.1} kg exceeds payload {:.1} kg",
                order_id, group_mass, vehicle.payload
            );
            unplaceable.push(UnplaceableOrder {
                order_id,
                reason: UnplaceableReason::ExceedsPayload,
            });
            continue;
        }

        let footprints: Vec<(u32, u32)> = group.iter().map(|u| (u.width, u.depth)).collect();
        let mut packer = FloorPacker::new(vehicle.floor_width, vehicle.floor_depth);
        let positions = packer.pack(&footprints);
        if positions.iter().any(Option::is_none) {
            warn!(
                "order {} unplaceable: footprints exceed vehicle {} floor",
                order_id, vehicle.id
            );
            unplaceable.push(UnplaceableOrder {
                order_id,
                reason: UnplaceableReason::ExceedsFloor,
            });
            continue;
        }

        info!(
            "order {} forced onto vehicle {} ({:.1} kg)",
            order_id, vehicle.id, group_mass
        );
        loads.push(commit_load(
            vehicle.clone(),
            group,
            positions.into_iter().flatten().collect(),
            BTreeSet::from([order_id]),
            group_mass,
        ));
    }

    (loads, unplaceable)
}

fn commit_load(
    vehicle: Vehicle,
    units: Vec<UnitLoad>,
    positions: Vec<Position>,
    order_ids: BTreeSet<i64>,
    total_mass: f64,
) -> VehicleLoad {
    let used_area: u64 = positions
        .iter()
        .map(|p| (p.width as u64) * (p.depth as u64))
        .sum();
    let utilization = if vehicle.floor_area() == 0 {
        0.0
    } else {
        (used_area as f64) / (vehicle.floor_area() as f64) * 100.0
    };

    let placements = units
        .into_iter()
        .zip(positions)
        .enumerate()
        .map(|(i, (unit, position))| PlacedUnit {
            unit,
            position,
            load_sequence: i as u32 + 1,
        })
        .collect();

    VehicleLoad {
        vehicle,
        placements,
        order_ids,
        total_mass,
        utilization,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::geometry::rects_overlap;
    use crate::domain::types::Carton;
    use crate::planning::registry::UnitLoadKind;

    fn vehicle(id: i64, w: u32, d: u32, payload: f64) -> Vehicle {
        Vehicle {
            id,
            name: format!("truck-{id}"),
            floor_width: w,
            floor_depth: d,
            payload,
        }
    }

    fn unit(id: usize, order_id: i64, w: u32, d: u32, mass: f64) -> UnitLoad {
        UnitLoad {
            id,
            kind: UnitLoadKind::Virtual(Carton {
                width: w,
                depth: d,
                height: 50,
                mass,
                item_code: "IT001".to_string(),
                order_id,
                x: 0,
                y: 0,
                z: 0,
            }),
            width: w,
            depth: d,
            height: 50,
            mass,
            volume: (w as u64) * (d as u64) * 50,
            order_ids: BTreeSet::from([order_id]),
        }
    }

    fn assert_load_invariants(load: &VehicleLoad) {
        let mass: f64 = load.placements.iter().map(|p| p.unit.mass).sum();
        assert!(mass <= load.vehicle.payload + 1e-9);

        for (i, a) in load.placements.iter().enumerate() {
            assert_eq!(a.load_sequence, i as u32 + 1);
            let pa = &a.position;
            assert!(pa.x + pa.width <= load.vehicle.floor_width);
            assert!(pa.y + pa.depth <= load.vehicle.floor_depth);
            for b in load.placements.iter().skip(i + 1) {
                let pb = &b.position;
                assert!(!rects_overlap(
                    pa.x,
                    pa.y,
                    pa.x + pa.width,
                    pa.y + pa.depth,
                    pb.x,
                    pb.y,
                    pb.x + pb.width,
                    pb.y + pb.depth,
                ));
            }
        }
    }

    #[test]
    fn single_unit_lands_on_the_only_vehicle() {
        let fleet = vec![vehicle(1, 200, 400, 2000.0)];
        let (loads, unplaceable) = assign_vehicles(vec![unit(1, 10, 30, 21, 1.3)], &fleet);

        assert!(unplaceable.is_empty());
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].placements.len(), 1);
        assert_eq!(loads[0].placements[0].position.x, 0);
        assert_eq!(loads[0].placements[0].position.y, 0);
        assert_load_invariants(&loads[0]);
    }

    #[test]
    fn order_groups_are_never_split() {
        // Order 1 owns two pallet-sized footprints; a floor of 100x200 only
        // holds two such footprints, so each order fills one vehicle sweep.
        let fleet = vec![vehicle(1, 100, 200, 2000.0)];
        let units = vec![
            unit(1, 1, 100, 100, 100.0),
            unit(2, 1, 100, 100, 100.0),
            unit(3, 2, 100, 100, 100.0),
        ];
        let (loads, unplaceable) = assign_vehicles(units, &fleet);

        assert!(unplaceable.is_empty());
        assert_eq!(loads.len(), 2);
        assert_eq!(loads[0].order_ids, BTreeSet::from([1]));
        assert_eq!(loads[1].order_ids, BTreeSet::from([2]));
        for load in &loads {
            assert_load_invariants(load);
        }
    }

    #[test]
    fn payload_guideline_spreads_orders_over_sweeps() {
        // Twenty 30 kg orders against one 500 kg vehicle: staging stops past
        // 400 kg, so the fleet is swept repeatedly.
        let fleet = vec![vehicle(1, 200, 400, 500.0)];
        let units: Vec<UnitLoad> = (0..20)
            .map(|i| unit(i as usize + 1, i as i64 + 1, 50, 50, 30.0))
            .collect();
        let (loads, unplaceable) = assign_vehicles(units, &fleet);

        assert!(unplaceable.is_empty());
        assert!(loads.len() >= 2);
        let covered: usize = loads.iter().map(|l| l.order_ids.len()).sum();
        assert_eq!(covered, 20);
        for load in &loads {
            assert!(load.total_mass <= 500.0);
            assert_load_invariants(load);
        }
    }

    #[test]
    fn largest_vehicle_is_preferred() {
        let fleet = vec![vehicle(1, 200, 400, 2000.0), vehicle(2, 240, 500, 6000.0)];
        let (loads, _) = assign_vehicles(vec![unit(1, 5, 100, 100, 50.0)], &fleet);

        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].vehicle.id, 2);
    }

    #[test]
    fn group_over_every_payload_is_unplaceable() {
        let fleet = vec![vehicle(1, 200, 400, 500.0), vehicle(2, 200, 400, 300.0)];
        let (loads, unplaceable) = assign_vehicles(vec![unit(1, 9, 50, 50, 900.0)], &fleet);

        assert!(loads.is_empty());
        assert_eq!(
            unplaceable,
            vec![UnplaceableOrder {
                order_id: 9,
                reason: UnplaceableReason::ExceedsPayload,
            }]
        );
    }

    #[test]
    fn footprint_over_every_floor_is_unplaceable() {
        let fleet = vec![vehicle(1, 200, 400, 2000.0)];
        let (loads, unplaceable) = assign_vehicles(vec![unit(1, 9, 300, 300, 40.0)], &fleet);

        assert!(loads.is_empty());
        assert_eq!(unplaceable[0].reason, UnplaceableReason::ExceedsFloor);
    }

    #[test]
    fn heavy_group_overshoots_the_fill_guideline_but_not_the_payload() {
        // 900 kg against a 1000 kg vehicle passes the 80% guideline only
        // after staging; the group still commits whole in a single sweep.
        let fleet = vec![vehicle(1, 200, 400, 1000.0), vehicle(2, 200, 400, 100.0)];
        let units = vec![unit(1, 4, 100, 100, 450.0), unit(2, 4, 100, 100, 450.0)];
        let (loads, unplaceable) = assign_vehicles(units, &fleet);

        assert!(unplaceable.is_empty());
        assert_eq!(loads.len(), 1);
        assert_eq!(loads[0].vehicle.id, 1);
        assert_eq!(loads[0].placements.len(), 2);
        assert!((loads[0].total_mass - 900.0).abs() < 1e-9);
        assert_load_invariants(&loads[0]);
    }
}
