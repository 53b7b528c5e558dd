use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use tracing::{info, span, Level};

use crate::database;
use crate::domain::types::{Carton, Item, PalletSpec, ShippingOrder, Stop, Vehicle};
use crate::error::PlanError;
use crate::loading::loader::{assign_vehicles, PlacedUnit, UnplaceableOrder, VehicleLoad};
use crate::palletize::builder::{log_pallet_layout, PalletBuilder};
use crate::planning::region::Region;
use crate::planning::registry::{build_unit_loads, UnitLoad};
use crate::planning::validate::validate_run;
use crate::routing::sequencer::{departure_time, order_stops, schedule_stops};

/// Everything one planning run needs, passed explicitly through the
/// pipeline. No global state.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub fleet: Vec<Vehicle>,
    pub catalogue: BTreeMap<String, Item>,
    pub pallet_spec: PalletSpec,
    pub target_date: NaiveDate,
}

/// One delivery plan as produced by the pipeline, before persistence.
#[derive(Debug, Clone)]
pub struct DraftPlan {
    pub vehicle_id: i64,
    pub plan_date: NaiveDate,
    pub departure: NaiveDateTime,
    pub total_mass: f64,
    pub total_volume: u64,
    pub route_distance_km: f64,
    pub utilization: f64,
    pub stops: Vec<Stop>,
    pub placements: Vec<PlacedUnit>,
}

/// Result of a run: the plans plus the orders no vehicle could carry.
#[derive(Debug, Clone, Default)]
pub struct PlanOutcome {
    pub plans: Vec<DraftPlan>,
    pub unplaceable: Vec<UnplaceableOrder>,
}

/// Run the full pipeline synchronously: expand order lines, build pallets,
/// lift them into unit loads, split orders by region, load vehicles per
/// region and sequence each vehicle's stops.
pub fn plan_orders(ctx: &RunContext, orders: &[ShippingOrder]) -> Result<PlanOutcome, PlanError> {
    validate_run(&ctx.fleet, orders, &ctx.catalogue)?;

    if orders.is_empty() {
        info!("no orders for {}, nothing to plan", ctx.target_date);
        return Ok(PlanOutcome::default());
    }

    // PHASE 1: Expand order lines into individual cartons.
    let cartons = expand_orders(orders, &ctx.catalogue);
    info!(
        "planning {} order(s) with {} carton(s) for {}",
        orders.len(),
        cartons.len(),
        ctx.target_date
    );

    // PHASE 2: Build pallets, one shipping order per pallet.
    let packed = {
        let span = span!(Level::INFO, "palletize");
        let _guard = span.enter();
        PalletBuilder::new(ctx.pallet_spec.clone()).pack(cartons)
    };
    for (i, pallet) in packed.pallets.iter().enumerate() {
        log_pallet_layout(i + 1, pallet);
    }

    // PHASE 3: Lift pallets and residue into the uniform unit-load view.
    let mut remaining_units = build_unit_loads(packed.pallets, packed.loose, &ctx.pallet_spec);

    // PHASE 4: Partition orders by region; vehicles never mix regions.
    let mut regions: BTreeMap<Region, Vec<&ShippingOrder>> = BTreeMap::new();
    for order in orders {
        let region = Region::classify(&order.destination.address);
        regions.entry(region).or_default().push(order);
    }
    info!("{} region(s) to load", regions.len());

    // PHASE 5/6: Load vehicles per region, then sequence each vehicle tour.
    let mut outcome = PlanOutcome::default();
    for (region, region_orders) in regions {
        let span = span!(Level::INFO, "load_region", region = region.label());
        let _guard = span.enter();

        let order_index: BTreeMap<i64, &ShippingOrder> =
            region_orders.iter().map(|o| (o.id, *o)).collect();
        let (region_units, rest): (Vec<UnitLoad>, Vec<UnitLoad>) = remaining_units
            .into_iter()
            .partition(|u| u.order_ids.iter().any(|id| order_index.contains_key(id)));
        remaining_units = rest;

        if region_units.is_empty() {
            continue;
        }
        info!(
            "region {}: {} order(s), {} unit load(s)",
            region.label(),
            region_orders.len(),
            region_units.len()
        );

        let (loads, unplaceable) = assign_vehicles(region_units, &ctx.fleet);
        outcome.unplaceable.extend(unplaceable);
        for load in loads {
            outcome.plans.push(build_plan(ctx, &order_index, load));
        }
    }

    info!(
        "run produced {} plan(s), {} unplaceable order(s)",
        outcome.plans.len(),
        outcome.unplaceable.len()
    );
    Ok(outcome)
}

/// Load inputs from the store's point of view and persist the outcome under
/// one transaction. Orders already allocated or used by an earlier run for
/// this date are excluded, so re-running a planned date creates nothing new.
pub async fn execute(
    pool: &SqlitePool,
    ctx: &RunContext,
    orders: Vec<ShippingOrder>,
) -> Result<PlanOutcome, PlanError> {
    let consumed = database::consumed_order_ids(pool, ctx.target_date).await?;
    if !consumed.is_empty() {
        info!(
            "excluding {} order(s) already planned for {}",
            consumed.len(),
            ctx.target_date
        );
    }
    let candidates: Vec<ShippingOrder> = orders
        .into_iter()
        .filter(|o| !consumed.contains(&o.id))
        .collect();

    let outcome = plan_orders(ctx, &candidates)?;
    database::persist_outcome(pool, &outcome).await?;
    Ok(outcome)
}

fn expand_orders(orders: &[ShippingOrder], catalogue: &BTreeMap<String, Item>) -> Vec<Carton> {
    let mut cartons = Vec::new();
    for order in orders {
        for line in &order.lines {
            // Validation already rejected unknown items.
            let Some(item) = catalogue.get(&line.item_code) else {
                continue;
            };
            for _ in 0..line.quantity {
                cartons.push(Carton {
                    width: item.width,
                    depth: item.depth,
                    height: item.height,
                    mass: item.mass,
                    item_code: item.item_code.clone(),
                    order_id: order.id,
                    x: 0,
                    y: 0,
                    z: 0,
                });
            }
        }
    }
    cartons
}

/// Turn one loaded vehicle into a delivery plan: order the stops with the
/// nearest-neighbour tour and schedule their ETAs from the 08:00 departure.
fn build_plan(
    ctx: &RunContext,
    order_index: &BTreeMap<i64, &ShippingOrder>,
    load: VehicleLoad,
) -> DraftPlan {
    let stop_orders: Vec<&ShippingOrder> = load
        .order_ids
        .iter()
        .filter_map(|id| order_index.get(id).copied())
        .collect();

    let destinations: Vec<Option<(f64, f64)>> = stop_orders
        .iter()
        .map(|o| o.destination.coordinates())
        .collect();
    let route = order_stops(&destinations);

    let departure = departure_time(ctx.target_date);
    let ordered_ids: Vec<i64> = route.tour.iter().map(|&i| stop_orders[i].id).collect();
    let stops = schedule_stops(&ordered_ids, departure);

    let total_volume: u64 = load.placements.iter().map(|p| p.unit.volume).sum();

    DraftPlan {
        vehicle_id: load.vehicle.id,
        plan_date: ctx.target_date,
        departure,
        total_mass: load.total_mass,
        total_volume,
        route_distance_km: route.distance_km,
        utilization: load.utilization,
        stops,
        placements: load.placements,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::domain::types::{Destination, OrderLine};
    use crate::loading::loader::UnplaceableReason;
    use crate::planning::registry::UnitLoadKind;

    fn item(code: &str, w: u32, d: u32, h: u32, mass: f64) -> Item {
        Item {
            item_code: code.to_string(),
            name: code.to_string(),
            width: w,
            depth: d,
            height: h,
            mass,
        }
    }

    fn vehicle(id: i64, w: u32, d: u32, payload: f64) -> Vehicle {
        Vehicle {
            id,
            name: format!("truck-{id}"),
            floor_width: w,
            floor_depth: d,
            payload,
        }
    }

    fn order(id: i64, address: &str, coords: Option<(f64, f64)>, lines: Vec<(&str, u32)>) -> ShippingOrder {
        ShippingOrder {
            id,
            destination: Destination {
                name: format!("dest-{id}"),
                address: address.to_string(),
                latitude: coords.map(|c| c.0),
                longitude: coords.map(|c| c.1),
            },
            deadline: target_date(),
            lines: lines
                .into_iter()
                .map(|(code, quantity)| OrderLine {
                    item_code: code.to_string(),
                    quantity,
                })
                .collect(),
        }
    }

    fn target_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, 20).unwrap()
    }

    fn context(fleet: Vec<Vehicle>, items: Vec<Item>) -> RunContext {
        RunContext {
            fleet,
            catalogue: items
                .into_iter()
                .map(|i| (i.item_code.clone(), i))
                .collect(),
            pallet_spec: PalletSpec::default(),
            target_date: target_date(),
        }
    }

    #[test]
    fn trivial_order_becomes_one_plan_with_one_stop() {
        let ctx = context(
            vec![vehicle(1, 200, 400, 2000.0)],
            vec![item("PC001", 30, 21, 2, 1.3)],
        );
        let orders = vec![order(
            1,
            "東京都千代田区丸の内1-1-1",
            Some((35.6815, 139.7646)),
            vec![("PC001", 1)],
        )];

        let outcome = plan_orders(&ctx, &orders).expect("plan");

        assert!(outcome.unplaceable.is_empty());
        assert_eq!(outcome.plans.len(), 1);
        let plan = &outcome.plans[0];
        assert_eq!(plan.vehicle_id, 1);
        assert_eq!(plan.placements.len(), 1);
        let placed = &plan.placements[0];
        assert!(matches!(placed.unit.kind, UnitLoadKind::Virtual(_)));
        assert_eq!((placed.position.x, placed.position.y), (0, 0));
        assert_eq!(plan.stops.len(), 1);
        assert_eq!(plan.stops[0].visit_index, 1);
        assert_eq!(plan.stops[0].order_id, 1);
        assert_eq!(
            plan.stops[0].eta,
            target_date().and_hms_opt(8, 30, 0).unwrap()
        );
    }

    #[test]
    fn regions_are_never_mixed_on_a_vehicle() {
        let ctx = context(
            vec![vehicle(1, 240, 500, 6000.0)],
            vec![item("PC003", 40, 35, 40, 8.0)],
        );
        let orders = vec![
            order(1, "東京都千代田区丸の内1-1-1", None, vec![("PC003", 1)]),
            order(2, "東京都渋谷区渋谷3-15-3", None, vec![("PC003", 1)]),
            order(3, "東京都港区六本木6-10-1", None, vec![("PC003", 1)]),
            order(4, "神奈川県横浜市西区みなとみらい2-2-1", None, vec![("PC003", 1)]),
            order(5, "神奈川県川崎市川崎区東田町8-1", None, vec![("PC003", 1)]),
        ];

        let outcome = plan_orders(&ctx, &orders).expect("plan");

        assert!(outcome.unplaceable.is_empty());
        let mut tokyo_orders = BTreeSet::new();
        let mut kanagawa_orders = BTreeSet::new();
        for plan in &outcome.plans {
            let ids: BTreeSet<i64> = plan.stops.iter().map(|s| s.order_id).collect();
            let in_tokyo = ids.iter().all(|id| *id <= 3);
            let in_kanagawa = ids.iter().all(|id| *id >= 4);
            assert!(
                in_tokyo || in_kanagawa,
                "plan mixes regions: {ids:?}"
            );
            if in_tokyo {
                tokyo_orders.extend(ids);
            } else {
                kanagawa_orders.extend(ids);
            }
        }
        assert_eq!(tokyo_orders, BTreeSet::from([1, 2, 3]));
        assert_eq!(kanagawa_orders, BTreeSet::from([4, 5]));
    }

    #[test]
    fn every_order_is_planned_or_reported_never_both() {
        let ctx = context(
            vec![vehicle(1, 200, 400, 500.0)],
            vec![
                item("PC003", 40, 35, 40, 8.0),
                item("HEAVY", 50, 50, 50, 700.0),
            ],
        );
        let orders = vec![
            order(1, "東京都千代田区丸の内1-1-1", None, vec![("PC003", 2)]),
            order(2, "東京都中央区銀座4-6-16", None, vec![("HEAVY", 1)]),
            order(3, "東京都港区六本木6-10-1", None, vec![("PC003", 1)]),
        ];

        let outcome = plan_orders(&ctx, &orders).expect("plan");

        let planned: BTreeSet<i64> = outcome
            .plans
            .iter()
            .flat_map(|p| p.stops.iter().map(|s| s.order_id))
            .collect();
        let reported: BTreeSet<i64> =
            outcome.unplaceable.iter().map(|u| u.order_id).collect();

        assert_eq!(planned, BTreeSet::from([1, 3]));
        assert_eq!(reported, BTreeSet::from([2]));
        assert!(planned.is_disjoint(&reported));
        assert_eq!(
            outcome.unplaceable[0].reason,
            UnplaceableReason::ExceedsPayload
        );
    }

    #[test]
    fn capacity_overflow_spreads_over_repeated_sweeps() {
        let ctx = context(
            vec![vehicle(1, 200, 400, 500.0)],
            vec![item("CRATE", 50, 50, 50, 30.0)],
        );
        let orders: Vec<ShippingOrder> = (1..=20)
            .map(|id| order(id, "東京都千代田区丸の内1-1-1", None, vec![("CRATE", 1)]))
            .collect();

        let outcome = plan_orders(&ctx, &orders).expect("plan");

        assert!(outcome.unplaceable.is_empty());
        assert!(outcome.plans.len() >= 2);
        for plan in &outcome.plans {
            assert_eq!(plan.vehicle_id, 1);
            assert!(plan.total_mass <= 500.0 + 1e-9);
        }
        let covered: usize = outcome.plans.iter().map(|p| p.stops.len()).sum();
        assert_eq!(covered, 20);
    }

    #[test]
    fn oversize_box_beyond_every_floor_is_unplaceable() {
        let ctx = context(
            vec![vehicle(1, 100, 100, 2000.0)],
            vec![item("GIANT", 150, 150, 150, 40.0)],
        );
        let orders = vec![order(
            1,
            "東京都千代田区丸の内1-1-1",
            None,
            vec![("GIANT", 1)],
        )];

        let outcome = plan_orders(&ctx, &orders).expect("plan");

        assert!(outcome.plans.is_empty());
        assert_eq!(outcome.unplaceable.len(), 1);
        assert_eq!(outcome.unplaceable[0].order_id, 1);
        assert_eq!(
            outcome.unplaceable[0].reason,
            UnplaceableReason::ExceedsFloor
        );
    }

    #[test]
    fn oversize_box_fitting_a_floor_travels_loose() {
        let ctx = context(
            vec![vehicle(1, 200, 400, 2000.0)],
            vec![item("GIANT", 150, 150, 150, 40.0)],
        );
        let orders = vec![order(
            1,
            "東京都千代田区丸の内1-1-1",
            None,
            vec![("GIANT", 1)],
        )];

        let outcome = plan_orders(&ctx, &orders).expect("plan");

        assert!(outcome.unplaceable.is_empty());
        assert_eq!(outcome.plans.len(), 1);
        let placed = &outcome.plans[0].placements[0];
        assert!(matches!(placed.unit.kind, UnitLoadKind::Virtual(_)));
        assert_eq!((placed.unit.width, placed.unit.depth), (150, 150));
    }

    #[test]
    fn stops_are_unique_and_densely_indexed() {
        let ctx = context(
            vec![vehicle(1, 240, 500, 6000.0)],
            vec![item("PC005", 54, 21, 32, 4.5)],
        );
        let orders = vec![
            order(1, "東京都千代田区丸の内1-1-1", Some((35.6815, 139.7646)), vec![("PC005", 1)]),
            order(2, "東京都台東区上野7-1-1", Some((35.7071, 139.7731)), vec![("PC005", 2)]),
            order(3, "東京都品川区東品川4-12-8", Some((35.6052, 139.7343)), vec![("PC005", 1)]),
        ];

        let outcome = plan_orders(&ctx, &orders).expect("plan");

        for plan in &outcome.plans {
            let ids: Vec<i64> = plan.stops.iter().map(|s| s.order_id).collect();
            let unique: BTreeSet<i64> = ids.iter().copied().collect();
            assert_eq!(ids.len(), unique.len());
            let indices: Vec<u32> = plan.stops.iter().map(|s| s.visit_index).collect();
            assert_eq!(indices, (1..=ids.len() as u32).collect::<Vec<u32>>());
        }
    }

    #[test]
    fn identical_inputs_give_identical_outcomes() {
        let ctx = context(
            vec![vehicle(1, 240, 500, 6000.0), vehicle(2, 200, 400, 2000.0)],
            vec![
                item("PC003", 40, 35, 40, 8.0),
                item("PC005", 54, 21, 32, 4.5),
            ],
        );
        let orders = vec![
            order(1, "東京都千代田区丸の内1-1-1", Some((35.6815, 139.7646)), vec![("PC003", 3), ("PC005", 2)]),
            order(2, "東京都台東区上野7-1-1", Some((35.7071, 139.7731)), vec![("PC005", 4)]),
            order(3, "神奈川県横浜市西区みなとみらい2-2-1", Some((35.4593, 139.6317)), vec![("PC003", 1)]),
        ];

        let first = plan_orders(&ctx, &orders).expect("first run");
        let second = plan_orders(&ctx, &orders).expect("second run");

        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }

    #[test]
    fn no_orders_is_an_empty_outcome_not_an_error() {
        let ctx = context(
            vec![vehicle(1, 200, 400, 2000.0)],
            vec![item("PC001", 30, 21, 2, 1.3)],
        );
        let outcome = plan_orders(&ctx, &[]).expect("empty run");
        assert!(outcome.plans.is_empty());
        assert!(outcome.unplaceable.is_empty());
    }

    #[test]
    fn plan_totals_cover_the_placed_unit_loads() {
        let ctx = context(
            vec![vehicle(1, 240, 500, 6000.0)],
            vec![item("PC010", 40, 38, 26, 12.0)],
        );
        let orders = vec![order(
            1,
            "千葉県船橋市本町1-3-1",
            Some((35.6947, 139.9845)),
            vec![("PC010", 3)],
        )];

        let outcome = plan_orders(&ctx, &orders).expect("plan");

        let plan = &outcome.plans[0];
        assert!((plan.total_mass - 36.0).abs() < 1e-9);
        assert_eq!(plan.total_volume, 3 * 40 * 38 * 26);
        assert!(plan.utilization > 0.0);
        assert_eq!(plan.departure, target_date().and_hms_opt(8, 0, 0).unwrap());
    }
}
