use std::error::Error;

use colored::*;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use loadplan::database::db_connection;
use loadplan::fixtures::{generate_orders, sample_catalogue, sample_fleet};
use loadplan::planning::orchestrator::{execute, PlanOutcome, RunContext};
use loadplan::planning::registry::UnitLoadKind;

const DEMO_ORDER_COUNT: usize = 12;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialise tracing_subscriber for better logging/debugging
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env()) // Reads RUST_LOG
        .with(
            fmt::layer()
                .with_span_events(fmt::format::FmtSpan::NEW | fmt::format::FmtSpan::CLOSE)
                .pretty(),
        )
        .init();

    let pool = db_connection().await?;

    let target_date = match std::env::var("PLAN_DATE") {
        Ok(raw) => raw.parse()?,
        Err(_) => chrono::Local::now().date_naive(),
    };

    // INPUT
    let ctx = RunContext {
        fleet: sample_fleet(),
        catalogue: sample_catalogue(),
        pallet_spec: Default::default(),
        target_date,
    };
    let orders = generate_orders(DEMO_ORDER_COUNT, target_date);

    info!(
        "Starting planning run for {} with {} orders and {} vehicles",
        target_date,
        orders.len(),
        ctx.fleet.len()
    );

    let outcome = execute(&pool, &ctx, orders).await?;

    print_outcome(&outcome);

    Ok(())
}

fn print_outcome(outcome: &PlanOutcome) {
    if outcome.plans.is_empty() {
        println!("{}", "No delivery plans were created.".yellow());
    }

    for (i, plan) in outcome.plans.iter().enumerate() {
        let pallets = plan
            .placements
            .iter()
            .filter(|p| matches!(p.unit.kind, UnitLoadKind::Real(_)))
            .count();
        let loose = plan.placements.len() - pallets;

        println!(
            "{} vehicle {} departs {}",
            format_args!("Plan {}:", i + 1).to_string().green(),
            plan.vehicle_id,
            plan.departure
        );
        println!(
            "  {} pallet(s), {} loose, {:.1} kg, floor {:.1}%, route {:.1} km",
            pallets, loose, plan.total_mass, plan.utilization, plan.route_distance_km
        );
        for stop in &plan.stops {
            println!(
                "  {}. order {} ETA {} (+{} min)",
                stop.visit_index, stop.order_id, stop.eta, stop.travel_minutes
            );
        }
    }

    for unplaceable in &outcome.unplaceable {
        println!(
            "{}",
            format_args!(
                "Order {} could not be placed: {}",
                unplaceable.order_id, unplaceable.reason
            )
            .to_string()
            .red()
        );
    }
}
