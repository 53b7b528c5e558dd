use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::NaiveDate;
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::Row;
use tracing::info;

use crate::error::PlanError;
use crate::planning::orchestrator::PlanOutcome;

pub async fn db_connection() -> Result<SqlitePool, PlanError> {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
        tracing::warn!("DATABASE_URL not set, using default SQLite file");
        "sqlite:loadplan.sqlite".to_string()
    });

    let options = SqliteConnectOptions::from_str(&database_url)?.create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    info!("Connected to SQLite database at {database_url}");

    init_schema(&pool).await?;

    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), PlanError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS delivery_plans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plan_date TEXT NOT NULL,
            vehicle_id INTEGER NOT NULL,
            departure_time TEXT NOT NULL,
            total_mass REAL NOT NULL,
            total_volume INTEGER NOT NULL,
            route_distance_km REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS unit_loads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plan_id INTEGER NOT NULL REFERENCES delivery_plans(id),
            kind TEXT NOT NULL,
            width INTEGER NOT NULL,
            depth INTEGER NOT NULL,
            height INTEGER NOT NULL,
            mass REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plan_stops (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plan_id INTEGER NOT NULL REFERENCES delivery_plans(id),
            order_id INTEGER NOT NULL,
            visit_index INTEGER NOT NULL,
            eta TEXT NOT NULL,
            travel_minutes INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS plan_placements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            plan_id INTEGER NOT NULL REFERENCES delivery_plans(id),
            unit_load_id INTEGER NOT NULL REFERENCES unit_loads(id),
            position_x INTEGER NOT NULL,
            position_y INTEGER NOT NULL,
            rotation INTEGER NOT NULL,
            load_sequence INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS unit_load_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            unit_load_id INTEGER NOT NULL REFERENCES unit_loads(id),
            plan_id INTEGER NOT NULL REFERENCES delivery_plans(id),
            order_id INTEGER NOT NULL,
            plan_date TEXT NOT NULL,
            status TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Orders whose unit loads were already attached to a plan for this date by
/// an earlier run. A new run must not assign them again.
pub async fn consumed_order_ids(
    pool: &SqlitePool,
    plan_date: NaiveDate,
) -> Result<BTreeSet<i64>, PlanError> {
    let rows = sqlx::query(
        r#"
        SELECT DISTINCT order_id FROM unit_load_history
        WHERE plan_date = ?1 AND status IN ('USED', 'ALLOCATED')
        "#,
    )
    .bind(plan_date.to_string())
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(|row| row.get::<i64, _>("order_id")).collect())
}

/// Write one run's plans, stops, placements and history rows in a single
/// transaction. Nothing persists when any insert fails.
pub async fn persist_outcome(
    pool: &SqlitePool,
    outcome: &PlanOutcome,
) -> Result<Vec<i64>, PlanError> {
    let mut tx = pool.begin().await?;
    let mut plan_ids = Vec::with_capacity(outcome.plans.len());

    for plan in &outcome.plans {
        let plan_id = sqlx::query(
            r#"
            INSERT INTO delivery_plans
                (plan_date, vehicle_id, departure_time, total_mass, total_volume, route_distance_km)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(plan.plan_date.to_string())
        .bind(plan.vehicle_id)
        .bind(plan.departure.format("%Y-%m-%d %H:%M:%S").to_string())
        .bind(plan.total_mass)
        .bind(plan.total_volume as i64)
        .bind(plan.route_distance_km)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for stop in &plan.stops {
            sqlx::query(
                r#"
                INSERT INTO plan_stops (plan_id, order_id, visit_index, eta, travel_minutes)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(plan_id)
            .bind(stop.order_id)
            .bind(stop.visit_index as i64)
            .bind(stop.eta.format("%Y-%m-%d %H:%M:%S").to_string())
            .bind(stop.travel_minutes as i64)
            .execute(&mut *tx)
            .await?;
        }

        for placed in &plan.placements {
            let unit_load_id = sqlx::query(
                r#"
                INSERT INTO unit_loads (plan_id, kind, width, depth, height, mass)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(plan_id)
            .bind(placed.unit.kind_label())
            .bind(placed.unit.width as i64)
            .bind(placed.unit.depth as i64)
            .bind(placed.unit.height as i64)
            .bind(placed.unit.mass)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            sqlx::query(
                r#"
                INSERT INTO plan_placements
                    (plan_id, unit_load_id, position_x, position_y, rotation, load_sequence)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(plan_id)
            .bind(unit_load_id)
            .bind(placed.position.x as i64)
            .bind(placed.position.y as i64)
            .bind(placed.position.rotation as i64)
            .bind(placed.load_sequence as i64)
            .execute(&mut *tx)
            .await?;

            for &order_id in &placed.unit.order_ids {
                sqlx::query(
                    r#"
                    INSERT INTO unit_load_history
                        (unit_load_id, plan_id, order_id, plan_date, status)
                    VALUES (?1, ?2, ?3, ?4, 'USED')
                    "#,
                )
                .bind(unit_load_id)
                .bind(plan_id)
                .bind(order_id)
                .bind(plan.plan_date.to_string())
                .execute(&mut *tx)
                .await?;
            }
        }

        plan_ids.push(plan_id);
    }

    tx.commit().await?;
    info!("persisted {} plan(s)", plan_ids.len());

    Ok(plan_ids)
}
