//! Two-stage logistics planner.
//!
//! Shipping orders due on a target date are first packed onto pallets (3D,
//! per-order, height/mass/support constrained), then the resulting unit
//! loads are floor-packed onto vehicles region by region, and each loaded
//! vehicle's stops are sequenced with a nearest-neighbour tour. Plans are
//! persisted to SQLite under a single transaction.

pub mod config;
pub mod database;
pub mod domain;
pub mod error;
pub mod fixtures;
pub mod loading;
pub mod palletize;
pub mod planning;
pub mod routing;

pub use error::PlanError;
pub use planning::orchestrator::{execute, plan_orders, PlanOutcome, RunContext};
