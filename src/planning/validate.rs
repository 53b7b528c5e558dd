use std::collections::BTreeMap;

use tracing::warn;

use crate::domain::types::{Item, ShippingOrder, Vehicle};
use crate::error::{InputViolation, PlanError};

/// Reject a run before any placement work happens. Every offender is
/// collected so the caller can fix them in one pass.
pub fn validate_run(
    fleet: &[Vehicle],
    orders: &[ShippingOrder],
    catalogue: &BTreeMap<String, Item>,
) -> Result<(), PlanError> {
    if fleet.is_empty() {
        return Err(PlanError::NoFleet);
    }

    let mut violations: Vec<InputViolation> = Vec::new();

    for vehicle in fleet {
        if vehicle.floor_width == 0 || vehicle.floor_depth == 0 {
            violations.push(InputViolation::NonPositiveFloor {
                vehicle_id: vehicle.id,
            });
        }
    }

    for order in orders {
        if order.lines.is_empty() {
            violations.push(InputViolation::EmptyOrder { order_id: order.id });
        }
        for line in &order.lines {
            if line.quantity == 0 {
                violations.push(InputViolation::ZeroQuantityLine {
                    order_id: order.id,
                    item_code: line.item_code.clone(),
                });
            }
            match catalogue.get(&line.item_code) {
                None => violations.push(InputViolation::UnknownItem {
                    order_id: order.id,
                    item_code: line.item_code.clone(),
                }),
                Some(item)
                    if item.width == 0 || item.depth == 0 || item.height == 0
                        || item.mass <= 0.0 =>
                {
                    violations.push(InputViolation::MissingItemDimensions {
                        item_code: item.item_code.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    // The same item can offend through many orders; report it once.
    violations.sort();
    violations.dedup();

    if violations.is_empty() {
        Ok(())
    } else {
        for violation in &violations {
            warn!("input violation: {violation}");
        }
        Err(PlanError::InvalidInput(violations))
    }
}
