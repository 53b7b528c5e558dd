use thiserror::Error;

/// Failures that abort a planning run before or during execution.
///
/// Recoverable conditions are not represented here: an oversize carton
/// becomes a loose unit load, and an order no vehicle can carry is reported
/// in the run outcome rather than failing the whole run.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("input validation failed with {} violation(s)", .0.len())]
    InvalidInput(Vec<InputViolation>),

    #[error("no vehicles available in the fleet")]
    NoFleet,

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

/// One offending record found during pre-run validation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum InputViolation {
    MissingItemDimensions { item_code: String },
    UnknownItem { order_id: i64, item_code: String },
    ZeroQuantityLine { order_id: i64, item_code: String },
    NonPositiveFloor { vehicle_id: i64 },
    EmptyOrder { order_id: i64 },
}

impl std::fmt::Display for InputViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputViolation::MissingItemDimensions { item_code } => {
                write!(f, "item {item_code} has a missing dimension or mass")
            }
            InputViolation::UnknownItem {
                order_id,
                item_code,
            } => {
                write!(f, "order {order_id} references unknown item {item_code}")
            }
            InputViolation::ZeroQuantityLine {
                order_id,
                item_code,
            } => {
                write!(f, "order {order_id} has a zero-quantity line for {item_code}")
            }
            InputViolation::NonPositiveFloor { vehicle_id } => {
                write!(f, "vehicle {vehicle_id} has a non-positive floor")
            }
            InputViolation::EmptyOrder { order_id } => {
                write!(f, "order {order_id} has no lines")
            }
        }
    }
}
