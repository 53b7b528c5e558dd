use chrono::{NaiveDate, NaiveDateTime};

use crate::config::constant::{
    DEFAULT_PALLET_DEPTH, DEFAULT_PALLET_MAX_HEIGHT, DEFAULT_PALLET_MAX_MASS,
    DEFAULT_PALLET_WIDTH,
};

/// Catalogue entry: physical dimensions in cm, mass in kg.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub item_code: String,
    pub name: String,
    pub width: u32,
    pub depth: u32,
    pub height: u32,
    pub mass: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub item_code: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub name: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Destination {
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShippingOrder {
    pub id: i64,
    pub destination: Destination,
    pub deadline: NaiveDate,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Vehicle {
    pub id: i64,
    pub name: String,
    pub floor_width: u32,
    pub floor_depth: u32,
    pub payload: f64,
}

impl Vehicle {
    pub fn floor_area(&self) -> u64 {
        (self.floor_width as u64) * (self.floor_depth as u64)
    }
}

/// Pallet footprint and stacking limits for one planning run.
#[derive(Debug, Clone, PartialEq)]
pub struct PalletSpec {
    pub width: u32,
    pub depth: u32,
    pub max_height: u32,
    pub max_mass: f64,
}

impl Default for PalletSpec {
    fn default() -> Self {
        PalletSpec {
            width: DEFAULT_PALLET_WIDTH,
            depth: DEFAULT_PALLET_DEPTH,
            max_height: DEFAULT_PALLET_MAX_HEIGHT,
            max_mass: DEFAULT_PALLET_MAX_MASS,
        }
    }
}

/// One physical item unit to be packed. The placement fields (x, y, z) are
/// filled in by the pallet builder; until then they are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Carton {
    pub width: u32,
    pub depth: u32,
    pub height: u32,
    pub mass: f64,
    pub item_code: String,
    pub order_id: i64,
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Carton {
    pub fn volume(&self) -> u64 {
        (self.width as u64) * (self.depth as u64) * (self.height as u64)
    }

    pub fn footprint_area(&self) -> u64 {
        (self.width as u64) * (self.depth as u64)
    }
}

/// A built unit load: cartons stacked on a fixed footprint. Immutable once
/// the builder has emitted it.
#[derive(Debug, Clone, PartialEq)]
pub struct Pallet {
    pub width: u32,
    pub depth: u32,
    pub max_height: u32,
    pub max_mass: f64,
    pub cartons: Vec<Carton>,
    pub current_height: u32,
}

impl Pallet {
    pub fn from_spec(spec: &PalletSpec) -> Self {
        Pallet {
            width: spec.width,
            depth: spec.depth,
            max_height: spec.max_height,
            max_mass: spec.max_mass,
            cartons: Vec::new(),
            current_height: 0,
        }
    }

    pub fn total_mass(&self) -> f64 {
        self.cartons.iter().map(|c| c.mass).sum()
    }

    pub fn used_volume(&self) -> u64 {
        self.cartons.iter().map(|c| c.volume()).sum()
    }

    /// Owning order of every carton on this pallet; pallets never mix orders.
    pub fn order_id(&self) -> Option<i64> {
        self.cartons.first().map(|c| c.order_id)
    }
}

/// A committed position on a vehicle floor. `width`/`depth` are the placed
/// extents, already swapped when `rotation` is 90.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub depth: u32,
    pub rotation: u16,
}

/// One visit along a vehicle tour.
#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub order_id: i64,
    pub visit_index: u32,
    pub eta: NaiveDateTime,
    pub travel_minutes: u32,
}
