pub mod constant {
    // Default pallet specification (cm / kg), used when no explicit spec is given.
    pub const DEFAULT_PALLET_WIDTH: u32 = 100;
    pub const DEFAULT_PALLET_DEPTH: u32 = 100;
    pub const DEFAULT_PALLET_MAX_HEIGHT: u32 = 80;
    pub const DEFAULT_PALLET_MAX_MASS: f64 = 100.0;

    // Candidate grids (cm): fine for pallet floor positions, coarser for
    // vehicle floor positions.
    pub const PALLET_GRID_STEP: u32 = 5;
    pub const FLOOR_GRID_STEP: u32 = 10;

    // Minimum share of a carton's bottom face that must rest on the layer below it.
    pub const SUPPORT_RATIO: f64 = 0.7;

    // Stop staging further order-groups once a vehicle passes this payload share.
    pub const PAYLOAD_FILL_GUIDELINE: f64 = 0.8;

    // Departure and fixed per-leg travel policy.
    pub const DEPARTURE_HOUR: u32 = 8;
    pub const FIRST_LEG_MINUTES: u32 = 30;
    pub const NEXT_LEG_MINUTES: u32 = 20;

    pub const EARTH_RADIUS_KM: f64 = 6371.0;
}
