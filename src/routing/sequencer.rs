use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::config::constant::{
    DEPARTURE_HOUR, EARTH_RADIUS_KM, FIRST_LEG_MINUTES, NEXT_LEG_MINUTES,
};
use crate::domain::types::Stop;

/// Visit order over a set of destinations plus the tour's great-circle
/// length. The distance orders stops; travel times stay fixed policy values.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOrder {
    pub tour: Vec<usize>,
    pub distance_km: f64,
}

/// Great-circle distance between two (lat, lon) pairs in kilometres.
pub fn haversine_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = a;
    let (lat2, lon2) = b;

    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

fn distance_matrix(coords: &[(f64, f64)]) -> Vec<Vec<f64>> {
    let n = coords.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                matrix[i][j] = haversine_km(coords[i], coords[j]);
            }
        }
    }
    matrix
}

/// Nearest-neighbour visit order over the destinations.
///
/// With full coordinates the tour starts at index 0 and repeatedly hops to
/// the nearest unvisited destination. Any missing coordinate degrades the
/// whole tour to input order with a zero recorded distance.
pub fn order_stops(destinations: &[Option<(f64, f64)>]) -> RouteOrder {
    let n = destinations.len();
    if n == 0 {
        return RouteOrder {
            tour: Vec::new(),
            distance_km: 0.0,
        };
    }

    let coords: Option<Vec<(f64, f64)>> = destinations.iter().copied().collect();
    let Some(coords) = coords else {
        debug!("destination without coordinates, keeping input order");
        return RouteOrder {
            tour: (0..n).collect(),
            distance_km: 0.0,
        };
    };

    let matrix = distance_matrix(&coords);
    let mut visited = vec![false; n];
    let mut tour = Vec::with_capacity(n);
    let mut distance_km = 0.0;
    let mut current = 0;

    tour.push(current);
    visited[current] = true;

    for _ in 1..n {
        let mut nearest = None;
        let mut min_distance = f64::INFINITY;
        for (i, seen) in visited.iter().enumerate() {
            if !seen && matrix[current][i] < min_distance {
                min_distance = matrix[current][i];
                nearest = Some(i);
            }
        }
        if let Some(next) = nearest {
            tour.push(next);
            visited[next] = true;
            distance_km += min_distance;
            current = next;
        }
    }

    RouteOrder { tour, distance_km }
}

/// 08:00 on the plan date.
pub fn departure_time(plan_date: NaiveDate) -> NaiveDateTime {
    plan_date
        .and_hms_opt(DEPARTURE_HOUR, 0, 0)
        .expect("valid departure time")
}

/// ETAs along a tour: 30 minutes to the first stop, 20 minutes per
/// subsequent leg, regardless of distance.
pub fn schedule_stops(order_ids: &[i64], departure: NaiveDateTime) -> Vec<Stop> {
    let mut eta = departure;
    order_ids
        .iter()
        .enumerate()
        .map(|(i, &order_id)| {
            let travel_minutes = if i == 0 {
                FIRST_LEG_MINUTES
            } else {
                NEXT_LEG_MINUTES
            };
            eta += Duration::minutes(travel_minutes as i64);
            Stop {
                order_id,
                visit_index: i as u32 + 1,
                eta,
                travel_minutes,
            }
        })
        .collect()
}
