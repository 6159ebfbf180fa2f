//! Haversine distance and an admissible travel-time lower bound used both by
//! the footpath builder (§4.2 of the spec) and by the RAPTOR worker's A*
//! pruning (§4.3 phase B.3).

use geo::{HaversineDistance, Point};

/// A coarse upper bound on vehicle speed used to derive an *admissible*
/// (never-overestimating) travel time lower bound: real vehicles never go
/// faster than this, so `distance / FASTEST_PLAUSIBLE_SPEED_MPS` never
/// overestimates the true travel time, which is what A* pruning requires.
/// Tuned loosely above intercity rail speeds (~300 km/h) so the bound stays
/// safe across the route types GTFS can describe.
const FASTEST_PLAUSIBLE_SPEED_MPS: f64 = 85.0;

/// Great-circle distance between two `(lat, lon)` points, in metres.
pub fn haversine_distance_m(a: (f64, f64), b: (f64, f64)) -> f64 {
    Point::new(a.1, a.0).haversine_distance(&Point::new(b.1, b.0))
}

/// An admissible lower bound (in seconds) on travel time between two
/// coordinates, for use in A* pruning: never larger than the true minimum
/// possible travel time between the points.
pub fn lower_bound_travel_time_s(a: (f64, f64), b: (f64, f64)) -> f64 {
    haversine_distance_m(a, b) / FASTEST_PLAUSIBLE_SPEED_MPS
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_distance_for_identical_points() {
        let p = (52.52, 13.405);
        assert!(haversine_distance_m(p, p) < 1e-6);
    }

    #[test]
    fn berlin_alexanderplatz_to_hauptbahnhof_is_roughly_three_km() {
        let alex = (52.5219, 13.4132);
        let hbf = (52.5251, 13.3694);
        let d = haversine_distance_m(alex, hbf);
        assert!(d > 2_500.0 && d < 4_500.0, "distance was {d}");
    }

    #[test]
    fn lower_bound_never_exceeds_a_generous_walking_estimate() {
        let a = (52.5219, 13.4132);
        let b = (52.5251, 13.3694);
        let walking_seconds = haversine_distance_m(a, b) / 1.4;
        assert!(lower_bound_travel_time_s(a, b) < walking_seconds);
    }
}
