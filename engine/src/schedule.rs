//! The immutable in-memory Schedule Index (spec §3), plus the `Builder`
//! used by the GTFS loader to construct one. Ids are compact interned
//! `u32`s so that all per-query state in the RAPTOR worker (§4.3) can be
//! plain `Vec`s indexed directly by id, allocated once and reused across
//! rounds, per the re-architecture guidance in spec §9.

use std::collections::HashMap;
use std::fmt;

use crate::time::Time;

pub type StopId = u32;
pub type RouteKey = u32;
pub type TripId = u32;
pub type ShapeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, serde::Serialize, serde::Deserialize)]
pub enum RouteType {
    Rail,
    Bus,
    RailwayService,
    SuburbanRailway,
    UrbanRailway,
    BusService,
    TramService,
    WaterTransportService,
    Other(u16),
}

/// A stop/platform. Immutable once published in a [`ScheduleIndex`].
#[derive(Debug, Clone)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub agency: Option<String>,
    pub lat: f64,
    pub lon: f64,
    /// Walkable neighbours, excluding self, each appearing at most once.
    /// `walk_seconds > 0` always holds.
    pub footpaths: Vec<(StopId, u32)>,
}

impl Stop {
    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    pub fn walk_seconds_to(&self, other: StopId) -> Option<u32> {
        self.footpaths
            .iter()
            .find(|(id, _)| *id == other)
            .map(|(_, secs)| *secs)
    }
}

/// A RAPTOR-sense route: an ordered stop sequence shared by a set of trips.
/// Two GTFS trips share a `Route` iff they visit the identical ordered stop
/// sequence (spec §3) — two GTFS routes with identical patterns stay
/// distinct (spec §9, open question 3).
#[derive(Debug, Clone)]
pub struct Route {
    pub id: RouteKey,
    pub gtfs_route_id: String,
    pub short_name: String,
    pub route_type: RouteType,
    pub color: String,
    pub stop_sequence: Vec<StopId>,
    /// Trips on this route, sorted ascending by departure time at stop
    /// index 0. Invariant 4 (no overtaking) means this same order is valid
    /// at every stop index, so a single sorted `Vec` serves every
    /// `route_trips_by_stop_sorted(route, stop_index)` lookup in §3.
    pub trip_ids: Vec<TripId>,
}

#[derive(Debug, Clone)]
pub struct Trip {
    pub id: TripId,
    pub route_key: RouteKey,
    pub departure_times: Vec<Time>,
    pub arrival_times: Vec<Time>,
    pub shape_ref: Option<ShapeId>,
}

/// The immutable, queryable result of a GTFS load (spec §3). One instance
/// is a "Snapshot"; the Lifecycle Manager (§4.5) swaps instances wholesale.
pub struct ScheduleIndex {
    pub(crate) stops: Vec<Stop>,
    pub(crate) routes: Vec<Route>,
    pub(crate) trips: Vec<Trip>,
    pub(crate) shapes: HashMap<ShapeId, Vec<(f64, f64)>>,
    /// `StopId -> routes serving it`.
    pub(crate) stop_to_routes: Vec<Vec<RouteKey>>,
    /// `(RouteKey, StopId) -> earliest index of that stop in the route's
    /// sequence`, flattened as `Vec<HashMap<..>>` indexed by `RouteKey`.
    pub(crate) route_stop_index: Vec<HashMap<StopId, u32>>,
}

impl ScheduleIndex {
    pub fn stop(&self, id: StopId) -> Option<&Stop> {
        self.stops.get(id as usize)
    }

    pub fn route(&self, key: RouteKey) -> Option<&Route> {
        self.routes.get(key as usize)
    }

    pub fn trip(&self, id: TripId) -> Option<&Trip> {
        self.trips.get(id as usize)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&[(f64, f64)]> {
        self.shapes.get(&id).map(|v| v.as_slice())
    }

    pub fn num_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.iter()
    }

    pub fn routes_serving(&self, stop: StopId) -> &[RouteKey] {
        self.stop_to_routes
            .get(stop as usize)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Index of `stop` within `route`'s stop sequence, or `None` if the
    /// route doesn't serve it. When a route visits a stop twice, this is
    /// the earliest occurrence (spec §3).
    pub fn route_stop_position(&self, route: RouteKey, stop: StopId) -> Option<u32> {
        self.route_stop_index
            .get(route as usize)
            .and_then(|m| m.get(&stop))
            .copied()
    }

    /// Trips on `route` sorted ascending by departure time at `stop_index`.
    /// Valid for any `stop_index` on the route because trips on a single
    /// route pattern never overtake each other (invariant 4).
    pub fn route_trips_by_stop_sorted(&self, route: RouteKey) -> &[TripId] {
        self.routes
            .get(route as usize)
            .map(|r| r.trip_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Mutable access to the stop table, for the Footpath Builder (spec
    /// §4.2) to populate after the index is built but before it is
    /// published to the Lifecycle Manager.
    pub fn stops_mut(&mut self) -> &mut [Stop] {
        &mut self.stops
    }
}

impl fmt::Debug for ScheduleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleIndex")
            .field("stops", &self.stops.len())
            .field("routes", &self.routes.len())
            .field("trips", &self.trips.len())
            .finish()
    }
}

/// Accumulates stops/routes/trips and performs the grouping and index
/// construction described in spec §4.1 steps 4-6.
#[derive(Default)]
pub struct Builder {
    stops: HashMap<StopId, Stop>,
    /// `(route_gtfs_id, stop_sequence) -> accumulated trips`, keyed so that
    /// trips sharing an exact stop sequence group into one `Route`
    /// (step 4).
    route_groups: HashMap<(String, Vec<StopId>), RouteGroup>,
    shapes: HashMap<ShapeId, Vec<(f64, f64)>>,
    dropped_trips: u32,
}

struct RouteGroup {
    short_name: String,
    route_type: RouteType,
    color: String,
    trips: Vec<Trip>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    pub fn add_stop(&mut self, id: StopId, name: String, agency: Option<String>, lat: f64, lon: f64) {
        self.stops.insert(
            id,
            Stop {
                id,
                name,
                agency,
                lat,
                lon,
                footpaths: Vec::new(),
            },
        );
    }

    pub fn add_shape(&mut self, id: ShapeId, points: Vec<(f64, f64)>) {
        self.shapes.insert(id, points);
    }

    /// Adds a raw GTFS trip. `stop_times` must be ordered by `stop_sequence`
    /// and already have monotone, in-range arrival/departure [`Time`]s; the
    /// caller (the loader) is responsible for the window filter (step 3)
    /// and for dropping trips referencing unknown stops (invariant 2)
    /// before calling this.
    ///
    /// Returns `false` (and drops the trip) if the stop times are not
    /// monotone (invariant: `arrival[i] <= departure[i] <= arrival[i+1]`),
    /// per the loader error policy in spec §4.1.
    pub fn add_trip(
        &mut self,
        trip_id: TripId,
        gtfs_route_id: String,
        route_short_name: String,
        route_type: RouteType,
        route_color: String,
        stop_times: Vec<(StopId, Time, Time)>,
        shape_ref: Option<ShapeId>,
    ) -> bool {
        if stop_times.len() < 2 {
            self.dropped_trips += 1;
            return false;
        }
        for w in stop_times.windows(2) {
            let (_, arr0, dep0) = w[0];
            let (_, arr1, _) = w[1];
            if arr0 > dep0 || dep0 > arr1 {
                self.dropped_trips += 1;
                return false;
            }
        }
        let stop_sequence: Vec<StopId> = stop_times.iter().map(|(s, _, _)| *s).collect();
        let arrival_times: Vec<Time> = stop_times.iter().map(|(_, a, _)| *a).collect();
        let departure_times: Vec<Time> = stop_times.iter().map(|(_, _, d)| *d).collect();

        let key = (gtfs_route_id.clone(), stop_sequence);
        let group = self.route_groups.entry(key).or_insert_with(|| RouteGroup {
            short_name: route_short_name,
            route_type,
            color: route_color,
            trips: Vec::new(),
        });
        group.trips.push(Trip {
            id: trip_id,
            route_key: 0, // patched in `build`
            departure_times,
            arrival_times,
            shape_ref,
        });
        true
    }

    pub fn dropped_trip_count(&self) -> u32 {
        self.dropped_trips
    }

    pub fn build(self) -> ScheduleIndex {
        let stop_count = self.stops.keys().copied().max().map(|m| m + 1).unwrap_or(0) as usize;
        let mut stops = vec![
            Stop {
                id: 0,
                name: String::new(),
                agency: None,
                lat: 0.0,
                lon: 0.0,
                footpaths: Vec::new(),
            };
            stop_count
        ];
        for (id, stop) in self.stops {
            stops[id as usize] = stop;
        }

        let mut routes = Vec::with_capacity(self.route_groups.len());
        let mut trips_flat = Vec::new();
        for (route_index, ((gtfs_route_id, stop_sequence), mut group)) in
            self.route_groups.into_iter().enumerate()
        {
            let route_key = route_index as RouteKey;
            // Stable sort by departure at stop index 0 (step 5).
            group
                .trips
                .sort_by_key(|t| t.departure_times[0]);
            let mut trip_ids = Vec::with_capacity(group.trips.len());
            for mut trip in group.trips {
                trip.route_key = route_key;
                trip_ids.push(trip.id);
                trips_flat.push(trip);
            }
            routes.push(Route {
                id: route_key,
                gtfs_route_id,
                short_name: group.short_name,
                route_type: group.route_type,
                color: group.color,
                stop_sequence,
                trip_ids,
            });
        }

        let trip_count = trips_flat.iter().map(|t| t.id).max().map(|m| m + 1).unwrap_or(0) as usize;
        let mut trips = Vec::new();
        trips.resize_with(trip_count, || Trip {
            id: 0,
            route_key: 0,
            departure_times: Vec::new(),
            arrival_times: Vec::new(),
            shape_ref: None,
        });
        for trip in trips_flat {
            let idx = trip.id as usize;
            trips[idx] = trip;
        }

        let mut stop_to_routes: Vec<Vec<RouteKey>> = vec![Vec::new(); stop_count];
        let mut route_stop_index: Vec<HashMap<StopId, u32>> = vec![HashMap::new(); routes.len()];
        for route in &routes {
            let mut index_for_route: HashMap<StopId, u32> = HashMap::new();
            for (i, &stop_id) in route.stop_sequence.iter().enumerate() {
                // keep earliest index if the route revisits a stop
                index_for_route.entry(stop_id).or_insert(i as u32);
                let served = &mut stop_to_routes[stop_id as usize];
                if !served.contains(&route.id) {
                    served.push(route.id);
                }
            }
            route_stop_index[route.id as usize] = index_for_route;
        }

        ScheduleIndex {
            stops,
            routes,
            trips,
            shapes: self.shapes,
            stop_to_routes,
            route_stop_index,
        }
    }
}

/// Symmetrically installs a footpath between `a` and `b` (spec §4.2): each
/// stop gets an entry for the other with the same `walk_seconds`.
pub fn add_symmetric_footpath(stops: &mut [Stop], a: StopId, b: StopId, walk_seconds: u32) {
    if a == b {
        return;
    }
    for (from, to) in [(a, b), (b, a)] {
        if let Some(stop) = stops.get_mut(from as usize) {
            if let Some(existing) = stop.footpaths.iter_mut().find(|(id, _)| *id == to) {
                existing.1 = walk_seconds;
            } else {
                stop.footpaths.push((to, walk_seconds));
            }
        }
    }
}
