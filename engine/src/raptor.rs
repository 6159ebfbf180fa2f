//! The RAPTOR worker (spec §4.3): one earliest-arrival query against a
//! read-only [`ScheduleIndex`] snapshot. A worker owns all of its
//! per-query state; nothing here is shared between concurrent queries.

use std::sync::atomic::{AtomicBool, Ordering};

use fixedbitset::FixedBitSet;

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::geo::lower_bound_travel_time_s;
use crate::schedule::{RouteKey, ScheduleIndex, StopId, TripId};
use crate::time::Time;

const INF: u32 = u32::MAX;

/// One leg of a reconstructed journey, prior to materialisation into the
/// host-facing wire shape (done in `journey.rs`).
#[derive(Debug, Clone)]
pub enum RawLeg {
    Board {
        from_stop: StopId,
        to_stop: StopId,
        trip_id: TripId,
        route_key: RouteKey,
        board_index: u32,
        alight_index: u32,
        depart: Time,
        arrive: Time,
    },
    Walk {
        from_stop: StopId,
        to_stop: StopId,
        depart: Time,
        arrive: Time,
    },
}

impl RawLeg {
    pub fn from_stop(&self) -> StopId {
        match self {
            RawLeg::Board { from_stop, .. } => *from_stop,
            RawLeg::Walk { from_stop, .. } => *from_stop,
        }
    }

    pub fn to_stop(&self) -> StopId {
        match self {
            RawLeg::Board { to_stop, .. } => *to_stop,
            RawLeg::Walk { to_stop, .. } => *to_stop,
        }
    }

    pub fn depart(&self) -> Time {
        match self {
            RawLeg::Board { depart, .. } => *depart,
            RawLeg::Walk { depart, .. } => *depart,
        }
    }

    pub fn arrive(&self) -> Time {
        match self {
            RawLeg::Board { arrive, .. } => *arrive,
            RawLeg::Walk { arrive, .. } => *arrive,
        }
    }
}

/// The outcome of one worker run: the best arrival time found at the
/// target (if any) and the leg sequence that achieves it, already
/// coalesced (spec §4.3 "Reconstruction").
#[derive(Debug, Clone, Default)]
pub struct RaptorOutcome {
    pub arrival: Option<Time>,
    pub legs: Vec<RawLeg>,
}

#[derive(Clone, Copy)]
enum Parent {
    None,
    Board {
        from_stop: StopId,
        from_round: usize,
        trip_id: TripId,
        route_key: RouteKey,
        board_index: u32,
        alight_index: u32,
        depart: Time,
        arrive: Time,
    },
    Walk {
        from_stop: StopId,
        from_round: usize,
        depart: Time,
        arrive: Time,
    },
}

pub struct RaptorWorker<'a> {
    data: &'a ScheduleIndex,
    config: &'a Config,
}

impl<'a> RaptorWorker<'a> {
    pub fn new(data: &'a ScheduleIndex, config: &'a Config) -> RaptorWorker<'a> {
        RaptorWorker { data, config }
    }

    /// Runs the round-based earliest-arrival search described in spec
    /// §4.3. Returns `Ok(outcome)` with `outcome.arrival = None` when the
    /// target is unreachable within `max_rounds` (spec's `NoJourney`,
    /// which is not an error). Checks `cancelled` between rounds only.
    pub fn query(
        &self,
        source: StopId,
        target: StopId,
        t0: Time,
        cancelled: &AtomicBool,
    ) -> EngineResult<RaptorOutcome> {
        let n = self.data.num_stops();
        if source as usize >= n {
            return Err(EngineError::InvalidStop(source));
        }
        if target as usize >= n {
            return Err(EngineError::InvalidStop(target));
        }

        let k = self.config.max_rounds;
        let mut tau_k: Vec<Vec<u32>> = vec![vec![INF; n]; k + 1];
        let mut parent: Vec<Vec<Parent>> = vec![vec![Parent::None; n]; k + 1];
        let mut tau_best: Vec<u32> = vec![INF; n];
        let mut best_round: Vec<usize> = vec![0; n];

        tau_k[0][source as usize] = t0.to_seconds();
        tau_best[source as usize] = t0.to_seconds();

        // Initial footpath relaxation from the source (round 0, not a boarding).
        let mut marked = FixedBitSet::with_capacity(n);
        marked.insert(source as usize);
        self.relax_footpaths(source, t0, 0, &mut tau_k, &mut tau_best, &mut best_round, &mut parent, &mut marked);

        let mut round = 0usize;
        let mut current_marked = marked;
        while round < k {
            if cancelled.load(Ordering::Relaxed) {
                return Ok(RaptorOutcome::default());
            }
            if current_marked.is_clear() {
                break;
            }
            round += 1;

            // Phase A — collect routes.
            let routes = self.collect_routes(&current_marked);

            // Phase B — scan routes.
            let mut newly_marked = FixedBitSet::with_capacity(n);
            for (route_key, start_index) in routes {
                self.scan_route(
                    route_key,
                    start_index,
                    target,
                    round,
                    &mut tau_k,
                    &mut tau_best,
                    &mut best_round,
                    &mut parent,
                    &mut newly_marked,
                )?;
            }

            // Phase C — relax footpaths from stops newly marked this round.
            let phase_b_marked: Vec<StopId> = newly_marked.ones().map(|i| i as StopId).collect();
            for stop in phase_b_marked {
                let depart_time = Time::from_seconds(tau_k[round][stop as usize]);
                self.relax_footpaths(
                    stop,
                    depart_time,
                    round,
                    &mut tau_k,
                    &mut tau_best,
                    &mut best_round,
                    &mut parent,
                    &mut newly_marked,
                );
            }

            current_marked = newly_marked;
        }

        if tau_best[target as usize] == INF {
            return Ok(RaptorOutcome::default());
        }

        match self.reconstruct(source, target, best_round[target as usize], &parent) {
            Some(legs) => Ok(RaptorOutcome {
                arrival: Some(Time::from_seconds(tau_best[target as usize])),
                legs,
            }),
            // Parent chain didn't trace back to source: treat as NoJourney
            // for this sample rather than surfacing a partial result (§7).
            None => Ok(RaptorOutcome::default()),
        }
    }

    fn collect_routes(&self, marked: &FixedBitSet) -> Vec<(RouteKey, u32)> {
        use std::collections::HashMap;
        let mut earliest_start: HashMap<RouteKey, u32> = HashMap::new();
        for stop in marked.ones() {
            let stop = stop as StopId;
            for &route_key in self.data.routes_serving(stop) {
                if let Some(idx) = self.data.route_stop_position(route_key, stop) {
                    earliest_start
                        .entry(route_key)
                        .and_modify(|cur| {
                            if idx < *cur {
                                *cur = idx;
                            }
                        })
                        .or_insert(idx);
                }
            }
        }
        earliest_start.into_iter().collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn scan_route(
        &self,
        route_key: RouteKey,
        start_index: u32,
        target: StopId,
        round: usize,
        tau_k: &mut [Vec<u32>],
        tau_best: &mut [u32],
        best_round: &mut [usize],
        parent: &mut [Vec<Parent>],
        newly_marked: &mut FixedBitSet,
    ) -> EngineResult<()> {
        let route = self
            .data
            .route(route_key)
            .ok_or_else(|| EngineError::CorruptIndex(format!("route {route_key} not found")))?;
        let target_coords = self.data.stop(target).map(|s| s.coords());

        struct Boarded {
            trip_id: TripId,
            board_index: u32,
            board_stop: StopId,
        }
        let mut current_trip: Option<Boarded> = None;

        for i in (start_index as usize)..route.stop_sequence.len() {
            let s_prime = route.stop_sequence[i];
            let prev = tau_k[round - 1][s_prime as usize];

            // 1. Alight check — always performed for the vehicle actually
            // being ridden. The A* bound below must never gate this: it
            // reasons about `prev` (an unrelated, possibly stale round-(k-1)
            // arrival at `s'`), not about the genuine arrival the currently
            // boarded trip produces here, so it cannot be used to decide
            // whether alighting here is worthwhile.
            let mut vehicle_arrival: Option<u32> = None;
            if let Some(ref boarded) = current_trip {
                if let Some(trip) = self.data.trip(boarded.trip_id) {
                    let arr = trip.arrival_times[i].to_seconds();
                    vehicle_arrival = Some(arr);
                    let bound = tau_best[target as usize].min(tau_best[s_prime as usize]);
                    if arr < bound {
                        tau_k[round][s_prime as usize] = arr;
                        if arr < tau_best[s_prime as usize] {
                            tau_best[s_prime as usize] = arr;
                            best_round[s_prime as usize] = round;
                        }
                        parent[round][s_prime as usize] = Parent::Board {
                            from_stop: boarded.board_stop,
                            from_round: round - 1,
                            trip_id: boarded.trip_id,
                            route_key,
                            board_index: boarded.board_index,
                            alight_index: i as u32,
                            depart: trip.departure_times[boarded.board_index as usize],
                            arrive: Time::from_seconds(arr),
                        };
                        newly_marked.insert(s_prime as usize);
                    }
                }
            }

            // A* prune: once the vehicle we're actually riding can no longer
            // reach the target faster than the best known arrival (even by
            // the admissible lower bound), nothing further along this route
            // can improve on it either — stop scanning. Never applied before
            // a trip has been boarded, since there is no genuine vehicle
            // position yet to bound from.
            if let Some(arr) = vehicle_arrival {
                if let (Some(sp), Some(tp)) = (self.data.stop(s_prime).map(|s| s.coords()), target_coords) {
                    let lb = lower_bound_travel_time_s(sp, tp).ceil() as u32;
                    let bound = tau_best[target as usize];
                    if bound != INF && arr.saturating_add(lb) >= bound {
                        break;
                    }
                }
            }

            // 2. Board / improve.
            if prev != INF {
                let threshold = prev.saturating_add(self.config.board_buffer.to_secs().max(0) as u32);
                if let Some(trip_id) = self.earliest_catchable_trip(route, i, threshold) {
                    let candidate_departs = self
                        .data
                        .trip(trip_id)
                        .map(|t| t.departure_times[i].to_seconds())
                        .unwrap_or(INF);
                    let better = match &current_trip {
                        None => true,
                        Some(b) => self
                            .data
                            .trip(b.trip_id)
                            .map(|t| candidate_departs < t.departure_times[i].to_seconds())
                            .unwrap_or(true),
                    };
                    if better {
                        current_trip = Some(Boarded {
                            trip_id,
                            board_index: i as u32,
                            board_stop: s_prime,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Binary search over a route's trips (sorted ascending by departure at
    /// every stop index, per the no-overtake invariant) for the earliest
    /// one departing `stop_index` at or after `threshold`.
    fn earliest_catchable_trip(&self, route: &crate::schedule::Route, stop_index: usize, threshold: u32) -> Option<TripId> {
        let trips = self.data.route_trips_by_stop_sorted(route.id);
        let mut lo = 0usize;
        let mut hi = trips.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            let dep = self
                .data
                .trip(trips[mid])
                .map(|t| t.departure_times[stop_index].to_seconds())
                .unwrap_or(INF);
            if dep >= threshold {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        trips.get(lo).copied()
    }

    #[allow(clippy::too_many_arguments)]
    fn relax_footpaths(
        &self,
        from: StopId,
        depart: Time,
        round: usize,
        tau_k: &mut [Vec<u32>],
        tau_best: &mut [u32],
        best_round: &mut [usize],
        parent: &mut [Vec<Parent>],
        marked: &mut FixedBitSet,
    ) {
        let stop = match self.data.stop(from) {
            Some(s) => s,
            None => return,
        };
        for &(neighbour, walk_seconds) in &stop.footpaths {
            let cand = depart.to_seconds().saturating_add(walk_seconds);
            if cand < tau_best[neighbour as usize] {
                tau_k[round][neighbour as usize] = cand;
                tau_best[neighbour as usize] = cand;
                best_round[neighbour as usize] = round;
                parent[round][neighbour as usize] = Parent::Walk {
                    from_stop: from,
                    from_round: round,
                    depart,
                    arrive: Time::from_seconds(cand),
                };
                marked.insert(neighbour as usize);
            }
        }
    }

    fn reconstruct(
        &self,
        source: StopId,
        target: StopId,
        target_round: usize,
        parent: &[Vec<Parent>],
    ) -> Option<Vec<RawLeg>> {
        let mut legs = Vec::new();
        let mut stop = target;
        let mut round = target_round;
        let mut guard = 0usize;
        loop {
            if stop == source {
                break;
            }
            guard += 1;
            if guard > parent.len() * self.data.num_stops() + 1 {
                // a parent chain can never be this long; treat as corrupt.
                return None;
            }
            match parent[round][stop as usize] {
                Parent::None => return None,
                Parent::Board {
                    from_stop,
                    from_round,
                    trip_id,
                    route_key,
                    board_index,
                    alight_index,
                    depart,
                    arrive,
                } => {
                    legs.push(RawLeg::Board {
                        from_stop,
                        to_stop: stop,
                        trip_id,
                        route_key,
                        board_index,
                        alight_index,
                        depart,
                        arrive,
                    });
                    stop = from_stop;
                    round = from_round;
                }
                Parent::Walk {
                    from_stop,
                    from_round,
                    depart,
                    arrive,
                } => {
                    legs.push(RawLeg::Walk {
                        from_stop,
                        to_stop: stop,
                        depart,
                        arrive,
                    });
                    stop = from_stop;
                    round = from_round;
                }
            }
        }
        legs.reverse();
        Some(coalesce_board_legs(legs))
    }
}

/// Merges adjacent `Board` legs that share a trip (spec §4.3
/// "Reconstruction": coalesce consecutive board-legs on the same trip).
fn coalesce_board_legs(legs: Vec<RawLeg>) -> Vec<RawLeg> {
    let mut out: Vec<RawLeg> = Vec::with_capacity(legs.len());
    for leg in legs {
        let mergeable = matches!(
            (out.last(), &leg),
            (
                Some(RawLeg::Board { trip_id: prev_trip, alight_index: prev_alight, .. }),
                RawLeg::Board { trip_id, board_index, .. },
            ) if prev_trip == trip_id && prev_alight == board_index
        );
        if mergeable {
            if let (
                Some(RawLeg::Board { to_stop, alight_index, arrive, .. }),
                RawLeg::Board {
                    to_stop: new_to,
                    alight_index: new_alight,
                    arrive: new_arrive,
                    ..
                },
            ) = (out.last_mut(), &leg)
            {
                *to_stop = *new_to;
                *alight_index = *new_alight;
                *arrive = *new_arrive;
            }
            continue;
        }
        out.push(leg);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schedule::{Builder, RouteType};

    fn build_direct_ride() -> ScheduleIndex {
        let mut b = Builder::new();
        b.add_stop(0, "A".into(), None, 52.5, 13.4);
        b.add_stop(1, "B".into(), None, 52.52, 13.42);
        b.add_trip(
            0,
            "T1".into(),
            "T1".into(),
            RouteType::Bus,
            "#fff".into(),
            vec![
                (0, Time::from_hms(8, 0, 0), Time::from_hms(8, 0, 0)),
                (1, Time::from_hms(8, 20, 0), Time::from_hms(8, 20, 0)),
            ],
            None,
        );
        b.build()
    }

    #[test]
    fn direct_ride_is_found() {
        let data = build_direct_ride();
        let config = Config::default();
        let worker = RaptorWorker::new(&data, &config);
        let cancelled = AtomicBool::new(false);
        let outcome = worker
            .query(0, 1, Time::from_hms(7, 55, 0), &cancelled)
            .unwrap();
        assert_eq!(outcome.arrival, Some(Time::from_hms(8, 20, 0)));
        assert_eq!(outcome.legs.len(), 1);
        match &outcome.legs[0] {
            RawLeg::Board { depart, arrive, .. } => {
                assert_eq!(*depart, Time::from_hms(8, 0, 0));
                assert_eq!(*arrive, Time::from_hms(8, 20, 0));
            }
            RawLeg::Walk { .. } => panic!("expected a board leg"),
        }
    }

    #[test]
    fn unreachable_target_returns_no_journey() {
        let mut b = Builder::new();
        b.add_stop(0, "A".into(), None, 52.5, 13.4);
        b.add_stop(1, "B".into(), None, 10.0, 10.0);
        let data = b.build();
        let config = Config::default();
        let worker = RaptorWorker::new(&data, &config);
        let cancelled = AtomicBool::new(false);
        let outcome = worker
            .query(0, 1, Time::from_hms(7, 55, 0), &cancelled)
            .unwrap();
        assert!(outcome.arrival.is_none());
        assert!(outcome.legs.is_empty());
    }

    #[test]
    fn unknown_stop_is_an_error() {
        let data = build_direct_ride();
        let config = Config::default();
        let worker = RaptorWorker::new(&data, &config);
        let cancelled = AtomicBool::new(false);
        let err = worker
            .query(0, 99, Time::from_hms(7, 55, 0), &cancelled)
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidStop(99));
    }

    #[test]
    fn one_transfer_with_dwell() {
        let mut b = Builder::new();
        b.add_stop(0, "A".into(), None, 52.50, 13.40);
        b.add_stop(1, "X".into(), None, 52.51, 13.41);
        b.add_stop(2, "B".into(), None, 52.52, 13.42);
        b.add_trip(
            0,
            "T1".into(),
            "T1".into(),
            RouteType::Bus,
            "#fff".into(),
            vec![
                (0, Time::from_hms(8, 0, 0), Time::from_hms(8, 0, 0)),
                (1, Time::from_hms(8, 10, 0), Time::from_hms(8, 10, 0)),
            ],
            None,
        );
        b.add_trip(
            1,
            "T2".into(),
            "T2".into(),
            RouteType::Bus,
            "#fff".into(),
            vec![
                (1, Time::from_hms(8, 12, 0), Time::from_hms(8, 12, 0)),
                (2, Time::from_hms(8, 30, 0), Time::from_hms(8, 30, 0)),
            ],
            None,
        );
        let data = b.build();
        let config = Config::default();
        let worker = RaptorWorker::new(&data, &config);
        let cancelled = AtomicBool::new(false);
        let outcome = worker
            .query(0, 2, Time::from_hms(7, 55, 0), &cancelled)
            .unwrap();
        assert_eq!(outcome.arrival, Some(Time::from_hms(8, 30, 0)));
        assert_eq!(outcome.legs.len(), 2);
        assert!(outcome.legs.iter().all(|l| matches!(l, RawLeg::Board { .. })));
    }
}
