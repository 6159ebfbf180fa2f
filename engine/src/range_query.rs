//! The Range Query Orchestrator (spec §4.4): samples departures across a
//! window, dispatches one independent [`RaptorWorker`] run per sample on
//! `rayon`'s thread pool, then dedups and ranks the results.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use rayon::prelude::*;

use crate::config::Config;
use crate::error::{EngineError, EngineResult};
use crate::journey::{materialize, Journey, Leg};
use crate::raptor::{RaptorOutcome, RaptorWorker};
use crate::schedule::{ScheduleIndex, StopId};
use crate::time::Time;

pub struct RangeQuery<'a> {
    data: &'a ScheduleIndex,
    config: &'a Config,
}

impl<'a> RangeQuery<'a> {
    pub fn new(data: &'a ScheduleIndex, config: &'a Config) -> RangeQuery<'a> {
        RangeQuery { data, config }
    }

    /// Finds up to `config.top_n` journeys departing `source` no earlier
    /// than `earliest_departure`, within a `window_override` (or the
    /// configured default) window, arriving at `target`. Empty, not an
    /// error, when nothing is reachable (spec §7).
    pub fn find_journeys(
        &self,
        source: StopId,
        target: StopId,
        earliest_departure: Time,
        window_override: Option<i64>,
    ) -> EngineResult<Vec<Journey>> {
        if self.data.stop(source).is_none() {
            return Err(EngineError::InvalidStop(source));
        }
        if self.data.stop(target).is_none() {
            return Err(EngineError::InvalidStop(target));
        }

        let window = window_override.unwrap_or(self.config.window_seconds).max(0) as u32;
        let window_end = Time::from_seconds(earliest_departure.to_seconds().saturating_add(window));
        let samples = self.sample_departures(source, earliest_departure, window_end);

        let deadline = Instant::now() + self.config.deadline;
        let cancelled = AtomicBool::new(false);
        let worker = RaptorWorker::new(self.data, self.config);

        let outcomes: Vec<RaptorOutcome> = samples
            .par_iter()
            .filter_map(|&t0| {
                if Instant::now() >= deadline {
                    cancelled.store(true, Ordering::Relaxed);
                }
                worker.query(source, target, t0, &cancelled).ok()
            })
            .filter(|o| o.arrival.is_some())
            .collect();

        if cancelled.load(Ordering::Relaxed) {
            log::warn!("range query hit its deadline before sampling every departure");
        }

        let mut journeys = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            if let Some(journey) = materialize(self.data, &outcome.legs)? {
                journeys.push(journey);
            }
        }

        dedup_journeys(&mut journeys);
        journeys.sort_by(|a, b| a.depart.cmp(&b.depart).then_with(|| a.duration().cmp(&b.duration())));
        journeys.truncate(self.config.top_n);

        Ok(journeys)
    }

    /// Candidate RAPTOR start times within `[window_start, window_end]`:
    /// every trip departure at `source` in range, every departure at a stop
    /// reachable from `source` via a single footpath within its
    /// `walk_seconds` (translated back to a `source`-side start time), plus
    /// `window_start` itself (so a walk-only or footpath-first journey is
    /// never missed).
    fn sample_departures(&self, source: StopId, window_start: Time, window_end: Time) -> Vec<Time> {
        let mut candidates = vec![window_start];
        for &route_key in self.data.routes_serving(source) {
            let Some(stop_index) = self.data.route_stop_position(route_key, source) else {
                continue;
            };
            for &trip_id in self.data.route_trips_by_stop_sorted(route_key) {
                let Some(trip) = self.data.trip(trip_id) else {
                    continue;
                };
                let dep = trip.departure_times[stop_index as usize];
                if dep >= window_start && dep <= window_end {
                    candidates.push(dep);
                }
            }
        }

        if let Some(stop) = self.data.stop(source) {
            for &(neighbour, walk_seconds) in &stop.footpaths {
                for &route_key in self.data.routes_serving(neighbour) {
                    let Some(stop_index) = self.data.route_stop_position(route_key, neighbour) else {
                        continue;
                    };
                    for &trip_id in self.data.route_trips_by_stop_sorted(route_key) {
                        let Some(trip) = self.data.trip(trip_id) else {
                            continue;
                        };
                        let dep_at_neighbour = trip.departure_times[stop_index as usize].to_seconds();
                        let Some(depart_source) = dep_at_neighbour.checked_sub(walk_seconds) else {
                            continue;
                        };
                        let depart_source = Time::from_seconds(depart_source);
                        if depart_source >= window_start && depart_source <= window_end {
                            candidates.push(depart_source);
                        }
                    }
                }
            }
        }

        candidates.sort_by_key(|t| t.to_seconds());
        candidates.dedup();

        if candidates.len() > self.config.max_samples {
            log::debug!(
                "dropping {} of {} sampled departures beyond max_samples",
                candidates.len() - self.config.max_samples,
                candidates.len()
            );
            candidates.truncate(self.config.max_samples);
        }
        candidates
    }
}

/// A journey is uniquely identified, for dedup purposes, by the sequence of
/// (depart, arrive, trip-or-walk) tuples its legs trace out — the same
/// underlying ride is often found from more than one sampled departure.
fn journey_signature(journey: &Journey) -> Vec<(u32, u32, Option<u32>)> {
    journey
        .legs
        .iter()
        .map(|leg| match leg {
            Leg::Board {
                trip_id, depart, arrive, ..
            } => (depart.to_seconds(), arrive.to_seconds(), Some(*trip_id)),
            Leg::Walk { depart, arrive, .. } => (depart.to_seconds(), arrive.to_seconds(), None),
        })
        .collect()
}

fn dedup_journeys(journeys: &mut Vec<Journey>) {
    let mut seen = HashSet::new();
    journeys.retain(|j| seen.insert(journey_signature(j)));
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schedule::{Builder, RouteType};

    fn two_departures() -> ScheduleIndex {
        let mut b = Builder::new();
        b.add_stop(0, "A".into(), None, 52.50, 13.40);
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
        b.add_trip(
            1,
            "T1".into(),
            "T1".into(),
            RouteType::Bus,
            "#fff".into(),
            vec![
                (0, Time::from_hms(8, 30, 0), Time::from_hms(8, 30, 0)),
                (1, Time::from_hms(8, 50, 0), Time::from_hms(8, 50, 0)),
            ],
            None,
        );
        b.build()
    }

    #[test]
    fn returns_both_departures_ranked_by_depart_time() {
        let data = two_departures();
        let config = Config::default();
        let rq = RangeQuery::new(&data, &config);
        let journeys = rq
            .find_journeys(0, 1, Time::from_hms(7, 55, 0), Some(3_600))
            .unwrap();
        assert_eq!(journeys.len(), 2);
        assert_eq!(journeys[0].depart, Time::from_hms(8, 0, 0));
        assert_eq!(journeys[1].depart, Time::from_hms(8, 30, 0));
    }

    #[test]
    fn unknown_source_is_an_error() {
        let data = two_departures();
        let config = Config::default();
        let rq = RangeQuery::new(&data, &config);
        let err = rq
            .find_journeys(99, 1, Time::from_hms(7, 55, 0), None)
            .unwrap_err();
        assert_eq!(err, EngineError::InvalidStop(99));
    }

    #[test]
    fn dedup_collapses_identical_rides_from_distinct_samples() {
        let mut signatures = HashSet::new();
        let sig = vec![(100u32, 200u32, Some(1u32))];
        assert!(signatures.insert(sig.clone()));
        assert!(!signatures.insert(sig));
    }
}
