//! Materialises the [`RawLeg`] sequence a [`RaptorWorker`] produces into the
//! human-readable [`Journey`] shape the host crate serialises (spec §6).

use crate::error::{EngineError, EngineResult};
use crate::geo::haversine_distance_m;
use crate::raptor::RawLeg;
use crate::schedule::{RouteKey, RouteType, ScheduleIndex, StopId, TripId};
use crate::time::{Duration, Time};

/// One leg of a materialised journey: either riding a vehicle or walking a
/// footpath. Tagged rather than an object hierarchy, matching the rest of
/// the engine's data model (spec §3/§6).
#[derive(Debug, Clone, PartialEq)]
pub enum Leg {
    Board {
        from_stop: StopId,
        to_stop: StopId,
        from_stop_name: String,
        to_stop_name: String,
        route_key: RouteKey,
        route_id: String,
        route_short_name: String,
        route_type: RouteType,
        trip_id: TripId,
        depart: Time,
        arrive: Time,
        /// Sub-polyline of the trip's shape between the boarding and
        /// alighting stops' nearest projected points, if the trip has one.
        shape: Option<Vec<(f64, f64)>>,
    },
    Walk {
        from_stop: StopId,
        to_stop: StopId,
        from_stop_name: String,
        to_stop_name: String,
        depart: Time,
        arrive: Time,
    },
}

impl Leg {
    pub fn depart(&self) -> Time {
        match self {
            Leg::Board { depart, .. } => *depart,
            Leg::Walk { depart, .. } => *depart,
        }
    }

    pub fn arrive(&self) -> Time {
        match self {
            Leg::Board { arrive, .. } => *arrive,
            Leg::Walk { arrive, .. } => *arrive,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Journey {
    pub depart: Time,
    pub arrive: Time,
    pub legs: Vec<Leg>,
}

impl Journey {
    pub fn duration(&self) -> Duration {
        self.arrive - self.depart
    }

    pub fn transfer_count(&self) -> usize {
        self.legs
            .iter()
            .filter(|l| matches!(l, Leg::Board { .. }))
            .count()
            .saturating_sub(1)
    }
}

/// Turns a reconstructed leg chain into a [`Journey`]. `Ok(None)` for an
/// empty leg chain (a genuine, non-fatal "no journey"). `Err(CorruptIndex)`
/// if a leg references a stop, route or trip no longer present in `data` —
/// a RAPTOR worker only ever reconstructs ids it read out of `data` itself,
/// so a lookup failure here means the index violates its own invariants
/// (spec §7: "any internal invariant violation ⇒ fatal").
pub fn materialize(data: &ScheduleIndex, legs: &[RawLeg]) -> EngineResult<Option<Journey>> {
    if legs.is_empty() {
        return Ok(None);
    }
    let depart = legs[0].depart();
    let arrive = legs[legs.len() - 1].arrive();

    let corrupt = |what: &str, id: u32| EngineError::CorruptIndex(format!("{what} {id} not found"));

    let mut out = Vec::with_capacity(legs.len());
    for leg in legs {
        let from_stop_name = data
            .stop(leg.from_stop())
            .ok_or_else(|| corrupt("stop", leg.from_stop()))?
            .name
            .clone();
        let to_stop_name = data
            .stop(leg.to_stop())
            .ok_or_else(|| corrupt("stop", leg.to_stop()))?
            .name
            .clone();
        let materialised = match *leg {
            RawLeg::Board {
                from_stop,
                to_stop,
                trip_id,
                route_key,
                board_index,
                alight_index,
                depart,
                arrive,
            } => {
                let route = data.route(route_key).ok_or_else(|| corrupt("route", route_key))?;
                let trip = data.trip(trip_id).ok_or_else(|| corrupt("trip", trip_id))?;
                let shape = trip.shape_ref.and_then(|shape_id| {
                    slice_shape(data, shape_id, board_index, alight_index, from_stop, to_stop)
                });
                Leg::Board {
                    from_stop,
                    to_stop,
                    from_stop_name,
                    to_stop_name,
                    route_key,
                    route_id: route.gtfs_route_id.clone(),
                    route_short_name: route.short_name.clone(),
                    route_type: route.route_type,
                    trip_id,
                    depart,
                    arrive,
                    shape,
                }
            }
            RawLeg::Walk {
                from_stop,
                to_stop,
                depart,
                arrive,
            } => Leg::Walk {
                from_stop,
                to_stop,
                from_stop_name,
                to_stop_name,
                depart,
                arrive,
            },
        };
        out.push(materialised);
    }

    Ok(Some(Journey {
        depart,
        arrive,
        legs: out,
    }))
}

/// Slices a trip's shape between the boarding and alighting stops' nearest
/// projected points. `_board_index`/`_alight_index` identify the stop
/// sequence position, used only to keep the call site self-documenting;
/// the projection itself is purely geometric (GTFS shapes don't carry a
/// per-stop index into the polyline).
fn slice_shape(
    data: &ScheduleIndex,
    shape_id: u32,
    _board_index: u32,
    _alight_index: u32,
    board_stop: StopId,
    alight_stop: StopId,
) -> Option<Vec<(f64, f64)>> {
    let shape = data.shape(shape_id)?;
    if shape.len() < 2 {
        return None;
    }
    let board_coords = data.stop(board_stop)?.coords();
    let alight_coords = data.stop(alight_stop)?.coords();
    let i = nearest_point_index(shape, board_coords);
    let j = nearest_point_index(shape, alight_coords);
    if i >= j {
        return None;
    }
    Some(shape[i..=j].to_vec())
}

fn nearest_point_index(shape: &[(f64, f64)], point: (f64, f64)) -> usize {
    shape
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            haversine_distance_m(**a, point)
                .partial_cmp(&haversine_distance_m(**b, point))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::schedule::{Builder, RouteType};

    fn simple_board_leg() -> (ScheduleIndex, Vec<RawLeg>) {
        let mut b = Builder::new();
        b.add_stop(0, "A".into(), None, 52.50, 13.40);
        b.add_stop(1, "B".into(), None, 52.52, 13.42);
        b.add_shape(7, vec![(52.50, 13.40), (52.51, 13.41), (52.52, 13.42)]);
        b.add_trip(
            0,
            "T1".into(),
            "Line 1".into(),
            RouteType::Bus,
            "#336699".into(),
            vec![
                (0, Time::from_hms(8, 0, 0), Time::from_hms(8, 0, 0)),
                (1, Time::from_hms(8, 20, 0), Time::from_hms(8, 20, 0)),
            ],
            Some(7),
        );
        let data = b.build();
        let legs = vec![RawLeg::Board {
            from_stop: 0,
            to_stop: 1,
            trip_id: 0,
            route_key: 0,
            board_index: 0,
            alight_index: 1,
            depart: Time::from_hms(8, 0, 0),
            arrive: Time::from_hms(8, 20, 0),
        }];
        (data, legs)
    }

    #[test]
    fn materializes_names_and_shape() {
        let (data, legs) = simple_board_leg();
        let journey = materialize(&data, &legs).unwrap().unwrap();
        assert_eq!(journey.depart, Time::from_hms(8, 0, 0));
        assert_eq!(journey.arrive, Time::from_hms(8, 20, 0));
        assert_eq!(journey.transfer_count(), 0);
        match &journey.legs[0] {
            Leg::Board {
                from_stop_name,
                to_stop_name,
                route_short_name,
                shape,
                ..
            } => {
                assert_eq!(from_stop_name, "A");
                assert_eq!(to_stop_name, "B");
                assert_eq!(route_short_name, "Line 1");
                assert!(shape.is_some());
            }
            Leg::Walk { .. } => panic!("expected a board leg"),
        }
    }

    #[test]
    fn empty_legs_yield_no_journey() {
        let (data, _) = simple_board_leg();
        assert!(materialize(&data, &[]).unwrap().is_none());
    }
}
