//! The journey leg wire format the surrounding HTTP layer consumes (spec
//! §6). Kept separate from [`engine::Journey`] so the engine's internal
//! representation is free to change without touching callers of the core.

use engine::schedule::ScheduleIndex;
use engine::{Journey, Leg};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegWire {
    #[serde(rename = "FromStopId")]
    pub from_stop_id: u32,
    #[serde(rename = "FromStop")]
    pub from_stop: String,
    #[serde(rename = "FromStopCoords")]
    pub from_stop_coords: Coords,
    #[serde(rename = "ToStopId")]
    pub to_stop_id: u32,
    #[serde(rename = "ToStop")]
    pub to_stop: String,
    #[serde(rename = "ToStopCoords")]
    pub to_stop_coords: Coords,
    #[serde(rename = "DepartureTime")]
    pub departure_time: String,
    #[serde(rename = "ArrivalTime")]
    pub arrival_time: String,
    #[serde(rename = "RouteId")]
    pub route_id: String,
    #[serde(rename = "RouteLongId")]
    pub route_long_id: String,
    #[serde(rename = "Shape", skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<[f64; 2]>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JourneyWire {
    pub legs: Vec<LegWire>,
}

pub fn to_wire(data: &ScheduleIndex, journey: &Journey) -> JourneyWire {
    let legs = journey
        .legs
        .iter()
        .map(|leg| match leg {
            Leg::Board {
                from_stop,
                to_stop,
                from_stop_name,
                to_stop_name,
                route_id,
                route_short_name,
                depart,
                arrive,
                shape,
                ..
            } => LegWire {
                from_stop_id: *from_stop,
                from_stop: from_stop_name.clone(),
                from_stop_coords: coords_of(data, *from_stop),
                to_stop_id: *to_stop,
                to_stop: to_stop_name.clone(),
                to_stop_coords: coords_of(data, *to_stop),
                departure_time: depart.to_canonical_hms(),
                arrival_time: arrive.to_canonical_hms(),
                route_id: route_id.clone(),
                route_long_id: route_short_name.clone(),
                shape: shape.as_ref().map(|pts| pts.iter().map(|&(lat, lon)| [lat, lon]).collect()),
            },
            Leg::Walk {
                from_stop,
                to_stop,
                from_stop_name,
                to_stop_name,
                depart,
                arrive,
            } => LegWire {
                from_stop_id: *from_stop,
                from_stop: from_stop_name.clone(),
                from_stop_coords: coords_of(data, *from_stop),
                to_stop_id: *to_stop,
                to_stop: to_stop_name.clone(),
                to_stop_coords: coords_of(data, *to_stop),
                departure_time: depart.to_canonical_hms(),
                arrival_time: arrive.to_canonical_hms(),
                route_id: String::new(),
                route_long_id: String::new(),
                shape: None,
            },
        })
        .collect();
    JourneyWire { legs }
}

fn coords_of(data: &ScheduleIndex, stop: u32) -> Coords {
    data.stop(stop)
        .map(|s| Coords { lat: s.lat, lon: s.lon })
        .unwrap_or(Coords { lat: 0.0, lon: 0.0 })
}

#[cfg(test)]
mod test {
    use super::*;
    use engine::schedule::Builder;
    use engine::Time;

    #[test]
    fn walk_leg_has_empty_route_fields() {
        let mut b = Builder::new();
        b.add_stop(0, "A".into(), None, 52.5, 13.4);
        b.add_stop(1, "B".into(), None, 52.51, 13.41);
        let data = b.build();
        let journey = Journey {
            depart: Time::from_hms(8, 0, 0),
            arrive: Time::from_hms(8, 5, 0),
            legs: vec![Leg::Walk {
                from_stop: 0,
                to_stop: 1,
                from_stop_name: "A".into(),
                to_stop_name: "B".into(),
                depart: Time::from_hms(8, 0, 0),
                arrive: Time::from_hms(8, 5, 0),
            }],
        };
        let wire = to_wire(&data, &journey);
        assert_eq!(wire.legs[0].route_id, "");
        assert_eq!(wire.legs[0].departure_time, "08:00:00");
    }
}
