//! Raw row shapes for the static GTFS tables this loader reads, deserialised
//! straight off the CSV reader. Fields the loader doesn't need are left out;
//! see [https://developers.google.com/transit/gtfs/reference] for the full
//! schema these are excerpted from.

use serde::Deserialize;

pub type GtfsStopId = String;
pub type GtfsRouteId = String;
pub type GtfsTripId = String;
pub type GtfsShapeId = String;
pub type ServiceId = String;

/// `[https://developers.google.com/transit/gtfs/reference#calendartxt]`
#[derive(Debug, Deserialize)]
pub struct Calendar {
    pub service_id: ServiceId,
    pub monday: u8,
    pub tuesday: u8,
    pub wednesday: u8,
    pub thursday: u8,
    pub friday: u8,
    pub saturday: u8,
    pub sunday: u8,
    pub start_date: String,
    pub end_date: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Calendar {
    /// Every weekday this service runs on, per the seven day-of-week flags.
    pub fn days(&self) -> Vec<Weekday> {
        use Weekday::*;
        let flags = [
            (Monday, self.monday),
            (Tuesday, self.tuesday),
            (Wednesday, self.wednesday),
            (Thursday, self.thursday),
            (Friday, self.friday),
            (Saturday, self.saturday),
            (Sunday, self.sunday),
        ];
        flags.into_iter().filter(|(_, on)| *on > 0).map(|(d, _)| d).collect()
    }
}

/// `[https://developers.google.com/transit/gtfs/reference#routestxt]`
#[derive(Debug, Deserialize)]
pub struct Route {
    pub route_id: GtfsRouteId,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    #[serde(with = "route_type_format")]
    pub route_type: engine::RouteType,
    pub route_color: Option<String>,
}

/// `[https://developers.google.com/transit/gtfs/reference#tripstxt]`
#[derive(Debug, Deserialize)]
pub struct Trip {
    pub route_id: GtfsRouteId,
    pub service_id: ServiceId,
    pub trip_id: GtfsTripId,
    pub shape_id: Option<GtfsShapeId>,
}

/// `[https://developers.google.com/transit/gtfs/reference#stop_timestxt]`
#[derive(Debug, Deserialize)]
pub struct StopTime {
    pub trip_id: GtfsTripId,
    #[serde(with = "crate::gtfs::time_format")]
    pub arrival_time: engine::Time,
    #[serde(with = "crate::gtfs::time_format")]
    pub departure_time: engine::Time,
    pub stop_id: GtfsStopId,
    pub stop_sequence: u32,
}

/// `[https://developers.google.com/transit/gtfs/reference#stopstxt]`
#[derive(Debug, Deserialize, Clone)]
pub struct Stop {
    pub stop_id: GtfsStopId,
    pub stop_name: String,
    pub stop_lat: f64,
    pub stop_lon: f64,
    #[serde(default)]
    pub location_type: Option<u8>,
}

/// `[https://developers.google.com/transit/gtfs/reference#transferstxt]`
#[derive(Debug, Deserialize)]
pub struct Transfer {
    pub from_stop_id: GtfsStopId,
    pub to_stop_id: GtfsStopId,
    #[serde(default)]
    pub min_transfer_time: Option<u32>,
}

/// `[https://developers.google.com/transit/gtfs/reference#shapestxt]`
#[derive(Debug, Deserialize)]
pub struct ShapePoint {
    pub shape_id: GtfsShapeId,
    pub shape_pt_lat: f64,
    pub shape_pt_lon: f64,
    pub shape_pt_sequence: u32,
}

/// Maps the numeric GTFS `route_type` (plus its
/// [extended values](https://developers.google.com/transit/gtfs/reference/extended-route-types))
/// onto [`engine::RouteType`], falling back to `Other` instead of failing
/// the row — unrecognised route types are common in the wild and shouldn't
/// sink an otherwise-good feed.
pub mod route_type_format {
    use engine::RouteType;
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<RouteType, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ordinal = u16::deserialize(deserializer)?;
        Ok(match ordinal {
            2 => RouteType::Rail,
            3 => RouteType::Bus,
            100 => RouteType::RailwayService,
            109 => RouteType::SuburbanRailway,
            400 => RouteType::UrbanRailway,
            700 => RouteType::BusService,
            900 => RouteType::TramService,
            1000 => RouteType::WaterTransportService,
            other => RouteType::Other(other),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn calendar_days_reads_flags() {
        let cal = Calendar {
            service_id: "S1".into(),
            monday: 1,
            tuesday: 0,
            wednesday: 1,
            thursday: 0,
            friday: 0,
            saturday: 0,
            sunday: 0,
            start_date: "20260101".into(),
            end_date: "20261231".into(),
        };
        assert_eq!(cal.days(), vec![Weekday::Monday, Weekday::Wednesday]);
    }
}
