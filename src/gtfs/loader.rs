//! Builds a [`engine::ScheduleIndex`] from a GTFS feed directory (spec §4.1).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use engine::schedule::{Builder, RouteType, ScheduleIndex, ShapeId, StopId};
use engine::time::Time;
use lasso::Rodeo;

use crate::error::{CoreError, LoadError};
use crate::gtfs::model::{self, Weekday};
use crate::gtfs::{footpath, DayFilter, GTFSSource};

/// Counts of rows dropped during a load, surfaced for observability rather
/// than failing the whole load (spec §4.1 "Errors").
#[derive(Debug, Default, Clone, Copy)]
pub struct LoadReport {
    pub dropped_stop_rows: u32,
    pub dropped_transfer_rows: u32,
    pub dropped_trips: u32,
    pub windowed_out_trips: u32,
    pub stops_loaded: usize,
    pub trips_loaded: usize,
}

struct RouteMeta {
    short_name: String,
    route_type: RouteType,
    color: Option<String>,
}

/// Default display colour for a route type, used when a feed's own
/// `route_color` column is blank or absent.
fn color_for_type(route_type: RouteType) -> &'static str {
    match route_type {
        RouteType::SuburbanRailway | RouteType::UrbanRailway | RouteType::TramService => "lightgray",
        RouteType::Rail | RouteType::RailwayService => "#e2001a",
        RouteType::Bus | RouteType::BusService => "#a01c7d",
        RouteType::WaterTransportService => "#0099d6",
        RouteType::Other(_) => "#888888",
    }
}

/// Loads a Schedule Index from `gtfs_dir`, keeping only trips whose first
/// departure falls in `[window_start, window_end)` (spec §3 "Lifecycle").
pub fn load(
    gtfs_dir: &Path,
    day_filter: DayFilter,
    window_start: Time,
    window_end: Time,
    route_colors: &HashMap<String, String>,
    footpath_config: &engine::Config,
) -> Result<(ScheduleIndex, LoadReport), CoreError> {
    let source = GTFSSource::new(gtfs_dir);
    let mut interner = Rodeo::default();
    let mut report = LoadReport::default();
    let mut builder = Builder::new();

    let services_by_day = load_calendar(&source)?;
    let allowed_services: Option<HashSet<String>> = match day_filter {
        DayFilter::All => None,
        DayFilter::Single(day) => Some(services_by_day.get(&day).cloned().unwrap_or_default()),
    };

    load_stops(&source, &mut interner, &mut builder, &mut report)?;
    let route_meta = load_routes(&source, route_colors)?;
    let trip_routes = load_trips(&source, &allowed_services)?;
    load_shapes(&source, &mut interner, &mut builder)?;
    load_stop_times(&source, &mut interner, &trip_routes, &route_meta, window_start, window_end, &mut builder, &mut report)?;

    let mut index = builder.build();
    footpath::build_footpaths(&mut index, footpath_config);
    if let Some(mut rdr) = source
        .open_csv("transfers.txt")
        .map_err(|source| LoadError::Csv { table: "transfers.txt", source })?
    {
        footpath::apply_transfer_overrides(&mut index, &mut interner, &mut rdr, &mut report);
    }

    report.stops_loaded = index.num_stops();
    log::info!(
        "loaded schedule index: {} stops, {} dropped trips, {} windowed out",
        index.num_stops(),
        report.dropped_trips,
        report.windowed_out_trips
    );
    Ok((index, report))
}

fn load_calendar(source: &GTFSSource) -> Result<HashMap<Weekday, HashSet<String>>, CoreError> {
    let mut services_by_day: HashMap<Weekday, HashSet<String>> = HashMap::new();
    let Some(mut rdr) = source
        .open_csv("calendar.txt")
        .map_err(|source| LoadError::Csv { table: "calendar.txt", source })?
    else {
        return Ok(services_by_day);
    };
    for result in rdr.deserialize::<model::Calendar>() {
        match result {
            Ok(calendar) => {
                for day in calendar.days() {
                    services_by_day.entry(day).or_default().insert(calendar.service_id.clone());
                }
            }
            Err(err) => log::warn!("skipping malformed calendar.txt row: {err}"),
        }
    }
    Ok(services_by_day)
}

fn load_stops(
    source: &GTFSSource,
    interner: &mut Rodeo,
    builder: &mut Builder,
    report: &mut LoadReport,
) -> Result<(), CoreError> {
    let mut rdr = source
        .open_required_csv("stops.txt")
        .map_err(|source| LoadError::Csv { table: "stops.txt", source })?;
    for result in rdr.deserialize::<model::Stop>() {
        match result {
            Ok(stop) => {
                // location_type 3 (generic node) and 4 (boarding area) are
                // pathway plumbing this router doesn't route through.
                if matches!(stop.location_type, Some(3) | Some(4)) {
                    continue;
                }
                let id: StopId = intern(interner, &stop.stop_id);
                builder.add_stop(id, stop.stop_name, None, stop.stop_lat, stop.stop_lon);
            }
            Err(err) => {
                report.dropped_stop_rows += 1;
                log::warn!("skipping malformed stops.txt row: {err}");
            }
        }
    }
    Ok(())
}

fn load_routes(source: &GTFSSource, route_colors: &HashMap<String, String>) -> Result<HashMap<String, RouteMeta>, CoreError> {
    let mut routes = HashMap::new();
    let mut rdr = source
        .open_required_csv("routes.txt")
        .map_err(|source| LoadError::Csv { table: "routes.txt", source })?;
    for result in rdr.deserialize::<model::Route>() {
        match result {
            Ok(route) => {
                let short_name = route
                    .route_short_name
                    .or(route.route_long_name)
                    .unwrap_or_else(|| route.route_id.clone());
                let color = route_colors.get(&short_name).cloned().or(route.route_color);
                routes.insert(
                    route.route_id,
                    RouteMeta {
                        short_name,
                        route_type: route.route_type,
                        color,
                    },
                );
            }
            Err(err) => log::warn!("skipping malformed routes.txt row: {err}"),
        }
    }
    Ok(routes)
}

struct TripMeta {
    gtfs_route_id: String,
    shape_id: Option<String>,
}

fn load_trips(source: &GTFSSource, allowed_services: &Option<HashSet<String>>) -> Result<HashMap<String, TripMeta>, CoreError> {
    let mut trips = HashMap::new();
    let mut rdr = source
        .open_required_csv("trips.txt")
        .map_err(|source| LoadError::Csv { table: "trips.txt", source })?;
    for result in rdr.deserialize::<model::Trip>() {
        match result {
            Ok(trip) => {
                if let Some(allowed) = allowed_services {
                    if !allowed.contains(&trip.service_id) {
                        continue;
                    }
                }
                trips.insert(
                    trip.trip_id,
                    TripMeta {
                        gtfs_route_id: trip.route_id,
                        shape_id: trip.shape_id,
                    },
                );
            }
            Err(err) => log::warn!("skipping malformed trips.txt row: {err}"),
        }
    }
    Ok(trips)
}

fn load_shapes(source: &GTFSSource, interner: &mut Rodeo, builder: &mut Builder) -> Result<(), CoreError> {
    let Some(mut rdr) = source
        .open_csv("shapes.txt")
        .map_err(|source| LoadError::Csv { table: "shapes.txt", source })?
    else {
        return Ok(());
    };
    let mut points: HashMap<String, Vec<(u32, f64, f64)>> = HashMap::new();
    for result in rdr.deserialize::<model::ShapePoint>() {
        match result {
            Ok(pt) => points
                .entry(pt.shape_id)
                .or_default()
                .push((pt.shape_pt_sequence, pt.shape_pt_lat, pt.shape_pt_lon)),
            Err(err) => log::warn!("skipping malformed shapes.txt row: {err}"),
        }
    }
    for (shape_id, mut pts) in points {
        pts.sort_by_key(|(seq, _, _)| *seq);
        let id: ShapeId = intern(interner, &shape_id);
        builder.add_shape(id, pts.into_iter().map(|(_, lat, lon)| (lat, lon)).collect());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn load_stop_times(
    source: &GTFSSource,
    interner: &mut Rodeo,
    trip_routes: &HashMap<String, TripMeta>,
    route_meta: &HashMap<String, RouteMeta>,
    window_start: Time,
    window_end: Time,
    builder: &mut Builder,
    report: &mut LoadReport,
) -> Result<(), CoreError> {
    let mut rdr = source
        .open_required_csv("stop_times.txt")
        .map_err(|source| LoadError::Csv { table: "stop_times.txt", source })?;

    let mut by_trip: HashMap<String, Vec<(u32, StopId, Time, Time)>> = HashMap::new();
    for result in rdr.deserialize::<model::StopTime>() {
        match result {
            Ok(st) => {
                if !trip_routes.contains_key(&st.trip_id) {
                    continue;
                }
                let stop_id: StopId = intern(interner, &st.stop_id);
                by_trip.entry(st.trip_id).or_default().push((
                    st.stop_sequence,
                    stop_id,
                    st.arrival_time,
                    st.departure_time,
                ));
            }
            Err(err) => log::warn!("skipping malformed stop_times.txt row: {err}"),
        }
    }

    let mut next_trip_id: u32 = 0;
    for (gtfs_trip_id, mut rows) in by_trip {
        rows.sort_by_key(|(seq, ..)| *seq);
        let Some(first) = rows.first() else { continue };
        if first.3 < window_start || first.3 >= window_end {
            report.windowed_out_trips += 1;
            continue;
        }
        let Some(meta) = trip_routes.get(&gtfs_trip_id) else { continue };
        let route = route_meta.get(&meta.gtfs_route_id);
        let short_name = route.map(|r| r.short_name.clone()).unwrap_or_else(|| meta.gtfs_route_id.clone());
        let route_type = route.map(|r| r.route_type).unwrap_or(RouteType::Other(0));
        let color = route
            .and_then(|r| r.color.clone())
            .unwrap_or_else(|| color_for_type(route_type).to_string());
        let shape_ref = meta.shape_id.as_ref().map(|id| intern(interner, id));

        let stop_times: Vec<(StopId, Time, Time)> = rows.into_iter().map(|(_, stop, arr, dep)| (stop, arr, dep)).collect();
        let trip_id = next_trip_id;
        next_trip_id += 1;
        let ok = builder.add_trip(trip_id, meta.gtfs_route_id.clone(), short_name, route_type, color, stop_times, shape_ref);
        if ok {
            report.trips_loaded += 1;
        } else {
            report.dropped_trips += 1;
        }
    }
    Ok(())
}

fn intern(interner: &mut Rodeo, s: &str) -> u32 {
    interner.get_or_intern(s).into_inner().get()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;

    fn write_feed(dir: &std::path::Path) {
        std::fs::write(
            dir.join("stops.txt"),
            "stop_id,stop_name,stop_lat,stop_lon,location_type\n\
             A,Stop A,52.50,13.40,0\n\
             B,Stop B,52.52,13.42,0\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("routes.txt"),
            "route_id,route_short_name,route_type,route_color\n\
             R1,1,3,#336699\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("trips.txt"),
            "route_id,service_id,trip_id,shape_id\n\
             R1,S1,T1,\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("stop_times.txt"),
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,08:00:00,08:00:00,A,1\n\
             T1,08:20:00,08:20:00,B,2\n",
        )
        .unwrap();
        let mut cal = std::fs::File::create(dir.join("calendar.txt")).unwrap();
        writeln!(cal, "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date").unwrap();
        writeln!(cal, "S1,1,1,1,1,1,0,0,20260101,20261231").unwrap();
    }

    #[test]
    fn loads_a_minimal_feed() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        let config = engine::Config::default();
        let (index, report) = load(
            dir.path(),
            DayFilter::All,
            Time::from_hms(0, 0, 0),
            Time::from_hms(23, 59, 59),
            &HashMap::new(),
            &config,
        )
        .unwrap();
        assert_eq!(index.num_stops(), 3); // interned ids start at 1
        assert_eq!(report.dropped_trips, 0);
        assert_eq!(report.windowed_out_trips, 0);
    }

    #[test]
    fn window_filter_drops_trips_outside_the_window() {
        let dir = tempfile::tempdir().unwrap();
        write_feed(dir.path());
        let config = engine::Config::default();
        let (_index, report) = load(
            dir.path(),
            DayFilter::All,
            Time::from_hms(9, 0, 0),
            Time::from_hms(10, 0, 0),
            &HashMap::new(),
            &config,
        )
        .unwrap();
        assert_eq!(report.windowed_out_trips, 1);
    }
}
