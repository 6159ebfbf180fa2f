//! Footpath Builder (spec §4.2): within-radius walking connections between
//! stops, overridable by a feed's `transfers.txt`.

use engine::schedule::{add_symmetric_footpath, ScheduleIndex, StopId};
use lasso::Rodeo;

use crate::gtfs::model;
use crate::gtfs::loader::LoadReport;

/// Populates every stop's footpaths with its within-radius neighbours.
/// Quadratic in stop count, which is acceptable given the window filter
/// keeps a snapshot's stop count bounded (spec §5 "Resource limits").
pub fn build_footpaths(index: &mut ScheduleIndex, config: &engine::Config) {
    let coords: Vec<(StopId, (f64, f64))> = index.stops().map(|s| (s.id, s.coords())).collect();
    let mut pairs = Vec::new();
    for i in 0..coords.len() {
        for j in (i + 1)..coords.len() {
            let (a, a_coords) = coords[i];
            let (b, b_coords) = coords[j];
            let distance_m = engine::geo::haversine_distance_m(a_coords, b_coords);
            if distance_m <= config.footpath_radius_m {
                let seconds = (distance_m / config.walking_speed_mps).round() as i64;
                let clamped = seconds.clamp(config.min_transfer.to_secs(), config.max_transfer.to_secs());
                pairs.push((a, b, clamped.max(0) as u32));
            }
        }
    }
    let stops = index.stops_mut();
    for (a, b, walk_seconds) in pairs {
        add_symmetric_footpath(stops, a, b, walk_seconds);
    }
}

/// Applies `transfers.txt` overrides on top of the computed footpaths.
/// Unknown stop ids (rows that refer to a stop the loader dropped or never
/// saw) are skipped with a counted warning rather than failing the load.
pub fn apply_transfer_overrides(
    index: &mut ScheduleIndex,
    interner: &mut Rodeo,
    rdr: &mut csv::Reader<std::fs::File>,
    report: &mut LoadReport,
) {
    for result in rdr.deserialize::<model::Transfer>() {
        match result {
            Ok(transfer) => {
                let Some(walk_seconds) = transfer.min_transfer_time else {
                    continue;
                };
                let from: StopId = interner.get_or_intern(&transfer.from_stop_id).into_inner().get();
                let to: StopId = interner.get_or_intern(&transfer.to_stop_id).into_inner().get();
                if index.stop(from).is_none() || index.stop(to).is_none() {
                    report.dropped_transfer_rows += 1;
                    continue;
                }
                add_symmetric_footpath(index.stops_mut(), from, to, walk_seconds);
            }
            Err(err) => {
                report.dropped_transfer_rows += 1;
                log::warn!("skipping malformed transfers.txt row: {err}");
            }
        }
    }
}
