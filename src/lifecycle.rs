//! Lifecycle Manager (spec §4.5): holds the current Schedule Index behind
//! an atomic reference and refreshes it on demand.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use engine::schedule::ScheduleIndex;
use engine::time::Time;

use crate::error::CoreError;
use crate::gtfs::DayFilter;

/// Emitted after a successful refresh (spec §4.5).
#[derive(Debug, Clone, Copy)]
pub struct SyncComplete {
    pub last_synced_hour: u32,
    pub window_start_s: u32,
    pub window_end_s: u32,
}

/// Holds the single mutable cell in the system: the current Snapshot
/// reference (spec §5 "Shared state"). Readers (`find_journeys` callers)
/// take an `Arc` and run against a stable snapshot for their entire query;
/// a refresh swaps the reference without disturbing in-flight readers.
pub struct LifecycleManager {
    gtfs_dir: PathBuf,
    day_filter: DayFilter,
    route_colors: HashMap<String, String>,
    config: engine::Config,
    current: ArcSwap<ScheduleIndex>,
}

impl LifecycleManager {
    /// Performs the initial load for `window_hour` (an hour-of-day, 0..24)
    /// before returning, so there is never a gap between constructing a
    /// manager and having a queryable snapshot.
    pub fn load(
        gtfs_dir: PathBuf,
        day_filter: DayFilter,
        route_colors: HashMap<String, String>,
        config: engine::Config,
        window_hour: u32,
    ) -> Result<LifecycleManager, CoreError> {
        let (window_start, window_end) = Self::window_for_hour(window_hour);
        let (index, report) = crate::gtfs::loader::load(
            &gtfs_dir,
            day_filter,
            window_start,
            window_end,
            &route_colors,
            &config,
        )?;
        log::info!(
            "initial load complete: {} stops, {} trips, {} dropped",
            report.stops_loaded,
            report.trips_loaded,
            report.dropped_trips
        );
        Ok(LifecycleManager {
            gtfs_dir,
            day_filter,
            route_colors,
            config,
            current: ArcSwap::from_pointee(index),
        })
    }

    /// `[hour-1, hour+4]` in seconds since service midnight (spec §3
    /// "Lifecycle"), expressed as GTFS-style possibly-past-midnight values
    /// so a window near service midnight doesn't need to wrap.
    fn window_for_hour(hour: u32) -> (Time, Time) {
        let start_hour = hour.saturating_sub(1);
        let end_hour = hour + 4;
        (Time::from_hms(start_hour, 0, 0), Time::from_hms(end_hour, 0, 0))
    }

    pub fn snapshot(&self) -> Arc<ScheduleIndex> {
        self.current.load_full()
    }

    pub fn config(&self) -> &engine::Config {
        &self.config
    }

    /// Reloads the feed for `window_hour` and swaps it in only on success
    /// (spec §4.5 "Failures to load MUST NOT replace the current snapshot").
    pub fn refresh(&self, window_hour: u32) -> Result<SyncComplete, CoreError> {
        let (window_start, window_end) = Self::window_for_hour(window_hour);
        match crate::gtfs::loader::load(
            &self.gtfs_dir,
            self.day_filter,
            window_start,
            window_end,
            &self.route_colors,
            &self.config,
        ) {
            Ok((index, report)) => {
                log::info!(
                    "refresh complete for hour {}: {} stops, {} trips",
                    window_hour,
                    report.stops_loaded,
                    report.trips_loaded
                );
                self.current.store(Arc::new(index));
                Ok(SyncComplete {
                    last_synced_hour: window_hour,
                    window_start_s: window_start.to_seconds(),
                    window_end_s: window_end.to_seconds(),
                })
            }
            Err(err) => {
                log::error!("refresh for hour {window_hour} failed, keeping current snapshot: {err}");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn window_for_hour_spans_five_hours() {
        let (start, end) = LifecycleManager::window_for_hour(8);
        assert_eq!(start, Time::from_hms(7, 0, 0));
        assert_eq!(end, Time::from_hms(12, 0, 0));
    }

    #[test]
    fn window_for_hour_zero_does_not_underflow() {
        let (start, _end) = LifecycleManager::window_for_hour(0);
        assert_eq!(start, Time::from_hms(0, 0, 0));
    }
}
