//! Host-facing entry point: loads a GTFS feed into a queryable Schedule
//! Index and answers journey queries against it (spec §6).

pub mod error;
pub mod gtfs;
pub mod lifecycle;
pub mod wire;

pub use error::CoreError;
pub use gtfs::DayFilter;
pub use lifecycle::{LifecycleManager, SyncComplete};
pub use wire::{JourneyWire, LegWire};

use std::collections::HashMap;
use std::path::PathBuf;

use engine::range_query::RangeQuery;
use engine::{StopId, Time};

/// The handle a host process keeps open for the lifetime of one loaded
/// feed. Wraps the [`LifecycleManager`]'s atomic snapshot reference and
/// exposes the two operations spec §6 names.
pub struct TransitCore {
    lifecycle: LifecycleManager,
}

impl TransitCore {
    /// Loads `gtfs_dir` for the hour-of-day `window_hour` (spec §3
    /// "Lifecycle": `[hour-1h, hour+4h]`).
    pub fn load(
        gtfs_dir: impl Into<PathBuf>,
        day_filter: DayFilter,
        route_colors: HashMap<String, String>,
        config: engine::Config,
        window_hour: u32,
    ) -> Result<TransitCore, CoreError> {
        let lifecycle = LifecycleManager::load(gtfs_dir.into(), day_filter, route_colors, config, window_hour)?;
        Ok(TransitCore { lifecycle })
    }

    /// `find_journeys(source, target, earliest_dep_hms, window_s, max_transfers)`
    /// from spec §6. `window_s` and `max_transfers` default to the loaded
    /// config's `window_seconds`/`max_rounds` when `None`.
    pub fn find_journeys(
        &self,
        source: StopId,
        target: StopId,
        earliest_dep_hms: &str,
        window_s: Option<i64>,
        max_transfers: Option<usize>,
    ) -> Result<Vec<JourneyWire>, CoreError> {
        let t0: Time = earliest_dep_hms
            .parse()
            .map_err(|e| CoreError::Load(error::LoadError::Time(e)))?;

        let snapshot = self.lifecycle.snapshot();
        let mut query_config = *self.lifecycle.config();
        if let Some(k) = max_transfers {
            query_config.max_rounds = k;
        }

        let range_query = RangeQuery::new(&snapshot, &query_config);
        let journeys = range_query.find_journeys(source, target, t0, window_s)?;
        Ok(journeys.iter().map(|j| wire::to_wire(&snapshot, j)).collect())
    }

    /// `refresh(now)` from spec §6, triggered by the host on a schedule.
    /// `now_hour` is the hour-of-day (0..24) to recompute the window for.
    pub fn refresh(&self, now_hour: u32) -> Result<SyncComplete, CoreError> {
        self.lifecycle.refresh(now_hour)
    }
}
