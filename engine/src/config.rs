use crate::time::Duration;

/// Tunables for the footpath builder, RAPTOR worker and range query
/// orchestrator. All defaults are the ones named in the spec.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    /// K: maximum number of vehicle boardings a journey may use.
    pub max_rounds: usize,
    /// Minimum dwell time enforced between alighting and the next boarding.
    pub board_buffer: Duration,
    /// Footpaths are only generated between stops within this radius.
    pub footpath_radius_m: f64,
    /// Assumed walking speed used to turn footpath distance into duration.
    pub walking_speed_mps: f64,
    /// Footpath durations are clamped to at least this many seconds.
    pub min_transfer: Duration,
    /// Footpath durations are clamped to at most this many seconds.
    pub max_transfer: Duration,
    /// Width of the range-query departure sampling window, in seconds.
    pub window_seconds: i64,
    /// Maximum number of sampled departures considered by a range query.
    pub max_samples: usize,
    /// Overall wall-clock deadline for a range query.
    pub deadline: std::time::Duration,
    /// Number of ranked journeys returned by a range query.
    pub top_n: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_rounds: 5,
            board_buffer: Duration::seconds(60),
            footpath_radius_m: 500.0,
            walking_speed_mps: 1.3,
            min_transfer: Duration::seconds(60),
            max_transfer: Duration::seconds(1_200),
            window_seconds: 3_600,
            max_samples: 100,
            deadline: std::time::Duration::from_secs(10),
            top_n: 10,
        }
    }
}
