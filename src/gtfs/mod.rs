//! Static GTFS table access: raw row models, the `time_format` serde helper
//! that parses GTFS's `H:MM:SS` (not plain RFC clock time), and a thin
//! `GTFSSource` over a feed directory.

pub mod footpath;
pub mod loader;
pub mod model;

use std::path::{Path, PathBuf};

pub use model::{Calendar, Route, ShapePoint, Stop, StopTime, Transfer, Trip, Weekday};

/// Parses/formats GTFS's `[H]H:MM:SS` time-of-day, which is not the same
/// grammar as RFC 3339 clock time (it allows hours past 23 for trips that
/// run past midnight) — see [`engine::time::Time`]'s `FromStr` impl.
pub mod time_format {
    use engine::Time;
    use serde::{de, Deserializer};
    use std::fmt;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Time, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(TimeVisitor)
    }

    struct TimeVisitor;

    impl<'de> de::Visitor<'de> for TimeVisitor {
        type Value = Time;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a GTFS time formatted eg. \"8:03:00\" or \"25:10:00\"")
        }

        fn visit_str<E>(self, s: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            s.parse().map_err(de::Error::custom)
        }
    }
}

/// Which service days a load should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayFilter {
    All,
    Single(Weekday),
}

impl std::fmt::Display for DayFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DayFilter::All => f.write_str("all"),
            DayFilter::Single(day) => write!(f, "{:?}", day),
        }
    }
}

/// `DayFilter::Single` for the current local weekday — the common case for
/// a host that reloads its feed against "today"'s service.
pub fn day_filter_for_today() -> DayFilter {
    use chrono::Datelike;
    let today = match chrono::Local::now().weekday() {
        chrono::Weekday::Mon => Weekday::Monday,
        chrono::Weekday::Tue => Weekday::Tuesday,
        chrono::Weekday::Wed => Weekday::Wednesday,
        chrono::Weekday::Thu => Weekday::Thursday,
        chrono::Weekday::Fri => Weekday::Friday,
        chrono::Weekday::Sat => Weekday::Saturday,
        chrono::Weekday::Sun => Weekday::Sunday,
    };
    DayFilter::Single(today)
}

/// A directory of static GTFS text tables.
pub struct GTFSSource {
    dir_path: PathBuf,
}

impl GTFSSource {
    pub fn new(dir_path: impl AsRef<Path>) -> GTFSSource {
        GTFSSource {
            dir_path: dir_path.as_ref().to_path_buf(),
        }
    }

    /// Opens `filename` for streaming CSV deserialisation. Returns `Ok(None)`
    /// for optional tables (`shapes.txt`, `transfers.txt`) that are simply
    /// absent from this feed.
    pub fn open_csv(&self, filename: &str) -> Result<Option<csv::Reader<std::fs::File>>, csv::Error> {
        let path = self.dir_path.join(filename);
        if !path.exists() {
            return Ok(None);
        }
        log::debug!("opening {}", path.display());
        Ok(Some(csv::Reader::from_path(path)?))
    }

    /// Opens a required table, surfacing the missing-file case as an error
    /// rather than silently treating it as empty.
    pub fn open_required_csv(&self, filename: &str) -> Result<csv::Reader<std::fs::File>, csv::Error> {
        let path = self.dir_path.join(filename);
        log::debug!("opening {}", path.display());
        csv::Reader::from_path(path)
    }
}
