use thiserror::Error;

/// Errors the host-facing API surfaces (spec §7). `NoJourney` and timeout
/// are not represented here — an exhausted or deadline-cut search still
/// returns `Ok(vec![])`/`Ok(partial_results)`.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("unknown stop id {0}")]
    InvalidStop(u32),
    #[error("failed to load GTFS feed: {0}")]
    Load(#[from] LoadError),
    #[error("corrupt schedule index: {0}")]
    CorruptIndex(String),
}

/// Failures specific to parsing and building a Schedule Index from a GTFS
/// directory.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("reading {table}: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },
    #[error("{0}")]
    Time(#[from] engine::time::TimeParseError),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl From<engine::EngineError> for CoreError {
    fn from(err: engine::EngineError) -> CoreError {
        match err {
            engine::EngineError::InvalidStop(id) => CoreError::InvalidStop(id),
            engine::EngineError::CorruptIndex(msg) => CoreError::CorruptIndex(msg),
        }
    }
}
