use thiserror::Error;

use crate::schedule::StopId;

/// Errors surfaced by the routing engine. `NoJourney` (spec §7) is
/// deliberately not one of these variants — an exhausted search returns an
/// empty `Vec<Journey>`, not an `Err`.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum EngineError {
    #[error("unknown stop id {0}")]
    InvalidStop(StopId),
    #[error("corrupt schedule index: {0}")]
    CorruptIndex(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
