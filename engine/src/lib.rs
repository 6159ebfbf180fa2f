//! Round-based earliest-arrival transit routing over an in-memory schedule
//! index. This crate has no knowledge of GTFS files, HTTP, or any host
//! process lifecycle — it consumes an already-built [`schedule::ScheduleIndex`]
//! and answers journey queries against it.

pub mod config;
pub mod error;
pub mod geo;
pub mod journey;
pub mod raptor;
pub mod range_query;
pub mod schedule;
pub mod time;

pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use journey::{Journey, Leg};
pub use range_query::RangeQuery;
pub use schedule::{Builder, RouteKey, RouteType, ScheduleIndex, Stop, StopId, Trip, TripId};
pub use time::{Duration, Time};
