//! Looks up journeys between two stop ids in a loaded GTFS feed and prints
//! them as JSON. Not part of the published library surface; a thin
//! stand-in for the HTTP layer a real host would put in front of it.
//!
//! ```text
//! GTFS_DIR=./fixtures/vbb cargo run --bin query -- 12345 67890 08:00:00
//! ```

use std::collections::HashMap;
use std::path::Path;

use transit_core::{DayFilter, TransitCore};

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let source: u32 = args
        .next()
        .expect("usage: query <source-stop-id> <target-stop-id> <earliest-dep HH:MM:SS>")
        .parse()
        .expect("source stop id must be a u32");
    let target: u32 = args
        .next()
        .expect("missing target stop id")
        .parse()
        .expect("target stop id must be a u32");
    let earliest_dep = args.next().unwrap_or_else(|| "08:00:00".to_string());

    let gtfs_dir = std::env::var("GTFS_DIR").unwrap_or_else(|_| "gtfs".to_owned());
    let window_hour: u32 = earliest_dep
        .split(':')
        .next()
        .and_then(|h| h.parse().ok())
        .unwrap_or(8);

    let core = TransitCore::load(
        Path::new(&gtfs_dir),
        DayFilter::All,
        HashMap::new(),
        engine::Config::default(),
        window_hour,
    )
    .expect("failed to load GTFS feed");

    let journeys = core
        .find_journeys(source, target, &earliest_dep, None, None)
        .expect("query failed");

    println!("{}", serde_json::to_string_pretty(&journeys).unwrap());
}
