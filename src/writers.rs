use std::io::Write;

use anyhow::Result as AnyhowResult;
use serde::Serialize;

/// Generic output sink, one item at a time, returning the number of records
/// written — a narrow generic output-sink trait, scoped to this crate's
/// single record type.
pub trait OutWriter<T> {
    fn write(&mut self, item: T) -> AnyhowResult<u64>;
}

/// Per-reference record counts, emitted by the `count`/`stats` subcommands
/// (SPEC_FULL.md's ambient-stack addition, grounded in
/// `openge/src/commands/command_count.cpp`'s per-chromosome tally).
#[derive(Debug, Default, Serialize)]
pub struct Stats {
    pub total_records: u64,
    pub mapped: u64,
    pub unmapped: u64,
    pub duplicates: u64,
    pub per_reference: Vec<(String, u64)>,
}

pub struct JsonStatsWriter<W: Write> {
    out: W,
}

impl<W: Write> JsonStatsWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> OutWriter<&Stats> for JsonStatsWriter<W> {
    fn write(&mut self, item: &Stats) -> AnyhowResult<u64> {
        serde_json::to_writer_pretty(&mut self.out, item)?;
        self.out.write_all(b"\n")?;
        Ok(1)
    }
}
