use crossbeam_channel::{Receiver, Sender};
use log::error;

use crate::errs::EngineResult;
use crate::record::AlignmentRecord;

/// Soft upper bound on in-flight records per inter-stage edge. Producers
/// block on `send` once a channel is full; this is a memory knob, not a
/// correctness property.
pub const DEFAULT_QUEUE_BOUND: usize = 6000;

pub type RecordTx = Sender<AlignmentRecord>;
pub type RecordRx = Receiver<AlignmentRecord>;

pub fn new_edge(bound: usize) -> (RecordTx, RecordRx) {
    crossbeam_channel::bounded(bound)
}

/// A runnable pipeline node. Each concrete stage owns its wired-up input
/// receiver(s) and output sender(s) before `run` is called; `add_sink`-style
/// wiring happens at construction time instead of through a mutable graph,
/// since Rust's channels make the producer/consumer relationship explicit
/// rather than something to traverse at run time.
pub trait Stage: Send {
    fn name(&self) -> &'static str;
    fn run(self: Box<Self>) -> EngineResult<()>;
}

/// Forwards one record to a stage's sinks: the first sink receives the
/// original record, every other sink receives a deep clone, and an empty
/// sink list silently drops (releases) the record — Rust's ownership model
/// makes that drop automatic, so no explicit "sink of last resort" stage is
/// needed the way the C++ original required one.
pub fn fan_out(record: AlignmentRecord, sinks: &[RecordTx]) -> EngineResult<()> {
    let Some((first, rest)) = sinks.split_first() else {
        return Ok(());
    };
    for sink in rest {
        // A `send` failure here means that sink's stage exited early (e.g. a
        // filter stage already hit its count limit); that's not a pipeline
        // error, just a shorter chain, so it's ignored like the other
        // sinks' exits.
        let _ = sink.send(record.clone());
    }
    let _ = first.send(record);
    Ok(())
}

/// Spawns one OS thread per stage and joins them in order, returning the
/// first error encountered; a stage that panics or errors doesn't stop the
/// others from being joined, matching the worker-pool exit-status
/// convention of reporting the first non-zero result.
pub fn run_chain(stages: Vec<Box<dyn Stage>>) -> EngineResult<()> {
    let handles: Vec<_> = stages
        .into_iter()
        .map(|stage| {
            let name = stage.name();
            let handle = std::thread::Builder::new()
                .name(name.to_string())
                .spawn(move || stage.run())
                .expect("failed to spawn stage thread");
            (name, handle)
        })
        .collect();

    let mut first_error = None;
    for (name, handle) in handles {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("stage '{name}' failed: {e}");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
            Err(_) => {
                error!("stage '{name}' panicked");
                if first_error.is_none() {
                    first_error = Some(crate::errs::EngineError::Internal(format!(
                        "stage '{name}' panicked"
                    )));
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
