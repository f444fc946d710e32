use crate::errs::EngineResult;
use crate::header::SortOrder;
use crate::record::AlignmentRecord;
use crate::stage::runtime::{fan_out, RecordRx, RecordTx, Stage};

/// Sorts one pre-buffered input stream by the configured order. External
/// merge-sort spill files are out of scope here; this stage does a
/// straightforward in-memory sort using the same comparator sorted-merge
/// expects its inputs pre-sorted under.
pub struct SorterStage {
    order: SortOrder,
    input: RecordRx,
    outputs: Vec<RecordTx>,
}

impl SorterStage {
    pub fn new(order: SortOrder, input: RecordRx) -> Self {
        Self { order, input, outputs: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: RecordTx) {
        self.outputs.push(sink);
    }
}

fn sort_key(order: SortOrder, r: &AlignmentRecord) -> (bool, i32, i32, String) {
    match order {
        SortOrder::Queryname => (false, 0, 0, r.query_name.clone()),
        _ => (r.ref_id < 0, r.ref_id, r.position, String::new()),
    }
}

impl Stage for SorterStage {
    fn name(&self) -> &'static str {
        "sorter"
    }

    fn run(self: Box<Self>) -> EngineResult<()> {
        let mut buffer: Vec<AlignmentRecord> = self.input.iter().collect();
        buffer.sort_by(|a, b| sort_key(self.order, a).cmp(&sort_key(self.order, b)));
        for record in buffer {
            fan_out(record, &self.outputs)?;
        }
        Ok(())
    }
}
