use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::errs::EngineResult;
use crate::header::SortOrder;
use crate::record::AlignmentRecord;
use crate::stage::runtime::{RecordRx, RecordTx, Stage};

/// One pending head-of-queue record from a single pre-sorted input, ordered
/// so a max-heap pops the *smallest* element under the configured comparator:
/// we invert the comparator and break ties by input index so the merge is
/// deterministic even when two inputs' head records compare equal.
struct HeapEntry {
    record: AlignmentRecord,
    source: usize,
    order: SortOrder,
}

fn compare_records(a: &AlignmentRecord, b: &AlignmentRecord, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Queryname => a.query_name.cmp(&b.query_name),
        _ => {
            let key = |r: &AlignmentRecord| -> (bool, i32, i32) {
                (r.ref_id < 0, r.ref_id, r.position)
            };
            key(a).cmp(&key(b))
        }
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the logically smallest
        // record first; ties break on source index, also reversed so the
        // lowest input index wins the pop.
        compare_records(&other.record, &self.record, self.order)
            .then_with(|| other.source.cmp(&self.source))
    }
}

/// N-way merge of pre-sorted substreams into one output in the same order.
pub struct SortedMergeStage {
    order: SortOrder,
    inputs: Vec<RecordRx>,
    outputs: Vec<RecordTx>,
}

impl SortedMergeStage {
    pub fn new(order: SortOrder, inputs: Vec<RecordRx>, outputs: Vec<RecordTx>) -> Self {
        Self { order, inputs, outputs }
    }
}

impl Stage for SortedMergeStage {
    fn name(&self) -> &'static str {
        "sorted_merge"
    }

    fn run(self: Box<Self>) -> EngineResult<()> {
        let mut heap = BinaryHeap::new();
        for (i, rx) in self.inputs.iter().enumerate() {
            if let Ok(record) = rx.recv() {
                heap.push(HeapEntry { record, source: i, order: self.order });
            }
        }

        while let Some(entry) = heap.pop() {
            for sink in &self.outputs {
                let _ = sink.send(entry.record.clone());
            }
            if let Ok(next) = self.inputs[entry.source].recv() {
                heap.push(HeapEntry { record: next, source: entry.source, order: self.order });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Cigar, Flags, TagData};
    use crate::stage::runtime::new_edge;

    fn record(ref_id: i32, position: i32, name: &str) -> AlignmentRecord {
        AlignmentRecord {
            query_name: name.into(),
            ref_id,
            position,
            mapq: 0,
            flags: Flags::default(),
            cigar: Cigar::default(),
            sequence: String::new(),
            qualities: vec![],
            mate_ref_id: -1,
            mate_position: -1,
            template_len: 0,
            tags: TagData::default(),
        }
    }

    #[test]
    fn merges_two_coordinate_sorted_inputs_in_order() {
        let (tx_a, rx_a) = new_edge(8);
        let (tx_b, rx_b) = new_edge(8);
        let (tx_out, rx_out) = new_edge(8);

        tx_a.send(record(0, 10, "a1")).unwrap();
        tx_a.send(record(0, 30, "a2")).unwrap();
        drop(tx_a);
        tx_b.send(record(0, 20, "b1")).unwrap();
        tx_b.send(record(1, 5, "b2")).unwrap();
        drop(tx_b);

        let stage = SortedMergeStage::new(SortOrder::Coordinate, vec![rx_a, rx_b], vec![tx_out]);
        Box::new(stage).run().unwrap();

        let got: Vec<_> = rx_out.iter().map(|r| r.query_name).collect();
        assert_eq!(got, vec!["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn unmapped_records_sort_last_under_coordinate_order() {
        let (tx_a, rx_a) = new_edge(8);
        let (tx_b, rx_b) = new_edge(8);
        let (tx_out, rx_out) = new_edge(8);
        tx_a.send(record(-1, 0, "unmapped")).unwrap();
        drop(tx_a);
        tx_b.send(record(0, 5, "mapped")).unwrap();
        drop(tx_b);

        let stage = SortedMergeStage::new(SortOrder::Coordinate, vec![rx_a, rx_b], vec![tx_out]);
        Box::new(stage).run().unwrap();

        let got: Vec<_> = rx_out.iter().map(|r| r.query_name).collect();
        assert_eq!(got, vec!["mapped", "unmapped"]);
    }

    #[test]
    fn queryname_order_merges_lexicographically() {
        let (tx_a, rx_a) = new_edge(8);
        let (tx_b, rx_b) = new_edge(8);
        let (tx_out, rx_out) = new_edge(8);
        tx_a.send(record(0, 0, "bravo")).unwrap();
        drop(tx_a);
        tx_b.send(record(0, 0, "alpha")).unwrap();
        drop(tx_b);

        let stage = SortedMergeStage::new(SortOrder::Queryname, vec![rx_a, rx_b], vec![tx_out]);
        Box::new(stage).run().unwrap();

        let got: Vec<_> = rx_out.iter().map(|r| r.query_name).collect();
        assert_eq!(got, vec!["alpha", "bravo"]);
    }
}
