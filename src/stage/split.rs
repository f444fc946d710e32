use log::info;

use crate::errs::{EngineError, EngineResult};
use crate::stage::runtime::{RecordRx, RecordTx, Stage};

/// Deterministic fan-out by reference id: each record goes to
/// exactly one sink, chosen by `ref_id % sinks.len()`, with unmapped/negative
/// `ref_id` routed to sink 0.
pub struct SplitStage {
    input: RecordRx,
    outputs: Vec<RecordTx>,
}

impl SplitStage {
    pub fn new(input: RecordRx, outputs: Vec<RecordTx>) -> EngineResult<Self> {
        if outputs.is_empty() {
            return Err(EngineError::Config("split requires at least one sink".into()));
        }
        Ok(Self { input, outputs })
    }
}

impl Stage for SplitStage {
    fn name(&self) -> &'static str {
        "split"
    }

    fn run(self: Box<Self>) -> EngineResult<()> {
        let n = self.outputs.len() as i32;
        let mut counts = vec![0u64; self.outputs.len()];
        for record in self.input.iter() {
            let chain = if record.ref_id < 0 { 0 } else { (record.ref_id % n) as usize };
            counts[chain] += 1;
            let _ = self.outputs[chain].send(record);
        }
        for (i, count) in counts.iter().enumerate() {
            info!("split chain {i} wrote {count} records");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AlignmentRecord, Cigar, Flags, TagData};
    use crate::stage::runtime::new_edge;

    fn record(ref_id: i32) -> AlignmentRecord {
        AlignmentRecord {
            query_name: "r".into(),
            ref_id,
            position: 0,
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
    fn splits_by_reference_id_modulo_sink_count() {
        let (tx_in, rx_in) = new_edge(8);
        let (tx0, rx0) = new_edge(8);
        let (tx1, rx1) = new_edge(8);
        tx_in.send(record(0)).unwrap();
        tx_in.send(record(1)).unwrap();
        tx_in.send(record(2)).unwrap();
        tx_in.send(record(3)).unwrap();
        drop(tx_in);

        let stage = SplitStage::new(rx_in, vec![tx0, tx1]).unwrap();
        Box::new(stage).run().unwrap();

        assert_eq!(rx0.iter().count(), 2);
        assert_eq!(rx1.iter().count(), 2);
    }

    #[test]
    fn negative_ref_id_routes_to_sink_zero() {
        let (tx_in, rx_in) = new_edge(8);
        let (tx0, rx0) = new_edge(8);
        let (tx1, rx1) = new_edge(8);
        tx_in.send(record(-1)).unwrap();
        drop(tx_in);

        let stage = SplitStage::new(rx_in, vec![tx0, tx1]).unwrap();
        Box::new(stage).run().unwrap();

        assert_eq!(rx0.iter().count(), 1);
        assert_eq!(rx1.iter().count(), 0);
    }

    #[test]
    fn rejects_empty_sink_list() {
        let (_tx_in, rx_in) = new_edge(1);
        assert!(SplitStage::new(rx_in, vec![]).is_err());
    }
}
