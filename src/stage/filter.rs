use crate::errs::EngineResult;
use crate::region::Region;
use crate::stage::runtime::{fan_out, RecordRx, RecordTx, Stage};

/// Region + MAPQ + count-limit filter. A record passes iff it
/// satisfies every configured constraint; once `count` records have been
/// emitted, the stage keeps draining (and discarding) input so the upstream
/// producer never blocks on a full channel that nobody downstream is reading.
pub struct FilterStage {
    region: Option<Region>,
    min_mapq: Option<u8>,
    count: Option<u64>,
    input: RecordRx,
    outputs: Vec<RecordTx>,
}

impl FilterStage {
    pub fn new(
        input: RecordRx,
        region: Option<Region>,
        min_mapq: Option<u8>,
        count: Option<u64>,
    ) -> Self {
        Self { region, min_mapq, count, input, outputs: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: RecordTx) {
        self.outputs.push(sink);
    }
}

impl Stage for FilterStage {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn run(self: Box<Self>) -> EngineResult<()> {
        let mut emitted: u64 = 0;
        for record in self.input.iter() {
            if let Some(limit) = self.count {
                if emitted >= limit {
                    continue;
                }
            }

            let region_ok = match &self.region {
                None => true,
                Some(r) => r.overlaps(record.ref_id, record.position, record.cigar.reference_len() as i32),
            };
            let mapq_ok = match self.min_mapq {
                None => true,
                Some(min) => record.mapq >= min,
            };

            if region_ok && mapq_ok {
                fan_out(record, &self.outputs)?;
                emitted += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ReferenceDictionary;
    use crate::record::{AlignmentRecord, Cigar, CigarOp, Flags, TagData};
    use crate::stage::runtime::new_edge;

    fn dict() -> ReferenceDictionary {
        let mut d = ReferenceDictionary::new();
        d.push("chr1", 1000);
        d
    }

    fn record(position: i32, mapq: u8) -> AlignmentRecord {
        AlignmentRecord {
            query_name: "r".into(),
            ref_id: 0,
            position,
            mapq,
            flags: Flags::default(),
            cigar: Cigar::new(vec![(CigarOp::Match, 10)]),
            sequence: String::new(),
            qualities: vec![],
            mate_ref_id: -1,
            mate_position: -1,
            template_len: 0,
            tags: TagData::default(),
        }
    }

    #[test]
    fn mapq_threshold_filters_low_quality_records() {
        let (tx_in, rx_in) = new_edge(8);
        let (tx_out, rx_out) = new_edge(8);
        tx_in.send(record(0, 10)).unwrap();
        tx_in.send(record(0, 30)).unwrap();
        drop(tx_in);

        let mut stage = FilterStage::new(rx_in, None, Some(20), None);
        stage.add_sink(tx_out);
        Box::new(stage).run().unwrap();

        let got: Vec<_> = rx_out.iter().collect();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].mapq, 30);
    }

    #[test]
    fn region_boundary_is_inclusive_of_left_edge() {
        let region = Region::parse("chr1:100..200", &dict()).unwrap();
        let (tx_in, rx_in) = new_edge(8);
        let (tx_out, rx_out) = new_edge(8);
        // Reference length 10 here, so pos=50 -> end 60 (fails, below 100).
        tx_in.send(record(50, 0)).unwrap();
        // pos=90, ref len 10 -> end 100 == left boundary -> passes.
        tx_in.send(record(90, 0)).unwrap();
        // pos=201 -> fails (above right boundary 200).
        tx_in.send(record(201, 0)).unwrap();
        drop(tx_in);

        let mut stage = FilterStage::new(rx_in, Some(region), None, None);
        stage.add_sink(tx_out);
        Box::new(stage).run().unwrap();

        let got: Vec<_> = rx_out.iter().map(|r| r.position).collect();
        assert_eq!(got, vec![90]);
    }

    #[test]
    fn count_limit_stops_emission_but_keeps_draining_input() {
        let (tx_in, rx_in) = new_edge(8);
        let (tx_out, rx_out) = new_edge(8);
        for _ in 0..5 {
            tx_in.send(record(0, 0)).unwrap();
        }
        drop(tx_in);

        let mut stage = FilterStage::new(rx_in, None, None, Some(2));
        stage.add_sink(tx_out);
        Box::new(stage).run().unwrap();

        assert_eq!(rx_out.iter().count(), 2);
    }
}
