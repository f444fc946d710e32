pub mod cigar;
pub mod flags;
pub mod tags;

pub use cigar::{Cigar, CigarOp};
pub use flags::Flags;
pub use tags::TagData;

/// The single unit flowing through the pipeline.
///
/// `ref_id = -1` always means unmapped; readers/writers and every stage must
/// preserve that invariant rather than re-deriving it from the flags.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    pub query_name: String,
    pub ref_id: i32,
    pub position: i32,
    pub mapq: u8,
    pub flags: Flags,
    pub cigar: Cigar,
    pub sequence: String,
    pub qualities: Vec<u8>,
    pub mate_ref_id: i32,
    pub mate_position: i32,
    pub template_len: i32,
    pub tags: TagData,
}

impl AlignmentRecord {
    pub fn is_unmapped(&self) -> bool {
        self.flags.is_unmapped() || self.ref_id < 0
    }

    /// 0-based unclipped start: position minus leading S/H lengths.
    pub fn unclipped_start(&self) -> i32 {
        self.cigar.unclipped_start(self.position)
    }

    /// 0-based unclipped end: position plus M/D/N/=/X lengths minus one,
    /// plus trailing S/H lengths.
    pub fn unclipped_end(&self) -> i32 {
        self.cigar.unclipped_end(self.position)
    }

    pub fn end_position(&self) -> i32 {
        self.position + self.cigar.reference_len() as i32
    }

    pub fn read_group(&self) -> Option<String> {
        self.tags.get_str("RG")
    }

    /// Sum of base qualities ≥ 15, used by mark-duplicates to pick a
    /// survivor within a duplicate group. Qualities are stored Phred+33;
    /// the threshold and sum both operate on raw Phred.
    pub fn duplicate_score(&self) -> u16 {
        self.qualities
            .iter()
            .map(|&q| q.wrapping_sub(33))
            .filter(|&q| q >= 15)
            .map(|q| q as u16)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(cigar: Vec<(CigarOp, u32)>, position: i32, reverse: bool) -> AlignmentRecord {
        AlignmentRecord {
            query_name: "r1".into(),
            ref_id: 0,
            position,
            mapq: 60,
            flags: Flags::new(if reverse { Flags::REVERSE_STRAND } else { 0 }),
            cigar: Cigar::new(cigar),
            sequence: String::new(),
            qualities: vec![],
            mate_ref_id: -1,
            mate_position: -1,
            template_len: 0,
            tags: TagData::default(),
        }
    }

    #[test]
    fn unclipped_start_subtracts_leading_clip() {
        let r = rec(vec![(CigarOp::SoftClip, 4), (CigarOp::Match, 96)], 100, false);
        assert_eq!(r.unclipped_start(), 96);
    }

    #[test]
    fn unclipped_end_adds_trailing_clip() {
        let r = rec(vec![(CigarOp::Match, 100), (CigarOp::SoftClip, 7)], 100, false);
        assert_eq!(r.unclipped_end(), 100 + 100 - 1 + 7);
    }

    #[test]
    fn duplicate_score_ignores_low_quality_bases() {
        let mut r = rec(vec![(CigarOp::Match, 10)], 0, false);
        // Raw Phred 10, 20, 30, 14, 15 stored as Phred+33.
        r.qualities = vec![43, 53, 63, 47, 48];
        assert_eq!(r.duplicate_score(), 20 + 30 + 15);
    }
}
