use crate::errs::{EngineError, EngineResult};
use crate::header::ReferenceDictionary;

/// A genomic interval. `left_pos`/`right_pos` are the position numbers as
/// typed in the region string, compared directly against a record's 0-based
/// `position` field with no additional shift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub left_ref: i32,
    pub left_pos: i32,
    pub right_ref: i32,
    pub right_pos: i32,
}

impl Region {
    /// Parses `CHR`, `CHR:POS`, `CHR:POS..POS`, or `CHR:POS..CHR2:POS`,
    /// resolving chromosome names against `references`. The typed position
    /// numbers are used verbatim as the left/right boundary (a boundary-exact
    /// scenario pins this down: `chr1:100..200` makes 100 and
    /// 200 the literal thresholds compared against a record's 0-based
    /// `position`, with no further off-by-one shift on either end).
    pub fn parse(raw: &str, references: &ReferenceDictionary) -> EngineResult<Self> {
        if raw.is_empty() {
            return Err(EngineError::Config("empty region string".into()));
        }

        let (start_chrom, start_pos, stop_chrom, stop_pos) =
            match raw.find(':') {
                None => (raw.to_string(), 0, raw.to_string(), -1),
                Some(colon) => {
                    let chrom = &raw[..colon];
                    let rest = &raw[colon + 1..];
                    match rest.find("..") {
                        None => {
                            let pos = parse_pos(rest)?;
                            (chrom.to_string(), pos, chrom.to_string(), -1)
                        }
                        Some(dots) => {
                            let start_pos = parse_pos(&rest[..dots])?;
                            let after = &rest[dots + 2..];
                            match after.find(':') {
                                None => (
                                    chrom.to_string(),
                                    start_pos,
                                    chrom.to_string(),
                                    parse_pos(after)?,
                                ),
                                Some(c2) => (
                                    chrom.to_string(),
                                    start_pos,
                                    after[..c2].to_string(),
                                    parse_pos(&after[c2 + 1..])?,
                                ),
                            }
                        }
                    }
                }
            };

        let left_ref = references.id_of(&start_chrom).ok_or_else(|| {
            EngineError::Config(format!("unknown chromosome '{start_chrom}'"))
        })?;
        let right_ref = references.id_of(&stop_chrom).ok_or_else(|| {
            EngineError::Config(format!("unknown chromosome '{stop_chrom}'"))
        })?;

        let right_len = references.length(right_ref).unwrap_or(i32::MAX);
        let right_pos = if stop_pos < 0 { right_len } else { stop_pos };

        Ok(Region { left_ref, left_pos: start_pos, right_ref, right_pos })
    }

    /// Overlap test: `ref_id ∈ [left_ref, right_ref] ∧
    /// (pos + length) ≥ left_pos ∧ pos ≤ right_pos`.
    pub fn overlaps(&self, ref_id: i32, pos: i32, length: i32) -> bool {
        ref_id >= self.left_ref
            && ref_id <= self.right_ref
            && (pos + length) >= self.left_pos
            && pos <= self.right_pos
    }
}

fn parse_pos(raw: &str) -> EngineResult<i32> {
    raw.parse::<i32>()
        .map_err(|_| EngineError::Config(format!("invalid position '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dict() -> ReferenceDictionary {
        let mut d = ReferenceDictionary::new();
        d.push("chr1", 1000);
        d.push("chr2", 2000);
        d
    }

    #[test]
    fn parses_bare_chromosome() {
        let r = Region::parse("chr1", &dict()).unwrap();
        assert_eq!(r, Region { left_ref: 0, left_pos: 0, right_ref: 0, right_pos: 999 });
    }

    #[test]
    fn parses_single_position() {
        let r = Region::parse("chr1:100", &dict()).unwrap();
        assert_eq!(r.left_pos, 100);
        assert_eq!(r.right_pos, 999);
    }

    #[test]
    fn parses_range_on_one_chromosome() {
        let r = Region::parse("chr1:100..200", &dict()).unwrap();
        assert_eq!(r.left_pos, 100);
        assert_eq!(r.right_pos, 200);
    }

    #[test]
    fn parses_cross_chromosome_range() {
        let r = Region::parse("chr1:100..chr2:50", &dict()).unwrap();
        assert_eq!(r.left_ref, 0);
        assert_eq!(r.right_ref, 1);
        assert_eq!(r.right_pos, 50);
    }

    #[test]
    fn unknown_chromosome_is_fatal() {
        assert!(Region::parse("chrX:1..2", &dict()).is_err());
    }

    #[test]
    fn boundary_exact_overlap_matches_spec_scenario_4() {
        let region = Region::parse("chr1:100..200", &dict()).unwrap();
        // pos=50, length=50 -> pos+length == 100 == left_pos -> passes.
        assert!(region.overlaps(0, 50, 50));
        // pos=200, length=5 -> passes (pos <= right_pos).
        assert!(region.overlaps(0, 200, 5));
        // pos=201 -> fails.
        assert!(!region.overlaps(0, 201, 5));
    }
}
