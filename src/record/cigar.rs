use std::fmt;

use crate::errs::{EngineError, EngineResult};

/// CIGAR operation codes, numbered as the BAM binary format packs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarOp {
    Match,        // M
    Insertion,    // I
    Deletion,     // D
    Skip,         // N
    SoftClip,     // S
    HardClip,     // H
    Padding,      // P
    SeqMatch,     // =
    SeqMismatch,  // X
}

impl CigarOp {
    pub fn from_bam_code(code: u8) -> EngineResult<Self> {
        use CigarOp::*;
        Ok(match code {
            0 => Match,
            1 => Insertion,
            2 => Deletion,
            3 => Skip,
            4 => SoftClip,
            5 => HardClip,
            6 => Padding,
            7 => SeqMatch,
            8 => SeqMismatch,
            other => {
                return Err(EngineError::InputFormat(format!(
                    "invalid packed CIGAR op code {other}"
                )))
            }
        })
    }

    pub fn bam_code(self) -> u8 {
        use CigarOp::*;
        match self {
            Match => 0,
            Insertion => 1,
            Deletion => 2,
            Skip => 3,
            SoftClip => 4,
            HardClip => 5,
            Padding => 6,
            SeqMatch => 7,
            SeqMismatch => 8,
        }
    }

    pub fn from_char(c: char) -> EngineResult<Self> {
        use CigarOp::*;
        Ok(match c {
            'M' => Match,
            'I' => Insertion,
            'D' => Deletion,
            'N' => Skip,
            'S' => SoftClip,
            'H' => HardClip,
            'P' => Padding,
            '=' => SeqMatch,
            'X' => SeqMismatch,
            other => {
                return Err(EngineError::InputFormat(format!(
                    "invalid CIGAR operation '{other}'"
                )))
            }
        })
    }

    pub fn as_char(self) -> char {
        use CigarOp::*;
        match self {
            Match => 'M',
            Insertion => 'I',
            Deletion => 'D',
            Skip => 'N',
            SoftClip => 'S',
            HardClip => 'H',
            Padding => 'P',
            SeqMatch => '=',
            SeqMismatch => 'X',
        }
    }

    /// Whether this op consumes reference bases, per the BAM spec's table.
    /// Used by [`Cigar::reference_len`] to compute the alignment end.
    fn consumes_reference(self) -> bool {
        matches!(
            self,
            CigarOp::Match
                | CigarOp::Deletion
                | CigarOp::Skip
                | CigarOp::SeqMatch
                | CigarOp::SeqMismatch
        )
    }

    fn is_clip(self) -> bool {
        matches!(self, CigarOp::SoftClip | CigarOp::HardClip)
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar(pub Vec<(CigarOp, u32)>);

impl Cigar {
    pub fn new(ops: Vec<(CigarOp, u32)>) -> Self {
        Self(ops)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Span of reference bases consumed, i.e. Σ length over M/D/N/=/X ops.
    pub fn reference_len(&self) -> u32 {
        self.0
            .iter()
            .filter(|(op, _)| op.consumes_reference())
            .map(|(_, len)| len)
            .sum()
    }

    fn leading_clip(&self) -> u32 {
        self.0
            .iter()
            .take_while(|(op, _)| op.is_clip())
            .map(|(_, len)| len)
            .sum()
    }

    fn trailing_clip(&self) -> u32 {
        self.0
            .iter()
            .rev()
            .take_while(|(op, _)| op.is_clip())
            .map(|(_, len)| len)
            .sum()
    }

    /// 0-based unclipped start: position minus leading soft/hard clip length.
    pub fn unclipped_start(&self, position: i32) -> i32 {
        position - self.leading_clip() as i32
    }

    /// 0-based unclipped end (inclusive): alignment end plus trailing clip.
    pub fn unclipped_end(&self, position: i32) -> i32 {
        let alignment_end = position + self.reference_len() as i32 - 1;
        alignment_end + self.trailing_clip() as i32
    }
}
