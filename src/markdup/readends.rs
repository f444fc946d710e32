use std::collections::HashMap;

use crate::header::Header;
use crate::record::AlignmentRecord;

/// Orientation of one or both ends of a fragment/pair fingerprint
/// Discriminant order only needs to be a consistent total
/// order for sorting; it carries no other meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Orientation {
    F,
    R,
    FF,
    FR,
    RF,
    RR,
}

/// Combines the two single-end orientations of a pair into one of
/// FF/FR/RF/RR.
pub fn pair_orientation(read1_reverse: bool, read2_reverse: bool) -> Orientation {
    match (read1_reverse, read2_reverse) {
        (false, false) => Orientation::FF,
        (false, true) => Orientation::FR,
        (true, false) => Orientation::RF,
        (true, true) => Orientation::RR,
    }
}

/// A single fragment or pair fingerprint. Fragment-only
/// entries leave `read2_*` at their sentinel defaults; `mate_marker` records
/// whether the originating record was paired with a mapped mate (used only
/// to classify fragment-list runs as "contains a paired member").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadEnds {
    pub library_id: u32,
    pub read1_ref: i32,
    pub read1_coord: i32,
    pub orientation: Orientation,
    pub read2_ref: i32,
    pub read2_coord: i32,
    pub read1_index: u64,
    pub read2_index: i64,
    pub score: i64,
    pub mate_marker: bool,
}

impl ReadEnds {
    fn sort_key(&self) -> (u32, i32, i32, Orientation, i32, i32, u64, i64) {
        (
            self.library_id,
            self.read1_ref,
            self.read1_coord,
            self.orientation,
            self.read2_ref,
            self.read2_coord,
            self.read1_index,
            self.read2_index,
        )
    }

    /// Equality used to group consecutive pair-list entries into a
    /// duplicate-candidate run: library, read1 end, and read2 end.
    pub fn comparable_as_pair(&self, other: &ReadEnds) -> bool {
        self.library_id == other.library_id
            && self.read1_ref == other.read1_ref
            && self.read1_coord == other.read1_coord
            && self.orientation == other.orientation
            && self.read2_ref == other.read2_ref
            && self.read2_coord == other.read2_coord
    }

    /// Equality used to group consecutive fragment-list entries: library and
    /// read1 end only (read2 is a mate-mapped marker, not a real endpoint).
    pub fn comparable_as_fragment(&self, other: &ReadEnds) -> bool {
        self.library_id == other.library_id
            && self.read1_ref == other.read1_ref
            && self.read1_coord == other.read1_coord
            && self.orientation == other.orientation
    }
}

pub fn sort_read_ends(list: &mut [ReadEnds]) {
    list.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

/// Per-stage-instance library name → id table. Library names
/// come from the `RG` tag's read group's library, defaulting to
/// `"Unknown Library"` when absent.
#[derive(Debug, Default)]
pub struct LibraryTable {
    ids: HashMap<String, u32>,
    next_id: u32,
}

const UNKNOWN_LIBRARY: &str = "Unknown Library";

impl LibraryTable {
    pub fn new() -> Self {
        Self { ids: HashMap::new(), next_id: 1 }
    }

    pub fn id_for(&mut self, header: &Header, record: &AlignmentRecord) -> u32 {
        let name = library_name(header, record);
        if let Some(&id) = self.ids.get(&name) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(name, id);
        id
    }
}

fn library_name(header: &Header, record: &AlignmentRecord) -> String {
    let Some(rg_id) = record.read_group() else {
        return UNKNOWN_LIBRARY.to_string();
    };
    match header.read_group(&rg_id).and_then(|rg| rg.library.clone()) {
        Some(lib) => lib,
        None => UNKNOWN_LIBRARY.to_string(),
    }
}
