mod readends;
mod spill;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use crate::errs::EngineResult;
use crate::header::Header;
use crate::record::AlignmentRecord;
use crate::stage::runtime::{fan_out, RecordRx, RecordTx, Stage};

use readends::{pair_orientation, sort_read_ends, LibraryTable, Orientation, ReadEnds};
use spill::SpillFile;

/// Marks PCR/optical duplicates by the reference implementation's
/// fingerprint algorithm: a 3-pass scan through an on-disk
/// spill file, with two sorted fingerprint lists built in between.
pub struct MarkDuplicatesStage {
    header: Header,
    tmp_dir: PathBuf,
    remove_duplicates: bool,
    input: RecordRx,
    outputs: Vec<RecordTx>,
}

impl MarkDuplicatesStage {
    pub fn new(
        header: Header,
        tmp_dir: PathBuf,
        remove_duplicates: bool,
        input: RecordRx,
    ) -> Self {
        Self { header, tmp_dir, remove_duplicates, input, outputs: Vec::new() }
    }

    pub fn add_sink(&mut self, sink: RecordTx) {
        self.outputs.push(sink);
    }
}

impl Stage for MarkDuplicatesStage {
    fn name(&self) -> &'static str {
        "mark_duplicates"
    }

    fn run(self: Box<Self>) -> EngineResult<()> {
        let MarkDuplicatesStage { header, tmp_dir, remove_duplicates, input, outputs } = *self;

        let mut spill = SpillFile::create(&tmp_dir, &header)?;
        let mut libraries = LibraryTable::new();
        let mut scratch: HashMap<String, ReadEnds> = HashMap::new();
        let mut fragments: Vec<ReadEnds> = Vec::new();
        let mut pairs: Vec<ReadEnds> = Vec::new();

        let mut file_index: u64 = 0;
        for record in input.iter() {
            spill.write(&record)?;

            if !record.is_unmapped() && record.flags.is_primary_alignment() {
                let fragment = build_fragment_ends(&header, &mut libraries, &record, file_index);
                let is_paired_mapped = record.flags.is_paired() && !record.flags.is_mate_unmapped();

                if is_paired_mapped {
                    let key = format!(
                        "{}:{}",
                        record.read_group().unwrap_or_default(),
                        record.query_name
                    );
                    match scratch.remove(&key) {
                        None => {
                            scratch.insert(key, fragment.clone());
                        }
                        Some(partner) => {
                            pairs.push(finalize_pair(partner, fragment.clone(), &record));
                        }
                    }
                }

                fragments.push(fragment);
            }

            file_index += 1;
        }
        // Orphaned scratch entries (mate never arrived) are simply dropped.
        drop(scratch);

        sort_read_ends(&mut pairs);
        sort_read_ends(&mut fragments);

        let mut duplicates: HashSet<u64> = HashSet::new();
        classify_pairs(&pairs, &mut duplicates);
        classify_fragments(&fragments, &mut duplicates);
        drop(pairs);
        drop(fragments);

        let mut reader = spill.finish_and_reopen()?;
        let mut index: u64 = 0;
        while let Some(mut record) = reader.read_record()? {
            if record.flags.is_primary_alignment() {
                record.flags.set_duplicate(duplicates.contains(&index));
            }
            index += 1;

            if remove_duplicates && record.flags.is_duplicate() {
                // dropped
            } else {
                fan_out(record, &outputs)?;
            }
        }

        Ok(())
    }
}

fn build_fragment_ends(
    header: &Header,
    libraries: &mut LibraryTable,
    record: &AlignmentRecord,
    file_index: u64,
) -> ReadEnds {
    let reverse = record.flags.is_reverse_strand();
    let mate_marker = record.flags.is_paired() && !record.flags.is_mate_unmapped();
    ReadEnds {
        library_id: libraries.id_for(header, record),
        read1_ref: record.ref_id,
        read1_coord: if reverse { record.unclipped_end() } else { record.unclipped_start() },
        orientation: if reverse { Orientation::R } else { Orientation::F },
        read2_ref: if mate_marker { record.mate_ref_id } else { -1 },
        read2_coord: 0,
        read1_index: file_index,
        read2_index: -1,
        score: record.duplicate_score() as i64,
        mate_marker,
    }
}

/// Combines a stored first-seen fingerprint with its now-arrived mate into a
/// single pair fingerprint, ordering the two ends lexicographically by
/// (ref_id, coord).
fn finalize_pair(first: ReadEnds, second: ReadEnds, second_record: &AlignmentRecord) -> ReadEnds {
    let first_is_earlier = second.read1_ref > first.read1_ref
        || (second.read1_ref == first.read1_ref && second.read1_coord >= first.read1_coord);

    let (read1, read2, orientation) = if first_is_earlier {
        let orientation =
            pair_orientation(first.orientation == Orientation::R, second_record.flags.is_reverse_strand());
        (first.clone(), second.clone(), orientation)
    } else {
        let orientation =
            pair_orientation(second_record.flags.is_reverse_strand(), first.orientation == Orientation::R);
        (second.clone(), first.clone(), orientation)
    };

    ReadEnds {
        library_id: read1.library_id,
        read1_ref: read1.read1_ref,
        read1_coord: read1.read1_coord,
        orientation,
        read2_ref: read2.read1_ref,
        read2_coord: read2.read1_coord,
        read1_index: read1.read1_index,
        read2_index: read2.read1_index as i64,
        score: first.score + second.score,
        mate_marker: true,
    }
}

/// Walks the sorted pair list, keeping the max-score fingerprint per
/// duplicate-comparable run and marking every other run member's read1/read2
/// indices as duplicates.
fn classify_pairs(pairs: &[ReadEnds], duplicates: &mut HashSet<u64>) {
    for run in consecutive_runs(pairs, ReadEnds::comparable_as_pair) {
        if run.len() <= 1 {
            continue;
        }
        let best = run.iter().enumerate().max_by_key(|(i, e)| (e.score, -(*i as i64))).map(|(i, _)| i).unwrap();
        for (i, end) in run.iter().enumerate() {
            if i != best {
                duplicates.insert(end.read1_index);
                if end.read2_index >= 0 {
                    duplicates.insert(end.read2_index as u64);
                }
            }
        }
    }
}

/// Walks the sorted fragment list: runs containing a
/// paired member mark every unpaired member duplicate; pure-unpaired runs
/// keep the single max-score member.
fn classify_fragments(fragments: &[ReadEnds], duplicates: &mut HashSet<u64>) {
    for run in consecutive_runs(fragments, ReadEnds::comparable_as_fragment) {
        let contains_paired = run.iter().any(|e| e.mate_marker);
        if contains_paired {
            for end in run {
                if !end.mate_marker {
                    duplicates.insert(end.read1_index);
                }
            }
        } else if run.len() > 1 {
            let best =
                run.iter().enumerate().max_by_key(|(i, e)| (e.score, -(*i as i64))).map(|(i, _)| i).unwrap();
            for (i, end) in run.iter().enumerate() {
                if i != best {
                    duplicates.insert(end.read1_index);
                }
            }
        }
    }
}

fn consecutive_runs(
    list: &[ReadEnds],
    comparable: impl Fn(&ReadEnds, &ReadEnds) -> bool,
) -> Vec<&[ReadEnds]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..list.len() {
        if !comparable(&list[start], &list[i]) {
            runs.push(&list[start..i]);
            start = i;
        }
    }
    if !list.is_empty() {
        runs.push(&list[start..]);
    }
    runs
}
