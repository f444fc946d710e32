use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Output;

use anyhow::{anyhow, Result as AnyhowResult};

use ogengine::bamcodec::writer::BamRecordWriter;
use ogengine::header::Header;
use ogengine::record::{AlignmentRecord, Cigar, CigarOp, Flags, TagData};

pub fn run_modsort(args: &[&str]) -> AnyhowResult<Output> {
    let exe = Path::new(env!("CARGO_BIN_EXE_modsort"));
    assert!(exe.exists());

    let output = std::process::Command::new(exe)
        .args(args)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()?
        .wait_with_output()?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(anyhow!(
            "failed to run {:?}: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        ))
    }
}

/// A minimal, valid alignment record, overridable field-by-field with
/// [`RecordBuilder`]'s helper methods.
pub fn simple_record(query_name: &str, ref_id: i32, position: i32) -> AlignmentRecord {
    AlignmentRecord {
        query_name: query_name.into(),
        ref_id,
        position,
        mapq: 60,
        flags: Flags::new(0),
        cigar: Cigar::new(vec![(CigarOp::Match, 50)]),
        sequence: "A".repeat(50),
        qualities: vec![40u8 + 33; 50],
        mate_ref_id: -1,
        mate_position: -1,
        template_len: 0,
        tags: TagData::default(),
    }
}

pub fn with_read_group(mut record: AlignmentRecord, rg: &str) -> AlignmentRecord {
    record.tags = TagData::new(ogengine::record::tags::encode_str_tag("RG", rg));
    record
}

pub fn paired_mate(query_name: &str, ref_id: i32, position: i32, first: bool) -> AlignmentRecord {
    let mut rec = simple_record(query_name, ref_id, position);
    rec.flags = Flags::new(
        Flags::PAIRED | if first { Flags::FIRST_IN_PAIR } else { Flags::SECOND_IN_PAIR },
    );
    rec
}

/// Builds a reference dictionary with `chr1`..`chrN`, each 1,000,000 bp long.
pub fn header_with_references(names: &[&str]) -> Header {
    let mut header = Header::new();
    for name in names {
        header.references.push(*name, 1_000_000);
    }
    header
}

/// Writes a gzip-framed BAM stream to `path` from `header` and `records`,
/// matching what [`ogengine::bamcodec::framing::open_bgzf_write`] produces
/// and what the reader stage's `MultiGzDecoder` expects on the way back in.
pub fn write_bam(path: &Path, header: &Header, records: &[AlignmentRecord]) -> AnyhowResult<()> {
    let mut body = Vec::new();
    {
        let mut writer = BamRecordWriter::new(&mut body);
        writer.write_header(header)?;
        for record in records {
            writer.write_record(record)?;
        }
        writer.flush()?;
    }
    let file = std::fs::File::create(path)?;
    let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    encoder.write_all(&body)?;
    encoder.finish()?;
    Ok(())
}

pub fn read_sam_lines(path: &Path) -> AnyhowResult<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text.lines().filter(|l| !l.starts_with('@')).map(String::from).collect())
}

pub fn temp_path(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}
