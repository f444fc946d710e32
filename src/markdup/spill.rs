use std::fs::File;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::bamcodec::{BamRecordReader, BamRecordWriter};
use crate::errs::EngineResult;
use crate::header::Header;
use crate::record::AlignmentRecord;

/// An uncompressed, heap-owned temp file holding every inbound record
/// verbatim, so the final re-emit pass can replay input order without
/// buffering the whole stream in memory. `NamedTempFile` deletes the backing
/// file once both the writer and the reopened reader have dropped it.
pub struct SpillFile {
    file: NamedTempFile,
    writer: BamRecordWriter<File>,
}

impl SpillFile {
    pub fn create(dir: &Path, header: &Header) -> EngineResult<Self> {
        let file = tempfile::Builder::new().prefix("markdup-").suffix(".bam").tempfile_in(dir)?;
        let handle = file.reopen()?;
        let mut writer = BamRecordWriter::new(handle);
        writer.write_header(header)?;
        Ok(Self { file, writer })
    }

    pub fn write(&mut self, record: &AlignmentRecord) -> EngineResult<()> {
        self.writer.write_record(record)
    }

    /// Flushes the write side and reopens the file for a sequential
    /// re-read, reassigning indices 0,1,... in write order.
    pub fn finish_and_reopen(mut self) -> EngineResult<SpillReader> {
        self.writer.flush()?;
        let handle = self.file.reopen()?;
        let reader = BamRecordReader::new(handle)?;
        Ok(SpillReader { _file: self.file, reader })
    }
}

pub struct SpillReader {
    _file: NamedTempFile,
    reader: BamRecordReader<File>,
}

impl SpillReader {
    pub fn read_record(&mut self) -> EngineResult<Option<AlignmentRecord>> {
        self.reader.read_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Cigar, Flags, TagData};

    #[test]
    fn round_trips_an_unmapped_negative_position_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut header = Header::new();
        header.references.push("chr1", 1000);

        let rec = AlignmentRecord {
            query_name: "unmapped1".into(),
            ref_id: -1,
            position: -1,
            mapq: 0,
            flags: Flags::new(Flags::UNMAPPED),
            cigar: Cigar::default(),
            sequence: String::new(),
            qualities: vec![],
            mate_ref_id: -1,
            mate_position: -1,
            template_len: 0,
            tags: TagData::default(),
        };

        let mut spill = SpillFile::create(dir.path(), &header).unwrap();
        spill.write(&rec).unwrap();
        let mut reader = spill.finish_and_reopen().unwrap();
        assert_eq!(reader.read_record().unwrap().unwrap(), rec);
        assert!(reader.read_record().unwrap().is_none());
    }
}
