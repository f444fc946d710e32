use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use crate::bamcodec::framing::{open_bgzf_write, DetectedFormat};
use crate::bamcodec::BamRecordWriter;
use crate::errs::EngineResult;
use crate::header::{Header, ProgramRecord};
use crate::sam::record_to_sam_line;
use crate::stage::runtime::{RecordRx, Stage};

const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

enum Sink {
    Bam(BamRecordWriter<Box<dyn Write + Send>>),
    Sam(BufWriter<File>, Header),
}

/// Writes a stream of records to BAM or SAM. Rewrites the
/// inbound header's program list before writing, giving this run its own
/// non-colliding `@PG` entry chained to whatever program ran before it.
pub struct WriterStage {
    sink: Sink,
    input: RecordRx,
}

impl WriterStage {
    pub fn open(
        path: PathBuf,
        format: DetectedFormat,
        mut header: Header,
        input: RecordRx,
        compression_level: Option<u32>,
        program_name: &str,
        command_line: Option<String>,
    ) -> EngineResult<Self> {
        let id = header.next_program_id(program_name);
        header.append_program(ProgramRecord {
            id,
            name: Some(program_name.to_string()),
            command_line,
            previous_id: None,
        });

        let sink = match format {
            DetectedFormat::Bam => {
                let level = compression_level.unwrap_or(DEFAULT_COMPRESSION_LEVEL);
                let stream = open_bgzf_write(&path, level)?;
                let mut writer = BamRecordWriter::new(stream);
                writer.write_header(&header)?;
                Sink::Bam(writer)
            }
            DetectedFormat::Sam => {
                let mut file = BufWriter::new(File::create(&path)?);
                file.write_all(header.to_text().as_bytes())?;
                Sink::Sam(file, header)
            }
        };

        Ok(Self { sink, input })
    }
}

impl Stage for WriterStage {
    fn name(&self) -> &'static str {
        "writer"
    }

    fn run(mut self: Box<Self>) -> EngineResult<()> {
        for record in self.input.iter() {
            match &mut self.sink {
                Sink::Bam(writer) => writer.write_record(&record)?,
                Sink::Sam(file, header) => {
                    writeln!(file, "{}", record_to_sam_line(&record, header))?;
                }
            }
        }
        match &mut self.sink {
            Sink::Bam(writer) => writer.flush()?,
            Sink::Sam(file, _) => file.flush()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bamcodec::BamRecordReader;
    use crate::record::{AlignmentRecord, Cigar, Flags, TagData};
    use crate::stage::runtime::new_edge;
    use std::io::Read;

    fn record() -> AlignmentRecord {
        AlignmentRecord {
            query_name: "r1".into(),
            ref_id: 0,
            position: 5,
            mapq: 40,
            flags: Flags::default(),
            cigar: Cigar::default(),
            sequence: "ACGT".into(),
            qualities: vec![30, 31, 32, 33],
            mate_ref_id: -1,
            mate_position: -1,
            template_len: 0,
            tags: TagData::default(),
        }
    }

    #[test]
    fn writes_bam_with_rewritten_program_chain() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bam");
        let mut header = Header::new();
        header.references.push("chr1", 1000);

        let (tx, rx) = new_edge(4);
        tx.send(record()).unwrap();
        drop(tx);

        let stage = WriterStage::open(
            path.clone(),
            DetectedFormat::Bam,
            header,
            rx,
            None,
            "modsort",
            Some("modsort dedup".into()),
        )
        .unwrap();
        Box::new(stage).run().unwrap();

        let mut raw = Vec::new();
        let mut decoder =
            flate2::read::MultiGzDecoder::new(File::open(&path).unwrap());
        decoder.read_to_end(&mut raw).unwrap();
        let mut reader = BamRecordReader::new(std::io::Cursor::new(raw)).unwrap();
        assert_eq!(reader.header().programs[0].id, "modsort");
        let rec = reader.read_record().unwrap().unwrap();
        assert_eq!(rec.query_name, "r1");
    }

    #[test]
    fn writes_sam_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.sam");
        let mut header = Header::new();
        header.references.push("chr1", 1000);

        let (tx, rx) = new_edge(4);
        tx.send(record()).unwrap();
        drop(tx);

        let stage = WriterStage::open(
            path.clone(),
            DetectedFormat::Sam,
            header,
            rx,
            None,
            "modsort",
            None,
        )
        .unwrap();
        Box::new(stage).run().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("@PG"));
        assert!(text.contains("r1\t"));
    }
}
