use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use log::warn;

use crate::bamcodec::framing::{detect_format, open_bgzf_read, DetectedFormat};
use crate::bamcodec::BamRecordReader;
use crate::errs::{EngineError, EngineResult};
use crate::header::Header;
use crate::record::AlignmentRecord;
use crate::sam::record_from_sam_line;
use crate::stage::runtime::{fan_out, RecordTx, Stage};

type LineIter = Box<dyn Iterator<Item = std::io::Result<String>> + Send>;

/// A single open input, abstracting over the BAM and SAM encodings so the
/// reader stage can iterate either uniformly.
enum Source {
    Bam(BamRecordReader<Box<dyn Read + Send>>),
    Sam { lines: LineIter, header: Header },
}

impl Source {
    fn next_record(&mut self) -> EngineResult<Option<AlignmentRecord>> {
        match self {
            Source::Bam(r) => r.read_record(),
            Source::Sam { lines, header } => loop {
                match lines.next() {
                    None => return Ok(None),
                    Some(line) => {
                        let line = line?;
                        if line.starts_with('@') || line.is_empty() {
                            continue;
                        }
                        return record_from_sam_line(&line, header).map(Some);
                    }
                }
            },
        }
    }
}

fn open_source(
    path: &Path,
    forced: Option<DetectedFormat>,
) -> EngineResult<(DetectedFormat, Header, Source)> {
    let detected = forced.or(detect_format(path)?).ok_or_else(|| {
        EngineError::InputFormat(format!("could not detect format of {}", path.display()))
    })?;

    match detected {
        DetectedFormat::Bam => {
            let stream = open_bgzf_read(path)?;
            let reader = BamRecordReader::new(stream)?;
            let header = reader.header().clone();
            Ok((detected, header, Source::Bam(reader)))
        }
        DetectedFormat::Sam => {
            let file = File::open(path)?;
            let mut raw_lines = BufReader::new(file).lines();
            let mut header_text = String::new();
            let mut first_record_line = None;
            for line in &mut raw_lines {
                let line = line?;
                if line.starts_with('@') {
                    header_text.push_str(&line);
                    header_text.push('\n');
                } else {
                    first_record_line = Some(line);
                    break;
                }
            }
            let header = Header::parse_text(&header_text);
            // The header scan above already consumed one line of lookahead
            // past the last `@` line; splice it back in front of the rest.
            let lines: LineIter = match first_record_line {
                Some(line) => Box::new(std::iter::once(Ok(line)).chain(raw_lines)),
                None => Box::new(raw_lines),
            };
            Ok((detected, header.clone(), Source::Sam { lines, header }))
        }
    }
}

pub struct ReaderStage {
    pub header: Header,
    paths: Vec<PathBuf>,
    forced_format: Option<DetectedFormat>,
    detected_format: DetectedFormat,
    outputs: Vec<RecordTx>,
}

impl ReaderStage {
    /// Opens the first file eagerly to resolve the authoritative header
    /// before the stage is wired into a chain, since downstream stages
    /// (filter region parsing, writer header rewriting) need it at
    /// construction time rather than waiting on a running thread.
    pub fn open(
        paths: Vec<PathBuf>,
        forced_format: Option<DetectedFormat>,
    ) -> EngineResult<Self> {
        if paths.is_empty() {
            return Err(EngineError::Config("reader requires at least one path".into()));
        }
        let (detected_format, header, _first) = open_source(&paths[0], forced_format)?;
        Ok(Self { header, paths, forced_format, detected_format, outputs: Vec::new() })
    }

    pub fn add_sink(&mut self, sink: RecordTx) {
        self.outputs.push(sink);
    }
}

impl Stage for ReaderStage {
    fn name(&self) -> &'static str {
        "reader"
    }

    fn run(self: Box<Self>) -> EngineResult<()> {
        for (i, path) in self.paths.iter().enumerate() {
            let (format, header, mut source) = open_source(path, self.forced_format)?;
            if format != self.detected_format {
                return Err(EngineError::InputFormat(format!(
                    "{} has a different format than the first input file",
                    path.display()
                )));
            }
            if i > 0 && header.to_text() != self.header.to_text() {
                warn!(
                    "header of {} does not match the first input file's header",
                    path.display()
                );
            }
            while let Some(record) = source.next_record()? {
                fan_out(record, &self.outputs)?;
            }
        }
        Ok(())
    }
}
