use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::errs::EngineResult;

/// Opens a BAM file for streaming decompression. BGZF is a restricted form
/// of concatenated gzip members, which [`MultiGzDecoder`] already handles;
/// block-level seeking (no random access or indexing) is out of scope.
pub fn open_bgzf_read(path: impl AsRef<Path>) -> EngineResult<Box<dyn Read + Send>> {
    let file = File::open(path)?;
    Ok(Box::new(MultiGzDecoder::new(BufReader::new(file))))
}

/// Opens a BAM file for streaming compression at the given gzip level (0-9).
pub fn open_bgzf_write(
    path: impl AsRef<Path>,
    compression_level: u32,
) -> EngineResult<Box<dyn Write + Send>> {
    let file = File::create(path)?;
    let level = Compression::new(compression_level.min(9));
    Ok(Box::new(GzEncoder::new(BufWriter::new(file), level)))
}

/// Detects SAM (`@`) vs BAM (gzip magic `\x1f\x8b`) from the first two bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    Sam,
    Bam,
}

pub fn detect_format(path: impl AsRef<Path>) -> io::Result<Option<DetectedFormat>> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let n = file.read(&mut magic)?;
    if n < 2 {
        return Ok(None);
    }
    if magic[0] == 0x40 {
        Ok(Some(DetectedFormat::Sam))
    } else if magic == [0x1f, 0x8b] {
        Ok(Some(DetectedFormat::Bam))
    } else {
        Ok(None)
    }
}
