use std::io::{ErrorKind, Read};

use byteorder::{ReadBytesExt, LE};

use crate::bamcodec::seq::unpack_sequence;
use crate::errs::{EngineError, EngineResult};
use crate::header::Header;
use crate::record::tags::TagData;
use crate::record::{AlignmentRecord, Flags};

/// Reads the uncompressed BAM binary record layout.
pub struct BamRecordReader<R: Read> {
    input: R,
    header: Header,
}

impl<R: Read> BamRecordReader<R> {
    pub fn new(mut input: R) -> EngineResult<Self> {
        let mut magic = [0u8; 4];
        input.read_exact(&mut magic)?;
        if &magic != b"BAM\x01" {
            return Err(EngineError::InputFormat("bad BAM magic".into()));
        }

        let l_text = input.read_i32::<LE>()?;
        let mut text = vec![0u8; l_text.max(0) as usize];
        input.read_exact(&mut text)?;
        // Drop the trailing NUL the writer appends.
        let text_str = String::from_utf8_lossy(&text);
        let text_str = text_str.trim_end_matches('\0');
        let mut header = Header::parse_text(text_str);

        let n_ref = input.read_i32::<LE>()?;
        // The text header already carries @SQ lines; only rebuild the
        // reference dictionary from the binary block if it's empty (a
        // headerless BAM or a header with no @SQ lines).
        if header.references.is_empty() {
            for _ in 0..n_ref {
                let l_name = input.read_i32::<LE>()?;
                let mut name = vec![0u8; l_name.max(0) as usize];
                input.read_exact(&mut name)?;
                let name = String::from_utf8_lossy(&name)
                    .trim_end_matches('\0')
                    .to_string();
                let l_ref = input.read_i32::<LE>()?;
                header.references.push(name, l_ref);
            }
        } else {
            for _ in 0..n_ref {
                let l_name = input.read_i32::<LE>()?;
                let mut skip = vec![0u8; l_name.max(0) as usize + 4];
                input.read_exact(&mut skip)?;
            }
        }

        Ok(Self { input, header })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Reads the next record, or `None` at a clean end of stream.
    pub fn read_record(&mut self) -> EngineResult<Option<AlignmentRecord>> {
        let block_size = match self.input.read_i32::<LE>() {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut block = vec![0u8; block_size as usize];
        self.input.read_exact(&mut block)?;
        let mut cur = std::io::Cursor::new(block);

        let ref_id = cur.read_i32::<LE>()?;
        let position = cur.read_i32::<LE>()?;
        let bin_mq_nl = cur.read_u32::<LE>()?;
        let name_len = (bin_mq_nl & 0xff) as usize;
        let mapq = ((bin_mq_nl >> 8) & 0xff) as u8;
        let flag_nc = cur.read_u32::<LE>()?;
        let n_cigar = (flag_nc & 0xffff) as usize;
        let flags = Flags::new((flag_nc >> 16) as u16);
        let seq_len = cur.read_i32::<LE>()? as usize;
        let mate_ref_id = cur.read_i32::<LE>()?;
        let mate_position = cur.read_i32::<LE>()?;
        let template_len = cur.read_i32::<LE>()?;

        let mut name_buf = vec![0u8; name_len];
        cur.read_exact(&mut name_buf)?;
        let query_name = String::from_utf8_lossy(&name_buf)
            .trim_end_matches('\0')
            .to_string();

        let mut cigar_buf = vec![0u8; n_cigar * 4];
        cur.read_exact(&mut cigar_buf)?;
        let cigar = crate::bamcodec::seq::unpack_cigar(&cigar_buf, n_cigar)?;

        let packed_seq_len = (seq_len + 1) / 2;
        let mut seq_buf = vec![0u8; packed_seq_len];
        cur.read_exact(&mut seq_buf)?;
        let sequence = unpack_sequence(&seq_buf, seq_len);

        let mut qual_buf = vec![0u8; seq_len];
        cur.read_exact(&mut qual_buf)?;
        let qualities = qual_buf.iter().map(|&q| q.wrapping_add(33)).collect();

        let mut tag_buf = Vec::new();
        cur.read_to_end(&mut tag_buf)?;

        Ok(Some(AlignmentRecord {
            query_name,
            ref_id,
            position,
            mapq,
            flags,
            cigar,
            sequence,
            qualities,
            mate_ref_id,
            mate_position,
            template_len,
            tags: TagData::new(tag_buf),
        }))
    }

    pub fn into_inner(self) -> R {
        self.input
    }
}
