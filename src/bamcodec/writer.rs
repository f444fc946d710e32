use std::io::Write;

use byteorder::{WriteBytesExt, LE};

use crate::bamcodec::bin::calculate_minimum_bin;
use crate::bamcodec::seq::{pack_cigar, pack_sequence};
use crate::errs::EngineResult;
use crate::header::Header;
use crate::record::AlignmentRecord;

/// Writes the uncompressed BAM binary record layout. Generic over the
/// output stream so it can target a spill file, a plain `.bam` file, or a
/// BGZF-wrapped sink (see [`crate::bamcodec::framing`]).
pub struct BamRecordWriter<W: Write> {
    out: W,
}

impl<W: Write> BamRecordWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn write_header(&mut self, header: &Header) -> EngineResult<()> {
        self.out.write_all(b"BAM\x01")?;
        let text = header.to_text();
        // +1 for a defensive trailing NUL, matching the reference writer.
        self.out.write_i32::<LE>(text.len() as i32 + 1)?;
        self.out.write_all(text.as_bytes())?;
        self.out.write_u8(0)?;

        self.out.write_i32::<LE>(header.references.len() as i32)?;
        for (name, length) in header.references.iter() {
            self.out.write_i32::<LE>(name.len() as i32 + 1)?;
            self.out.write_all(name.as_bytes())?;
            self.out.write_u8(0)?;
            self.out.write_i32::<LE>(length)?;
        }
        Ok(())
    }

    pub fn write_record(&mut self, rec: &AlignmentRecord) -> EngineResult<()> {
        let name_len = rec.query_name.len() + 1;
        let n_cigar = rec.cigar.len();
        let seq_len = rec.sequence.chars().count();
        let packed_cigar = pack_cigar(&rec.cigar.0);
        let packed_seq = pack_sequence(&rec.sequence)?;
        let tag_len = rec.tags.as_bytes().len();

        let data_block_size =
            name_len + packed_cigar.len() + packed_seq.len() + seq_len + tag_len;
        let block_size = 32 + data_block_size;

        let bin = calculate_minimum_bin(rec.position, rec.end_position());
        let bin_mq_nl = (bin << 16) | ((rec.mapq as u32) << 8) | (name_len as u32);
        let flag_nc = ((u16::from(rec.flags) as u32) << 16) | (n_cigar as u32);

        self.out.write_i32::<LE>(block_size as i32)?;
        self.out.write_i32::<LE>(rec.ref_id)?;
        self.out.write_i32::<LE>(rec.position)?;
        self.out.write_u32::<LE>(bin_mq_nl)?;
        self.out.write_u32::<LE>(flag_nc)?;
        self.out.write_i32::<LE>(seq_len as i32)?;
        self.out.write_i32::<LE>(rec.mate_ref_id)?;
        self.out.write_i32::<LE>(rec.mate_position)?;
        self.out.write_i32::<LE>(rec.template_len)?;

        self.out.write_all(rec.query_name.as_bytes())?;
        self.out.write_u8(0)?;
        self.out.write_all(&packed_cigar)?;
        self.out.write_all(&packed_seq)?;
        for &q in &rec.qualities {
            // Stored as raw Phred; input is Phred+33 ASCII.
            self.out.write_u8(q.wrapping_sub(33))?;
        }
        self.out.write_all(rec.tags.as_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> EngineResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bamcodec::reader::BamRecordReader;
    use crate::record::{Cigar, CigarOp, Flags, TagData};

    fn sample_record() -> AlignmentRecord {
        AlignmentRecord {
            query_name: "read1".into(),
            ref_id: 0,
            position: 100,
            mapq: 60,
            flags: Flags::new(Flags::PAIRED),
            cigar: Cigar::new(vec![(CigarOp::Match, 10)]),
            sequence: "ACGTACGTAC".into(),
            qualities: vec![40; 10],
            mate_ref_id: 0,
            mate_position: 200,
            template_len: 110,
            tags: TagData::new(crate::record::tags::encode_str_tag("RG", "rg1")),
        }
    }

    #[test]
    fn header_and_record_round_trip() {
        let mut header = Header::new();
        header.references.push("chr1", 1000);

        let mut buf = Vec::new();
        {
            let mut w = BamRecordWriter::new(&mut buf);
            w.write_header(&header).unwrap();
            w.write_record(&sample_record()).unwrap();
        }

        let mut reader = BamRecordReader::new(buf.as_slice()).unwrap();
        assert_eq!(reader.header().references.len(), 1);
        let rec = reader.read_record().unwrap().unwrap();
        assert_eq!(rec, sample_record());
        assert!(reader.read_record().unwrap().is_none());
    }

    #[test]
    fn unmapped_record_with_negative_position_does_not_panic() {
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

        let mut buf = Vec::new();
        let mut w = BamRecordWriter::new(&mut buf);
        w.write_header(&header).unwrap();
        w.write_record(&rec).unwrap();

        let mut reader = BamRecordReader::new(buf.as_slice()).unwrap();
        let round_tripped = reader.read_record().unwrap().unwrap();
        assert_eq!(round_tripped, rec);
    }
}
