use crate::errs::{EngineError, EngineResult};
use crate::header::Header;
use crate::record::tags::TagValue;
use crate::record::{AlignmentRecord, Cigar, CigarOp, Flags, TagData};

fn format_tags(tags: &TagData) -> String {
    tags.iter()
        .filter_map(|entry| entry.ok())
        .map(|(name, value)| match value {
            TagValue::Char(c) => format!("{name}:A:{}", c as char),
            TagValue::Int8(v) => format!("{name}:i:{v}"),
            TagValue::UInt8(v) => format!("{name}:i:{v}"),
            TagValue::Int16(v) => format!("{name}:i:{v}"),
            TagValue::UInt16(v) => format!("{name}:i:{v}"),
            TagValue::Int32(v) => format!("{name}:i:{v}"),
            TagValue::UInt32(v) => format!("{name}:i:{v}"),
            TagValue::Float(v) => format!("{name}:f:{v}"),
            TagValue::Str(v) => format!("{name}:Z:{v}"),
            TagValue::Hex(v) => format!("{name}:H:{v}"),
            TagValue::Array(_) => format!("{name}:B:c"),
        })
        .collect::<Vec<_>>()
        .join("\t")
}

fn parse_cigar_str(raw: &str) -> EngineResult<Cigar> {
    if raw == "*" {
        return Ok(Cigar::default());
    }
    let mut ops = Vec::new();
    let mut len_start = 0;
    for (i, c) in raw.char_indices() {
        if c.is_ascii_digit() {
            continue;
        }
        let len: u32 = raw[len_start..i].parse().map_err(|_| {
            EngineError::InputFormat(format!("invalid CIGAR length in '{raw}'"))
        })?;
        ops.push((CigarOp::from_char(c)?, len));
        len_start = i + c.len_utf8();
    }
    Ok(Cigar::new(ops))
}

fn cigar_to_string(cigar: &Cigar) -> String {
    if cigar.is_empty() {
        return "*".to_string();
    }
    cigar.0.iter().map(|(op, len)| format!("{len}{op}")).collect()
}

/// Serializes one record to a tab-delimited SAM line.
pub fn record_to_sam_line(rec: &AlignmentRecord, header: &Header) -> String {
    let rname = header.references.name(rec.ref_id).unwrap_or("*");
    let rnext = if rec.mate_ref_id == rec.ref_id && rec.mate_ref_id >= 0 {
        "=".to_string()
    } else {
        header.references.name(rec.mate_ref_id).unwrap_or("*").to_string()
    };
    let qual: String = rec.qualities.iter().map(|&q| q as char).collect();
    let mut line = format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        rec.query_name,
        u16::from(rec.flags),
        rname,
        rec.position + 1,
        rec.mapq,
        cigar_to_string(&rec.cigar),
        rnext,
        rec.mate_position + 1,
        rec.template_len,
        if rec.sequence.is_empty() { "*" } else { &rec.sequence },
        if qual.is_empty() { "*" } else { &qual },
    );
    let tags = format_tags(&rec.tags);
    if !tags.is_empty() {
        line.push('\t');
        line.push_str(&tags);
    }
    line
}

/// Parses one tab-delimited SAM line back into a record.
pub fn record_from_sam_line(line: &str, header: &Header) -> EngineResult<AlignmentRecord> {
    let mut fields = line.split('\t');
    let mut next = |what: &str| -> EngineResult<&str> {
        fields
            .next()
            .ok_or_else(|| EngineError::InputFormat(format!("SAM line missing {what}")))
    };

    let query_name = next("QNAME")?.to_string();
    let flag_val: u16 = next("FLAG")?
        .parse()
        .map_err(|_| EngineError::InputFormat("bad FLAG field".into()))?;
    let flags = Flags::new(flag_val);
    let rname = next("RNAME")?;
    let ref_id = if rname == "*" { -1 } else { header.references.id_of(rname).unwrap_or(-1) };
    let pos: i32 = next("POS")?
        .parse()
        .map_err(|_| EngineError::InputFormat("bad POS field".into()))?;
    let mapq: u8 = next("MAPQ")?
        .parse()
        .map_err(|_| EngineError::InputFormat("bad MAPQ field".into()))?;
    let cigar = parse_cigar_str(next("CIGAR")?)?;
    let rnext = next("RNEXT")?;
    let mate_ref_id = if rnext == "*" {
        -1
    } else if rnext == "=" {
        ref_id
    } else {
        header.references.id_of(rnext).unwrap_or(-1)
    };
    let mate_position: i32 = next("PNEXT")?
        .parse()
        .map_err(|_| EngineError::InputFormat("bad PNEXT field".into()))?;
    let template_len: i32 = next("TLEN")?
        .parse()
        .map_err(|_| EngineError::InputFormat("bad TLEN field".into()))?;
    let seq = next("SEQ")?;
    let sequence = if seq == "*" { String::new() } else { seq.to_string() };
    let qual = next("QUAL")?;
    let qualities = if qual == "*" { vec![] } else { qual.bytes().collect() };

    let mut tag_bytes = Vec::new();
    for field in fields {
        let mut parts = field.splitn(3, ':');
        let (Some(name), Some(ty), Some(val)) = (parts.next(), parts.next(), parts.next()) else {
            continue;
        };
        match ty {
            "Z" => tag_bytes.extend(crate::record::tags::encode_str_tag(name, val)),
            "i" => {
                tag_bytes.extend_from_slice(name.as_bytes());
                tag_bytes.push(b'i');
                let v: i32 = val.parse().unwrap_or(0);
                tag_bytes.extend_from_slice(&v.to_le_bytes());
            }
            "A" => {
                tag_bytes.extend_from_slice(name.as_bytes());
                tag_bytes.push(b'A');
                tag_bytes.push(val.as_bytes().first().copied().unwrap_or(b' '));
            }
            "f" => {
                tag_bytes.extend_from_slice(name.as_bytes());
                tag_bytes.push(b'f');
                let v: f32 = val.parse().unwrap_or(0.0);
                tag_bytes.extend_from_slice(&v.to_le_bytes());
            }
            _ => {}
        }
    }

    Ok(AlignmentRecord {
        query_name,
        ref_id,
        position: pos - 1,
        mapq,
        flags,
        cigar,
        sequence,
        qualities,
        mate_ref_id,
        mate_position: mate_position - 1,
        template_len,
        tags: TagData::new(tag_bytes),
    })
}
