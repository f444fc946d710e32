use crate::errs::{EngineError, EngineResult};

/// The raw BAM tag stream for one record: a sequence of (2-byte tag name,
/// 1-byte type code, value) triples, kept opaque end-to-end and parsed on
/// demand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagData(pub Vec<u8>);

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Char(u8),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float(f32),
    Str(String),
    Hex(String),
    Array(Vec<u8>),
}

impl TagData {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn iter(&self) -> TagIter<'_> {
        TagIter { buf: &self.0, pos: 0 }
    }

    /// Looks up a two-letter tag (e.g. `"RG"`) and returns its value as a
    /// string, which is all mark-duplicates ever needs from a tag.
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.iter().find_map(|entry| match entry {
            Ok((tag, TagValue::Str(s))) if tag == name => Some(s),
            _ => None,
        })
    }
}

pub struct TagIter<'a> {
    buf: &'a [u8],
    pos: usize,
}

fn value_size_fixed(type_code: u8) -> Option<usize> {
    match type_code {
        b'A' | b'c' | b'C' => Some(1),
        b's' | b'S' => Some(2),
        b'i' | b'I' | b'f' => Some(4),
        _ => None,
    }
}

impl<'a> Iterator for TagIter<'a> {
    type Item = EngineResult<(String, TagValue)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        if self.pos + 3 > self.buf.len() {
            return Some(Err(EngineError::InputFormat(
                "truncated tag header".into(),
            )));
        }
        let tag = String::from_utf8_lossy(&self.buf[self.pos..self.pos + 2]).to_string();
        let type_code = self.buf[self.pos + 2];
        let value_start = self.pos + 3;

        let (value, consumed) = match type_code {
            b'A' => (TagValue::Char(self.buf[value_start]), 1),
            b'c' => (TagValue::Int8(self.buf[value_start] as i8), 1),
            b'C' => (TagValue::UInt8(self.buf[value_start]), 1),
            b's' => {
                let v = i16::from_le_bytes([self.buf[value_start], self.buf[value_start + 1]]);
                (TagValue::Int16(v), 2)
            }
            b'S' => {
                let v = u16::from_le_bytes([self.buf[value_start], self.buf[value_start + 1]]);
                (TagValue::UInt16(v), 2)
            }
            b'i' => {
                let v = i32::from_le_bytes(
                    self.buf[value_start..value_start + 4].try_into().unwrap(),
                );
                (TagValue::Int32(v), 4)
            }
            b'I' => {
                let v = u32::from_le_bytes(
                    self.buf[value_start..value_start + 4].try_into().unwrap(),
                );
                (TagValue::UInt32(v), 4)
            }
            b'f' => {
                let v = f32::from_le_bytes(
                    self.buf[value_start..value_start + 4].try_into().unwrap(),
                );
                (TagValue::Float(v), 4)
            }
            b'Z' | b'H' => {
                let end = self.buf[value_start..]
                    .iter()
                    .position(|&b| b == 0)
                    .map(|p| value_start + p);
                match end {
                    Some(end) => {
                        let s =
                            String::from_utf8_lossy(&self.buf[value_start..end]).to_string();
                        let consumed = end - value_start + 1;
                        if type_code == b'Z' {
                            (TagValue::Str(s), consumed)
                        } else {
                            (TagValue::Hex(s), consumed)
                        }
                    }
                    None => {
                        return Some(Err(EngineError::InputFormat(
                            "unterminated string tag value".into(),
                        )))
                    }
                }
            }
            b'B' => {
                if value_start + 5 > self.buf.len() {
                    return Some(Err(EngineError::InputFormat(
                        "truncated array tag header".into(),
                    )));
                }
                let subtype = self.buf[value_start];
                let count = u32::from_le_bytes(
                    self.buf[value_start + 1..value_start + 5].try_into().unwrap(),
                ) as usize;
                let elem_size = value_size_fixed(subtype).unwrap_or(1);
                let data_len = 5 + count * elem_size;
                let data = self.buf[value_start..value_start + data_len].to_vec();
                (TagValue::Array(data), data_len)
            }
            other => {
                return Some(Err(EngineError::InputFormat(format!(
                    "unsupported tag type code '{}'",
                    other as char
                ))))
            }
        };

        self.pos = value_start + consumed;
        Some(Ok((tag, value)))
    }
}

pub fn encode_str_tag(name: &str, value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(3 + value.len() + 1);
    out.extend_from_slice(name.as_bytes());
    out.push(b'Z');
    out.extend_from_slice(value.as_bytes());
    out.push(0);
    out
}
