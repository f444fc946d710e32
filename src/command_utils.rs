use anyhow::{anyhow, Context};

use crate::bamcodec::framing::DetectedFormat;
use crate::header::{Header, SortOrder};
use crate::region::Region;

/// Parses a `--format` CLI value into a forced [`DetectedFormat`], if given.
pub fn parse_forced_format(raw: Option<&str>) -> anyhow::Result<Option<DetectedFormat>> {
    match raw {
        None => Ok(None),
        Some("bam") => Ok(Some(DetectedFormat::Bam)),
        Some("sam") => Ok(Some(DetectedFormat::Sam)),
        Some(other) => Err(anyhow!("unsupported format '{other}', expected bam or sam")),
    }
}

pub fn parse_sort_order(raw: &str) -> anyhow::Result<SortOrder> {
    match raw {
        "coordinate" => Ok(SortOrder::Coordinate),
        "queryname" => Ok(SortOrder::Queryname),
        other => Err(anyhow!("unsupported sort order '{other}', expected coordinate or queryname")),
    }
}

/// Parses a `--region` CLI value against the resolved header's reference
/// dictionary, with the CLI's file context folded into the error message.
pub fn parse_region_arg(raw: &str, header: &Header) -> anyhow::Result<Region> {
    Region::parse(raw, &header.references)
        .with_context(|| format!("invalid --region value '{raw}'"))
}

pub fn parse_compression_level(raw: Option<u32>) -> anyhow::Result<Option<u32>> {
    match raw {
        None => Ok(None),
        Some(n) if n <= 9 => Ok(Some(n)),
        Some(n) => Err(anyhow!("compression level {n} out of range 0-9")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_forced_format_rejects_unknown_values() {
        assert!(parse_forced_format(Some("cram")).is_err());
        assert_eq!(parse_forced_format(Some("bam")).unwrap(), Some(DetectedFormat::Bam));
        assert_eq!(parse_forced_format(None).unwrap(), None);
    }

    #[test]
    fn parse_compression_level_rejects_out_of_range() {
        assert!(parse_compression_level(Some(10)).is_err());
        assert_eq!(parse_compression_level(Some(6)).unwrap(), Some(6));
    }
}
