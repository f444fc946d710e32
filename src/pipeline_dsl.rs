use nom::bytes::complete::is_not;
use nom::character::complete::{alphanumeric1, char, multispace0};
use nom::multi::separated_list0;
use nom::sequence::{delimited, separated_pair};
use nom::IResult;

use crate::errs::{EngineError, EngineResult};

/// One `name key=value key=value ...` line of a pipeline script. This is
/// the thin seam that turns a script into stage specs for the `pipeline`
/// subcommand to wire up; interpreting the resulting graph is the caller's
/// job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSpec {
    pub name: String,
    pub args: Vec<(String, String)>,
}

fn ident(input: &str) -> IResult<&str, &str> {
    alphanumeric1(input)
}

fn kv_pair(input: &str) -> IResult<&str, (String, String)> {
    let (input, (key, value)) =
        separated_pair(ident, char('='), is_not(" \t\r\n"))(input)?;
    Ok((input, (key.to_string(), value.to_string())))
}

fn stage_line(input: &str) -> IResult<&str, StageSpec> {
    let (input, name) = ident(input)?;
    let (input, args) =
        separated_list0(multispace0, delimited(multispace0, kv_pair, multispace0))(input)?;
    Ok((input, StageSpec { name: name.to_string(), args }))
}

/// Parses a pipeline script: one stage per non-empty, non-`#`-comment line.
pub fn parse_script(text: &str) -> EngineResult<Vec<StageSpec>> {
    let mut stages = Vec::new();
    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (rest, spec) = stage_line(line).map_err(|_| {
            EngineError::Config(format!("line {}: invalid pipeline stage '{line}'", lineno + 1))
        })?;
        if !rest.trim().is_empty() {
            return Err(EngineError::Config(format!(
                "line {}: unexpected trailing text '{rest}'",
                lineno + 1
            )));
        }
        stages.push(spec);
    }
    Ok(stages)
}

impl StageSpec {
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stages_with_key_value_args() {
        let script = "\
# a comment
read path=in.bam
filter region=chr1:100..200 mapq=30
dedup remove=true
write path=out.bam format=bam
";
        let stages = parse_script(script).unwrap();
        assert_eq!(stages.len(), 4);
        assert_eq!(stages[0].name, "read");
        assert_eq!(stages[0].arg("path"), Some("in.bam"));
        assert_eq!(stages[1].arg("mapq"), Some("30"));
        assert_eq!(stages[2].arg("remove"), Some("true"));
    }

    #[test]
    fn blank_lines_and_comments_are_skipped() {
        let stages = parse_script("\n# nothing here\n\ndedup\n").unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].name, "dedup");
    }

    #[test]
    fn malformed_line_is_a_config_error() {
        assert!(parse_script("filter mapq=").is_err());
    }
}
