use indexmap::IndexMap;

/// Ordered list of (name, length); a record's `ref_id` indexes into this.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceDictionary {
    entries: Vec<(String, i32)>,
    by_name: IndexMap<String, usize>,
}

impl ReferenceDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, length: i32) {
        let name = name.into();
        let idx = self.entries.len();
        self.by_name.insert(name.clone(), idx);
        self.entries.push((name, length));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn name(&self, ref_id: i32) -> Option<&str> {
        if ref_id < 0 {
            return None;
        }
        self.entries.get(ref_id as usize).map(|(n, _)| n.as_str())
    }

    pub fn length(&self, ref_id: i32) -> Option<i32> {
        if ref_id < 0 {
            return None;
        }
        self.entries.get(ref_id as usize).map(|(_, l)| *l)
    }

    pub fn id_of(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).map(|&i| i as i32)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.entries.iter().map(|(n, l)| (n.as_str(), *l))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Unknown,
    Unsorted,
    Queryname,
    Coordinate,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Unknown => "unknown",
            SortOrder::Unsorted => "unsorted",
            SortOrder::Queryname => "queryname",
            SortOrder::Coordinate => "coordinate",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "unsorted" => SortOrder::Unsorted,
            "queryname" => SortOrder::Queryname,
            "coordinate" => SortOrder::Coordinate,
            _ => SortOrder::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReadGroup {
    pub id: String,
    pub library: Option<String>,
    pub sample: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgramRecord {
    pub id: String,
    pub name: Option<String>,
    pub command_line: Option<String>,
    pub previous_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub version: String,
    pub sort_order: SortOrder,
    pub references: ReferenceDictionary,
    pub read_groups: Vec<ReadGroup>,
    pub programs: Vec<ProgramRecord>,
    pub comments: Vec<String>,
}

impl Header {
    pub fn new() -> Self {
        Self { version: "1.6".to_string(), ..Default::default() }
    }

    pub fn read_group(&self, id: &str) -> Option<&ReadGroup> {
        self.read_groups.iter().find(|rg| rg.id == id)
    }

    /// Picks a non-colliding program id, appending `-2`, `-3`, ... to `base`
    /// until a free id is found.
    pub fn next_program_id(&self, base: &str) -> String {
        if self.programs.iter().all(|p| p.id != base) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}-{n}");
            if self.programs.iter().all(|p| p.id != candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    pub fn append_program(&mut self, mut program: ProgramRecord) {
        if let Some(last) = self.programs.last() {
            program.previous_id.get_or_insert_with(|| last.id.clone());
        }
        self.programs.push(program);
    }

    /// Serializes to the textual SAM header form (`@HD`, `@SQ`, `@RG`, `@PG`,
    /// `@CO` lines), used by both the SAM writer and the BAM writer's text
    /// header block.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "@HD\tVN:{}\tSO:{}\n",
            self.version,
            self.sort_order.as_str()
        ));
        for (name, length) in self.references.iter() {
            out.push_str(&format!("@SQ\tSN:{name}\tLN:{length}\n"));
        }
        for rg in &self.read_groups {
            out.push_str(&format!("@RG\tID:{}", rg.id));
            if let Some(lib) = &rg.library {
                out.push_str(&format!("\tLB:{lib}"));
            }
            if let Some(sample) = &rg.sample {
                out.push_str(&format!("\tSM:{sample}"));
            }
            out.push('\n');
        }
        for pg in &self.programs {
            out.push_str(&format!("@PG\tID:{}", pg.id));
            if let Some(name) = &pg.name {
                out.push_str(&format!("\tPN:{name}"));
            }
            if let Some(prev) = &pg.previous_id {
                out.push_str(&format!("\tPP:{prev}"));
            }
            if let Some(cl) = &pg.command_line {
                out.push_str(&format!("\tCL:{cl}"));
            }
            out.push('\n');
        }
        for comment in &self.comments {
            out.push_str(&format!("@CO\t{comment}\n"));
        }
        out
    }

    /// Parses the textual SAM header form produced by [`Header::to_text`].
    pub fn parse_text(text: &str) -> Self {
        let mut header = Header::new();
        for line in text.lines() {
            let mut fields = line.split('\t');
            match fields.next() {
                Some("@HD") => {
                    for f in fields {
                        if let Some(v) = f.strip_prefix("VN:") {
                            header.version = v.to_string();
                        } else if let Some(v) = f.strip_prefix("SO:") {
                            header.sort_order = SortOrder::parse(v);
                        }
                    }
                }
                Some("@SQ") => {
                    let mut name = None;
                    let mut length = None;
                    for f in fields {
                        if let Some(v) = f.strip_prefix("SN:") {
                            name = Some(v.to_string());
                        } else if let Some(v) = f.strip_prefix("LN:") {
                            length = v.parse::<i32>().ok();
                        }
                    }
                    if let (Some(name), Some(length)) = (name, length) {
                        header.references.push(name, length);
                    }
                }
                Some("@RG") => {
                    let mut rg = ReadGroup::default();
                    for f in fields {
                        if let Some(v) = f.strip_prefix("ID:") {
                            rg.id = v.to_string();
                        } else if let Some(v) = f.strip_prefix("LB:") {
                            rg.library = Some(v.to_string());
                        } else if let Some(v) = f.strip_prefix("SM:") {
                            rg.sample = Some(v.to_string());
                        }
                    }
                    header.read_groups.push(rg);
                }
                Some("@PG") => {
                    let mut pg = ProgramRecord::default();
                    for f in fields {
                        if let Some(v) = f.strip_prefix("ID:") {
                            pg.id = v.to_string();
                        } else if let Some(v) = f.strip_prefix("PN:") {
                            pg.name = Some(v.to_string());
                        } else if let Some(v) = f.strip_prefix("PP:") {
                            pg.previous_id = Some(v.to_string());
                        } else if let Some(v) = f.strip_prefix("CL:") {
                            pg.command_line = Some(v.to_string());
                        }
                    }
                    header.programs.push(pg);
                }
                Some("@CO") => {
                    header.comments.push(fields.collect::<Vec<_>>().join("\t"));
                }
                _ => {}
            }
        }
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_id_avoids_collision() {
        let mut header = Header::new();
        header.append_program(ProgramRecord { id: "modsort".into(), ..Default::default() });
        assert_eq!(header.next_program_id("modsort"), "modsort-2");
        header.append_program(ProgramRecord { id: "modsort-2".into(), ..Default::default() });
        assert_eq!(header.next_program_id("modsort"), "modsort-3");
    }

    #[test]
    fn text_round_trip_preserves_references_and_read_groups() {
        let mut header = Header::new();
        header.sort_order = SortOrder::Coordinate;
        header.references.push("chr1", 1000);
        header.references.push("chr2", 2000);
        header.read_groups.push(ReadGroup {
            id: "rg1".into(),
            library: Some("lib1".into()),
            sample: None,
        });
        let text = header.to_text();
        let parsed = Header::parse_text(&text);
        assert_eq!(parsed.sort_order, SortOrder::Coordinate);
        assert_eq!(parsed.references.len(), 2);
        assert_eq!(parsed.references.id_of("chr2"), Some(1));
        assert_eq!(parsed.read_group("rg1").unwrap().library.as_deref(), Some("lib1"));
    }
}
