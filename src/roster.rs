use std::fs;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::encoding::{decode_latin1, repair_double_encoding};
use crate::normalize::search_key;

pub const NAME_HEADER: &str = "Nome";
pub const GROUP_HEADER: &str = "UMP";
pub const CODE_HEADER: &str = "Código";

/// One registered person. `search_key` is derived from `name` when the row is
/// loaded and never recomputed on the query path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub group: String,
    pub code: String,
    search_key: String,
}

impl Record {
    pub fn new(name: String, group: String, code: String) -> Self {
        let search_key = search_key(&name);
        Self {
            name,
            group,
            code,
            search_key,
        }
    }

    pub fn search_key(&self) -> &str {
        &self.search_key
    }
}

/// The in-memory record set. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    records: Vec<Record>,
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("failed to read roster: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed roster data: {0}")]
    Parse(#[from] csv::Error),
}

impl Roster {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Arc<Self>, RosterError> {
        let bytes = fs::read(path.as_ref())?;
        let roster = Self::from_bytes(&bytes)?;
        Ok(Arc::new(roster))
    }

    /// Decode raw roster bytes (Latin-1), parse the CSV, repair each field,
    /// and keep the rows that still carry a name and a code.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RosterError> {
        let text = decode_latin1(bytes);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| canonical_header(h.trim()).to_string())
            .collect();
        let name_col = headers.iter().position(|h| h == NAME_HEADER);
        let group_col = headers.iter().position(|h| h == GROUP_HEADER);
        let code_col = headers.iter().position(|h| h == CODE_HEADER);

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for row in reader.records() {
            let row = row?;
            if row.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let name = repaired_field(&row, name_col);
            let group = repaired_field(&row, group_col);
            let code = repaired_field(&row, code_col);
            if name.is_empty() || code.is_empty() {
                dropped += 1;
                continue;
            }
            records.push(Record::new(name, group, code));
        }

        if dropped > 0 {
            debug!("dropped {dropped} roster rows without a name or code");
        }
        info!("roster loaded: {} records", records.len());
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// All records whose search key contains the normalized query as a
    /// contiguous substring, in dataset order. A query that normalizes to
    /// nothing matches nothing rather than everything.
    pub fn search(&self, query: &str) -> Vec<Record> {
        let term = search_key(query);
        if term.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|record| record.search_key.contains(&term))
            .cloned()
            .collect()
    }

}

/// Rewrite header tokens known to arrive byte-mangled back to their canonical
/// column names. Anything else passes through untouched.
fn canonical_header(raw: &str) -> &str {
    match raw {
        "CÃ³digo" => CODE_HEADER,
        other => other,
    }
}

fn repaired_field(row: &csv::StringRecord, column: Option<usize>) -> String {
    let raw = column
        .and_then(|idx| row.get(idx))
        .unwrap_or_default()
        .trim();
    repair_double_encoding(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    // UTF-8 source that an upstream layer exported as "Latin-1": the bytes on
    // disk are plain UTF-8, so decoding them as Latin-1 mangles every accent
    // and the repair pass has to undo it.
    const EXPORTED: &[u8] =
        "Nome,UMP,Código\nJosé Silva,Catolé,10\nMaria Conceição,Sumé,20\n".as_bytes();

    #[test]
    fn repairs_mangled_headers_and_fields() {
        let roster = Roster::from_bytes(EXPORTED).unwrap();
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.records()[0].name, "José Silva");
        assert_eq!(roster.records()[0].group, "Catolé");
        assert_eq!(roster.records()[0].code, "10");
        assert_eq!(roster.records()[1].name, "Maria Conceição");
        assert_eq!(roster.records()[1].group, "Sumé");
    }

    #[test]
    fn loads_true_latin1_bytes() {
        let bytes = b"Nome,UMP,C\xF3digo\nJos\xE9,Catol\xE9,7\n";
        let roster = Roster::from_bytes(bytes).unwrap();
        assert_eq!(roster.len(), 1);
        // 0xE9 alone is not valid UTF-8, so the repair leaves it be.
        assert_eq!(roster.records()[0].name, "Jos\u{E9}");
        assert_eq!(roster.records()[0].code, "7");
    }

    #[test]
    fn drops_rows_without_name_or_code() {
        let bytes = b"Nome,UMP,C\xC3\xB3digo\n,A,1\nAna,B,\n,,\nBia,C,3\n";
        let roster = Roster::from_bytes(bytes).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.records()[0].name, "Bia");
    }

    #[test]
    fn search_matches_normalized_substrings_in_dataset_order() {
        let bytes = b"Nome,UMP,Codigo\nAna Souza,A,10\nAna Silva,B,20\n";
        // "Codigo" without the accent is not the canonical header.
        let roster = Roster::from_bytes(bytes).unwrap();
        assert!(roster.is_empty());

        let bytes = b"Nome,UMP,C\xC3\xB3digo\nAna Souza,A,10\nAna Silva,B,20\n";
        let roster = Roster::from_bytes(bytes).unwrap();
        let both = roster.search("ana");
        assert_eq!(both.len(), 2);
        assert_eq!(both[0].code, "10");
        assert_eq!(both[1].code, "20");

        let one = roster.search("ANA SOUZA");
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].code, "10");

        let accented = roster.search("Âna");
        assert_eq!(accented.len(), 2);
    }

    #[test]
    fn empty_query_matches_nothing() {
        let roster = Roster::from_bytes(EXPORTED).unwrap();
        assert!(roster.search("").is_empty());
        assert!(roster.search("   ").is_empty());
        assert!(roster.search("?!").is_empty());
    }

    #[test]
    fn quoted_fields_keep_their_commas() {
        let bytes = b"Nome,UMP,C\xC3\xB3digo\n\"Silva, Ana\",A,1\n";
        let roster = Roster::from_bytes(bytes).unwrap();
        assert_eq!(roster.records()[0].name, "Silva, Ana");
    }

    #[test]
    fn load_from_file_roundtrips() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(EXPORTED).unwrap();
        let roster = Roster::load_from_file(file.path()).expect("load roster");
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.records()[1].code, "20");
    }

    #[test]
    fn malformed_quoting_is_a_parse_error() {
        // The unterminated quote swallows the rest of the input into one
        // field, so the record no longer lines up with the header.
        let err = Roster::from_bytes(b"Nome,UMP,C\xC3\xB3digo\n\"unterminated,A,1\n").unwrap_err();
        assert!(matches!(err, RosterError::Parse(_)));
    }

    #[test]
    fn unreadable_path_is_an_io_error() {
        let err = Roster::load_from_file("does/not/exist.csv").unwrap_err();
        assert!(matches!(err, RosterError::Io(_)));
    }
}
