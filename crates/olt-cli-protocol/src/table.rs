//! Pipe-delimited table parsing.
//!
//! OLT listings look like
//!
//! ```text
//!  AID        | SN               | Status | Template
//! ------------+------------------+--------+---------
//!  ont-1-1-1  | 5A5948530A1B2C3D | IS     | default
//! Total: 1
//! ```
//!
//! The header row is located dynamically (banners and blank lines may come
//! first) and its cells become the record keys.

use crate::error::{ProtocolError, ProtocolResult};
use crate::record::TableRecord;

/// Terminator used by every OLT listing.
pub const DEFAULT_TERMINATOR: &str = "Total:";

/// Whether a line is a table rule such as `----+----`, `|---+---|` or a plain
/// dash line.
pub fn is_separator_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains('-')
        && trimmed
            .chars()
            .all(|c| matches!(c, '-' | '+' | '|') || c.is_whitespace())
}

/// Split a table line into trimmed cells, dropping one border `|` on each side.
pub fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// Description of one table query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    required_headers: Vec<String>,
    terminator: Option<String>,
    row_prefix: Option<String>,
}

impl TableSpec {
    /// A table whose header line contains every token in `required_headers`.
    pub fn new<I, S>(required_headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TableSpec {
            required_headers: required_headers.into_iter().map(Into::into).collect(),
            terminator: Some(DEFAULT_TERMINATOR.to_string()),
            row_prefix: None,
        }
    }

    /// Stop at the first line starting with `terminator` (case-insensitive).
    pub fn with_terminator(mut self, terminator: impl Into<String>) -> Self {
        self.terminator = Some(terminator.into());
        self
    }

    /// Read rows until the end of the text.
    pub fn without_terminator(mut self) -> Self {
        self.terminator = None;
        self
    }

    /// Only keep rows whose first cell starts with `prefix`.
    pub fn with_row_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.row_prefix = Some(prefix.into());
        self
    }

    pub fn required_headers(&self) -> &[String] {
        &self.required_headers
    }

    /// Whether `line` qualifies as the header row.
    pub fn is_header(&self, line: &str) -> bool {
        line.contains('|')
            && self
                .required_headers
                .iter()
                .all(|token| line.contains(token.as_str()))
    }

    fn is_terminator(&self, line: &str) -> bool {
        match &self.terminator {
            Some(terminator) => {
                let head = line.trim_start();
                head.len() >= terminator.len()
                    && head.is_char_boundary(terminator.len())
                    && head[..terminator.len()].eq_ignore_ascii_case(terminator)
            }
            None => false,
        }
    }

    /// Parse the table out of `raw`.
    ///
    /// The first qualifying header wins. Rows that cannot be read (no `|`,
    /// separator rules, all cells empty, wrong prefix) are skipped.
    pub fn parse(&self, raw: &str) -> ProtocolResult<Vec<TableRecord>> {
        let lines: Vec<&str> = raw.lines().collect();
        let header_index = lines
            .iter()
            .position(|line| self.is_header(line))
            .ok_or_else(|| ProtocolError::NoHeaderFound {
                required: self.required_headers.clone(),
            })?;

        let headers = header_names(lines[header_index]);
        let mut rest = lines[header_index + 1..].iter().peekable();
        let _rule = rest.next_if(|line| is_separator_line(line));

        let mut records = Vec::new();
        for line in rest {
            if self.is_terminator(line) {
                break;
            }
            if !line.contains('|') || is_separator_line(line) {
                continue;
            }
            let mut cells = split_cells(line);
            if cells.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            cells.resize(headers.len(), String::new());
            if let Some(prefix) = &self.row_prefix {
                if !cells.first().is_some_and(|cell| cell.starts_with(prefix.as_str())) {
                    continue;
                }
            }
            records.push(headers.iter().cloned().zip(cells).collect());
        }
        Ok(records)
    }
}

/// Header cells with blanks named `col_<index>` and duplicates made unique.
fn header_names(line: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (index, cell) in split_cells(line).into_iter().enumerate() {
        let mut name = if cell.is_empty() {
            format!("col_{index}")
        } else {
            cell
        };
        if names.contains(&name) {
            name = format!("{name}_{index}");
        }
        names.push(name);
    }
    names
}

/// Parse a table whose header contains every token in `required_headers`,
/// stopping at `Total:`.
pub fn parse_table(raw: &str, required_headers: &[&str]) -> ProtocolResult<Vec<TableRecord>> {
    TableSpec::new(required_headers.iter().copied()).parse(raw)
}
