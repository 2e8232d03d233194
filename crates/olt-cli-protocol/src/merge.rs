//! Consolidation of the MSC1240XA `filter` listing.
//!
//! The listing prints a provisioned (`Config`) row and a discovered
//! (`Actual`) row per ONT:
//!
//! ```text
//!  AID      | Type   SN               Password  Status  Image Active Version   Vendor/Model
//! ----------+--------------------------------------------------------------------------
//!  1-1-10   | Config 5A5948530A1B2C3D DEFAULT   IS
//!           | Actual 5A5948530A1B2C3D DEFAULT   IS      1     V      V5.40(ABC) ZYXEL
//! ```
//!
//! Rows are merged per AID with the `Actual` values taking precedence.

use crate::error::{ProtocolError, ProtocolResult};
use crate::record::Record;
use crate::table::is_separator_line;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static AID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:-\d+){2,}$").unwrap());
static SERIAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Fa-f]{8,32}$").unwrap());
static VENDOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{3,6}$").unwrap());

/// Header tokens of the filter listing.
pub const FILTER_HEADERS: [&str; 2] = ["AID", "Vendor/Model"];

/// Which half of an ONT entry a row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RowKind {
    Config,
    Actual,
}

impl RowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::Config => "Config",
            RowKind::Actual => "Actual",
        }
    }

    fn from_token(token: &str) -> Option<RowKind> {
        match token {
            "Config" => Some(RowKind::Config),
            "Actual" => Some(RowKind::Actual),
            _ => None,
        }
    }
}

/// One `Config`/`Actual` row of the listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRow {
    pub kind: RowKind,
    pub serial: String,
    pub password: String,
    pub status: String,
    pub image: Option<String>,
    pub active: bool,
    pub version: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
}

impl FilterRow {
    /// Parse the payload right of the AID column.
    pub fn parse(payload: &str) -> Option<FilterRow> {
        let tokens: Vec<&str> = payload
            .split(|c: char| c == '|' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.len() < 4 {
            return None;
        }
        let kind = tokens.iter().find_map(|t| RowKind::from_token(t))?;

        let serial_index = tokens.iter().position(|t| SERIAL.is_match(t))?;
        let field = |offset: usize| {
            tokens
                .get(serial_index + offset)
                .map(|t| t.to_string())
                .unwrap_or_default()
        };
        let mut row = FilterRow {
            kind,
            serial: tokens[serial_index].to_string(),
            password: field(1),
            status: field(2),
            image: None,
            active: false,
            version: None,
            vendor: None,
            model: None,
        };

        let mut tail = tokens.get(serial_index + 3..).unwrap_or_default();
        if let Some((first, rest)) = tail.split_first() {
            if first.chars().all(|c| c.is_ascii_digit()) {
                row.image = Some(first.to_string());
                tail = rest;
            }
        }
        // Active marker, printed once or twice.
        for _ in 0..2 {
            if let Some((first, rest)) = tail.split_first() {
                if first.eq_ignore_ascii_case("V") {
                    row.active = true;
                    tail = rest;
                }
            }
        }
        if let Some((first, rest)) = tail.split_first() {
            if first.starts_with('V') {
                row.version = Some(first.to_string());
                tail = rest;
            }
        }
        if !tail.is_empty() {
            let rest = tail.join(" ");
            if VENDOR.is_match(&rest) || rest.to_ascii_uppercase().starts_with("ZY") {
                row.vendor = Some(rest);
            } else {
                row.model = Some(rest);
            }
        }
        Some(row)
    }

    fn apply_to(&self, record: &mut Record) {
        record.insert("Type", self.kind.as_str());
        for (key, value) in [
            ("SN", &self.serial),
            ("Password", &self.password),
            ("Status", &self.status),
        ] {
            if !value.is_empty() {
                record.insert(key, value.as_str());
            }
        }
        let optional = [
            ("Image", self.image.as_deref()),
            ("Active", self.active.then_some("V")),
            ("FW Version", self.version.as_deref()),
            ("Vendor", self.vendor.as_deref()),
            ("Model", self.model.as_deref()),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                record.insert(key, value);
            }
        }
    }
}

fn aid_sort_key(aid: &str) -> Vec<u32> {
    aid.split('-').filter_map(|part| part.parse().ok()).collect()
}

/// Consolidate the filter listing into one record per AID, sorted by AID.
///
/// Continuation rows with an empty AID column belong to the AID above them.
/// Rows that are neither `Config` nor `Actual`, or carry no serial number,
/// are skipped.
pub fn consolidate_filter_listing(raw: &str) -> ProtocolResult<Vec<Record>> {
    let mut lines = raw.lines();
    lines
        .by_ref()
        .find(|line| FILTER_HEADERS.iter().all(|token| line.contains(token)))
        .ok_or_else(|| ProtocolError::NoHeaderFound {
            required: FILTER_HEADERS.iter().map(|t| t.to_string()).collect(),
        })?;

    let mut rows: BTreeMap<String, BTreeMap<RowKind, FilterRow>> = BTreeMap::new();
    let mut current_aid: Option<String> = None;
    for line in lines {
        if is_separator_line(line) {
            continue;
        }
        let Some((left, payload)) = line.split_once('|') else {
            continue;
        };
        let left = left.trim();
        if AID.is_match(left) {
            current_aid = Some(left.to_string());
        } else if !left.is_empty() {
            current_aid = None;
            continue;
        }
        let (Some(aid), Some(row)) = (current_aid.as_ref(), FilterRow::parse(payload)) else {
            continue;
        };
        rows.entry(aid.clone()).or_default().insert(row.kind, row);
    }

    let mut records: Vec<(Vec<u32>, Record)> = rows
        .into_iter()
        .map(|(aid, by_kind)| {
            let mut record = Record::new();
            record.insert("AID", aid.as_str());
            // Config first so Actual overrides it.
            for row in by_kind.values() {
                row.apply_to(&mut record);
            }
            (aid_sort_key(&aid), record)
        })
        .collect();
    records.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(records.into_iter().map(|(_, record)| record).collect())
}
