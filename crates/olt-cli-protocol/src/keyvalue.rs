//! `label : value` blocks (ONT details).

use crate::record::Record;
use crate::table::{is_separator_line, TableSpec};

/// Split one line into a label and value. Table borders in front of the
/// label are dropped: with `ont-1-1 | Status : IS` the label is `Status`.
pub fn split_label_value(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || is_separator_line(trimmed) {
        return None;
    }
    let (label, value) = trimmed.split_once(':')?;
    let label = match label.rsplit_once('|') {
        Some((_, after)) => after,
        None => label,
    };
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    Some((label, value.trim()))
}

/// Parse a flat `label : value` block. The last duplicate label wins; its
/// position is that of the first occurrence.
pub fn parse_flat_block(raw: &str) -> Record {
    let mut record = Record::new();
    for (label, value) in raw.lines().filter_map(split_label_value) {
        record.insert(label, value);
    }
    record
}

/// Headers of the one-row summary table at the top of OLT1408A details.
pub const SUMMARY_HEADERS: [&str; 2] = ["AID", "SN"];

/// Prefix given to a detail label that repeats a summary column.
pub const DETAIL_PREFIX: &str = "detail_";

/// Parse details that open with a one-row summary table (`AID | Type | SN |
/// ...`) followed by `label : value` lines.
///
/// Summary columns come first. A detail label that repeats a summary column
/// is stored as `detail_<label>`. Without a summary table this is
/// [`parse_flat_block`].
pub fn parse_summary_block(raw: &str) -> Record {
    let details = parse_flat_block(raw);
    let Some(mut record) = TableSpec::new(SUMMARY_HEADERS)
        .without_terminator()
        .parse(raw)
        .ok()
        .and_then(|rows| rows.into_iter().next())
    else {
        return details;
    };

    let summary_keys: Vec<String> = record.keys().map(str::to_string).collect();
    for (label, value) in details.iter() {
        if summary_keys.iter().any(|key| key == label) {
            record.insert(format!("{DETAIL_PREFIX}{label}"), value);
        } else {
            record.insert(label, value);
        }
    }
    record
}
