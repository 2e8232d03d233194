//! ONT status history.
//!
//! ```text
//!  AID         | Status Time
//! -------------+---------------------------
//!  ont-2-16-40 | 1 IS 2026/ 1/14 16:16:27
//!              | 2 OOS-NP 2026/ 1/14 16:02:11
//! ```

use crate::table::{is_separator_line, split_cells};
use serde::Serialize;

/// One entry of the status history, in device order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub status: String,
    pub timestamp: String,
}

fn is_history_header(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("AID") && trimmed.contains("Status") && trimmed.contains("Time")
}

/// Parse one history line.
fn parse_event(line: &str) -> Option<StatusEvent> {
    let (_, right) = line.split_once('|')?;
    let right = right.trim();
    if right.is_empty() {
        return None;
    }

    if right.contains('|') {
        // status | time
        let cells = split_cells(right);
        let status = cells.first().filter(|cell| !cell.is_empty())?;
        let timestamp = cells[1..].join(" ");
        if timestamp.trim().is_empty() {
            return None;
        }
        return Some(StatusEvent {
            status: status.clone(),
            timestamp: timestamp.trim().to_string(),
        });
    }

    // index status time...
    let tokens: Vec<&str> = right.split_whitespace().collect();
    if tokens.len() < 3 || !tokens[0].chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(StatusEvent {
        status: tokens[1].to_string(),
        timestamp: tokens[2..].join(" "),
    })
}

/// Parse the status history listing. Lines that do not fit are skipped.
pub fn parse_status_history(raw: &str) -> Vec<StatusEvent> {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !is_separator_line(line) && !is_history_header(line))
        .filter_map(parse_event)
        .collect()
}
