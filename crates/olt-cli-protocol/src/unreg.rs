//! Unregistered ONT listing.
//!
//! ```text
//! Pon_AID  | Type  SN               Password  Status
//! ---------+------------------------------------------
//! pon-1-3  | UnReg 5A5948530A1B2C3D DEFAULT   Active
//! ```
//!
//! The right-hand side is a single whitespace-delimited segment, so the
//! generic table parser cannot split it.

use crate::record::Record;
use crate::table::is_separator_line;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// `Type SN Password Status` with an 8 to 32 digit hexadecimal serial.
static UNREG_ROW: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<type>\S+)\s+(?P<sn>[0-9A-Fa-f]{8,32})\s+(?P<password>\S+)\s+(?P<status>\S+)\s*$")
        .unwrap()
});

/// An ONT seen on a PON port but not provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnregisteredOnt {
    #[serde(rename = "Pon_AID")]
    pub pon_aid: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "SN")]
    pub serial: String,
    #[serde(rename = "Password")]
    pub password: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl UnregisteredOnt {
    /// Parse one listing line. `None` for headers, rules and anything that
    /// does not have the fixed shape.
    pub fn parse_line(line: &str) -> Option<UnregisteredOnt> {
        let trimmed = line.trim();
        if trimmed.is_empty() || is_separator_line(trimmed) {
            return None;
        }
        let (left, right) = trimmed.split_once('|')?;
        let pon_aid = left.trim();
        if !pon_aid.starts_with("pon-") {
            return None;
        }
        // Some firmware prints the right side as separate cells.
        let right = right.replace('|', " ");
        let caps = UNREG_ROW.captures(right.trim())?;
        Some(UnregisteredOnt {
            pon_aid: pon_aid.to_string(),
            kind: caps["type"].to_string(),
            serial: caps["sn"].to_string(),
            password: caps["password"].to_string(),
            status: caps["status"].to_string(),
        })
    }
}

impl From<UnregisteredOnt> for Record {
    fn from(ont: UnregisteredOnt) -> Record {
        [
            ("Pon_AID", ont.pon_aid),
            ("Type", ont.kind),
            ("SN", ont.serial),
            ("Password", ont.password),
            ("Status", ont.status),
        ]
        .into_iter()
        .collect()
    }
}

/// Parse the unregistered ONT listing. Never fails; odd lines are skipped.
pub fn parse_unregistered(raw: &str) -> Vec<UnregisteredOnt> {
    raw.lines().filter_map(UnregisteredOnt::parse_line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Pon_AID  | Type  SN               Password  Status\r
---------+------------------------------------------\r
pon-1-3  | UnReg 5A5948530A1B2C3D DEFAULT   Active\r
pon-1-4  | UnReg 48575443ABCDEF01 1234567890 Active\r
pon-1-5  | garbage line\r
ont-1-1  | UnReg 5A5948530A1B2C3D DEFAULT Active\r
";

    #[test]
    fn test_parse_listing() {
        let onts = parse_unregistered(LISTING);
        assert_eq!(onts.len(), 2);
        assert_eq!(onts[0].pon_aid, "pon-1-3");
        assert_eq!(onts[0].kind, "UnReg");
        assert_eq!(onts[0].serial, "5A5948530A1B2C3D");
        assert_eq!(onts[0].password, "DEFAULT");
        assert_eq!(onts[0].status, "Active");
        assert_eq!(onts[1].password, "1234567890");
    }

    #[test]
    fn test_serial_must_be_hex() {
        assert!(UnregisteredOnt::parse_line("pon-1-1 | UnReg ZZZZZZZZZZ DEFAULT Active").is_none());
        assert!(UnregisteredOnt::parse_line("pon-1-1 | UnReg 5A59 DEFAULT Active").is_none());
    }

    #[test]
    fn test_cell_separated_variant() {
        let ont = UnregisteredOnt::parse_line("pon-2-1 | UnReg | 5A5948530A1B2C3D | DEFAULT | Active")
            .unwrap();
        assert_eq!(ont.status, "Active");
    }

    #[test]
    fn test_serialized_keys() {
        let ont = parse_unregistered(LISTING).remove(0);
        let json = serde_json::to_value(&ont).unwrap();
        assert_eq!(json["Pon_AID"], "pon-1-3");
        assert_eq!(json["SN"], "5A5948530A1B2C3D");
        let record = Record::from(ont);
        assert_eq!(
            record.keys().collect::<Vec<_>>(),
            vec!["Pon_AID", "Type", "SN", "Password", "Status"]
        );
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_unregistered("").is_empty());
    }
}
