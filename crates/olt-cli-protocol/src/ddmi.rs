//! DDMI receive power readings and the join into ONT listings.
//!
//! `show interface gpon 1-* ddmi status` lists one ONT per line, optionally
//! flagged when the reading crosses an alarm threshold:
//!
//! ```text
//!  ont-1-1-1              -24.44
//!  ont-1-10-28     ++      -7.06
//!  ont-1-12-8       -     -32.22
//! ```

use crate::record::Record;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static DDMI_ONT_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<ont>ont-\d+(?:-\d+){2,})\s+(?:(?:\+\+|\+|--|-)\s+)?(?P<rx>[+-]?\d+(?:\.\d+)?)\s*$")
        .unwrap()
});

/// Extract `ont-<aid>` → reading from DDMI output. Later lines win.
pub fn parse_ddmi_rx(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .filter_map(|line| DDMI_ONT_RX.captures(line))
        .map(|caps| (caps["ont"].to_string(), caps["rx"].to_string()))
        .collect()
}

/// How readings are joined into records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxJoin {
    /// Record field holding the identifier.
    pub id_field: String,
    /// Prefix the readings carry and the identifier may lack.
    pub prefix: String,
    /// Field the reading is written to.
    pub target_field: String,
}

impl Default for RxJoin {
    fn default() -> Self {
        RxJoin {
            id_field: "AID".to_string(),
            prefix: "ont-".to_string(),
            target_field: "ONT Rx".to_string(),
        }
    }
}

impl RxJoin {
    /// Reading key for a record identifier. Already prefixed identifiers are
    /// used as they are.
    pub fn key_for(&self, id: &str) -> String {
        let id = id.trim();
        if id.starts_with(self.prefix.as_str()) {
            id.to_string()
        } else {
            format!("{}{}", self.prefix, id)
        }
    }

    /// Write matching readings into the records. Returns how many records
    /// were enriched; the others are left untouched.
    pub fn apply(&self, records: &mut [Record], readings: &BTreeMap<String, String>) -> usize {
        let mut enriched = 0;
        for record in records.iter_mut() {
            let Some(id) = record.get(&self.id_field).filter(|id| !id.trim().is_empty()) else {
                continue;
            };
            if let Some(reading) = readings.get(&self.key_for(id)) {
                record.insert(self.target_field.as_str(), reading.as_str());
                enriched += 1;
            }
        }
        enriched
    }

    /// Parse `diagnostic_text` and join it into `records`.
    pub fn enrich(&self, mut records: Vec<Record>, diagnostic_text: &str) -> Vec<Record> {
        let readings = parse_ddmi_rx(diagnostic_text);
        self.apply(&mut records, &readings);
        records
    }
}

/// Join DDMI readings into records by `"ont-" + AID`, as `ONT Rx`.
pub fn enrich(records: Vec<Record>, diagnostic_text: &str) -> Vec<Record> {
    RxJoin::default().enrich(records, diagnostic_text)
}
