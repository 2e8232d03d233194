//! ONT configuration block parsing.
//!
//! `show remote ont <aid> config` prints the running configuration as a two
//! column table. The left column names the section (the ONT itself or one of
//! its UNI ports), the right column holds one or more `|`-separated
//! directives:
//!
//! ```text
//!  AID             | Details
//! -----------------+---------------------------------------------------
//!  ont-6-4-4       | sn 5A5948530A1B2C3D | password DEFAULT
//!                  | no inactive
//!                  | bwgroup 1 usbwprofname 1G dsbwprofname 1G allocid 256
//!  uniport-6-4-4-2-1 | no inactive | queue tc 0 priority 0 weight 0 ...
//!                  | vlan 10 priority 0 mvlan 10
//! ```
//!
//! Each directive is run through an ordered list of tagged matchers; the
//! first one that extracts a value wins. Directives no matcher understands
//! (and directives that would overwrite an attribute already set) are kept
//! verbatim in the section's `lines`, so no input is ever dropped.

use crate::table::{is_separator_line, split_cells};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute names used for the structured lists of a node.
const RESERVED_KEYS: &[&str] = &["vlans", "queues", "lines"];

/// Lower-case a directive keyword and map `-` (and inner blanks) to `_`.
pub fn normalize_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
        .replace('-', "_")
}

fn keyword_is(token: &str, keyword: &str) -> bool {
    token.eq_ignore_ascii_case(keyword)
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> Option<()> {
    if slot.is_some() {
        return None;
    }
    *slot = Some(value);
    Some(())
}

// ============================================================================
// Values
// ============================================================================

/// Scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Text(String),
    /// Negated directive (`no inactive` → `inactive: false`).
    Flag(bool),
}

impl ConfigValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(text) => Some(text),
            ConfigValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            ConfigValue::Flag(flag) => Some(*flag),
            ConfigValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Text(text) => f.write_str(text),
            ConfigValue::Flag(flag) => write!(f, "{flag}"),
        }
    }
}

/// `vlan <id> [priority p] [mvlan m] [gemport g] [ingprof i] [aesencrypt a] [network n]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VlanEntry {
    pub vlan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mvlan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingprof: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aesencrypt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
}

impl VlanEntry {
    /// Extract a VLAN entry. Unknown or repeated options reject the line.
    pub fn from_tokens(tokens: &[&str]) -> Option<VlanEntry> {
        let (&keyword, rest) = tokens.split_first()?;
        let (&vlan, options) = rest.split_first()?;
        if !keyword_is(keyword, "vlan") || options.len() % 2 != 0 {
            return None;
        }
        let mut entry = VlanEntry {
            vlan: vlan.to_string(),
            ..Default::default()
        };
        for pair in options.chunks(2) {
            let slot = match normalize_key(pair[0]).as_str() {
                "priority" => &mut entry.priority,
                "mvlan" => &mut entry.mvlan,
                "gemport" => &mut entry.gemport,
                "ingprof" => &mut entry.ingprof,
                "aesencrypt" => &mut entry.aesencrypt,
                "network" => &mut entry.network,
                _ => return None,
            };
            set_once(slot, pair[1].to_string())?;
        }
        Some(entry)
    }

    fn options(&self) -> [(&'static str, Option<&String>); 6] {
        [
            ("priority", self.priority.as_ref()),
            ("mvlan", self.mvlan.as_ref()),
            ("gemport", self.gemport.as_ref()),
            ("ingprof", self.ingprof.as_ref()),
            ("aesencrypt", self.aesencrypt.as_ref()),
            ("network", self.network.as_ref()),
        ]
    }

    pub fn to_source(&self) -> String {
        let mut source = format!("vlan {}", self.vlan);
        for (key, value) in self.options() {
            if let Some(value) = value {
                source.push_str(&format!(" {key} {value}"));
            }
        }
        source
    }
}

/// `queue tc <n> priority <n> weight <n> usbwprofname <s> dsbwprofname <s> dsoption <s> [bwsharegroupid <s>]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub tc: u32,
    pub priority: u32,
    pub weight: u32,
    pub usbwprofname: String,
    pub dsbwprofname: String,
    pub dsoption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bwsharegroupid: Option<String>,
}

impl QueueEntry {
    /// Extract a queue entry. Every field but `bwsharegroupid` is required.
    pub fn from_tokens(tokens: &[&str]) -> Option<QueueEntry> {
        if tokens.len() < 3 || !keyword_is(tokens[0], "queue") || !keyword_is(tokens[1], "tc") {
            return None;
        }
        let tc = tokens[2].parse().ok()?;
        let options = &tokens[3..];
        if options.len() % 2 != 0 {
            return None;
        }

        let mut priority = None;
        let mut weight = None;
        let mut usbwprofname = None;
        let mut dsbwprofname = None;
        let mut dsoption = None;
        let mut bwsharegroupid = None;
        for pair in options.chunks(2) {
            let value = pair[1];
            match normalize_key(pair[0]).as_str() {
                "priority" => set_once(&mut priority, value.parse::<u32>().ok()?)?,
                "weight" => set_once(&mut weight, value.parse::<u32>().ok()?)?,
                "usbwprofname" => set_once(&mut usbwprofname, value.to_string())?,
                "dsbwprofname" => set_once(&mut dsbwprofname, value.to_string())?,
                "dsoption" => set_once(&mut dsoption, value.to_string())?,
                "bwsharegroupid" => set_once(&mut bwsharegroupid, value.to_string())?,
                _ => return None,
            }
        }

        Some(QueueEntry {
            tc,
            priority: priority?,
            weight: weight?,
            usbwprofname: usbwprofname?,
            dsbwprofname: dsbwprofname?,
            dsoption: dsoption?,
            bwsharegroupid,
        })
    }

    pub fn to_source(&self) -> String {
        let mut source = format!(
            "queue tc {} priority {} weight {} usbwprofname {} dsbwprofname {} dsoption {}",
            self.tc, self.priority, self.weight, self.usbwprofname, self.dsbwprofname, self.dsoption
        );
        if let Some(group) = &self.bwsharegroupid {
            source.push_str(&format!(" bwsharegroupid {group}"));
        }
        source
    }
}

/// `bwgroup <id> [usbwprofname p] [dsbwprofname p] [allocid n]`, merged into
/// the section as scalar attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BandwidthGroup {
    pub bwgroup: String,
    pub usbwprofname: Option<String>,
    pub dsbwprofname: Option<String>,
    pub allocid: Option<String>,
}

impl BandwidthGroup {
    pub fn from_tokens(tokens: &[&str]) -> Option<BandwidthGroup> {
        let (&keyword, rest) = tokens.split_first()?;
        let (&id, options) = rest.split_first()?;
        if !keyword_is(keyword, "bwgroup") || options.len() % 2 != 0 {
            return None;
        }
        let mut group = BandwidthGroup {
            bwgroup: id.to_string(),
            ..Default::default()
        };
        for pair in options.chunks(2) {
            let slot = match normalize_key(pair[0]).as_str() {
                "usbwprofname" => &mut group.usbwprofname,
                "dsbwprofname" => &mut group.dsbwprofname,
                "allocid" => &mut group.allocid,
                _ => return None,
            };
            set_once(slot, pair[1].to_string())?;
        }
        Some(group)
    }

    /// The attributes this group sets, in source order.
    pub fn scalars(&self) -> Vec<(&'static str, &str)> {
        let mut scalars = vec![("bwgroup", self.bwgroup.as_str())];
        for (key, value) in [
            ("usbwprofname", &self.usbwprofname),
            ("dsbwprofname", &self.dsbwprofname),
            ("allocid", &self.allocid),
        ] {
            if let Some(value) = value {
                scalars.push((key, value.as_str()));
            }
        }
        scalars
    }

    pub fn to_source(&self) -> String {
        let mut source = String::from("bwgroup");
        for (index, (key, value)) in self.scalars().into_iter().enumerate() {
            if index == 0 {
                source.push_str(&format!(" {value}"));
            } else {
                source.push_str(&format!(" {key} {value}"));
            }
        }
        source
    }
}

/// A directive extracted by a matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Vlan(VlanEntry),
    Queue(QueueEntry),
    BandwidthGroup(BandwidthGroup),
    Flag { key: String, value: bool },
    Scalar { key: String, value: String },
}

impl Directive {
    /// Re-serialise the directive as a console line.
    pub fn to_source(&self) -> String {
        match self {
            Directive::Vlan(entry) => entry.to_source(),
            Directive::Queue(entry) => entry.to_source(),
            Directive::BandwidthGroup(group) => group.to_source(),
            Directive::Flag { key, value: false } => format!("no {key}"),
            Directive::Flag { key, value: true } => key.clone(),
            Directive::Scalar { key, value } => format!("{key} {value}"),
        }
    }
}

// ============================================================================
// Matchers and profiles
// ============================================================================

/// Identifies which matcher classified a directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatcherTag {
    Vlan,
    Queue,
    BandwidthGroup,
    NegatedFlag,
    ColonPair,
    PairScalar,
    RemainderScalar,
}

/// A pure extractor over one directive, tagged for reporting.
#[derive(Debug, Clone, Copy)]
pub struct Matcher {
    pub tag: MatcherTag,
    extract: fn(&str) -> Option<Directive>,
}

impl Matcher {
    pub const VLAN: Matcher = Matcher {
        tag: MatcherTag::Vlan,
        extract: match_vlan,
    };
    pub const QUEUE: Matcher = Matcher {
        tag: MatcherTag::Queue,
        extract: match_queue,
    };
    pub const BANDWIDTH_GROUP: Matcher = Matcher {
        tag: MatcherTag::BandwidthGroup,
        extract: match_bandwidth_group,
    };
    pub const NEGATED_FLAG: Matcher = Matcher {
        tag: MatcherTag::NegatedFlag,
        extract: match_negated_flag,
    };
    pub const COLON_PAIR: Matcher = Matcher {
        tag: MatcherTag::ColonPair,
        extract: match_colon_pair,
    };
    pub const PAIR_SCALAR: Matcher = Matcher {
        tag: MatcherTag::PairScalar,
        extract: match_pair_scalar,
    };
    pub const REMAINDER_SCALAR: Matcher = Matcher {
        tag: MatcherTag::RemainderScalar,
        extract: match_remainder_scalar,
    };

    pub fn extract(&self, fragment: &str) -> Option<Directive> {
        (self.extract)(fragment)
    }
}

fn tokens(fragment: &str) -> Vec<&str> {
    fragment.split_whitespace().collect()
}

fn match_vlan(fragment: &str) -> Option<Directive> {
    VlanEntry::from_tokens(&tokens(fragment)).map(Directive::Vlan)
}

fn match_queue(fragment: &str) -> Option<Directive> {
    QueueEntry::from_tokens(&tokens(fragment)).map(Directive::Queue)
}

fn match_bandwidth_group(fragment: &str) -> Option<Directive> {
    BandwidthGroup::from_tokens(&tokens(fragment)).map(Directive::BandwidthGroup)
}

fn match_negated_flag(fragment: &str) -> Option<Directive> {
    match tokens(fragment).as_slice() {
        [no, flag] if keyword_is(no, "no") => Some(Directive::Flag {
            key: normalize_key(flag),
            value: false,
        }),
        _ => None,
    }
}

fn match_colon_pair(fragment: &str) -> Option<Directive> {
    let (key, value) = fragment.split_once(':')?;
    let key = normalize_key(key);
    if key.is_empty() {
        return None;
    }
    Some(Directive::Scalar {
        key,
        value: value.trim().to_string(),
    })
}

fn match_pair_scalar(fragment: &str) -> Option<Directive> {
    match tokens(fragment).as_slice() {
        [key, value] => Some(Directive::Scalar {
            key: normalize_key(key),
            value: value.to_string(),
        }),
        _ => None,
    }
}

fn match_remainder_scalar(fragment: &str) -> Option<Directive> {
    match tokens(fragment).as_slice() {
        [key, rest @ ..] if !rest.is_empty() => Some(Directive::Scalar {
            key: normalize_key(key),
            value: rest.join(" "),
        }),
        _ => None,
    }
}

/// How the section column names the ONT and its ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionStyle {
    /// Fixed prefixes (`ont-…` for the ONT, `uniport-…` for ports).
    Prefixed {
        main: &'static str,
        port: &'static str,
    },
    /// Sections named relative to the queried AID (`1-1-10`, `1-1-10-2-1`).
    AidRelative,
}

impl SectionStyle {
    /// Which section a section-column label opens, if any.
    pub fn classify(&self, label: &str, aid: &str) -> Option<Section> {
        if label.is_empty() || label.contains(char::is_whitespace) {
            return None;
        }
        match *self {
            SectionStyle::Prefixed { main, port } => {
                if label.starts_with(port) {
                    Some(Section::Port(label.to_string()))
                } else if label.starts_with(main) {
                    Some(Section::Main)
                } else {
                    None
                }
            }
            SectionStyle::AidRelative => {
                let aid = aid.trim();
                let aid = aid.strip_prefix("ont-").unwrap_or(aid);
                if aid.is_empty() {
                    return None;
                }
                let bare = label.strip_prefix("ont-").unwrap_or(label);
                if bare == aid {
                    Some(Section::Main)
                } else if bare.starts_with(aid) && bare[aid.len()..].starts_with('-') {
                    Some(Section::Port(label.to_string()))
                } else {
                    None
                }
            }
        }
    }
}

/// How plain `key value` directives become scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarRule {
    /// No scalar extraction; everything else lands in `lines`.
    None,
    /// Exactly two tokens.
    Pair,
    /// First token is the key, the rest of the directive the value.
    Remainder,
}

/// Per-model dialect of the config block, layered over the shared matchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigProfile {
    pub sections: SectionStyle,
    pub negated_flags: bool,
    pub colon_pairs: bool,
    pub scalars: ScalarRule,
}

impl ConfigProfile {
    /// OLT2406: `ont-`/`uniport-` sections, `no <flag>`, two-token scalars.
    pub const PREFIXED: ConfigProfile = ConfigProfile {
        sections: SectionStyle::Prefixed {
            main: "ont-",
            port: "uniport-",
        },
        negated_flags: true,
        colon_pairs: false,
        scalars: ScalarRule::Pair,
    };

    /// MSC1240XA: sections relative to the AID.
    pub const AID_RELATIVE: ConfigProfile = ConfigProfile {
        sections: SectionStyle::AidRelative,
        negated_flags: true,
        colon_pairs: false,
        scalars: ScalarRule::Pair,
    };

    /// OLT1408A: `key: value` and `key rest of line` scalars, `no` is an
    /// ordinary keyword.
    pub const REMAINDER: ConfigProfile = ConfigProfile {
        sections: SectionStyle::Prefixed {
            main: "ont-",
            port: "uniport-",
        },
        negated_flags: false,
        colon_pairs: true,
        scalars: ScalarRule::Remainder,
    };

    /// The matchers of this profile in evaluation order.
    pub fn matchers(&self) -> Vec<Matcher> {
        let mut matchers = vec![Matcher::VLAN, Matcher::QUEUE, Matcher::BANDWIDTH_GROUP];
        if self.negated_flags {
            matchers.push(Matcher::NEGATED_FLAG);
        }
        if self.colon_pairs {
            matchers.push(Matcher::COLON_PAIR);
        }
        match self.scalars {
            ScalarRule::None => {}
            ScalarRule::Pair => matchers.push(Matcher::PAIR_SCALAR),
            ScalarRule::Remainder => matchers.push(Matcher::REMAINDER_SCALAR),
        }
        matchers
    }
}

impl Default for ConfigProfile {
    fn default() -> Self {
        ConfigProfile::PREFIXED
    }
}

// ============================================================================
// Tree
// ============================================================================

/// One section of the configuration (the ONT or a UNI port).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigNode {
    attributes: Vec<(String, ConfigValue)>,
    pub vlans: Vec<VlanEntry>,
    pub queues: Vec<QueueEntry>,
    /// Directives kept verbatim.
    pub lines: Vec<String>,
}

impl ConfigNode {
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ConfigValue::as_text)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(ConfigValue::as_flag)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
            && self.vlans.is_empty()
            && self.queues.is_empty()
            && self.lines.is_empty()
    }

    fn is_free(&self, key: &str) -> bool {
        !RESERVED_KEYS.contains(&key) && self.get(key).is_none()
    }

    /// Whether storing the directive keeps every attribute single-valued.
    fn accepts(&self, directive: &Directive) -> bool {
        match directive {
            Directive::Vlan(_) | Directive::Queue(_) => true,
            Directive::BandwidthGroup(group) => {
                group.scalars().iter().all(|(key, _)| self.is_free(key))
            }
            Directive::Flag { key, .. } | Directive::Scalar { key, .. } => self.is_free(key),
        }
    }

    fn insert(&mut self, directive: Directive) {
        match directive {
            Directive::Vlan(entry) => self.vlans.push(entry),
            Directive::Queue(entry) => self.queues.push(entry),
            Directive::BandwidthGroup(group) => {
                for (key, value) in group.scalars() {
                    self.attributes
                        .push((key.to_string(), ConfigValue::Text(value.to_string())));
                }
            }
            Directive::Flag { key, value } => self.attributes.push((key, ConfigValue::Flag(value))),
            Directive::Scalar { key, value } => {
                self.attributes.push((key, ConfigValue::Text(value)))
            }
        }
    }
}

impl Serialize for ConfigNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (key, value) in &self.attributes {
            map.serialize_entry(key, value)?;
        }
        if !self.vlans.is_empty() {
            map.serialize_entry("vlans", &self.vlans)?;
        }
        if !self.queues.is_empty() {
            map.serialize_entry("queues", &self.queues)?;
        }
        if !self.lines.is_empty() {
            map.serialize_entry("lines", &self.lines)?;
        }
        map.end()
    }
}

/// A section of the config block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Section {
    Main,
    Port(String),
}

/// Parsed configuration of one ONT.
///
/// The tree keeps only the content. For the raw fragments in input order use
/// [`classify_config_block`] or [`ConfigParse::reconstruct`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigTree {
    pub aid: String,
    pub ont: ConfigNode,
    pub uniports: BTreeMap<String, ConfigNode>,
}

impl ConfigTree {
    /// Empty tree for `aid`.
    pub fn new(aid: impl Into<String>) -> Self {
        ConfigTree {
            aid: aid.into(),
            ..Default::default()
        }
    }

    pub fn port(&self, id: &str) -> Option<&ConfigNode> {
        self.uniports.get(id)
    }

    pub fn node(&self, section: &Section) -> Option<&ConfigNode> {
        match section {
            Section::Main => Some(&self.ont),
            Section::Port(id) => self.uniports.get(id),
        }
    }

    fn node_mut(&mut self, section: &Section) -> &mut ConfigNode {
        match section {
            Section::Main => &mut self.ont,
            Section::Port(id) => self.uniports.entry(id.clone()).or_default(),
        }
    }
}

// ============================================================================
// Classification
// ============================================================================

/// What a fragment of the block turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentKind {
    /// Table rule or column header; no configuration content.
    Framing,
    /// Section column naming the ONT or a port.
    SectionMarker,
    /// Stored as a structured attribute.
    Directive(MatcherTag, Directive),
    /// Stored verbatim in `lines`.
    Unclassified,
}

/// Accounting entry for one fragment of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFragment {
    /// Zero-based line number in the input.
    pub line: usize,
    pub section: Section,
    pub source: String,
    pub kind: FragmentKind,
}

impl ClassifiedFragment {
    /// Whether the fragment carries configuration (a directive or a `lines`
    /// entry).
    pub fn carries_content(&self) -> bool {
        matches!(
            self.kind,
            FragmentKind::Directive(..) | FragmentKind::Unclassified
        )
    }

    /// Source form of the fragment as stored in the tree.
    pub fn to_source(&self) -> String {
        match &self.kind {
            FragmentKind::Directive(_, directive) => directive.to_source(),
            _ => self.source.clone(),
        }
    }
}

/// A parsed block together with its per-fragment accounting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigParse {
    pub tree: ConfigTree,
    pub fragments: Vec<ClassifiedFragment>,
}

impl ConfigParse {
    /// Configuration content in input order, re-serialised.
    pub fn reconstruct(&self) -> Vec<String> {
        self.fragments
            .iter()
            .filter(|fragment| fragment.carries_content())
            .map(ClassifiedFragment::to_source)
            .collect()
    }
}

fn is_column_header(line: &str) -> bool {
    line.contains('|')
        && split_cells(line)
            .first()
            .is_some_and(|first| first == "AID")
}

struct Classifier<'a> {
    aid: &'a str,
    profile: ConfigProfile,
    matchers: Vec<Matcher>,
    section: Section,
    tree: ConfigTree,
    fragments: Vec<ClassifiedFragment>,
}

impl<'a> Classifier<'a> {
    fn new(aid: &'a str, profile: ConfigProfile) -> Self {
        Classifier {
            aid,
            profile,
            matchers: profile.matchers(),
            section: Section::Main,
            tree: ConfigTree::new(aid),
            fragments: Vec::new(),
        }
    }

    fn record(&mut self, line: usize, source: &str, kind: FragmentKind) {
        self.fragments.push(ClassifiedFragment {
            line,
            section: self.section.clone(),
            source: source.to_string(),
            kind,
        });
    }

    fn keep_verbatim(&mut self, line: usize, source: &str) {
        self.tree
            .node_mut(&self.section)
            .lines
            .push(source.to_string());
        self.record(line, source, FragmentKind::Unclassified);
    }

    fn line(&mut self, index: usize, line: &str) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return;
        }
        if is_separator_line(trimmed) || is_column_header(trimmed) {
            self.record(index, trimmed, FragmentKind::Framing);
            return;
        }

        let (column, content) = match trimmed.split_once('|') {
            Some((left, right)) => (left.trim(), right),
            None => ("", trimmed),
        };
        let mut fragments = content
            .split('|')
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty())
            .peekable();
        // `| ont-1-1-1 | ...`: the border pipe hides the section column.
        let column = if column.is_empty() {
            let sections = self.profile.sections;
            let aid = self.aid;
            fragments
                .next_if(|first| sections.classify(first, aid).is_some())
                .unwrap_or("")
        } else {
            column
        };

        // Empty continuation row such as `      |      `.
        if column.is_empty() && fragments.peek().is_none() {
            self.record(index, trimmed, FragmentKind::Framing);
            return;
        }

        if !column.is_empty() {
            match self.profile.sections.classify(column, self.aid) {
                Some(section) => {
                    self.tree.node_mut(&section);
                    self.section = section;
                    self.record(index, column, FragmentKind::SectionMarker);
                }
                None => {
                    self.keep_verbatim(index, trimmed);
                    return;
                }
            }
        }

        for fragment in fragments {
            self.fragment(index, fragment);
        }
    }

    fn fragment(&mut self, index: usize, fragment: &str) {
        let extracted = self
            .matchers
            .iter()
            .find_map(|matcher| matcher.extract(fragment).map(|d| (matcher.tag, d)));

        let node = self.tree.node_mut(&self.section);
        match extracted {
            Some((tag, directive)) if node.accepts(&directive) => {
                node.insert(directive.clone());
                self.record(index, fragment, FragmentKind::Directive(tag, directive));
            }
            _ => self.keep_verbatim(index, fragment),
        }
    }
}

/// Parse a config block and report how every fragment was classified.
pub fn parse_config(aid: &str, raw: &str, profile: ConfigProfile) -> ConfigParse {
    let mut classifier = Classifier::new(aid, profile);
    for (index, line) in raw.lines().enumerate() {
        classifier.line(index, line);
    }
    ConfigParse {
        tree: classifier.tree,
        fragments: classifier.fragments,
    }
}

/// Parse a config block into a [`ConfigTree`].
pub fn parse_config_block(aid: &str, raw: &str, profile: ConfigProfile) -> ConfigTree {
    parse_config(aid, raw, profile).tree
}

/// Per-fragment classification of a config block, in input order.
pub fn classify_config_block(
    aid: &str,
    raw: &str,
    profile: ConfigProfile,
) -> Vec<ClassifiedFragment> {
    parse_config(aid, raw, profile).fragments
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    const BLOCK_2406: &str = "\
 AID               | Details\r
-------------------+---------------------------------------------\r
 ont-6-4-4         | sn 5A5948530A1B2C3D | password DEFAULT\r
                   | no inactive\r
                   |                   \r
                   | bwgroup 1 usbwprofname 1G dsbwprofname 1G allocid 256\r
                   | ontServiceControl ftp enable LAN\r
 uniport-6-4-4-2-1 | no inactive | no pmenable\r
                   | queue tc 0 priority 0 weight 0 usbwprofname 1G dsbwprofname 1G dsoption olt\r
                   | vlan 10 priority 0 mvlan 10\r
                   | vlan 20 priority 1\r
 uniport-6-4-4-2-2 | inactive\r
";

    const BLOCK_1240XA: &str = "\
| 1-1-10     | sn 5A5948530A1B2C3D | no inactive |\r
|            |                     |\r
|            | anti-mac-spoofing inactive |\r
| 1-1-10-2-1 | vlan 100 priority 0 | queue tc 1 priority 1 weight 0 usbwprofname 100M dsbwprofname 100M dsoption onu |\r
|            | unknown directive xyz |\r
";

    const BLOCK_1408A: &str = "\
| ont-1-1-1 | sn 5A5958458CADA659 | ontServiceControl ftp enable LAN\r
|           |\r
| Description: lab unit\r
| no inactive | no pmenable\r
| uniport-1-1-1-2-1 | vlan 10 priority 0\r
";

    /// Tokens of a directive, ignoring key spelling (case, `-`/`_`, colons).
    fn token_multiset(text: &str) -> Vec<String> {
        let mut tokens: Vec<String> = text
            .replace(':', " ")
            .split_whitespace()
            .flat_map(|token| {
                normalize_key(token)
                    .split('_')
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|token| !token.is_empty())
            .collect();
        tokens.sort();
        tokens
    }

    fn assert_every_line_accounted(aid: &str, raw: &str, profile: ConfigProfile) {
        let parse = parse_config(aid, raw, profile);

        let non_blank: BTreeSet<usize> = raw
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, _)| index)
            .collect();
        let covered: BTreeSet<usize> = parse.fragments.iter().map(|f| f.line).collect();
        assert_eq!(covered, non_blank);

        let nodes: Vec<&ConfigNode> = std::iter::once(&parse.tree.ont)
            .chain(parse.tree.uniports.values())
            .collect();
        let stored_lines: usize = nodes.iter().map(|n| n.lines.len()).sum();
        let stored_vlans: usize = nodes.iter().map(|n| n.vlans.len()).sum();
        let stored_queues: usize = nodes.iter().map(|n| n.queues.len()).sum();

        let count = |pred: fn(&FragmentKind) -> bool| {
            parse.fragments.iter().filter(|f| pred(&f.kind)).count()
        };
        assert_eq!(count(|k| matches!(k, FragmentKind::Unclassified)), stored_lines);
        assert_eq!(
            count(|k| matches!(k, FragmentKind::Directive(MatcherTag::Vlan, _))),
            stored_vlans
        );
        assert_eq!(
            count(|k| matches!(k, FragmentKind::Directive(MatcherTag::Queue, _))),
            stored_queues
        );
    }

    fn assert_reconstructs(aid: &str, raw: &str, profile: ConfigProfile) {
        let parse = parse_config(aid, raw, profile);
        let content: Vec<&ClassifiedFragment> = parse
            .fragments
            .iter()
            .filter(|f| f.carries_content())
            .collect();
        let rebuilt = parse.reconstruct();
        assert_eq!(rebuilt.len(), content.len());
        for (fragment, source) in content.iter().zip(&rebuilt) {
            assert_eq!(token_multiset(&fragment.source), token_multiset(source));
        }
    }

    #[test]
    fn test_plain_lines_classification() {
        let raw = "vlan 10 priority 0 mvlan 10\n\
                   queue tc 0 priority 0 weight 0 usbwprofname 1G dsbwprofname 1G dsoption olt\n\
                   unknown directive xyz";
        let tree = parse_config_block("ont-1-1-1", raw, ConfigProfile::PREFIXED);
        assert_eq!(
            tree.ont.vlans,
            vec![VlanEntry {
                vlan: "10".to_string(),
                priority: Some("0".to_string()),
                mvlan: Some("10".to_string()),
                ..Default::default()
            }]
        );
        assert_eq!(
            tree.ont.queues,
            vec![QueueEntry {
                tc: 0,
                priority: 0,
                weight: 0,
                usbwprofname: "1G".to_string(),
                dsbwprofname: "1G".to_string(),
                dsoption: "olt".to_string(),
                bwsharegroupid: None,
            }]
        );
        assert_eq!(tree.ont.lines, vec!["unknown directive xyz".to_string()]);

        let json = serde_json::to_value(&tree.ont).unwrap();
        assert_eq!(json["vlans"][0], serde_json::json!({"vlan": "10", "priority": "0", "mvlan": "10"}));
        assert_eq!(json["queues"][0]["tc"], 0);
        assert_eq!(json["queues"][0]["dsoption"], "olt");
    }

    #[test]
    fn test_sections_2406() {
        let tree = parse_config_block("ont-6-4-4", BLOCK_2406, ConfigProfile::PREFIXED);
        assert_eq!(tree.ont.text("sn"), Some("5A5948530A1B2C3D"));
        assert_eq!(tree.ont.text("password"), Some("DEFAULT"));
        assert_eq!(tree.ont.flag("inactive"), Some(false));
        assert_eq!(tree.ont.text("bwgroup"), Some("1"));
        assert_eq!(tree.ont.text("allocid"), Some("256"));
        assert_eq!(tree.ont.lines, vec!["ontServiceControl ftp enable LAN".to_string()]);

        let port = tree.port("uniport-6-4-4-2-1").unwrap();
        assert_eq!(port.flag("inactive"), Some(false));
        assert_eq!(port.flag("pmenable"), Some(false));
        assert_eq!(port.queues.len(), 1);
        assert_eq!(port.vlans.len(), 2);
        assert_eq!(port.vlans[1].priority.as_deref(), Some("1"));

        let second = tree.port("uniport-6-4-4-2-2").unwrap();
        assert_eq!(second.lines, vec!["inactive".to_string()]);
    }

    #[test]
    fn test_every_line_accounted_for() {
        assert_every_line_accounted("ont-6-4-4", BLOCK_2406, ConfigProfile::PREFIXED);
        assert_every_line_accounted("ont-1-1-10", BLOCK_1240XA, ConfigProfile::AID_RELATIVE);
        assert_every_line_accounted("ont-1-1-1", BLOCK_1408A, ConfigProfile::REMAINDER);
    }

    #[test]
    fn test_reconstruction_recovers_content() {
        assert_reconstructs("ont-6-4-4", BLOCK_2406, ConfigProfile::PREFIXED);
        assert_reconstructs("ont-1-1-10", BLOCK_1240XA, ConfigProfile::AID_RELATIVE);
        assert_reconstructs("ont-1-1-1", BLOCK_1408A, ConfigProfile::REMAINDER);
    }

    #[test]
    fn test_empty_continuation_row_is_framing() {
        let raw = " ont-6-4-4 | sn 5A5948530A1B2C3D\n           |          \n           | no inactive\n";
        let fragments = classify_config_block("ont-6-4-4", raw, ConfigProfile::PREFIXED);
        let lines: Vec<usize> = fragments.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![0, 0, 1, 2]);
        assert_eq!(fragments[2].kind, FragmentKind::Framing);
        assert!(!fragments[2].carries_content());
    }

    #[test]
    fn test_border_pipe_blocks() {
        let tree = parse_config_block("ont-1-1-10", BLOCK_1240XA, ConfigProfile::AID_RELATIVE);
        assert_eq!(tree.ont.text("sn"), Some("5A5948530A1B2C3D"));
        assert_eq!(tree.ont.flag("inactive"), Some(false));
        assert_eq!(tree.ont.text("anti_mac_spoofing"), Some("inactive"));
        let port = tree.port("1-1-10-2-1").unwrap();
        assert_eq!(port.vlans[0].vlan, "100");
        assert_eq!(port.queues[0].dsoption, "onu");
        assert_eq!(port.lines, vec!["unknown directive xyz".to_string()]);

        let tree = parse_config_block("ont-1-1-1", BLOCK_1408A, ConfigProfile::REMAINDER);
        assert_eq!(tree.ont.text("description"), Some("lab unit"));
        assert_eq!(tree.ont.text("ontservicecontrol"), Some("ftp enable LAN"));
        assert_eq!(tree.port("uniport-1-1-1-2-1").unwrap().vlans[0].vlan, "10");
    }

    #[test]
    fn test_collision_goes_to_lines() {
        let raw = "ont-1 | sn AAAA | sn BBBB\n | bwgroup 1 allocid 256 | bwgroup 2 allocid 257";
        let tree = parse_config_block("ont-1", raw, ConfigProfile::PREFIXED);
        assert_eq!(tree.ont.text("sn"), Some("AAAA"));
        assert_eq!(tree.ont.text("bwgroup"), Some("1"));
        assert_eq!(
            tree.ont.lines,
            vec!["sn BBBB".to_string(), "bwgroup 2 allocid 257".to_string()]
        );
    }

    #[test]
    fn test_reserved_keys_are_not_attributes() {
        let tree = parse_config_block("ont-1", "lines 5\nvlans x", ConfigProfile::PREFIXED);
        assert!(tree.ont.get("lines").is_none());
        assert_eq!(tree.ont.lines.len(), 2);
    }

    #[test]
    fn test_malformed_structured_lines_kept_verbatim() {
        let raw = "queue tc x priority 0\nqueue tc 1 priority 0\nvlan 10 color red\nbwgroup";
        let tree = parse_config_block("ont-1", raw, ConfigProfile::PREFIXED);
        assert!(tree.ont.queues.is_empty());
        assert!(tree.ont.vlans.is_empty());
        assert_eq!(tree.ont.lines.len(), 4);
    }

    #[test]
    fn test_aid_relative_sections() {
        let raw = "\
AID          | Details\r
-------------+--------------------------\r
1-1-10       | sn 5A5948530A1B2C3D | no inactive\r
             | anti-mac-spoofing inactive\r
1-1-10-2-1   | vlan 100 priority 0\r
             | queue tc 1 priority 1 weight 0 usbwprofname 100M dsbwprofname 100M dsoption onu bwsharegroupid 3\r
";
        let tree = parse_config_block("ont-1-1-10", raw, ConfigProfile::AID_RELATIVE);
        assert_eq!(tree.ont.text("sn"), Some("5A5948530A1B2C3D"));
        assert_eq!(tree.ont.text("anti_mac_spoofing"), Some("inactive"));
        let port = tree.port("1-1-10-2-1").unwrap();
        assert_eq!(port.vlans[0].vlan, "100");
        assert_eq!(port.queues[0].bwsharegroupid.as_deref(), Some("3"));
        assert_eq!(port.queues[0].tc, 1);
    }

    #[test]
    fn test_aid_relative_does_not_match_other_aids() {
        let style = SectionStyle::AidRelative;
        assert_eq!(style.classify("1-1-10", "1-1-10"), Some(Section::Main));
        assert_eq!(style.classify("ont-1-1-10", "1-1-10"), Some(Section::Main));
        assert_eq!(
            style.classify("1-1-10-2-1", "ont-1-1-10"),
            Some(Section::Port("1-1-10-2-1".to_string()))
        );
        assert_eq!(style.classify("1-1-100", "1-1-10"), None);
    }

    #[test]
    fn test_remainder_profile() {
        let raw = "\
| ont-1-1-1 | sn 5A5958458CADA659 | ontServiceControl ftp enable LAN\r
| Description: lab unit\r
| no inactive | no pmenable\r
";
        let tree = parse_config_block("ont-1-1-1", raw, ConfigProfile::REMAINDER);
        assert_eq!(tree.ont.text("ontservicecontrol"), Some("ftp enable LAN"));
        assert_eq!(tree.ont.text("description"), Some("lab unit"));
        assert_eq!(tree.ont.text("no"), Some("inactive"));
        assert_eq!(tree.ont.lines, vec!["no pmenable".to_string()]);
    }

    #[test]
    fn test_framing_is_not_content() {
        let fragments = classify_config_block(
            "ont-1",
            "AID | Details\n----+----\nont-1 | sn A",
            ConfigProfile::PREFIXED,
        );
        let kinds: Vec<_> = fragments.iter().map(|f| &f.kind).collect();
        assert_eq!(kinds[0], &FragmentKind::Framing);
        assert_eq!(kinds[1], &FragmentKind::Framing);
        assert_eq!(kinds[2], &FragmentKind::SectionMarker);
        assert!(matches!(kinds[3], FragmentKind::Directive(MatcherTag::PairScalar, _)));
    }

    #[test]
    fn test_matcher_order_is_the_contract() {
        let matchers = ConfigProfile::PREFIXED.matchers();
        let tags: Vec<_> = matchers.iter().map(|m| m.tag).collect();
        assert_eq!(
            tags,
            vec![
                MatcherTag::Vlan,
                MatcherTag::Queue,
                MatcherTag::BandwidthGroup,
                MatcherTag::NegatedFlag,
                MatcherTag::PairScalar,
            ]
        );
        // `vlan 10` would also satisfy the pair rule; the VLAN matcher wins.
        let fragments = classify_config_block("ont-1", "vlan 10", ConfigProfile::PREFIXED);
        assert!(matches!(fragments[0].kind, FragmentKind::Directive(MatcherTag::Vlan, _)));
    }

    #[test]
    fn test_tree_serialization() {
        let tree = parse_config_block("ont-6-4-4", BLOCK_2406, ConfigProfile::PREFIXED);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(json["aid"], "ont-6-4-4");
        assert_eq!(json["ont"]["inactive"], false);
        assert_eq!(json["ont"]["sn"], "5A5948530A1B2C3D");
        assert!(json["ont"].get("vlans").is_none());
        assert_eq!(json["uniports"]["uniport-6-4-4-2-1"]["vlans"][0]["vlan"], "10");
    }

    #[test]
    fn test_directive_sources() {
        let group = BandwidthGroup::from_tokens(&["bwgroup", "1", "allocid", "256"]).unwrap();
        assert_eq!(group.to_source(), "bwgroup 1 allocid 256");
        let flag = Directive::Flag {
            key: "inactive".to_string(),
            value: false,
        };
        assert_eq!(flag.to_source(), "no inactive");
    }
}
