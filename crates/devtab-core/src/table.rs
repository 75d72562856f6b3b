//! Sparse major/minor tables for tracking registry entries

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::label::Label;

/// Number of minor slots behind every major number
pub const MINORS_PER_MAJOR: usize = 256;

/// Device class; char and block devices are numbered independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceClass {
    Char,
    Block,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 2] = [DeviceClass::Char, DeviceClass::Block];

    /// Parse `char`/`c` or `block`/`b`
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "char" | "c" => Some(DeviceClass::Char),
            "block" | "b" => Some(DeviceClass::Block),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceClass::Char => "char",
            DeviceClass::Block => "block",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Family of a generated rule; decides how the downstream expander
/// rebuilds names from the rule's parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Inferred `...` run: `base + (first + offset)`
    Repeat,
    /// Letter-labelled unit: `base + first [+ offset]`
    Storage,
    /// Number-labelled unit: `base + first [+ "p" + offset]`
    StorageP,
}

impl RuleKind {
    fn macro_stem(&self) -> &'static str {
        match self {
            RuleKind::Repeat => "DEVMM_REPEAT",
            RuleKind::Storage => "DEVMM_STORAGE",
            RuleKind::StorageP => "DEVMM_STORAGE_P",
        }
    }

    fn repeated_macro(&self) -> &'static str {
        match self {
            RuleKind::Repeat => "DEVMM_REPEATED",
            RuleKind::Storage => "DEVMM_STORAGE_REPEATED",
            RuleKind::StorageP => "DEVMM_STORAGE_P_REPEATED",
        }
    }
}

/// One slot of a generated rule.
///
/// A rule spans consecutive slots: `Head`, `Base`, `First`, then
/// `Repeated(k)` for the slot `k` positions after the head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleToken {
    Head(RuleKind),
    Base(RuleKind, String),
    First(RuleKind, Label),
    Repeated(RuleKind, u8),
}

impl RuleToken {
    pub fn kind(&self) -> RuleKind {
        match self {
            RuleToken::Head(kind)
            | RuleToken::Base(kind, _)
            | RuleToken::First(kind, _)
            | RuleToken::Repeated(kind, _) => *kind,
        }
    }

    /// Distance from this slot back to the rule's head
    pub fn offset(&self) -> usize {
        match self {
            RuleToken::Head(_) => 0,
            RuleToken::Base(..) => 1,
            RuleToken::First(..) => 2,
            RuleToken::Repeated(_, k) => *k as usize,
        }
    }

    /// Token sequence for a rule covering `len` slots
    pub fn sequence(kind: RuleKind, base: &str, first: Label, len: usize) -> Vec<RuleToken> {
        let mut tokens = Vec::with_capacity(len);
        tokens.push(RuleToken::Head(kind));
        tokens.push(RuleToken::Base(kind, base.to_string()));
        tokens.push(RuleToken::First(kind, first));
        tokens.extend((3..len.min(MINORS_PER_MAJOR)).map(|k| RuleToken::Repeated(kind, k as u8)));
        tokens.truncate(len);
        tokens
    }
}

impl fmt::Display for RuleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleToken::Head(kind) => f.write_str(kind.macro_stem()),
            RuleToken::Base(kind, base) => {
                write!(f, "{}_BASE(\"{}\")", kind.macro_stem(), escape_c(base))
            }
            RuleToken::First(kind, Label::Alpha(label)) => {
                write!(f, "{}_FIRST(\"{}\")", kind.macro_stem(), escape_c(label))
            }
            RuleToken::First(kind, Label::Number(n)) => {
                write!(f, "{}_FIRST({})", kind.macro_stem(), n)
            }
            RuleToken::Repeated(kind, k) => write!(f, "{}({})", kind.repeated_macro(), k),
        }
    }
}

impl Serialize for RuleToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Escape a string for use inside a C string literal
pub fn escape_c(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Contents of a single minor slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Slot {
    /// Nothing known about this minor
    #[default]
    Unassigned,
    /// A literal device path
    Name(String),
    /// `...` in the registry: continue the predecessor's pattern
    RepeatMarker,
    /// Part of a parameterized rule left for the downstream expander
    Rule(RuleToken),
}

impl Slot {
    pub fn is_unassigned(&self) -> bool {
        matches!(self, Slot::Unassigned)
    }

    /// Names and rule tokens are concrete; markers and gaps are not
    pub fn is_defined(&self) -> bool {
        matches!(self, Slot::Name(_) | Slot::Rule(_))
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Slot::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// The 256 minor slots of one major number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinorTable {
    slots: Vec<Slot>,
}

impl Default for MinorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MinorTable {
    /// Create a table with every slot unassigned
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::Unassigned; MINORS_PER_MAJOR],
        }
    }

    pub fn get(&self, minor: u8) -> &Slot {
        &self.slots[minor as usize]
    }

    pub fn set(&mut self, minor: u8, slot: Slot) {
        self.slots[minor as usize] = slot;
    }

    /// All 256 slots, indexed by minor number
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slots_mut(&mut self) -> &mut [Slot] {
        &mut self.slots
    }

    /// One past the highest occupied minor (0 when empty)
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .rposition(|s| !s.is_unassigned())
            .map_or(0, |i| i + 1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a repeat marker after the highest occupied minor.
    ///
    /// Returns false when the table is already full up to minor 255.
    pub fn push_marker(&mut self) -> bool {
        let next = self.len();
        if next >= MINORS_PER_MAJOR {
            return false;
        }
        self.slots[next] = Slot::RepeatMarker;
        true
    }

    /// Reset every slot to unassigned
    pub fn clear(&mut self) {
        self.slots.fill(Slot::Unassigned);
    }

    /// Occupied slots in ascending minor order
    pub fn occupied(&self) -> impl Iterator<Item = (u8, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_unassigned())
            .map(|(i, s)| (i as u8, s))
    }
}

impl Serialize for MinorTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (minor, slot) in self.occupied() {
            map.serialize_entry(&minor, slot)?;
        }
        map.end()
    }
}

/// Major number -> minor table, for one device class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MajorTable {
    majors: BTreeMap<u8, MinorTable>,
}

impl MajorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, major: u8) -> Option<&MinorTable> {
        self.majors.get(&major)
    }

    pub fn get_mut(&mut self, major: u8) -> Option<&mut MinorTable> {
        self.majors.get_mut(&major)
    }

    /// Start a fresh, empty table for `major`, replacing any previous one
    pub fn reset(&mut self, major: u8) -> &mut MinorTable {
        let table = self.majors.entry(major).or_default();
        table.clear();
        table
    }

    /// Table for `major`, created empty if absent
    pub fn entry(&mut self, major: u8) -> &mut MinorTable {
        self.majors.entry(major).or_default()
    }

    /// Every declared major in ascending order, including empty ones
    pub fn iter(&self) -> impl Iterator<Item = (u8, &MinorTable)> {
        self.majors.iter().map(|(major, table)| (*major, table))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u8, &mut MinorTable)> {
        self.majors.iter_mut().map(|(major, table)| (*major, table))
    }

    /// Majors holding at least one occupied slot, ascending
    pub fn populated(&self) -> impl Iterator<Item = (u8, &MinorTable)> {
        self.iter().filter(|(_, table)| !table.is_empty())
    }

    pub fn slot(&self, major: u8, minor: u8) -> &Slot {
        static UNASSIGNED: Slot = Slot::Unassigned;
        self.get(major).map_or(&UNASSIGNED, |table| table.get(minor))
    }
}

impl Serialize for MajorTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (major, table) in self.populated() {
            map.serialize_entry(&major, table)?;
        }
        map.end()
    }
}

/// Both device class tables built from one registry text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Registry {
    pub char: MajorTable,
    pub block: MajorTable,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, class: DeviceClass) -> &MajorTable {
        match class {
            DeviceClass::Char => &self.char,
            DeviceClass::Block => &self.block,
        }
    }

    pub fn table_mut(&mut self, class: DeviceClass) -> &mut MajorTable {
        match class {
            DeviceClass::Char => &mut self.char,
            DeviceClass::Block => &mut self.block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_class_parse() {
        assert_eq!(DeviceClass::parse("char"), Some(DeviceClass::Char));
        assert_eq!(DeviceClass::parse("B"), Some(DeviceClass::Block));
        assert_eq!(DeviceClass::parse("pipe"), None);
    }

    #[test]
    fn test_minor_table_len_tracks_highest_slot() {
        let mut table = MinorTable::new();
        assert!(table.is_empty());

        table.set(5, Slot::Name("/dev/foo5".to_string()));
        assert_eq!(table.len(), 6);

        table.set(2, Slot::Name("/dev/foo2".to_string()));
        assert_eq!(table.len(), 6);
    }

    #[test]
    fn test_push_marker_appends_after_last_slot() {
        let mut table = MinorTable::new();
        table.set(1, Slot::Name("/dev/sda1".to_string()));
        assert!(table.push_marker());
        assert_eq!(table.get(2), &Slot::RepeatMarker);

        table.set(255, Slot::Name("/dev/last".to_string()));
        assert!(!table.push_marker());
    }

    #[test]
    fn test_rule_token_rendering() {
        assert_eq!(RuleToken::Head(RuleKind::Repeat).to_string(), "DEVMM_REPEAT");
        assert_eq!(
            RuleToken::Base(RuleKind::Repeat, "/dev/ttyS".to_string()).to_string(),
            "DEVMM_REPEAT_BASE(\"/dev/ttyS\")"
        );
        assert_eq!(
            RuleToken::First(RuleKind::Storage, Label::alpha("ag")).to_string(),
            "DEVMM_STORAGE_FIRST(\"ag\")"
        );
        assert_eq!(
            RuleToken::First(RuleKind::StorageP, Label::Number(0)).to_string(),
            "DEVMM_STORAGE_P_FIRST(0)"
        );
        assert_eq!(
            RuleToken::Repeated(RuleKind::StorageP, 7).to_string(),
            "DEVMM_STORAGE_P_REPEATED(7)"
        );
    }

    #[test]
    fn test_rule_sequence_offsets() {
        let tokens = RuleToken::sequence(RuleKind::Repeat, "/dev/sda", Label::Number(2), 14);
        assert_eq!(tokens.len(), 14);
        for (i, token) in tokens.iter().enumerate() {
            assert_eq!(token.offset(), i);
            assert_eq!(token.kind(), RuleKind::Repeat);
        }
    }

    #[test]
    fn test_major_table_populated_skips_empty() {
        let mut majors = MajorTable::new();
        majors.reset(3);
        majors.entry(4).set(0, Slot::Name("/dev/tty0".to_string()));

        let populated: Vec<u8> = majors.populated().map(|(m, _)| m).collect();
        assert_eq!(populated, vec![4]);
        assert_eq!(majors.iter().count(), 2);
    }

    #[test]
    fn test_registry_serializes_sparse() {
        let mut registry = Registry::new();
        registry
            .table_mut(DeviceClass::Block)
            .entry(8)
            .set(0, Slot::Name("/dev/sda".to_string()));

        let json = serde_json::to_value(&registry).unwrap();
        assert_eq!(json["block"]["8"]["0"]["kind"], "name");
        assert_eq!(json["block"]["8"]["0"]["value"], "/dev/sda");
        assert!(json["char"].as_object().unwrap().is_empty());
    }
}
