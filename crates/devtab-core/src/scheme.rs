//! Generated naming schemes for disk-style majors
//!
//! Disk families split a major into equal blocks of minors, one block per
//! unit: the first slot names the whole unit and the rest its partitions.
//! The registry only documents the first unit or two, so these majors are
//! regenerated from a compact description instead of being parsed.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::diagnostic::Diagnostic;
use crate::label::Label;
use crate::table::{DeviceClass, MinorTable, Registry, RuleToken, Slot, MINORS_PER_MAJOR};

fn default_block() -> DeviceClass {
    DeviceClass::Block
}

fn default_char() -> DeviceClass {
    DeviceClass::Char
}

/// `units` consecutive units of `slots_per_unit` minors each, starting at
/// minor 0 and labelled from `first`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageScheme {
    #[serde(default = "default_block")]
    pub class: DeviceClass,
    pub major: u8,
    pub base: String,
    pub units: usize,
    pub slots_per_unit: usize,
    pub first: Label,
}

impl StorageScheme {
    pub fn new(
        class: DeviceClass,
        major: u8,
        base: impl Into<String>,
        units: usize,
        slots_per_unit: usize,
        first: Label,
    ) -> Self {
        Self {
            class,
            major,
            base: base.into(),
            units,
            slots_per_unit,
            first,
        }
    }

    /// Total minors the scheme wants to fill
    pub fn span(&self) -> usize {
        self.units.saturating_mul(self.slots_per_unit)
    }

    /// Write the scheme into `table`, overwriting whatever was there.
    ///
    /// Units of at most `materialize_limit` slots are spelled out as names;
    /// larger units become one storage rule each. Returns `false` if the
    /// scheme ran past minor 255 and was cut short.
    pub fn apply(&self, table: &mut MinorTable, materialize_limit: usize) -> bool {
        let slots = table.slots_mut();
        let mut label = self.first.clone();
        let mut minor = 0;

        for _ in 0..self.units {
            let unit: Vec<Slot> = if self.slots_per_unit <= materialize_limit {
                (0..self.slots_per_unit)
                    .map(|index| Slot::Name(label.partition_path(&self.base, index)))
                    .collect()
            } else {
                RuleToken::sequence(
                    label.storage_kind(),
                    &self.base,
                    label.clone(),
                    self.slots_per_unit,
                )
                .into_iter()
                .map(Slot::Rule)
                .collect()
            };

            for slot in unit {
                if minor >= MINORS_PER_MAJOR {
                    return false;
                }
                slots[minor] = slot;
                minor += 1;
            }
            label = label.next();
        }

        true
    }
}

/// Several name families sharing one major, alternating minor by minor:
/// `bases[0]0, bases[1]0, bases[0]1, bases[1]1, ...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterleavedScheme {
    #[serde(default = "default_char")]
    pub class: DeviceClass,
    pub major: u8,
    pub bases: Vec<String>,
    pub units: usize,
}

impl InterleavedScheme {
    /// Same contract as [`StorageScheme::apply`]; always materialized
    pub fn apply(&self, table: &mut MinorTable) -> bool {
        let slots = table.slots_mut();
        let mut minor = 0;

        for unit in 0..self.units {
            for base in &self.bases {
                if minor >= MINORS_PER_MAJOR {
                    return false;
                }
                slots[minor] = Slot::Name(format!("{base}{unit}"));
                minor += 1;
            }
        }

        true
    }
}

fn lettered(major: u8, base: &str, units: usize, slots_per_unit: usize, first: &'static str) -> StorageScheme {
    StorageScheme::new(DeviceClass::Block, major, base, units, slots_per_unit, Label::alpha(first))
}

fn numbered(major: u8, base: &str, units: usize, slots_per_unit: usize, first: u64) -> StorageScheme {
    StorageScheme::new(DeviceClass::Block, major, base, units, slots_per_unit, Label::Number(first))
}

/// Built-in block schemes: IDE, SCSI, I2O, flash translation layers and
/// the like
pub fn default_schemes() -> Vec<StorageScheme> {
    vec![
        lettered(3, "/dev/hd", 2, 64, "a"),
        lettered(8, "/dev/sd", 16, 16, "a"),
        lettered(22, "/dev/hd", 2, 64, "c"),
        lettered(33, "/dev/hd", 2, 64, "e"),
        lettered(34, "/dev/hd", 2, 64, "g"),
        lettered(44, "/dev/ftl", 16, 16, "a"),
        lettered(45, "/dev/pd", 4, 16, "a"),
        lettered(56, "/dev/hd", 2, 64, "i"),
        lettered(57, "/dev/hd", 2, 64, "k"),
        lettered(65, "/dev/sd", 16, 16, "q"),
        lettered(66, "/dev/sd", 16, 16, "ag"),
        lettered(67, "/dev/sd", 16, 16, "aw"),
        lettered(68, "/dev/sd", 16, 16, "bm"),
        lettered(69, "/dev/sd", 16, 16, "cc"),
        lettered(70, "/dev/sd", 16, 16, "cs"),
        lettered(71, "/dev/sd", 16, 16, "di"),
        lettered(80, "/dev/i2o/hd", 16, 16, "a"),
        lettered(81, "/dev/i2o/hd", 16, 16, "q"),
        lettered(82, "/dev/i2o/hd", 16, 16, "ag"),
        lettered(83, "/dev/i2o/hd", 16, 16, "aw"),
        lettered(84, "/dev/i2o/hd", 16, 16, "bm"),
        lettered(85, "/dev/i2o/hd", 16, 16, "cc"),
        lettered(86, "/dev/i2o/hd", 16, 16, "cs"),
        lettered(87, "/dev/i2o/hd", 16, 16, "di"),
        lettered(88, "/dev/hd", 2, 64, "m"),
        lettered(89, "/dev/hd", 2, 64, "o"),
        lettered(90, "/dev/hd", 2, 64, "q"),
        lettered(91, "/dev/hd", 2, 64, "s"),
        lettered(93, "/dev/nftl", 16, 16, "a"),
        lettered(96, "/dev/inftl", 16, 16, "a"),
        lettered(98, "/dev/ubd", 16, 16, "a"),
        lettered(102, "/dev/cbd/", 16, 16, "a"),
        lettered(128, "/dev/sd", 16, 16, "dy"),
        lettered(129, "/dev/sd", 16, 16, "eo"),
        lettered(130, "/dev/sd", 16, 16, "fe"),
        lettered(131, "/dev/sd", 16, 16, "fu"),
        lettered(132, "/dev/sd", 16, 16, "gk"),
        lettered(133, "/dev/sd", 16, 16, "ha"),
        lettered(134, "/dev/sd", 16, 16, "hq"),
        lettered(135, "/dev/sd", 16, 16, "ig"),
        numbered(153, "/dev/emd/", 16, 16, 0),
        numbered(179, "/dev/mmcblk", 32, 8, 0),
        lettered(180, "/dev/ub", 32, 8, "a"),
        lettered(202, "/dev/xvd", 16, 16, "a"),
    ]
}

/// Built-in interleaved schemes: MTD char devices
pub fn default_interleaved() -> Vec<InterleavedScheme> {
    vec![InterleavedScheme {
        class: DeviceClass::Char,
        major: 90,
        bases: vec!["/dev/mtd".to_string(), "/dev/mtdr".to_string()],
        units: 16,
    }]
}

/// Apply storage schemes in order; later schemes win on a shared major.
pub fn apply_schemes(
    registry: &mut Registry,
    schemes: &[StorageScheme],
    materialize_limit: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for scheme in schemes {
        let table = registry.table_mut(scheme.class).entry(scheme.major);
        if !scheme.apply(table, materialize_limit) {
            warn!(class = %scheme.class, major = scheme.major, base = %scheme.base, span = scheme.span(), "Storage scheme overflows major");
            diagnostics.push(Diagnostic::SchemeOverflow {
                class: scheme.class,
                major: scheme.major,
                base: scheme.base.clone(),
            });
        }
        debug!(class = %scheme.class, major = scheme.major, base = %scheme.base, first = %scheme.first, "Applied storage scheme");
    }
}

pub fn apply_interleaved(
    registry: &mut Registry,
    schemes: &[InterleavedScheme],
    diagnostics: &mut Vec<Diagnostic>,
) {
    for scheme in schemes {
        let table = registry.table_mut(scheme.class).entry(scheme.major);
        if !scheme.apply(table) {
            let base = scheme.bases.join(",");
            warn!(class = %scheme.class, major = scheme.major, base = %base, "Interleaved scheme overflows major");
            diagnostics.push(Diagnostic::SchemeOverflow {
                class: scheme.class,
                major: scheme.major,
                base,
            });
        }
        debug!(class = %scheme.class, major = scheme.major, units = scheme.units, "Applied interleaved scheme");
    }
}
