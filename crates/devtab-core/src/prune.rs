//! Out-of-scope major ranges
//!
//! Rare, legacy and obsolete device families are dropped wholesale before
//! any inference runs. The list is hand-curated; edit [`DEFAULT_PRUNE`]
//! (or the `[[prune]]` config table) to change what survives.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::table::DeviceClass::{self, Block, Char};
use crate::table::Registry;

/// An inclusive range of majors to clear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneRange {
    pub class: DeviceClass,
    pub start: u8,
    /// Inclusive; a single major has `end == start`
    pub end: u8,
}

impl PruneRange {
    pub const fn single(class: DeviceClass, major: u8) -> Self {
        Self {
            class,
            start: major,
            end: major,
        }
    }

    pub const fn span(class: DeviceClass, start: u8, end: u8) -> Self {
        Self { class, start, end }
    }

    pub fn contains(&self, class: DeviceClass, major: u8) -> bool {
        self.class == class && (self.start..=self.end).contains(&major)
    }
}

/// Built-in prune list
pub const DEFAULT_PRUNE: &[PruneRange] = &[
    PruneRange::single(Char, 12),
    PruneRange::span(Char, 16, 25),
    PruneRange::span(Char, 27, 28),
    PruneRange::span(Char, 30, 35),
    PruneRange::span(Char, 38, 39),
    PruneRange::single(Char, 41),
    PruneRange::span(Char, 43, 59),
    PruneRange::span(Char, 64, 88),
    // MTD; regenerated by the interleaved scheme
    PruneRange::single(Char, 90),
    PruneRange::single(Char, 92),
    PruneRange::single(Char, 101),
    PruneRange::single(Char, 103),
    PruneRange::span(Char, 105, 107),
    PruneRange::single(Char, 110),
    PruneRange::span(Char, 112, 115),
    PruneRange::span(Char, 117, 118),
    PruneRange::span(Char, 145, 158),
    PruneRange::span(Char, 164, 170),
    PruneRange::span(Char, 172, 179),
    PruneRange::span(Char, 181, 185),
    PruneRange::single(Char, 190),
    PruneRange::span(Char, 196, 201),
    PruneRange::single(Char, 206),
    PruneRange::span(Char, 210, 212),
    PruneRange::span(Char, 218, 220),
    PruneRange::span(Char, 224, 230),
    PruneRange::span(Block, 15, 18),
    PruneRange::span(Block, 20, 21),
    PruneRange::span(Block, 23, 30),
    PruneRange::single(Block, 32),
    PruneRange::span(Block, 36, 38),
    PruneRange::span(Block, 48, 55),
    PruneRange::span(Block, 72, 79),
    PruneRange::single(Block, 94),
    PruneRange::single(Block, 101),
    PruneRange::span(Block, 104, 113),
    PruneRange::single(Block, 115),
    PruneRange::span(Block, 136, 146),
    PruneRange::span(Block, 160, 161),
];

/// Clear every major covered by `ranges`.
///
/// Each covered major ends up with an empty table, whether or not the
/// registry declared it.
pub fn prune(registry: &mut Registry, ranges: &[PruneRange]) {
    for range in ranges {
        let table = registry.table_mut(range.class);
        for major in range.start..=range.end {
            table.reset(major);
        }
        debug!(class = %range.class, start = range.start, end = range.end, "Pruned majors");
    }
}
