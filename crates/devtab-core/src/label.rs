//! Unit labels and the alphabetic counter
//!
//! Disk-style device families label their units with letters (`sda`, `sdb`,
//! ... `sdz`, `sdaa`) or with plain integers (`mmcblk0`, `mmcblk1`). Both
//! forms advance through [`Label::next`].

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::table::RuleKind;

/// Advance a lowercase letter sequence by one step.
///
/// The last letter is incremented. A letter that steps past `z` resets to
/// `a` and carries into the letter before it; when the carry falls off the
/// front a fresh `a` is prepended, so `z` -> `aa`, `az` -> `ba` and
/// `zz` -> `aaa`. Input is not validated or case-folded.
pub fn next_alpha(label: &str) -> String {
    let mut letters: Vec<char> = label.chars().collect();
    let mut pos = letters.len();
    let mut carry = true;

    while carry && pos > 0 {
        pos -= 1;
        match char::from_u32(letters[pos] as u32 + 1) {
            Some(c) if c <= 'z' => {
                letters[pos] = c;
                carry = false;
            }
            _ => letters[pos] = 'a',
        }
    }

    if carry {
        letters.insert(0, 'a');
    }
    letters.into_iter().collect()
}

/// Label of the first unit in a generated naming scheme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    /// Integer unit numbers; partitions are written `<unit>p<index>`
    Number(u64),
    /// Letter unit names; partitions are written `<unit><index>`
    Alpha(Cow<'static, str>),
}

impl Label {
    pub const fn alpha(label: &'static str) -> Self {
        Self::Alpha(Cow::Borrowed(label))
    }

    /// The label of the following unit
    pub fn next(&self) -> Self {
        match self {
            Label::Number(n) => Label::Number(n.saturating_add(1)),
            Label::Alpha(s) => Label::Alpha(Cow::Owned(next_alpha(s))),
        }
    }

    /// The label `steps` units after this one
    pub fn nth(&self, steps: usize) -> Self {
        match self {
            Label::Number(n) => Label::Number(n.saturating_add(steps as u64)),
            Label::Alpha(_) => (0..steps).fold(self.clone(), |label, _| label.next()),
        }
    }

    /// Device path of partition `index` of this unit (`0` is the whole unit)
    pub fn partition_path(&self, base: &str, index: usize) -> String {
        match (self, index) {
            (_, 0) => format!("{base}{self}"),
            (Label::Alpha(_), _) => format!("{base}{self}{index}"),
            (Label::Number(_), _) => format!("{base}{self}p{index}"),
        }
    }

    /// Which generated rule encodes a unit labelled like this
    pub fn storage_kind(&self) -> RuleKind {
        match self {
            Label::Alpha(_) => RuleKind::Storage,
            Label::Number(_) => RuleKind::StorageP,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Number(n) => write!(f, "{n}"),
            Label::Alpha(s) => f.write_str(s),
        }
    }
}
