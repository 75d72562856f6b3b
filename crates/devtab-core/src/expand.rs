//! Repeat-marker expansion
//!
//! The registry abbreviates long uniform runs with `...`:
//!
//! ```text
//! 	  1 = /dev/ttyS1
//! 	    ...
//! 	 64 = /dev/ttyX0
//! ```
//!
//! The marker continues the digit run of the entry before it up to the
//! next concrete entry. Short runs are written out as names; long runs
//! become a [`RuleKind::Repeat`] token sequence.

use tracing::{debug, warn};

use crate::diagnostic::Diagnostic;
use crate::label::Label;
use crate::table::{DeviceClass, MajorTable, MinorTable, RuleKind, RuleToken, Slot, MINORS_PER_MAJOR};

/// Runs up to this many slots are materialized as literal names
pub const DEFAULT_MATERIALIZE_LIMIT: usize = 4;

/// A name split around its first digit run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern<'a> {
    pub prefix: &'a str,
    pub core: &'a str,
    pub suffix: &'a str,
}

/// Split `name` into literal prefix, first digit run and the rest.
///
/// Returns `None` when the name holds no digits.
pub fn decompose(name: &str) -> Option<Pattern<'_>> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let len = name[start..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(name.len() - start);
    Some(Pattern {
        prefix: &name[..start],
        core: &name[start..start + len],
        suffix: &name[start + len..],
    })
}

/// Value the run is expected to stop at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    /// Taken from the next definition sharing the run's prefix
    Anchored(String),
    /// No such definition; assumed `0`
    Guessed,
}

impl Terminal {
    pub fn value(&self) -> &str {
        match self {
            Terminal::Anchored(value) => value,
            Terminal::Guessed => "0",
        }
    }
}

/// Expand every repeat marker in every major of one class table.
pub fn expand_repeats(
    class: DeviceClass,
    majors: &mut MajorTable,
    materialize_limit: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for (major, minors) in majors.iter_mut() {
        expand_major(class, major, minors, materialize_limit, diagnostics);
    }
}

fn expand_major(
    class: DeviceClass,
    major: u8,
    minors: &mut MinorTable,
    materialize_limit: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let slots = minors.slots_mut();
    let mut n = 0;

    while n < MINORS_PER_MAJOR {
        if slots[n] != Slot::RepeatMarker {
            n += 1;
            continue;
        }

        let predecessor = n.checked_sub(1).and_then(|p| slots[p].as_name());
        // The run must be able to count past the last minor
        let pattern = predecessor.and_then(decompose).and_then(|p| {
            let core = p.core.parse::<u64>().ok()?;
            core.checked_add(MINORS_PER_MAJOR as u64)?;
            Some((p.prefix.to_string(), core))
        });

        let Some((prefix, core)) = pattern else {
            warn!(%class, major, minor = n, predecessor, "Unrepeatable pattern before repeat marker");
            diagnostics.push(Diagnostic::UnrepeatablePattern {
                class,
                major,
                minor: n as u8,
                predecessor: predecessor.map(str::to_string),
            });
            slots[n] = Slot::Unassigned;
            n += 1;
            continue;
        };

        let first = core + 1;
        let end = run_end(slots, n + 1);
        let terminal = run_terminal(slots, end, &prefix);

        match &terminal {
            Terminal::Anchored(value) => {
                debug!(%class, major, start = n, end, %prefix, first, terminal = %value, "Expanding repeat run");
            }
            Terminal::Guessed => {
                debug!(%class, major, start = n, end, %prefix, first, "Repeat run has no anchor, guessing terminal 0");
                diagnostics.push(Diagnostic::UnanchoredRun {
                    class,
                    major,
                    start: n as u8,
                    end: end as u8,
                });
            }
        }

        fill_run(&mut slots[n..=end], &prefix, first, materialize_limit);
        n = end + 1;
    }
}

/// Last slot of a run starting before `from`: the slot before the next
/// concrete entry, or 255.
fn run_end(slots: &[Slot], from: usize) -> usize {
    (from..MINORS_PER_MAJOR)
        .find(|&k| slots[k].is_defined())
        .map_or(MINORS_PER_MAJOR - 1, |k| k - 1)
}

fn run_terminal(slots: &[Slot], end: usize, prefix: &str) -> Terminal {
    slots
        .get(end + 1)
        .and_then(Slot::as_name)
        .and_then(|next| next.strip_prefix(prefix))
        .map_or(Terminal::Guessed, |rest| Terminal::Anchored(rest.to_string()))
}

fn fill_run(run: &mut [Slot], prefix: &str, first: u64, materialize_limit: usize) {
    if run.len() <= materialize_limit {
        for (value, slot) in (first..).zip(run.iter_mut()) {
            *slot = Slot::Name(format!("{prefix}{value}"));
        }
        return;
    }

    let tokens = RuleToken::sequence(RuleKind::Repeat, prefix, Label::Number(first), run.len());
    for (slot, token) in run.iter_mut().zip(tokens) {
        *slot = Slot::Rule(token);
    }
}
