//! Non-fatal anomalies found while building tables

use serde::Serialize;
use std::fmt;

use crate::table::DeviceClass;

/// Something an operator may want to hand-fix in the registry.
///
/// None of these stop the pipeline; the affected slots are left in a
/// best-effort state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A `...` marker whose predecessor has no digit run to continue.
    /// The marker slot is left unassigned.
    UnrepeatablePattern {
        class: DeviceClass,
        major: u8,
        minor: u8,
        predecessor: Option<String>,
    },
    /// A repeat run with no matching definition after it; its terminal
    /// value was guessed as `0`.
    UnanchoredRun {
        class: DeviceClass,
        major: u8,
        start: u8,
        end: u8,
    },
    /// A generated scheme needed more than 256 minors and was cut off.
    SchemeOverflow {
        class: DeviceClass,
        major: u8,
        base: String,
    },
}

impl Diagnostic {
    /// Low-confidence inferences are informational; the rest are warnings
    pub fn is_warning(&self) -> bool {
        !matches!(self, Diagnostic::UnanchoredRun { .. })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnrepeatablePattern {
                class,
                major,
                minor,
                predecessor,
            } => match predecessor {
                Some(name) => write!(
                    f,
                    "{class} {major}:{minor}: cannot repeat pattern of {name:?}"
                ),
                None => write!(f, "{class} {major}:{minor}: repeat marker has no predecessor"),
            },
            Diagnostic::UnanchoredRun {
                class,
                major,
                start,
                end,
            } => write!(
                f,
                "{class} {major}:{start}-{end}: no closing definition, terminal guessed"
            ),
            Diagnostic::SchemeOverflow { class, major, base } => {
                write!(f, "{class} {major}: scheme {base:?} truncated at minor 255")
            }
        }
    }
}
