//! Registry text parser
//!
//! The registry is the kernel's human-maintained device list. Only three
//! kinds of line matter:
//!
//! ```text
//!   8 block	SCSI disk devices        <- major header (number in columns 0-3)
//! 		  0 = /dev/sda		First SCSI disk whole disk
//! 		    ...                  <- repeat marker
//! ```
//!
//! Everything else is prose and is skipped without complaint.

use tracing::{debug, trace};

use crate::table::{DeviceClass, Registry, Slot};

/// Columns inspected for a header's major number
const HEADER_WIDTH: usize = 4;
/// Columns searched for the `char` / `block` class words
const CLASS_WORD_WIDTH: usize = 16;
const REPEAT_LINE: &str = "...";

/// Parse registry text into char and block tables.
///
/// Never fails: malformed lines are dropped. Later definitions of the same
/// major/minor overwrite earlier ones.
pub fn parse_registry(text: &str) -> Registry {
    let mut registry = Registry::new();
    let mut class = DeviceClass::Char;
    let mut major: Option<u8> = None;
    let mut previous_repeat = false;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(number) = header_major(line) {
            class = header_class(line).unwrap_or(class);
            previous_repeat = false;
            major = match u8::try_from(number) {
                Ok(m) => {
                    registry.table_mut(class).reset(m);
                    Some(m)
                }
                Err(_) => {
                    debug!(line = line_no, major = number, "Major out of range, skipping section");
                    None
                }
            };
            continue;
        }

        if line.trim() == REPEAT_LINE {
            if !previous_repeat {
                if let Some(m) = major {
                    if !registry.table_mut(class).entry(m).push_marker() {
                        debug!(line = line_no, %class, major = m, "No room for repeat marker");
                    }
                }
            }
            previous_repeat = true;
            continue;
        }
        previous_repeat = false;

        let Some((minor, name)) = parse_definition(line) else {
            trace!(line = line_no, "Skipping prose line");
            continue;
        };

        let Some(m) = major else {
            debug!(line = line_no, minor, name, "Definition outside any major section");
            continue;
        };

        let Ok(minor) = u8::try_from(minor) else {
            debug!(line = line_no, %class, major = m, minor, "Minor out of range");
            continue;
        };

        registry
            .table_mut(class)
            .entry(m)
            .set(minor, Slot::Name(name.to_string()));
    }

    registry
}

/// Major number of a header line, if the line is one.
///
/// A header is any line whose first four characters start with an integer
/// and contain no tab.
fn header_major(line: &str) -> Option<i64> {
    let head: String = line.chars().take(HEADER_WIDTH).collect();
    if head.contains('\t') {
        return None;
    }
    parse_leading_int(&head)
}

/// Class named near the start of a header; `char` wins if both appear
fn header_class(line: &str) -> Option<DeviceClass> {
    let lead: String = line.chars().take(CLASS_WORD_WIDTH).collect();
    if lead.contains("char") {
        Some(DeviceClass::Char)
    } else if lead.contains("block") {
        Some(DeviceClass::Block)
    } else {
        None
    }
}

/// Split `<minor> = <name> [description]` into its minor and name.
///
/// Names containing `?` are documentation examples (`/dev/hd?`), not
/// definitions.
fn parse_definition(line: &str) -> Option<(i64, &str)> {
    let (lhs, rhs) = line.split_once('=')?;
    let minor = parse_leading_int(lhs)?;

    let rhs = rhs.trim();
    let name = rhs.split_whitespace().next().unwrap_or_default();
    if name.is_empty() || name.contains('?') {
        return None;
    }
    Some((minor, name))
}

/// Parse the integer at the start of `s`, ignoring whatever follows it.
///
/// Leading whitespace and a sign are accepted, as is a `0x` hex prefix.
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, s) = match s.get(..2) {
        Some("0x") | Some("0X") => (16, &s[2..]),
        _ => (10, s),
    };

    let end = s
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(s.len());
    let value = i64::from_str_radix(&s[..end], radix).ok()?;
    Some(if negative { -value } else { value })
}
