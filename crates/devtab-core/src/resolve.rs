//! Major/minor to device path lookup
//!
//! Reads the finished tables the same way a consumer of the emitted C
//! arrays does, rule tokens included.

use crate::label::Label;
use crate::table::{DeviceClass, MinorTable, Registry, RuleKind, RuleToken, Slot, MINORS_PER_MAJOR};

impl Registry {
    /// Device path for `class` `major:minor`, if the tables name one
    pub fn resolve(&self, class: DeviceClass, major: u8, minor: u8) -> Option<String> {
        let table = self.table(class).get(major)?;
        resolve_slot(table, minor)
    }
}

fn resolve_slot(table: &MinorTable, minor: u8) -> Option<String> {
    let token = match table.get(minor) {
        Slot::Name(name) => return Some(name.clone()),
        Slot::Rule(token) => token,
        Slot::Unassigned | Slot::RepeatMarker => return None,
    };

    let kind = token.kind();
    let offset = token.offset();
    let head = (minor as usize).checked_sub(offset)?;
    let slots = table.slots();

    let Slot::Rule(RuleToken::Head(head_kind)) = &slots[head] else {
        return None;
    };
    let Some(Slot::Rule(RuleToken::Base(_, base))) = slots.get(head + 1) else {
        return None;
    };
    let Some(Slot::Rule(RuleToken::First(_, first))) = slots.get(head + 2) else {
        return None;
    };
    if *head_kind != kind {
        return None;
    }

    Some(rule_path(kind, base, first, offset))
}

/// Path for the slot `offset` positions into a rule
pub fn rule_path(kind: RuleKind, base: &str, first: &Label, offset: usize) -> String {
    match (kind, offset) {
        (RuleKind::Repeat, _) => format!("{base}{}", first.nth(offset)),
        (RuleKind::Storage | RuleKind::StorageP, 0) => format!("{base}{first}"),
        (RuleKind::Storage, k) => format!("{base}{first}{k}"),
        (RuleKind::StorageP, k) => format!("{base}{first}p{k}"),
    }
}

/// Lookup front end with the MTD block override
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    registry: &'a Registry,
    mtdblock_major: Option<u8>,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            mtdblock_major: None,
        }
    }

    /// Block devices on this major resolve to `/dev/mtdblock<minor>`.
    /// Major 0 disables the override.
    pub fn with_mtdblock_major(mut self, major: Option<u8>) -> Self {
        self.mtdblock_major = major.filter(|&m| m != 0);
        self
    }

    /// Resolve numbers as given on a command line; anything outside the
    /// table bounds resolves to nothing
    pub fn resolve(&self, class: DeviceClass, major: u32, minor: u32) -> Option<String> {
        if minor as usize >= MINORS_PER_MAJOR {
            return None;
        }
        if class == DeviceClass::Block && self.mtdblock_major.is_some_and(|m| u32::from(m) == major) {
            return Some(format!("/dev/mtdblock{minor}"));
        }
        let major = u8::try_from(major).ok()?;
        self.registry.resolve(class, major, minor as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::DEFAULT_MATERIALIZE_LIMIT;
    use crate::scheme::StorageScheme;

    fn registry_with(class: DeviceClass, major: u8, fill: impl FnOnce(&mut MinorTable)) -> Registry {
        let mut registry = Registry::new();
        fill(registry.table_mut(class).entry(major));
        registry
    }

    #[test]
    fn test_resolve_repeat_rule() {
        let registry = registry_with(DeviceClass::Block, 8, |table| {
            table.set(0, Slot::Name("sda".to_string()));
            table.set(1, Slot::Name("sda1".to_string()));
            for (minor, token) in (2u8..).zip(RuleToken::sequence(RuleKind::Repeat, "sda", Label::Number(2), 14)) {
                table.set(minor, Slot::Rule(token));
            }
        });

        assert_eq!(registry.resolve(DeviceClass::Block, 8, 1).as_deref(), Some("sda1"));
        assert_eq!(registry.resolve(DeviceClass::Block, 8, 2).as_deref(), Some("sda2"));
        assert_eq!(registry.resolve(DeviceClass::Block, 8, 3).as_deref(), Some("sda3"));
        assert_eq!(registry.resolve(DeviceClass::Block, 8, 4).as_deref(), Some("sda4"));
        assert_eq!(registry.resolve(DeviceClass::Block, 8, 15).as_deref(), Some("sda15"));
        assert_eq!(registry.resolve(DeviceClass::Block, 8, 16), None);
    }

    #[test]
    fn test_resolve_storage_rules() {
        let sd = StorageScheme::new(DeviceClass::Block, 8, "/dev/sd", 16, 16, Label::alpha("a"));
        let registry = registry_with(DeviceClass::Block, 8, |table| {
            sd.apply(table, DEFAULT_MATERIALIZE_LIMIT);
        });

        assert_eq!(registry.resolve(DeviceClass::Block, 8, 0).as_deref(), Some("/dev/sda"));
        assert_eq!(registry.resolve(DeviceClass::Block, 8, 1).as_deref(), Some("/dev/sda1"));
        assert_eq!(registry.resolve(DeviceClass::Block, 8, 2).as_deref(), Some("/dev/sda2"));
        assert_eq!(registry.resolve(DeviceClass::Block, 8, 17).as_deref(), Some("/dev/sdb1"));
        assert_eq!(registry.resolve(DeviceClass::Block, 8, 255).as_deref(), Some("/dev/sdp15"));
    }

    #[test]
    fn test_resolve_storage_p_rules() {
        let mmc = StorageScheme::new(DeviceClass::Block, 179, "/dev/mmcblk", 32, 8, Label::Number(0));
        let registry = registry_with(DeviceClass::Block, 179, |table| {
            mmc.apply(table, DEFAULT_MATERIALIZE_LIMIT);
        });

        assert_eq!(registry.resolve(DeviceClass::Block, 179, 0).as_deref(), Some("/dev/mmcblk0"));
        assert_eq!(registry.resolve(DeviceClass::Block, 179, 1).as_deref(), Some("/dev/mmcblk0p1"));
        assert_eq!(registry.resolve(DeviceClass::Block, 179, 9).as_deref(), Some("/dev/mmcblk1p1"));
        assert_eq!(registry.resolve(DeviceClass::Char, 179, 0), None);
    }

    #[test]
    fn test_orphan_tokens_do_not_resolve() {
        let registry = registry_with(DeviceClass::Char, 4, |table| {
            table.set(5, Slot::Rule(RuleToken::Repeated(RuleKind::Repeat, 3)));
            table.set(6, Slot::RepeatMarker);
        });

        assert_eq!(registry.resolve(DeviceClass::Char, 4, 5), None);
        assert_eq!(registry.resolve(DeviceClass::Char, 4, 6), None);
        assert_eq!(registry.resolve(DeviceClass::Char, 4, 7), None);
        assert_eq!(registry.resolve(DeviceClass::Char, 5, 0), None);
    }

    #[test]
    fn test_mtdblock_override() {
        let registry = registry_with(DeviceClass::Char, 31, |table| {
            table.set(3, Slot::Name("/dev/chr3".to_string()));
        });
        let resolver = Resolver::new(&registry).with_mtdblock_major(Some(31));

        assert_eq!(resolver.resolve(DeviceClass::Block, 31, 3).as_deref(), Some("/dev/mtdblock3"));
        assert_eq!(resolver.resolve(DeviceClass::Char, 31, 3).as_deref(), Some("/dev/chr3"));
        assert_eq!(resolver.resolve(DeviceClass::Block, 31, 256), None);

        let disabled = Resolver::new(&registry).with_mtdblock_major(Some(0));
        assert_eq!(disabled.resolve(DeviceClass::Block, 0, 3), None);
    }

    #[test]
    fn test_out_of_range_numbers() {
        let registry = Registry::new();
        let resolver = Resolver::new(&registry);
        assert_eq!(resolver.resolve(DeviceClass::Char, 300, 0), None);
        assert_eq!(resolver.resolve(DeviceClass::Char, 4, 1000), None);
    }
}
