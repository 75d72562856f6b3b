//! C source emitter
//!
//! Each populated major becomes a `char*` array indexed by minor, and each
//! class gets a `switch`-based function mapping a major to its array:
//!
//! ```text
//! char* table_block_8[DEVMM_MAX_MINOR] = {
//! 	DEVMM_STORAGE,
//! 	DEVMM_STORAGE_BASE("/dev/sd"),
//! 	...
//! };
//!
//! char** ReadDevMMTable_block(int Major){
//! 	switch(Major){
//! 		case 8: return table_block_8;
//! 	}
//! 	return 0;
//! 	}
//! ```
//!
//! The `DEVMM_*` rule macros and the size constants are left to the
//! including program unless [`EmitOptions::prelude`] is set.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::table::{escape_c, DeviceClass, MinorTable, Registry, Slot, MINORS_PER_MAJOR};

/// Naming and framing of the generated source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitOptions {
    /// Arrays are named `<array_prefix>_<class>_<major>`
    pub array_prefix: String,
    /// Lookup functions are named `<lookup_prefix>_<class>`
    pub lookup_prefix: String,
    /// Emit guarded `DEVMM_MAX_MAJOR` / `DEVMM_MAX_MINOR` defines first
    pub prelude: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            array_prefix: "table".to_string(),
            lookup_prefix: "ReadDevMMTable".to_string(),
            prelude: false,
        }
    }
}

/// Display adapter rendering a registry as C source
pub struct CTables<'a> {
    registry: &'a Registry,
    options: &'a EmitOptions,
}

impl<'a> CTables<'a> {
    pub fn new(registry: &'a Registry, options: &'a EmitOptions) -> Self {
        Self { registry, options }
    }

    fn array_name(&self, class: DeviceClass, major: u8) -> String {
        format!("{}_{}_{}", self.options.array_prefix, class, major)
    }

    fn write_prelude(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in ["DEVMM_MAX_MAJOR", "DEVMM_MAX_MINOR"] {
            writeln!(f, "#ifndef {name}")?;
            writeln!(f, "#define {name} {MINORS_PER_MAJOR}")?;
            writeln!(f, "#endif")?;
        }
        writeln!(f)
    }

    fn write_arrays(&self, f: &mut fmt::Formatter<'_>, class: DeviceClass) -> fmt::Result {
        for (major, table) in self.registry.table(class).populated() {
            writeln!(f, "char* {}[DEVMM_MAX_MINOR] = {{", self.array_name(class, major))?;
            write_slots(f, table)?;
            writeln!(f, "\n}};")?;
        }
        Ok(())
    }

    fn write_lookup(&self, f: &mut fmt::Formatter<'_>, class: DeviceClass) -> fmt::Result {
        writeln!(f, "char** {}_{}(int Major){{", self.options.lookup_prefix, class)?;
        writeln!(f, "\tswitch(Major){{")?;
        for (major, _) in self.registry.table(class).populated() {
            writeln!(f, "\t\tcase {major}: return {};", self.array_name(class, major))?;
        }
        writeln!(f, "\t}}")?;
        writeln!(f, "\treturn 0;")?;
        writeln!(f, "\t}}")
    }
}

fn write_slots(f: &mut fmt::Formatter<'_>, table: &MinorTable) -> fmt::Result {
    for slot in &table.slots()[..table.len()] {
        match slot {
            Slot::Name(name) => writeln!(f, "\t\"{}\", ", escape_c(name))?,
            Slot::Rule(token) => writeln!(f, "\t{token}, ")?,
            Slot::Unassigned | Slot::RepeatMarker => writeln!(f, "\t0, ")?,
        }
    }
    Ok(())
}

impl fmt::Display for CTables<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.options.prelude {
            self.write_prelude(f)?;
        }
        self.write_arrays(f, DeviceClass::Char)?;
        f.write_str("\n\n")?;
        self.write_arrays(f, DeviceClass::Block)?;
        f.write_str("\n\n")?;
        self.write_lookup(f, DeviceClass::Char)?;
        self.write_lookup(f, DeviceClass::Block)
    }
}

/// Render `registry` as C source text
pub fn emit_c(registry: &Registry, options: &EmitOptions) -> String {
    CTables::new(registry, options).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;
    use crate::table::{RuleKind, RuleToken};

    fn sample() -> Registry {
        let mut registry = Registry::new();
        let tty = registry.char.entry(4);
        tty.set(0, Slot::Name("/dev/tty0".to_string()));
        tty.set(2, Slot::Name("/dev/tty2".to_string()));
        registry.char.reset(5);

        let loops = registry.block.entry(7);
        for (minor, token) in (0u8..).zip(RuleToken::sequence(RuleKind::Repeat, "/dev/loop", Label::Number(0), 4)) {
            loops.set(minor, Slot::Rule(token));
        }
        registry
    }

    #[test]
    fn test_emit_layout() {
        let expected = concat!(
            "char* table_char_4[DEVMM_MAX_MINOR] = {\n",
            "\t\"/dev/tty0\", \n",
            "\t0, \n",
            "\t\"/dev/tty2\", \n",
            "\n};\n",
            "\n\n",
            "char* table_block_7[DEVMM_MAX_MINOR] = {\n",
            "\tDEVMM_REPEAT, \n",
            "\tDEVMM_REPEAT_BASE(\"/dev/loop\"), \n",
            "\tDEVMM_REPEAT_FIRST(0), \n",
            "\tDEVMM_REPEATED(3), \n",
            "\n};\n",
            "\n\n",
            "char** ReadDevMMTable_char(int Major){\n",
            "\tswitch(Major){\n",
            "\t\tcase 4: return table_char_4;\n",
            "\t}\n",
            "\treturn 0;\n",
            "\t}\n",
            "char** ReadDevMMTable_block(int Major){\n",
            "\tswitch(Major){\n",
            "\t\tcase 7: return table_block_7;\n",
            "\t}\n",
            "\treturn 0;\n",
            "\t}\n",
        );
        assert_eq!(emit_c(&sample(), &EmitOptions::default()), expected);
    }

    #[test]
    fn test_emit_empty_registry() {
        let out = emit_c(&Registry::new(), &EmitOptions::default());
        assert!(out.starts_with("\n\n\n\nchar** ReadDevMMTable_char(int Major){"));
        assert!(!out.contains("case"));
    }

    #[test]
    fn test_names_are_escaped() {
        let mut registry = Registry::new();
        registry.char.entry(1).set(0, Slot::Name("/dev/we\"ird\\".to_string()));

        let out = emit_c(&registry, &EmitOptions::default());
        assert!(out.contains("\t\"/dev/we\\\"ird\\\\\", \n"));
    }

    #[test]
    fn test_emit_options() {
        let options = EmitOptions {
            array_prefix: "devs".to_string(),
            lookup_prefix: "lookup".to_string(),
            prelude: true,
        };
        let out = emit_c(&sample(), &options);

        assert!(out.starts_with("#ifndef DEVMM_MAX_MAJOR\n#define DEVMM_MAX_MAJOR 256\n#endif\n"));
        assert!(out.contains("#define DEVMM_MAX_MINOR 256\n"));
        assert!(out.contains("char* devs_char_4[DEVMM_MAX_MINOR] = {\n"));
        assert!(out.contains("char** lookup_block(int Major){\n"));
        assert!(out.contains("\t\tcase 7: return devs_block_7;\n"));
    }
}
