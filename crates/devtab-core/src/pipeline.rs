//! Parse, prune, expand, overlay: registry text to finished tables

use serde::Serialize;
use tracing::info;

use crate::config::PipelineConfig;
use crate::diagnostic::Diagnostic;
use crate::emit::{emit_c, EmitOptions};
use crate::expand::expand_repeats;
use crate::parser::parse_registry;
use crate::prune::prune;
use crate::resolve::Resolver;
use crate::scheme::{apply_interleaved, apply_schemes};
use crate::table::{DeviceClass, Registry, RuleToken, Slot};

/// Tables built from one registry text, with whatever went wrong on the way
#[derive(Debug, Clone, Serialize)]
pub struct Generated {
    pub registry: Registry,
    pub diagnostics: Vec<Diagnostic>,
}

impl Generated {
    pub fn to_c(&self, options: &EmitOptions) -> String {
        emit_c(&self.registry, options)
    }

    /// Pretty JSON of the sparse tables and diagnostics
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Number of generated rules across both classes
    pub fn rule_count(&self) -> usize {
        DeviceClass::ALL
            .iter()
            .flat_map(|&class| self.registry.table(class).iter())
            .flat_map(|(_, table)| table.slots())
            .filter(|slot| matches!(slot, Slot::Rule(RuleToken::Head(_))))
            .count()
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage over `text`. Never fails; anomalies are collected in
    /// [`Generated::diagnostics`].
    pub fn run(&self, text: &str) -> Generated {
        let mut registry = parse_registry(text);
        let mut diagnostics = Vec::new();

        prune(&mut registry, &self.config.prune);
        for class in DeviceClass::ALL {
            expand_repeats(
                class,
                registry.table_mut(class),
                self.config.materialize_limit,
                &mut diagnostics,
            );
        }
        apply_schemes(
            &mut registry,
            &self.config.schemes,
            self.config.materialize_limit,
            &mut diagnostics,
        );
        apply_interleaved(&mut registry, &self.config.interleaved, &mut diagnostics);

        let generated = Generated {
            registry,
            diagnostics,
        };
        info!(
            char_majors = generated.registry.char.populated().count(),
            block_majors = generated.registry.block.populated().count(),
            rules = generated.rule_count(),
            diagnostics = generated.diagnostics.len(),
            "Generated device tables"
        );
        generated
    }

    /// Run and render as C with the configured emit options
    pub fn transform(&self, text: &str) -> String {
        self.run(text).to_c(&self.config.emit)
    }

    /// Resolver over `registry` honouring the configured MTD block major
    pub fn resolver<'a>(&self, registry: &'a Registry) -> Resolver<'a> {
        Resolver::new(registry).with_mtdblock_major(self.config.mtdblock_major)
    }
}

/// Registry text to C source with the built-in tables
pub fn transform(text: &str) -> String {
    Pipeline::default().transform(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prune::PruneRange;

    fn bare_config() -> PipelineConfig {
        PipelineConfig {
            prune: Vec::new(),
            schemes: Vec::new(),
            interleaved: Vec::new(),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_stages_run_in_order() {
        let text = "  4 char\tTTY devices\n\t  0 = /dev/tty0\n\t  1 = /dev/tty1\n\t    ...\n\t 63 = /dev/tty63\n 12 char\tpruned\n\t  0 = /dev/gone\n";
        let mut config = bare_config();
        config.prune = vec![PruneRange::single(DeviceClass::Char, 12)];

        let generated = Pipeline::new(config).run(text);
        let registry = &generated.registry;

        assert_eq!(registry.resolve(DeviceClass::Char, 4, 2).as_deref(), Some("/dev/tty2"));
        assert_eq!(registry.resolve(DeviceClass::Char, 4, 62).as_deref(), Some("/dev/tty62"));
        assert_eq!(registry.resolve(DeviceClass::Char, 4, 63).as_deref(), Some("/dev/tty63"));
        assert!(registry.char.get(12).unwrap().is_empty());
        assert_eq!(generated.rule_count(), 1);
        assert_eq!(generated.warnings().count(), 0);
    }

    #[test]
    fn test_schemes_overlay_parsed_entries() {
        let text = "  8 block\tSCSI disk devices\n\t  0 = /dev/sda\n\t 16 = /dev/sdb\n";
        let generated = Pipeline::default().run(text);

        assert_eq!(
            generated.registry.block.get(8).unwrap().get(0),
            &Slot::Rule(RuleToken::Head(crate::table::RuleKind::Storage))
        );
        assert_eq!(
            generated.registry.resolve(DeviceClass::Block, 8, 16).as_deref(),
            Some("/dev/sdb")
        );
        // Built-in schemes populate majors the text never mentions
        assert!(generated.registry.block.get(179).is_some());
        assert_eq!(
            generated.registry.resolve(DeviceClass::Char, 90, 1).as_deref(),
            Some("/dev/mtdr0")
        );
    }

    #[test]
    fn test_resolver_uses_configured_mtdblock() {
        let mut config = bare_config();
        config.mtdblock_major = Some(31);
        let pipeline = Pipeline::new(config);
        let generated = pipeline.run("");

        let resolver = pipeline.resolver(&generated.registry);
        assert_eq!(resolver.resolve(DeviceClass::Block, 31, 2).as_deref(), Some("/dev/mtdblock2"));
    }

    #[test]
    fn test_json_dump() {
        let text = "  1 char\tMemory devices\n\t  1 = /dev/mem\n\t  3 = /dev/null\n\t    ...\n";
        let generated = Pipeline::new(bare_config()).run(text);
        let json: serde_json::Value = serde_json::from_str(&generated.to_json().unwrap()).unwrap();

        assert_eq!(json["registry"]["char"]["1"]["1"]["value"], "/dev/mem");
        assert_eq!(json["diagnostics"][0]["kind"], "unrepeatable_pattern");
        assert_eq!(json["diagnostics"][0]["predecessor"], "/dev/null");
    }
}
