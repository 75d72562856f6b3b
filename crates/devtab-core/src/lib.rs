//! Devtab Core - Device registry parsing and lookup-table generation
//!
//! This crate turns the kernel's human-maintained device number registry
//! into compact major/minor lookup tables:
//! - Registry parsing into sparse per-class major/minor tables
//! - Pruning of rare and legacy majors
//! - Inference of `...` repeat runs from naming patterns
//! - Generated naming schemes for disk-style majors
//! - C array and lookup-function emission, plus a resolver that reads the
//!   tables back the way the emitted code does

pub mod config;
pub mod diagnostic;
pub mod emit;
pub mod expand;
pub mod label;
pub mod parser;
pub mod pipeline;
pub mod prune;
pub mod resolve;
pub mod scheme;
pub mod table;

pub use config::{load_config, save_config, ConfigError, PipelineConfig};
pub use diagnostic::Diagnostic;
pub use emit::{emit_c, CTables, EmitOptions};
pub use label::{next_alpha, Label};
pub use parser::parse_registry;
pub use pipeline::{transform, Generated, Pipeline};
pub use prune::{PruneRange, DEFAULT_PRUNE};
pub use resolve::Resolver;
pub use scheme::{InterleavedScheme, StorageScheme};
pub use table::{DeviceClass, MajorTable, MinorTable, Registry, RuleKind, RuleToken, Slot};
