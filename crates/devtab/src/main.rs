//! devtab - Device major/minor lookup table generator
//!
//! Turns the kernel device registry text into C lookup tables, or resolves a
//! single major/minor pair the way the generated tables would.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use devtab_core::{load_config, save_config, DeviceClass, Pipeline, PipelineConfig};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "devtab")]
#[command(about = "Device registry to major/minor lookup table generator")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "devtab.toml", global = true)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate lookup tables from registry text
    Generate {
        /// Registry text file, `-` for stdin
        #[arg(default_value = "-")]
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = Format::C)]
        format: Format,

        /// Prepend DEVMM_MAX_MAJOR / DEVMM_MAX_MINOR defines
        #[arg(long)]
        prelude: bool,
    },

    /// Resolve a device number to its /dev path
    Lookup {
        /// Device class: char, block, c or b
        #[arg(value_parser = parse_class)]
        class: DeviceClass,

        /// `MAJOR:MINOR`, or `MAJOR MINOR`
        #[arg(num_args = 1..=2, required = true)]
        numbers: Vec<String>,

        /// Registry text the tables are built from
        #[arg(short, long)]
        registry: PathBuf,

        /// Block major that always resolves to /dev/mtdblock<minor>
        #[arg(long, env = "DEVTAB_MTDBLOCK_MAJOR")]
        mtdblock_major: Option<u8>,
    },

    /// Write the built-in tables as a config file
    InitConfig {
        /// Destination (default: the --config path)
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// C arrays and lookup functions
    C,
    /// Sparse tables and diagnostics as JSON
    Json,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // Generated text may go to stdout
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Generate {
            input,
            output,
            format,
            prelude,
        } => run_generate(&args.config, &input, output.as_deref(), format, prelude),
        Command::Lookup {
            class,
            numbers,
            registry,
            mtdblock_major,
        } => run_lookup(&args.config, class, &numbers, &registry, mtdblock_major),
        Command::InitConfig { path } => {
            run_init_config(path.as_deref().unwrap_or(&args.config))
        }
    }
}

fn run_generate(
    config_path: &Path,
    input: &Path,
    output: Option<&Path>,
    format: Format,
    prelude: bool,
) -> Result<ExitCode> {
    let mut config = load_config(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    if prelude {
        config.emit.prelude = true;
    }

    let text = read_input(input)?;
    let pipeline = Pipeline::new(config);
    let generated = pipeline.run(&text);

    let rendered = match format {
        Format::C => generated.to_c(&pipeline.config().emit),
        Format::Json => generated
            .to_json()
            .context("Failed to serialize tables")?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = rendered.len(), "Wrote tables");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    let warnings = generated.warnings().count();
    if warnings > 0 {
        info!(warnings, "Some registry entries could not be expanded");
    }

    Ok(ExitCode::SUCCESS)
}

fn run_lookup(
    config_path: &Path,
    class: DeviceClass,
    numbers: &[String],
    registry: &Path,
    mtdblock_major: Option<u8>,
) -> Result<ExitCode> {
    let mut config = load_config(config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    if mtdblock_major.is_some() {
        config.mtdblock_major = mtdblock_major;
    }

    let (major, minor) = parse_numbers(numbers)?;
    let text = read_input(registry)?;
    let pipeline = Pipeline::new(config);
    let generated = pipeline.run(&text);

    match pipeline.resolver(&generated.registry).resolve(class, major, minor) {
        Some(path) => {
            println!("{path}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            info!(%class, major, minor, "No device name for number");
            Ok(ExitCode::from(2))
        }
    }
}

fn run_init_config(path: &Path) -> Result<ExitCode> {
    if path.exists() {
        bail!("{} already exists, not overwriting", path.display());
    }
    save_config(&PipelineConfig::default(), path)
        .with_context(|| format!("Failed to write config {}", path.display()))?;
    eprintln!("Wrote default configuration to {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn parse_class(s: &str) -> Result<DeviceClass, String> {
    DeviceClass::parse(s).ok_or_else(|| format!("unknown device class '{s}', expected char or block"))
}

fn parse_numbers(numbers: &[String]) -> Result<(u32, u32)> {
    let (major, minor) = match numbers {
        [pair] => pair
            .split_once(':')
            .with_context(|| format!("Expected MAJOR:MINOR, got '{pair}'"))?,
        [major, minor] => (major.as_str(), minor.as_str()),
        _ => bail!("Expected MAJOR:MINOR or MAJOR MINOR"),
    };

    let major = major
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid major number '{major}'"))?;
    let minor = minor
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Invalid minor number '{minor}'"))?;
    Ok((major, minor))
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read registry from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_numbers(&["8:1".to_string()]).unwrap(), (8, 1));
        assert_eq!(parse_numbers(&["179".to_string(), "9".to_string()]).unwrap(), (179, 9));
        assert!(parse_numbers(&["8".to_string()]).is_err());
        assert!(parse_numbers(&["8:x".to_string()]).is_err());
    }

    #[test]
    fn test_cli_parses() {
        let args = Args::try_parse_from(["devtab", "lookup", "b", "8", "1", "-r", "devices.txt"]).unwrap();
        match args.command {
            Command::Lookup { class, numbers, .. } => {
                assert_eq!(class, DeviceClass::Block);
                assert_eq!(numbers, ["8", "1"]);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let args = Args::try_parse_from(["devtab", "generate", "-f", "json", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level, "debug");
        assert!(matches!(args.command, Command::Generate { format: Format::Json, .. }));
    }
}
