use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use routeforge_codegen::{CONFIG_FILE, GenerateError, Generator, GeneratorConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "routeforge")]
#[command(about = "Generate route wiring for #[endpoint] types", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan sources and write the generated endpoint module
    Generate {
        /// Configuration file; `routeforge.toml` is used when present
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Source root to scan, repeatable; overrides the configuration
        #[arg(short, long = "source")]
        sources: Vec<PathBuf>,

        /// Output file; the module is printed to stdout when unset
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail when the output file is out of date instead of writing it
        #[arg(long, default_value_t = false)]
        check: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), GenerateError> {
    match cli.command {
        Commands::Generate {
            config,
            sources,
            output,
            check,
        } => {
            let mut config = match config {
                Some(path) => GeneratorConfig::from_file(&path)?,
                None if Path::new(CONFIG_FILE).is_file() => {
                    GeneratorConfig::from_file(Path::new(CONFIG_FILE))?
                }
                None => GeneratorConfig::default(),
            };
            if !sources.is_empty() {
                config.sources = sources;
            }
            if output.is_some() {
                config.output = output;
            }

            let generator = Generator::new(config);
            if check {
                generator.check()?;
                return Ok(());
            }
            let unit = generator.run()?;
            if generator.config().output.is_none() {
                print!("{}", unit.source);
            }
            Ok(())
        }
    }
}
