//! Build-time endpoint discovery and route generation.
//!
//! [`Generator`] scans a crate's sources for `#[endpoint]` types and renders
//! one Rust module that registers them, maps their routes and binds every
//! parameter. It is meant to run from a build script or the `routeforge`
//! command; the output depends only on the sources and the configuration.
//!
//! ```no_run
//! // build.rs
//! use routeforge_codegen::{Generator, GeneratorConfig};
//!
//! fn main() {
//!     let out_dir = std::env::var_os("OUT_DIR").unwrap_or_default();
//!     let config = GeneratorConfig {
//!         output: Some(std::path::Path::new(&out_dir).join("endpoints.rs")),
//!         rerun_if_changed: true,
//!         ..GeneratorConfig::default()
//!     };
//!     if let Err(err) = Generator::new(config).run() {
//!         panic!("{err}");
//!     }
//! }
//! ```

pub mod config;
pub mod writer;

mod driver;
mod emit;
mod error;

use std::path::Path;

use routeforge_parse::Compilation;

pub use config::{CONFIG_FILE, GeneratorConfig};
pub use driver::{GeneratedUnit, generate_unit};
pub use error::GenerateError;
pub use routeforge_parse::{Diagnostic, Severity};

pub type Result<T> = std::result::Result<T, GenerateError>;

/// Runs the generation pipeline for one configuration.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        GeneratorConfig::from_file(path.as_ref()).map(Self::new)
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Parse every source file under the configured roots.
    pub fn load(&self) -> Result<Compilation> {
        Ok(Compilation::load(&self.config.sources)?)
    }

    /// Render the unit for an already loaded compilation.
    pub fn generate(&self, compilation: &Compilation) -> GeneratedUnit {
        generate_unit(compilation, &self.config)
    }

    /// Load, generate and write the configured output.
    ///
    /// The output file is only touched when its contents change. Error
    /// diagnostics fail the run before anything is written.
    pub fn run(&self) -> Result<GeneratedUnit> {
        let unit = self.generate_checked()?;
        if self.config.rerun_if_changed {
            for source in &self.config.sources {
                println!("cargo:rerun-if-changed={}", source.display());
            }
            for input in &unit.inputs {
                println!("cargo:rerun-if-changed={}", input.display());
            }
        }
        if let Some(output) = &self.config.output {
            write_if_changed(output, &unit.source)?;
        }
        Ok(unit)
    }

    /// Fail with [`GenerateError::Stale`] when the output file differs from
    /// what would be generated now.
    pub fn check(&self) -> Result<GeneratedUnit> {
        let unit = self.generate_checked()?;
        if let Some(output) = &self.config.output {
            let current = std::fs::read_to_string(output).ok();
            if current.as_deref() != Some(unit.source.as_str()) {
                return Err(GenerateError::Stale {
                    path: output.clone(),
                });
            }
            tracing::info!(output = %output.display(), "generated unit is up to date");
        }
        Ok(unit)
    }

    fn generate_checked(&self) -> Result<GeneratedUnit> {
        let compilation = self.load()?;
        let unit = self.generate(&compilation);
        if unit.has_errors() {
            return Err(GenerateError::Diagnostics(unit.errors().cloned().collect()));
        }
        Ok(unit)
    }
}

fn write_if_changed(path: &Path, contents: &str) -> Result<()> {
    if std::fs::read_to_string(path).is_ok_and(|existing| existing == contents) {
        tracing::debug!(output = %path.display(), "generated unit unchanged");
        return Ok(());
    }
    let write_error = |source: std::io::Error| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, contents).map_err(write_error)?;
    tracing::info!(output = %path.display(), "wrote generated unit");
    Ok(())
}
