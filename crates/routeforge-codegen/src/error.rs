use std::path::PathBuf;

use routeforge_parse::{Diagnostic, LoadError};
use thiserror::Error;

/// Failure of a whole generation run.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} endpoint error(s):\n{}", .0.len(), render_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),

    #[error("{} is out of date; run `routeforge generate`", path.display())]
    Stale { path: PathBuf },
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|diagnostic| format!("  {diagnostic}"))
        .collect::<Vec<_>>()
        .join("\n")
}
