use std::path::PathBuf;

use thiserror::Error;

/// Failure while loading the sources of a crate.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    #[error("failed to walk source root {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}
