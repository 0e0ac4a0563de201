//! Generator configuration, read from `routeforge.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::GenerateError;

/// Default configuration file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "routeforge.toml";

/// How and where to generate the endpoint unit.
///
/// ```toml
/// sources = ["src"]
/// output = "generated/endpoints.rs"
/// module = "endpoints"
/// schema_feature = "openapi"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Source roots to scan.
    pub sources: Vec<PathBuf>,
    /// Where the generated unit is written. `None` means stdout for the CLI.
    pub output: Option<PathBuf>,
    /// Path of the runtime crate as seen from the generated code.
    pub runtime: String,
    /// Name of the generated module.
    pub module: String,
    /// Spaces per indentation level.
    pub indent: usize,
    /// Last path segment of the attribute marking endpoint types.
    pub endpoint_attribute: String,
    /// Cargo feature gating `describe_schemas`; ungated when absent.
    pub schema_feature: Option<String>,
    /// Print `cargo:rerun-if-changed` lines for every input.
    pub rerun_if_changed: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sources: vec![PathBuf::from("src")],
            output: None,
            runtime: "::routeforge".to_string(),
            module: "endpoints".to_string(),
            indent: 4,
            endpoint_attribute: "endpoint".to_string(),
            schema_feature: None,
            rerun_if_changed: false,
        }
    }
}

impl GeneratorConfig {
    /// Parse a configuration file; relative paths are resolved against the
    /// file's directory.
    pub fn from_file(path: &Path) -> Result<Self, GenerateError> {
        let text = std::fs::read_to_string(path).map_err(|source| GenerateError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&text).map_err(|source| GenerateError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn rebase(&mut self, base: &Path) {
        for source in &mut self.sources {
            if source.is_relative() {
                *source = base.join(&*source);
            }
        }
        if let Some(output) = &mut self.output
            && output.is_relative()
        {
            *output = base.join(&*output);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::from_toml("").expect("empty config is valid");
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(config.runtime, "::routeforge");
        assert_eq!(config.indent, 4);
    }

    #[test]
    fn test_overrides() {
        let config = GeneratorConfig::from_toml(
            r#"
            sources = ["api/src", "shared/src"]
            output = "src/generated.rs"
            runtime = "crate::runtime"
            module = "routes"
            indent = 2
            endpoint_attribute = "http_endpoint"
            schema_feature = "openapi"
            rerun_if_changed = true
            "#,
        )
        .expect("valid config");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.output, Some(PathBuf::from("src/generated.rs")));
        assert_eq!(config.module, "routes");
        assert_eq!(config.schema_feature.as_deref(), Some("openapi"));
        assert!(config.rerun_if_changed);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(GeneratorConfig::from_toml("output_dir = \"x\"").is_err());
    }

    #[test]
    fn test_rebase_relative_paths() {
        let mut config = GeneratorConfig {
            output: Some(PathBuf::from("out.rs")),
            ..GeneratorConfig::default()
        };
        config.sources.push(PathBuf::from("/abs/src"));
        config.rebase(Path::new("/project"));
        assert_eq!(config.sources[0], PathBuf::from("/project/src"));
        assert_eq!(config.sources[1], PathBuf::from("/abs/src"));
        assert_eq!(config.output, Some(PathBuf::from("/project/out.rs")));
    }
}
