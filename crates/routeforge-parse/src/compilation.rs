//! Parsed view of a crate's sources.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::error::LoadError;
use crate::symbols::SymbolTable;

/// Module path relative to the crate root (`crate::a::b` is `["a", "b"]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath(Vec<String>);

impl ModulePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.0.split_last()?;
        Some(Self(rest.to_vec()))
    }

    /// `crate::a::b::name`
    pub fn qualify(&self, name: &str) -> String {
        let mut path = self.to_string();
        path.push_str("::");
        path.push_str(name);
        path
    }
}

impl fmt::Display for ModulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("crate")?;
        for segment in &self.0 {
            write!(f, "::{segment}")?;
        }
        Ok(())
    }
}

/// One parsed source file.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub path: PathBuf,
    pub module: ModulePath,
    pub file: syn::File,
}

/// Every source file of the consuming crate, parsed, plus the symbols
/// declared in them.
#[derive(Debug)]
pub struct Compilation {
    units: Vec<SourceUnit>,
    symbols: SymbolTable,
}

impl Compilation {
    /// Parse every `.rs` file below the given source roots.
    ///
    /// Each root is treated as a crate `src/` directory. Binary targets under
    /// `src/bin` are skipped.
    pub fn load<P: AsRef<Path>>(roots: &[P]) -> Result<Self, LoadError> {
        let mut units = Vec::new();
        for root in roots {
            let root = root.as_ref();
            let walker = WalkDir::new(root).sort_by_file_name();
            for entry in walker {
                let entry = entry.map_err(|source| LoadError::Walk {
                    path: root.to_path_buf(),
                    source,
                })?;
                let path = entry.path();
                if !entry.file_type().is_file()
                    || path.extension().is_none_or(|ext| ext != "rs")
                {
                    continue;
                }
                let Ok(relative) = path.strip_prefix(root) else {
                    continue;
                };
                let Some(module) = module_path_for(relative) else {
                    tracing::debug!(file = %path.display(), "skipping file outside the module tree");
                    continue;
                };
                let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                units.push(parse_unit(path.to_path_buf(), module, &text)?);
            }
        }
        tracing::debug!(files = units.len(), "loaded sources");
        Ok(Self::from_units(units))
    }

    /// Build a compilation from in-memory sources keyed by their path
    /// relative to `src/`.
    pub fn from_sources<I, P, S>(sources: I) -> Result<Self, LoadError>
    where
        I: IntoIterator<Item = (P, S)>,
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let mut units = Vec::new();
        for (path, text) in sources {
            let path = path.as_ref();
            let Some(module) = module_path_for(path) else {
                continue;
            };
            units.push(parse_unit(path.to_path_buf(), module, text.as_ref())?);
        }
        units.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(Self::from_units(units))
    }

    fn from_units(units: Vec<SourceUnit>) -> Self {
        let symbols = SymbolTable::build(&units);
        Self { units, symbols }
    }

    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Paths of every file that contributed to this compilation.
    pub fn input_paths(&self) -> impl Iterator<Item = &Path> {
        self.units.iter().map(|unit| unit.path.as_path())
    }
}

fn parse_unit(path: PathBuf, module: ModulePath, text: &str) -> Result<SourceUnit, LoadError> {
    let file = syn::parse_file(text).map_err(|source| LoadError::Syntax {
        path: path.clone(),
        source,
    })?;
    Ok(SourceUnit { path, module, file })
}

/// Map a path relative to `src/` onto the module it declares.
///
/// `lib.rs` and `main.rs` are the crate root, `a.rs` and `a/mod.rs` are
/// `crate::a`, `a/b.rs` is `crate::a::b`. Returns `None` for binary targets
/// and for file names that are not identifiers.
pub fn module_path_for(relative: &Path) -> Option<ModulePath> {
    let mut segments: Vec<String> = relative
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str().map(str::to_string),
            _ => None,
        })
        .collect::<Option<_>>()?;

    let file = segments.pop()?;
    let stem = file.strip_suffix(".rs")?;

    if segments.first().is_some_and(|first| first == "bin") {
        return None;
    }
    match stem {
        "mod" => {}
        "lib" | "main" if segments.is_empty() => {}
        _ => segments.push(stem.to_string()),
    }

    if !segments.iter().all(|segment| is_identifier(segment)) {
        return None;
    }
    Some(ModulePath(segments))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(path: &str) -> Option<String> {
        module_path_for(Path::new(path)).map(|m| m.to_string())
    }

    #[test]
    fn test_module_paths() {
        assert_eq!(module("lib.rs").as_deref(), Some("crate"));
        assert_eq!(module("main.rs").as_deref(), Some("crate"));
        assert_eq!(module("users.rs").as_deref(), Some("crate::users"));
        assert_eq!(module("users/mod.rs").as_deref(), Some("crate::users"));
        assert_eq!(module("users/admin.rs").as_deref(), Some("crate::users::admin"));
        assert_eq!(module("users/lib.rs").as_deref(), Some("crate::users::lib"));
    }

    #[test]
    fn test_skips_binaries_and_non_identifiers() {
        assert_eq!(module("bin/tool.rs"), None);
        assert_eq!(module("my-file.rs"), None);
        assert_eq!(module("notes.txt"), None);
    }

    #[test]
    fn test_from_sources_reports_syntax_errors() {
        let result = Compilation::from_sources([("lib.rs", "struct {")]);
        assert!(matches!(result, Err(LoadError::Syntax { .. })));
    }

    #[test]
    fn test_module_path_helpers() {
        let path = ModulePath::from_segments(["a", "b"]);
        assert_eq!(path.qualify("Item"), "crate::a::b::Item");
        assert_eq!(path.parent(), Some(ModulePath::from_segments(["a"])));
        assert_eq!(ModulePath::root().parent(), None);
        assert_eq!(ModulePath::root().child("x").to_string(), "crate::x");
    }
}
