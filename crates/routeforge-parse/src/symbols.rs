//! Declared structs, their impls, and `use` resolution per module.

use std::collections::{BTreeMap, BTreeSet};

use syn::visit_mut::{self, VisitMut};
use syn::{Attribute, Item, ItemImpl, ItemStruct, ItemUse, Path, PathArguments, Type, UseTree};

use crate::compilation::{ModulePath, SourceUnit};

/// A struct declared somewhere in the crate.
#[derive(Debug, Clone)]
pub struct StructSymbol {
    pub name: String,
    pub module: ModulePath,
    pub item: ItemStruct,
}

impl StructSymbol {
    /// `crate::module::Name`
    pub fn full_path(&self) -> String {
        self.module.qualify(&self.name)
    }

    pub fn is_generic(&self) -> bool {
        !self.item.generics.params.is_empty()
    }

    pub(crate) fn key(&self) -> String {
        key_of(self.module.segments(), &self.name)
    }
}

/// An `impl` block whose self type resolved to a crate struct.
#[derive(Debug, Clone)]
pub struct ImplSymbol {
    pub module: ModulePath,
    pub item: ItemImpl,
}

impl ImplSymbol {
    /// The implemented trait, for trait impls.
    pub fn trait_path(&self) -> Option<&Path> {
        self.item.trait_.as_ref().map(|(_, path, _)| path)
    }
}

/// A single `use` binding before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
struct UseBinding {
    segments: Vec<String>,
    absolute: bool,
}

/// Where a `use` binding points after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseTarget {
    /// Inside this crate, relative to the crate root.
    Local(Vec<String>),
    /// Another crate.
    External(Vec<String>),
}

#[derive(Debug, Clone, Default)]
struct UseMap {
    names: BTreeMap<String, UseBinding>,
    globs: Vec<UseBinding>,
}

#[derive(Debug, Default)]
pub struct SymbolTable {
    structs: Vec<StructSymbol>,
    by_key: BTreeMap<String, usize>,
    by_name: BTreeMap<String, Vec<usize>>,
    impls: BTreeMap<String, Vec<ImplSymbol>>,
    uses: BTreeMap<ModulePath, UseMap>,
    modules: BTreeSet<ModulePath>,
}

impl SymbolTable {
    pub(crate) fn build(units: &[SourceUnit]) -> Self {
        let mut table = Self::default();
        let mut pending = Vec::new();
        for unit in units {
            table.modules.insert(unit.module.clone());
            table.collect(&unit.file.items, &unit.module, &mut pending);
        }
        for (module, item) in pending {
            let key = match item.self_ty.as_ref() {
                Type::Path(type_path) if type_path.qself.is_none() => table
                    .resolve_struct(&module, &type_path.path)
                    .map(StructSymbol::key),
                _ => None,
            };
            if let Some(key) = key {
                table.impls.entry(key).or_default().push(ImplSymbol { module, item });
            }
        }
        table
    }

    fn collect(&mut self, items: &[Item], module: &ModulePath, pending: &mut Vec<(ModulePath, ItemImpl)>) {
        for item in items {
            match item {
                Item::Struct(item) => {
                    let symbol = StructSymbol {
                        name: item.ident.to_string(),
                        module: module.clone(),
                        item: item.clone(),
                    };
                    let index = self.structs.len();
                    self.by_key.insert(symbol.key(), index);
                    self.by_name.entry(symbol.name.clone()).or_default().push(index);
                    self.structs.push(symbol);
                }
                Item::Impl(item) => pending.push((module.clone(), item.clone())),
                Item::Use(item) => self.collect_use(item, module),
                Item::Mod(item) if !is_test_only(&item.attrs) => {
                    let child = module.child(item.ident.to_string());
                    self.modules.insert(child.clone());
                    if let Some((_, items)) = &item.content {
                        self.collect(items, &child, pending);
                    }
                }
                _ => {}
            }
        }
    }

    fn collect_use(&mut self, item: &ItemUse, module: &ModulePath) {
        let map = self.uses.entry(module.clone()).or_default();
        collect_use_tree(&item.tree, Vec::new(), item.leading_colon.is_some(), map);
    }

    /// Every struct, in declaration order.
    pub fn structs(&self) -> std::slice::Iter<'_, StructSymbol> {
        self.structs.iter()
    }

    /// Look up a struct by its full path (`crate::a::Name`).
    pub fn get(&self, full_path: &str) -> Option<&StructSymbol> {
        let key = full_path.strip_prefix("crate::").unwrap_or(full_path);
        self.by_key.get(key).map(|&index| &self.structs[index])
    }

    pub fn impls_of<'a>(
        &'a self,
        symbol: &StructSymbol,
    ) -> impl Iterator<Item = &'a ImplSymbol> + use<'a> {
        self.impls.get(&symbol.key()).into_iter().flatten()
    }

    /// Inherent impl blocks of a struct.
    pub fn inherent_impls<'a>(
        &'a self,
        symbol: &StructSymbol,
    ) -> impl Iterator<Item = &'a ImplSymbol> + use<'a> {
        self.impls_of(symbol).filter(|imp| imp.item.trait_.is_none())
    }

    /// Resolve a type as written in `module` to a crate struct.
    pub fn resolve_type(&self, module: &ModulePath, ty: &Type) -> Option<&StructSymbol> {
        match ty {
            Type::Path(type_path) if type_path.qself.is_none() => {
                self.resolve_struct(module, &type_path.path)
            }
            Type::Paren(inner) => self.resolve_type(module, &inner.elem),
            Type::Group(inner) => self.resolve_type(module, &inner.elem),
            _ => None,
        }
    }

    /// Resolve a path as written in `module` to a crate struct.
    ///
    /// Tries, in order: `crate`/`self`/`super` prefixes, `use` bindings of
    /// the module, glob imports, items of the module itself, then a unique
    /// struct of that name anywhere in the crate.
    pub fn resolve_struct(&self, module: &ModulePath, path: &Path) -> Option<&StructSymbol> {
        if path.leading_colon.is_some() {
            return None;
        }
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        for candidate in self.candidates(module, &segments) {
            if let Some(&index) = self.by_key.get(&candidate.join("::")) {
                return Some(&self.structs[index]);
            }
        }
        if let [name] = segments.as_slice()
            && let Some(indices) = self.by_name.get(name)
            && let [index] = indices.as_slice()
        {
            return Some(&self.structs[*index]);
        }
        None
    }

    fn candidates(&self, module: &ModulePath, segments: &[String]) -> Vec<Vec<String>> {
        let mut candidates = Vec::new();
        let Some((first, rest)) = segments.split_first() else {
            return candidates;
        };

        if matches!(first.as_str(), "crate" | "self" | "super") {
            if let Some(UseTarget::Local(path)) = self.normalize(module, segments, false) {
                candidates.push(path);
            }
            return candidates;
        }

        let uses = self.uses.get(module);
        if let Some(binding) = uses.and_then(|map| map.names.get(first))
            && let Some(UseTarget::Local(mut path)) =
                self.normalize(module, &binding.segments, binding.absolute)
        {
            path.extend(rest.iter().cloned());
            candidates.push(path);
        }
        if rest.is_empty() {
            for glob in uses.map(|map| map.globs.as_slice()).unwrap_or_default() {
                if let Some(UseTarget::Local(mut path)) =
                    self.normalize(module, &glob.segments, glob.absolute)
                {
                    path.push(first.clone());
                    candidates.push(path);
                }
            }
        }

        let mut local = module.segments().to_vec();
        local.extend(segments.iter().cloned());
        candidates.push(local);
        if !module.is_root() {
            candidates.push(segments.to_vec());
        }
        candidates
    }

    /// Normalize a `use`-style path written in `module`.
    pub fn normalize(&self, module: &ModulePath, segments: &[String], absolute: bool) -> Option<UseTarget> {
        let (first, rest) = segments.split_first()?;
        if absolute {
            return Some(UseTarget::External(segments.to_vec()));
        }
        match first.as_str() {
            "crate" => Some(UseTarget::Local(rest.to_vec())),
            "self" => {
                let mut path = module.segments().to_vec();
                path.extend(rest.iter().cloned());
                Some(UseTarget::Local(path))
            }
            "super" => {
                let mut base = module.parent()?;
                let mut rest = rest;
                while let Some((next, tail)) = rest.split_first()
                    && next == "super"
                {
                    base = base.parent()?;
                    rest = tail;
                }
                let mut path = base.segments().to_vec();
                path.extend(rest.iter().cloned());
                Some(UseTarget::Local(path))
            }
            _ if self.modules.contains(&module.child(first.clone())) => {
                let mut path = module.segments().to_vec();
                path.extend(segments.iter().cloned());
                Some(UseTarget::Local(path))
            }
            _ => Some(UseTarget::External(segments.to_vec())),
        }
    }

    /// Rewrite every path in `ty` so it is valid from any module.
    ///
    /// Crate structs become `crate::..` paths and imported names are
    /// expanded through the `use` bindings of `module`. Anything else (std
    /// prelude types, primitives, generic parameters) is left untouched.
    pub fn qualify_type(&self, module: &ModulePath, ty: &Type) -> Type {
        let mut ty = ty.clone();
        Qualifier { table: self, module }.visit_type_mut(&mut ty);
        ty
    }

    fn qualify_path(&self, module: &ModulePath, path: &Path) -> Option<Path> {
        if path.leading_colon.is_some() {
            return None;
        }
        let arguments = path.segments.last().map(|s| s.arguments.clone());
        let text = if let Some(symbol) = self.resolve_struct(module, path) {
            symbol.full_path()
        } else {
            let first = path.segments.first()?.ident.to_string();
            let binding = self.uses.get(module)?.names.get(&first)?;
            let rest = path.segments.iter().skip(1).map(|s| s.ident.to_string());
            match self.normalize(module, &binding.segments, binding.absolute)? {
                UseTarget::Local(mut segments) => {
                    segments.extend(rest);
                    format!("crate::{}", segments.join("::"))
                }
                UseTarget::External(mut segments) => {
                    segments.extend(rest);
                    format!("::{}", segments.join("::"))
                }
            }
        };
        let mut qualified: Path = syn::parse_str(&text).ok()?;
        if let (Some(last), Some(arguments)) = (qualified.segments.last_mut(), arguments) {
            last.arguments = arguments;
        }
        Some(qualified)
    }

    /// Whether `implementor` has an `impl Validator<target> for implementor`.
    pub fn implements_validator_for(&self, implementor: &StructSymbol, target: &StructSymbol) -> bool {
        self.impls_of(implementor).any(|imp| {
            let Some(trait_path) = imp.trait_path() else {
                return false;
            };
            let Some(segment) = trait_path.segments.last() else {
                return false;
            };
            if segment.ident != "Validator" {
                return false;
            }
            let PathArguments::AngleBracketed(args) = &segment.arguments else {
                return false;
            };
            args.args.iter().any(|arg| match arg {
                syn::GenericArgument::Type(ty) => self
                    .resolve_type(&imp.module, ty)
                    .is_some_and(|resolved| resolved.key() == target.key()),
                _ => false,
            })
        })
    }
}

struct Qualifier<'a> {
    table: &'a SymbolTable,
    module: &'a ModulePath,
}

impl VisitMut for Qualifier<'_> {
    fn visit_type_path_mut(&mut self, node: &mut syn::TypePath) {
        if node.qself.is_none()
            && !node.path.is_ident("Self")
            && let Some(path) = self.table.qualify_path(self.module, &node.path)
        {
            node.path = path;
        }
        visit_mut::visit_type_path_mut(self, node);
    }
}

fn collect_use_tree(tree: &UseTree, mut prefix: Vec<String>, absolute: bool, map: &mut UseMap) {
    match tree {
        UseTree::Path(path) => {
            prefix.push(path.ident.to_string());
            collect_use_tree(&path.tree, prefix, absolute, map);
        }
        UseTree::Name(name) => {
            let ident = name.ident.to_string();
            if ident == "self" {
                if let Some(last) = prefix.last().cloned() {
                    map.names.insert(last, UseBinding { segments: prefix, absolute });
                }
            } else {
                prefix.push(ident.clone());
                map.names.insert(ident, UseBinding { segments: prefix, absolute });
            }
        }
        UseTree::Rename(rename) => {
            let ident = rename.ident.to_string();
            if ident != "self" {
                prefix.push(ident);
            }
            let alias = rename.rename.to_string();
            if alias != "_" {
                map.names.insert(alias, UseBinding { segments: prefix, absolute });
            }
        }
        UseTree::Glob(_) => map.globs.push(UseBinding { segments: prefix, absolute }),
        UseTree::Group(group) => {
            for item in &group.items {
                collect_use_tree(item, prefix.clone(), absolute, map);
            }
        }
    }
}

fn key_of(module: &[String], name: &str) -> String {
    let mut key = module.join("::");
    if !key.is_empty() {
        key.push_str("::");
    }
    key.push_str(name);
    key
}

/// `#[cfg(test)]` modules never reach the generated unit.
pub(crate) fn is_test_only(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|attr| {
        attr.path().is_ident("cfg")
            && attr
                .parse_args::<syn::Ident>()
                .is_ok_and(|ident| ident == "test")
    })
}

#[cfg(test)]
mod tests {
    use quote::ToTokens;

    use super::*;
    use crate::compilation::Compilation;

    fn compile(sources: &[(&str, &str)]) -> Compilation {
        Compilation::from_sources(sources.iter().copied()).expect("sources parse")
    }

    fn path(text: &str) -> Path {
        syn::parse_str(text).expect("valid path")
    }

    fn module(segments: &[&str]) -> ModulePath {
        ModulePath::from_segments(segments.iter().copied())
    }

    #[test]
    fn test_resolves_through_use_and_modules() {
        let compilation = compile(&[
            ("lib.rs", "mod models; mod api; pub struct Root;"),
            ("models/mod.rs", "pub mod users; pub use users::User as Account;"),
            ("models/users.rs", "pub struct User { pub id: u32 }"),
            ("api.rs", "use crate::models::users::User; use super::models::*;"),
        ]);
        let symbols = compilation.symbols();

        let user = symbols.resolve_struct(&module(&["api"]), &path("User"));
        assert_eq!(user.map(|s| s.full_path()).as_deref(), Some("crate::models::users::User"));

        let alias = symbols.resolve_struct(&module(&["models"]), &path("Account"));
        assert_eq!(alias.map(|s| s.name.as_str()), Some("User"));

        let root = symbols.resolve_struct(&module(&["api"]), &path("crate::Root"));
        assert_eq!(root.map(|s| s.full_path()).as_deref(), Some("crate::Root"));

        let relative = symbols.resolve_struct(&ModulePath::root(), &path("models::users::User"));
        assert!(relative.is_some());
    }

    #[test]
    fn test_ambiguous_names_need_imports() {
        let compilation = compile(&[
            ("lib.rs", "mod a; mod b;"),
            ("a.rs", "pub struct Item;"),
            ("b.rs", "pub struct Item;"),
        ]);
        let symbols = compilation.symbols();
        assert!(symbols.resolve_struct(&ModulePath::root(), &path("Item")).is_none());
        let local = symbols.resolve_struct(&module(&["b"]), &path("Item"));
        assert_eq!(local.map(|s| s.full_path()).as_deref(), Some("crate::b::Item"));
    }

    #[test]
    fn test_impls_are_attached_to_their_struct() {
        let compilation = compile(&[
            ("lib.rs", "mod api; pub struct Thing; impl Thing { fn new() -> Self { Thing } }"),
            ("api.rs", "use crate::Thing; impl Thing { fn extra(&self) {} } impl Clone for Thing { fn clone(&self) -> Self { Thing } }"),
        ]);
        let symbols = compilation.symbols();
        let thing = symbols.get("crate::Thing").expect("declared");
        assert_eq!(symbols.impls_of(thing).count(), 3);
        assert_eq!(symbols.inherent_impls(thing).count(), 2);
    }

    #[test]
    fn test_skips_test_modules() {
        let compilation = compile(&[(
            "lib.rs",
            "pub struct Real; #[cfg(test)] mod tests { pub struct Fake; }",
        )]);
        let names: Vec<_> = compilation.symbols().structs().map(|s| s.name.clone()).collect();
        assert_eq!(names, vec!["Real"]);
    }

    #[test]
    fn test_qualify_type() {
        let compilation = compile(&[
            ("lib.rs", "mod repo; mod api;"),
            ("repo.rs", "pub struct Repo;"),
            ("api.rs", "use std::collections::HashMap; use crate::repo::Repo; use serde_json::Value;"),
        ]);
        let symbols = compilation.symbols();
        let ty: Type = syn::parse_str("Arc<Repo>").expect("type");
        let qualified = symbols.qualify_type(&module(&["api"]), &ty);
        assert_eq!(
            qualified.to_token_stream().to_string(),
            "Arc < crate :: repo :: Repo >"
        );

        let ty: Type = syn::parse_str("HashMap<String, Option<Value>>").expect("type");
        let qualified = symbols.qualify_type(&module(&["api"]), &ty);
        assert_eq!(
            qualified.to_token_stream().to_string(),
            ":: std :: collections :: HashMap < String , Option < :: serde_json :: Value > >"
        );
    }

    #[test]
    fn test_validator_impl_detection() {
        let compilation = compile(&[(
            "lib.rs",
            "pub struct Req; pub struct Other; pub struct Check;
             impl routeforge::Validator<Req> for Check {}",
        )]);
        let symbols = compilation.symbols();
        let check = symbols.get("crate::Check").expect("declared");
        let req = symbols.get("crate::Req").expect("declared");
        let other = symbols.get("crate::Other").expect("declared");
        assert!(symbols.implements_validator_for(check, req));
        assert!(!symbols.implements_validator_for(check, other));
    }
}
