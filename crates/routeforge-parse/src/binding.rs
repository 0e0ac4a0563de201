//! Classification of request objects into binding sources.

use heck::ToLowerCamelCase;
use syn::{Attribute, FnArg, Fields, ImplItem, ImplItemFn, Pat, ReturnType, Type};

use crate::compilation::{Compilation, ModulePath};
use crate::symbols::{StructSymbol, SymbolTable};
use crate::{extract_option_type, first_type_argument, is_option_type, last_segment};

/// Where a request member's value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BindingSource {
    Route,
    Query,
    Header,
    Cookie,
    Form,
    Body,
}

impl BindingSource {
    /// Marker attributes, in the order they win when several are present.
    const PRIORITY: [BindingSource; 5] = [
        BindingSource::Route,
        BindingSource::Query,
        BindingSource::Form,
        BindingSource::Header,
        BindingSource::Cookie,
    ];

    /// Runtime enum variant name.
    pub fn label(&self) -> &'static str {
        match self {
            BindingSource::Route => "Route",
            BindingSource::Query => "Query",
            BindingSource::Header => "Header",
            BindingSource::Cookie => "Cookie",
            BindingSource::Form => "Form",
            BindingSource::Body => "Body",
        }
    }

    /// Attribute that selects this source on a field.
    pub fn attribute(&self) -> &'static str {
        match self {
            BindingSource::Route => "route",
            BindingSource::Query => "query",
            BindingSource::Header => "header",
            BindingSource::Cookie => "cookie",
            BindingSource::Form => "form",
            BindingSource::Body => "body",
        }
    }
}

/// One member of a request object.
#[derive(Debug, Clone)]
pub struct ObjectProperty {
    pub name: String,
    /// Declared type, qualified so it is valid from the generated module.
    pub ty: Type,
    pub source: BindingSource,
    /// Explicit name override, e.g. `#[query("q")]`.
    pub source_name: Option<String>,
    /// Textual default, parsed at request time when the value is absent.
    pub default_value: Option<String>,
    /// Argument index in the positional constructor.
    pub position: Option<usize>,
    pub required: bool,
    pub nullable: bool,
    /// `#[serde(..)]` attributes carried onto the synthesized body field.
    pub serde_attrs: Vec<Attribute>,
}

impl ObjectProperty {
    /// Name used to look the value up in its source.
    pub fn lookup_name(&self) -> String {
        self.source_name
            .clone()
            .unwrap_or_else(|| self.name.to_lower_camel_case())
    }

    pub fn is_body(&self) -> bool {
        self.source == BindingSource::Body
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    None,
    /// Rules collected in a `RuleBuilder<T>`: required members and/or an
    /// associated hook taking `&mut RuleBuilder<Self>`.
    RuleBuilder,
    /// An associated factory returning a ready-made validator.
    Validator,
}

/// A request object and how each of its members is bound.
#[derive(Debug, Clone)]
pub struct RequestObject {
    pub name: String,
    pub full_path: String,
    pub module: ModulePath,
    /// In declaration order.
    pub properties: Vec<ObjectProperty>,
    /// Built through `fn new(..)` instead of a struct literal.
    pub positional: bool,
    /// The whole body deserializes straight into this type.
    pub whole_body: bool,
    /// Name of the synthesized body type when body and non-body members mix.
    pub body_type_name: Option<String>,
    pub validation_hook: Option<String>,
    pub validation_mode: ValidationMode,
}

impl RequestObject {
    pub fn body_properties(&self) -> impl Iterator<Item = &ObjectProperty> {
        self.properties.iter().filter(|p| p.is_body())
    }

    pub fn bound_properties(&self) -> impl Iterator<Item = &ObjectProperty> {
        self.properties.iter().filter(|p| !p.is_body())
    }

    pub fn required_properties(&self) -> impl Iterator<Item = &ObjectProperty> {
        self.properties.iter().filter(|p| p.required)
    }

    /// Whether handling a request reads the body at all.
    pub fn reads_body(&self) -> bool {
        self.whole_body || self.body_properties().next().is_some()
    }
}

/// Classify every member of a request struct.
///
/// Never fails; malformed marker attributes are logged and the member
/// falls back to the body.
pub fn classify_request(compilation: &Compilation, symbol: &StructSymbol) -> RequestObject {
    let symbols = compilation.symbols();
    let full_path = symbol.full_path();
    let tuple_like = !matches!(symbol.item.fields, Fields::Named(_));
    let whole_body = symbol.is_generic() || (tuple_like && !symbol.item.fields.is_empty());

    let mut properties = Vec::new();
    if !whole_body {
        for field in &symbol.item.fields {
            let Some(ident) = &field.ident else {
                continue;
            };
            properties.push(classify_member(symbols, symbol, ident.to_string(), field));
        }
    }

    let positional = match positional_order(symbols, symbol, &properties) {
        Some(order) => {
            for (position, name) in order.iter().enumerate() {
                if let Some(property) = properties.iter_mut().find(|p| &p.name == name) {
                    property.position = Some(position);
                }
            }
            true
        }
        None => false,
    };

    let has_body = properties.iter().any(ObjectProperty::is_body);
    let has_bound = properties.iter().any(|p| !p.is_body());
    let body_type_name = (has_body && has_bound).then(|| format!("{}Body", symbol.name));
    let whole_body = whole_body || (has_body && !has_bound);

    let (validation_mode, validation_hook) = detect_validation(symbols, symbol);
    let validation_mode = match validation_mode {
        ValidationMode::None if properties.iter().any(|p| p.required) => ValidationMode::RuleBuilder,
        mode => mode,
    };

    RequestObject {
        name: symbol.name.clone(),
        full_path,
        module: symbol.module.clone(),
        properties,
        positional,
        whole_body,
        body_type_name,
        validation_hook,
        validation_mode,
    }
}

fn classify_member(
    symbols: &SymbolTable,
    owner: &StructSymbol,
    name: String,
    field: &syn::Field,
) -> ObjectProperty {
    let mut source = None;
    let mut source_name = None;
    let mut default_value = None;

    let explicit_body = field.attrs.iter().any(|attr| attr.path().is_ident("body"));
    if !explicit_body {
        for candidate in BindingSource::PRIORITY {
            let Some(attr) = field
                .attrs
                .iter()
                .find(|attr| attr.path().is_ident(candidate.attribute()))
            else {
                continue;
            };
            match parse_binding_args(attr) {
                Ok((name, default)) => {
                    source_name = name;
                    default_value = default;
                }
                Err(err) => tracing::warn!(
                    request = %owner.full_path(),
                    member = %name,
                    error = %err,
                    "ignoring malformed binding attribute"
                ),
            }
            source = Some(candidate);
            break;
        }
    }

    let required = field.attrs.iter().any(|attr| attr.path().is_ident("required"));
    let serde_attrs = field
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("serde"))
        .cloned()
        .collect();

    ObjectProperty {
        name,
        ty: symbols.qualify_type(&owner.module, &field.ty),
        source: source.unwrap_or(BindingSource::Body),
        source_name,
        default_value,
        position: None,
        required,
        nullable: is_option_type(&field.ty),
        serde_attrs,
    }
}

/// Parse `#[query]`, `#[query("q")]`, `#[query = "q"]` and
/// `#[query(name = "q", default = 10)]`.
pub fn parse_binding_args(attr: &Attribute) -> syn::Result<(Option<String>, Option<String>)> {
    match &attr.meta {
        syn::Meta::Path(_) => Ok((None, None)),
        syn::Meta::NameValue(meta) => match &meta.value {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(lit),
                ..
            }) => Ok((Some(lit.value()), None)),
            other => Err(syn::Error::new_spanned(other, "expected a string literal name")),
        },
        syn::Meta::List(_) => {
            if let Ok(lit) = attr.parse_args::<syn::LitStr>() {
                return Ok((Some(lit.value()), None));
            }
            let mut name = None;
            let mut default_value = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    name = Some(value.value());
                    Ok(())
                } else if meta.path.is_ident("default") {
                    let value = meta.value()?;
                    let lookahead = value.lookahead1();
                    if lookahead.peek(syn::LitStr) {
                        let lit: syn::LitStr = value.parse()?;
                        default_value = Some(lit.value());
                    } else if lookahead.peek(syn::LitInt) {
                        let lit: syn::LitInt = value.parse()?;
                        default_value = Some(lit.base10_digits().to_string());
                    } else if lookahead.peek(syn::LitFloat) {
                        let lit: syn::LitFloat = value.parse()?;
                        default_value = Some(lit.base10_digits().to_string());
                    } else if lookahead.peek(syn::LitBool) {
                        let lit: syn::LitBool = value.parse()?;
                        default_value = Some(lit.value.to_string());
                    } else if lookahead.peek(syn::Token![-]) {
                        let expr: syn::ExprUnary = value.parse()?;
                        default_value = Some(crate::tokens_to_string(&expr).replace("- ", "-"));
                    } else {
                        return Err(lookahead.error());
                    }
                    Ok(())
                } else {
                    Err(meta.error(
                        "unknown binding argument\n\
                         \n\
                         Valid arguments: name, default\n\
                         \n\
                         Examples:\n\
                         - #[query(\"q\")]\n\
                         - #[query(name = \"q\", default = 10)]\n\
                         - #[header(\"X-Api-Key\")]",
                    ))
                }
            })?;
            Ok((name, default_value))
        }
    }
}

/// Member names in constructor order, when the struct has an associated
/// `fn new(..) -> Self` whose parameters are exactly its members.
fn positional_order(
    symbols: &SymbolTable,
    symbol: &StructSymbol,
    properties: &[ObjectProperty],
) -> Option<Vec<String>> {
    if properties.is_empty() {
        return None;
    }
    symbols
        .inherent_impls(symbol)
        .flat_map(|imp| imp.item.items.iter())
        .filter_map(|item| match item {
            ImplItem::Fn(method) if method.sig.ident == "new" => Some(method),
            _ => None,
        })
        .find_map(|method| constructor_order(method, symbol, properties))
}

fn constructor_order(
    method: &ImplItemFn,
    symbol: &StructSymbol,
    properties: &[ObjectProperty],
) -> Option<Vec<String>> {
    if method.sig.receiver().is_some() || !returns_self(&method.sig.output, &symbol.name) {
        return None;
    }
    let names: Vec<String> = method
        .sig
        .inputs
        .iter()
        .map(|input| match input {
            FnArg::Typed(pat_type) => match pat_type.pat.as_ref() {
                Pat::Ident(pat) => Some(pat.ident.to_string()),
                _ => None,
            },
            FnArg::Receiver(_) => None,
        })
        .collect::<Option<_>>()?;
    let matches = names.len() == properties.len()
        && properties.iter().all(|p| names.contains(&p.name));
    matches.then_some(names)
}

fn returns_self(output: &ReturnType, name: &str) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    last_segment(ty).is_some_and(|segment| segment.ident == "Self" || segment.ident == name)
}

/// Find how the request validates itself.
///
/// An associated function taking `&mut RuleBuilder<Self>` wins over one that
/// returns a validator; the latter may return `impl Validator<Self>`,
/// `Box<dyn Validator<Self>>` or a crate type implementing `Validator<Self>`.
/// Hooks over any other type are ignored.
fn detect_validation(symbols: &SymbolTable, symbol: &StructSymbol) -> (ValidationMode, Option<String>) {
    let methods: Vec<(&ModulePath, &ImplItemFn)> = symbols
        .inherent_impls(symbol)
        .flat_map(|imp| {
            imp.item.items.iter().filter_map(move |item| match item {
                ImplItem::Fn(method) if method.sig.receiver().is_none() => Some((&imp.module, method)),
                _ => None,
            })
        })
        .collect();

    if let Some((_, method)) = methods
        .iter()
        .find(|(module, method)| takes_rule_builder(symbols, module, method, symbol))
    {
        return (ValidationMode::RuleBuilder, Some(method.sig.ident.to_string()));
    }
    let factory = methods.iter().find(|(module, method)| {
        method.sig.inputs.is_empty() && returns_validator(symbols, module, &method.sig.output, symbol)
    });
    match factory {
        Some((_, method)) => (ValidationMode::Validator, Some(method.sig.ident.to_string())),
        None => (ValidationMode::None, None),
    }
}

/// Whether `ty`, written in `module`, names the request type itself.
fn is_request_type(symbols: &SymbolTable, module: &ModulePath, ty: &Type, target: &StructSymbol) -> bool {
    if let Some(segment) = last_segment(ty)
        && segment.ident == "Self"
    {
        return true;
    }
    symbols
        .resolve_type(module, ty)
        .is_some_and(|resolved| resolved.key() == target.key())
}

fn takes_rule_builder(
    symbols: &SymbolTable,
    module: &ModulePath,
    method: &ImplItemFn,
    target: &StructSymbol,
) -> bool {
    if method.sig.inputs.len() != 1 {
        return false;
    }
    method.sig.inputs.iter().any(|input| match input {
        FnArg::Typed(pat_type) => match pat_type.ty.as_ref() {
            Type::Reference(reference) if reference.mutability.is_some() => {
                last_segment(&reference.elem).is_some_and(|segment| {
                    segment.ident == "RuleBuilder"
                        && first_type_argument(segment)
                            .is_some_and(|ty| is_request_type(symbols, module, ty, target))
                })
            }
            _ => false,
        },
        FnArg::Receiver(_) => false,
    })
}

fn returns_validator(
    symbols: &SymbolTable,
    module: &ModulePath,
    output: &ReturnType,
    target: &StructSymbol,
) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    let ty = ty.as_ref();
    let validates_target = |bound: &syn::TypeParamBound| is_validator_bound(symbols, module, bound, target);
    if let Type::ImplTrait(impl_trait) = ty {
        return impl_trait.bounds.iter().any(validates_target);
    }
    if let Some(segment) = last_segment(ty)
        && (segment.ident == "Box" || segment.ident == "Arc")
        && let Some(Type::TraitObject(object)) = first_type_argument(segment)
    {
        return object.bounds.iter().any(validates_target);
    }
    let ty = extract_option_type(ty).unwrap_or_else(|| ty.clone());
    symbols
        .resolve_type(module, &ty)
        .is_some_and(|implementor| symbols.implements_validator_for(implementor, target))
}

/// `Validator<T>` where T is the request type.
fn is_validator_bound(
    symbols: &SymbolTable,
    module: &ModulePath,
    bound: &syn::TypeParamBound,
    target: &StructSymbol,
) -> bool {
    let syn::TypeParamBound::Trait(trait_bound) = bound else {
        return false;
    };
    trait_bound.path.segments.last().is_some_and(|segment| {
        segment.ident == "Validator"
            && first_type_argument(segment).is_some_and(|ty| is_request_type(symbols, module, ty, target))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(source: &str, name: &str) -> RequestObject {
        let compilation = Compilation::from_sources([("lib.rs", source)]).expect("parses");
        let symbol = compilation
            .symbols()
            .get(&format!("crate::{name}"))
            .expect("declared");
        classify_request(&compilation, symbol)
    }

    #[test]
    fn test_sources_and_lookup_names() {
        let object = request(
            r#"
            pub struct Search {
                #[route] pub tenant_id: u32,
                #[query("q")] pub term: String,
                #[query(name = "page_size", default = 20)] pub limit: u32,
                #[header("X-Trace-Id")] pub trace: Option<String>,
                #[cookie] pub session_token: Option<String>,
                #[form] pub note: Option<String>,
                pub filters: Vec<String>,
            }
            "#,
            "Search",
        );
        let summary: Vec<_> = object
            .properties
            .iter()
            .map(|p| (p.name.as_str(), p.source, p.lookup_name()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("tenant_id", BindingSource::Route, "tenantId".to_string()),
                ("term", BindingSource::Query, "q".to_string()),
                ("limit", BindingSource::Query, "page_size".to_string()),
                ("trace", BindingSource::Header, "X-Trace-Id".to_string()),
                ("session_token", BindingSource::Cookie, "sessionToken".to_string()),
                ("note", BindingSource::Form, "note".to_string()),
                ("filters", BindingSource::Body, "filters".to_string()),
            ]
        );
        assert_eq!(object.properties[2].default_value.as_deref(), Some("20"));
        assert!(object.properties[3].nullable);
        assert_eq!(object.body_type_name.as_deref(), Some("SearchBody"));
        assert!(!object.whole_body);
        assert_eq!(object.validation_mode, ValidationMode::None);
    }

    #[test]
    fn test_priority_and_explicit_body() {
        let object = request(
            r#"
            pub struct Mixed {
                #[header] #[query] pub a: String,
                #[cookie] #[form] pub b: String,
                #[body] #[route] pub c: String,
            }
            "#,
            "Mixed",
        );
        let sources: Vec<_> = object.properties.iter().map(|p| p.source).collect();
        assert_eq!(
            sources,
            vec![BindingSource::Query, BindingSource::Form, BindingSource::Body]
        );
    }

    #[test]
    fn test_all_body_members() {
        let object = request("pub struct Create { pub name: String, pub email: String }", "Create");
        assert!(object.whole_body);
        assert!(object.body_type_name.is_none());
        assert!(object.reads_body());
    }

    #[test]
    fn test_tuple_and_generic_structs_are_whole_body() {
        let object = request("pub struct Ids(pub Vec<u32>);", "Ids");
        assert!(object.whole_body);
        assert!(object.properties.is_empty());

        let object = request("pub struct Page<T> { #[query] pub items: Vec<T> }", "Page");
        assert!(object.whole_body);

        let object = request("pub struct Ping;", "Ping");
        assert!(!object.whole_body);
        assert!(!object.reads_body());
    }

    #[test]
    fn test_positional_constructor() {
        let object = request(
            r#"
            pub struct Move { #[route] pub id: u32, #[query] pub to: String }
            impl Move {
                pub fn new(to: String, id: u32) -> Self { Self { id, to } }
            }
            "#,
            "Move",
        );
        assert!(object.positional);
        assert_eq!(object.properties[0].position, Some(1));
        assert_eq!(object.properties[1].position, Some(0));

        let object = request(
            r#"
            pub struct Named { #[route] pub id: u32, #[query] pub to: String }
            impl Named {
                pub fn new(id: u32) -> Self { Self { id, to: String::new() } }
            }
            "#,
            "Named",
        );
        assert!(!object.positional);
    }

    #[test]
    fn test_required_members_use_rule_builder() {
        let object = request(
            "pub struct Signup { #[required] pub email: Option<String>, pub name: String }",
            "Signup",
        );
        assert_eq!(object.validation_mode, ValidationMode::RuleBuilder);
        assert!(object.validation_hook.is_none());
        assert_eq!(object.required_properties().count(), 1);
    }

    #[test]
    fn test_rule_builder_hook_wins_over_validator() {
        let object = request(
            r#"
            pub struct Signup { pub email: String }
            impl Signup {
                fn validator() -> impl Validator<Signup> { todo!() }
                fn rules(rules: &mut RuleBuilder<Self>) {}
            }
            "#,
            "Signup",
        );
        assert_eq!(object.validation_mode, ValidationMode::RuleBuilder);
        assert_eq!(object.validation_hook.as_deref(), Some("rules"));
    }

    #[test]
    fn test_validator_factories() {
        let object = request(
            r#"
            pub struct A { pub x: u32 }
            impl A { fn checker() -> Box<dyn Validator<A> + Send + Sync> { todo!() } }
            "#,
            "A",
        );
        assert_eq!(object.validation_mode, ValidationMode::Validator);
        assert_eq!(object.validation_hook.as_deref(), Some("checker"));

        let object = request(
            r#"
            pub struct B { pub x: u32 }
            pub struct BCheck;
            impl routeforge::Validator<B> for BCheck {}
            impl B { fn validator() -> BCheck { BCheck } }
            "#,
            "B",
        );
        assert_eq!(object.validation_mode, ValidationMode::Validator);

        let object = request(
            r#"
            pub struct C { pub x: u32 }
            impl C { fn make() -> String { String::new() } }
            "#,
            "C",
        );
        assert_eq!(object.validation_mode, ValidationMode::None);
    }

    #[test]
    fn test_hooks_over_other_types_are_ignored() {
        let object = request(
            r#"
            pub struct Req { pub x: u32 }
            pub struct Other { pub y: u32 }
            impl Req {
                fn helper(rules: &mut RuleBuilder<Other>) {}
                fn make() -> impl Validator<Other> { todo!() }
                fn boxed() -> Box<dyn Validator<Other>> { todo!() }
            }
            "#,
            "Req",
        );
        assert_eq!(object.validation_mode, ValidationMode::None);
        assert!(object.validation_hook.is_none());

        let object = request(
            r#"
            pub struct Req { pub x: u32 }
            pub struct Other { pub y: u32 }
            impl Req {
                fn helper(rules: &mut RuleBuilder<Other>) {}
                fn rules(rules: &mut RuleBuilder<Req>) {}
            }
            "#,
            "Req",
        );
        assert_eq!(object.validation_mode, ValidationMode::RuleBuilder);
        assert_eq!(object.validation_hook.as_deref(), Some("rules"));
    }
}
