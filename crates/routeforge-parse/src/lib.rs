//! Source scanning and endpoint analysis for routeforge.
//!
//! This crate loads a crate's sources into a [`Compilation`], discovers
//! `#[endpoint]` types with [`find_endpoint_classes`], classifies request
//! objects with [`classify_request`] and derives the status/payload surface
//! of each endpoint with [`find_results`]. It never emits code itself.

mod binding;
mod compilation;
mod error;
mod model;
mod naming;
mod results;
mod scanner;
mod symbols;
mod template;

pub use binding::{
    BindingSource, ObjectProperty, RequestObject, ValidationMode, classify_request,
    parse_binding_args,
};
pub use compilation::{Compilation, ModulePath, SourceUnit, module_path_for};
pub use error::LoadError;
pub use model::{
    Diagnostic, Endpoint, EndpointClass, EndpointParam, HttpVerb, InstanceField, ParamBinding,
    ServiceAccess, Severity,
};
pub use naming::to_name;
pub use results::{
    PropertyType, ResponseObject, ResponseProperty, ResultSurface, ResultVariant, ReturnShape,
    find_results,
};
pub use scanner::{EndpointClasses, find_endpoint_classes, parse_route};
pub use symbols::{ImplSymbol, StructSymbol, SymbolTable, UseTarget};
pub use template::{TemplateError, template_parameters, validate_route_template};

use quote::ToTokens;
use syn::{GenericArgument, Lit, Meta, PathArguments, PathSegment, Type};

/// Extract doc comments from attributes
pub fn extract_docs(attrs: &[syn::Attribute]) -> Option<String> {
    let docs: Vec<String> = attrs
        .iter()
        .filter_map(|attr| {
            if attr.path().is_ident("doc")
                && let Meta::NameValue(meta) = &attr.meta
                && let syn::Expr::Lit(syn::ExprLit {
                    lit: Lit::Str(s), ..
                }) = &meta.value
            {
                return Some(s.value().trim().to_string());
            }
            None
        })
        .collect();

    if docs.is_empty() {
        None
    } else {
        Some(docs.join("\n"))
    }
}

/// The last path segment of a plain path type.
pub fn last_segment(ty: &Type) -> Option<&PathSegment> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => type_path.path.segments.last(),
        Type::Group(group) => last_segment(&group.elem),
        Type::Paren(paren) => last_segment(&paren.elem),
        _ => None,
    }
}

/// The first type argument of `Name<T, ..>`.
pub fn first_type_argument(segment: &PathSegment) -> Option<&Type> {
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

fn wrapped_type<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let segment = last_segment(ty)?;
    if segment.ident != wrapper {
        return None;
    }
    first_type_argument(segment)
}

/// Check if a type is `Option<T>` and extract T
pub fn extract_option_type(ty: &Type) -> Option<Type> {
    wrapped_type(ty, "Option").cloned()
}

/// Check if a type is `Option<T>`
pub fn is_option_type(ty: &Type) -> bool {
    wrapped_type(ty, "Option").is_some()
}

/// Check if a type is `Arc<T>` and extract T
pub fn extract_arc_type(ty: &Type) -> Option<Type> {
    wrapped_type(ty, "Arc").cloned()
}

/// Check if a type is `Result<T, E>` and extract T and E
///
/// Single-argument aliases such as `anyhow::Result<T>` yield `()` for E.
pub fn extract_result_types(ty: &Type) -> Option<(Type, Type)> {
    let segment = last_segment(ty)?;
    if segment.ident != "Result" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    let mut types = args.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty.clone()),
        _ => None,
    });
    let ok = types.next()?;
    let err = types.next().unwrap_or_else(|| syn::parse_quote!(()));
    Some((ok, err))
}

/// Unwrap `impl Future<Output = T>`, `BoxFuture<'_, T>` and
/// `Pin<Box<dyn Future<Output = T>>>` to T
pub fn extract_future_output(ty: &Type) -> Option<Type> {
    let bounds = match ty {
        Type::ImplTrait(impl_trait) => Some(&impl_trait.bounds),
        Type::TraitObject(object) => Some(&object.bounds),
        _ => None,
    };
    if let Some(bounds) = bounds {
        for bound in bounds {
            if let syn::TypeParamBound::Trait(trait_bound) = bound
                && let Some(segment) = trait_bound.path.segments.last()
                && segment.ident == "Future"
                && let PathArguments::AngleBracketed(args) = &segment.arguments
            {
                for arg in &args.args {
                    if let GenericArgument::AssocType(assoc) = arg
                        && assoc.ident == "Output"
                    {
                        return Some(assoc.ty.clone());
                    }
                }
            }
        }
        return None;
    }

    let segment = last_segment(ty)?;
    match segment.ident.to_string().as_str() {
        "BoxFuture" | "LocalBoxFuture" => first_type_argument(segment).cloned(),
        "Pin" | "Box" => first_type_argument(segment).and_then(extract_future_output),
        _ => None,
    }
}

/// Check if a type is ()
pub fn is_unit_type(ty: &Type) -> bool {
    if let Type::Tuple(tuple) = ty {
        return tuple.elems.is_empty();
    }
    false
}

/// Scalars bind from a single string value (route, query, header...).
pub fn is_scalar_type(ty: &Type) -> bool {
    const SCALARS: &[&str] = &[
        "String", "str", "bool", "char", "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16",
        "u32", "u64", "u128", "usize", "f32", "f64", "Uuid",
    ];
    if let Some(inner) = extract_option_type(ty) {
        return is_scalar_type(&inner);
    }
    let ty = match ty {
        Type::Reference(reference) => reference.elem.as_ref(),
        other => other,
    };
    last_segment(ty).is_some_and(|segment| {
        segment.arguments.is_empty() && SCALARS.iter().any(|name| segment.ident == name)
    })
}

/// Render a type the way it would be written by hand.
pub fn type_to_string(ty: &Type) -> String {
    tokens_to_string(ty)
}

/// Token text with the spacing `quote` inserts around punctuation removed.
pub fn tokens_to_string<T: ToTokens + ?Sized>(node: &T) -> String {
    let raw = node.to_token_stream().to_string();
    let mut text = raw
        .replace(" :: ", "::")
        .replace(" ::", "::")
        .replace(" < ", "<")
        .replace(" <", "<")
        .replace("< ", "<")
        .replace(" >", ">")
        .replace(" ,", ",")
        .replace("& ", "&")
        .replace("( ", "(")
        .replace(" )", ")")
        .replace("[ ", "[")
        .replace(" ]", "]")
        .replace(" ;", ";");
    if let Some(rest) = text.strip_prefix(":: ") {
        text = format!("::{rest}");
    }
    text
}
