//! Discovery of endpoint types and their verb methods.

use heck::ToSnakeCase;
use syn::{Attribute, FnArg, ImplItem, ImplItemFn, LitStr, Pat, ReturnType, Type};

use crate::compilation::{Compilation, ModulePath};
use crate::model::{
    Diagnostic, Endpoint, EndpointClass, EndpointParam, HttpVerb, InstanceField, ParamBinding,
    ServiceAccess,
};
use crate::results::is_result_type;
use crate::symbols::{ImplSymbol, StructSymbol, SymbolTable};
use crate::template::{template_parameters, validate_route_template};
use crate::{
    extract_arc_type, extract_docs, extract_future_output, is_scalar_type, is_unit_type,
    last_segment,
};

/// Lazily yields every struct carrying the `marker` attribute.
///
/// Types whose attribute cannot be read, or whose route template is
/// invalid, are yielded as an error diagnostic and produce no endpoints.
pub fn find_endpoint_classes<'a>(compilation: &'a Compilation, marker: &'a str) -> EndpointClasses<'a> {
    EndpointClasses {
        compilation,
        marker,
        structs: compilation.symbols().structs(),
    }
}

pub struct EndpointClasses<'a> {
    compilation: &'a Compilation,
    marker: &'a str,
    structs: std::slice::Iter<'a, StructSymbol>,
}

impl Iterator for EndpointClasses<'_> {
    type Item = Result<EndpointClass, Diagnostic>;

    fn next(&mut self) -> Option<Self::Item> {
        for symbol in self.structs.by_ref() {
            if let Some(attr) = marker_attribute(&symbol.item.attrs, self.marker) {
                return Some(scan_class(self.compilation.symbols(), symbol, attr, self.marker));
            }
        }
        None
    }
}

fn marker_attribute<'a>(attrs: &'a [Attribute], marker: &str) -> Option<&'a Attribute> {
    attrs.iter().find(|attr| {
        attr.path()
            .segments
            .last()
            .is_some_and(|segment| segment.ident == marker)
    })
}

fn is_endpoint_type(symbol: &StructSymbol, marker: &str) -> bool {
    marker_attribute(&symbol.item.attrs, marker).is_some()
}

/// Read the route template from `#[endpoint("/path")]` or
/// `#[endpoint(path = "/path")]`.
pub fn parse_route(attr: &Attribute) -> syn::Result<String> {
    if let Ok(lit) = attr.parse_args::<LitStr>() {
        return Ok(lit.value());
    }
    let mut route = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("path") || meta.path.is_ident("route") {
            let value: LitStr = meta.value()?.parse()?;
            route = Some(value.value());
            Ok(())
        } else {
            Err(meta.error(
                "unknown endpoint argument\n\
                 \n\
                 Expected a route template:\n\
                 - #[endpoint(\"/users/{id}\")]\n\
                 - #[endpoint(path = \"/users/{id}\")]",
            ))
        }
    })?;
    route.ok_or_else(|| syn::Error::new_spanned(attr, "endpoint attribute requires a route template"))
}

fn scan_class(
    symbols: &SymbolTable,
    symbol: &StructSymbol,
    attr: &Attribute,
    marker: &str,
) -> Result<EndpointClass, Diagnostic> {
    let subject = symbol.full_path();
    let route = parse_route(attr).map_err(|err| Diagnostic::error(&subject, err.to_string()))?;
    validate_route_template(&route).map_err(|err| Diagnostic::error(&subject, err.to_string()))?;
    if symbol.is_generic() {
        return Err(Diagnostic::error(&subject, "endpoint types cannot be generic"));
    }

    let fields = instance_fields(symbols, symbol);
    let parameters = template_parameters(&route);
    let mut endpoints: Vec<Endpoint> = Vec::new();
    let mut warnings = Vec::new();
    let mut configure = None;

    for imp in symbols.inherent_impls(symbol) {
        for item in &imp.item.items {
            let ImplItem::Fn(method) = item else {
                continue;
            };
            let name = method.sig.ident.to_string();
            if name == "configure" && is_configure_hook(method) {
                configure = Some(name);
                continue;
            }
            let Some(verb) = HttpVerb::from_method_name(&name) else {
                continue;
            };
            let method_subject = format!("{subject}::{name}");
            if endpoints.iter().any(|endpoint| endpoint.verb == verb) {
                warnings.push(Diagnostic::warning(
                    method_subject,
                    format!("a second {verb} method is ignored"),
                ));
                continue;
            }
            match scan_endpoint(symbols, imp, method, verb, &route, &parameters, marker) {
                Ok(endpoint) => endpoints.push(endpoint),
                Err(message) => warnings.push(Diagnostic::warning(method_subject, message)),
            }
        }
    }

    let all_static = !endpoints.is_empty() && endpoints.iter().all(|endpoint| endpoint.is_static);
    tracing::debug!(
        class = %subject,
        route = %route,
        endpoints = endpoints.len(),
        "found endpoint type"
    );
    Ok(EndpointClass {
        name: symbol.name.clone(),
        full_path: subject,
        module: symbol.module.clone(),
        route,
        docs: extract_docs(&symbol.item.attrs),
        singleton_eligible: fields.is_empty(),
        fields,
        all_static,
        configure,
        endpoints,
        warnings,
    })
}

fn instance_fields(symbols: &SymbolTable, symbol: &StructSymbol) -> Vec<InstanceField> {
    symbol
        .item
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| InstanceField {
            member: field
                .ident
                .as_ref()
                .map_or_else(|| index.to_string(), ToString::to_string),
            ty: symbols.qualify_type(&symbol.module, &field.ty),
            service: extract_arc_type(&field.ty)
                .map(|inner| symbols.qualify_type(&symbol.module, &inner)),
        })
        .collect()
}

/// `fn configure(route: &mut dyn RouteBuilder)` with no receiver.
fn is_configure_hook(method: &ImplItemFn) -> bool {
    method.sig.receiver().is_none() && method.sig.inputs.len() == 1
}

fn scan_endpoint(
    symbols: &SymbolTable,
    imp: &ImplSymbol,
    method: &ImplItemFn,
    verb: HttpVerb,
    route: &str,
    parameters: &[String],
    marker: &str,
) -> Result<Endpoint, String> {
    let is_static = match method.sig.receiver() {
        None => true,
        Some(receiver) if receiver.reference.is_none() => {
            return Err("by-value receivers are not supported; take `&self`".to_string());
        }
        Some(receiver) if receiver.mutability.is_some() => {
            return Err("`&mut self` endpoints are not supported; take `&self`".to_string());
        }
        Some(_) => false,
    };
    let generic = method
        .sig
        .generics
        .params
        .iter()
        .any(|param| !matches!(param, syn::GenericParam::Lifetime(_)));
    if generic {
        return Err("generic endpoint methods are not supported".to_string());
    }

    let declared = match &method.sig.output {
        ReturnType::Default => None,
        ReturnType::Type(_, ty) => Some(ty.as_ref().clone()),
    };
    let future_output = declared.as_ref().and_then(extract_future_output);
    let is_async = method.sig.asyncness.is_some() || future_output.is_some();
    let output = future_output.or(declared).filter(|ty| !is_unit_type(ty));
    let returns_result = output.as_ref().is_some_and(is_result_type);

    let mut params = Vec::new();
    let mut has_request = false;
    for (index, input) in method.sig.inputs.iter().enumerate() {
        let FnArg::Typed(pat_type) = input else {
            continue;
        };
        let name = match pat_type.pat.as_ref() {
            Pat::Ident(pat) => pat.ident.to_string(),
            _ => format!("arg{index}"),
        };
        let binding = bind_param(
            symbols,
            &imp.module,
            &name,
            &pat_type.ty,
            parameters,
            marker,
            &mut has_request,
        );
        params.push(EndpointParam {
            name,
            ty: symbols.qualify_type(&imp.module, &pat_type.ty),
            binding,
        });
    }

    Ok(Endpoint {
        verb,
        method: method.clone(),
        method_name: method.sig.ident.to_string(),
        path: route.to_string(),
        docs: extract_docs(&method.attrs),
        is_async,
        is_static,
        output,
        returns_result,
        params,
    })
}

fn bind_param(
    symbols: &SymbolTable,
    module: &ModulePath,
    name: &str,
    ty: &Type,
    parameters: &[String],
    marker: &str,
    has_request: &mut bool,
) -> ParamBinding {
    if !*has_request
        && let Some(request) = symbols.resolve_type(module, ty)
        && !is_endpoint_type(request, marker)
    {
        *has_request = true;
        return ParamBinding::Request {
            full_path: request.full_path(),
        };
    }

    let (by_ref, target) = match ty {
        Type::Reference(reference) => (true, reference.elem.as_ref()),
        other => (false, other),
    };
    match last_segment(target).map(|segment| segment.ident.to_string()).as_deref() {
        Some("RequestContext") => return ParamBinding::Context { by_ref },
        Some("CancellationToken") if !by_ref => return ParamBinding::Cancellation,
        _ => {}
    }

    if is_scalar_type(ty) {
        let matched = parameters.iter().find(|parameter| {
            parameter.eq_ignore_ascii_case(name) || parameter.to_snake_case() == name
        });
        return match matched {
            Some(parameter) => ParamBinding::Route {
                name: parameter.clone(),
            },
            None => ParamBinding::Query {
                name: name.to_string(),
            },
        };
    }

    if let Some(inner) = extract_arc_type(ty) {
        return ParamBinding::Service {
            service: symbols.qualify_type(module, &inner),
            access: ServiceAccess::Shared,
        };
    }
    ParamBinding::Service {
        service: symbols.qualify_type(module, target),
        access: if by_ref {
            ServiceAccess::Borrowed
        } else {
            ServiceAccess::Cloned
        },
    }
}
