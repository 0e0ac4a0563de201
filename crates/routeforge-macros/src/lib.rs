//! Proc macros for routeforge.
//!
//! Route code is generated at build time by `routeforge-codegen`; these
//! macros only mark types and check their arguments early, so mistakes
//! surface as compile errors at the annotated item instead of in the
//! generated module.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use routeforge_parse::{parse_binding_args, parse_route, validate_route_template};
use syn::{Attribute, Data, DeriveInput, Fields, Item, parse_macro_input};

/// Binding helpers accepted on request members.
const BINDING_HELPERS: &[&str] = &["route", "query", "header", "cookie", "form"];

/// Mark a struct as an endpoint type.
///
/// Public methods named after an HTTP verb become routes on the template.
///
/// ```ignore
/// use routeforge::endpoint;
///
/// #[endpoint("/users/{id}")]
/// pub struct Users {
///     repo: Arc<UserRepo>,
/// }
///
/// impl Users {
///     /// Fetch one user.
///     pub async fn get(&self, id: u32) -> Option<User> {
///         self.repo.find(id).await
///     }
/// }
/// ```
///
/// The template is checked here: it must start with `/`, have balanced
/// braces and contain no empty or duplicate parameters.
#[proc_macro_attribute]
pub fn endpoint(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = TokenStream2::from(attr);
    let item2 = TokenStream2::from(item.clone());
    match check_endpoint(args, item2) {
        Ok(()) => item,
        Err(err) => {
            let mut tokens = err.to_compile_error();
            tokens.extend(TokenStream2::from(item));
            tokens.into()
        }
    }
}

fn check_endpoint(args: TokenStream2, item: TokenStream2) -> syn::Result<()> {
    let item: Item = syn::parse2(item)?;
    let Item::Struct(strukt) = &item else {
        return Err(syn::Error::new_spanned(
            &item,
            "#[endpoint] can only be applied to a struct",
        ));
    };
    if !strukt.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &strukt.generics,
            "endpoint types cannot be generic",
        ));
    }

    let attr: Attribute = syn::parse_quote!(#[endpoint(#args)]);
    let route = parse_route(&attr)?;
    validate_route_template(&route).map_err(|err| syn::Error::new_spanned(&args, err))?;
    Ok(())
}

/// Declare a request object and register its binding helpers.
///
/// Members bind from the body unless marked:
///
/// ```ignore
/// use routeforge::Request;
///
/// #[derive(Request)]
/// pub struct Search {
///     #[route] pub tenant: String,
///     #[query(name = "q")] pub text: String,
///     #[query(default = 20)] pub limit: u32,
///     #[header("X-Trace")] pub trace: Option<String>,
///     #[required] pub filters: Option<Vec<String>>,
/// }
/// ```
///
/// Nothing is generated; the attributes are read by the build-time
/// generator.
#[proc_macro_derive(Request, attributes(route, query, header, cookie, form, body, required, serde))]
pub fn derive_request(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match check_request(&input) {
        Ok(()) => TokenStream::new(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn check_request(input: &DeriveInput) -> syn::Result<()> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "#[derive(Request)] can only be applied to a struct",
        ));
    };

    let mut errors: Option<syn::Error> = None;
    let mut push = |err: syn::Error| match &mut errors {
        Some(existing) => existing.combine(err),
        None => errors = Some(err),
    };

    let fields = match &data.fields {
        Fields::Named(fields) => fields.named.iter().collect::<Vec<_>>(),
        Fields::Unnamed(fields) => fields.unnamed.iter().collect(),
        Fields::Unit => Vec::new(),
    };
    for field in fields {
        let mut sources = Vec::new();
        for attr in &field.attrs {
            let Some(ident) = attr.path().get_ident().map(|ident| ident.to_string()) else {
                continue;
            };
            if BINDING_HELPERS.contains(&ident.as_str()) {
                sources.push(attr);
                if let Err(err) = parse_binding_args(attr) {
                    push(err);
                }
            } else if ident == "body" || ident == "required" {
                if !matches!(attr.meta, syn::Meta::Path(_)) {
                    push(syn::Error::new_spanned(
                        attr,
                        format!("#[{ident}] takes no arguments"),
                    ));
                }
                if ident == "body" {
                    sources.push(attr);
                }
            }
        }
        if sources.len() > 1 {
            push(syn::Error::new_spanned(
                sources[1],
                "a member binds from one source; remove the extra binding attribute",
            ));
        }
    }

    match errors {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use quote::quote;
    use syn::parse_quote;

    use super::*;

    #[test]
    fn test_endpoint_accepts_struct_with_template() {
        let result = check_endpoint(quote!("/users/{id}"), quote!(pub struct Users;));
        assert!(result.is_ok());
        let result = check_endpoint(quote!(path = "/users"), quote!(pub struct Users { repo: u32 }));
        assert!(result.is_ok());
    }

    #[test]
    fn test_endpoint_rejects_bad_input() {
        let err = check_endpoint(quote!("/users/{id"), quote!(pub struct Users;)).unwrap_err();
        assert!(err.to_string().contains("/users/{id"));

        let err = check_endpoint(quote!("/users"), quote!(pub fn users() {})).unwrap_err();
        assert!(err.to_string().contains("only be applied to a struct"));

        let err = check_endpoint(quote!("/users"), quote!(pub struct Users<T>(T);)).unwrap_err();
        assert!(err.to_string().contains("generic"));

        assert!(check_endpoint(quote!(), quote!(pub struct Users;)).is_err());
    }

    #[test]
    fn test_request_helpers() {
        let input: DeriveInput = parse_quote! {
            pub struct Search {
                #[route] pub tenant: String,
                #[query(name = "q", default = 10)] pub limit: u32,
                #[header("X-Trace")] pub trace: Option<String>,
                #[required] pub tags: Option<Vec<String>>,
                #[body] pub note: String,
            }
        };
        assert!(check_request(&input).is_ok());

        let input: DeriveInput = parse_quote! {
            pub struct Search {
                #[query(colour = "red")] pub limit: u32,
            }
        };
        assert!(check_request(&input).is_err());

        let input: DeriveInput = parse_quote! {
            pub struct Search {
                #[route] #[query] pub id: u32,
            }
        };
        let err = check_request(&input).unwrap_err();
        assert!(err.to_string().contains("one source"));

        let input: DeriveInput = parse_quote! {
            pub enum Search { A }
        };
        assert!(check_request(&input).is_err());
    }
}
