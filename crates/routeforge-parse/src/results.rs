//! Status/payload surface of an endpoint, read from its declared return
//! type and, for result-returning endpoints, from the body itself.

use std::collections::{HashMap, HashSet};

use heck::ToSnakeCase;
use proc_macro2::{Delimiter, TokenStream, TokenTree};
use syn::visit::{self, Visit};
use syn::{Block, Expr, ExprPath, Ident, Lit, Macro, Pat, Stmt, Type};

use crate::model::Endpoint;
use crate::naming::to_name;
use crate::{
    extract_option_type, extract_result_types, first_type_argument, is_unit_type, last_segment,
    tokens_to_string, type_to_string,
};

/// Types that own result factory functions (`TypedResults::ok(..)`).
const FACTORY_OWNERS: &[&str] = &["TypedResults", "HttpResult", "Results"];

/// Concrete result types and the status each one produces.
const TYPED_RESULTS: &[(&str, u16, bool)] = &[
    ("Success", 200, true),
    ("Created", 201, true),
    ("Accepted", 202, true),
    ("NoContent", 204, false),
    ("BadRequest", 400, true),
    ("Unauthorized", 401, false),
    ("Forbidden", 403, false),
    ("NotFound", 404, false),
    ("Conflict", 409, true),
    ("UnprocessableEntity", 422, true),
];

/// Factory functions and the status each one produces.
const FACTORIES: &[(&str, u16)] = &[
    ("ok", 200),
    ("json", 200),
    ("created", 201),
    ("accepted", 202),
    ("no_content", 204),
    ("bad_request", 400),
    ("unauthorized", 401),
    ("forbidden", 403),
    ("not_found", 404),
    ("conflict", 409),
    ("unprocessable_entity", 422),
    ("validation_problem", 400),
    ("internal_error", 500),
    ("problem", 500),
    ("new", 200),
];

/// Factories whose first argument is the status code.
const STATUS_FIRST: &[&str] = &["json", "problem", "new"];

/// How deep the analyzer follows locals and nested expressions.
const MAX_DEPTH: usize = 16;

/// One possible outcome of an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResultVariant {
    pub status: u16,
    /// Payload type name, if the outcome carries a body.
    pub payload: Option<String>,
}

impl ResultVariant {
    pub fn new(status: u16, payload: Option<String>) -> Self {
        Self { status, payload }
    }
}

/// Field type of a synthesized response shape.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
    String,
    Integer,
    Float,
    Bool,
    /// Arbitrary JSON.
    Json,
    /// `null` in the source, so an optional JSON value.
    Null,
    /// A type from the endpoint's own signature.
    Declared(Type),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseProperty {
    pub field: String,
    /// Key in the serialized object.
    pub wire_name: String,
    pub ty: PropertyType,
}

/// A response type the generator must declare: an anonymous `json!`
/// object or a tuple return.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseObject {
    pub name: String,
    pub ordinal: usize,
    pub properties: Vec<ResponseProperty>,
}

/// How the endpoint's return value becomes an HTTP result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnShape {
    /// `()`: 204.
    Unit,
    /// Any serializable value: 200.
    Json,
    /// `Option<T>`: 200 or 404.
    Optional,
    /// `Result<T, E>` with a serializable T: 200 or 500.
    Fallible,
    /// `Result<(), E>`: 204 or 500.
    FallibleUnit,
    /// Already a result type.
    IntoResult,
    /// `Result<R, E>` where R is a result type.
    FallibleResult,
    /// A tuple wrapped into the named response shape.
    Tuple { shape: String, arity: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSurface {
    pub shape: ReturnShape,
    /// Distinct outcomes in first-seen order.
    pub variants: Vec<ResultVariant>,
    pub responses: Vec<ResponseObject>,
}

fn is_result_bound(bound: &syn::TypeParamBound) -> bool {
    matches!(bound, syn::TypeParamBound::Trait(t)
        if t.path.segments.last().is_some_and(|s| s.ident == "IntoHttpResult"))
}

/// Whether a type produces an HTTP result on its own.
pub(crate) fn is_result_type(ty: &Type) -> bool {
    if let Type::ImplTrait(impl_trait) = ty {
        return impl_trait.bounds.iter().any(is_result_bound);
    }
    if let Some(segment) = last_segment(ty)
        && segment.ident == "Box"
        && let Some(Type::TraitObject(object)) = first_type_argument(segment)
    {
        return object.bounds.iter().any(is_result_bound);
    }
    if let Some((ok, _)) = extract_result_types(ty) {
        return is_result_type(&ok);
    }
    last_segment(ty).is_some_and(|segment| {
        segment.ident == "HttpResult"
            || TYPED_RESULTS.iter().any(|(name, _, _)| segment.ident == name)
    })
}

/// Outcome described by a typed result such as `Created<User>`.
fn typed_result_variant(ty: &Type) -> Option<ResultVariant> {
    let segment = last_segment(ty)?;
    let (_, status, carries) = TYPED_RESULTS
        .iter()
        .find(|(name, _, _)| segment.ident == name)?;
    let payload = if *carries {
        first_type_argument(segment).map(type_to_string)
    } else {
        None
    };
    Some(ResultVariant::new(*status, payload))
}

/// Derive the status/payload surface of an endpoint.
pub fn find_results(endpoint: &Endpoint) -> ResultSurface {
    let output = endpoint.output.as_ref();
    let Some(output) = output else {
        return ResultSurface {
            shape: ReturnShape::Unit,
            variants: vec![ResultVariant::new(204, None)],
            responses: Vec::new(),
        };
    };

    if endpoint.returns_result {
        return analyze_body(endpoint, output);
    }

    let (shape, variants, responses) = if let Some(inner) = extract_option_type(output) {
        (
            ReturnShape::Optional,
            vec![
                ResultVariant::new(200, Some(type_to_string(&inner))),
                ResultVariant::new(404, None),
            ],
            Vec::new(),
        )
    } else if let Some((ok, _)) = extract_result_types(output) {
        if is_unit_type(&ok) {
            (
                ReturnShape::FallibleUnit,
                vec![ResultVariant::new(204, None), ResultVariant::new(500, None)],
                Vec::new(),
            )
        } else {
            (
                ReturnShape::Fallible,
                vec![
                    ResultVariant::new(200, Some(type_to_string(&ok))),
                    ResultVariant::new(500, None),
                ],
                Vec::new(),
            )
        }
    } else if let Type::Tuple(tuple) = output {
        let name = to_name(&endpoint.path, "Response0", Some(endpoint.verb.label()));
        let properties = tuple
            .elems
            .iter()
            .enumerate()
            .map(|(index, elem)| ResponseProperty {
                field: format!("item{}", index + 1),
                wire_name: format!("item{}", index + 1),
                ty: PropertyType::Declared(elem.clone()),
            })
            .collect();
        (
            ReturnShape::Tuple {
                shape: name.clone(),
                arity: tuple.elems.len(),
            },
            vec![ResultVariant::new(200, Some(name.clone()))],
            vec![ResponseObject {
                name,
                ordinal: 0,
                properties,
            }],
        )
    } else {
        (
            ReturnShape::Json,
            vec![ResultVariant::new(200, Some(type_to_string(output)))],
            Vec::new(),
        )
    };
    ResultSurface {
        shape,
        variants,
        responses,
    }
}

fn analyze_body(endpoint: &Endpoint, output: &Type) -> ResultSurface {
    let fallible = extract_result_types(output).is_some();
    let block = &endpoint.method.block;

    let mut analyzer = Analyzer {
        endpoint,
        locals: Locals::collect(block),
        variants: Vec::new(),
        responses: Vec::new(),
    };
    for node in return_points(block) {
        analyzer.contribute(node, 0);
    }

    let mut variants = analyzer.variants;
    if variants.is_empty() {
        let declared = extract_result_types(output).map_or_else(|| output.clone(), |(ok, _)| ok);
        if let Some(variant) = typed_result_variant(&declared) {
            variants.push(variant);
        } else {
            tracing::debug!(
                endpoint = %endpoint.method_name,
                path = %endpoint.path,
                "no result outcomes recognized"
            );
        }
    }
    if fallible {
        push_unique(&mut variants, ResultVariant::new(500, None));
    }

    ResultSurface {
        shape: if fallible {
            ReturnShape::FallibleResult
        } else {
            ReturnShape::IntoResult
        },
        variants,
        responses: analyzer.responses,
    }
}

fn push_unique(variants: &mut Vec<ResultVariant>, variant: ResultVariant) {
    if !variants.contains(&variant) {
        variants.push(variant);
    }
}

/// The closed set of expression forms the analyzer understands.
enum ReturnExpr<'a> {
    Conditional(Vec<&'a Expr>),
    Await(&'a Expr),
    Cast(&'a Expr, &'a Type),
    Paren(&'a Expr),
    Try(&'a Expr),
    Block(&'a Block),
    AsyncBlock(&'a Block),
    Call {
        func: &'a ExprPath,
        args: Vec<&'a Expr>,
    },
    MethodCall(&'a Expr),
    Local(&'a Ident),
    Other,
}

fn classify(expr: &Expr) -> ReturnExpr<'_> {
    match expr {
        Expr::If(expr_if) => {
            let mut branches = Vec::new();
            if let Some(tail) = block_tail(&expr_if.then_branch) {
                branches.push(tail);
            }
            match &expr_if.else_branch {
                Some((_, otherwise)) => branches.push(otherwise.as_ref()),
                // Without an `else` the expression is `()`.
                None => return ReturnExpr::Other,
            }
            ReturnExpr::Conditional(branches)
        }
        Expr::Match(expr_match) => ReturnExpr::Conditional(
            expr_match.arms.iter().map(|arm| arm.body.as_ref()).collect(),
        ),
        Expr::Await(expr_await) => ReturnExpr::Await(&expr_await.base),
        Expr::Cast(cast) => ReturnExpr::Cast(&cast.expr, &cast.ty),
        Expr::Paren(paren) => ReturnExpr::Paren(&paren.expr),
        Expr::Group(group) => ReturnExpr::Paren(&group.expr),
        Expr::Try(expr_try) => ReturnExpr::Try(&expr_try.expr),
        Expr::Block(block) => ReturnExpr::Block(&block.block),
        Expr::Unsafe(block) => ReturnExpr::Block(&block.block),
        Expr::Async(block) => ReturnExpr::AsyncBlock(&block.block),
        Expr::Call(call) => match call.func.as_ref() {
            Expr::Path(func) => ReturnExpr::Call {
                func,
                args: call.args.iter().collect(),
            },
            _ => ReturnExpr::Other,
        },
        Expr::MethodCall(call) => ReturnExpr::MethodCall(&call.receiver),
        Expr::Path(path) if path.qself.is_none() => match path.path.get_ident() {
            Some(ident) => ReturnExpr::Local(ident),
            None => ReturnExpr::Other,
        },
        _ => ReturnExpr::Other,
    }
}

/// The value-producing tail of a block. Tail macros (`todo!()`,
/// `unreachable!()`) produce no recognizable result.
fn block_tail(block: &Block) -> Option<&Expr> {
    match block.stmts.last()? {
        Stmt::Expr(expr, None) => Some(expr),
        _ => None,
    }
}

/// Tail expression plus every `return` operand, skipping closures, async
/// blocks and nested items, which return to somewhere else.
fn return_points(block: &Block) -> Vec<&Expr> {
    let mut collector = ReturnCollector::default();
    collector.visit_block(block);
    let mut points = collector.found;
    if let Some(tail) = block_tail(block) {
        points.push(tail);
    }
    points
}

#[derive(Default)]
struct ReturnCollector<'a> {
    found: Vec<&'a Expr>,
}

impl<'a> Visit<'a> for ReturnCollector<'a> {
    fn visit_expr_return(&mut self, node: &'a syn::ExprReturn) {
        if let Some(expr) = &node.expr {
            self.found.push(expr.as_ref());
        }
        visit::visit_expr_return(self, node);
    }

    fn visit_expr_closure(&mut self, _: &'a syn::ExprClosure) {}

    fn visit_expr_async(&mut self, _: &'a syn::ExprAsync) {}

    fn visit_item(&mut self, _: &'a syn::Item) {}
}

/// `let` declarations of the body, last one wins per name.
#[derive(Default)]
struct Locals<'a> {
    declared: HashMap<String, Local<'a>>,
}

#[derive(Default, Clone, Copy)]
struct Local<'a> {
    ty: Option<&'a Type>,
    init: Option<&'a Expr>,
}

impl<'a> Locals<'a> {
    fn collect(block: &'a Block) -> Self {
        let mut locals = Self::default();
        locals.visit_block(block);
        locals
    }

    fn get(&self, ident: &Ident) -> Option<Local<'a>> {
        self.declared.get(&ident.to_string()).copied()
    }
}

impl<'a> Visit<'a> for Locals<'a> {
    fn visit_local(&mut self, node: &'a syn::Local) {
        let init = node.init.as_ref().map(|init| init.expr.as_ref());
        let (pat, ty) = match &node.pat {
            Pat::Type(pat_type) => (pat_type.pat.as_ref(), Some(pat_type.ty.as_ref())),
            other => (other, None),
        };
        if let Pat::Ident(ident) = pat {
            self.declared
                .insert(ident.ident.to_string(), Local { ty, init });
        }
        visit::visit_local(self, node);
    }

    fn visit_item(&mut self, _: &'a syn::Item) {}
}

struct Analyzer<'e, 'a> {
    endpoint: &'e Endpoint,
    locals: Locals<'a>,
    variants: Vec<ResultVariant>,
    responses: Vec<ResponseObject>,
}

impl<'a> Analyzer<'_, 'a> {
    fn contribute(&mut self, expr: &'a Expr, depth: usize) {
        if depth > MAX_DEPTH {
            tracing::debug!(endpoint = %self.endpoint.method_name, "result analysis depth exceeded");
            return;
        }
        match classify(expr) {
            ReturnExpr::Conditional(branches) => {
                for branch in branches {
                    self.contribute(branch, depth + 1);
                }
            }
            ReturnExpr::Await(inner) | ReturnExpr::Paren(inner) | ReturnExpr::Try(inner) => {
                self.contribute(inner, depth + 1);
            }
            ReturnExpr::Cast(inner, ty) => match typed_result_variant(ty) {
                Some(variant) => push_unique(&mut self.variants, variant),
                None => self.contribute(inner, depth + 1),
            },
            ReturnExpr::Block(block) => {
                if let Some(tail) = block_tail(block) {
                    self.contribute(tail, depth + 1);
                }
            }
            ReturnExpr::AsyncBlock(block) => {
                for point in return_points(block) {
                    self.contribute(point, depth + 1);
                }
            }
            ReturnExpr::Call { func, args } => self.call(func, &args, depth),
            ReturnExpr::MethodCall(receiver) => self.contribute(receiver, depth + 1),
            ReturnExpr::Local(ident) => match self.locals.get(ident) {
                Some(local) => {
                    if let Some(variant) = local.ty.and_then(typed_result_variant) {
                        push_unique(&mut self.variants, variant);
                    } else if let Some(init) = local.init {
                        self.contribute(init, depth + 1);
                    }
                }
                None => tracing::debug!(
                    endpoint = %self.endpoint.method_name,
                    local = %ident,
                    "returned name is not a local"
                ),
            },
            ReturnExpr::Other => tracing::debug!(
                endpoint = %self.endpoint.method_name,
                "unrecognized return expression"
            ),
        }
    }

    fn call(&mut self, func: &'a ExprPath, args: &[&'a Expr], depth: usize) {
        let segments = &func.path.segments;
        let Some(last) = segments.last() else {
            return;
        };

        if segments.len() == 1 {
            match last.ident.to_string().as_str() {
                "Ok" => {
                    if let Some(arg) = args.first().copied() {
                        self.contribute(arg, depth + 1);
                    }
                }
                "Err" => {}
                _ => tracing::debug!(
                    endpoint = %self.endpoint.method_name,
                    function = %last.ident,
                    "call is not a result factory"
                ),
            }
            return;
        }

        let owner = &segments[segments.len() - 2].ident;
        if owner == "Box" && last.ident == "new" {
            if let Some(arg) = args.first().copied() {
                self.contribute(arg, depth + 1);
            }
            return;
        }
        if FACTORY_OWNERS.iter().any(|name| owner == name) {
            let member = last.ident.to_string();
            let Some((_, status)) = FACTORIES.iter().find(|(name, _)| *name == member) else {
                tracing::debug!(endpoint = %self.endpoint.method_name, factory = %member, "unknown result factory");
                return;
            };
            let takes_status = STATUS_FIRST.contains(&member.as_str());
            let status = match args.first().copied() {
                Some(arg) if takes_status => status_literal(arg).unwrap_or(*status),
                _ => *status,
            };
            let payload = match member.as_str() {
                "validation_problem" => Some("ValidationProblem".to_string()),
                "internal_error" | "problem" | "new" => None,
                _ => first_type_argument(last).map(type_to_string).or_else(|| {
                    let value = if takes_status { args.get(1) } else { args.first() };
                    value.copied().and_then(|arg| self.payload_of(arg, depth + 1))
                }),
            };
            push_unique(&mut self.variants, ResultVariant::new(status, payload));
            return;
        }

        // `Created(user)`, `NotFound::default()` and friends.
        let typed = TYPED_RESULTS
            .iter()
            .find(|(name, _, _)| segments.iter().any(|s| s.ident == name));
        if let Some((_, status, carries)) = typed {
            let payload = if *carries {
                args.first().copied().and_then(|arg| self.payload_of(arg, depth + 1))
            } else {
                None
            };
            push_unique(&mut self.variants, ResultVariant::new(*status, payload));
        }
    }

    /// Best-effort type name of a payload expression.
    fn payload_of(&mut self, expr: &'a Expr, depth: usize) -> Option<String> {
        if depth > MAX_DEPTH {
            return None;
        }
        match expr {
            Expr::Struct(expr_struct) => Some(tokens_to_string(&expr_struct.path)),
            Expr::Macro(expr_macro) => self.payload_of_macro(&expr_macro.mac),
            Expr::Reference(reference) => self.payload_of(&reference.expr, depth + 1),
            Expr::Paren(paren) => self.payload_of(&paren.expr, depth + 1),
            Expr::Lit(lit) => literal_type(&lit.lit).map(str::to_string),
            Expr::Call(call) => match call.func.as_ref() {
                Expr::Path(func) if func.path.segments.len() >= 2 => {
                    let segments = &func.path.segments;
                    let owner = &segments[segments.len() - 2];
                    let uppercase = owner
                        .ident
                        .to_string()
                        .starts_with(|c: char| c.is_ascii_uppercase());
                    uppercase.then(|| {
                        let path: Vec<String> = segments
                            .iter()
                            .take(segments.len() - 1)
                            .map(|s| tokens_to_string(s))
                            .collect();
                        path.join("::")
                    })
                }
                _ => None,
            },
            Expr::MethodCall(call) => match call.method.to_string().as_str() {
                "clone" | "to_owned" => self.payload_of(&call.receiver, depth + 1),
                "to_string" => Some("String".to_string()),
                _ => None,
            },
            Expr::Path(path) => {
                let ident = path.path.get_ident()?;
                let local = self.locals.get(ident)?;
                match (local.ty, local.init) {
                    (Some(ty), _) => Some(type_to_string(ty)),
                    (None, Some(init)) => self.payload_of(init, depth + 1),
                    (None, None) => None,
                }
            }
            _ => None,
        }
    }

    fn payload_of_macro(&mut self, mac: &Macro) -> Option<String> {
        let is_json = mac.path.segments.last().is_some_and(|s| s.ident == "json");
        if !is_json {
            return None;
        }
        let Some(entries) = json_object_entries(&mac.tokens) else {
            return Some("serde_json::Value".to_string());
        };
        let mut fields = HashSet::new();
        let properties: Vec<ResponseProperty> = entries
            .into_iter()
            .map(|(key, value)| ResponseProperty {
                field: claim_field(&mut fields, identifier_for(&key)),
                wire_name: key,
                ty: self.json_value_type(value),
            })
            .collect();

        if let Some(existing) = self
            .responses
            .iter()
            .find(|response| response.properties == properties)
        {
            return Some(existing.name.clone());
        }
        let ordinal = self.responses.len();
        let name = to_name(
            &self.endpoint.path,
            &format!("Response{ordinal}"),
            Some(self.endpoint.verb.label()),
        );
        self.responses.push(ResponseObject {
            name: name.clone(),
            ordinal,
            properties,
        });
        Some(name)
    }

    fn json_value_type(&self, value: TokenStream) -> PropertyType {
        let mut tokens = value.clone().into_iter();
        if let (Some(TokenTree::Group(group)), None) = (tokens.next(), tokens.next())
            && matches!(group.delimiter(), Delimiter::Brace | Delimiter::Bracket)
        {
            return PropertyType::Json;
        }
        let Ok(expr) = syn::parse2::<Expr>(value) else {
            return PropertyType::Json;
        };
        match &expr {
            Expr::Lit(lit) => match &lit.lit {
                Lit::Str(_) => PropertyType::String,
                Lit::Int(_) => PropertyType::Integer,
                Lit::Float(_) => PropertyType::Float,
                Lit::Bool(_) => PropertyType::Bool,
                _ => PropertyType::Json,
            },
            Expr::Path(path) if path.path.is_ident("null") => PropertyType::Null,
            Expr::Path(path) => path
                .path
                .get_ident()
                .and_then(|ident| self.locals.get(ident))
                .and_then(|local| local.ty)
                .map_or(PropertyType::Json, |ty| {
                    PropertyType::Declared(ty.clone())
                }),
            _ => PropertyType::Json,
        }
    }
}

/// A status code written as an integer literal, possibly parenthesized.
fn status_literal(expr: &Expr) -> Option<u16> {
    match expr {
        Expr::Lit(syn::ExprLit {
            lit: Lit::Int(int), ..
        }) => int.base10_parse::<u16>().ok().filter(|status| (100..=599).contains(status)),
        Expr::Paren(paren) => status_literal(&paren.expr),
        Expr::Group(group) => status_literal(&group.expr),
        _ => None,
    }
}

fn literal_type(lit: &Lit) -> Option<&'static str> {
    match lit {
        Lit::Str(_) => Some("String"),
        Lit::Int(_) => Some("i64"),
        Lit::Float(_) => Some("f64"),
        Lit::Bool(_) => Some("bool"),
        _ => None,
    }
}

/// Split `json!({ "a": 1, "b": x })` into its keys and value tokens.
fn json_object_entries(tokens: &TokenStream) -> Option<Vec<(String, TokenStream)>> {
    let mut outer = tokens.clone().into_iter();
    let (Some(TokenTree::Group(group)), None) = (outer.next(), outer.next()) else {
        return None;
    };
    if group.delimiter() != Delimiter::Brace {
        return None;
    }

    let mut entries = Vec::new();
    let mut current: Vec<TokenTree> = Vec::new();
    for token in group.stream() {
        match &token {
            TokenTree::Punct(punct) if punct.as_char() == ',' => {
                entries.push(json_entry(std::mem::take(&mut current))?);
            }
            _ => current.push(token),
        }
    }
    if !current.is_empty() {
        entries.push(json_entry(current)?);
    }
    Some(entries)
}

fn json_entry(tokens: Vec<TokenTree>) -> Option<(String, TokenStream)> {
    let mut tokens = tokens.into_iter();
    let key = match tokens.next()? {
        TokenTree::Literal(literal) => syn::parse_str::<syn::LitStr>(&literal.to_string())
            .ok()?
            .value(),
        TokenTree::Ident(ident) => ident.to_string(),
        _ => return None,
    };
    match tokens.next()? {
        TokenTree::Punct(punct) if punct.as_char() == ':' => {}
        _ => return None,
    }
    Some((key, tokens.collect()))
}

/// A field identifier for a JSON key.
fn identifier_for(key: &str) -> String {
    let snake = key.to_snake_case();
    let mut field: String = snake
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if field.is_empty() || field.starts_with(|c: char| c.is_ascii_digit()) {
        field.insert(0, '_');
    }
    if matches!(field.as_str(), "self" | "super" | "crate" | "Self") {
        field.push('_');
    } else if syn::parse_str::<Ident>(&field).is_err() {
        field.insert_str(0, "r#");
    }
    field
}

/// Keep field names unique within one shape; later clashes get a counter.
fn claim_field(taken: &mut HashSet<String>, field: String) -> String {
    if taken.insert(field.clone()) {
        return field;
    }
    let base = field.trim_start_matches("r#");
    let mut counter = 2;
    loop {
        let candidate = format!("{base}_{counter}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}
