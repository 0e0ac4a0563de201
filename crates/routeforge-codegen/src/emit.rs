//! Code emission for endpoint classes, one endpoint at a time.
//!
//! The [`Emitter`] turns analysis results into writer nodes. Everything that
//! must exist once per generation pass (synthesized types, validators,
//! schema registrations) goes through the [`EmitState`] the driver threads
//! through every call.

use std::collections::{BTreeMap, BTreeSet};

use heck::ToSnakeCase;
use routeforge_parse::{
    Compilation, Diagnostic, Endpoint, EndpointClass, EndpointParam, ModulePath, ObjectProperty,
    ParamBinding, PropertyType, RequestObject, ResultSurface, ReturnShape, ServiceAccess,
    ValidationMode, classify_request, extract_option_type, find_results, last_segment, to_name,
    tokens_to_string, type_to_string,
};
use syn::Type;

use crate::writer::{Block, FieldDecl, Item, StructDecl, string_literal};

/// The struct implementing the host's route-source trait.
pub const ENDPOINTS_TYPE: &str = "GeneratedEndpoints";

/// Types whose emptiness `Presence` can judge.
const PRESENCE_TYPES: &[&str] = &[
    "Option", "String", "str", "Vec", "HashMap", "BTreeMap", "HashSet", "bool", "char", "i8",
    "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize", "f32",
    "f64",
];

/// Names and declarations shared by every endpoint of one generation pass.
#[derive(Debug)]
pub struct EmitState {
    type_names: BTreeSet<String>,
    locals: BTreeSet<String>,
    /// Request type -> synthesized body type.
    body_types: BTreeMap<String, String>,
    /// Request type -> validator binding.
    validators: BTreeMap<String, String>,
    /// Registered type -> schema name.
    schemas: BTreeMap<String, String>,
    schema_names: BTreeSet<String>,
    declarations: Vec<Item>,
    validator_setup: Block,
    schema_calls: Block,
    diagnostics: Vec<Diagnostic>,
}

/// What an [`EmitState`] collected, for assembly by the driver.
#[derive(Debug)]
pub struct EmitOutput {
    pub declarations: Vec<Item>,
    pub validator_setup: Block,
    pub schema_calls: Block,
    pub diagnostics: Vec<Diagnostic>,
}

impl Default for EmitState {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitState {
    pub fn new() -> Self {
        let mut type_names = BTreeSet::new();
        type_names.insert(ENDPOINTS_TYPE.to_string());
        Self {
            type_names,
            locals: BTreeSet::new(),
            body_types: BTreeMap::new(),
            validators: BTreeMap::new(),
            schemas: BTreeMap::new(),
            schema_names: BTreeSet::new(),
            declarations: Vec::new(),
            validator_setup: Block::new(),
            schema_calls: Block::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Reserve a type name in the generated module, suffixing a counter
    /// when it is taken.
    pub fn claim_type(&mut self, base: &str) -> String {
        claim(&mut self.type_names, base, "")
    }

    /// Reserve a binding name inside `map_endpoints`.
    pub fn claim_local(&mut self, base: &str) -> String {
        claim(&mut self.locals, base, "_")
    }

    pub fn into_output(self) -> EmitOutput {
        EmitOutput {
            declarations: self.declarations,
            validator_setup: self.validator_setup,
            schema_calls: self.schema_calls,
            diagnostics: self.diagnostics,
        }
    }

    /// Register `ty` once; a second type with the same simple name gets a
    /// suffixed schema name and a warning.
    fn register_schema(&mut self, runtime: &str, name: &str, ty: &str) {
        if self.schemas.contains_key(ty) {
            return;
        }
        let claimed = claim(&mut self.schema_names, name, "");
        if claimed != name {
            let first = self
                .schemas
                .iter()
                .find_map(|(other, registered)| (registered == name).then_some(other.as_str()))
                .unwrap_or(name);
            self.diagnostics.push(Diagnostic::warning(
                ty,
                format!("schema name {name} is already used by {first}; registered as {claimed}"),
            ));
        }
        self.schema_calls.line(format!(
            "{runtime}::schema::describe::<{ty}>(schemas, {});",
            string_literal(&claimed)
        ));
        self.schemas.insert(ty.to_string(), claimed);
    }
}

fn claim(taken: &mut BTreeSet<String>, base: &str, separator: &str) -> String {
    if taken.insert(base.to_string()) {
        return base.to_string();
    }
    let mut counter = 2;
    loop {
        let candidate = format!("{base}{separator}{counter}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// A classified request parameter, with everything already declared for it.
struct PreparedRequest {
    object: RequestObject,
    /// The parameter's type as written in generated code.
    ty: String,
    body_type: Option<String>,
    validator: Option<String>,
}

impl PreparedRequest {
    /// (member, client-facing name) pairs for validation error keys.
    fn aliases(&self) -> Vec<(String, String)> {
        self.object
            .properties
            .iter()
            .filter(|property| {
                !property.is_body() || (self.body_type.is_some() && property.serde_attrs.is_empty())
            })
            .map(|property| (property.name.clone(), property.lookup_name()))
            .filter(|(member, alias)| member != alias)
            .collect()
    }
}

pub struct Emitter<'a> {
    compilation: &'a Compilation,
    runtime: &'a str,
}

impl<'a> Emitter<'a> {
    pub fn new(compilation: &'a Compilation, runtime: &'a str) -> Self {
        Self {
            compilation,
            runtime,
        }
    }

    /// Register a class that has instance endpoints: once per process when it
    /// holds no state, once per resolution otherwise.
    pub fn registration(&self, class: &EndpointClass, out: &mut Block) {
        if class.all_static {
            return;
        }
        let rt = self.runtime;
        let (helper, provider) = if class.singleton_eligible {
            ("add_singleton", "_provider")
        } else {
            ("add_transient", "provider")
        };
        let path = &class.full_path;
        out.scope(
            format!(
                "{rt}::services::{helper}::<{path}, _>(services, |{provider}: &dyn {rt}::ServiceLocator| {{"
            ),
            "});",
            |b| {
                if class.fields.is_empty() {
                    b.line(format!("Ok({path} {{}})"));
                    return;
                }
                b.scope(format!("Ok({path} {{"), "})", |b| {
                    for field in &class.fields {
                        let value = match &field.service {
                            Some(service) => format!(
                                "{rt}::services::require::<{}>(provider)?",
                                type_to_string(service)
                            ),
                            None => "::core::default::Default::default()".to_string(),
                        };
                        b.line(format!("{}: {value},", field.member));
                    }
                });
            },
        );
    }

    /// Acquire a stateless instance once, before routes are mapped.
    ///
    /// Returns the binding name, or `None` when the class is acquired per
    /// request or not at all.
    pub fn singleton(&self, class: &EndpointClass, state: &mut EmitState, out: &mut Block) -> Option<String> {
        if class.all_static || !class.singleton_eligible {
            return None;
        }
        let local = state.claim_local(&format!("shared_{}", class.name.to_snake_case()));
        out.line(format!(
            "let {local} = {}::services::require::<{}>(services)?;",
            self.runtime, class.full_path
        ));
        Some(local)
    }

    /// The route block of one endpoint.
    pub fn endpoint(
        &self,
        class: &EndpointClass,
        endpoint: &Endpoint,
        singleton: Option<&str>,
        state: &mut EmitState,
    ) -> Block {
        let rt = self.runtime;
        tracing::debug!(
            class = %class.full_path,
            verb = %endpoint.verb,
            path = %endpoint.path,
            "emitting endpoint"
        );

        let mut surface = find_results(endpoint);
        self.declare_responses(class, &mut surface, state);
        let request = self.prepare_request(class, endpoint, state);

        let receiver = match (endpoint.is_static, singleton) {
            (true, _) => None,
            (false, Some(shared)) => Some(shared.to_string()),
            (false, None) => Some("instance".to_string()),
        };
        let mut captures: Vec<&str> = Vec::new();
        if !endpoint.is_static
            && let Some(shared) = singleton
        {
            captures.push(shared);
        }
        if let Some(validator) = request.as_ref().and_then(|r| r.validator.as_deref()) {
            captures.push(validator);
        }

        let body = self.handler_body(class, endpoint, &surface, request.as_ref(), receiver.as_deref());
        let metadata = self.metadata(endpoint, &surface, request.as_ref());

        Block::build(|b| {
            b.line(format!(
                "// {} {} => {}::{}",
                endpoint.verb, endpoint.path, class.full_path, endpoint.method_name
            ));
            b.scope("{", "}", |b| {
                for captured in &captures {
                    b.line(format!("let {captured} = ::std::sync::Arc::clone(&{captured});"));
                }
                b.scope("let route = routes.map(", ");", |b| {
                    b.line(format!("{rt}::HttpMethod::{},", endpoint.verb.label()));
                    b.line(format!("{},", string_literal(&endpoint.path)));
                    b.scope(
                        format!("{rt}::handler(move |ctx: {rt}::RequestContext| {{"),
                        "}),",
                        |b| {
                            for captured in &captures {
                                b.line(format!(
                                    "let {captured} = ::std::sync::Arc::clone(&{captured});"
                                ));
                            }
                            b.scope("async move {", "}", |b| {
                                b.extend(body);
                            });
                        },
                    );
                });
                b.extend(metadata);
                if let Some(hook) = &class.configure {
                    b.line(format!("<{}>::{hook}(route);", class.full_path));
                }
            });
        })
    }

    fn prepare_request(
        &self,
        class: &EndpointClass,
        endpoint: &Endpoint,
        state: &mut EmitState,
    ) -> Option<PreparedRequest> {
        let param = endpoint
            .params
            .iter()
            .find(|param| matches!(param.binding, ParamBinding::Request { .. }))?;
        let ParamBinding::Request { full_path } = &param.binding else {
            return None;
        };
        let Some(symbol) = self.compilation.symbols().get(full_path) else {
            state.diagnostics.push(Diagnostic::warning(
                format!("{}::{}", class.full_path, endpoint.method_name),
                format!("request type {full_path} could not be found"),
            ));
            return None;
        };
        let object = classify_request(self.compilation, symbol);
        let ty = type_to_string(&param.ty);

        let body_type = object
            .body_type_name
            .as_deref()
            .map(|base| self.declare_body(&object, base, state));
        if let Some(name) = &body_type {
            state.register_schema(self.runtime, name, name);
        } else if object.whole_body && !symbol.is_generic() {
            state.register_schema(self.runtime, &object.name, &object.full_path);
        }
        let validator = self.declare_validator(&object, &ty, state);

        Some(PreparedRequest {
            object,
            ty,
            body_type,
            validator,
        })
    }

    /// Declare the body-only type of a mixed-source request, once.
    fn declare_body(&self, object: &RequestObject, base: &str, state: &mut EmitState) -> String {
        if let Some(existing) = state.body_types.get(&object.full_path) {
            return existing.clone();
        }
        let rt = self.runtime;
        let name = state.claim_type(base);
        let mut decl = StructDecl::new(&name)
            .docs(format!("Body members of [`{}`].", object.full_path))
            .attr(format!("#[derive({rt}::serde::Deserialize)]"))
            .attr(format!(
                "#[serde(crate = {}, rename_all = \"camelCase\")]",
                string_literal(&format!("{rt}::serde"))
            ));
        for property in object.body_properties() {
            let mut field = FieldDecl::new(&property.name, type_to_string(&property.ty));
            for attr in &property.serde_attrs {
                field = field.attr(attribute_text(attr));
            }
            decl = decl.field(field);
        }
        state.declarations.push(Item::Struct(decl));
        state
            .body_types
            .insert(object.full_path.clone(), name.clone());
        name
    }

    /// Declare the validator of a request type in `map_endpoints`, once.
    fn declare_validator(&self, object: &RequestObject, ty: &str, state: &mut EmitState) -> Option<String> {
        if object.validation_mode == ValidationMode::None
            || (object.validation_mode == ValidationMode::Validator
                && object.validation_hook.is_none())
        {
            return None;
        }
        if let Some(existing) = state.validators.get(ty) {
            return Some(existing.clone());
        }
        let rt = self.runtime;
        let local = state.claim_local(&format!("validate_{}", object.name.to_snake_case()));

        let mut skipped = Vec::new();
        let required: Vec<&ObjectProperty> = object
            .required_properties()
            .filter(|property| {
                let present = has_presence(&property.ty);
                if !present {
                    skipped.push(property.name.clone());
                }
                present
            })
            .collect();
        for member in skipped {
            state.diagnostics.push(Diagnostic::warning(
                format!("{}::{member}", object.full_path),
                "#[required] has no effect on this type; check it in a validation hook",
            ));
        }

        match (object.validation_mode, object.validation_hook.as_deref()) {
            (ValidationMode::Validator, Some(factory)) if required.is_empty() => {
                state
                    .validator_setup
                    .line(format!("let {local} = ::std::sync::Arc::new(<{ty}>::{factory}());"));
            }
            (mode, hook) => {
                let rules = Block::build(|b| {
                    b.line(format!("let mut rules = {rt}::RuleBuilder::<{ty}>::new();"));
                    for property in &required {
                        b.line(format!(
                            "rules.required({}, |value: &{ty}| {rt}::Presence::is_present(&value.{}));",
                            string_literal(&property.name),
                            property.name
                        ));
                    }
                    match (mode, hook) {
                        (ValidationMode::Validator, Some(factory)) => {
                            b.line(format!("rules.validator(<{ty}>::{factory}());"));
                        }
                        (_, Some(hook)) => {
                            b.line(format!("<{ty}>::{hook}(&mut rules);"));
                        }
                        (_, None) => {}
                    }
                    b.line("::std::sync::Arc::new(rules.build())");
                });
                state.validator_setup.scope(format!("let {local} = {{"), "};", |b| {
                    b.extend(rules);
                });
            }
        }

        state.validators.insert(ty.to_string(), local.clone());
        Some(local)
    }

    /// Declare the synthesized response shapes of an endpoint and register
    /// schemas for every payload.
    fn declare_responses(&self, class: &EndpointClass, surface: &mut ResultSurface, state: &mut EmitState) {
        let rt = self.runtime;
        let mut renamed: BTreeMap<String, String> = BTreeMap::new();

        for response in &surface.responses {
            let name = state.claim_type(&response.name);
            let mut decl = StructDecl::new(&name)
                .attr(format!("#[derive({rt}::serde::Serialize)]"))
                .attr(format!(
                    "#[serde(crate = {})]",
                    string_literal(&format!("{rt}::serde"))
                ));
            for property in &response.properties {
                let ty = match &property.ty {
                    PropertyType::String => "::std::string::String".to_string(),
                    PropertyType::Integer => "i64".to_string(),
                    PropertyType::Float => "f64".to_string(),
                    PropertyType::Bool => "bool".to_string(),
                    PropertyType::Json => format!("{rt}::serde_json::Value"),
                    PropertyType::Null => {
                        format!("::core::option::Option<{rt}::serde_json::Value>")
                    }
                    PropertyType::Declared(ty) => type_to_string(
                        &self.compilation.symbols().qualify_type(&class.module, ty),
                    ),
                };
                let mut field = FieldDecl::new(&property.field, ty);
                if property.field.trim_start_matches("r#") != property.wire_name {
                    field = field.attr(format!(
                        "#[serde(rename = {})]",
                        string_literal(&property.wire_name)
                    ));
                }
                decl = decl.field(field);
            }
            state.declarations.push(Item::Struct(decl));
            state.register_schema(rt, &name, &name);
            if name != response.name {
                renamed.insert(response.name.clone(), name);
            }
        }

        if !renamed.is_empty() {
            for response in &mut surface.responses {
                if let Some(name) = renamed.get(&response.name) {
                    response.name = name.clone();
                }
            }
            for variant in &mut surface.variants {
                if let Some(name) = variant.payload.as_ref().and_then(|p| renamed.get(p)) {
                    variant.payload = Some(name.clone());
                }
            }
            if let ReturnShape::Tuple { shape, .. } = &mut surface.shape
                && let Some(name) = renamed.get(shape)
            {
                *shape = name.clone();
            }
        }

        let synthesized: BTreeSet<&str> = surface.responses.iter().map(|r| r.name.as_str()).collect();
        for payload in surface.variants.iter().filter_map(|v| v.payload.as_deref()) {
            if synthesized.contains(payload) {
                continue;
            }
            let Ok(ty) = syn::parse_str::<Type>(payload) else {
                continue;
            };
            for (name, path) in self.crate_structs_in(&class.module, &ty) {
                state.register_schema(rt, &name, &path);
            }
        }
    }

    /// Non-generic crate structs named anywhere in `ty`.
    fn crate_structs_in(&self, module: &ModulePath, ty: &Type) -> Vec<(String, String)> {
        let mut found = Vec::new();
        let symbols = self.compilation.symbols();
        if let Some(symbol) = symbols.resolve_type(module, ty)
            && !symbol.is_generic()
        {
            found.push((symbol.name.clone(), symbol.full_path()));
        }
        let nested: Vec<&Type> = match ty {
            Type::Path(path) => path
                .path
                .segments
                .iter()
                .flat_map(|segment| match &segment.arguments {
                    syn::PathArguments::AngleBracketed(args) => args
                        .args
                        .iter()
                        .filter_map(|arg| match arg {
                            syn::GenericArgument::Type(ty) => Some(ty),
                            _ => None,
                        })
                        .collect(),
                    _ => Vec::new(),
                })
                .collect(),
            Type::Reference(reference) => vec![reference.elem.as_ref()],
            Type::Slice(slice) => vec![slice.elem.as_ref()],
            Type::Array(array) => vec![array.elem.as_ref()],
            Type::Tuple(tuple) => tuple.elems.iter().collect(),
            Type::Paren(paren) => vec![paren.elem.as_ref()],
            _ => Vec::new(),
        };
        for inner in nested {
            found.extend(self.crate_structs_in(module, inner));
        }
        found
    }

    /// Statements of the `async move` block handling one request.
    fn handler_body(
        &self,
        class: &EndpointClass,
        endpoint: &Endpoint,
        surface: &ResultSurface,
        request: Option<&PreparedRequest>,
        receiver: Option<&str>,
    ) -> Block {
        Block::build(|b| {
            if receiver == Some("instance") {
                b.line(format!("let instance = ctx.service::<{}>()?;", class.full_path));
            }
            if let Some(request) = request {
                self.bind_request(b, request);
            }

            let args: Vec<String> = endpoint
                .params
                .iter()
                .map(|param| self.bind_param(b, param))
                .collect();

            b.append("let output = ");
            match receiver {
                Some(receiver) => b.append(format!("{receiver}.{}(", endpoint.method_name)),
                None => b.append(format!("<{}>::{}(", class.full_path, endpoint.method_name)),
            };
            b.append(args.join(", "));
            b.append(")");
            if endpoint.is_async {
                b.append(".await");
            }
            b.append(";");
            b.end_statement();

            self.wrap_output(b, &surface.shape);
        })
    }

    fn bind_request(&self, b: &mut Block, request: &PreparedRequest) {
        let rt = self.runtime;
        let ty = &request.ty;
        let object = &request.object;

        if object.whole_body {
            b.line(format!("let request: {ty} = ctx.read_json()?;"));
        } else {
            if let Some(body) = &request.body_type {
                b.line(format!("let body: {body} = ctx.read_json()?;"));
            }
            if object.positional {
                let mut ordered: Vec<&ObjectProperty> = object.properties.iter().collect();
                ordered.sort_by_key(|property| property.position);
                b.scope(format!("let request = <{ty}>::new("), ");", |b| {
                    for property in ordered {
                        b.line(format!("{},", self.member_value(property)));
                    }
                });
            } else {
                b.scope(format!("let request = {ty} {{"), "};", |b| {
                    for property in &object.properties {
                        b.line(format!("{}: {},", property.name, self.member_value(property)));
                    }
                });
            }
        }

        if let Some(validator) = &request.validator {
            b.append(format!(
                "let errors = {rt}::Validator::validate(&*{validator}, &request)"
            ));
            let aliases = request.aliases();
            if !aliases.is_empty() {
                let pairs: Vec<String> = aliases
                    .iter()
                    .map(|(member, alias)| {
                        format!("({}, {})", string_literal(member), string_literal(alias))
                    })
                    .collect();
                b.continue_line(format!(".remap(&[{}])", pairs.join(", ")));
            }
            b.append(";");
            b.end_statement();
            b.scope("if !errors.is_empty() {", "}", |b| {
                b.line(format!(
                    "return {rt}::HandlerResult::Ok({rt}::HttpResult::validation_problem(errors));"
                ));
            });
        }
    }

    /// Expression producing one request member.
    fn member_value(&self, property: &ObjectProperty) -> String {
        if property.is_body() {
            return format!("body.{}", property.name);
        }
        let source = format!("{}::BindingSource::{}", self.runtime, property.source.label());
        let name = string_literal(&property.lookup_name());
        let default = property.default_value.as_deref().map(string_literal);
        match (extract_option_type(&property.ty), default) {
            (Some(inner), Some(default)) => format!(
                "Some(ctx.bind_or::<{}>({source}, {name}, {default})?)",
                type_to_string(&inner)
            ),
            (Some(inner), None) => format!(
                "ctx.bind_opt::<{}>({source}, {name})?",
                type_to_string(&inner)
            ),
            (None, Some(default)) => format!(
                "ctx.bind_or::<{}>({source}, {name}, {default})?",
                type_to_string(&property.ty)
            ),
            (None, None) => format!(
                "ctx.bind::<{}>({source}, {name})?",
                type_to_string(&property.ty)
            ),
        }
    }

    /// Bind one method parameter, returning the argument expression.
    fn bind_param(&self, b: &mut Block, param: &EndpointParam) -> String {
        let local = format!("arg_{}", param.name.trim_start_matches("r#"));
        match &param.binding {
            ParamBinding::Request { .. } => "request".to_string(),
            ParamBinding::Context { by_ref: true } => "&ctx".to_string(),
            ParamBinding::Context { by_ref: false } => "ctx.clone()".to_string(),
            ParamBinding::Cancellation => "ctx.cancellation()".to_string(),
            ParamBinding::Route { name } => self.bind_scalar(b, param, name, "Route", local),
            ParamBinding::Query { name } => self.bind_scalar(b, param, name, "Query", local),
            ParamBinding::Service { service, access } => {
                let service = type_to_string(service);
                match access {
                    ServiceAccess::Shared => {
                        b.line(format!("let {local} = ctx.service::<{service}>()?;"));
                        local
                    }
                    ServiceAccess::Borrowed => {
                        b.line(format!("let {local} = ctx.service::<{service}>()?;"));
                        format!("&*{local}")
                    }
                    ServiceAccess::Cloned => {
                        b.line(format!(
                            "let {local} = ::core::clone::Clone::clone(&*ctx.service::<{service}>()?);"
                        ));
                        local
                    }
                }
            }
        }
    }

    /// Bind a route or query scalar; `&str` parameters borrow a bound `String`.
    fn bind_scalar(
        &self,
        b: &mut Block,
        param: &EndpointParam,
        name: &str,
        source: &str,
        local: String,
    ) -> String {
        let rt = self.runtime;
        let (by_ref, target) = match &param.ty {
            Type::Reference(reference) => (true, reference.elem.as_ref()),
            other => (false, other),
        };
        let call = match extract_option_type(target) {
            Some(inner) => format!("bind_opt::<{}>", scalar_text(&inner)),
            None => format!("bind::<{}>", scalar_text(target)),
        };
        b.line(format!(
            "let {local} = ctx.{call}({rt}::BindingSource::{source}, {})?;",
            string_literal(name)
        ));
        if by_ref { format!("&{local}") } else { local }
    }

    /// Turn `output` into the handler's result.
    fn wrap_output(&self, b: &mut Block, shape: &ReturnShape) {
        let rt = self.runtime;
        let result = match shape {
            ReturnShape::Unit => format!("{rt}::HttpResult::no_content()"),
            ReturnShape::Json => format!("{rt}::HttpResult::json(200, &output)"),
            ReturnShape::IntoResult | ReturnShape::FallibleResult => {
                format!("{rt}::IntoHttpResult::into_http_result(output)")
            }
            ReturnShape::Tuple { shape, arity } => {
                let fields: Vec<String> = (0..*arity)
                    .map(|index| format!("item{}: output.{index}", index + 1))
                    .collect();
                format!(
                    "{rt}::HttpResult::json(200, &{shape} {{ {} }})",
                    fields.join(", ")
                )
            }
            ReturnShape::Optional | ReturnShape::Fallible | ReturnShape::FallibleUnit => {
                let arms: [(&str, String); 2] = match shape {
                    ReturnShape::Optional => [
                        ("Some(value)", format!("{rt}::HttpResult::json(200, &value)")),
                        ("None", format!("{rt}::HttpResult::not_found()")),
                    ],
                    ReturnShape::Fallible => [
                        ("Ok(value)", format!("{rt}::HttpResult::json(200, &value)")),
                        ("Err(err)", format!("{rt}::HttpResult::from_error(&err)")),
                    ],
                    _ => [
                        ("Ok(())", format!("{rt}::HttpResult::no_content()")),
                        ("Err(err)", format!("{rt}::HttpResult::from_error(&err)")),
                    ],
                };
                b.scope("let result = match output {", "};", |b| {
                    for (pattern, value) in &arms {
                        b.line(format!("{pattern} => {value},"));
                    }
                });
                "result".to_string()
            }
        };
        b.line(format!("{rt}::HandlerResult::Ok({result})"));
    }

    /// `route.with_metadata(..)` describing the endpoint for documentation.
    fn metadata(
        &self,
        endpoint: &Endpoint,
        surface: &ResultSurface,
        request: Option<&PreparedRequest>,
    ) -> Block {
        let rt = self.runtime;
        Block::build(|b| {
            b.scope(format!("route.with_metadata({rt}::metadata(|| {{"), "}));", |b| {
                b.append(format!(
                    "{rt}::EndpointMetadata::new({rt}::HttpMethod::{}, {})",
                    endpoint.verb.label(),
                    string_literal(&endpoint.path)
                ));
                b.continue_line(format!(
                    ".operation_id({})",
                    string_literal(&to_name(&endpoint.path, "", Some(endpoint.verb.label())))
                ));
                if let Some(summary) = endpoint.docs.as_deref().and_then(|d| d.lines().next()) {
                    b.continue_line(format!(".summary({})", string_literal(summary.trim())));
                }

                if let Some(request) = request {
                    for property in request.object.bound_properties() {
                        let required = property.required
                            || (!property.nullable && property.default_value.is_none());
                        b.continue_line(format!(
                            ".parameter({}, {rt}::BindingSource::{}, {}, {required}, {})",
                            string_literal(&property.lookup_name()),
                            property.source.label(),
                            string_literal(&type_to_string(&property.ty)),
                            property.nullable
                        ));
                    }
                }
                for param in &endpoint.params {
                    let (name, source) = match &param.binding {
                        ParamBinding::Route { name } => (name, "Route"),
                        ParamBinding::Query { name } => (name, "Query"),
                        _ => continue,
                    };
                    let nullable = extract_option_type(&param.ty).is_some();
                    b.continue_line(format!(
                        ".parameter({}, {rt}::BindingSource::{source}, {}, {}, {nullable})",
                        string_literal(name),
                        string_literal(&type_to_string(&param.ty)),
                        !nullable
                    ));
                }

                if let Some(request) = request.filter(|r| r.object.reads_body()) {
                    let body = request.body_type.as_deref().unwrap_or(&request.object.name);
                    b.continue_line(format!(".body({})", string_literal(body)));
                }
                for variant in &surface.variants {
                    let payload = match &variant.payload {
                        Some(payload) => format!("Some({})", string_literal(payload)),
                        None => "None".to_string(),
                    };
                    b.continue_line(format!(".response({}, {payload})", variant.status));
                }
                b.continue_line(".response(400, Some(\"ValidationProblem\"))");
                b.end_statement();
            });
        })
    }
}

/// Whether `Presence` is implemented for the member type.
fn has_presence(ty: &Type) -> bool {
    last_segment(ty).is_some_and(|segment| PRESENCE_TYPES.iter().any(|name| segment.ident == name))
}

/// `str` binds as `String`; other scalars bind as themselves.
fn scalar_text(ty: &Type) -> String {
    match last_segment(ty) {
        Some(segment) if segment.ident == "str" => "::std::string::String".to_string(),
        _ => type_to_string(ty),
    }
}

fn attribute_text(attr: &syn::Attribute) -> String {
    format!("#[{}]", tokens_to_string(&attr.meta).replace(" (", "("))
}
