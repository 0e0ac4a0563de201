use super::block::Block;
use super::render::{CodeWriter, Render};

/// A top-level or module-level item.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Struct(StructDecl),
    Impl(ImplDecl),
    Function(Function),
    Namespace(Namespace),
    /// Free-form lines, e.g. `use` declarations.
    Raw(Block),
}

impl Render for Item {
    fn render(&self, writer: &mut CodeWriter) {
        match self {
            Item::Struct(item) => item.render(writer),
            Item::Impl(item) => item.render(writer),
            Item::Function(item) => item.render(writer),
            Item::Namespace(item) => item.render(writer),
            Item::Raw(block) => block.render(writer),
        }
    }
}

fn render_items(items: &[Item], writer: &mut CodeWriter) {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            writer.blank();
        }
        item.render(writer);
    }
}

fn render_docs(docs: Option<&str>, writer: &mut CodeWriter) {
    if let Some(docs) = docs {
        for line in docs.lines() {
            if line.is_empty() {
                writer.line("///");
            } else {
                writer.line(&format!("/// {line}"));
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: String,
    pub attrs: Vec<String>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            attrs: Vec::new(),
        }
    }

    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.attrs.push(attr.into());
        self
    }
}

/// A braced struct; rendered as a unit struct when it has no fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub docs: Option<String>,
    pub attrs: Vec<String>,
    pub fields: Vec<FieldDecl>,
}

impl StructDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: None,
            attrs: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = Some(docs.into());
        self
    }

    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.attrs.push(attr.into());
        self
    }

    pub fn field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }
}

impl Render for StructDecl {
    fn render(&self, writer: &mut CodeWriter) {
        render_docs(self.docs.as_deref(), writer);
        for attr in &self.attrs {
            writer.line(attr);
        }
        if self.fields.is_empty() {
            writer.line(&format!("pub struct {};", self.name));
            return;
        }
        writer.line(&format!("pub struct {} {{", self.name));
        writer.indent();
        for field in &self.fields {
            for attr in &field.attrs {
                writer.line(attr);
            }
            writer.line(&format!("pub {}: {},", field.name, field.ty));
        }
        writer.dedent();
        writer.line("}");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub docs: Option<String>,
    pub attrs: Vec<String>,
    /// Everything before the opening brace.
    pub signature: String,
    pub body: Block,
}

impl Function {
    pub fn new(signature: impl Into<String>, body: Block) -> Self {
        Self {
            docs: None,
            attrs: Vec::new(),
            signature: signature.into(),
            body,
        }
    }

    pub fn docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = Some(docs.into());
        self
    }

    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.attrs.push(attr.into());
        self
    }
}

impl Render for Function {
    fn render(&self, writer: &mut CodeWriter) {
        render_docs(self.docs.as_deref(), writer);
        for attr in &self.attrs {
            writer.line(attr);
        }
        writer.line(&format!("{} {{", self.signature));
        writer.indent();
        self.body.render(writer);
        writer.dedent();
        writer.line("}");
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImplDecl {
    /// `impl Trait for Type` or `impl Type`.
    pub header: String,
    pub functions: Vec<Function>,
}

impl ImplDecl {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            functions: Vec::new(),
        }
    }

    pub fn function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }
}

impl Render for ImplDecl {
    fn render(&self, writer: &mut CodeWriter) {
        writer.line(&format!("{} {{", self.header));
        writer.indent();
        for (index, function) in self.functions.iter().enumerate() {
            if index > 0 {
                writer.blank();
            }
            function.render(writer);
        }
        writer.dedent();
        writer.line("}");
    }
}

/// `pub mod name { .. }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub name: String,
    pub docs: Option<String>,
    pub attrs: Vec<String>,
    pub items: Vec<Item>,
}

impl Namespace {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: None,
            attrs: Vec::new(),
            items: Vec::new(),
        }
    }

    pub fn docs(mut self, docs: impl Into<String>) -> Self {
        self.docs = Some(docs.into());
        self
    }

    pub fn attr(mut self, attr: impl Into<String>) -> Self {
        self.attrs.push(attr.into());
        self
    }

    pub fn item(&mut self, item: Item) -> &mut Self {
        self.items.push(item);
        self
    }
}

impl Render for Namespace {
    fn render(&self, writer: &mut CodeWriter) {
        render_docs(self.docs.as_deref(), writer);
        for attr in &self.attrs {
            writer.line(attr);
        }
        writer.line(&format!("pub mod {} {{", self.name));
        writer.indent();
        render_items(&self.items, writer);
        writer.dedent();
        writer.line("}");
    }
}

/// A whole generated file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceFile {
    /// Leading `//` comment lines.
    pub header: Vec<String>,
    pub items: Vec<Item>,
}

impl SourceFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.header.push(line.into());
        self
    }

    pub fn item(&mut self, item: Item) -> &mut Self {
        self.items.push(item);
        self
    }
}

impl Render for SourceFile {
    fn render(&self, writer: &mut CodeWriter) {
        for line in &self.header {
            writer.line(&format!("// {line}"));
        }
        if !self.header.is_empty() {
            writer.blank();
        }
        render_items(&self.items, writer);
    }
}
