use super::render::{CodeWriter, Render};

/// One child of a [`Block`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Line(String),
    Blank,
    /// A statement written across several calls; continuation lines are
    /// indented one level deeper than the first.
    Statement(Vec<String>),
    Scope {
        open: String,
        body: Block,
        close: String,
    },
    /// `#[cfg(predicate)]` followed by a braced block.
    Region {
        predicate: String,
        body: Block,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
enum Statement {
    #[default]
    Flushed,
    Accumulating(Vec<String>),
}

/// An ordered body of code.
///
/// Statements can be built up piecewise with [`append`](Block::append) and
/// [`continue_line`](Block::continue_line); any structural call ends the
/// pending statement first, so nodes never interleave with a half-written
/// statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    nodes: Vec<Node>,
    statement: Statement,
}

impl Block {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a block in a closure.
    pub fn build(f: impl FnOnce(&mut Block)) -> Self {
        let mut block = Block::new();
        f(&mut block);
        block.flush();
        block
    }

    pub fn line(&mut self, text: impl Into<String>) -> &mut Self {
        self.push(Node::Line(text.into()))
    }

    pub fn blank(&mut self) -> &mut Self {
        self.push(Node::Blank)
    }

    /// Extend the current line of the pending statement, starting one if
    /// none is pending.
    pub fn append(&mut self, text: impl AsRef<str>) -> &mut Self {
        match &mut self.statement {
            Statement::Accumulating(lines) => match lines.last_mut() {
                Some(last) => last.push_str(text.as_ref()),
                None => lines.push(text.as_ref().to_string()),
            },
            Statement::Flushed => {
                self.statement = Statement::Accumulating(vec![text.as_ref().to_string()]);
            }
        }
        self
    }

    /// Start a continuation line of the pending statement.
    pub fn continue_line(&mut self, text: impl Into<String>) -> &mut Self {
        match &mut self.statement {
            Statement::Accumulating(lines) => lines.push(text.into()),
            Statement::Flushed => self.statement = Statement::Accumulating(vec![text.into()]),
        }
        self
    }

    /// Close the pending statement.
    pub fn end_statement(&mut self) -> &mut Self {
        self.flush();
        self
    }

    /// `open`, an indented body, then `close`.
    pub fn scope(
        &mut self,
        open: impl Into<String>,
        close: impl Into<String>,
        f: impl FnOnce(&mut Block),
    ) -> &mut Self {
        let body = Block::build(f);
        self.push(Node::Scope {
            open: open.into(),
            body,
            close: close.into(),
        })
    }

    /// A block compiled only when `predicate` holds.
    pub fn region(&mut self, predicate: impl Into<String>, f: impl FnOnce(&mut Block)) -> &mut Self {
        let body = Block::build(f);
        self.push(Node::Region {
            predicate: predicate.into(),
            body,
        })
    }

    /// Move another block's nodes to the end of this one.
    pub fn extend(&mut self, mut other: Block) -> &mut Self {
        self.flush();
        other.flush();
        self.nodes.extend(other.nodes);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.statement == Statement::Flushed
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn push(&mut self, node: Node) -> &mut Self {
        self.flush();
        self.nodes.push(node);
        self
    }

    fn flush(&mut self) {
        if let Statement::Accumulating(lines) = std::mem::take(&mut self.statement)
            && !lines.is_empty()
        {
            self.nodes.push(Node::Statement(lines));
        }
    }
}

impl Render for Block {
    fn render(&self, writer: &mut CodeWriter) {
        for node in &self.nodes {
            node.render(writer);
        }
        if let Statement::Accumulating(lines) = &self.statement {
            render_statement(lines, writer);
        }
    }
}

impl Render for Node {
    fn render(&self, writer: &mut CodeWriter) {
        match self {
            Node::Line(text) => writer.line(text),
            Node::Blank => writer.blank(),
            Node::Statement(lines) => render_statement(lines, writer),
            Node::Scope { open, body, close } => {
                writer.line(open);
                writer.indent();
                body.render(writer);
                writer.dedent();
                writer.line(close);
            }
            Node::Region { predicate, body } => {
                writer.line(&format!("#[cfg({predicate})]"));
                writer.line("{");
                writer.indent();
                body.render(writer);
                writer.dedent();
                writer.line("}");
            }
        }
    }
}

fn render_statement(lines: &[String], writer: &mut CodeWriter) {
    let Some((first, rest)) = lines.split_first() else {
        return;
    };
    writer.line(first);
    if rest.is_empty() {
        return;
    }
    writer.indent();
    for line in rest {
        writer.line(line);
    }
    writer.dedent();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::Indent;

    fn render(block: &Block) -> String {
        block.render_to_string(Indent(4))
    }

    #[test]
    fn test_scopes_nest() {
        let block = Block::build(|b| {
            b.line("let x = 1;");
            b.scope("if x > 0 {", "}", |b| {
                b.scope("for i in 0..x {", "}", |b| {
                    b.line("println!(\"{i}\");");
                });
            });
        });
        assert_eq!(
            render(&block),
            "let x = 1;\nif x > 0 {\n    for i in 0..x {\n        println!(\"{i}\");\n    }\n}\n"
        );
    }

    #[test]
    fn test_statement_accumulates_until_flushed() {
        let block = Block::build(|b| {
            b.append("let total = a");
            b.append(" + b");
            b.continue_line("+ c;");
            b.line("next();");
        });
        assert_eq!(
            block.nodes(),
            &[
                Node::Statement(vec!["let total = a + b".into(), "+ c;".into()]),
                Node::Line("next();".into()),
            ]
        );
        assert_eq!(render(&block), "let total = a + b\n    + c;\nnext();\n");
    }

    #[test]
    fn test_pending_statement_renders() {
        let mut block = Block::new();
        block.append("done()");
        assert!(!block.is_empty());
        assert_eq!(render(&block), "done()\n");
    }

    #[test]
    fn test_region_wraps_in_cfg() {
        let block = Block::build(|b| {
            b.region("feature = \"docs\"", |b| {
                b.line("describe();");
            });
        });
        assert_eq!(
            render(&block),
            "#[cfg(feature = \"docs\")]\n{\n    describe();\n}\n"
        );
    }
}
