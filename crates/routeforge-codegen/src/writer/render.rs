use proc_macro2::Literal;

/// Indentation width in spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indent(pub usize);

impl Default for Indent {
    fn default() -> Self {
        Indent(4)
    }
}

/// Output buffer that knows the current nesting depth.
#[derive(Debug)]
pub struct CodeWriter {
    out: String,
    depth: usize,
    indent: Indent,
}

impl CodeWriter {
    pub fn new(indent: Indent) -> Self {
        Self {
            out: String::new(),
            depth: 0,
            indent,
        }
    }

    /// Write one line at the current depth. Embedded newlines start new
    /// lines at the same depth.
    pub fn line(&mut self, text: &str) {
        for line in text.split('\n') {
            if line.trim().is_empty() {
                self.out.push('\n');
                continue;
            }
            for _ in 0..self.depth * self.indent.0 {
                self.out.push(' ');
            }
            self.out.push_str(line.trim_end());
            self.out.push('\n');
        }
    }

    /// An empty line; never two in a row, never at the start.
    pub fn blank(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Writes itself into a [`CodeWriter`].
pub trait Render {
    fn render(&self, writer: &mut CodeWriter);

    /// Render on a fresh writer.
    fn render_to_string(&self, indent: Indent) -> String {
        let mut writer = CodeWriter::new(indent);
        self.render(&mut writer);
        writer.finish()
    }
}

/// A Rust string literal for `value`, escaped as needed.
pub fn string_literal(value: &str) -> String {
    Literal::string(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_follow_depth() {
        let mut writer = CodeWriter::new(Indent(2));
        writer.line("a {");
        writer.indent();
        writer.line("b;\nc;");
        writer.dedent();
        writer.dedent();
        writer.line("}");
        assert_eq!(writer.finish(), "a {\n  b;\n  c;\n}\n");
    }

    #[test]
    fn test_blank_lines_collapse() {
        let mut writer = CodeWriter::new(Indent::default());
        writer.blank();
        writer.line("x");
        writer.blank();
        writer.blank();
        writer.line("y");
        assert_eq!(writer.finish(), "x\n\ny\n");
    }

    #[test]
    fn test_string_literal_escapes() {
        assert_eq!(string_literal("/users/{id}"), "\"/users/{id}\"");
        assert_eq!(string_literal("say \"hi\""), "\"say \\\"hi\\\"\"");
    }
}
