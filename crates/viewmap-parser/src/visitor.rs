use tree_sitter::{Node, TreeCursor};
use viewmap_core::{variable, CallContext, Origin};

/// Walks a Python syntax tree and records every `<receiver>.<target>(...)` call
/// together with its enclosing class and function.
pub struct CallVisitor<'a> {
    target_function: &'a str,
    file_path: &'a str,
    source: &'a str,
    class_stack: Vec<String>,
    function_stack: Vec<String>,
    calls: Vec<CallContext>,
}

impl<'a> CallVisitor<'a> {
    pub fn new(target_function: &'a str, file_path: &'a str, source: &'a str) -> Self {
        Self {
            target_function,
            file_path,
            source,
            class_stack: Vec::new(),
            function_stack: Vec::new(),
            calls: Vec::new(),
        }
    }

    pub fn visit(&mut self, root: Node) {
        let mut cursor = root.walk();
        self.visit_node(&mut cursor);
    }

    pub fn into_calls(self) -> Vec<CallContext> {
        self.calls
    }

    fn visit_node(&mut self, cursor: &mut TreeCursor) {
        let node = cursor.node();

        let pushed = match node.kind() {
            "class_definition" => self.push_scope(&node, Scope::Class),
            "function_definition" => self.push_scope(&node, Scope::Function),
            // Decorators are visited before the definition and belong to its scope.
            "decorated_definition" => match node.child_by_field_name("definition") {
                Some(definition) if definition.kind() == "class_definition" => {
                    self.push_scope(&definition, Scope::Class)
                }
                Some(definition) if definition.kind() == "function_definition" => {
                    self.push_scope(&definition, Scope::Function)
                }
                _ => None,
            },
            "call" => {
                self.record_call(&node);
                None
            }
            _ => None,
        };

        if cursor.goto_first_child() {
            loop {
                self.visit_node(cursor);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
            cursor.goto_parent();
        }

        match pushed {
            Some(Scope::Class) => {
                self.class_stack.pop();
            }
            Some(Scope::Function) => {
                self.function_stack.pop();
            }
            None => {}
        }
    }

    fn push_scope(&mut self, node: &Node, scope: Scope) -> Option<Scope> {
        let name = node.child_by_field_name("name")?;
        let name = self.text(&name).to_string();
        match scope {
            Scope::Class => self.class_stack.push(name),
            Scope::Function => self.function_stack.push(name),
        }
        Some(scope)
    }

    fn record_call(&mut self, node: &Node) {
        let Some(callee) = node.child_by_field_name("function") else {
            return;
        };
        if callee.kind() != "attribute" {
            return;
        }
        let Some(attribute) = callee.child_by_field_name("attribute") else {
            return;
        };
        if self.text(&attribute) != self.target_function {
            return;
        }

        let database = callee
            .child_by_field_name("object")
            .map(|receiver| self.render_receiver(&receiver))
            .unwrap_or_default();

        let (view, keyword_arguments) = match node.child_by_field_name("arguments") {
            Some(arguments) => self.render_arguments(&arguments),
            None => (String::new(), Vec::new()),
        };

        self.calls.push(CallContext {
            file_path: self.file_path.to_string(),
            line: (node.start_position().row + 1) as u32,
            database,
            view,
            keyword_arguments,
            function_scope: self.function_stack.last().cloned(),
            class_scope: self.class_stack.last().cloned(),
            origin: Origin::Detected,
        });
    }

    /// The object a view is called on: a variable, `<variable:db>` for any
    /// `x.db`, or the last attribute of a longer access path.
    fn render_receiver(&self, receiver: &Node) -> String {
        match receiver.kind() {
            "identifier" => variable(self.text(receiver)),
            "attribute" => match receiver.child_by_field_name("attribute") {
                Some(attr) if self.text(&attr) == "db" => variable("db"),
                Some(attr) => self.text(&attr).to_string(),
                None => variable(self.text(receiver)),
            },
            _ => variable(self.text(receiver)),
        }
    }

    /// Rendered last positional argument and the keyword argument names.
    fn render_arguments(&self, arguments: &Node) -> (String, Vec<String>) {
        if arguments.kind() == "generator_expression" {
            return (self.text(arguments).to_string(), Vec::new());
        }

        let mut view = String::new();
        let mut keywords = Vec::new();
        let mut cursor = arguments.walk();

        for arg in arguments.named_children(&mut cursor) {
            match arg.kind() {
                "comment" => {}
                "keyword_argument" => {
                    if let Some(name) = arg.child_by_field_name("name") {
                        keywords.push(self.text(&name).to_string());
                    }
                }
                "dictionary_splat" => keywords.push(self.text(&arg).to_string()),
                _ => view = self.render_value(&arg),
            }
        }

        (view, keywords)
    }

    fn render_value(&self, value: &Node) -> String {
        match value.kind() {
            "identifier" => variable(self.text(value)),
            "string" => self.render_string(value),
            "concatenated_string" => {
                let mut cursor = value.walk();
                let rendered: String = value
                    .named_children(&mut cursor)
                    .filter(|part| part.kind() == "string")
                    .map(|part| self.render_string(&part))
                    .collect();
                rendered
            }
            _ => self.text(value).to_string(),
        }
    }

    /// String contents without prefix and quotes; f-string interpolations
    /// become variables named by their expression and `{{`/`}}` collapse.
    fn render_string(&self, string: &Node) -> String {
        let mut rendered = String::new();
        let mut is_fstring = false;
        let mut cursor = string.walk();

        for part in string.named_children(&mut cursor) {
            match part.kind() {
                "string_start" => {
                    is_fstring = self
                        .text(&part)
                        .chars()
                        .take_while(|c| c.is_ascii_alphabetic())
                        .any(|c| c.eq_ignore_ascii_case(&'f'));
                }
                "string_end" => {}
                "interpolation" => {
                    let expression = part
                        .child_by_field_name("expression")
                        .map(|e| self.text(&e))
                        .unwrap_or_else(|| self.text(&part).trim_matches(&['{', '}'][..]));
                    rendered.push_str(&variable(expression));
                }
                _ if is_fstring => {
                    rendered.push_str(&self.text(&part).replace("{{", "{").replace("}}", "}"))
                }
                _ => rendered.push_str(self.text(&part)),
            }
        }

        rendered
    }

    fn text(&self, node: &Node) -> &'a str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Class,
    Function,
}
