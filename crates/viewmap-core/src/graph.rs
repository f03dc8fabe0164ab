use crate::context::CallContext;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeKind {
    Scope,
    Database,
    View,
}

impl NodeKind {
    fn shape(&self) -> &'static str {
        match self {
            NodeKind::Scope => "box",
            NodeKind::Database => "cylinder",
            NodeKind::View => "ellipse",
        }
    }
}

/// Which code uses which view of which database.
///
/// Edges run from the calling scope to the view and from the database to the
/// view, so that a view links its users to its backing database.
#[derive(Debug, Clone, Default)]
pub struct UsageGraph {
    nodes: BTreeMap<String, NodeKind>,
    edges: BTreeMap<(String, String), usize>,
}

/// `path::Class.function`, `path::function`, `path::Class` or `path::<module>`.
pub fn scope_id(context: &CallContext) -> String {
    let scope = match (&context.class_scope, &context.function_scope) {
        (Some(class), Some(function)) => format!("{}.{}", class, function),
        (Some(class), None) => class.clone(),
        (None, Some(function)) => function.clone(),
        (None, None) => "<module>".to_string(),
    };
    format!("{}::{}", context.file_path, scope)
}

pub fn view_id(context: &CallContext) -> String {
    format!("{}/{}", context.database, context.view)
}

impl UsageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_contexts<'a, I>(contexts: I) -> Self
    where
        I: IntoIterator<Item = &'a CallContext>,
    {
        let mut graph = Self::new();
        for context in contexts {
            graph.add(context);
        }
        graph
    }

    pub fn add(&mut self, context: &CallContext) {
        let scope = scope_id(context);
        let view = view_id(context);

        self.nodes.insert(scope.clone(), NodeKind::Scope);
        self.nodes
            .insert(context.database.clone(), NodeKind::Database);
        self.nodes.insert(view.clone(), NodeKind::View);

        *self.edges.entry((scope, view.clone())).or_insert(0) += 1;
        // database -> view edges are structural; count stays at 1
        self.edges
            .entry((context.database.clone(), view))
            .or_insert(1);
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes_of(&self, kind: NodeKind) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(id, _)| id.as_str())
            .collect()
    }

    pub fn calls_between(&self, from: &str, to: &str) -> Option<usize> {
        self.edges
            .get(&(from.to_string(), to.to_string()))
            .copied()
    }

    /// Render as a Graphviz digraph.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph viewmap {\n    rankdir=LR;\n");

        for (id, kind) in &self.nodes {
            let _ = writeln!(out, "    {} [shape={}];", quote(id), kind.shape());
        }
        for ((from, to), count) in &self.edges {
            if *count > 1 {
                let _ = writeln!(
                    out,
                    "    {} -> {} [label=\"{}\"];",
                    quote(from),
                    quote(to),
                    count
                );
            } else {
                let _ = writeln!(out, "    {} -> {};", quote(from), quote(to));
            }
        }

        out.push_str("}\n");
        out
    }
}

fn quote(id: &str) -> String {
    let mut quoted = String::with_capacity(id.len() + 2);
    quoted.push('"');
    for c in id.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
