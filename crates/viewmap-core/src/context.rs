use serde::{Deserialize, Serialize};
use std::fmt;

/// Marker prefix for values that could not be resolved statically.
pub const VARIABLE_MARKER: &str = "<variable:";

/// Render a name as an unresolved variable, e.g. `<variable:db>`.
pub fn variable(name: &str) -> String {
    format!("{}{}>", VARIABLE_MARKER, name)
}

pub fn contains_variable(value: &str) -> bool {
    value.contains(VARIABLE_MARKER)
}

/// Where a call context came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Detected,
    Curated,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Detected => write!(f, "detected"),
            Origin::Curated => write!(f, "curated"),
        }
    }
}

/// Lookup key shared by call contexts and curation entries:
/// file path, class scope and function scope, with missing scopes as "".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey {
    pub path: String,
    pub class: String,
    pub function: String,
}

impl ScopeKey {
    pub fn new(
        path: impl Into<String>,
        class: impl Into<String>,
        function: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            class: class.into(),
            function: function.into(),
        }
    }
}

/// A single call of the target function found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub file_path: String,
    pub line: u32,
    /// The object the call is made on, i.e. the database.
    pub database: String,
    /// The rendered view argument.
    pub view: String,
    pub keyword_arguments: Vec<String>,
    pub function_scope: Option<String>,
    pub class_scope: Option<String>,
    pub origin: Origin,
}

impl CallContext {
    pub fn key(&self) -> ScopeKey {
        ScopeKey::new(
            self.file_path.clone(),
            self.class_scope.clone().unwrap_or_default(),
            self.function_scope.clone().unwrap_or_default(),
        )
    }

    pub fn has_variables(&self) -> bool {
        contains_variable(&self.database) || contains_variable(&self.view)
    }

    /// Copy of this context with the database and view replaced by curated values.
    pub fn with_resolution(&self, database: &str, view: &str) -> Self {
        Self {
            database: database.to_string(),
            view: view.to_string(),
            origin: Origin::Curated,
            ..self.clone()
        }
    }

    /// Keyword argument names as a Python-style list literal.
    pub fn keyword_list(&self) -> String {
        let quoted: Vec<String> = self
            .keyword_arguments
            .iter()
            .map(|k| format!("'{}'", k))
            .collect();
        format!("[{}]", quoted.join(", "))
    }

    pub fn describe(&self) -> String {
        format!(
            "Function {}({}) called with keyword argument {} within {}:{} in {}:{}",
            self.database,
            self.view,
            self.keyword_list(),
            self.class_scope.as_deref().unwrap_or("None"),
            self.function_scope.as_deref().unwrap_or("None"),
            self.file_path,
            self.line,
        )
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}
