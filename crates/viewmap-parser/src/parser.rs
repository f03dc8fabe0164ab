use crate::{create_parser, CallVisitor};
use std::path::Path;
use tracing::{debug, warn};
use viewmap_core::{FileScan, Result, ViewMapError};

/// Finds calls of one target function in Python sources.
///
/// Owns a tree-sitter parser, so a scanner is used by one thread at a time.
pub struct CallScanner {
    target_function: String,
    parser: tree_sitter::Parser,
}

impl CallScanner {
    pub fn new(target_function: impl Into<String>) -> Result<Self> {
        let target_function = target_function.into();
        if target_function.trim().is_empty() {
            return Err(ViewMapError::InvalidInput(
                "Target function must not be empty".to_string(),
            ));
        }
        Ok(Self {
            target_function,
            parser: create_parser()?,
        })
    }

    pub fn target_function(&self) -> &str {
        &self.target_function
    }

    pub fn scan_file(&mut self, path: &Path) -> Result<FileScan> {
        let source = std::fs::read_to_string(path)?;
        self.scan_source(&path.to_string_lossy(), &source)
    }

    pub fn scan_source(&mut self, file_path: &str, source: &str) -> Result<FileScan> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| ViewMapError::Parse(format!("Failed to parse {}", file_path)))?;

        let root = tree.root_node();
        let syntax_errors = root.has_error();
        if syntax_errors {
            warn!(
                "{} contains syntax errors, calls near them may be missed",
                file_path
            );
        }

        let mut visitor = CallVisitor::new(&self.target_function, file_path, source);
        visitor.visit(root);
        let calls = visitor.into_calls();
        debug!(
            "Found {} calls of .{}() in {}",
            calls.len(),
            self.target_function,
            file_path
        );

        Ok(FileScan {
            path: file_path.to_string(),
            calls,
            syntax_errors,
        })
    }
}
