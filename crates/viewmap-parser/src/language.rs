// ABOUTME: Python grammar setup for the call scanner.
// ABOUTME: Builds configured tree-sitter parsers and recognises Python file extensions.
use tree_sitter::Parser;
use viewmap_core::{Result, ViewMapError};

pub const PYTHON_EXTENSIONS: [&str; 2] = ["py", "pyi"];

pub fn python_language() -> tree_sitter::Language {
    tree_sitter_python::LANGUAGE.into()
}

pub fn create_parser() -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&python_language())
        .map_err(|e| ViewMapError::Parse(format!("Failed to load Python grammar: {}", e)))?;
    Ok(parser)
}

pub fn is_python_file(file_path: &str) -> bool {
    std::path::Path::new(file_path)
        .extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| PYTHON_EXTENSIONS.contains(&ext))
}
