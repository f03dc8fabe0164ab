use crate::context::{contains_variable, CallContext};
use crate::Result;
use csv::{QuoteStyle, WriterBuilder};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DATABASE_PLACEHOLDER: &str = "---possible db value---";
pub const VIEW_PLACEHOLDER: &str = "---possible view value---";

/// A pre-filled curation row for a call that still contains variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub file_path: String,
    pub line: u32,
    pub row: String,
}

impl Suggestion {
    /// Returns `None` when the context has nothing left to curate.
    pub fn for_context(context: &CallContext) -> Option<Self> {
        if !context.has_variables() {
            return None;
        }

        let key = context.key();
        let database_value = if contains_variable(&context.database) {
            DATABASE_PLACEHOLDER
        } else {
            context.database.as_str()
        };
        let view_value = if contains_variable(&context.view) {
            VIEW_PLACEHOLDER
        } else {
            context.view.as_str()
        };

        let row = csv_row(&[
            key.path.as_str(),
            key.class.as_str(),
            key.function.as_str(),
            context.database.as_str(),
            database_value,
            context.view.as_str(),
            view_value,
        ])?;

        Some(Self {
            file_path: context.file_path.clone(),
            line: context.line,
            row,
        })
    }
}

/// One CSV line, quoted the way the curation reader expects, without terminator.
fn csv_row(fields: &[&str]) -> Option<String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    if let Err(e) = writer.write_record(fields) {
        warn!("Failed to format suggestion row: {}", e);
        return None;
    }
    let bytes = match writer.into_inner() {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Failed to format suggestion row: {}", e);
            return None;
        }
    };
    let row = String::from_utf8_lossy(&bytes);
    Some(row.trim_end_matches(&['\r', '\n'][..]).to_string())
}

/// Appends suggestions to a file, creating it on first use. Existing content
/// is never truncated.
pub struct SuggestionFile {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    written: usize,
}

impl SuggestionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
            written: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn append(&mut self, suggestion: &Suggestion) -> Result<()> {
        if self.writer.is_none() {
            debug!("Opening suggestions file {}", self.path.display());
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)?;
            self.writer = Some(BufWriter::new(file));
        }
        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", suggestion.row)?;
            self.written += 1;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{variable, Origin};
    use crate::curation::ManualCuration;

    fn context(database: &str, view: &str) -> CallContext {
        CallContext {
            file_path: "status/samples.py".into(),
            line: 40,
            database: database.into(),
            view: view.into(),
            keyword_arguments: vec![],
            function_scope: Some("get".into()),
            class_scope: None,
            origin: Origin::Detected,
        }
    }

    #[test]
    fn no_suggestion_without_variables() {
        assert!(Suggestion::for_context(&context("samples", "names/by_id")).is_none());
    }

    #[test]
    fn placeholders_only_for_variable_fields() {
        let s = Suggestion::for_context(&context(&variable("db"), "names/by_id")).unwrap();
        assert_eq!(
            s.row,
            "status/samples.py,,get,<variable:db>,---possible db value---,names/by_id,names/by_id"
        );

        let s = Suggestion::for_context(&context("samples", &variable("view"))).unwrap();
        assert_eq!(
            s.row,
            "status/samples.py,,get,samples,samples,<variable:view>,---possible view value---"
        );
    }

    #[test]
    fn rows_with_commas_and_quotes_are_quoted() {
        let mut ctx = context(&variable("get_db(\"x\", y)"), "a/b");
        ctx.file_path = "lims/sync.py".into();
        let s = Suggestion::for_context(&ctx).unwrap();
        assert_eq!(
            s.row,
            "lims/sync.py,,get,\"<variable:get_db(\"\"x\"\", y)>\",---possible db value---,a/b,a/b"
        );
    }

    #[test]
    fn filled_in_suggestions_resolve_the_original_call() {
        let header = "Path,Class,Function,Database_variable_name,Database_variable_value,\
                      View_variable_name,View_variable_value";
        let calls = vec![
            context(&variable("get_db(\"x\", y)"), "a/b"),
            context(&variable("db"), &format!("{},{}", variable("a"), variable("b"))),
        ];

        for ctx in calls {
            let s = Suggestion::for_context(&ctx).unwrap();
            let filled = s
                .row
                .replace(DATABASE_PLACEHOLDER, "projects")
                .replace(VIEW_PLACEHOLDER, "project/summary");
            let data = format!("{}\n{}\n", header, filled);
            let curation = ManualCuration::from_reader(data.as_bytes()).unwrap();

            let resolved = curation.resolve(&ctx);
            assert_eq!(resolved.len(), 1, "row {} did not resolve", s.row);
            assert_eq!(resolved[0].database, "projects");
        }
    }

    #[test]
    fn file_appends_without_truncating() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suggestions.csv");
        std::fs::write(&path, "existing\n").unwrap();

        let mut file = SuggestionFile::new(&path);
        let s = Suggestion::for_context(&context(&variable("db"), &variable("v"))).unwrap();
        file.append(&s).unwrap();
        file.append(&s).unwrap();
        file.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "existing");
        assert_eq!(lines[1], s.row);
        assert_eq!(file.written(), 2);
    }
}
