use crate::context::CallContext;
use crate::curation::ManualCuration;
use crate::suggestion::{Suggestion, SuggestionFile};
use crate::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Calls extracted from one source file, in source order.
#[derive(Debug, Clone, Default)]
pub struct FileScan {
    pub path: String,
    pub calls: Vec<CallContext>,
    pub syntax_errors: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub files_with_syntax_errors: usize,
    pub resolved: usize,
    pub unresolved: usize,
}

/// Outcome of classifying every detected call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub resolved: Vec<CallContext>,
    pub unresolved: Vec<CallContext>,
    #[serde(skip)]
    pub suggestions: Vec<Suggestion>,
    pub summary: ScanSummary,
}

impl ScanReport {
    pub fn has_unresolved(&self) -> bool {
        !self.unresolved.is_empty()
    }
}

/// Applies manual curation to detected calls and collects suggestions for
/// the calls curation cannot resolve.
pub struct Analyzer<'a> {
    curation: &'a ManualCuration,
    suggestions_file: Option<SuggestionFile>,
}

impl<'a> Analyzer<'a> {
    pub fn new(curation: &'a ManualCuration) -> Self {
        Self {
            curation,
            suggestions_file: None,
        }
    }

    pub fn with_suggestions_file(mut self, file: SuggestionFile) -> Self {
        self.suggestions_file = Some(file);
        self
    }

    pub fn analyze<I>(mut self, scans: I, files_skipped: usize) -> Result<ScanReport>
    where
        I: IntoIterator<Item = FileScan>,
    {
        let mut report = ScanReport::default();
        report.summary.files_skipped = files_skipped;

        for scan in scans {
            report.summary.files_scanned += 1;
            if scan.syntax_errors {
                report.summary.files_with_syntax_errors += 1;
            }
            debug!("{}: {} matching calls", scan.path, scan.calls.len());
            for context in scan.calls {
                self.classify(context, &mut report)?;
            }
        }

        if let Some(file) = self.suggestions_file.as_mut() {
            file.flush()?;
            if file.written() > 0 {
                info!(
                    "Appended {} suggestions to {}",
                    file.written(),
                    file.path().display()
                );
            }
        }

        report.summary.resolved = report.resolved.len();
        report.summary.unresolved = report.unresolved.len();
        info!(
            "Scanned {} files ({} skipped, {} with syntax errors): {} resolved, {} unresolved",
            report.summary.files_scanned,
            report.summary.files_skipped,
            report.summary.files_with_syntax_errors,
            report.summary.resolved,
            report.summary.unresolved
        );
        Ok(report)
    }

    fn classify(&mut self, context: CallContext, report: &mut ScanReport) -> Result<()> {
        let curated = self.curation.resolve(&context);
        if !curated.is_empty() {
            report.resolved.extend(curated);
            return Ok(());
        }

        match Suggestion::for_context(&context) {
            Some(suggestion) => {
                warn!(
                    "Variable found in context {}:{} without matching manual curation, \
                     please add line(s) to manual curation on the following form:\n\t{}",
                    context.file_path, context.line, suggestion.row
                );
                if let Some(file) = self.suggestions_file.as_mut() {
                    file.append(&suggestion)?;
                }
                report.suggestions.push(suggestion);
                report.unresolved.push(context);
            }
            None => report.resolved.push(context),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{variable, Origin};

    fn call(line: u32, database: &str, view: &str) -> CallContext {
        CallContext {
            file_path: "lims/sync.py".into(),
            line,
            database: database.into(),
            view: view.into(),
            keyword_arguments: vec![],
            function_scope: Some("run".into()),
            class_scope: None,
            origin: Origin::Detected,
        }
    }

    fn curation() -> ManualCuration {
        let data = "Path,Class,Function,Database_variable_name,Database_variable_value,View_variable_name,View_variable_value\n\
                    lims/sync.py,,run,<variable:db>,projects,project/id,project/id\n";
        ManualCuration::from_reader(data.as_bytes()).unwrap()
    }

    #[test]
    fn classifies_curated_plain_and_unresolved_calls() {
        let curation = curation();
        let scan = FileScan {
            path: "lims/sync.py".into(),
            calls: vec![
                call(1, &variable("db"), "project/id"),
                call(2, "samples", "names/by_id"),
                call(3, &variable("other"), "project/id"),
            ],
            syntax_errors: false,
        };

        let report = Analyzer::new(&curation).analyze(vec![scan], 1).unwrap();

        assert_eq!(report.resolved.len(), 2);
        assert_eq!(report.resolved[0].database, "projects");
        assert_eq!(report.resolved[0].origin, Origin::Curated);
        assert_eq!(report.resolved[1].database, "samples");
        assert_eq!(report.unresolved.len(), 1);
        assert_eq!(report.unresolved[0].line, 3);
        assert_eq!(report.suggestions.len(), 1);
        assert_eq!(
            report.summary,
            ScanSummary {
                files_scanned: 1,
                files_skipped: 1,
                files_with_syntax_errors: 0,
                resolved: 2,
                unresolved: 1
            }
        );
    }

    #[test]
    fn files_with_syntax_errors_are_counted() {
        let curation = ManualCuration::empty();
        let scans = vec![
            FileScan {
                path: "lims/broken.py".into(),
                calls: vec![call(2, "samples", "names/by_id")],
                syntax_errors: true,
            },
            FileScan {
                path: "lims/sync.py".into(),
                calls: vec![],
                syntax_errors: false,
            },
        ];

        let report = Analyzer::new(&curation).analyze(scans, 0).unwrap();

        assert_eq!(report.summary.files_scanned, 2);
        assert_eq!(report.summary.files_with_syntax_errors, 1);
        assert_eq!(report.resolved.len(), 1);
    }

    #[test]
    fn suggestions_are_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("suggest.csv");
        let curation = ManualCuration::empty();
        let scan = FileScan {
            path: "lims/sync.py".into(),
            calls: vec![call(7, &variable("db"), &variable("view"))],
            syntax_errors: false,
        };

        let report = Analyzer::new(&curation)
            .with_suggestions_file(SuggestionFile::new(&path))
            .analyze(vec![scan], 0)
            .unwrap();

        assert!(report.has_unresolved());
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "lims/sync.py,,run,<variable:db>,---possible db value---,<variable:view>,---possible view value---\n"
        );
    }
}
