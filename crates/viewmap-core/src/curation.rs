//! Manual curation of variables used as database and view names.
//!
//! A curation file is a CSV with a header row. Each row says: inside this
//! file, class and function, the database variable `Database_variable_name`
//! may hold `Database_variable_value` while the view variable
//! `View_variable_name` holds `View_variable_value`. Several rows may share a
//! scope, in which case one call fans out into several resolved contexts.

use crate::context::{CallContext, ScopeKey};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const COLUMN_PATH: &str = "Path";
pub const COLUMN_CLASS: &str = "Class";
pub const COLUMN_FUNCTION: &str = "Function";
pub const COLUMN_DATABASE_NAME: &str = "Database_variable_name";
pub const COLUMN_DATABASE_VALUE: &str = "Database_variable_value";
pub const COLUMN_VIEW_NAME: &str = "View_variable_name";
pub const COLUMN_VIEW_VALUE: &str = "View_variable_value";

const REQUIRED_COLUMNS: [&str; 7] = [
    COLUMN_PATH,
    COLUMN_CLASS,
    COLUMN_FUNCTION,
    COLUMN_DATABASE_NAME,
    COLUMN_DATABASE_VALUE,
    COLUMN_VIEW_NAME,
    COLUMN_VIEW_VALUE,
];

#[derive(Error, Debug)]
pub enum CurationError {
    #[error("Failed to read curation file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed curation data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Curation file is missing required column '{0}'")]
    MissingColumn(String),
}

/// One curated mapping for a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurationEntry {
    pub database_name: String,
    pub database_value: String,
    pub view_name: String,
    pub view_value: String,
}

impl CurationEntry {
    fn matches(&self, context: &CallContext) -> bool {
        self.database_name == context.database && self.view_name == context.view
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManualCuration {
    source: Option<PathBuf>,
    entries: HashMap<ScopeKey, Vec<CurationEntry>>,
    rows: usize,
}

/// Column positions resolved from the header row.
struct Columns([usize; 7]);

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, CurationError> {
        let mut positions = [0usize; 7];
        for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| CurationError::MissingColumn(name.to_string()))?;
        }
        Ok(Self(positions))
    }

    fn cell<'r>(&self, record: &'r StringRecord, column: usize) -> &'r str {
        record.get(self.0[column]).unwrap_or("")
    }
}

impl ManualCuration {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load the curation file at `path`. A missing file yields an empty
    /// curation so that a default path does not have to exist.
    pub fn load(path: &Path) -> Result<Self, CurationError> {
        if !path.exists() {
            warn!(
                "Manual curation file {} not found, continuing without curation",
                path.display()
            );
            return Ok(Self::empty());
        }
        Self::from_path(path)
    }

    pub fn from_path(path: &Path) -> Result<Self, CurationError> {
        debug!("Parsing manual curation file {}", path.display());
        let file = std::fs::File::open(path).map_err(|source| CurationError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut curation = Self::from_reader(file)?;
        curation.source = Some(path.to_path_buf());
        info!(
            "Loaded {} manual curation rows for {} scopes from {}",
            curation.rows,
            curation.entries.len(),
            path.display()
        );
        Ok(curation)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CurationError> {
        let mut csv_reader = ReaderBuilder::new()
            .has_headers(true)
            .comment(Some(b'#'))
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let columns = Columns::from_headers(csv_reader.headers()?)?;
        let mut curation = Self::empty();

        for record in csv_reader.records() {
            let record = record?;
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            let key = ScopeKey::new(
                columns.cell(&record, 0),
                columns.cell(&record, 1),
                columns.cell(&record, 2),
            );
            let entry = CurationEntry {
                database_name: columns.cell(&record, 3).to_string(),
                database_value: columns.cell(&record, 4).to_string(),
                view_name: columns.cell(&record, 5).to_string(),
                view_value: columns.cell(&record, 6).to_string(),
            };
            curation.entries.entry(key).or_default().push(entry);
            curation.rows += 1;
        }

        Ok(curation)
    }

    /// All contexts that manual curation derives from `context`.
    pub fn resolve(&self, context: &CallContext) -> Vec<CallContext> {
        let Some(entries) = self.entries.get(&context.key()) else {
            return Vec::new();
        };

        entries
            .iter()
            .filter(|entry| entry.matches(context))
            .map(|entry| {
                debug!(
                    "Creating context from manual curation: {} -> {}, {} -> {}",
                    entry.database_name, entry.database_value, entry.view_name, entry.view_value
                );
                context.with_resolution(&entry.database_value, &entry.view_value)
            })
            .collect()
    }

    pub fn entries_for(&self, key: &ScopeKey) -> &[CurationEntry] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Number of curation rows loaded.
    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }
}
