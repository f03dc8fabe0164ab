use crate::analysis::ScanReport;
use crate::context::CallContext;
use crate::graph::UsageGraph;
use crate::{Result, ViewMapError};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use tracing::debug;

pub const TABLE_HEADER: [&str; 8] = [
    "path",
    "line",
    "class",
    "function",
    "database",
    "view",
    "keyword_arguments",
    "origin",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Csv,
    Tsv,
    Json,
    Dot,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Text,
        OutputFormat::Csv,
        OutputFormat::Tsv,
        OutputFormat::Json,
        OutputFormat::Dot,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
            OutputFormat::Dot => "dot",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ViewMapError;

    fn from_str(s: &str) -> Result<Self> {
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                ViewMapError::InvalidInput(format!(
                    "Unknown output format: {}. Must be one of: text, csv, tsv, json, dot",
                    s
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub format: OutputFormat,
    /// Also list calls that still contain variables (text, csv and tsv only;
    /// json always carries both lists).
    pub include_unresolved: bool,
}

pub struct ReportWriter {
    options: ReportOptions,
}

impl ReportWriter {
    pub fn new(options: ReportOptions) -> Self {
        Self { options }
    }

    pub fn write<W: Write>(&self, report: &ScanReport, mut out: W) -> Result<()> {
        match self.options.format {
            OutputFormat::Text => {
                for context in self.rows(report) {
                    writeln!(out, "{}", context.describe())?;
                }
            }
            OutputFormat::Csv => self.write_table(report, b',', out)?,
            OutputFormat::Tsv => self.write_table(report, b'\t', out)?,
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut out, report)?;
                writeln!(out)?;
            }
            OutputFormat::Dot => {
                let graph = UsageGraph::from_contexts(&report.resolved);
                debug!(
                    "Usage graph: {} nodes, {} edges",
                    graph.node_count(),
                    graph.edge_count()
                );
                out.write_all(graph.to_dot().as_bytes())?;
            }
        }
        Ok(())
    }

    pub fn render(&self, report: &ScanReport) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(report, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| ViewMapError::InvalidInput(e.to_string()))
    }

    fn rows<'r>(&self, report: &'r ScanReport) -> impl Iterator<Item = &'r CallContext> {
        let unresolved: &[CallContext] = if self.options.include_unresolved {
            &report.unresolved
        } else {
            &[]
        };
        report.resolved.iter().chain(unresolved.iter())
    }

    fn write_table<W: Write>(&self, report: &ScanReport, delimiter: u8, out: W) -> Result<()> {
        let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(out);
        writer.write_record(TABLE_HEADER).map_err(csv_error)?;

        for context in self.rows(report) {
            let line = context.line.to_string();
            let keywords = context.keyword_arguments.join(";");
            let origin = context.origin.to_string();
            writer
                .write_record([
                    context.file_path.as_str(),
                    line.as_str(),
                    context.class_scope.as_deref().unwrap_or(""),
                    context.function_scope.as_deref().unwrap_or(""),
                    context.database.as_str(),
                    context.view.as_str(),
                    keywords.as_str(),
                    origin.as_str(),
                ])
                .map_err(csv_error)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> ViewMapError {
    ViewMapError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
}
