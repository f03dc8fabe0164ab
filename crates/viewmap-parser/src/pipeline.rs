use crate::{collect_source_files, is_python_file, CallScanner, FileCollectionConfig};
use rayon::prelude::*;
use std::path::PathBuf;
use tracing::{debug, info};
use viewmap_core::{FileScan, Result, ViewMapError};

/// What to scan and how.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub target_function: String,
    /// Scanned as given, whatever their extension.
    pub files: Vec<PathBuf>,
    /// Walked recursively for files with a configured extension.
    pub dirs: Vec<PathBuf>,
    pub collection: FileCollectionConfig,
    /// Parser threads; 0 uses the global rayon pool.
    pub threads: usize,
}

impl ScanRequest {
    pub fn new(target_function: impl Into<String>) -> Self {
        Self {
            target_function: target_function.into(),
            files: Vec::new(),
            dirs: Vec::new(),
            collection: FileCollectionConfig::default(),
            threads: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Per-file results in input order.
#[derive(Debug, Default)]
pub struct ScanOutput {
    pub scans: Vec<FileScan>,
    pub skipped: Vec<SkippedFile>,
}

/// Explicit files first, then the contents of each directory.
pub fn resolve_inputs(request: &ScanRequest) -> Result<Vec<PathBuf>> {
    if request.files.is_empty() && request.dirs.is_empty() {
        return Err(ViewMapError::InvalidInput(
            "Nothing to scan: give at least one file or directory".to_string(),
        ));
    }

    let mut inputs = Vec::new();
    for file in &request.files {
        if !file.is_file() {
            return Err(ViewMapError::InvalidInput(format!(
                "File not found: {}",
                file.display()
            )));
        }
        if !is_python_file(&file.to_string_lossy()) {
            debug!("Scanning {} although it has no Python extension", file.display());
        }
        inputs.push(file.clone());
    }

    for dir in &request.dirs {
        if !dir.is_dir() {
            return Err(ViewMapError::InvalidInput(format!(
                "Directory not found: {}",
                dir.display()
            )));
        }
        inputs.extend(collect_source_files(dir, &request.collection)?);
    }

    Ok(inputs)
}

/// Parse every input in parallel. Unreadable files are returned as skipped,
/// with the reason, rather than failing the scan.
pub fn scan(request: &ScanRequest) -> Result<ScanOutput> {
    // Surfaces grammar and target errors once instead of per file.
    CallScanner::new(request.target_function.as_str())?;

    let inputs = resolve_inputs(request)?;
    info!(
        "Scanning {} files for .{}() calls",
        inputs.len(),
        request.target_function
    );

    let results = if request.threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(request.threads)
            .build()
            .map_err(|e| ViewMapError::InvalidInput(format!("Failed to build thread pool: {}", e)))?;
        pool.install(|| scan_all(&inputs, &request.target_function))
    } else {
        scan_all(&inputs, &request.target_function)
    };

    let mut output = ScanOutput::default();
    for (path, result) in inputs.into_iter().zip(results) {
        match result {
            Ok(scan) => output.scans.push(scan),
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                output.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(output)
}

fn scan_all(inputs: &[PathBuf], target_function: &str) -> Vec<Result<FileScan>> {
    inputs
        .par_iter()
        .map_init(
            || CallScanner::new(target_function),
            |scanner, path| match scanner {
                Ok(scanner) => scanner.scan_file(path),
                Err(e) => Err(ViewMapError::Parse(e.to_string())),
            },
        )
        .collect()
}
