use ignore::{overrides::OverrideBuilder, WalkBuilder};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use viewmap_core::{Result, ScanConfig, ViewMapError};

/// Directories never worth walking into.
pub const DEFAULT_EXCLUDES: [&str; 6] = [
    "**/.git/**",
    "**/__pycache__/**",
    "**/.pytest_cache/**",
    "**/.venv/**",
    "**/.tox/**",
    "**/node_modules/**",
];

/// Configuration for file collection
#[derive(Debug, Clone)]
pub struct FileCollectionConfig {
    pub extensions: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub respect_ignore_files: bool,
}

impl Default for FileCollectionConfig {
    fn default() -> Self {
        Self::from(&ScanConfig::default())
    }
}

impl From<&ScanConfig> for FileCollectionConfig {
    fn from(scan: &ScanConfig) -> Self {
        Self {
            extensions: scan.extensions.clone(),
            exclude_patterns: scan.exclude_patterns.clone(),
            respect_ignore_files: scan.respect_ignore_files,
        }
    }
}

/// Recursively collect files under `dir` with one of the configured
/// extensions, sorted by path within each directory.
pub fn collect_source_files(dir: &Path, config: &FileCollectionConfig) -> Result<Vec<PathBuf>> {
    info!("Collecting source files from: {}", dir.display());

    let mut ovr = OverrideBuilder::new(dir);
    for exclude in DEFAULT_EXCLUDES
        .iter()
        .copied()
        .chain(config.exclude_patterns.iter().map(String::as_str))
    {
        // Overrides without `!` are whitelists; excludes need the negation.
        let pattern = if exclude.starts_with('!') {
            exclude.to_string()
        } else {
            format!("!{}", exclude)
        };
        ovr.add(&pattern).map_err(|e| {
            ViewMapError::InvalidInput(format!("Invalid exclude pattern '{}': {}", exclude, e))
        })?;
        debug!("Added exclude pattern: {}", pattern);
    }

    let overrides = ovr
        .build()
        .map_err(|e| ViewMapError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    let respect = config.respect_ignore_files;
    let mut walker_builder = WalkBuilder::new(dir);
    walker_builder
        .hidden(false)
        .parents(respect)
        .ignore(respect)
        .git_ignore(respect)
        .git_global(respect)
        .git_exclude(respect)
        .overrides(overrides)
        .sort_by_file_name(|a, b| a.cmp(b));
    debug!("Honouring ignore files: {}", respect);

    let walker = walker_builder.build();

    let extensions: HashSet<&str> = config.extensions.iter().map(String::as_str).collect();
    let mut paths = Vec::new();
    let mut total_files = 0;

    for dent in walker {
        let dent = match dent {
            Ok(d) => d,
            Err(e) => {
                warn!("Walker error: {}", e);
                continue;
            }
        };

        let path = dent.path();
        if !path.is_file() {
            continue;
        }
        total_files += 1;

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if extensions.contains(ext) => paths.push(path.to_path_buf()),
            _ => continue,
        }
    }

    info!(
        "File collection complete: {} files found, {} passed filters",
        total_files,
        paths.len()
    );

    Ok(paths)
}
