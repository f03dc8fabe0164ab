use clap::Parser;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use viewmap_cli::{analyze, apply_cli_overrides, load_config, run, Cli, EXIT_UNRESOLVED};
use viewmap_core::{normalize_log_level, OutputFormat, ViewMapConfig};

const HANDLERS: &str = r#"class ProjectsHandler(SafeHandler):
    def get(self):
        rows = self.application.projects_db.view("project/summary", descending=True)
        for row in self.application.db.view(view_name):
            pass

def load_flowcell(db, design):
    return db.view(f"{design}/info")
"#;

const CURATION: &str = "# Path,Class,Function,...
Path,Class,Function,Database_variable_name,Database_variable_value,View_variable_name,View_variable_value
{path},ProjectsHandler,get,<variable:db>,samples,<variable:view_name>,names/by_id
{path},ProjectsHandler,get,<variable:db>,samples,<variable:view_name>,names/by_status
";

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let handlers = dir.path().join("src/handlers.py");
        fs::create_dir_all(handlers.parent().unwrap()).unwrap();
        fs::write(&handlers, HANDLERS).unwrap();
        fs::write(
            dir.path().join("curation.csv"),
            CURATION.replace("{path}", &handlers.to_string_lossy()),
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self, relative: &str) -> String {
        self.dir.path().join(relative).to_string_lossy().into_owned()
    }

    fn cli(&self, extra: &[&str]) -> Cli {
        let mut args = vec![
            "viewmap".to_string(),
            "view".to_string(),
            "--dirs".to_string(),
            self.path("src"),
            "--manual-curation".to_string(),
            self.path("curation.csv"),
        ];
        args.extend(extra.iter().map(|s| s.to_string()));
        Cli::try_parse_from(args).unwrap()
    }
}

fn config(cli: &Cli) -> ViewMapConfig {
    apply_cli_overrides(cli, ViewMapConfig::default()).unwrap()
}

#[test]
fn test_python_style_flags_are_accepted() {
    let cli = Cli::try_parse_from([
        "viewmap",
        "view",
        "--files",
        "a.py",
        "b.py",
        "--manual_curation",
        "m.csv",
        "--logging_level",
        "WARNING",
    ])
    .unwrap();
    assert_eq!(cli.files.len(), 2);
    let config = config(&cli);
    assert_eq!(config.curation.manual_curation, Path::new("m.csv"));
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn test_log_level_names() {
    assert_eq!(normalize_log_level("DEBUG"), "debug");
    assert_eq!(normalize_log_level("CRITICAL"), "error");
    assert_eq!(normalize_log_level("info"), "info");
}

#[test]
fn test_config_file_is_layered_under_flags() {
    let fixture = Fixture::new();
    let config_path = fixture.path("viewmap.toml");
    fs::write(
        &config_path,
        "[logging]\nlevel = \"warning\"\n\n[output]\nformat = \"tsv\"\n",
    )
    .unwrap();
    let cli = fixture.cli(&["--config", config_path.as_str(), "--format", "json"]);

    let (manager, config) = load_config(&cli).unwrap();
    assert_eq!(manager.config_path(), Some(Path::new(config_path.as_str())));
    assert_eq!(manager.config().output.format, OutputFormat::Tsv);
    assert_eq!(config.output.format, OutputFormat::Json);
    assert_eq!(config.logging.level, "warn");
    assert!(!manager.messages().is_empty());
}

#[test]
fn test_invalid_log_level_is_rejected() {
    let cli = Cli::try_parse_from(["viewmap", "view", "--files", "a.py", "--log-level", "LOUD"])
        .unwrap();
    assert!(apply_cli_overrides(&cli, ViewMapConfig::default()).is_err());
}

#[test]
fn test_target_function_is_required() {
    assert!(Cli::try_parse_from(["viewmap", "--files", "a.py"]).is_err());
}

#[test]
fn test_curation_resolves_variables() {
    let fixture = Fixture::new();
    let cli = fixture.cli(&[]);
    let report = analyze(&cli, &config(&cli)).unwrap();

    let resolved: Vec<_> = report
        .resolved
        .iter()
        .map(|c| (c.line, c.database.as_str(), c.view.as_str()))
        .collect();
    assert_eq!(
        resolved,
        vec![
            (3, "projects_db", "project/summary"),
            (4, "samples", "names/by_id"),
            (4, "samples", "names/by_status"),
        ]
    );
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].view, "<variable:design>/info");
    assert_eq!(report.summary.files_scanned, 1);
}

#[test]
fn test_csv_report_and_suggestions_file() {
    let fixture = Fixture::new();
    let output = fixture.path("report.csv");
    let suggestions = fixture.path("suggestions.csv");
    let cli = fixture.cli(&[
        "--format",
        "csv",
        "--output",
        &output,
        "--suggestions-file",
        &suggestions,
    ]);

    let code = run(&cli, &config(&cli)).unwrap();
    assert_eq!(code, 0);

    let report = fs::read_to_string(&output).unwrap();
    let lines: Vec<_> = report.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[1].ends_with(",3,ProjectsHandler,get,projects_db,project/summary,descending,detected"));
    assert!(lines[3].ends_with(",samples,names/by_status,,curated"));

    let suggested = fs::read_to_string(&suggestions).unwrap();
    assert!(suggested.ends_with(
        ",,load_flowcell,<variable:db>,---possible db value---,<variable:design>/info,---possible view value---\n"
    ));
}

#[test]
fn test_fail_on_unresolved_sets_exit_code() {
    let fixture = Fixture::new();
    let output = fixture.path("report.json");
    let cli = fixture.cli(&["--format", "json", "-o", &output, "--fail-on-unresolved"]);
    let config = config(&cli);
    assert_eq!(config.output.format, OutputFormat::Json);

    assert_eq!(run(&cli, &config).unwrap(), EXIT_UNRESOLVED);
    let json = fs::read_to_string(&output).unwrap();
    assert!(json.contains("\"unresolved\": 1"));
}

#[test]
fn test_dot_report() {
    let fixture = Fixture::new();
    let output = fixture.path("usage.dot");
    let cli = fixture.cli(&["--format", "dot", "--output", &output]);
    run(&cli, &config(&cli)).unwrap();

    let dot = fs::read_to_string(&output).unwrap();
    assert!(dot.starts_with("digraph viewmap {"));
    assert!(dot.contains("\"samples/names/by_id\" [shape=ellipse];"));
    assert!(dot.contains("ProjectsHandler.get\" -> \"samples/names/by_id\";"));
}

#[test]
fn test_missing_directory_fails() {
    let fixture = Fixture::new();
    let missing = fixture.path("nowhere");
    let cli = Cli::try_parse_from(["viewmap", "view", "--dirs", missing.as_str()]).unwrap();
    assert!(analyze(&cli, &config(&cli)).is_err());
}
