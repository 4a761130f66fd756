use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rainbow_tabs_lib::activation::{self, Activation};
use rainbow_tabs_lib::api::ColorPreview;
use rainbow_tabs_lib::palette::{self, Color};
use rainbow_tabs_lib::store::{self, JsonStore};
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "rainbow-tabs",
    author,
    version,
    about = "Preview tab colors and manage the persisted rainbow-tabs activation flag",
    long_about = None
)]
pub struct Cli {
    /// State file to use instead of the default location
    #[arg(long, global = true, value_name = "STATE_FILE")]
    pub state: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Commands {
    /// Print the tab color assigned to each path
    Color {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<String>,

        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Walk a directory and print the color of every file in it
    Scan {
        #[arg(value_name = "DIR")]
        dir: PathBuf,

        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Show whether tab coloring is enabled
    Status,
    /// Enable tab coloring on the next launch
    Enable,
    /// Disable tab coloring on the next launch
    Disable,
}

#[derive(Debug, Serialize)]
struct ColorUsage {
    color: Color,
    count: usize,
}

#[derive(Debug, Serialize)]
struct ScanReport {
    files: Vec<ColorPreview>,
    usage: Vec<ColorUsage>,
    /// Files left out because their path is not valid UTF-8.
    skipped: usize,
}

pub fn run<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    match cli.command {
        Commands::Color { paths, json } => print_colors(&paths, json, out),
        Commands::Scan { dir, json } => scan(&dir, json, out),
        Commands::Status => {
            let store = open_state(cli.state.as_deref())?;
            print_activation(activation::load_activation(&store), out)
        }
        Commands::Enable => set_activation(cli.state.as_deref(), Activation::Active, out),
        Commands::Disable => set_activation(cli.state.as_deref(), Activation::Inactive, out),
    }
}

fn preview(path: String) -> ColorPreview {
    ColorPreview {
        index: palette::index_for_path(&path),
        color: palette::color_for_path(&path),
        path,
    }
}

fn print_colors<W: Write>(paths: &[String], json: bool, out: &mut W) -> Result<()> {
    let previews: Vec<ColorPreview> = paths.iter().cloned().map(preview).collect();

    if json {
        serde_json::to_writer_pretty(&mut *out, &previews)?;
        writeln!(out)?;
        return Ok(());
    }

    for preview in &previews {
        writeln!(out, "{}  {}", preview.color, preview.path)?;
    }
    Ok(())
}

fn scan<W: Write>(dir: &Path, json: bool, out: &mut W) -> Result<()> {
    let root = fs::canonicalize(dir)
        .with_context(|| format!("failed to resolve directory '{}'", dir.display()))?;
    let metadata = fs::metadata(&root)
        .with_context(|| format!("failed to read metadata for '{}'", root.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("'{}' is not a directory", root.display());
    }

    let mut paths = Vec::new();
    let mut skipped = 0;
    for entry in WalkDir::new(&root) {
        let entry = entry
            .with_context(|| format!("failed to walk directory '{}'", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.path().to_str() {
            Some(path) => paths.push(path.to_string()),
            None => {
                warn!(
                    target: "rainbow_tabs::cli",
                    path = %entry.path().display(),
                    "skipping file with non-UTF-8 path"
                );
                skipped += 1;
            }
        }
    }
    paths.sort();

    let files: Vec<ColorPreview> = paths.into_iter().map(preview).collect();

    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for file in &files {
        *counts.entry(file.index).or_default() += 1;
    }
    let usage: Vec<ColorUsage> = counts
        .into_iter()
        .map(|(index, count)| ColorUsage {
            color: palette::palette()[index],
            count,
        })
        .collect();

    info!(
        target: "rainbow_tabs::cli",
        root = %root.display(),
        files = files.len(),
        colors = usage.len(),
        skipped,
        "scan completed"
    );

    let report = ScanReport {
        files,
        usage,
        skipped,
    };

    if json {
        serde_json::to_writer_pretty(&mut *out, &report)?;
        writeln!(out)?;
        return Ok(());
    }

    for file in &report.files {
        writeln!(out, "{}  {}", file.color, file.path)?;
    }
    writeln!(
        out,
        "{} files, {} of {} colors used",
        report.files.len(),
        report.usage.len(),
        palette::palette().len()
    )?;
    if report.skipped > 0 {
        writeln!(out, "{} files skipped (path is not UTF-8)", report.skipped)?;
    }
    Ok(())
}

fn open_state(path: Option<&Path>) -> Result<JsonStore> {
    match path {
        Some(path) => JsonStore::load_from_path(path)
            .with_context(|| format!("failed to load state file '{}'", path.display())),
        None => store::open_state().context("failed to load state file"),
    }
}

fn set_activation<W: Write>(
    path: Option<&Path>,
    activation: Activation,
    out: &mut W,
) -> Result<()> {
    let mut store = open_state(path)?;
    activation::persist_activation(&mut store, activation)
        .context("failed to write state file")?;

    info!(
        target: "rainbow_tabs::cli",
        active = activation.is_active(),
        "activation flag updated"
    );

    print_activation(activation, out)
}

fn print_activation<W: Write>(activation: Activation, out: &mut W) -> Result<()> {
    let label = if activation.is_active() {
        "enabled"
    } else {
        "disabled"
    };
    writeln!(out, "tab coloring {label}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_fs::prelude::*;
    use clap::CommandFactory;

    fn run_to_string(cli: Cli) -> Result<String> {
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(String::from_utf8(out).expect("utf8 output"))
    }

    fn cli(state: Option<PathBuf>, command: Commands) -> Cli {
        Cli { state, command }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn color_prints_palette_entry_per_path() {
        let output = run_to_string(cli(
            None,
            Commands::Color {
                paths: vec!["/tmp/a.rs".into(), "/tmp/b.rs".into()],
                json: false,
            },
        ))
        .expect("run color");

        assert_eq!(output, "#00FF00  /tmp/a.rs\n#FFD700  /tmp/b.rs\n");
    }

    #[test]
    fn color_json_includes_index() {
        let output = run_to_string(cli(
            None,
            Commands::Color {
                paths: vec!["/home/user/project/src/main.ts".into()],
                json: true,
            },
        ))
        .expect("run color");

        let value: serde_json::Value = serde_json::from_str(&output).expect("parse json");
        assert_eq!(value[0]["index"], 24);
        assert_eq!(value[0]["color"], "#FFDEAD");
    }

    #[test]
    fn scan_reports_every_file() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        temp.child("src").create_dir_all().expect("create src");
        temp.child("src/main.rs").write_str("fn main() {}").expect("write main");
        temp.child("src/lib.rs").write_str("").expect("write lib");
        temp.child("Cargo.toml").write_str("[package]").expect("write manifest");

        let output = run_to_string(cli(
            None,
            Commands::Scan {
                dir: temp.path().to_path_buf(),
                json: true,
            },
        ))
        .expect("run scan");

        let value: serde_json::Value = serde_json::from_str(&output).expect("parse json");
        let files = value["files"].as_array().expect("files array");
        assert_eq!(files.len(), 3);

        let counted: u64 = value["usage"]
            .as_array()
            .expect("usage array")
            .iter()
            .map(|usage| usage["count"].as_u64().expect("count"))
            .sum();
        assert_eq!(counted, 3);

        for file in files {
            let path = file["path"].as_str().expect("path");
            assert_eq!(file["color"], palette::color_for_path(path).to_string());
        }
    }

    #[cfg(unix)]
    #[test]
    fn scan_skips_non_utf8_paths() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = assert_fs::TempDir::new().expect("temp dir");
        temp.child("good.rs").write_str("").expect("write good file");
        let bad = temp.path().join(OsStr::from_bytes(b"bad\xff.rs"));
        if fs::write(&bad, "").is_err() {
            // Some filesystems refuse non-UTF-8 names outright.
            return;
        }

        let output = run_to_string(cli(
            None,
            Commands::Scan {
                dir: temp.path().to_path_buf(),
                json: true,
            },
        ))
        .expect("run scan");

        let value: serde_json::Value = serde_json::from_str(&output).expect("parse json");
        let files = value["files"].as_array().expect("files array");
        assert_eq!(files.len(), 1);
        assert!(files[0]["path"]
            .as_str()
            .expect("path")
            .ends_with("good.rs"));
        assert!(!output.contains('\u{FFFD}'));
        assert_eq!(value["skipped"], 1);
    }

    #[test]
    fn scan_errors_when_directory_missing() {
        let temp = assert_fs::TempDir::new().expect("temp dir");

        let result = run_to_string(cli(
            None,
            Commands::Scan {
                dir: temp.child("missing").path().to_path_buf(),
                json: false,
            },
        ));

        assert!(result.is_err(), "expected missing directory error");
    }

    #[test]
    fn status_defaults_to_enabled() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let state = temp.child("state.json");

        let output = run_to_string(cli(Some(state.path().to_path_buf()), Commands::Status))
            .expect("run status");

        assert_eq!(output, "tab coloring enabled\n");
    }

    #[test]
    fn disable_then_status_reports_disabled() {
        let temp = assert_fs::TempDir::new().expect("temp dir");
        let state = temp.child("nested/state.json");
        let state_path = state.path().to_path_buf();

        run_to_string(cli(Some(state_path.clone()), Commands::Disable)).expect("run disable");
        let output =
            run_to_string(cli(Some(state_path.clone()), Commands::Status)).expect("run status");
        assert_eq!(output, "tab coloring disabled\n");

        let contents = fs::read_to_string(&state_path).expect("read state");
        let value: serde_json::Value = serde_json::from_str(&contents).expect("parse state");
        assert_eq!(value[activation::ACTIVATION_KEY], false);

        run_to_string(cli(Some(state_path.clone()), Commands::Enable)).expect("run enable");
        let output = run_to_string(cli(Some(state_path), Commands::Status)).expect("run status");
        assert_eq!(output, "tab coloring enabled\n");
    }
}
