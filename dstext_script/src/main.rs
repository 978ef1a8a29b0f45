//! CLI entry point for dstext.
//! Usage: cargo run -p dstext_script -- import Dialogue/ --db dialogue.ron

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use dstext_data::validate_database;
use dstext_script::config::{DEFAULT_CONFIG_FILE, ProjectConfig};
use dstext_script::template::{DEFAULT_NEW_NPC, DEFAULT_NEW_TITLE, new_script};
use dstext_script::{ImportReport, Severity, import_batch, load_database, load_or_new, save_database};
use log::info;

#[derive(Parser)]
#[command(name = "dstext", author, version, about = "Compile dialogue scripts into a dialogue database.")]
struct Cli {
    /// Project config file (defaults to ./dstext.toml when present).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import script files and directories into the database as one batch.
    Import(ImportArgs),
    /// Write a starter script file.
    New(NewArgs),
    /// Check ids and links in an existing database.
    Check(CheckArgs),
}

#[derive(Args)]
struct ImportArgs {
    /// Script files or directories; defaults to the config's `inputs`.
    paths: Vec<PathBuf>,
    /// Database file to update.
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,
    /// Extension of script files picked up from directories.
    #[arg(long, value_name = "EXT")]
    ext: Option<String>,
    /// Import and report without saving the database.
    #[arg(long)]
    dry_run: bool,
    /// Exit with a failure status when any error was reported.
    #[arg(long)]
    strict: bool,
}

#[derive(Args)]
struct NewArgs {
    /// Script file to create.
    path: PathBuf,
    #[arg(long, default_value = DEFAULT_NEW_TITLE)]
    title: String,
    /// Conversant named on the `npc:` line.
    #[arg(long, default_value = DEFAULT_NEW_NPC)]
    npc: String,
}

#[derive(Args)]
struct CheckArgs {
    /// Database file to check.
    #[arg(long, value_name = "FILE")]
    db: Option<PathBuf>,
}

fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let config = ProjectConfig::load(cli.config.as_deref()).context("while loading project config")?;
    match cli.command {
        Commands::Import(args) => run_import(args, config),
        Commands::New(args) => run_new(&args),
        Commands::Check(args) => run_check(args, &config),
    }
}

fn run_import(args: ImportArgs, config: ProjectConfig) -> Result<ExitCode> {
    let db_path = args.db.unwrap_or_else(|| config.database_path());
    let inputs = if args.paths.is_empty() {
        config.inputs
    } else {
        args.paths
    };
    if inputs.is_empty() {
        bail!("nothing to import: pass script paths or set `inputs` in {DEFAULT_CONFIG_FILE}");
    }
    let mut options = config.import;
    if let Some(ext) = args.ext {
        options.extension = ext.trim_start_matches('.').to_string();
    }

    let mut db = load_or_new(&db_path).context("while loading dialogue database")?;
    let report = import_batch(&mut db, &inputs, &options);
    print_report(&report);

    if args.dry_run {
        info!("dry run: '{}' left untouched", db_path.display());
    } else {
        save_database(&db_path, &db).context("while saving dialogue database")?;
    }

    if args.strict && report.has_errors() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &ImportReport) {
    for convo in &report.imported {
        let verb = if convo.replaced { "replaced" } else { "imported" };
        let source = convo
            .file
            .as_ref()
            .map(|f| format!(" <- {}", f.display()))
            .unwrap_or_default();
        println!(
            "{} '{}' (id {}, {} entries){source}",
            verb.green(),
            convo.title,
            convo.id,
            convo.entries
        );
    }
    for diagnostic in &report.diagnostics {
        let label = match diagnostic.severity {
            Severity::Warning => "warning".yellow(),
            Severity::Error => "error".red().bold(),
        };
        eprintln!("{label}: {diagnostic}");
    }
    println!(
        "{} conversations, {} deferred links resolved, {} files skipped, {} errors, {} warnings",
        report.imported.len(),
        report.links_resolved,
        report.skipped.len(),
        report.count(Severity::Error),
        report.count(Severity::Warning)
    );
}

fn run_new(args: &NewArgs) -> Result<ExitCode> {
    if args.path.exists() {
        bail!("'{}' already exists", args.path.display());
    }
    if let Some(parent) = args.path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating '{}'", parent.display()))?;
    }
    fs::write(&args.path, new_script(&args.title, &args.npc))
        .with_context(|| format!("writing '{}'", args.path.display()))?;
    println!("{} '{}'", "created".green(), args.path.display());
    Ok(ExitCode::SUCCESS)
}

fn run_check(args: CheckArgs, config: &ProjectConfig) -> Result<ExitCode> {
    let db_path = args.db.unwrap_or_else(|| config.database_path());
    let db = load_database(&db_path).context("while loading dialogue database")?;
    let errors = validate_database(&db);
    for err in &errors {
        eprintln!("{}: {err}", "error".red().bold());
    }
    if errors.is_empty() {
        println!(
            "{} {} conversations, {} actors",
            "ok".green(),
            db.conversations.len(),
            db.actors.len()
        );
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{} problems in '{}'", errors.len(), db_path.display());
        Ok(ExitCode::FAILURE)
    }
}
