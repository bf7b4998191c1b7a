/*!
fieldkeep CLI - extract field values from a document before conversion and
restore them into the converted document afterwards.
*/

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use fieldkeep_core::{
    create_default_store, extract_and_backup, observability, restore_from_backup, BackupRecord,
    DocumentContainer, DocxDocument, FieldGroup, PreserveConfig,
};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::{error, info};

/// Values longer than this are cut in `show` output.
const PREVIEW_CHARS: usize = 50;

#[derive(Parser)]
#[command(name = "fieldkeep")]
#[command(about = "Preserve document field values across format conversions")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// JSON config file overriding default paths and reference table settings
    #[arg(short, long, global = true, env = "FIELDKEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract field values from a document into a backup file
    Extract {
        /// Source document
        input: PathBuf,
        /// Backup file (default: <input stem>_bookmark_backup.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Restore backed-up values into a converted document
    Restore {
        /// Backup file written by `extract`
        backup: PathBuf,
        /// Converted document to restore into
        target: PathBuf,
        /// Restored document (default: <target stem>_restored.docx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the contents of a backup file
    Show {
        backup: PathBuf,
    },
    /// Check a restored document for content and the reference table
    Verify {
        document: PathBuf,
    },
}

#[derive(Tabled)]
struct GroupRow {
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Fields")]
    count: usize,
}

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    if cli.json_logs {
        observability::init_observability(true)?;
    } else {
        init_logging(cli.verbose);
    }

    let config = match &cli.config {
        Some(path) => PreserveConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PreserveConfig::default(),
    };

    match &cli.command {
        Commands::Extract { input, output } => extract(input, output.as_deref(), &config)?,
        Commands::Restore {
            backup,
            target,
            output,
        } => restore(backup, target, output.as_deref(), &config)?,
        Commands::Show { backup } => show(backup)?,
        Commands::Verify { document } => verify(document, &config)?,
    }

    if cli.print_metrics {
        print_metrics()?;
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"))
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn extract(input: &Path, output: Option<&Path>, config: &PreserveConfig) -> Result<(), anyhow::Error> {
    if !input.is_file() {
        error!("Input file not found: {}", input.display());
        return Err(anyhow!("input file not found: {}", input.display()));
    }

    let (record, backup_path) = extract_and_backup(input, output, config)?;

    println!("{}", Table::new(group_rows(&record)));
    println!("Backup saved to: {}", backup_path.display());
    Ok(())
}

fn restore(
    backup: &Path,
    target: &Path,
    output: Option<&Path>,
    config: &PreserveConfig,
) -> Result<(), anyhow::Error> {
    if !backup.is_file() {
        error!("Backup file not found: {}", backup.display());
        return Err(anyhow!("backup file not found: {}", backup.display()));
    }
    if !target.is_file() {
        error!("Target document not found: {}", target.display());
        return Err(anyhow!("target document not found: {}", target.display()));
    }

    let report = restore_from_backup(backup, target, output, config)?;

    println!("Restored inline: {}", report.restored);
    println!("Reference table rows: {}", report.reference_rows);
    if let Some(warning) = report.warning() {
        println!("Unmatched fields ({}):", warning.unmatched.len());
        for name in &warning.unmatched {
            println!("  - {name}");
        }
    }
    if let Some(path) = &report.output_path {
        println!("Restored document: {}", path.display());
    }
    Ok(())
}

fn show(backup: &Path) -> Result<(), anyhow::Error> {
    info!("Showing backup: {}", backup.display());
    let record = create_default_store().load(&backup.to_string_lossy())?;

    let source = Path::new(record.file_path())
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| record.file_path().to_string());
    println!("Backup Details:");
    println!("  Source: {source}");
    println!("  Extracted: {}", format_timestamp(&record));
    println!("  Total fields: {}", record.total_fields());

    for group in FieldGroup::ALL {
        let fields = record.group(group);
        if fields.is_empty() {
            continue;
        }
        let rows: Vec<FieldRow> = fields
            .iter()
            .map(|(key, field)| FieldRow {
                key: key.clone(),
                value: if group == FieldGroup::EmptyFields {
                    "[EMPTY FIELD]".to_string()
                } else {
                    preview(&field.value)
                },
            })
            .collect();
        println!("\n{group} ({}):", rows.len());
        println!("{}", Table::new(rows));
    }
    Ok(())
}

fn verify(document: &Path, config: &PreserveConfig) -> Result<(), anyhow::Error> {
    info!("Verifying document: {}", document.display());
    let docx = DocxDocument::open(document)?;

    let paragraphs = docx.paragraphs()?;
    let with_text = paragraphs.iter().filter(|p| !p.trim().is_empty()).count();
    let has_reference = has_reference_heading(&paragraphs, &config.reference.heading);

    println!("Paragraphs with text: {with_text}");
    println!("Tables: {}", docx.tables()?.len());
    if has_reference {
        println!("✓ Reference table present");
    } else {
        println!("✗ Reference table not found");
    }
    Ok(())
}

fn has_reference_heading(paragraphs: &[String], heading: &str) -> bool {
    let heading = heading.trim();
    !heading.is_empty() && paragraphs.iter().any(|p| p.trim() == heading)
}

fn group_rows(record: &BackupRecord) -> Vec<GroupRow> {
    FieldGroup::ALL
        .iter()
        .map(|group| GroupRow {
            group: group.to_string(),
            count: record.group(*group).len(),
        })
        .collect()
}

fn preview(value: &str) -> String {
    if value.chars().count() > PREVIEW_CHARS {
        let cut: String = value.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        value.to_string()
    }
}

fn format_timestamp(record: &BackupRecord) -> String {
    record
        .extraction_time()
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[cfg(feature = "metrics")]
fn print_metrics() -> Result<(), anyhow::Error> {
    let metrics = observability::FieldkeepMetrics::global()
        .ok_or_else(|| anyhow!("metrics registry unavailable"))?;
    print!("{}", metrics.gather_metrics()?);
    Ok(())
}

#[cfg(not(feature = "metrics"))]
fn print_metrics() -> Result<(), anyhow::Error> {
    Err(anyhow!("metrics support not enabled"))
}
