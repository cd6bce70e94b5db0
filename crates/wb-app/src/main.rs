//! Command line entry point

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{filter::LevelFilter, EnvFilter};

use wb_app::{AppConfig, ExportArtifact, JoinOptions, ReportBuilder, ReportChart, StorageBackend, WorkbenchSession};
use wb_core::ExportScope;
use wb_transform::KeepPolicy;
use wb_views::{ExportFormat, SearchScope};

#[derive(Parser)]
#[command(name = "workbench")]
#[command(about = "SecOps Workbench - clean, annotate and summarise phishing-simulation exports", long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Storage for notes and presets: memory, json:<path> or sqlite:<path>
    #[arg(long, global = true)]
    store: Option<StorageBackend>,

    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct LoadArgs {
    /// CSV or spreadsheet file
    file: PathBuf,

    /// Preset to apply after loading
    #[arg(long)]
    preset: Option<String>,

    /// Keep only rows containing this text
    #[arg(long)]
    search: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// csv, xlsx or html
    #[arg(long, default_value = "csv", value_parser = parse_format)]
    format: ExportFormat,

    /// Output file; text formats go to stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the first rows of a file
    Inspect {
        #[command(flatten)]
        load: LoadArgs,

        /// Number of rows to print
        #[arg(long)]
        rows: Option<usize>,
    },

    /// Group and count one column
    Summary {
        #[command(flatten)]
        load: LoadArgs,

        /// Column key or display name
        column: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Export the projected dataset
    Export {
        #[command(flatten)]
        load: LoadArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Export only filtered rows in sort order
        #[arg(long)]
        filtered: bool,

        /// Remove duplicate rows by this column
        #[arg(long)]
        dedup: Option<String>,

        /// Keep the last duplicate instead of the first
        #[arg(long, requires = "dedup")]
        keep_last: bool,
    },

    /// Add columns from a lookup file and export the result
    Join {
        #[command(flatten)]
        load: LoadArgs,

        /// Lookup file
        lookup: PathBuf,

        #[arg(long)]
        local_key: String,

        #[arg(long)]
        lookup_key: String,

        /// Lookup column to copy; repeat for several
        #[arg(long = "column", required = true)]
        columns: Vec<String>,

        #[arg(long, default_value = "")]
        fallback: String,

        #[arg(long)]
        case_sensitive: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Build an HTML report with one chart per column
    Report {
        #[command(flatten)]
        load: LoadArgs,

        /// Column to chart; repeat for several
        #[arg(long = "chart", required = true)]
        charts: Vec<String>,

        #[arg(long, default_value = "Workbench report")]
        title: String,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Manage presets
    Presets {
        #[command(subcommand)]
        command: PresetCommands,
    },

    /// Save a status note for a person and campaign
    Annotate {
        person: String,
        campaign: String,
        note: String,
    },
}

#[derive(Subcommand)]
enum PresetCommands {
    /// List built-in and saved presets
    List,
    /// Print a preset as JSON
    Show { id: String },
    /// Save a preset from a JSON file
    Import { file: PathBuf },
    /// Delete a saved preset
    Delete { id: String },
}

fn parse_format(value: &str) -> Result<ExportFormat, String> {
    value.parse().map_err(|e: wb_views::ExportError| e.to_string())
}

fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    if let Some(store) = cli.store {
        config.storage = store;
    }
    info!(storage = %config.storage, "Starting workbench");

    let mut session = WorkbenchSession::new(&config);

    match cli.command {
        Commands::Inspect { load, rows } => {
            load_file(&mut session, &load).await?;
            let Some(preview) = session.preview() else {
                bail!("No dataset loaded");
            };
            let limit = rows.unwrap_or(preview.cells.len());
            println!("{}", preview.headers.join("\t"));
            for row in preview.cells.iter().take(limit) {
                println!("{}", row.join("\t"));
            }
            println!("{}", preview.caption);
        }

        Commands::Summary { load, column, output } => {
            load_file(&mut session, &load).await?;
            check(session.run_summary(&column))?;
            let artifact = session.export_summary(output.format)?;
            write_artifact(&artifact, output.out.as_deref())?;
        }

        Commands::Export {
            load,
            output,
            filtered,
            dedup,
            keep_last,
        } => {
            load_file(&mut session, &load).await?;
            if let Some(column) = dedup {
                let policy = if keep_last { KeepPolicy::Last } else { KeepPolicy::First };
                check(session.deduplicate(&column, policy))?;
            }
            if filtered {
                session.set_export_scope(ExportScope::FilteredView);
            }
            let artifact = session.export_view(output.format)?;
            write_artifact(&artifact, output.out.as_deref())?;
        }

        Commands::Join {
            load,
            lookup,
            local_key,
            lookup_key,
            columns,
            fallback,
            case_sensitive,
            output,
        } => {
            load_file(&mut session, &load).await?;
            let options = JoinOptions {
                local_key,
                lookup_key,
                columns,
                case_sensitive,
                fallback,
            };
            check(session.join_lookup(&lookup, &options).await)?;
            let artifact = session.export_view(output.format)?;
            write_artifact(&artifact, output.out.as_deref())?;
        }

        Commands::Report {
            load,
            charts,
            title,
            out,
        } => {
            load_file(&mut session, &load).await?;
            let builder = charts
                .iter()
                .fold(ReportBuilder::new(&session).title(title), |builder, column| {
                    builder.chart(ReportChart::bar(column.as_str(), column.as_str()))
                });
            let Some(html) = builder.build() else {
                bail!("No dataset loaded");
            };
            match out {
                Some(path) => write_file(&path, html.as_bytes())?,
                None => print!("{}", html),
            }
        }

        Commands::Presets { command } => run_presets(&mut session, command)?,

        Commands::Annotate {
            person,
            campaign,
            note,
        } => {
            let status = check(session.annotate(&person, &campaign, &note))?;
            println!("{}", status);
        }
    }

    Ok(())
}

fn run_presets(session: &mut WorkbenchSession, command: PresetCommands) -> Result<()> {
    match command {
        PresetCommands::List => {
            for preset in session.presets().list() {
                let kind = if preset.is_user_preset { "saved" } else { "built-in" };
                println!("{}\t{}\t{}", preset.id, preset.label, kind);
            }
        }
        PresetCommands::Show { id } => {
            println!("{}", session.presets().export_document(&id)?);
        }
        PresetCommands::Import { file } => {
            let json = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read preset file {}", file.display()))?;
            let id = session.presets_mut().import_document(&json)?;
            println!("Saved preset {}", id);
        }
        PresetCommands::Delete { id } => {
            if session.presets_mut().delete_user_preset(&id)? {
                println!("Deleted preset {}", id);
            } else {
                println!("No saved preset {}", id);
            }
        }
    }
    Ok(())
}

async fn load_file(session: &mut WorkbenchSession, args: &LoadArgs) -> Result<()> {
    let status = check(session.load_path(&args.file).await)?;
    eprintln!("{}", status);

    if let Some(id) = &args.preset {
        eprintln!("{}", check(session.apply_preset(id))?);
    }
    if let Some(text) = &args.search {
        session.set_search(text, SearchScope::All);
    }
    Ok(())
}

fn check(status: wb_app::OperationStatus) -> Result<wb_app::OperationStatus> {
    if !status.ok {
        bail!("{}", status.message);
    }
    Ok(status)
}

fn write_artifact(artifact: &ExportArtifact, out: Option<&Path>) -> Result<()> {
    match (out, artifact.format) {
        (Some(path), _) => write_file(path, &artifact.bytes),
        (None, ExportFormat::Xlsx) => write_file(Path::new(&artifact.file_name), &artifact.bytes),
        (None, _) => {
            std::io::stdout()
                .write_all(&artifact.bytes)
                .context("Failed to write to stdout")?;
            Ok(())
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    eprintln!("Wrote {}", path.display());
    Ok(())
}
