use std::path::PathBuf;

use academic_reports::db::{self, PgRecordSource};
use academic_reports::filter::RawFilter;
use academic_reports::models::RecordKind;
use academic_reports::report;
use academic_reports::{
    AppConfig, ExportFormat, ExportOptions, FileExporter, FilterSpec, Generation, ReportKind,
    ReportOrchestrator,
};
use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "academic-reports")]
#[command(
    about = "Grade, attendance and participation analytics with exportable reports",
    long_about = None
)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    #[arg(long)]
    course: Option<String>,
    #[arg(long)]
    subject: Option<String>,
    #[arg(long)]
    student: Option<String>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Attendance status or participation type
    #[arg(long)]
    selector: Option<String>,
    #[arg(long)]
    min_score: Option<f64>,
    #[arg(long)]
    max_score: Option<f64>,
}

impl FilterArgs {
    fn to_spec(&self) -> FilterSpec {
        FilterSpec::from_raw(&RawFilter {
            course: self.course.as_deref(),
            subject: self.subject.as_deref(),
            student: self.student.as_deref(),
            from: self.from,
            to: self.to,
            selector: self.selector.as_deref(),
            min_score: self.min_score,
            max_score: self.max_score,
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import records from a CSV file
    Import {
        #[arg(long, value_enum)]
        kind: RecordKind,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print a report summary
    Summary {
        #[arg(long, value_enum)]
        kind: ReportKind,
        #[command(flatten)]
        filter: FilterArgs,
        /// Print JSON instead of Markdown
        #[arg(long)]
        json: bool,
    },
    /// Export report rows to a file
    Export {
        #[arg(long, value_enum)]
        kind: ReportKind,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, value_enum, default_value = "delimited-text")]
        format: ExportFormat,
        /// Include the remarks column
        #[arg(long)]
        remarks: bool,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config =
        AppConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL must be set to a production Postgres instance")?;
    let pool = db::connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await.context("failed to run migrations")?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await.context("failed to insert seed data")?;
            println!("Seed data inserted.");
        }
        Commands::Import { kind, csv } => {
            let inserted = db::import_csv(&pool, kind, &csv)
                .await
                .with_context(|| format!("failed to import {}", csv.display()))?;
            println!("Inserted {inserted} records from {}.", csv.display());
        }
        Commands::Summary { kind, filter, json } => {
            let spec = filter.to_spec();
            let orchestrator =
                ReportOrchestrator::new(PgRecordSource::new(pool), kind, config.reporting);
            let summary = match orchestrator.generate_summary(&spec).await? {
                Generation::Current(summary) => summary,
                Generation::Superseded { ticket } => {
                    anyhow::bail!("report request {ticket} was superseded")
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                let scope = spec
                    .student
                    .as_deref()
                    .or(spec.course.as_deref());
                print!("{}", report::build_report(kind.title(), scope, &summary));
            }
        }
        Commands::Export {
            kind,
            filter,
            format,
            remarks,
            out_dir,
        } => {
            let spec = filter.to_spec();
            let orchestrator =
                ReportOrchestrator::new(PgRecordSource::new(pool), kind, config.reporting);
            let exporter = FileExporter::new(&out_dir);
            let path = orchestrator
                .export_to(
                    &spec,
                    ExportOptions {
                        include_remarks: remarks,
                    },
                    &exporter,
                    format,
                )
                .await
                .context("failed to export report")?;
            println!("Report written to {}.", path.display());
        }
    }

    Ok(())
}
