use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use student_risk::ingest::BatchReport;
use student_risk::scoring::RandomJitter;
use student_risk::{report, seed, MemoryStore, RiskPolicy, StudentService};

#[derive(Parser)]
#[command(name = "student-risk")]
#[command(about = "Student performance prediction and risk tracker", long_about = None)]
struct Cli {
    /// Student CSV uploads to load before running the command
    #[arg(long = "csv", global = true)]
    csv: Vec<PathBuf>,
    /// Load the built-in sample students first
    #[arg(long, global = true)]
    samples: bool,
    /// Field delimiter used by the uploads
    #[arg(long, global = true, env = "STUDENT_RISK_DELIMITER", default_value_t = ',')]
    delimiter: char,
    /// Seed for the GPA jitter, for reproducible predictions
    #[arg(long, global = true, env = "STUDENT_RISK_RNG_SEED")]
    rng_seed: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the uploads and report accepted rows and row errors
    Import,
    /// List students with their risk level
    List,
    /// Predict grade, GPA and risk for one student
    Predict {
        #[arg(long)]
        id: String,
        #[arg(long)]
        json: bool,
    },
    /// Classify one student's risk
    Risk {
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "factor-count")]
        policy: RiskPolicy,
    },
    /// Suggest interventions for one student
    Recommend {
        #[arg(long)]
        id: String,
    },
    /// Generate a markdown cohort report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

type Loaded = (Arc<StudentService<MemoryStore>>, Vec<(PathBuf, BatchReport)>);

async fn load(cli: &Cli) -> anyhow::Result<Loaded> {
    if !cli.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character");
    }

    let jitter = match cli.rng_seed {
        Some(seed) => RandomJitter::seeded(seed),
        None => RandomJitter::from_entropy(),
    };
    let service = Arc::new(
        StudentService::new(Arc::new(MemoryStore::new()))
            .with_jitter(jitter)
            .with_delimiter(cli.delimiter as u8),
    );

    if cli.samples {
        seed::load_samples(&service)?;
    }

    let handles: Vec<_> = cli
        .csv
        .iter()
        .cloned()
        .map(|path| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                let text = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let report = tokio::task::spawn_blocking(move || service.ingest_batch(&text))
                    .await?
                    .with_context(|| format!("failed to import {}", path.display()))?;
                Ok::<_, anyhow::Error>((path, report))
            })
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        reports.push(handle.await??);
    }

    Ok((service, reports))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("student_risk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (service, reports) = load(&cli).await?;

    match &cli.command {
        Commands::Import => {
            if reports.is_empty() {
                println!("No uploads given.");
            }
            for (path, report) in &reports {
                println!(
                    "Imported {} of {} students from {}.",
                    report.accepted,
                    report.total_rows(),
                    path.display()
                );
                for error in &report.errors {
                    println!("- {error}");
                }
            }
        }
        Commands::List => {
            let students = service.list_with_risk();
            if students.is_empty() {
                println!("No students loaded.");
                return Ok(());
            }
            for (record, assessment) in students {
                println!(
                    "- {} ({}, {}) {} risk, {} points",
                    record.display_name(),
                    record.identifier(),
                    record.fields.grade_level,
                    assessment.tier,
                    assessment.points
                );
            }
        }
        Commands::Predict { id, json } => {
            let prediction = service.assess(id)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&prediction)?);
                return Ok(());
            }

            println!("{} ({})", prediction.student_name, prediction.student_id);
            println!(
                "Predicted grade {} (GPA {:.2}, confidence {:.1}%)",
                prediction.scoring.predicted_grade,
                prediction.scoring.predicted_gpa,
                prediction.scoring.confidence * 100.0
            );
            println!("Composite score {:.2}", prediction.scoring.composite_score);
            println!("Risk level {}", prediction.risk_level);
            println!("Improvement areas:");
            for area in &prediction.improvement_areas {
                println!("- {area}");
            }
            println!("Recommendations:");
            for tip in &prediction.recommendations {
                println!("- {tip}");
            }
        }
        Commands::Risk { id, policy } => {
            let tier = service.classify_risk(id, *policy)?;
            println!("{id}: {tier} risk");
        }
        Commands::Recommend { id } => {
            for tip in service.recommend(id)? {
                println!("- {tip}");
            }
        }
        Commands::Report { out } => {
            let report = report::build_report(&service.list_records());
            std::fs::write(out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
