use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod backend;
mod chart;
mod client;
mod config;
mod error;
mod export;
mod forecast;
mod models;
mod page;
mod report;
mod status;
mod summary;
#[cfg(test)]
mod testing;

use crate::client::HttpPredictionClient;
use crate::config::Config;
use crate::models::{NavigationState, SurveyRecord};
use crate::page::ResultPage;

#[derive(Parser)]
#[command(name = "aims-result")]
#[command(about = "AIMS survey results with multi-horizon severity forecasts", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the result page for a patient and survey
    Show {
        /// JSON file with `patient` and `survey` objects
        #[arg(long)]
        state: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Print the forecast trajectory for a survey
    Forecast {
        /// JSON file with a survey record
        #[arg(long)]
        survey: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Download the PDF report for a patient and survey
    ExportPdf {
        #[arg(long)]
        state: PathBuf,
        /// PNG to embed instead of the rendered AIRS trend chart
        #[arg(long)]
        chart: Option<PathBuf>,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Load a stored patient and survey from the backend
    Lookup {
        #[arg(long)]
        patient_id: String,
        /// Write the result as a state file usable by `show`
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Search previous surveys by patient name
    Search {
        #[arg(long)]
        keyword: String,
    },
    /// Forecast every survey in a CSV file and write a markdown report
    Batch {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "forecast-report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config;
    let http = config.http_client().context("failed to build HTTP client")?;

    match cli.command {
        Commands::Show { state, out } => {
            let Some(page) = open_page(&state)? else {
                println!("{}", page::MISSING_DATA);
                return Ok(());
            };
            let (forecast, payload) = page
                .run_forecast(HttpPredictionClient::new(http), config.base_url())
                .await;
            let rendered = page.render(&forecast, payload.as_ref());
            match out {
                Some(out) => {
                    std::fs::write(&out, rendered)?;
                    println!("Result page written to {}.", out.display());
                }
                None => print!("{rendered}"),
            }
        }
        Commands::Forecast { survey, json } => {
            let survey: SurveyRecord = read_json(&survey)?;
            survey.validate()?;
            let client = HttpPredictionClient::new(http);
            let result = forecast::aggregate(&client, config.base_url(), &survey)
                .await
                .context("forecast failed")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", chart::forecast_bars(&result.points));
            }
        }
        Commands::ExportPdf {
            state,
            chart,
            out_dir,
        } => {
            let Some(page) = open_page(&state)? else {
                println!("{}", page::MISSING_DATA);
                return Ok(());
            };
            let png = match chart {
                Some(path) => std::fs::read(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => chart::render_airs_png(&page.survey)?,
            };
            let path = export::export_pdf(
                &http,
                config.base_url(),
                &page.patient,
                &page.survey,
                &png,
                &out_dir,
            )
            .await
            .context("PDF download failed")?;
            println!("Saved {}.", path.display());
        }
        Commands::Lookup { patient_id, save } => {
            let backend = backend::BackendClient::new(http, config.base_url());
            let state = backend.navigation_state(&patient_id).await?;
            let json = serde_json::to_string_pretty(&state)?;
            match save {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    println!("State written to {}.", path.display());
                }
                None => println!("{json}"),
            }
            if state.survey.is_none() {
                println!("No survey stored for patient {patient_id}.");
            }
        }
        Commands::Search { keyword } => {
            let backend = backend::BackendClient::new(http, config.base_url());
            let patients = backend.search(&keyword).await?;
            if patients.is_empty() {
                println!("No patients match \"{keyword}\".");
                return Ok(());
            }
            for patient in patients {
                println!(
                    "- {} ({}, {}) surveyed {} [{}]",
                    patient.full_name(),
                    patient.age,
                    patient.gender,
                    patient.survey_date,
                    patient.id.as_deref().unwrap_or("no id")
                );
            }
        }
        Commands::Batch { csv, out } => {
            let pages = report::read_csv(&csv)?;
            let client = HttpPredictionClient::new(http);
            let entries = report::run_batch(&client, config.base_url(), &pages).await;
            let rendered = report::build_report(&entries, chrono::Utc::now());
            std::fs::write(&out, rendered)?;
            println!(
                "Forecast {} surveys from {}; report written to {}.",
                entries.len(),
                csv.display(),
                out.display()
            );
        }
    }

    Ok(())
}

/// `Ok(None)` when the state file lacks the patient or the survey.
fn open_page(path: &Path) -> anyhow::Result<Option<ResultPage>> {
    let state: NavigationState = read_json(path)?;
    match ResultPage::from_state(state) {
        Ok(page) => {
            page.survey.validate()?;
            Ok(Some(page))
        }
        Err(missing) => {
            tracing::warn!(reason = %missing, "result page opened without its records");
            Ok(None)
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
}
