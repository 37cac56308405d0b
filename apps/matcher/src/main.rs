use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resume_matcher::config::Config;
use resume_matcher::llm_client::LlmClient;
use resume_matcher::matching::{run_matching_analysis, CategoryWeights, MatchRequest};
use resume_matcher::scoring::ResumeScorer;

/// Statistical job/resume matching and embedding-based resume scoring
#[derive(Parser, Debug)]
#[command(name = "resume-matcher", version)]
#[command(about = "Match resumes against job postings", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the 22-variable structured match and print the report as JSON
    Match {
        /// Path to the job description text
        job: PathBuf,
        /// Path to the resume text
        resume: PathBuf,
        #[arg(long, default_value = "Unknown role")]
        title: String,
        #[arg(long, default_value = "Unknown company")]
        company: String,
        /// Optional JSON file with pre-parsed resume fields
        #[arg(long)]
        resume_data: Option<PathBuf>,
    },
    /// Score the resume by embedding similarity and try to improve it
    Score {
        /// Path to the job description text
        job: PathBuf,
        /// Path to the resume text
        resume: PathBuf,
        /// Overrides MAX_IMPROVEMENT_ATTEMPTS
        #[arg(long)]
        attempts: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env()?;

    // Logs go to stderr so stdout carries only the JSON result
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_CRATE_NAME"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting resume-matcher v{}", env!("CARGO_PKG_VERSION"));

    let llm = LlmClient::new(
        config.provider.clone(),
        config.generation_model.clone(),
        config.embedding_model.clone(),
    )?;
    info!(
        "LLM client initialized (provider: {}, generation: {}, embedding: {})",
        llm.provider_name(),
        llm.generation_model(),
        llm.embedding_model()
    );

    let output = match args.command {
        Command::Match {
            job,
            resume,
            title,
            company,
            resume_data,
        } => {
            let resume_data = match resume_data {
                Some(path) => Some(
                    serde_json::from_str::<serde_json::Value>(&read_text(&path).await?)
                        .with_context(|| format!("{} is not valid JSON", path.display()))?,
                ),
                None => None,
            };
            let request = MatchRequest {
                job_description: read_text(&job).await?,
                job_title: title,
                company,
                resume_text: read_text(&resume).await?,
                resume_data,
            };
            let report = run_matching_analysis(&llm, &request, &CategoryWeights::default()).await?;
            serde_json::to_string_pretty(&report)?
        }
        Command::Score {
            job,
            resume,
            attempts,
        } => {
            let scorer = ResumeScorer::new(
                &llm,
                &llm,
                attempts.unwrap_or(config.max_improvement_attempts),
            );
            let result = scorer
                .score_resume(&read_text(&resume).await?, &read_text(&job).await?)
                .await?;
            serde_json::to_string_pretty(&result)?
        }
    };

    println!("{output}");
    Ok(())
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}
