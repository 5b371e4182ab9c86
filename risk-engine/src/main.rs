//! risk-engine: run maternal risk assessments from the command line.
//!
//! Messages are sent through the mock gateway, so `assess` is a dry run of
//! the full escalation path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use risk_assessment::{Observation, RiskClassifier, SubjectProfile};
use risk_engine::{EngineConfig, LoggingConfig, RiskEngine};
use risk_escalation::{Contact, InMemoryContactDirectory, MockMessagingGateway};
use serde::de::DeserializeOwned;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "risk-engine")]
#[command(about = "Maternal health risk assessment and escalation")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "risk-engine.yaml", env = "RISK_ENGINE_CONFIG")]
    config: PathBuf,

    /// Classifier artifact directory (overrides config file)
    #[arg(long, env = "RISK_ENGINE_MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Emit JSON logs (overrides config file)
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assess one observation and print the outcome as JSON
    Assess {
        /// Observation JSON file
        #[arg(long)]
        observation: PathBuf,

        /// Subject profile JSON file
        #[arg(long)]
        profile: Option<PathBuf>,

        /// JSON list of the subject's contacts
        #[arg(long)]
        contacts: Option<PathBuf>,
    },

    /// Check that the classifier artifacts load
    CheckModel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        EngineConfig::load(&cli.config)?
    } else {
        EngineConfig::default()
    };

    // Apply CLI overrides
    if let Some(dir) = cli.model_dir {
        config.classifier.dir = dir;
    }
    if cli.json_logs {
        config.logging.json = true;
    }

    init_tracing(&config.logging)?;
    info!(config = %cli.config.display(), "Starting risk-engine");

    let classifier = Arc::new(RiskClassifier::load(&config.classifier));

    match cli.command {
        Command::CheckModel => {
            match classifier.not_ready_reason() {
                None => println!("classifier ready ({})", config.classifier.dir.display()),
                Some(reason) => anyhow::bail!("classifier not ready: {}", reason),
            }
            Ok(())
        }
        Command::Assess {
            observation,
            profile,
            contacts,
        } => assess(config, classifier, &observation, profile.as_deref(), contacts.as_deref()).await,
    }
}

fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("invalid log directive {:?}", logging.level))?,
    };

    // logs go to stderr; stdout carries the JSON outcome
    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

async fn assess(
    config: EngineConfig,
    classifier: Arc<RiskClassifier>,
    observation: &Path,
    profile: Option<&Path>,
    contacts: Option<&Path>,
) -> anyhow::Result<()> {
    let observation: Observation = read_json(observation)?;
    let profile: SubjectProfile = match profile {
        Some(path) => read_json(path)?,
        None => SubjectProfile::new(observation.subject_id.clone()),
    };
    let contacts: Vec<Contact> = match contacts {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let directory = Arc::new(InMemoryContactDirectory::new().with_contacts(contacts));
    let gateway = Arc::new(MockMessagingGateway::new());
    let engine = RiskEngine::builder(classifier, gateway, directory)
        .config(config)
        .build();

    let outcome = engine.assess(&profile, observation).await?;

    let notification = match outcome.dispatch {
        Some(handle) => Some(handle.await.context("notification dispatch task failed")?),
        None => None,
    };
    // re-read so the printed alert reflects the dispatch result
    let alert = match &outcome.alert {
        Some(alert) => engine.alert(&alert.id).await?,
        None => None,
    };

    let deliveries: Vec<_> = engine
        .recent_deliveries(usize::MAX)
        .await
        .into_iter()
        .map(|r| {
            serde_json::json!({
                "destination": r.destination,
                "attempts": r.attempts,
                "delivered": r.delivered(),
                "error": r.error.map(|e| e.to_string()),
            })
        })
        .collect();

    let report = serde_json::json!({
        "assessment": outcome.assessment,
        "reused": outcome.reused,
        "alert": alert,
        "alert_created": outcome.alert_created,
        "escalation_error": outcome.escalation_error.map(|e| e.to_string()),
        "notification": notification,
        "deliveries": deliveries,
        "dispatch_stats": engine.dispatch_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
