use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use smarthire_lib::core::document_parser::ResumeTextExtractor;
use smarthire_lib::core::field_extractor;
use smarthire_lib::core::models::{CandidateProfile, Document, QuestionBatch};
use smarthire_lib::core::question_parser::parse_questions;
use smarthire_lib::core::session_store::JsonSessionStore;
use smarthire_lib::core::settings_store::SettingsStore;

#[derive(Parser)]
#[command(name = "smarthire_inspect", about = "Inspect resume extraction and question parsing")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract text from a PDF, DOCX or TXT resume and print the candidate profile
    Profile {
        path: PathBuf,
        /// Also print the extracted text
        #[arg(long)]
        show_text: bool,
    },
    /// Parse a saved completion into structured questions
    Questions { path: PathBuf },
    /// List stored interview sessions, newest first
    Sessions,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileReport {
    source_file: String,
    text_length: usize,
    completeness: f64,
    profile: CandidateProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let settings = SettingsStore::new().load().await?;

    match cli.command {
        Command::Profile { path, show_text } => {
            let file_name = file_name(&path);
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;

            let text = ResumeTextExtractor::default()
                .extract(Document::from_file_name(&file_name, bytes))?;
            let profile = match settings.skill_vocabulary.as_deref() {
                Some(vocabulary) => {
                    field_extractor::extract_profile_with_vocabulary(&text, vocabulary)
                }
                None => field_extractor::extract_profile(&text),
            };

            let report = ProfileReport {
                source_file: file_name,
                text_length: text.as_str().chars().count(),
                completeness: profile.completeness(),
                profile,
                text: show_text.then(|| text.into_string()),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Questions { path } => {
            let raw = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let batch: QuestionBatch = parse_questions(&raw);
            println!("{}", serde_json::to_string_pretty(&batch)?);
        }
        Command::Sessions => {
            let store = JsonSessionStore::new(settings.session_retention_hours);
            for id in store.list().await? {
                let session = store.load(&id).await?;
                println!(
                    "{}\t{}\t{}\t{} messages",
                    session.id,
                    session.updated_at.format("%Y-%m-%d %H:%M:%S"),
                    session.stage.name(),
                    session.history.len()
                );
            }
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|v| v.to_str())
        .unwrap_or("resume.txt")
        .to_string()
}
