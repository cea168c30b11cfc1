//! Interview conversation as an explicit state machine.
//!
//! [`transition`] is pure: it maps the current stage and one input to the
//! next stage plus the effects the caller has to carry out (record a chat
//! message, call the completion service, show questions). [`InterviewSession`]
//! is the context object that owns the stage and history and applies those
//! effects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::models::{
    CandidateProfile, ChatMessage, CompletionRequest, ExtractedText, InterviewLevel,
    QuestionBatch, RuntimeSettings,
};
use super::prompts::{self, QuestionRequest};
use super::question_parser::parse_questions;

const NEXT_TOPIC_PREFIX: &str = "next topic:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSetup {
    pub resume_text: String,
    pub job_role: String,
    pub level: InterviewLevel,
    pub topic: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingCompletion {
    Questions,
    FollowUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum InterviewStage {
    AwaitingResume,
    AwaitingSetup {
        resume_text: String,
    },
    Interviewing {
        setup: InterviewSetup,
        pending: Option<PendingCompletion>,
    },
    Finished {
        setup: InterviewSetup,
    },
}

impl InterviewStage {
    pub fn name(&self) -> &'static str {
        match self {
            InterviewStage::AwaitingResume => "awaiting_resume",
            InterviewStage::AwaitingSetup { .. } => "awaiting_setup",
            InterviewStage::Interviewing { .. } => "interviewing",
            InterviewStage::Finished { .. } => "finished",
        }
    }

    pub fn setup(&self) -> Option<&InterviewSetup> {
        match self {
            InterviewStage::Interviewing { setup, .. } | InterviewStage::Finished { setup } => {
                Some(setup)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InterviewInput {
    ResumeLoaded(ExtractedText),
    Start {
        job_role: String,
        level: InterviewLevel,
        topic: Option<String>,
    },
    Answer(String),
    /// Outcome of the completion requested by the previous step. `Err` holds
    /// the failure message and is distinct from an empty success.
    Completion(Result<String, String>),
    End,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Record(ChatMessage),
    RequestCompletion(CompletionRequest),
    PresentQuestions(QuestionBatch),
    Notice(String),
    Warn(String),
}

pub fn transition(
    stage: InterviewStage,
    input: InterviewInput,
    settings: &RuntimeSettings,
) -> (InterviewStage, Vec<Effect>) {
    use InterviewInput as I;
    use InterviewStage as S;

    match (stage, input) {
        (_, I::ResumeLoaded(text)) => (
            S::AwaitingSetup {
                resume_text: text.into_string(),
            },
            vec![Effect::Notice("Resume successfully parsed!".to_string())],
        ),

        (S::AwaitingSetup { resume_text }, I::Start { job_role, level, topic }) => {
            if job_role.trim().is_empty() {
                return (
                    S::AwaitingSetup { resume_text },
                    vec![Effect::Warn("Please enter the job role.".to_string())],
                );
            }

            let setup = InterviewSetup {
                resume_text,
                job_role: job_role.trim().to_string(),
                level,
                topic: topic.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()),
            };
            let request = question_request(&setup, settings);
            (
                S::Interviewing {
                    setup,
                    pending: Some(PendingCompletion::Questions),
                },
                vec![Effect::RequestCompletion(request)],
            )
        }

        (S::Interviewing { setup, pending: Some(kind) }, I::Answer(_)) => (
            S::Interviewing {
                setup,
                pending: Some(kind),
            },
            vec![Effect::Warn(
                "Still waiting for the interviewer; try again in a moment.".to_string(),
            )],
        ),

        (S::Interviewing { mut setup, pending: None }, I::Answer(answer)) => {
            let answer = answer.trim().to_string();
            if answer.is_empty() {
                return (
                    S::Interviewing { setup, pending: None },
                    vec![Effect::Warn("Answer is empty.".to_string())],
                );
            }

            let mut effects = vec![Effect::Record(ChatMessage::user(answer.clone()))];
            match requested_topic(&answer) {
                Some(topic) if topic.is_empty() => {
                    effects.push(Effect::Warn(
                        "Name a topic after \"next topic:\".".to_string(),
                    ));
                    (S::Interviewing { setup, pending: None }, effects)
                }
                Some(topic) => {
                    debug!(%topic, "switching interview topic");
                    setup.topic = Some(topic);
                    effects.push(Effect::RequestCompletion(question_request(&setup, settings)));
                    (
                        S::Interviewing {
                            setup,
                            pending: Some(PendingCompletion::Questions),
                        },
                        effects,
                    )
                }
                None => {
                    effects.push(Effect::RequestCompletion(follow_up_request(
                        &setup, &answer, settings,
                    )));
                    (
                        S::Interviewing {
                            setup,
                            pending: Some(PendingCompletion::FollowUp),
                        },
                        effects,
                    )
                }
            }
        }

        (S::Interviewing { setup, pending: Some(_) }, I::Completion(result)) => {
            let effects = match result {
                Ok(text) => {
                    let text = text.trim().to_string();
                    let batch = parse_questions(&text);
                    vec![
                        Effect::Record(ChatMessage::ai(text)),
                        Effect::PresentQuestions(batch),
                    ]
                }
                Err(message) => vec![Effect::Record(ChatMessage::ai(format!("Error: {message}")))],
            };
            (S::Interviewing { setup, pending: None }, effects)
        }

        (S::Interviewing { setup, .. }, I::End) => (S::Finished { setup }, Vec::new()),

        (stage, input) => {
            let warning = format!("Cannot handle {} while {}", input_name(&input), stage.name());
            debug!(stage = stage.name(), input = input_name(&input), "ignored interview input");
            (stage, vec![Effect::Warn(warning)])
        }
    }
}

fn input_name(input: &InterviewInput) -> &'static str {
    match input {
        InterviewInput::ResumeLoaded(_) => "a resume",
        InterviewInput::Start { .. } => "a start request",
        InterviewInput::Answer(_) => "an answer",
        InterviewInput::Completion(_) => "a completion",
        InterviewInput::End => "an end request",
    }
}

/// `Some(topic)` when the answer asks to switch topic. The topic may be
/// empty if nothing follows the prefix.
fn requested_topic(answer: &str) -> Option<String> {
    let prefix = answer.get(..NEXT_TOPIC_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(NEXT_TOPIC_PREFIX) {
        return None;
    }
    Some(answer[NEXT_TOPIC_PREFIX.len()..].trim().to_string())
}

fn question_request(setup: &InterviewSetup, settings: &RuntimeSettings) -> CompletionRequest {
    let prompt = prompts::question_generation_prompt(&QuestionRequest {
        resume_text: &setup.resume_text,
        job_role: &setup.job_role,
        level: setup.level,
        topic: setup.topic.as_deref(),
        count: settings.question_count,
    });

    CompletionRequest {
        model: settings.model.clone(),
        prompt,
        temperature: settings.temperature,
        max_tokens: settings.max_tokens,
    }
}

fn follow_up_request(
    setup: &InterviewSetup,
    answer: &str,
    settings: &RuntimeSettings,
) -> CompletionRequest {
    let prompt = prompts::follow_up_prompt(
        &QuestionRequest {
            resume_text: &setup.resume_text,
            job_role: &setup.job_role,
            level: setup.level,
            topic: setup.topic.as_deref(),
            count: settings.follow_up_count,
        },
        answer,
    );

    CompletionRequest {
        model: settings.model.clone(),
        prompt,
        temperature: settings.temperature,
        max_tokens: settings.follow_up_max_tokens,
    }
}

/// Everything one interview needs between user actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSession {
    pub id: String,
    pub stage: InterviewStage,
    pub profile: CandidateProfile,
    pub history: Vec<ChatMessage>,
    pub last_batch: QuestionBatch,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            stage: InterviewStage::AwaitingResume,
            profile: CandidateProfile::empty(),
            history: Vec::new(),
            last_batch: QuestionBatch::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Runs one transition and applies its bookkeeping effects. All effects
    /// are returned so the caller can act on completion requests and display
    /// the rest.
    pub fn apply(&mut self, input: InterviewInput, settings: &RuntimeSettings) -> Vec<Effect> {
        let starting = matches!(input, InterviewInput::Start { .. });
        let stage = std::mem::replace(&mut self.stage, InterviewStage::AwaitingResume);
        let (next, effects) = transition(stage, input, settings);

        if starting && matches!(next, InterviewStage::Interviewing { .. }) {
            self.history.clear();
            self.last_batch = QuestionBatch::default();
        }
        self.stage = next;

        for effect in &effects {
            match effect {
                Effect::Record(message) => self.history.push(message.clone()),
                Effect::PresentQuestions(batch) => self.last_batch = batch.clone(),
                _ => {}
            }
        }

        self.updated_at = Utc::now();
        effects
    }
}

impl Default for InterviewSession {
    fn default() -> Self {
        Self::new()
    }
}
