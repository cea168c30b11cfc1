use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use super::document_parser::ResumeTextExtractor;
use super::errors::CoreError;
use super::field_extractor;
use super::interview::{Effect, InterviewInput, InterviewSession};
use super::models::{
    CandidateProfile, CompletionRequest, Document, ExtractedText, InterviewLevel, RuntimeSettings,
    SkillSet,
};
use super::prompts;
use super::skills::{self, DEFAULT_VOCABULARY};

/// The hosted LLM. Implementations own transport, auth and model selection;
/// they report an unusable response as an error, never as empty text.
pub trait CompletionService: Send + Sync {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String, CoreError>> + Send;
}

pub struct InterviewService<C> {
    completion: C,
    extractor: ResumeTextExtractor,
    settings: RuntimeSettings,
}

impl<C: CompletionService> InterviewService<C> {
    pub fn new(completion: C, settings: RuntimeSettings) -> Self {
        Self {
            completion,
            extractor: ResumeTextExtractor::default(),
            settings: settings.sanitized(),
        }
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// Extracts the resume and profile and moves the session to setup.
    /// Extraction errors are terminal for this document; the session is left
    /// untouched so the user can upload another one.
    pub fn load_resume(
        &self,
        session: &mut InterviewSession,
        document: Document,
    ) -> Result<Vec<Effect>, CoreError> {
        let text = self.extractor.extract(document)?;
        session.profile = self.profile_for(&text);
        info!(
            session_id = %session.id,
            completeness = session.profile.completeness(),
            "resume loaded"
        );

        Ok(session.apply(InterviewInput::ResumeLoaded(text), &self.settings))
    }

    pub fn profile_for(&self, text: &ExtractedText) -> CandidateProfile {
        match self.settings.skill_vocabulary.as_deref() {
            Some(vocabulary) => field_extractor::extract_profile_with_vocabulary(text, vocabulary),
            None => field_extractor::extract_profile(text),
        }
    }

    pub async fn start(
        &self,
        session: &mut InterviewSession,
        job_role: &str,
        level: InterviewLevel,
        topic: Option<&str>,
    ) -> Vec<Effect> {
        self.drive(
            session,
            InterviewInput::Start {
                job_role: job_role.to_string(),
                level,
                topic: topic.map(str::to_string),
            },
        )
        .await
    }

    pub async fn answer(&self, session: &mut InterviewSession, answer: &str) -> Vec<Effect> {
        self.drive(session, InterviewInput::Answer(answer.to_string()))
            .await
    }

    pub fn end(&self, session: &mut InterviewSession) -> Vec<Effect> {
        session.apply(InterviewInput::End, &self.settings)
    }

    /// Asks the LLM for the skills in the resume. Falls back to the keyword
    /// vocabulary when the completion fails or lists nothing.
    pub async fn extract_skills(&self, text: &ExtractedText) -> SkillSet {
        let request = CompletionRequest {
            model: self.settings.model.clone(),
            prompt: prompts::skills_extraction_prompt(text.as_str()),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        match self.complete_with_retry(&request).await {
            Ok(raw) => {
                let skills = skills::skills_from_completion(&raw);
                if !skills.is_empty() {
                    return skills;
                }
                warn!("skill completion listed nothing; using keyword matching");
            }
            Err(err) => warn!(error = %err, "skill completion failed; using keyword matching"),
        }

        match self.settings.skill_vocabulary.as_deref() {
            Some(vocabulary) => skills::match_vocabulary(text.as_str(), vocabulary),
            None => skills::match_vocabulary(text.as_str(), DEFAULT_VOCABULARY),
        }
    }

    /// Applies `input`, then satisfies every completion request the session
    /// raises until it settles.
    async fn drive(&self, session: &mut InterviewSession, input: InterviewInput) -> Vec<Effect> {
        let mut all = Vec::new();
        let mut next = Some(input);

        while let Some(input) = next.take() {
            let effects = session.apply(input, &self.settings);
            for effect in &effects {
                if let Effect::RequestCompletion(request) = effect {
                    let outcome = self
                        .complete_with_retry(request)
                        .await
                        .map_err(|err| err.to_string());
                    next = Some(InterviewInput::Completion(outcome));
                }
            }
            all.extend(effects);
        }

        all
    }

    async fn complete_with_retry(&self, request: &CompletionRequest) -> Result<String, CoreError> {
        let limit = Duration::from_secs(self.settings.completion_timeout_seconds);
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(limit, self.completion.complete(request)).await
            {
                Ok(result) => result,
                Err(_) => Err(CoreError::CompletionTimeout(limit)),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(err) => {
                    let is_last_attempt = attempt + 1 >= self.settings.max_retries;
                    if !err.is_retryable() || is_last_attempt {
                        return Err(err);
                    }

                    let backoff_seconds =
                        self.settings.retry_delay_seconds * 2_f64.powf(attempt as f64);
                    warn!(
                        attempt = attempt + 1,
                        error = %err,
                        backoff_seconds,
                        "completion failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs_f64(backoff_seconds.max(0.1))).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::core::interview::InterviewStage;
    use crate::core::models::{ChatMessage, ProfileField, Question};

    /// Replays canned results and records every request it saw.
    struct ScriptedCompletion {
        replies: Mutex<VecDeque<Result<String, CoreError>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedCompletion {
        fn new(replies: Vec<Result<String, CoreError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl CompletionService for ScriptedCompletion {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CoreError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CoreError::completion("script exhausted", false)))
        }
    }

    struct NeverAnswers;

    impl CompletionService for NeverAnswers {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, CoreError> {
            std::future::pending().await
        }
    }

    fn fast_settings() -> RuntimeSettings {
        RuntimeSettings {
            retry_delay_seconds: 0.1,
            max_retries: 3,
            completion_timeout_seconds: 1,
            ..RuntimeSettings::default()
        }
    }

    fn resume() -> Document {
        Document::from_file_name(
            "jane.txt",
            b"Jane Doe\njane.doe@example.com\n5 years of Python and SQL".to_vec(),
        )
    }

    const MCQ: &str = "Q: What does SQL stand for?\nOptions: A. Structured Query Language B. Simple Query Logic\nCorrect: A";

    #[tokio::test]
    async fn full_interview_flow_records_history() {
        let service = InterviewService::new(
            ScriptedCompletion::new(vec![
                Ok(MCQ.to_string()),
                Ok("Q: Describe a query you optimised.".to_string()),
            ]),
            fast_settings(),
        );
        let mut session = InterviewSession::new();

        service.load_resume(&mut session, resume()).unwrap();
        assert_eq!(
            session.profile.get(ProfileField::Email).as_deref(),
            Some("jane.doe@example.com")
        );

        let effects = service
            .start(&mut session, "Data Analyst", InterviewLevel::Basic, None)
            .await;
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::PresentQuestions(batch) if batch.len() == 1)));
        assert!(matches!(
            session.last_batch.get(0),
            Some(Question::MultipleChoice { correct: 'A', .. })
        ));

        service.answer(&mut session, "A").await;
        assert_eq!(session.history.len(), 3);
        assert_eq!(session.history[1], ChatMessage::user("A"));
        assert_eq!(
            session.last_batch.get(0).map(Question::prompt),
            Some("Describe a query you optimised.")
        );
        assert_eq!(service.completion.request_count(), 2);

        service.end(&mut session);
        assert_eq!(session.stage.name(), "finished");
    }

    #[tokio::test]
    async fn retryable_failures_are_retried() {
        let service = InterviewService::new(
            ScriptedCompletion::new(vec![
                Err(CoreError::completion("503", true)),
                Ok("Q: Why Rust?".to_string()),
            ]),
            fast_settings(),
        );
        let mut session = InterviewSession::new();
        service.load_resume(&mut session, resume()).unwrap();
        service
            .start(&mut session, "Engineer", InterviewLevel::Advanced, Some("Rust"))
            .await;

        assert_eq!(service.completion.request_count(), 2);
        assert_eq!(session.history, vec![ChatMessage::ai("Q: Why Rust?")]);
    }

    #[tokio::test]
    async fn permanent_failures_are_recorded_without_retry() {
        let service = InterviewService::new(
            ScriptedCompletion::new(vec![Err(CoreError::completion("invalid api key", false))]),
            fast_settings(),
        );
        let mut session = InterviewSession::new();
        service.load_resume(&mut session, resume()).unwrap();
        service
            .start(&mut session, "Engineer", InterviewLevel::Basic, None)
            .await;

        assert_eq!(service.completion.request_count(), 1);
        assert_eq!(
            session.history,
            vec![ChatMessage::ai(
                "Error: Completion request failed: invalid api key"
            )]
        );
        assert!(matches!(
            session.stage,
            InterviewStage::Interviewing { pending: None, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_completions_time_out() {
        let settings = RuntimeSettings {
            max_retries: 1,
            ..fast_settings()
        };
        let service = InterviewService::new(NeverAnswers, settings);
        let mut session = InterviewSession::new();
        service.load_resume(&mut session, resume()).unwrap();
        service
            .start(&mut session, "Engineer", InterviewLevel::Basic, None)
            .await;

        assert_eq!(session.history.len(), 1);
        assert!(session.history[0].content.starts_with("Error: Completion request timed out"));
    }

    #[tokio::test]
    async fn unsupported_upload_leaves_session_untouched() {
        let service = InterviewService::new(ScriptedCompletion::new(Vec::new()), fast_settings());
        let mut session = InterviewSession::new();
        let err = service
            .load_resume(&mut session, Document::from_file_name("resume.odt", vec![1, 2, 3]))
            .unwrap_err();

        assert!(matches!(err, CoreError::UnsupportedFormat(_)));
        assert_eq!(session.stage, InterviewStage::AwaitingResume);
    }

    #[tokio::test]
    async fn skill_extraction_prefers_llm_and_falls_back_to_keywords() {
        let text = ExtractedText::new("Built dashboards with Python and SQL");

        let service = InterviewService::new(
            ScriptedCompletion::new(vec![Ok("Python, SQL, Tableau".to_string())]),
            fast_settings(),
        );
        let skills = service.extract_skills(&text).await;
        assert_eq!(skills.iter().collect::<Vec<_>>(), vec!["python", "sql", "tableau"]);

        let service = InterviewService::new(
            ScriptedCompletion::new(vec![Err(CoreError::completion("down", false))]),
            fast_settings(),
        );
        let skills = service.extract_skills(&text).await;
        assert_eq!(skills.iter().collect::<Vec<_>>(), vec!["sql", "python"]);
    }

    #[tokio::test]
    async fn custom_vocabulary_drives_profile_skills() {
        let settings = RuntimeSettings {
            skill_vocabulary: Some(vec!["Excel".to_string(), "python".to_string()]),
            ..fast_settings()
        };
        let service = InterviewService::new(ScriptedCompletion::new(Vec::new()), settings);
        let profile = service.profile_for(&ExtractedText::new("python and excel"));
        assert_eq!(
            profile.get(ProfileField::TechStack).as_deref(),
            Some("excel, python")
        );
    }
}
