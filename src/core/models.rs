use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Display text for a profile field the heuristics could not resolve.
pub const NOT_FOUND: &str = "Not found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    Pdf,
    Docx,
    PlainText,
}

impl MediaType {
    /// Resolves a declared type. Accepts the canonical names, bare file
    /// extensions and the usual MIME types.
    pub fn from_declared(declared: &str) -> Option<Self> {
        match declared.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" | "application/pdf" => Some(MediaType::Pdf),
            "docx" | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                Some(MediaType::Docx)
            }
            "plain-text" | "txt" | "text" | "text/plain" => Some(MediaType::PlainText),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Pdf => "pdf",
            MediaType::Docx => "docx",
            MediaType::PlainText => "plain-text",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uploaded bytes plus the type the uploader declared for them.
#[derive(Debug, Clone)]
pub struct Document {
    pub declared_type: String,
    pub data: Vec<u8>,
}

impl Document {
    pub fn new(declared_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            declared_type: declared_type.into(),
            data,
        }
    }

    /// Declares the type from the file extension, the way uploads arrive.
    pub fn from_file_name(file_name: &str, data: Vec<u8>) -> Self {
        let extension = std::path::Path::new(file_name)
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        Self::new(extension, data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExtractedText(String);

impl ExtractedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ExtractedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    FullName,
    Email,
    Phone,
    ExperienceYears,
    Position,
    Location,
    TechStack,
}

impl ProfileField {
    pub const ALL: [ProfileField; 7] = [
        ProfileField::FullName,
        ProfileField::Email,
        ProfileField::Phone,
        ProfileField::ExperienceYears,
        ProfileField::Position,
        ProfileField::Location,
        ProfileField::TechStack,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ProfileField::FullName => "Full Name",
            ProfileField::Email => "Email",
            ProfileField::Phone => "Phone",
            ProfileField::ExperienceYears => "Years of Experience",
            ProfileField::Position => "Position Applied For",
            ProfileField::Location => "Location",
            ProfileField::TechStack => "Tech Stack",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Found(String),
    NotFound,
}

impl FieldValue {
    pub fn from_option(value: Option<String>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => FieldValue::Found(v),
            _ => FieldValue::NotFound,
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            FieldValue::Found(v) => Some(v),
            FieldValue::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, FieldValue::Found(_))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_deref().unwrap_or(NOT_FOUND))
    }
}

/// Candidate fields recovered from a resume. Every [`ProfileField`] key is
/// always present; unresolved ones hold [`FieldValue::NotFound`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<ProfileField, FieldValue>",
    into = "BTreeMap<ProfileField, FieldValue>"
)]
pub struct CandidateProfile {
    fields: BTreeMap<ProfileField, FieldValue>,
}

impl CandidateProfile {
    pub fn empty() -> Self {
        Self::from(BTreeMap::new())
    }

    pub fn get(&self, field: ProfileField) -> &FieldValue {
        static MISSING: FieldValue = FieldValue::NotFound;
        self.fields.get(&field).unwrap_or(&MISSING)
    }

    /// Manual correction; an empty value resets the field to not found.
    pub fn set_field(&mut self, field: ProfileField, value: impl Into<String>) {
        let value = value.into();
        self.fields
            .insert(field, FieldValue::from_option(Some(value.trim().to_string())));
    }

    pub fn clear_field(&mut self, field: ProfileField) {
        self.fields.insert(field, FieldValue::NotFound);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (*k, v))
    }

    /// Weighted share of resolved fields, in `0.0..=1.0`.
    pub fn completeness(&self) -> f64 {
        let mut score: f64 = 0.0;
        for (field, value) in self.iter() {
            if !value.is_found() {
                continue;
            }
            score += match field {
                ProfileField::Email => 0.25,
                ProfileField::FullName => 0.2,
                ProfileField::Phone => 0.15,
                ProfileField::TechStack => 0.15,
                ProfileField::ExperienceYears => 0.1,
                ProfileField::Position => 0.1,
                ProfileField::Location => 0.05,
            };
        }

        score.min(1.0)
    }
}

impl Default for CandidateProfile {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<BTreeMap<ProfileField, FieldValue>> for CandidateProfile {
    fn from(mut fields: BTreeMap<ProfileField, FieldValue>) -> Self {
        for field in ProfileField::ALL {
            fields.entry(field).or_insert(FieldValue::NotFound);
        }
        Self { fields }
    }
}

impl From<CandidateProfile> for BTreeMap<ProfileField, FieldValue> {
    fn from(profile: CandidateProfile) -> Self {
        profile.fields
    }
}

/// Distinct, lowercased skill tokens in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillSet(Vec<String>);

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when the token is blank or already present.
    pub fn insert(&mut self, skill: &str) -> bool {
        let normalized = skill.trim().to_lowercase();
        if normalized.is_empty() || self.0.contains(&normalized) {
            return false;
        }
        self.0.push(normalized);
        true
    }

    pub fn contains(&self, skill: &str) -> bool {
        let normalized = skill.trim().to_lowercase();
        self.0.contains(&normalized)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

impl<'a> FromIterator<&'a str> for SkillSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = SkillSet::new();
        for skill in iter {
            set.insert(skill);
        }
        set
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    pub label: char,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Question {
    MultipleChoice {
        prompt: String,
        options: Vec<QuestionOption>,
        correct: char,
    },
    MultipleSelect {
        prompt: String,
        options: Vec<QuestionOption>,
        correct: BTreeSet<char>,
    },
    OpenEnded {
        prompt: String,
    },
}

impl Question {
    pub fn prompt(&self) -> &str {
        match self {
            Question::MultipleChoice { prompt, .. }
            | Question::MultipleSelect { prompt, .. }
            | Question::OpenEnded { prompt } => prompt,
        }
    }

    pub fn options(&self) -> &[QuestionOption] {
        match self {
            Question::MultipleChoice { options, .. } | Question::MultipleSelect { options, .. } => {
                options
            }
            Question::OpenEnded { .. } => &[],
        }
    }

    pub fn correct_labels(&self) -> BTreeSet<char> {
        match self {
            Question::MultipleChoice { correct, .. } => BTreeSet::from([*correct]),
            Question::MultipleSelect { correct, .. } => correct.clone(),
            Question::OpenEnded { .. } => BTreeSet::new(),
        }
    }

    /// Grades a selection against the answer key. Open-ended questions have
    /// no key and return `None`.
    pub fn check(&self, selected: &[char]) -> Option<bool> {
        if matches!(self, Question::OpenEnded { .. }) {
            return None;
        }

        let selected: BTreeSet<char> = selected.iter().map(|c| c.to_ascii_uppercase()).collect();
        Some(selected == self.correct_labels())
    }
}

/// Questions in presentation order. Answers are matched to questions by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionBatch(Vec<Question>);

impl QuestionBatch {
    pub fn new(questions: Vec<Question>) -> Self {
        Self(questions)
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<Question> {
        self.0
    }
}

impl IntoIterator for QuestionBatch {
    type Item = Question;
    type IntoIter = std::vec::IntoIter<Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewLevel {
    #[default]
    Basic,
    Intermediate,
    Advanced,
}

impl InterviewLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewLevel::Basic => "basic",
            InterviewLevel::Intermediate => "intermediate",
            InterviewLevel::Advanced => "advanced",
        }
    }
}

impl FromStr for InterviewLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(InterviewLevel::Basic),
            "intermediate" => Ok(InterviewLevel::Intermediate),
            "advanced" => Ok(InterviewLevel::Advanced),
            other => Err(format!("unknown interview level: {other}")),
        }
    }
}

impl fmt::Display for InterviewLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    Ai,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// One call to the external completion service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub follow_up_max_tokens: u32,
    pub question_count: usize,
    pub follow_up_count: usize,
    pub completion_timeout_seconds: u64,
    pub max_retries: usize,
    pub retry_delay_seconds: f64,
    pub session_retention_hours: i64,
    pub skill_vocabulary: Option<Vec<String>>,
}

impl RuntimeSettings {
    pub fn sanitized(mut self) -> Self {
        self.temperature = self.temperature.clamp(0.0, 2.0);
        self.max_tokens = self.max_tokens.max(1);
        self.follow_up_max_tokens = self.follow_up_max_tokens.max(1);
        self.question_count = self.question_count.max(1);
        self.follow_up_count = self.follow_up_count.max(1);
        self.completion_timeout_seconds = self.completion_timeout_seconds.max(1);
        self.max_retries = self.max_retries.max(1);
        self.retry_delay_seconds = self.retry_delay_seconds.max(0.1);
        self.session_retention_hours = self.session_retention_hours.max(1);
        if self.model.trim().is_empty() {
            self.model = RuntimeSettings::default().model;
        }
        self.skill_vocabulary = self
            .skill_vocabulary
            .map(|words| {
                words
                    .into_iter()
                    .map(|w| w.trim().to_lowercase())
                    .filter(|w| !w.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|words| !words.is_empty());
        self
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            model: "llama3-70b-8192".to_string(),
            temperature: 0.6,
            max_tokens: 600,
            follow_up_max_tokens: 500,
            question_count: 3,
            follow_up_count: 2,
            completion_timeout_seconds: 60,
            max_retries: 3,
            retry_delay_seconds: 1.0,
            session_retention_hours: 24,
            skill_vocabulary: None,
        }
    }
}
