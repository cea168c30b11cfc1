pub mod core;

pub use self::core::document_parser::ResumeTextExtractor;
pub use self::core::errors::CoreError;
pub use self::core::field_extractor::extract_profile;
pub use self::core::question_parser::parse_questions;
pub use self::core::service::{CompletionService, InterviewService};
