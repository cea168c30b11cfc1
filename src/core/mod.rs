pub mod document_parser;
pub mod errors;
pub mod field_extractor;
pub mod interview;
pub mod models;
pub mod pdf;
pub mod prompts;
pub mod question_parser;
pub mod service;
pub mod session_store;
pub mod settings_store;
pub mod skills;
