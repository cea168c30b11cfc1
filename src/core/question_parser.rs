//! Best-effort parsing of LLM completions into typed questions.
//!
//! Expected layout, one block per question, blocks separated by blank lines:
//!
//! ```text
//! Q: What is 2+2?
//! Options: A. 3 B. 4 C. 5 D. 6
//! Correct: B
//! ```
//!
//! Anything that cannot be read with certainty degrades: a block without a
//! prompt is dropped, and a question whose answer key is missing or refers to
//! labels that were never offered becomes open-ended.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use super::models::{Question, QuestionBatch, QuestionOption};

static PROMPT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^q\d*\s*:\s*(.*)$").unwrap());
static OPTIONS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^options?\s*:\s*(.*)$").unwrap());
static CORRECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:correct(?:\s+answers?)?|answers?)\s*:\s*(.*)$").unwrap()
});
static OPTION_LABEL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\s)([A-Z])[.)]\s*").unwrap());
static LABEL_LINE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z][.)]\s").unwrap());
static LABEL_SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:,|;|/|&|\band\b)\s*").unwrap());
static ANSWER_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\(?([A-Za-z])(?:[.)]|\s|$)").unwrap());

/// Parses raw completion text into questions in block order. Never fails;
/// unstructured input yields an empty batch.
pub fn parse_questions(raw: &str) -> QuestionBatch {
    let mut questions = Vec::new();
    let mut dropped = 0usize;

    for block in split_blocks(raw) {
        let mut draft = QuestionDraft::default();
        for line in block {
            if let Some(caps) = PROMPT_RE.captures(line) {
                // Two questions without a blank line between them.
                if draft.prompt.is_some() {
                    questions.extend(draft.finish());
                    draft = QuestionDraft::default();
                }
                draft.set_prompt(caps.get(1).map_or("", |m| m.as_str()));
            } else if let Some(caps) = OPTIONS_RE.captures(line) {
                draft.in_options = true;
                draft.push_options(caps.get(1).map_or("", |m| m.as_str()));
            } else if let Some(caps) = CORRECT_RE.captures(line) {
                draft.in_options = false;
                draft.push_correct(caps.get(1).map_or("", |m| m.as_str()));
            } else if draft.in_options {
                if LABEL_LINE_RE.is_match(line) {
                    draft.push_options(line);
                } else {
                    debug!(line, "ignoring unrecognised option line");
                }
            } else if draft.options.is_empty()
                && draft.correct.is_empty()
                && !draft.key_unreadable
            {
                draft.continue_prompt(line);
            }
        }

        match draft.finish() {
            Some(question) => questions.push(question),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, "dropped completion blocks without a question prompt");
    }

    QuestionBatch::new(questions)
}

fn split_blocks(raw: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(line);
    }

    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

#[derive(Default)]
struct QuestionDraft {
    prompt: Option<String>,
    options: Vec<QuestionOption>,
    correct: BTreeSet<char>,
    key_unreadable: bool,
    in_options: bool,
}

impl QuestionDraft {
    fn set_prompt(&mut self, text: &str) {
        self.prompt = Some(text.trim().to_string());
    }

    fn continue_prompt(&mut self, line: &str) {
        if let Some(prompt) = self.prompt.as_mut() {
            if !prompt.is_empty() {
                prompt.push(' ');
            }
            prompt.push_str(line);
        }
    }

    /// Splits `A. foo B. bar` into labelled options. Labels must run in
    /// sequence from `A`; any other `X.` stays part of the current option's
    /// text, so initials such as `John F. Kennedy` survive.
    fn push_options(&mut self, text: &str) {
        let mut text_start = 0;
        for caps in OPTION_LABEL_RE.captures_iter(text) {
            let (Some(whole), Some(label)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let expected = self.next_label();
            if label.as_str().chars().next() != Some(expected) {
                continue;
            }

            self.extend_last_option(&text[text_start..whole.start()]);
            self.options.push(QuestionOption {
                label: expected,
                text: String::new(),
            });
            text_start = whole.end();
        }
        self.extend_last_option(&text[text_start..]);
    }

    fn next_label(&self) -> char {
        self.options
            .last()
            .map_or('A', |option| char::from(option.label as u8 + 1))
    }

    fn extend_last_option(&mut self, fragment: &str) {
        let fragment = fragment.trim();
        let Some(option) = self.options.last_mut() else {
            return;
        };
        if fragment.is_empty() {
            return;
        }
        if !option.text.is_empty() {
            option.text.push(' ');
        }
        option.text.push_str(fragment);
    }

    /// Every non-empty token must read as a label, otherwise the whole key
    /// is discarded.
    fn push_correct(&mut self, text: &str) {
        for token in LABEL_SEPARATOR_RE.split(text.trim()) {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match ANSWER_LABEL_RE
                .captures(token)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().chars().next())
            {
                Some(label) => {
                    self.correct.insert(label.to_ascii_uppercase());
                }
                None => {
                    debug!(token, "unreadable answer key token");
                    self.key_unreadable = true;
                }
            }
        }
    }

    fn finish(self) -> Option<Question> {
        let prompt = self.prompt.filter(|p| !p.is_empty())?;

        if self.key_unreadable {
            warn!(%prompt, "answer key could not be read; treating as open-ended");
            return Some(Question::OpenEnded { prompt });
        }

        if self.correct.is_empty() || self.options.is_empty() {
            if !self.options.is_empty() || !self.correct.is_empty() {
                warn!(%prompt, "question has options or an answer key but not both; treating as open-ended");
            }
            return Some(Question::OpenEnded { prompt });
        }

        let offered: BTreeSet<char> = self.options.iter().map(|o| o.label).collect();
        if !self.correct.is_subset(&offered) {
            warn!(%prompt, "answer key names labels that were not offered; treating as open-ended");
            return Some(Question::OpenEnded { prompt });
        }

        let question = if self.correct.len() == 1 {
            let correct = *self.correct.iter().next()?;
            Question::MultipleChoice {
                prompt,
                options: self.options,
                correct,
            }
        } else {
            Question::MultipleSelect {
                prompt,
                options: self.options,
                correct: self.correct,
            }
        };

        Some(question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(question: &Question) -> Vec<char> {
        question.options().iter().map(|o| o.label).collect()
    }

    #[test]
    fn multiple_choice_block_is_parsed() {
        let batch = parse_questions("Q: What is 2+2?\nOptions: A. 3 B. 4 C. 5 D. 6\nCorrect: B");
        assert_eq!(batch.len(), 1);

        let question = batch.get(0).unwrap();
        assert_eq!(question.prompt(), "What is 2+2?");
        assert_eq!(labels(question), vec!['A', 'B', 'C', 'D']);
        assert_eq!(question.options()[1].text, "4");
        match question {
            Question::MultipleChoice { correct, .. } => assert_eq!(*correct, 'B'),
            other => panic!("expected multiple choice, got {other:?}"),
        }
    }

    #[test]
    fn prompt_only_block_is_open_ended() {
        let batch = parse_questions("Q: Explain polymorphism.");
        assert_eq!(
            batch.into_vec(),
            vec![Question::OpenEnded {
                prompt: "Explain polymorphism.".to_string()
            }]
        );
    }

    #[test]
    fn several_correct_labels_make_multiple_select() {
        let batch = parse_questions(
            "Q: Which are prime?\nOptions: A. 2 B. 4 C. 5 D. 9\nCorrect: A, C",
        );
        match batch.get(0).unwrap() {
            Question::MultipleSelect { correct, .. } => {
                assert_eq!(correct, &BTreeSet::from(['A', 'C']));
            }
            other => panic!("expected multiple select, got {other:?}"),
        }
    }

    #[test]
    fn empty_and_unstructured_input_yield_empty_batches() {
        assert!(parse_questions("").is_empty());
        assert!(parse_questions("   \n\n  ").is_empty());
        assert!(parse_questions("Sure! Here are some thoughts about your resume.").is_empty());
    }

    #[test]
    fn parsing_is_deterministic() {
        let raw = "Q: One?\nOptions: A. x B. y\nCorrect: A\n\nQ: Two?\n\nnoise";
        assert_eq!(parse_questions(raw), parse_questions(raw));
    }

    #[test]
    fn block_order_is_preserved_and_promptless_blocks_dropped() {
        let raw = "Here are your questions:\n\n\
                   Q: First?\n\n\
                   Options: A. orphan B. options\nCorrect: A\n\n\
                   Q: Second?\nOptions: A. yes B. no\nCorrect: B";
        let batch = parse_questions(raw);
        let prompts: Vec<&str> = batch.iter().map(Question::prompt).collect();
        assert_eq!(prompts, vec!["First?", "Second?"]);
        assert!(matches!(batch.get(1), Some(Question::MultipleChoice { correct: 'B', .. })));
    }

    #[test]
    fn answer_key_outside_offered_labels_degrades() {
        let batch = parse_questions("Q: Pick one\nOptions: A. x B. y\nCorrect: E");
        assert_eq!(
            batch.get(0),
            Some(&Question::OpenEnded {
                prompt: "Pick one".to_string()
            })
        );
    }

    #[test]
    fn options_without_answer_key_degrade() {
        let batch = parse_questions("Q: Pick one\nOptions: A. x B. y C. z D. w");
        assert!(matches!(batch.get(0), Some(Question::OpenEnded { .. })));

        let batch = parse_questions("Q: Pick one\nCorrect: A");
        assert!(matches!(batch.get(0), Some(Question::OpenEnded { .. })));
    }

    #[test]
    fn option_counts_other_than_four_are_accepted() {
        let batch = parse_questions("Q: True or false?\nOptions: A. True B. False\nCorrect: A");
        assert_eq!(labels(batch.get(0).unwrap()), vec!['A', 'B']);

        let batch = parse_questions(
            "Q: Pick\nOptions: A. a B. b C. c D. d E. e F. f\nCorrect: F",
        );
        assert_eq!(batch.get(0).unwrap().options().len(), 6);
        assert!(matches!(batch.get(0), Some(Question::MultipleChoice { correct: 'F', .. })));
    }

    #[test]
    fn options_may_continue_on_following_lines() {
        let raw = "Q: Which keyword declares a constant in Rust?\n\
                   Options:\n\
                   A) let\n\
                   B) const\n\
                   C) static mut\n\
                   Correct: B) const";
        let question = parse_questions(raw).into_vec().remove(0);
        assert_eq!(labels(&question), vec!['A', 'B', 'C']);
        assert_eq!(question.options()[2].text, "static mut");
        assert_eq!(question.check(&['B']), Some(true));
    }

    #[test]
    fn questions_without_blank_separator_are_split() {
        let raw = "Q1: Define ownership.\nQ2: Define borrowing.";
        let prompts: Vec<String> = parse_questions(raw)
            .into_iter()
            .map(|q| q.prompt().to_string())
            .collect();
        assert_eq!(prompts, vec!["Define ownership.", "Define borrowing."]);
    }

    #[test]
    fn prompt_may_wrap_onto_following_lines() {
        let batch = parse_questions("Q: Describe a project where\nyou scaled a service.");
        assert_eq!(
            batch.get(0).map(Question::prompt),
            Some("Describe a project where you scaled a service.")
        );
    }

    #[test]
    fn empty_prompt_marker_is_dropped() {
        assert!(parse_questions("Q:\nOptions: A. x\nCorrect: A").is_empty());
    }

    #[test]
    fn answer_separators_are_tolerated() {
        let batch = parse_questions(
            "Q: Pick\nOptions: A. a B. b C. c D. d\nCorrect answers: a and d",
        );
        assert_eq!(
            batch.get(0).unwrap().correct_labels(),
            BTreeSet::from(['A', 'D'])
        );
    }

    #[test]
    fn initials_inside_option_text_are_not_labels() {
        let batch = parse_questions(
            "Q: Who was the 35th US president?\n\
             Options: A. John F. Kennedy B. Richard Nixon C. Lyndon B. Johnson D. Gerald Ford\n\
             Correct: A",
        );
        let question = batch.get(0).unwrap();
        assert_eq!(labels(question), vec!['A', 'B', 'C', 'D']);
        assert_eq!(question.options()[0].text, "John F. Kennedy");
        assert_eq!(question.options()[2].text, "Lyndon B. Johnson");
        assert!(matches!(question, Question::MultipleChoice { correct: 'A', .. }));
    }

    #[test]
    fn out_of_sequence_option_lines_extend_the_previous_option() {
        let raw = "Q: Pick\nOptions:\nA) first\nC) not a label here\nB) second\nCorrect: B";
        let question = parse_questions(raw).into_vec().remove(0);
        assert_eq!(labels(&question), vec!['A', 'B']);
        assert_eq!(question.options()[0].text, "first C) not a label here");
    }

    #[test]
    fn partly_readable_answer_key_degrades() {
        let batch = parse_questions(
            "Q: Which are smart pointers?\nOptions: A. Box B. int C. Rc D. char\nCorrect: Both A and C",
        );
        assert_eq!(
            batch.get(0),
            Some(&Question::OpenEnded {
                prompt: "Which are smart pointers?".to_string()
            })
        );
    }

    #[test]
    fn unrecognised_option_lines_are_ignored() {
        let raw = "Q: Which keyword declares a binding?\nOptions:\n- A. let\na) var\nCorrect: A";
        let question = parse_questions(raw).into_vec().remove(0);
        assert_eq!(question.prompt(), "Which keyword declares a binding?");
        assert!(question.options().is_empty());
        assert!(matches!(question, Question::OpenEnded { .. }));
    }
}
