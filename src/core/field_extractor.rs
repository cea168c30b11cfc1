use once_cell::sync::Lazy;
use regex::Regex;

use super::models::{CandidateProfile, ExtractedText, FieldValue, ProfileField, SkillSet};
use super::skills::{self, DEFAULT_VOCABULARY};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\+?\(?\d[\d \t\-\(\)]*\d\)?").unwrap());
static EXPERIENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*years?\b").unwrap());

static POSITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:position(?:[ \t]+applied[ \t]+for)?|applying[ \t]+for|desired[ \t]+role|role|job[ \t]+title)[ \t]*[:\-][ \t]*(\S.*)$",
    )
    .unwrap()
});
static LOCATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(?:location|address|based[ \t]+in|city)[ \t]*[:\-][ \t]*(\S.*)$")
        .unwrap()
});

const MIN_PHONE_DIGITS: usize = 8;

/// Runs every field heuristic independently over the resume text.
pub fn extract_profile(text: &ExtractedText) -> CandidateProfile {
    extract_profile_with_vocabulary(text, DEFAULT_VOCABULARY)
}

pub fn extract_profile_with_vocabulary<S: AsRef<str>>(
    text: &ExtractedText,
    vocabulary: &[S],
) -> CandidateProfile {
    let text = text.as_str();
    let skills = skills::match_vocabulary(text, vocabulary);

    let mut profile = CandidateProfile::empty();
    let resolved = [
        (ProfileField::FullName, guess_name(text)),
        (ProfileField::Email, extract_email(text)),
        (ProfileField::Phone, extract_phone(text)),
        (ProfileField::ExperienceYears, extract_experience_years(text)),
        (ProfileField::Position, extract_labelled(&POSITION_RE, text)),
        (ProfileField::Location, extract_labelled(&LOCATION_RE, text)),
        (ProfileField::TechStack, tech_stack(&skills)),
    ];
    for (field, value) in resolved {
        if let FieldValue::Found(value) = FieldValue::from_option(value) {
            profile.set_field(field, value);
        }
    }

    profile
}

pub fn extract_email(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

/// First run of at least eight digits, optionally prefixed with `+` and
/// broken up by spaces, hyphens or parentheses. Date ranges such as
/// `2019 - 2023` also satisfy this and will be reported as a phone number.
pub fn extract_phone(text: &str) -> Option<String> {
    PHONE_RE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .find(|candidate| candidate.chars().filter(char::is_ascii_digit).count() >= MIN_PHONE_DIGITS)
        .map(|candidate| candidate.to_string())
}

/// First line of two to four words with at least two capitalised words.
/// Headings like "Software Engineer" or "Work Experience" also qualify, so
/// on resumes that don't open with the name this picks the wrong line.
pub fn guess_name(text: &str) -> Option<String> {
    for raw in text.lines() {
        let line = raw.trim();
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.len() < 2 || words.len() > 4 {
            continue;
        }

        let capitalised = words
            .iter()
            .filter(|w| w.chars().next().map(|c| c.is_uppercase()).unwrap_or(false))
            .count();
        if capitalised >= 2 {
            return Some(words.join(" "));
        }
    }

    None
}

/// Largest `N` in `N years` / `N+ years`. Only one- and two-digit counts
/// are read, so `100 years` or `2015 year` never register.
pub fn extract_experience_years(text: &str) -> Option<String> {
    EXPERIENCE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .map(|years| years.to_string())
}

fn extract_labelled(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn tech_stack(skills: &SkillSet) -> Option<String> {
    if skills.is_empty() {
        None
    } else {
        Some(skills.joined())
    }
}
