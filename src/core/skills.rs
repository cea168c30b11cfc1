use once_cell::sync::Lazy;
use regex::Regex;

use super::models::SkillSet;

/// Reference vocabulary for keyword skill matching. Matches are reported in
/// this order, not in the order they occur in the resume.
pub const DEFAULT_VOCABULARY: &[&str] = &[
    "sql",
    "python",
    "java",
    "javascript",
    "typescript",
    "c++",
    "c#",
    "go",
    "rust",
    "kotlin",
    "swift",
    "react",
    "angular",
    "node.js",
    "django",
    "flask",
    "spring",
    "html",
    "css",
    "aws",
    "azure",
    "gcp",
    "docker",
    "kubernetes",
    "terraform",
    "git",
    "linux",
    "mongodb",
    "postgresql",
    "mysql",
    "redis",
    "kafka",
    "spark",
    "hadoop",
    "tableau",
    "power bi",
    "excel",
    "machine learning",
    "deep learning",
    "nlp",
    "tensorflow",
    "pytorch",
    "pandas",
    "numpy",
    "scikit-learn",
    "data analysis",
    "rest api",
    "graphql",
    "microservices",
    "ci/cd",
];

static LIST_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[-*•]+|\d+[.)])\s*").unwrap());
static SKILLS_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:tech(?:nical)?\s+stack|skills)\s*:\s*").unwrap());

/// Every vocabulary entry occurring anywhere in `text`, case-insensitively,
/// in vocabulary order.
pub fn match_vocabulary<S: AsRef<str>>(text: &str, vocabulary: &[S]) -> SkillSet {
    let haystack = text.to_lowercase();
    vocabulary
        .iter()
        .map(|entry| entry.as_ref())
        .filter(|entry| {
            let needle = entry.trim().to_lowercase();
            !needle.is_empty() && haystack.contains(&needle)
        })
        .collect()
}

pub fn match_default_vocabulary(text: &str) -> SkillSet {
    match_vocabulary(text, DEFAULT_VOCABULARY)
}

/// Parses an LLM's skill list. Items may be separated by commas or lines and
/// carry bullets or numbering; a leading `Skills:` label is dropped.
pub fn skills_from_completion(raw: &str) -> SkillSet {
    let mut skills = SkillSet::new();
    for line in raw.lines() {
        let line = SKILLS_LABEL_RE.replace(line.trim(), "");
        for item in line.split(',') {
            let item = LIST_MARKER_RE.replace(item.trim(), "");
            skills.insert(item.trim_matches(|c: char| {
                c == '.' || c == '"' || c == '\'' || c.is_whitespace()
            }));
        }
    }

    skills
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_order_wins_over_text_order() {
        let skills = match_vocabulary("Worked in Python, then SQL.", &["sql", "python", "java"]);
        assert_eq!(skills.iter().collect::<Vec<_>>(), vec!["sql", "python"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let skills = match_default_vocabulary("DOCKER and Kubernetes on AWS");
        assert!(skills.contains("docker"));
        assert!(skills.contains("kubernetes"));
        assert!(skills.contains("aws"));
        assert!(!skills.contains("azure"));
    }

    #[test]
    fn substring_matching_is_literal() {
        // "javascript" contains "java"; both are reported.
        let skills = match_vocabulary("JavaScript", &["java", "javascript"]);
        assert_eq!(skills.len(), 2);
    }

    #[test]
    fn completion_lists_are_split_cleaned_and_deduplicated() {
        let raw = "Skills: Python, SQL, Docker\n- Kubernetes\n2. python\n* Machine Learning.";
        let skills = skills_from_completion(raw);
        assert_eq!(
            skills.iter().collect::<Vec<_>>(),
            vec!["python", "sql", "docker", "kubernetes", "machine learning"]
        );
    }

    #[test]
    fn empty_completion_yields_no_skills() {
        assert!(skills_from_completion("").is_empty());
        assert!(skills_from_completion(" ,\n , ").is_empty());
    }
}
