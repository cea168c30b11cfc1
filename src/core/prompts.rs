// Prompt builders for the interview completions. The completion text is fed
// back through `question_parser::parse_questions`, so every question prompt
// asks for the block layout that parser reads.

use super::models::InterviewLevel;

/// Layout instruction appended to every question-producing prompt.
pub const QUESTION_FORMAT_INSTRUCTION: &str = "\
Format every question as its own block, separated by one blank line:
Q: <question>
Options: A. <option> B. <option> C. <option> D. <option>
Correct: <label>[, <label>]
Omit the Options and Correct lines for open-ended questions.";

pub struct QuestionRequest<'a> {
    pub resume_text: &'a str,
    pub job_role: &'a str,
    pub level: InterviewLevel,
    pub topic: Option<&'a str>,
    pub count: usize,
}

pub fn question_generation_prompt(request: &QuestionRequest<'_>) -> String {
    let mut prompt = format!(
        "You are an AI Interviewer. Your task is to generate a set of {level} level interview \
questions for a candidate applying for the role of {role}.
If a topic is specified (like databases, ML, cloud, etc.), generate questions focused on that topic.

Resume of the candidate:
\"\"\"
{resume}
\"\"\"

Generate {count} relevant questions and wait for the candidate's response before continuing.

{format}",
        level = request.level,
        role = request.job_role.trim(),
        resume = request.resume_text,
        count = request.count,
        format = QUESTION_FORMAT_INSTRUCTION,
    );

    if let Some(topic) = non_blank(request.topic) {
        prompt.push_str(&format!("\n\nCurrent topic: {topic}"));
    }

    prompt
}

pub fn follow_up_prompt(request: &QuestionRequest<'_>, answer: &str) -> String {
    let focus = non_blank(request.topic)
        .map(|topic| format!("Focus on topic: {topic}\n"))
        .unwrap_or_default();

    format!(
        "Here is the candidate's answer:
\"\"\"
{answer}
\"\"\"

Please provide the next {count} {level} questions for the role of {role}.
{focus}Resume:
\"\"\"
{resume}
\"\"\"

{format}",
        answer = answer.trim(),
        count = request.count,
        level = request.level,
        role = request.job_role.trim(),
        resume = request.resume_text,
        format = QUESTION_FORMAT_INSTRUCTION,
    )
}

pub fn skills_extraction_prompt(resume_text: &str) -> String {
    format!(
        "List the technical skills, tools and technologies mentioned in this resume.
Reply with a single comma-separated list and nothing else.

Resume:
\"\"\"
{resume_text}
\"\"\""
    )
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
