//! Prompt Builder — the deterministic analysis instruction.
//!
//! The schema wording here and the field names in `report.rs` are the same
//! contract; `test_prompt_names_every_report_field` keeps them honest.

/// System prompt for the analysis call.
pub const ANALYSIS_SYSTEM: &str = "You are a helpful resume analysis AI.";

/// Builds the analysis prompt embedding both inputs verbatim.
///
/// Pure function of its inputs: identical texts produce identical prompts.
/// Each input is fenced with a backtick run longer than any run inside it,
/// so resume or job text containing fences cannot terminate a block early.
pub fn build_analysis_prompt(resume_text: &str, job_text: &str) -> String {
    let job_fence = fence_for(job_text);
    let resume_fence = fence_for(resume_text);

    format!(
        r#"You are an AI resume analysis assistant. Analyze the following job description and candidate resume.

JOB DESCRIPTION:
{job_fence}
{job_text}
{job_fence}

CANDIDATE RESUME:
{resume_fence}
{resume_text}
{resume_fence}

Tasks:
1. Compute a relevancy score (0-100) with breakdown:
   - Skill Match %
   - Experience Match %
   - Education Match %
2. Assess reliability and learning potential:
   - Is the candidate consistent in skill acquisition and career progression?
   - Does their history suggest they are a fast learner?
   - Return a score (0-100) for each.
3. Identify suspicious or potentially false information:
   - List any red flags (exaggerated claims, missing details, vague buzzwords).
   - Return a binary value: Suspicious (Yes/No).
4. Extract the candidate's key achievements:
   - Which ones align directly with this job?
   - Which ones are transferable to other roles?

All scores are integers on the 0-100 scale.

Return the result strictly as JSON matching this exact schema, with no markdown fences and no text outside the JSON object:
{{
  "relevancy_score": {{ "overall": 0-100, "skills": 0-100, "experience": 0-100, "education": 0-100 }},
  "reliability_score": 0-100,
  "learning_potential": 0-100,
  "suspicious": "Yes/No",
  "red_flags": [ "..." ],
  "key_achievements": {{
    "directly_relevant": [ "..." ],
    "transferable": [ "..." ]
  }}
}}"#
    )
}

/// Returns a backtick fence one longer than the longest backtick run in
/// `text`, never shorter than three.
fn fence_for(text: &str) -> String {
    let mut longest = 0usize;
    let mut current = 0usize;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}
