//! System prompt constants and templates for the reviewer, moderator
//! and meta-planner agents.
//!
//! Mirrors the teacher's `prompts.rs`: named preamble constants plus a
//! prompt version marker, kept here so a preamble change is visible in
//! one diff rather than scattered across call sites.

use roundtable::model::{Review, RoleSpec};

/// Bump on any preamble content change.
pub const PROMPT_VERSION: &str = "1.1.0";

/// Appended to every reviewer preamble: the exact JSON shape
/// `roundtable::agents::parse_review_response` expects.
pub const REVIEW_JSON_INSTRUCTIONS: &str = "\n\nRespond with ONLY a JSON object, no prose before or after it, of this exact shape:\n\
{\"issues\":[{\"severity\":\"low|medium|high\",\"category\":\"short tag like security, clarity, completeness\",\"summary\":\"...\",\"location\":\"optional file/section reference\",\"suggestion\":\"optional\"}],\"summary\":\"one paragraph overall assessment\",\"approved\":true|false}\n\
`approved` should be true only if you found no high-severity issues.";

/// Build a reviewer's full preamble from its `RoleSpec`: the role's own
/// system prompt plus its expertise/perspective framing and the fixed
/// structured-output contract.
pub fn reviewer_preamble(role: &RoleSpec) -> String {
    format!(
        "{system_prompt}\n\nYour role: {role_title}\nYour expertise: {expertise}\nYour perspective: {perspective}\n\n\
         You are reviewing a single document version in isolation. You do not see other reviewers' feedback.{json}",
        system_prompt = role.system_prompt,
        role_title = role.role,
        expertise = role.expertise,
        perspective = role.perspective,
        json = REVIEW_JSON_INSTRUCTIONS,
    )
}

/// Sent as a follow-up prompt when a reviewer's first response could
/// not be parsed as JSON.
pub const SALVAGE_INSTRUCTIONS: &str =
    "That response could not be parsed as JSON. Resend ONLY the JSON object described above — no markdown fences, no commentary.";

/// Moderator preamble: synthesize a document and its reviews into the
/// next version.
pub const MODERATOR_PREAMBLE: &str = "\
You are the moderator of a roundtable document review. Several reviewers have independently \
critiqued the current document version. Your job is to produce the next version of the document \
by addressing their feedback.

## Rules
- Output ONLY the revised document text. No preamble, no meta-commentary, no markdown fences \
  around the whole thing.
- You MUST resolve every High-severity issue raised; leaving one unresolved is only acceptable \
  when a reviewer's High finding is factually wrong, and even then you should adjust the text so \
  the concern no longer applies. Address medium and low-severity issues where doing so doesn't \
  conflict with a higher-priority fix.
- You MUST NOT invent facts, numbers, or claims that appear nowhere in the current document or \
  the reviewer feedback. When a reviewer's suggestion requires information you don't have, insert \
  a clearly marked placeholder (e.g. \"[NEEDS INPUT: ...]\") naming exactly what is missing rather \
  than fabricating it.
- Preserve the document's existing structure and voice unless a reviewer specifically flagged it.
- If reviewers disagree, use your judgment — you are the final synthesizer, not a vote counter.
- If a reviewer's feedback is out of scope or factually wrong, you may leave the related text \
  unchanged; you do not have to accept every suggestion.
";

/// Render the moderator's user-turn prompt: the document plus its
/// reviews, the session's synthesis focus, and its optional goal.
pub fn moderator_prompt(document: &str, reviews: &[Review], moderator_focus: &str, goal: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(goal) = goal {
        prompt.push_str("## Session goal\n\n");
        prompt.push_str(goal);
        prompt.push_str("\n\n");
    }
    if !moderator_focus.is_empty() {
        prompt.push_str("## Moderator focus\n\n");
        prompt.push_str(moderator_focus);
        prompt.push_str("\n\n");
    }
    prompt.push_str("## Current document\n\n");
    prompt.push_str(document);
    prompt.push_str("\n\n## Reviewer feedback\n\n");
    for review in reviews {
        prompt.push_str(&format!(
            "### {} (approved: {})\n{}\n",
            review.participant_id, review.approved, review.summary
        ));
        for issue in &review.issues {
            prompt.push_str(&format!("- [{} / {}] {}", issue.severity, issue.category, issue.summary));
            if let Some(location) = &issue.location {
                prompt.push_str(&format!(" (at {location})"));
            }
            if let Some(suggestion) = &issue.suggestion {
                prompt.push_str(&format!(" — suggestion: {suggestion}"));
            }
            prompt.push('\n');
        }
        prompt.push('\n');
    }
    prompt.push_str("Produce the complete revised document now.");
    prompt
}

/// Meta-planner preamble: infer a reviewer role set and a moderator
/// focus for a document.
pub const PLANNER_PREAMBLE: &str = "\
You design review panels. Given a document and an optional domain hint, propose a set of \
reviewer roles whose expertise and perspective are distinct and together give broad coverage of \
the document's likely weaknesses, plus a short focus statement for the moderator who will later \
synthesize their feedback.

Respond with ONLY a JSON object, no prose, of this exact shape:
{\"moderator_focus\":\"what the moderator should prioritize when synthesizing reviews\",\
\"roles\":[{\"name\":\"short-kebab-case-id\",\"role\":\"short title, e.g. Security Reviewer\",\
\"expertise\":\"what this reviewer is an expert in\",\"perspective\":\"the angle they read the document from\",\
\"system_prompt\":\"the full system prompt this reviewer will be given\"}]}
";

/// Render the meta-planner's user-turn prompt.
pub fn planner_prompt(document: &str, domain_hint: Option<&str>, num_participants: usize) -> String {
    let mut prompt = String::new();
    if let Some(hint) = domain_hint {
        prompt.push_str(&format!("Domain hint: {hint}\n\n"));
    }
    prompt.push_str(&format!("Propose exactly {num_participants} reviewer roles for this document:\n\n"));
    prompt.push_str(document);
    prompt
}
