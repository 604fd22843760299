//! Prompt templates for the reranker and the novelty adjudicator.

/// Longest candidate or match text inlined into a prompt, in characters.
pub const MAX_PROMPT_ARTICLE_CHARS: usize = 4_000;

pub const RERANK_SYSTEM_PROMPT: &str =
    "You assess whether two news articles report on the same real-world story. \
     Answer with a single JSON object.";

pub const NOVELTY_SYSTEM_PROMPT: &str =
    "You are an experienced news editor. Decide whether an incoming article should be \
     PUBLISHED or SKIPPED based on whether it adds meaningful new information compared \
     to existing coverage. Answer with a single JSON object.";

/// Relevance prompt for one fused candidate.
#[must_use]
pub fn rerank_prompt(incoming: &str, candidate: &str) -> String {
    let incoming = scoop_core::text::excerpt(incoming, MAX_PROMPT_ARTICLE_CHARS);
    let candidate = scoop_core::text::excerpt(candidate, MAX_PROMPT_ARTICLE_CHARS);
    format!(
        "Rate how relevant the CANDIDATE article is to the QUERY article on a scale of 0.0 to 1.0.

- 1.0: same story, same entities, directly comparable
- 0.7-0.9: same subject, closely related context
- 0.4-0.6: some overlap (same organisation, same period) but a different story
- 0.1-0.3: loosely related
- 0.0: unrelated

QUERY:
{incoming}

CANDIDATE:
{candidate}

Respond in JSON:
{{\"relevance\": 0.0-1.0, \"reason\": \"brief explanation\"}}"
    )
}

/// Novelty prompt comparing the incoming article with every relevant match.
#[must_use]
pub fn novelty_prompt(incoming: &str, existing: &[&str]) -> String {
    let incoming = scoop_core::text::excerpt(incoming, MAX_PROMPT_ARTICLE_CHARS);
    let coverage = existing
        .iter()
        .enumerate()
        .map(|(idx, text)| {
            format!(
                "[Article {}]:\n{}",
                idx + 1,
                scoop_core::text::excerpt(text, MAX_PROMPT_ARTICLE_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n");

    format!(
        "Compare the INCOMING article against EXISTING coverage.

PUBLISH if the incoming article contains any of:
1. Status change: the situation progressed (\"in talks\" to \"signed\", \"charged\" to \"convicted\")
2. New financial details: confirmed figures, new amounts, bonus structures
3. New parties: additional people or organisations entering the story
4. Timeline updates: new deadlines, results, announcement dates
5. Contradictions: disputes or corrects existing reporting
6. Significant new context: why something happened, internal dynamics

SKIP if:
- the same facts are reworded
- only phrasing differs, with no new claims
- the same quotes or figures are reordered

EXISTING COVERAGE:
{coverage}

INCOMING ARTICLE:
{incoming}

Respond in JSON:
{{
    \"decision\": \"PUBLISH\" or \"SKIP\",
    \"confidence\": 0.0-1.0,
    \"reasoning\": \"2-3 sentence explanation\",
    \"new_information\": [\"specific new facts if PUBLISH, empty list if SKIP\"],
    \"status_change_detected\": true or false
}}"
    )
}
