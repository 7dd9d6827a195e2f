//! In-process extractive generation backend.
//!
//! Used when the Ollama service is unreachable. It does not synthesize text:
//! it takes the context and question attached to the request (or, for a bare
//! prompt, the `Context:` and `Question:` sections of it), scores each context sentence by how many of the question's content words
//! it contains, and answers with the best sentences verbatim. The greeting and
//! not-specified policies are applied the same way the prompt instructs a
//! model to apply them.

use crate::client::{Grounding, LlmClient, LlmRequest, LlmResponse, LlmUsage};
use askpolicy_core::config::AnswerPolicyConfig;
use askpolicy_core::AppResult;
use std::collections::HashSet;

/// Header line that opens the context section of the prompt.
pub const CONTEXT_HEADER: &str = "Context:";

/// Header line that opens the question section of the prompt.
pub const QUESTION_HEADER: &str = "Question:";

/// Trailing cue line after the question; closes the question section.
pub const ANSWER_CUE: &str = "Answer:";

/// Maximum number of sentences in an extracted answer.
const MAX_ANSWER_SENTENCES: usize = 2;

/// Minimum stem length for prefix matching ("leave" ~ "leaves").
const MIN_STEM_LEN: usize = 4;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "with", "from", "this", "that", "have", "has",
    "had", "its", "their", "they", "them", "what", "when", "where", "which", "who", "whom", "why",
    "how", "many", "much", "does", "did", "can", "could", "would", "should", "will", "about",
    "our", "your", "you", "any", "there", "into", "than", "then",
];

/// Extractive fallback backend.
#[derive(Debug, Clone)]
pub struct ExtractiveClient {
    policy: AnswerPolicyConfig,
}

/// The two prompt sections the backend works from.
#[derive(Debug, Default, PartialEq)]
struct PromptSections {
    context: String,
    question: String,
}

impl ExtractiveClient {
    /// Create a backend applying the given answer policies.
    pub fn new(policy: AnswerPolicyConfig) -> Self {
        Self { policy }
    }

    /// Produce an answer for a constrained prompt.
    pub fn answer(&self, prompt: &str) -> String {
        self.answer_sections(&split_sections(prompt))
    }

    /// Produce an answer straight from the retrieved context and question.
    pub fn answer_grounded(&self, grounding: &Grounding) -> String {
        self.answer_sections(&PromptSections {
            context: grounding.context.trim().to_string(),
            question: grounding.question.trim().to_string(),
        })
    }

    fn answer_sections(&self, sections: &PromptSections) -> String {
        if is_greeting(&sections.question, &self.policy.greetings) {
            return self.policy.greeting_response.clone();
        }

        let terms = content_terms(&sections.question);
        if terms.is_empty() {
            return self.policy.not_specified_response.clone();
        }

        let sentences = split_sentences(&sections.context);
        let scored: Vec<(usize, &str)> = sentences
            .iter()
            .map(|sentence| (overlap_score(&terms, sentence), sentence.as_str()))
            .collect();

        let best = scored.iter().map(|(score, _)| *score).max().unwrap_or(0);
        if best == 0 {
            return self.policy.not_specified_response.clone();
        }

        scored
            .iter()
            .filter(|(score, _)| *score == best)
            .take(MAX_ANSWER_SENTENCES)
            .map(|(_, sentence)| *sentence)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait::async_trait]
impl LlmClient for ExtractiveClient {
    fn provider_name(&self) -> &str {
        "extractive"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let content = match &request.grounding {
            Some(grounding) => self.answer_grounded(grounding),
            None => self.answer(&request.prompt),
        };
        tracing::debug!(chars = content.len(), "Extractive backend produced answer");

        Ok(LlmResponse {
            content,
            model: "extractive".to_string(),
            usage: LlmUsage::default(),
        })
    }
}

/// Check whether `text` is one of the configured greetings.
///
/// Comparison ignores case, surrounding whitespace and punctuation.
pub fn is_greeting(text: &str, greetings: &[String]) -> bool {
    let normalized = normalize_phrase(text);
    !normalized.is_empty()
        && greetings
            .iter()
            .any(|greeting| normalize_phrase(greeting) == normalized)
}

fn normalize_phrase(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a prompt into its context and question sections.
///
/// The context runs from the first `Context:` header to the last `Question:`
/// header and the question from there to the last `Answer:` cue, so header
/// lines inside the context itself are kept as context.
fn split_sections(prompt: &str) -> PromptSections {
    let lines: Vec<&str> = prompt.lines().collect();
    let is_header = |i: &usize, header: &str| lines[*i].trim() == header;

    let question_at = (0..lines.len()).rev().find(|i| is_header(i, QUESTION_HEADER));
    let context_at = (0..question_at.unwrap_or(lines.len())).find(|i| is_header(i, CONTEXT_HEADER));

    let context = match (context_at, question_at) {
        (Some(start), Some(end)) => join_trimmed(&lines[start + 1..end], "\n"),
        (Some(start), None) => join_trimmed(&lines[start + 1..], "\n"),
        _ => String::new(),
    };

    let question = match question_at {
        Some(start) => {
            let end = (start + 1..lines.len())
                .rev()
                .find(|i| is_header(i, ANSWER_CUE))
                .unwrap_or(lines.len());
            join_trimmed(&lines[start + 1..end], " ")
        }
        None => String::new(),
    };

    PromptSections { context, question }
}

fn join_trimmed(lines: &[&str], separator: &str) -> String {
    lines
        .iter()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join(separator)
        .trim()
        .to_string()
}

/// Split text into sentences on terminal punctuation and line breaks.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if c == '\n' {
            push_sentence(&mut sentences, &mut current);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            push_sentence(&mut sentences, &mut current);
        }
    }
    push_sentence(&mut sentences, &mut current);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
}

/// Distinct question words worth matching on.
fn content_terms(question: &str) -> Vec<String> {
    let stop: HashSet<&str> = STOP_WORDS.iter().copied().collect();
    let mut seen = HashSet::new();

    tokens(question)
        .filter(|w| w.chars().count() >= 3 || w.chars().all(|c| c.is_ascii_digit()))
        .filter(|w| !stop.contains(w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Number of distinct question terms that appear in the sentence.
fn overlap_score(terms: &[String], sentence: &str) -> usize {
    let words: Vec<String> = tokens(sentence).collect();
    terms
        .iter()
        .filter(|term| words.iter().any(|word| terms_match(term, word)))
        .count()
}

fn terms_match(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= MIN_STEM_LEN && long.starts_with(short)
}
