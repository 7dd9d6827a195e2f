//! Offline answer quality metrics.
//!
//! Both scores compare an answer against the text it was generated from
//! (the retrieved passages joined by newlines). They measure how closely
//! the answer stays to the source wording, not whether it is correct.

use crate::types::AnswerResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Highest n-gram order used by BLEU.
const MAX_NGRAM: usize = 4;

/// Numerator substituted for an n-gram order with no matches.
const SMOOTHING_EPSILON: f64 = 0.1;

/// Scores for one answered question.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationScores {
    pub rouge_l_f1: f64,
    pub bleu: f64,
}

/// Score an answer against its retrieved context and log the result.
pub fn evaluate(result: &AnswerResult) -> EvaluationScores {
    let reference = result.reference_text();
    let scores = EvaluationScores {
        rouge_l_f1: rouge_l_f1(&reference, &result.answer_text),
        bleu: sentence_bleu(&reference, &result.answer_text),
    };

    tracing::info!(
        question = %result.question,
        backend = %result.backend_used,
        rouge_l_f1 = scores.rouge_l_f1,
        bleu = scores.bleu,
        "Evaluated answer"
    );

    scores
}

/// ROUGE-L F-measure from the longest common subsequence of tokens.
pub fn rouge_l_f1(reference: &str, candidate: &str) -> f64 {
    let reference = rouge_tokens(reference);
    let candidate = rouge_tokens(candidate);
    if reference.is_empty() || candidate.is_empty() {
        return 0.0;
    }

    let lcs = lcs_len(&reference, &candidate) as f64;
    if lcs == 0.0 {
        return 0.0;
    }

    let precision = lcs / candidate.len() as f64;
    let recall = lcs / reference.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

fn rouge_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Sentence-level BLEU-4 over whitespace tokens.
///
/// Uniform weights and a brevity penalty. An order with no matching n-grams
/// contributes `0.1 / total` instead of zero, except that a candidate sharing
/// no unigram with the reference scores 0.
pub fn sentence_bleu(reference: &str, candidate: &str) -> f64 {
    let reference: Vec<&str> = reference.split_whitespace().collect();
    let candidate: Vec<&str> = candidate.split_whitespace().collect();

    let mut log_sum = 0.0;
    for n in 1..=MAX_NGRAM {
        let (matches, total) = clipped_matches(&reference, &candidate, n);
        if n == 1 && matches == 0 {
            return 0.0;
        }
        let precision = if matches == 0 {
            SMOOTHING_EPSILON / total as f64
        } else {
            matches as f64 / total as f64
        };
        log_sum += precision.ln() / MAX_NGRAM as f64;
    }

    brevity_penalty(reference.len(), candidate.len()) * log_sum.exp()
}

/// Clipped n-gram matches and the candidate n-gram count (at least 1).
fn clipped_matches(reference: &[&str], candidate: &[&str], n: usize) -> (usize, usize) {
    let reference_counts = ngram_counts(reference, n);
    let candidate_counts = ngram_counts(candidate, n);

    let matches = candidate_counts
        .iter()
        .map(|(gram, count)| (*count).min(reference_counts.get(gram).copied().unwrap_or(0)))
        .sum::<usize>();
    let total = candidate_counts.values().sum::<usize>().max(1);

    (matches, total)
}

fn ngram_counts<'a>(tokens: &'a [&'a str], n: usize) -> HashMap<&'a [&'a str], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

fn brevity_penalty(reference_len: usize, candidate_len: usize) -> f64 {
    if candidate_len > reference_len {
        1.0
    } else if candidate_len == 0 {
        0.0
    } else {
        (1.0 - reference_len as f64 / candidate_len as f64).exp()
    }
}
