//! Similarity Clusterer: groups near-duplicate historical questions.
//!
//! Single greedy pass in input order. Each unvisited question opens a
//! cluster and absorbs every later unvisited question whose similarity to
//! it reaches the threshold. Clusters are not transitively closed: a
//! question similar only to an absorbed member stays out.

use crate::embeddings::Embedder;
use crate::similarity::cosine_similarity;
use crate::types::Cluster;
use askpolicy_core::config::InsightsConfig;
use askpolicy_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Arc;

pub struct SimilarityClusterer {
    embedder: Arc<Embedder>,
    threshold: f32,
    top_k: usize,
}

impl SimilarityClusterer {
    pub fn new(embedder: Arc<Embedder>, threshold: f32, top_k: usize) -> Self {
        Self {
            embedder,
            threshold,
            top_k,
        }
    }

    pub fn from_config(embedder: Arc<Embedder>, config: &InsightsConfig) -> Self {
        Self::new(embedder, config.similarity_threshold, config.top_k)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Rank clusters of `questions` and return the top `k`.
    pub async fn top_faqs(&self, questions: &[String]) -> AppResult<Vec<Cluster>> {
        if questions.is_empty() {
            return Ok(Vec::new());
        }

        let embeddings = self.embedder.embed_batch(questions).await?;
        let mut clusters = greedy_clusters(questions, &embeddings, self.threshold)?;
        let total = clusters.len();
        clusters.truncate(self.top_k);

        tracing::info!(
            questions = questions.len(),
            clusters = total,
            returned = clusters.len(),
            threshold = self.threshold,
            "Clustered historical questions"
        );

        Ok(clusters)
    }
}

/// Greedy clustering over precomputed embeddings.
///
/// Returns every cluster ordered by member count descending; equal counts
/// keep first-occurrence order. Representatives with identical text share
/// one entry whose count is the sum.
pub fn greedy_clusters(
    questions: &[String],
    embeddings: &[Vec<f32>],
    threshold: f32,
) -> AppResult<Vec<Cluster>> {
    if questions.len() != embeddings.len() {
        return Err(AppError::InvalidInput(format!(
            "{} questions but {} embeddings",
            questions.len(),
            embeddings.len()
        )));
    }

    let n = questions.len();
    let mut visited = vec![false; n];
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let mut count = 1;

        for j in (i + 1)..n {
            if visited[j] {
                continue;
            }
            if cosine_similarity(&embeddings[i], &embeddings[j]) >= threshold {
                count += 1;
                visited[j] = true;
            }
        }

        let text = questions[i].as_str();
        match slots.get(text) {
            Some(&slot) => clusters[slot].member_count += count,
            None => {
                slots.insert(text, clusters.len());
                clusters.push(Cluster {
                    representative_question: text.to_string(),
                    member_count: count,
                });
            }
        }
    }

    // Stable: ties keep first-occurrence order.
    clusters.sort_by(|a, b| b.member_count.cmp(&a.member_count));

    Ok(clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;

    fn questions(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    fn clusterer(threshold: f32, top_k: usize) -> SimilarityClusterer {
        let embedder = Arc::new(Embedder::with_provider(Arc::new(TrigramProvider::new(384))));
        SimilarityClusterer::new(embedder, threshold, top_k)
    }

    #[tokio::test]
    async fn test_empty_input() {
        assert!(clusterer(0.85, 5).top_faqs(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identical_questions_form_one_cluster() {
        let qs = questions(&["How do I apply for leave?"; 6]);
        let clusters = clusterer(0.85, 5).top_faqs(&qs).await.unwrap();

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].member_count, 6);
        assert_eq!(clusters[0].representative_question, "How do I apply for leave?");
    }

    #[tokio::test]
    async fn test_top_k_truncates() {
        let qs = questions(&["alpha", "bravo", "charlie", "delta"]);
        let clusters = clusterer(0.99, 2).top_faqs(&qs).await.unwrap();

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].representative_question, "alpha");
        assert_eq!(clusters[1].representative_question, "bravo");
    }

    #[test]
    fn test_distinct_questions_are_singletons() {
        let qs = questions(&["a", "b", "c"]);
        let embeddings = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];

        let clusters = greedy_clusters(&qs, &embeddings, 0.85).unwrap();
        assert_eq!(clusters.len(), 3);
        assert!(clusters.iter().all(|c| c.member_count == 1));
        assert_eq!(clusters[0].representative_question, "a");
    }

    #[test]
    fn test_ties_keep_first_occurrence_order() {
        let qs = questions(&["x", "y", "x2", "y2", "z"]);
        let embeddings = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
        ];

        let clusters = greedy_clusters(&qs, &embeddings, 0.85).unwrap();
        let ranked: Vec<(&str, usize)> = clusters
            .iter()
            .map(|c| (c.representative_question.as_str(), c.member_count))
            .collect();
        assert_eq!(ranked, vec![("x", 2), ("y", 2), ("z", 1)]);
    }

    #[test]
    fn test_greedy_merge_is_not_transitive() {
        // sim(a,b) and sim(b,c) pass, sim(a,c) does not
        let qs = questions(&["a", "b", "c"]);
        let angle = |deg: f32| {
            let rad = deg.to_radians();
            vec![rad.cos(), rad.sin()]
        };
        let embeddings = vec![angle(0.0), angle(25.0), angle(50.0)];

        let clusters = greedy_clusters(&qs, &embeddings, 0.85).unwrap();
        let ranked: Vec<(&str, usize)> = clusters
            .iter()
            .map(|c| (c.representative_question.as_str(), c.member_count))
            .collect();
        assert_eq!(ranked, vec![("a", 2), ("c", 1)]);
    }

    #[test]
    fn test_visited_member_is_not_reassigned() {
        // b matches both a and c; a claims it first
        let qs = questions(&["a", "c", "b"]);
        let angle = |deg: f32| {
            let rad = deg.to_radians();
            vec![rad.cos(), rad.sin()]
        };
        let embeddings = vec![angle(0.0), angle(50.0), angle(25.0)];

        let clusters = greedy_clusters(&qs, &embeddings, 0.85).unwrap();
        assert_eq!(clusters[0].representative_question, "a");
        assert_eq!(clusters[0].member_count, 2);
        assert_eq!(clusters[1].member_count, 1);
    }

    #[test]
    fn test_reordering_keeps_cluster_sizes() {
        // Groups are mutually orthogonal and tight within, so similarity is transitive
        let items: Vec<(&str, Vec<f32>)> = vec![
            ("leave-1", vec![1.0, 0.0, 0.0, 0.0]),
            ("leave-2", vec![0.99, 0.05, 0.0, 0.0]),
            ("leave-3", vec![0.98, 0.0, 0.05, 0.0]),
            ("sick-1", vec![0.0, 0.0, 1.0, 0.0]),
            ("sick-2", vec![0.0, 0.0, 0.99, 0.05]),
            ("pay-1", vec![0.0, 0.0, 0.0, 1.0]),
            ("pay-2", vec![0.0, 0.05, 0.0, 0.99]),
            ("car", vec![-1.0, 0.0, 0.0, 0.0]),
        ];
        let orders: [Vec<usize>; 4] = [
            (0..8).collect(),
            (0..8).rev().collect(),
            vec![3, 7, 0, 5, 1, 4, 6, 2],
            vec![6, 2, 4, 0, 7, 3, 1, 5],
        ];

        let sizes = |order: &[usize]| {
            let qs: Vec<String> = order.iter().map(|&i| items[i].0.to_string()).collect();
            let embeddings: Vec<Vec<f32>> = order.iter().map(|&i| items[i].1.clone()).collect();
            let mut counts: Vec<usize> = greedy_clusters(&qs, &embeddings, 0.85)
                .unwrap()
                .iter()
                .map(|c| c.member_count)
                .collect();
            counts.sort_unstable();
            counts
        };

        for order in &orders {
            assert_eq!(sizes(order), vec![1, 2, 2, 3], "order {:?}", order);
        }
    }

    #[test]
    fn test_identical_representatives_accumulate() {
        // Zero vectors never reach the threshold, so each opens a cluster
        let qs = questions(&["ok", "ok", "ok"]);
        let embeddings = vec![vec![0.0, 0.0]; 3];

        let clusters = greedy_clusters(&qs, &embeddings, 0.85).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].member_count, 3);
    }

    #[test]
    fn test_mismatched_lengths() {
        let result = greedy_clusters(&questions(&["a"]), &[], 0.85);
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
