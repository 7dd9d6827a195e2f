//! Corpus and question insights.

use crate::clusterer::SimilarityClusterer;
use crate::history::HistoryLog;
use crate::types::{Chunk, Cluster, Document, DocumentStats};
use askpolicy_core::AppResult;
use std::collections::HashMap;

/// Minimum length (exclusive) of a term counted by [`frequent_terms`].
const MIN_TERM_LEN: usize = 4;

/// Cluster a snapshot of the `limit` most recent questions.
pub async fn faq_insights(
    history: &HistoryLog,
    clusterer: &SimilarityClusterer,
    limit: usize,
) -> AppResult<Vec<Cluster>> {
    let questions = history.read_recent(limit)?;
    tracing::debug!("Clustering {} recent questions", questions.len());
    clusterer.top_faqs(&questions).await
}

/// Document, chunk and word counts.
pub fn document_stats(documents: &[Document], chunks: &[Chunk]) -> DocumentStats {
    DocumentStats {
        num_documents: documents.len(),
        num_chunks: chunks.len(),
        total_words: documents
            .iter()
            .map(|doc| doc.content.split_whitespace().count())
            .sum(),
    }
}

/// Most common longer words across all chunks.
///
/// Counts lowercase whitespace-separated tokens that are purely alphabetic
/// and longer than four characters. Equal counts keep first-occurrence order.
pub fn frequent_terms(chunks: &[Chunk], top_k: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for chunk in chunks {
        for word in chunk.content.to_lowercase().split_whitespace() {
            if word.chars().count() <= MIN_TERM_LEN || !word.chars().all(char::is_alphabetic) {
                continue;
            }
            match slots.get(word) {
                Some(&slot) => counts[slot].1 += 1,
                None => {
                    slots.insert(word.to_string(), counts.len());
                    counts.push((word.to_string(), 1));
                }
            }
        }
    }

    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(top_k);
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::embeddings::Embedder;
    use std::sync::Arc;

    #[test]
    fn test_document_stats() {
        let docs = vec![
            Document::new("Employees get 20 days annual leave.", "leave.txt"),
            Document::new("Probation period is 3 months.", "probation.txt"),
        ];
        let chunks = vec![
            Chunk::new("Employees get 20 days annual leave.", "leave.txt", 0),
            Chunk::new("Probation period is 3 months.", "probation.txt", 0),
        ];

        let stats = document_stats(&docs, &chunks);
        assert_eq!(stats.num_documents, 2);
        assert_eq!(stats.num_chunks, 2);
        assert_eq!(stats.total_words, 11);
    }

    #[test]
    fn test_frequent_terms_filters_and_ranks() {
        let chunks = vec![
            Chunk::new("Annual leave accrues monthly. Leave requests need approval", "a", 0),
            Chunk::new("Unused annual leave expires. Annual review in March", "b", 0),
        ];

        let terms = frequent_terms(&chunks, 3);
        // "monthly." and "expires." fail the alphabetic check
        assert_eq!(
            terms,
            vec![
                ("annual".to_string(), 3),
                ("leave".to_string(), 3),
                ("accrues".to_string(), 1),
            ]
        );
    }

    #[test]
    fn test_frequent_terms_empty() {
        assert!(frequent_terms(&[], 10).is_empty());
    }

    #[tokio::test]
    async fn test_faq_insights_uses_recent_snapshot() {
        let history = HistoryLog::in_memory().unwrap();
        for q in ["What is leave policy?", "what is the leave policy?", "How many sick days?"] {
            history.append(q).unwrap();
        }

        let embedder = Arc::new(Embedder::with_provider(Arc::new(TrigramProvider::new(384))));
        let clusterer = SimilarityClusterer::new(embedder, 0.85, 5);

        let all = faq_insights(&history, &clusterer, 500).await.unwrap();
        assert_eq!(all.len(), 2);

        // Only the two newest questions fall inside the window
        let recent = faq_insights(&history, &clusterer, 2).await.unwrap();
        let counts: Vec<usize> = recent.iter().map(|c| c.member_count).collect();
        assert_eq!(counts, vec![1, 1]);
    }
}
