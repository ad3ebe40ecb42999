//! Index build and query against an embedding capability.

use tracing::{debug, instrument, warn};

use tenderlens_providers::EmbeddingClient;
use tenderlens_shared::{Chunk, Result, TenderlensError};

use crate::flat::FlatIndex;

/// Nominal score attached to degraded (non-similarity) rankings.
///
/// Outside the range a normalized corpus hit would produce, so tests and
/// callers can tell heuristic results from genuine cosine scores.
pub const DEGRADED_SCORE: f32 = -1.0;

/// Embed every chunk text and build the flat index.
///
/// An embedding count that differs from the chunk count is fatal for the
/// build — the caller must not persist anything from it.
#[instrument(skip_all, fields(chunks = chunks.len()))]
pub async fn build_index<E: EmbeddingClient>(client: &E, chunks: &[Chunk]) -> Result<FlatIndex> {
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let embeddings = client.embed(&texts).await?;

    if embeddings.len() != chunks.len() {
        return Err(TenderlensError::validation(format!(
            "embedding count {} does not match chunk count {}",
            embeddings.len(),
            chunks.len()
        )));
    }

    let index = FlatIndex::from_embeddings(embeddings)?;
    debug!(vectors = index.len(), dim = index.dim(), "index built");
    Ok(index)
}

/// Rank chunks against a query, best first.
///
/// The query must be embedded by the same client that built the index.
/// If the embedding capability is unreachable the ranking degrades to
/// longest-chunks-first with [`DEGRADED_SCORE`] so the system still answers.
#[instrument(skip_all, fields(top_k))]
pub async fn retrieve<E: EmbeddingClient>(
    client: &E,
    index: &FlatIndex,
    chunks: &[Chunk],
    query: &str,
    top_k: usize,
) -> Result<Vec<(Chunk, f32)>> {
    let query_vec = match client.embed(std::slice::from_ref(&query.to_string())).await {
        Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
        Ok(_) => {
            warn!("embedding returned no vector for query, using degraded ranking");
            return Ok(degraded_rank(chunks, top_k));
        }
        Err(e) => {
            warn!(error = %e, "embedding unavailable, using degraded ranking");
            return Ok(degraded_rank(chunks, top_k));
        }
    };

    let hits = index.search(&query_vec, top_k)?;

    // Positions past the chunk list (exhausted index) are skipped, not errors.
    Ok(hits
        .into_iter()
        .filter_map(|(i, score)| chunks.get(i).cloned().map(|c| (c, score)))
        .collect())
}

/// Longest-chunks-first ranking used when no similarity search is possible.
pub fn degraded_rank(chunks: &[Chunk], top_k: usize) -> Vec<(Chunk, f32)> {
    let mut ranked: Vec<&Chunk> = chunks.iter().collect();
    ranked.sort_by_key(|c| std::cmp::Reverse(c.text.chars().count()));
    ranked
        .into_iter()
        .take(top_k)
        .map(|c| (c.clone(), DEGRADED_SCORE))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tenderlens_providers::HashEmbeddings;

    /// Embedding client that is always unreachable.
    struct DownEmbeddings;

    impl EmbeddingClient for DownEmbeddings {
        async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(TenderlensError::Embedding("connection refused".into()))
        }
    }

    /// Embedding client that drops the last vector.
    struct ShortEmbeddings;

    impl EmbeddingClient for ShortEmbeddings {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().skip(1).map(|_| vec![1.0, 0.0]).collect())
        }
    }

    fn make_chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Chunk {
                chunk_id: format!("s{i}_{i}"),
                page: 1,
                text: (*t).to_string(),
                section_hint: None,
            })
            .collect()
    }

    #[tokio::test]
    async fn identical_query_text_ranks_its_chunk_first() {
        let chunks = make_chunks(&[
            "earnest money deposit clause",
            "completion period is 18 months",
            "scope of work covers road widening",
        ]);
        let index = build_index(&HashEmbeddings, &chunks).await.unwrap();

        let ranked = retrieve(
            &HashEmbeddings,
            &index,
            &chunks,
            "completion period is 18 months",
            2,
        )
        .await
        .unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0.chunk_id, "s1_1");
        assert!((ranked[0].1 - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn embedding_count_mismatch_is_fatal() {
        let chunks = make_chunks(&["a", "b", "c"]);
        let err = build_index(&ShortEmbeddings, &chunks).await.unwrap_err();
        assert!(matches!(err, TenderlensError::Validation { .. }));
    }

    #[tokio::test]
    async fn unreachable_embeddings_degrade_to_length_ranking() {
        let chunks = make_chunks(&["short", "the longest chunk of them all", "medium length"]);
        let index = build_index(&HashEmbeddings, &chunks).await.unwrap();

        let ranked = retrieve(&DownEmbeddings, &index, &chunks, "anything", 2)
            .await
            .unwrap();

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0.chunk_id, "s1_1");
        assert!(ranked.iter().all(|(_, score)| *score == DEGRADED_SCORE));
    }

    #[tokio::test]
    async fn top_k_larger_than_corpus_returns_everything() {
        let chunks = make_chunks(&["only one"]);
        let index = build_index(&HashEmbeddings, &chunks).await.unwrap();

        let ranked = retrieve(&HashEmbeddings, &index, &chunks, "only one", 10)
            .await
            .unwrap();
        assert_eq!(ranked.len(), 1);
    }

    #[test]
    fn degraded_rank_is_stable_on_equal_lengths() {
        let chunks = make_chunks(&["aa", "bb", "c"]);
        let ranked = degraded_rank(&chunks, 3);
        assert_eq!(ranked[0].0.chunk_id, "s0_0");
        assert_eq!(ranked[1].0.chunk_id, "s1_1");
        assert_eq!(ranked[2].0.chunk_id, "s2_2");
    }
}
