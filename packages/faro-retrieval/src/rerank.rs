use crate::{
	RerankProvider,
	fusion::{Candidate, cmp_f32_desc},
};

/// A candidate annotated by the reranker. `rerank_score` is `None` when the
/// reranker did not run and the fusion order was kept.
#[derive(Debug, Clone)]
pub struct RankedResult {
	pub candidate: Candidate,
	pub rerank_score: Option<f32>,
}

/// Re-scores `candidates` against `query` with the pairwise relevance
/// provider and keeps the strongest `top_k`. A failing or misbehaving
/// provider degrades to the first `top_k` candidates in their input order;
/// reranking trades quality, never availability.
pub async fn rerank_candidates(
	provider: &dyn RerankProvider,
	cfg: &faro_config::ProviderConfig,
	query: &str,
	candidates: Vec<Candidate>,
	top_k: usize,
) -> Vec<RankedResult> {
	if candidates.is_empty() || top_k == 0 {
		return Vec::new();
	}

	let docs: Vec<String> =
		candidates.iter().map(|candidate| candidate.chunk.text.clone()).collect();
	let scores = match provider.rerank(cfg, query, &docs).await {
		Ok(scores) if scores.len() == candidates.len() => scores,
		Ok(scores) => {
			tracing::warn!(
				expected = candidates.len(),
				received = scores.len(),
				"Rerank provider returned a mismatched score count; keeping fusion order."
			);

			return fallback(candidates, top_k);
		},
		Err(err) => {
			tracing::warn!(error = %err, "Rerank provider failed; keeping fusion order.");

			return fallback(candidates, top_k);
		},
	};

	let mut ranked: Vec<RankedResult> = candidates
		.into_iter()
		.zip(scores)
		.map(|(candidate, score)| RankedResult { candidate, rerank_score: Some(score) })
		.collect();

	ranked.sort_by(|left, right| {
		cmp_f32_desc(left.rerank_score.unwrap_or(0.0), right.rerank_score.unwrap_or(0.0))
	});
	ranked.truncate(top_k);

	ranked
}

fn fallback(candidates: Vec<Candidate>, top_k: usize) -> Vec<RankedResult> {
	candidates
		.into_iter()
		.take(top_k)
		.map(|candidate| RankedResult { candidate, rerank_score: None })
		.collect()
}
