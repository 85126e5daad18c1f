use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Pairwise relevance scores between `query` and each of `docs`, aligned to
/// the input order of `docs`.
pub async fn rerank(
	cfg: &faro_config::ProviderConfig,
	query: &str,
	docs: &[String],
) -> Result<Vec<f32>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "model": cfg.model, "query": query, "documents": docs });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_rerank_response(json, docs.len())
}

fn parse_rerank_response(json: Value, doc_count: usize) -> Result<Vec<f32>> {
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Rerank response has no results array."))?;
	let mut scores = vec![0.0_f32; doc_count];

	for item in results {
		let Some(index) = item.get("index").and_then(|v| v.as_u64()).map(|v| v as usize) else {
			return Err(eyre::eyre!("Rerank result is missing its document index."));
		};
		let Some(score) = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
		else {
			return Err(eyre::eyre!("Rerank result is missing its relevance score."));
		};

		if index < scores.len() {
			scores[index] = score as f32;
		}
	}

	Ok(scores)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn aligns_scores_to_document_order() {
		let json = serde_json::json!({
			"results": [
				{ "index": 2, "relevance_score": 0.1 },
				{ "index": 0, "relevance_score": 0.9 },
				{ "index": 1, "score": 0.4 }
			]
		});
		let scores = parse_rerank_response(json, 3).expect("parse failed");

		assert_eq!(scores, vec![0.9, 0.4, 0.1]);
	}

	#[test]
	fn scoreless_results_are_an_error() {
		let json = serde_json::json!({ "results": [{ "index": 0 }] });

		assert!(parse_rerank_response(json, 1).is_err());
	}
}
