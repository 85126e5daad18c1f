use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Embeds `texts` through the configured OpenAI-compatible endpoint, returning
/// one vector per input in input order.
pub async fn embed(
	cfg: &faro_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
		"dimensions": cfg.dimensions,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_embedding_response(json, texts.len())
}

fn parse_embedding_response(json: Value, expected: usize) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Embedding response has no data array."))?;
	let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];

	for (position, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(position);
		let vector = parse_vector(item)?;

		if index >= slots.len() {
			return Err(eyre::eyre!("Embedding index {index} is out of range."));
		}

		slots[index] = Some(vector);
	}

	slots
		.into_iter()
		.enumerate()
		.map(|(index, slot)| {
			slot.ok_or_else(|| eyre::eyre!("Embedding response is missing input {index}."))
		})
		.collect()
}

fn parse_vector(item: &Value) -> Result<Vec<f32>> {
	let values = item
		.get("embedding")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Embedding item has no embedding array."))?;

	values
		.iter()
		.map(|value| {
			value
				.as_f64()
				.map(|number| number as f32)
				.ok_or_else(|| eyre::eyre!("Embedding values must be numeric."))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn reorders_vectors_by_index() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json, 2).expect("parse failed");

		assert_eq!(parsed, vec![vec![0.5, 1.5], vec![2.0, 3.0]]);
	}

	#[test]
	fn missing_inputs_are_an_error() {
		let json = serde_json::json!({
			"data": [
				{ "index": 0, "embedding": [0.5] }
			]
		});

		assert!(parse_embedding_response(json, 2).is_err());
	}
}
