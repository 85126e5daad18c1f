use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// Asks the vision model about a single base64-encoded image and returns its
/// textual answer.
pub async fn describe(
	cfg: &faro_config::LlmProviderConfig,
	prompt: &str,
	image_b64: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": [user_message(prompt, image_b64)],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	crate::chat::message_content(&json)
		.map(str::to_string)
		.ok_or_else(|| eyre::eyre!("Vision response has no message content."))
}

/// A user message pairing the prompt with one inline image attachment.
pub fn user_message(prompt: &str, image_b64: &str) -> Value {
	serde_json::json!({
		"role": "user",
		"content": [
			{ "type": "text", "text": prompt },
			{
				"type": "image_url",
				"image_url": { "url": format!("data:image/jpeg;base64,{image_b64}") }
			}
		]
	})
}
