use std::time::Duration;

use async_stream::try_stream;
use color_eyre::{Result, eyre};
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde_json::Value;

/// Single blocking chat completion; returns the assistant message text.
pub async fn complete(cfg: &faro_config::LlmProviderConfig, messages: &[Value]) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	message_content(&json)
		.map(str::to_string)
		.ok_or_else(|| eyre::eyre!("Chat response has no message content."))
}

/// Constrained extraction: asks for a JSON object and parses it out of the
/// completion, retrying a few times before giving up. Models wrap the object
/// in prose more often than not, so only the outermost brace span is parsed.
pub async fn extract(cfg: &faro_config::LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	for _ in 0..3 {
		let content = complete(cfg, messages).await?;

		if let Some(parsed) = parse_json_object(&content) {
			return Ok(parsed);
		}
	}

	Err(eyre::eyre!("Extraction response is not a JSON object."))
}

/// Token-by-token chat completion. Setup errors surface immediately; the
/// returned stream yields assistant text deltas until the provider closes it.
pub async fn stream(
	cfg: &faro_config::LlmProviderConfig,
	messages: &[Value],
) -> Result<impl Stream<Item = Result<String>> + Send + 'static> {
	// The total-request timeout would cut long generations short; bound the
	// connection and per-read waits instead.
	let client = Client::builder()
		.connect_timeout(Duration::from_millis(cfg.timeout_ms))
		.read_timeout(Duration::from_millis(cfg.timeout_ms))
		.build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"stream": true,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?
		.error_for_status()?;

	Ok(try_stream! {
		let mut bytes = res.bytes_stream();
		let mut buffer = String::new();

		'read: while let Some(chunk) = bytes.next().await {
			let chunk = chunk?;

			buffer.push_str(&String::from_utf8_lossy(&chunk));

			while let Some(newline) = buffer.find('\n') {
				let line = buffer[..newline].trim().to_string();

				buffer.drain(..=newline);

				match parse_stream_line(&line) {
					StreamLine::Token(token) => yield token,
					StreamLine::Done => break 'read,
					StreamLine::Skip => {},
				}
			}
		}
	})
}

enum StreamLine {
	Token(String),
	Done,
	Skip,
}

fn parse_stream_line(line: &str) -> StreamLine {
	let Some(payload) = line.strip_prefix("data:").map(str::trim) else {
		return StreamLine::Skip;
	};

	if payload == "[DONE]" {
		return StreamLine::Done;
	}

	let Ok(json) = serde_json::from_str::<Value>(payload) else {
		return StreamLine::Skip;
	};
	let delta = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("delta"))
		.and_then(|delta| delta.get("content"))
		.and_then(|content| content.as_str());

	match delta {
		Some(token) if !token.is_empty() => StreamLine::Token(token.to_string()),
		_ => StreamLine::Skip,
	}
}

pub(crate) fn message_content(json: &Value) -> Option<&str> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(|content| content.as_str())
}

fn parse_json_object(content: &str) -> Option<Value> {
	let start = content.find('{')?;
	let end = content.rfind('}')?;

	if end < start {
		return None;
	}

	let parsed: Value = serde_json::from_str(&content[start..=end]).ok()?;

	parsed.is_object().then_some(parsed)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn extracts_json_wrapped_in_prose() {
		let content = "Claro, aquí tienes: {\"name\": \"Ana\", \"type\": \"vacation\"} espero que sirva";
		let parsed = parse_json_object(content).expect("parse failed");

		assert_eq!(parsed["name"], "Ana");
	}

	#[test]
	fn rejects_content_without_an_object() {
		assert!(parse_json_object("no hay datos estructurados").is_none());
	}

	#[test]
	fn stream_lines_carry_delta_content() {
		let line = r#"data: {"choices":[{"delta":{"content":"Hola"}}]}"#;

		match parse_stream_line(line) {
			StreamLine::Token(token) => assert_eq!(token, "Hola"),
			_ => panic!("expected a token"),
		}
	}

	#[test]
	fn done_marker_ends_the_stream() {
		assert!(matches!(parse_stream_line("data: [DONE]"), StreamLine::Done));
		assert!(matches!(parse_stream_line(": keep-alive"), StreamLine::Skip));
	}
}
