use std::sync::Arc;

use async_stream::stream;
use futures::{Stream, StreamExt};

use faro_domain::guardrail::STREAM_BLOCK_NOTICE;
use faro_retrieval::SourceRef;

use crate::{ChatRequest, Pipeline, PipelineState, Route, nodes, prompts};

/// Delimiter separating streamed prose from the trailing metadata payload on
/// the text transport. Collision with generated prose is a documented
/// fragility of this contract; consumers split on the first occurrence.
pub const METADATA_DELIMITER: &str = "__METADATA_JSON__";

/// Tagged two-part stream contract: any number of token frames followed by
/// exactly one terminal metadata frame.
#[derive(Debug, Clone, serde::Serialize)]
pub enum StreamEvent {
	Token(String),
	Metadata(StreamMetadata),
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StreamMetadata {
	pub images: Vec<String>,
	pub sources: Vec<SourceRef>,
}

impl StreamEvent {
	/// Renders the event for the plain-text transport: tokens verbatim, the
	/// metadata frame behind the delimiter.
	pub fn into_wire(self) -> String {
		match self {
			Self::Token(token) => token,
			Self::Metadata(metadata) => {
				let payload = serde_json::to_string(&metadata).unwrap_or_else(|err| {
					tracing::warn!(error = %err, "Failed to encode stream metadata.");

					"{}".to_string()
				});

				format!("\n{METADATA_DELIMITER}{payload}")
			},
		}
	}
}

impl Pipeline {
	/// Streaming execution: the routing and context-building nodes run
	/// synchronously, then generation is emitted token by token. Dropping the
	/// returned stream stops generation; nothing runs past the last poll.
	pub fn run_streaming(
		self: Arc<Self>,
		request: ChatRequest,
	) -> impl Stream<Item = StreamEvent> + Send + 'static {
		let pipeline = self;

		stream! {
			let mut state = PipelineState::new(request);

			state.apply(nodes::image_analyzer(&pipeline, &state).await);
			state.apply(nodes::router(&pipeline, &state).await);

			match state.route {
				Some(Route::Greeting) | None => {
					yield StreamEvent::Token(state.answer.clone());
					yield StreamEvent::Metadata(StreamMetadata::default());

					return;
				},
				Some(Route::DataLookup) => {
					let update = nodes::data_tool(&pipeline, &state).await;

					state.apply(update);
				},
				Some(Route::Retrieval) => {
					let update = nodes::retriever(&pipeline, &state).await;

					state.apply(update);

					let update = nodes::visual_filter(&pipeline, &state).await;

					state.apply(update);
				},
			}

			let block = prompts::context_block(&state.context, &state.visual_evidence);
			let system = prompts::streaming_system_prompt(state.style, &block);
			let user = match state.query_image.as_deref() {
				Some(image) => faro_providers::vision::user_message(&state.question, image),
				None => serde_json::json!({ "role": "user", "content": state.question.clone() }),
			};
			let messages = [
				serde_json::json!({ "role": "system", "content": system }),
				user,
			];

			match pipeline
				.providers
				.chat
				.stream(&pipeline.cfg.providers.chat, &messages)
				.await
			{
				Ok(mut tokens) => {
					let mut accumulated = String::new();

					while let Some(item) = tokens.next().await {
						match item {
							Ok(token) => {
								accumulated.push_str(&token);

								if pipeline.guardrail.leak(&accumulated).is_some() {
									yield StreamEvent::Token(STREAM_BLOCK_NOTICE.to_string());

									break;
								}

								yield StreamEvent::Token(token);
							},
							Err(err) => {
								tracing::warn!(error = %err, "Token stream failed mid-generation.");

								break;
							},
						}
					}
				},
				Err(err) => {
					tracing::warn!(error = %err, "Streaming generation could not start.");

					yield StreamEvent::Token(prompts::GENERATION_FAILURE_RESPONSE.to_string());
				},
			}

			yield StreamEvent::Metadata(StreamMetadata {
				images: state.final_images.clone(),
				sources: state.sources.clone(),
			});
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn metadata_frames_sit_behind_the_delimiter() {
		let event = StreamEvent::Metadata(StreamMetadata {
			images: vec!["static/labeled_images/tabla.png".to_string()],
			sources: Vec::new(),
		});
		let wire = event.into_wire();
		let (_, payload) = wire
			.split_once(METADATA_DELIMITER)
			.expect("Wire form must contain the delimiter.");
		let decoded: StreamMetadata =
			serde_json::from_str(payload).expect("Payload must be JSON.");

		assert_eq!(decoded.images.len(), 1);
	}

	#[test]
	fn token_frames_pass_through_verbatim() {
		assert_eq!(StreamEvent::Token("Hola".to_string()).into_wire(), "Hola");
	}
}
