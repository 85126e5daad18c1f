use serde::{Deserialize, Serialize};

use faro_domain::style::AnswerStyle;
use faro_retrieval::SourceRef;

/// Chat request consumed from the serving boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
	pub question: String,
	/// Base64-encoded attached image, when the client sent one.
	#[serde(default)]
	pub image: Option<String>,
	#[serde(default)]
	pub style: Option<AnswerStyle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOutcome {
	pub answer: String,
	pub final_images: Vec<String>,
	pub sources: Vec<SourceRef>,
	pub trace: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
	Greeting,
	DataLookup,
	Retrieval,
}

/// Per-request record filled in by successive node transitions. Exclusively
/// owned by the one in-flight request; fields of unchosen paths keep their
/// initial empty values.
#[derive(Debug)]
pub struct PipelineState {
	pub question: String,
	pub query_image: Option<String>,
	pub style: AnswerStyle,
	pub route: Option<Route>,
	pub context: String,
	pub candidate_images: Vec<String>,
	pub visual_evidence: String,
	pub final_images: Vec<String>,
	pub sources: Vec<SourceRef>,
	pub answer: String,
	pub trace: Vec<String>,
}

impl PipelineState {
	pub fn new(request: ChatRequest) -> Self {
		Self {
			question: request.question,
			query_image: request.image,
			style: request.style.unwrap_or_default(),
			route: None,
			context: String::new(),
			candidate_images: Vec::new(),
			visual_evidence: String::new(),
			final_images: Vec::new(),
			sources: Vec::new(),
			answer: String::new(),
			trace: Vec::new(),
		}
	}

	/// Merges one node's partial update. Nodes never mutate shared state
	/// directly; the runner owns the merge.
	pub fn apply(&mut self, update: StateUpdate) {
		let StateUpdate {
			question,
			route,
			context,
			candidate_images,
			visual_evidence,
			final_images,
			sources,
			answer,
			trace,
		} = update;

		if let Some(question) = question {
			self.question = question;
		}
		if let Some(route) = route {
			self.route = Some(route);
		}
		if let Some(context) = context {
			self.context = context;
		}
		if let Some(candidate_images) = candidate_images {
			self.candidate_images = candidate_images;
		}
		if let Some(visual_evidence) = visual_evidence {
			self.visual_evidence = visual_evidence;
		}
		if let Some(final_images) = final_images {
			self.final_images = final_images;
		}
		if let Some(sources) = sources {
			self.sources = sources;
		}
		if let Some(answer) = answer {
			self.answer = answer;
		}

		self.trace.extend(trace);
	}

	pub fn into_outcome(self) -> ChatOutcome {
		ChatOutcome {
			answer: self.answer,
			final_images: self.final_images,
			sources: self.sources,
			trace: self.trace,
		}
	}
}

/// Partial update produced by one node transition.
#[derive(Debug, Default)]
pub struct StateUpdate {
	pub question: Option<String>,
	pub route: Option<Route>,
	pub context: Option<String>,
	pub candidate_images: Option<Vec<String>>,
	pub visual_evidence: Option<String>,
	pub final_images: Option<Vec<String>>,
	pub sources: Option<Vec<SourceRef>>,
	pub answer: Option<String>,
	pub trace: Vec<String>,
}

impl StateUpdate {
	pub fn trace_line(line: impl Into<String>) -> Self {
		Self { trace: vec![line.into()], ..Self::default() }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(question: &str) -> ChatRequest {
		ChatRequest { question: question.to_string(), image: None, style: None }
	}

	#[test]
	fn updates_merge_without_clearing_untouched_fields() {
		let mut state = PipelineState::new(request("¿Qué dice el convenio?"));

		state.apply(StateUpdate {
			context: Some("evidencia".to_string()),
			trace: vec!["retriever".to_string()],
			..StateUpdate::default()
		});
		state.apply(StateUpdate {
			answer: Some("respuesta".to_string()),
			trace: vec!["generator".to_string()],
			..StateUpdate::default()
		});

		assert_eq!(state.context, "evidencia");
		assert_eq!(state.answer, "respuesta");
		assert_eq!(state.trace, vec!["retriever".to_string(), "generator".to_string()]);
		assert!(state.candidate_images.is_empty());
	}

	#[test]
	fn question_rewrite_replaces_the_original() {
		let mut state = PipelineState::new(request("¿Qué pone aquí?"));

		state.apply(StateUpdate {
			question: Some("¿Qué pone aquí?\n\nCONTEXTO DE IMAGEN ADJUNTA:\nuna nómina".to_string()),
			..StateUpdate::default()
		});

		assert!(state.question.contains("CONTEXTO DE IMAGEN ADJUNTA"));
	}
}
