use serde_json::Value;

use crate::{
	LookupKind, Pipeline, Route, StateUpdate, images::encode_image_base64, prompts,
	state::PipelineState,
};

/// Describes an attached query image and folds the description into the
/// question so every later node sees it. No-op without an attachment.
pub(crate) async fn image_analyzer(pipeline: &Pipeline, state: &PipelineState) -> StateUpdate {
	let Some(image) = state.query_image.as_deref() else {
		return StateUpdate::default();
	};

	let prompt = prompts::image_query_prompt(&state.question);

	match pipeline
		.providers
		.vision
		.describe(&pipeline.cfg.providers.vision, &prompt, image)
		.await
	{
		Ok(description) => StateUpdate {
			question: Some(format!(
				"{}\n\nCONTEXTO DE IMAGEN ADJUNTA:\n{description}",
				state.question
			)),
			trace: vec!["Imagen adjunta analizada y añadida a la pregunta.".to_string()],
			..StateUpdate::default()
		},
		Err(err) => {
			tracing::warn!(error = %err, "Query image analysis failed; continuing without it.");

			StateUpdate::default()
		},
	}
}

/// Entity questions go straight to retrieval without a model call; everything
/// else is classified, and a failed or unparseable classification fails open
/// toward the richer document-retrieval path.
pub(crate) async fn router(pipeline: &Pipeline, state: &PipelineState) -> StateUpdate {
	if pipeline.matcher.detect(&state.question).is_entity_query() {
		return StateUpdate {
			route: Some(Route::Retrieval),
			trace: vec![
				"Router: consulta de entidad detectada, ruta directa a recuperación.".to_string(),
			],
			..StateUpdate::default()
		};
	}

	let prompt = prompts::classifier_prompt(&state.question);
	let messages = [serde_json::json!({ "role": "user", "content": prompt })];
	let decision = match pipeline
		.providers
		.chat
		.complete(&pipeline.cfg.providers.chat, &messages)
		.await
	{
		Ok(raw) => {
			let raw = raw.to_uppercase();

			if raw.contains("SALUDO") {
				Route::Greeting
			} else if raw.contains("DATA") {
				Route::DataLookup
			} else {
				Route::Retrieval
			}
		},
		Err(err) => {
			tracing::warn!(error = %err, "Classification failed; defaulting to retrieval.");

			Route::Retrieval
		},
	};

	match decision {
		Route::Greeting => StateUpdate {
			route: Some(Route::Greeting),
			answer: Some(prompts::GREETING_RESPONSE.to_string()),
			trace: vec!["Router: saludo, respuesta inmediata.".to_string()],
			..StateUpdate::default()
		},
		Route::DataLookup => StateUpdate {
			route: Some(Route::DataLookup),
			trace: vec!["Router: consulta de datos tabulares.".to_string()],
			..StateUpdate::default()
		},
		Route::Retrieval => StateUpdate {
			route: Some(Route::Retrieval),
			trace: vec!["Router: consulta documental.".to_string()],
			..StateUpdate::default()
		},
	}
}

/// Extracts `{name, type}` from the question and resolves it against the
/// structured-record collaborator. Extraction failures degrade to safe
/// defaults; lookup failures degrade to an error context, never a request
/// failure.
pub(crate) async fn data_tool(pipeline: &Pipeline, state: &PipelineState) -> StateUpdate {
	let prompt = prompts::extraction_prompt(&state.question);
	let messages = [serde_json::json!({ "role": "user", "content": prompt })];
	let (name, kind) = match pipeline
		.providers
		.chat
		.extract(&pipeline.cfg.providers.chat, &messages)
		.await
	{
		Ok(parsed) => parse_lookup(&parsed),
		Err(err) => {
			tracing::warn!(error = %err, "Record extraction failed; using defaults.");

			("Desconocido".to_string(), LookupKind::General)
		},
	};
	let mut trace = vec![format!(
		"Herramienta de datos: consultando '{name}' ({}).",
		kind.as_str()
	)];

	let context = match pipeline.records.lookup(&name, kind).await {
		Ok(records) => format!("DATOS DE RRHH CONSULTADOS:\n{records}"),
		Err(err) => {
			tracing::warn!(error = %err, "Record lookup failed.");
			trace.push("La consulta de registros falló.".to_string());

			prompts::RECORD_LOOKUP_FAILURE_CONTEXT.to_string()
		},
	};

	StateUpdate { context: Some(context), trace, ..StateUpdate::default() }
}

pub(crate) async fn retriever(pipeline: &Pipeline, state: &PipelineState) -> StateUpdate {
	let outcome = pipeline.retriever.retrieve(&state.question).await;

	StateUpdate {
		context: Some(outcome.context),
		candidate_images: Some(outcome.candidate_images),
		sources: Some(outcome.sources),
		trace: outcome.steps,
		..StateUpdate::default()
	}
}

/// Verifies each candidate image visually. When the verifier rejects every
/// candidate, all of them are kept as "related": an over-strict verifier must
/// not erase recall the retriever already paid for.
pub(crate) async fn visual_filter(pipeline: &Pipeline, state: &PipelineState) -> StateUpdate {
	if state.candidate_images.is_empty() {
		return StateUpdate {
			final_images: Some(Vec::new()),
			visual_evidence: Some(String::new()),
			..StateUpdate::default()
		};
	}

	let prompt = prompts::visual_verification_prompt(&state.question);
	let mut validated = Vec::new();
	let mut observations = Vec::new();
	let mut trace = vec![format!(
		"Analizando {} imágenes candidatas.",
		state.candidate_images.len()
	)];

	for path in &state.candidate_images {
		let Some(image_b64) = encode_image_base64(&pipeline.images_root, path) else {
			continue;
		};

		match pipeline
			.providers
			.vision
			.describe(&pipeline.cfg.providers.vision, &prompt, &image_b64)
			.await
		{
			Ok(analysis) => {
				let verdict = analysis.to_uppercase();

				if verdict.contains("SÍ") || verdict.contains("YES") {
					validated.push(path.clone());
					observations.push(format!("OBSERVACIÓN ({path}): {analysis}"));
				}
			},
			Err(err) => {
				tracing::warn!(path = %path, error = %err, "Visual verification failed; skipping image.");
			},
		}
	}

	if validated.is_empty() {
		trace.push(
			"Filtro visual sin confirmaciones; se mantienen las candidatas por similitud."
				.to_string(),
		);
		validated = state.candidate_images.clone();
	}

	StateUpdate {
		final_images: Some(validated),
		visual_evidence: Some(observations.join("\n")),
		trace,
		..StateUpdate::default()
	}
}

/// Builds the grounded generation prompt and screens the model output before
/// it leaves the pipeline. With no evidence at all it answers the fixed
/// not-found message instead of calling the model.
pub(crate) async fn generator(pipeline: &Pipeline, state: &PipelineState) -> StateUpdate {
	if state.route == Some(Route::Greeting) {
		return StateUpdate::default();
	}
	if state.context.is_empty() && state.visual_evidence.is_empty() {
		return StateUpdate {
			answer: Some(prompts::NOT_FOUND_RESPONSE.to_string()),
			trace: vec!["Sin evidencia; respuesta fija de no encontrado.".to_string()],
			..StateUpdate::default()
		};
	}

	let block = prompts::context_block(&state.context, &state.visual_evidence);
	let prompt = prompts::generation_prompt(state.style, &block, &state.question);
	let messages = [serde_json::json!({ "role": "user", "content": prompt })];

	match pipeline
		.providers
		.chat
		.complete(&pipeline.cfg.providers.chat, &messages)
		.await
	{
		Ok(raw) => StateUpdate {
			answer: Some(pipeline.guardrail.screen(raw)),
			trace: vec!["Respuesta generada.".to_string()],
			..StateUpdate::default()
		},
		Err(err) => {
			tracing::warn!(error = %err, "Generation failed.");

			StateUpdate {
				answer: Some(prompts::GENERATION_FAILURE_RESPONSE.to_string()),
				trace: vec!["La generación falló; respuesta degradada.".to_string()],
				..StateUpdate::default()
			}
		},
	}
}

fn parse_lookup(parsed: &Value) -> (String, LookupKind) {
	let name = parsed
		.get("name")
		.and_then(Value::as_str)
		.filter(|name| !name.trim().is_empty())
		.unwrap_or("Desconocido")
		.to_string();
	let kind = parsed
		.get("type")
		.and_then(Value::as_str)
		.map(LookupKind::parse)
		.unwrap_or(LookupKind::General);

	(name, kind)
}
