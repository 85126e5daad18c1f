use faro_domain::{chunk::StoredChunk, entity::EntityDetection};
use faro_storage::qdrant::QdrantStore;

use crate::{
	Error, RankedResult, Result, RetrievalEngine, fusion::reciprocal_rank_fusion,
	rerank::rerank_candidates,
};

const SNIPPET_CHARS: usize = 50;
const LABELED_IMAGES_DIR: &str = "labeled_images";

/// Provenance of one evidence item, surfaced to the caller alongside the
/// answer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SourceRef {
	pub source: String,
	pub page: i64,
	pub snippet: String,
	pub score: String,
}

/// Everything the retrieval path contributes to a request. Empty on failure;
/// downstream generation handles "no evidence" explicitly.
#[derive(Debug, Clone, Default)]
pub struct RetrievalOutcome {
	pub context: String,
	pub sources: Vec<SourceRef>,
	pub candidate_images: Vec<String>,
	pub entity_query: bool,
	pub steps: Vec<String>,
}

impl RetrievalEngine {
	/// Produces the final evidence set for a question. Retrieval errors are
	/// recovered here: the pipeline always receives an outcome, possibly an
	/// empty one.
	pub async fn retrieve(&self, question: &str) -> RetrievalOutcome {
		let detection = self.matcher().detect(question);
		let entity_query = detection.is_entity_query();

		match self.retrieve_inner(question, &detection).await {
			Ok(outcome) => outcome,
			Err(err) => {
				tracing::warn!(error = %err, "Retrieval failed; continuing without evidence.");

				RetrievalOutcome {
					entity_query,
					steps: vec![
						"La recuperación falló; se continúa sin evidencia.".to_string(),
					],
					..RetrievalOutcome::default()
				}
			},
		}
	}

	async fn retrieve_inner(
		&self,
		question: &str,
		detection: &EntityDetection,
	) -> Result<RetrievalOutcome> {
		if detection.is_entity_query() {
			self.retrieve_entity(question, detection).await
		} else {
			self.retrieve_hybrid(question).await
		}
	}

	/// Exact-name-biased path: partition-filtered vector search plus a direct
	/// metadata scan that guarantees recall for names embedding similarity
	/// might rank low. Image retrieval is suppressed entirely.
	async fn retrieve_entity(
		&self,
		question: &str,
		detection: &EntityDetection,
	) -> Result<RetrievalOutcome> {
		let retrieval = &self.cfg.retrieval;
		let partitions = &self.cfg.routing.entity_partitions;
		let mut steps = vec![
			"Consulta de entidad detectada; búsqueda restringida a la partición de registros."
				.to_string(),
		];

		let filter = QdrantStore::sources_filter(partitions);
		let partition_chunks = self.store.scroll_chunks(Some(filter.clone())).await?;
		let direct_hits = direct_scan_hits(
			&partition_chunks,
			detection,
			retrieval.direct_scan_limit as usize,
		);

		if !direct_hits.is_empty() {
			steps.push(format!(
				"Recuperación directa por metadatos: {} coincidencias.",
				direct_hits.len()
			));
		}

		let question_vec = self.embed_single(question).await?;
		let filtered = self
			.store
			.search_chunks(question_vec, retrieval.fusion_k as u64, Some(filter))
			.await?;
		let candidates = reciprocal_rank_fusion(&[filtered], retrieval.rrf_k);

		steps.push(format!("Búsqueda filtrada: {} candidatos.", candidates.len()));

		let ranked = rerank_candidates(
			self.providers.rerank.as_ref(),
			&self.cfg.providers.rerank,
			question,
			candidates,
			retrieval.top_k as usize,
		)
		.await;

		steps.push(format!("Reranker seleccionó top-{}.", ranked.len()));
		steps.push("Imágenes desactivadas para consulta de entidad.".to_string());

		Ok(RetrievalOutcome {
			context: assemble_context(&direct_hits, &ranked),
			sources: ranked.iter().map(source_ref).collect(),
			candidate_images: Vec::new(),
			entity_query: true,
			steps,
		})
	}

	/// Hybrid path: lexical and vector legs fused with RRF, reranked, plus up
	/// to `max_image_candidates` image candidates from the image collection.
	async fn retrieve_hybrid(&self, question: &str) -> Result<RetrievalOutcome> {
		let retrieval = &self.cfg.retrieval;
		let leg_k = (retrieval.fusion_k as usize) * 2;
		let mut steps = vec!["Búsqueda híbrida (léxica + vectorial) iniciada.".to_string()];

		let dense_query = if self.cfg.expansion.mode == "always" {
			match self
				.providers
				.expansion
				.expand(&self.cfg.providers.chat, question)
				.await
			{
				Ok(expanded) if !expanded.trim().is_empty() => {
					steps.push("Consulta expandida para la búsqueda densa.".to_string());

					expanded
				},
				Ok(_) => question.to_string(),
				Err(err) => {
					tracing::warn!(error = %err, "Query expansion failed; using the raw question.");

					question.to_string()
				},
			}
		} else {
			question.to_string()
		};

		let lexical_hits: Vec<StoredChunk> = self
			.lexical
			.load()
			.search(question, leg_k)
			.into_iter()
			.map(|hit| hit.chunk)
			.collect();
		let question_vec = self.embed_single(question).await?;
		let dense_vec = if dense_query == question {
			question_vec.clone()
		} else {
			self.embed_single(&dense_query).await?
		};
		let vector_hits = self.store.search_chunks(dense_vec, leg_k as u64, None).await?;

		let mut candidates =
			reciprocal_rank_fusion(&[lexical_hits, vector_hits], retrieval.rrf_k);

		candidates.truncate(retrieval.fusion_k as usize);
		steps.push(format!("Fusión completada: {} candidatos.", candidates.len()));

		let ranked = rerank_candidates(
			self.providers.rerank.as_ref(),
			&self.cfg.providers.rerank,
			question,
			candidates,
			retrieval.top_k as usize,
		)
		.await;

		steps.push(format!("Reranker seleccionó top-{}.", ranked.len()));

		let candidate_images = self
			.candidate_images(question_vec, retrieval.max_image_candidates as u64)
			.await;

		if !candidate_images.is_empty() {
			steps.push(format!("{} imágenes candidatas recuperadas.", candidate_images.len()));
		}

		Ok(RetrievalOutcome {
			context: assemble_context(&[], &ranked),
			sources: ranked.iter().map(source_ref).collect(),
			candidate_images,
			entity_query: false,
			steps,
		})
	}

	/// Image misses are not worth failing a text answer over; they only cost
	/// the visual-evidence step.
	async fn candidate_images(&self, question_vec: Vec<f32>, limit: u64) -> Vec<String> {
		match self.store.search_images(question_vec, limit).await {
			Ok(images) => images
				.into_iter()
				.filter_map(|chunk| chunk.metadata.filename)
				.map(|filename| {
					format!("{}/{LABELED_IMAGES_DIR}/{filename}", self.cfg.service.static_root)
				})
				.collect(),
			Err(err) => {
				tracing::warn!(error = %err, "Image retrieval failed; continuing without images.");

				Vec::new()
			},
		}
	}

	async fn embed_single(&self, text: &str) -> Result<Vec<f32>> {
		let vectors = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &[text.to_string()])
			.await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}
}

/// Chunks from the entity partition whose name or record-id metadata contains
/// one of the detected tokens.
fn direct_scan_hits(
	chunks: &[StoredChunk],
	detection: &EntityDetection,
	limit: usize,
) -> Vec<StoredChunk> {
	let names: Vec<String> = detection.names.iter().map(|name| name.to_lowercase()).collect();
	let record_id = detection.record_id.as_ref().map(|id| id.to_lowercase());

	if names.is_empty() && record_id.is_none() {
		return Vec::new();
	}

	chunks
		.iter()
		.filter(|chunk| {
			let name_match = chunk.metadata.employee_name.as_ref().is_some_and(|employee| {
				let employee = employee.to_lowercase();

				names.iter().any(|name| employee.contains(name.as_str()))
			});
			let id_match = match (&record_id, &chunk.metadata.employee_id) {
				(Some(id), Some(employee_id)) => employee_id.to_lowercase().contains(id.as_str()),
				_ => false,
			};

			name_match || id_match
		})
		.take(limit)
		.cloned()
		.collect()
}

/// Direct-scan hits lead; reranked evidence follows in rank order, each item
/// substituting its expanded context when the ingester attached one.
fn assemble_context(direct_hits: &[StoredChunk], ranked: &[RankedResult]) -> String {
	let mut parts: Vec<&str> = direct_hits.iter().map(|chunk| chunk.text.as_str()).collect();

	parts.extend(ranked.iter().map(|result| result.candidate.chunk.evidence_text()));

	parts.join("\n\n")
}

fn source_ref(result: &RankedResult) -> SourceRef {
	let chunk = &result.candidate.chunk;
	let score = result.rerank_score.unwrap_or(0.0);

	SourceRef {
		source: if chunk.metadata.source.is_empty() {
			"Desconocido".to_string()
		} else {
			chunk.metadata.source.clone()
		},
		page: chunk.metadata.page,
		snippet: snippet(&chunk.text),
		score: format!("{score:.3}"),
	}
}

fn snippet(text: &str) -> String {
	let mut out: String = text.chars().take(SNIPPET_CHARS).collect();

	if text.chars().count() > SNIPPET_CHARS {
		out.push_str("...");
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	use faro_domain::chunk::ChunkMetadata;

	fn record_chunk(id: &str, name: Option<&str>, employee_id: Option<&str>) -> StoredChunk {
		StoredChunk {
			id: id.to_string(),
			text: format!("EMPLEADO: registro {id}"),
			metadata: ChunkMetadata {
				source: "employees_rrhh".to_string(),
				employee_name: name.map(str::to_string),
				employee_id: employee_id.map(str::to_string),
				..ChunkMetadata::default()
			},
		}
	}

	#[test]
	fn direct_scan_matches_names_case_insensitively() {
		let chunks = vec![
			record_chunk("c1", Some("Ana García"), Some("EMP001")),
			record_chunk("c2", Some("Luis Pérez"), Some("EMP002")),
		];
		let detection = EntityDetection {
			keyword_hit: true,
			record_id: None,
			names: vec!["ana".to_string()],
		};
		let hits = direct_scan_hits(&chunks, &detection, 3);

		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].id, "c1");
	}

	#[test]
	fn direct_scan_matches_record_ids() {
		let chunks = vec![
			record_chunk("c1", Some("Ana García"), Some("EMP001")),
			record_chunk("c2", Some("Luis Pérez"), Some("EMP006")),
		];
		let detection = EntityDetection {
			keyword_hit: false,
			record_id: Some("emp006".to_string()),
			names: Vec::new(),
		};
		let hits = direct_scan_hits(&chunks, &detection, 3);

		assert_eq!(hits.len(), 1);
		assert_eq!(hits[0].id, "c2");
	}

	#[test]
	fn keyword_only_detection_skips_the_direct_scan() {
		let chunks = vec![record_chunk("c1", Some("Ana García"), Some("EMP001"))];
		let detection =
			EntityDetection { keyword_hit: true, record_id: None, names: Vec::new() };

		assert!(direct_scan_hits(&chunks, &detection, 3).is_empty());
	}

	#[test]
	fn direct_hits_lead_the_assembled_context() {
		let direct = vec![record_chunk("c1", Some("Ana García"), None)];
		let ranked = vec![RankedResult {
			candidate: crate::Candidate {
				chunk: StoredChunk {
					id: "c2".to_string(),
					text: "raw".to_string(),
					metadata: ChunkMetadata {
						expanded_context: Some("contexto ampliado".to_string()),
						..ChunkMetadata::default()
					},
				},
				fusion_score: 0.5,
			},
			rerank_score: Some(0.9),
		}];
		let context = assemble_context(&direct, &ranked);

		assert!(context.starts_with("EMPLEADO: registro c1"));
		assert!(context.ends_with("contexto ampliado"));
	}

	#[test]
	fn snippets_are_char_safe_and_capped() {
		let text = "á".repeat(80);
		let snippet = snippet(&text);

		assert!(snippet.ends_with("..."));
		assert_eq!(snippet.chars().count(), SNIPPET_CHARS + 3);
	}
}
