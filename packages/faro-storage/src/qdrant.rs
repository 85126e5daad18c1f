use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, DeletePointsBuilder, Filter, PointId, Query, QueryPointsBuilder, RetrievedPoint,
	ScoredPoint, ScrollPointsBuilder, Value, point_id::PointIdOptions, value::Kind,
};

use crate::Result;
use faro_domain::chunk::{ChunkMetadata, StoredChunk};

const SCROLL_PAGE_SIZE: u32 = 256;

/// Vector index consumed as an opaque service: nearest-neighbor search plus
/// full-partition scrolls over the chunk payloads it stores.
pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub images_collection: String,
	pub vector_dim: u32,
}

impl QdrantStore {
	pub fn new(cfg: &faro_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self {
			client,
			collection: cfg.collection.clone(),
			images_collection: cfg.images_collection.clone(),
			vector_dim: cfg.vector_dim,
		})
	}

	/// In-set restriction over the `source` payload field.
	pub fn sources_filter(sources: &[String]) -> Filter {
		Filter::must([Condition::matches("source", sources.to_vec())])
	}

	pub async fn search_chunks(
		&self,
		vector: Vec<f32>,
		limit: u64,
		filter: Option<Filter>,
	) -> Result<Vec<StoredChunk>> {
		self.query_collection(self.collection.clone(), vector, limit, filter).await
	}

	pub async fn search_images(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<StoredChunk>> {
		self.query_collection(self.images_collection.clone(), vector, limit, None).await
	}

	/// Fetches every chunk matching `filter`, paging through the collection.
	pub async fn scroll_chunks(&self, filter: Option<Filter>) -> Result<Vec<StoredChunk>> {
		let mut out = Vec::new();
		let mut offset: Option<PointId> = None;

		loop {
			let mut scroll = ScrollPointsBuilder::new(self.collection.clone())
				.limit(SCROLL_PAGE_SIZE)
				.with_payload(true);

			if let Some(filter) = filter.clone() {
				scroll = scroll.filter(filter);
			}
			if let Some(offset) = offset.take() {
				scroll = scroll.offset(offset);
			}

			let response = self.client.scroll(scroll).await?;

			for point in &response.result {
				if let Some(chunk) = retrieved_point_to_chunk(point) {
					out.push(chunk);
				}
			}

			match response.next_page_offset {
				Some(next) => offset = Some(next),
				None => break,
			}
		}

		Ok(out)
	}

	pub async fn list_sources(&self) -> Result<Vec<String>> {
		let chunks = self.scroll_chunks(None).await?;
		let mut sources: Vec<String> =
			chunks.into_iter().map(|chunk| chunk.metadata.source).collect();

		sources.sort();
		sources.dedup();
		sources.retain(|source| !source.is_empty());

		Ok(sources)
	}

	pub async fn delete_by_source(&self, source: &str) -> Result<()> {
		let filter = Filter::must([Condition::matches("source", source.to_string())]);
		let delete = DeletePointsBuilder::new(self.collection.clone()).points(filter).wait(true);

		self.client.delete_points(delete).await?;

		Ok(())
	}

	async fn query_collection(
		&self,
		collection: String,
		vector: Vec<f32>,
		limit: u64,
		filter: Option<Filter>,
	) -> Result<Vec<StoredChunk>> {
		let mut query = QueryPointsBuilder::new(collection)
			.query(Query::new_nearest(vector))
			.with_payload(true)
			.limit(limit);

		if let Some(filter) = filter {
			query = query.filter(filter);
		}

		let response = self.client.query(query).await?;

		Ok(response.result.iter().filter_map(scored_point_to_chunk).collect())
	}
}

fn scored_point_to_chunk(point: &ScoredPoint) -> Option<StoredChunk> {
	let id = point.id.as_ref().and_then(point_id_to_string);
	let Some(id) = id else {
		tracing::warn!("Scored point is missing an id.");

		return None;
	};

	payload_to_chunk(id, &point.payload)
}

fn retrieved_point_to_chunk(point: &RetrievedPoint) -> Option<StoredChunk> {
	let id = point.id.as_ref().and_then(point_id_to_string);
	let Some(id) = id else {
		tracing::warn!("Scrolled point is missing an id.");

		return None;
	};

	payload_to_chunk(id, &point.payload)
}

fn payload_to_chunk(id: String, payload: &HashMap<String, Value>) -> Option<StoredChunk> {
	let Some(text) = payload_str(payload, "text") else {
		tracing::warn!(chunk_id = %id, "Chunk payload is missing text.");

		return None;
	};
	let metadata = ChunkMetadata {
		source: payload_str(payload, "source").unwrap_or_default(),
		page: payload_i64(payload, "page").unwrap_or(0),
		category: payload_str(payload, "category"),
		expanded_context: payload_str(payload, "expanded_context"),
		employee_id: payload_str(payload, "employee_id"),
		employee_name: payload_str(payload, "employee_name"),
		filename: payload_str(payload, "filename"),
	};

	Some(StoredChunk { id, text, metadata })
}

fn point_id_to_string(point_id: &PointId) -> Option<String> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Some(id.clone()),
		Some(PointIdOptions::Num(id)) => Some(id.to_string()),
		None => None,
	}
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

fn payload_i64(payload: &HashMap<String, Value>, key: &str) -> Option<i64> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::IntegerValue(value)) => Some(*value),
		Some(Kind::DoubleValue(value)) =>
			if value.fract() == 0.0 { Some(*value as i64) } else { None },
		_ => None,
	}
}
