use std::sync::Arc;

use faro_pipeline::{Pipeline, UnconfiguredRecordStore};
use faro_retrieval::RetrievalEngine;
use faro_storage::qdrant::QdrantStore;

#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<RetrievalEngine>,
	pub pipeline: Arc<Pipeline>,
}
impl AppState {
	pub async fn new(config: faro_config::Config) -> color_eyre::Result<Self> {
		let config = Arc::new(config);
		let store = QdrantStore::new(&config.storage.qdrant)?;
		let engine = Arc::new(RetrievalEngine::new(config.clone(), store)?);

		// The lexical index must exist before the first request; an empty
		// corpus builds an empty index and only logs a warning.
		engine.refresh().await?;

		let matcher = engine.matcher().clone();
		let pipeline = Arc::new(Pipeline::new(
			config,
			engine.clone(),
			Arc::new(UnconfiguredRecordStore),
			matcher,
		));

		Ok(Self { engine, pipeline })
	}
}
