pub mod fusion;
pub mod rerank;

mod retrieve;

pub use fusion::{Candidate, DEFAULT_RRF_K, reciprocal_rank_fusion};
pub use rerank::{RankedResult, rerank_candidates};
pub use retrieve::{RetrievalOutcome, SourceRef};

use std::{future::Future, pin::Pin, sync::Arc};

use faro_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use faro_domain::entity::EntityMatcher;
use faro_index::{LexicalIndex, SharedLexicalIndex};
use faro_providers::{chat, embedding, rerank as rerank_provider};
use faro_storage::qdrant::QdrantStore;

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Storage(#[from] faro_storage::Error),
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Invalid entity matcher pattern: {0}")]
	Matcher(#[from] regex::Error),
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;
}

/// Rewrites a question into corpus terminology ahead of the dense leg.
pub trait ExpansionProvider
where
	Self: Send + Sync,
{
	fn expand<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		question: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

#[derive(Clone)]
pub struct RetrievalProviders {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub expansion: Arc<dyn ExpansionProvider>,
}

impl RetrievalProviders {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		rerank: Arc<dyn RerankProvider>,
		expansion: Arc<dyn ExpansionProvider>,
	) -> Self {
		Self { embedding, rerank, expansion }
	}
}

impl Default for RetrievalProviders {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), rerank: provider.clone(), expansion: provider }
	}
}

const EXPANSION_SYSTEM_PROMPT: &str = "Eres un experto legal. Traduce la consulta del usuario a terminología jurídica precisa generando un breve párrafo teórico.";

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(rerank_provider::rerank(cfg, query, docs))
	}
}

impl ExpansionProvider for DefaultProviders {
	fn expand<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		question: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			let messages = [
				serde_json::json!({ "role": "system", "content": EXPANSION_SYSTEM_PROMPT }),
				serde_json::json!({ "role": "user", "content": question }),
			];

			chat::complete(cfg, &messages).await
		})
	}
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RefreshReport {
	pub indexed_chunks: u64,
}

/// Process-wide retrieval service: one instance constructed at startup and
/// injected into the pipeline, torn down at shutdown, rebuilt in place by
/// [`RetrievalEngine::refresh`].
pub struct RetrievalEngine {
	pub cfg: Arc<Config>,
	store: QdrantStore,
	lexical: SharedLexicalIndex,
	matcher: EntityMatcher,
	providers: RetrievalProviders,
}

impl RetrievalEngine {
	pub fn new(cfg: Arc<Config>, store: QdrantStore) -> Result<Self> {
		Self::with_providers(cfg, store, RetrievalProviders::default())
	}

	pub fn with_providers(
		cfg: Arc<Config>,
		store: QdrantStore,
		providers: RetrievalProviders,
	) -> Result<Self> {
		let matcher = EntityMatcher::new(
			&cfg.routing.entity_keywords,
			&cfg.routing.record_id_pattern,
			cfg.routing.min_name_chars,
		)?;

		Ok(Self {
			cfg,
			store,
			lexical: SharedLexicalIndex::default(),
			matcher,
			providers,
		})
	}

	pub fn matcher(&self) -> &EntityMatcher {
		&self.matcher
	}

	/// Rebuilds the lexical index from the full text collection and swaps it
	/// in atomically. In-flight searches keep the previous index.
	pub async fn refresh(&self) -> Result<RefreshReport> {
		let chunks = self.store.scroll_chunks(None).await?;
		let index = LexicalIndex::build(&chunks);
		let indexed_chunks = index.len() as u64;

		self.lexical.swap(index);

		tracing::info!(indexed_chunks, "Lexical index refreshed.");

		Ok(RefreshReport { indexed_chunks })
	}

	pub async fn list_sources(&self) -> Result<Vec<String>> {
		Ok(self.store.list_sources().await?)
	}

	/// Removes one source's chunks, then refreshes the lexical index so the
	/// next search no longer sees them.
	pub async fn delete_source(&self, source: &str) -> Result<RefreshReport> {
		self.store.delete_by_source(source).await?;

		self.refresh().await
	}
}
