pub mod prompts;

mod images;
mod nodes;
mod state;
mod stream;

pub use images::encode_image_base64;
pub use state::{ChatOutcome, ChatRequest, PipelineState, Route, StateUpdate};
pub use stream::{METADATA_DELIMITER, StreamEvent, StreamMetadata};

use std::{future::Future, path::PathBuf, pin::Pin, sync::Arc};

use futures::Stream;
use serde_json::Value;
use tracing::Instrument;

use faro_config::{Config, LlmProviderConfig};
use faro_domain::{entity::EntityMatcher, guardrail::Guardrail};
use faro_providers::{chat, vision};
use faro_retrieval::{RetrievalEngine, RetrievalOutcome};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type TokenStream = Pin<Box<dyn Stream<Item = color_eyre::Result<String>> + Send>>;

pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<String>>;

	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Value>>;

	fn stream<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<TokenStream>>;
}

pub trait VisionProvider
where
	Self: Send + Sync,
{
	fn describe<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
		image_b64: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// Structured-record collaborator behind the data-lookup path. Tabular
/// loading lives outside this crate; the pipeline only consumes formatted
/// record text.
pub trait RecordStore
where
	Self: Send + Sync,
{
	fn lookup<'a>(
		&'a self,
		name: &'a str,
		kind: LookupKind,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait Retriever
where
	Self: Send + Sync,
{
	fn retrieve<'a>(&'a self, question: &'a str) -> BoxFuture<'a, RetrievalOutcome>;
}

impl Retriever for RetrievalEngine {
	fn retrieve<'a>(&'a self, question: &'a str) -> BoxFuture<'a, RetrievalOutcome> {
		Box::pin(self.retrieve(question))
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
	Vacation,
	SickLeave,
	Role,
	General,
}

impl LookupKind {
	/// Extraction output is model text; anything unrecognized degrades to the
	/// broadest lookup.
	pub fn parse(raw: &str) -> Self {
		match raw.trim().to_lowercase().as_str() {
			"vacation" => Self::Vacation,
			"sick_leave" => Self::SickLeave,
			"role" => Self::Role,
			_ => Self::General,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Vacation => "vacation",
			Self::SickLeave => "sick_leave",
			Self::Role => "role",
			Self::General => "general",
		}
	}
}

/// Placeholder collaborator for deployments without a structured-record
/// backend; every lookup reports unavailability.
pub struct UnconfiguredRecordStore;

impl RecordStore for UnconfiguredRecordStore {
	fn lookup<'a>(
		&'a self,
		_name: &'a str,
		_kind: LookupKind,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async { Err(color_eyre::eyre::eyre!("Record store is not configured.")) })
	}
}

#[derive(Clone)]
pub struct Providers {
	pub chat: Arc<dyn ChatProvider>,
	pub vision: Arc<dyn VisionProvider>,
}

impl Providers {
	pub fn new(chat: Arc<dyn ChatProvider>, vision: Arc<dyn VisionProvider>) -> Self {
		Self { chat, vision }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { chat: provider.clone(), vision: provider }
	}
}

struct DefaultProviders;

impl ChatProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(chat::complete(cfg, messages))
	}

	fn extract<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<Value>> {
		Box::pin(chat::extract(cfg, messages))
	}

	fn stream<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<TokenStream>> {
		Box::pin(async move {
			let tokens = chat::stream(cfg, messages).await?;

			Ok(Box::pin(tokens) as TokenStream)
		})
	}
}

impl VisionProvider for DefaultProviders {
	fn describe<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
		image_b64: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(vision::describe(cfg, prompt, image_b64))
	}
}

/// The request state machine:
/// `image_analyzer -> router -> {data_tool | retriever -> visual_filter} ->
/// generator`, with the greeting route ending the run immediately.
pub struct Pipeline {
	pub(crate) cfg: Arc<Config>,
	pub(crate) retriever: Arc<dyn Retriever>,
	pub(crate) records: Arc<dyn RecordStore>,
	pub(crate) providers: Providers,
	pub(crate) matcher: EntityMatcher,
	pub(crate) guardrail: Guardrail,
	pub(crate) images_root: PathBuf,
}

impl Pipeline {
	pub fn new(
		cfg: Arc<Config>,
		retriever: Arc<dyn Retriever>,
		records: Arc<dyn RecordStore>,
		matcher: EntityMatcher,
	) -> Self {
		Self::with_providers(cfg, retriever, records, matcher, Providers::default())
	}

	pub fn with_providers(
		cfg: Arc<Config>,
		retriever: Arc<dyn Retriever>,
		records: Arc<dyn RecordStore>,
		matcher: EntityMatcher,
		providers: Providers,
	) -> Self {
		Self {
			cfg,
			retriever,
			records,
			providers,
			matcher,
			guardrail: Guardrail::default(),
			images_root: PathBuf::from("."),
		}
	}

	/// Directory candidate image paths are resolved against. Defaults to the
	/// process working directory.
	pub fn with_images_root(mut self, root: PathBuf) -> Self {
		self.images_root = root;

		self
	}

	/// Batch execution: one complete response with images, sources, and the
	/// step trace.
	pub async fn run(&self, request: ChatRequest) -> ChatOutcome {
		let request_id = uuid::Uuid::new_v4();

		async move {
			let mut state = PipelineState::new(request);

			state.apply(nodes::image_analyzer(self, &state).await);
			state.apply(nodes::router(self, &state).await);

			match state.route {
				Some(Route::Greeting) | None => {},
				Some(Route::DataLookup) => {
					let update = nodes::data_tool(self, &state).await;

					state.apply(update);

					let update = nodes::generator(self, &state).await;

					state.apply(update);
				},
				Some(Route::Retrieval) => {
					let update = nodes::retriever(self, &state).await;

					state.apply(update);

					let update = nodes::visual_filter(self, &state).await;

					state.apply(update);

					let update = nodes::generator(self, &state).await;

					state.apply(update);
				},
			}

			state.into_outcome()
		}
		.instrument(tracing::info_span!("pipeline", %request_id))
		.await
	}
}
