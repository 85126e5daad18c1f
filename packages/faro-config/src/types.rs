use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub retrieval: Retrieval,
	pub routing: Routing,
	pub expansion: Expansion,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	/// Root directory served as `/static`; candidate image paths resolve under it.
	#[serde(default = "default_static_root")]
	pub static_root: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub images_collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
	pub chat: LlmProviderConfig,
	pub vision: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Retrieval {
	/// Final evidence size handed to the generator.
	pub top_k: u32,
	/// Fused candidate pool size; each retrieval leg requests twice this.
	pub fusion_k: u32,
	pub rrf_k: u32,
	pub max_image_candidates: u32,
	/// Direct metadata-scan hits prepended ahead of reranked evidence.
	pub direct_scan_limit: u32,
}

#[derive(Debug, Deserialize)]
pub struct Routing {
	pub entity_keywords: Vec<String>,
	/// `source` metadata values forming the entity-record partition.
	pub entity_partitions: Vec<String>,
	#[serde(default = "default_record_id_pattern")]
	pub record_id_pattern: String,
	#[serde(default = "default_min_name_chars")]
	pub min_name_chars: u32,
}

#[derive(Debug, Deserialize)]
pub struct Expansion {
	/// One of `off` or `always`.
	pub mode: String,
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}

fn default_static_root() -> String {
	"static".to_string()
}

fn default_record_id_pattern() -> String {
	r"(?i)EMP\d+".to_string()
}

fn default_min_name_chars() -> u32 {
	3
}
