mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Expansion, LlmProviderConfig, ProviderConfig, Providers,
	Qdrant, Retrieval, Routing, Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.static_root.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.static_root must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty()
		|| cfg.storage.qdrant.images_collection.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "storage.qdrant collection names must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.vector_dim == 0 {
		return Err(Error::Validation {
			message: "storage.qdrant.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.fusion_k < cfg.retrieval.top_k {
		return Err(Error::Validation {
			message: "retrieval.fusion_k must be at least retrieval.top_k.".to_string(),
		});
	}
	if cfg.retrieval.rrf_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.rrf_k must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.max_image_candidates == 0 {
		return Err(Error::Validation {
			message: "retrieval.max_image_candidates must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.direct_scan_limit == 0 {
		return Err(Error::Validation {
			message: "retrieval.direct_scan_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.routing.entity_keywords.iter().all(|keyword| keyword.trim().is_empty()) {
		return Err(Error::Validation {
			message: "routing.entity_keywords must contain at least one keyword.".to_string(),
		});
	}
	if cfg.routing.entity_partitions.iter().all(|source| source.trim().is_empty()) {
		return Err(Error::Validation {
			message: "routing.entity_partitions must contain at least one source.".to_string(),
		});
	}
	if cfg.routing.min_name_chars == 0 {
		return Err(Error::Validation {
			message: "routing.min_name_chars must be greater than zero.".to_string(),
		});
	}
	if let Err(err) = regex::Regex::new(&cfg.routing.record_id_pattern) {
		return Err(Error::Validation {
			message: format!("routing.record_id_pattern is not a valid regex: {err}."),
		});
	}
	if !matches!(cfg.expansion.mode.as_str(), "off" | "always") {
		return Err(Error::Validation {
			message: "expansion.mode must be one of off or always.".to_string(),
		});
	}

	for (label, key, timeout_ms) in [
		("embedding", &cfg.providers.embedding.api_key, cfg.providers.embedding.timeout_ms),
		("rerank", &cfg.providers.rerank.api_key, cfg.providers.rerank.timeout_ms),
		("chat", &cfg.providers.chat.api_key, cfg.providers.chat.timeout_ms),
		("vision", &cfg.providers.vision.api_key, cfg.providers.vision.timeout_ms),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
		if timeout_ms == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg.routing.record_id_pattern.trim().is_empty() {
		cfg.routing.record_id_pattern = r"(?i)EMP\d+".to_string();
	}

	cfg.routing.entity_keywords.retain(|keyword| !keyword.trim().is_empty());
	cfg.routing.entity_partitions.retain(|source| !source.trim().is_empty());
}
