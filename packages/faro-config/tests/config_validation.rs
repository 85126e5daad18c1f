use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use faro_config::Error;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_toml() -> String {
	SAMPLE_CONFIG_TEMPLATE_TOML.to_string()
}

fn sample_toml_with<F>(mutate: F) -> String
where
	F: FnOnce(&mut toml::Table),
{
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");

	mutate(root);

	toml::to_string(&value).expect("Failed to render template config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("faro_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load(payload: String) -> faro_config::Result<faro_config::Config> {
	let path = write_temp_config(payload);
	let result = faro_config::load(&path);

	let _ = fs::remove_file(&path);

	result
}

fn expect_validation_error(payload: String, needle: &str) {
	match load(payload) {
		Err(Error::Validation { message }) => {
			assert!(message.contains(needle), "unexpected message: {message}");
		},
		other => panic!("expected a validation error mentioning {needle:?}, got {other:?}"),
	}
}

#[test]
fn accepts_sample_config() {
	let cfg = load(sample_toml()).expect("Sample config must validate.");

	assert_eq!(cfg.retrieval.top_k, 5);
	assert_eq!(cfg.routing.entity_partitions.len(), 3);
	assert_eq!(cfg.expansion.mode, "always");
}

#[test]
fn rejects_zero_top_k() {
	let payload = sample_toml_with(|root| {
		let retrieval = root
			.get_mut("retrieval")
			.and_then(Value::as_table_mut)
			.expect("Template config must include [retrieval].");

		retrieval.insert("top_k".to_string(), Value::Integer(0));
	});

	expect_validation_error(payload, "retrieval.top_k");
}

#[test]
fn rejects_fusion_k_below_top_k() {
	let payload = sample_toml_with(|root| {
		let retrieval = root
			.get_mut("retrieval")
			.and_then(Value::as_table_mut)
			.expect("Template config must include [retrieval].");

		retrieval.insert("fusion_k".to_string(), Value::Integer(2));
	});

	expect_validation_error(payload, "retrieval.fusion_k");
}

#[test]
fn rejects_empty_entity_keywords() {
	let payload = sample_toml_with(|root| {
		let routing = root
			.get_mut("routing")
			.and_then(Value::as_table_mut)
			.expect("Template config must include [routing].");

		routing.insert("entity_keywords".to_string(), Value::Array(Vec::new()));
	});

	expect_validation_error(payload, "routing.entity_keywords");
}

#[test]
fn rejects_invalid_record_id_pattern() {
	let payload = sample_toml_with(|root| {
		let routing = root
			.get_mut("routing")
			.and_then(Value::as_table_mut)
			.expect("Template config must include [routing].");

		routing.insert("record_id_pattern".to_string(), Value::String("(".to_string()));
	});

	expect_validation_error(payload, "routing.record_id_pattern");
}

#[test]
fn rejects_unknown_expansion_mode() {
	let payload = sample_toml_with(|root| {
		let expansion = root
			.get_mut("expansion")
			.and_then(Value::as_table_mut)
			.expect("Template config must include [expansion].");

		expansion.insert("mode".to_string(), Value::String("dynamic".to_string()));
	});

	expect_validation_error(payload, "expansion.mode");
}

#[test]
fn rejects_empty_provider_api_key() {
	let payload = sample_toml_with(|root| {
		let chat = root
			.get_mut("providers")
			.and_then(Value::as_table_mut)
			.and_then(|providers| providers.get_mut("chat"))
			.and_then(Value::as_table_mut)
			.expect("Template config must include [providers.chat].");

		chat.insert("api_key".to_string(), Value::String("  ".to_string()));
	});

	expect_validation_error(payload, "chat api_key");
}

#[test]
fn rejects_mismatched_embedding_dimensions() {
	let payload = sample_toml_with(|root| {
		let embedding = root
			.get_mut("providers")
			.and_then(Value::as_table_mut)
			.and_then(|providers| providers.get_mut("embedding"))
			.and_then(Value::as_table_mut)
			.expect("Template config must include [providers.embedding].");

		embedding.insert("dimensions".to_string(), Value::Integer(768));
	});

	expect_validation_error(payload, "providers.embedding.dimensions");
}

#[test]
fn empty_record_id_pattern_falls_back_to_default() {
	let payload = sample_toml_with(|root| {
		let routing = root
			.get_mut("routing")
			.and_then(Value::as_table_mut)
			.expect("Template config must include [routing].");

		routing.insert("record_id_pattern".to_string(), Value::String(String::new()));
	});
	let cfg = load(payload).expect("Config with empty pattern must normalize.");

	assert!(cfg.routing.record_id_pattern.contains("EMP"));
}
