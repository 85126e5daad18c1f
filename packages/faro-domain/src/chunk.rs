use serde::{Deserialize, Serialize};

/// One ingested corpus fragment. Owned by the index; the core only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
	pub id: String,
	pub text: String,
	pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkMetadata {
	#[serde(default)]
	pub source: String,
	#[serde(default)]
	pub page: i64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub category: Option<String>,
	/// Pre-merged neighbor text substituted for the raw chunk during evidence
	/// assembly.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub expanded_context: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub employee_id: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub employee_name: Option<String>,
	/// Image chunks only: file name under the labeled-images directory.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub filename: Option<String>,
}

impl StoredChunk {
	/// Text used when assembling evidence: the expanded context when the
	/// ingester attached one, the raw chunk text otherwise.
	pub fn evidence_text(&self) -> &str {
		match self.metadata.expanded_context.as_deref() {
			Some(expanded) if !expanded.trim().is_empty() => expanded,
			_ => &self.text,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn evidence_text_prefers_expanded_context() {
		let chunk = StoredChunk {
			id: "c1".to_string(),
			text: "raw".to_string(),
			metadata: ChunkMetadata {
				expanded_context: Some("expanded".to_string()),
				..ChunkMetadata::default()
			},
		};

		assert_eq!(chunk.evidence_text(), "expanded");
	}

	#[test]
	fn blank_expanded_context_falls_back_to_raw_text() {
		let chunk = StoredChunk {
			id: "c1".to_string(),
			text: "raw".to_string(),
			metadata: ChunkMetadata {
				expanded_context: Some("   ".to_string()),
				..ChunkMetadata::default()
			},
		};

		assert_eq!(chunk.evidence_text(), "raw");
	}
}
