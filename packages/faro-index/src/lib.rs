use std::{
	cmp::Ordering,
	sync::{Arc, RwLock},
};

use ahash::AHashMap;
use unicode_segmentation::UnicodeSegmentation;

use faro_domain::chunk::StoredChunk;

/// One lexical match, strongest first.
#[derive(Debug, Clone)]
pub struct LexicalHit {
	pub chunk: StoredChunk,
	pub score: f32,
}

#[derive(Debug)]
struct IndexedDoc {
	chunk: StoredChunk,
	term_counts: AHashMap<String, u32>,
}

/// In-memory term-frequency/inverse-document-frequency index over chunk
/// texts. Immutable once built; rebuilds go through [`SharedLexicalIndex`].
#[derive(Debug, Default)]
pub struct LexicalIndex {
	docs: Vec<IndexedDoc>,
	doc_freq: AHashMap<String, u32>,
}

impl LexicalIndex {
	pub fn build(corpus: &[StoredChunk]) -> Self {
		if corpus.is_empty() {
			tracing::warn!("Building lexical index over an empty corpus.");

			return Self::default();
		}

		let mut docs = Vec::with_capacity(corpus.len());
		let mut doc_freq: AHashMap<String, u32> = AHashMap::new();

		for chunk in corpus {
			let mut term_counts: AHashMap<String, u32> = AHashMap::new();

			for token in tokenize(&chunk.text) {
				*term_counts.entry(token).or_insert(0) += 1;
			}
			for term in term_counts.keys() {
				*doc_freq.entry(term.clone()).or_insert(0) += 1;
			}

			docs.push(IndexedDoc { chunk: chunk.clone(), term_counts });
		}

		tracing::info!(documents = docs.len(), "Lexical index built.");

		Self { docs, doc_freq }
	}

	pub fn len(&self) -> usize {
		self.docs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.docs.is_empty()
	}

	/// Only positive-scoring documents are returned; a query sharing no term
	/// with the corpus yields nothing.
	pub fn search(&self, query: &str, top_k: usize) -> Vec<LexicalHit> {
		if self.docs.is_empty() || top_k == 0 {
			return Vec::new();
		}

		let query_terms = tokenize(query);

		if query_terms.is_empty() {
			return Vec::new();
		}

		let doc_count = self.docs.len() as f32;
		let mut hits = Vec::new();

		for doc in &self.docs {
			let mut score = 0.0_f32;

			for term in &query_terms {
				let Some(tf) = doc.term_counts.get(term) else { continue };
				let df = self.doc_freq.get(term).copied().unwrap_or(0) as f32;
				let idf = (1.0 + (doc_count - df + 0.5) / (df + 0.5)).ln();

				score += *tf as f32 * idf;
			}

			if score > 0.0 {
				hits.push(LexicalHit { chunk: doc.chunk.clone(), score });
			}
		}

		hits.sort_by(|left, right| cmp_score_desc(left.score, right.score));
		hits.truncate(top_k);

		hits
	}
}

/// Lower-cased, punctuation-stripped tokens.
pub fn tokenize(text: &str) -> Vec<String> {
	text.unicode_words().map(str::to_lowercase).collect()
}

fn cmp_score_desc(a: f32, b: f32) -> Ordering {
	b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Single-writer, multi-reader handle. Readers observe either the previous or
/// the freshly swapped index, never a partially built one.
#[derive(Debug, Default)]
pub struct SharedLexicalIndex {
	inner: RwLock<Arc<LexicalIndex>>,
}

impl SharedLexicalIndex {
	pub fn new(index: LexicalIndex) -> Self {
		Self { inner: RwLock::new(Arc::new(index)) }
	}

	pub fn load(&self) -> Arc<LexicalIndex> {
		self.inner.read().unwrap_or_else(|err| err.into_inner()).clone()
	}

	pub fn swap(&self, index: LexicalIndex) {
		let mut guard = self.inner.write().unwrap_or_else(|err| err.into_inner());

		*guard = Arc::new(index);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use faro_domain::chunk::ChunkMetadata;

	fn chunk(id: &str, text: &str) -> StoredChunk {
		StoredChunk { id: id.to_string(), text: text.to_string(), metadata: ChunkMetadata::default() }
	}

	fn corpus() -> Vec<StoredChunk> {
		vec![
			chunk("c1", "El convenio colectivo regula las vacaciones anuales."),
			chunk("c2", "Las bajas médicas requieren parte de baja oficial."),
			chunk("c3", "El convenio regula también los permisos retribuidos."),
		]
	}

	#[test]
	fn empty_corpus_searches_return_nothing() {
		let index = LexicalIndex::build(&[]);

		assert!(index.is_empty());
		assert!(index.search("vacaciones", 5).is_empty());
	}

	#[test]
	fn exact_term_document_ranks_first() {
		let index = LexicalIndex::build(&corpus());
		let hits = index.search("vacaciones anuales", 3);

		assert_eq!(hits.first().map(|hit| hit.chunk.id.as_str()), Some("c1"));
	}

	#[test]
	fn rare_terms_outweigh_common_ones() {
		let index = LexicalIndex::build(&corpus());
		// "convenio" appears in two documents, "bajas" in one; the rare term
		// must dominate for a query mentioning both.
		let hits = index.search("convenio bajas", 3);

		assert_eq!(hits.first().map(|hit| hit.chunk.id.as_str()), Some("c2"));
	}

	#[test]
	fn unmatched_query_yields_no_hits() {
		let index = LexicalIndex::build(&corpus());

		assert!(index.search("astronomía", 3).is_empty());
	}

	#[test]
	fn tokenize_lowercases_and_strips_punctuation() {
		assert_eq!(tokenize("¿Cuántos DÍAS, quedan?"), vec!["cuántos", "días", "quedan"]);
	}

	#[test]
	fn swap_replaces_the_visible_index_atomically() {
		let shared = SharedLexicalIndex::new(LexicalIndex::build(&corpus()));
		let before = shared.load();

		shared.swap(LexicalIndex::build(&[chunk("d1", "nuevo corpus")]));

		let after = shared.load();

		// The handle taken before the swap still serves the old corpus.
		assert_eq!(before.len(), 3);
		assert_eq!(after.len(), 1);
	}
}
