use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

/// Signals that a question targets a named record rather than general prose.
#[derive(Debug, Clone, Default)]
pub struct EntityDetection {
	pub keyword_hit: bool,
	pub record_id: Option<String>,
	pub names: Vec<String>,
}

impl EntityDetection {
	pub fn is_entity_query(&self) -> bool {
		self.keyword_hit || self.record_id.is_some() || !self.names.is_empty()
	}
}

/// Heuristic matcher for entity queries. The capitalization rule assumes
/// Spanish-like conventions (sentence-initial words are skipped, proper names
/// are capitalized mid-sentence); swap the matcher out for other locales.
#[derive(Debug, Clone)]
pub struct EntityMatcher {
	keywords: Vec<String>,
	record_id: Regex,
	min_name_chars: usize,
}

impl EntityMatcher {
	pub fn new(
		keywords: &[String],
		record_id_pattern: &str,
		min_name_chars: u32,
	) -> Result<Self, regex::Error> {
		let keywords =
			keywords.iter().map(|keyword| keyword.trim().to_lowercase()).collect::<Vec<_>>();
		let record_id = Regex::new(record_id_pattern)?;

		Ok(Self { keywords, record_id, min_name_chars: min_name_chars.max(1) as usize })
	}

	pub fn detect(&self, question: &str) -> EntityDetection {
		let lowered = question.to_lowercase();
		let keyword_hit = self
			.keywords
			.iter()
			.any(|keyword| !keyword.is_empty() && lowered.contains(keyword.as_str()));
		let record_id = self.record_id.find(question).map(|hit| hit.as_str().to_string());
		let names = self.capitalized_names(question);

		EntityDetection { keyword_hit, record_id, names }
	}

	/// Mid-sentence capitalized alphabetic tokens longer than the configured
	/// minimum. The first word is skipped: sentence-initial capitalization is
	/// not a name signal.
	fn capitalized_names(&self, question: &str) -> Vec<String> {
		question
			.unicode_words()
			.skip(1)
			.filter(|word| {
				word.chars().next().is_some_and(char::is_uppercase)
					&& word.chars().all(char::is_alphabetic)
					&& word.chars().count() >= self.min_name_chars
			})
			.map(str::to_string)
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn matcher() -> EntityMatcher {
		let keywords = ["vacaciones", "baja", "empleado", "sueldo", "salario", "permiso"]
			.map(str::to_string)
			.to_vec();

		EntityMatcher::new(&keywords, r"(?i)EMP\d+", 3).expect("Matcher must build.")
	}

	#[test]
	fn keyword_and_name_trigger_entity_query() {
		let detection = matcher().detect("¿Cuántos días de vacaciones le quedan a Ana?");

		assert!(detection.keyword_hit);
		assert_eq!(detection.names, vec!["Ana".to_string()]);
		assert!(detection.is_entity_query());
	}

	#[test]
	fn general_document_question_is_not_an_entity_query() {
		let detection = matcher().detect("¿Qué dice el artículo 5?");

		assert!(!detection.keyword_hit);
		assert!(detection.record_id.is_none());
		assert!(detection.names.is_empty());
		assert!(!detection.is_entity_query());
	}

	#[test]
	fn record_id_is_detected_case_insensitively() {
		let detection = matcher().detect("dime el puesto de emp006");

		assert_eq!(detection.record_id.as_deref(), Some("emp006"));
		assert!(detection.is_entity_query());
	}

	#[test]
	fn sentence_initial_capitalization_is_ignored() {
		let detection = matcher().detect("Cuántos convenios colectivos existen");

		assert!(detection.names.is_empty());
	}

	#[test]
	fn short_capitalized_tokens_are_ignored() {
		let detection = matcher().detect("dime qué pone el BO de ayer");

		assert!(detection.names.is_empty());
	}

	#[test]
	fn mid_sentence_name_is_detected_without_keywords() {
		let detection = matcher().detect("el contrato de Adrián sigue vigente");

		assert_eq!(detection.names, vec!["Adrián".to_string()]);
	}
}
