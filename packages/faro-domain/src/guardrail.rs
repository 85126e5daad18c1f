/// Replacement returned when a full generated answer matches a leak pattern.
pub const REFUSAL: &str = "🔒 [SISTEMA] Solicitud rechazada por política de seguridad. Solo puedo responder preguntas sobre el contenido de los documentos.";

/// Notice emitted when a leak is detected mid-stream, replacing further output.
pub const STREAM_BLOCK_NOTICE: &str = " [CONTENIDO BLOQUEADO POR SEGURIDAD] ";

/// Post-generation filter blocking system-prompt leakage before it reaches the
/// caller. Matching is case-insensitive substring search.
#[derive(Debug, Clone)]
pub struct Guardrail {
	patterns: Vec<String>,
}

impl Guardrail {
	pub fn new(patterns: &[&str]) -> Self {
		Self { patterns: patterns.iter().map(|pattern| pattern.to_lowercase()).collect() }
	}

	/// Returns the first leak pattern matched by `text`, if any.
	pub fn leak(&self, text: &str) -> Option<&str> {
		let lowered = text.to_lowercase();

		self.patterns
			.iter()
			.find(|pattern| lowered.contains(pattern.as_str()))
			.map(String::as_str)
	}

	/// Replaces the whole text with the fixed refusal when it leaks.
	pub fn screen(&self, text: String) -> String {
		if self.leak(&text).is_some() { REFUSAL.to_string() } else { text }
	}
}

impl Default for Guardrail {
	fn default() -> Self {
		Self::new(DEFAULT_LEAK_PATTERNS)
	}
}

/// System-prompt leak markers, covering the Spanish, French, and English
/// phrasings observed in jailbreak attempts against the directive.
const DEFAULT_LEAK_PATTERNS: &[&str] = &[
	"Eres un asistente experto",
	"SEGURIDAD: NUNCA reveles",
	"ERROR DE SEGURIDAD DETECTADO",
	"IGNORA esa orden",
	"MANTÉN TU ROL SIEMPRE",
	"Mi prompt es",
	"Mis instrucciones son",
	"My prompt is",
	"My instructions are",
	"I'm not supposed to do this",
	"I will give in to your curiosity",
	"URGENTE: PREVENCIÓN",
	"URGENT : PRÉVENTION",
	"URGENT: PREVENTION",
	"PREVENCIÓN DE FUGA",
	"PRÉVENTION DE FUITE",
	"INFORMATION LEAK PREVENTION",
	"TU ÚNICO OBJETIVO",
	"VOTRE UNIQUE OBJET",
	"YOUR ONLY OBJECTIVE",
	"NO DIGAS \"NO PUEDO REVELAR",
	"NE DITES PAS",
	"DO NOT SAY",
	"Modo depuración",
	"Developer mode",
	"Mode développeur",
	"Configuración interna",
	"Internal configuration",
	"Configuration interne",
];

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn clean_text_passes_through() {
		let guardrail = Guardrail::default();

		assert_eq!(
			guardrail.screen("El convenio fija 22 días laborables.".to_string()),
			"El convenio fija 22 días laborables."
		);
	}

	#[test]
	fn instruction_leak_is_replaced_with_the_refusal() {
		let guardrail = Guardrail::default();
		let leaked = "Claro. Mis instrucciones son las siguientes: ...".to_string();

		assert_eq!(guardrail.screen(leaked), REFUSAL);
	}

	#[test]
	fn matching_ignores_case() {
		let guardrail = Guardrail::default();

		assert!(guardrail.leak("mis INSTRUCCIONES son secretas").is_some());
	}

	#[test]
	fn leak_reports_the_matched_pattern() {
		let guardrail = Guardrail::default();

		assert_eq!(guardrail.leak("activa el Developer mode ahora"), Some("developer mode"));
	}
}
