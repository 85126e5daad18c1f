use serde::{Deserialize, Serialize};

/// Register the generator answers in. Carried verbatim from the chat request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerStyle {
	#[default]
	Formal,
	Cercano,
	Directo,
	#[serde(rename = "Didáctico")]
	Didactico,
	Legal,
}

impl AnswerStyle {
	pub fn instruction(self) -> &'static str {
		match self {
			Self::Formal => "Responde de forma formal, profesional y concisa.",
			Self::Cercano =>
				"Responde de forma cercana, amigable y explicativa. Evita tecnicismos complejos.",
			Self::Directo =>
				"Responde de forma extremadamente concisa, usando viñetas (bullet points) si es posible. Ve directo al grano sin introducciones innecesarias.",
			Self::Didactico =>
				"Responde como un profesor. Usa analogías simples, explica los términos técnicos paso a paso y asegúrate de que el usuario aprenda.",
			Self::Legal =>
				"Responde como un abogado experto. Sé riguroso, cita artículos o normativas si aparecen en el contexto, y usa terminología jurídica precisa.",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deserializes_accented_variant() {
		let style: AnswerStyle =
			serde_json::from_str("\"Didáctico\"").expect("Style must deserialize.");

		assert_eq!(style, AnswerStyle::Didactico);
	}

	#[test]
	fn default_style_is_formal() {
		assert_eq!(AnswerStyle::default(), AnswerStyle::Formal);
	}
}
