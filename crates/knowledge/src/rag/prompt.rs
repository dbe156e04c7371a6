//! Prompt templates for query expansion and grounded answering.
//!
//! Templates are Handlebars strings registered once at startup in strict
//! mode, so a missing variable is a rendering error instead of empty text.

use cairn_core::{AppError, AppResult};
use handlebars::Handlebars;
use serde_json::json;

const EXPANSION_TEMPLATE_NAME: &str = "expansion";
const GROUNDING_TEMPLATE_NAME: &str = "grounding";

/// Phrase the model is told to use when the context lacks the answer.
pub const DECLINE_PHRASE: &str =
    "A partir de la documentación consultada, no es posible responder con precisión a su pregunta.";

const EXPANSION_TEMPLATE: &str = "Reescribe la siguiente pregunta para una búsqueda semántica más efectiva en una base de datos de documentos sobre la historia de Argentina. Enfócate en nombres, eventos y conceptos clave. Devuelve solo una línea con la consulta mejorada. Pregunta original: '{{question}}'";

const GROUNDING_TEMPLATE: &str = r#"Actúa como un Profesor de Historia de la Universidad de Buenos Aires con más de 30 años de experiencia en la cátedra. Tu tono debe ser académico, preciso y didáctico. Utiliza un español formal y característico de Argentina.

Tu misión es responder la pregunta del estudiante basándote EXCLUSIVAMENTE en el contexto documental que te proporciono a continuación. No debes usar ningún conocimiento externo.

**Instrucciones precisas:**
1.  **Analizá la pregunta:** Comprendé con exactitud qué es lo que el estudiante quiere saber.
2.  **Basate en la evidencia:** Leé cuidadosamente los fragmentos de texto del contexto y sintetizá la información para construir tu respuesta.
3.  **Cita tus fuentes:** Es fundamental que cites cada afirmación que hagas. Al final de una oración o párrafo que se base en un fragmento, añadí la cita correspondiente, por ejemplo: [0], [1], etc.
4.  **Si la respuesta no está en los textos:** Sé honesto y académico. Respondé con la frase: "{{decline}}" No inventes ni deduzcas información.
5.  **Mantené la personalidad:** Redactá la respuesta con la cadencia y el vocabulario de un profesor experimentado.

**Contexto Documental:**
{{context}}

**Pregunta del Estudiante:** {{question}}

**Respuesta del Profesor:**
"#;

/// Registered prompt templates.
#[derive(Debug, Clone)]
pub struct PromptTemplates {
    registry: Handlebars<'static>,
}

impl PromptTemplates {
    pub fn new() -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Plain text prompts, no HTML escaping
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);

        for (name, template) in [
            (EXPANSION_TEMPLATE_NAME, EXPANSION_TEMPLATE),
            (GROUNDING_TEMPLATE_NAME, GROUNDING_TEMPLATE),
        ] {
            registry
                .register_template_string(name, template)
                .map_err(|e| AppError::Prompt(format!("Failed to register template '{}': {}", name, e)))?;
        }

        Ok(Self { registry })
    }

    /// Prompt asking the model to rewrite `question` as a one-line search query.
    pub fn expansion(&self, question: &str) -> AppResult<String> {
        self.render(EXPANSION_TEMPLATE_NAME, &json!({ "question": question }))
    }

    /// Grounding-constrained answer prompt over an assembled context.
    pub fn grounding(&self, question: &str, context: &str) -> AppResult<String> {
        self.render(
            GROUNDING_TEMPLATE_NAME,
            &json!({
                "question": question,
                "context": context,
                "decline": DECLINE_PHRASE,
            }),
        )
    }

    fn render(&self, name: &str, data: &serde_json::Value) -> AppResult<String> {
        self.registry
            .render(name, data)
            .map_err(|e| AppError::Prompt(format!("Failed to render template '{}': {}", name, e)))
    }
}
