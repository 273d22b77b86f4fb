use std::sync::Arc;

use tendero_core::intent::ChatIntent;
use tracing::warn;

use crate::llm::LlmClient;

/// Turns free text into a structured [`ChatIntent`] through the injected LLM.
///
/// The model is strictly a translator: it picks an action string and fills
/// the product/quantity slots. Every failure mode (unreachable endpoint,
/// prose-only answer, broken JSON) collapses to the clarification intent so
/// the caller never sees a classification error.
pub struct IntentClassifier {
    client: Arc<dyn LlmClient>,
}

impl IntentClassifier {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub async fn classify(&self, message: &str) -> ChatIntent {
        let prompt = classification_prompt(message);

        let raw = match self.client.complete(&prompt).await {
            Ok(raw) => raw,
            Err(error) => {
                warn!(
                    event_name = "agent.classifier.llm_failed",
                    error = %error,
                    "classifier call failed, falling back to clarification"
                );
                return ChatIntent::clarification();
            }
        };

        match parse_intent(&raw) {
            Some(intent) => intent,
            None => {
                warn!(
                    event_name = "agent.classifier.unparseable",
                    "classifier returned no usable json object, falling back to clarification"
                );
                ChatIntent::clarification()
            }
        }
    }
}

/// Extract the first `{...}` span (greedy to the last brace, the model often
/// wraps the object in prose or markdown fences) and deserialize it.
fn parse_intent(raw: &str) -> Option<ChatIntent> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }

    serde_json::from_str(&raw[start..=end]).ok()
}

fn classification_prompt(message: &str) -> String {
    format!(
        r#"Devuelve EXCLUSIVAMENTE JSON válido.
NO texto adicional.
NO markdown.

Formato exacto:
{{
  "accion": "registrar_venta | consultar_producto | productos_mas_vendidos | listar_productos | iniciar_registro_venta | pedir_aclaracion",
  "producto": null,
  "cantidad": null
}}

Reglas IMPORTANTES:
- Si pregunta por UN producto ESPECÍFICO (ej: "stock de tijeras", "precio de cuadernos", "info de lapiceros") -> consultar_producto
- Si pregunta por TODOS los productos, inventario completo o lista general -> listar_productos
- Si el mensaje es SOLO "Registrar venta" SIN especificar producto -> iniciar_registro_venta
- Si el mensaje incluye producto y cantidad específicos para vender -> registrar_venta
- Si pregunta por productos más vendidos -> productos_mas_vendidos
- Si falta información -> pedir_aclaracion
- Si no se menciona cantidad -> usar 1

Mensaje: "{message}"
"#
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;

    use tendero_core::intent::{ChatAction, ChatIntent};

    use crate::llm::LlmClient;

    use super::{parse_intent, IntentClassifier};

    struct CannedLlm {
        response: Result<String>,
    }

    impl CannedLlm {
        fn ok(response: &str) -> Arc<Self> {
            Arc::new(Self { response: Ok(response.to_string()) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self { response: Err(anyhow!("connection refused")) })
        }
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            match &self.response {
                Ok(value) => Ok(value.clone()),
                Err(error) => Err(anyhow!("{error}")),
            }
        }
    }

    #[tokio::test]
    async fn clean_json_classifies() {
        let classifier = IntentClassifier::new(CannedLlm::ok(
            r#"{"accion": "registrar_venta", "producto": "cuaderno", "cantidad": 3}"#,
        ));

        let intent = classifier.classify("vendí 3 cuadernos").await;
        assert_eq!(intent.action, ChatAction::RegisterSale);
        assert_eq!(intent.product.as_deref(), Some("cuaderno"));
        assert_eq!(intent.quantity_or_default(), 3);
    }

    #[tokio::test]
    async fn json_wrapped_in_prose_still_classifies() {
        let classifier = IntentClassifier::new(CannedLlm::ok(
            "Claro, aquí está:\n```json\n{\"accion\": \"listar_productos\", \"producto\": null, \"cantidad\": null}\n```",
        ));

        let intent = classifier.classify("qué productos hay").await;
        assert_eq!(intent.action, ChatAction::ListCatalog);
    }

    #[tokio::test]
    async fn non_json_answer_falls_back_to_clarification() {
        let classifier = IntentClassifier::new(CannedLlm::ok("not json"));

        let intent = classifier.classify("???").await;
        assert_eq!(intent, ChatIntent::clarification());
    }

    #[tokio::test]
    async fn llm_failure_falls_back_to_clarification() {
        let classifier = IntentClassifier::new(CannedLlm::failing());

        let intent = classifier.classify("vendí 3 cuadernos").await;
        assert_eq!(intent, ChatIntent::clarification());
    }

    #[tokio::test]
    async fn empty_answer_falls_back_to_clarification() {
        let classifier = IntentClassifier::new(CannedLlm::ok(""));

        let intent = classifier.classify("hola").await;
        assert_eq!(intent, ChatIntent::clarification());
    }

    #[test]
    fn parse_extracts_greedy_brace_span() {
        let intent =
            parse_intent("prefix {\"accion\": \"pedir_aclaracion\"} suffix").expect("parse");
        assert_eq!(intent.action, ChatAction::RequestClarification);

        assert!(parse_intent("no braces at all").is_none());
        assert!(parse_intent("} inverted {").is_none());
    }

    #[test]
    fn unknown_action_string_survives_parsing() {
        let intent = parse_intent(r#"{"accion": "hacer_cafe"}"#).expect("parse");
        assert_eq!(intent.action, ChatAction::Unknown);
    }
}
