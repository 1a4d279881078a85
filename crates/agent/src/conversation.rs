use std::sync::Arc;

use tera::{Context, Tera};
use thiserror::Error;
use tracing::{debug, warn};

use carlot_core::domain::intent::Intent;

use crate::llm::LlmClient;

/// Reply used whenever the engine output cannot be trusted.
pub const CLASSIFICATION_FALLBACK_REPLY: &str =
    "Desculpe, não entendi bem. Pode me explicar o que você está procurando?";

const PROMPT_TEMPLATE_NAME: &str = "intent_prompt";

const PROMPT_TEMPLATE: &str = r#"Analise esta solicitação de um cliente em uma concessionária de veículos:

"{{ utterance }}"

Identifique TODOS os critérios mencionados e determine a melhor ação. Responda APENAS em JSON:

{
  "acao": "buscar_todos | buscar_marcas | buscar_com_filtros | conversar",
  "criterios_identificados": {
    "marca": "nome exato da marca se mencionada ou null",
    "modelo": "modelo específico se mencionado ou null",
    "ano_especifico": "ano específico como número inteiro ou null",
    "ano_minimo": "ano mínimo como número inteiro ou null",
    "ano_maximo": "ano máximo como número inteiro ou null",
    "preco_minimo": "preço mínimo como número ou null",
    "preco_maximo": "preço máximo como número ou null",
    "combustivel": "tipo de combustível ou null",
    "cor": "cor mencionada ou null",
    "cambio": "manual ou automatico ou null",
    "portas": "número de portas ou null",
    "quilometragem_maxima": "quilometragem máxima como número ou null",
    "apenas_novos": "true se o cliente quer somente carros zero km, senão null"
  },
  "resposta_conversacional": "resposta natural e amigável"
}

REGRAS IMPORTANTES:
- Se mencionar marca + ano específico, use "buscar_com_filtros"
- Se mencionar marca + qualquer outro critério, use "buscar_com_filtros"
- Se mencionar apenas marca, use "buscar_com_filtros" só com a marca
- Se perguntar que marcas existem, use "buscar_marcas"
- Se pedir todos os carros, use "buscar_todos"
- Se for saudação ou dúvida geral, use "conversar"

EXEMPLOS:
- "nissan 2022": acao "buscar_com_filtros", marca "Nissan", ano_especifico 2022
- "ford até 80 mil": acao "buscar_com_filtros", marca "Ford", preco_maximo 80000
- "que marcas vocês têm?": acao "buscar_marcas"
- "toyota": acao "buscar_com_filtros", marca "Toyota"
- "quero ver todos os carros": acao "buscar_todos"
- "bom dia!": acao "conversar"

Retorne apenas o JSON sem texto adicional."#;

#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] tera::Error),
    #[error("classification engine failed: {0}")]
    Engine(anyhow::Error),
    #[error("engine returned an empty payload")]
    EmptyPayload,
    #[error("engine payload is not a valid intent: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Turns one utterance into an [`Intent`] using the LLM as a translator.
pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
    templates: Tera,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Result<Self, ClassificationError> {
        let mut templates = Tera::default();
        templates.add_raw_template(PROMPT_TEMPLATE_NAME, PROMPT_TEMPLATE)?;
        Ok(Self { llm, templates })
    }

    pub fn render_prompt(&self, utterance: &str) -> Result<String, ClassificationError> {
        let mut context = Context::new();
        context.insert("utterance", utterance.trim());
        Ok(self.templates.render(PROMPT_TEMPLATE_NAME, &context)?)
    }

    /// Never fails: any engine or decoding problem becomes the chat fallback.
    pub async fn interpret(&self, utterance: &str) -> Intent {
        match self.try_interpret(utterance).await {
            Ok(intent) => {
                debug!(
                    action = intent.action.as_str(),
                    criteria_empty = intent.criteria.is_empty(),
                    "intent classified"
                );
                intent
            }
            Err(error) => {
                warn!(event_name = "agent.classification.fallback", error = %error, "intent classification failed");
                Intent::chat(CLASSIFICATION_FALLBACK_REPLY)
            }
        }
    }

    pub async fn try_interpret(&self, utterance: &str) -> Result<Intent, ClassificationError> {
        let prompt = self.render_prompt(utterance)?;
        let raw = self.llm.complete(&prompt).await.map_err(ClassificationError::Engine)?;
        decode_intent(&raw)
    }
}

/// Drops one leading fence marker (with its optional language tag) and one
/// trailing fence marker, wherever the closing marker sits.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    if let Some(rest) = text.trim_end().strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

pub fn decode_intent(raw: &str) -> Result<Intent, ClassificationError> {
    let payload = strip_code_fence(raw);
    if payload.is_empty() {
        return Err(ClassificationError::EmptyPayload);
    }
    Ok(serde_json::from_str(payload)?)
}
