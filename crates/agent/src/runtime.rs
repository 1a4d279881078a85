use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use carlot_core::domain::intent::{Intent, IntentAction};
use carlot_core::errors::ApplicationError;
use carlot_core::inventory::{
    BRANDS_KEY, TOOL_GET_AVAILABLE_BRANDS, TOOL_GET_VEHICLES, TOOL_GET_VEHICLES_BY_FILTERS,
};
use carlot_core::search::{format_results, DeterministicFilterCompiler, FilterCompiler};

use crate::conversation::IntentClassifier;
use crate::guardrails::{GuardrailDecision, IntentGuard};
use crate::tools::{ToolClient, ToolError, ToolInvocation};

pub const CLARIFICATION_PROMPT: &str =
    "Me conte mais sobre o que você procura - marca, faixa de preço, ano, cor...";

/// Runs one conversation turn: classify, guard, compile, invoke, format.
pub struct AgentRuntime {
    classifier: IntentClassifier,
    guard: IntentGuard,
    compiler: DeterministicFilterCompiler,
    tools: ToolClient,
}

/// Outcome of one turn, kept for logging and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnOutcome {
    pub correlation_id: String,
    pub action: IntentAction,
    pub invoked_tool: Option<&'static str>,
    pub reply: String,
}

impl AgentRuntime {
    pub fn new(classifier: IntentClassifier, tools: ToolClient) -> Self {
        Self {
            classifier,
            guard: IntentGuard::default(),
            compiler: DeterministicFilterCompiler,
            tools,
        }
    }

    /// Always produces a reply; failures become apology text.
    pub async fn handle_turn(&self, utterance: &str) -> String {
        self.run_turn(utterance).await.reply
    }

    pub async fn run_turn(&self, utterance: &str) -> TurnOutcome {
        let correlation_id = Uuid::new_v4().to_string();

        let classified = self.classifier.interpret(utterance).await;
        let (intent, decision) = self.guard.apply(classified);
        if let GuardrailDecision::Rewritten { from, to, reason_code } = &decision {
            info!(
                event_name = "agent.guardrail.rewritten",
                correlation_id = %correlation_id,
                from = from.as_str(),
                to = to.as_str(),
                reason_code,
                "intent action rewritten"
            );
        }

        let action = intent.action;
        let (invoked_tool, result) = self.dispatch(&correlation_id, intent).await;
        let reply = match result {
            Ok(reply) => reply,
            Err(TurnError::Tool(error)) => format!("Desculpe, tive um problema técnico: {error}"),
            Err(TurnError::Unexpected(error)) => {
                warn!(
                    event_name = "agent.turn.failed",
                    correlation_id = %correlation_id,
                    error = %error,
                    "turn failed"
                );
                error.user_message().to_string()
            }
        };

        info!(
            event_name = "agent.turn.completed",
            correlation_id = %correlation_id,
            action = action.as_str(),
            tool_name = invoked_tool.unwrap_or("none"),
            "turn completed"
        );
        TurnOutcome { correlation_id, action, invoked_tool, reply }
    }

    async fn dispatch(
        &self,
        correlation_id: &str,
        intent: Intent,
    ) -> (Option<&'static str>, Result<String, TurnError>) {
        match intent.action {
            IntentAction::Chat => (None, Ok(intent.reply)),
            IntentAction::ListAll => {
                let invocation = ToolInvocation::new(TOOL_GET_VEHICLES);
                let result = self.tools.invoke(&invocation).await.map_err(TurnError::Tool);
                let reply = result.map(|payload| compose(&intent.reply, &format_results(&payload)));
                (Some(TOOL_GET_VEHICLES), reply)
            }
            IntentAction::ListBrands => {
                let invocation = ToolInvocation::new(TOOL_GET_AVAILABLE_BRANDS);
                let reply = match self.tools.invoke(&invocation).await {
                    Ok(payload) => brand_reply(&payload).map(|brands| {
                        let body = format!("Marcas disponíveis:\n{brands}\n\nQual te interessa?");
                        compose(&intent.reply, &body)
                    }),
                    Err(error) => Err(TurnError::Tool(error)),
                };
                (Some(TOOL_GET_AVAILABLE_BRANDS), reply)
            }
            IntentAction::SearchFiltered => {
                let compilation = self.compiler.compile(&intent.criteria);
                for dropped in &compilation.dropped {
                    warn!(
                        event_name = "agent.compiler.dropped",
                        correlation_id,
                        field = dropped.field,
                        error = %dropped,
                        "criterion dropped"
                    );
                }
                if compilation.filters.is_empty() {
                    return (None, Ok(CLARIFICATION_PROMPT.to_string()));
                }

                let invocation = ToolInvocation::with_parameters(
                    TOOL_GET_VEHICLES_BY_FILTERS,
                    compilation.filters.to_arguments(),
                );
                let result = self.tools.invoke(&invocation).await.map_err(TurnError::Tool);
                let reply = result.map(|payload| compose(&intent.reply, &format_results(&payload)));
                (Some(TOOL_GET_VEHICLES_BY_FILTERS), reply)
            }
        }
    }
}

enum TurnError {
    Tool(ToolError),
    Unexpected(ApplicationError),
}

fn compose(reply: &str, body: &str) -> String {
    if reply.trim().is_empty() {
        body.to_string()
    } else {
        format!("{reply}\n\n{body}")
    }
}

fn brand_reply(payload: &str) -> Result<String, TurnError> {
    let value: Value = serde_json::from_str(payload)
        .map_err(|error| {
            TurnError::Unexpected(ApplicationError::Integration(format!(
                "brand payload is not JSON: {error}"
            )))
        })?;
    let brands = value
        .get(BRANDS_KEY)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            TurnError::Unexpected(ApplicationError::Integration(
                "brand payload has no brand list".to_string(),
            ))
        })?
        .iter()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>();
    Ok(brands.join(", "))
}
