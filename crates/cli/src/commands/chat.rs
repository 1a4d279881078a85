use std::future::Future;
use std::sync::Arc;

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};

use carlot_agent::{AgentRuntime, GeminiClient, IntentClassifier, McpSession, ToolClient};
use carlot_core::errors::ApplicationError;

use crate::commands::{
    build_runtime, load_config, CommandResult, EXIT_CONFIG, EXIT_RUNTIME, EXIT_TOOL_SESSION,
};
use crate::logging;

pub const GREETING: &str = "Olá! Sou o assistente da concessionária. Posso te mostrar nosso \
estoque, as marcas disponíveis ou procurar um carro com as características que você quiser. \
Digite 'sair' para encerrar.";
pub const FAREWELL: &str = "Até logo! Volte sempre.";

const EXIT_KEYWORDS: &[&str] = &["sair", "quit", "exit", "tchau"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopExit {
    Keyword,
    EndOfInput,
    Interrupted,
}

pub fn run() -> CommandResult {
    let config = match load_config("chat") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let api_key = match config.require_llm_api_key() {
        Ok(key) => key.clone(),
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    logging::init(&config.logging);

    let runtime = match build_runtime("chat") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let llm = Arc::new(GeminiClient::new(&config.llm, api_key));
    let classifier = match IntentClassifier::new(llm) {
        Ok(classifier) => classifier,
        Err(error) => {
            let application_error = ApplicationError::Configuration(error.to_string());
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("{}: {application_error}", application_error.user_message()),
                EXIT_CONFIG,
            );
        }
    };

    runtime.block_on(async {
        let session = match McpSession::connect(&config.tools, &config.database.url).await {
            Ok(session) => session,
            Err(error) => {
                return CommandResult::failure(
                    "chat",
                    "tool_session",
                    error.to_string(),
                    EXIT_TOOL_SESSION,
                );
            }
        };

        let agent =
            AgentRuntime::new(classifier, ToolClient::connected(Arc::new(session.channel())));
        let outcome =
            conversation_loop(&agent, BufReader::new(io::stdin()), io::stdout()).await;

        if let Err(error) = session.shutdown().await {
            warn!(event_name = "cli.chat.shutdown_failed", error = %error, "tool session did not close cleanly");
        }

        match outcome {
            Ok(exit) => {
                info!(event_name = "cli.chat.finished", exit = ?exit, "conversation ended");
                CommandResult { exit_code: 0, output: String::new() }
            }
            Err(error) => CommandResult::failure(
                "chat",
                "terminal_io",
                format!("conversation aborted: {error}"),
                EXIT_RUNTIME,
            ),
        }
    })
}

fn is_exit_keyword(line: &str) -> bool {
    let normalized = line.trim().to_lowercase();
    EXIT_KEYWORDS.contains(&normalized.as_str())
}

/// Reads one utterance per line until an exit keyword, end of input or
/// Ctrl-C. Each turn is fully answered before the next line is read.
pub async fn conversation_loop<R, W>(
    agent: &AgentRuntime,
    input: R,
    output: W,
) -> io::Result<LoopExit>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    conversation_loop_until(agent, input, output, tokio::signal::ctrl_c()).await
}

/// Same loop, stopped by `interrupt`. The one future is polled while waiting
/// for input and while a turn is in flight, so a signal is never dropped.
pub async fn conversation_loop_until<R, W, I>(
    agent: &AgentRuntime,
    input: R,
    mut output: W,
    interrupt: I,
) -> io::Result<LoopExit>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    I: Future,
{
    tokio::pin!(interrupt);
    let mut lines = input.lines();
    output.write_all(format!("Assistente: {GREETING}\n").as_bytes()).await?;

    let exit = loop {
        output.write_all("\nVocê: ".as_bytes()).await?;
        output.flush().await?;

        let line = tokio::select! {
            biased;
            _ = &mut interrupt => break LoopExit::Interrupted,
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            break LoopExit::EndOfInput;
        };
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if is_exit_keyword(utterance) {
            break LoopExit::Keyword;
        }

        let reply = tokio::select! {
            biased;
            _ = &mut interrupt => break LoopExit::Interrupted,
            reply = agent.handle_turn(utterance) => reply,
        };
        output.write_all(format!("\nAssistente: {reply}\n").as_bytes()).await?;
    };

    output.write_all(format!("\nAssistente: {FAREWELL}\n").as_bytes()).await?;
    output.flush().await?;
    Ok(exit)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::io::BufReader;
    use tokio::sync::oneshot;

    use carlot_agent::{AgentRuntime, IntentClassifier, LlmClient, ToolClient};

    use super::{
        conversation_loop, conversation_loop_until, is_exit_keyword, LoopExit, FAREWELL, GREETING,
    };

    struct GreetingLlm;

    #[async_trait]
    impl LlmClient for GreetingLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok(r#"{"acao": "conversar", "resposta_conversacional": "Oi! Em que posso ajudar?"}"#
                .to_string())
        }
    }

    /// Raises the interrupt once the turn starts, then never answers.
    struct InterruptingLlm {
        interrupt: Mutex<Option<oneshot::Sender<()>>>,
    }

    #[async_trait]
    impl LlmClient for InterruptingLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            if let Some(sender) = self.interrupt.lock().expect("lock").take() {
                let _ = sender.send(());
            }
            std::future::pending().await
        }
    }

    fn agent() -> AgentRuntime {
        let classifier = IntentClassifier::new(Arc::new(GreetingLlm)).expect("classifier");
        AgentRuntime::new(classifier, ToolClient::Disconnected)
    }

    async fn converse(script: &str) -> (LoopExit, String) {
        let mut transcript = Vec::new();
        let exit = conversation_loop(&agent(), BufReader::new(script.as_bytes()), &mut transcript)
            .await
            .expect("loop");
        (exit, String::from_utf8(transcript).expect("utf8"))
    }

    #[test]
    fn exit_keywords_ignore_case_and_whitespace() {
        assert!(is_exit_keyword("sair"));
        assert!(is_exit_keyword("  TCHAU "));
        assert!(is_exit_keyword("Quit"));
        assert!(!is_exit_keyword("sair daqui"));
    }

    #[tokio::test]
    async fn answers_each_line_then_stops_at_keyword() {
        let (exit, transcript) = converse("oi\n\nSair\nnunca lido\n").await;

        assert_eq!(exit, LoopExit::Keyword);
        assert!(transcript.starts_with(&format!("Assistente: {GREETING}")));
        assert_eq!(transcript.matches("Oi! Em que posso ajudar?").count(), 1);
        assert!(transcript.trim_end().ends_with(FAREWELL));
    }

    #[tokio::test]
    async fn end_of_input_closes_the_conversation() {
        let (exit, transcript) = converse("bom dia").await;

        assert_eq!(exit, LoopExit::EndOfInput);
        assert!(transcript.contains("Você: "));
        assert!(transcript.contains("Oi! Em que posso ajudar?"));
        assert!(transcript.trim_end().ends_with(FAREWELL));
    }

    #[tokio::test]
    async fn interrupt_before_input_ends_the_conversation() {
        let mut transcript = Vec::new();
        let exit = conversation_loop_until(
            &agent(),
            BufReader::new(tokio::io::empty()),
            &mut transcript,
            std::future::ready(()),
        )
        .await
        .expect("loop");

        assert_eq!(exit, LoopExit::Interrupted);
        assert!(String::from_utf8(transcript).expect("utf8").trim_end().ends_with(FAREWELL));
    }

    #[tokio::test]
    async fn interrupt_during_a_turn_is_not_lost() {
        let (sender, receiver) = oneshot::channel();
        let llm = InterruptingLlm { interrupt: Mutex::new(Some(sender)) };
        let classifier = IntentClassifier::new(Arc::new(llm)).expect("classifier");
        let agent = AgentRuntime::new(classifier, ToolClient::Disconnected);

        let mut transcript = Vec::new();
        let exit = conversation_loop_until(
            &agent,
            BufReader::new("quais marcas?\noutra pergunta\n".as_bytes()),
            &mut transcript,
            receiver,
        )
        .await
        .expect("loop");

        assert_eq!(exit, LoopExit::Interrupted);
        let transcript = String::from_utf8(transcript).expect("utf8");
        assert_eq!(transcript.matches("Você: ").count(), 1);
        assert!(transcript.trim_end().ends_with(FAREWELL));
    }
}
