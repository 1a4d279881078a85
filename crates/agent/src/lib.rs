//! Agent Runtime - conversational vehicle search
//!
//! This crate provides the orchestration layer between a shopper's free-form
//! message and the inventory tool server:
//! - Classifies the message into a structured intent with an LLM
//! - Enforces deterministic guardrails on whatever the LLM returned
//! - Calls inventory tools through a bounded-retry client
//! - Renders results into the conversation reply
//!
//! # Architecture
//!
//! Each turn follows a constrained loop:
//! 1. **Intent Classification** (`conversation`) - text to `Intent`, with a
//!    chat fallback when the engine output is unusable
//! 2. **Guardrails** (`guardrails`) - normalize criteria and fix the action
//! 3. **Compilation** - criteria to `FilterSet` (in `carlot-core`)
//! 4. **Tool Invocation** (`tools`) - MCP call with retry
//! 5. **Formatting** - bounded listing text (in `carlot-core`)
//!
//! # Key Types
//!
//! - `AgentRuntime` - per-turn orchestrator (see `runtime` module)
//! - `LlmClient` - pluggable completion trait, `GeminiClient` in production
//! - `ToolClient` / `McpSession` - tool channel and its session lifetime
//!
//! # Safety Principle
//!
//! The LLM is strictly a translator. It never decides which filters are sent
//! or how results are presented; those are deterministic.

pub mod conversation;
pub mod guardrails;
pub mod llm;
pub mod runtime;
pub mod tools;

pub use conversation::{ClassificationError, IntentClassifier};
pub use guardrails::IntentGuard;
pub use llm::{GeminiClient, LlmClient};
pub use runtime::{AgentRuntime, TurnOutcome};
pub use tools::{McpSession, RetryPolicy, SessionError, ToolClient, ToolError, ToolInvocation};
