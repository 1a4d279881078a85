use thiserror::Error;

/// A single criterion that could not be coerced to the type its filter
/// declares. Only that field is dropped from the compiled filter set.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("criterion `{field}` value `{value}` is not a valid {expected}")]
pub struct CoercionError {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str,
}

/// Why a tool payload could not be rendered as a vehicle listing. Callers
/// fall back to the raw payload.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("payload is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("payload has no `veiculos` collection")]
    MissingRecords,
    #[error("vehicle record {index} is malformed: {reason}")]
    InvalidRecord { index: usize, reason: String },
}

/// Failure of a conversation turn outside the tool protocol.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Conversation-safe text for a turn that could not be completed.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Integration(_) => "Desculpe, tive um problema técnico. Pode tentar novamente?",
            Self::Configuration(_) => "O assistente não está configurado corretamente.",
        }
    }
}
