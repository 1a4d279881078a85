use serde::{Deserialize, Deserializer, Serialize};

use super::criteria::Criteria;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntentAction {
    #[serde(rename = "buscar_todos")]
    ListAll,
    #[serde(rename = "buscar_marcas")]
    ListBrands,
    #[serde(rename = "buscar_com_filtros")]
    SearchFiltered,
    #[serde(rename = "conversar")]
    Chat,
}

impl IntentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListAll => "buscar_todos",
            Self::ListBrands => "buscar_marcas",
            Self::SearchFiltered => "buscar_com_filtros",
            Self::Chat => "conversar",
        }
    }

    pub fn invokes_tool(&self) -> bool {
        !matches!(self, Self::Chat)
    }
}

/// Classified action, criteria and conversational reply for a single turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "acao")]
    pub action: IntentAction,
    #[serde(rename = "criterios_identificados", default, deserialize_with = "null_as_default")]
    pub criteria: Criteria,
    #[serde(rename = "resposta_conversacional", default, deserialize_with = "null_as_default")]
    pub reply: String,
}

impl Intent {
    pub fn chat(reply: impl Into<String>) -> Self {
        Self { action: IntentAction::Chat, criteria: Criteria::default(), reply: reply.into() }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
