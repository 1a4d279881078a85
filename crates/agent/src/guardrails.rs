use carlot_core::domain::criteria::{is_blank_marker, Criteria};
use carlot_core::domain::intent::{Intent, IntentAction};

/// Deterministic corrections applied to every classified intent before the
/// orchestrator acts on it. The engine may pick the wrong action or echo
/// placeholder text; these rules do not depend on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentGuard {
    pub promote_brand_to_search: bool,
    pub normalize_brand_case: bool,
}

impl Default for IntentGuard {
    fn default() -> Self {
        Self { promote_brand_to_search: true, normalize_brand_case: true }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Unchanged,
    /// The action was rewritten; `reason_code` names the rule that fired.
    Rewritten { from: IntentAction, to: IntentAction, reason_code: &'static str },
}

impl IntentGuard {
    pub fn apply(&self, intent: Intent) -> (Intent, GuardrailDecision) {
        let mut intent = intent;
        intent.criteria = self.normalize_criteria(intent.criteria);

        if !self.promote_brand_to_search || intent.criteria.brand.is_none() {
            return (intent, GuardrailDecision::Unchanged);
        }

        match intent.action {
            IntentAction::SearchFiltered => (intent, GuardrailDecision::Unchanged),
            from @ (IntentAction::ListAll | IntentAction::ListBrands | IntentAction::Chat) => {
                intent.action = IntentAction::SearchFiltered;
                let decision = GuardrailDecision::Rewritten {
                    from,
                    to: IntentAction::SearchFiltered,
                    reason_code: "brand_implies_filtered_search",
                };
                (intent, decision)
            }
        }
    }

    fn normalize_criteria(&self, criteria: Criteria) -> Criteria {
        let mut criteria = criteria;
        for field in [
            &mut criteria.brand,
            &mut criteria.model,
            &mut criteria.fuel_type,
            &mut criteria.color,
            &mut criteria.transmission,
        ] {
            *field = field.take().filter(|value| !is_blank_marker(value)).map(|value| {
                value.trim().to_string()
            });
        }

        if self.normalize_brand_case {
            criteria.brand = criteria.brand.map(|brand| title_case_if_lowercase(&brand));
        }
        criteria
    }
}

/// "toyota" becomes "Toyota" and "land rover" becomes "Land Rover"; mixed
/// case such as "BMW" or "McLaren" is left alone.
pub fn title_case_if_lowercase(value: &str) -> String {
    if value.chars().any(char::is_uppercase) {
        return value.to_string();
    }

    value
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
