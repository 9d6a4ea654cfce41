//! Linking rules endpoints.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use linkweave_core::{RuleTable, RulesDocument};

use super::blocking;
use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct SetRulesRequest {
    pub rules: RulesDocument,
}

/// Stored rules, or the built-in defaults when none were saved.
pub async fn get_rules(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let file = state.rules.clone();
    let (rules, source) = match blocking(move || file.load()).await? {
        Some(rules) => (rules, "stored"),
        None => (RuleTable::default_rules(), "default"),
    };
    Ok(Json(serde_json::json!({
        "rules": rules.to_document(),
        "source": source,
    })))
}

/// Validate and persist a rules document. Pairs with `min_links > max_links`
/// are rejected and nothing is written.
pub async fn set_rules(
    State(state): State<AppState>,
    Json(request): Json<SetRulesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let rules = RuleTable::from_document(&request.rules)?;
    let rule_count = rules.len();
    let file = state.rules.clone();
    blocking(move || file.save(&rules)).await?;
    Ok(Json(serde_json::json!({
        "message": "Linking rules saved",
        "rule_count": rule_count,
    })))
}
