use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use hearth_core::error::ApiError;
use hearth_core::normalize;

use crate::error::AppError;
use crate::state::AppState;
use crate::upstream::UpstreamError;

const DEFAULT_SEARCH_LIMIT: u32 = 20;
const MAX_SEARCH_LIMIT: u32 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/agents/search", get(search_agents))
        .route("/v1/agents/{agent_id}", get(get_agent))
}

fn validate_agent_id(raw: &str) -> Result<u64, AppError> {
    raw.parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::Validation {
            message: "agent_id must be a positive integer".to_string(),
            field: Some("agent_id".to_string()),
            received: Some(Value::String(raw.to_string())),
            docs_hint: Some("Agent IDs are numeric, e.g. /v1/agents/14".to_string()),
        })
}

/// Fetch one agent: profile, performance metrics and recent reviews.
///
/// The upstream record is normalized before it reaches the client — string
/// placeholders become "", numeric fields are coerced, metric scores land on
/// the 0..1 scale and the nested containers are always present.
#[utoipa::path(
    get,
    path = "/v1/agents/{agent_id}",
    params(
        ("agent_id" = String, Path, description = "Upstream agent identifier (numeric)")
    ),
    responses(
        (status = 200, description = "Normalized agent record", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 404, description = "Agent not found", body = ApiError),
        (status = 502, description = "Agents service unavailable", body = ApiError),
        (status = 504, description = "Agents service timed out", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn get_agent(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let agent_id = validate_agent_id(&agent_id)?;

    let raw = match state
        .agents
        .get_json(&format!("/agents/{agent_id}"), &[])
        .await
    {
        Ok(raw) => raw,
        // The one upstream status forwarded as-is: a missing agent is the
        // caller's 404, not a gateway failure.
        Err(UpstreamError::Status { status: 404, .. }) => {
            return Err(AppError::NotFound {
                resource: format!("agent {agent_id}"),
            });
        }
        Err(err) => return Err(err.into()),
    };

    Ok(Json(normalize::sanitize_agent_record(&raw)))
}

/// Query parameters for agent search
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct SearchAgentsParams {
    /// Filter by city served
    #[serde(default)]
    pub city: Option<String>,
    /// Filter by specialty (e.g. "luxury", "first_time_buyers")
    #[serde(default)]
    pub specialty: Option<String>,
    /// Free-text query over name and agency
    #[serde(default)]
    pub q: Option<String>,
    /// Maximum number of results (default 20, max 50)
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Turn validated search params into the upstream query string. At least one
/// of city/specialty/q must survive trimming.
fn search_query(params: &SearchAgentsParams) -> Result<Vec<(&'static str, String)>, AppError> {
    let mut query = Vec::new();
    for (name, value) in [
        ("city", &params.city),
        ("specialty", &params.specialty),
        ("q", &params.q),
    ] {
        if let Some(value) = value {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                query.push((name, trimmed.to_string()));
            }
        }
    }

    if query.is_empty() {
        return Err(AppError::Validation {
            message: "at least one of city, specialty or q is required".to_string(),
            field: None,
            received: None,
            docs_hint: Some(
                "Narrow the search with ?city=austin, ?specialty=luxury or ?q=jane".to_string(),
            ),
        });
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_SEARCH_LIMIT)
        .clamp(1, MAX_SEARCH_LIMIT);
    query.push(("limit", limit.to_string()));

    Ok(query)
}

/// Search agents by city, specialty or free text.
///
/// Results are normalized agent records; `total_count` reflects the full
/// upstream match count, not the returned page.
#[utoipa::path(
    get,
    path = "/v1/agents/search",
    params(SearchAgentsParams),
    responses(
        (status = 200, description = "Normalized search results", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Agents service unavailable", body = ApiError),
        (status = 504, description = "Agents service timed out", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn search_agents(
    State(state): State<AppState>,
    Query(params): Query<SearchAgentsParams>,
) -> Result<Json<Value>, AppError> {
    let query = search_query(&params)?;
    let raw = state.agents.get_json("/agents/search", &query).await?;
    Ok(Json(normalize::sanitize_search_response(&raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_must_be_a_positive_integer() {
        assert_eq!(validate_agent_id("14").unwrap(), 14);
        assert!(validate_agent_id("0").is_err());
        assert!(validate_agent_id("-3").is_err());
        assert!(validate_agent_id("14a").is_err());
        assert!(validate_agent_id("").is_err());
    }

    fn params(
        city: Option<&str>,
        specialty: Option<&str>,
        q: Option<&str>,
        limit: Option<u32>,
    ) -> SearchAgentsParams {
        SearchAgentsParams {
            city: city.map(String::from),
            specialty: specialty.map(String::from),
            q: q.map(String::from),
            limit,
        }
    }

    #[test]
    fn search_requires_at_least_one_filter() {
        assert!(search_query(&params(None, None, None, None)).is_err());
        // Whitespace-only filters do not count.
        assert!(search_query(&params(Some("   "), None, None, None)).is_err());
        assert!(search_query(&params(Some("austin"), None, None, None)).is_ok());
    }

    #[test]
    fn search_trims_filters_and_clamps_limit() {
        let query = search_query(&params(Some("  austin "), None, Some("jane"), Some(500))).unwrap();
        assert!(query.contains(&("city", "austin".to_string())));
        assert!(query.contains(&("q", "jane".to_string())));
        assert!(query.contains(&("limit", MAX_SEARCH_LIMIT.to_string())));
    }

    #[test]
    fn search_limit_defaults() {
        let query = search_query(&params(Some("austin"), None, None, None)).unwrap();
        assert!(query.contains(&("limit", DEFAULT_SEARCH_LIMIT.to_string())));
        let query = search_query(&params(Some("austin"), None, None, Some(0))).unwrap();
        assert!(query.contains(&("limit", "1".to_string())));
    }
}
