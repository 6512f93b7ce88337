use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Map, Value, json};

use hearth_core::error::ApiError;
use hearth_core::normalize;

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_TOP_K: usize = 5;
const MAX_TOP_K: usize = 20;
const MAX_MUST_HAVES: usize = 10;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/agents/recommend", post(recommend_agents))
}

/// Request for ranked agent recommendations
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RecommendRequest {
    /// City the client is buying or selling in
    pub city: String,
    /// Property type (e.g. "condo", "single_family")
    #[serde(default)]
    pub property_type: Option<String>,
    /// Budget in whole dollars
    #[serde(default)]
    pub budget: Option<i64>,
    /// Hard requirements forwarded verbatim to the recommender
    #[serde(default)]
    pub must_haves: Vec<String>,
    /// Number of recommendations to return (default 5, max 20)
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// Validate the request and return the effective top_k.
fn validate_request(req: &RecommendRequest) -> Result<usize, AppError> {
    if req.city.trim().is_empty() {
        return Err(AppError::Validation {
            message: "city must not be empty".to_string(),
            field: Some("city".to_string()),
            received: Some(Value::String(req.city.clone())),
            docs_hint: Some("Pass the city the client is searching in, e.g. \"austin\"".to_string()),
        });
    }

    if let Some(budget) = req.budget {
        if budget <= 0 {
            return Err(AppError::Validation {
                message: "budget must be a positive dollar amount".to_string(),
                field: Some("budget".to_string()),
                received: Some(json!(budget)),
                docs_hint: None,
            });
        }
    }

    if req.must_haves.len() > MAX_MUST_HAVES {
        return Err(AppError::Validation {
            message: format!(
                "must_haves has {} entries, maximum is {}",
                req.must_haves.len(),
                MAX_MUST_HAVES
            ),
            field: Some("must_haves".to_string()),
            received: Some(json!(req.must_haves.len())),
            docs_hint: Some("Keep must_haves to the deal-breakers only".to_string()),
        });
    }

    for (i, entry) in req.must_haves.iter().enumerate() {
        if entry.trim().is_empty() {
            return Err(AppError::Validation {
                message: format!("must_haves[{}] must not be empty", i),
                field: Some(format!("must_haves[{}]", i)),
                received: Some(Value::String(entry.clone())),
                docs_hint: None,
            });
        }
    }

    Ok(req.top_k.unwrap_or(DEFAULT_TOP_K).clamp(1, MAX_TOP_K))
}

fn upstream_body(req: &RecommendRequest, top_k: usize) -> Value {
    let mut body = Map::new();
    body.insert("city".to_string(), json!(req.city.trim()));
    body.insert("top_k".to_string(), json!(top_k));
    if let Some(property_type) = &req.property_type {
        body.insert("property_type".to_string(), json!(property_type.trim()));
    }
    if let Some(budget) = req.budget {
        body.insert("budget".to_string(), json!(budget));
    }
    if !req.must_haves.is_empty() {
        body.insert("must_haves".to_string(), json!(req.must_haves));
    }
    Value::Object(body)
}

/// Rank agents for a client brief.
///
/// Proxies the recommender model and normalizes its payload: ranked
/// `recommendations` with 0..1 scores, per-agent `explanations` with signed
/// factor weights, plus `model_version` and `query_id` for audit.
#[utoipa::path(
    post,
    path = "/v1/agents/recommend",
    request_body = RecommendRequest,
    responses(
        (status = 200, description = "Normalized ranked recommendations", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Recommender unavailable", body = ApiError),
        (status = 504, description = "Recommender timed out", body = ApiError)
    ),
    tag = "agents"
)]
pub async fn recommend_agents(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<Value>, AppError> {
    let top_k = validate_request(&req)?;
    let raw = state
        .agents
        .post_json("/recommendations", &upstream_body(&req, top_k))
        .await?;
    Ok(Json(normalize::sanitize_recommendation_response(&raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(city: &str) -> RecommendRequest {
        RecommendRequest {
            city: city.to_string(),
            property_type: None,
            budget: None,
            must_haves: Vec::new(),
            top_k: None,
        }
    }

    #[test]
    fn city_is_required() {
        assert!(validate_request(&request("austin")).is_ok());
        assert!(validate_request(&request("")).is_err());
        assert!(validate_request(&request("   ")).is_err());
    }

    #[test]
    fn top_k_defaults_and_clamps() {
        assert_eq!(validate_request(&request("austin")).unwrap(), DEFAULT_TOP_K);

        let mut req = request("austin");
        req.top_k = Some(100);
        assert_eq!(validate_request(&req).unwrap(), MAX_TOP_K);
        req.top_k = Some(0);
        assert_eq!(validate_request(&req).unwrap(), 1);
    }

    #[test]
    fn budget_must_be_positive() {
        let mut req = request("austin");
        req.budget = Some(-450_000);
        assert!(validate_request(&req).is_err());
        req.budget = Some(450_000);
        assert!(validate_request(&req).is_ok());
    }

    #[test]
    fn must_haves_entries_are_checked_individually() {
        let mut req = request("austin");
        req.must_haves = vec!["garage".to_string(), "  ".to_string()];
        let err = validate_request(&req).unwrap_err();
        match err {
            AppError::Validation { field, .. } => {
                assert_eq!(field.as_deref(), Some("must_haves[1]"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }

        req.must_haves = vec!["x".to_string(); MAX_MUST_HAVES + 1];
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn upstream_body_omits_unset_fields() {
        let body = upstream_body(&request(" austin "), 5);
        assert_eq!(body["city"], json!("austin"));
        assert_eq!(body["top_k"], json!(5));
        assert!(body.get("budget").is_none());
        assert!(body.get("must_haves").is_none());

        let mut req = request("austin");
        req.budget = Some(650_000);
        req.must_haves = vec!["pool".to_string()];
        let body = upstream_body(&req, 3);
        assert_eq!(body["budget"], json!(650_000));
        assert_eq!(body["must_haves"], json!(["pool"]));
    }
}
