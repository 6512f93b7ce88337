use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use hearth_core::error::ApiError;
use hearth_core::normalize;

use crate::error::AppError;
use crate::state::AppState;

const MAX_REVIEWS: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/sentiment/analyze", post(analyze_reviews))
}

/// Batch of raw review texts to classify
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AnalyzeReviewsRequest {
    /// Review texts, 1 to 100 per request
    pub reviews: Vec<String>,
}

/// Validate the batch and return the trimmed texts sent upstream.
fn validate_reviews(req: &AnalyzeReviewsRequest) -> Result<Vec<&str>, AppError> {
    if req.reviews.is_empty() {
        return Err(AppError::Validation {
            message: "reviews must not be empty".to_string(),
            field: Some("reviews".to_string()),
            received: None,
            docs_hint: Some("Provide at least one review text".to_string()),
        });
    }

    if req.reviews.len() > MAX_REVIEWS {
        return Err(AppError::Validation {
            message: format!(
                "Batch size {} exceeds maximum of {}",
                req.reviews.len(),
                MAX_REVIEWS
            ),
            field: Some("reviews".to_string()),
            received: Some(json!(req.reviews.len())),
            docs_hint: Some(format!("Split large batches into chunks of {MAX_REVIEWS} or fewer")),
        });
    }

    let mut trimmed = Vec::with_capacity(req.reviews.len());
    for (i, review) in req.reviews.iter().enumerate() {
        let text = review.trim();
        if text.is_empty() {
            return Err(AppError::Validation {
                message: format!("reviews[{}] must not be empty", i),
                field: Some(format!("reviews[{}]", i)),
                received: None,
                docs_hint: None,
            });
        }
        trimmed.push(text);
    }

    Ok(trimmed)
}

/// Classify review texts as positive / negative / neutral.
///
/// Proxies the sentiment model and normalizes its payload: each classified
/// review carries a 0..1 `confidence_score`, and the `summary` counts are
/// always numeric.
#[utoipa::path(
    post,
    path = "/v1/sentiment/analyze",
    request_body = AnalyzeReviewsRequest,
    responses(
        (status = 200, description = "Normalized classification results", body = serde_json::Value),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Sentiment service unavailable", body = ApiError),
        (status = 504, description = "Sentiment service timed out", body = ApiError)
    ),
    tag = "sentiment"
)]
pub async fn analyze_reviews(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeReviewsRequest>,
) -> Result<Json<Value>, AppError> {
    let reviews = validate_reviews(&req)?;
    let raw = state
        .sentiment
        .post_json("/analyze", &json!({ "reviews": reviews }))
        .await?;
    Ok(Json(normalize::sanitize_sentiment_response(&raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(reviews: &[&str]) -> AnalyzeReviewsRequest {
        AnalyzeReviewsRequest {
            reviews: reviews.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_batch_is_rejected() {
        assert!(validate_reviews(&request(&[])).is_err());
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let reviews: Vec<String> = (0..=MAX_REVIEWS).map(|i| format!("review {i}")).collect();
        let req = AnalyzeReviewsRequest { reviews };
        assert!(validate_reviews(&req).is_err());
    }

    #[test]
    fn blank_entries_are_rejected_by_index() {
        let err = validate_reviews(&request(&["fine", "   "])).unwrap_err();
        match err {
            AppError::Validation { field, .. } => {
                assert_eq!(field.as_deref(), Some("reviews[1]"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn texts_are_trimmed_before_upload() {
        let req = request(&["  sold our house fast  "]);
        let trimmed = validate_reviews(&req).unwrap();
        assert_eq!(trimmed, vec!["sold our house fast"]);
    }
}
