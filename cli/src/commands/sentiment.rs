use serde_json::json;

use crate::util::api_request;

pub async fn run(api_url: &str, reviews: Vec<String>) -> i32 {
    let body = json!({ "reviews": reviews });
    api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/sentiment/analyze",
        Some(body),
        &[],
    )
    .await
}
