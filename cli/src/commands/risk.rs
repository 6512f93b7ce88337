use crate::util::api_request;

pub async fn run(api_url: &str, region: String, min_severity: Option<String>) -> i32 {
    let mut query = vec![("region".to_string(), region)];
    if let Some(v) = min_severity {
        query.push(("min_severity".to_string(), v));
    }

    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/risk/areas",
        None,
        &query,
    )
    .await
}
