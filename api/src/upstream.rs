use serde_json::Value;

use crate::config::UpstreamConfig;

/// Failure talking to an upstream service, classified so the error layer can
/// pick a status code without inspecting reqwest internals.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{service} did not respond in time")]
    Timeout { service: &'static str },
    #[error("could not reach {service}: {detail}")]
    Unreachable { service: &'static str, detail: String },
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },
    #[error("{service} returned a body that is not valid JSON")]
    Decode { service: &'static str },
    #[error("{service} broke the response contract: {detail}")]
    Protocol { service: &'static str, detail: String },
}

impl UpstreamError {
    pub(crate) fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UpstreamError::Timeout { service }
        } else {
            // Drop the URL from the detail; it may carry query params.
            UpstreamError::Unreachable {
                service,
                detail: err.without_url().to_string(),
            }
        }
    }
}

/// JSON-over-HTTP client for one upstream service, bound to an explicit base
/// URL and timeout from configuration.
#[derive(Clone)]
pub struct UpstreamClient {
    service: &'static str,
    base_url: String,
    http: reqwest::Client,
}

impl UpstreamClient {
    pub fn new(service: &'static str, config: &UpstreamConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("hearth-api/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("failed to build HTTP client");
        Self {
            service,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Human-readable name used in error messages and logs.
    pub fn service(&self) -> &'static str {
        self.service
    }

    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, UpstreamError> {
        let mut request = self.http.get(self.endpoint(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        let response = request
            .send()
            .await
            .map_err(|err| UpstreamError::from_reqwest(self.service, err))?;
        self.read_json(response).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<Value, UpstreamError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .json(body)
            .send()
            .await
            .map_err(|err| UpstreamError::from_reqwest(self.service, err))?;
        self.read_json(response).await
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_json(&self, response: reqwest::Response) -> Result<Value, UpstreamError> {
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status {
                service: self.service,
                status: status.as_u16(),
            });
        }
        response
            .json::<Value>()
            .await
            .map_err(|_| UpstreamError::Decode {
                service: self.service,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client(base: &str) -> UpstreamClient {
        UpstreamClient::new(
            "agents service",
            &crate::config::UpstreamConfig {
                base_url: url::Url::parse(base).unwrap(),
                timeout: Duration::from_secs(5),
            },
        )
    }

    #[test]
    fn endpoint_joins_without_doubling_slashes() {
        assert_eq!(
            client("http://agents.internal:9100/").endpoint("/agents/14"),
            "http://agents.internal:9100/agents/14"
        );
        assert_eq!(
            client("http://ml.internal/recommender").endpoint("/recommendations"),
            "http://ml.internal/recommender/recommendations"
        );
    }

    #[test]
    fn errors_name_the_service() {
        let err = UpstreamError::Status {
            service: "agents service",
            status: 503,
        };
        assert_eq!(err.to_string(), "agents service returned HTTP 503");
        let err = UpstreamError::Timeout {
            service: "sentiment service",
        };
        assert!(err.to_string().contains("sentiment service"));
    }
}
