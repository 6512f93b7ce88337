use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use hearth_core::error::ApiError;

use crate::error::AppError;
use crate::state::AppState;
use crate::upstream::UpstreamError;

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/risk/areas", get(get_risk_areas))
}

/// Hazard severity tiers, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    Low,
    Moderate,
    High,
    Severe,
}

impl RiskSeverity {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskSeverity::Low => "low",
            RiskSeverity::Moderate => "moderate",
            RiskSeverity::High => "high",
            RiskSeverity::Severe => "severe",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "low" => Some(RiskSeverity::Low),
            "moderate" => Some(RiskSeverity::Moderate),
            "high" => Some(RiskSeverity::High),
            "severe" => Some(RiskSeverity::Severe),
            _ => None,
        }
    }

    fn rank(self) -> u8 {
        match self {
            RiskSeverity::Low => 0,
            RiskSeverity::Moderate => 1,
            RiskSeverity::High => 2,
            RiskSeverity::Severe => 3,
        }
    }
}

/// One hazard area within the requested region
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RiskArea {
    pub area_id: String,
    /// Display name, e.g. a neighborhood or flood zone label
    pub label: String,
    pub severity: RiskSeverity,
    /// Model hazard score; scale is owned by the risk service
    pub score: f64,
    /// GeoJSON geometry, forwarded untouched for map rendering
    #[serde(default)]
    pub geometry: Value,
}

/// Risk map payload. Unlike the model payloads this one has a stable typed
/// contract, so it is deserialized instead of sanitized.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RiskAreasResponse {
    pub region: String,
    pub areas: Vec<RiskArea>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<String>,
}

/// Query parameters for the risk map
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct RiskAreasParams {
    /// Region to map, e.g. "travis_county_tx"
    pub region: String,
    /// Drop areas below this severity (low, moderate, high, severe)
    #[serde(default)]
    pub min_severity: Option<String>,
}

fn validate_params(params: &RiskAreasParams) -> Result<(String, Option<RiskSeverity>), AppError> {
    let region = params.region.trim();
    if region.is_empty() {
        return Err(AppError::Validation {
            message: "region must not be empty".to_string(),
            field: Some("region".to_string()),
            received: Some(Value::String(params.region.clone())),
            docs_hint: None,
        });
    }

    let min_severity = match &params.min_severity {
        None => None,
        Some(raw) => Some(RiskSeverity::parse(raw).ok_or_else(|| AppError::Validation {
            message: "min_severity must be one of low, moderate, high, severe".to_string(),
            field: Some("min_severity".to_string()),
            received: Some(Value::String(raw.clone())),
            docs_hint: None,
        })?),
    };

    Ok((region.to_string(), min_severity))
}

/// Worst areas first: severity tier descending, score descending within a tier.
fn sort_worst_first(areas: &mut [RiskArea]) {
    areas.sort_by(|a, b| {
        b.severity
            .rank()
            .cmp(&a.severity.rank())
            .then(b.score.total_cmp(&a.score))
    });
}

/// Hazard areas for a region (flood, wildfire, subsidence).
///
/// Thin typed proxy over the risk service: the severity filter is forwarded
/// upstream, areas come back ordered worst-first for direct map rendering.
#[utoipa::path(
    get,
    path = "/v1/risk/areas",
    params(RiskAreasParams),
    responses(
        (status = 200, description = "Hazard areas, worst first", body = RiskAreasResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Risk service unavailable", body = ApiError),
        (status = 504, description = "Risk service timed out", body = ApiError)
    ),
    tag = "risk"
)]
pub async fn get_risk_areas(
    State(state): State<AppState>,
    Query(params): Query<RiskAreasParams>,
) -> Result<Json<RiskAreasResponse>, AppError> {
    let (region, min_severity) = validate_params(&params)?;

    let mut query = vec![("region", region)];
    if let Some(min_severity) = min_severity {
        query.push(("min_severity", min_severity.as_str().to_string()));
    }

    let raw = state.risk.get_json("/risk/areas", &query).await?;
    let mut response: RiskAreasResponse =
        serde_json::from_value(raw).map_err(|err| UpstreamError::Protocol {
            service: state.risk.service(),
            detail: err.to_string(),
        })?;

    sort_worst_first(&mut response.areas);
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(severity: RiskSeverity, score: f64) -> RiskArea {
        RiskArea {
            area_id: format!("{}-{}", severity.as_str(), score),
            label: "zone".to_string(),
            severity,
            score,
            geometry: Value::Null,
        }
    }

    #[test]
    fn severity_parse_accepts_any_casing() {
        assert_eq!(RiskSeverity::parse(" High "), Some(RiskSeverity::High));
        assert_eq!(RiskSeverity::parse("SEVERE"), Some(RiskSeverity::Severe));
        assert_eq!(RiskSeverity::parse("extreme"), None);
    }

    #[test]
    fn region_is_required() {
        let params = RiskAreasParams {
            region: "  ".to_string(),
            min_severity: None,
        };
        assert!(validate_params(&params).is_err());
    }

    #[test]
    fn unknown_min_severity_is_rejected() {
        let params = RiskAreasParams {
            region: "travis_county_tx".to_string(),
            min_severity: Some("catastrophic".to_string()),
        };
        assert!(validate_params(&params).is_err());
    }

    #[test]
    fn areas_sort_worst_first() {
        let mut areas = vec![
            area(RiskSeverity::Low, 0.9),
            area(RiskSeverity::Severe, 0.2),
            area(RiskSeverity::High, 0.5),
            area(RiskSeverity::High, 0.8),
        ];
        sort_worst_first(&mut areas);
        let order: Vec<(RiskSeverity, f64)> =
            areas.iter().map(|a| (a.severity, a.score)).collect();
        assert_eq!(
            order,
            vec![
                (RiskSeverity::Severe, 0.2),
                (RiskSeverity::High, 0.8),
                (RiskSeverity::High, 0.5),
                (RiskSeverity::Low, 0.9),
            ]
        );
    }

    #[test]
    fn upstream_payload_deserializes() {
        let raw = serde_json::json!({
            "region": "travis_county_tx",
            "generated_at": "2026-08-20T00:00:00Z",
            "areas": [
                {"area_id": "fz-118", "label": "Onion Creek", "severity": "severe", "score": 0.93,
                 "geometry": {"type": "Polygon", "coordinates": []}}
            ]
        });
        let response: RiskAreasResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(response.areas.len(), 1);
        assert_eq!(response.areas[0].severity, RiskSeverity::Severe);
    }
}
