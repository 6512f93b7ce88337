use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use hearth_core::error::ApiError;
use hearth_core::normalize::{clean_number, clean_string};

use crate::error::AppError;
use crate::state::AppState;
use crate::warehouse::QueryParameter;

const DEFAULT_MONTHS: u32 = 12;
const MAX_MONTHS: u32 = 60;

const SUMMARY_SQL: &str = "\
SELECT AVG(median_sale_price) AS median_sale_price, \
       AVG(avg_days_on_market) AS avg_days_on_market, \
       SUM(closed_sales) AS closed_sales, \
       SUM(new_listings) AS new_listings \
FROM `analytics.market_monthly` \
WHERE region = @region \
  AND month >= DATE_SUB(DATE_TRUNC(CURRENT_DATE(), MONTH), INTERVAL @months MONTH)";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/market/summary", get(market_summary))
        .route("/v1/market/trends", get(market_trends))
}

/// Monthly series available from the warehouse rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    MedianPrice,
    DaysOnMarket,
    ClosedSales,
    NewListings,
}

impl TrendMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            TrendMetric::MedianPrice => "median_price",
            TrendMetric::DaysOnMarket => "days_on_market",
            TrendMetric::ClosedSales => "closed_sales",
            TrendMetric::NewListings => "new_listings",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "median_price" => Some(TrendMetric::MedianPrice),
            "days_on_market" => Some(TrendMetric::DaysOnMarket),
            "closed_sales" => Some(TrendMetric::ClosedSales),
            "new_listings" => Some(TrendMetric::NewListings),
            _ => None,
        }
    }

    /// Rollup column behind each metric. Column names come from this fixed
    /// mapping, never from request text, so the interpolation below is safe.
    fn column(self) -> &'static str {
        match self {
            TrendMetric::MedianPrice => "median_sale_price",
            TrendMetric::DaysOnMarket => "avg_days_on_market",
            TrendMetric::ClosedSales => "closed_sales",
            TrendMetric::NewListings => "new_listings",
        }
    }
}

fn trends_sql(metric: TrendMetric) -> String {
    format!(
        "SELECT FORMAT_DATE('%Y-%m', month) AS month, {column} AS value \
         FROM `analytics.market_monthly` \
         WHERE region = @region \
           AND month >= DATE_SUB(DATE_TRUNC(CURRENT_DATE(), MONTH), INTERVAL @months MONTH) \
         ORDER BY month",
        column = metric.column()
    )
}

/// Query parameters for the market summary
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct MarketSummaryParams {
    /// Region rollup key, e.g. "austin_tx"
    pub region: String,
    /// Lookback window in months (default 12, max 60)
    #[serde(default)]
    pub months: Option<u32>,
}

/// Query parameters for market trends
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct MarketTrendsParams {
    /// Region rollup key, e.g. "austin_tx"
    pub region: String,
    /// Series to return: median_price, days_on_market, closed_sales, new_listings
    #[serde(default)]
    pub metric: Option<String>,
    /// Lookback window in months (default 12, max 60)
    #[serde(default)]
    pub months: Option<u32>,
}

/// Aggregated market picture over the lookback window
#[derive(Debug, Serialize, ToSchema)]
pub struct MarketSummaryResponse {
    pub region: String,
    pub months: u32,
    pub median_sale_price: f64,
    pub avg_days_on_market: f64,
    pub closed_sales: i64,
    pub new_listings: i64,
}

/// One month of a trend series
#[derive(Debug, PartialEq, Serialize, ToSchema)]
pub struct TrendPoint {
    /// Month label, "YYYY-MM"
    pub month: String,
    pub value: f64,
}

/// Monthly trend series for one metric
#[derive(Debug, Serialize, ToSchema)]
pub struct MarketTrendsResponse {
    pub region: String,
    pub metric: TrendMetric,
    pub months: u32,
    pub points: Vec<TrendPoint>,
}

fn validate_region(region: &str) -> Result<String, AppError> {
    let trimmed = region.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation {
            message: "region must not be empty".to_string(),
            field: Some("region".to_string()),
            received: Some(Value::String(region.to_string())),
            docs_hint: None,
        });
    }
    Ok(trimmed.to_string())
}

fn clamp_months(months: Option<u32>) -> u32 {
    months.unwrap_or(DEFAULT_MONTHS).clamp(1, MAX_MONTHS)
}

/// Warehouse cells arrive stringly-typed ("482500.0"); coerce through the
/// same total helpers the normalizer uses.
fn row_number(row: &Map<String, Value>, key: &str) -> f64 {
    row.get(key).map(clean_number).unwrap_or(0.0)
}

fn summary_from_rows(
    region: String,
    months: u32,
    rows: &[Map<String, Value>],
) -> MarketSummaryResponse {
    // Aggregate query yields exactly one row; an empty region yields none.
    let row = rows.first();
    let number = |key: &str| row.map(|r| row_number(r, key)).unwrap_or(0.0);
    MarketSummaryResponse {
        region,
        months,
        median_sale_price: number("median_sale_price"),
        avg_days_on_market: number("avg_days_on_market"),
        closed_sales: number("closed_sales") as i64,
        new_listings: number("new_listings") as i64,
    }
}

fn trend_points(rows: &[Map<String, Value>]) -> Vec<TrendPoint> {
    rows.iter()
        .map(|row| TrendPoint {
            month: row.get("month").map(clean_string).unwrap_or_default(),
            value: row_number(row, "value"),
        })
        .collect()
}

/// Market summary for a region.
///
/// Aggregates the warehouse monthly rollup over the lookback window: average
/// median sale price, average days on market, total closed sales and new
/// listings. A region with no rollup rows returns zeros, not 404 — absence of
/// data is a valid market picture.
#[utoipa::path(
    get,
    path = "/v1/market/summary",
    params(MarketSummaryParams),
    responses(
        (status = 200, description = "Aggregated market summary", body = MarketSummaryResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Warehouse unavailable", body = ApiError),
        (status = 504, description = "Warehouse timed out", body = ApiError)
    ),
    tag = "market"
)]
pub async fn market_summary(
    State(state): State<AppState>,
    Query(params): Query<MarketSummaryParams>,
) -> Result<Json<MarketSummaryResponse>, AppError> {
    let region = validate_region(&params.region)?;
    let months = clamp_months(params.months);

    let query_params = [
        QueryParameter::string("region", region.clone()),
        QueryParameter::int64("months", months as i64),
    ];
    let rows = state.warehouse.query(SUMMARY_SQL, &query_params).await?;

    Ok(Json(summary_from_rows(region, months, &rows)))
}

/// Monthly trend series for a region.
///
/// Returns one point per month, oldest first, for the requested metric
/// (default median_price).
#[utoipa::path(
    get,
    path = "/v1/market/trends",
    params(MarketTrendsParams),
    responses(
        (status = 200, description = "Monthly trend series", body = MarketTrendsResponse),
        (status = 400, description = "Validation error", body = ApiError),
        (status = 502, description = "Warehouse unavailable", body = ApiError),
        (status = 504, description = "Warehouse timed out", body = ApiError)
    ),
    tag = "market"
)]
pub async fn market_trends(
    State(state): State<AppState>,
    Query(params): Query<MarketTrendsParams>,
) -> Result<Json<MarketTrendsResponse>, AppError> {
    let region = validate_region(&params.region)?;
    let months = clamp_months(params.months);
    let metric = match &params.metric {
        None => TrendMetric::MedianPrice,
        Some(raw) => TrendMetric::parse(raw).ok_or_else(|| AppError::Validation {
            message: "metric must be one of median_price, days_on_market, closed_sales, new_listings"
                .to_string(),
            field: Some("metric".to_string()),
            received: Some(Value::String(raw.clone())),
            docs_hint: None,
        })?,
    };

    let query_params = [
        QueryParameter::string("region", region.clone()),
        QueryParameter::int64("months", months as i64),
    ];
    let rows = state
        .warehouse
        .query(&trends_sql(metric), &query_params)
        .await?;

    Ok(Json(MarketTrendsResponse {
        region,
        metric,
        months,
        points: trend_points(&rows),
    }))
}
