use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use hearth_core::error::ApiError;
use hearth_core::listings::{
    DEFAULT_PAGE_SIZE, Listing, ListingStatus, MAX_PAGE_SIZE, PaginatedResponse,
};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/listings", get(list_listings))
        .route("/v1/listings/{listing_id}", get(get_listing))
}

/// Query parameters for listing search
#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListListingsParams {
    /// Filter by city (case-insensitive exact match)
    #[serde(default)]
    pub city: Option<String>,
    /// Filter by status (active, pending, sold)
    #[serde(default)]
    pub status: Option<String>,
    /// Minimum asking price in whole dollars (inclusive)
    #[serde(default)]
    pub min_price: Option<i64>,
    /// Maximum asking price in whole dollars (inclusive)
    #[serde(default)]
    pub max_price: Option<i64>,
    /// Maximum number of listings to return (default 50, max 200)
    #[serde(default)]
    pub limit: Option<i64>,
    /// Cursor for pagination (opaque string from previous response's next_cursor)
    #[serde(default)]
    pub cursor: Option<String>,
}

/// Validated filter set bound into the SQL below.
struct ListingFilters {
    city: Option<String>,
    status: Option<ListingStatus>,
    min_price: Option<i64>,
    max_price: Option<i64>,
    limit: i64,
}

fn validate_filters(params: &ListListingsParams) -> Result<ListingFilters, AppError> {
    let status = match &params.status {
        None => None,
        Some(raw) => Some(ListingStatus::parse(raw).ok_or_else(|| AppError::Validation {
            message: "status must be one of active, pending, sold".to_string(),
            field: Some("status".to_string()),
            received: Some(serde_json::Value::String(raw.clone())),
            docs_hint: None,
        })?),
    };

    for (name, price) in [("min_price", params.min_price), ("max_price", params.max_price)] {
        if let Some(price) = price {
            if price < 0 {
                return Err(AppError::Validation {
                    message: format!("{name} must not be negative"),
                    field: Some(name.to_string()),
                    received: Some(serde_json::json!(price)),
                    docs_hint: None,
                });
            }
        }
    }

    if let (Some(min), Some(max)) = (params.min_price, params.max_price) {
        if min > max {
            return Err(AppError::Validation {
                message: format!("min_price {min} is greater than max_price {max}"),
                field: Some("min_price".to_string()),
                received: Some(serde_json::json!({ "min_price": min, "max_price": max })),
                docs_hint: None,
            });
        }
    }

    let city = params
        .city
        .as_deref()
        .map(str::trim)
        .filter(|city| !city.is_empty())
        .map(String::from);

    Ok(ListingFilters {
        city,
        status,
        min_price: params.min_price,
        max_price: params.max_price,
        limit: params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
    })
}

/// List property listings with cursor-based pagination
///
/// Returns listings ordered by listed_at descending (newest first).
/// Filters combine with AND; use cursor-based pagination for stable
/// iteration while the ingest pipeline keeps writing.
#[utoipa::path(
    get,
    path = "/v1/listings",
    params(ListListingsParams),
    responses(
        (status = 200, description = "Paginated list of listings", body = PaginatedResponse<Listing>),
        (status = 400, description = "Validation error", body = ApiError)
    ),
    tag = "listings"
)]
pub async fn list_listings(
    State(state): State<AppState>,
    Query(params): Query<ListListingsParams>,
) -> Result<Json<PaginatedResponse<Listing>>, AppError> {
    let filters = validate_filters(&params)?;
    // Fetch one extra to determine has_more
    let fetch_limit = filters.limit + 1;

    let cursor_data = if let Some(ref cursor_str) = params.cursor {
        Some(decode_cursor(cursor_str)?)
    } else {
        None
    };

    let status = filters.status.map(|s| s.as_str());

    // Ordered by (listed_at DESC, id DESC) for stable cursor pagination
    let rows = if let Some(ref cursor) = cursor_data {
        sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT id, mls_id, street_address, city, state, zip, price, beds, baths, sqft,
                   status, listed_at, created_at
            FROM listings
            WHERE ($1::text IS NULL OR lower(city) = lower($1))
              AND ($2::text IS NULL OR status = $2)
              AND ($3::bigint IS NULL OR price >= $3)
              AND ($4::bigint IS NULL OR price <= $4)
              AND (listed_at, id) < ($5, $6)
            ORDER BY listed_at DESC, id DESC
            LIMIT $7
            "#,
        )
        .bind(&filters.city)
        .bind(status)
        .bind(filters.min_price)
        .bind(filters.max_price)
        .bind(cursor.listed_at)
        .bind(cursor.id)
        .bind(fetch_limit)
        .fetch_all(&state.db)
        .await?
    } else {
        sqlx::query_as::<_, ListingRow>(
            r#"
            SELECT id, mls_id, street_address, city, state, zip, price, beds, baths, sqft,
                   status, listed_at, created_at
            FROM listings
            WHERE ($1::text IS NULL OR lower(city) = lower($1))
              AND ($2::text IS NULL OR status = $2)
              AND ($3::bigint IS NULL OR price >= $3)
              AND ($4::bigint IS NULL OR price <= $4)
            ORDER BY listed_at DESC, id DESC
            LIMIT $5
            "#,
        )
        .bind(&filters.city)
        .bind(status)
        .bind(filters.min_price)
        .bind(filters.max_price)
        .bind(fetch_limit)
        .fetch_all(&state.db)
        .await?
    };

    let has_more = rows.len() as i64 > filters.limit;
    let listings: Vec<Listing> = rows
        .into_iter()
        .take(filters.limit as usize)
        .map(|row| row.into_listing())
        .collect();

    let next_cursor = if has_more {
        listings
            .last()
            .map(|listing| encode_cursor(&listing.listed_at, &listing.id))
    } else {
        None
    };

    Ok(Json(PaginatedResponse {
        data: listings,
        next_cursor,
        has_more,
    }))
}

/// Fetch a single listing by ID
#[utoipa::path(
    get,
    path = "/v1/listings/{listing_id}",
    params(
        ("listing_id" = Uuid, Path, description = "Listing ID")
    ),
    responses(
        (status = 200, description = "The listing", body = Listing),
        (status = 404, description = "Listing not found", body = ApiError)
    ),
    tag = "listings"
)]
pub async fn get_listing(
    State(state): State<AppState>,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<Listing>, AppError> {
    let row = sqlx::query_as::<_, ListingRow>(
        r#"
        SELECT id, mls_id, street_address, city, state, zip, price, beds, baths, sqft,
               status, listed_at, created_at
        FROM listings
        WHERE id = $1
        "#,
    )
    .bind(listing_id)
    .fetch_optional(&state.db)
    .await?;

    match row {
        Some(row) => Ok(Json(row.into_listing())),
        None => Err(AppError::NotFound {
            resource: format!("listing {listing_id}"),
        }),
    }
}

/// Cursor is base64("listed_at\0id") — opaque to the client, stable for pagination
fn encode_cursor(listed_at: &DateTime<Utc>, id: &Uuid) -> String {
    use base64::Engine;
    let raw = format!("{}\0{}", listed_at.to_rfc3339(), id);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

struct CursorData {
    listed_at: DateTime<Utc>,
    id: Uuid,
}

fn decode_cursor(cursor: &str) -> Result<CursorData, AppError> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| AppError::Validation {
            message: "Invalid cursor format".to_string(),
            field: Some("cursor".to_string()),
            received: Some(serde_json::Value::String(cursor.to_string())),
            docs_hint: Some("Use the next_cursor value from a previous response".to_string()),
        })?;

    let s = String::from_utf8(bytes).map_err(|_| AppError::Validation {
        message: "Invalid cursor encoding".to_string(),
        field: Some("cursor".to_string()),
        received: None,
        docs_hint: None,
    })?;

    let parts: Vec<&str> = s.splitn(2, '\0').collect();
    if parts.len() != 2 {
        return Err(AppError::Validation {
            message: "Invalid cursor structure".to_string(),
            field: Some("cursor".to_string()),
            received: None,
            docs_hint: Some("Use the next_cursor value from a previous response".to_string()),
        });
    }

    let listed_at = DateTime::parse_from_rfc3339(parts[0])
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| AppError::Validation {
            message: "Invalid cursor timestamp".to_string(),
            field: Some("cursor".to_string()),
            received: None,
            docs_hint: None,
        })?;

    let id = Uuid::parse_str(parts[1]).map_err(|_| AppError::Validation {
        message: "Invalid cursor id".to_string(),
        field: Some("cursor".to_string()),
        received: None,
        docs_hint: None,
    })?;

    Ok(CursorData { listed_at, id })
}

/// Internal row type for sqlx mapping
#[derive(sqlx::FromRow)]
struct ListingRow {
    id: Uuid,
    mls_id: String,
    street_address: String,
    city: String,
    state: String,
    zip: String,
    price: i64,
    beds: i32,
    baths: f64,
    sqft: i32,
    status: String,
    listed_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl ListingRow {
    fn into_listing(self) -> Listing {
        Listing {
            id: self.id,
            mls_id: self.mls_id,
            street_address: self.street_address,
            city: self.city,
            state: self.state,
            zip: self.zip,
            price: self.price,
            beds: self.beds,
            baths: self.baths,
            sqft: self.sqft,
            // The schema CHECK-constrains status to known values.
            status: ListingStatus::parse(&self.status).unwrap_or(ListingStatus::Active),
            listed_at: self.listed_at,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ListListingsParams {
        ListListingsParams {
            city: None,
            status: None,
            min_price: None,
            max_price: None,
            limit: None,
            cursor: None,
        }
    }

    #[test]
    fn cursor_round_trips() {
        let listed_at = Utc::now();
        let id = Uuid::now_v7();
        let decoded = decode_cursor(&encode_cursor(&listed_at, &id)).unwrap();
        assert_eq!(decoded.listed_at, listed_at);
        assert_eq!(decoded.id, id);
    }

    #[test]
    fn garbage_cursors_are_rejected() {
        assert!(decode_cursor("not base64 at all!!!").is_err());
        // Valid base64, wrong structure.
        use base64::Engine;
        let encoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(b"no separator");
        assert!(decode_cursor(&encoded).is_err());
    }

    #[test]
    fn price_range_must_be_ordered() {
        let mut p = params();
        p.min_price = Some(900_000);
        p.max_price = Some(400_000);
        assert!(validate_filters(&p).is_err());

        p.max_price = Some(1_200_000);
        assert!(validate_filters(&p).is_ok());
    }

    #[test]
    fn negative_prices_are_rejected() {
        let mut p = params();
        p.min_price = Some(-1);
        assert!(validate_filters(&p).is_err());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut p = params();
        p.status = Some("withdrawn".to_string());
        assert!(validate_filters(&p).is_err());
        p.status = Some("Active".to_string());
        assert_eq!(
            validate_filters(&p).unwrap().status,
            Some(ListingStatus::Active)
        );
    }

    #[test]
    fn limit_clamps_to_page_bounds() {
        let mut p = params();
        assert_eq!(validate_filters(&p).unwrap().limit, DEFAULT_PAGE_SIZE);
        p.limit = Some(10_000);
        assert_eq!(validate_filters(&p).unwrap().limit, MAX_PAGE_SIZE);
        p.limit = Some(-5);
        assert_eq!(validate_filters(&p).unwrap().limit, 1);
    }

    #[test]
    fn blank_city_filter_is_ignored() {
        let mut p = params();
        p.city = Some("   ".to_string());
        assert_eq!(validate_filters(&p).unwrap().city, None);
        p.city = Some(" Austin ".to_string());
        assert_eq!(validate_filters(&p).unwrap().city.as_deref(), Some("Austin"));
    }
}
