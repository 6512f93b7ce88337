use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Default page size for listing queries.
pub const DEFAULT_PAGE_SIZE: i64 = 50;
/// Hard ceiling on page size; larger requests are clamped, not rejected.
pub const MAX_PAGE_SIZE: i64 = 200;

/// Lifecycle state of a listing. Stored as lowercase text and guarded by a
/// CHECK constraint, so every row parses back into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Active,
    Pending,
    Sold,
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Pending => "pending",
            ListingStatus::Sold => "sold",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "active" => Some(ListingStatus::Active),
            "pending" => Some(ListingStatus::Pending),
            "sold" => Some(ListingStatus::Sold),
            _ => None,
        }
    }
}

/// A property listing as served to dashboard clients. Rows are written by the
/// MLS ingest pipeline; the API only reads them.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Listing {
    /// Unique listing ID (UUIDv7 — time-sortable)
    pub id: Uuid,
    /// Identifier in the source MLS feed
    pub mls_id: String,
    pub street_address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    /// Asking price in whole dollars
    pub price: i64,
    pub beds: i32,
    /// Half baths count as 0.5
    pub baths: f64,
    pub sqft: i32,
    pub status: ListingStatus,
    /// When the listing went on market (from the feed, not ingest time)
    pub listed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Cursor-based pagination
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T: Serialize> {
    pub data: Vec<T>,
    /// Cursor for the next page. None if this is the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
    /// Whether there are more results after this page
    pub has_more: bool,
}
