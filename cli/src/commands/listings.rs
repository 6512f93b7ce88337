use clap::Subcommand;
use hearth_core::listings::ListingStatus;

use crate::util::{api_request, exit_error};

#[derive(Subcommand)]
pub enum ListingsCommands {
    /// Page through listings, newest first
    List {
        /// Filter by city (case-insensitive)
        #[arg(long)]
        city: Option<String>,
        /// Filter by status: active, pending, sold
        #[arg(long)]
        status: Option<String>,
        /// Minimum price in whole dollars
        #[arg(long)]
        min_price: Option<i64>,
        /// Maximum price in whole dollars
        #[arg(long)]
        max_price: Option<i64>,
        /// Page size (1-200)
        #[arg(long)]
        limit: Option<u32>,
        /// Opaque cursor from a previous page
        #[arg(long)]
        cursor: Option<String>,
    },
    /// Fetch one listing by ID
    Get {
        /// Listing UUID
        listing_id: String,
    },
}

pub async fn run(api_url: &str, command: ListingsCommands) -> i32 {
    match command {
        ListingsCommands::List {
            city,
            status,
            min_price,
            max_price,
            limit,
            cursor,
        } => list(api_url, city, status, min_price, max_price, limit, cursor).await,
        ListingsCommands::Get { listing_id } => get(api_url, &listing_id).await,
    }
}

async fn list(
    api_url: &str,
    city: Option<String>,
    status: Option<String>,
    min_price: Option<i64>,
    max_price: Option<i64>,
    limit: Option<u32>,
    cursor: Option<String>,
) -> i32 {
    let mut query = Vec::new();
    if let Some(v) = city {
        query.push(("city".to_string(), v));
    }
    if let Some(v) = status {
        if ListingStatus::parse(&v).is_none() {
            exit_error(
                &format!("Unknown listing status: '{v}'"),
                Some("Valid statuses: active, pending, sold"),
            );
        }
        query.push(("status".to_string(), v));
    }
    if let Some(v) = min_price {
        query.push(("min_price".to_string(), v.to_string()));
    }
    if let Some(v) = max_price {
        query.push(("max_price".to_string(), v.to_string()));
    }
    if let Some(v) = limit {
        query.push(("limit".to_string(), v.to_string()));
    }
    if let Some(v) = cursor {
        query.push(("cursor".to_string(), v));
    }

    api_request(api_url, reqwest::Method::GET, "/v1/listings", None, &query).await
}

async fn get(api_url: &str, listing_id: &str) -> i32 {
    let path = format!("/v1/listings/{listing_id}");
    api_request(api_url, reqwest::Method::GET, &path, None, &[]).await
}
