use clap::Subcommand;

use crate::util::api_request;

#[derive(Subcommand)]
pub enum MarketCommands {
    /// Aggregate market statistics for a region
    Summary {
        /// Region to summarize (e.g. "austin-tx")
        #[arg(long)]
        region: String,
        /// Lookback window in months (1-60)
        #[arg(long)]
        months: Option<u32>,
    },
    /// Month-by-month series for one metric
    Trends {
        /// Region to chart (e.g. "austin-tx")
        #[arg(long)]
        region: String,
        /// Metric: median_price, days_on_market, closed_sales, new_listings
        #[arg(long)]
        metric: String,
        /// Lookback window in months (1-60)
        #[arg(long)]
        months: Option<u32>,
    },
}

pub async fn run(api_url: &str, command: MarketCommands) -> i32 {
    match command {
        MarketCommands::Summary { region, months } => summary(api_url, region, months).await,
        MarketCommands::Trends {
            region,
            metric,
            months,
        } => trends(api_url, region, metric, months).await,
    }
}

async fn summary(api_url: &str, region: String, months: Option<u32>) -> i32 {
    let mut query = vec![("region".to_string(), region)];
    if let Some(v) = months {
        query.push(("months".to_string(), v.to_string()));
    }

    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/market/summary",
        None,
        &query,
    )
    .await
}

async fn trends(api_url: &str, region: String, metric: String, months: Option<u32>) -> i32 {
    let mut query = vec![("region".to_string(), region), ("metric".to_string(), metric)];
    if let Some(v) = months {
        query.push(("months".to_string(), v.to_string()));
    }

    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/market/trends",
        None,
        &query,
    )
    .await
}
