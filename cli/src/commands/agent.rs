use clap::Subcommand;
use serde_json::json;

use crate::util::api_request;

#[derive(Subcommand)]
pub enum AgentCommands {
    /// Fetch one agent's normalized record
    Get {
        /// Numeric agent ID
        agent_id: String,
    },
    /// Search agents by city, specialty, or free text
    Search {
        /// Filter by city served
        #[arg(long)]
        city: Option<String>,
        /// Filter by specialty (e.g. "luxury", "first_time_buyers")
        #[arg(long)]
        specialty: Option<String>,
        /// Free-text query over agent names and agencies
        #[arg(long)]
        q: Option<String>,
        /// Maximum number of results (1-50)
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Rank agents for a client brief
    Recommend {
        /// City the client is buying or selling in
        #[arg(long)]
        city: String,
        /// Property type (e.g. "condo", "single_family")
        #[arg(long)]
        property_type: Option<String>,
        /// Budget in whole dollars
        #[arg(long)]
        budget: Option<i64>,
        /// Hard requirement (repeatable), e.g. --must-have bilingual
        #[arg(long = "must-have")]
        must_haves: Vec<String>,
        /// Number of recommendations to return (1-20)
        #[arg(long)]
        top_k: Option<u32>,
    },
}

pub async fn run(api_url: &str, command: AgentCommands) -> i32 {
    match command {
        AgentCommands::Get { agent_id } => get(api_url, &agent_id).await,
        AgentCommands::Search {
            city,
            specialty,
            q,
            limit,
        } => search(api_url, city, specialty, q, limit).await,
        AgentCommands::Recommend {
            city,
            property_type,
            budget,
            must_haves,
            top_k,
        } => recommend(api_url, city, property_type, budget, must_haves, top_k).await,
    }
}

async fn get(api_url: &str, agent_id: &str) -> i32 {
    let path = format!("/v1/agents/{agent_id}");
    api_request(api_url, reqwest::Method::GET, &path, None, &[]).await
}

async fn search(
    api_url: &str,
    city: Option<String>,
    specialty: Option<String>,
    q: Option<String>,
    limit: Option<u32>,
) -> i32 {
    let mut query = Vec::new();
    if let Some(v) = city {
        query.push(("city".to_string(), v));
    }
    if let Some(v) = specialty {
        query.push(("specialty".to_string(), v));
    }
    if let Some(v) = q {
        query.push(("q".to_string(), v));
    }
    if let Some(v) = limit {
        query.push(("limit".to_string(), v.to_string()));
    }

    api_request(
        api_url,
        reqwest::Method::GET,
        "/v1/agents/search",
        None,
        &query,
    )
    .await
}

async fn recommend(
    api_url: &str,
    city: String,
    property_type: Option<String>,
    budget: Option<i64>,
    must_haves: Vec<String>,
    top_k: Option<u32>,
) -> i32 {
    let mut body = json!({ "city": city });
    if let Some(v) = property_type {
        body["property_type"] = json!(v);
    }
    if let Some(v) = budget {
        body["budget"] = json!(v);
    }
    if !must_haves.is_empty() {
        body["must_haves"] = json!(must_haves);
    }
    if let Some(v) = top_k {
        body["top_k"] = json!(v);
    }

    api_request(
        api_url,
        reqwest::Method::POST,
        "/v1/agents/recommend",
        Some(body),
        &[],
    )
    .await
}
