use sqlx::PgPool;

use crate::config::AppConfig;
use crate::upstream::UpstreamClient;
use crate::warehouse::WarehouseClient;

/// Shared request context. Every member is cheap to clone: the pool and the
/// HTTP clients are handles around internally shared connections.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub agents: UpstreamClient,
    pub sentiment: UpstreamClient,
    pub risk: UpstreamClient,
    pub warehouse: WarehouseClient,
}

impl AppState {
    pub fn new(db: PgPool, config: &AppConfig) -> Self {
        Self {
            db,
            agents: UpstreamClient::new("agents service", &config.agents),
            sentiment: UpstreamClient::new("sentiment service", &config.sentiment),
            risk: UpstreamClient::new("risk service", &config.risk),
            warehouse: WarehouseClient::new(&config.warehouse),
        }
    }
}
