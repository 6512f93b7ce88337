pub mod agent;
pub mod health;
pub mod listings;
pub mod market;
pub mod risk;
pub mod sentiment;
