pub mod agents;
pub mod health;
pub mod listings;
pub mod market;
pub mod recommendations;
pub mod risk;
pub mod sentiment;
