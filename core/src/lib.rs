pub mod error;
pub mod listings;
pub mod normalize;
