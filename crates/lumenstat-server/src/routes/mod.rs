pub mod granularities;
pub mod health;
pub mod plan;
pub mod query;
