//! Services backing the concierge endpoints and offline jobs

pub mod chart;
pub mod embeddings;
pub mod generation;
pub mod indexer;
pub mod query;
pub mod vector_index;
