//! Reusable middleware layers.

pub mod compression;
pub mod cors;
pub mod decompression;
pub mod request_id;
pub mod timeout;
pub mod trace;

pub use compression::{CompressionLayer, CompressionLevel, DefaultPredicate, Predicate};
pub use cors::CorsLayer;
pub use decompression::DecompressionLayer;
pub use request_id::SetRequestIdLayer;
pub use timeout::TimeoutLayer;
pub use trace::TraceLayer;
