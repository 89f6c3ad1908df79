//! System routes every node exposes regardless of its feature set.

mod health;
mod router;

pub use health::HealthResponse;
pub use router::system_router;
