use super::health;
use axum::Router;
use axum::routing::get;

/// Routes shared by every node (`/health`), generic over the caller's state.
pub fn system_router<S>() -> Router<S>
where
    S: Send + Sync + Clone + 'static,
{
    health::mark_started();
    Router::new().route("/health", get(health::health_handler))
}
