use axum::Router;

pub mod credit;
pub mod system;

/// Router for all credit endpoints.
pub fn router() -> Router {
    Router::new().nest("/customers", credit::router())
}
