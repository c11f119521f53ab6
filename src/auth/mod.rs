use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod repo;
pub mod repo_types;
pub(crate) mod services;

pub use claims::Claims;
pub use jwt::{AuthUser, JwtKeys};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes())
}
