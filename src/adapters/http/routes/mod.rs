pub mod admin;
pub mod billing;
pub mod user;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/billing", billing::router())
        .nest("/user", user::router())
        .nest("/admin", admin::router())
}
