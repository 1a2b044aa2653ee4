pub mod client;
mod dto;
#[cfg(test)]
pub mod fake;
pub mod handlers;
pub mod plans;
pub mod provider;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::billing_routes()
}
