use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::net::error;
use crate::routing::handle::{self, Gate};
use crate::sec::authn::totp::Totp;
use crate::state::ArcShared;

pub mod password;
pub mod totp;

pub async fn get(
    State(state): State<ArcShared>,
    headers: HeaderMap,
) -> error::Result<Response> {
    let conn = state.pool().get().await?;

    let initiator = match handle::gate(state.sec(), &conn, &headers).await? {
        Gate::Granted(initiator) => initiator,
        Gate::Denied(redirect) => {
            return Ok(redirect.into_response());
        }
    };

    let totp_enabled = Totp::retrieve(&conn, initiator.user.id()).await?.is_some();

    handle::render_page(&state, "account", &serde_json::json!({
        "username": initiator.user.username(),
        "totp_enabled": totp_enabled
    }))
}
