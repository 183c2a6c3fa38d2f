use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};

use crate::character::Character;
use crate::net::error;
use crate::routing::handle::{self, Gate};
use crate::state::ArcShared;

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

    let characters = Character::retrieve_for_user(&conn, initiator.user.id()).await?;

    handle::render_page(&state, "characters", &serde_json::json!({
        "username": initiator.user.username(),
        "characters": characters
    }))
}
