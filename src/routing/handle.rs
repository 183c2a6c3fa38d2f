use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use deadpool_postgres::GenericClient;
use serde::Serialize;

use crate::net::{error, html};
use crate::sec::state::Sec;
use crate::sec::authn::initiator::{self, Initiator, LookupError};
use crate::state::ArcShared;

pub mod account;
pub mod auth;
pub mod characters;
pub mod register;

pub fn render_page<T>(state: &ArcShared, name: &str, data: &T) -> error::Result<Response>
where
    T: Serialize
{
    let body = state.templates().render(name, data)?;

    Ok(html::html_response(body)?.into_response())
}

/// the outcome of checking a request for a usable session
pub enum Gate {
    Granted(Initiator),
    Denied(Redirect),
}

/// resolves the request to a fully authenticated user or to the login page
/// the browser should be sent to instead
pub async fn gate(
    sec: &Sec,
    conn: &impl GenericClient,
    headers: &HeaderMap,
) -> error::Result<Gate> {
    match initiator::lookup_header_map(sec, conn, headers).await {
        Ok(init) => Ok(Gate::Granted(init)),
        Err(LookupError::SessionUnverified(_)) => Ok(Gate::Denied(Redirect::to("/login/verify"))),
        Err(LookupError::MechanismNotFound) |
        Err(LookupError::SessionNotFound) |
        Err(LookupError::SessionExpired(_)) |
        Err(LookupError::SessionUnauthenticated(_)) |
        Err(LookupError::UserNotFound(_)) |
        Err(LookupError::SessionDecode(_)) => Ok(Gate::Denied(Redirect::to("/login"))),
        Err(err) => Err(err.into()),
    }
}

pub async fn get(
    State(state): State<ArcShared>,
    headers: HeaderMap,
) -> error::Result<Response> {
    let conn = state.pool().get().await?;

    match gate(state.sec(), &conn, &headers).await? {
        Gate::Granted(_initiator) => Ok(Redirect::to("/characters").into_response()),
        Gate::Denied(_) => render_page(&state, "index", &serde_json::json!({})),
    }
}
