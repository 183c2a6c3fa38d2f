use axum::Form;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::net::error::{self, AuthKind};
use crate::routing::handle::{self, Gate};
use crate::sec::authn::password;
use crate::state::ArcShared;
use crate::user;
use crate::validation;

fn register_page(state: &ArcShared, message: Option<&str>) -> error::Result<Response> {
    handle::render_page(state, "create-account", &serde_json::json!({
        "message": message
    }))
}

pub async fn get(
    State(state): State<ArcShared>,
    headers: HeaderMap,
) -> error::Result<Response> {
    let conn = state.pool().get().await?;

    match handle::gate(state.sec(), &conn, &headers).await? {
        Gate::Granted(_initiator) => Ok(Redirect::to("/characters").into_response()),
        Gate::Denied(_) => register_page(&state, None),
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    username: String,
    password: String,
    confirm_password: String,
}

pub async fn post(
    State(state): State<ArcShared>,
    headers: HeaderMap,
    Form(form): Form<RegisterForm>,
) -> error::Result<Response> {
    let mut conn = state.pool().get().await?;

    if let Gate::Granted(_initiator) = handle::gate(state.sec(), &conn, &headers).await? {
        return Ok(Redirect::to("/characters").into_response());
    }

    if !validation::username_valid(&form.username) {
        return register_page(&state, Some(validation::USERNAME_REQUIREMENTS));
    }

    if form.password != form.confirm_password {
        return register_page(&state, Some(AuthKind::ConfirmationMismatch.message()));
    }

    if !validation::password_valid(&form.password) {
        return register_page(&state, Some(validation::PASSWORD_REQUIREMENTS));
    }

    let transaction = conn.transaction().await?;

    let Some(user) = user::User::create(&transaction, form.username).await? else {
        return register_page(&state, Some(AuthKind::UsernameTaken.message()));
    };

    password::Password::create(
        &transaction,
        user.id(),
        &form.password,
        state.sec().pepper()
    ).await?;

    transaction.commit().await?;

    Ok(Redirect::to("/login").into_response())
}
