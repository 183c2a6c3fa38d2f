use axum::Form;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::net::error::{self, AuthKind};
use crate::routing::handle::{self, Gate};
use crate::sec::authn::{password, session, totp};
use crate::state::ArcShared;
use crate::user;
use crate::validation;

fn login_page(state: &ArcShared, message: Option<&str>) -> error::Result<Response> {
    handle::render_page(state, "login", &serde_json::json!({
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
        Gate::Denied(_) => login_page(&state, None),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    username: String,
    password: String,
}

#[derive(Debug, PartialEq, Eq)]
enum LoginOutcome {
    Denied(AuthKind),
    Verify,
    Granted,
}

/// maps a login attempt to where it lands. `password_ok` is None when no
/// account matched the username, which wins over everything else
fn login_outcome(password_ok: Option<bool>, has_totp: bool) -> LoginOutcome {
    match password_ok {
        None => LoginOutcome::Denied(AuthKind::UnknownUser),
        Some(false) => LoginOutcome::Denied(AuthKind::WrongPassword),
        Some(true) if has_totp => LoginOutcome::Verify,
        Some(true) => LoginOutcome::Granted,
    }
}

pub async fn post(
    State(state): State<ArcShared>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> error::Result<Response> {
    let mut conn = state.pool().get().await?;

    if let Gate::Granted(_initiator) = handle::gate(state.sec(), &conn, &headers).await? {
        return Ok(Redirect::to("/characters").into_response());
    }

    if !validation::username_valid(&form.username) {
        return login_page(&state, Some(AuthKind::UnknownUser.message()));
    }

    if !validation::password_valid(&form.password) {
        return login_page(&state, Some(AuthKind::WrongPassword.message()));
    }

    let transaction = conn.transaction().await?;

    let found = user::User::query_with_username(&transaction, &form.username).await?;

    let mut password_ok = None;
    let mut has_totp = false;

    if let Some(user) = &found {
        let Some(user_password) = password::Password::retrieve(&transaction, user.id()).await? else {
            return Err(error::Error::new()
                .source("user exists but has no password record"));
        };

        let ok = user_password.verify(&form.password, state.sec().pepper());

        if ok {
            has_totp = totp::Totp::retrieve(&transaction, user.id()).await?.is_some();
        }

        password_ok = Some(ok);
    }

    let needs_verify = match login_outcome(password_ok, has_totp) {
        LoginOutcome::Denied(kind) => {
            return login_page(&state, Some(kind.message()));
        },
        LoginOutcome::Verify => true,
        LoginOutcome::Granted => false,
    };

    let Some(user) = found else {
        return Err(error::Error::new()
            .source("login granted without a matching user"));
    };

    let mut builder = session::Session::builder(*user.id());
    builder.authenticated(true);
    builder.verified(!needs_verify);

    let user_session = builder.build(&transaction).await?;

    transaction.commit().await?;

    let cookie = session::create_session_cookie(state.sec(), &user_session);

    if needs_verify {
        Ok((cookie, Redirect::to("/login/verify")).into_response())
    } else {
        Ok((cookie, Redirect::to("/characters")).into_response())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unknown_user_wins() {
        // an unmatched username denies no matter what the other inputs say
        assert_eq!(
            login_outcome(None, false),
            LoginOutcome::Denied(AuthKind::UnknownUser)
        );
        assert_eq!(
            login_outcome(None, true),
            LoginOutcome::Denied(AuthKind::UnknownUser)
        );
    }

    #[test]
    fn wrong_password_denies() {
        assert_eq!(
            login_outcome(Some(false), false),
            LoginOutcome::Denied(AuthKind::WrongPassword)
        );
        assert_eq!(
            login_outcome(Some(false), true),
            LoginOutcome::Denied(AuthKind::WrongPassword)
        );
    }

    #[test]
    fn valid_password_lands_by_enrollment() {
        assert_eq!(login_outcome(Some(true), true), LoginOutcome::Verify);
        assert_eq!(login_outcome(Some(true), false), LoginOutcome::Granted);
    }
}
