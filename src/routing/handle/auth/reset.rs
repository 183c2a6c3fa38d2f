use axum::Form;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::net::error::{self, AuthKind};
use crate::routing::handle;
use crate::sec::authn::{password, totp};
use crate::state::ArcShared;
use crate::user;
use crate::validation;

fn reset_page(state: &ArcShared, message: Option<&str>) -> error::Result<Response> {
    handle::render_page(state, "reset-password", &serde_json::json!({
        "message": message
    }))
}

pub async fn get(
    State(state): State<ArcShared>,
) -> error::Result<Response> {
    reset_page(&state, None)
}

#[derive(Debug, Deserialize)]
pub struct ResetForm {
    username: String,
    code: String,
    password: String,
    confirm_password: String,
}

/// the ordered checks for a reset attempt. `code_ok` is None when the
/// account has no enrolled authenticator to check a code against. the
/// stored hash is only touched when every check passes
fn check_reset(
    user_found: bool,
    code_ok: Option<bool>,
    new: &str,
    confirm: &str,
) -> Option<AuthKind> {
    if !user_found {
        return Some(AuthKind::UnknownUser);
    }

    match code_ok {
        None => return Some(AuthKind::NoTotpEnrolled),
        Some(false) => return Some(AuthKind::InvalidCode),
        Some(true) => {}
    }

    if new != confirm {
        return Some(AuthKind::ConfirmationMismatch);
    }

    None
}

/// a self service password reset for users who lost their password but
/// still have their authenticator app. only available with an enrolled
/// second factor, there is nothing else to anchor the reset to
pub async fn post(
    State(state): State<ArcShared>,
    Form(form): Form<ResetForm>,
) -> error::Result<Response> {
    let mut conn = state.pool().get().await?;

    if !validation::username_valid(&form.username) {
        return reset_page(&state, Some(AuthKind::UnknownUser.message()));
    }

    let transaction = conn.transaction().await?;

    let found = user::User::query_with_username(&transaction, &form.username).await?;

    let mut code_ok = None;

    if let Some(user) = &found {
        if let Some(user_totp) = totp::Totp::retrieve(&transaction, user.id()).await? {
            code_ok = Some(
                validation::totp_code_valid(&form.code)
                    && user_totp.verify(&form.code)?
            );
        }
    }

    if let Some(kind) = check_reset(
        found.is_some(),
        code_ok,
        &form.password,
        &form.confirm_password
    ) {
        return reset_page(&state, Some(kind.message()));
    }

    if !validation::password_valid(&form.password) {
        return reset_page(&state, Some(validation::PASSWORD_REQUIREMENTS));
    }

    let Some(user) = found else {
        return Err(error::Error::new()
            .source("reset allowed without a matching user"));
    };

    let Some(mut user_password) = password::Password::retrieve(&transaction, user.id()).await? else {
        return Err(error::Error::new()
            .source("user exists but has no password record"));
    };

    user_password.update(&transaction, &form.password, state.sec().pepper()).await?;

    // any session opened with the old password is no longer trusted
    transaction.execute(
        "update auth_session set dropped = true where user_id = $1",
        &[user.id()]
    ).await?;

    transaction.commit().await?;

    Ok(Redirect::to("/login").into_response())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn unenrolled_user_always_fails() {
        // even a perfectly filled in form fails when no authenticator is
        // enrolled, so the stored hash stays untouched
        assert_eq!(
            check_reset(true, None, "new pass", "new pass"),
            Some(AuthKind::NoTotpEnrolled)
        );
    }

    #[test]
    fn check_ordering() {
        assert_eq!(
            check_reset(false, None, "new pass", "new pass"),
            Some(AuthKind::UnknownUser)
        );
        assert_eq!(
            check_reset(true, Some(false), "new pass", "new pass"),
            Some(AuthKind::InvalidCode)
        );
        assert_eq!(
            check_reset(true, Some(true), "new pass", "other pass"),
            Some(AuthKind::ConfirmationMismatch)
        );
        assert_eq!(
            check_reset(true, Some(true), "new pass", "new pass"),
            None
        );
    }
}
