use axum::Form;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::net::error::{self, AuthKind};
use crate::routing::handle::{self, Gate};
use crate::sec::authn::password;
use crate::state::ArcShared;
use crate::validation;

fn change_page(state: &ArcShared, message: Option<&str>) -> error::Result<Response> {
    handle::render_page(state, "change-password", &serde_json::json!({
        "message": message
    }))
}

pub async fn get(
    State(state): State<ArcShared>,
    headers: HeaderMap,
) -> error::Result<Response> {
    let conn = state.pool().get().await?;

    match handle::gate(state.sec(), &conn, &headers).await? {
        Gate::Granted(_initiator) => change_page(&state, None),
        Gate::Denied(redirect) => Ok(redirect.into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordForm {
    old_password: String,
    new_password: String,
    confirm_password: String,
}

/// the checks on the submitted passwords that do not need the stored hash
fn check_new_password(old: &str, new: &str, confirm: &str) -> Option<AuthKind> {
    if new == old {
        return Some(AuthKind::SameAsOld);
    }

    if new != confirm {
        return Some(AuthKind::ConfirmationMismatch);
    }

    None
}

pub async fn post(
    State(state): State<ArcShared>,
    headers: HeaderMap,
    Form(form): Form<ChangePasswordForm>,
) -> error::Result<Response> {
    let mut conn = state.pool().get().await?;

    let transaction = conn.transaction().await?;

    let initiator = match handle::gate(state.sec(), &transaction, &headers).await? {
        Gate::Granted(initiator) => initiator,
        Gate::Denied(redirect) => {
            return Ok(redirect.into_response());
        }
    };

    let Some(mut user_password) = password::Password::retrieve(
        &transaction,
        initiator.user.id()
    ).await? else {
        return Err(error::Error::new()
            .source("user exists but has no password record"));
    };

    if !user_password.verify(&form.old_password, state.sec().pepper()) {
        return change_page(&state, Some(AuthKind::WrongOldPassword.message()));
    }

    if let Some(kind) = check_new_password(
        &form.old_password,
        &form.new_password,
        &form.confirm_password
    ) {
        return change_page(&state, Some(kind.message()));
    }

    if !validation::password_valid(&form.new_password) {
        return change_page(&state, Some(validation::PASSWORD_REQUIREMENTS));
    }

    user_password.update(&transaction, &form.new_password, state.sec().pepper()).await?;

    transaction.commit().await?;

    Ok(axum::response::Redirect::to("/account").into_response())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn new_password_checks() {
        assert_eq!(
            check_new_password("old pass", "old pass", "old pass"),
            Some(AuthKind::SameAsOld)
        );
        assert_eq!(
            check_new_password("old pass", "new pass", "other pass"),
            Some(AuthKind::ConfirmationMismatch)
        );
        assert_eq!(
            check_new_password("old pass", "new pass", "new pass"),
            None
        );
    }

    #[test]
    fn same_as_old_takes_precedence() {
        // old and new match but the confirmation does not
        assert_eq!(
            check_new_password("old pass", "old pass", "other pass"),
            Some(AuthKind::SameAsOld)
        );
    }
}
