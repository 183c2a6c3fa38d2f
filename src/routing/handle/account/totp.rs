use axum::Form;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::net::error::{self, AuthKind};
use crate::routing::handle::{self, Gate};
use crate::sec::authn::{password, totp};
use crate::state::ArcShared;
use crate::user::User;
use crate::validation;

fn enrolled_page(state: &ArcShared, message: Option<&str>) -> error::Result<Response> {
    handle::render_page(state, "totp", &serde_json::json!({
        "enrolled": true,
        "message": message
    }))
}

fn enrollment_page(
    state: &ArcShared,
    user: &User,
    secret: &str,
    message: Option<&str>,
) -> error::Result<Response> {
    let uri = totp::provisioning_uri(
        state.sec().totp_issuer(),
        user.username(),
        &totp::Algo::SHA1,
        secret,
        totp::DEFAULT_DIGITS,
        totp::DEFAULT_STEP,
    );

    handle::render_page(state, "totp", &serde_json::json!({
        "enrolled": false,
        "secret": secret,
        "provisioning_uri": uri.as_str(),
        "message": message
    }))
}

/// starts or resumes enrollment. the fresh secret lives on the session
/// until a submitted code proves the authenticator app has it
pub async fn get(
    State(state): State<ArcShared>,
    headers: HeaderMap,
) -> error::Result<Response> {
    let mut conn = state.pool().get().await?;

    let transaction = conn.transaction().await?;

    let mut initiator = match handle::gate(state.sec(), &transaction, &headers).await? {
        Gate::Granted(initiator) => initiator,
        Gate::Denied(redirect) => {
            return Ok(redirect.into_response());
        }
    };

    if totp::Totp::retrieve(&transaction, initiator.user.id()).await?.is_some() {
        return enrolled_page(&state, None);
    }

    let secret = if let Some(pending) = initiator.session.pending_totp_secret.take() {
        pending
    } else {
        totp::create_secret()?
    };

    initiator.session.pending_totp_secret = Some(secret.clone());
    initiator.session.update(&transaction).await?;

    transaction.commit().await?;

    enrollment_page(&state, &initiator.user, &secret, None)
}

#[derive(Debug, Deserialize)]
pub struct EnrollForm {
    code: String,
}

#[derive(Debug, PartialEq, Eq)]
enum EnrollCheck {
    AlreadyEnrolled,
    Restart,
    Retry,
    Complete,
}

/// where an enrollment submission lands. an existing auth_totp row wins
/// over everything else, and without a staged secret there is nothing to
/// check the code against
fn check_enrollment(enrolled: bool, has_pending: bool, code_ok: bool) -> EnrollCheck {
    if enrolled {
        EnrollCheck::AlreadyEnrolled
    } else if !has_pending {
        EnrollCheck::Restart
    } else if !code_ok {
        EnrollCheck::Retry
    } else {
        EnrollCheck::Complete
    }
}

pub async fn post(
    State(state): State<ArcShared>,
    headers: HeaderMap,
    Form(form): Form<EnrollForm>,
) -> error::Result<Response> {
    let mut conn = state.pool().get().await?;

    let transaction = conn.transaction().await?;

    let mut initiator = match handle::gate(state.sec(), &transaction, &headers).await? {
        Gate::Granted(initiator) => initiator,
        Gate::Denied(redirect) => {
            return Ok(redirect.into_response());
        }
    };

    let enrolled = totp::Totp::retrieve(&transaction, initiator.user.id()).await?.is_some();

    let pending = initiator.session.pending_totp_secret.take();

    let code_ok = match &pending {
        Some(secret) => validation::totp_code_valid(&form.code)
            && totp::verify_pending(secret, &form.code)?,
        None => false,
    };

    match (check_enrollment(enrolled, pending.is_some(), code_ok), pending) {
        (EnrollCheck::AlreadyEnrolled, _) => {
            enrolled_page(&state, Some(AuthKind::AlreadyEnrolled.message()))
        },
        (EnrollCheck::Restart, _) => {
            Ok(Redirect::to("/account/totp").into_response())
        },
        (EnrollCheck::Retry, Some(secret)) => {
            // keep the staged secret so the user can retry against the same
            // authenticator entry
            enrollment_page(
                &state,
                &initiator.user,
                &secret,
                Some(AuthKind::InvalidCode.message())
            )
        },
        (EnrollCheck::Complete, Some(secret)) => {
            totp::Totp::create(&transaction, initiator.user.id(), secret).await?;

            initiator.session.pending_totp_secret = None;
            initiator.session.update(&transaction).await?;

            transaction.commit().await?;

            Ok(Redirect::to("/account").into_response())
        },
        (_, None) => Err(error::Error::new()
            .source("enrollment check passed without a staged secret")),
    }
}

#[derive(Debug, Deserialize)]
pub struct DisableForm {
    password: String,
}

/// turning the second factor off asks for the password again so a borrowed
/// browser session is not enough
pub async fn disable(
    State(state): State<ArcShared>,
    headers: HeaderMap,
    Form(form): Form<DisableForm>,
) -> error::Result<Response> {
    let mut conn = state.pool().get().await?;

    let transaction = conn.transaction().await?;

    let initiator = match handle::gate(state.sec(), &transaction, &headers).await? {
        Gate::Granted(initiator) => initiator,
        Gate::Denied(redirect) => {
            return Ok(redirect.into_response());
        }
    };

    let Some(user_totp) = totp::Totp::retrieve(&transaction, initiator.user.id()).await? else {
        return enrolled_page(&state, Some(AuthKind::NoTotpEnrolled.message()));
    };

    let Some(user_password) = password::Password::retrieve(
        &transaction,
        initiator.user.id()
    ).await? else {
        return Err(error::Error::new()
            .source("user exists but has no password record"));
    };

    if !user_password.verify(&form.password, state.sec().pepper()) {
        return enrolled_page(&state, Some(AuthKind::WrongPassword.message()));
    }

    user_totp.delete(&transaction).await?;

    transaction.commit().await?;

    Ok(Redirect::to("/account").into_response())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn existing_enrollment_wins() {
        assert_eq!(check_enrollment(true, true, true), EnrollCheck::AlreadyEnrolled);
        assert_eq!(check_enrollment(true, false, false), EnrollCheck::AlreadyEnrolled);
    }

    #[test]
    fn no_staged_secret_restarts() {
        assert_eq!(check_enrollment(false, false, false), EnrollCheck::Restart);
    }

    #[test]
    fn code_decides_retry_or_complete() {
        // a wrong code leaves the attempt retryable instead of ending it
        assert_eq!(check_enrollment(false, true, false), EnrollCheck::Retry);
        assert_eq!(check_enrollment(false, true, true), EnrollCheck::Complete);
    }
}
