use axum::Form;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use serde::Deserialize;

use crate::net::error::{self, AuthKind};
use crate::routing::handle;
use crate::sec::authn::initiator::{self, LookupError};
use crate::sec::authn::{session, totp};
use crate::state::ArcShared;
use crate::validation;

pub async fn get(
    State(state): State<ArcShared>,
    headers: HeaderMap,
) -> error::Result<Response> {
    let conn = state.pool().get().await?;

    match initiator::lookup_header_map(state.sec(), &conn, &headers).await {
        Ok(_initiator) => Ok(Redirect::to("/characters").into_response()),
        Err(LookupError::SessionUnverified(_session)) => {
            handle::render_page(&state, "verify", &serde_json::json!({
                "message": Option::<&str>::None
            }))
        },
        Err(LookupError::Database(err)) => Err(err.into()),
        Err(LookupError::HeaderToStr(err)) => Err(err.into()),
        Err(_) => Ok(Redirect::to("/login").into_response()),
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyForm {
    code: String,
}

pub async fn post(
    State(state): State<ArcShared>,
    headers: HeaderMap,
    Form(form): Form<VerifyForm>,
) -> error::Result<Response> {
    let mut conn = state.pool().get().await?;

    let transaction = conn.transaction().await?;

    let mut user_session = match initiator::lookup_header_map(state.sec(), &transaction, &headers).await {
        Ok(_initiator) => {
            return Ok(Redirect::to("/characters").into_response());
        },
        Err(LookupError::SessionUnverified(found)) => found,
        Err(LookupError::Database(err)) => {
            return Err(err.into());
        },
        Err(LookupError::HeaderToStr(err)) => {
            return Err(err.into());
        },
        Err(_) => {
            return Ok(Redirect::to("/login").into_response());
        }
    };

    let Some(user_totp) = totp::Totp::retrieve(&transaction, &user_session.user_id).await? else {
        // enrollment was removed between login and verify, nothing left to
        // check
        user_session.verified = true;
        user_session.update(&transaction).await?;

        transaction.commit().await?;

        return Ok(Redirect::to("/characters").into_response());
    };

    let valid = validation::totp_code_valid(&form.code)
        && user_totp.verify(&form.code)?;

    if !valid {
        user_session.delete(&transaction).await?;

        transaction.commit().await?;

        let cookie = session::expire_session_cookie(state.sec());
        let page = handle::render_page(&state, "login", &serde_json::json!({
            "message": AuthKind::InvalidCode.message()
        }))?;

        return Ok((cookie, page).into_response());
    }

    user_session.verified = true;
    user_session.update(&transaction).await?;

    transaction.commit().await?;

    Ok(Redirect::to("/characters").into_response())
}
