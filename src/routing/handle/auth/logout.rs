use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};

use crate::net::error;
use crate::sec::authn::initiator::{self, LookupError};
use crate::sec::authn::session;
use crate::state::ArcShared;

/// pulls a session row worth deleting out of a failed lookup. lookups that
/// never reached a row have nothing to drop, which keeps logout idempotent
fn droppable_session(err: LookupError) -> Result<Option<session::Session>, LookupError> {
    match err {
        LookupError::SessionExpired(found) |
        LookupError::SessionUnauthenticated(found) |
        LookupError::SessionUnverified(found) |
        LookupError::UserNotFound(found) => Ok(Some(found)),
        LookupError::Database(_) |
        LookupError::HeaderToStr(_) => Err(err),
        _ => Ok(None),
    }
}

/// drops the session row no matter what shape the session is in. logging
/// out twice lands on the same page either way
pub async fn handle(
    State(state): State<ArcShared>,
    headers: HeaderMap,
) -> error::Result<Response> {
    let mut conn = state.pool().get().await?;

    let transaction = conn.transaction().await?;

    let found = match initiator::lookup_header_map(state.sec(), &transaction, &headers).await {
        Ok(initiator) => Some(initiator.session),
        Err(err) => droppable_session(err)?,
    };

    if let Some(user_session) = found {
        user_session.delete(&transaction).await?;
    }

    transaction.commit().await?;

    let cookie = session::expire_session_cookie(state.sec());

    Ok((cookie, Redirect::to("/")).into_response())
}

#[cfg(test)]
mod test {
    use super::*;

    use crate::sec::authn::session::token::{SessionToken, SESSION_TOKEN_BYTES};

    fn stub_session() -> session::Session {
        let now = chrono::Utc::now();

        session::Session {
            token: SessionToken::from([1; SESSION_TOKEN_BYTES]),
            user_id: 1,
            dropped: false,
            issued_on: now,
            expires: now,
            authenticated: true,
            verified: false,
            pending_totp_secret: None,
        }
    }

    #[test]
    fn carried_sessions_get_dropped() {
        // a session in any bad state still gets deleted on logout
        let errors = [
            LookupError::SessionExpired(stub_session()),
            LookupError::SessionUnauthenticated(stub_session()),
            LookupError::SessionUnverified(stub_session()),
            LookupError::UserNotFound(stub_session()),
        ];

        for err in errors {
            assert!(droppable_session(err).unwrap().is_some());
        }
    }

    #[test]
    fn absent_sessions_are_tolerated() {
        let errors = [
            LookupError::SessionNotFound,
            LookupError::MechanismNotFound,
            LookupError::SessionDecode(session::DecodeError::InvalidHash),
        ];

        for err in errors {
            assert!(droppable_session(err).unwrap().is_none());
        }
    }
}
