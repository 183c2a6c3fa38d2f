use axum::http::header::{HeaderMap, HeaderValue, GetAll};
use deadpool_postgres::GenericClient;

use crate::net::error;
use crate::sec::state;
use crate::user;

use super::session;

/// a fully authenticated requester. only exists once a session passed both
/// the password and the second factor checks
pub struct Initiator {
    pub user: user::User,
    pub session: session::Session,
}

impl Initiator {
    pub fn user(&self) -> &user::User {
        &self.user
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("session was not found")]
    SessionNotFound,

    #[error("session has expired")]
    SessionExpired(session::Session),

    #[error("session is unauthenticated")]
    SessionUnauthenticated(session::Session),

    #[error("session is unverified")]
    SessionUnverified(session::Session),

    #[error("user was not found")]
    UserNotFound(session::Session),

    #[error("no session cookie was found")]
    MechanismNotFound,

    #[error("session id failed to decode")]
    SessionDecode(session::DecodeError),

    #[error(transparent)]
    Database(#[from] tokio_postgres::Error),

    #[error(transparent)]
    HeaderToStr(#[from] axum::http::header::ToStrError),
}

impl From<session::DecodeError> for LookupError {
    fn from(err: session::DecodeError) -> Self {
        LookupError::SessionDecode(err)
    }
}

impl From<LookupError> for error::Error {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::SessionNotFound => error::Error::auth(error::AuthKind::SessionNotFound),
            LookupError::SessionExpired(_session) => error::Error::auth(error::AuthKind::SessionExpired),
            LookupError::SessionUnauthenticated(_session) => error::Error::auth(error::AuthKind::SessionUnauthenticated),
            LookupError::SessionUnverified(_session) => error::Error::auth(error::AuthKind::SessionUnverified),

            LookupError::UserNotFound(_session) => error::Error::auth(error::AuthKind::InvalidSession),

            LookupError::MechanismNotFound => error::Error::auth(error::AuthKind::SessionNotFound),

            LookupError::SessionDecode(_err) => error::Error::auth(error::AuthKind::InvalidSession),

            LookupError::Database(e) => e.into(),
            LookupError::HeaderToStr(e) => e.into(),
        }
    }
}

pub async fn lookup_session_id<S>(
    sec: &state::Sec,
    conn: &impl GenericClient,
    session_id: S
) -> Result<Initiator, LookupError>
where
    S: AsRef<[u8]>
{
    let (token, _hash) = session::decode_base64(sec.session_key(), session_id)?;

    if let Some(session) = session::Session::retrieve_token(conn, &token).await? {
        let now = chrono::Utc::now();

        if session.dropped || session.expires < now {
            return Err(LookupError::SessionExpired(session));
        }

        if !session.authenticated {
            return Err(LookupError::SessionUnauthenticated(session));
        }

        if !session.verified {
            return Err(LookupError::SessionUnverified(session));
        }

        if let Some(user) = user::User::query_with_id(conn, &session.user_id).await? {
            Ok(Initiator {
                user,
                session,
            })
        } else {
            Err(LookupError::UserNotFound(session))
        }
    } else {
        Err(LookupError::SessionNotFound)
    }
}

fn find_session_id<'a>(cookies: GetAll<'a, HeaderValue>) -> Result<Option<&'a str>, LookupError> {
    for value in cookies {
        let value_str = value.to_str()?;

        for pair in value_str.split("; ") {
            if let Some((name, value)) = pair.split_once('=') {
                if name == session::SESSION_COOKIE {
                    return Ok(Some(value));
                }
            }
        }
    }

    Ok(None)
}

pub async fn lookup_header_map(
    sec: &state::Sec,
    conn: &impl GenericClient,
    headers: &HeaderMap
) -> Result<Initiator, LookupError> {
    let cookies = headers.get_all("cookie");

    if let Some(found) = find_session_id(cookies)? {
        return lookup_session_id(sec, conn, found.as_bytes()).await;
    }

    Err(LookupError::MechanismNotFound)
}

#[cfg(test)]
mod test {
    use super::*;

    fn session_id_from(headers: &HeaderMap) -> Option<&str> {
        find_session_id(headers.get_all("cookie")).unwrap()
    }

    #[test]
    fn find_session_id_single_pair() {
        let mut headers = HeaderMap::new();
        headers.append("cookie", HeaderValue::from_static("session_id=abc123"));

        assert_eq!(session_id_from(&headers), Some("abc123"));
    }

    #[test]
    fn find_session_id_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.append(
            "cookie",
            HeaderValue::from_static("theme=dark; session_id=abc123; lang=en")
        );

        assert_eq!(session_id_from(&headers), Some("abc123"));
    }

    #[test]
    fn find_session_id_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append("cookie", HeaderValue::from_static("theme=dark"));
        headers.append("cookie", HeaderValue::from_static("session_id=abc123"));

        assert_eq!(session_id_from(&headers), Some("abc123"));
    }

    #[test]
    fn find_session_id_missing() {
        let mut headers = HeaderMap::new();
        headers.append("cookie", HeaderValue::from_static("theme=dark"));

        assert_eq!(session_id_from(&headers), None);
    }
}
