use chrono::Utc;
use base64::{Engine, engine::general_purpose::URL_SAFE};
use tokio_postgres::Error as PgError;
use deadpool_postgres::GenericClient;

use crate::sec::state;
use crate::user::UserId;
use crate::net::error::Error as NetError;
use crate::net::cookie::{SameSite, SetCookie};

pub mod token;

pub const SESSION_COOKIE: &str = "session_id";

pub enum BuilderError {
    TokenAttempts,
    UtcOverflow,

    Pg(PgError),
    Rand(rand::Error),
}

impl From<PgError> for BuilderError {
    fn from(err: PgError) -> Self {
        BuilderError::Pg(err)
    }
}

impl From<rand::Error> for BuilderError {
    fn from(err: rand::Error) -> Self {
        BuilderError::Rand(err)
    }
}

impl From<token::UniqueError> for BuilderError {
    fn from(err: token::UniqueError) -> Self {
        match err {
            token::UniqueError::Rand(err) => BuilderError::Rand(err),
            token::UniqueError::Pg(err) => BuilderError::Pg(err)
        }
    }
}

impl From<BuilderError> for NetError {
    fn from(err: BuilderError) -> NetError {
        match err {
            BuilderError::TokenAttempts => NetError::new()
                .source("ran out of token attempts"),
            BuilderError::UtcOverflow => NetError::new()
                .source("date time value overflowed"),
            BuilderError::Pg(err) => err.into(),
            BuilderError::Rand(err) => err.into(),
        }
    }
}

pub struct SessionBuilder {
    user_id: UserId,
    authenticated: bool,
    verified: bool,
}

impl SessionBuilder {
    pub fn authenticated(&mut self, authenticated: bool) -> &mut Self {
        self.authenticated = authenticated;
        self
    }

    pub fn verified(&mut self, verified: bool) -> &mut Self {
        self.verified = verified;
        self
    }

    pub async fn build(self, conn: &impl GenericClient) -> Result<Session, BuilderError> {
        let user_id = self.user_id;
        let dropped = false;
        let issued_on = Utc::now();
        let duration = chrono::Duration::days(7);

        let Some(token) = token::SessionToken::unique(conn, 10).await? else {
            return Err(BuilderError::TokenAttempts);
        };

        let Some(expires) = issued_on.checked_add_signed(duration) else {
            return Err(BuilderError::UtcOverflow);
        };

        let _ = conn.execute(
            "\
            insert into auth_session (\
                token, \
                user_id, \
                dropped, \
                issued_on, \
                expires, \
                authenticated, \
                verified, \
                pending_totp_secret\
            ) values \
            ($1, $2, $3, $4, $5, $6, $7, $8)",
            &[
                &token.as_slice(),
                &user_id,
                &dropped,
                &issued_on,
                &expires,
                &self.authenticated,
                &self.verified,
                &Option::<String>::None,
            ]
        ).await?;

        Ok(Session {
            token,
            user_id,
            dropped,
            issued_on,
            expires,
            authenticated: self.authenticated,
            verified: self.verified,
            pending_totp_secret: None,
        })
    }
}

/// a server side session row.
///
/// `authenticated` means the password check passed and `verified` means the
/// second factor check passed, or was not required. both have to be true
/// before the session grants access to anything. a pending totp secret is
/// staged on the session during enrollment so nothing touches the auth_totp
/// table until a code proves the authenticator app has the secret
#[derive(Debug)]
pub struct Session {
    pub token: token::SessionToken,
    pub user_id: UserId,
    pub dropped: bool,
    pub issued_on: chrono::DateTime<chrono::Utc>,
    pub expires: chrono::DateTime<chrono::Utc>,
    pub authenticated: bool,
    pub verified: bool,
    pub pending_totp_secret: Option<String>,
}

impl Session {
    pub fn builder(user_id: UserId) -> SessionBuilder {
        SessionBuilder {
            user_id,
            authenticated: false,
            verified: false,
        }
    }

    pub async fn retrieve_token(
        conn: &impl GenericClient,
        token: &token::SessionToken
    ) -> Result<Option<Session>, PgError> {
        if let Some(row) = conn.query_opt(
            "\
            select auth_session.token, \
                   auth_session.user_id, \
                   auth_session.dropped, \
                   auth_session.issued_on, \
                   auth_session.expires, \
                   auth_session.authenticated, \
                   auth_session.verified, \
                   auth_session.pending_totp_secret \
            from auth_session \
            where auth_session.token = $1",
            &[&token.as_slice()]
        ).await? {
            Ok(Some(Session {
                token: token::SessionToken::from_vec(row.get(0)),
                user_id: row.get(1),
                dropped: row.get(2),
                issued_on: row.get(3),
                expires: row.get(4),
                authenticated: row.get(5),
                verified: row.get(6),
                pending_totp_secret: row.get(7),
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn update(&self, conn: &impl GenericClient) -> Result<(), PgError> {
        let _ = conn.execute(
            "\
            update auth_session \
            set user_id = $2, \
                dropped = $3, \
                issued_on = $4, \
                expires = $5, \
                authenticated = $6, \
                verified = $7, \
                pending_totp_secret = $8 \
            where token = $1",
            &[
                &self.token.as_slice(),
                &self.user_id,
                &self.dropped,
                &self.issued_on,
                &self.expires,
                &self.authenticated,
                &self.verified,
                &self.pending_totp_secret,
            ]
        ).await?;

        Ok(())
    }

    pub async fn delete(&self, conn: &impl GenericClient) -> Result<(), PgError> {
        let _ = conn.execute(
            "delete from auth_session where token = $1",
            &[&self.token.as_slice()]
        ).await?;

        Ok(())
    }
}

pub type Hash = blake3::Hash;

pub fn create_hash<T>(key: &[u8; blake3::KEY_LEN], token: T) -> Hash
where
    T: AsRef<[u8]>
{
    blake3::keyed_hash(key, token.as_ref())
}

pub fn encode_base64<T>(token: T, hash: Hash) -> String
where
    T: AsRef<[u8]>
{
    let token_ref = token.as_ref();
    let slice = hash.as_bytes();

    let mut joined = Vec::with_capacity(token_ref.len() + slice.len());
    joined.extend_from_slice(token_ref);
    joined.extend_from_slice(slice);

    URL_SAFE.encode(joined)
}

#[derive(Debug)]
pub enum DecodeError {
    InvalidString,
    InvalidLength,
    InvalidHash,
}

/// splits a cookie value back into the token and its keyed hash, rejecting
/// values whose hash was not produced with the given key
pub fn decode_base64<S>(
    key: &[u8; blake3::KEY_LEN],
    session_id: S
) -> Result<(token::SessionToken, Hash), DecodeError>
where
    S: AsRef<[u8]>
{
    let Ok(mut bytes) = URL_SAFE.decode(session_id) else {
        return Err(DecodeError::InvalidString);
    };

    if bytes.len() != token::SESSION_TOKEN_BYTES + blake3::OUT_LEN {
        return Err(DecodeError::InvalidLength);
    };

    let session_token = token::SessionToken::drain_vec(&mut bytes);
    let hash: [u8; blake3::OUT_LEN] = bytes.try_into()
        .expect("remaining bytes does not match expected length");
    let given = blake3::Hash::from(hash);

    let expected = blake3::keyed_hash(key, session_token.as_slice());

    if given != expected {
        Err(DecodeError::InvalidHash)
    } else {
        Ok((session_token, given))
    }
}

pub fn create_session_cookie(sec: &state::Sec, session: &Session) -> SetCookie {
    let hash = create_hash(sec.session_key(), &session.token);
    let encoded_token = encode_base64(&session.token, hash);

    let mut cookie = SetCookie::new(SESSION_COOKIE, encoded_token)
        .with_expires(session.expires)
        .with_path("/")
        .with_http_only(true)
        .with_secure(*sec.session_info().secure())
        .with_same_site(SameSite::Strict);

    if let Some(domain) = sec.session_info().domain() {
        cookie.set_domain(domain);
    }

    cookie
}

pub fn expire_session_cookie(sec: &state::Sec) -> SetCookie {
    let mut cookie = SetCookie::new(SESSION_COOKIE, "")
        .with_max_age(std::time::Duration::new(0, 0))
        .with_path("/")
        .with_http_only(true)
        .with_secure(*sec.session_info().secure())
        .with_same_site(SameSite::Strict);

    if let Some(domain) = sec.session_info().domain() {
        cookie.set_domain(domain);
    }

    cookie
}

#[cfg(test)]
mod test {
    use super::*;

    const KEY: [u8; blake3::KEY_LEN] = [7; blake3::KEY_LEN];

    #[test]
    fn encode_decode_round_trip() {
        let session_token = token::SessionToken::from([3; token::SESSION_TOKEN_BYTES]);
        let hash = create_hash(&KEY, &session_token);

        let encoded = encode_base64(&session_token, hash);

        let (decoded_token, decoded_hash) = decode_base64(&KEY, &encoded)
            .expect("failed to decode session id");

        assert_eq!(decoded_token, session_token);
        assert_eq!(decoded_hash, hash);
    }

    #[test]
    fn decode_rejects_wrong_key() {
        let session_token = token::SessionToken::from([3; token::SESSION_TOKEN_BYTES]);
        let hash = create_hash(&KEY, &session_token);

        let encoded = encode_base64(&session_token, hash);

        let other_key = [8; blake3::KEY_LEN];

        assert!(matches!(
            decode_base64(&other_key, &encoded),
            Err(DecodeError::InvalidHash)
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_base64(&KEY, "$not base64$"),
            Err(DecodeError::InvalidString)
        ));
        assert!(matches!(
            decode_base64(&KEY, "c2hvcnQ="),
            Err(DecodeError::InvalidLength)
        ));
    }
}
