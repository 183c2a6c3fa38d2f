use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::Level;

type BoxDynError = Box<dyn std::error::Error + Send + Sync>;

/// failure kinds for the authentication flows.
///
/// each kind carries the user facing message the routing layer renders back
/// into the page the request came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthKind {
    UnknownUser,
    WrongPassword,
    WrongOldPassword,
    InvalidCode,
    AlreadyEnrolled,
    NoTotpEnrolled,
    NotAuthenticated,
    AlreadyAuthenticated,
    SameAsOld,
    ConfirmationMismatch,
    UsernameTaken,

    InvalidSession,
    SessionExpired,
    SessionNotFound,
    SessionUnauthenticated,
    SessionUnverified,
}

impl AuthKind {
    pub fn message(&self) -> &'static str {
        match self {
            AuthKind::UnknownUser => "Username not found",
            AuthKind::WrongPassword => "Entered password was wrong",
            AuthKind::WrongOldPassword => "Old password wrong",
            AuthKind::InvalidCode => "Entered code was wrong",
            AuthKind::AlreadyEnrolled => "Two-factor is already enabled for this account",
            AuthKind::NoTotpEnrolled => "Two-factor is not enabled for this account",
            AuthKind::NotAuthenticated => "You must be logged in to do that",
            AuthKind::AlreadyAuthenticated => "You are already logged in",
            AuthKind::SameAsOld => "New password cannot be old password",
            AuthKind::ConfirmationMismatch => "New passwords don't match",
            AuthKind::UsernameTaken => "Username unavailable or some other error occured",

            AuthKind::InvalidSession => "Session is invalid",
            AuthKind::SessionExpired => "Session has expired",
            AuthKind::SessionNotFound => "Session was not found",
            AuthKind::SessionUnauthenticated => "Session is unauthenticated",
            AuthKind::SessionUnverified => "Session is unverified",
        }
    }
}

impl From<&AuthKind> for StatusCode {
    fn from(kind: &AuthKind) -> Self {
        match kind {
            AuthKind::UnknownUser |
            AuthKind::WrongPassword |
            AuthKind::WrongOldPassword |
            AuthKind::InvalidCode |
            AuthKind::NoTotpEnrolled => StatusCode::FORBIDDEN,
            AuthKind::NotAuthenticated |
            AuthKind::InvalidSession |
            AuthKind::SessionExpired |
            AuthKind::SessionNotFound |
            AuthKind::SessionUnauthenticated |
            AuthKind::SessionUnverified => StatusCode::UNAUTHORIZED,
            AuthKind::AlreadyEnrolled |
            AuthKind::AlreadyAuthenticated |
            AuthKind::SameAsOld |
            AuthKind::ConfirmationMismatch |
            AuthKind::UsernameTaken => StatusCode::BAD_REQUEST,
        }
    }
}

impl std::fmt::Display for AuthKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug)]
pub struct Error {
    status: StatusCode,
    kind: Option<AuthKind>,
    context: Option<String>,
    src: Option<BoxDynError>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new() -> Self {
        Error {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: None,
            context: None,
            src: None,
        }
    }

    pub fn auth(kind: AuthKind) -> Self {
        Error {
            status: StatusCode::from(&kind),
            kind: Some(kind),
            context: None,
            src: None,
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn context<C>(mut self, ctx: C) -> Self
    where
        C: Into<String>
    {
        self.context = Some(ctx.into());
        self
    }

    pub fn source<S>(mut self, src: S) -> Self
    where
        S: Into<BoxDynError>
    {
        self.src = Some(src.into());
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.context, &self.src) {
            (Some(kind), Some(cxt), _) => write!(f, "{kind}: {cxt}"),
            (Some(kind), None, _) => write!(f, "{kind}"),
            (None, Some(cxt), _) => write!(f, "{}: {cxt}", self.status),
            (None, None, _) => write!(f, "{}", self.status),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.src.as_ref().map(|v| & **v as _)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if let Some(err) = self.src.as_ref() {
            tracing::event!(
                Level::ERROR,
                "unhandled error when processing request: {:#?}",
                err
            );
        }

        let message = match &self.kind {
            Some(kind) => kind.message(),
            None => "internal server error",
        };

        (self.status, message.to_owned()).into_response()
    }
}

impl From<AuthKind> for Error {
    fn from(kind: AuthKind) -> Self {
        Error::auth(kind)
    }
}

macro_rules! simple_from {
    ($e:path) => {
        impl From<$e> for Error {
            fn from(err: $e) -> Self {
                Error::new()
                    .source(err)
            }
        }
    };
    ($e:path, $s:expr) => {
        impl From<$e> for Error {
            fn from(err: $e) -> Self {
                Error::new()
                    .status($s)
                    .source(err)
            }
        }
    }
}

simple_from!(std::io::Error);
simple_from!(std::fmt::Error);

simple_from!(axum::Error);
simple_from!(axum::http::Error);
simple_from!(
    axum::http::header::ToStrError,
    StatusCode::BAD_REQUEST
);
simple_from!(
    axum::http::header::InvalidHeaderValue,
    StatusCode::BAD_REQUEST
);

simple_from!(handlebars::RenderError);

simple_from!(tokio_postgres::Error);

simple_from!(rand::Error);

impl From<deadpool_postgres::HookErrorCause> for Error {
    fn from(err: deadpool_postgres::HookErrorCause) -> Self {
        use deadpool_postgres::HookErrorCause;

        match err {
            HookErrorCause::Backend(e) => Self::from(e),
            HookErrorCause::Message(msg) => Error::new()
                .source(msg),
            HookErrorCause::StaticMessage(msg) => Error::new()
                .source(msg.to_owned()),
        }
    }
}

impl From<deadpool_postgres::HookError> for Error {
    fn from(err: deadpool_postgres::HookError) -> Self {
        use deadpool_postgres::HookError;

        match err {
            HookError::Continue(opt) => {
                if let Some(cause) = opt {
                    Self::from(cause)
                } else {
                    Error::new()
                        .source("deadpool::managed::HookError::Continue with no cause")
                }
            },
            HookError::Abort(cause) => {
                Self::from(cause)
            }
        }
    }
}

impl From<deadpool_postgres::PoolError> for Error {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        use deadpool_postgres::PoolError;

        match err {
            PoolError::Backend(e) => Self::from(e),
            PoolError::PostCreateHook(e) |
            PoolError::PreRecycleHook(e) |
            PoolError::PostRecycleHook(e) => Self::from(e),
            _ => Error::new().source(err)
        }
    }
}
