use std::fmt::Write;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponseParts, ResponseParts};
use chrono::{DateTime, Utc};

use crate::net::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// a Set-Cookie header in the making.
///
/// only the attributes the server actually sends are modeled here
#[derive(Debug, Clone)]
pub struct SetCookie {
    name: String,
    value: String,
    expires: Option<DateTime<Utc>>,
    max_age: Option<Duration>,
    domain: Option<String>,
    path: Option<String>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl SetCookie {
    pub fn new<N, V>(name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        SetCookie {
            name: name.into(),
            value: value.into(),
            expires: None,
            max_age: None,
            domain: None,
            path: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    pub fn with_expires(mut self, date: DateTime<Utc>) -> Self {
        self.expires = Some(date);
        self
    }

    pub fn with_max_age(mut self, duration: Duration) -> Self {
        self.max_age = Some(duration);
        self
    }

    pub fn with_domain<D>(mut self, domain: D) -> Self
    where
        D: Into<String>
    {
        self.domain = Some(domain.into());
        self
    }

    pub fn set_domain<D>(&mut self, domain: D)
    where
        D: Into<String>
    {
        self.domain = Some(domain.into());
    }

    pub fn with_path<P>(mut self, path: P) -> Self
    where
        P: Into<String>
    {
        self.path = Some(path.into());
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn with_same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }
}

impl std::fmt::Display for SetCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.name, self.value)?;

        if let Some(expires) = &self.expires {
            write!(f, "; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT"))?;
        }

        if let Some(max_age) = &self.max_age {
            write!(f, "; Max-Age={}", max_age.as_secs())?;
        }

        if let Some(domain) = &self.domain {
            write!(f, "; Domain={domain}")?;
        }

        if let Some(path) = &self.path {
            write!(f, "; Path={path}")?;
        }

        if self.secure {
            f.write_str("; Secure")?;
        }

        if self.http_only {
            f.write_str("; HttpOnly")?;
        }

        if let Some(same_site) = &self.same_site {
            f.write_str("; SameSite=")?;
            f.write_str(same_site.as_str())?;
        }

        Ok(())
    }
}

impl IntoResponseParts for SetCookie {
    type Error = error::Error;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let mut header = String::new();

        write!(&mut header, "{self}")?;

        res.headers_mut().append(SET_COOKIE, HeaderValue::from_str(&header)?);

        Ok(res)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn full_attribute_set() {
        let cookie = SetCookie::new("session_id", "abc123")
            .with_expires(DateTime::from_timestamp(0, 0).unwrap())
            .with_path("/")
            .with_secure(true)
            .with_http_only(true)
            .with_same_site(SameSite::Strict);

        assert_eq!(
            cookie.to_string(),
            "session_id=abc123; Expires=Thu, 01 Jan 1970 00:00:00 GMT; \
            Path=/; Secure; HttpOnly; SameSite=Strict"
        );
    }

    #[test]
    fn expired_cookie() {
        let cookie = SetCookie::new("session_id", "")
            .with_max_age(Duration::new(0, 0))
            .with_path("/");

        assert_eq!(cookie.to_string(), "session_id=; Max-Age=0; Path=/");
    }
}
