use std::str::FromStr;

use data_encoding::BASE32_NOPAD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use tokio_postgres::Error as PgError;
use deadpool_postgres::GenericClient;
use url::Url;

use crate::net::error::Error as NetError;
use crate::user::UserId;

pub const SECRET_LEN: usize = 20;
pub const DEFAULT_DIGITS: u32 = 6;
pub const DEFAULT_STEP: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("secret is not valid base32")]
    InvalidSecret,

    #[error("failed creating totp record")]
    CreateFailed,

    #[error("stored totp algorithm is not recognized")]
    UnknownAlgo,

    #[error(transparent)]
    Hmac(#[from] hmac::digest::InvalidLength),

    #[error(transparent)]
    Rand(#[from] rand::Error),

    #[error(transparent)]
    Db(#[from] PgError)
}

impl From<TotpError> for NetError {
    fn from(err: TotpError) -> Self {
        NetError::new().source(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algo {
    SHA1,
    SHA256,
    SHA512,
}

impl Algo {
    pub fn from_i16(v: i16) -> Option<Self> {
        match v {
            0 => Some(Algo::SHA1),
            1 => Some(Algo::SHA256),
            2 => Some(Algo::SHA512),
            _ => None
        }
    }

    pub fn as_i16(&self) -> i16 {
        match self {
            Algo::SHA1 => 0,
            Algo::SHA256 => 1,
            Algo::SHA512 => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Algo::SHA1 => "SHA1",
            Algo::SHA256 => "SHA256",
            Algo::SHA512 => "SHA512",
        }
    }
}

pub struct FromStrError;

impl FromStr for Algo {
    type Err = FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHA1" => Ok(Algo::SHA1),
            "SHA256" => Ok(Algo::SHA256),
            "SHA512" => Ok(Algo::SHA512),
            _ => Err(FromStrError),
        }
    }
}

/// generates a fresh base32 encoded shared secret
pub fn create_secret() -> Result<String, rand::Error> {
    let mut bytes = [0u8; SECRET_LEN];
    rand::thread_rng().try_fill_bytes(&mut bytes)?;

    Ok(BASE32_NOPAD.encode(&bytes))
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, TotpError> {
    BASE32_NOPAD.decode(secret.as_bytes())
        .map_err(|_| TotpError::InvalidSecret)
}

fn hmac_digest(algo: &Algo, key: &[u8], data: &[u8]) -> Result<Vec<u8>, hmac::digest::InvalidLength> {
    let bytes = match algo {
        Algo::SHA1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key)?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        },
        Algo::SHA256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key)?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        },
        Algo::SHA512 => {
            let mut mac = Hmac::<Sha512>::new_from_slice(key)?;
            mac.update(data);
            mac.finalize().into_bytes().to_vec()
        },
    };

    Ok(bytes)
}

/// the hotp dynamic truncation from RFC 4226
fn hotp(algo: &Algo, key: &[u8], counter: u64, digits: u32) -> Result<String, hmac::digest::InvalidLength> {
    let digest = hmac_digest(algo, key, &counter.to_be_bytes())?;

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24) |
        ((digest[offset + 1] as u32) << 16) |
        ((digest[offset + 2] as u32) << 8) |
        (digest[offset + 3] as u32);

    let code = binary % 10u32.pow(digits);

    Ok(format!("{:0>width$}", code, width = digits as usize))
}

/// the code for the time step containing the given unix timestamp
pub fn code_at(
    algo: &Algo,
    secret: &str,
    digits: u32,
    step: u64,
    time: u64,
) -> Result<String, TotpError> {
    let key = decode_secret(secret)?;

    Ok(hotp(algo, &key, time / step, digits)?)
}

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp() as u64
}

/// the otpauth uri that provisions an authenticator app with the given
/// secret
pub fn provisioning_uri(
    issuer: &str,
    account: &str,
    algo: &Algo,
    secret: &str,
    digits: u32,
    step: u64,
) -> Url {
    let mut url = Url::parse("otpauth://totp/").unwrap();
    url.set_path(&format!("{issuer}:{account}"));

    url.query_pairs_mut()
        .append_pair("secret", secret)
        .append_pair("issuer", issuer)
        .append_pair("algorithm", algo.as_str())
        .append_pair("digits", &digits.to_string())
        .append_pair("period", &step.to_string())
        .finish();

    url
}

pub struct Totp {
    pub user_id: UserId,
    pub algo: Algo,
    pub secret: String,
    pub digits: u32,
    pub step: u64,
}

impl Totp {
    pub async fn retrieve(
        conn: &impl GenericClient,
        user_id: &UserId,
    ) -> Result<Option<Totp>, TotpError> {
        if let Some(row) = conn.query_opt(
            "\
            select auth_totp.algo, \
                   auth_totp.secret, \
                   auth_totp.digits, \
                   auth_totp.step \
            from auth_totp \
            where auth_totp.user_id = $1",
            &[user_id]
        ).await? {
            // a row with an algo this build cannot compute codes for must
            // not be silently read as some other algorithm
            let Some(algo) = Algo::from_i16(row.get(0)) else {
                return Err(TotpError::UnknownAlgo);
            };

            Ok(Some(Totp {
                user_id: *user_id,
                algo,
                secret: row.get(1),
                digits: row.get::<_, i32>(2) as u32,
                step: row.get::<_, i32>(3) as u64,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn create(
        conn: &impl GenericClient,
        user_id: &UserId,
        secret: String,
    ) -> Result<Totp, TotpError> {
        let algo = Algo::SHA1;
        let digits = DEFAULT_DIGITS;
        let step = DEFAULT_STEP;

        let result = conn.execute(
            "\
            insert into auth_totp (user_id, algo, secret, digits, step) values \
            ($1, $2, $3, $4, $5)",
            &[user_id, &algo.as_i16(), &secret, &(digits as i32), &(step as i32)]
        ).await?;

        if result != 1 {
            return Err(TotpError::CreateFailed);
        }

        Ok(Totp {
            user_id: *user_id,
            algo,
            secret,
            digits,
            step,
        })
    }

    pub async fn delete(&self, conn: &impl GenericClient) -> Result<(), PgError> {
        let _ = conn.execute(
            "delete from auth_totp where user_id = $1",
            &[&self.user_id]
        ).await?;

        Ok(())
    }

    pub fn current_code(&self) -> Result<String, TotpError> {
        code_at(&self.algo, &self.secret, self.digits, self.step, unix_now())
    }

    pub fn provisioning_uri(&self, issuer: &str, account: &str) -> Url {
        provisioning_uri(issuer, account, &self.algo, &self.secret, self.digits, self.step)
    }

    /// checks the code against the current time step only. a code from the
    /// previous or next step does not count
    pub fn verify<C>(&self, code: C) -> Result<bool, TotpError>
    where
        C: AsRef<str>
    {
        verify_at(
            &self.algo,
            &self.secret,
            self.digits,
            self.step,
            unix_now(),
            code.as_ref(),
        )
    }
}

/// checks a code against a bare secret with the default parameters. used
/// during enrollment before any auth_totp row exists
pub fn verify_pending(secret: &str, code: &str) -> Result<bool, TotpError> {
    verify_at(&Algo::SHA1, secret, DEFAULT_DIGITS, DEFAULT_STEP, unix_now(), code)
}

pub fn verify_at(
    algo: &Algo,
    secret: &str,
    digits: u32,
    step: u64,
    time: u64,
    code: &str,
) -> Result<bool, TotpError> {
    let expected = code_at(algo, secret, digits, step, time)?;

    Ok(expected == code)
}

#[cfg(test)]
mod test {
    use super::*;

    // the shared secret from the RFC 6238 test vectors, ascii
    // "12345678901234567890" for SHA1 with longer repeats for the other
    // algorithms
    const RFC_SECRET_SHA1: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    fn rfc_secret(algo: &Algo) -> String {
        let seed = b"1234567890";
        let len = match algo {
            Algo::SHA1 => 20,
            Algo::SHA256 => 32,
            Algo::SHA512 => 64,
        };

        let bytes: Vec<u8> = seed.iter()
            .copied()
            .cycle()
            .take(len)
            .collect();

        BASE32_NOPAD.encode(&bytes)
    }

    #[test]
    fn rfc6238_sha1_vectors() {
        let vectors = [
            (59u64, "94287082"),
            (1111111109, "07081804"),
            (1234567890, "89005924"),
            (20000000000, "65353130"),
        ];

        for (time, expected) in vectors {
            let code = code_at(&Algo::SHA1, RFC_SECRET_SHA1, 8, 30, time).unwrap();

            assert_eq!(code, expected, "time {time}");
        }
    }

    #[test]
    fn rfc6238_sha256_vector() {
        let secret = rfc_secret(&Algo::SHA256);
        let code = code_at(&Algo::SHA256, &secret, 8, 30, 59).unwrap();

        assert_eq!(code, "46119246");
    }

    #[test]
    fn rfc6238_sha512_vector() {
        let secret = rfc_secret(&Algo::SHA512);
        let code = code_at(&Algo::SHA512, &secret, 8, 30, 59).unwrap();

        assert_eq!(code, "90693936");
    }

    #[test]
    fn codes_keep_leading_zeros() {
        let code = code_at(&Algo::SHA1, RFC_SECRET_SHA1, 6, 30, 1111111109).unwrap();

        assert_eq!(code.len(), 6);
        assert_eq!(code, "081804");
    }

    #[test]
    fn verify_exact_step_only() {
        let time = 1234567890u64;
        let code = code_at(&Algo::SHA1, RFC_SECRET_SHA1, 6, 30, time).unwrap();

        assert!(verify_at(&Algo::SHA1, RFC_SECRET_SHA1, 6, 30, time, &code).unwrap());
        // same step, different second
        assert!(verify_at(&Algo::SHA1, RFC_SECRET_SHA1, 6, 30, time - (time % 30), &code).unwrap());
        // neighboring steps are rejected
        assert!(!verify_at(&Algo::SHA1, RFC_SECRET_SHA1, 6, 30, time + 30, &code).unwrap());
        assert!(!verify_at(&Algo::SHA1, RFC_SECRET_SHA1, 6, 30, time - 30, &code).unwrap());
    }

    #[test]
    fn verify_invalid_secret() {
        let Err(err) = verify_at(&Algo::SHA1, "not base32!!", 6, 30, 59, "123456") else {
            panic!("decoded an invalid secret");
        };

        assert!(matches!(err, TotpError::InvalidSecret));
    }

    #[test]
    fn algo_from_i16_bounds() {
        assert_eq!(Algo::from_i16(0), Some(Algo::SHA1));
        assert_eq!(Algo::from_i16(1), Some(Algo::SHA256));
        assert_eq!(Algo::from_i16(2), Some(Algo::SHA512));

        // anything outside the stored range is a corrupt row, not SHA1
        assert_eq!(Algo::from_i16(3), None);
        assert_eq!(Algo::from_i16(-1), None);
    }

    #[test]
    fn created_secrets_decode() {
        let secret = create_secret().unwrap();
        let bytes = decode_secret(&secret).unwrap();

        assert_eq!(bytes.len(), SECRET_LEN);

        let other = create_secret().unwrap();

        assert_ne!(secret, other);
    }

    #[test]
    fn record_code_and_uri() {
        let record = Totp {
            user_id: 1,
            algo: Algo::SHA1,
            secret: RFC_SECRET_SHA1.into(),
            digits: 6,
            step: 30,
        };

        let code = record.current_code().unwrap();

        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|ch| ch.is_ascii_digit()));

        let uri = record.provisioning_uri("charkeep", "wizard");

        assert_eq!(uri.path(), "/charkeep:wizard");
    }

    #[test]
    fn provisioning_uri_contents() {
        let uri = provisioning_uri(
            "charkeep",
            "wizard",
            &Algo::SHA1,
            RFC_SECRET_SHA1,
            6,
            30,
        );

        assert_eq!(uri.scheme(), "otpauth");
        assert_eq!(uri.host_str(), Some("totp"));
        assert_eq!(uri.path(), "/charkeep:wizard");

        let pairs: Vec<(String, String)> = uri.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("secret".into(), RFC_SECRET_SHA1.into())));
        assert!(pairs.contains(&("issuer".into(), "charkeep".into())));
        assert!(pairs.contains(&("algorithm".into(), "SHA1".into())));
        assert!(pairs.contains(&("digits".into(), "6".into())));
        assert!(pairs.contains(&("period".into(), "30".into())));
    }
}
