use argon2::Variant;
use tokio_postgres::Error as PgError;
use deadpool_postgres::GenericClient;
use rand::RngCore;

use crate::net::error::Error as NetError;
use crate::user::UserId;

pub const SALT_LEN: usize = 32;

pub type Salt = [u8; SALT_LEN];

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed creating password")]
    CreateFailed,

    #[error("failed updating password")]
    UpdateFailed,

    #[error(transparent)]
    Rand(#[from] rand::Error),

    #[error(transparent)]
    Argon2(#[from] argon2::Error),

    #[error(transparent)]
    Db(#[from] PgError)
}

impl From<PasswordError> for NetError {
    fn from(err: PasswordError) -> Self {
        NetError::new().source(err)
    }
}

pub fn gen_salt() -> Result<Salt, rand::Error> {
    let mut salt = [0u8; SALT_LEN];

    rand::thread_rng().try_fill_bytes(&mut salt)?;

    Ok(salt)
}

/// creates an encoded argon2id hash of the given password.
///
/// the pepper is fed in as the argon2 secret so stored hashes are only
/// verifiable with the server side key material
pub fn gen_hash(password: &str, salt: &[u8], pepper: &[u8]) -> Result<String, argon2::Error> {
    let mut config = argon2::Config::default();
    config.mem_cost = 19456;
    config.variant = Variant::Argon2id;
    config.secret = pepper;

    argon2::hash_encoded(
        password.as_bytes(),
        salt,
        &config
    )
}

pub struct Password {
    pub user_id: UserId,
    pub hash: String,
}

impl Password {
    pub async fn retrieve(
        conn: &impl GenericClient,
        user_id: &UserId,
    ) -> Result<Option<Password>, PgError> {
        if let Some(row) = conn.query_opt(
            "\
            select auth_password.user_id, \
                   auth_password.hash \
            from auth_password \
            where auth_password.user_id = $1",
            &[user_id]
        ).await? {
            Ok(Some(Password {
                user_id: row.get(0),
                hash: row.get(1)
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn create(
        conn: &impl GenericClient,
        user_id: &UserId,
        password: &str,
        pepper: &[u8],
    ) -> Result<Self, PasswordError> {
        let salt = gen_salt()?;
        let hash = gen_hash(password, &salt, pepper)?;

        let result = conn.execute(
            "\
            insert into auth_password (user_id, hash) values \
            ($1, $2)",
            &[user_id, &hash]
        ).await?;

        if result != 1 {
            return Err(PasswordError::CreateFailed);
        }

        Ok(Password {
            user_id: *user_id,
            hash,
        })
    }

    pub async fn update(
        &mut self,
        conn: &impl GenericClient,
        update: &str,
        pepper: &[u8],
    ) -> Result<(), PasswordError> {
        let salt = gen_salt()?;
        let hash = gen_hash(update, &salt, pepper)?;

        let result = conn.execute(
            "update auth_password set hash = $2 where user_id = $1",
            &[&self.user_id, &hash]
        ).await?;

        if result != 1 {
            return Err(PasswordError::UpdateFailed);
        }

        self.hash = hash;

        Ok(())
    }

    /// checks the given password against the stored hash.
    ///
    /// any failure to parse or verify the stored hash reads as a mismatch
    pub fn verify<C>(&self, check: C, pepper: &[u8]) -> bool
    where
        C: AsRef<[u8]>
    {
        argon2::verify_encoded_ext(&self.hash, check.as_ref(), pepper, &[])
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const PEPPER: &[u8] = b"test pepper";

    fn make_password(password: &str) -> Password {
        let salt = gen_salt().unwrap();

        Password {
            user_id: 1,
            hash: gen_hash(password, &salt, PEPPER).unwrap(),
        }
    }

    #[test]
    fn verify_known_password() {
        let password = make_password("a very fine password");

        assert!(password.verify("a very fine password", PEPPER));
        assert!(!password.verify("a very wrong password", PEPPER));
    }

    #[test]
    fn hashes_are_salted() {
        let first = make_password("duplicate");
        let second = make_password("duplicate");

        assert_ne!(first.hash, second.hash);

        assert!(first.verify("duplicate", PEPPER));
        assert!(second.verify("duplicate", PEPPER));
    }

    #[test]
    fn verify_requires_pepper() {
        let password = make_password("a very fine password");

        assert!(!password.verify("a very fine password", b"other pepper"));
    }

    #[test]
    fn verify_fails_closed_on_malformed_hash() {
        let password = Password {
            user_id: 1,
            hash: String::from("not an encoded hash"),
        };

        assert!(!password.verify("anything", PEPPER));
    }
}
