use tokio_postgres::Error as PgError;
use deadpool_postgres::GenericClient;

pub type UserId = i64;

/// account record. credentials live in the auth tables keyed by [`UserId`]
#[derive(Debug)]
pub struct User {
    id: UserId,
    username: String,
}

impl User {
    /// inserts a new user, returning None when the username is already
    /// taken
    pub async fn create<U>(
        conn: &impl GenericClient,
        username: U,
    ) -> Result<Option<User>, PgError>
    where
        U: Into<String>
    {
        let username = username.into();

        if let Some(row) = conn.query_opt(
            "\
            insert into users (username) values ($1) \
            on conflict (username) do nothing \
            returning id",
            &[&username]
        ).await? {
            Ok(Some(User {
                id: row.get(0),
                username,
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn query_with_id(
        conn: &impl GenericClient,
        id: &UserId,
    ) -> Result<Option<User>, PgError> {
        if let Some(row) = conn.query_opt(
            "\
            select users.id, \
                   users.username \
            from users \
            where users.id = $1",
            &[id]
        ).await? {
            Ok(Some(User {
                id: row.get(0),
                username: row.get(1),
            }))
        } else {
            Ok(None)
        }
    }

    pub async fn query_with_username(
        conn: &impl GenericClient,
        username: &str,
    ) -> Result<Option<User>, PgError> {
        if let Some(row) = conn.query_opt(
            "\
            select users.id, \
                   users.username \
            from users \
            where users.username = $1",
            &[&username]
        ).await? {
            Ok(Some(User {
                id: row.get(0),
                username: row.get(1),
            }))
        } else {
            Ok(None)
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}
