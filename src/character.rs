use serde::Serialize;
use tokio_postgres::Error as PgError;
use deadpool_postgres::GenericClient;

use crate::user::UserId;

/// the listing view of a character sheet. the full sheet (ability scores,
/// saving throws, skills) stays in the database until the detail pages need
/// it
#[derive(Debug, Serialize)]
pub struct Character {
    pub id: i64,
    pub name: String,
    pub race: String,
    pub class: String,
    pub background: String,
}

impl Character {
    pub async fn retrieve_for_user(
        conn: &impl GenericClient,
        user_id: &UserId,
    ) -> Result<Vec<Character>, PgError> {
        let result = conn.query(
            "\
            select characters.id, \
                   characters.name, \
                   characters.race, \
                   characters.class, \
                   characters.background \
            from characters \
            where characters.user_id = $1 \
            order by characters.name",
            &[user_id]
        )
            .await?
            .into_iter()
            .map(|row| Character {
                id: row.get(0),
                name: row.get(1),
                race: row.get(2),
                class: row.get(3),
                background: row.get(4),
            })
            .collect();

        Ok(result)
    }
}
