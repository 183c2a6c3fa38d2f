use crate::state;
use crate::error;

/// clears out sessions that expired or were revoked. nothing references a
/// session row outside of the cookie lookup so a plain delete is enough
pub async fn cleanup(state: state::ArcShared) -> error::Result<()> {
    let today = chrono::Utc::now();
    let conn = state.pool().get().await?;

    let count = conn.execute(
        "\
        delete from auth_session \
        where expires <= $1 or dropped",
        &[&today]
    ).await?;

    tracing::info!("dropped {count} sessions");

    Ok(())
}
