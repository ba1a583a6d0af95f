use sqlx::{Pool, Postgres};

// Embed SQL migrations at compile time for deterministic startup
const MIG_0001: &str = include_str!("../migrations/0001_create_rooms.sql");
const MIG_0002: &str = include_str!("../migrations/0002_create_room_members.sql");
const MIG_0003: &str = include_str!("../migrations/0003_create_messages.sql");

/// Applies the schema in order. Every statement is idempotent
/// (IF NOT EXISTS), so re-running at each startup is safe.
pub async fn run_all(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    for (label, sql) in [("rooms", MIG_0001), ("room_members", MIG_0002), ("messages", MIG_0003)] {
        sqlx::query(sql).execute(db).await?;
        tracing::info!(migration = %label, "migration applied");
    }
    Ok(())
}
