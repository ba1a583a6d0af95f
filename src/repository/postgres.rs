use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use super::{Repository, StoreError};
use crate::models::{Membership, Message, MessageType, Room};

/// Postgres-backed repository. Row-level transactional guarantees come from
/// the store; cross-call serialization is the service layer's job.
pub struct PgRepository {
    pool: Pool<Postgres>,
}

impl PgRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn room_from_row(row: &PgRow) -> Room {
    Room {
        id: row.get("id"),
        name: row.get("name"),
        created_at: row.get("created_at"),
    }
}

fn membership_from_row(room_id: Uuid, row: &PgRow) -> Membership {
    let hidden: bool = row.get("hidden");
    Membership {
        room_id,
        user_id: row.get("user_id"),
        visible: !hidden,
        left_at: row.get("left_at"),
        joined_at: row.get("joined_at"),
    }
}

fn message_from_row(row: &PgRow) -> Message {
    let message_type: String = row.get("message_type");
    Message {
        id: row.get("id"),
        room_id: row.get("room_id"),
        sender_id: row.get("sender_id"),
        message_type: MessageType::from_str(&message_type),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn create_room_with_members(
        &self,
        name: Option<String>,
        member_ids: &[Uuid],
    ) -> Result<Room, StoreError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO rooms (id, name, created_at) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(&name)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
        for member_id in member_ids {
            sqlx::query(
                "INSERT INTO room_members (room_id, user_id, joined_at) VALUES ($1, $2, $3) \
                 ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(member_id)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(Room {
            id,
            name,
            created_at,
        })
    }

    async fn add_member(&self, room_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO room_members (room_id, user_id, joined_at) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(room_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_members(&self, room_id: Uuid) -> Result<Vec<Membership>, StoreError> {
        let rows = sqlx::query(
            "SELECT user_id, hidden, left_at, joined_at FROM room_members \
             WHERE room_id = $1 ORDER BY joined_at ASC, user_id ASC",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| membership_from_row(room_id, row))
            .collect())
    }

    async fn get_membership(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Membership>, StoreError> {
        let row = sqlx::query(
            "SELECT user_id, hidden, left_at, joined_at FROM room_members \
             WHERE room_id = $1 AND user_id = $2",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| membership_from_row(room_id, &row)))
    }

    async fn set_hidden(
        &self,
        room_id: Uuid,
        user_id: Uuid,
        hidden: bool,
    ) -> Result<bool, StoreError> {
        let result = if hidden {
            sqlx::query(
                "UPDATE room_members SET hidden = TRUE, left_at = $3 \
                 WHERE room_id = $1 AND user_id = $2",
            )
            .bind(room_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                "UPDATE room_members SET hidden = FALSE, left_at = NULL \
                 WHERE room_id = $1 AND user_id = $2",
            )
            .bind(room_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?
        };
        Ok(result.rows_affected() > 0)
    }

    async fn reveal_hidden(&self, room_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE room_members SET hidden = FALSE, left_at = NULL \
             WHERE room_id = $1 AND hidden = TRUE",
        )
        .bind(room_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn find_direct_room(
        &self,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Uuid>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT r.id
            FROM rooms r
            WHERE (SELECT COUNT(*) FROM room_members rm WHERE rm.room_id = r.id) = 2
              AND EXISTS (SELECT 1 FROM room_members rm WHERE rm.room_id = r.id AND rm.user_id = $1)
              AND EXISTS (SELECT 1 FROM room_members rm WHERE rm.room_id = r.id AND rm.user_id = $2)
            ORDER BY r.created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| row.get("id")))
    }

    async fn room_by_id(&self, room_id: Uuid) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query("SELECT id, name, created_at FROM rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| room_from_row(&row)))
    }

    async fn rooms_for_user(&self, user_id: Uuid) -> Result<Vec<Room>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.name, r.created_at
            FROM rooms r
            JOIN room_members rm ON rm.room_id = r.id
            WHERE rm.user_id = $1 AND rm.hidden = FALSE
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(room_from_row).collect())
    }

    async fn delete_room(&self, room_id: Uuid) -> Result<(), StoreError> {
        // room_members and messages cascade via foreign keys
        sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        message_type: MessageType,
        content: &str,
    ) -> Result<Message, StoreError> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        sqlx::query(
            "INSERT INTO messages (id, room_id, sender_id, message_type, content, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(room_id)
        .bind(sender_id)
        .bind(message_type.as_str())
        .bind(content)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Message {
            id,
            room_id,
            sender_id,
            message_type,
            content: content.to_string(),
            created_at,
        })
    }

    async fn list_messages(
        &self,
        room_id: Uuid,
        cutoff: Option<DateTime<Utc>>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Message>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, room_id, sender_id, message_type, content, created_at
            FROM messages
            WHERE room_id = $1 AND ($2::timestamptz IS NULL OR created_at <= $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(room_id)
        .bind(cutoff)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(message_from_row).collect())
    }

    async fn message_by_id(&self, message_id: Uuid) -> Result<Option<Message>, StoreError> {
        let row = sqlx::query(
            "SELECT id, room_id, sender_id, message_type, content, created_at \
             FROM messages WHERE id = $1",
        )
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| message_from_row(&row)))
    }

    async fn latest_message(&self, room_id: Uuid) -> Result<Option<Message>, StoreError> {
        let row = sqlx::query(
            "SELECT id, room_id, sender_id, message_type, content, created_at \
             FROM messages WHERE room_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|row| message_from_row(&row)))
    }
}
