//! Room Repository Implementation
//!
//! PostgreSQL implementation of the `RoomStore` / `RoomTransaction` traits.
//! The room's exclusive section is its row lock (`SELECT ... FOR UPDATE`),
//! held for the lifetime of the SQL transaction.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::{
    Membership, Message, Room, RoomSearchResult, RoomSnapshot, RoomStore, RoomTransaction, User,
};
use crate::shared::error::RoomError;
use crate::shared::validation::escape_like;

/// SQLSTATE raised when `lock_timeout` expires.
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Room columns joined with the last message and its author.
const ROOM_WITH_LAST_MESSAGE: &str = r#"
    SELECT r.id, r.name, r.version, r.member_count, r.last_message_id,
           r.created_at, r.updated_at, r.bumped_at,
           m.content AS message_content, m.sequence AS message_sequence,
           m.created_at AS message_created_at,
           u.id AS author_id, u.username AS author_username
    FROM rooms r
    LEFT JOIN messages m ON m.id = r.last_message_id
    LEFT JOIN users u ON u.id = m.user_id
"#;

/// A room's messages with their authors, newest first.
const MESSAGES_FOR_ROOM: &str = r#"
    SELECT m.id, m.room_id, m.user_id, u.username, m.content, m.sequence, m.created_at
    FROM messages m
    INNER JOIN users u ON u.id = m.user_id
    WHERE m.room_id = $1
    ORDER BY m.created_at DESC, m.sequence DESC
"#;

/// `Busy` when the statement gave up on `lock_timeout`, `Database` otherwise.
fn lock_error(e: sqlx::Error, room_id: i64, started: Instant) -> RoomError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(LOCK_NOT_AVAILABLE) => {
            RoomError::Busy {
                room_id,
                waited_ms: started.elapsed().as_millis() as u64,
            }
        }
        _ => RoomError::Database(e),
    }
}

/// Database row for a room plus its optional last message.
#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: i64,
    name: String,
    version: i64,
    member_count: i64,
    last_message_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    bumped_at: DateTime<Utc>,
    message_content: Option<String>,
    message_sequence: Option<i64>,
    message_created_at: Option<DateTime<Utc>>,
    author_id: Option<i64>,
    author_username: Option<String>,
}

impl RoomRow {
    fn into_snapshot(self) -> RoomSnapshot {
        let last_message = match (
            self.last_message_id,
            self.message_content,
            self.message_sequence,
            self.message_created_at,
            self.author_id,
            self.author_username,
        ) {
            (Some(id), Some(content), Some(sequence), Some(created_at), Some(uid), Some(uname)) => {
                Some(Message {
                    id,
                    room_id: self.id,
                    author: User::new(uid, uname),
                    content,
                    sequence,
                    created_at,
                })
            }
            _ => None,
        };

        RoomSnapshot {
            room: Room {
                id: self.id,
                name: self.name,
                version: self.version,
                member_count: self.member_count,
                last_message_id: self.last_message_id,
                created_at: self.created_at,
                updated_at: self.updated_at,
                bumped_at: self.bumped_at,
            },
            last_message,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RoomSearchRow {
    id: i64,
    name: String,
    version: i64,
    member_count: i64,
    last_message_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    bumped_at: DateTime<Utc>,
    is_member: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct MessageRow {
    id: i64,
    room_id: i64,
    user_id: i64,
    username: String,
    content: String,
    sequence: i64,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            room_id: row.room_id,
            author: User::new(row.user_id, row.username),
            content: row.content,
            sequence: row.sequence,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MembershipRow {
    room_id: i64,
    user_id: i64,
    joined_at: DateTime<Utc>,
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Membership::new(row.room_id, row.user_id, row.joined_at)
    }
}

/// PostgreSQL room store.
#[derive(Clone)]
pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    /// Create a new PgRoomStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomStore for PgRoomStore {
    type Transaction = PgRoomTransaction;

    async fn lock_room(
        &self,
        room_id: i64,
        timeout: Option<Duration>,
    ) -> Result<PgRoomTransaction, RoomError> {
        let started = Instant::now();
        let mut tx = self.pool.begin().await?;

        // Local to the transaction: every later statement that waits on a lock
        // is bounded too, and reports `Busy` through `lock_error`.
        if let Some(limit) = timeout {
            sqlx::query("SELECT set_config('lock_timeout', $1, true)")
                .bind(format!("{}ms", limit.as_millis().max(1)))
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query_as::<_, RoomRow>(&format!(
            "{} WHERE r.id = $1 FOR UPDATE OF r",
            ROOM_WITH_LAST_MESSAGE
        ))
        .bind(room_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| lock_error(e, room_id, started))?
        .ok_or_else(RoomError::room_not_found)?;

        Ok(PgRoomTransaction {
            tx,
            snapshot: row.into_snapshot(),
        })
    }

    async fn find_room(&self, room_id: i64) -> Result<Option<RoomSnapshot>, RoomError> {
        let row = sqlx::query_as::<_, RoomRow>(&format!("{} WHERE r.id = $1", ROOM_WITH_LAST_MESSAGE))
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(RoomRow::into_snapshot))
    }

    async fn is_member(&self, room_id: i64, user_id: i64) -> Result<bool, RoomError> {
        let result = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM room_members WHERE room_id = $1 AND user_id = $2)",
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    async fn rooms_for_user(&self, user_id: i64) -> Result<Vec<RoomSnapshot>, RoomError> {
        let rows = sqlx::query_as::<_, RoomRow>(&format!(
            "{} INNER JOIN room_members rm ON rm.room_id = r.id \
             WHERE rm.user_id = $1 \
             ORDER BY rm.joined_at DESC, r.id ASC",
            ROOM_WITH_LAST_MESSAGE
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(RoomRow::into_snapshot).collect())
    }

    async fn search_rooms(
        &self,
        query: Option<&str>,
        user_id: i64,
    ) -> Result<Vec<RoomSearchResult>, RoomError> {
        let pattern = query.map(|q| format!("%{}%", escape_like(q)));

        let rows = sqlx::query_as::<_, RoomSearchRow>(
            r#"
            SELECT r.id, r.name, r.version, r.member_count, r.last_message_id,
                   r.created_at, r.updated_at, r.bumped_at,
                   EXISTS(
                       SELECT 1 FROM room_members rm
                       WHERE rm.room_id = r.id AND rm.user_id = $1
                   ) AS is_member
            FROM rooms r
            WHERE $2::TEXT IS NULL OR r.name ILIKE $2
            ORDER BY r.name ASC, r.id ASC
            "#,
        )
        .bind(user_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| RoomSearchResult {
                room: Room {
                    id: row.id,
                    name: row.name,
                    version: row.version,
                    member_count: row.member_count,
                    last_message_id: row.last_message_id,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                    bumped_at: row.bumped_at,
                },
                is_member: row.is_member,
            })
            .collect())
    }

    async fn room_messages(
        &self,
        room_id: i64,
    ) -> Result<Option<(RoomSnapshot, Vec<Message>)>, RoomError> {
        // Both reads share one snapshot of the database.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let Some(room) =
            sqlx::query_as::<_, RoomRow>(&format!("{} WHERE r.id = $1", ROOM_WITH_LAST_MESSAGE))
                .bind(room_id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, MessageRow>(MESSAGES_FOR_ROOM)
            .bind(room_id)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(Some((
            room.into_snapshot(),
            rows.into_iter().map(Message::from).collect(),
        )))
    }
}

/// Row-locked transaction over one room.
///
/// Membership and message writes go to the database immediately but stay
/// invisible until commit; the room row itself is written once, on commit.
pub struct PgRoomTransaction {
    tx: Transaction<'static, Postgres>,
    snapshot: RoomSnapshot,
}

impl PgRoomTransaction {
    fn room_id(&self) -> i64 {
        self.snapshot.room.id
    }
}

#[async_trait]
impl RoomTransaction for PgRoomTransaction {
    fn snapshot(&self) -> &RoomSnapshot {
        &self.snapshot
    }

    fn snapshot_mut(&mut self) -> &mut RoomSnapshot {
        &mut self.snapshot
    }

    async fn find_membership(&mut self, user_id: i64) -> Result<Option<Membership>, RoomError> {
        let room_id = self.room_id();
        let started = Instant::now();
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT room_id, user_id, joined_at
            FROM room_members
            WHERE room_id = $1 AND user_id = $2
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| lock_error(e, room_id, started))?;

        Ok(row.map(Membership::from))
    }

    async fn insert_membership(&mut self, membership: Membership) -> Result<(), RoomError> {
        let started = Instant::now();
        sqlx::query(
            r#"
            INSERT INTO room_members (room_id, user_id, joined_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(membership.room_id)
        .bind(membership.user_id)
        .bind(membership.joined_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                RoomError::AlreadyMember {
                    room_id: membership.room_id,
                    user_id: membership.user_id,
                }
            }
            _ => lock_error(e, membership.room_id, started),
        })?;

        Ok(())
    }

    async fn delete_membership(&mut self, user_id: i64) -> Result<Option<Membership>, RoomError> {
        let room_id = self.room_id();
        let started = Instant::now();
        let row = sqlx::query_as::<_, MembershipRow>(
            r#"
            DELETE FROM room_members
            WHERE room_id = $1 AND user_id = $2
            RETURNING room_id, user_id, joined_at
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| lock_error(e, room_id, started))?;

        Ok(row.map(Membership::from))
    }

    async fn count_memberships(&mut self) -> Result<i64, RoomError> {
        let room_id = self.room_id();
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM room_members WHERE room_id = $1",
        )
        .bind(room_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(count)
    }

    async fn append_message(&mut self, message: &Message) -> Result<(), RoomError> {
        let started = Instant::now();
        sqlx::query(
            r#"
            INSERT INTO messages (id, room_id, user_id, content, sequence, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(message.room_id)
        .bind(message.author.id)
        .bind(&message.content)
        .bind(message.sequence)
        .bind(message.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| lock_error(e, message.room_id, started))?;

        Ok(())
    }

    async fn commit(mut self) -> Result<RoomSnapshot, RoomError> {
        let room = &self.snapshot.room;
        sqlx::query(
            r#"
            UPDATE rooms
            SET version = $2, member_count = $3, last_message_id = $4,
                updated_at = $5, bumped_at = $6
            WHERE id = $1
            "#,
        )
        .bind(room.id)
        .bind(room.version)
        .bind(room.member_count)
        .bind(room.last_message_id)
        .bind(room.updated_at)
        .bind(room.bumped_at)
        .execute(&mut *self.tx)
        .await?;

        self.tx.commit().await?;
        Ok(self.snapshot)
    }
}
