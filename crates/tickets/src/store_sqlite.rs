//! SQLite-backed store using sqlx.

use std::collections::HashSet;

use {
    async_trait::async_trait,
    helpline_common::types::{
        AckState, Catalog, ChooserMode, Connection, ConnectionEntry, ConnectionId, Contact,
        ContactId, MediaRef, MenuPosition, Message, MessageOrigin, NewMessage, NewTicket, Queue,
        QueueId, QueueOption, RatingId, SenderIdentity, Ticket, TicketId, TicketStatus, UserId,
        UserRating, now_ms,
    },
    sqlx::{
        Row, SqlitePool,
        sqlite::{SqlitePoolOptions, SqliteRow},
    },
};

use crate::{
    Error, Result,
    store::{CatalogStore, TicketStore},
};

const TICKET_COLUMNS: &str = "id, uuid, contact_id, connection_id, status, queue_id, user_id, \
                              chatbot, queue_option_id, last_message, unread_messages, is_group, \
                              created_at, updated_at";

const MESSAGE_COLUMNS: &str = "id, external_id, ticket_id, contact_id, body, origin, read, ack, \
                               media_ref, media_type, quoted_message_id, created_at";

/// SQLite persistence for the catalog, contacts, tickets, messages and ratings.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a store with its own connection pool and run migrations.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        crate::run_migrations(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store using an existing pool (migrations must already be run).
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn fetch_ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
        let row = sqlx::query(&format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn fetch_rating(&self, sql: &str, key: i64) -> Result<Option<UserRating>> {
        let row = sqlx::query(sql)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(rating_from_row))
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}

fn media_to_json(media: Option<&MediaRef>) -> Result<Option<String>> {
    Ok(media.map(serde_json::to_string).transpose()?)
}

fn media_from_json(raw: Option<String>) -> Result<Option<MediaRef>> {
    Ok(raw
        .filter(|r| !r.is_empty())
        .map(|r| serde_json::from_str(&r))
        .transpose()?)
}

fn chooser_from_str(raw: &str) -> Result<ChooserMode> {
    Ok(raw.parse::<ChooserMode>()?)
}

fn contact_from_row(row: &SqliteRow) -> Contact {
    Contact {
        id: row.get("id"),
        external_id: row.get("external_id"),
        name: row.get("name"),
        avatar_url: row.get("avatar_url"),
        is_group: row.get("is_group"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn ticket_from_row(row: &SqliteRow) -> Result<Ticket> {
    let status: String = row.get("status");
    let unread: i64 = row.get("unread_messages");
    Ok(Ticket {
        id: row.get("id"),
        uuid: row.get("uuid"),
        contact_id: row.get("contact_id"),
        connection_id: row.get("connection_id"),
        status: status.parse::<TicketStatus>()?,
        queue_id: row.get("queue_id"),
        user_id: row.get("user_id"),
        chatbot: row.get("chatbot"),
        menu: MenuPosition::from_option_id(row.get("queue_option_id")),
        last_message: row.get("last_message"),
        unread_messages: u32::try_from(unread).unwrap_or(0),
        is_group: row.get("is_group"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn message_from_row(row: &SqliteRow) -> Result<Message> {
    let origin: String = row.get("origin");
    Ok(Message {
        id: row.get("id"),
        external_id: row.get("external_id"),
        ticket_id: row.get("ticket_id"),
        contact_id: row.get("contact_id"),
        body: row.get("body"),
        origin: origin.parse::<MessageOrigin>()?,
        read: row.get("read"),
        ack: AckState::from_level(row.get("ack")),
        media_ref: row.get("media_ref"),
        media_type: row.get("media_type"),
        quoted_message_id: row.get("quoted_message_id"),
        created_at: row.get("created_at"),
    })
}

fn rating_from_row(row: &SqliteRow) -> UserRating {
    let score: Option<i64> = row.get("score");
    UserRating {
        id: row.get("id"),
        ticket_id: row.get("ticket_id"),
        user_id: row.get("user_id"),
        score: score.and_then(|s| u8::try_from(s).ok()),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn queue_from_row(row: &SqliteRow) -> Result<Queue> {
    let chooser: String = row.get("chooser");
    Ok(Queue {
        id: row.get("id"),
        name: row.get("name"),
        color: row.get("color"),
        greeting: row.get("greeting"),
        chooser: chooser_from_str(&chooser)?,
        media: media_from_json(row.get("media"))?,
    })
}

fn connection_from_row(row: &SqliteRow) -> Connection {
    Connection {
        id: row.get("id"),
        name: row.get("name"),
        greeting: row.get("greeting"),
        farewell: row.get("farewell"),
        rating_prompt: row.get("rating_prompt"),
        out_of_hours: row.get("out_of_hours"),
    }
}

/// Options ordered so every parent precedes its children.
fn parents_first(options: &[QueueOption]) -> Result<Vec<&QueueOption>> {
    let mut placed: HashSet<i64> = HashSet::new();
    let mut ordered = Vec::with_capacity(options.len());
    let mut remaining: Vec<&QueueOption> = options.iter().collect();

    while !remaining.is_empty() {
        let before = remaining.len();
        remaining.retain(|o| {
            let ready = o.parent_id.is_none_or(|p| placed.contains(&p));
            if ready {
                placed.insert(o.id);
                ordered.push(*o);
            }
            !ready
        });
        if remaining.len() == before {
            return Err(Error::message(format!(
                "option parents cannot be resolved: {:?}",
                remaining.iter().map(|o| o.id).collect::<Vec<_>>()
            )));
        }
    }
    Ok(ordered)
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn get_connection(&self, id: ConnectionId) -> Result<Option<Connection>> {
        let row = sqlx::query("SELECT * FROM connections WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(connection_from_row))
    }

    async fn list_connections(&self) -> Result<Vec<ConnectionEntry>> {
        let rows = sqlx::query("SELECT * FROM connections ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            let connection = connection_from_row(row);
            let queue_ids = sqlx::query(
                "SELECT queue_id FROM connection_queues WHERE connection_id = ? ORDER BY position",
            )
            .bind(connection.id)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|r| r.get::<i64, _>("queue_id"))
            .collect();
            entries.push(ConnectionEntry {
                connection,
                queue_ids,
            });
        }
        Ok(entries)
    }

    async fn queues_for_connection(&self, id: ConnectionId) -> Result<Vec<Queue>> {
        let rows = sqlx::query(
            "SELECT q.* FROM queues q
             JOIN connection_queues cq ON cq.queue_id = q.id
             WHERE cq.connection_id = ?
             ORDER BY cq.position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(queue_from_row).collect()
    }

    async fn get_queue(&self, id: QueueId) -> Result<Option<Queue>> {
        let row = sqlx::query("SELECT * FROM queues WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(queue_from_row).transpose()
    }

    async fn queue_options(&self, queue_id: QueueId) -> Result<Vec<QueueOption>> {
        let rows = sqlx::query("SELECT * FROM queue_options WHERE queue_id = ? ORDER BY id")
            .bind(queue_id)
            .fetch_all(&self.pool)
            .await?;

        let mut options = Vec::with_capacity(rows.len());
        for row in &rows {
            let chooser: String = row.get("chooser");
            options.push(QueueOption {
                id: row.get("id"),
                queue_id: row.get("queue_id"),
                parent_id: row.get("parent_id"),
                ordinal: row.get("ordinal"),
                title: row.get("title"),
                message: row.get("message"),
                chooser: chooser_from_str(&chooser)?,
                media: media_from_json(row.get("media"))?,
                finalize: row.get("finalize"),
            });
        }
        Ok(options)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("value")))
    }

    async fn replace_catalog(&self, catalog: &Catalog) -> Result<()> {
        let options = parents_first(&catalog.options)?;
        let mut tx = self.pool.begin().await?;

        for table in [
            "queue_options",
            "connection_queues",
            "queues",
            "connections",
            "settings",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }

        for queue in &catalog.queues {
            sqlx::query(
                "INSERT INTO queues (id, name, color, greeting, chooser, media)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(queue.id)
            .bind(&queue.name)
            .bind(&queue.color)
            .bind(&queue.greeting)
            .bind(queue.chooser.as_str())
            .bind(media_to_json(queue.media.as_ref())?)
            .execute(&mut *tx)
            .await?;
        }

        for entry in &catalog.connections {
            let c = &entry.connection;
            sqlx::query(
                "INSERT INTO connections (id, name, greeting, farewell, rating_prompt, out_of_hours)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(c.id)
            .bind(&c.name)
            .bind(&c.greeting)
            .bind(&c.farewell)
            .bind(&c.rating_prompt)
            .bind(&c.out_of_hours)
            .execute(&mut *tx)
            .await?;

            for (position, queue_id) in entry.queue_ids.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO connection_queues (connection_id, queue_id, position)
                     VALUES (?, ?, ?)",
                )
                .bind(c.id)
                .bind(queue_id)
                .bind(position as i64)
                .execute(&mut *tx)
                .await?;
            }
        }

        for option in options {
            sqlx::query(
                "INSERT INTO queue_options
                   (id, queue_id, parent_id, ordinal, title, message, chooser, media, finalize)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(option.id)
            .bind(option.queue_id)
            .bind(option.parent_id)
            .bind(&option.ordinal)
            .bind(&option.title)
            .bind(&option.message)
            .bind(option.chooser.as_str())
            .bind(media_to_json(option.media.as_ref())?)
            .bind(option.finalize)
            .execute(&mut *tx)
            .await?;
        }

        for (key, value) in &catalog.settings {
            sqlx::query("INSERT INTO settings (key, value) VALUES (?, ?)")
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl TicketStore for SqliteStore {
    async fn upsert_contact(&self, sender: &SenderIdentity) -> Result<Contact> {
        let now = now_ms();
        let row = sqlx::query(
            "INSERT INTO contacts (external_id, name, avatar_url, is_group, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(external_id) DO UPDATE SET
               name       = COALESCE(?, contacts.name),
               avatar_url = COALESCE(excluded.avatar_url, contacts.avatar_url),
               updated_at = excluded.updated_at
             RETURNING *",
        )
        .bind(&sender.external_id)
        .bind(sender.display_name())
        .bind(&sender.avatar_url)
        .bind(sender.is_group)
        .bind(now)
        .bind(now)
        .bind(sender.name.as_deref().filter(|n| !n.trim().is_empty()))
        .fetch_one(&self.pool)
        .await?;
        Ok(contact_from_row(&row))
    }

    async fn get_contact(&self, id: ContactId) -> Result<Option<Contact>> {
        let row = sqlx::query("SELECT * FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(contact_from_row))
    }

    async fn find_active_ticket(
        &self,
        contact_id: ContactId,
        connection_id: ConnectionId,
        is_group: bool,
    ) -> Result<Option<Ticket>> {
        let row = sqlx::query(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets
             WHERE contact_id = ? AND connection_id = ? AND is_group = ? AND status != 'closed'
             ORDER BY id DESC LIMIT 1"
        ))
        .bind(contact_id)
        .bind(connection_id)
        .bind(is_group)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(ticket_from_row).transpose()
    }

    async fn create_ticket(&self, new: &NewTicket) -> Result<Ticket> {
        if let Some(existing) = self
            .find_active_ticket(new.contact_id, new.connection_id, new.is_group)
            .await?
        {
            return Err(Error::conflict(format!(
                "contact {} already has active ticket {}",
                new.contact_id, existing.id
            )));
        }

        let now = now_ms();
        let result = sqlx::query(
            "INSERT INTO tickets
               (uuid, contact_id, connection_id, status, chatbot, unread_messages, is_group,
                created_at, updated_at)
             VALUES (?, ?, ?, ?, 0, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(new.contact_id)
        .bind(new.connection_id)
        .bind(new.status.as_str())
        .bind(i64::from(new.unread_messages))
        .bind(new.is_group)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await;

        let id = match result {
            Ok(done) => done.last_insert_rowid(),
            Err(e) if is_unique_violation(&e) => {
                return Err(Error::conflict(format!(
                    "contact {} already has an active ticket",
                    new.contact_id
                )));
            },
            Err(e) => return Err(e.into()),
        };

        self.fetch_ticket(id)
            .await?
            .ok_or_else(|| Error::ticket_not_found(id))
    }

    async fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>> {
        self.fetch_ticket(id).await
    }

    async fn save_ticket(&self, ticket: &Ticket) -> Result<Ticket> {
        let result = sqlx::query(
            "UPDATE tickets
             SET status = ?, queue_id = ?, user_id = ?, chatbot = ?, queue_option_id = ?,
                 updated_at = ?
             WHERE id = ?",
        )
        .bind(ticket.status.as_str())
        .bind(ticket.queue_id)
        .bind(ticket.user_id)
        .bind(ticket.chatbot)
        .bind(ticket.menu.option_id())
        .bind(now_ms())
        .bind(ticket.id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(Error::ticket_not_found(ticket.id)),
            Ok(_) => self
                .fetch_ticket(ticket.id)
                .await?
                .ok_or_else(|| Error::ticket_not_found(ticket.id)),
            Err(e) if is_unique_violation(&e) => Err(Error::conflict(format!(
                "contact {} already has another active ticket",
                ticket.contact_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_tickets(&self, status: Option<TicketStatus>) -> Result<Vec<Ticket>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets WHERE status = ?
                     ORDER BY updated_at DESC, id DESC"
                ))
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
            },
            None => {
                sqlx::query(&format!(
                    "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY updated_at DESC, id DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            },
        };
        rows.iter().map(ticket_from_row).collect()
    }

    async fn set_unread(&self, id: TicketId, unread: u32) -> Result<()> {
        sqlx::query("UPDATE tickets SET unread_messages = ? WHERE id = ?")
            .bind(i64::from(unread))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_last_message(&self, id: TicketId, body: &str) -> Result<()> {
        sqlx::query("UPDATE tickets SET last_message = ?, updated_at = ? WHERE id = ?")
            .bind(body)
            .bind(now_ms())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<Option<Message>> {
        let result = sqlx::query(
            "INSERT INTO messages
               (external_id, ticket_id, contact_id, body, origin, read, ack, media_ref,
                media_type, quoted_message_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(external_id) DO NOTHING",
        )
        .bind(&message.external_id)
        .bind(message.ticket_id)
        .bind(message.contact_id)
        .bind(&message.body)
        .bind(message.origin.as_str())
        .bind(message.read)
        .bind(message.ack.level())
        .bind(&message.media_ref)
        .bind(&message.media_type)
        .bind(message.quoted_message_id)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_message(&message.external_id).await
    }

    async fn find_message(&self, external_id: &str) -> Result<Option<Message>> {
        let row = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE external_id = ?"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(message_from_row).transpose()
    }

    async fn update_message_ack(
        &self,
        external_id: &str,
        ack: AckState,
    ) -> Result<Option<Message>> {
        let result = sqlx::query("UPDATE messages SET ack = ? WHERE external_id = ? AND ack < ?")
            .bind(ack.level())
            .bind(external_id)
            .bind(ack.level())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_message(external_id).await
    }

    async fn list_messages(&self, ticket_id: TicketId) -> Result<Vec<Message>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE ticket_id = ? ORDER BY id"
        ))
        .bind(ticket_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(message_from_row).collect()
    }

    async fn mark_messages_read(&self, ticket_id: TicketId) -> Result<u64> {
        let result = sqlx::query("UPDATE messages SET read = 1 WHERE ticket_id = ? AND read = 0")
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("UPDATE tickets SET unread_messages = 0 WHERE id = ?")
            .bind(ticket_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn find_or_create_pending_rating(
        &self,
        ticket_id: TicketId,
        user_id: Option<UserId>,
    ) -> Result<(UserRating, bool)> {
        let now = now_ms();
        let result = sqlx::query(
            "INSERT INTO user_ratings (ticket_id, user_id, score, created_at, updated_at)
             VALUES (?, ?, NULL, ?, ?)
             ON CONFLICT DO NOTHING",
        )
        .bind(ticket_id)
        .bind(user_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        let created = result.rows_affected() == 1;

        let rating = self
            .pending_rating(ticket_id)
            .await?
            .ok_or_else(|| Error::not_found("pending rating for ticket", ticket_id))?;
        Ok((rating, created))
    }

    async fn pending_rating(&self, ticket_id: TicketId) -> Result<Option<UserRating>> {
        self.fetch_rating(
            "SELECT * FROM user_ratings WHERE ticket_id = ? AND score IS NULL",
            ticket_id,
        )
        .await
    }

    async fn resolve_rating(&self, id: RatingId, score: u8) -> Result<Option<UserRating>> {
        let result = sqlx::query(
            "UPDATE user_ratings SET score = ?, updated_at = ? WHERE id = ? AND score IS NULL",
        )
        .bind(i64::from(score))
        .bind(now_ms())
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.fetch_rating("SELECT * FROM user_ratings WHERE id = ?", id)
            .await
    }
}
