use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use qcommon::{BoxFuture, ConversationId, MetadataMap, TurnId, UserId};
use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StoreError;
use crate::store::{ConversationStore, mint_id};
use crate::types::{Author, Conversation, NewConversation, Turn};

#[derive(Debug)]
pub struct SqliteConversationStore {
    connection: Mutex<Connection>,
}

impl SqliteConversationStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|error| {
                StoreError::storage(format!(
                    "failed to create sqlite parent directory: {error}"
                ))
            })?;
        }

        let connection = Connection::open(path).map_err(|error| {
            StoreError::storage(format!("failed to open sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    pub fn new_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(|error| {
            StoreError::storage(format!("failed to open in-memory sqlite database: {error}"))
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(connection: Connection) -> Result<Self, StoreError> {
        connection
            .busy_timeout(Duration::from_secs(5))
            .map_err(|error| {
                StoreError::storage(format!("failed to configure sqlite busy timeout: {error}"))
            })?;
        let store = Self {
            connection: Mutex::new(connection),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.connection
            .lock()
            .map_err(|_| StoreError::storage("sqlite store lock poisoned"))
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.connection()?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;

            CREATE TABLE IF NOT EXISTS conversations (
                conversation_id TEXT PRIMARY KEY,
                owner TEXT NOT NULL,
                title TEXT NOT NULL,
                created_at_secs INTEGER NOT NULL,
                created_at_nanos INTEGER NOT NULL,
                deleted_at_secs INTEGER,
                deleted_at_nanos INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_conversations_owner
            ON conversations(owner, created_at_secs);

            CREATE TABLE IF NOT EXISTS conversation_metadata (
                conversation_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (conversation_id, key)
            );

            CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                turn_id TEXT NOT NULL,
                conversation_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                author TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at_secs INTEGER NOT NULL,
                created_at_nanos INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_turns_conversation_seq
            ON turns(conversation_id, seq);
            ",
        )
        .map_err(|error| {
            StoreError::storage(format!("failed to initialize sqlite schema: {error}"))
        })?;

        Ok(())
    }

    /// Loads the tombstone state; `None` means the conversation row is
    /// entirely absent.
    fn load_tombstone(
        conn: &Connection,
        conversation_id: &ConversationId,
    ) -> Result<Option<bool>, StoreError> {
        conn.query_row(
            "SELECT deleted_at_secs IS NOT NULL FROM conversations WHERE conversation_id = ?1",
            params![conversation_id.as_str()],
            |row| row.get::<_, bool>(0),
        )
        .optional()
        .map_err(|error| {
            StoreError::storage(format!("failed to query conversation tombstone: {error}"))
        })
    }

    fn require_live(
        conn: &Connection,
        conversation_id: &ConversationId,
    ) -> Result<(), StoreError> {
        match Self::load_tombstone(conn, conversation_id)? {
            Some(false) => Ok(()),
            Some(true) | None => Err(StoreError::not_found(format!(
                "conversation '{conversation_id}' not found"
            ))),
        }
    }

    fn load_metadata(
        conn: &Connection,
        conversation_id: &ConversationId,
    ) -> Result<MetadataMap, StoreError> {
        let mut stmt = conn
            .prepare(
                "
                SELECT key, value
                FROM conversation_metadata
                WHERE conversation_id = ?1
                ORDER BY key ASC
                ",
            )
            .map_err(|error| {
                StoreError::storage(format!("failed to prepare metadata query: {error}"))
            })?;
        let rows = stmt
            .query_map(params![conversation_id.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|error| {
                StoreError::storage(format!("failed to query metadata rows: {error}"))
            })?;

        let mut metadata = MetadataMap::new();
        for pair in rows {
            let (key, value) = pair.map_err(|error| {
                StoreError::storage(format!("failed to read metadata row: {error}"))
            })?;
            metadata.insert(key, value);
        }

        Ok(metadata)
    }

    fn load_conversation_row(
        conn: &Connection,
        conversation_id: &ConversationId,
    ) -> Result<Option<Conversation>, StoreError> {
        let row = conn
            .query_row(
                "
                SELECT
                    owner,
                    title,
                    created_at_secs,
                    created_at_nanos,
                    deleted_at_secs,
                    deleted_at_nanos
                FROM conversations
                WHERE conversation_id = ?1
                ",
                params![conversation_id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(|error| {
                StoreError::storage(format!("failed to load conversation row: {error}"))
            })?;

        let Some((owner, title, created_secs, created_nanos, deleted_secs, deleted_nanos)) = row
        else {
            return Ok(None);
        };

        let deleted_at = match (deleted_secs, deleted_nanos) {
            (Some(secs), Some(nanos)) => Some(decode_system_time(secs, nanos)?),
            (None, None) => None,
            _ => {
                return Err(StoreError::storage(
                    "tombstone timestamp must include both seconds and nanos",
                ));
            }
        };

        Ok(Some(Conversation {
            id: conversation_id.clone(),
            owner: UserId::new(owner),
            title,
            metadata: Self::load_metadata(conn, conversation_id)?,
            created_at: decode_system_time(created_secs, created_nanos)?,
            deleted_at,
        }))
    }

    fn load_turn_rows(
        conn: &Connection,
        conversation_id: &ConversationId,
    ) -> Result<Vec<Turn>, StoreError> {
        let mut stmt = conn
            .prepare(
                "
                SELECT turn_id, author, body, created_at_secs, created_at_nanos
                FROM turns
                WHERE conversation_id = ?1
                ORDER BY seq ASC
                ",
            )
            .map_err(|error| {
                StoreError::storage(format!("failed to prepare turn query: {error}"))
            })?;
        let rows = stmt
            .query_map(params![conversation_id.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })
            .map_err(|error| StoreError::storage(format!("failed to query turn rows: {error}")))?;

        let mut turns = Vec::new();
        for row in rows {
            let (turn_id, author, body, created_secs, created_nanos) = row.map_err(|error| {
                StoreError::storage(format!("failed to read turn row: {error}"))
            })?;
            turns.push(Turn {
                id: TurnId::new(turn_id),
                conversation_id: conversation_id.clone(),
                author: author_from_str(&author)?,
                text: body,
                created_at: decode_system_time(created_secs, created_nanos)?,
            });
        }

        Ok(turns)
    }
}

impl ConversationStore for SqliteConversationStore {
    fn create_conversation<'a>(
        &'a self,
        request: NewConversation,
    ) -> BoxFuture<'a, Result<Conversation, StoreError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let conversation = Conversation {
                id: ConversationId::new(mint_id("conv")),
                owner: request.owner,
                title: request.title,
                metadata: request.metadata,
                created_at: SystemTime::now(),
                deleted_at: None,
            };
            let (created_secs, created_nanos) = encode_system_time(conversation.created_at)?;

            conn.execute(
                "
                INSERT INTO conversations (
                    conversation_id,
                    owner,
                    title,
                    created_at_secs,
                    created_at_nanos
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
                params![
                    conversation.id.as_str(),
                    conversation.owner.as_str(),
                    &conversation.title,
                    created_secs,
                    created_nanos,
                ],
            )
            .map_err(|error| {
                StoreError::storage(format!("failed to insert conversation row: {error}"))
            })?;

            for (key, value) in &conversation.metadata {
                conn.execute(
                    "
                    INSERT INTO conversation_metadata (conversation_id, key, value)
                    VALUES (?1, ?2, ?3)
                    ",
                    params![conversation.id.as_str(), key, value],
                )
                .map_err(|error| {
                    StoreError::storage(format!("failed to write metadata row: {error}"))
                })?;
            }

            Ok(conversation)
        })
    }

    fn get_conversation<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Conversation, StoreError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let conversation = Self::load_conversation_row(&conn, conversation_id)?
                .filter(|conversation| !conversation.is_deleted())
                .ok_or_else(|| {
                    StoreError::not_found(format!("conversation '{conversation_id}' not found"))
                })?;

            Ok(conversation)
        })
    }

    fn list_conversations<'a>(
        &'a self,
        owner: &'a UserId,
    ) -> BoxFuture<'a, Result<Vec<Conversation>, StoreError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            let mut stmt = conn
                .prepare(
                    "
                    SELECT conversation_id
                    FROM conversations
                    WHERE owner = ?1 AND deleted_at_secs IS NULL
                    ORDER BY created_at_secs ASC, created_at_nanos ASC
                    ",
                )
                .map_err(|error| {
                    StoreError::storage(format!("failed to prepare conversation query: {error}"))
                })?;
            let ids = stmt
                .query_map(params![owner.as_str()], |row| row.get::<_, String>(0))
                .map_err(|error| {
                    StoreError::storage(format!("failed to query conversation rows: {error}"))
                })?
                .collect::<Result<Vec<_>, _>>()
                .map_err(|error| {
                    StoreError::storage(format!("failed to read conversation row: {error}"))
                })?;

            let mut conversations = Vec::new();
            for id in ids {
                let conversation_id = ConversationId::new(id);
                if let Some(conversation) =
                    Self::load_conversation_row(&conn, &conversation_id)?
                {
                    conversations.push(conversation);
                }
            }

            Ok(conversations)
        })
    }

    fn append_turn<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
        author: Author,
        text: String,
    ) -> BoxFuture<'a, Result<Turn, StoreError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            Self::require_live(&conn, conversation_id)?;

            let turn = Turn {
                id: TurnId::new(mint_id("turn")),
                conversation_id: conversation_id.clone(),
                author,
                text,
                created_at: SystemTime::now(),
            };
            let (created_secs, created_nanos) = encode_system_time(turn.created_at)?;

            // The seq subquery and insert run under the connection lock, so
            // the per-conversation sequence stays gapless and monotonic.
            conn.execute(
                "
                INSERT INTO turns (
                    turn_id,
                    conversation_id,
                    seq,
                    author,
                    body,
                    created_at_secs,
                    created_at_nanos
                )
                VALUES (
                    ?1,
                    ?2,
                    (SELECT COALESCE(MAX(seq), 0) + 1 FROM turns WHERE conversation_id = ?2),
                    ?3,
                    ?4,
                    ?5,
                    ?6
                )
                ",
                params![
                    turn.id.as_str(),
                    conversation_id.as_str(),
                    author_to_str(author),
                    &turn.text,
                    created_secs,
                    created_nanos,
                ],
            )
            .map_err(|error| StoreError::storage(format!("failed to append turn: {error}")))?;

            Ok(turn)
        })
    }

    fn list_turns<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Vec<Turn>, StoreError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            Self::require_live(&conn, conversation_id)?;
            Self::load_turn_rows(&conn, conversation_id)
        })
    }

    fn list_turns_including_deleted<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<Vec<Turn>, StoreError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            if Self::load_tombstone(&conn, conversation_id)?.is_none() {
                return Err(StoreError::not_found(format!(
                    "conversation '{conversation_id}' not found"
                )));
            }

            Self::load_turn_rows(&conn, conversation_id)
        })
    }

    fn soft_delete<'a>(
        &'a self,
        conversation_id: &'a ConversationId,
    ) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let conn = self.connection()?;
            if Self::load_tombstone(&conn, conversation_id)?.is_none() {
                return Err(StoreError::not_found(format!(
                    "conversation '{conversation_id}' not found"
                )));
            }

            let (deleted_secs, deleted_nanos) = encode_system_time(SystemTime::now())?;
            conn.execute(
                "
                UPDATE conversations
                SET deleted_at_secs = ?2, deleted_at_nanos = ?3
                WHERE conversation_id = ?1 AND deleted_at_secs IS NULL
                ",
                params![conversation_id.as_str(), deleted_secs, deleted_nanos],
            )
            .map_err(|error| {
                StoreError::storage(format!("failed to tombstone conversation: {error}"))
            })?;

            Ok(())
        })
    }
}

fn encode_system_time(value: SystemTime) -> Result<(i64, i64), StoreError> {
    let duration = value.duration_since(UNIX_EPOCH).map_err(|error| {
        StoreError::invalid_request(format!("timestamp predates unix epoch: {error}"))
    })?;
    Ok((
        duration.as_secs() as i64,
        i64::from(duration.subsec_nanos()),
    ))
}

fn decode_system_time(seconds: i64, nanos: i64) -> Result<SystemTime, StoreError> {
    if seconds < 0 {
        return Err(StoreError::storage(format!(
            "timestamp seconds must be non-negative, got {seconds}"
        )));
    }
    if !(0..1_000_000_000).contains(&nanos) {
        return Err(StoreError::storage(format!(
            "timestamp nanos must be in [0, 1_000_000_000), got {nanos}"
        )));
    }
    Ok(UNIX_EPOCH + Duration::new(seconds as u64, nanos as u32))
}

fn author_to_str(author: Author) -> &'static str {
    match author {
        Author::User => "user",
        Author::Assistant => "assistant",
    }
}

fn author_from_str(value: &str) -> Result<Author, StoreError> {
    match value {
        "user" => Ok(Author::User),
        "assistant" => Ok(Author::Assistant),
        _ => Err(StoreError::storage(format!(
            "unknown turn author value '{value}'"
        ))),
    }
}

pub(crate) fn default_sqlite_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os("QUILL_SQLITE_PATH") {
        return PathBuf::from(explicit);
    }

    if let Some(home) = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE")) {
        return PathBuf::from(home).join(".quill").join("qstore.sqlite3");
    }

    PathBuf::from("qstore.sqlite3")
}
