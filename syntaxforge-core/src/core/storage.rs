use crate::{ForgeError, Result, Session};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Key under which the session snapshot is stored.
pub const STORAGE_KEY: &str = "syntaxforge_data";

/// A small SQLite-backed key-value store holding the session snapshot.
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Opens (creating if needed) the store at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Loads the last saved session.
    ///
    /// A missing or unreadable snapshot yields an empty session rather than
    /// an error, so a corrupt store never prevents startup. A snapshot that
    /// parses but fails the integrity check is still returned, with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`ForgeError::Database`] only if the store itself cannot be read.
    pub fn load_session(&self) -> Result<Session> {
        let Some(raw) = self.get(STORAGE_KEY)? else {
            log::debug!("no saved session, starting empty");
            return Ok(Session::new());
        };
        let session: Session = match serde_json::from_str(&raw) {
            Ok(session) => session,
            Err(e) => {
                log::error!("discarding unreadable session snapshot: {e}");
                return Ok(Session::new());
            }
        };
        if let Err(e) = session.verify_integrity() {
            log::warn!("loaded session has integrity problems: {e}");
        }
        log::info!(
            "loaded {} workspaces with {} nodes",
            session.workspaces().len(),
            session.node_count()
        );
        Ok(session)
    }

    /// Writes `session` as the current snapshot, replacing any previous one.
    pub fn save_session(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session).map_err(ForgeError::Json)?;
        self.set(STORAGE_KEY, &json)?;
        log::debug!("saved session snapshot ({} bytes)", json.len());
        Ok(())
    }
}
