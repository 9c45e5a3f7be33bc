use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, OptionalExtension, params};

use super::Store;
use super::schema::{DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME, SCHEMA};
use crate::error::{Error, Result};
use crate::types::*;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// SQLite-backed store that opens a fresh connection for every operation.
pub struct SqliteStore {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let store = Self {
            db_path: db_path.as_ref().to_path_buf(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        };

        // Fail early on an unopenable path rather than on the first request.
        store.connect()?;
        Ok(store)
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Opens a connection scoped to the caller. Dropping it closes it.
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<bool> {
        let conn = self.connect()?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)?;

        let seeded = conn.execute(
            "INSERT OR IGNORE INTO admin (username, password) VALUES (?1, ?2)",
            params![DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD],
        )?;
        Ok(seeded > 0)
    }

    // Credential checks

    fn verify_admin(&self, username: &str, password: &str) -> Result<bool> {
        let conn = self.connect()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM admin WHERE username = ?1 AND password = ?2",
                params![username, password],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn verify_user(&self, regno: &str, teamno: &str) -> Result<bool> {
        let conn = self.connect()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM users WHERE regno = ?1 AND teamno = ?2",
                params![regno, teamno],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.connect()?.execute(
            "INSERT INTO users (regno, name, teamname, teamno, email)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![user.regno, user.name, user.teamname, user.teamno, user.email],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::AlreadyExists)
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, regno: &str) -> Result<Option<User>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT regno, name, teamname, teamno, email FROM users WHERE regno = ?1",
            params![regno],
            |row| {
                Ok(User {
                    regno: row.get(0)?,
                    name: row.get(1)?,
                    teamname: row.get(2)?,
                    teamno: row.get(3)?,
                    email: row.get(4)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    fn count_users(&self) -> Result<i64> {
        let conn = self.connect()?;
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .map_err(Error::from)
    }

    // Score operations

    fn add_score(&self, score: &Score) -> Result<()> {
        self.connect()?.execute(
            "INSERT INTO scores (teamno, teamname, score) VALUES (?1, ?2, ?3)",
            params![score.teamno, score.teamname, score.score],
        )?;
        Ok(())
    }

    fn list_scores(&self) -> Result<Vec<Score>> {
        let conn = self.connect()?;
        let mut stmt =
            conn.prepare("SELECT teamno, teamname, score FROM scores ORDER BY score DESC")?;

        let rows = stmt.query_map([], |row| {
            Ok(Score {
                teamno: row.get(0)?,
                teamname: row.get(1)?,
                score: row.get(2)?,
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Certificate pointer operations

    fn upsert_certificate(&self, cert: &Certificate) -> Result<Option<String>> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let previous: Option<String> = tx
            .query_row(
                "SELECT filename FROM certificates WHERE regno = ?1",
                params![cert.regno],
                |row| row.get(0),
            )
            .optional()?;

        tx.execute(
            "INSERT INTO certificates (regno, filename) VALUES (?1, ?2)
             ON CONFLICT(regno) DO UPDATE SET filename = excluded.filename",
            params![cert.regno, cert.filename],
        )?;
        tx.commit()?;

        Ok(previous)
    }

    fn get_certificate(&self, regno: &str) -> Result<Option<Certificate>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT regno, filename FROM certificates WHERE regno = ?1",
            params![regno],
            |row| {
                Ok(Certificate {
                    regno: row.get(0)?,
                    filename: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}
