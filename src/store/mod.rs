mod schema;
mod sqlite;

pub use schema::{DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME};
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Every call acquires its own connection and releases it before returning,
/// so implementations carry no shared connection state between calls.
pub trait Store: Send + Sync {
    /// Creates the schema and seeds the default admin row.
    /// Returns `true` if the admin row was inserted by this call.
    fn initialize(&self) -> Result<bool>;

    // Credential checks
    fn verify_admin(&self, username: &str, password: &str) -> Result<bool>;
    fn verify_user(&self, regno: &str, teamno: &str) -> Result<bool>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, regno: &str) -> Result<Option<User>>;
    fn count_users(&self) -> Result<i64>;

    // Score operations (append-only)
    fn add_score(&self, score: &Score) -> Result<()>;
    fn list_scores(&self) -> Result<Vec<Score>>;

    // Certificate pointer operations
    /// Points `cert.regno` at `cert.filename`, returning the filename it
    /// pointed at before, if any.
    fn upsert_certificate(&self, cert: &Certificate) -> Result<Option<String>>;
    fn get_certificate(&self, regno: &str) -> Result<Option<Certificate>>;
}
