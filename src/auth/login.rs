use crate::error::Result;
use crate::store::Store;

/// Result of checking a submitted identifier/secret pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Admin,
    User { regno: String },
    Invalid,
}

/// Checks the admin table first, then the users table (`regno` + `teamno`).
///
/// No session is issued: callers hand the regno back to the client, which
/// presents it again on later requests.
pub fn authenticate(store: &dyn Store, username: &str, password: &str) -> Result<LoginOutcome> {
    if store.verify_admin(username, password)? {
        return Ok(LoginOutcome::Admin);
    }

    if store.verify_user(username, password)? {
        return Ok(LoginOutcome::User {
            regno: username.to_string(),
        });
    }

    Ok(LoginOutcome::Invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;
    use crate::types::User;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::new(temp_dir.path().join("test.db")).unwrap();
        store.initialize().unwrap();
        store
            .create_user(&User {
                regno: "R1".to_string(),
                name: "Ada".to_string(),
                teamname: "Alpha".to_string(),
                teamno: "T1".to_string(),
                email: "ada@example.com".to_string(),
            })
            .unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_seeded_admin_logs_in() {
        let (_dir, store) = test_store();
        assert_eq!(
            authenticate(&store, "admin", "admin123").unwrap(),
            LoginOutcome::Admin
        );
    }

    #[test]
    fn test_user_logs_in_with_teamno() {
        let (_dir, store) = test_store();
        assert_eq!(
            authenticate(&store, "R1", "T1").unwrap(),
            LoginOutcome::User {
                regno: "R1".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_pairs_are_rejected() {
        let (_dir, store) = test_store();
        assert_eq!(
            authenticate(&store, "admin", "T1").unwrap(),
            LoginOutcome::Invalid
        );
        assert_eq!(
            authenticate(&store, "R1", "admin123").unwrap(),
            LoginOutcome::Invalid
        );
        assert_eq!(authenticate(&store, "", "").unwrap(), LoginOutcome::Invalid);
    }

    #[test]
    fn test_admin_table_wins_over_user_table() {
        let (_dir, store) = test_store();
        store
            .create_user(&User {
                regno: "admin".to_string(),
                name: "Shadow".to_string(),
                teamname: "Shadow".to_string(),
                teamno: "admin123".to_string(),
                email: String::new(),
            })
            .unwrap();

        assert_eq!(
            authenticate(&store, "admin", "admin123").unwrap(),
            LoginOutcome::Admin
        );
    }
}
