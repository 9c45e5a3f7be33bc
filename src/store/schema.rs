pub const SCHEMA: &str = r#"
-- Admin credentials; plaintext, seeded once
CREATE TABLE IF NOT EXISTS admin (
    username TEXT PRIMARY KEY,
    password TEXT
);

-- Registered team members; teamno doubles as the login secret
CREATE TABLE IF NOT EXISTS users (
    regno TEXT PRIMARY KEY,
    name TEXT,
    teamname TEXT,
    teamno TEXT,
    email TEXT
);

-- Append-only leaderboard; no uniqueness per team
CREATE TABLE IF NOT EXISTS scores (
    teamno TEXT,
    teamname TEXT,
    score INTEGER
);

-- One certificate blob pointer per registrant
CREATE TABLE IF NOT EXISTS certificates (
    regno TEXT PRIMARY KEY,
    filename TEXT
);
"#;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
