//! SQL schema for the Pulse SQLite store.
//!
//! Executed once at connection startup. The column set mirrors the session
//! table the platform's own session-storage adapters use, so an existing
//! database can be pointed at directly.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS sessions (
    id             TEXT PRIMARY KEY,
    shop           TEXT NOT NULL,
    state          TEXT NOT NULL,
    is_online      INTEGER NOT NULL DEFAULT 0,
    scope          TEXT,
    expires        TEXT,             -- RFC 3339 UTC or NULL
    access_token   TEXT NOT NULL,
    -- Associated user, present only for online sessions.
    user_id        INTEGER,
    first_name     TEXT,
    last_name      TEXT,
    email          TEXT,
    account_owner  INTEGER NOT NULL DEFAULT 0,
    locale         TEXT,
    collaborator   INTEGER DEFAULT 0,
    email_verified INTEGER DEFAULT 0
);

CREATE INDEX IF NOT EXISTS sessions_shop_idx ON sessions(shop);

PRAGMA user_version = 1;
";
