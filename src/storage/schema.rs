//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Follow-Ripple database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per login a follow was issued for
CREATE TABLE IF NOT EXISTS followed (
    login TEXT PRIMARY KEY NOT NULL,
    followed_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_followed_at ON followed(followed_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
