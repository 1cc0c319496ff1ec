//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the catalog database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Catalog records, keyed by the external identifier
CREATE TABLE IF NOT EXISTS titles (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    kind TEXT NOT NULL,
    release_year TEXT NOT NULL,
    rating INTEGER NOT NULL,
    popularity INTEGER NOT NULL,
    poster_url TEXT NOT NULL,
    synopsis TEXT,
    nudity INTEGER NOT NULL,
    violence INTEGER NOT NULL,
    profanity INTEGER NOT NULL,
    substance INTEGER NOT NULL,
    fear INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_titles_kind ON titles(kind);
CREATE INDEX IF NOT EXISTS idx_titles_order ON titles(popularity DESC, rating DESC);

-- Genre membership per title
CREATE TABLE IF NOT EXISTS title_genres (
    title_id TEXT NOT NULL REFERENCES titles(id) ON DELETE CASCADE,
    genre TEXT NOT NULL,
    PRIMARY KEY (title_id, genre)
);

CREATE INDEX IF NOT EXISTS idx_title_genres_genre ON title_genres(genre);

-- Every genre ever observed; rows are only ever added
CREATE TABLE IF NOT EXISTS genre_index (
    genre TEXT PRIMARY KEY
);

-- Single-row crawl cursor
CREATE TABLE IF NOT EXISTS crawl_cursor (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    partition TEXT NOT NULL,
    position INTEGER NOT NULL,
    backoff INTEGER NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
