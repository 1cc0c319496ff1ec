//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CatalogStore trait.

use crate::catalog::{
    Advisory, AdvisoryCategory, CatalogRecord, TitleType, RESERVED_IDS,
};
use crate::query::QuerySpec;
use crate::state::{CrawlCursor, Partition};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{
    CatalogStore, SearchPage, StorageError, StorageResult, UpsertOutcome,
};
use crate::MarqueeError;
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Column list shared by every record query; `t` aliases `titles`
const TITLE_COLUMNS: &str = "t.id, t.title, t.kind, t.release_year, t.rating, t.popularity, \
     t.poster_url, t.synopsis, t.nudity, t.violence, t.profanity, t.substance, t.fear";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(MarqueeError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, MarqueeError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    ///
    /// Used by tests and one-off tooling; nothing is persisted.
    pub fn new_in_memory() -> Result<Self, MarqueeError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Merges genres into the genre index, writing only when something is new
    fn merge_genres(&mut self, genres: &BTreeSet<String>) -> StorageResult<usize> {
        let known = self.genre_index()?;
        let missing: Vec<&String> = genres.iter().filter(|g| !known.contains(*g)).collect();
        if missing.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare("INSERT OR IGNORE INTO genre_index (genre) VALUES (?1)")?;
            for genre in &missing {
                stmt.execute(params![genre])?;
            }
        }
        tx.commit()?;

        Ok(missing.len())
    }

    fn load_genres(&self, id: &str) -> StorageResult<BTreeSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT genre FROM title_genres WHERE title_id = ?1")?;
        let genres = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(genres)
    }

    fn hydrate(&self, row: TitleRow) -> StorageResult<CatalogRecord> {
        let genres = self.load_genres(&row.id)?;
        row.into_record(genres)
    }
}

/// Raw `titles` row, converted to a record once genres are loaded
struct TitleRow {
    id: String,
    title: String,
    kind: String,
    release_year: String,
    rating: u8,
    popularity: i64,
    poster_url: String,
    synopsis: Option<String>,
    advisory: Advisory,
}

impl TitleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            kind: row.get(2)?,
            release_year: row.get(3)?,
            rating: row.get(4)?,
            popularity: row.get(5)?,
            poster_url: row.get(6)?,
            synopsis: row.get(7)?,
            advisory: Advisory {
                nudity: row.get(8)?,
                violence: row.get(9)?,
                profanity: row.get(10)?,
                substance: row.get(11)?,
                fear: row.get(12)?,
            },
        })
    }

    fn into_record(self, genres: BTreeSet<String>) -> StorageResult<CatalogRecord> {
        let kind = TitleType::from_db_string(&self.kind).ok_or_else(|| {
            StorageError::CorruptRecord {
                id: self.id.clone(),
                message: format!("unknown title type '{}'", self.kind),
            }
        })?;

        Ok(CatalogRecord {
            id: self.id,
            title: self.title,
            kind,
            release_year: self.release_year,
            genres,
            rating: self.rating,
            popularity: u64::try_from(self.popularity).unwrap_or(0),
            poster_url: self.poster_url,
            synopsis: self.synopsis,
            advisory: self.advisory,
        })
    }
}

/// Builds the WHERE clause for a query spec
///
/// Only fixed SQL fragments are interpolated; every caller-supplied value is
/// returned as a bound parameter in placeholder order.
fn build_filter(spec: &QuerySpec) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();

    for id in RESERVED_IDS {
        clauses.push("t.id <> ?".to_string());
        values.push(Value::Text(id.to_string()));
    }

    clauses.push("t.kind = ?".to_string());
    values.push(Value::Text(spec.kind.clone()));

    for genre in &spec.all_genres {
        clauses.push(
            "EXISTS (SELECT 1 FROM title_genres g WHERE g.title_id = t.id AND g.genre = ?)"
                .to_string(),
        );
        values.push(Value::Text(genre.clone()));
    }

    for genre in &spec.excluded_genres {
        clauses.push(
            "NOT EXISTS (SELECT 1 FROM title_genres g WHERE g.title_id = t.id AND g.genre = ?)"
                .to_string(),
        );
        values.push(Value::Text(genre.clone()));
    }

    for (category, ceiling) in &spec.ceilings {
        clauses.push(format!("t.{} <= ?", advisory_column(*category)));
        values.push(Value::Integer(i64::from(*ceiling)));
    }

    for term in &spec.title_terms {
        clauses.push("t.title LIKE ? ESCAPE '\\'".to_string());
        values.push(Value::Text(format!("%{}%", escape_like(term))));
    }

    (clauses.join(" AND "), values)
}

fn advisory_column(category: AdvisoryCategory) -> &'static str {
    match category {
        AdvisoryCategory::Nudity => "nudity",
        AdvisoryCategory::Violence => "violence",
        AdvisoryCategory::Profanity => "profanity",
        AdvisoryCategory::Substance => "substance",
        AdvisoryCategory::Fear => "fear",
    }
}

/// Escapes LIKE wildcards so a term only matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl CatalogStore for SqliteStorage {
    // ===== Records =====

    fn upsert_record(&mut self, record: &CatalogRecord) -> StorageResult<UpsertOutcome> {
        let now = Utc::now().to_rfc3339();
        let popularity = i64::try_from(record.popularity).unwrap_or(i64::MAX);

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO titles (id, title, kind, release_year, rating, popularity, poster_url,
                synopsis, nudity, violence, profanity, substance, fear, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                kind = excluded.kind,
                release_year = excluded.release_year,
                rating = excluded.rating,
                popularity = excluded.popularity,
                poster_url = excluded.poster_url,
                synopsis = excluded.synopsis,
                nudity = excluded.nudity,
                violence = excluded.violence,
                profanity = excluded.profanity,
                substance = excluded.substance,
                fear = excluded.fear,
                updated_at = excluded.updated_at",
            params![
                record.id,
                record.title,
                record.kind.to_db_string(),
                record.release_year,
                record.rating,
                popularity,
                record.poster_url,
                record.synopsis,
                record.advisory.nudity,
                record.advisory.violence,
                record.advisory.profanity,
                record.advisory.substance,
                record.advisory.fear,
                now,
            ],
        )?;
        tx.execute(
            "DELETE FROM title_genres WHERE title_id = ?1",
            params![record.id],
        )?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO title_genres (title_id, genre) VALUES (?1, ?2)")?;
            for genre in &record.genres {
                stmt.execute(params![record.id, genre])?;
            }
        }
        tx.commit()?;

        match self.merge_genres(&record.genres) {
            Ok(added) => Ok(UpsertOutcome {
                genres_added: added,
                genre_index_synced: true,
            }),
            Err(e) => {
                tracing::warn!(
                    "Record {} stored but genre index update failed: {}",
                    record.id,
                    e
                );
                Ok(UpsertOutcome {
                    genres_added: 0,
                    genre_index_synced: false,
                })
            }
        }
    }

    fn get_record(&self, id: &str) -> StorageResult<Option<CatalogRecord>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {} FROM titles t WHERE t.id = ?1", TITLE_COLUMNS),
                params![id],
                TitleRow::from_row,
            )
            .optional()?;

        row.map(|r| self.hydrate(r)).transpose()
    }

    fn search(&self, spec: &QuerySpec, skip: u32, limit: u32) -> StorageResult<SearchPage> {
        let (filter, values) = build_filter(spec);

        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM titles t WHERE {}", filter),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let mut page_values = values;
        page_values.push(Value::Integer(i64::from(limit)));
        page_values.push(Value::Integer(i64::from(skip)));

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM titles t WHERE {}
             ORDER BY t.popularity DESC, t.rating DESC, t.id ASC
             LIMIT ? OFFSET ?",
            TITLE_COLUMNS, filter
        ))?;
        let rows = stmt
            .query_map(params_from_iter(page_values.iter()), TitleRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let items = rows
            .into_iter()
            .map(|row| self.hydrate(row))
            .collect::<StorageResult<Vec<_>>>()?;

        Ok(SearchPage {
            count: count as u64,
            items,
            genres: self.genre_index()?.into_iter().collect(),
        })
    }

    // ===== Genre Index =====

    fn genre_index(&self) -> StorageResult<BTreeSet<String>> {
        let mut stmt = self.conn.prepare("SELECT genre FROM genre_index")?;
        let genres = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(genres)
    }

    fn reconcile_genre_index(&mut self) -> StorageResult<usize> {
        let added = self.conn.execute(
            "INSERT OR IGNORE INTO genre_index (genre) SELECT DISTINCT genre FROM title_genres",
            [],
        )?;
        Ok(added)
    }

    // ===== Crawl Cursor =====

    fn read_cursor(&self) -> StorageResult<Option<CrawlCursor>> {
        let raw: Option<(String, i64, i64)> = self
            .conn
            .query_row(
                "SELECT partition, position, backoff FROM crawl_cursor WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((partition, position, backoff)) = raw else {
            return Ok(None);
        };

        let partition = Partition::from_db_string(&partition).ok_or_else(|| {
            StorageError::CorruptCursor(format!("unknown partition '{}'", partition))
        })?;
        let position = u32::try_from(position)
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| StorageError::CorruptCursor(format!("invalid position {}", position)))?;
        let backoff = u32::try_from(backoff)
            .map_err(|_| StorageError::CorruptCursor(format!("invalid backoff {}", backoff)))?;

        Ok(Some(CrawlCursor::new(partition, position, backoff)))
    }

    fn write_cursor(&mut self, cursor: &CrawlCursor) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO crawl_cursor (id, partition, position, backoff, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                cursor.partition.to_db_string(),
                cursor.position,
                cursor.backoff,
                now
            ],
        )?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_records(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM titles WHERE id NOT IN (?1, ?2)",
            params![RESERVED_IDS[0], RESERVED_IDS[1]],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_records_by_type(&self) -> StorageResult<HashMap<TitleType, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT kind, COUNT(*) FROM titles WHERE id NOT IN (?1, ?2) GROUP BY kind",
        )?;

        let rows = stmt.query_map(params![RESERVED_IDS[0], RESERVED_IDS[1]], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (kind, count) = row?;
            if let Some(kind) = TitleType::from_db_string(&kind) {
                counts.insert(kind, count as u64);
            }
        }

        Ok(counts)
    }
}
