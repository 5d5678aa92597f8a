//! # SQLite
//!
//! Document-style storage for listings and users.
//!
//! ## Schema
//!
//! - `listings`: `seq` (insertion order), `id` (24 hex characters) and the JSON
//!   `document` without its `_id`
//! - `users`: username, optional email, password hash, role and creation time
//!
//! ## Connections
//!
//! A fixed set of connections is opened up front. Each call checks one out
//! through a guard that hands it back when dropped, so a connection returns to
//! the pool on success, error and timeout alike.
//!
//! ## Time limits
//!
//! Listing queries install a progress handler that interrupts the statement
//! once the deadline passes; SQLite then fails the query with
//! `SQLITE_INTERRUPT`, reported as [`StoreError::Timeout`].
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use classifieds_core::listing::{Listing, ListingId, Projection};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;

use super::{split_document, ListingQuery, ListingStore, StoreError, UserRecord, UserStore};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS listings (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    document TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    email TEXT UNIQUE,
    password TEXT NOT NULL,
    role TEXT,
    created_at TEXT NOT NULL
);
";

/// Rows whose id is not 24 hex characters are invisible to counts and windows
const COUNT_LISTINGS: &str = "SELECT COUNT(*) FROM listings \
     WHERE length(id) = 24 AND lower(id) NOT GLOB '*[^0-9a-f]*'";
const WINDOW_LISTINGS: &str = "SELECT id, document FROM listings \
     WHERE length(id) = 24 AND lower(id) NOT GLOB '*[^0-9a-f]*' \
     ORDER BY seq DESC LIMIT ?1 OFFSET ?2";

pub const DEFAULT_POOL_SIZE: usize = 4;

/// How long a call waits for a free connection
const CHECKOUT_WAIT: Duration = Duration::from_secs(5);

/// Statements between two deadline checks
const PROGRESS_INTERVAL: i32 = 1_000;

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Unavailable("connection pool lock poisoned".to_string())
}

fn database_error(err: rusqlite::Error, time_limit: Option<Duration>) -> StoreError {
    match (err.sqlite_error_code(), time_limit) {
        (Some(ErrorCode::OperationInterrupted), Some(limit)) => StoreError::Timeout(limit),
        (Some(ErrorCode::ConstraintViolation), _) => StoreError::Duplicate(err.to_string()),
        (Some(ErrorCode::CannotOpen | ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked), _) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Database(err),
    }
}

struct ConnectionPool {
    idle: Mutex<Vec<Connection>>,
    available: Condvar,
}

impl ConnectionPool {
    fn open(path: &Path, size: usize) -> Result<Self, StoreError> {
        let mut connections = Vec::with_capacity(size.max(1));

        for _ in 0..size.max(1) {
            let conn = Connection::open(path).map_err(|e| database_error(e, None))?;
            conn.busy_timeout(Duration::from_secs(5))
                .map_err(|e| database_error(e, None))?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })
            .map_err(|e| database_error(e, None))?;
            connections.push(conn);
        }

        Ok(Self {
            idle: Mutex::new(connections),
            available: Condvar::new(),
        })
    }

    fn checkout(&self, wait: Duration) -> Result<PooledConnection<'_>, StoreError> {
        let deadline = Instant::now() + wait;
        let mut idle = self.idle.lock().map_err(poisoned)?;

        loop {
            if let Some(conn) = idle.pop() {
                return Ok(PooledConnection {
                    pool: self,
                    conn: Some(conn),
                });
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(StoreError::Timeout(wait));
            }

            let (guard, _) = self
                .available
                .wait_timeout(idle, deadline - now)
                .map_err(poisoned)?;
            idle = guard;
        }
    }

    fn checkin(&self, conn: Connection) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        idle.push(conn);
        self.available.notify_one();
    }
}

struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only emptied by Drop
        self.conn.as_ref().expect("pooled connection already returned")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("pooled connection already returned")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.checkin(conn);
        }
    }
}

/// Interrupts statements on a connection once `deadline` passes
///
/// The handler is removed again when the guard drops.
struct DeadlineGuard<'c> {
    conn: &'c Connection,
}

impl<'c> DeadlineGuard<'c> {
    fn install(conn: &'c Connection, time_limit: Duration) -> Self {
        let deadline = Instant::now() + time_limit;
        conn.progress_handler(PROGRESS_INTERVAL, Some(move || Instant::now() >= deadline));
        Self { conn }
    }
}

impl Drop for DeadlineGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

pub struct SqliteStore {
    path: PathBuf,
    pool: ConnectionPool,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>, pool_size: usize) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let pool = ConnectionPool::open(&path, pool_size)?;

        {
            let conn = pool.checkout(CHECKOUT_WAIT)?;
            conn.execute_batch(SCHEMA)
                .map_err(|e| database_error(e, None))?;
        }

        Ok(Self { path, pool })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn listing_from_row(id: String, document: String, projection: Projection) -> Option<Listing> {
        let id = match ListingId::parse(&id) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Skipping listing with unusable id {id:?}: {e}");
                return None;
            }
        };

        let document: Value = serde_json::from_str(&document).unwrap_or_else(|e| {
            log::warn!("Listing {id} has an unreadable document, showing defaults: {e}");
            Value::Null
        });

        Some(Listing::from_document(id, &document, projection))
    }
}

impl ListingStore for SqliteStore {
    fn count(&self) -> Result<u64, StoreError> {
        let conn = self.pool.checkout(CHECKOUT_WAIT)?;

        let count: i64 = conn
            .query_row(COUNT_LISTINGS, [], |row| row.get(0))
            .map_err(|e| database_error(e, None))?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    fn query(&self, query: &ListingQuery) -> Result<Vec<Listing>, StoreError> {
        let conn = self.pool.checkout(CHECKOUT_WAIT.min(query.time_limit))?;
        let _deadline = DeadlineGuard::install(&conn, query.time_limit);
        let fail = |e| database_error(e, Some(query.time_limit));

        let mut stmt = conn
            .prepare(WINDOW_LISTINGS)
            .map_err(fail)?;

        let rows = stmt
            .query_map(
                params![
                    i64::try_from(query.limit).unwrap_or(i64::MAX),
                    i64::try_from(query.skip).unwrap_or(i64::MAX)
                ],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .map_err(fail)?;

        let mut listings = Vec::new();
        for row in rows {
            let (id, document) = row.map_err(fail)?;
            listings.extend(Self::listing_from_row(id, document, query.projection));
        }

        Ok(listings)
    }

    fn find(
        &self,
        id: &ListingId,
        projection: Projection,
        time_limit: Duration,
    ) -> Result<Option<Listing>, StoreError> {
        let conn = self.pool.checkout(CHECKOUT_WAIT.min(time_limit))?;
        let _deadline = DeadlineGuard::install(&conn, time_limit);

        let row = conn
            .query_row(
                "SELECT id, document FROM listings WHERE id = ?1",
                params![id.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| database_error(e, Some(time_limit)))?;

        Ok(row.and_then(|(id, document)| Self::listing_from_row(id, document, projection)))
    }

    fn insert(&self, document: &Value) -> Result<ListingId, StoreError> {
        let (id, body) = split_document(document);
        let conn = self.pool.checkout(CHECKOUT_WAIT)?;

        conn.execute(
            "INSERT INTO listings (id, document) VALUES (?1, ?2)",
            params![id.as_str(), body.to_string()],
        )
        .map_err(|e| database_error(e, None))?;

        Ok(id)
    }

    fn insert_all(&self, documents: &[Value]) -> Result<Vec<ListingId>, StoreError> {
        let mut conn = self.pool.checkout(CHECKOUT_WAIT)?;
        let tx = conn.transaction().map_err(|e| database_error(e, None))?;
        let mut ids = Vec::with_capacity(documents.len());

        {
            let mut stmt = tx
                .prepare("INSERT INTO listings (id, document) VALUES (?1, ?2)")
                .map_err(|e| database_error(e, None))?;

            for (index, document) in documents.iter().enumerate() {
                let (id, body) = split_document(document);
                stmt.execute(params![id.as_str(), body.to_string()])
                    .map_err(|e| database_error(e, None).at_position(index + 1))?;
                ids.push(id);
            }
        }

        tx.commit().map_err(|e| database_error(e, None))?;
        Ok(ids)
    }
}

impl SqliteStore {
    fn find_user(&self, column: &str, value: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.pool.checkout(CHECKOUT_WAIT)?;

        let sql = format!(
            "SELECT username, email, password, role, created_at FROM users WHERE {column} = ?1"
        );

        let row = conn
            .query_row(&sql, params![value], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .optional()
            .map_err(|e| database_error(e, None))?;

        let Some((username, email, password_hash, role, created_at)) = row else {
            return Ok(None);
        };

        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Malformed {
                key: username.clone(),
                reason: format!("created_at: {e}"),
            })?
            .with_timezone(&Utc);

        Ok(Some(UserRecord {
            username,
            email,
            password_hash,
            role,
            created_at,
        }))
    }
}

impl UserStore for SqliteStore {
    fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        self.find_user("username", username)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        self.find_user("email", email)
    }

    fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let conn = self.pool.checkout(CHECKOUT_WAIT)?;

        conn.execute(
            "INSERT INTO users (username, email, password, role, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.username,
                user.email,
                user.password_hash,
                user.role,
                user.created_at.to_rfc3339()
            ],
        )
        .map_err(|e| database_error(e, None))?;

        Ok(())
    }
}
