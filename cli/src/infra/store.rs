//! Infrastructure implementation of the `ResourceStore` port on SQLite.
//!
//! One `rusqlite::Connection` behind a mutex per store. Several stores (or
//! processes) may share a database file; writes take `BEGIN IMMEDIATE` and
//! wait out the busy timeout before reporting `StoreError::Busy`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, Transaction, TransactionBehavior, params};
use smarter_common::{DeployState, Kind};

use crate::application::ports::{Deletion, ResourceStore, Transition};
use crate::domain::record::diff;
use crate::domain::{
    EventKind, NewCredential, Reference, ResourceDraft, ResourceEvent, ResourceKey,
    ResourceRecord, StoreError, UpsertOutcome,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    account      TEXT PRIMARY KEY,
    company_name TEXT NOT NULL,
    created_at   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS resources (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    account        TEXT NOT NULL REFERENCES accounts(account) ON DELETE CASCADE,
    kind           TEXT NOT NULL,
    name           TEXT NOT NULL,
    variant        TEXT,
    description    TEXT NOT NULL,
    version        TEXT,
    labels         TEXT NOT NULL,
    spec           TEXT NOT NULL,
    deploy_state   TEXT NOT NULL DEFAULT 'not_deployed',
    deploy_message TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (account, kind, name)
);
CREATE UNIQUE INDEX IF NOT EXISTS resources_by_custom_domain
    ON resources (lower(json_extract(spec, '$.config.customDomain')))
    WHERE kind = 'ChatBot';

CREATE TABLE IF NOT EXISTS resource_refs (
    resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    kind        TEXT NOT NULL,
    name        TEXT NOT NULL,
    PRIMARY KEY (resource_id, kind, name)
);
CREATE INDEX IF NOT EXISTS resource_refs_by_target ON resource_refs(kind, name);

CREATE TABLE IF NOT EXISTS resource_events (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    resource_id INTEGER NOT NULL REFERENCES resources(id) ON DELETE CASCADE,
    at          TEXT NOT NULL,
    event       TEXT NOT NULL,
    message     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS resource_events_by_resource ON resource_events(resource_id, id);

CREATE TABLE IF NOT EXISTS api_key_credentials (
    resource_id INTEGER PRIMARY KEY REFERENCES resources(id) ON DELETE CASCADE,
    digest      TEXT NOT NULL UNIQUE,
    prefix      TEXT NOT NULL
);
";

const RECORD_COLUMNS: &str = "id, account, kind, name, variant, description, version, labels, \
     spec, \
     (SELECT json_group_array(json_object('kind', f.kind, 'name', f.name)) \
      FROM resource_refs f WHERE f.resource_id = resources.id), \
     deploy_state, deploy_message, created_at, updated_at";

/// SQLite-backed `ResourceStore`.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path` and migrate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or migrated.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Database(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path).map_err(db_error)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(db_error)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;").map_err(db_error)?;
        Self::init(conn)
    }

    /// Private in-memory database, used by tests.
    ///
    /// # Errors
    ///
    /// Returns an error if SQLite cannot allocate the database.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory().map_err(db_error)?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(db_error)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(db_error)?;
        conn.execute_batch(SCHEMA).map_err(db_error)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection mutex poisoned".to_string()))
    }
}

/// Expand a leading `~/` against the home directory.
///
/// # Errors
///
/// Returns an error if the path needs a home directory and none is known.
pub fn expand_home(path: &str) -> Result<PathBuf, StoreError> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .ok_or_else(|| StoreError::Database("cannot determine home directory".to_string())),
        None => Ok(PathBuf::from(path)),
    }
}

fn db_error(e: rusqlite::Error) -> StoreError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => StoreError::Busy,
        Some(ErrorCode::ConstraintViolation) => StoreError::Conflict(e.to_string()),
        _ => StoreError::Database(e.to_string()),
    }
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{what}: {e}"))
}

// ── Row mapping ──────────────────────────────────────────────────────────────

/// Raw column values, converted to a record outside the rusqlite closure.
struct RecordRow {
    id: i64,
    account: String,
    kind: String,
    name: String,
    variant: Option<String>,
    description: String,
    version: Option<String>,
    labels: String,
    spec: String,
    refs: String,
    deploy_state: String,
    deploy_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecordRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            account: row.get(1)?,
            kind: row.get(2)?,
            name: row.get(3)?,
            variant: row.get(4)?,
            description: row.get(5)?,
            version: row.get(6)?,
            labels: row.get(7)?,
            spec: row.get(8)?,
            refs: row.get(9)?,
            deploy_state: row.get(10)?,
            deploy_message: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn into_record(self) -> Result<ResourceRecord, StoreError> {
        let kind: Kind = self.kind.parse().map_err(|e| corrupt("kind", e))?;
        let mut references = serde_json::from_str::<Vec<Reference>>(&self.refs)
            .map_err(|e| corrupt("refs", e))?;
        references.sort();
        Ok(ResourceRecord {
            id: self.id,
            key: ResourceKey::new(self.account, kind, self.name),
            variant: self.variant,
            description: self.description,
            version: self.version,
            labels: serde_json::from_str::<BTreeMap<String, String>>(&self.labels)
                .map_err(|e| corrupt("labels", e))?,
            spec: serde_json::from_str(&self.spec).map_err(|e| corrupt("spec", e))?,
            references,
            deploy_state: self
                .deploy_state
                .parse()
                .map_err(|e: String| corrupt("deploy_state", e))?,
            deploy_message: self.deploy_message,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn encode<T: serde::Serialize>(what: &str, value: &T) -> Result<String, StoreError> {
    serde_json::to_string(value).map_err(|e| corrupt(what, e))
}

fn find_in(conn: &Connection, key: &ResourceKey) -> Result<Option<ResourceRecord>, StoreError> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM resources WHERE account = ?1 AND kind = ?2 AND name = ?3"
    );
    conn.query_row(&sql, params![key.account, key.kind.as_str(), key.name], RecordRow::read)
        .optional()
        .map_err(db_error)?
        .map(RecordRow::into_record)
        .transpose()
}

fn find_existing(tx: &Transaction<'_>, key: &ResourceKey) -> Result<ResourceRecord, StoreError> {
    find_in(tx, key)?.ok_or_else(|| StoreError::Database(format!("{key} vanished inside its transaction")))
}

fn insert_event(
    conn: &Connection,
    resource_id: i64,
    event: EventKind,
    message: &str,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO resource_events (resource_id, at, event, message) VALUES (?1, ?2, ?3, ?4)",
        params![resource_id, Utc::now(), event.as_str(), message],
    )
    .map_err(db_error)?;
    Ok(())
}

fn account_exists_in(conn: &Connection, account: &str) -> Result<bool, StoreError> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM accounts WHERE account = ?1)",
        params![account],
        |row| row.get(0),
    )
    .map_err(db_error)
}

fn exists_in(conn: &Connection, key: &ResourceKey) -> Result<bool, StoreError> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM resources WHERE account = ?1 AND kind = ?2 AND name = ?3)",
        params![key.account, key.kind.as_str(), key.name],
        |row| row.get(0),
    )
    .map_err(db_error)
}

fn write_refs(conn: &Connection, resource_id: i64, references: &[Reference]) -> Result<(), StoreError> {
    conn.execute("DELETE FROM resource_refs WHERE resource_id = ?1", params![resource_id])
        .map_err(db_error)?;
    for reference in references {
        conn.execute(
            "INSERT OR IGNORE INTO resource_refs (resource_id, kind, name) VALUES (?1, ?2, ?3)",
            params![resource_id, reference.kind.as_str(), reference.name],
        )
        .map_err(db_error)?;
    }
    Ok(())
}

fn referrers_in(conn: &Connection, key: &ResourceKey) -> Result<Vec<ResourceKey>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT r.account, r.kind, r.name
             FROM resource_refs f JOIN resources r ON r.id = f.resource_id
             WHERE r.account = ?1 AND f.kind = ?2 AND f.name = ?3
             ORDER BY r.kind, r.name",
        )
        .map_err(db_error)?;
    let rows = stmt
        .query_map(params![key.account, key.kind.as_str(), key.name], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
        })
        .map_err(db_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_error)?;
    rows.into_iter().map(|(account, kind, name)| key_from(account, &kind, name)).collect()
}

fn key_from(account: String, kind: &str, name: String) -> Result<ResourceKey, StoreError> {
    let kind: Kind = kind.parse().map_err(|e| corrupt("kind", e))?;
    Ok(ResourceKey::new(account, kind, name))
}

/// Fails the write when another ChatBot already answers on the draft's domain.
fn check_custom_domain(conn: &Connection, draft: &ResourceDraft) -> Result<(), StoreError> {
    if draft.key.kind != Kind::ChatBot {
        return Ok(());
    }
    let Some(domain) = draft.spec.pointer("/config/customDomain").and_then(|v| v.as_str()) else {
        return Ok(());
    };
    let taken: bool = conn
        .query_row(
            "SELECT EXISTS (SELECT 1 FROM resources
                WHERE kind = ?1 AND lower(json_extract(spec, '$.config.customDomain')) = lower(?2)
                  AND NOT (account = ?3 AND name = ?4))",
            params![Kind::ChatBot.as_str(), domain, draft.key.account, draft.key.name],
            |row| row.get(0),
        )
        .map_err(db_error)?;
    if taken {
        return Err(StoreError::DomainInUse(domain.to_string()));
    }
    Ok(())
}

// ── Port implementation ──────────────────────────────────────────────────────

impl ResourceStore for SqliteStore {
    fn create_account(&self, account: &str, company_name: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let inserted = conn
            .execute(
                "INSERT INTO accounts (account, company_name, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (account) DO NOTHING",
                params![account, company_name, Utc::now()],
            )
            .map_err(db_error)?;
        Ok(inserted == 1)
    }

    fn account_exists(&self, account: &str) -> Result<bool, StoreError> {
        account_exists_in(&*self.lock()?, account)
    }

    fn find(&self, key: &ResourceKey) -> Result<Option<ResourceRecord>, StoreError> {
        find_in(&*self.lock()?, key)
    }

    fn list(&self, account: &str, kind: Kind) -> Result<Vec<ResourceRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM resources WHERE account = ?1 AND kind = ?2 ORDER BY name"
        );
        let mut stmt = conn.prepare(&sql).map_err(db_error)?;
        let rows = stmt
            .query_map(params![account, kind.as_str()], RecordRow::read)
            .map_err(db_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_error)?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }

    fn upsert(
        &self,
        draft: &ResourceDraft,
        credential: Option<&NewCredential>,
    ) -> Result<UpsertOutcome, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;
        let key = &draft.key;
        if !account_exists_in(&tx, &key.account)? {
            return Err(StoreError::UnknownAccount(key.account.clone()));
        }
        for reference in &draft.required {
            if !exists_in(&tx, &key.sibling(reference.kind, &reference.name))? {
                return Err(StoreError::MissingReference(reference.clone()));
            }
        }
        check_custom_domain(&tx, draft)?;

        let labels = encode("labels", &draft.labels)?;
        let spec = encode("spec", &draft.spec)?;
        let now = Utc::now();

        let outcome = match find_in(&tx, key)? {
            None => {
                tx.execute(
                    "INSERT INTO resources
                            (account, kind, name, variant, description, version, labels, spec,
                         created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                    params![
                        key.account,
                        key.kind.as_str(),
                        key.name,
                        draft.variant,
                        draft.description,
                        draft.version,
                        labels,
                        spec,
                        now,
                    ],
                )
                .map_err(db_error)?;
                let id = tx.last_insert_rowid();
                write_refs(&tx, id, &draft.references)?;
                if let Some(credential) = credential {
                    tx.execute(
                        "INSERT INTO api_key_credentials (resource_id, digest, prefix) VALUES (?1, ?2, ?3)",
                        params![id, credential.digest, credential.prefix],
                    )
                    .map_err(db_error)?;
                }
                insert_event(&tx, id, EventKind::Created, "created")?;
                UpsertOutcome::Created(find_existing(&tx, key)?)
            }
            Some(existing) => {
                let changed = diff(draft, &existing);
                if changed.is_empty() {
                    UpsertOutcome::Updated {
                        record: existing,
                        changed,
                    }
                } else {
                    tx.execute(
                        "UPDATE resources
                         SET variant = ?2, description = ?3, version = ?4, labels = ?5, spec = ?6,
                             updated_at = ?7
                         WHERE id = ?1",
                        params![
                            existing.id,
                            draft.variant,
                            draft.description,
                            draft.version,
                            labels,
                            spec,
                            now,
                        ],
                    )
                    .map_err(db_error)?;
                    write_refs(&tx, existing.id, &draft.references)?;
                    insert_event(
                        &tx,
                        existing.id,
                        EventKind::Updated,
                        &format!("changed: {}", changed.join(", ")),
                    )?;
                    UpsertOutcome::Updated {
                        record: find_existing(&tx, key)?,
                        changed,
                    }
                }
            }
        };
        tx.commit().map_err(db_error)?;
        Ok(outcome)
    }

    fn delete(&self, key: &ResourceKey) -> Result<Deletion, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;
        let Some(record) = find_in(&tx, key)? else {
            return Ok(Deletion::Missing);
        };
        let referrers = referrers_in(&tx, key)?;
        if !referrers.is_empty() {
            return Ok(Deletion::Referenced(referrers));
        }
        if record.deploy_state == DeployState::Deploying {
            return Ok(Deletion::Rejected(record.deploy_state));
        }
        tx.execute("DELETE FROM resources WHERE id = ?1", params![record.id])
            .map_err(db_error)?;
        tx.commit().map_err(db_error)?;
        Ok(Deletion::Deleted)
    }

    fn transition(
        &self,
        key: &ResourceKey,
        from: &[DeployState],
        to: DeployState,
        event: EventKind,
        message: &str,
    ) -> Result<Transition, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db_error)?;
        let Some(record) = find_in(&tx, key)? else {
            return Ok(Transition::Missing);
        };
        if !from.contains(&record.deploy_state) {
            return Ok(Transition::Rejected(record.deploy_state));
        }
        tx.execute(
            "UPDATE resources SET deploy_state = ?2, deploy_message = ?3, updated_at = ?4 WHERE id = ?1",
            params![record.id, to.as_str(), message, Utc::now()],
        )
        .map_err(db_error)?;
        insert_event(&tx, record.id, event, message)?;
        let record = find_existing(&tx, key)?;
        tx.commit().map_err(db_error)?;
        Ok(Transition::Applied(record))
    }

    fn append_event(
        &self,
        key: &ResourceKey,
        event: EventKind,
        message: &str,
    ) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let Some(record) = find_in(&conn, key)? else {
            return Ok(());
        };
        insert_event(&conn, record.id, event, message)
    }

    fn events(&self, key: &ResourceKey) -> Result<Vec<ResourceEvent>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT e.at, e.event, e.message
                 FROM resource_events e JOIN resources r ON r.id = e.resource_id
                 WHERE r.account = ?1 AND r.kind = ?2 AND r.name = ?3
                 ORDER BY e.id",
            )
            .map_err(db_error)?;
        let rows = stmt
            .query_map(params![key.account, key.kind.as_str(), key.name], |row| {
                Ok((
                    row.get::<_, DateTime<Utc>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(db_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_error)?;
        rows.into_iter()
            .map(|(at, event, message)| {
                Ok(ResourceEvent {
                    at,
                    event: event.parse().map_err(|e: String| corrupt("event", e))?,
                    message,
                })
            })
            .collect()
    }

    fn deploying(&self) -> Result<Vec<ResourceKey>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT account, kind, name FROM resources
                 WHERE deploy_state = ?1 ORDER BY updated_at, id",
            )
            .map_err(db_error)?;
        let rows = stmt
            .query_map(params![DeployState::Deploying.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })
            .map_err(db_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(db_error)?;
        rows.into_iter().map(|(account, kind, name)| key_from(account, &kind, name)).collect()
    }

    fn find_credential(&self, digest: &str) -> Result<Option<ResourceKey>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT r.account, r.kind, r.name
                 FROM api_key_credentials c JOIN resources r ON r.id = c.resource_id
                 WHERE c.digest = ?1",
                params![digest],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?)),
            )
            .optional()
            .map_err(db_error)?;
        row.map(|(account, kind, name)| key_from(account, &kind, name)).transpose()
    }

    fn find_chatbot_by_domain(
        &self,
        account: &str,
        domain: &str,
    ) -> Result<Option<ResourceKey>, StoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT name FROM resources
             WHERE account = ?1 AND kind = ?2
               AND lower(json_extract(spec, '$.config.customDomain')) = lower(?3)",
            params![account, Kind::ChatBot.as_str(), domain],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(db_error)
        .map(|found| found.map(|name| ResourceKey::new(account, Kind::ChatBot, name)))
    }
}
