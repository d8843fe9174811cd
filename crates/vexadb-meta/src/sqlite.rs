//! SQLite-backed catalog store.
//!
//! Statements go through the connection's prepared-statement cache; a busy
//! database is retried a bounded number of times before the call fails.
//! The connection is mutex-guarded so statement handles never see
//! concurrent writers.

use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, ToSql};
use tracing::error;

use vexadb_common::error::{Error, Result};

use crate::records::{CollectionRecord, ColumnRecord, RepositoryRecord};
use crate::store::MetaStore;

const MAX_BUSY_RETRY: u32 = 5;
const BUSY_RETRY_DELAY: Duration = Duration::from_millis(20);
const STATEMENT_CACHE_CAPACITY: usize = 64;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS collections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    uid TEXT NOT NULL,
    uuid TEXT NOT NULL UNIQUE,
    forward_columns TEXT NOT NULL DEFAULT '',
    max_docs_per_segment INTEGER NOT NULL DEFAULT 0,
    revision INTEGER NOT NULL DEFAULT 0,
    status INTEGER NOT NULL DEFAULT 0,
    current_flag INTEGER NOT NULL DEFAULT 0,
    readable INTEGER NOT NULL DEFAULT 0,
    writable INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_collections_name ON collections (name);

CREATE TABLE IF NOT EXISTS columns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection_uid TEXT NOT NULL,
    collection_uuid TEXT NOT NULL,
    name TEXT NOT NULL,
    uid TEXT NOT NULL,
    dimension INTEGER NOT NULL DEFAULT 0,
    index_type INTEGER NOT NULL DEFAULT 0,
    data_type INTEGER NOT NULL DEFAULT 0,
    parameters TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_columns_collection_uuid ON columns (collection_uuid);

CREATE TABLE IF NOT EXISTS repositories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection_uid TEXT NOT NULL,
    collection_uuid TEXT NOT NULL,
    name TEXT NOT NULL,
    connection_uri TEXT NOT NULL DEFAULT '',
    user TEXT NOT NULL DEFAULT '',
    password TEXT NOT NULL DEFAULT '',
    table_name TEXT NOT NULL DEFAULT ''
);
CREATE INDEX IF NOT EXISTS idx_repositories_collection_uuid ON repositories (collection_uuid);
"#;

/// Catalog store persisted in a SQLite database file.
pub struct SqliteMetaStore {
    conn: Mutex<Connection>,
}

impl SqliteMetaStore {
    /// Open (or create) the database and its tables.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            error!("Failed to open meta database. path[{}] error[{}]", path, e);
            Error::OpenFile
        })?;
        conn.busy_timeout(Duration::from_millis(100)).map_err(|e| {
            error!("Failed to set busy timeout. error[{}]", e);
            Error::OpenFile
        })?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        conn.execute_batch(SCHEMA).map_err(|e| {
            error!("Failed to create meta tables. error[{}]", e);
            Error::WriteData
        })?;
        Ok(SqliteMetaStore {
            conn: Mutex::new(conn),
        })
    }

    fn exec(&self, sql: &str, params: &[&dyn ToSql]) -> Result<usize> {
        let conn = self.conn.lock();
        let mut attempts = 0;
        loop {
            let result = conn
                .prepare_cached(sql)
                .and_then(|mut stmt| stmt.execute(params));
            match result {
                Ok(changed) => return Ok(changed),
                Err(err) if is_busy(&err) && attempts < MAX_BUSY_RETRY => {
                    attempts += 1;
                    std::thread::sleep(BUSY_RETRY_DELAY);
                }
                Err(err) => {
                    error!("Meta statement failed. sql[{}] error[{}]", sql, err);
                    return Err(Error::WriteData);
                }
            }
        }
    }

    fn query<T>(
        &self,
        sql: &str,
        map: impl Fn(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
        visitor: &mut dyn FnMut(T),
    ) -> Result<()> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(sql).map_err(|e| {
            error!("Meta statement prepare failed. sql[{}] error[{}]", sql, e);
            Error::ReadData
        })?;
        let rows = stmt.query_map([], |row| map(row)).map_err(|e| {
            error!("Meta query failed. sql[{}] error[{}]", sql, e);
            Error::ReadData
        })?;
        for row in rows {
            match row {
                Ok(record) => visitor(record),
                Err(e) => {
                    error!("Meta row decode failed. sql[{}] error[{}]", sql, e);
                    return Err(Error::ReadData);
                }
            }
        }
        Ok(())
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::DatabaseBusy || e.code == ErrorCode::DatabaseLocked
    )
}

impl MetaStore for SqliteMetaStore {
    fn create_collection(&self, c: &CollectionRecord) -> Result<()> {
        self.exec(
            "INSERT INTO collections (name, uid, uuid, forward_columns, \
             max_docs_per_segment, revision, status, current_flag, readable, writable) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            &[
                &c.name,
                &c.uid,
                &c.uuid,
                &c.forward_columns,
                &(c.max_docs_per_segment as i64),
                &c.revision,
                &c.status,
                &c.current,
                &c.readable,
                &c.writable,
            ],
        )?;
        Ok(())
    }

    fn update_collection(&self, c: &CollectionRecord) -> Result<()> {
        let changed = self.exec(
            "UPDATE collections SET name = ?1, forward_columns = ?2, \
             max_docs_per_segment = ?3, revision = ?4, status = ?5, \
             current_flag = ?6, readable = ?7, writable = ?8 WHERE uuid = ?9",
            &[
                &c.name,
                &c.forward_columns,
                &(c.max_docs_per_segment as i64),
                &c.revision,
                &c.status,
                &c.current,
                &c.readable,
                &c.writable,
                &c.uuid,
            ],
        )?;
        if changed == 0 {
            return Err(Error::InexistentCollection);
        }
        Ok(())
    }

    fn delete_collection(&self, name: &str) -> Result<()> {
        self.exec("DELETE FROM collections WHERE name = ?1", &[&name])?;
        Ok(())
    }

    fn delete_collection_by_uuid(&self, uuid: &str) -> Result<()> {
        self.exec("DELETE FROM collections WHERE uuid = ?1", &[&uuid])?;
        Ok(())
    }

    fn list_collections(&self, visitor: &mut dyn FnMut(CollectionRecord)) -> Result<()> {
        self.query(
            "SELECT id, name, uid, uuid, forward_columns, max_docs_per_segment, \
             revision, status, current_flag, readable, writable FROM collections ORDER BY id",
            |row| {
                Ok(CollectionRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    uid: row.get(2)?,
                    uuid: row.get(3)?,
                    forward_columns: row.get(4)?,
                    max_docs_per_segment: row.get::<_, i64>(5)? as u64,
                    revision: row.get(6)?,
                    status: row.get(7)?,
                    current: row.get(8)?,
                    readable: row.get(9)?,
                    writable: row.get(10)?,
                })
            },
            visitor,
        )
    }

    fn create_column(&self, c: &ColumnRecord) -> Result<()> {
        self.exec(
            "INSERT INTO columns (collection_uid, collection_uuid, name, uid, \
             dimension, index_type, data_type, parameters) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            &[
                &c.collection_uid,
                &c.collection_uuid,
                &c.name,
                &c.uid,
                &c.dimension,
                &c.index_type,
                &c.data_type,
                &c.parameters,
            ],
        )?;
        Ok(())
    }

    fn delete_columns_by_uid(&self, collection_uid: &str) -> Result<()> {
        self.exec(
            "DELETE FROM columns WHERE collection_uid = ?1",
            &[&collection_uid],
        )?;
        Ok(())
    }

    fn delete_columns_by_uuid(&self, collection_uuid: &str) -> Result<()> {
        self.exec(
            "DELETE FROM columns WHERE collection_uuid = ?1",
            &[&collection_uuid],
        )?;
        Ok(())
    }

    fn list_columns(&self, visitor: &mut dyn FnMut(ColumnRecord)) -> Result<()> {
        self.query(
            "SELECT id, collection_uid, collection_uuid, name, uid, dimension, \
             index_type, data_type, parameters FROM columns ORDER BY id",
            |row| {
                Ok(ColumnRecord {
                    id: row.get(0)?,
                    collection_uid: row.get(1)?,
                    collection_uuid: row.get(2)?,
                    name: row.get(3)?,
                    uid: row.get(4)?,
                    dimension: row.get(5)?,
                    index_type: row.get(6)?,
                    data_type: row.get(7)?,
                    parameters: row.get(8)?,
                })
            },
            visitor,
        )
    }

    fn create_repository(&self, r: &RepositoryRecord) -> Result<()> {
        self.exec(
            "INSERT INTO repositories (collection_uid, collection_uuid, name, \
             connection_uri, user, password, table_name) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            &[
                &r.collection_uid,
                &r.collection_uuid,
                &r.name,
                &r.connection_uri,
                &r.user,
                &r.password,
                &r.table_name,
            ],
        )?;
        Ok(())
    }

    fn delete_repositories_by_uid(&self, collection_uid: &str) -> Result<()> {
        self.exec(
            "DELETE FROM repositories WHERE collection_uid = ?1",
            &[&collection_uid],
        )?;
        Ok(())
    }

    fn delete_repositories_by_uuid(&self, collection_uuid: &str) -> Result<()> {
        self.exec(
            "DELETE FROM repositories WHERE collection_uuid = ?1",
            &[&collection_uuid],
        )?;
        Ok(())
    }

    fn list_repositories(&self, visitor: &mut dyn FnMut(RepositoryRecord)) -> Result<()> {
        self.query(
            "SELECT id, collection_uid, collection_uuid, name, connection_uri, \
             user, password, table_name FROM repositories ORDER BY id",
            |row| {
                Ok(RepositoryRecord {
                    id: row.get(0)?,
                    collection_uid: row.get(1)?,
                    collection_uuid: row.get(2)?,
                    name: row.get(3)?,
                    connection_uri: row.get(4)?,
                    user: row.get(5)?,
                    password: row.get(6)?,
                    table_name: row.get(7)?,
                })
            },
            visitor,
        )
    }

    fn flush(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
            .map_err(|e| {
                error!("Meta flush failed. error[{}]", e);
                Error::WriteData
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_store(dir: &tempfile::TempDir) -> SqliteMetaStore {
        let path = dir.path().join("meta.sqlite");
        SqliteMetaStore::open(path.to_str().unwrap()).unwrap()
    }

    fn sample_collection(uuid: &str, revision: u32) -> CollectionRecord {
        CollectionRecord {
            id: 0,
            name: "articles".to_string(),
            uid: "uid-1".to_string(),
            uuid: uuid.to_string(),
            forward_columns: "f1,f2".to_string(),
            max_docs_per_segment: 1000,
            revision,
            status: 0,
            current: false,
            readable: false,
            writable: false,
        }
    }

    fn list_all(store: &SqliteMetaStore) -> Vec<CollectionRecord> {
        let mut out = Vec::new();
        store.list_collections(&mut |c| out.push(c)).unwrap();
        out
    }

    #[test]
    fn create_list_update_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store.create_collection(&sample_collection("uuid-1", 0)).unwrap();
        store.create_collection(&sample_collection("uuid-2", 1)).unwrap();

        let rows = list_all(&store);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].id < rows[1].id);
        assert_eq!(rows[0].forward_columns, "f1,f2");
        assert_eq!(rows[0].max_docs_per_segment, 1000);

        let mut updated = sample_collection("uuid-2", 1);
        updated.current = true;
        updated.status = 1;
        store.update_collection(&updated).unwrap();
        let rows = list_all(&store);
        assert!(rows[1].current);
        assert_eq!(rows[1].status, 1);
        assert!(!rows[0].current);

        store.delete_collection_by_uuid("uuid-1").unwrap();
        assert_eq!(list_all(&store).len(), 1);
        store.delete_collection("articles").unwrap();
        assert!(list_all(&store).is_empty());
    }

    #[test]
    fn update_unknown_uuid_fails_and_store_stays_usable() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);
        let err = store
            .update_collection(&sample_collection("missing", 0))
            .unwrap_err();
        assert_eq!(err, Error::InexistentCollection);

        store.create_collection(&sample_collection("uuid-1", 0)).unwrap();
        assert_eq!(list_all(&store).len(), 1);
    }

    #[test]
    fn columns_and_repositories_cascade_by_uid() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(&dir);

        store
            .create_column(&ColumnRecord {
                id: 0,
                collection_uid: "uid-1".to_string(),
                collection_uuid: "uuid-1".to_string(),
                name: "v".to_string(),
                uid: "col-1".to_string(),
                dimension: 8,
                index_type: 1,
                data_type: 23,
                parameters: String::new(),
            })
            .unwrap();
        store
            .create_repository(&RepositoryRecord {
                id: 0,
                collection_uid: "uid-1".to_string(),
                collection_uuid: "uuid-1".to_string(),
                name: "repo".to_string(),
                connection_uri: "mysql://h/db".to_string(),
                user: "u".to_string(),
                password: "p".to_string(),
                table_name: "t".to_string(),
            })
            .unwrap();

        let mut columns = Vec::new();
        store.list_columns(&mut |c| columns.push(c)).unwrap();
        assert_eq!(columns.len(), 1);
        assert_eq!(columns[0].dimension, 8);

        let mut repos = Vec::new();
        store.list_repositories(&mut |r| repos.push(r)).unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].table_name, "t");

        store.delete_columns_by_uid("uid-1").unwrap();
        store.delete_repositories_by_uid("uid-1").unwrap();
        let mut columns = Vec::new();
        store.list_columns(&mut |c| columns.push(c)).unwrap();
        assert!(columns.is_empty());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.sqlite");
        {
            let store = SqliteMetaStore::open(path.to_str().unwrap()).unwrap();
            store.create_collection(&sample_collection("uuid-1", 0)).unwrap();
            store.flush().unwrap();
        }
        let store = SqliteMetaStore::open(path.to_str().unwrap()).unwrap();
        assert_eq!(list_all(&store).len(), 1);
    }
}
