//! Database Module
//!
//! SQLite 기반 문서 저장소 (로컬 단일 사용자 모드)

mod schema;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::backup::Backup;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::{LaunchError, LaunchResult};
use crate::store::{Collection, Document, DocumentStore, Fields, StoreChange, CHANGE_FEED_CAPACITY};

/// SQLite 문서 저장소
pub struct SqliteStore {
    conn: Mutex<Connection>,
    changes: broadcast::Sender<StoreChange>,
}

impl SqliteStore {
    /// 새 데이터베이스 연결 생성
    pub fn new(path: &Path) -> LaunchResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self::with_connection(conn))
    }

    /// 메모리 DB (테스트용)
    pub fn in_memory() -> LaunchResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::with_connection(conn))
    }

    fn with_connection(conn: Connection) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            conn: Mutex::new(conn),
            changes,
        }
    }

    /// 데이터베이스 스키마 초기화
    pub fn initialize(&self) -> LaunchResult<()> {
        self.lock()?.execute_batch(schema::CREATE_SCHEMA)?;
        Ok(())
    }

    fn lock(&self) -> LaunchResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LaunchError::Store(format!("Failed to acquire database lock: {}", e)))
    }

    fn notify(&self, collection: Collection) {
        let _ = self.changes.send(StoreChange { collection });
    }

    /// 현재 DB를 파일로 백업
    pub fn export_to_file(&self, out_path: &Path) -> LaunchResult<()> {
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = self.lock()?;
        let mut out_conn = Connection::open(out_path)?;
        out_conn.execute_batch(schema::CREATE_SCHEMA)?;

        let backup = Backup::new(&conn, &mut out_conn)?;
        backup.run_to_completion(5, std::time::Duration::from_millis(10), None)?;
        Ok(())
    }

    fn read_documents(
        conn: &Connection,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> LaunchResult<Vec<Document>> {
        let mut stmt = conn.prepare(sql)?;
        let iter = stmt.query_map(params, |row| {
            let id: String = row.get(0)?;
            let data_json: String = row.get(1)?;
            Ok((id, data_json))
        })?;

        let mut docs = Vec::new();
        for row in iter {
            let (id, data_json) = row?;
            let data = match serde_json::from_str::<Value>(&data_json)? {
                Value::Object(map) => map,
                _ => Fields::new(),
            };
            docs.push(Document { id, data });
        }
        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn create(&self, collection: Collection, data: Fields) -> LaunchResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().timestamp_millis();
        self.lock()?.execute(
            "INSERT INTO documents (collection, id, data_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            (collection.as_str(), &id, serde_json::to_string(&data)?, now),
        )?;
        self.notify(collection);
        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> LaunchResult<()> {
        {
            let conn = self.lock()?;
            let tx = conn.unchecked_transaction()?;

            let existing: Option<String> = tx
                .query_row(
                    "SELECT data_json FROM documents WHERE collection = ?1 AND id = ?2",
                    (collection.as_str(), id),
                    |row| row.get(0),
                )
                .optional()?;
            let existing =
                existing.ok_or_else(|| LaunchError::Store(format!("{}/{} not found", collection.as_str(), id)))?;

            let mut data = match serde_json::from_str::<Value>(&existing)? {
                Value::Object(map) => map,
                _ => Fields::new(),
            };
            for (field, value) in fields {
                data.insert(field, value);
            }

            tx.execute(
                "UPDATE documents SET data_json = ?1, updated_at = ?2 WHERE collection = ?3 AND id = ?4",
                (
                    serde_json::to_string(&data)?,
                    chrono::Utc::now().timestamp_millis(),
                    collection.as_str(),
                    id,
                ),
            )?;
            tx.commit()?;
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> LaunchResult<()> {
        let removed = self.lock()?.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            (collection.as_str(), id),
        )?;
        if removed > 0 {
            self.notify(collection);
        }
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> LaunchResult<Option<Document>> {
        let conn = self.lock()?;
        let docs = Self::read_documents(
            &conn,
            "SELECT id, data_json FROM documents WHERE collection = ?1 AND id = ?2",
            &[&collection.as_str(), &id],
        )?;
        Ok(docs.into_iter().next())
    }

    async fn find_by(&self, collection: Collection, field: &str, value: &Value) -> LaunchResult<Vec<Document>> {
        let conn = self.lock()?;
        let path = format!("$.{}", field);

        // 문자열은 SQL에서 바로 비교, 그 외 타입은 컬렉션을 읽어 비교
        if let Value::String(s) = value {
            return Self::read_documents(
                &conn,
                "SELECT id, data_json FROM documents
                 WHERE collection = ?1 AND json_extract(data_json, ?2) = ?3
                 ORDER BY created_at",
                &[&collection.as_str(), &path, s],
            );
        }

        let docs = Self::read_documents(
            &conn,
            "SELECT id, data_json FROM documents WHERE collection = ?1 ORDER BY created_at",
            &[&collection.as_str()],
        )?;
        Ok(docs.into_iter().filter(|d| d.data.get(field) == Some(value)).collect())
    }

    async fn list(&self, collection: Collection) -> LaunchResult<Vec<Document>> {
        let conn = self.lock()?;
        Self::read_documents(
            &conn,
            "SELECT id, data_json FROM documents WHERE collection = ?1 ORDER BY created_at",
            &[&collection.as_str()],
        )
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
