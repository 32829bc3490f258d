//! Document Store Module
//!
//! 외부 문서 데이터베이스 추상화. 컬렉션 단위 CRUD, 필드 동등 조건 조회,
//! 변경 알림 구독만 가정합니다.

pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use crate::error::{LaunchError, LaunchResult};

pub use memory::MemoryStore;

/// 문서 필드 맵
pub type Fields = Map<String, Value>;

/// 변경 알림 채널 버퍼 크기
pub const CHANGE_FEED_CAPACITY: usize = 64;

/// 사용하는 컬렉션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    Projects,
    LaunchProjects,
    LaunchStatuses,
}

impl Collection {
    pub const ALL: [Collection; 3] = [
        Collection::Projects,
        Collection::LaunchProjects,
        Collection::LaunchStatuses,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Projects => "projects",
            Collection::LaunchProjects => "launchProjects",
            Collection::LaunchStatuses => "launchStatuses",
        }
    }
}

/// 저장된 문서
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Fields,
}

impl Document {
    /// 타입으로 역직렬화
    pub fn decode<T: DeserializeOwned>(&self) -> LaunchResult<T> {
        Ok(serde_json::from_value(Value::Object(self.data.clone()))?)
    }

    pub fn field_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }
}

/// 직렬화 가능한 값을 필드 맵으로 변환
pub fn to_fields<T: Serialize>(value: &T) -> LaunchResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(LaunchError::Store(format!("document must be an object, got {}", other))),
    }
}

/// 컬렉션 변경 알림
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreChange {
    pub collection: Collection,
}

/// 문서 저장소
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 새 문서 생성, 생성된 문서 ID 반환
    async fn create(&self, collection: Collection, data: Fields) -> LaunchResult<String>;

    /// 지정 필드만 병합 갱신
    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> LaunchResult<()>;

    async fn delete(&self, collection: Collection, id: &str) -> LaunchResult<()>;

    /// ID로 단건 조회
    async fn get(&self, collection: Collection, id: &str) -> LaunchResult<Option<Document>>;

    /// 필드 동등 조건 조회
    async fn find_by(&self, collection: Collection, field: &str, value: &Value) -> LaunchResult<Vec<Document>>;

    async fn list(&self, collection: Collection) -> LaunchResult<Vec<Document>>;

    /// 변경 알림 구독
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}
