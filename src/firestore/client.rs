//! Firestore REST API 클라이언트
//!
//! Firestore 호환 REST 엔드포인트를 `DocumentStore`로 노출합니다.
//! REST에는 실시간 리스너가 없으므로 `spawn_poller`로 변경을 감지합니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::config::FirestoreConfig;
use crate::error::{LaunchError, LaunchResult};
use crate::firestore::types::*;
use crate::store::{Collection, Document, DocumentStore, Fields, StoreChange, CHANGE_FEED_CAPACITY};
use crate::tasks::BackgroundTask;

const PAGE_SIZE: &str = "300";

/// Firestore REST 문서 저장소
pub struct FirestoreStore {
    http: reqwest::Client,
    /// `.../databases/{db}/documents`
    documents_url: String,
    api_key: Option<String>,
    changes: broadcast::Sender<StoreChange>,
}

impl FirestoreStore {
    pub fn new(config: &FirestoreConfig) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            http: reqwest::Client::new(),
            documents_url: config.documents_url(),
            api_key: config.api_key.clone(),
            changes,
        }
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/{}", self.documents_url, collection.as_str())
    }

    fn document_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), urlencoding::encode(id))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    fn notify(&self, collection: Collection) {
        let _ = self.changes.send(StoreChange { collection });
    }

    /// 요청 전송 후 상태 코드/에러 본문 처리
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> LaunchResult<T> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<FirestoreErrorBody>(&body) {
                return Err(LaunchError::Store(format!(
                    "Firestore API error: {} ({} {})",
                    error.error.message, error.error.code, error.error.status
                )));
            }
            return Err(LaunchError::Store(format!(
                "Request failed with status {}: {}",
                status, body
            )));
        }

        if body.trim().is_empty() {
            return Ok(serde_json::from_value(json!({}))?);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// 주기적으로 컬렉션 지문(md5)을 비교해 변경 알림 발행
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> BackgroundTask {
        let store = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut fingerprints: HashMap<Collection, md5::Digest> = HashMap::new();
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;

                let store_ref = &store;
                let listings = futures::future::join_all(Collection::ALL.into_iter().map(|c| async move {
                    (c, store_ref.list(c).await)
                }))
                .await;

                for (collection, result) in listings {
                    let docs = match result {
                        Ok(docs) => docs,
                        Err(e) => {
                            tracing::warn!("[Firestore] poll {} failed: {}", collection.as_str(), e);
                            continue;
                        }
                    };
                    let digest = fingerprint(&docs);
                    let previous = fingerprints.insert(collection, digest);
                    if matches!(previous, Some(prev) if prev != digest) {
                        tracing::debug!("[Firestore] {} changed remotely", collection.as_str());
                        store.notify(collection);
                    }
                }
            }
        });
        BackgroundTask::new("firestore-poller", handle)
    }
}

fn fingerprint(docs: &[Document]) -> md5::Digest {
    let mut ctx = md5::Context::new();
    for doc in docs {
        ctx.consume(doc.id.as_bytes());
        ctx.consume(Value::Object(doc.data.clone()).to_string().as_bytes());
    }
    ctx.compute()
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn create(&self, collection: Collection, data: Fields) -> LaunchResult<String> {
        let body = json!({ "fields": encode_fields(&data) });
        let created: FirestoreDocument = self
            .send(self.http.post(self.collection_url(collection)).json(&body))
            .await?;
        self.notify(collection);
        Ok(created.id().to_string())
    }

    async fn update(&self, collection: Collection, id: &str, fields: Fields) -> LaunchResult<()> {
        let mask: Vec<(&str, &str)> = fields
            .keys()
            .map(|field| ("updateMask.fieldPaths", field.as_str()))
            .collect();
        let body = json!({ "fields": encode_fields(&fields) });

        let request = self
            .http
            .patch(self.document_url(collection, id))
            .query(&mask)
            .query(&[("currentDocument.exists", "true")])
            .json(&body);
        let _: FirestoreDocument = self.send(request).await?;
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> LaunchResult<()> {
        let _: Value = self.send(self.http.delete(self.document_url(collection, id))).await?;
        self.notify(collection);
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> LaunchResult<Option<Document>> {
        let response = self
            .authorize(self.http.get(self.document_url(collection, id)))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LaunchError::Store(format!(
                "Request failed with status {}: {}",
                status, body
            )));
        }
        let doc: FirestoreDocument = serde_json::from_str(&body)?;
        Ok(Some(doc.into_document()))
    }

    async fn find_by(&self, collection: Collection, field: &str, value: &Value) -> LaunchResult<Vec<Document>> {
        let url = format!("{}:runQuery", self.documents_url);
        let body = equality_query(collection.as_str(), field, value);
        let items: Vec<RunQueryResponseItem> = self.send(self.http.post(url).json(&body)).await?;

        Ok(items
            .into_iter()
            .filter_map(|item| item.document)
            .map(FirestoreDocument::into_document)
            .collect())
    }

    async fn list(&self, collection: Collection) -> LaunchResult<Vec<Document>> {
        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(self.collection_url(collection))
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: ListDocumentsResponse = self.send(request).await?;
            docs.extend(page.documents.into_iter().map(FirestoreDocument::into_document));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(docs)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
